// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Cardinality estimators over a register array.
//!
//! - [`estimate`]: classic HyperLogLog with linear counting for small
//!   cardinalities and the `2^32` correction for large ones.
//! - [`estimate_bias_corrected`]: HLL++ style, subtracting an empirical bias
//!   from the raw estimate and switching to linear counting below a
//!   per-precision threshold.

use crate::hll::registers::Registers;

const TWO_POW_32: f64 = 4_294_967_296.0;

/// Empirical `(raw estimate, bias)` pairs, calibrated for precision 14 only.
const BIAS_DATA_P14: [(f64, f64); 13] = [
    (0.0, 0.0),
    (10.0, 11.717),
    (20.0, 23.131),
    (30.0, 35.133),
    (40.0, 46.724),
    (50.0, 58.216),
    (100.0, 118.417),
    (200.0, 236.731),
    (500.0, 584.169),
    (1000.0, 1164.834),
    (2000.0, 2317.963),
    (5000.0, 5765.204),
    (10000.0, 11447.503),
];

/// Linear counting thresholds indexed by `precision - 4`.
const LINEAR_COUNTING_THRESHOLDS: [f64; 15] = [
    10.0, 20.0, 40.0, 80.0, 220.0, 400.0, 900.0, 1800.0, 3100.0, 6500.0, 11500.0, 20000.0,
    50000.0, 120000.0, 350000.0,
];

/// Bias constant for `2^precision` registers.
pub(super) fn alpha(precision: u8) -> f64 {
    match precision {
        4 => 0.673,
        5 => 0.697,
        6 => 0.709,
        _ => {
            let m = (1u32 << precision) as f64;
            0.7213 / (1.0 + 1.079 / m)
        }
    }
}

/// `alpha * m^2 / sum(2^-register)`.
pub(super) fn raw_estimate(precision: u8, registers: &Registers) -> f64 {
    let m = registers.len() as f64;
    alpha(precision) * m * m / registers.harmonic_sum()
}

/// `m * ln(m / V)` where `V` is the number of zero registers, which must be non-zero.
fn linear_counting(m: f64, num_zeros: u32) -> f64 {
    m * (m / num_zeros as f64).ln()
}

/// Classic estimate with small and large range corrections.
pub(super) fn estimate(precision: u8, registers: &Registers) -> f64 {
    let m = registers.len() as f64;
    let raw = raw_estimate(precision, registers);
    let num_zeros = registers.num_zeros();

    if raw <= 2.5 * m && num_zeros > 0 {
        return linear_counting(m, num_zeros);
    }
    // the correction is undefined once the estimate reaches 2^32
    if raw > TWO_POW_32 / 30.0 && raw < TWO_POW_32 {
        return -TWO_POW_32 * (1.0 - raw / TWO_POW_32).ln();
    }
    raw
}

/// HLL++ style estimate, never negative.
pub(super) fn estimate_bias_corrected(precision: u8, registers: &Registers) -> f64 {
    let m = registers.len() as f64;
    let mut raw = raw_estimate(precision, registers);
    if raw <= 5.0 * m {
        raw -= bias(precision, raw);
    }

    let num_zeros = registers.num_zeros();
    if num_zeros > 0 {
        let linear = linear_counting(m, num_zeros);
        if linear <= linear_counting_threshold(precision) {
            return linear;
        }
    }
    raw.max(0.0)
}

/// Interpolated bias for a raw estimate, zero outside the calibrated table.
fn bias(precision: u8, raw: f64) -> f64 {
    if precision != 14 {
        return 0.0;
    }
    BIAS_DATA_P14
        .windows(2)
        .find(|pair| pair[0].0 <= raw && raw < pair[1].0)
        .map(|pair| {
            let (est, bias) = pair[0];
            let (next_est, next_bias) = pair[1];
            let t = (raw - est) / (next_est - est);
            bias + t * (next_bias - bias)
        })
        .unwrap_or(0.0)
}

fn linear_counting_threshold(precision: u8) -> f64 {
    LINEAR_COUNTING_THRESHOLDS
        .get(usize::from(precision).wrapping_sub(4))
        .copied()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha() {
        assert_eq!(alpha(4), 0.673);
        assert_eq!(alpha(5), 0.697);
        assert_eq!(alpha(6), 0.709);
        let expected = 0.7213 / (1.0 + 1.079 / 16384.0);
        assert!((alpha(14) - expected).abs() < 1e-15);
    }

    #[test]
    fn test_empty_registers() {
        let regs = Registers::new(10);
        assert_eq!(estimate(10, &regs), 0.0);
        assert_eq!(estimate_bias_corrected(10, &regs), 0.0);
        // alpha * m when every register is zero
        assert!((raw_estimate(10, &regs) - alpha(10) * 1024.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_counting_branch() {
        let mut regs = Registers::new(8);
        regs.update(0, 1);
        let m = 256.0f64;
        let expected = m * (m / 255.0).ln();
        assert!((estimate(8, &regs) - expected).abs() < 1e-9);
        assert!((estimate_bias_corrected(8, &regs) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bias_interpolation() {
        assert_eq!(bias(14, 0.0), 0.0);
        assert!((bias(14, 10.0) - 11.717).abs() < 1e-12);
        assert!((bias(14, 15.0) - (11.717 + 23.131) / 2.0).abs() < 1e-12);
        assert!((bias(14, 7500.0) - (5765.204 + 11447.503) / 2.0).abs() < 1e-9);
        // outside the table and for other precisions
        assert_eq!(bias(14, 10000.0), 0.0);
        assert_eq!(bias(14, -1.0), 0.0);
        assert_eq!(bias(12, 15.0), 0.0);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(linear_counting_threshold(4), 10.0);
        assert_eq!(linear_counting_threshold(14), 11500.0);
        assert_eq!(linear_counting_threshold(18), 350000.0);
        assert_eq!(linear_counting_threshold(3), 0.0);
    }

    #[test]
    fn test_full_registers_skip_linear_counting() {
        let mut regs = Registers::new(4);
        for slot in 0..16 {
            regs.update(slot, 1);
        }
        // harmonic sum is 8, raw = 0.673 * 256 / 8
        let raw = 0.673 * 256.0 / 8.0;
        assert!((estimate(4, &regs) - raw).abs() < 1e-12);
        assert!((estimate_bias_corrected(4, &regs) - raw).abs() < 1e-12);
    }

    #[test]
    fn test_large_range_correction() {
        let mut regs = Registers::new(4);
        for slot in 0..16 {
            regs.update(slot, 25);
        }
        // harmonic sum is 16 * 2^-25, raw = 0.673 * 2^29
        let raw = 0.673 * (1u64 << 29) as f64;
        assert!((raw_estimate(4, &regs) - raw).abs() < 1e-3);
        assert!(raw > TWO_POW_32 / 30.0 && raw < TWO_POW_32);

        let expected = -TWO_POW_32 * (1.0 - raw / TWO_POW_32).ln();
        let est = estimate(4, &regs);
        assert!(((est - expected) / expected).abs() < 1e-12);
        assert!(est > raw);
    }

    #[test]
    fn test_estimate_past_hash_space_returns_raw() {
        let mut regs = Registers::new(4);
        for slot in 0..16 {
            regs.update(slot, 60);
        }
        // raw = 0.673 * 2^64, far past 2^32
        let raw = raw_estimate(4, &regs);
        assert!(raw >= TWO_POW_32);
        assert!(((raw - 0.673 * 2f64.powi(64)) / raw).abs() < 1e-12);
        assert_eq!(estimate(4, &regs), raw);
    }
}
