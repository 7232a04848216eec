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

//! Dense register array, one byte per bucket.

/// One byte per register plus a running count of zero registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Registers {
    bytes: Box<[u8]>,
    num_zeros: u32,
}

impl Registers {
    pub fn new(precision: u8) -> Self {
        let m = 1u32 << precision;

        Self {
            bytes: vec![0u8; m as usize].into_boxed_slice(),
            num_zeros: m,
        }
    }

    /// Wraps decoded register bytes, recounting the zero registers.
    pub fn from_bytes(bytes: Box<[u8]>) -> Self {
        let num_zeros = bytes.iter().filter(|&&v| v == 0).count() as u32;
        Self { bytes, num_zeros }
    }

    /// Get value from a slot
    #[cfg(test)]
    pub fn get(&self, slot: usize) -> u8 {
        self.bytes[slot]
    }

    /// Raises a slot to `value` if larger. Returns whether the slot changed.
    #[inline]
    pub fn update(&mut self, slot: usize, value: u8) -> bool {
        let old_value = self.bytes[slot];
        if value <= old_value {
            return false;
        }
        if old_value == 0 {
            self.num_zeros -= 1;
        }
        self.bytes[slot] = value;
        true
    }

    /// Takes the elementwise max with `other`, which must be the same length.
    pub fn merge_max(&mut self, other: &Registers) {
        debug_assert_eq!(self.bytes.len(), other.bytes.len());
        for (slot, &value) in other.bytes.iter().enumerate() {
            self.update(slot, value);
        }
    }

    /// Sum of `2^-v` over all registers.
    pub fn harmonic_sum(&self) -> f64 {
        self.bytes.iter().map(|&v| inv_pow2(v)).sum()
    }

    pub fn num_zeros(&self) -> u32 {
        self.num_zeros
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

fn inv_pow2(value: u8) -> f64 {
    if value <= 63 {
        1.0 / (1u64 << value) as f64
    } else {
        f64::exp2(-(value as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_basic() {
        let regs = Registers::new(10);

        assert_eq!(regs.get(0), 0);
        assert_eq!(regs.get(1023), 0);
        assert_eq!(regs.num_zeros(), 1024);
        assert_eq!(regs.len(), 1024);
        assert_eq!(regs.harmonic_sum(), 1024.0);
    }

    #[test]
    fn test_update_keeps_max() {
        let mut regs = Registers::new(4);

        assert!(regs.update(0, 5));
        assert!(!regs.update(0, 3));
        assert_eq!(regs.get(0), 5);
        assert!(regs.update(0, 42));
        assert_eq!(regs.get(0), 42);
    }

    #[test]
    fn test_num_zeros_tracking() {
        let mut regs = Registers::new(4);
        assert_eq!(regs.num_zeros(), 16);

        regs.update(0, 5);
        assert_eq!(regs.num_zeros(), 15);

        regs.update(0, 10);
        assert_eq!(regs.num_zeros(), 15);

        for slot in 1..16 {
            regs.update(slot, 1);
        }
        assert_eq!(regs.num_zeros(), 0);
        assert_eq!(regs.harmonic_sum(), 7.5 + 1.0 / 1024.0);
    }

    #[test]
    fn test_merge_max_and_from_bytes() {
        let mut a = Registers::new(4);
        let mut b = Registers::new(4);
        a.update(1, 3);
        b.update(1, 2);
        b.update(2, 7);

        a.merge_max(&b);
        assert_eq!(a.get(1), 3);
        assert_eq!(a.get(2), 7);
        assert_eq!(a.num_zeros(), 14);

        let rebuilt = Registers::from_bytes(a.as_slice().to_vec().into_boxed_slice());
        assert_eq!(rebuilt, a);
    }
}
