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

use tracing::debug;
use tracing::trace;

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::family::Family;
use crate::codec::preamble::Preamble;
use crate::codec::preamble::ensure_consumed;
use crate::error::Error;
use crate::hash::HashScheme;
use crate::hash::ItemBytes;
use crate::hll::HyperLogLogBuilder;
use crate::hll::builder::validate_precision;
use crate::hll::estimator;
use crate::hll::registers::Registers;

/// A HyperLogLog sketch.
///
/// See the [hll module level documentation](crate::hll) for more.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperLogLog {
    precision: u8,
    hash_scheme: HashScheme,
    registers: Registers,
}

impl HyperLogLog {
    /// Creates a sketch with `2^precision` registers.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if
    /// `precision` is outside `[4, 18]`.
    pub fn new(precision: u8) -> Result<Self, Error> {
        HyperLogLogBuilder::default().precision(precision).build()
    }

    /// Returns a builder with the default precision.
    pub fn builder() -> HyperLogLogBuilder {
        HyperLogLogBuilder::default()
    }

    pub(super) fn from_parts(precision: u8, hash_scheme: HashScheme) -> Self {
        debug!(precision, ?hash_scheme, "created hyperloglog sketch");
        HyperLogLog {
            precision,
            hash_scheme,
            registers: Registers::new(precision),
        }
    }

    /// Adds an item. Adding the same item again never changes the sketch.
    pub fn add<T: ItemBytes>(&mut self, item: T) {
        let hash = self.hash_scheme.hash64(&item.item_bytes());
        let (slot, rho) = self.slot_and_rank(hash);
        self.registers.update(slot, rho);
    }

    fn slot_and_rank(&self, hash: u64) -> (usize, u8) {
        let slot = (hash & ((1u64 << self.precision) - 1)) as usize;
        let w = hash >> self.precision;
        let rho = if w == 0 {
            64 - self.precision + 1
        } else {
            w.trailing_zeros() as u8 + 1
        };
        (slot, rho)
    }

    /// Estimates the number of distinct items added.
    ///
    /// Uses linear counting while the raw estimate is at most `2.5 m` and some
    /// register is still zero.
    pub fn count(&self) -> f64 {
        estimator::estimate(self.precision, &self.registers)
    }

    /// Estimates the number of distinct items with HLL++ style bias correction.
    ///
    /// More accurate than [`count`](Self::count) for small cardinalities at
    /// precision 14. Never negative.
    pub fn count_bias_corrected(&self) -> f64 {
        estimator::estimate_bias_corrected(self.precision, &self.registers)
    }

    /// Returns the union of two sketches as a new sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleMerge`](crate::error::ErrorKind::IncompatibleMerge)
    /// if precisions or hash schemes differ.
    pub fn merge(&self, other: &HyperLogLog) -> Result<HyperLogLog, Error> {
        let mut merged = self.clone();
        merged.merge_in_place(other)?;
        Ok(merged)
    }

    /// Folds another sketch into this one by taking registerwise maxima.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleMerge`](crate::error::ErrorKind::IncompatibleMerge)
    /// if precisions or hash schemes differ.
    pub fn merge_in_place(&mut self, other: &HyperLogLog) -> Result<(), Error> {
        if self.precision != other.precision || self.hash_scheme != other.hash_scheme {
            return Err(Error::incompatible_merge(
                "cannot merge hyperloglog sketches with different configurations",
            )
            .with_context(
                "precision",
                format!("{} vs {}", self.precision, other.precision),
            )
            .with_context(
                "hash_scheme",
                format!("{:?} vs {:?}", self.hash_scheme, other.hash_scheme),
            ));
        }
        if other.is_empty() {
            trace!("skipped merging empty hyperloglog sketch");
            return Ok(());
        }
        self.registers.merge_max(&other.registers);
        debug!(
            precision = self.precision,
            num_zero_registers = self.registers.num_zeros(),
            "merged hyperloglog sketches"
        );
        Ok(())
    }

    /// Returns the precision.
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Returns the number of registers, `2^precision`.
    pub fn num_registers(&self) -> usize {
        self.registers.len()
    }

    /// Returns the bias constant used by the raw estimator.
    pub fn alpha(&self) -> f64 {
        estimator::alpha(self.precision)
    }

    /// Returns the hash scheme.
    pub fn hash_scheme(&self) -> HashScheme {
        self.hash_scheme
    }

    /// Returns the register values.
    pub fn registers(&self) -> &[u8] {
        self.registers.as_slice()
    }

    /// Returns the number of registers still at zero.
    pub fn num_zero_registers(&self) -> u32 {
        self.registers.num_zeros()
    }

    /// Returns true if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.registers.num_zeros() as usize == self.registers.len()
    }

    /// Returns the relative standard error, `1.04 / sqrt(m)`.
    pub fn relative_error(&self) -> f64 {
        1.04 / (self.num_registers() as f64).sqrt()
    }

    /// Returns the register memory in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.registers.len()
    }

    /// Serializes the sketch to bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::hll::HyperLogLog;
    /// let mut sketch = HyperLogLog::new(8).unwrap();
    /// sketch.add("apple");
    ///
    /// let bytes = sketch.serialize();
    /// assert_eq!(bytes.len(), 16 + 256);
    /// let decoded = HyperLogLog::deserialize(&bytes).unwrap();
    /// assert_eq!(decoded, sketch);
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let family = Family::HLL;
        let is_empty = self.is_empty();
        let payload = if is_empty { 0 } else { self.registers.len() };
        let mut bytes = SketchBytes::with_capacity(family.pre_longs as usize * 8 + payload);

        Preamble {
            hash_scheme_id: self.hash_scheme.id(),
            is_empty,
            param: u16::from(self.precision),
        }
        .write(&family, &mut bytes);
        bytes.write_u64_le(self.hash_scheme.seed());
        if !is_empty {
            bytes.write(self.registers.as_slice());
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`](crate::error::ErrorKind::MalformedDeserializeData)
    /// if the header is invalid, the register payload has the wrong length, or a
    /// register holds a value no hash could produce.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let family = Family::HLL;
        let mut cursor = SketchSlice::new(bytes);
        let preamble = Preamble::read(&family, &mut cursor)?;

        let precision = u8::try_from(preamble.param)
            .ok()
            .filter(|p| validate_precision(*p).is_ok())
            .ok_or_else(|| {
                Error::deserial("precision out of range").with_context("precision", preamble.param)
            })?;
        let seed = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("seed"))?;
        let hash_scheme = HashScheme::from_parts(preamble.hash_scheme_id, seed)?;

        let mut sketch = HyperLogLog {
            precision,
            hash_scheme,
            registers: Registers::new(precision),
        };
        if !preamble.is_empty {
            let mut values = vec![0u8; sketch.registers.len()].into_boxed_slice();
            cursor
                .read_exact(&mut values)
                .map_err(|e| Error::insufficient_data("registers").set_source(e))?;

            let max_rank = 64 - precision + 1;
            if let Some(slot) = values.iter().position(|&v| v > max_rank) {
                return Err(Error::deserial(format!(
                    "register {slot} holds {}, above the maximum rank {max_rank}",
                    values[slot]
                )));
            }
            sketch.registers = Registers::from_bytes(values);
            if sketch.is_empty() {
                return Err(Error::deserial(
                    "non-empty hyperloglog sketch has no registers set",
                ));
            }
        }
        ensure_consumed(&cursor, &family)?;

        debug!(precision, "deserialized hyperloglog sketch");
        Ok(sketch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_slot_and_rank() {
        let sketch = HyperLogLog::new(4).unwrap();

        // low 4 bits pick the slot, the rest give the rank
        assert_eq!(sketch.slot_and_rank(0b1_0011), (3, 1));
        assert_eq!(sketch.slot_and_rank(0b1000_0101), (5, 4));
        assert_eq!(sketch.slot_and_rank(0b1111), (15, 61));
        assert_eq!(sketch.slot_and_rank(u64::MAX), (15, 1));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut once = HyperLogLog::new(10).unwrap();
        let mut many = HyperLogLog::new(10).unwrap();
        once.add("apple");
        for _ in 0..1000 {
            many.add("apple");
        }
        assert_eq!(once, many);
        assert_eq!(once.num_zero_registers(), 1023);
    }

    #[test]
    fn test_empty_sketch() {
        let sketch = HyperLogLog::new(14).unwrap();
        assert!(sketch.is_empty());
        assert_eq!(sketch.count(), 0.0);
        assert_eq!(sketch.count_bias_corrected(), 0.0);
        assert_eq!(sketch.memory_bytes(), 16384);
        assert!((sketch.relative_error() - 0.008125).abs() < 1e-12);
        assert_eq!(sketch.serialize().len(), 16);
    }

    #[test]
    fn test_merge_mismatch() {
        let a = HyperLogLog::new(10).unwrap();
        let b = HyperLogLog::new(11).unwrap();
        let c = HyperLogLog::builder()
            .precision(10)
            .hash_scheme(HashScheme::Murmur3 { seed: 0 })
            .build()
            .unwrap();

        assert_eq!(a.merge(&b).unwrap_err().kind(), ErrorKind::IncompatibleMerge);
        assert_eq!(a.merge(&c).unwrap_err().kind(), ErrorKind::IncompatibleMerge);
    }

    #[test]
    fn test_deserialize_rejects_impossible_rank() {
        let mut sketch = HyperLogLog::new(4).unwrap();
        sketch.add("x");
        let mut bytes = sketch.serialize();
        bytes[16] = 62;

        let err = HyperLogLog::deserialize(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    }

    #[test]
    fn test_deserialize_rejects_zeroed_registers() {
        let mut sketch = HyperLogLog::new(4).unwrap();
        sketch.add("x");
        let mut bytes = sketch.serialize();
        bytes[16..].fill(0);

        assert!(HyperLogLog::deserialize(&bytes).is_err());
    }
}
