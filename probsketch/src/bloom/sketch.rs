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

use crate::bloom::BloomFilterBuilder;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::family::Family;
use crate::codec::preamble::Preamble;
use crate::codec::preamble::ensure_consumed;
use crate::error::Error;
use crate::hash::HashFamily;
use crate::hash::HashScheme;
use crate::hash::ItemBytes;

/// A Bloom filter for probabilistic set membership testing.
///
/// Provides fast membership queries with:
/// - No false negatives (added items always return `true`)
/// - Tunable false positive rate
/// - Constant space usage
///
/// There is no removal: clearing a bit could hide another item that shares it.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomFilter {
    hash_scheme: HashScheme,
    /// Number of hash functions to use (k)
    num_hashes: u16,
    /// Total number of bits in the filter (m)
    num_bits: u64,
    /// Sizing inputs, both zero when sized manually
    expected_elements: u64,
    target_fpr: f64,
    /// Number of `add` calls, diagnostic only
    elements_added: u64,
    /// Count of bits set to 1
    bits_set: u64,
    /// Bit array packed into u64 words, `ceil(num_bits / 64)` long
    bit_array: Vec<u64>,
}

impl BloomFilter {
    /// Creates a filter sized for `expected_elements` items at `false_positive_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if
    /// `expected_elements` is 0, the rate is not in `(0, 1)`, or the derived bitmap is
    /// too large.
    ///
    /// # Examples
    ///
    /// ```
    /// use probsketch::bloom::BloomFilter;
    ///
    /// let filter = BloomFilter::new(10_000, 0.01).unwrap();
    /// assert_eq!(filter.memory_bytes(), 11_982);
    ///
    /// assert!(BloomFilter::new(0, 0.01).is_err());
    /// assert!(BloomFilter::new(100, 1.0).is_err());
    /// ```
    pub fn new(expected_elements: u64, false_positive_rate: f64) -> Result<Self, Error> {
        BloomFilterBuilder::with_accuracy(expected_elements, false_positive_rate).build()
    }

    /// Returns a builder sized for a target accuracy.
    pub fn builder(expected_elements: u64, false_positive_rate: f64) -> BloomFilterBuilder {
        BloomFilterBuilder::with_accuracy(expected_elements, false_positive_rate)
    }

    pub(super) fn from_parts(
        hash_scheme: HashScheme,
        num_bits: u64,
        num_hashes: u16,
        expected_elements: u64,
        target_fpr: f64,
    ) -> Self {
        debug!(
            num_bits,
            num_hashes,
            expected_elements,
            target_fpr,
            "created bloom filter"
        );
        BloomFilter {
            hash_scheme,
            num_hashes,
            num_bits,
            expected_elements,
            target_fpr,
            elements_added: 0,
            bits_set: 0,
            bit_array: vec![0u64; num_bits.div_ceil(64) as usize],
        }
    }

    // ========================================================================
    // Update Operations
    // ========================================================================

    /// Adds an item to the filter.
    ///
    /// After this call `contains(item)` returns `true` forever.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100, 0.01).unwrap();
    ///
    /// filter.add("apple");
    /// filter.add(42_u64);
    /// filter.add(&[1u8, 2, 3]);
    ///
    /// assert!(filter.contains("apple"));
    /// assert!(filter.contains("42"));
    /// ```
    pub fn add<T: ItemBytes>(&mut self, item: T) {
        let family = HashFamily::from_item(self.hash_scheme, item);
        self.set_bits(&family);
        self.elements_added = self.elements_added.saturating_add(1);
    }

    /// Tests and adds an item in a single pass.
    ///
    /// Returns whether the item was possibly present before this call.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100, 0.01).unwrap();
    ///
    /// assert!(!filter.contains_and_add("apple"));
    /// assert!(filter.contains_and_add("apple"));
    /// ```
    pub fn contains_and_add<T: ItemBytes>(&mut self, item: T) -> bool {
        let family = HashFamily::from_item(self.hash_scheme, item);
        let was_present = self.check_bits(&family);
        self.set_bits(&family);
        self.elements_added = self.elements_added.saturating_add(1);
        was_present
    }

    /// Merges another filter into this one via bitwise OR.
    ///
    /// The result recognizes every item added to either filter. `elements_added`
    /// becomes the sum of both counters.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleMerge`](crate::error::ErrorKind::IncompatibleMerge)
    /// unless both filters have the same bit count, hash count and hash scheme.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::bloom::BloomFilter;
    /// let mut f1 = BloomFilter::new(100, 0.01).unwrap();
    /// let mut f2 = BloomFilter::new(100, 0.01).unwrap();
    /// f1.add("a");
    /// f2.add("b");
    ///
    /// f1.merge(&f2).unwrap();
    /// assert!(f1.contains("a"));
    /// assert!(f1.contains("b"));
    ///
    /// let other = BloomFilter::new(5000, 0.01).unwrap();
    /// assert!(f1.merge(&other).is_err());
    /// ```
    pub fn merge(&mut self, other: &BloomFilter) -> Result<(), Error> {
        if !self.is_compatible(other) {
            return Err(Error::incompatible_merge("cannot merge incompatible bloom filters")
                .with_context("num_bits", format!("{} vs {}", self.num_bits, other.num_bits))
                .with_context(
                    "num_hashes",
                    format!("{} vs {}", self.num_hashes, other.num_hashes),
                )
                .with_context(
                    "hash_scheme",
                    format!("{:?} vs {:?}", self.hash_scheme, other.hash_scheme),
                ));
        }

        for (word, other_word) in self.bit_array.iter_mut().zip(&other.bit_array) {
            *word |= *other_word;
        }
        self.recount_bits_set();
        self.elements_added = self.elements_added.saturating_add(other.elements_added);
        debug!(
            bits_set = self.bits_set,
            elements_added = self.elements_added,
            "merged bloom filters"
        );
        Ok(())
    }

    // ========================================================================
    // Query Operations
    // ========================================================================

    /// Tests whether an item is possibly in the set.
    ///
    /// Returns:
    /// - `true`: Item was **possibly** added (or false positive)
    /// - `false`: Item was **definitely not** added
    pub fn contains<T: ItemBytes>(&self, item: T) -> bool {
        if self.is_empty() {
            return false;
        }
        let family = HashFamily::from_item(self.hash_scheme, item);
        self.check_bits(&family)
    }

    // ========================================================================
    // Statistics and Properties
    // ========================================================================

    /// Returns whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits_set == 0
    }

    /// Returns the number of bits set to 1.
    pub fn bits_set(&self) -> u64 {
        self.bits_set
    }

    /// Returns the total number of bits in the filter (m).
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Returns the number of hash functions used (k).
    pub fn num_hashes(&self) -> u16 {
        self.num_hashes
    }

    /// Returns how many times `add` was called, including duplicates.
    pub fn elements_added(&self) -> u64 {
        self.elements_added
    }

    /// Returns the element count the filter was sized for, 0 if sized manually.
    pub fn expected_elements(&self) -> u64 {
        self.expected_elements
    }

    /// Returns the false positive rate the filter was sized for, 0 if sized manually.
    pub fn target_fpr(&self) -> f64 {
        self.target_fpr
    }

    /// Returns the hash scheme.
    pub fn hash_scheme(&self) -> HashScheme {
        self.hash_scheme
    }

    /// Returns the fraction of bits set.
    ///
    /// Values near 0.5 indicate the filter is at its designed capacity.
    pub fn fill_ratio(&self) -> f64 {
        self.bits_set as f64 / self.num_bits as f64
    }

    /// Estimates the current false positive probability.
    ///
    /// Based on the formula: `(1 - e^(-k*n/m))^k` with n = `elements_added`.
    /// Duplicate adds inflate n, so this is an upper-leaning diagnostic.
    pub fn estimated_fpr(&self) -> f64 {
        let k = self.num_hashes as f64;
        let n = self.elements_added as f64;
        let m = self.num_bits as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    /// Returns the bitmap size in bytes, `ceil(m / 8)`.
    pub fn memory_bytes(&self) -> u64 {
        self.num_bits.div_ceil(8)
    }

    /// Checks if two filters can be merged.
    ///
    /// Filters are compatible if they have the same:
    /// - Number of bits
    /// - Number of hash functions
    /// - Hash scheme
    pub fn is_compatible(&self, other: &BloomFilter) -> bool {
        self.num_bits == other.num_bits
            && self.num_hashes == other.num_hashes
            && self.hash_scheme == other.hash_scheme
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Serializes the filter to a byte vector.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::bloom::BloomFilter;
    /// let mut filter = BloomFilter::new(100, 0.01).unwrap();
    /// filter.add("test");
    ///
    /// let bytes = filter.serialize();
    /// let restored = BloomFilter::deserialize(&bytes).unwrap();
    /// assert!(restored.contains("test"));
    /// assert_eq!(restored, filter);
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let family = Family::BLOOMFILTER;
        let is_empty = self.is_empty();
        let capacity = 8 * family.pre_longs as usize
            + if is_empty {
                0
            } else {
                self.bit_array.len() * 8
            };
        let mut bytes = SketchBytes::with_capacity(capacity);

        Preamble {
            hash_scheme_id: self.hash_scheme.id(),
            is_empty,
            param: self.num_hashes,
        }
        .write(&family, &mut bytes);
        bytes.write_u64_le(self.hash_scheme.seed());
        bytes.write_u64_le(self.expected_elements);
        bytes.write_f64_le(self.target_fpr);
        bytes.write_u64_le(self.num_bits);
        bytes.write_u64_le(self.elements_added);

        if !is_empty {
            for &word in &self.bit_array {
                bytes.write_u64_le(word);
            }
        }

        bytes.into_bytes()
    }

    /// Deserializes a filter from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`](crate::error::ErrorKind::MalformedDeserializeData)
    /// if:
    /// - The data is truncated or has trailing bytes
    /// - The family ID doesn't match (not a Bloom filter)
    /// - The serial version is unsupported
    /// - The parameters are out of range or bits are set past `num_bits`
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let family = Family::BLOOMFILTER;
        let mut cursor = SketchSlice::new(bytes);
        let preamble = Preamble::read(&family, &mut cursor)?;

        let num_hashes = preamble.param;
        if num_hashes == 0 {
            return Err(Error::deserial("num_hashes must be at least 1"));
        }
        let seed = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("seed"))?;
        let hash_scheme = HashScheme::from_parts(preamble.hash_scheme_id, seed)?;
        let expected_elements = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("expected_elements"))?;
        let target_fpr = cursor
            .read_f64_le()
            .map_err(|_| Error::insufficient_data("target_fpr"))?;
        let num_bits = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("num_bits"))?;
        let elements_added = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("elements_added"))?;

        BloomFilterBuilder::validate_size(num_bits, num_hashes).map_err(|err| {
            Error::deserial(format!("invalid bloom filter size: {}", err.message()))
        })?;
        let sized_manually = expected_elements == 0 && target_fpr == 0.0;
        let sized_by_accuracy =
            expected_elements > 0 && target_fpr > 0.0 && target_fpr < 1.0;
        if !sized_manually && !sized_by_accuracy {
            return Err(Error::deserial(format!(
                "invalid sizing parameters: expected_elements={expected_elements}, target_fpr={target_fpr}"
            )));
        }

        let num_words = num_bits.div_ceil(64) as usize;
        if !preamble.is_empty && cursor.remaining() < num_words * 8 {
            return Err(Error::insufficient_data("bit_array"));
        }

        let mut filter = BloomFilter {
            hash_scheme,
            num_hashes,
            num_bits,
            expected_elements,
            target_fpr,
            elements_added,
            bits_set: 0,
            bit_array: vec![0u64; num_words],
        };

        if preamble.is_empty {
            if elements_added != 0 {
                return Err(Error::deserial(
                    "empty bloom filter cannot have elements added",
                ));
            }
        } else {
            for word in &mut filter.bit_array {
                *word = cursor
                    .read_u64_le()
                    .map_err(|e| Error::insufficient_data("bit_array").set_source(e))?;
            }
            let excess_bits = num_bits % 64;
            let last = filter.bit_array.last().copied().unwrap_or(0);
            if excess_bits != 0 && last >> excess_bits != 0 {
                return Err(Error::deserial("bits set past num_bits"));
            }
            filter.recount_bits_set();
            if filter.bits_set == 0 {
                return Err(Error::deserial(
                    "non-empty bloom filter has no bits set",
                ));
            }
        }
        ensure_consumed(&cursor, &family)?;

        debug!(
            num_bits,
            num_hashes,
            bits_set = filter.bits_set,
            "deserialized bloom filter"
        );
        Ok(filter)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    /// Checks if all k bits are set for the given hash family.
    fn check_bits(&self, family: &HashFamily) -> bool {
        (0..u64::from(self.num_hashes)).all(|i| self.get_bit(family.index(i, self.num_bits)))
    }

    /// Sets all k bits for the given hash family.
    fn set_bits(&mut self, family: &HashFamily) {
        for i in 0..u64::from(self.num_hashes) {
            let bit_index = family.index(i, self.num_bits);
            self.set_bit(bit_index);
        }
    }

    /// Gets the value of a single bit.
    fn get_bit(&self, bit_index: u64) -> bool {
        let word_index = (bit_index / 64) as usize;
        let mask = 1u64 << (bit_index % 64);
        (self.bit_array[word_index] & mask) != 0
    }

    /// Sets a single bit and updates the count if it wasn't already set.
    fn set_bit(&mut self, bit_index: u64) {
        let word_index = (bit_index / 64) as usize;
        let mask = 1u64 << (bit_index % 64);

        if (self.bit_array[word_index] & mask) == 0 {
            self.bit_array[word_index] |= mask;
            self.bits_set += 1;
        }
    }

    /// Recounts all set bits (used after merge and deserialization).
    fn recount_bits_set(&mut self) {
        self.bits_set = self
            .bit_array
            .iter()
            .map(|word| u64::from(word.count_ones()))
            .sum();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bloom::builder::MAX_NUM_BITS;
    use crate::error::ErrorKind;

    #[test]
    fn test_add_and_contains() {
        let mut filter = BloomFilter::new(100, 0.01).unwrap();

        assert!(!filter.contains("apple"));
        filter.add("apple");
        assert!(filter.contains("apple"));
        assert!(!filter.is_empty());
        assert_eq!(filter.elements_added(), 1);
        assert!(filter.bits_set() <= u64::from(filter.num_hashes()));
    }

    #[test]
    fn test_contains_and_add() {
        let mut filter = BloomFilter::new(100, 0.01).unwrap();

        assert!(!filter.contains_and_add(42_u64));
        assert!(filter.contains_and_add(42_u64));
        assert_eq!(filter.elements_added(), 2);
    }

    #[test]
    fn test_statistics() {
        let mut filter = BloomFilter::builder(100, 0.01).build().unwrap();
        assert_eq!(filter.bits_set(), 0);
        assert_eq!(filter.fill_ratio(), 0.0);
        assert_eq!(filter.estimated_fpr(), 0.0);

        filter.add("test");
        assert!(filter.bits_set() > 0);
        assert!(filter.fill_ratio() > 0.0);
        assert!(filter.estimated_fpr() > 0.0);
    }

    #[test]
    fn test_estimated_fpr_at_design_capacity() {
        let mut filter = BloomFilter::new(1000, 0.01).unwrap();
        for i in 0..1000u32 {
            filter.add(i);
        }
        let fpr = filter.estimated_fpr();
        assert!(fpr > 0.005 && fpr < 0.015, "estimated fpr {fpr}");
    }

    #[test]
    fn test_merge_sums_elements() {
        let mut f1 = BloomFilter::new(100, 0.01).unwrap();
        let mut f2 = BloomFilter::new(100, 0.01).unwrap();
        f1.add("a");
        f2.add("b");
        f2.add("c");

        f1.merge(&f2).unwrap();
        assert_eq!(f1.elements_added(), 3);
        for item in ["a", "b", "c"] {
            assert!(f1.contains(item));
        }
    }

    #[test]
    fn test_merge_rejects_other_scheme() {
        let mut f1 = BloomFilter::new(100, 0.01).unwrap();
        let f2 = BloomFilter::builder(100, 0.01)
            .hash_scheme(HashScheme::Murmur3 { seed: 1 })
            .build()
            .unwrap();

        assert!(!f1.is_compatible(&f2));
        let err = f1.merge(&f2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleMerge);
    }

    #[test]
    fn test_serialize_deserialize_empty() {
        let filter = BloomFilter::new(100, 0.01).unwrap();
        let bytes = filter.serialize();
        assert_eq!(bytes.len(), 48);
        let restored = BloomFilter::deserialize(&bytes).unwrap();

        assert_eq!(filter, restored);
    }

    #[test]
    fn test_deserialize_rejects_stray_high_bits() {
        let mut filter = BloomFilterBuilder::with_size(100, 3).build().unwrap();
        filter.add("x");
        let mut bytes = filter.serialize();
        // last word covers bits 64..128 but only 64..100 are in range
        let last = bytes.len() - 1;
        bytes[last] |= 0x80;

        let err = BloomFilter::deserialize(&bytes).unwrap_err();
        assert!(err.message().contains("past num_bits"));
    }

    #[test]
    fn test_deserialize_rejects_truncated_huge_bitmap() {
        let mut filter = BloomFilterBuilder::with_size(64, 3).build().unwrap();
        filter.add("x");
        let mut bytes = filter.serialize();
        // header claims the largest bitmap but no payload follows
        bytes[32..40].copy_from_slice(&MAX_NUM_BITS.to_le_bytes());
        bytes.truncate(48);

        let err = BloomFilter::deserialize(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
        assert!(err.message().contains("bit_array"));
    }
}
