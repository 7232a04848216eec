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

//! Hash family shared by all sketches.
//!
//! Every sketch reduces an item to its canonical bytes (see [`ItemBytes`]) and
//! derives two 64-bit base hashes `h1` and `h2` from them. The `i`-th member of
//! the family is `(h1 + i * h2) mod range` (Kirsch-Mitzenmacher double
//! hashing), so a sketch needing `k` indices never computes more than two real
//! hashes per item.
//!
//! # Usage
//!
//! ```rust
//! use probsketch::hash::HashFamily;
//! use probsketch::hash::HashScheme;
//!
//! let family = HashFamily::from_item(HashScheme::default(), "apple");
//! let first: Vec<u64> = (0..4).map(|i| family.index(i, 1000)).collect();
//! assert!(first.iter().all(|&idx| idx < 1000));
//!
//! // Deterministic for the same item and index.
//! let again = HashFamily::from_item(HashScheme::default(), "apple");
//! assert_eq!(family.index(3, 1000), again.index(3, 1000));
//! ```

mod fnv_djb2;
mod item;
mod murmur;

pub use self::item::ItemBytes;

use crate::error::Error;

const SCHEME_FNV1A_DJB2: u8 = 0;
const SCHEME_MURMUR3: u8 = 1;

/// Selects how the two base hashes of an item are computed.
///
/// Sketches can only be merged with sketches using the same scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashScheme {
    /// FNV-1a and DJB2, each passed through the MurmurHash3 64-bit finalizer.
    #[default]
    Fnv1aDjb2,
    /// The two halves of a seeded MurmurHash3 x64/128.
    Murmur3 {
        /// Seed for the MurmurHash3 state.
        seed: u32,
    },
}

impl HashScheme {
    /// Computes the base hashes `(h1, h2)` of the given bytes.
    pub fn base_hashes(&self, bytes: &[u8]) -> (u64, u64) {
        match self {
            HashScheme::Fnv1aDjb2 => (
                fnv_djb2::fmix64(fnv_djb2::fnv1a_64(bytes)),
                fnv_djb2::fmix64(fnv_djb2::djb2_64(bytes)),
            ),
            HashScheme::Murmur3 { seed } => murmur::murmur3_x64_128(bytes, *seed),
        }
    }

    /// Computes a single well-mixed 64-bit hash of the given bytes.
    ///
    /// This is `h1` of [`base_hashes`](Self::base_hashes) without paying for `h2`.
    pub fn hash64(&self, bytes: &[u8]) -> u64 {
        match self {
            HashScheme::Fnv1aDjb2 => fnv_djb2::fmix64(fnv_djb2::fnv1a_64(bytes)),
            HashScheme::Murmur3 { seed } => murmur::murmur3_x64_128(bytes, *seed).0,
        }
    }

    pub(crate) fn id(&self) -> u8 {
        match self {
            HashScheme::Fnv1aDjb2 => SCHEME_FNV1A_DJB2,
            HashScheme::Murmur3 { .. } => SCHEME_MURMUR3,
        }
    }

    pub(crate) fn seed(&self) -> u64 {
        match self {
            HashScheme::Fnv1aDjb2 => 0,
            HashScheme::Murmur3 { seed } => u64::from(*seed),
        }
    }

    /// Rebuilds a scheme from its serialized id and seed.
    pub(crate) fn from_parts(id: u8, seed: u64) -> Result<Self, Error> {
        match id {
            SCHEME_FNV1A_DJB2 if seed == 0 => Ok(HashScheme::Fnv1aDjb2),
            SCHEME_FNV1A_DJB2 => Err(Error::deserial(format!(
                "FNV-1a/DJB2 scheme carries no seed, got {seed}"
            ))),
            SCHEME_MURMUR3 => u32::try_from(seed)
                .map(|seed| HashScheme::Murmur3 { seed })
                .map_err(|_| Error::deserial(format!("murmur3 seed out of range: {seed}"))),
            _ => Err(Error::deserial(format!("unknown hash scheme: {id}"))),
        }
    }
}

/// The indexed hash family `h_i(x) = (h1 + i * h2) mod range` of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashFamily {
    h1: u64,
    h2: u64,
}

impl HashFamily {
    /// Derives the family from raw bytes.
    pub fn new(scheme: HashScheme, bytes: &[u8]) -> Self {
        let (h1, h2) = scheme.base_hashes(bytes);
        Self { h1, h2 }
    }

    /// Derives the family from any byte-encodable item.
    pub fn from_item<T: ItemBytes>(scheme: HashScheme, item: T) -> Self {
        Self::new(scheme, &item.item_bytes())
    }

    /// First base hash.
    pub fn h1(&self) -> u64 {
        self.h1
    }

    /// Second base hash.
    pub fn h2(&self) -> u64 {
        self.h2
    }

    /// Returns the `i`-th hash reduced into `[0, range)`.
    ///
    /// Every sketch fixes a non-zero `range` at construction.
    ///
    /// # Panics
    ///
    /// Panics if `range` is 0.
    #[inline]
    pub fn index(&self, i: u64, range: u64) -> u64 {
        self.h1.wrapping_add(i.wrapping_mul(self.h2)) % range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_double_hashing() {
        let family = HashFamily::new(HashScheme::Fnv1aDjb2, b"hello");
        let range = 9_586;
        for i in 0..7u64 {
            let expected = family.h1().wrapping_add(i.wrapping_mul(family.h2())) % range;
            assert_eq!(family.index(i, range), expected);
        }
        assert_eq!(family.index(0, range), family.h1() % range);
    }

    #[test]
    fn test_schemes_differ() {
        let fnv = HashFamily::new(HashScheme::Fnv1aDjb2, b"hello");
        let murmur = HashFamily::new(HashScheme::Murmur3 { seed: 0 }, b"hello");
        let seeded = HashFamily::new(HashScheme::Murmur3 { seed: 9001 }, b"hello");
        assert_ne!(fnv, murmur);
        assert_ne!(murmur, seeded);
    }

    #[test]
    fn test_hash64_matches_h1() {
        for scheme in [HashScheme::Fnv1aDjb2, HashScheme::Murmur3 { seed: 7 }] {
            assert_eq!(scheme.hash64(b"item_42"), scheme.base_hashes(b"item_42").0);
        }
    }

    #[test]
    fn test_parts_round_trip() {
        for scheme in [HashScheme::Fnv1aDjb2, HashScheme::Murmur3 { seed: u32::MAX }] {
            let rebuilt = HashScheme::from_parts(scheme.id(), scheme.seed()).unwrap();
            assert_eq!(rebuilt, scheme);
        }
        assert!(HashScheme::from_parts(SCHEME_MURMUR3, u64::from(u32::MAX) + 1).is_err());
        assert!(HashScheme::from_parts(SCHEME_FNV1A_DJB2, 5).is_err());
        assert!(HashScheme::from_parts(9, 0).is_err());
    }

    #[test]
    fn test_indices_spread_over_range() {
        let range = 64u64;
        let mut seen = [false; 64];
        for n in 0..2_000u32 {
            let family = HashFamily::from_item(HashScheme::default(), n);
            seen[family.index(1, range) as usize] = true;
        }
        assert!(seen.iter().all(|&hit| hit));
    }

    #[test]
    #[should_panic]
    fn test_index_panics_on_empty_range() {
        let family = HashFamily::new(HashScheme::Fnv1aDjb2, b"hello");
        let _ = family.index(0, 0);
    }
}
