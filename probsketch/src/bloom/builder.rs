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

use std::f64::consts::LN_2;

use crate::bloom::BloomFilter;
use crate::error::Error;
use crate::hash::HashScheme;

/// Upper bound on the bitmap size, 4 GiB of bits.
pub(super) const MAX_NUM_BITS: u64 = 1 << 35;

#[derive(Debug, Clone, Copy)]
enum Sizing {
    Accuracy {
        expected_elements: u64,
        false_positive_rate: f64,
    },
    Size {
        num_bits: u64,
        num_hashes: u16,
    },
}

/// Builder for creating [`BloomFilter`] instances.
///
/// Provides two construction modes:
/// - [`with_accuracy()`](Self::with_accuracy): Specify target items and false positive rate
///   (recommended)
/// - [`with_size()`](Self::with_size): Specify exact bit count and hash functions (manual)
///
/// Parameters are validated by [`build()`](Self::build).
#[derive(Debug, Clone)]
pub struct BloomFilterBuilder {
    sizing: Sizing,
    hash_scheme: HashScheme,
}

impl BloomFilterBuilder {
    /// Creates a builder with optimal parameters for a target accuracy.
    ///
    /// Automatically calculates the optimal number of bits and hash functions
    /// to achieve the desired false positive rate for the given number of items.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::bloom::BloomFilterBuilder;
    /// let filter = BloomFilterBuilder::with_accuracy(10_000, 0.01).build().unwrap();
    /// assert_eq!(filter.num_bits(), 95_851);
    /// assert_eq!(filter.num_hashes(), 7);
    /// ```
    pub fn with_accuracy(expected_elements: u64, false_positive_rate: f64) -> Self {
        BloomFilterBuilder {
            sizing: Sizing::Accuracy {
                expected_elements,
                false_positive_rate,
            },
            hash_scheme: HashScheme::default(),
        }
    }

    /// Creates a builder with manual size specification.
    ///
    /// Use this when you need precise control over the filter size.
    /// The filter records 0 for its expected element count and target rate.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::bloom::BloomFilterBuilder;
    /// let filter = BloomFilterBuilder::with_size(10_000, 7).build().unwrap();
    /// assert_eq!(filter.num_bits(), 10_000);
    /// assert_eq!(filter.expected_elements(), 0);
    /// ```
    pub fn with_size(num_bits: u64, num_hashes: u16) -> Self {
        BloomFilterBuilder {
            sizing: Sizing::Size {
                num_bits,
                num_hashes,
            },
            hash_scheme: HashScheme::default(),
        }
    }

    /// Sets the hash scheme.
    ///
    /// Filters can only be merged with filters built on the same scheme.
    pub fn hash_scheme(mut self, hash_scheme: HashScheme) -> Self {
        self.hash_scheme = hash_scheme;
        self
    }

    /// Builds the Bloom filter.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if:
    /// - `expected_elements` is 0 or `false_positive_rate` is not in `(0, 1)`
    /// - `num_bits` is 0 or exceeds the maximum
    /// - `num_hashes` is 0 or the derived hash count exceeds `u16::MAX`
    pub fn build(self) -> Result<BloomFilter, Error> {
        match self.sizing {
            Sizing::Accuracy {
                expected_elements,
                false_positive_rate,
            } => {
                if expected_elements == 0 {
                    return Err(Error::invalid_config("expected_elements must be at least 1"));
                }
                if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
                    return Err(Error::invalid_config(format!(
                        "false_positive_rate must be in (0, 1), got {false_positive_rate}"
                    )));
                }
                let num_bits = Self::suggest_num_bits(expected_elements, false_positive_rate);
                if num_bits > MAX_NUM_BITS {
                    return Err(Error::invalid_config(format!(
                        "requested accuracy needs {num_bits} bits, more than {MAX_NUM_BITS}"
                    ))
                    .with_context("expected_elements", expected_elements)
                    .with_context("false_positive_rate", false_positive_rate));
                }
                let num_hashes = Self::suggest_num_hashes(expected_elements, num_bits);
                let num_hashes = u16::try_from(num_hashes).map_err(|_| {
                    Error::invalid_config(format!("{num_hashes} hash functions exceed u16"))
                })?;
                Self::validate_size(num_bits, num_hashes)?;
                Ok(BloomFilter::from_parts(
                    self.hash_scheme,
                    num_bits,
                    num_hashes,
                    expected_elements,
                    false_positive_rate,
                ))
            }
            Sizing::Size {
                num_bits,
                num_hashes,
            } => {
                Self::validate_size(num_bits, num_hashes)?;
                Ok(BloomFilter::from_parts(
                    self.hash_scheme,
                    num_bits,
                    num_hashes,
                    0,
                    0.0,
                ))
            }
        }
    }

    /// Suggests the optimal number of bits for the given items and false positive rate.
    ///
    /// Uses the formula: `m = ceil(-n * ln(p) / ln(2)^2)`
    pub fn suggest_num_bits(expected_elements: u64, false_positive_rate: f64) -> u64 {
        let n = expected_elements as f64;
        let bits = (-n * false_positive_rate.ln() / (LN_2 * LN_2)).ceil();
        // the float to int cast saturates
        (bits as u64).max(1)
    }

    /// Suggests the optimal number of hash functions for the given items and bit count.
    ///
    /// Uses the formula: `k = ceil((m/n) * ln(2))`
    pub fn suggest_num_hashes(expected_elements: u64, num_bits: u64) -> u64 {
        let k = (num_bits as f64 / expected_elements as f64 * LN_2).ceil();
        (k as u64).max(1)
    }

    pub(super) fn validate_size(num_bits: u64, num_hashes: u16) -> Result<(), Error> {
        if num_bits == 0 || num_bits > MAX_NUM_BITS {
            return Err(Error::invalid_config(format!(
                "num_bits must be in [1, {MAX_NUM_BITS}], got {num_bits}"
            )));
        }
        if num_hashes == 0 {
            return Err(Error::invalid_config("num_hashes must be at least 1"));
        }
        Ok(())
    }
}
