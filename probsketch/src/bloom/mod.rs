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

//! Bloom filter for approximate set membership.
//!
//! A Bloom filter answers "have I seen this item?" with no false negatives and a
//! tunable false positive rate. It is backed by a fixed bitmap of `m` bits and
//! `k` double-hashed indices per item; bits only ever go from 0 to 1.
//!
//! # Usage
//!
//! ```rust
//! use probsketch::bloom::BloomFilter;
//!
//! let mut filter = BloomFilter::new(1000, 0.01).unwrap();
//! for word in ["hello", "world", "algorithm"] {
//!     filter.add(word);
//! }
//!
//! assert!(filter.contains("hello"));
//! assert_eq!(filter.num_bits(), 9586);
//! assert_eq!(filter.num_hashes(), 7);
//! ```
//!
//! # Sizing
//!
//! For `n` expected elements and target rate `p`:
//!
//! - `m = ceil(-n * ln(p) / ln(2)^2)`
//! - `k = ceil(m / n * ln(2))`
//!
//! [`BloomFilterBuilder`] also accepts an explicit bit count and hash count.

mod builder;
mod sketch;

pub use self::builder::BloomFilterBuilder;
pub use self::sketch::BloomFilter;
