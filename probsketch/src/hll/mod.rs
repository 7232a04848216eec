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

//! HyperLogLog sketch for approximate distinct counting.
//!
//! The sketch keeps `m = 2^precision` one-byte registers. Each item is hashed
//! to 64 bits; the low `precision` bits pick a register and the remaining bits
//! contribute the position of their lowest set bit. The relative standard error
//! is about `1.04 / sqrt(m)`, so precision 14 (16 KiB) gives roughly 0.81%.
//!
//! Two estimators are available:
//!
//! - [`HyperLogLog::count`]: the classic estimator with small and large range
//!   corrections.
//! - [`HyperLogLog::count_bias_corrected`]: an HLL++ style estimator that
//!   subtracts an empirical bias for small cardinalities. The bias table is
//!   calibrated for precision 14; other precisions get no bias correction.
//!
//! # Usage
//!
//! ```rust
//! use probsketch::hll::HyperLogLog;
//!
//! let mut sketch = HyperLogLog::new(12).unwrap();
//! for i in 0..10_000u32 {
//!     sketch.add(i);
//! }
//!
//! let estimate = sketch.count();
//! assert!((estimate - 10_000.0).abs() < 10_000.0 * 0.05);
//! ```
//!
//! # Merging
//!
//! Sketches with equal precision and hash scheme merge losslessly: the result
//! is the sketch of the union of both streams.
//!
//! ```rust
//! use probsketch::hll::HyperLogLog;
//!
//! let mut a = HyperLogLog::new(10).unwrap();
//! let mut b = HyperLogLog::new(10).unwrap();
//! a.add("x");
//! b.add("y");
//!
//! let union = a.merge(&b).unwrap();
//! a.merge_in_place(&b).unwrap();
//! assert_eq!(union, a);
//! ```

mod builder;
mod estimator;
mod registers;
mod sketch;

pub use self::builder::HyperLogLogBuilder;
pub use self::builder::MAX_PRECISION;
pub use self::builder::MIN_PRECISION;
pub use self::sketch::HyperLogLog;
