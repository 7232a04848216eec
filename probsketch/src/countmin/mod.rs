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

//! Count-Min sketch implementation for frequency estimation.
//!
//! The Count-Min sketch provides approximate frequency counts for streaming data
//! with configurable relative error and confidence bounds. Estimates never fall
//! below the true count; with probability at least `1 - delta` they exceed it by
//! at most `epsilon * total_count`.
//!
//! # Usage
//!
//! ```rust
//! use probsketch::countmin::CountMinSketch;
//!
//! let mut sketch = CountMinSketch::new(0.01, 0.01).unwrap();
//! assert_eq!(sketch.width(), 272);
//! assert_eq!(sketch.depth(), 5);
//!
//! sketch.add("apple");
//! sketch.add_count("banana", 3);
//!
//! let banana = sketch.estimate("banana");
//! assert!(banana >= 3);
//! assert!(sketch.lower_bound("banana") <= 3);
//! ```
//!
//! # Configuration Helpers
//!
//! ```rust
//! use probsketch::countmin::CountMinSketchBuilder;
//!
//! let width = CountMinSketchBuilder::suggest_width(0.001);
//! let depth = CountMinSketchBuilder::suggest_depth(0.001);
//!
//! let sketch = CountMinSketchBuilder::with_dimensions(depth, width)
//!     .build()
//!     .unwrap();
//! assert_eq!(sketch.width(), 2719);
//! ```

mod builder;
mod sketch;

pub use self::builder::CountMinSketchBuilder;
pub use self::sketch::CountMinSketch;
pub use self::sketch::HeavyHitter;
