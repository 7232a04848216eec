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

//! Probabilistic sketches for streaming data.
//!
//! This crate provides three mergeable, fixed-size summaries:
//!
//! - [`bloom::BloomFilter`]: approximate set membership with no false negatives.
//! - [`countmin::CountMinSketch`]: approximate frequencies that never underestimate.
//! - [`hll::HyperLogLog`]: approximate distinct counts.
//!
//! All of them index their storage through a shared double hashing family (see
//! [`hash`]), validate their parameters once at construction, and never fail
//! on the update and query hot paths. Each can be serialized to a compact byte
//! layout and restored; malformed input is rejected rather than repaired.
//!
//! The crate emits [`tracing`] events on construction, merge and
//! deserialization. It never installs a subscriber.

pub mod bloom;
pub mod countmin;
pub mod error;
pub mod hash;
pub mod hll;

mod codec;
