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

use std::f64::consts::E;

use crate::countmin::CountMinSketch;
use crate::error::Error;
use crate::hash::HashScheme;

/// Smallest width [`suggest_width`](CountMinSketchBuilder::suggest_width) returns.
pub const MIN_WIDTH: u32 = 100;
/// Smallest depth [`suggest_depth`](CountMinSketchBuilder::suggest_depth) returns.
pub const MIN_DEPTH: u32 = 3;
/// Upper bound on `depth * width`, 8 GiB of counters.
pub(super) const MAX_NUM_CELLS: u64 = 1 << 30;

#[derive(Debug, Clone, Copy)]
enum Sizing {
    ErrorBounds { epsilon: f64, delta: f64 },
    Dimensions { depth: u32, width: u32 },
}

/// Builder for creating [`CountMinSketch`] instances.
///
/// # Examples
///
/// ```
/// # use probsketch::countmin::CountMinSketchBuilder;
/// # use probsketch::hash::HashScheme;
/// let sketch = CountMinSketchBuilder::with_error_bounds(0.1, 0.05)
///     .hash_scheme(HashScheme::Murmur3 { seed: 9001 })
///     .build()
///     .unwrap();
///
/// // both dimensions are raised to their minimums
/// assert_eq!(sketch.width(), 100);
/// assert_eq!(sketch.depth(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct CountMinSketchBuilder {
    sizing: Sizing,
    hash_scheme: HashScheme,
}

impl CountMinSketchBuilder {
    /// Sizes the sketch so that, with probability `1 - delta`, every estimate
    /// overshoots by at most `epsilon * total_count`.
    pub fn with_error_bounds(epsilon: f64, delta: f64) -> Self {
        CountMinSketchBuilder {
            sizing: Sizing::ErrorBounds { epsilon, delta },
            hash_scheme: HashScheme::default(),
        }
    }

    /// Uses explicit dimensions.
    ///
    /// The minimums do not apply here. Epsilon and delta are derived back as
    /// `e / width` and `e^-depth`.
    pub fn with_dimensions(depth: u32, width: u32) -> Self {
        CountMinSketchBuilder {
            sizing: Sizing::Dimensions { depth, width },
            hash_scheme: HashScheme::default(),
        }
    }

    /// Sets the hash scheme.
    pub fn hash_scheme(mut self, hash_scheme: HashScheme) -> Self {
        self.hash_scheme = hash_scheme;
        self
    }

    /// Builds the sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if
    /// `epsilon` is not positive and finite, `delta` is not in `(0, 1)`, a dimension
    /// is zero, or the counter matrix would be too large.
    pub fn build(self) -> Result<CountMinSketch, Error> {
        let (depth, width, epsilon, delta) = match self.sizing {
            Sizing::ErrorBounds { epsilon, delta } => {
                if !(epsilon > 0.0 && epsilon.is_finite()) {
                    return Err(Error::invalid_config(format!(
                        "epsilon must be positive and finite, got {epsilon}"
                    )));
                }
                if !(delta > 0.0 && delta < 1.0) {
                    return Err(Error::invalid_config(format!(
                        "delta must be in (0, 1), got {delta}"
                    )));
                }
                let width = Self::checked_width(epsilon)?;
                (Self::suggest_depth(delta), width, epsilon, delta)
            }
            Sizing::Dimensions { depth, width } => (
                depth,
                width,
                E / f64::from(width),
                (-f64::from(depth)).exp(),
            ),
        };
        Self::validate_dimensions(depth, width)?;
        Ok(CountMinSketch::from_parts(
            self.hash_scheme,
            depth,
            width,
            epsilon,
            delta,
        ))
    }

    /// Suggests the row width for a relative error, `max(ceil(e / epsilon), 100)`.
    ///
    /// Saturates at `u32::MAX` for tiny `epsilon`.
    pub fn suggest_width(epsilon: f64) -> u32 {
        let width = (E / epsilon).ceil();
        (width as u32).max(MIN_WIDTH)
    }

    /// Suggests the row count for a failure probability, `max(ceil(ln(1 / delta)), 3)`.
    pub fn suggest_depth(delta: f64) -> u32 {
        let depth = (1.0 / delta).ln().ceil();
        (depth as u32).max(MIN_DEPTH)
    }

    fn checked_width(epsilon: f64) -> Result<u32, Error> {
        let width = (E / epsilon).ceil();
        if width > f64::from(u32::MAX) {
            return Err(
                Error::invalid_config("epsilon too small").with_context("epsilon", epsilon)
            );
        }
        Ok(Self::suggest_width(epsilon))
    }

    pub(super) fn validate_dimensions(depth: u32, width: u32) -> Result<(), Error> {
        if depth == 0 || width == 0 {
            return Err(Error::invalid_config(format!(
                "depth and width must be at least 1, got {depth} x {width}"
            )));
        }
        let cells = u64::from(depth) * u64::from(width);
        if cells > MAX_NUM_CELLS {
            return Err(Error::invalid_config(format!(
                "{depth} x {width} counters exceed the limit of {MAX_NUM_CELLS}"
            )));
        }
        Ok(())
    }
}
