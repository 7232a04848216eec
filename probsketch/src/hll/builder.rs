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

use crate::error::Error;
use crate::hash::HashScheme;
use crate::hll::HyperLogLog;

/// Smallest supported precision, 16 registers.
pub const MIN_PRECISION: u8 = 4;
/// Largest supported precision, 262144 registers.
pub const MAX_PRECISION: u8 = 18;
/// Precision used by [`HyperLogLogBuilder::default`].
pub const DEFAULT_PRECISION: u8 = 14;

/// Builder for [`HyperLogLog`] sketches.
///
/// # Examples
///
/// ```
/// # use probsketch::hll::HyperLogLogBuilder;
/// # use probsketch::hash::HashScheme;
/// let sketch = HyperLogLogBuilder::default()
///     .precision(12)
///     .hash_scheme(HashScheme::Murmur3 { seed: 42 })
///     .build()
///     .unwrap();
/// assert_eq!(sketch.num_registers(), 4096);
/// ```
#[derive(Debug, Clone)]
pub struct HyperLogLogBuilder {
    precision: u8,
    hash_scheme: HashScheme,
}

impl Default for HyperLogLogBuilder {
    fn default() -> Self {
        HyperLogLogBuilder {
            precision: DEFAULT_PRECISION,
            hash_scheme: HashScheme::default(),
        }
    }
}

impl HyperLogLogBuilder {
    /// Sets the precision; the sketch keeps `2^precision` registers.
    pub fn precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
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
    /// the precision is outside `[4, 18]`.
    pub fn build(self) -> Result<HyperLogLog, Error> {
        validate_precision(self.precision)?;
        Ok(HyperLogLog::from_parts(self.precision, self.hash_scheme))
    }
}

pub(super) fn validate_precision(precision: u8) -> Result<(), Error> {
    if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
        return Err(Error::invalid_config(format!(
            "precision must be in [{MIN_PRECISION}, {MAX_PRECISION}]"
        ))
        .with_context("precision", precision));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_precision() {
        let sketch = HyperLogLogBuilder::default().build().unwrap();
        assert_eq!(sketch.precision(), DEFAULT_PRECISION);
        assert_eq!(sketch.hash_scheme(), HashScheme::Fnv1aDjb2);
    }

    #[test]
    fn test_precision_bounds() {
        for precision in [0, 3, 19, 64] {
            let err = HyperLogLogBuilder::default()
                .precision(precision)
                .build()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        }
        for precision in MIN_PRECISION..=MAX_PRECISION {
            let sketch = HyperLogLogBuilder::default()
                .precision(precision)
                .build()
                .unwrap();
            assert_eq!(sketch.num_registers(), 1 << precision);
        }
    }
}
