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

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::family::Family;
use crate::codec::preamble::Preamble;
use crate::codec::preamble::ensure_consumed;
use crate::countmin::CountMinSketchBuilder;
use crate::error::Error;
use crate::hash::HashFamily;
use crate::hash::HashScheme;
use crate::hash::ItemBytes;

/// A candidate item together with its frequency estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeavyHitter<T> {
    item: T,
    estimate: u64,
}

impl<T> HeavyHitter<T> {
    /// Returns the item.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Returns the estimated frequency.
    pub fn estimate(&self) -> u64 {
        self.estimate
    }
}

/// Count-Min sketch for estimating item frequencies.
///
/// Counters live in one row-major `depth * width` array. Row `r` uses the
/// `r`-th member of the item's hash family to pick its column.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMinSketch {
    hash_scheme: HashScheme,
    depth: u32,
    width: u32,
    epsilon: f64,
    delta: f64,
    total_count: u64,
    counts: Vec<u64>,
}

impl CountMinSketch {
    /// Creates a sketch with relative error `epsilon` and failure probability `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// for a non-positive `epsilon` or a `delta` outside `(0, 1)`.
    pub fn new(epsilon: f64, delta: f64) -> Result<Self, Error> {
        CountMinSketchBuilder::with_error_bounds(epsilon, delta).build()
    }

    /// Returns a builder for the given error bounds.
    pub fn builder(epsilon: f64, delta: f64) -> CountMinSketchBuilder {
        CountMinSketchBuilder::with_error_bounds(epsilon, delta)
    }

    pub(super) fn from_parts(
        hash_scheme: HashScheme,
        depth: u32,
        width: u32,
        epsilon: f64,
        delta: f64,
    ) -> Self {
        debug!(depth, width, epsilon, delta, "created count-min sketch");
        CountMinSketch {
            hash_scheme,
            depth,
            width,
            epsilon,
            delta,
            total_count: 0,
            counts: vec![0; depth as usize * width as usize],
        }
    }

    /// Returns the number of hash functions (rows).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Returns the number of counters per row.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the relative error the sketch was sized for.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the failure probability the sketch was sized for.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Returns the total weight added, saturating at `u64::MAX`.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Returns the hash scheme.
    pub fn hash_scheme(&self) -> HashScheme {
        self.hash_scheme
    }

    /// Returns true if no weight has been added.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Returns the counter matrix size in bytes.
    pub fn memory_bytes(&self) -> u64 {
        u64::from(self.depth) * u64::from(self.width) * 8
    }

    /// Adds a single occurrence of `item`.
    pub fn add<T: ItemBytes>(&mut self, item: T) {
        self.add_count(item, 1);
    }

    /// Adds `count` occurrences of `item`.
    pub fn add_count<T: ItemBytes>(&mut self, item: T, count: u64) {
        if count == 0 {
            return;
        }
        self.total_count = self.total_count.saturating_add(count);
        let family = HashFamily::from_item(self.hash_scheme, item);
        for row in 0..self.depth as usize {
            let idx = self.cell_index(&family, row);
            self.counts[idx] = self.counts[idx].saturating_add(count);
        }
    }

    /// Returns the estimated frequency for `item`.
    ///
    /// Never smaller than the number of times `item` was added.
    pub fn estimate<T: ItemBytes>(&self, item: T) -> u64 {
        let family = HashFamily::from_item(self.hash_scheme, item);
        (0..self.depth as usize)
            .map(|row| self.counts[self.cell_index(&family, row)])
            .min()
            .unwrap_or(0)
    }

    /// Returns the additive error bound, `epsilon * total_count`.
    pub fn error_bound(&self) -> f64 {
        self.epsilon * self.total_count as f64
    }

    /// Returns the lower end of the estimate interval for `item`.
    ///
    /// With probability `1 - delta` the true count is at least this value.
    pub fn lower_bound<T: ItemBytes>(&self, item: T) -> u64 {
        let error = self.error_bound().ceil() as u64;
        self.estimate(item).saturating_sub(error)
    }

    /// Returns the `k` candidates with the highest estimates, highest first.
    ///
    /// Candidates with equal estimates keep their input order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::countmin::CountMinSketch;
    /// let mut sketch = CountMinSketch::new(0.01, 0.01).unwrap();
    /// sketch.add_count("the", 50);
    /// sketch.add_count("fox", 5);
    /// sketch.add_count("of", 20);
    ///
    /// let top = sketch.heavy_hitters(["fox", "of", "the"], 2);
    /// assert_eq!(*top[0].item(), "the");
    /// assert_eq!(*top[1].item(), "of");
    /// ```
    pub fn heavy_hitters<T, I>(&self, candidates: I, k: usize) -> Vec<HeavyHitter<T>>
    where
        T: ItemBytes,
        I: IntoIterator<Item = T>,
    {
        let mut hitters: Vec<HeavyHitter<T>> = candidates
            .into_iter()
            .map(|item| {
                let estimate = self.estimate(&item);
                HeavyHitter { item, estimate }
            })
            .collect();
        hitters.sort_by(|a, b| b.estimate.cmp(&a.estimate));
        hitters.truncate(k);
        hitters
    }

    /// Merges another sketch into this one by summing counters.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleMerge`](crate::error::ErrorKind::IncompatibleMerge)
    /// if dimensions or hash schemes differ.
    pub fn merge(&mut self, other: &CountMinSketch) -> Result<(), Error> {
        if self.depth != other.depth
            || self.width != other.width
            || self.hash_scheme != other.hash_scheme
        {
            return Err(Error::incompatible_merge(
                "cannot merge count-min sketches with different configurations",
            )
            .with_context(
                "dimensions",
                format!(
                    "{}x{} vs {}x{}",
                    self.depth, self.width, other.depth, other.width
                ),
            )
            .with_context(
                "hash_scheme",
                format!("{:?} vs {:?}", self.hash_scheme, other.hash_scheme),
            ));
        }
        for (dst, src) in self.counts.iter_mut().zip(other.counts.iter()) {
            *dst = dst.saturating_add(*src);
        }
        self.total_count = self.total_count.saturating_add(other.total_count);
        debug!(total_count = self.total_count, "merged count-min sketches");
        Ok(())
    }

    /// Serializes the sketch to bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probsketch::countmin::CountMinSketch;
    /// let mut sketch = CountMinSketch::new(0.01, 0.01).unwrap();
    /// sketch.add_count("apple", 7);
    ///
    /// let bytes = sketch.serialize();
    /// let decoded = CountMinSketch::deserialize(&bytes).unwrap();
    /// assert_eq!(decoded.estimate("apple"), sketch.estimate("apple"));
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let family = Family::COUNTMIN;
        let is_empty = self.is_empty();
        let payload = if is_empty { 0 } else { self.counts.len() * 8 };
        let mut bytes = SketchBytes::with_capacity(family.pre_longs as usize * 8 + payload);

        Preamble {
            hash_scheme_id: self.hash_scheme.id(),
            is_empty,
            param: 0,
        }
        .write(&family, &mut bytes);
        bytes.write_u64_le(self.hash_scheme.seed());
        bytes.write_f64_le(self.epsilon);
        bytes.write_f64_le(self.delta);
        bytes.write_u32_le(self.width);
        bytes.write_u32_le(self.depth);
        bytes.write_u64_le(self.total_count);

        if !is_empty {
            for count in &self.counts {
                bytes.write_u64_le(*count);
            }
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::MalformedDeserializeData`](crate::error::ErrorKind::MalformedDeserializeData)
    /// if the header is invalid, the payload length does not match the dimensions,
    /// or the counters disagree with the recorded total.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let family = Family::COUNTMIN;
        let mut cursor = SketchSlice::new(bytes);
        let preamble = Preamble::read(&family, &mut cursor)?;
        if preamble.param != 0 {
            return Err(Error::deserial(format!(
                "count-min parameter field must be 0, got {}",
                preamble.param
            )));
        }

        let seed = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("seed"))?;
        let hash_scheme = HashScheme::from_parts(preamble.hash_scheme_id, seed)?;
        let epsilon = cursor
            .read_f64_le()
            .map_err(|_| Error::insufficient_data("epsilon"))?;
        let delta = cursor
            .read_f64_le()
            .map_err(|_| Error::insufficient_data("delta"))?;
        let width = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("width"))?;
        let depth = cursor
            .read_u32_le()
            .map_err(|_| Error::insufficient_data("depth"))?;
        let total_count = cursor
            .read_u64_le()
            .map_err(|_| Error::insufficient_data("total_count"))?;

        if !(epsilon > 0.0 && epsilon.is_finite()) {
            return Err(Error::deserial(format!("invalid epsilon: {epsilon}")));
        }
        // delta underflows to 0 for very deep explicit dimensions
        if !(0.0..1.0).contains(&delta) {
            return Err(Error::deserial(format!("invalid delta: {delta}")));
        }
        CountMinSketchBuilder::validate_dimensions(depth, width).map_err(|err| {
            Error::deserial(format!("invalid dimensions: {}", err.message()))
        })?;

        let mut sketch = CountMinSketch {
            hash_scheme,
            depth,
            width,
            epsilon,
            delta,
            total_count,
            counts: Vec::new(),
        };
        let num_cells = depth as usize * width as usize;

        if preamble.is_empty {
            if total_count != 0 {
                return Err(Error::deserial(
                    "empty count-min sketch cannot have a total count",
                ));
            }
            sketch.counts = vec![0; num_cells];
        } else {
            if total_count == 0 {
                return Err(Error::deserial(
                    "non-empty count-min sketch must have a total count",
                ));
            }
            if cursor.remaining() < num_cells * 8 {
                return Err(Error::insufficient_data("counts"));
            }
            sketch.counts.reserve_exact(num_cells);
            for _ in 0..num_cells {
                let count = cursor
                    .read_u64_le()
                    .map_err(|_| Error::insufficient_data("counts"))?;
                sketch.counts.push(count);
            }
            sketch.check_row_totals()?;
        }
        ensure_consumed(&cursor, &family)?;

        debug!(depth, width, total_count, "deserialized count-min sketch");
        Ok(sketch)
    }

    /// Every row sees every update, so unsaturated rows sum to the total.
    fn check_row_totals(&self) -> Result<(), Error> {
        if self.total_count == u64::MAX {
            return Ok(());
        }
        for (row, cells) in self.counts.chunks_exact(self.width as usize).enumerate() {
            let sum = cells
                .iter()
                .try_fold(0u64, |acc, count| acc.checked_add(*count));
            if sum != Some(self.total_count) {
                return Err(Error::deserial(format!(
                    "row {row} does not sum to total count {}",
                    self.total_count
                )));
            }
        }
        Ok(())
    }

    #[inline]
    fn cell_index(&self, family: &HashFamily, row: usize) -> usize {
        let col = family.index(row as u64, u64::from(self.width)) as usize;
        row * self.width as usize + col
    }
}
