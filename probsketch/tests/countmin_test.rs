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

mod common;

use std::collections::HashMap;

use common::XorShift64;
use common::distinct_items;
use googletest::assert_that;
use googletest::prelude::eq;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::lt;
use probsketch::countmin::CountMinSketch;
use probsketch::countmin::CountMinSketchBuilder;
use probsketch::error::ErrorKind;

/// Adds a skewed stream and returns the exact counts.
fn skewed_stream(sketch: &mut CountMinSketch, seed: u64) -> HashMap<String, u64> {
    let mut rng = XorShift64::seeded(seed);
    let mut truth = HashMap::new();
    for (rank, item) in distinct_items("word-", 2000).into_iter().enumerate() {
        let count = 1 + 1000 / (rank as u64 + 1) + rng.next_in(0, 5);
        sketch.add_count(&item, count);
        truth.insert(item, count);
    }
    truth
}

#[test]
fn test_single_item_estimate() {
    let mut sketch = CountMinSketch::new(0.01, 0.01).unwrap();
    for _ in 0..1000 {
        sketch.add("apple");
    }

    let estimate = sketch.estimate("apple");
    assert_that!(estimate, ge(1000));
    assert_that!((estimate - 1000) as f64, le(0.01 * sketch.total_count() as f64));
    assert_that!(sketch.total_count(), eq(1000));
    assert_that!(sketch.memory_bytes(), eq(5 * 272 * 8));
}

#[test]
fn test_never_underestimates() {
    let mut sketch = CountMinSketch::new(0.01, 0.01).unwrap();
    let truth = skewed_stream(&mut sketch, 42);

    for (item, count) in &truth {
        assert_that!(sketch.estimate(item), ge(*count));
        assert_that!(sketch.lower_bound(item), le(*count));
    }
    assert_that!(sketch.total_count(), eq(truth.values().sum::<u64>()));
}

#[test]
fn test_mean_error_below_epsilon() {
    let epsilon = 0.01;
    let mut sketch = CountMinSketch::new(epsilon, 0.01).unwrap();
    let truth = skewed_stream(&mut sketch, 7);

    let total = sketch.total_count() as f64;
    let mean_error = truth
        .iter()
        .map(|(item, count)| (sketch.estimate(item) - count) as f64 / total)
        .sum::<f64>()
        / truth.len() as f64;
    assert_that!(mean_error, lt(epsilon));

    let within_bound = truth
        .iter()
        .filter(|(item, count)| (sketch.estimate(*item) - *count) as f64 <= sketch.error_bound())
        .count();
    // at least 1 - delta of the items stay within the bound
    assert_that!(within_bound as f64 / truth.len() as f64, ge(0.99));
}

#[test]
fn test_merge_equals_combined_stream() {
    let mut left = CountMinSketch::new(0.01, 0.01).unwrap();
    let mut right = CountMinSketch::new(0.01, 0.01).unwrap();
    let mut combined = CountMinSketch::new(0.01, 0.01).unwrap();
    for (i, item) in distinct_items("k", 500).iter().enumerate() {
        let count = i as u64 % 13 + 1;
        if i % 2 == 0 {
            left.add_count(item, count);
        } else {
            right.add_count(item, count);
        }
        combined.add_count(item, count);
    }

    left.merge(&right).unwrap();
    assert_eq!(left, combined);
}

#[test]
fn test_merge_is_not_idempotent() {
    let mut sketch = CountMinSketch::new(0.01, 0.01).unwrap();
    sketch.add_count("apple", 10);
    let copy = sketch.clone();

    sketch.merge(&copy).unwrap();
    assert_that!(sketch.estimate("apple"), ge(20));
    assert_that!(sketch.total_count(), eq(20));
}

#[test]
fn test_merge_rejects_different_dimensions() {
    let mut a = CountMinSketch::new(0.01, 0.01).unwrap();
    let b = CountMinSketch::new(0.001, 0.01).unwrap();
    let c = CountMinSketchBuilder::with_dimensions(6, 272).build().unwrap();

    assert_that!(a.merge(&b).unwrap_err().kind(), eq(ErrorKind::IncompatibleMerge));
    assert_that!(a.merge(&c).unwrap_err().kind(), eq(ErrorKind::IncompatibleMerge));
}

#[test]
fn test_heavy_hitters_from_text() {
    let text = "the quick brown fox jumps over the lazy dog the fox \
                and the dog sleep while the quick fox runs";
    let mut sketch = CountMinSketch::new(0.001, 0.001).unwrap();
    let mut words: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        sketch.add(word);
        if !words.contains(&word) {
            words.push(word);
        }
    }

    let top = sketch.heavy_hitters(words, 3);
    let top: Vec<(&str, u64)> = top.iter().map(|h| (*h.item(), h.estimate())).collect();
    assert_eq!(top, vec![("the", 5), ("fox", 3), ("quick", 2)]);
}

#[test]
fn test_invalid_configuration() {
    for (epsilon, delta) in [(0.0, 0.01), (-1.0, 0.01), (0.01, 0.0), (0.01, 1.0)] {
        let err = CountMinSketch::new(epsilon, delta).unwrap_err();
        assert_that!(err.kind(), eq(ErrorKind::ConfigInvalid));
    }
}
