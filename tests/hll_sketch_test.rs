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

use common::distinct_values;
use distinct_windows::error::ErrorKind;
use distinct_windows::hash::normalize;
use distinct_windows::hll::HllSketch;
use distinct_windows::hll::HllType;
use googletest::assert_that;
use googletest::prelude::eq;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::near;
use proptest::prelude::*;

fn sketch_of(values: &[u64], lg_k: u8, hll_type: HllType) -> HllSketch {
    let mut sketch = HllSketch::new(lg_k, hll_type);
    for &v in values {
        sketch.update(v);
    }
    sketch
}

#[test]
fn test_basic_update() {
    let mut sketch = HllSketch::new(12, HllType::Hll8);
    assert!(sketch.is_empty());
    assert_eq!(sketch.estimate(), 0.0);

    sketch.update(normalize(1));
    assert!(!sketch.is_empty());
    assert_that!(sketch.estimate(), near(1.0, 0.01));
}

#[test]
fn test_duplicate_handling() {
    let values = distinct_values(0, 100);
    let mut sketch = HllSketch::new(12, HllType::Hll8);

    for _ in 0..10 {
        for &v in &values {
            sketch.update(v);
        }
    }

    let once = sketch_of(&values, 12, HllType::Hll8);
    assert_eq!(sketch.estimate(), once.estimate());
    assert_that!(sketch.estimate(), near(100.0, 5.0));
}

#[test]
fn test_ten_thousand_distinct_values() {
    let sketch = sketch_of(&distinct_values(0, 10_000), 14, HllType::Hll8);
    let estimate = sketch.estimate();
    assert_that!(estimate, near(10_000.0, 200.0));
    assert_that!(estimate, ge(sketch.lower_bound(3.0)));
    assert_that!(estimate, le(sketch.upper_bound(3.0)));
}

#[test]
fn test_large_cardinality_uses_raw_estimate() {
    let sketch = sketch_of(&distinct_values(0, 100_000), 14, HllType::Hll6);
    assert_that!(sketch.estimate(), near(100_000.0, 2_500.0));
}

#[test]
fn test_accuracy_across_linear_counting_handoff() {
    // one growing sketch sampled from 2.2k to 3.2k; the estimator switches
    // from linear counting to the raw estimate at 2.5k
    for (lg_k, start) in [(12u8, 0u64), (12, 1_000_000), (14, 0), (14, 1_000_000)] {
        let k = 1u64 << lg_k;
        let (low, high, step) = (k * 22 / 10, k * 32 / 10, k / 32);
        let mut sketch = HllSketch::new(lg_k, HllType::Hll8);
        let mut previous = 0.0;
        for (i, value) in distinct_values(start, high).into_iter().enumerate() {
            sketch.update(value);
            let count = i as u64 + 1;
            if count < low || (count - low) % step != 0 {
                continue;
            }
            let estimate = sketch.estimate();
            let tolerance = count as f64 * 0.04;
            assert_that!(estimate, near(count as f64, tolerance));
            assert_that!(estimate, ge(previous));
            previous = estimate;
        }
    }
}

#[test]
fn test_hll6_and_hll8_agree() {
    let values = distinct_values(7, 5_000);
    let hll6 = sketch_of(&values, 10, HllType::Hll6);
    let hll8 = sketch_of(&values, 10, HllType::Hll8);
    assert_that!(hll6.estimate(), eq(hll8.estimate()));
    assert_that!(hll6.size_bytes(), eq(769));
    assert_that!(hll8.size_bytes(), eq(1024));
}

#[test]
fn test_identity_updates() {
    let mut sketch = HllSketch::new(12, HllType::Hll8);
    for domain in ["mailinator.com", "example.org", "mailinator.com", "tempmail.dev"] {
        sketch.update_identity(domain);
    }
    assert_that!(sketch.estimate(), near(3.0, 0.05));
}

#[test]
fn test_merge_is_union() {
    let a = sketch_of(&distinct_values(0, 3_000), 12, HllType::Hll8);
    let b = sketch_of(&distinct_values(2_000, 3_000), 12, HllType::Hll8);
    let union = sketch_of(&distinct_values(0, 5_000), 12, HllType::Hll8);

    let merged = a.merge(&b).unwrap();
    assert!(merged == union);
    assert_that!(merged.estimate(), near(5_000.0, 250.0));
}

#[test]
fn test_merge_incompatible() {
    let a = HllSketch::new(12, HllType::Hll8);
    let b = HllSketch::new(12, HllType::Hll6);
    let err = a.merge(&b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleSketch);
}

#[test]
fn test_estimate_grows_with_distinct_values() {
    let mut sketch = HllSketch::new(14, HllType::Hll8);
    let mut previous = 0.0;
    for chunk in distinct_values(0, 20_000).chunks(2_000) {
        for &v in chunk {
            sketch.update(v);
        }
        let estimate = sketch.estimate();
        assert!(estimate > previous, "{estimate} <= {previous}");
        previous = estimate;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn merge_is_commutative(
        a in prop::collection::vec(any::<u64>(), 0..500),
        b in prop::collection::vec(any::<u64>(), 0..500),
    ) {
        let a = sketch_of(&a, 8, HllType::Hll6);
        let b = sketch_of(&b, 8, HllType::Hll6);
        prop_assert_eq!(a.merge(&b).unwrap(), b.merge(&a).unwrap());
    }

    #[test]
    fn merge_is_associative(
        a in prop::collection::vec(any::<u64>(), 0..300),
        b in prop::collection::vec(any::<u64>(), 0..300),
        c in prop::collection::vec(any::<u64>(), 0..300),
    ) {
        let a = sketch_of(&a, 8, HllType::Hll8);
        let b = sketch_of(&b, 8, HllType::Hll8);
        let c = sketch_of(&c, 8, HllType::Hll8);

        let left = a.merge(&b).unwrap().merge(&c).unwrap();
        let right = a.merge(&b.merge(&c).unwrap()).unwrap();
        prop_assert_eq!(left.estimate(), right.estimate());
        prop_assert_eq!(left, right);
    }

    #[test]
    fn merge_equals_sketch_of_union(
        a in prop::collection::vec(any::<u64>(), 0..500),
        b in prop::collection::vec(any::<u64>(), 0..500),
    ) {
        let union: Vec<u64> = a.iter().chain(b.iter()).copied().collect();
        let merged = sketch_of(&a, 10, HllType::Hll8).merge(&sketch_of(&b, 10, HllType::Hll8)).unwrap();
        prop_assert_eq!(merged, sketch_of(&union, 10, HllType::Hll8));
    }
}
