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

//! The estimator capability consumed by the pipeline.
//!
//! The pipeline never looks inside a sketch. It relies on four algebraic
//! facts: `add` is idempotent for duplicates, `merge` is commutative and
//! associative and equals the sketch of the union (`union_with` is its
//! in-place form), `estimate` is
//! non-negative, and sketches built from different parameters are never
//! merged. [`HllSketch`] is the production implementation; tests plug in
//! their own to inject failures.

use std::fmt;

use crate::error::Error;
use crate::hll::HllParams;
use crate::hll::HllSketch;

/// Approximate distinct-count structure.
pub trait Sketch: Clone + Send + 'static {
    /// Construction-time knobs; sketches are mergeable only when these match.
    type Params: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    /// Create an empty sketch.
    fn create(params: Self::Params) -> Self;

    /// Parameters this sketch was built with.
    fn params(&self) -> Self::Params;

    /// Add one normalized value.
    fn add(&mut self, value: u64);

    /// Fold `other` into `self`. On error `self` is left unchanged.
    fn union_with(&mut self, other: &Self) -> Result<(), Error>;

    /// Return the union of `self` and `other` as a new sketch.
    fn merge(&self, other: &Self) -> Result<Self, Error> {
        let mut merged = self.clone();
        merged.union_with(other)?;
        Ok(merged)
    }

    /// Estimated number of distinct values added so far.
    fn estimate(&self) -> f64;

    fn is_empty(&self) -> bool;

    /// Memory held by the sketch's state.
    fn size_bytes(&self) -> usize;
}

impl Sketch for HllSketch {
    type Params = HllParams;

    fn create(params: HllParams) -> Self {
        HllSketch::with_params(params)
    }

    fn params(&self) -> HllParams {
        HllSketch::params(self)
    }

    fn add(&mut self, value: u64) {
        self.update(value);
    }

    fn union_with(&mut self, other: &Self) -> Result<(), Error> {
        HllSketch::union_with(self, other)
    }

    fn estimate(&self) -> f64 {
        HllSketch::estimate(self)
    }

    fn is_empty(&self) -> bool {
        HllSketch::is_empty(self)
    }

    fn size_bytes(&self) -> usize {
        HllSketch::size_bytes(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::normalize;
    use crate::hll::HllType;

    fn sketch(lg_k: u8, values: std::ops::Range<u64>) -> HllSketch {
        let mut sketch = <HllSketch as Sketch>::create(HllParams::new(lg_k, HllType::Hll8).unwrap());
        for value in values {
            Sketch::add(&mut sketch, normalize(value));
        }
        sketch
    }

    #[test]
    fn test_union_with_in_place_matches_merge() {
        let left = sketch(12, 0..3_000);
        let right = sketch(12, 2_000..5_000);

        let merged = Sketch::merge(&left, &right).unwrap();
        let mut folded = left.clone();
        Sketch::union_with(&mut folded, &right).unwrap();

        assert!(folded == merged);
        assert!(folded == sketch(12, 0..5_000));
    }

    #[test]
    fn test_union_with_mismatch_leaves_sketch_unchanged() {
        let mut target = sketch(12, 0..1_000);
        let before = target.clone();
        let other = sketch(10, 0..1_000);

        assert!(Sketch::union_with(&mut target, &other).is_err());
        assert!(target == before);
        assert_eq!(Sketch::estimate(&target), Sketch::estimate(&before));
    }
}
