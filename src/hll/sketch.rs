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

use std::fmt;
use std::hash::Hash;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::hash_identity;
use crate::hash::normalize;
use crate::hll::HllParams;
use crate::hll::HllType;
use crate::hll::registers::Registers;
use crate::hll::slot_and_value;

#[derive(Clone, PartialEq)]
pub struct HllSketch {
    params: HllParams,
    registers: Registers,
}

impl HllSketch {
    /// Create an empty sketch.
    ///
    /// # Panics
    ///
    /// If lg_k is not in range [4, 21]
    pub fn new(lg_k: u8, hll_type: HllType) -> Self {
        match HllParams::new(lg_k, hll_type) {
            Ok(params) => Self::with_params(params),
            Err(err) => panic!("{err}"),
        }
    }

    /// Create an empty sketch from validated parameters.
    pub fn with_params(params: HllParams) -> Self {
        Self {
            params,
            registers: Registers::new(params.lg_k(), params.hll_type()),
        }
    }

    /// Update the sketch with an already mixed 64-bit value.
    ///
    /// Values are expected to have gone through [`normalize`]; feeding
    /// sequential integers directly concentrates them in few registers.
    pub fn update(&mut self, hash: u64) {
        let (slot, value) = slot_and_value(hash, self.params.lg_k());
        self.registers.raise(slot, value);
    }

    /// Hash, normalize and add a raw identity.
    pub fn update_identity<H: Hash + ?Sized>(&mut self, value: &H) {
        self.update(normalize(hash_identity(value)));
    }

    /// Return a new sketch holding the union of `self` and `other`.
    ///
    /// Fails with [`ErrorKind::IncompatibleSketch`] if the two sketches were
    /// built with different parameters.
    pub fn merge(&self, other: &HllSketch) -> Result<HllSketch, Error> {
        let mut merged = self.clone();
        merged.union_with(other)?;
        Ok(merged)
    }

    /// Fold `other` into `self`, register by register.
    pub fn union_with(&mut self, other: &HllSketch) -> Result<(), Error> {
        if self.params != other.params {
            return Err(Error::new(
                ErrorKind::IncompatibleSketch,
                "cannot merge sketches built with different parameters",
            )
            .with_context("left", format!("{:?}", self.params))
            .with_context("right", format!("{:?}", other.params)));
        }

        self.registers.union_with(&other.registers);
        Ok(())
    }

    pub fn estimate(&self) -> f64 {
        self.registers.estimate()
    }

    /// Approximate upper bound at `num_std_dev` standard deviations.
    pub fn upper_bound(&self, num_std_dev: f64) -> f64 {
        self.estimate() * (1.0 + num_std_dev * self.params.relative_error())
    }

    /// Approximate lower bound at `num_std_dev` standard deviations.
    pub fn lower_bound(&self, num_std_dev: f64) -> f64 {
        (self.estimate() * (1.0 - num_std_dev * self.params.relative_error())).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.registers.zeros() == self.registers.len()
    }

    pub fn params(&self) -> HllParams {
        self.params
    }

    pub fn lg_config_k(&self) -> u8 {
        self.params.lg_k()
    }

    pub fn hll_type(&self) -> HllType {
        self.params.hll_type()
    }

    /// Bytes held by the register array.
    pub fn size_bytes(&self) -> usize {
        self.registers.size_bytes()
    }
}

impl fmt::Debug for HllSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HllSketch")
            .field("lg_config_k", &self.params.lg_k())
            .field("hll_type", &self.params.hll_type())
            .field("zeros", &self.registers.zeros())
            .field("estimate", &self.estimate())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sketch() {
        let sketch = HllSketch::new(12, HllType::Hll8);
        assert!(sketch.is_empty());
        assert_eq!(sketch.estimate(), 0.0);
        assert_eq!(sketch.size_bytes(), 4096);
    }

    #[test]
    fn test_register_widths_agree() {
        let mut hll6 = HllSketch::new(10, HllType::Hll6);
        let mut hll8 = HllSketch::new(10, HllType::Hll8);
        for i in 0..5_000u64 {
            hll6.update(normalize(i));
            hll8.update(normalize(i));
        }
        assert_eq!(hll6.estimate(), hll8.estimate());
        assert!(hll6.size_bytes() < hll8.size_bytes());
    }

    #[test]
    fn test_merge_rejects_mismatched_params() {
        let a = HllSketch::new(10, HllType::Hll8);
        let b = HllSketch::new(11, HllType::Hll8);
        let c = HllSketch::new(10, HllType::Hll6);

        assert_eq!(a.merge(&b).unwrap_err().kind(), ErrorKind::IncompatibleSketch);
        assert_eq!(a.merge(&c).unwrap_err().kind(), ErrorKind::IncompatibleSketch);
    }

    #[test]
    fn test_union_with_empty_is_identity() {
        let mut a = HllSketch::new(10, HllType::Hll6);
        for i in 0..100u64 {
            a.update(normalize(i));
        }
        let before = a.clone();
        a.union_with(&HllSketch::new(10, HllType::Hll6)).unwrap();
        assert!(a == before);
    }

    #[test]
    #[should_panic(expected = "lg_k must be in")]
    fn test_new_panics_on_bad_lg_k() {
        let _ = HllSketch::new(2, HllType::Hll8);
    }
}
