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

//! HyperLogLog sketch used as the distinct-count estimator of every stream.
//!
//! # Overview
//!
//! A sketch keeps `k = 2^lg_k` registers. Each incoming 64-bit value selects a
//! register with its top `lg_k` bits and offers the register the position of
//! the first set bit among the remaining bits. A register only ever grows, so
//! adding a value twice is a no-op and merging two sketches is a register-wise
//! maximum. Both properties are what the windowed pipeline relies on: shards
//! can be built independently and folded in any order.
//!
//! # HLL Types
//!
//! Two register widths are supported, trading memory for simplicity:
//!
//! - [`HllType::Hll6`]: 6 bits per register, packed across byte boundaries
//! - [`HllType::Hll8`]: 8 bits per register (one byte each)
//!
//! Register values never exceed `64 - lg_k + 1`, so both widths hold every
//! value exactly and produce identical estimates. Only sketches with the same
//! [`HllParams`] can be merged.

mod estimator;
mod registers;
mod sketch;

pub use sketch::HllSketch;

use crate::error::Error;

/// Smallest supported log2 of the register count.
pub const MIN_LG_K: u8 = 4;
/// Largest supported log2 of the register count.
pub const MAX_LG_K: u8 = 21;
/// Default log2 of the register count (16384 registers, ~0.8% error).
pub const DEFAULT_LG_K: u8 = 14;

/// Target register width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum HllType {
    #[serde(alias = "hll6", alias = "HLL_6")]
    Hll6,
    #[serde(alias = "hll8", alias = "HLL_8")]
    Hll8,
}

impl HllType {
    /// Number of bits stored per register.
    pub const fn bits_per_register(self) -> u32 {
        match self {
            HllType::Hll6 => 6,
            HllType::Hll8 => 8,
        }
    }
}

/// Construction parameters of an [`HllSketch`].
///
/// The values are validated once, when the parameters are built, so every
/// sketch created from them is well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HllParams {
    lg_k: u8,
    hll_type: HllType,
}

impl HllParams {
    /// Create validated parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// # use distinct_windows::hll::{HllParams, HllType};
    /// assert!(HllParams::new(12, HllType::Hll8).is_ok());
    /// assert!(HllParams::new(30, HllType::Hll8).is_err());
    /// ```
    pub fn new(lg_k: u8, hll_type: HllType) -> Result<Self, Error> {
        if !(MIN_LG_K..=MAX_LG_K).contains(&lg_k) {
            return Err(Error::config_invalid(format!(
                "lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_k}"
            ))
            .with_context("lg_k", lg_k));
        }
        Ok(Self { lg_k, hll_type })
    }

    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    pub fn hll_type(&self) -> HllType {
        self.hll_type
    }

    /// Relative standard error of the estimate for this register count.
    pub fn relative_error(&self) -> f64 {
        1.04 / ((1u64 << self.lg_k) as f64).sqrt()
    }
}

impl Default for HllParams {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            hll_type: HllType::Hll8,
        }
    }
}

/// Split a hash into its register index and register value.
///
/// The index comes from the top `lg_k` bits; the value is one plus the number
/// of leading zeros in the remaining `64 - lg_k` bits.
#[inline]
fn slot_and_value(hash: u64, lg_k: u8) -> (u32, u8) {
    let slot = (hash >> (64 - lg_k as u32)) as u32;
    let rest = hash << lg_k;
    let max_rank = 64 - lg_k as u32;
    let value = rest.leading_zeros().min(max_rank) + 1;
    (slot, value as u8)
}
