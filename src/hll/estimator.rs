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

//! Cardinality estimate from register ranks.
//!
//! The raw HyperLogLog estimate needs `sum(2^-rank)` over all registers. The
//! sum is kept incrementally in two parts, ranks below 32 and ranks from 32
//! up, so each part only ever adds and removes values of similar magnitude
//! and stays exact in `f64`. The estimate is then a function of the register
//! contents alone, whatever order values and sketches were folded in.

/// Split running sum of `2^-rank` over all registers.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct KxqSums {
    low: f64,
    high: f64,
}

impl KxqSums {
    /// Sums for `2^lg_k` registers at rank zero.
    pub(super) fn new(lg_k: u8) -> Self {
        Self {
            low: (1u64 << lg_k) as f64,
            high: 0.0,
        }
    }

    /// Account for one register moving from rank `old` to rank `new`.
    pub(super) fn replace(&mut self, old: u8, new: u8) {
        *self.part_mut(old) -= inv_pow2(old);
        *self.part_mut(new) += inv_pow2(new);
    }

    fn part_mut(&mut self, rank: u8) -> &mut f64 {
        if rank < 32 { &mut self.low } else { &mut self.high }
    }

    /// Linear counting while registers are sparse, raw HLL otherwise.
    pub(super) fn estimate(&self, lg_k: u8, zeros: u32) -> f64 {
        let k = (1u64 << lg_k) as f64;
        let raw = alpha(lg_k) * k * k / (self.low + self.high);
        if zeros > 0 && raw <= 2.5 * k {
            k * (k / f64::from(zeros)).ln()
        } else {
            raw
        }
    }
}

/// Bias correction of the raw estimate.
fn alpha(lg_k: u8) -> f64 {
    match lg_k {
        4 => 0.673,
        5 => 0.697,
        6 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (1u64 << lg_k) as f64),
    }
}

/// Exactly `2^-rank`, built from the exponent bits.
#[inline]
fn inv_pow2(rank: u8) -> f64 {
    f64::from_bits((1023 - u64::from(rank)) << 52)
}
