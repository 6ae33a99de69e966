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

//! Dense register storage for [`HllSketch`](super::HllSketch).
//!
//! Each register holds the highest rank seen for its slot. `Hll8` stores one
//! byte per register. `Hll6` packs registers into 6 bits; a register may
//! straddle two bytes, so it is read and written through a little-endian
//! 16-bit window.

use crate::hll::HllType;
use crate::hll::estimator::KxqSums;

const SIX_BIT_MASK: u16 = 0x3F;

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Registers {
    hll_type: HllType,
    lg_k: u8,
    bytes: Box<[u8]>,
    zeros: u32,
    sums: KxqSums,
}

impl Registers {
    pub(super) fn new(lg_k: u8, hll_type: HllType) -> Self {
        let k = 1u32 << lg_k;
        Self {
            hll_type,
            lg_k,
            bytes: vec![0u8; storage_len(k, hll_type)].into_boxed_slice(),
            zeros: k,
            sums: KxqSums::new(lg_k),
        }
    }

    pub(super) fn len(&self) -> u32 {
        1 << self.lg_k
    }

    pub(super) fn get(&self, slot: u32) -> u8 {
        match self.hll_type {
            HllType::Hll8 => self.bytes[slot as usize],
            HllType::Hll6 => {
                let (index, shift) = six_bit_position(slot);
                let window = u16::from_le_bytes([self.bytes[index], self.bytes[index + 1]]);
                ((window >> shift) & SIX_BIT_MASK) as u8
            }
        }
    }

    fn set(&mut self, slot: u32, rank: u8) {
        match self.hll_type {
            HllType::Hll8 => self.bytes[slot as usize] = rank,
            HllType::Hll6 => {
                debug_assert!(rank <= 63, "rank {rank} does not fit in 6 bits");
                let (index, shift) = six_bit_position(slot);
                let mut window = u16::from_le_bytes([self.bytes[index], self.bytes[index + 1]]);
                window &= !(SIX_BIT_MASK << shift);
                window |= (u16::from(rank) & SIX_BIT_MASK) << shift;
                let [lo, hi] = window.to_le_bytes();
                self.bytes[index] = lo;
                self.bytes[index + 1] = hi;
            }
        }
    }

    /// Raise `slot` to `rank` unless it already holds a rank at least as high.
    pub(super) fn raise(&mut self, slot: u32, rank: u8) {
        let current = self.get(slot);
        if rank <= current {
            return;
        }
        self.sums.replace(current, rank);
        self.set(slot, rank);
        if current == 0 {
            self.zeros -= 1;
        }
    }

    /// Register-wise max with `other`; both must have the same `lg_k`.
    pub(super) fn union_with(&mut self, other: &Registers) {
        debug_assert_eq!(self.lg_k, other.lg_k);
        for slot in 0..other.len() {
            let rank = other.get(slot);
            if rank > 0 {
                self.raise(slot, rank);
            }
        }
    }

    pub(super) fn estimate(&self) -> f64 {
        self.sums.estimate(self.lg_k, self.zeros)
    }

    /// Registers still at rank zero.
    pub(super) fn zeros(&self) -> u32 {
        self.zeros
    }

    pub(super) fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

fn storage_len(k: u32, hll_type: HllType) -> usize {
    match hll_type {
        HllType::Hll8 => k as usize,
        // one spare byte keeps the window of the last register in bounds
        HllType::Hll6 => (k as usize * 3) / 4 + 1,
    }
}

/// Byte index and bit shift of a 6-bit register.
fn six_bit_position(slot: u32) -> (usize, u32) {
    let bit = slot * 6;
    ((bit >> 3) as usize, bit & 7)
}
