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

use std::hash::Hash;

/// Seed shared by every producer so identical identities hash identically.
pub const DEFAULT_SEED: u32 = 9001;

/// Hash a raw identity to 64 bits with MurmurHash3 x64/128.
///
/// Only the low half of the 128-bit digest is kept. The result is still
/// expected to go through [`normalize`](super::normalize) before ingestion.
///
/// # Examples
///
/// ```
/// # use distinct_windows::hash::{hash_identity, normalize};
/// let a = normalize(hash_identity("203.0.113.7"));
/// let b = normalize(hash_identity("203.0.113.7"));
/// assert_eq!(a, b);
/// ```
pub fn hash_identity<H: Hash + ?Sized>(value: &H) -> u64 {
    let mut hasher = mur3::Hasher128::with_seed(DEFAULT_SEED);
    value.hash(&mut hasher);
    let (lo, _hi) = hasher.finish128();
    lo
}
