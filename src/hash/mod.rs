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

//! Hashing applied to entity identities before they enter a stream.
//!
//! Producers turn a raw identity (account id, IP address, email domain) into a
//! 64-bit value with [`hash_identity`], then pass it through [`normalize`]
//! before calling `ingest`. The sketch assumes uniformly distributed input
//! bits; `normalize` repairs inputs that are already 64-bit but poorly mixed
//! (sequential ids, packed IPv4 addresses).

mod murmurhash;

pub use murmurhash::DEFAULT_SEED;
pub use murmurhash::hash_identity;

/// Bit-mixing finalizer applied to every value before ingestion.
///
/// This is the SplitMix64 / MurmurHash3 `fmix64` variant; it is a bijection on
/// `u64`, so distinct inputs stay distinct.
#[inline]
pub fn normalize(z: u64) -> u64 {
    let mut z = z;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
