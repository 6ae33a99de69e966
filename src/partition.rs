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

//! Splitting a drained batch into shards for parallel sketch construction.

/// Split `batch` into exactly `num_shards` contiguous shards.
///
/// Every element lands in exactly one shard, shards keep the batch order and
/// their lengths differ by at most one (the first `len % num_shards` shards get
/// the extra element). When `num_shards` exceeds the batch length the
/// trailing shards are empty.
///
/// # Panics
///
/// If `num_shards` is zero.
///
/// # Examples
///
/// ```
/// # use distinct_windows::partition::partition;
/// let batch = [1, 2, 3, 4, 5, 6, 7];
/// let shards = partition(&batch, 3);
/// assert_eq!(shards, vec![&[1, 2, 3][..], &[4, 5][..], &[6, 7][..]]);
/// ```
pub fn partition<T>(batch: &[T], num_shards: usize) -> Vec<&[T]> {
    assert!(num_shards >= 1, "num_shards must be at least 1");

    let base = batch.len() / num_shards;
    let extra = batch.len() % num_shards;

    let mut shards = Vec::with_capacity(num_shards);
    let mut rest = batch;
    for i in 0..num_shards {
        let len = if i < extra { base + 1 } else { base };
        let (shard, tail) = rest.split_at(len);
        shards.push(shard);
        rest = tail;
    }
    debug_assert!(rest.is_empty());
    shards
}
