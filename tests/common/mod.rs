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

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::thread;
use std::time::Duration;

use distinct_windows::error::Error;
use distinct_windows::hash::normalize;
use distinct_windows::hll::HllParams;
use distinct_windows::hll::HllSketch;
use distinct_windows::hll::HllType;
use distinct_windows::sketch::Sketch;

/// Adding this value makes a [`FaultySketch`] panic.
pub const POISON: u64 = u64::MAX;
/// Adding this value makes a [`FaultySketch`] sleep for its configured delay.
pub const SLOW: u64 = u64::MAX - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultyParams {
    pub hll: HllParams,
    pub delay: Duration,
}

impl FaultyParams {
    pub fn new(lg_k: u8) -> Self {
        Self {
            hll: HllParams::new(lg_k, HllType::Hll8).unwrap(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// HyperLogLog sketch that fails or stalls on marker values.
#[derive(Debug, Clone)]
pub struct FaultySketch {
    params: FaultyParams,
    inner: HllSketch,
}

impl Sketch for FaultySketch {
    type Params = FaultyParams;

    fn create(params: FaultyParams) -> Self {
        Self {
            params,
            inner: HllSketch::with_params(params.hll),
        }
    }

    fn params(&self) -> FaultyParams {
        self.params
    }

    fn add(&mut self, value: u64) {
        match value {
            POISON => panic!("poisoned value reached shard worker"),
            SLOW => thread::sleep(self.params.delay),
            _ => self.inner.update(value),
        }
    }

    fn union_with(&mut self, other: &Self) -> Result<(), Error> {
        self.inner.union_with(&other.inner)
    }

    fn estimate(&self) -> f64 {
        self.inner.estimate()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn size_bytes(&self) -> usize {
        self.inner.size_bytes()
    }
}

/// `count` distinct normalized values starting at `start`.
pub fn distinct_values(start: u64, count: u64) -> Vec<u64> {
    (start..start + count).map(normalize).collect()
}
