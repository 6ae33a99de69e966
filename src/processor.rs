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

//! Parallel construction of one batch sketch from a drained batch.
//!
//! A batch is split into shards, every shard is folded into its own fresh
//! sketch on the stream's worker pool, and the shard sketches are merged into
//! a single batch sketch. Nothing here touches the stream's master sketch.
//!
//! Shard jobs are spawned onto the pool and joined through a channel. The
//! caller may itself be a worker of another rayon pool (the coordinator's),
//! and a channel receive blocks without picking up that pool's other jobs.

use std::any::Any;
use std::marker::PhantomData;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::Error;
use crate::metric::MetricType;
use crate::partition::partition;
use crate::sketch::Sketch;

/// Build one sketch from one shard of normalized values.
///
/// An empty shard yields an empty sketch.
pub fn build_shard<S: Sketch>(params: S::Params, shard: &[u64]) -> S {
    let mut sketch = S::create(params);
    for &value in shard {
        sketch.add(value);
    }
    sketch
}

/// Shards a batch over a bounded worker pool and folds the shard sketches.
pub struct WindowProcessor<S: Sketch> {
    metric: MetricType,
    params: S::Params,
    num_shards: usize,
    pool: rayon::ThreadPool,
    _sketch: PhantomData<fn() -> S>,
}

impl<S: Sketch> WindowProcessor<S> {
    /// Create a processor with one worker thread per shard.
    pub fn new(metric: MetricType, params: S::Params, num_shards: usize) -> Result<Self, Error> {
        if num_shards == 0 {
            return Err(Error::config_invalid("num_shards must be at least 1").with_metric(metric));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_shards)
            .thread_name(move |i| format!("{}-shard-{i}", metric.as_str().to_lowercase()))
            .build()
            .map_err(|err| {
                Error::scheduler_failed("cannot start shard worker pool", err).with_metric(metric)
            })?;

        Ok(Self {
            metric,
            params,
            num_shards,
            pool,
            _sketch: PhantomData,
        })
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards
    }

    /// Build the batch sketch for `batch`.
    ///
    /// Blocks until every shard is done. A panicking shard fails the whole
    /// batch with [`ShardFailed`](crate::error::ErrorKind::ShardFailed); a
    /// merge failure is returned as is.
    pub fn build_batch(&self, batch: Vec<u64>) -> Result<S, Error> {
        let params = self.params;
        let metric = self.metric;
        let lens: Vec<usize> = partition(&batch, self.num_shards)
            .iter()
            .map(|shard| shard.len())
            .collect();
        let batch = Arc::new(batch);

        let (tx, rx) = crossbeam_channel::bounded(self.num_shards);
        let mut start = 0;
        for (index, len) in lens.into_iter().enumerate() {
            let range = start..start + len;
            start += len;
            let batch = Arc::clone(&batch);
            let tx = tx.clone();
            self.pool.spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    build_shard::<S>(params, &batch[range])
                }))
                .map_err(|payload| {
                    Error::shard_failed(metric, panic_message(payload.as_ref()))
                        .with_context("shard", index)
                        .with_context("shard_len", len)
                });
                // receiver is gone once another shard failed
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut sketches: Vec<Option<S>> = (0..self.num_shards).map(|_| None).collect();
        for (index, result) in rx {
            sketches[index] = Some(result?);
        }
        let sketches = sketches
            .into_iter()
            .collect::<Option<Vec<S>>>()
            .ok_or_else(|| Error::shard_failed(metric, "shard worker exited without a result"))?;

        fold_sketches(sketches, params)
    }
}

/// Union shard sketches left to right into the first one.
fn fold_sketches<S: Sketch>(sketches: Vec<S>, params: S::Params) -> Result<S, Error> {
    let mut sketches = sketches.into_iter();
    let Some(mut folded) = sketches.next() else {
        return Ok(S::create(params));
    };
    for sketch in sketches {
        folded.union_with(&sketch)?;
    }
    Ok(folded)
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {message}")
    } else {
        "worker panicked".to_string()
    }
}
