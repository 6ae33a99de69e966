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

//! Per-metric ingestion queue and current-window master sketch.

use std::time::Duration;
use std::time::Instant;

use chrono::DateTime;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::config::StreamConfig;
use crate::error::Error;
use crate::hll::HllSketch;
use crate::metric::MetricType;
use crate::processor::WindowProcessor;
use crate::sketch::Sketch;
use crate::snapshot::WindowSnapshot;

/// Summary of one successful processing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Values drained from the queue.
    pub drained: usize,
    /// Shards the batch was split into.
    pub shards: usize,
    /// Time spent building and merging the batch sketch.
    pub elapsed: Duration,
}

struct Window<S> {
    sketch: S,
    opened_at: DateTime<Utc>,
    last_processing: Duration,
    merged_batches: u64,
}

impl<S> Window<S> {
    fn open(sketch: S) -> Self {
        Self {
            sketch,
            opened_at: Utc::now(),
            last_processing: Duration::ZERO,
            merged_batches: 0,
        }
    }
}

/// Ingestion queue plus running window sketch of one metric.
///
/// Producers call [`ingest`](Self::ingest) from any thread. The coordinator
/// calls [`process`](Self::process) on every tick and [`roll`](Self::roll) on
/// every window boundary. The master sketch is only touched under its lock,
/// and only for the final merge of a batch and for the roll.
pub struct MetricStream<S: Sketch = HllSketch> {
    metric: MetricType,
    config: StreamConfig<S::Params>,
    queue: Mutex<Vec<u64>>,
    window: Mutex<Window<S>>,
    processor: WindowProcessor<S>,
}

impl<S: Sketch> MetricStream<S> {
    pub fn new(metric: MetricType, config: StreamConfig<S::Params>) -> Result<Self, Error> {
        let processor = WindowProcessor::new(metric, config.params(), config.num_shards())?;
        Ok(Self {
            metric,
            config,
            queue: Mutex::new(Vec::new()),
            window: Mutex::new(Window::open(S::create(config.params()))),
            processor,
        })
    }

    pub fn metric(&self) -> MetricType {
        self.metric
    }

    pub fn config(&self) -> &StreamConfig<S::Params> {
        &self.config
    }

    /// Append normalized values to the queue. Never drops or rejects values.
    pub fn ingest(&self, values: &[u64]) {
        if values.is_empty() {
            return;
        }
        self.queue.lock().extend_from_slice(values);
    }

    /// Number of values waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Take the queued values, up to `max_batch_size` if one is configured.
    ///
    /// The queue is swapped out under its lock, so values ingested while a
    /// drain is in progress wait for the next one. A capped drain takes the
    /// newest `max_batch_size` values; the older remainder is put back in
    /// front of anything ingested meanwhile.
    pub fn drain(&self) -> Vec<u64> {
        let mut taken = std::mem::take(&mut *self.queue.lock());
        let max = match self.config.max_batch_size() {
            Some(max) if taken.len() > max => max,
            _ => return taken,
        };

        let batch = taken.split_off(taken.len() - max);
        let mut queue = self.queue.lock();
        let newer = std::mem::replace(&mut *queue, taken);
        queue.extend(newer);
        batch
    }

    /// Drain the queue and fold it into the current window.
    ///
    /// Returns `Ok(None)` when nothing was queued. On error the drained batch
    /// is dropped and the master sketch is left as it was.
    pub fn process(&self) -> Result<Option<BatchReport>, Error> {
        let batch = self.drain();
        if batch.is_empty() {
            debug!(metric = %self.metric, "no events to process");
            return Ok(None);
        }

        let drained = batch.len();
        let started = Instant::now();
        let result = self.processor.build_batch(batch).and_then(|batch_sketch| {
            let mut window = self.window.lock();
            window.sketch.union_with(&batch_sketch)?;
            window.last_processing = started.elapsed();
            window.merged_batches += 1;
            Ok(window.last_processing)
        });

        match result {
            Ok(elapsed) => {
                info!(
                    metric = %self.metric,
                    drained,
                    shards = self.processor.num_shards(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "processed batch"
                );
                Ok(Some(BatchReport {
                    drained,
                    shards: self.processor.num_shards(),
                    elapsed,
                }))
            }
            Err(err) => {
                error!(
                    metric = %self.metric,
                    dropped = drained,
                    error = %err,
                    "batch processing failed, batch dropped"
                );
                Err(err)
            }
        }
    }

    /// Close the current window and start an empty one.
    ///
    /// The snapshot carries the estimate of the closed window and the
    /// duration of the last processing call merged into it.
    pub fn roll(&self) -> WindowSnapshot {
        let fresh = Window::open(S::create(self.config.params()));
        let closed = std::mem::replace(&mut *self.window.lock(), fresh);

        let snapshot = WindowSnapshot::new(
            self.metric,
            Utc::now(),
            closed.sketch.estimate(),
            closed.last_processing,
        );
        info!(
            metric = %self.metric,
            estimate = snapshot.estimated_count(),
            batches = closed.merged_batches,
            opened_at = %closed.opened_at,
            "rolled window"
        );
        snapshot
    }

    /// Estimate of the current window so far.
    pub fn estimate(&self) -> f64 {
        self.window.lock().sketch.estimate()
    }

    /// Batches merged into the current window so far.
    pub fn merged_batches(&self) -> u64 {
        self.window.lock().merged_batches
    }

    /// Memory held by the current window's sketch.
    pub fn sketch_size_bytes(&self) -> usize {
        self.window.lock().sketch.size_bytes()
    }
}
