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

//! Fan-out of per-metric processing with a join deadline.

use std::collections::BTreeMap;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel::RecvTimeoutError;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::error::Error;
use crate::hll::HllSketch;
use crate::metric::MetricType;
use crate::processor::panic_message;
use crate::registry::MetricRegistry;
use crate::sketch::Sketch;
use crate::snapshot::SnapshotStore;
use crate::snapshot::WindowSnapshot;
use crate::stream::BatchReport;

/// What happened to one metric during a tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The queue was empty.
    Idle,
    /// A batch was merged into the current window.
    Processed(BatchReport),
    /// The batch was dropped because processing failed.
    Failed(Error),
    /// The metric did not finish before the deadline; its result is ignored.
    TimedOut,
}

/// Outcomes of one coordinator tick, keyed by metric.
#[derive(Debug)]
pub struct TickSummary {
    outcomes: BTreeMap<MetricType, TickOutcome>,
    elapsed: Duration,
}

impl TickSummary {
    pub fn outcome(&self, metric: MetricType) -> Option<&TickOutcome> {
        self.outcomes.get(&metric)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (MetricType, &TickOutcome)> {
        self.outcomes.iter().map(|(metric, outcome)| (*metric, outcome))
    }

    /// True if at least one metric missed the deadline.
    pub fn is_degraded(&self) -> bool {
        self.outcomes
            .values()
            .any(|outcome| matches!(outcome, TickOutcome::TimedOut))
    }

    pub fn failures(&self) -> impl Iterator<Item = (MetricType, &Error)> {
        self.outcomes.iter().filter_map(|(metric, outcome)| match outcome {
            TickOutcome::Failed(err) => Some((*metric, err)),
            _ => None,
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Runs every metric's window processing concurrently on a shared bounded
/// pool and persists rolled windows.
pub struct BatchCoordinator<S: Sketch = HllSketch> {
    registry: MetricRegistry<S>,
    store: Arc<dyn SnapshotStore>,
    pool: rayon::ThreadPool,
    deadline: Duration,
}

impl BatchCoordinator<HllSketch> {
    /// Build the registry and the coordinator pool from a pipeline config.
    pub fn from_config(config: &PipelineConfig, store: Arc<dyn SnapshotStore>) -> Result<Self, Error> {
        let registry = MetricRegistry::from_config(config)?;
        Self::new(registry, store, config.coordinator_threads(), config.tick_deadline())
    }
}

impl<S: Sketch> BatchCoordinator<S> {
    pub fn new(
        registry: MetricRegistry<S>,
        store: Arc<dyn SnapshotStore>,
        threads: usize,
        deadline: Duration,
    ) -> Result<Self, Error> {
        if threads == 0 {
            return Err(Error::config_invalid("coordinator_threads must be at least 1"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("coordinator-{i}"))
            .build()
            .map_err(|err| {
                Error::scheduler_failed("cannot start coordinator pool", err)
            })?;

        Ok(Self {
            registry,
            store,
            pool,
            deadline,
        })
    }

    pub fn registry(&self) -> &MetricRegistry<S> {
        &self.registry
    }

    /// Queue normalized values for `metric`.
    pub fn ingest(&self, metric: MetricType, values: &[u64]) -> Result<(), Error> {
        self.registry.ingest(metric, values)
    }

    /// Process every metric once and wait for all of them up to the deadline.
    ///
    /// Never fails: per-metric errors and timeouts are logged and reported in
    /// the summary. A metric still running at the deadline keeps running in
    /// the background but its result is discarded.
    pub fn tick(&self) -> TickSummary {
        let started = Instant::now();
        let expected = self.registry.len();
        info!(metrics = expected, "starting batch tick");

        let (tx, rx) = crossbeam_channel::unbounded();
        for (metric, stream) in self.registry.iter() {
            let tx = tx.clone();
            let stream = Arc::clone(stream);
            self.pool.spawn(move || {
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| stream.process())) {
                    Ok(Ok(Some(report))) => TickOutcome::Processed(report),
                    Ok(Ok(None)) => TickOutcome::Idle,
                    Ok(Err(err)) => TickOutcome::Failed(err),
                    Err(payload) => {
                        let err = Error::shard_failed(metric, panic_message(payload.as_ref()));
                        error!(metric = %metric, error = %err, "metric task panicked");
                        TickOutcome::Failed(err)
                    }
                };
                // receiver is gone once the tick gave up on this metric
                let _ = tx.send((metric, outcome));
            });
        }
        drop(tx);

        let deadline = started + self.deadline;
        let mut outcomes = BTreeMap::new();
        while outcomes.len() < expected {
            match rx.recv_deadline(deadline) {
                Ok((metric, outcome)) => {
                    outcomes.insert(metric, outcome);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        for metric in self.registry.metrics() {
            outcomes.entry(metric).or_insert(TickOutcome::TimedOut);
        }

        let summary = TickSummary {
            outcomes,
            elapsed: started.elapsed(),
        };
        for (metric, err) in summary.failures() {
            debug!(metric = %metric, error = %err, "metric failed during batch tick");
        }
        if summary.is_degraded() {
            let timed_out: Vec<&str> = summary
                .outcomes()
                .filter(|(_, outcome)| matches!(outcome, TickOutcome::TimedOut))
                .map(|(metric, _)| metric.as_str())
                .collect();
            warn!(
                timed_out = ?timed_out,
                deadline_ms = self.deadline.as_millis() as u64,
                "batch tick exceeded deadline"
            );
        } else {
            info!(
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "completed batch tick"
            );
        }
        summary
    }

    /// Roll every metric's window and hand the snapshots to the store.
    ///
    /// A store failure is logged and does not stop the other metrics; the
    /// snapshots are returned either way.
    pub fn roll_all(&self) -> Vec<WindowSnapshot> {
        let mut snapshots = Vec::with_capacity(self.registry.len());
        for (metric, stream) in self.registry.iter() {
            let snapshot = stream.roll();
            match self.store.save(snapshot.clone()) {
                Ok(id) => info!(metric = %metric, id, "saved window snapshot"),
                Err(err) => error!(metric = %metric, error = %err, "failed to save window snapshot"),
            }
            snapshots.push(snapshot);
        }
        snapshots
    }
}
