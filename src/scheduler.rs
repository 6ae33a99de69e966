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

//! Periodic triggers for ticks and window rolls.
//!
//! A [`Scheduler`] owns two threads: one calls
//! [`BatchCoordinator::tick`] every tick interval, the other calls
//! [`BatchCoordinator::roll_all`] every roll interval. Both stop when the
//! scheduler is stopped or dropped. Missed ticks are skipped rather than
//! queued, so a slow tick never causes a burst of catch-up ticks.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::select;
use tracing::debug;
use tracing::info;

use crate::config::PipelineConfig;
use crate::coordinator::BatchCoordinator;
use crate::error::Error;
use crate::sketch::Sketch;

/// Running tick and roll triggers.
pub struct Scheduler {
    // dropping the sender disconnects the channel and wakes both threads
    stop: Option<Sender<()>>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Scheduler {
    /// Start triggers with the intervals of `config`.
    pub fn start_with_config<S: Sketch>(
        coordinator: Arc<BatchCoordinator<S>>,
        config: &PipelineConfig,
    ) -> Result<Self, Error> {
        Self::start(coordinator, config.tick_interval(), config.roll_interval())
    }

    /// Start the tick and roll threads.
    pub fn start<S: Sketch>(
        coordinator: Arc<BatchCoordinator<S>>,
        tick_interval: Duration,
        roll_interval: Duration,
    ) -> Result<Self, Error> {
        if tick_interval.is_zero() || roll_interval.is_zero() {
            return Err(Error::config_invalid("scheduler intervals must be positive"));
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let mut scheduler = Scheduler {
            stop: Some(stop_tx),
            handles: Vec::with_capacity(2),
        };

        let tick_coordinator = Arc::clone(&coordinator);
        scheduler.spawn("batch-tick", tick_interval, stop_rx.clone(), move || {
            tick_coordinator.tick();
        })?;
        scheduler.spawn("window-roll", roll_interval, stop_rx, move || {
            coordinator.roll_all();
        })?;

        info!(
            tick_ms = tick_interval.as_millis() as u64,
            roll_ms = roll_interval.as_millis() as u64,
            "scheduler started"
        );
        Ok(scheduler)
    }

    fn spawn(
        &mut self,
        name: &str,
        interval: Duration,
        stop: Receiver<()>,
        mut task: impl FnMut() + Send + 'static,
    ) -> Result<(), Error> {
        let ticker = crossbeam_channel::tick(interval);
        let thread_name = name.to_string();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    let stopped = select! {
                        recv(ticker) -> _ => false,
                        recv(stop) -> _ => true,
                    };
                    if stopped {
                        break;
                    }
                    task();
                }
                debug!(thread = %thread_name, "trigger stopped");
            })
            .map_err(|err| {
                Error::scheduler_failed("cannot spawn trigger thread", err).with_context("thread", name)
            })?;
        self.handles.push(handle);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.stop.is_some()
    }

    /// Stop both triggers and wait for an in-flight tick or roll to finish.
    pub fn stop(&mut self) {
        if self.stop.take().is_none() {
            return;
        }
        for handle in self.handles.drain(..) {
            // a panicking tick already logged through the panic hook
            let _ = handle.join();
        }
        info!("scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
