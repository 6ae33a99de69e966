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

//! Windowed distinct-count estimation over live event streams.
//!
//! Producers push 64-bit values for a [`MetricType`] into its
//! [`MetricStream`]. On every tick the [`BatchCoordinator`] drains each
//! stream, splits the batch into shards, builds one HyperLogLog sketch per
//! shard on a worker pool, folds the shard sketches together and merges the
//! result into the stream's current-window sketch. On every window boundary
//! the window is rolled: its estimate becomes a [`WindowSnapshot`] handed to
//! a [`SnapshotStore`], and an empty sketch takes its place.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use distinct_windows::config::PipelineConfig;
//! use distinct_windows::coordinator::BatchCoordinator;
//! use distinct_windows::hash::{hash_identity, normalize};
//! use distinct_windows::metric::MetricType;
//! use distinct_windows::snapshot::InMemorySnapshotStore;
//!
//! let store = Arc::new(InMemorySnapshotStore::new());
//! let coordinator = BatchCoordinator::from_config(&PipelineConfig::default(), store.clone()).unwrap();
//!
//! let ips: Vec<u64> = ["198.51.100.1", "198.51.100.2", "198.51.100.1"]
//!     .iter()
//!     .map(|ip| normalize(hash_identity(*ip)))
//!     .collect();
//! coordinator.ingest(MetricType::DistinctIpAddress, &ips).unwrap();
//!
//! coordinator.tick();
//! let snapshots = coordinator.roll_all();
//! let ip_window = snapshots
//!     .iter()
//!     .find(|s| s.metric_type() == MetricType::DistinctIpAddress)
//!     .unwrap();
//! assert!((ip_window.estimated_count() - 2.0).abs() < 0.1);
//! assert_eq!(store.len(), 3);
//! ```
//!
//! Losing a batch is accepted: if building or merging a batch fails, that
//! batch is dropped and the window simply undercounts. See
//! [`MetricStream::process`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hash;
pub mod hll;
pub mod logging;
pub mod metric;
pub mod partition;
pub mod processor;
pub mod registry;
pub mod scheduler;
pub mod sketch;
pub mod snapshot;
pub mod stream;

pub use coordinator::BatchCoordinator;
pub use metric::MetricType;
pub use sketch::Sketch;
pub use snapshot::SnapshotStore;
pub use snapshot::WindowSnapshot;
pub use stream::MetricStream;
