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

//! Window results and the store they are handed to.

use std::fmt;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::metric::MetricType;

/// Immutable result of one completed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    metric_type: MetricType,
    timestamp: DateTime<Utc>,
    estimated_count: f64,
    processing_time_millis: i64,
}

impl WindowSnapshot {
    pub fn new(
        metric_type: MetricType,
        timestamp: DateTime<Utc>,
        estimated_count: f64,
        processing_time: Duration,
    ) -> Self {
        Self {
            metric_type,
            timestamp,
            estimated_count,
            processing_time_millis: i64::try_from(processing_time.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// When the window was rolled.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn estimated_count(&self) -> f64 {
        self.estimated_count
    }

    /// Duration of the last processing call merged into the window.
    pub fn processing_time_millis(&self) -> i64 {
        self.processing_time_millis
    }
}

impl fmt::Display for WindowSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WindowSnapshot({}, finishedAt={}, distinctCount={:.6}, processingTimeMs={})",
            self.metric_type,
            self.timestamp.to_rfc3339(),
            self.estimated_count,
            self.processing_time_millis
        )
    }
}

/// A snapshot with the id assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub id: u64,
    #[serde(flatten)]
    pub snapshot: WindowSnapshot,
}

/// Persistence collaborator for window results.
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot and return its id.
    fn save(&self, snapshot: WindowSnapshot) -> Result<u64, Error>;

    /// Snapshots of `metric` rolled strictly after `after`, oldest first.
    fn find_finished_after(
        &self,
        metric: MetricType,
        after: DateTime<Utc>,
    ) -> Result<Vec<StoredSnapshot>, Error>;
}

/// Process-local [`SnapshotStore`].
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    rows: RwLock<Vec<StoredSnapshot>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn save(&self, snapshot: WindowSnapshot) -> Result<u64, Error> {
        let mut rows = self.rows.write();
        let id = rows.len() as u64 + 1;
        rows.push(StoredSnapshot { id, snapshot });
        Ok(id)
    }

    fn find_finished_after(
        &self,
        metric: MetricType,
        after: DateTime<Utc>,
    ) -> Result<Vec<StoredSnapshot>, Error> {
        let mut found: Vec<StoredSnapshot> = self
            .rows
            .read()
            .iter()
            .filter(|row| row.snapshot.metric_type == metric && row.snapshot.timestamp > after)
            .cloned()
            .collect();
        found.sort_by_key(|row| (row.snapshot.timestamp, row.id));
        Ok(found)
    }
}
