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

//! Error type shared by every fallible pipeline operation.
//!
//! An [`Error`] carries a coarse [`ErrorKind`] to branch on, a message, and
//! key/value context such as the metric or shard that failed. Per-metric
//! failures never escape the coordinator; they surface in its tick summary.

use std::fmt;

use crate::metric::MetricType;

/// The kinds of failure the pipeline distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The pipeline or stream configuration is invalid.
    ConfigInvalid,
    /// Two sketches built with different parameters were merged.
    IncompatibleSketch,
    /// A shard worker failed while building its local sketch.
    ShardFailed,
    /// The snapshot store rejected a write or a query.
    StoreFailed,
    /// A scheduler or worker pool thread could not be started.
    SchedulerFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::IncompatibleSketch => "IncompatibleSketch",
            ErrorKind::ShardFailed => "ShardFailed",
            ErrorKind::StoreFailed => "StoreFailed",
            ErrorKind::SchedulerFailed => "SchedulerFailed",
        };
        f.write_str(name)
    }
}

/// Error returned by all fallible pipeline functions.
pub struct Error {
    kind: ErrorKind,
    message: String,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    pub(crate) fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    pub(crate) fn shard_failed(metric: MetricType, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ShardFailed, message).with_metric(metric)
    }

    pub(crate) fn scheduler_failed(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::SchedulerFailed, message).set_source(source)
    }

    /// Attach a key/value pair, e.g. the shard index that failed.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Record the metric the failure belongs to.
    pub fn with_metric(self, metric: MetricType) -> Self {
        self.with_context("metric", metric)
    }

    /// Attach the underlying cause.
    ///
    /// # Panics
    ///
    /// If a source was already attached.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::error::Error as _;
    /// use distinct_windows::error::{Error, ErrorKind};
    ///
    /// let error = Error::new(ErrorKind::StoreFailed, "cannot save window snapshot")
    ///     .set_source(std::io::Error::other("connection reset"));
    /// assert_eq!(error.source().unwrap().to_string(), "connection reset");
    /// ```
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        assert!(self.source.is_none(), "the source error has been set");
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Value recorded for a context key, if any.
    pub fn context(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The metric recorded with [`with_metric`](Self::with_metric), if any.
    pub fn metric(&self) -> Option<MetricType> {
        self.context("metric")?.parse().ok()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }

        let mut pairs = self.context.iter();
        if let Some((key, value)) = pairs.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in pairs {
                write!(f, ", {key}={value}")?;
            }
            f.write_str(")")?;
        }

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("kind", &self.kind)
                .field("message", &self.message)
                .field("context", &self.context)
                .field("source", &self.source)
                .finish();
        }

        fmt::Display::fmt(self, f)?;
        if let Some(source) = &self.source {
            // the outermost cause is already part of the Display output
            let causes: Vec<String> = source.chain().skip(1).map(|c| c.to_string()).collect();
            if !causes.is_empty() {
                f.write_str("\n\nCaused by:")?;
                for cause in causes {
                    write!(f, "\n    {cause}")?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|source| source.as_ref())
    }
}
