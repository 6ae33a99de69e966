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

//! Stream and pipeline configuration.
//!
//! Per-metric sketch parameters are fixed for the lifetime of a stream, so
//! everything here is validated up front and immutable afterwards.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;
use crate::hll::DEFAULT_LG_K;
use crate::hll::HllParams;
use crate::hll::HllType;
use crate::metric::MetricType;

pub const DEFAULT_NUM_SHARDS: usize = 4;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_ROLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_TICK_DEADLINE: Duration = Duration::from_secs(60);

/// Configuration of one metric stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig<P = HllParams> {
    params: P,
    num_shards: usize,
    max_batch_size: Option<usize>,
}

impl<P: Copy> StreamConfig<P> {
    /// Create a configuration with explicit sketch parameters.
    pub fn new(params: P, num_shards: usize) -> Result<Self, Error> {
        if num_shards == 0 {
            return Err(Error::config_invalid("num_shards must be at least 1"));
        }
        Ok(Self {
            params,
            num_shards,
            max_batch_size: None,
        })
    }

    /// Cap the number of values drained per tick; the rest stays queued.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Result<Self, Error> {
        if max_batch_size == 0 {
            return Err(Error::config_invalid("max_batch_size must be at least 1"));
        }
        self.max_batch_size = Some(max_batch_size);
        Ok(self)
    }

    pub fn params(&self) -> P {
        self.params
    }

    /// Number of shards per batch, which is also the stream's worker count.
    pub fn num_shards(&self) -> usize {
        self.num_shards
    }

    pub fn max_batch_size(&self) -> Option<usize> {
        self.max_batch_size
    }
}

impl StreamConfig<HllParams> {
    /// Create a new builder for a HyperLogLog-backed stream.
    ///
    /// # Examples
    ///
    /// ```
    /// # use distinct_windows::config::StreamConfig;
    /// # use distinct_windows::hll::HllType;
    /// let config = StreamConfig::builder()
    ///     .lg_k(16)
    ///     .hll_type(HllType::Hll6)
    ///     .num_shards(8)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.params().lg_k(), 16);
    /// assert_eq!(config.num_shards(), 8);
    /// ```
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::default()
    }
}

impl Default for StreamConfig<HllParams> {
    fn default() -> Self {
        Self {
            params: HllParams::default(),
            num_shards: DEFAULT_NUM_SHARDS,
            max_batch_size: None,
        }
    }
}

/// Builder for [`StreamConfig`]
#[derive(Debug, Clone)]
pub struct StreamConfigBuilder {
    lg_k: u8,
    hll_type: HllType,
    num_shards: usize,
    max_batch_size: Option<usize>,
}

impl Default for StreamConfigBuilder {
    fn default() -> Self {
        Self {
            lg_k: DEFAULT_LG_K,
            hll_type: HllType::Hll8,
            num_shards: DEFAULT_NUM_SHARDS,
            max_batch_size: None,
        }
    }
}

impl StreamConfigBuilder {
    /// Set lg_k (log2 of the register count), validated in [`build`](Self::build).
    pub fn lg_k(mut self, lg_k: u8) -> Self {
        self.lg_k = lg_k;
        self
    }

    pub fn hll_type(mut self, hll_type: HllType) -> Self {
        self.hll_type = hll_type;
        self
    }

    pub fn num_shards(mut self, num_shards: usize) -> Self {
        self.num_shards = num_shards;
        self
    }

    pub fn max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    pub fn build(self) -> Result<StreamConfig, Error> {
        let params = HllParams::new(self.lg_k, self.hll_type)?;
        let config = StreamConfig::new(params, self.num_shards)?;
        match self.max_batch_size {
            Some(max) => config.with_max_batch_size(max),
            None => Ok(config),
        }
    }
}

/// Cadence, deadline and per-metric configuration of the whole pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    tick_interval: Duration,
    roll_interval: Duration,
    tick_deadline: Duration,
    coordinator_threads: usize,
    streams: BTreeMap<MetricType, StreamConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            roll_interval: DEFAULT_ROLL_INTERVAL,
            tick_deadline: DEFAULT_TICK_DEADLINE,
            coordinator_threads: default_coordinator_threads(),
            streams: MetricType::ALL
                .into_iter()
                .map(|metric| (metric, StreamConfig::default()))
                .collect(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document. Metrics without a `[streams.<METRIC>]` table use
    /// the default stream configuration.
    ///
    /// ```toml
    /// tick_interval_ms = 5000
    /// roll_interval_ms = 60000
    ///
    /// [streams.DISTINCT_IP_ADDRESS]
    /// lg_k = 16
    /// num_shards = 8
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let raw: RawPipelineConfig = toml::from_str(content)
            .map_err(|err| Error::config_invalid("malformed pipeline config").set_source(err))?;
        raw.into_config()
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::config_invalid("cannot read pipeline config")
                .with_context("path", path.display())
                .set_source(err)
        })?;
        Self::from_toml_str(&content).map_err(|err| err.with_context("path", path.display()))
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_roll_interval(mut self, interval: Duration) -> Self {
        self.roll_interval = interval;
        self
    }

    pub fn with_tick_deadline(mut self, deadline: Duration) -> Self {
        self.tick_deadline = deadline;
        self
    }

    pub fn with_coordinator_threads(mut self, threads: usize) -> Self {
        self.coordinator_threads = threads;
        self
    }

    pub fn with_stream(mut self, metric: MetricType, config: StreamConfig) -> Self {
        self.streams.insert(metric, config);
        self
    }

    /// Check the cadence settings and that every metric has a stream.
    pub fn validate(&self) -> Result<(), Error> {
        if self.tick_interval.is_zero() {
            return Err(Error::config_invalid("tick_interval must be positive"));
        }
        if self.roll_interval.is_zero() {
            return Err(Error::config_invalid("roll_interval must be positive"));
        }
        if self.tick_deadline.is_zero() {
            return Err(Error::config_invalid("tick_deadline must be positive"));
        }
        if self.coordinator_threads == 0 {
            return Err(Error::config_invalid("coordinator_threads must be at least 1"));
        }
        if let Some(missing) = MetricType::ALL
            .into_iter()
            .find(|metric| !self.streams.contains_key(metric))
        {
            return Err(Error::config_invalid("no stream configured for metric")
                .with_metric(missing));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn roll_interval(&self) -> Duration {
        self.roll_interval
    }

    pub fn tick_deadline(&self) -> Duration {
        self.tick_deadline
    }

    pub fn coordinator_threads(&self) -> usize {
        self.coordinator_threads
    }

    pub fn stream(&self, metric: MetricType) -> Option<&StreamConfig> {
        self.streams.get(&metric)
    }

    pub fn streams(&self) -> impl Iterator<Item = (MetricType, &StreamConfig)> {
        self.streams.iter().map(|(metric, config)| (*metric, config))
    }
}

fn default_coordinator_threads() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(DEFAULT_NUM_SHARDS)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPipelineConfig {
    tick_interval_ms: Option<u64>,
    roll_interval_ms: Option<u64>,
    tick_deadline_ms: Option<u64>,
    coordinator_threads: Option<usize>,
    #[serde(default)]
    streams: BTreeMap<MetricType, RawStreamConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStreamConfig {
    lg_k: Option<u8>,
    hll_type: Option<HllType>,
    num_shards: Option<usize>,
    max_batch_size: Option<usize>,
}

impl RawPipelineConfig {
    fn into_config(self) -> Result<PipelineConfig, Error> {
        let mut config = PipelineConfig::default();
        if let Some(ms) = self.tick_interval_ms {
            config.tick_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.roll_interval_ms {
            config.roll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.tick_deadline_ms {
            config.tick_deadline = Duration::from_millis(ms);
        }
        if let Some(threads) = self.coordinator_threads {
            config.coordinator_threads = threads;
        }

        for (metric, raw) in self.streams {
            let mut builder = StreamConfig::builder();
            if let Some(lg_k) = raw.lg_k {
                builder = builder.lg_k(lg_k);
            }
            if let Some(hll_type) = raw.hll_type {
                builder = builder.hll_type(hll_type);
            }
            if let Some(num_shards) = raw.num_shards {
                builder = builder.num_shards(num_shards);
            }
            if let Some(max) = raw.max_batch_size {
                builder = builder.max_batch_size(max);
            }
            let stream = builder
                .build()
                .map_err(|err| err.with_metric(metric))?;
            config.streams.insert(metric, stream);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults_cover_every_metric() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        for metric in MetricType::ALL {
            let stream = config.stream(metric).unwrap();
            assert_eq!(stream.params().lg_k(), DEFAULT_LG_K);
            assert_eq!(stream.num_shards(), DEFAULT_NUM_SHARDS);
            assert_eq!(stream.max_batch_size(), None);
        }
    }

    #[test]
    fn test_builder_rejects_zero_shards() {
        let err = StreamConfig::builder().num_shards(0).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_zero_interval_is_invalid() {
        let config = PipelineConfig::default().with_tick_interval(Duration::ZERO);
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::ConfigInvalid);
    }
}
