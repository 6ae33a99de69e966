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

//! Dispatch table from metric type to its stream.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::Error;
use crate::hll::HllSketch;
use crate::metric::MetricType;
use crate::sketch::Sketch;
use crate::stream::MetricStream;

/// The streams of every configured metric, keyed by [`MetricType`].
pub struct MetricRegistry<S: Sketch = HllSketch> {
    streams: BTreeMap<MetricType, Arc<MetricStream<S>>>,
}

impl MetricRegistry<HllSketch> {
    /// Create one HyperLogLog stream per configured metric.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, Error> {
        config.validate()?;
        let mut registry = Self::new();
        for (metric, stream_config) in config.streams() {
            registry.register(MetricStream::new(metric, *stream_config)?);
        }
        Ok(registry)
    }
}

impl<S: Sketch> MetricRegistry<S> {
    pub fn new() -> Self {
        Self {
            streams: BTreeMap::new(),
        }
    }

    /// Add a stream, replacing any previous stream of the same metric.
    pub fn register(&mut self, stream: MetricStream<S>) -> &mut Self {
        self.streams.insert(stream.metric(), Arc::new(stream));
        self
    }

    pub fn get(&self, metric: MetricType) -> Option<&Arc<MetricStream<S>>> {
        self.streams.get(&metric)
    }

    /// Queue normalized values on the stream of `metric`.
    pub fn ingest(&self, metric: MetricType, values: &[u64]) -> Result<(), Error> {
        let stream = self.get(metric).ok_or_else(|| {
            Error::config_invalid("no stream registered for metric").with_metric(metric)
        })?;
        stream.ingest(values);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricType, &Arc<MetricStream<S>>)> {
        self.streams.iter().map(|(metric, stream)| (*metric, stream))
    }

    pub fn metrics(&self) -> impl Iterator<Item = MetricType> + '_ {
        self.streams.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl<S: Sketch> Default for MetricRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_from_config_registers_every_metric() {
        let registry = MetricRegistry::from_config(&PipelineConfig::default()).unwrap();
        assert_eq!(registry.metrics().collect::<Vec<_>>(), MetricType::ALL.to_vec());
    }

    #[test]
    fn test_ingest_unknown_metric() {
        let registry: MetricRegistry = MetricRegistry::new();
        let err = registry.ingest(MetricType::DistinctIpAddress, &[1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}
