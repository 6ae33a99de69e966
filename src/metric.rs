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

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;

/// The distinct counts tracked by the pipeline.
///
/// The set is closed: adding a metric means adding a variant here and a
/// stream configuration for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    /// Distinct account ids; spikes indicate signup flooding.
    DistinctAccountId,
    /// Distinct signup email domains; disposable-domain attacks.
    DistinctEmailDomain,
    /// Distinct source IP addresses; volumetric DDoS.
    DistinctIpAddress,
}

impl MetricType {
    pub const ALL: [MetricType; 3] = [
        MetricType::DistinctAccountId,
        MetricType::DistinctEmailDomain,
        MetricType::DistinctIpAddress,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            MetricType::DistinctAccountId => "DISTINCT_ACCOUNT_ID",
            MetricType::DistinctEmailDomain => "DISTINCT_EMAIL_DOMAIN",
            MetricType::DistinctIpAddress => "DISTINCT_IP_ADDRESS",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricType::ALL
            .into_iter()
            .find(|metric| metric.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::config_invalid(format!("unknown metric type: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for metric in MetricType::ALL {
            assert_eq!(metric.as_str().parse::<MetricType>().unwrap(), metric);
        }
        assert_eq!(
            "distinct_ip_address".parse::<MetricType>().unwrap(),
            MetricType::DistinctIpAddress
        );
        assert!("DISTINCT_PHONE".parse::<MetricType>().is_err());
    }
}
