/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::harness::error::HarnessError;
use bon::Builder;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_BROKERS: &str = "PULSAR_BROKERS";
pub const ENV_CLUSTER_NAME: &str = "PULSAR_CLUSTER_NAME";
pub const ENV_SERVICE_URL: &str = "PULSAR_SERVICE_URL";
pub const ENV_COMMAND_TIMEOUT: &str = "PULSAR_COMMAND_TIMEOUT";
pub const ENV_RECEIVE_TIMEOUT: &str = "PULSAR_RECEIVE_TIMEOUT";
pub const ENV_NODE_SELECTION: &str = "PULSAR_NODE_SELECTION";
pub const ENV_EXEC_MODE: &str = "PULSAR_EXEC_MODE";
pub const ENV_ADMIN_SCRIPT: &str = "PULSAR_ADMIN_SCRIPT";
pub const ENV_CLIENT_SCRIPT: &str = "PULSAR_CLIENT_SCRIPT";
pub const ENV_SCHEMA_FILE: &str = "PULSAR_SCHEMA_FILE";
pub const ENV_EXAMPLES_JAR: &str = "PULSAR_EXAMPLES_JAR";

pub const DEFAULT_CLUSTER_NAME: &str = "test";
pub const DEFAULT_SERVICE_URL: &str = "pulsar://localhost:6650";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_ADMIN_SCRIPT: &str = "/pulsar/bin/pulsar-admin";
pub const DEFAULT_CLIENT_SCRIPT: &str = "/pulsar/bin/pulsar-client";
pub const DEFAULT_SCHEMA_FILE: &str = "/pulsar/conf/schema_example.conf";
pub const DEFAULT_EXAMPLES_JAR: &str = "/pulsar/examples/api-examples.jar";

/// How [`ClusterHandle::any`](crate::harness::ClusterHandle::any) picks a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Always the first broker, so metadata written by one call is read back
    /// from the same broker by the next.
    #[default]
    Pinned,
    /// A uniformly random broker on every call.
    Random,
}

impl FromStr for NodeSelection {
    type Err = HarnessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "pinned" => Ok(NodeSelection::Pinned),
            "random" => Ok(NodeSelection::Random),
            other => Err(HarnessError::Config(format!(
                "unknown node selection `{other}`, expected `pinned` or `random`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// `docker exec` into the broker container named by the node id.
    #[default]
    Docker,
    /// Run the tools directly on this host.
    Local,
}

impl FromStr for ExecMode {
    type Err = HarnessError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "docker" => Ok(ExecMode::Docker),
            "local" => Ok(ExecMode::Local),
            other => Err(HarnessError::Config(format!(
                "unknown exec mode `{other}`, expected `docker` or `local`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Builder)]
pub struct ClusterConfig {
    /// Broker node identifiers, in the order `all()` visits them.
    #[builder(default)]
    pub brokers: Vec<String>,
    #[builder(default = DEFAULT_CLUSTER_NAME.to_string(), into)]
    pub cluster_name: String,
    #[builder(default = DEFAULT_SERVICE_URL.to_string(), into)]
    pub service_url: String,
    #[builder(default = DEFAULT_COMMAND_TIMEOUT)]
    pub command_timeout: Duration,
    #[builder(default = DEFAULT_RECEIVE_TIMEOUT)]
    pub receive_timeout: Duration,
    #[builder(default)]
    pub node_selection: NodeSelection,
    #[builder(default)]
    pub exec_mode: ExecMode,
    #[builder(default = DEFAULT_ADMIN_SCRIPT.to_string(), into)]
    pub admin_script: String,
    #[builder(default = DEFAULT_CLIENT_SCRIPT.to_string(), into)]
    pub client_script: String,
    #[builder(default = DEFAULT_SCHEMA_FILE.to_string(), into)]
    pub schema_file: String,
    #[builder(default = DEFAULT_EXAMPLES_JAR.to_string(), into)]
    pub examples_jar: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClusterConfig {
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, which maps variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let brokers = lookup(ENV_BROKERS)
            .ok_or_else(|| HarnessError::Config(format!("{ENV_BROKERS} is not set")))?
            .split(',')
            .map(str::trim)
            .filter(|broker| !broker.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if brokers.is_empty() {
            return Err(HarnessError::Config(format!(
                "{ENV_BROKERS} does not name any broker"
            )));
        }

        let mut config = Self::builder().brokers(brokers).build();

        if let Some(value) = lookup(ENV_CLUSTER_NAME) {
            config.cluster_name = value;
        }
        if let Some(value) = lookup(ENV_SERVICE_URL) {
            config.service_url = value;
        }
        if let Some(value) = lookup(ENV_COMMAND_TIMEOUT) {
            config.command_timeout = parse_duration(ENV_COMMAND_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_RECEIVE_TIMEOUT) {
            config.receive_timeout = parse_duration(ENV_RECEIVE_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_NODE_SELECTION) {
            config.node_selection = value.parse()?;
        }
        if let Some(value) = lookup(ENV_EXEC_MODE) {
            config.exec_mode = value.parse()?;
        }
        if let Some(value) = lookup(ENV_ADMIN_SCRIPT) {
            config.admin_script = value;
        }
        if let Some(value) = lookup(ENV_CLIENT_SCRIPT) {
            config.client_script = value;
        }
        if let Some(value) = lookup(ENV_SCHEMA_FILE) {
            config.schema_file = value;
        }
        if let Some(value) = lookup(ENV_EXAMPLES_JAR) {
            config.examples_jar = value;
        }

        Ok(config)
    }
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, HarnessError> {
    humantime::parse_duration(value)
        .map_err(|e| HarnessError::Config(format!("{key}=`{value}` is not a duration: {e}")))
}
