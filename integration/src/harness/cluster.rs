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

use crate::harness::config::{ClusterConfig, ExecMode, NodeSelection};
use crate::harness::error::HarnessError;
use crate::harness::exec::{CommandFailure, ExecResult};
use crate::harness::executor::{CommandExecutor, DockerExecutor, LocalExecutor};
use crate::harness::runner::CommandRunner;
use crate::roundtrip::ProduceConsumeVerifier;
use crate::session::{PulsarSessionFactory, RecordSession, SessionFactory, SessionTarget};
use rand::Rng as _;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_TENANT: &str = "public";

/// One addressable broker, identified by its container name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerNode {
    id: String,
}

impl BrokerNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for BrokerNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Suite-wide handle on the broker nodes of a running cluster.
///
/// The handle is read-only after construction and is shared by every
/// scenario. Scenarios isolate themselves through unique resource names,
/// never through locks on the handle.
pub struct ClusterHandle {
    config: ClusterConfig,
    nodes: Vec<BrokerNode>,
    runner: CommandRunner,
    sessions: Arc<dyn SessionFactory>,
}

impl std::fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("cluster_name", &self.config.cluster_name)
            .field("nodes", &self.nodes)
            .field("node_selection", &self.config.node_selection)
            .finish_non_exhaustive()
    }
}

impl ClusterHandle {
    /// Builds a handle that executes through `docker exec` (or locally) and
    /// opens Pulsar binary-protocol sessions against the service URL.
    pub fn from_config(config: ClusterConfig) -> Result<Self, HarnessError> {
        let executor: Arc<dyn CommandExecutor> = match config.exec_mode {
            ExecMode::Docker => Arc::new(DockerExecutor::default()),
            ExecMode::Local => Arc::new(LocalExecutor),
        };
        let sessions = Arc::new(PulsarSessionFactory::new(config.service_url.clone()));
        Self::with_parts(config, executor, sessions)
    }

    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_config(ClusterConfig::from_env()?)
    }

    /// Builds a handle over caller-supplied command and session backends.
    pub fn with_parts(
        config: ClusterConfig,
        executor: Arc<dyn CommandExecutor>,
        sessions: Arc<dyn SessionFactory>,
    ) -> Result<Self, HarnessError> {
        if config.brokers.is_empty() {
            return Err(HarnessError::NoBrokers);
        }
        let nodes = config.brokers.iter().map(BrokerNode::new).collect::<Vec<_>>();
        let runner = CommandRunner::new(executor, config.command_timeout);
        info!(
            cluster = %config.cluster_name,
            brokers = nodes.len(),
            node_selection = ?config.node_selection,
            "Cluster handle created"
        );
        Ok(Self {
            config,
            nodes,
            runner,
            sessions,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn cluster_name(&self) -> &str {
        &self.config.cluster_name
    }

    pub fn service_url(&self) -> &str {
        &self.config.service_url
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// One node, chosen by the configured [`NodeSelection`].
    pub fn any(&self) -> &BrokerNode {
        match self.config.node_selection {
            NodeSelection::Pinned => &self.nodes[0],
            NodeSelection::Random => {
                let index = rand::rng().random_range(0..self.nodes.len());
                &self.nodes[index]
            }
        }
    }

    /// Every node, always in configuration order.
    pub fn all(&self) -> &[BrokerNode] {
        &self.nodes
    }

    pub async fn run_admin_command<S: AsRef<str>>(
        &self,
        node: &BrokerNode,
        args: &[S],
    ) -> Result<ExecResult, HarnessError> {
        let argv = with_entry_point(&self.config.admin_script, args);
        self.runner.execute(node, &argv).await
    }

    pub async fn run_admin_command_on_any_broker<S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<ExecResult, HarnessError> {
        self.run_admin_command(self.any(), args).await
    }

    pub async fn admin_command_expecting_failure<S: AsRef<str>>(
        &self,
        node: &BrokerNode,
        args: &[S],
    ) -> Result<CommandFailure, HarnessError> {
        let argv = with_entry_point(&self.config.admin_script, args);
        self.runner.execute_expecting_failure(node, &argv).await
    }

    pub async fn run_client_command<S: AsRef<str>>(
        &self,
        node: &BrokerNode,
        args: &[S],
    ) -> Result<ExecResult, HarnessError> {
        let argv = with_entry_point(&self.config.client_script, args);
        self.runner.execute(node, &argv).await
    }

    pub async fn run_client_command_on_any_broker<S: AsRef<str>>(
        &self,
        args: &[S],
    ) -> Result<ExecResult, HarnessError> {
        self.run_client_command(self.any(), args).await
    }

    pub async fn client_command_expecting_failure<S: AsRef<str>>(
        &self,
        node: &BrokerNode,
        args: &[S],
    ) -> Result<CommandFailure, HarnessError> {
        let argv = with_entry_point(&self.config.client_script, args);
        self.runner.execute_expecting_failure(node, &argv).await
    }

    /// Creates `public/<name>`. Callers pass an already unique name.
    pub async fn create_namespace(&self, name: &str) -> Result<ExecResult, HarnessError> {
        let namespace = format!("{DEFAULT_TENANT}/{name}");
        self.run_admin_command_on_any_broker(&["namespaces", "create", namespace.as_str()])
            .await
    }

    pub fn sessions(&self) -> &Arc<dyn SessionFactory> {
        &self.sessions
    }

    pub async fn open_session(
        &self,
        target: &SessionTarget,
    ) -> Result<Box<dyn RecordSession>, HarnessError> {
        self.sessions.open_session(target).await
    }

    pub fn produce_consume_verifier(&self) -> ProduceConsumeVerifier {
        ProduceConsumeVerifier::new(self.sessions.clone(), self.config.receive_timeout)
    }
}

fn with_entry_point<S: AsRef<str>>(entry_point: &str, args: &[S]) -> Vec<String> {
    std::iter::once(entry_point.to_string())
        .chain(args.iter().map(|arg| arg.as_ref().to_string()))
        .collect()
}
