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

use crate::harness::{BrokerNode, ClusterHandle, CommandFailure, ExecResult, HarnessError};
use tracing::info;

/// Text the admin tool prints on stderr when a topic has no schema.
pub const SCHEMA_NOT_FOUND: &str = "Reason: HTTP 404 Not Found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    NoSchema,
    Uploaded,
    Deleted,
}

/// Outcome of a schema lookup, already checked against the expected state.
#[derive(Debug)]
pub enum SchemaLookup {
    Found(ExecResult),
    NotFound(CommandFailure),
}

impl SchemaLookup {
    /// Descriptor text printed by a successful lookup.
    pub fn descriptor(&self) -> Option<&str> {
        match self {
            SchemaLookup::Found(result) => Some(result.stdout()),
            SchemaLookup::NotFound(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaLookup::NotFound(_))
    }
}

/// Drives the upload/get/delete lifecycle of one topic's schema.
///
/// Every call runs on the same node, since schema metadata is not guaranteed
/// to be visible on other brokers right away.
#[derive(Debug)]
pub struct SchemaLifecycleVerifier<'a> {
    cluster: &'a ClusterHandle,
    node: BrokerNode,
    topic: String,
    state: SchemaState,
}

impl<'a> SchemaLifecycleVerifier<'a> {
    pub fn new(cluster: &'a ClusterHandle, node: BrokerNode, topic: impl Into<String>) -> Self {
        Self {
            cluster,
            node,
            topic: topic.into(),
            state: SchemaState::NoSchema,
        }
    }

    /// Binds the verifier to the node [`ClusterHandle::any`] picks.
    pub fn on_any_broker(cluster: &'a ClusterHandle, topic: impl Into<String>) -> Self {
        Self::new(cluster, cluster.any().clone(), topic)
    }

    pub fn state(&self) -> SchemaState {
        self.state
    }

    pub fn node(&self) -> &BrokerNode {
        &self.node
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub async fn upload(&mut self, schema_file: &str) -> Result<ExecResult, HarnessError> {
        self.require("upload", SchemaState::NoSchema)?;
        let result = self
            .cluster
            .run_admin_command(
                &self.node,
                &["schemas", "upload", self.topic.as_str(), "-f", schema_file],
            )
            .await?;
        result.assert_no_output()?;
        self.state = SchemaState::Uploaded;
        info!(topic = %self.topic, node = %self.node, schema_file, "Schema uploaded");
        Ok(result)
    }

    /// Looks the schema up. A lookup is expected to succeed only while a
    /// schema is uploaded; otherwise it must fail with [`SCHEMA_NOT_FOUND`].
    pub async fn get(&self) -> Result<SchemaLookup, HarnessError> {
        let args = ["schemas", "get", self.topic.as_str()];
        match self.state {
            SchemaState::Uploaded => {
                let result = self.cluster.run_admin_command(&self.node, &args).await?;
                Ok(SchemaLookup::Found(result))
            }
            SchemaState::NoSchema | SchemaState::Deleted => {
                let failure = self
                    .cluster
                    .admin_command_expecting_failure(&self.node, &args)
                    .await?;
                if !failure.stderr().contains(SCHEMA_NOT_FOUND) {
                    return Err(HarnessError::assertion(format!(
                        "schema lookup for {} in state {:?} should report `{SCHEMA_NOT_FOUND}`\n{}",
                        self.topic,
                        self.state,
                        failure.result()
                    )));
                }
                Ok(SchemaLookup::NotFound(failure))
            }
        }
    }

    pub async fn delete(&mut self) -> Result<ExecResult, HarnessError> {
        self.require("delete", SchemaState::Uploaded)?;
        let result = self
            .cluster
            .run_admin_command(&self.node, &["schemas", "delete", self.topic.as_str()])
            .await?;
        result.assert_no_output()?;
        self.state = SchemaState::Deleted;
        info!(topic = %self.topic, node = %self.node, "Schema deleted");
        Ok(result)
    }

    fn require(&self, operation: &'static str, expected: SchemaState) -> Result<(), HarnessError> {
        if self.state != expected {
            return Err(HarnessError::InvalidTransition {
                topic: self.topic.clone(),
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}
