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

use crate::harness::cluster::BrokerNode;
use crate::harness::error::HarnessError;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Raw process output, before it is tied to a command line and a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs one argv on one broker node and waits for it to exit.
#[async_trait]
pub trait CommandExecutor: Send + Sync + std::fmt::Debug {
    async fn exec(&self, node: &BrokerNode, argv: &[String]) -> Result<ProcessOutput, HarnessError>;
}

/// Executes inside broker containers with `docker exec <container> ...`.
#[derive(Debug, Clone)]
pub struct DockerExecutor {
    docker_binary: String,
}

impl DockerExecutor {
    pub fn new(docker_binary: impl Into<String>) -> Self {
        Self {
            docker_binary: docker_binary.into(),
        }
    }
}

impl Default for DockerExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_DOCKER_BINARY)
    }
}

#[async_trait]
impl CommandExecutor for DockerExecutor {
    async fn exec(&self, node: &BrokerNode, argv: &[String]) -> Result<ProcessOutput, HarnessError> {
        if argv.is_empty() {
            return Err(HarnessError::Config("empty command line".to_string()));
        }
        let mut command = Command::new(&self.docker_binary);
        command.arg("exec").arg(node.id()).args(argv);
        run_to_completion(command, &self.docker_binary).await
    }
}

/// Executes directly on the local host; the node only labels the result.
///
/// Useful against a standalone broker whose tools are installed locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn exec(&self, _node: &BrokerNode, argv: &[String]) -> Result<ProcessOutput, HarnessError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(HarnessError::Config("empty command line".to_string()));
        };
        let mut command = Command::new(program);
        command.args(args);
        run_to_completion(command, program).await
    }
}

async fn run_to_completion(mut command: Command, program: &str) -> Result<ProcessOutput, HarnessError> {
    // The runner drops this future on timeout, which must take the child down with it.
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = command.output().await.map_err(|source| HarnessError::Spawn {
        program: program.to_string(),
        source,
    })?;

    Ok(ProcessOutput {
        // Killed by a signal: no exit code, still a failure.
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
