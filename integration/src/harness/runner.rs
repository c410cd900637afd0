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
use crate::harness::exec::{CommandFailure, ExecResult};
use crate::harness::executor::CommandExecutor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs command lines on broker nodes and turns exit codes into results.
///
/// Nothing is retried: a failing command surfaces on the first attempt,
/// with its full output, because callers assert on that output.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    executor: Arc<dyn CommandExecutor>,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(executor: Arc<dyn CommandExecutor>, timeout: Duration) -> Self {
        Self { executor, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `argv` on `node` and returns the outcome whatever the exit code.
    pub async fn try_execute<S: AsRef<str>>(
        &self,
        node: &BrokerNode,
        argv: &[S],
    ) -> Result<ExecResult, HarnessError> {
        let argv: Vec<String> = argv.iter().map(|arg| arg.as_ref().to_string()).collect();
        let command = render_command(&argv);
        debug!(node = %node, command = %command, "Executing command");

        let output = match tokio::time::timeout(self.timeout, self.executor.exec(node, &argv)).await
        {
            Ok(output) => output?,
            Err(_) => {
                warn!(node = %node, command = %command, timeout = ?self.timeout, "Command timed out");
                return Err(HarnessError::CommandTimeout {
                    command,
                    node: node.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        let result = ExecResult::new(
            command,
            node.to_string(),
            output.exit_code,
            output.stdout,
            output.stderr,
        );
        debug!(
            node = %node,
            exit_code = result.exit_code(),
            stdout_len = result.stdout().len(),
            stderr_len = result.stderr().len(),
            "Command finished"
        );
        Ok(result)
    }

    /// Runs `argv` on `node`; a nonzero exit code becomes [`HarnessError::Command`].
    pub async fn execute<S: AsRef<str>>(
        &self,
        node: &BrokerNode,
        argv: &[S],
    ) -> Result<ExecResult, HarnessError> {
        let result = self.try_execute(node, argv).await?;
        result.into_checked().map_err(|failure| {
            warn!(
                node = %node,
                command = failure.result().command(),
                exit_code = failure.exit_code(),
                "Command failed"
            );
            HarnessError::Command(failure)
        })
    }

    /// Runs `argv` on `node` where failure is the expected outcome.
    ///
    /// Returns the captured failure for the caller to inspect; an exit code of
    /// zero is reported as [`HarnessError::UnexpectedSuccess`].
    pub async fn execute_expecting_failure<S: AsRef<str>>(
        &self,
        node: &BrokerNode,
        argv: &[S],
    ) -> Result<CommandFailure, HarnessError> {
        match self.try_execute(node, argv).await?.into_checked() {
            Ok(result) => Err(HarnessError::UnexpectedSuccess(result)),
            Err(failure) => Ok(failure),
        }
    }
}

/// Joins `argv` for display. Empty arguments and arguments with whitespace,
/// quotes or backslashes are quoted, so every argument boundary stays visible.
fn render_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            let plain = !arg.is_empty()
                && !arg
                    .chars()
                    .any(|c| c.is_whitespace() || c == '"' || c == '\'' || c == '\\');
            if plain {
                arg.clone()
            } else {
                format!("{arg:?}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
