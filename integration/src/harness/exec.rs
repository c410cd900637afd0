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
use predicates::prelude::*;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Captured outcome of one command invocation.
///
/// stdout and stderr are kept as separate streams so substring checks never
/// depend on how the two were interleaved by the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    command: String,
    node: String,
    exit_code: i32,
    stdout: String,
    stderr: String,
}

impl ExecResult {
    pub fn new(
        command: impl Into<String>,
        node: impl Into<String>,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            node: node.into(),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Splits the result into the success or failure variant by exit code.
    pub fn into_checked(self) -> Result<Self, CommandFailure> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(CommandFailure { result: self })
        }
    }

    pub fn assert_exit_code(&self, expected: i32) -> Result<&Self, HarnessError> {
        if self.exit_code != expected {
            return Err(HarnessError::assertion(format!(
                "expected exit code {expected}, got {}\n{self}",
                self.exit_code
            )));
        }
        Ok(self)
    }

    pub fn assert_stdout<P>(&self, predicate: P) -> Result<&Self, HarnessError>
    where
        P: Predicate<str>,
    {
        if !predicate.eval(self.stdout.as_str()) {
            return Err(HarnessError::assertion(format!(
                "stdout does not satisfy `{predicate}`\n{self}"
            )));
        }
        Ok(self)
    }

    pub fn assert_stderr<P>(&self, predicate: P) -> Result<&Self, HarnessError>
    where
        P: Predicate<str>,
    {
        if !predicate.eval(self.stderr.as_str()) {
            return Err(HarnessError::assertion(format!(
                "stderr does not satisfy `{predicate}`\n{self}"
            )));
        }
        Ok(self)
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> Result<&Self, HarnessError> {
        self.assert_stdout(predicate::str::contains(needle))
    }

    pub fn assert_stderr_contains(&self, needle: &str) -> Result<&Self, HarnessError> {
        self.assert_stderr(predicate::str::contains(needle))
    }

    /// Mutating admin calls print nothing on success.
    pub fn assert_no_output(&self) -> Result<&Self, HarnessError> {
        self.assert_stdout(predicate::str::is_empty())?
            .assert_stderr(predicate::str::is_empty())
    }
}

impl Display for ExecResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "`{}` on {} exited with code {}\n=== STDOUT ===\n{}\n=== STDERR ===\n{}",
            self.command, self.node, self.exit_code, self.stdout, self.stderr
        )
    }
}

/// A command that exited with a nonzero code, with everything it printed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("command failed: {result}")]
pub struct CommandFailure {
    result: ExecResult,
}

impl CommandFailure {
    pub fn result(&self) -> &ExecResult {
        &self.result
    }

    pub fn exit_code(&self) -> i32 {
        self.result.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.result.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.result.stderr
    }

    pub fn into_result(self) -> ExecResult {
        self.result
    }
}
