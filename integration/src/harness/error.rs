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

use crate::harness::exec::{CommandFailure, ExecResult};
use crate::schema::SchemaState;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Command(#[from] CommandFailure),
    #[error("assertion failed: {message}")]
    Assertion { message: String },
    #[error("no message received from {topic} within {timeout:?}, expected record #{index}")]
    ReceiveTimeout {
        topic: String,
        index: u64,
        timeout: Duration,
    },
    #[error("command was expected to fail but succeeded: {0}")]
    UnexpectedSuccess(ExecResult),
    #[error("`{command}` on {node} did not finish within {timeout:?}")]
    CommandTimeout {
        command: String,
        node: String,
        timeout: Duration,
    },
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("schema of {topic}: cannot {operation} in state {state:?}")]
    InvalidTransition {
        topic: String,
        operation: &'static str,
        state: SchemaState,
    },
    #[error("pulsar client failed to {operation}: {message}")]
    Client {
        operation: &'static str,
        message: String,
    },
    #[error("failed to {operation} record: {message}")]
    Codec {
        operation: &'static str,
        message: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cluster has no broker nodes")]
    NoBrokers,
}

impl HarnessError {
    pub fn assertion(message: impl Into<String>) -> Self {
        HarnessError::Assertion {
            message: message.into(),
        }
    }

    pub(crate) fn client<E: std::fmt::Display>(operation: &'static str) -> impl FnOnce(E) -> Self {
        move |error| HarnessError::Client {
            operation,
            message: error.to_string(),
        }
    }

    pub(crate) fn codec<E: std::fmt::Display>(operation: &'static str) -> impl FnOnce(E) -> Self {
        move |error| HarnessError::Codec {
            operation,
            message: error.to_string(),
        }
    }

    /// Short machine-friendly name of the failure class, used in log fields.
    pub fn as_code(&self) -> &'static str {
        match self {
            HarnessError::Command(_) => "command_failure",
            HarnessError::Assertion { .. } => "assertion_failure",
            HarnessError::ReceiveTimeout { .. } => "receive_timeout",
            HarnessError::UnexpectedSuccess(_) => "unexpected_success",
            HarnessError::CommandTimeout { .. } => "command_timeout",
            HarnessError::Spawn { .. } => "spawn_failure",
            HarnessError::InvalidTransition { .. } => "invalid_transition",
            HarnessError::Client { .. } => "client_error",
            HarnessError::Codec { .. } => "codec_error",
            HarnessError::Config(_) | HarnessError::NoBrokers => "invalid_configuration",
        }
    }
}
