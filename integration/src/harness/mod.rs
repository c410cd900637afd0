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

//! Command execution and cluster access for the Pulsar CLI integration tests.
//!
//! # Example
//!
//! ```ignore
//! use integration::harness::ClusterHandle;
//!
//! #[tokio::test]
//! async fn test_list_tenants() {
//!     let cluster = ClusterHandle::from_env().unwrap();
//!
//!     cluster
//!         .run_admin_command_on_any_broker(&["tenants", "list"])
//!         .await
//!         .unwrap()
//!         .assert_stdout_contains("public")
//!         .unwrap();
//! }
//! ```

mod cluster;
pub mod config;
mod context;
mod error;
mod exec;
pub(crate) mod executor;
mod runner;

pub use cluster::{BrokerNode, ClusterHandle, DEFAULT_TENANT};
pub use config::{ClusterConfig, ExecMode, NodeSelection};
pub use context::{ScenarioContext, DEFAULT_NAMESPACE};
pub use error::HarnessError;
pub use exec::{CommandFailure, ExecResult};
pub use executor::{CommandExecutor, DockerExecutor, LocalExecutor, ProcessOutput};
pub use runner::CommandRunner;
