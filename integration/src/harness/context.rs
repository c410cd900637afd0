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

use crate::harness::cluster::DEFAULT_TENANT;
use std::thread;
use uuid::Uuid;

pub const DEFAULT_NAMESPACE: &str = "default";

/// Per-scenario naming scope.
///
/// Every resource a scenario creates carries the same random suffix, so
/// scenarios running in parallel against one cluster never collide.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    scenario: String,
    suffix: String,
}

impl ScenarioContext {
    /// Names the scenario after the current test thread.
    pub fn new() -> Self {
        Self::named(Self::derive_scenario_name())
    }

    pub fn named(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            suffix: Uuid::new_v4().simple().to_string()[..8].to_string(),
        }
    }

    fn derive_scenario_name() -> String {
        thread::current()
            .name()
            .map(sanitize_name)
            .unwrap_or_else(|| "scenario".to_string())
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// `base` made unique to this scenario.
    pub fn unique(&self, base: &str) -> String {
        format!("{}-{}", sanitize_name(base), self.suffix)
    }

    /// Unique topic under `persistent://public/default/`.
    pub fn persistent_topic(&self, base: &str) -> String {
        format!(
            "persistent://{DEFAULT_TENANT}/{DEFAULT_NAMESPACE}/{}",
            self.unique(base)
        )
    }

    /// Unique namespace under the `public` tenant, as `public/<name>`.
    pub fn namespace(&self, base: &str) -> String {
        format!("{DEFAULT_TENANT}/{}", self.unique(base))
    }
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps only characters the broker accepts in resource names.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' => c,
            _ => '_',
        })
        .collect()
}
