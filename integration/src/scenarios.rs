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

//! End-to-end checks of the admin and client tools against a running cluster.
//!
//! Each scenario owns its resources through a [`ScenarioContext`], so any of
//! them can run concurrently with the others on the same cluster.

use crate::harness::{ClusterHandle, HarnessError, ScenarioContext};
use crate::record::{SchemaKind, Tick, TICK_CLASS_NAME};
use crate::schema::SchemaLifecycleVerifier;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::info;

pub const DEPRECATED_COMMAND_WARNING: &str = "deprecated";
pub const PROPERTIES_USAGE: &str = "Usage: properties ";
pub const PRODUCED_ONE_MESSAGE: &str = "1 messages successfully produced";
pub const TOPIC_ALREADY_TERMINATED: &str = "Topic was already terminated";
pub const STRING_SCHEMA_MARKER: &str = r#""type": "STRING""#;
pub const INFINITE_RETENTION_TIME: &str = r#""retentionTimeInMinutes" : -1"#;
pub const INFINITE_RETENTION_SIZE: &str = r#""retentionSizeInMB" : -1"#;
pub const NOT_IMPLEMENTED: &str = "HTTP 501 Not Implemented";

// "succesfully" is spelled the way the broker prints it.
static TERMINATED_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Topic succesfully terminated at (\S+)").unwrap());

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetentionPolicies {
    retention_time_in_minutes: i64,
    #[serde(rename = "retentionSizeInMB")]
    retention_size_in_mb: i64,
}

/// `properties` is a deprecated alias of `tenants`: help no longer lists it,
/// it warns on use, and whatever it creates is visible through both names.
pub async fn deprecated_tenant_alias(cluster: &ClusterHandle) -> Result<(), HarnessError> {
    let ctx = ScenarioContext::named("deprecated-tenant-alias");
    let tenant = ctx.unique("test-deprecated-commands");

    let help = cluster.run_admin_command_on_any_broker(&["--help"]).await?;
    if help.stdout().trim().is_empty() {
        return Err(HarnessError::assertion(format!("help printed nothing\n{help}")));
    }
    if help.stdout().contains(PROPERTIES_USAGE) {
        return Err(HarnessError::assertion(format!(
            "help still advertises `{PROPERTIES_USAGE}`\n{help}"
        )));
    }

    cluster
        .run_admin_command_on_any_broker(&[
            "properties",
            "create",
            tenant.as_str(),
            "--allowed-clusters",
            cluster.cluster_name(),
            "--admin-roles",
            "admin",
        ])
        .await?
        .assert_stderr_contains(DEPRECATED_COMMAND_WARNING)?;
    info!(scenario = ctx.scenario(), tenant = %tenant, "Tenant created through deprecated alias");

    for listing in ["properties", "tenants"] {
        cluster
            .run_admin_command_on_any_broker(&[listing, "list"])
            .await?
            .assert_stdout_contains(&tenant)?;
    }
    Ok(())
}

/// Creating a subscription works through every broker, each with its own name.
pub async fn create_subscription_on_every_broker(
    cluster: &ClusterHandle,
) -> Result<(), HarnessError> {
    let ctx = ScenarioContext::named("create-subscription");
    let topic = ctx.persistent_topic("testCreateSubscriptionCommand");

    for (index, node) in cluster.all().iter().enumerate() {
        let subscription = format!("subscription-{index}");
        cluster
            .run_admin_command(
                node,
                &[
                    "topics",
                    "create-subscription",
                    topic.as_str(),
                    "--subscription",
                    subscription.as_str(),
                ],
            )
            .await?
            .assert_no_output()?;
        info!(scenario = ctx.scenario(), node = %node, topic = %topic, subscription = %subscription, "Subscription created");
    }
    Ok(())
}

/// A topic with no consumers can be terminated, after which producing to it
/// fails on any broker.
pub async fn terminate_topic_without_consumers(
    cluster: &ClusterHandle,
) -> Result<(), HarnessError> {
    let ctx = ScenarioContext::named("terminate-topic");
    let topic = ctx.persistent_topic("test-topic-termination");
    let node = cluster.any().clone();
    let produce = [
        "produce",
        "-m",
        "\"test topic termination\"",
        "-n",
        "1",
        topic.as_str(),
    ];

    cluster
        .run_admin_command(&node, &["topics", "create", topic.as_str()])
        .await?;
    cluster
        .run_client_command(&node, &produce)
        .await?
        .assert_stdout_contains(PRODUCED_ONE_MESSAGE)?;

    let terminated = cluster
        .run_admin_command(&node, &["topics", "terminate", topic.as_str()])
        .await?;
    let Some(captures) = TERMINATED_AT.captures(terminated.stdout()) else {
        return Err(HarnessError::assertion(format!(
            "terminate did not report a last message id\n{terminated}"
        )));
    };
    info!(scenario = ctx.scenario(), topic = %topic, last_message_id = &captures[1], "Topic terminated");

    let failure = cluster
        .client_command_expecting_failure(cluster.any(), &produce)
        .await?;
    if !failure.stdout().contains(TOPIC_ALREADY_TERMINATED) {
        return Err(HarnessError::assertion(format!(
            "produce to a terminated topic failed for another reason\n{}",
            failure.result()
        )));
    }
    Ok(())
}

/// Upload, read back and delete a schema through the admin tool; once
/// deleted, reading it reports not found.
pub async fn schema_cli_lifecycle(cluster: &ClusterHandle) -> Result<(), HarnessError> {
    let ctx = ScenarioContext::named("schema-cli");
    let topic = ctx.persistent_topic("test-schema-cli");
    let mut schema = SchemaLifecycleVerifier::on_any_broker(cluster, topic.as_str());

    cluster
        .run_client_command(
            schema.node(),
            &[
                "produce",
                "-m",
                "\"test topic schema\"",
                "-n",
                "1",
                topic.as_str(),
            ],
        )
        .await?
        .assert_stdout_contains(PRODUCED_ONE_MESSAGE)?;

    schema.upload(&cluster.config().schema_file).await?;

    let lookup = schema.get().await?;
    match lookup.descriptor() {
        Some(descriptor) if descriptor.contains(STRING_SCHEMA_MARKER) => {}
        _ => {
            return Err(HarnessError::assertion(format!(
                "schema of {topic} is not a STRING schema: {lookup:?}"
            )))
        }
    }

    schema.delete().await?;
    schema.get().await?;
    info!(scenario = ctx.scenario(), topic = %topic, "Schema lifecycle verified");
    Ok(())
}

/// Retention of -1/-1 (unbounded) is stored and reported back as such.
pub async fn infinite_retention_round_trip(cluster: &ClusterHandle) -> Result<(), HarnessError> {
    let ctx = ScenarioContext::named("infinite-retention");
    let name = ctx.unique("get-and-set-retention");
    let namespace = ctx.namespace("get-and-set-retention");
    cluster.create_namespace(&name).await?;

    cluster
        .run_admin_command_on_any_broker(&[
            "namespaces",
            "set-retention",
            namespace.as_str(),
            "--size",
            "-1",
            "--time",
            "-1",
        ])
        .await?
        .assert_no_output()?;

    let retention = cluster
        .run_admin_command_on_any_broker(&["namespaces", "get-retention", namespace.as_str()])
        .await?;
    retention
        .assert_stdout_contains(INFINITE_RETENTION_TIME)?
        .assert_stdout_contains(INFINITE_RETENTION_SIZE)?;

    let policies: RetentionPolicies = serde_json::from_str(retention.stdout()).map_err(|error| {
        HarnessError::assertion(format!("retention is not valid JSON: {error}\n{retention}"))
    })?;
    if policies.retention_time_in_minutes != -1 || policies.retention_size_in_mb != -1 {
        return Err(HarnessError::assertion(format!(
            "retention of {namespace} is {policies:?}, expected unbounded"
        )));
    }
    info!(scenario = ctx.scenario(), namespace = %namespace, "Unbounded retention verified");
    Ok(())
}

/// With authorization disabled, granting a permission must be refused as
/// not implemented. A grant that succeeds fails the scenario.
pub async fn grant_permission_with_authorization_disabled(
    cluster: &ClusterHandle,
) -> Result<(), HarnessError> {
    let ctx = ScenarioContext::named("grant-permission");
    let name = ctx.unique("grant-permissions");
    let namespace = ctx.namespace("grant-permissions");

    cluster.create_namespace(&name).await?.assert_exit_code(0)?;

    let failure = cluster
        .admin_command_expecting_failure(
            cluster.any(),
            &[
                "namespaces",
                "grant-permission",
                namespace.as_str(),
                "--actions",
                "produce",
                "--role",
                "test-role",
            ],
        )
        .await?;
    if !failure.stderr().contains(NOT_IMPLEMENTED) {
        return Err(HarnessError::assertion(format!(
            "grant-permission failed without `{NOT_IMPLEMENTED}`\n{}",
            failure.result()
        )));
    }
    info!(scenario = ctx.scenario(), namespace = %namespace, "Grant refused without authorization");
    Ok(())
}

/// Extracts the tick schema from the examples jar onto a topic, then runs a
/// typed round trip under the same schema kind.
pub async fn extracted_pojo_schema_round_trip(
    cluster: &ClusterHandle,
    kind: SchemaKind,
) -> Result<(), HarnessError> {
    let ctx = ScenarioContext::named(format!("pojo-{kind}"));
    let topic = ctx.persistent_topic(&format!("pojo-{kind}"));

    cluster
        .run_admin_command_on_any_broker(&[
            "schemas",
            "extract",
            "--jar",
            cluster.config().examples_jar.as_str(),
            "--type",
            kind.as_cli_type(),
            "--classname",
            TICK_CLASS_NAME,
            topic.as_str(),
        ])
        .await?
        .assert_exit_code(0)?;
    info!(scenario = ctx.scenario(), topic = %topic, schema = %kind, "Schema extracted");

    let report = cluster
        .produce_consume_verifier()
        .verify::<Tick>(&format!("{topic}-message"), kind.as_cli_type(), kind)
        .await?;
    info!(scenario = ctx.scenario(), topic = %report.topic, records = report.records, "Typed records round tripped");
    Ok(())
}
