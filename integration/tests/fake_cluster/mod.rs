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

use crate::common::fake::{fake_cluster, fake_cluster_with_selection, Delivery, FakeBehavior};
use integration::harness::{HarnessError, NodeSelection, ScenarioContext};
use integration::record::TICK_SCHEMA_DEFINITION;
use integration::scenarios::{
    create_subscription_on_every_broker, deprecated_tenant_alias,
    extracted_pojo_schema_round_trip, grant_permission_with_authorization_disabled,
    infinite_retention_round_trip, schema_cli_lifecycle, terminate_topic_without_consumers,
};
use integration::{ProduceConsumeVerifier, RecordSession, SchemaKind, SessionTarget, Tick};
use serial_test::parallel;

fn healthy(brokers: usize) -> crate::common::fake::FakeCluster {
    fake_cluster(brokers, FakeBehavior::default(), Delivery::Exact)
}

#[tokio::test]
#[parallel]
async fn every_scenario_passes_against_a_healthy_cluster() {
    let cluster = healthy(3);
    let handle = &cluster.handle;

    deprecated_tenant_alias(handle).await.unwrap();
    create_subscription_on_every_broker(handle).await.unwrap();
    terminate_topic_without_consumers(handle).await.unwrap();
    schema_cli_lifecycle(handle).await.unwrap();
    infinite_retention_round_trip(handle).await.unwrap();
    grant_permission_with_authorization_disabled(handle)
        .await
        .unwrap();
    extracted_pojo_schema_round_trip(handle, SchemaKind::Avro)
        .await
        .unwrap();
    extracted_pojo_schema_round_trip(handle, SchemaKind::Json)
        .await
        .unwrap();
}

#[tokio::test]
#[parallel]
async fn repeated_scenarios_do_not_collide_on_names() {
    let cluster = healthy(1);

    deprecated_tenant_alias(&cluster.handle).await.unwrap();
    deprecated_tenant_alias(&cluster.handle).await.unwrap();
    infinite_retention_round_trip(&cluster.handle).await.unwrap();
    infinite_retention_round_trip(&cluster.handle).await.unwrap();
}

#[tokio::test]
#[parallel]
async fn subscription_fan_out_visits_every_broker_in_order() {
    let cluster = healthy(3);

    create_subscription_on_every_broker(&cluster.handle)
        .await
        .unwrap();

    assert_eq!(
        cluster
            .pulsar
            .nodes_running(&["topics", "create-subscription"]),
        ["pulsar-broker-0", "pulsar-broker-1", "pulsar-broker-2"]
    );
    let calls = cluster.pulsar.calls();
    let topic = &calls[0].1[3];
    assert_eq!(
        cluster.pulsar.subscriptions(topic),
        ["subscription-0", "subscription-1", "subscription-2"]
    );
}

#[tokio::test]
#[parallel]
async fn subscription_fan_out_rejects_unexpected_output() {
    let cluster = fake_cluster(
        2,
        FakeBehavior {
            noisy_subscriptions: true,
            ..Default::default()
        },
        Delivery::Exact,
    );

    let error = create_subscription_on_every_broker(&cluster.handle)
        .await
        .unwrap_err();

    assert!(matches!(error, HarnessError::Assertion { .. }));
    assert_eq!(error.as_code(), "assertion_failure");
}

#[tokio::test]
#[parallel]
async fn produce_after_ignored_termination_is_an_unexpected_success() {
    let cluster = fake_cluster(
        2,
        FakeBehavior {
            ignore_terminate: true,
            ..Default::default()
        },
        Delivery::Exact,
    );

    let error = terminate_topic_without_consumers(&cluster.handle)
        .await
        .unwrap_err();

    assert!(
        matches!(
            &error,
            HarnessError::UnexpectedSuccess(result)
                if result.stdout().contains("1 messages successfully produced")
        ),
        "{error}"
    );
}

#[tokio::test]
#[parallel]
async fn schema_still_readable_after_delete_fails_the_lifecycle() {
    let cluster = fake_cluster(
        1,
        FakeBehavior {
            keep_schema_on_delete: true,
            ..Default::default()
        },
        Delivery::Exact,
    );

    let error = schema_cli_lifecycle(&cluster.handle).await.unwrap_err();

    assert!(matches!(error, HarnessError::UnexpectedSuccess(_)));
}

#[tokio::test]
#[parallel]
async fn granted_permission_fails_the_guard() {
    let cluster = fake_cluster(
        1,
        FakeBehavior {
            authorization_enabled: true,
            ..Default::default()
        },
        Delivery::Exact,
    );

    let error = grant_permission_with_authorization_disabled(&cluster.handle)
        .await
        .unwrap_err();

    assert!(matches!(error, HarnessError::UnexpectedSuccess(_)));
}

#[tokio::test]
#[parallel]
async fn round_trip_runs_on_message_topic_with_kind_named_subscription() {
    let cluster = healthy(1);

    extracted_pojo_schema_round_trip(&cluster.handle, SchemaKind::Avro)
        .await
        .unwrap();

    let opened = cluster.sessions.opened();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].topic.starts_with("persistent://public/default/pojo-avro-"));
    assert!(opened[0].topic.ends_with("-message"));
    assert_eq!(opened[0].subscription, "avro");
    assert_eq!(opened[0].kind, SchemaKind::Avro);
    assert_eq!(cluster.sessions.closed(), 1);

    let calls = cluster.pulsar.calls();
    let extract = &calls[0].1;
    assert_eq!(extract[1..3], ["schemas", "extract"]);
    assert_eq!(
        format!("{}-message", extract.last().unwrap()),
        opened[0].topic
    );
}

#[tokio::test]
#[parallel]
async fn lost_record_is_a_receive_timeout_and_session_is_closed() {
    let cluster = fake_cluster(1, FakeBehavior::default(), Delivery::LoseLast);

    let error = extracted_pojo_schema_round_trip(&cluster.handle, SchemaKind::Json)
        .await
        .unwrap_err();

    assert!(matches!(error, HarnessError::ReceiveTimeout { index: 9, .. }));
    assert_eq!(cluster.sessions.closed(), 1);
}

#[tokio::test]
#[parallel]
async fn duplicated_record_fails_comparison_and_session_is_closed() {
    let cluster = fake_cluster(1, FakeBehavior::default(), Delivery::DuplicateFirst);

    let error = extracted_pojo_schema_round_trip(&cluster.handle, SchemaKind::Avro)
        .await
        .unwrap_err();

    assert!(matches!(error, HarnessError::Assertion { .. }));
    assert!(error.to_string().contains("record #2"));
    assert_eq!(cluster.sessions.closed(), 1);
}

#[tokio::test]
#[parallel]
async fn pinned_selection_keeps_single_node_commands_on_first_broker() {
    let cluster = healthy(3);

    terminate_topic_without_consumers(&cluster.handle)
        .await
        .unwrap();
    schema_cli_lifecycle(&cluster.handle).await.unwrap();

    let calls = cluster.pulsar.calls();
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|(node, _)| node == "pulsar-broker-0"));
}

#[tokio::test]
#[parallel]
async fn random_selection_stays_within_the_cluster() {
    let cluster =
        fake_cluster_with_selection(3, FakeBehavior::default(), Delivery::Exact, NodeSelection::Random);

    for _ in 0..20 {
        cluster
            .handle
            .run_admin_command_on_any_broker(&["tenants", "list"])
            .await
            .unwrap()
            .assert_stdout_contains("public")
            .unwrap();
    }

    let nodes = cluster.pulsar.nodes_running(&["tenants", "list"]);
    assert_eq!(nodes.len(), 20);
    assert!(nodes
        .iter()
        .all(|node| node.starts_with("pulsar-broker-") && node.len() == "pulsar-broker-0".len()));
}

#[tokio::test]
#[parallel]
async fn bounded_retention_fails_the_unbounded_check() {
    let cluster = fake_cluster(
        1,
        FakeBehavior {
            bounded_retention: true,
            ..Default::default()
        },
        Delivery::Exact,
    );

    let error = infinite_retention_round_trip(&cluster.handle)
        .await
        .unwrap_err();

    assert!(matches!(error, HarnessError::Assertion { .. }));
    assert!(error.to_string().contains("\"retentionTimeInMinutes\" : 10080"));
}

#[tokio::test]
#[parallel]
async fn produce_failing_for_another_reason_after_termination_fails_the_scenario() {
    let cluster = fake_cluster(
        2,
        FakeBehavior {
            refuse_terminated_produce: true,
            ..Default::default()
        },
        Delivery::Exact,
    );

    let error = terminate_topic_without_consumers(&cluster.handle)
        .await
        .unwrap_err();

    assert!(matches!(error, HarnessError::Assertion { .. }));
    assert!(error.to_string().contains("failed for another reason"));
    assert!(error.to_string().contains("Connection refused"));
}

#[tokio::test]
#[parallel]
async fn sessions_opened_through_the_handle_share_its_factory() {
    let cluster = healthy(1);
    let handle = &cluster.handle;
    let ctx = ScenarioContext::new();
    let target = SessionTarget {
        topic: ctx.persistent_topic("raw-session"),
        subscription: "raw".to_string(),
        kind: SchemaKind::Json,
        schema_definition: TICK_SCHEMA_DEFINITION,
    };
    assert_eq!(handle.runner().timeout(), handle.config().command_timeout);

    let mut session = handle.open_session(&target).await.unwrap();
    session.send(b"first".to_vec()).await.unwrap();
    let timeout = handle.config().receive_timeout;
    assert_eq!(session.receive(timeout).await.unwrap(), Some(b"first".to_vec()));
    assert_eq!(session.receive(timeout).await.unwrap(), None);
    session.close().await.unwrap();

    let report = ProduceConsumeVerifier::new(handle.sessions().clone(), timeout)
        .with_record_count(2)
        .unwrap()
        .verify::<Tick>(&ctx.persistent_topic("typed"), "json", SchemaKind::Json)
        .await
        .unwrap();

    assert_eq!(report.records, 2);
    let opened = cluster.sessions.opened();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0], target);
    assert_eq!(cluster.sessions.closed(), 2);
}
