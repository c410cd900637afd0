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

use crate::harness::HarnessError;
use crate::record::SchemaKind;
use async_trait::async_trait;
use futures::TryStreamExt;
use pulsar::consumer::ConsumerOptions;
use pulsar::producer::{self, ProducerOptions};
use pulsar::{proto, Consumer, Producer, Pulsar, SubType, TokioExecutor};
use std::time::Duration;
use tracing::{debug, warn};

/// Where a session produces and consumes, and under which schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTarget {
    pub topic: String,
    pub subscription: String,
    pub kind: SchemaKind,
    pub schema_definition: &'static str,
}

/// A producer and a consumer bound to one topic/subscription pair.
///
/// Payloads are already encoded for the session's schema.
#[async_trait]
pub trait RecordSession: Send {
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), HarnessError>;

    /// Waits at most `timeout` for the next message; `Ok(None)` means the
    /// deadline passed with nothing delivered.
    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, HarnessError>;

    /// Releases producer, consumer and connection. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), HarnessError>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync + std::fmt::Debug {
    async fn open_session(&self, target: &SessionTarget)
        -> Result<Box<dyn RecordSession>, HarnessError>;
}

/// Opens sessions over the Pulsar binary protocol.
#[derive(Debug, Clone)]
pub struct PulsarSessionFactory {
    service_url: String,
}

impl PulsarSessionFactory {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: service_url.into(),
        }
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }
}

#[async_trait]
impl SessionFactory for PulsarSessionFactory {
    async fn open_session(
        &self,
        target: &SessionTarget,
    ) -> Result<Box<dyn RecordSession>, HarnessError> {
        debug!(
            service_url = %self.service_url,
            topic = %target.topic,
            subscription = %target.subscription,
            schema = %target.kind,
            "Opening session"
        );
        let client: Pulsar<TokioExecutor> = Pulsar::builder(self.service_url.clone(), TokioExecutor)
            .build()
            .await
            .map_err(HarnessError::client("connect"))?;

        let schema = proto::Schema {
            name: target.topic.clone(),
            schema_data: target.schema_definition.as_bytes().to_vec(),
            r#type: schema_type(target.kind) as i32,
            ..Default::default()
        };

        let mut producer = client
            .producer()
            .with_topic(target.topic.clone())
            .with_options(ProducerOptions {
                schema: Some(schema.clone()),
                ..Default::default()
            })
            .build()
            .await
            .map_err(HarnessError::client("create producer"))?;

        // Subscribed before anything is sent, so the default latest position
        // still sees every record of the exchange.
        let consumer = client
            .consumer()
            .with_topic(target.topic.clone())
            .with_subscription(target.subscription.clone())
            .with_subscription_type(SubType::Exclusive)
            .with_options(ConsumerOptions {
                schema: Some(schema),
                ..Default::default()
            })
            .build::<Vec<u8>>()
            .await;
        let consumer = match consumer {
            Ok(consumer) => consumer,
            Err(error) => {
                if let Err(close_error) = producer.close().await {
                    warn!(topic = %target.topic, error = %close_error, "Producer did not close after a failed subscribe");
                }
                return Err(HarnessError::client("subscribe")(error));
            }
        };

        Ok(Box::new(PulsarSession {
            topic: target.topic.clone(),
            client,
            producer,
            consumer,
            closed: false,
        }))
    }
}

fn schema_type(kind: SchemaKind) -> proto::schema::Type {
    match kind {
        SchemaKind::Avro => proto::schema::Type::Avro,
        SchemaKind::Json => proto::schema::Type::Json,
    }
}

struct PulsarSession {
    topic: String,
    // Owns the connection pool; dropped with the session.
    #[allow(dead_code)]
    client: Pulsar<TokioExecutor>,
    producer: Producer<TokioExecutor>,
    consumer: Consumer<Vec<u8>, TokioExecutor>,
    closed: bool,
}

#[async_trait]
impl RecordSession for PulsarSession {
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), HarnessError> {
        let receipt = self
            .producer
            .send_non_blocking(producer::Message {
                payload,
                ..Default::default()
            })
            .await
            .map_err(HarnessError::client("send"))?;
        receipt.await.map_err(HarnessError::client("send"))?;
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, HarnessError> {
        let message = match tokio::time::timeout(timeout, self.consumer.try_next()).await {
            Err(_) => return Ok(None),
            Ok(next) => next.map_err(HarnessError::client("receive"))?,
        };
        let Some(message) = message else {
            return Err(HarnessError::Client {
                operation: "receive",
                message: format!("consumer stream of {} ended", self.topic),
            });
        };

        let payload = message.deserialize();
        self.consumer
            .ack(&message)
            .await
            .map_err(HarnessError::client("acknowledge"))?;
        Ok(Some(payload))
    }

    async fn close(&mut self) -> Result<(), HarnessError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let producer = self
            .producer
            .close()
            .await
            .map_err(HarnessError::client("close producer"));
        let consumer = self
            .consumer
            .close()
            .await
            .map_err(HarnessError::client("close consumer"));
        if let Err(error) = &producer {
            warn!(topic = %self.topic, %error, "Producer did not close cleanly");
        }
        producer.and(consumer)
    }
}
