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
use crate::record::{SchemaKind, TypedRecord};
use crate::session::{RecordSession, SessionFactory, SessionTarget};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_RECORD_COUNT: u64 = 9;

/// Upper bound on the wait for a record past the last expected one.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Records sent and received by one successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripReport {
    pub topic: String,
    pub subscription: String,
    pub kind: SchemaKind,
    pub records: u64,
}

/// Produces a fixed, ordered batch of typed records to a topic and checks
/// that a consumer on the same topic receives exactly that batch back.
#[derive(Debug, Clone)]
pub struct ProduceConsumeVerifier {
    sessions: Arc<dyn SessionFactory>,
    record_count: u64,
    receive_timeout: Duration,
}

impl ProduceConsumeVerifier {
    pub fn new(sessions: Arc<dyn SessionFactory>, receive_timeout: Duration) -> Self {
        Self {
            sessions,
            record_count: DEFAULT_RECORD_COUNT,
            receive_timeout,
        }
    }

    /// Sets how many records the exchange sends; at least one.
    pub fn with_record_count(mut self, record_count: u64) -> Result<Self, HarnessError> {
        if record_count == 0 {
            return Err(HarnessError::Config(
                "round trip needs at least one record".to_string(),
            ));
        }
        self.record_count = record_count;
        Ok(self)
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn receive_timeout(&self) -> Duration {
        self.receive_timeout
    }

    /// Sends records `1..=N` in order, then receives N records and compares
    /// each with the one sent at the same position. A record delivered after
    /// the N-th fails the exchange.
    ///
    /// The session is closed whatever the outcome; an exchange failure takes
    /// precedence over a failure to close.
    pub async fn verify<T: TypedRecord>(
        &self,
        topic: &str,
        subscription: &str,
        kind: SchemaKind,
    ) -> Result<RoundTripReport, HarnessError> {
        let target = SessionTarget {
            topic: topic.to_string(),
            subscription: subscription.to_string(),
            kind,
            schema_definition: T::schema_definition(),
        };
        let mut session = self.sessions.open_session(&target).await?;

        let exchanged = self.exchange::<T>(session.as_mut(), &target).await;
        let closed = session.close().await;

        match (exchanged, closed) {
            (Err(error), closed) => {
                if let Err(close_error) = closed {
                    warn!(topic, error = %close_error, "Session close failed after a failed exchange");
                }
                warn!(topic, subscription, schema = %kind, code = error.as_code(), "Round trip failed");
                Err(error)
            }
            (Ok(_), Err(close_error)) => Err(close_error),
            (Ok(records), Ok(())) => {
                info!(topic, subscription, schema = %kind, records, "Round trip verified");
                Ok(RoundTripReport {
                    topic: topic.to_string(),
                    subscription: subscription.to_string(),
                    kind,
                    records,
                })
            }
        }
    }

    async fn exchange<T: TypedRecord>(
        &self,
        session: &mut dyn RecordSession,
        target: &SessionTarget,
    ) -> Result<u64, HarnessError> {
        for index in 1..=self.record_count {
            let record = T::for_index(index);
            session.send(target.kind.encode(&record)?).await?;
        }
        debug!(topic = %target.topic, records = self.record_count, "Records sent");

        for index in 1..=self.record_count {
            let Some(payload) = session.receive(self.receive_timeout).await? else {
                return Err(HarnessError::ReceiveTimeout {
                    topic: target.topic.clone(),
                    index,
                    timeout: self.receive_timeout,
                });
            };
            let received: T = target.kind.decode(&payload)?;
            let expected = T::for_index(index);
            if received != expected {
                return Err(HarnessError::assertion(format!(
                    "record #{index} on {}: expected {expected:?}, received {received:?}",
                    target.topic
                )));
            }
        }

        let drain_timeout = self.receive_timeout.min(DEFAULT_DRAIN_TIMEOUT);
        if let Some(payload) = session.receive(drain_timeout).await? {
            let extra = match target.kind.decode::<T>(&payload) {
                Ok(record) => format!("{record:?}"),
                Err(_) => format!("{} undecodable bytes", payload.len()),
            };
            return Err(HarnessError::assertion(format!(
                "unexpected record after #{} on {}: {extra}",
                self.record_count, target.topic
            )));
        }
        Ok(self.record_count)
    }
}
