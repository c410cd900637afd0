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
use apache_avro::types::Value;
use apache_avro::Schema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Fully qualified name of the tick class packaged in the broker's
/// `api-examples.jar`.
pub const TICK_CLASS_NAME: &str = "org.apache.pulsar.functions.api.examples.pojo.Tick";

/// Avro definition the broker derives from the tick class by reflection.
/// AVRO and JSON schemas both carry it as their schema data.
pub const TICK_SCHEMA_DEFINITION: &str = r#"{"type":"record","name":"Tick","namespace":"org.apache.pulsar.functions.api.examples.pojo","fields":[{"name":"timeStamp","type":"long"},{"name":"symbol","type":["null","string"],"default":null},{"name":"bid","type":"long"},{"name":"ask","type":"long"}]}"#;

/// Structured payload that can be rebuilt from its index and compared field
/// by field after a round trip.
pub trait TypedRecord:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn schema_definition() -> &'static str;

    fn for_index(index: u64) -> Self;

    fn to_avro(&self) -> Value;

    fn from_avro(value: Value) -> Result<Self, HarnessError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub time_stamp: i64,
    pub symbol: String,
    pub bid: i64,
    pub ask: i64,
}

impl Tick {
    pub fn new(time_stamp: i64, symbol: impl Into<String>, bid: i64, ask: i64) -> Self {
        Self {
            time_stamp,
            symbol: symbol.into(),
            bid,
            ask,
        }
    }
}

impl TypedRecord for Tick {
    fn schema_definition() -> &'static str {
        TICK_SCHEMA_DEFINITION
    }

    fn for_index(index: u64) -> Self {
        let index = index as i64;
        Tick::new(index, format!("Stock_{index}"), 100 + index, 110 + index)
    }

    fn to_avro(&self) -> Value {
        Value::Record(vec![
            ("timeStamp".to_string(), Value::Long(self.time_stamp)),
            (
                "symbol".to_string(),
                Value::Union(1, Box::new(Value::String(self.symbol.clone()))),
            ),
            ("bid".to_string(), Value::Long(self.bid)),
            ("ask".to_string(), Value::Long(self.ask)),
        ])
    }

    fn from_avro(value: Value) -> Result<Self, HarnessError> {
        let fields = match value {
            Value::Record(fields) => fields,
            other => return Err(decode_error(format!("expected a record, got {other:?}"))),
        };

        let mut time_stamp = None;
        let mut symbol = None;
        let mut bid = None;
        let mut ask = None;
        for (name, value) in fields {
            match (name.as_str(), value) {
                ("timeStamp", Value::Long(v)) => time_stamp = Some(v),
                ("bid", Value::Long(v)) => bid = Some(v),
                ("ask", Value::Long(v)) => ask = Some(v),
                ("symbol", Value::Union(_, inner)) => {
                    if let Value::String(v) = *inner {
                        symbol = Some(v);
                    }
                }
                ("symbol", Value::String(v)) => symbol = Some(v),
                (name, value) => {
                    return Err(decode_error(format!("unexpected field {name}: {value:?}")))
                }
            }
        }

        match (time_stamp, symbol, bid, ask) {
            (Some(time_stamp), Some(symbol), Some(bid), Some(ask)) => Ok(Tick {
                time_stamp,
                symbol,
                bid,
                ask,
            }),
            _ => Err(decode_error("tick record is missing fields".to_string())),
        }
    }
}

fn decode_error(message: String) -> HarnessError {
    HarnessError::Codec {
        operation: "decode",
        message,
    }
}

/// Schema type a topic is bound to, and with it the payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Binary Avro datum, no container header.
    Avro,
    /// UTF-8 JSON with camelCase field names.
    Json,
}

impl SchemaKind {
    /// Value of the admin tool's `--type` option.
    pub fn as_cli_type(&self) -> &'static str {
        match self {
            SchemaKind::Avro => "avro",
            SchemaKind::Json => "json",
        }
    }

    pub fn encode<T: TypedRecord>(&self, record: &T) -> Result<Vec<u8>, HarnessError> {
        match self {
            SchemaKind::Avro => {
                let schema = parse_schema::<T>()?;
                apache_avro::to_avro_datum(&schema, record.to_avro())
                    .map_err(HarnessError::codec("encode"))
            }
            SchemaKind::Json => serde_json::to_vec(record).map_err(HarnessError::codec("encode")),
        }
    }

    pub fn decode<T: TypedRecord>(&self, payload: &[u8]) -> Result<T, HarnessError> {
        match self {
            SchemaKind::Avro => {
                let schema = parse_schema::<T>()?;
                let mut reader = payload;
                let value = apache_avro::from_avro_datum(&schema, &mut reader, None)
                    .map_err(HarnessError::codec("decode"))?;
                T::from_avro(value)
            }
            SchemaKind::Json => {
                serde_json::from_slice(payload).map_err(HarnessError::codec("decode"))
            }
        }
    }
}

impl Display for SchemaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_cli_type())
    }
}

fn parse_schema<T: TypedRecord>() -> Result<Schema, HarnessError> {
    Schema::parse_str(T::schema_definition()).map_err(HarnessError::codec("parse schema for"))
}
