use crate::constants::content_types;
use crate::errors::ClientError;
use bytes::Bytes;
use serde_json::Value;

pub trait Serializer: Send + Sync {
    fn content_type(&self) -> &str;
    fn serialize(&self, value: &Value) -> Result<Bytes, ClientError>;
    fn deserialize(&self, body: &[u8]) -> Result<Value, ClientError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializerSettings {
    pub pretty: bool,
    pub omit_null_fields: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    settings: SerializerSettings,
}

impl JsonSerializer {
    pub fn new(settings: SerializerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> SerializerSettings {
        self.settings
    }
}

impl Serializer for JsonSerializer {
    fn content_type(&self) -> &str {
        content_types::JSON
    }

    fn serialize(&self, value: &Value) -> Result<Bytes, ClientError> {
        let pruned;
        let value = if self.settings.omit_null_fields {
            pruned = strip_nulls(value);
            &pruned
        } else {
            value
        };
        let encoded = if self.settings.pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded
            .map(Bytes::from)
            .map_err(|err| ClientError::serialization(err.to_string()))
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value, ClientError> {
        serde_json::from_slice(body).map_err(|err| ClientError::conversion(err.to_string()))
    }
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}
