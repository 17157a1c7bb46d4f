use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPart {
    pub bytes: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl BinaryPart {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Json(Value),
    Binary(BinaryPart),
    Invalid(String),
}

impl ArgValue {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ArgValue::Json(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, ArgValue)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<T: Serialize + ?Sized>(self, name: impl Into<String>, value: &T) -> Self {
        let value = match serde_json::to_value(value) {
            Ok(json) => ArgValue::Json(json),
            Err(err) => ArgValue::Invalid(err.to_string()),
        };
        self.with_value(name, value)
    }

    pub fn binary(self, name: impl Into<String>, part: BinaryPart) -> Self {
        self.with_value(name, ArgValue::Binary(part))
    }

    pub fn with_value(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        let name = name.into();
        if let Some(slot) = self.values.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = value;
        } else {
            self.values.push((name, value));
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
