use crate::constants::limits::ERROR_BODY_PREVIEW_BYTES;
use crate::errors::ClientError;
use crate::services::serializer::Serializer;
use crate::utils::redact::{headers_for_log, redact_body_preview};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResult<T> {
    pub status: StatusCode,
    pub reason: String,
    pub headers: HeaderMap,
    pub content: Option<T>,
    pub body: Bytes,
}

impl<T> HttpResult<T> {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn into_content(self) -> Option<T> {
        self.content
    }
}

impl HttpResult<Value> {
    pub fn from_raw(raw: RawResponse, content: Option<Value>) -> Self {
        Self {
            status: raw.status,
            reason: raw.status.canonical_reason().unwrap_or("").to_string(),
            headers: raw.headers,
            content,
            body: raw.body,
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<HttpResult<T>, ClientError> {
        let content = match self.content {
            Some(value) => match decode_content::<T>(value, &self.body) {
                Ok(decoded) => Some(decoded),
                Err(_) if !self.status.is_success() => None,
                Err(err) => return Err(err),
            },
            None => None,
        };
        Ok(HttpResult {
            status: self.status,
            reason: self.reason,
            headers: self.headers,
            content,
            body: self.body,
        })
    }

    pub fn decode_payload<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        decode_content(self.content.unwrap_or(Value::Null), &self.body)
    }
}

// Numbers that do not fit T decode from the body text, which keeps big integers exact.
fn decode_content<T: DeserializeOwned>(value: Value, body: &[u8]) -> Result<T, ClientError> {
    if value.is_number() {
        let text = std::str::from_utf8(body).map(str::trim).unwrap_or("");
        let body_is_number = serde_json::from_str::<Value>(text)
            .map(|parsed| parsed.is_number())
            .unwrap_or(false);
        if body_is_number && serde_json::from_value::<T>(value.clone()).is_err() {
            if let Ok(decoded) = serde_json::from_value::<T>(Value::String(text.to_string())) {
                return Ok(decoded);
            }
        }
    }
    decode_value(value)
}

pub fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    let err = match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => return Ok(decoded),
        Err(err) => err,
    };
    let fallback = match &value {
        Value::Number(_) | Value::Bool(_) => {
            serde_json::from_value::<T>(Value::String(value.to_string())).ok()
        }
        Value::String(text) => serde_json::from_str::<T>(text.trim()).ok(),
        _ => None,
    };
    fallback.ok_or_else(|| {
        ClientError::conversion(format!("Failed to decode response content: {}", err))
    })
}

pub type ResponseParser =
    fn(&RawResponse, &dyn Serializer) -> Result<Option<Value>, ClientError>;

pub type ResultConverter = fn(HttpResult<Value>) -> Result<HttpResult<Value>, ClientError>;

pub fn parse_payload(
    raw: &RawResponse,
    serializer: &dyn Serializer,
) -> Result<Option<Value>, ClientError> {
    if raw.body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    if let Ok(value) = serializer.deserialize(&raw.body) {
        return Ok(Some(value));
    }
    match std::str::from_utf8(&raw.body) {
        Ok(text) => Ok(Some(Value::String(text.to_string()))),
        Err(_) if !raw.status.is_success() => Ok(None),
        Err(err) => Err(ClientError::conversion(format!(
            "Response body is neither {} nor text: {}",
            serializer.content_type(),
            err
        ))),
    }
}

pub fn parse_nothing(
    _raw: &RawResponse,
    _serializer: &dyn Serializer,
) -> Result<Option<Value>, ClientError> {
    Ok(None)
}

pub fn raise_for_status(result: HttpResult<Value>) -> Result<HttpResult<Value>, ClientError> {
    if result.is_success() {
        return Ok(result);
    }
    Err(
        ClientError::http_status(result.status.as_u16(), result.reason.clone()).with_details(
            serde_json::json!({
                "headers": headers_for_log(&result.headers),
                "body": redact_body_preview(&result.body, ERROR_BODY_PREVIEW_BYTES),
            }),
        ),
    )
}

pub fn pass_through(result: HttpResult<Value>) -> Result<HttpResult<Value>, ClientError> {
    Ok(result)
}
