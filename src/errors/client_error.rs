use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientErrorKind {
    Configuration,
    Transport,
    Timeout,
    HttpStatus,
    Auth,
    Conversion,
    Serialization,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub retryable: bool,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
            status: None,
            reason: None,
            retryable: matches!(kind, ClientErrorKind::Transport | ClientErrorKind::Timeout),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Configuration, "CONFIGURATION", message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Transport, "TRANSPORT", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Timeout, "TIMEOUT", message)
    }

    pub fn http_status(status: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let message = if reason.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, reason)
        };
        let mut err = Self::new(ClientErrorKind::HttpStatus, "HTTP_STATUS", message);
        err.status = Some(status);
        err.reason = Some(reason);
        err
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Auth, "AUTH", message)
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Conversion, "CONVERSION", message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Serialization, "SERIALIZATION", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Internal, "INTERNAL", message)
    }

    pub fn is_configuration(&self) -> bool {
        self.kind == ClientErrorKind::Configuration
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            ClientErrorKind::Transport | ClientErrorKind::Timeout
        )
    }

    pub fn is_http_status(&self) -> bool {
        self.kind == ClientErrorKind::HttpStatus
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ClientError {}
