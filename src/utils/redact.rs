use crate::utils::text::preview_body;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::HashSet;

const DEFAULT_REDACTION: &str = "[REDACTED]";
const INLINE_REDACTION: &str = "***REDACTED***";

static SENSITIVE_HEADER_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "authorization",
        "proxy-authorization",
        "cookie",
        "set-cookie",
        "x-api-key",
        "x-auth-token",
        "x-access-token",
    ]
    .into_iter()
    .collect()
});

static INLINE_REDACTION_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(Bearer)\s+([A-Za-z0-9._~+/=-]{6,})").expect("inline redaction regex"),
            "$1 ***REDACTED***",
        ),
        (
            Regex::new(r#""(access_token|refresh_token|id_token|client_secret)"\s*:\s*"[^"]*""#)
                .expect("inline redaction regex"),
            r#""$1":"***REDACTED***""#,
        ),
    ]
});

pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADER_KEYS.contains(name.trim().to_lowercase().as_str())
}

pub fn redact_text(value: &str) -> String {
    let mut out = value.to_string();
    for (re, replacement) in INLINE_REDACTION_PATTERNS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).to_string();
        }
    }
    out
}

pub fn redact_body_preview(body: &[u8], max_bytes: usize) -> String {
    let redacted = redact_text(&String::from_utf8_lossy(body));
    preview_body(redacted.as_bytes(), max_bytes)
}

pub fn headers_for_log(headers: &HeaderMap) -> Value {
    let mut out = serde_json::Map::new();
    for (name, value) in headers {
        let rendered = if is_sensitive_header(name.as_str()) {
            DEFAULT_REDACTION.to_string()
        } else {
            value
                .to_str()
                .map(redact_text)
                .unwrap_or_else(|_| INLINE_REDACTION.to_string())
        };
        out.insert(name.as_str().to_string(), Value::String(rendered));
    }
    Value::Object(out)
}
