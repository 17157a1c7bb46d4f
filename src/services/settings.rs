use crate::constants::{env, network, retry as retry_constants};
use crate::errors::ClientError;
use crate::services::auth::AuthHandler;
use crate::services::response::RawResponse;
use crate::services::serializer::{JsonSerializer, Serializer};
use crate::utils::env::{read_env_flag, read_env_u64};
use reqwest::header::RETRY_AFTER;
use std::fmt;
use std::sync::Arc;

pub type RetryOutcome = Result<RawResponse, ClientError>;
pub type RetryPredicate = Arc<dyn Fn(&RetryOutcome) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: f64,
    pub status_codes: Option<Vec<u16>>,
    pub retry_on_transport_error: bool,
    pub respect_retry_after: bool,
    predicate: Option<RetryPredicate>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::MAX_RETRIES,
            base_delay_ms: retry_constants::BASE_DELAY_MS,
            max_delay_ms: retry_constants::MAX_DELAY_MS,
            jitter: retry_constants::JITTER,
            status_codes: None,
            retry_on_transport_error: true,
            respect_retry_after: false,
            predicate: None,
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("jitter", &self.jitter)
            .field("status_codes", &self.status_codes)
            .field("retry_on_transport_error", &self.retry_on_transport_error)
            .field("respect_retry_after", &self.respect_retry_after)
            .field("predicate", &self.predicate.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn with_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.status_codes = Some(codes);
        self
    }

    pub fn with_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RetryOutcome) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn should_retry(&self, outcome: &RetryOutcome) -> bool {
        if let Some(predicate) = &self.predicate {
            return predicate(outcome);
        }
        match outcome {
            Ok(response) => {
                let status = response.status.as_u16();
                match &self.status_codes {
                    Some(codes) => codes.contains(&status),
                    None => status >= retry_constants::SERVER_ERROR_FLOOR,
                }
            }
            Err(err) => self.retry_on_transport_error && err.is_transport(),
        }
    }

    pub fn compute_delay(&self, attempt: usize, outcome: &RetryOutcome) -> u64 {
        let factor: f64 = 2.0;
        let mut delay =
            (self.base_delay_ms as f64) * factor.powi(attempt.saturating_sub(1) as i32);
        if delay > self.max_delay_ms as f64 {
            delay = self.max_delay_ms as f64;
        }
        if self.jitter > 0.0 && delay > 0.0 {
            let delta = delay * self.jitter;
            delay = delay - delta + rand::random::<f64>() * delta * 2.0;
        }

        if self.respect_retry_after {
            if let Ok(response) = outcome {
                if let Some(retry_after) = response
                    .headers
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                {
                    let retry_after_ms = retry_after.saturating_mul(1000).min(self.max_delay_ms);
                    if retry_after_ms as f64 > delay {
                        delay = retry_after_ms as f64;
                    }
                }
            }
        }

        delay.max(0.0) as u64
    }
}

#[derive(Clone)]
pub struct ClientSettings {
    pub serializer: Arc<dyn Serializer>,
    pub retry: RetryPolicy,
    pub auth_handler: Option<Arc<dyn AuthHandler>>,
    pub timeout_ms: Option<u64>,
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            serializer: Arc::new(JsonSerializer::default()),
            retry: RetryPolicy::default(),
            auth_handler: None,
            timeout_ms: Some(network::TIMEOUT_REQUEST_MS),
            default_headers: Vec::new(),
        }
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("content_type", &self.serializer.content_type())
            .field("retry", &self.retry)
            .field("auth_handler", &self.auth_handler.is_some())
            .field("timeout_ms", &self.timeout_ms)
            .field(
                "default_headers",
                &self
                    .default_headers
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ClientSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(max_retries) = read_env_u64(env::MAX_RETRY) {
            self.retry.max_retries = max_retries as usize;
        }
        if let Some(timeout_ms) = read_env_u64(env::TIMEOUT_MS) {
            self.timeout_ms = if timeout_ms == 0 { None } else { Some(timeout_ms) };
        }
        if let Some(base_delay) = read_env_u64(env::RETRY_BASE_DELAY_MS) {
            self.retry.base_delay_ms = base_delay;
        }
        if let Some(max_delay) = read_env_u64(env::RETRY_MAX_DELAY_MS) {
            self.retry.max_delay_ms = max_delay;
        }
        if let Some(flag) = read_env_flag(env::RETRY_ON_TRANSPORT_ERROR) {
            self.retry.retry_on_transport_error = flag;
        }
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_auth_handler(mut self, handler: Arc<dyn AuthHandler>) -> Self {
        self.auth_handler = Some(handler);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::RetryPolicy;
    use crate::errors::ClientError;
    use crate::services::response::RawResponse;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
    use reqwest::StatusCode;

    #[test]
    fn default_predicate_retries_server_and_transport_failures() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(&Ok(RawResponse::new(StatusCode::INTERNAL_SERVER_ERROR))));
        assert!(policy.should_retry(&Ok(RawResponse::new(StatusCode::SERVICE_UNAVAILABLE))));
        assert!(!policy.should_retry(&Ok(RawResponse::new(StatusCode::NOT_FOUND))));
        assert!(policy.should_retry(&Err(ClientError::transport("reset"))));
        assert!(!policy.should_retry(&Err(ClientError::configuration("bad"))));
    }

    #[test]
    fn custom_status_codes_and_predicate() {
        let policy = RetryPolicy::default().with_status_codes(vec![429]);
        assert!(policy.should_retry(&Ok(RawResponse::new(StatusCode::TOO_MANY_REQUESTS))));
        assert!(!policy.should_retry(&Ok(RawResponse::new(StatusCode::BAD_GATEWAY))));

        let policy = RetryPolicy::default().with_predicate(|outcome| outcome.is_err());
        assert!(!policy.should_retry(&Ok(RawResponse::new(StatusCode::BAD_GATEWAY))));
    }

    #[test]
    fn compute_delay_caps_and_honours_retry_after() {
        let policy = RetryPolicy::default().with_backoff(100, 250).with_jitter(0.0);
        let outcome = Ok(RawResponse::new(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(policy.compute_delay(1, &outcome), 100);
        assert_eq!(policy.compute_delay(2, &outcome), 200);
        assert_eq!(policy.compute_delay(3, &outcome), 250);
        assert_eq!(RetryPolicy::default().compute_delay(3, &outcome), 0);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("1"));
        let outcome = Ok(RawResponse::new(StatusCode::SERVICE_UNAVAILABLE).with_headers(headers));
        let policy = RetryPolicy::default()
            .with_backoff(10, 5_000)
            .with_jitter(0.0)
            .with_retry_after(true);
        assert_eq!(policy.compute_delay(1, &outcome), 1_000);
    }
}
