pub mod network {
    pub const TIMEOUT_REQUEST_MS: u64 = 30_000;
    pub const TIMEOUT_TOKEN_REQUEST_MS: u64 = 10_000;
    pub const MAX_REDIRECTS: usize = 10;
    pub const BLOCKING_WORKER_THREADS: usize = 2;
}

pub mod retry {
    pub const MAX_RETRIES: usize = 2;
    pub const BASE_DELAY_MS: u64 = 0;
    pub const MAX_DELAY_MS: u64 = 5_000;
    pub const JITTER: f64 = 0.2;
    pub const SERVER_ERROR_FLOOR: u16 = 500;
}

pub mod binding {
    pub const MAX_DEPTH: usize = 5;
}

pub mod auth {
    pub const EXPIRY_BUFFER_MS: u64 = 30_000;
    pub const TOKEN_PATH: &str = "access_token";
}

pub mod limits {
    pub const ERROR_BODY_PREVIEW_BYTES: usize = 2_048;
}

pub mod env {
    pub const LOG_LEVEL: &str = "ROUTECALL_LOG_LEVEL";
    pub const LOG_LEVEL_FALLBACK: &str = "LOG_LEVEL";
    pub const MAX_RETRY: &str = "ROUTECALL_MAX_RETRY";
    pub const TIMEOUT_MS: &str = "ROUTECALL_TIMEOUT_MS";
    pub const RETRY_BASE_DELAY_MS: &str = "ROUTECALL_RETRY_BASE_DELAY_MS";
    pub const RETRY_MAX_DELAY_MS: &str = "ROUTECALL_RETRY_MAX_DELAY_MS";
    pub const RETRY_ON_TRANSPORT_ERROR: &str = "ROUTECALL_RETRY_ON_TRANSPORT_ERROR";
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http:", "https:"];
}

pub mod content_types {
    pub const JSON: &str = "application/json";
    pub const TEXT: &str = "text/plain; charset=utf-8";
    pub const FORM: &str = "application/x-www-form-urlencoded";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}
