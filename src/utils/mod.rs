pub mod encoding;
pub mod env;
pub mod redact;
pub mod route;
pub mod text;
