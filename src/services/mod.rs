pub mod auth;
pub mod binder;
pub mod descriptor;
pub mod logger;
pub mod request;
pub mod response;
pub mod serializer;
pub mod settings;
pub mod transport;
