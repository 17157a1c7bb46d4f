pub mod client;
pub mod pipeline;
