//! Built-in node executors

pub mod http_request;
pub mod manual_trigger;

pub use http_request::{HttpRequestExecutor, HttpRequestSettings};
pub use manual_trigger::ManualTriggerExecutor;
