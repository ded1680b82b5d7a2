//! Report backend abstraction for the report workspace
//!
//! This crate provides the seam between the job layer and the backend
//! service. It includes:
//!
//! - The [`ReportBackend`] trait covering every backend operation
//! - An HTTP implementation built on `reqwest`
//! - Client configuration (base URL, token, timeout classes)
//! - Wire payloads and the error-body convention of the backend
//!
//! Enable the `mock` feature to get `MockReportBackend` in downstream tests.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod wire;

// Re-export main types
pub use backend::{JobAccepted, ReportBackend};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use http::HttpReportClient;

#[cfg(any(test, feature = "mock"))]
pub use backend::MockReportBackend;
