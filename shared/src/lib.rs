pub mod admin_service;
pub mod headers;
pub mod http;
pub mod metrics_defs;

// Re-exported so the metric macros resolve in dependent crates.
pub use metrics;
