//! Builders
//!
//! Fluent builder for client configuration.

pub mod config;

pub use config::{oauth2_client_config, ClientConfigBuilder};
