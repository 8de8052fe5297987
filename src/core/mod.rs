//! Core Components
//!
//! HTTP transport used by both the token endpoint and the REST façade.

pub mod transport;

pub use transport::*;
