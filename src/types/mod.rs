//! API Client Types
//!
//! Core type definitions: configuration, login status, token grants and
//! per-request options.

pub mod config;
pub mod options;
pub mod status;
pub mod token;

pub use config::*;
pub use options::*;
pub use status::*;
pub use token::*;
