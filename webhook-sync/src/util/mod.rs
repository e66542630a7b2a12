//! Shared utilities.

pub mod http;

pub use http::build_client;
