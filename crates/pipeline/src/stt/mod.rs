//! Speech-to-Text backends
//!
//! Recognition runs in an external sidecar; this module holds the client side.

mod http_backend;

pub use http_backend::{HttpSttBackend, HttpSttConfig};
