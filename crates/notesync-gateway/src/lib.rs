//! # notesync-gateway
//!
//! Concrete implementations of the notesync gateway traits:
//!
//! - [`http::HttpRecordGateway`]: note records over a JSON REST API
//! - [`http::HttpStorageGateway`]: image bytes and presigned URLs over HTTP
//! - [`identity::StaticIdentity`]: a fixed signed-in user
//! - [`mock`]: in-memory doubles with call logs (feature `mock`)
//!
//! Connection settings come from [`config::GatewayConfig`].

pub mod config;
pub mod http;
pub mod identity;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{ConfigError, ConfigResult, GatewayConfig};
pub use http::{HttpRecordGateway, HttpStorageGateway};
pub use identity::StaticIdentity;
