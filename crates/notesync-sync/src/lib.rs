//! # notesync-sync
//!
//! Keeps note records and their stored images consistent across create,
//! list, and delete, and publishes the note sequence shown to the user.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use notesync_gateway::{GatewayConfig, HttpRecordGateway, HttpStorageGateway, StaticIdentity};
//! use notesync_sync::{NoteForm, NoteSynchronizer, SyncConfig};
//!
//! let gateways = GatewayConfig::load()?;
//! let sync = NoteSynchronizer::new(
//!     Arc::new(HttpRecordGateway::new(&gateways)?),
//!     Arc::new(HttpStorageGateway::new(&gateways)?),
//!     Arc::new(StaticIdentity::from_env()?),
//!     SyncConfig::from_env()?,
//! );
//!
//! sync.refresh().await?;
//! let note = sync.create(NoteForm::new("Groceries", "Milk, eggs")).await?;
//! sync.delete(&note).await?;
//! ```

pub mod config;
pub mod form;
pub mod snapshot;
pub mod synchronizer;

pub use config::{ImageRetention, SyncConfig, UploadFailurePolicy};
pub use form::{ImageFile, NoteForm};
pub use snapshot::NoteSnapshot;
pub use synchronizer::NoteSynchronizer;
