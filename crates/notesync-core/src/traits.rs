//! Core traits for notesync abstractions.
//!
//! These traits define the narrow contracts of the remote services the
//! synchronizer talks to, enabling pluggable backends and test doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;
use crate::path::StoragePath;

// =============================================================================
// RECORD GATEWAY
// =============================================================================

/// Structured-record service holding note metadata.
///
/// Implementations assign ids atomically on create and reflect deletes in
/// the next `list`.
#[async_trait]
pub trait RecordGateway: Send + Sync {
    /// Create a record and return it with its assigned id.
    async fn create(&self, fields: NewNoteRecord) -> Result<NoteRecord>;

    /// List all records visible to the current user, in the service's order.
    async fn list(&self) -> Result<Vec<NoteRecord>>;

    /// Delete a record by id and return what was deleted.
    async fn delete(&self, id: &NoteId) -> Result<NoteRecord>;
}

// =============================================================================
// STORAGE GATEWAY
// =============================================================================

/// Object storage holding image bytes by path.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Write `data` at `path`.
    async fn upload(&self, path: &StoragePath, data: &[u8], content_type: &str) -> Result<()>;

    /// Resolve a time-limited access URL for the object at `path`.
    async fn resolve_url(&self, path: &StoragePath) -> Result<ResolvedUrl>;

    /// Remove the object at `path`. Removing a missing object is not an error.
    async fn remove(&self, path: &StoragePath) -> Result<()>;
}

// =============================================================================
// IDENTITY PROVIDER
// =============================================================================

/// Authentication collaborator supplying the signed-in user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Identity of the signed-in user; `Error::Unauthorized` when signed out.
    async fn identity(&self) -> Result<UserIdentity>;

    /// End the current session.
    async fn sign_out(&self) -> Result<()>;
}
