//! Note synchronizer: keeps records and stored images consistent.
//!
//! Every operation is one logical transaction from the caller's view:
//!
//! - `refresh` lists records and resolves a display URL for every image,
//!   concurrently and with per-note failure isolation.
//! - `create` writes the record, then uploads the image at the path derived
//!   from (identity, new id, file name), then refreshes.
//! - `delete` removes the record (and optionally the image), then refreshes.
//!
//! `create` and `delete` are serialized through a single-writer lock.
//! `refresh` is not; concurrent refreshes are ordered by ticket, and a result
//! is published only if nothing started later has published first.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, instrument, trace, warn, Span};

use notesync_core::events::EventEnvelope;
use notesync_core::{
    derive_path, logging, Error, EventBus, IdentityProvider, ImageRef, Note, NoteEvent, NoteId,
    NoteRecord, RecordGateway, Result, StorageGateway, StoragePath, UserIdentity,
};

use crate::config::{ImageRetention, SyncConfig, UploadFailurePolicy};
use crate::form::{NoteForm, ValidatedImage};
use crate::snapshot::NoteSnapshot;

/// Coordinates the record gateway and the storage gateway.
pub struct NoteSynchronizer {
    records: Arc<dyn RecordGateway>,
    storage: Arc<dyn StorageGateway>,
    identity: Arc<dyn IdentityProvider>,
    config: SyncConfig,
    events: EventBus,
    tickets: AtomicU64,
    snapshot: watch::Sender<NoteSnapshot>,
    write_lock: Mutex<()>,
}

impl NoteSynchronizer {
    pub fn new(
        records: Arc<dyn RecordGateway>,
        storage: Arc<dyn StorageGateway>,
        identity: Arc<dyn IdentityProvider>,
        config: SyncConfig,
    ) -> Self {
        let (snapshot, _) = watch::channel(NoteSnapshot::default());
        Self {
            records,
            storage,
            identity,
            config,
            events: EventBus::default(),
            tickets: AtomicU64::new(0),
            snapshot,
            write_lock: Mutex::new(()),
        }
    }

    /// Emit events on a shared bus instead of a private one.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The currently published note sequence.
    pub fn notes(&self) -> Vec<Note> {
        self.snapshot.borrow().notes.clone()
    }

    /// The currently published snapshot, with its ticket.
    pub fn snapshot(&self) -> NoteSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch the published note sequence.
    pub fn subscribe(&self) -> watch::Receiver<NoteSnapshot> {
        self.snapshot.subscribe()
    }

    /// Receive a [`NoteEvent`] for every completed operation and absorbed failure.
    pub fn events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// List all notes and resolve a display URL for each image.
    ///
    /// A note whose URL cannot be resolved is returned without an image. The
    /// result is returned even when a later refresh has already published.
    #[instrument(
        skip(self),
        fields(
            subsystem = "sync",
            component = "synchronizer",
            op = "refresh",
            ticket = tracing::field::Empty,
            result_count = tracing::field::Empty,
            degraded_count = tracing::field::Empty
        )
    )]
    pub async fn refresh(&self) -> Result<Vec<Note>> {
        let start = Instant::now();
        let ticket = self.next_ticket();
        Span::current().record(logging::TICKET, ticket);

        let user = self.current_identity().await?;
        let records = self
            .timed("list", self.records.list())
            .await
            .map_err(|e| e.into_remote_read("list"))?;
        debug!(record_count = records.len(), "Listed note records");

        let resolved: Vec<(Note, bool)> = stream::iter(records)
            .map(|record| self.resolve_image(&user, record))
            .buffered(self.config.max_concurrent_resolutions.max(1))
            .collect()
            .await;

        let degraded = resolved.iter().filter(|(_, degraded)| *degraded).count();
        let notes: Vec<Note> = resolved.into_iter().map(|(note, _)| note).collect();
        Span::current().record(logging::RESULT_COUNT, notes.len());
        Span::current().record(logging::DEGRADED_COUNT, degraded);

        let note_count = notes.len();
        if self.publish(ticket, notes.clone()) {
            self.events.emit(NoteEvent::Refreshed { ticket, note_count });
        } else {
            debug!(ticket, "Later refresh already published, dropping result");
        }

        info!(
            result_count = note_count,
            degraded_count = degraded,
            duration_ms = start.elapsed().as_millis() as u64,
            "Refresh complete"
        );
        Ok(notes)
    }

    /// Resolve one record's image. The flag is true when the image was dropped.
    async fn resolve_image(&self, user: &UserIdentity, record: NoteRecord) -> (Note, bool) {
        let id = record.id.clone();
        let path = match record.storage_path(user) {
            Ok(Some(path)) => path,
            Ok(None) => {
                trace!(note_id = %id, "Note has no image");
                return (record.with_image(ImageRef::None), false);
            }
            Err(e) => {
                self.image_unavailable(&id, &e);
                return (record.with_image(ImageRef::None), true);
            }
        };

        match self
            .timed("resolve_url", self.storage.resolve_url(&path))
            .await
        {
            Ok(url) => {
                trace!(note_id = %id, storage_path = %path, "Resolved image URL");
                (record.with_image(ImageRef::Resolved { path, url }), false)
            }
            Err(e) => {
                self.image_unavailable(&id, &e);
                (record.with_image(ImageRef::None), true)
            }
        }
    }

    fn image_unavailable(&self, id: &NoteId, cause: &Error) {
        warn!(note_id = %id, error = %cause, "Image unavailable, showing note without it");
        self.events.emit(NoteEvent::ImageUnavailable {
            note_id: id.to_string(),
            reason: cause.to_string(),
        });
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Create a note, uploading its image if the form carries one.
    ///
    /// Requires a signed-in identity whether or not an image is attached.
    /// Without an image the created note is added to the published sequence
    /// directly. With an image the returned note comes from the refresh that
    /// follows the upload and carries a resolved URL.
    #[instrument(
        skip(self, form),
        fields(
            subsystem = "sync",
            component = "synchronizer",
            op = "create",
            note_id = tracing::field::Empty,
            size_bytes = tracing::field::Empty
        )
    )]
    pub async fn create(&self, form: NoteForm) -> Result<Note> {
        let form = form.validate(self.config.max_image_bytes)?;
        let _guard = self.write_lock.lock().await;
        let start = Instant::now();

        // Resolve the identity up front so a signed-out user leaves nothing behind.
        let user = self.current_identity().await?;

        let record = self
            .timed("create", self.records.create(form.to_record()))
            .await
            .map_err(|e| e.into_remote_write("create"))?;
        Span::current().record(logging::NOTE_ID, record.id.as_str());
        debug!(note_id = %record.id, "Note record created");

        let image = match form.image {
            Some(image) => image,
            None => {
                let note = record.with_image(ImageRef::None);
                self.insert_created(note.clone());
                if let Some(id) = &note.id {
                    self.events.emit(NoteEvent::Created {
                        note_id: id.to_string(),
                        has_image: false,
                    });
                }
                info!(
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Note created without image"
                );
                return Ok(note);
            }
        };

        Span::current().record(logging::SIZE_BYTES, image.data.len());
        let note_id = record.id.clone();
        let path = match self.upload_image(&user, &note_id, &image).await {
            Ok(path) => path,
            Err(e) => return Err(self.upload_failed(record, &image.file_name, e).await),
        };

        self.events.emit(NoteEvent::Created {
            note_id: note_id.to_string(),
            has_image: true,
        });

        let refreshed = self
            .refresh()
            .await
            .map_err(|e| Error::RefreshFailed {
                committed: format!("create of note {}", note_id),
                reason: e.to_string(),
            })?;

        let note = refreshed
            .into_iter()
            .find(|n| n.id.as_ref() == Some(&note_id))
            .unwrap_or_else(|| {
                debug!(note_id = %note_id, "Created note missing from refresh");
                record.with_image(ImageRef::Stored { path })
            });

        info!(
            note_id = %note_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note created with image"
        );
        Ok(note)
    }

    async fn upload_image(
        &self,
        user: &UserIdentity,
        note_id: &NoteId,
        image: &ValidatedImage,
    ) -> Result<StoragePath> {
        let path = derive_path(user, note_id, &image.file_name)?;
        self.timed(
            "upload",
            self.storage.upload(&path, &image.data, &image.content_type),
        )
        .await
        .map_err(|e| e.into_remote_write("upload"))?;
        debug!(storage_path = %path, "Image uploaded");
        Ok(path)
    }

    /// Apply the upload failure policy and build the error to return.
    ///
    /// A record left in place is published with its image still pending.
    async fn upload_failed(&self, record: NoteRecord, file_name: &str, cause: Error) -> Error {
        let note_id = &record.id;
        let reason = cause.to_string();

        let compensated = match self.config.upload_failure_policy {
            UploadFailurePolicy::Report => {
                warn!(note_id = %note_id, error = %reason, "Image upload failed, record left in place");
                false
            }
            UploadFailurePolicy::Compensate => {
                match self.timed("delete", self.records.delete(note_id)).await {
                    Ok(_) => {
                        warn!(note_id = %note_id, error = %reason, "Image upload failed, record removed");
                        true
                    }
                    Err(e) => {
                        error!(
                            note_id = %note_id,
                            error = %e,
                            upload_error = %reason,
                            "Image upload failed and the record could not be removed"
                        );
                        false
                    }
                }
            }
        };

        let note_id = note_id.to_string();
        if !compensated {
            self.insert_created(record.with_image(ImageRef::PendingUpload {
                file_name: file_name.to_string(),
            }));
        }

        self.events.emit(NoteEvent::UploadFailed {
            note_id: note_id.clone(),
            compensated,
            reason: reason.clone(),
        });

        Error::UploadFailed {
            note_id,
            compensated,
            reason,
        }
    }

    /// Append a just-created note to the published sequence under a fresh ticket.
    fn insert_created(&self, note: Note) {
        let ticket = self.next_ticket();
        self.snapshot.send_if_modified(|current| {
            if ticket <= current.ticket {
                return false;
            }
            let mut notes = std::mem::take(&mut current.notes);
            if !notes.iter().any(|n| n.id.is_some() && n.id == note.id) {
                notes.push(note);
            }
            *current = NoteSnapshot::new(ticket, notes);
            true
        });
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    /// Delete a saved note, then refresh once.
    ///
    /// If the refresh fails the record is already gone; the failure comes back
    /// as [`Error::RefreshFailed`] and the delete must not be retried.
    #[instrument(
        skip(self, note),
        fields(
            subsystem = "sync",
            component = "synchronizer",
            op = "delete",
            note_id = tracing::field::Empty
        )
    )]
    pub async fn delete(&self, note: &Note) -> Result<()> {
        let id = note.id.as_ref().ok_or_else(|| {
            Error::Precondition("cannot delete a note that has not been saved".to_string())
        })?;
        Span::current().record(logging::NOTE_ID, id.as_str());

        let _guard = self.write_lock.lock().await;
        let start = Instant::now();

        let deleted = self
            .timed("delete", self.records.delete(id))
            .await
            .map_err(|e| e.into_remote_write("delete"))?;
        self.events.emit(NoteEvent::Deleted {
            note_id: id.to_string(),
        });

        if self.config.image_retention == ImageRetention::Purge {
            self.purge_image(&deleted).await;
        }

        self.refresh()
            .await
            .map_err(|e| Error::RefreshFailed {
                committed: format!("delete of note {}", id),
                reason: e.to_string(),
            })?;

        info!(
            note_id = %id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note deleted"
        );
        Ok(())
    }

    /// Remove a deleted note's stored image. Failures are reported, not returned.
    ///
    /// The path comes from the record the service deleted, never from the
    /// caller's note, so only that note's own object can be removed.
    async fn purge_image(&self, deleted: &NoteRecord) {
        if deleted.image_value().is_none() {
            return;
        }

        let located = match self.current_identity().await {
            Ok(user) => deleted.storage_path(&user),
            Err(e) => Err(e),
        };
        let path = match located {
            Ok(Some(path)) => path,
            Ok(None) => return,
            Err(e) => {
                warn!(note_id = %deleted.id, error = %e, "Cannot locate image to purge");
                self.events.emit(NoteEvent::ImagePurgeFailed {
                    note_id: deleted.id.to_string(),
                    path: deleted.image_value().unwrap_or_default().to_string(),
                });
                return;
            }
        };

        match self.timed("remove", self.storage.remove(&path)).await {
            Ok(()) => debug!(storage_path = %path, "Purged image"),
            Err(e) => {
                warn!(note_id = %deleted.id, storage_path = %path, error = %e, "Image purge failed");
                self.events.emit(NoteEvent::ImagePurgeFailed {
                    note_id: deleted.id.to_string(),
                    path: path.to_string(),
                });
            }
        }
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// End the session and clear the published sequence.
    #[instrument(skip(self), fields(subsystem = "sync", component = "synchronizer", op = "sign_out"))]
    pub async fn sign_out(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.timed("sign_out", self.identity.sign_out()).await?;

        let ticket = self.next_ticket();
        self.publish(ticket, Vec::new());
        self.events.emit(NoteEvent::SignedOut);
        info!(ticket, "Signed out");
        Ok(())
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    async fn current_identity(&self) -> Result<UserIdentity> {
        self.timed("identity", self.identity.identity()).await
    }

    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Replace the snapshot unless something started later already published.
    fn publish(&self, ticket: u64, notes: Vec<Note>) -> bool {
        self.snapshot.send_if_modified(|current| {
            if ticket <= current.ticket {
                return false;
            }
            *current = NoteSnapshot::new(ticket, notes);
            true
        })
    }

    /// Bound a gateway call by `call_timeout`.
    async fn timed<T, F>(&self, op: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout_secs = self.config.call_timeout.as_secs(), "Gateway call timed out");
                Err(Error::Timeout {
                    op: op.to_string(),
                    secs: self.config.call_timeout.as_secs(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_gateway::mock::{MockRecordGateway, MockStorageGateway};
    use notesync_gateway::StaticIdentity;

    fn synchronizer() -> NoteSynchronizer {
        NoteSynchronizer::new(
            Arc::new(MockRecordGateway::new()),
            Arc::new(MockStorageGateway::new()),
            Arc::new(StaticIdentity::new(UserIdentity::new("alice").unwrap())),
            SyncConfig::default(),
        )
    }

    fn saved(id: &str) -> Note {
        let mut note = Note::unsaved("n", "d");
        note.id = Some(NoteId::new(id).unwrap());
        note
    }

    #[test]
    fn test_tickets_increase() {
        let sync = synchronizer();
        let first = sync.next_ticket();
        let second = sync.next_ticket();
        assert!(second > first);
    }

    #[test]
    fn test_publish_drops_older_ticket() {
        let sync = synchronizer();
        let older = sync.next_ticket();
        let newer = sync.next_ticket();

        assert!(sync.publish(newer, vec![saved("new")]));
        assert!(!sync.publish(older, vec![saved("old")]));

        let snapshot = sync.snapshot();
        assert_eq!(snapshot.ticket, newer);
        assert_eq!(snapshot.notes, vec![saved("new")]);
    }

    #[test]
    fn test_insert_created_appends_once() {
        let sync = synchronizer();
        let ticket = sync.next_ticket();
        sync.publish(ticket, vec![saved("a")]);

        sync.insert_created(saved("b"));
        sync.insert_created(saved("b"));

        let ids: Vec<String> = sync
            .notes()
            .iter()
            .filter_map(|n| n.id.as_ref().map(|id| id.to_string()))
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_maps_elapsed_to_timeout() {
        let sync = NoteSynchronizer::new(
            Arc::new(MockRecordGateway::new()),
            Arc::new(MockStorageGateway::new()),
            Arc::new(StaticIdentity::new(UserIdentity::new("alice").unwrap())),
            SyncConfig::default().with_call_timeout(std::time::Duration::from_secs(2)),
        );

        let result: Result<()> = sync
            .timed("slow", async {
                tokio::time::sleep(std::time::Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        match result {
            Err(Error::Timeout { op, secs }) => {
                assert_eq!(op, "slow");
                assert_eq!(secs, 2);
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_published_snapshot() {
        let sync = synchronizer();
        let mut rx = sync.subscribe();

        let ticket = sync.next_ticket();
        sync.publish(ticket, vec![saved("a")]);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().ticket, ticket);
        assert_eq!(rx.borrow().notes.len(), 1);
    }
}
