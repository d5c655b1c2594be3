//! In-memory gateway doubles for deterministic testing.
//!
//! Both doubles keep their state behind `Arc`, so a clone handed to the
//! synchronizer and the clone kept by the test observe the same calls.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notesync_gateway::mock::{MockRecordGateway, MockStorageGateway};
//!
//! let records = MockRecordGateway::new().with_next_id("abc");
//! let storage = MockStorageGateway::new().with_failure("resolve_url");
//! assert_eq!(records.call_count("create"), 0);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use notesync_core::{
    Error, NewNoteRecord, NoteId, NoteRecord, RecordGateway, ResolvedUrl, Result, StorageGateway,
    StoragePath,
};

/// One logged gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

#[derive(Debug, Default)]
struct CallLog {
    calls: Mutex<Vec<MockCall>>,
}

impl CallLog {
    fn log(&self, operation: &str, input: impl Into<String>) {
        self.calls.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.into(),
        });
    }

    fn all(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    fn clear(&self) {
        self.calls.lock().unwrap().clear()
    }
}

#[derive(Debug, Default)]
struct FaultPlan {
    failing_ops: Mutex<HashSet<String>>,
    latency: Mutex<HashMap<String, Duration>>,
}

impl FaultPlan {
    fn set_failure(&self, operation: &str, fail: bool) {
        let mut ops = self.failing_ops.lock().unwrap();
        if fail {
            ops.insert(operation.to_string());
        } else {
            ops.remove(operation);
        }
    }

    fn should_fail(&self, operation: &str) -> bool {
        self.failing_ops.lock().unwrap().contains(operation)
    }

    fn set_latency(&self, operation: &str, latency: Duration) {
        self.latency
            .lock()
            .unwrap()
            .insert(operation.to_string(), latency);
    }

    async fn delay(&self, operation: &str) {
        let latency = self.latency.lock().unwrap().get(operation).copied();
        if let Some(latency) = latency.filter(|l| !l.is_zero()) {
            tokio::time::sleep(latency).await;
        }
    }
}

// =============================================================================
// RECORD GATEWAY DOUBLE
// =============================================================================

#[derive(Debug, Default)]
struct RecordState {
    records: Mutex<Vec<NoteRecord>>,
    next_ids: Mutex<VecDeque<String>>,
    counter: AtomicU64,
    log: CallLog,
    faults: FaultPlan,
}

/// In-memory record service.
///
/// Operations are logged as `"create"`, `"list"` and `"delete"`.
#[derive(Debug, Clone, Default)]
pub struct MockRecordGateway {
    state: Arc<RecordState>,
}

impl MockRecordGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing record.
    pub fn with_record(self, record: NoteRecord) -> Self {
        self.state.records.lock().unwrap().push(record);
        self
    }

    /// Queue the id the next `create` assigns. Otherwise ids are `note-{n}`.
    pub fn with_next_id(self, id: impl Into<String>) -> Self {
        self.state.next_ids.lock().unwrap().push_back(id.into());
        self
    }

    /// Make `operation` fail until cleared with [`set_failure`](Self::set_failure).
    pub fn with_failure(self, operation: &str) -> Self {
        self.set_failure(operation, true);
        self
    }

    /// Delay every `operation` call by `latency`.
    pub fn with_latency(self, operation: &str, latency: Duration) -> Self {
        self.state.faults.set_latency(operation, latency);
        self
    }

    pub fn set_failure(&self, operation: &str, fail: bool) {
        self.state.faults.set_failure(operation, fail);
    }

    /// Change the delay of `operation`; applies to calls made after this.
    pub fn set_latency(&self, operation: &str, latency: Duration) {
        self.state.faults.set_latency(operation, latency);
    }

    /// Current stored records.
    pub fn records(&self) -> Vec<NoteRecord> {
        self.state.records.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.log.all()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state.log.count(operation)
    }

    pub fn clear_calls(&self) {
        self.state.log.clear()
    }

    fn next_id(&self) -> String {
        if let Some(id) = self.state.next_ids.lock().unwrap().pop_front() {
            return id;
        }
        let n = self.state.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("note-{}", n)
    }
}

#[async_trait]
impl RecordGateway for MockRecordGateway {
    async fn create(&self, fields: NewNoteRecord) -> Result<NoteRecord> {
        self.state.log.log(
            "create",
            format!(
                "name={} description={} image={}",
                fields.name,
                fields.description,
                fields.image.as_deref().unwrap_or("")
            ),
        );
        self.state.faults.delay("create").await;
        if self.state.faults.should_fail("create") {
            return Err(Error::Request("mock create failure".to_string()));
        }

        let now = Utc::now();
        let record = NoteRecord {
            id: NoteId::new(self.next_id())?,
            name: fields.name,
            description: fields.description,
            image: fields.image,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.state.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<NoteRecord>> {
        self.state.log.log("list", "");
        self.state.faults.delay("list").await;
        if self.state.faults.should_fail("list") {
            return Err(Error::Request("mock list failure".to_string()));
        }
        Ok(self.records())
    }

    async fn delete(&self, id: &NoteId) -> Result<NoteRecord> {
        self.state.log.log("delete", id.as_str());
        self.state.faults.delay("delete").await;
        if self.state.faults.should_fail("delete") {
            return Err(Error::Request("mock delete failure".to_string()));
        }

        let mut records = self.state.records.lock().unwrap();
        let pos = records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| Error::Request(format!("delete returned 404: note {} not found", id)))?;
        Ok(records.remove(pos))
    }
}

// =============================================================================
// STORAGE GATEWAY DOUBLE
// =============================================================================

/// An object held by [`MockStorageGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct StorageState {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing_paths: Mutex<HashSet<String>>,
    signatures: AtomicU64,
    log: CallLog,
    faults: FaultPlan,
}

/// In-memory object storage.
///
/// Operations are logged as `"upload"`, `"resolve_url"` and `"remove"`.
/// Resolving a path with no object fails, like a presign endpoint that
/// checks existence. Every resolution gets a fresh signature so URLs rotate.
#[derive(Debug, Clone, Default)]
pub struct MockStorageGateway {
    state: Arc<StorageState>,
}

impl MockStorageGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object at `path`.
    pub fn with_object(self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.state.objects.lock().unwrap().insert(
            path.into(),
            StoredObject {
                data: data.into(),
                content_type: "image/png".to_string(),
            },
        );
        self
    }

    /// Make `operation` fail for every path.
    pub fn with_failure(self, operation: &str) -> Self {
        self.state.faults.set_failure(operation, true);
        self
    }

    /// Make `resolve_url` fail for this path only.
    pub fn with_resolution_failure(self, path: impl Into<String>) -> Self {
        self.state.failing_paths.lock().unwrap().insert(path.into());
        self
    }

    /// Delay every `operation` call by `latency`.
    pub fn with_latency(self, operation: &str, latency: Duration) -> Self {
        self.state.faults.set_latency(operation, latency);
        self
    }

    pub fn set_failure(&self, operation: &str, fail: bool) {
        self.state.faults.set_failure(operation, fail);
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.state.objects.lock().unwrap().get(path).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.state.objects.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state.log.all()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state.log.count(operation)
    }

    pub fn clear_calls(&self) {
        self.state.log.clear()
    }
}

#[async_trait]
impl StorageGateway for MockStorageGateway {
    async fn upload(&self, path: &StoragePath, data: &[u8], content_type: &str) -> Result<()> {
        self.state.log.log("upload", path.as_str());
        self.state.faults.delay("upload").await;
        if self.state.faults.should_fail("upload") {
            return Err(Error::Request("mock upload failure".to_string()));
        }

        self.state.objects.lock().unwrap().insert(
            path.as_str().to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn resolve_url(&self, path: &StoragePath) -> Result<ResolvedUrl> {
        self.state.log.log("resolve_url", path.as_str());
        self.state.faults.delay("resolve_url").await;
        if self.state.faults.should_fail("resolve_url")
            || self
                .state
                .failing_paths
                .lock()
                .unwrap()
                .contains(path.as_str())
        {
            return Err(Error::Request(format!("mock resolve failure: {}", path)));
        }
        if !self
            .state
            .objects
            .lock()
            .unwrap()
            .contains_key(path.as_str())
        {
            return Err(Error::Request(format!("presign returned 404: {}", path)));
        }

        let sig = self.state.signatures.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ResolvedUrl::new(format!(
            "https://storage.mock/{}?sig={}",
            path, sig
        ))
        .with_expiry(Utc::now() + chrono::Duration::minutes(15)))
    }

    async fn remove(&self, path: &StoragePath) -> Result<()> {
        self.state.log.log("remove", path.as_str());
        self.state.faults.delay("remove").await;
        if self.state.faults.should_fail("remove") {
            return Err(Error::Request("mock remove failure".to_string()));
        }
        self.state.objects.lock().unwrap().remove(path.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notesync_core::{derive_path, UserIdentity};

    fn path(file: &str) -> StoragePath {
        derive_path(
            &UserIdentity::new("u").unwrap(),
            &NoteId::new("n").unwrap(),
            file,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_record_ids_and_order() {
        let gw = MockRecordGateway::new().with_next_id("abc");
        let first = gw
            .create(NewNoteRecord {
                name: "a".into(),
                description: "b".into(),
                image: None,
            })
            .await
            .unwrap();
        let second = gw
            .create(NewNoteRecord {
                name: "c".into(),
                description: "d".into(),
                image: None,
            })
            .await
            .unwrap();

        assert_eq!(first.id.as_str(), "abc");
        assert_eq!(second.id.as_str(), "note-1");
        let listed = gw.list().await.unwrap();
        assert_eq!(listed, vec![first, second]);
        assert_eq!(gw.call_count("create"), 2);
        assert_eq!(gw.call_count("list"), 1);
    }

    #[tokio::test]
    async fn test_record_delete_missing() {
        let gw = MockRecordGateway::new();
        let result = gw.delete(&NoteId::new("nope").unwrap()).await;
        assert!(result.is_err());
        assert_eq!(gw.call_count("delete"), 1);
    }

    #[tokio::test]
    async fn test_record_failure_toggle() {
        let gw = MockRecordGateway::new().with_failure("list");
        assert!(gw.list().await.is_err());
        gw.set_failure("list", false);
        assert!(gw.list().await.is_ok());
    }

    #[tokio::test]
    async fn test_storage_resolve_requires_object() {
        let gw = MockStorageGateway::new();
        let p = path("a.png");
        assert!(gw.resolve_url(&p).await.is_err());

        gw.upload(&p, b"bytes", "image/png").await.unwrap();
        let first = gw.resolve_url(&p).await.unwrap();
        let second = gw.resolve_url(&p).await.unwrap();
        assert_ne!(first.url, second.url);
        assert!(first.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_storage_per_path_failure() {
        let bad = path("bad.png");
        let good = path("good.png");
        let gw = MockStorageGateway::new()
            .with_object(bad.as_str(), b"x".to_vec())
            .with_object(good.as_str(), b"y".to_vec())
            .with_resolution_failure(bad.as_str());

        assert!(gw.resolve_url(&bad).await.is_err());
        assert!(gw.resolve_url(&good).await.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let gw = MockStorageGateway::new();
        let handle = gw.clone();
        gw.upload(&path("a.png"), b"z", "image/png").await.unwrap();
        assert_eq!(handle.object_count(), 1);
        assert_eq!(handle.call_count("upload"), 1);
    }
}
