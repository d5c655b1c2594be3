//! Structured logging schema and field name constants for notesync.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Inconsistent remote state left behind (dangling record) |
//! | WARN  | Isolated degradation, operation continues (unresolvable image) |
//! | INFO  | Operation completions (refresh, create, delete, sign-out) |
//! | DEBUG | Decision points, gateway calls, config choices |
//! | TRACE | Per-note iteration during enrichment |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "sync", "gateway"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "synchronizer", "http_record", "http_storage"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "refresh", "create", "delete", "upload", "resolve_url"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note identifier being operated on.
pub const NOTE_ID: &str = "note_id";

/// Storage path of an image object.
pub const STORAGE_PATH: &str = "storage_path";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of notes returned by a list or refresh.
pub const RESULT_COUNT: &str = "result_count";

/// Number of notes whose image could not be resolved.
pub const DEGRADED_COUNT: &str = "degraded_count";

/// Byte length of an uploaded image.
pub const SIZE_BYTES: &str = "size_bytes";

/// Refresh sequencing ticket.
pub const TICKET: &str = "ticket";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
