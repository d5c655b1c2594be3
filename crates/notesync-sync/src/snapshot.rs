//! Published note sequence.

use serde::Serialize;

use notesync_core::{Note, NoteId};

/// The note sequence last published by the synchronizer.
///
/// `ticket` is the sequencing token of the operation that published it;
/// a snapshot is only ever replaced by one with a larger ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoteSnapshot {
    pub ticket: u64,
    pub notes: Vec<Note>,
}

impl NoteSnapshot {
    pub fn new(ticket: u64, notes: Vec<Note>) -> Self {
        Self { ticket, notes }
    }

    /// The note with `id`, if present.
    pub fn find(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id.as_ref() == Some(id))
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
