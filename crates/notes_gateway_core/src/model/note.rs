//! Note records, caller identity and owner-id harvesting.
//!
//! # Invariants
//! - `OwnerIdSet` only exists for a note stream that reached its end; the
//!   collector cannot be read before `finish()`.
//! - Owner ids collapse to set semantics, arrival order is irrelevant.

use crate::pb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Identity of the requesting user, supplied by the session layer.
///
/// The gateway never authenticates; it trusts the value it is handed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CallerIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Note as read from or written to a notes backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Empty for a note that has not been created yet.
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created: String,
    pub updated: String,
}

impl From<pb::Note> for Note {
    fn from(value: pb::Note) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            content: value.content,
            created: value.created,
            updated: value.updated,
        }
    }
}

/// Incremental owner-id accumulator fed while a note stream is consumed.
#[derive(Debug, Default)]
pub struct OwnerIdCollector {
    ids: BTreeSet<String>,
}

impl OwnerIdCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the owner of one received note.
    pub fn record(&mut self, note: &Note) {
        if !self.ids.contains(note.user_id.as_str()) {
            self.ids.insert(note.user_id.clone());
        }
    }

    /// Finalizes the set once the note stream has ended.
    pub fn finish(self) -> OwnerIdSet {
        OwnerIdSet { ids: self.ids }
    }
}

/// Distinct owner ids of a completed note collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OwnerIdSet {
    ids: BTreeSet<String>,
}

impl OwnerIdSet {
    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    /// Sorted ids in wire form.
    pub fn into_vec(self) -> Vec<String> {
        self.ids.into_iter().collect()
    }
}
