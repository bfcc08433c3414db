//! Authoritative record types.
//!
//! The engine never owns the authoritative store; it only consumes records
//! from it, either through the write-path change hook or by paging during a
//! full reindex.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of mutation that happened to an authoritative record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A record from the authoritative transactional store.
///
/// All fields except the primary key are optional or defaulted: indexing is
/// best-effort relative to the source of truth, so a sparse record is still
/// mappable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Primary key in the authoritative store.
    pub id: String,
    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Free-form profile text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Whether the record is active.
    #[serde(default)]
    pub active: bool,
    /// Last mutation time in the authoritative store.
    pub updated_at: DateTime<Utc>,
}

impl SourceRecord {
    /// Create a minimal record with only the primary key populated.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: None,
            last_name: None,
            email: None,
            bio: None,
            active: true,
            updated_at: Utc::now(),
        }
    }

    /// Set the name fields.
    pub fn with_name(
        mut self,
        first: impl Into<String>,
        last: impl Into<String>,
    ) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// Set the email field.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the bio field.
    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    /// Display name derived from the name fields, if any part is present.
    pub fn full_name(&self) -> Option<String> {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        match (first.is_empty(), last.is_empty()) {
            (true, true) => None,
            (false, true) => Some(first.to_string()),
            (true, false) => Some(last.to_string()),
            (false, false) => Some(format!("{} {}", first, last)),
        }
    }
}
