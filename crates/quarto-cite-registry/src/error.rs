/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for the citation registry.
//!
//! Everything in here is an *internal* failure: the caller's bookkeeping and
//! the registry disagree. Problems with the document itself are never errors,
//! they are [`Warning`](crate::Warning)s attached to entries.

use thiserror::Error;

use crate::entry::EntryKey;

/// Consistency violations detected by the registry.
///
/// These abort the current render. They signal a bug in the orchestration
/// layer, not a malformed document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An operation addressed a group that holds no entries.
    #[error("Unknown citation group '{group}'")]
    UnknownGroup { group: String },

    /// An operation addressed a key that is not stored in its group.
    #[error("Unknown citation {key} in group '{group}'")]
    UnknownEntry { group: String, key: EntryKey },

    /// A rollback record does not describe the entry currently stored under its key.
    #[error(
        "Rollback record for {key} in group '{group}' expected sequence key {expected}, found {found}"
    )]
    SequenceMismatch {
        group: String,
        key: EntryKey,
        expected: u64,
        found: u64,
    },

    /// An occurrence count would have gone below zero.
    #[error("Occurrence count underflow for {key} in group '{group}'")]
    CountUnderflow { group: String, key: EntryKey },
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_key_and_group() {
        let err = RegistryError::UnknownEntry {
            group: "notes".to_string(),
            key: EntryKey::Named("smith".to_string()),
        };
        let display = err.to_string();
        assert!(display.contains("'smith'"), "Got: {}", display);
        assert!(display.contains("'notes'"), "Got: {}", display);
    }

    #[test]
    fn test_sequence_mismatch_display() {
        let err = RegistryError::SequenceMismatch {
            group: String::new(),
            key: EntryKey::Anonymous(4),
            expected: 4,
            found: 7,
        };
        let display = err.to_string();
        assert!(display.contains("expected sequence key 4"), "Got: {}", display);
        assert!(display.contains("found 7"), "Got: {}", display);
    }
}
