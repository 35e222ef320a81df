/*
 * rollback.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compact action log used to undo the most recent registrations.
//!
//! A templating layer may expand citation tags before it learns that they sit
//! inside a citation list. When that happens the orchestrator asks the
//! registry to undo the last N registrations and replays them as list
//! definitions. Instead of snapshotting the registry, every registration
//! appends one [`Action`] describing exactly what it changed; undoing walks
//! the log backwards.
//!
//! ```text
//!  register ──▶ Action { New }          set_direction ──▶ same Action, direction_assigned
//!  register ──▶ Action { Increment }    set_content ──▶ same Action, kind = Assign
//!  set_extends ──▶ same Action, extends = Some(ExtendsUndo { .. })
//! ```
//!
//! The log only ever supports undoing a suffix up to "now". A rollback
//! discards whatever it did not undo, and popping a group clears it.

use serde::Serialize;

use crate::entry::{EntryKey, RawInvocation, RegistrationContext};

/// What a registration did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// A new entry was created.
    New,
    /// A placeholder reserved by a continuation was populated.
    NewFromPlaceholder,
    /// Content was attached to an existing entry that had none.
    Assign,
    /// An existing entry was registered again.
    Increment,
    /// A `follow` citation appended text to an existing entry.
    Append {
        /// Content length before the append; `None` if there was no content.
        previous_len: Option<usize>,
    },
}

/// What `set_extends` changed, so it can be reversed first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExtendsUndo {
    pub parent: String,
    pub previous_number: u32,
    pub placeholder_created: bool,
    pub released_number: bool,
}

/// One registration record.
#[derive(Debug, Clone)]
pub struct Action {
    pub kind: ActionKind,
    pub sequence_key: u64,
    pub group: String,
    pub key: EntryKey,
    pub context: RegistrationContext,
    pub invocation: RawInvocation,
    pub(crate) direction_assigned: bool,
    pub(crate) extends: Option<ExtendsUndo>,
}

impl Action {
    pub(crate) fn new(
        kind: ActionKind,
        sequence_key: u64,
        group: &str,
        key: EntryKey,
        context: RegistrationContext,
        invocation: RawInvocation,
    ) -> Self {
        Self {
            kind,
            sequence_key,
            group: group.to_string(),
            key,
            context,
            invocation,
            direction_assigned: false,
            extends: None,
        }
    }

    /// Name of the continuation parent this registration linked to, if any.
    pub fn parent_name(&self) -> Option<&str> {
        self.extends.as_ref().map(|undo| undo.parent.as_str())
    }
}

/// Ordered registration records, oldest first.
#[derive(Debug, Default)]
pub struct RollbackLog {
    actions: Vec<Action>,
}

impl RollbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub(crate) fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub(crate) fn clear(&mut self) {
        self.actions.clear();
    }

    /// Most recent record for a key.
    ///
    /// Nested registrations can land in the log between a registration and
    /// its follow-up `set_*` calls, so records are found by key.
    pub(crate) fn last_for_mut(&mut self, group: &str, key: &EntryKey) -> Option<&mut Action> {
        self.actions
            .iter_mut()
            .rev()
            .find(|action| action.group == group && &action.key == key)
    }

    /// Remove the last `count` records and drop everything older.
    ///
    /// Returned records are newest first, the order they must be undone in.
    pub(crate) fn take_suffix(&mut self, count: usize) -> Vec<Action> {
        let split = self.actions.len().saturating_sub(count);
        let mut suffix = self.actions.split_off(split);
        self.actions.clear();
        suffix.reverse();
        suffix
    }
}
