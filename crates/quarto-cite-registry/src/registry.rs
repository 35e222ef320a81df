/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The reference registry: authoritative store of every active citation.
//!
//! Entries live in per-group ordered maps keyed by [`EntryKey`]. Parent and
//! continuation links are plain name lookups inside the group, never shared
//! references, so rollback can delete or reset entries freely.
//!
//! The registry is the only place that allocates display numbers and sequence
//! keys. Both counters are fields of the instance; every document render owns
//! its own registry.

use hashlink::LinkedHashMap;
use hashlink::linked_hash_map;
use std::collections::HashMap;

use crate::entry::{Entry, EntryKey, RawInvocation, RegistrationContext};
use crate::error::{RegistryError, Result};
use crate::rollback::{Action, ActionKind, ExtendsUndo, RollbackLog};
use crate::warning::Warning;

/// Ordered entries of one group.
pub type GroupEntries = LinkedHashMap<EntryKey, Entry>;

#[derive(Debug, Default)]
struct GroupState {
    entries: GroupEntries,
    /// Highest display number handed out in this group.
    numbers_claimed: u32,
    /// Continuations attached so far, per parent name.
    continuation_counts: HashMap<String, u32>,
}

/// Store of citation entries plus the rollback log for recent registrations.
#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    groups: LinkedHashMap<String, GroupState>,
    /// Last sequence key handed out (0 before the first registration).
    sequence: u64,
    log: RollbackLog,
}

fn lookup<'a>(
    groups: &'a LinkedHashMap<String, GroupState>,
    group: &str,
    key: &EntryKey,
) -> Result<&'a Entry> {
    groups
        .get(group)
        .ok_or_else(|| RegistryError::UnknownGroup {
            group: group.to_string(),
        })?
        .entries
        .get(key)
        .ok_or_else(|| RegistryError::UnknownEntry {
            group: group.to_string(),
            key: key.clone(),
        })
}

fn lookup_mut<'a>(
    groups: &'a mut LinkedHashMap<String, GroupState>,
    group: &str,
    key: &EntryKey,
) -> Result<&'a mut Entry> {
    groups
        .get_mut(group)
        .ok_or_else(|| RegistryError::UnknownGroup {
            group: group.to_string(),
        })?
        .entries
        .get_mut(key)
        .ok_or_else(|| RegistryError::UnknownEntry {
            group: group.to_string(),
            key: key.clone(),
        })
}

fn decrement_count(entry: &mut Entry) -> Result<()> {
    entry.occurrence_count =
        entry
            .occurrence_count
            .checked_sub(1)
            .ok_or_else(|| RegistryError::CountUnderflow {
                group: entry.group.clone(),
                key: entry.key(),
            })?;
    Ok(())
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one citation tag.
    ///
    /// A missing name always creates a new anonymous entry. An existing name
    /// is counted again (occurrences only, definitions inside a list don't
    /// count); a placeholder under that name is populated in place and keeps
    /// the number it reserved.
    pub fn register(
        &mut self,
        group: &str,
        name: Option<&str>,
        context: RegistrationContext,
        invocation: RawInvocation,
    ) -> EntryKey {
        // Groups keep their first-use position; `or_insert_with` would move
        // an existing group to the back.
        let state = match self.groups.entry(group.to_string()) {
            linked_hash_map::Entry::Occupied(occupied) => occupied.into_mut(),
            linked_hash_map::Entry::Vacant(vacant) => vacant.insert(GroupState::default()),
        };

        let named = name
            .map(|name| EntryKey::Named(name.to_string()))
            .filter(|key| state.entries.contains_key(key));

        let (kind, key, sequence_key, number) =
            match named.as_ref().and_then(|key| state.entries.get_mut(key)) {
                Some(entry) if entry.is_placeholder => {
                    entry.is_placeholder = false;
                    entry.occurrence_count = if context.is_definition() { 0 } else { 1 };
                    (
                        ActionKind::NewFromPlaceholder,
                        entry.key(),
                        entry.sequence_key,
                        entry.number,
                    )
                }
                Some(entry) => {
                    if !context.is_definition() {
                        entry.occurrence_count += 1;
                    }
                    (
                        ActionKind::Increment,
                        entry.key(),
                        entry.sequence_key,
                        entry.number,
                    )
                }
                None => {
                    self.sequence += 1;
                    state.numbers_claimed += 1;
                    let entry = Entry::new(
                        group,
                        name,
                        self.sequence,
                        state.numbers_claimed,
                        context,
                    );
                    let key = entry.key();
                    state.entries.insert(key.clone(), entry);
                    (ActionKind::New, key, self.sequence, state.numbers_claimed)
                }
            };

        tracing::debug!(
            group,
            key = %key,
            number,
            sequence_key,
            ?kind,
            ?context,
            "Registered citation"
        );

        self.log.push(Action::new(
            kind,
            sequence_key,
            group,
            key.clone(),
            context,
            invocation,
        ));
        key
    }

    /// Attach content to an entry that has none yet.
    ///
    /// Content that is already set is left untouched; deciding whether a
    /// mismatch is a user error is the validator's job.
    pub fn set_content(&mut self, group: &str, key: &EntryKey, content: &str) -> Result<&Entry> {
        let entry = lookup_mut(&mut self.groups, group, key)?;
        if entry.content.is_none() && !entry.is_placeholder {
            entry.content = Some(content.to_string());
            if let Some(action) = self.log.last_for_mut(group, key) {
                if action.kind == ActionKind::Increment {
                    action.kind = ActionKind::Assign;
                }
                tracing::trace!(group, key = %key, kind = ?action.kind, "Amended rollback record with content");
            }
        }
        Ok(entry)
    }

    /// Set the text direction once, and only after content exists.
    pub fn set_direction(
        &mut self,
        group: &str,
        key: &EntryKey,
        direction: &str,
    ) -> Result<&Entry> {
        let entry = lookup_mut(&mut self.groups, group, key)?;
        if entry.direction.is_none() && entry.content.is_some() {
            entry.direction = Some(direction.to_string());
            if let Some(action) = self.log.last_for_mut(group, key) {
                action.direction_assigned = true;
            }
        }
        Ok(entry)
    }

    /// Link an entry to the parent it continues.
    ///
    /// A known parent lends its number to the child and the child's
    /// provisional number goes back to the group counter. An unknown parent
    /// gets a placeholder that reserves the child's number until the parent
    /// itself is registered. Linking an already linked entry does nothing.
    pub fn set_extends(&mut self, group: &str, key: &EntryKey, parent: &str) -> Result<&Entry> {
        let parent_key = EntryKey::Named(parent.to_string());
        let (child_number, already_linked) = {
            let entry = lookup(&self.groups, group, key)?;
            (entry.number, entry.parent_name.is_some())
        };
        if already_linked || &parent_key == key {
            return lookup(&self.groups, group, key);
        }

        let state = self
            .groups
            .get_mut(group)
            .ok_or_else(|| RegistryError::UnknownGroup {
                group: group.to_string(),
            })?;

        let count = state
            .continuation_counts
            .entry(parent.to_string())
            .or_insert(0);
        *count += 1;
        let parent_index = *count;

        let undo = match state.entries.get(&parent_key).map(|p| p.number) {
            Some(parent_number) => {
                let shared = state
                    .entries
                    .values()
                    .filter(|entry| entry.number == child_number)
                    .count()
                    > 1;
                let released = child_number == state.numbers_claimed
                    && parent_number != child_number
                    && !shared;
                if released {
                    state.numbers_claimed -= 1;
                }
                if let Some(entry) = state.entries.get_mut(key) {
                    entry.number = parent_number;
                }
                ExtendsUndo {
                    parent: parent.to_string(),
                    previous_number: child_number,
                    placeholder_created: false,
                    released_number: released,
                }
            }
            None => {
                self.sequence += 1;
                state.entries.insert(
                    parent_key,
                    Entry::placeholder(group, parent, self.sequence, child_number),
                );
                tracing::debug!(
                    group,
                    parent,
                    number = child_number,
                    "Reserved number for continuation parent"
                );
                ExtendsUndo {
                    parent: parent.to_string(),
                    previous_number: child_number,
                    placeholder_created: true,
                    released_number: false,
                }
            }
        };

        let entry = lookup_mut(&mut self.groups, group, key)?;
        entry.parent_name = Some(parent.to_string());
        entry.parent_index = Some(parent_index);
        if let Some(action) = self.log.last_for_mut(group, key) {
            action.extends = Some(undo);
        }
        Ok(entry)
    }

    /// Remember the unresolved `follow` target of a citation.
    ///
    /// Not logged: the entry carrying it is always the product of its own
    /// registration, so undoing that registration drops the field too.
    pub fn set_follows(&mut self, group: &str, key: &EntryKey, target: &str) -> Result<&Entry> {
        let entry = lookup_mut(&mut self.groups, group, key)?;
        if entry.follows.is_none() {
            entry.follows = Some(target.to_string());
        }
        Ok(entry)
    }

    /// Append text to an existing named entry (the `follow` mechanism).
    pub fn append_content(
        &mut self,
        group: &str,
        name: &str,
        text: &str,
        context: RegistrationContext,
        invocation: RawInvocation,
    ) -> Result<&Entry> {
        let key = EntryKey::Named(name.to_string());
        let entry = lookup_mut(&mut self.groups, group, &key)?;
        let previous_len = entry.content.as_ref().map(String::len);
        entry.content = Some(match entry.content.take() {
            Some(existing) => format!("{} {}", existing, text),
            None => text.to_string(),
        });
        self.log.push(Action::new(
            ActionKind::Append { previous_len },
            entry.sequence_key,
            group,
            key,
            context,
            invocation,
        ));
        Ok(entry)
    }

    /// Append warnings to an entry; identical warnings are kept only once.
    pub fn set_warnings(
        &mut self,
        group: &str,
        key: &EntryKey,
        warnings: impl IntoIterator<Item = Warning>,
    ) -> Result<()> {
        let entry = lookup_mut(&mut self.groups, group, key)?;
        for warning in warnings {
            if !entry.warnings.contains(&warning) {
                tracing::warn!(group, key = %key, code = warning.code(), "{}", warning.message());
                entry.warnings.push(warning);
            }
        }
        Ok(())
    }

    /// Remove and return every entry of a group.
    ///
    /// Closing a group also ends the window in which recent registrations can
    /// be rolled back.
    pub fn pop_group(&mut self, group: &str) -> GroupEntries {
        self.log.clear();
        let entries = self
            .groups
            .remove(group)
            .map(|state| state.entries)
            .unwrap_or_default();
        tracing::debug!(group, entries = entries.len(), "Popped citation group");
        entries
    }

    /// Names of groups holding at least one entry, in first-use order.
    pub fn groups(&self) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|(_, state)| !state.entries.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|state| !state.entries.is_empty())
    }

    pub fn group_entries(&self, group: &str) -> Option<&GroupEntries> {
        self.groups.get(group).map(|state| &state.entries)
    }

    pub fn entry(&self, group: &str, key: &EntryKey) -> Option<&Entry> {
        lookup(&self.groups, group, key).ok()
    }

    /// Total number of entries across all groups.
    pub fn len(&self) -> usize {
        self.groups.values().map(|state| state.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn log(&self) -> &RollbackLog {
        &self.log
    }

    /// Highest display number handed out in a group so far.
    pub fn numbers_claimed(&self, group: &str) -> u32 {
        self.groups
            .get(group)
            .map_or(0, |state| state.numbers_claimed)
    }

    /// Continuations attached so far to a parent.
    pub fn continuation_count(&self, group: &str, parent: &str) -> u32 {
        self.groups
            .get(group)
            .and_then(|state| state.continuation_counts.get(parent))
            .copied()
            .unwrap_or(0)
    }

    /// Undo the last `count` registrations.
    ///
    /// Records are reversed newest first. The raw invocations come back in
    /// their original order so the caller can replay them under the corrected
    /// context. Anything older than the undone suffix is discarded from the log.
    pub fn rollback(&mut self, count: usize) -> Result<Vec<RawInvocation>> {
        let actions = self.log.take_suffix(count);
        tracing::debug!(requested = count, undone = actions.len(), "Rolling back citations");

        let mut invocations = Vec::with_capacity(actions.len());
        for action in actions {
            self.undo(&action)?;
            invocations.push(action.invocation);
        }
        invocations.reverse();
        Ok(invocations)
    }

    fn undo(&mut self, action: &Action) -> Result<()> {
        let group = action.group.as_str();
        let key = &action.key;
        let state = self
            .groups
            .get_mut(group)
            .ok_or_else(|| RegistryError::UnknownGroup {
                group: group.to_string(),
            })?;

        let found = state
            .entries
            .get(key)
            .ok_or_else(|| RegistryError::UnknownEntry {
                group: group.to_string(),
                key: key.clone(),
            })?
            .sequence_key;
        if found != action.sequence_key {
            return Err(RegistryError::SequenceMismatch {
                group: group.to_string(),
                key: key.clone(),
                expected: action.sequence_key,
                found,
            });
        }

        if let Some(undo) = &action.extends {
            if let Some(count) = state.continuation_counts.get_mut(&undo.parent) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    state.continuation_counts.remove(&undo.parent);
                }
            }
            if undo.released_number {
                state.numbers_claimed += 1;
            }
            if undo.placeholder_created {
                let parent_key = EntryKey::Named(undo.parent.clone());
                if let Some(placeholder) = state.entries.remove(&parent_key) {
                    if self.sequence == placeholder.sequence_key {
                        self.sequence -= 1;
                    }
                }
            }
            if let Some(entry) = state.entries.get_mut(key) {
                entry.parent_name = None;
                entry.parent_index = None;
                entry.number = undo.previous_number;
            }
        }

        let Some(entry) = state.entries.get_mut(key) else {
            return Err(RegistryError::UnknownEntry {
                group: group.to_string(),
                key: key.clone(),
            });
        };
        if action.direction_assigned {
            entry.direction = None;
        }

        match action.kind {
            ActionKind::New => {
                state.entries.remove(key);
                if self.sequence == action.sequence_key {
                    self.sequence -= 1;
                }
                if state.entries.is_empty() {
                    self.groups.remove(group);
                } else {
                    state.numbers_claimed = state.numbers_claimed.saturating_sub(1);
                }
            }
            ActionKind::NewFromPlaceholder => {
                entry.is_placeholder = true;
                entry.occurrence_count = 0;
                entry.content = None;
            }
            ActionKind::Assign => {
                entry.content = None;
                if !action.context.is_definition() {
                    decrement_count(entry)?;
                }
            }
            ActionKind::Increment => {
                if !action.context.is_definition() {
                    decrement_count(entry)?;
                }
            }
            ActionKind::Append { previous_len } => match previous_len {
                Some(len) => {
                    if let Some(content) = entry.content.as_mut() {
                        content.truncate(len);
                    }
                }
                None => entry.content = None,
            },
        }

        tracing::trace!(group, key = %key, kind = ?action.kind, "Undid citation registration");
        Ok(())
    }
}
