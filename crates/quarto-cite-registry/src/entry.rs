/*
 * entry.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Registry entries: one citation's accumulated state.

use serde::Serialize;
use std::fmt;

use crate::warning::Warning;

/// Where a citation tag was found.
///
/// The same tag means different things in the two places: in running text it
/// is an *occurrence* that counts toward the citation's uses, inside a
/// citation list it is a *definition* that only supplies content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationContext {
    Standalone,
    InList,
}

impl RegistrationContext {
    pub fn is_definition(self) -> bool {
        self == RegistrationContext::InList
    }
}

/// The key an entry is stored under inside its group.
///
/// Anonymous citations can't be looked up by name; they are keyed by their
/// sequence key and keep their position through the group's insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum EntryKey {
    Named(String),
    Anonymous(u64),
}

impl EntryKey {
    pub fn name(&self) -> Option<&str> {
        match self {
            EntryKey::Named(name) => Some(name),
            EntryKey::Anonymous(_) => None,
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKey::Named(name) => write!(f, "citation '{}'", name),
            EntryKey::Anonymous(seq) => write!(f, "anonymous citation #{}", seq),
        }
    }
}

/// The raw tag call that produced a registration.
///
/// Kept unexpanded in the rollback log so the orchestrator can replay the
/// call under a corrected context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawInvocation {
    /// Unexpanded tag body (`None` for self-closing tags).
    pub content: Option<String>,

    /// Tag attributes in source order.
    pub args: Vec<(String, String)>,
}

impl RawInvocation {
    pub fn new(content: Option<&str>, args: &[(String, String)]) -> Self {
        Self {
            content: content.map(str::to_string),
            args: args.to_vec(),
        }
    }
}

/// One citation's accumulated state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Owning group (empty string for the default group).
    pub group: String,

    /// Stable name; `None` for anonymous citations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Registry-wide unique key, strictly increasing with each new registration.
    pub sequence_key: u64,

    /// 1-based display number within the group.
    pub number: u32,

    /// Number of times the citation occurred in running text.
    pub occurrence_count: u32,

    /// Expanded citation body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Text direction hint (`ltr` or `rtl`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,

    /// Name of the citation this one continues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,

    /// 1-based position among the parent's continuations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_index: Option<u32>,

    /// Name of a `follow` target that did not exist when this citation was seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follows: Option<String>,

    /// True while the entry only reserves a number for a parent not yet seen.
    pub is_placeholder: bool,

    /// Problems found by the validator, in the order they were found.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl Entry {
    pub(crate) fn new(
        group: &str,
        name: Option<&str>,
        sequence_key: u64,
        number: u32,
        context: RegistrationContext,
    ) -> Self {
        Self {
            group: group.to_string(),
            name: name.map(str::to_string),
            sequence_key,
            number,
            occurrence_count: if context.is_definition() { 0 } else { 1 },
            content: None,
            direction: None,
            parent_name: None,
            parent_index: None,
            follows: None,
            is_placeholder: false,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn placeholder(group: &str, name: &str, sequence_key: u64, number: u32) -> Self {
        Self {
            occurrence_count: 0,
            is_placeholder: true,
            ..Self::new(group, Some(name), sequence_key, number, RegistrationContext::InList)
        }
    }

    /// The key this entry is stored under.
    pub fn key(&self) -> EntryKey {
        match &self.name {
            Some(name) => EntryKey::Named(name.clone()),
            None => EntryKey::Anonymous(self.sequence_key),
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.parent_name.is_some()
    }

    /// Display label: the number, suffixed with the continuation index.
    pub fn label(&self) -> String {
        match self.parent_index {
            Some(index) if self.parent_name.is_some() => format!("{}.{}", self.number, index),
            _ => self.number.to_string(),
        }
    }
}
