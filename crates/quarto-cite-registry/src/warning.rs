/*
 * warning.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Document-level citation problems and their code catalog.
//!
//! Citation warnings use Q-11-* codes (subsystem 11). A warning never stops
//! processing; the renderer shows it inline next to the offending citation or
//! below the citation list that contains it.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Metadata for a citation warning code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarningCodeInfo {
    /// Short title for the warning
    pub title: &'static str,

    /// Whether the citation is dropped instead of being registered
    pub blocking: bool,
}

/// Catalog of every Q-11 code, keyed by code.
pub static WARNING_CATALOG: Lazy<HashMap<&'static str, WarningCodeInfo>> = Lazy::new(|| {
    [
        ("Q-11-1", "Numeric Citation Name", true),
        ("Q-11-2", "Unclosed Citation Tag", false),
        ("Q-11-3", "Unnamed List Definition", true),
        ("Q-11-4", "Citation Group Mismatch", true),
        ("Q-11-5", "Citation Without Content", false),
        ("Q-11-6", "Duplicate Citation Name", false),
        ("Q-11-7", "Nested Continuation", false),
        ("Q-11-8", "Citation Group Without List", false),
        ("Q-11-9", "Empty Citation", true),
        ("Q-11-10", "Unused List Definition", false),
        ("Q-11-11", "Invalid Text Direction", false),
        ("Q-11-12", "Unknown Citation Attribute", true),
        ("Q-11-13", "Conflicting Follow Attribute", true),
        ("Q-11-14", "Nested Citation List", true),
        ("Q-11-15", "Continuation Without Content", true),
    ]
    .into_iter()
    .map(|(code, title, blocking)| (code, WarningCodeInfo { title, blocking }))
    .collect()
});

/// Look up catalog information for a warning code.
pub fn get_warning_info(code: &str) -> Option<&'static WarningCodeInfo> {
    WARNING_CATALOG.get(code)
}

/// A structural problem found in a document's citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    /// Names made only of digits would collide with generated identifiers.
    NumericName { name: String },

    /// The citation body opens another citation that is never closed.
    UnclosedRefTag,

    /// A citation defined inside a list has no name, so nothing can cite it.
    ListDefinitionWithoutName,

    /// A citation inside a list names a different group than the list.
    ListGroupMismatch { list_group: String, ref_group: String },

    /// A citation never received a body.
    MissingContent { name: Option<String> },

    /// Two citations with the same name carry different bodies.
    DuplicateKey { name: String },

    /// The parent of a continuation is itself a continuation.
    NestedContinuation { parent: String },

    /// The citation's group never got a list before the document ended.
    GroupWithoutList { group: String },

    /// A citation with neither a name nor a body.
    EmptyRef,

    /// A citation defined in a list is never cited in the text.
    UnusedListDefinition { name: String },

    /// The direction attribute is not `ltr` or `rtl`.
    InvalidDirection { value: String },

    /// An attribute the citation tags do not understand.
    UnknownAttribute { attribute: String },

    /// `follow` cannot be combined with `name`.
    FollowConflict { follow: String },

    /// A citation list was opened inside another citation list.
    NestedList,

    /// A continuation must carry its own body.
    ExtendsWithoutContent { parent: String },
}

impl Warning {
    /// The stable Q-11-* code for this warning.
    pub fn code(&self) -> &'static str {
        match self {
            Warning::NumericName { .. } => "Q-11-1",
            Warning::UnclosedRefTag => "Q-11-2",
            Warning::ListDefinitionWithoutName => "Q-11-3",
            Warning::ListGroupMismatch { .. } => "Q-11-4",
            Warning::MissingContent { .. } => "Q-11-5",
            Warning::DuplicateKey { .. } => "Q-11-6",
            Warning::NestedContinuation { .. } => "Q-11-7",
            Warning::GroupWithoutList { .. } => "Q-11-8",
            Warning::EmptyRef => "Q-11-9",
            Warning::UnusedListDefinition { .. } => "Q-11-10",
            Warning::InvalidDirection { .. } => "Q-11-11",
            Warning::UnknownAttribute { .. } => "Q-11-12",
            Warning::FollowConflict { .. } => "Q-11-13",
            Warning::NestedList => "Q-11-14",
            Warning::ExtendsWithoutContent { .. } => "Q-11-15",
        }
    }

    /// Short title from the catalog.
    pub fn title(&self) -> &'static str {
        get_warning_info(self.code()).map_or("Citation Warning", |info| info.title)
    }

    /// Blocking warnings keep the citation out of the registry.
    pub fn is_blocking(&self) -> bool {
        get_warning_info(self.code()).is_some_and(|info| info.blocking)
    }

    /// Human readable description of the problem.
    pub fn message(&self) -> String {
        match self {
            Warning::NumericName { name } => {
                format!("Citation name '{}' is a plain number; use a descriptive name", name)
            }
            Warning::UnclosedRefTag => {
                "Citation content contains an opening citation tag that is never closed".to_string()
            }
            Warning::ListDefinitionWithoutName => {
                "Citations defined inside a citation list must have a name".to_string()
            }
            Warning::ListGroupMismatch {
                list_group,
                ref_group,
            } => format!(
                "Citation in group '{}' is defined inside the list for group '{}'",
                ref_group, list_group
            ),
            Warning::MissingContent { name: Some(name) } => {
                format!("Citation '{}' has no content", name)
            }
            Warning::MissingContent { name: None } => "Citation has no content".to_string(),
            Warning::DuplicateKey { name } => format!(
                "Citation name '{}' is defined more than once with different content",
                name
            ),
            Warning::NestedContinuation { parent } => format!(
                "Citation '{}' is itself a continuation; continuations are one level deep",
                parent
            ),
            Warning::GroupWithoutList { group } if group.is_empty() => {
                "Citations exist but no citation list was found".to_string()
            }
            Warning::GroupWithoutList { group } => format!(
                "Citations exist for group '{}' but no matching citation list was found",
                group
            ),
            Warning::EmptyRef => "Citation has neither a name nor content".to_string(),
            Warning::UnusedListDefinition { name } => format!(
                "Citation '{}' is defined in the citation list but never cited",
                name
            ),
            Warning::InvalidDirection { value } => {
                format!("Invalid direction '{}'; expected 'ltr' or 'rtl'", value)
            }
            Warning::UnknownAttribute { attribute } => {
                format!("Unknown citation attribute '{}'", attribute)
            }
            Warning::FollowConflict { follow } => format!(
                "Citation following '{}' cannot also have a name",
                follow
            ),
            Warning::NestedList => "Citation lists cannot be nested".to_string(),
            Warning::ExtendsWithoutContent { parent } => {
                format!("Continuation of '{}' has no content", parent)
            }
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}
