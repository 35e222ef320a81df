/*
 * validator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Structural checks over citations.
//!
//! The validator never touches numbering, content or the rollback log. It
//! either returns warnings for a citation that is about to be registered, or
//! attaches warnings to entries already in the registry. Attaching is
//! idempotent: running a check twice over unchanged state does not duplicate
//! anything.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entry::{EntryKey, RegistrationContext};
use crate::error::Result;
use crate::registry::ReferenceRegistry;
use crate::warning::Warning;

/// An opening citation tag left in expanded content. Well-formed citations
/// have already been replaced by the expander, so any survivor is unclosed.
static OPENING_REF_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<ref\b[^<]*?>").expect("valid opening tag pattern"));

/// A citation tag about to be registered.
#[derive(Debug, Clone, Copy)]
pub struct RefCheck<'a> {
    pub group: &'a str,
    pub name: Option<&'a str>,
    /// Expanded content.
    pub content: Option<&'a str>,
    pub extends: Option<&'a str>,
    pub follow: Option<&'a str>,
    pub direction: Option<&'a str>,
    pub context: RegistrationContext,
    /// Group of the enclosing citation list, when inside one.
    pub list_group: Option<&'a str>,
}

pub fn is_numeric_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_direction(direction: &str) -> bool {
    direction.eq_ignore_ascii_case("ltr") || direction.eq_ignore_ascii_case("rtl")
}

/// Whitespace-insensitive comparison used for duplicate detection.
pub fn contents_equivalent(a: &str, b: &str) -> bool {
    a.split_whitespace().eq(b.split_whitespace())
}

fn is_blank(content: Option<&str>) -> bool {
    content.is_none_or(|text| text.trim().is_empty())
}

/// Checks that need nothing but the tag itself.
///
/// Blocking warnings (see [`Warning::is_blocking`]) mean the tag must not be
/// registered; the rest are attached to the entry afterwards.
pub fn check_ref(check: &RefCheck<'_>) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if let (Some(follow), Some(_)) = (check.follow, check.name) {
        warnings.push(Warning::FollowConflict {
            follow: follow.to_string(),
        });
    }
    if let Some(name) = check.name.filter(|name| is_numeric_name(name)) {
        warnings.push(Warning::NumericName {
            name: name.to_string(),
        });
    }

    if check.context.is_definition() {
        if check.name.is_none() {
            warnings.push(Warning::ListDefinitionWithoutName);
        }
        if let Some(list_group) = check.list_group.filter(|list| *list != check.group) {
            warnings.push(Warning::ListGroupMismatch {
                list_group: list_group.to_string(),
                ref_group: check.group.to_string(),
            });
        }
    } else if check.name.is_none() && check.follow.is_none() && is_blank(check.content) {
        warnings.push(Warning::EmptyRef);
    }

    if let Some(parent) = check.extends.filter(|_| is_blank(check.content)) {
        warnings.push(Warning::ExtendsWithoutContent {
            parent: parent.to_string(),
        });
    }
    if check.content.is_some_and(|text| OPENING_REF_TAG.is_match(text)) {
        warnings.push(Warning::UnclosedRefTag);
    }
    if let Some(direction) = check.direction.filter(|dir| !is_valid_direction(dir)) {
        warnings.push(Warning::InvalidDirection {
            value: direction.to_string(),
        });
    }

    warnings
}

/// A second body for an existing name must match the first.
pub fn check_duplicate(
    registry: &ReferenceRegistry,
    group: &str,
    name: &str,
    content: &str,
) -> Option<Warning> {
    let existing = registry
        .entry(group, &EntryKey::Named(name.to_string()))?
        .content
        .as_deref()?;
    (!contents_equivalent(existing, content)).then(|| Warning::DuplicateKey {
        name: name.to_string(),
    })
}

/// Continuations are exactly one level deep.
pub fn check_nested_continuation(
    registry: &ReferenceRegistry,
    group: &str,
    parent: &str,
) -> Option<Warning> {
    let parent_entry = registry.entry(group, &EntryKey::Named(parent.to_string()))?;
    parent_entry
        .is_continuation()
        .then(|| Warning::NestedContinuation {
            parent: parent.to_string(),
        })
}

/// End-of-list checks for one group, run once every entry is known.
///
/// Attaches missing-content, unused-definition and nested-continuation
/// warnings and returns what it found.
pub fn check_list_closed(
    registry: &mut ReferenceRegistry,
    group: &str,
) -> Result<Vec<(EntryKey, Warning)>> {
    let Some(entries) = registry.group_entries(group) else {
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    for (key, entry) in entries {
        if is_blank(entry.content.as_deref()) {
            found.push((
                key.clone(),
                Warning::MissingContent {
                    name: entry.name.clone(),
                },
            ));
        }
        if let Some(name) = entry.name.as_ref().filter(|_| {
            entry.occurrence_count == 0 && !entry.is_placeholder && entry.follows.is_none()
        }) {
            found.push((
                key.clone(),
                Warning::UnusedListDefinition { name: name.clone() },
            ));
        }
        if let Some(parent) = entry.parent_name.as_deref() {
            let nested = entries
                .get(&EntryKey::Named(parent.to_string()))
                .is_some_and(|parent_entry| parent_entry.is_continuation());
            if nested {
                found.push((
                    key.clone(),
                    Warning::NestedContinuation {
                        parent: parent.to_string(),
                    },
                ));
            }
        }
    }

    for (key, warning) in &found {
        registry.set_warnings(group, key, [warning.clone()])?;
    }
    Ok(found)
}

/// End-of-document check: every citation left over belongs to a group that
/// never got a list.
pub fn check_document_end(
    registry: &mut ReferenceRegistry,
) -> Result<Vec<(String, EntryKey, Warning)>> {
    let mut found = Vec::new();
    for group in registry.groups() {
        if let Some(entries) = registry.group_entries(group) {
            for key in entries.keys() {
                found.push((
                    group.to_string(),
                    key.clone(),
                    Warning::GroupWithoutList {
                        group: group.to_string(),
                    },
                ));
            }
        }
    }

    for (group, key, warning) in &found {
        registry.set_warnings(group, key, [warning.clone()])?;
    }
    Ok(found)
}
