/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering collaborator interface.
//!
//! Turning entries into display markup belongs to the host. The processor
//! only asks a [`CiteRenderer`] for three things: a footnote mark, a citation
//! list, and an inline warning. [`PlainTextRenderer`] is a minimal renderer
//! used by the command line tool and in tests.

use quarto_cite_registry::{Entry, Warning};

use crate::options::CiteOptions;

/// Everything needed to render one footnote mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteMark {
    pub group: String,
    pub name: Option<String>,
    pub sequence_key: u64,
    pub number: u32,
    /// Number plus continuation index (`"3"`, `"3.1"`).
    pub label: String,
    /// 1-based occurrence of this citation in running text.
    pub occurrence: u32,
}

impl FootnoteMark {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            group: entry.group.clone(),
            name: entry.name.clone(),
            sequence_key: entry.sequence_key,
            number: entry.number,
            label: entry.label(),
            occurrence: entry.occurrence_count,
        }
    }
}

pub trait CiteRenderer {
    fn footnote_mark(&self, mark: &FootnoteMark) -> String;

    /// Render a closed citation list. `errors` are problems raised inside the
    /// list that could not be attached to an entry.
    fn reference_list(&self, group: &str, entries: &[&Entry], errors: &[Warning]) -> String;

    fn inline_warning(&self, warning: &Warning) -> String;
}

/// Bracketed marks and one line per list entry.
///
/// ```text
/// Text[1] more text[notes 1].
///
/// 1. Smith, 2020. ^ a b
///   1.1. Page 4.
/// 2. Jones, 2021. [Q-11-6] Citation name 'jones' is defined more than once ...
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlainTextRenderer {
    options: CiteOptions,
}

impl PlainTextRenderer {
    pub fn new(options: &CiteOptions) -> Self {
        Self {
            options: options.clone(),
        }
    }

    fn entry_line(&self, entry: &Entry) -> String {
        let indent = if entry.is_continuation() { "  " } else { "" };
        let mut line = format!(
            "{}{}. {}",
            indent,
            entry.label(),
            entry.content.as_deref().unwrap_or("").trim()
        );
        if entry.occurrence_count > 1 {
            let labels: Vec<String> = (0..entry.occurrence_count as usize)
                .map(|index| self.options.backlink_label(index))
                .collect();
            line.push_str(" ^ ");
            line.push_str(&labels.join(" "));
        }
        for warning in &entry.warnings {
            line.push(' ');
            line.push_str(&self.inline_warning(warning));
        }
        line
    }
}

impl CiteRenderer for PlainTextRenderer {
    fn footnote_mark(&self, mark: &FootnoteMark) -> String {
        if mark.group.is_empty() || !self.options.group_prefix {
            format!("[{}]", mark.label)
        } else {
            format!("[{} {}]", mark.group, mark.label)
        }
    }

    fn reference_list(&self, _group: &str, entries: &[&Entry], errors: &[Warning]) -> String {
        let mut ordered: Vec<&Entry> = entries.to_vec();
        ordered.sort_by_key(|entry| {
            (
                entry.number,
                entry.parent_index.filter(|_| entry.is_continuation()),
                entry.sequence_key,
            )
        });

        let mut lines: Vec<String> = ordered
            .into_iter()
            .map(|entry| self.entry_line(entry))
            .collect();
        lines.extend(errors.iter().map(|warning| self.inline_warning(warning)));
        lines.join("\n")
    }

    fn inline_warning(&self, warning: &Warning) -> String {
        format!("[{}] {}", warning.code(), warning.message())
    }
}
