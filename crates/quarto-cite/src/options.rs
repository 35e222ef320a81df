/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Document-level options for citation processing.
//!
//! Options are read from document metadata (`cite:` key) or built in code.
//! Every field has a default, so an empty map is a valid configuration:
//!
//! ```yaml
//! cite:
//!   orphans: auto-list
//!   backlink-labels: [a, b, c]
//!   group-prefix: false
//! ```

use serde::{Deserialize, Serialize};

/// What to do with citations whose group never gets a citation list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrphanPolicy {
    /// Report every leftover citation.
    #[default]
    Warn,
    /// Append a list for the default group at the end of the document;
    /// named groups are still reported.
    AutoList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CiteOptions {
    pub orphans: OrphanPolicy,

    /// Labels for back-links of citations used more than once. Numeric labels
    /// are used once these run out.
    pub backlink_labels: Vec<String>,

    /// Show the group name in footnote marks of non-default groups.
    pub group_prefix: bool,
}

impl Default for CiteOptions {
    fn default() -> Self {
        Self {
            orphans: OrphanPolicy::default(),
            backlink_labels: ('a'..='z').map(String::from).collect(),
            group_prefix: true,
        }
    }
}

impl CiteOptions {
    /// Back-link label for the 0-based occurrence `index`.
    pub fn backlink_label(&self, index: usize) -> String {
        self.backlink_labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| (index + 1).to_string())
    }
}
