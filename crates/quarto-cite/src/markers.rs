/*
 * markers.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Strip markers standing in for footnote marks.
//!
//! While the document is still being expanded a `<ref>` tag returns an opaque
//! marker instead of its rendered mark. Markers serve two purposes:
//!
//! 1. A `<references>` body that already contains markers tells us how many
//!    citations a templating layer expanded speculatively, and therefore how
//!    many registrations to roll back.
//! 2. At the end of the document every marker is swapped for its rendered
//!    footnote mark.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const MARKER_PREFIX: &str = "\u{7f}'\"`UNIQ--cite-ref-";
const MARKER_SUFFIX: &str = "-QINU`\"'\u{7f}";

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "{}([0-9A-F]{{8}}){}",
        regex::escape(MARKER_PREFIX),
        regex::escape(MARKER_SUFFIX)
    ))
    .expect("valid strip marker pattern")
});

/// Number of citation markers in a piece of text.
pub fn count_ref_markers(text: &str) -> usize {
    text.matches(MARKER_PREFIX).count()
}

/// Rendered footnote marks, addressed by the markers handed out for them.
#[derive(Debug, Default)]
pub struct StripMarkers {
    rendered: Vec<String>,
}

impl StripMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rendered output and return the marker that stands for it.
    pub fn insert(&mut self, rendered: String) -> String {
        let id = self.rendered.len();
        self.rendered.push(rendered);
        format!("{}{:08X}{}", MARKER_PREFIX, id, MARKER_SUFFIX)
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    /// Replace every marker in `text` with its rendered output.
    ///
    /// Unknown markers (from another processor) are left alone.
    pub fn resolve(&self, text: &str) -> String {
        MARKER
            .replace_all(text, |caps: &Captures<'_>| {
                usize::from_str_radix(&caps[1], 16)
                    .ok()
                    .and_then(|id| self.rendered.get(id))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}
