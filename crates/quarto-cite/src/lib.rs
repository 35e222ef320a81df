/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Footnote citation tags for Quarto documents.
//!
//! This crate connects the `<ref>` and `<references>` tags to the
//! [`quarto_cite_registry`] state machine:
//!
//! - [`CiteProcessor`] is the per-document orchestrator. It validates tags,
//!   registers citations, opens and closes citation lists and corrects
//!   citations that a templating layer expanded before their list existed.
//! - [`MarkupExpander`] is the collaborator that expands citation bodies;
//!   [`TagExpander`] is a small implementation that understands the tags
//!   themselves and `{{#tag:references|...}}`.
//! - [`CiteRenderer`] turns entries into marks and lists;
//!   [`PlainTextRenderer`] renders plain text.
//!
//! # Example
//!
//! ```rust
//! use quarto_cite::{CiteOptions, CiteProcessor, TagExpander};
//!
//! let processor = CiteProcessor::plain(CiteOptions::default());
//! let document = processor
//!     .render_document(
//!         &mut TagExpander,
//!         r#"Text<ref name="a">Smith, 2020.</ref>.<references/>"#,
//!     )
//!     .unwrap();
//! assert_eq!(document.text, "Text[1].1. Smith, 2020.");
//! assert!(!document.report.has_warnings());
//! ```

pub mod args;
pub mod error;
pub mod expander;
pub mod markers;
pub mod options;
pub mod processor;
pub mod render;

pub use error::{CiteError, Result};
pub use expander::{CiteHandler, IdentityExpander, MarkupExpander, TagExpander};
pub use options::{CiteOptions, OrphanPolicy};
pub use processor::{CiteProcessor, CiteReport, RenderedDocument};
pub use render::{CiteRenderer, FootnoteMark, PlainTextRenderer};
