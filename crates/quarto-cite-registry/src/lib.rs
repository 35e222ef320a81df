//! Footnote citation registry with exact rollback.
//!
//! This crate is the state machine behind footnote-style citations: it records
//! every citation occurrence keyed by (group, name), hands out display numbers,
//! links continuations to their parents and detects structural problems.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 orchestrator (quarto-cite)                   │
//! │     <ref> / <references> handlers, markup expansion          │
//! └───────────────┬─────────────────────────────┬────────────────┘
//!                 │ register / set_*            │ rollback(n)
//!                 ▼                             ▼
//! ┌──────────────────────────────┐   ┌──────────────────────────┐
//! │      ReferenceRegistry       │◀──│       RollbackLog        │
//! │  groups → ordered entries    │   │  one Action per call     │
//! └───────────────┬──────────────┘   └──────────────────────────┘
//!                 │ read + set_warnings
//!                 ▼
//! ┌──────────────────────────────┐
//! │          validator           │
//! └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use quarto_cite_registry::{RawInvocation, ReferenceRegistry, RegistrationContext};
//!
//! let mut registry = ReferenceRegistry::new();
//! let key = registry.register(
//!     "",
//!     Some("smith"),
//!     RegistrationContext::Standalone,
//!     RawInvocation::default(),
//! );
//! registry.set_content("", &key, "Smith, 2020.").unwrap();
//! assert_eq!(registry.entry("", &key).unwrap().number, 1);
//!
//! // The tag turned out to be inside a citation list: undo it.
//! let replay = registry.rollback(1).unwrap();
//! assert_eq!(replay.len(), 1);
//! assert!(registry.is_empty());
//! ```

pub mod entry;
pub mod error;
pub mod registry;
pub mod rollback;
pub mod validator;
pub mod warning;

pub use entry::{Entry, EntryKey, RawInvocation, RegistrationContext};
pub use error::{RegistryError, Result};
pub use registry::{GroupEntries, ReferenceRegistry};
pub use rollback::{Action, ActionKind, RollbackLog};
pub use warning::{WARNING_CATALOG, Warning, WarningCodeInfo, get_warning_info};
