//! Error types for citation tag processing.

use quarto_cite_registry::RegistryError;
use thiserror::Error;

/// Failures that abort rendering of the current document.
///
/// Malformed citations are not errors; they become warnings rendered into
/// the output.
#[derive(Error, Debug)]
pub enum CiteError {
    /// The registry detected broken bookkeeping.
    #[error("Citation registry inconsistency: {0}")]
    Registry(#[from] RegistryError),

    /// The markup expansion collaborator failed.
    #[error("Markup expansion failed: {0}")]
    Expansion(String),
}

impl CiteError {
    /// Create an expansion error from any message.
    pub fn expansion(msg: impl Into<String>) -> Self {
        Self::Expansion(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CiteError>;
