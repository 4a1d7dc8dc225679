//! # Manifest Rendering Module
//!
//! Turns an ordered list of template ids and one [`TokenTable`] into a
//! multi-document YAML stream:
//!
//! ```text
//! <rendered deployment/pv-kind.yaml>
//! ---
//! <rendered deployment/common.yaml>
//! ---
//! ...
//! ```
//!
//! Templates use `{name}` placeholders. Every placeholder must have a table
//! entry; a missing one fails the render instead of leaving a blank. The
//! stream is handed to an [`OutputSink`], which never leaves a truncated
//! manifest on disk.

pub mod render;
pub mod sink;
pub mod tokens;

pub use render::{substitute, DirTemplates, ManifestRenderer, MapTemplates, TemplateSource, DOCUMENT_SEPARATOR};
pub use sink::OutputSink;
pub use tokens::TokenTable;

use std::path::PathBuf;

/// Errors raised while rendering or writing a manifest
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template '{id}' not found at {path:?}")]
    TemplateNotFound { id: String, path: PathBuf },

    #[error("Template '{template}' uses {{{token}}} but no such token was provided")]
    MissingToken { template: String, token: String },

    #[error("Failed to write manifest: {0}")]
    Io(#[from] std::io::Error),
}
