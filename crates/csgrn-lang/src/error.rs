//! Error types for scene loading.

use thiserror::Error;

use crate::diagnostic::Diagnostic;

/// Errors that abort loading a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing produced no root node. The scene must not be rendered.
    #[error("scene has no root node ({} diagnostics){}", diagnostics.len(), first_structural(diagnostics))]
    NoRoot {
        /// Everything reported during the parse.
        diagnostics: Vec<Diagnostic>,
    },
}

fn first_structural(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .find(|d| d.is_structural())
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// Result type for scene loading.
pub type Result<T> = std::result::Result<T, SceneError>;
