#![warn(missing_docs)]

//! Scene language front end for csgrn.
//!
//! Reads the OpenSCAD-style CSG subset (`union`, `difference`,
//! `intersection`, `multmatrix`, `color`, `sphere`, `cube`, `cylinder`) into
//! a [`CsgTree`](csgrn_ir::CsgTree). Problems are collected as
//! [`Diagnostic`]s; a scene is only rejected when its root node could not be
//! built.
//!
//! # Example
//!
//! ```
//! use csgrn_lang::parse_scene;
//!
//! let outcome = parse_scene("union() { sphere(r=1); cube(size=2); }");
//! let (tree, diagnostics) = outcome.into_result().unwrap();
//! assert!(diagnostics.is_empty());
//! assert_eq!(tree.leaf_count(), 2);
//! ```

mod diagnostic;
mod error;
mod lexer;
mod parser;

use std::path::Path;

pub use diagnostic::{Category, ChildSide, Diagnostic, DiagnosticKind};
pub use error::{Result, SceneError};
pub use lexer::{tokenize, Lexer, Position, SpannedToken, Token};
pub use parser::{parse_scene, ParseOutcome, Parser, Production, Structural};

/// Read and parse a scene file.
///
/// Only I/O failures are errors here; use [`ParseOutcome::into_result`] to
/// reject a scene without a root.
pub fn read_scene(path: impl AsRef<Path>) -> Result<ParseOutcome> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    tracing::info!(path = %path.display(), bytes = source.len(), "parsing scene");
    Ok(parse_scene(&source))
}

/// Read a scene file and require a root node.
pub fn load_scene(path: impl AsRef<Path>) -> Result<(csgrn_ir::CsgTree, Vec<Diagnostic>)> {
    read_scene(path)?.into_result()
}
