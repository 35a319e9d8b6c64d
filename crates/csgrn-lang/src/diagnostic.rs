//! Problems reported while parsing.
//!
//! The parser never stops at the first problem. Each one becomes a
//! [`Diagnostic`] and parsing carries on from a nearby token; only a missing
//! child expression aborts the enclosing node.

use std::fmt;

use crate::lexer::Position;

/// Which side of an operator lost its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSide {
    /// First child of an operator.
    Left,
    /// Second child of an operator.
    Right,
    /// Sole child of a `multmatrix` or `color` block.
    Only,
}

/// Broad class of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Unexpected or missing punctuation, unknown keywords.
    Syntactic,
    /// A value that does not parse as a number, boolean or vector.
    Numeric,
    /// A required child expression is absent. Aborts the enclosing node.
    Structural,
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A specific token was required but another was found.
    UnexpectedToken {
        /// Token text that was required.
        expected: String,
        /// Token text found instead, empty at end of input.
        found: String,
    },
    /// Input ended while a token was required.
    UnexpectedEof,
    /// A token that cannot start an expression. It was skipped.
    UnknownToken(String),
    /// Text that should have been a finite number.
    InvalidNumber(String),
    /// Text that should have been `true` or `false`.
    InvalidBoolean(String),
    /// A vector with the wrong number of components.
    InvalidVector {
        /// Components required.
        expected: usize,
        /// Components found.
        found: usize,
    },
    /// A required child expression was not produced.
    MissingChild {
        /// Keyword of the node that needed the child.
        parent: String,
        /// Which child.
        side: ChildSide,
    },
    /// The source contains no tokens.
    EmptyInput,
    /// Tokens remain after the root expression.
    TrailingInput(String),
}

impl DiagnosticKind {
    /// Broad class of this problem.
    pub fn category(&self) -> Category {
        match self {
            Self::InvalidNumber(_) | Self::InvalidBoolean(_) | Self::InvalidVector { .. } => {
                Category::Numeric
            }
            Self::MissingChild { .. } | Self::EmptyInput => Category::Structural,
            Self::UnexpectedToken { .. }
            | Self::UnexpectedEof
            | Self::UnknownToken(_)
            | Self::TrailingInput(_) => Category::Syntactic,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected '{expected}' but got '{found}'")
            }
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::UnknownToken(t) => write!(f, "unknown token '{t}'"),
            Self::InvalidNumber(t) => write!(f, "could not parse '{t}' as a number"),
            Self::InvalidBoolean(t) => write!(f, "could not parse '{t}' as a boolean"),
            Self::InvalidVector { expected, found } => {
                write!(f, "expected a vector of {expected} values, got {found}")
            }
            Self::MissingChild { parent, side } => {
                let side = match side {
                    ChildSide::Left => "left child",
                    ChildSide::Right => "right child",
                    ChildSide::Only => "child",
                };
                write!(f, "{side} of {parent} is missing")
            }
            Self::EmptyInput => write!(f, "no tokens to parse"),
            Self::TrailingInput(t) => write!(f, "ignoring input after root expression, starting at '{t}'"),
        }
    }
}

/// A problem found while parsing, located in the token stream and source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// Token cursor when the problem was found.
    pub position: usize,
    /// Source location of the token at the cursor (end of input if none).
    pub location: Position,
}

impl Diagnostic {
    /// Shorthand for `self.kind.category()`.
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// True when this problem aborted construction of a node.
    pub fn is_structural(&self) -> bool {
        self.category() == Category::Structural
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} (token {}): {}",
            self.location.line, self.location.col, self.position, self.kind
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(
            DiagnosticKind::InvalidNumber("x".into()).category(),
            Category::Numeric
        );
        assert_eq!(DiagnosticKind::UnexpectedEof.category(), Category::Syntactic);
        assert_eq!(
            DiagnosticKind::MissingChild {
                parent: "union".into(),
                side: ChildSide::Right
            }
            .category(),
            Category::Structural
        );
    }

    #[test]
    fn display_includes_location() {
        let d = Diagnostic {
            kind: DiagnosticKind::UnexpectedToken {
                expected: ")".into(),
                found: "{".into(),
            },
            position: 4,
            location: Position { line: 2, col: 7 },
        };
        assert_eq!(d.to_string(), "2:7 (token 4): expected ')' but got '{'");
    }
}
