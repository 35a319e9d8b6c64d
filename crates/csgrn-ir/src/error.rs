//! Errors found while checking a flattened program.

use thiserror::Error;

/// A defect in a [`FlatScene`](crate::FlatScene)'s instruction program.
///
/// `at` is the index of the offending instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// The program has no instructions.
    #[error("instruction program is empty")]
    Empty,

    /// An operation found fewer than two values on the stack.
    #[error("stack underflow at instruction {at}")]
    StackUnderflow {
        /// Instruction index.
        at: usize,
    },

    /// An instruction references an entry past the end of its list.
    #[error("instruction {at} references missing entry {index}")]
    DanglingIndex {
        /// Instruction index.
        at: usize,
        /// Referenced index.
        index: u32,
    },

    /// An operation's recorded operands disagree with the stack order.
    #[error("operation at instruction {at} does not reference the values on the stack")]
    OperandMismatch {
        /// Instruction index.
        at: usize,
    },

    /// The program finished with a stack depth other than one.
    #[error("program leaves {remaining} values on the stack, expected 1")]
    Unbalanced {
        /// Values left on the stack.
        remaining: usize,
    },
}
