#![warn(missing_docs)]

//! GPU-side layout of csgrn scenes.
//!
//! Packs a [`FlatScene`](csgrn_ir::FlatScene) into three arrays of
//! 16-byte aligned `Pod` records that can be uploaded as storage buffers:
//!
//! - [`GpuPrimitive`] - shape tag, material and column-major transform
//! - [`GpuOperation`] - operator tag and two operand indices
//! - [`GpuInstruction`] - postfix program entry
//!
//! Execution is left to a [`RenderBackend`].

mod backend;
mod buffers;

pub use backend::RenderBackend;
pub use buffers::{
    GpuInstruction, GpuLimits, GpuMaterial, GpuOperation, GpuPrimitive, GpuScene, GpuSceneError,
    INSTRUCTION_OPERATION, INSTRUCTION_PRIMITIVE, MAX_INSTRUCTIONS, MAX_OPERATIONS,
    MAX_PRIMITIVES, OPERAND1_IS_OPERATION, OPERAND2_IS_OPERATION,
};
