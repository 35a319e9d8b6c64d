//! GPU buffer records for flattened scenes.

use bytemuck::{Pod, Zeroable};
use csgrn_ir::{FlatScene, Instruction, Material, Operation, Primitive, ProgramError, ProgramStats};
use thiserror::Error;

/// Default maximum number of primitives in a single scene.
pub const MAX_PRIMITIVES: usize = 4096;

/// Default maximum number of operations in a single scene.
pub const MAX_OPERATIONS: usize = 4096;

/// Default maximum number of instructions in a single scene.
pub const MAX_INSTRUCTIONS: usize = 8192;

/// Instruction tag for a primitive.
pub const INSTRUCTION_PRIMITIVE: u32 = 0;

/// Instruction tag for an operation.
pub const INSTRUCTION_OPERATION: u32 = 1;

/// Bit in [`GpuOperation::operand_kinds`]: operand 1 is an operation result.
pub const OPERAND1_IS_OPERATION: u32 = 1;

/// Bit in [`GpuOperation::operand_kinds`]: operand 2 is an operation result.
pub const OPERAND2_IS_OPERATION: u32 = 1 << 1;

/// GPU-compatible material.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    /// RGBA base color.
    pub albedo: [f32; 4],
    /// Specular strength.
    pub specular: f32,
    /// Padding.
    pub _pad: [f32; 3],
}

impl From<&Material> for GpuMaterial {
    fn from(m: &Material) -> Self {
        Self {
            albedo: m.albedo,
            specular: m.specular,
            _pad: [0.0; 3],
        }
    }
}

/// GPU-compatible primitive.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuPrimitive {
    /// Shape tag: 1=Sphere, 2=Cube, 4=Cylinder
    pub kind: u32,
    /// Padding for alignment
    pub _pad: [u32; 3],
    /// Surface parameters.
    pub material: GpuMaterial,
    /// Placement, column-major.
    pub transform: [[f32; 4]; 4],
}

impl From<&Primitive> for GpuPrimitive {
    fn from(p: &Primitive) -> Self {
        Self {
            kind: p.kind.tag(),
            _pad: [0; 3],
            material: GpuMaterial::from(&p.material),
            transform: p.transform.to_cols_array(),
        }
    }
}

/// GPU-compatible boolean operation.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuOperation {
    /// Operator tag: 1=Union, 2=Intersection, 4=Difference
    pub kind: u32,
    /// Index of the first operand.
    pub operand1: u32,
    /// Index of the second operand.
    pub operand2: u32,
    /// Which operands index the operation array rather than the primitive
    /// array. See [`OPERAND1_IS_OPERATION`] and [`OPERAND2_IS_OPERATION`].
    pub operand_kinds: u32,
}

impl From<&Operation> for GpuOperation {
    fn from(o: &Operation) -> Self {
        let mut operand_kinds = 0;
        if o.lhs.is_operation() {
            operand_kinds |= OPERAND1_IS_OPERATION;
        }
        if o.rhs.is_operation() {
            operand_kinds |= OPERAND2_IS_OPERATION;
        }
        Self {
            kind: o.op.tag(),
            operand1: o.lhs.index(),
            operand2: o.rhs.index(),
            operand_kinds,
        }
    }
}

/// GPU-compatible postfix instruction.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuInstruction {
    /// [`INSTRUCTION_PRIMITIVE`] or [`INSTRUCTION_OPERATION`].
    pub tag: u32,
    /// Index into the array named by `tag`.
    pub index: u32,
    /// Padding.
    pub _pad: [u32; 2],
}

impl From<Instruction> for GpuInstruction {
    fn from(inst: Instruction) -> Self {
        Self {
            tag: inst.tag(),
            index: inst.index(),
            _pad: [0; 2],
        }
    }
}

/// Buffer size limits checked when packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuLimits {
    /// Maximum primitives.
    pub max_primitives: usize,
    /// Maximum operations.
    pub max_operations: usize,
    /// Maximum instructions.
    pub max_instructions: usize,
}

impl Default for GpuLimits {
    fn default() -> Self {
        Self {
            max_primitives: MAX_PRIMITIVES,
            max_operations: MAX_OPERATIONS,
            max_instructions: MAX_INSTRUCTIONS,
        }
    }
}

/// Error building GPU scene.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuSceneError {
    /// Too many primitives (exceeds GPU limit).
    #[error("too many primitives: {count} (max {max})")]
    TooManyPrimitives {
        /// Primitives in the scene.
        count: usize,
        /// Configured limit.
        max: usize,
    },
    /// Too many operations (exceeds GPU limit).
    #[error("too many operations: {count} (max {max})")]
    TooManyOperations {
        /// Operations in the scene.
        count: usize,
        /// Configured limit.
        max: usize,
    },
    /// Too many instructions (exceeds GPU limit).
    #[error("too many instructions: {count} (max {max})")]
    TooManyInstructions {
        /// Instructions in the scene.
        count: usize,
        /// Configured limit.
        max: usize,
    },
    /// The instruction program does not evaluate to a single value.
    #[error("invalid instruction program: {0}")]
    InvalidProgram(#[from] ProgramError),
}

/// Scene data prepared for GPU upload.
///
/// Three separately addressable arrays of 16-byte aligned records.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuScene {
    /// Primitives.
    pub primitives: Vec<GpuPrimitive>,
    /// Operations.
    pub operations: Vec<GpuOperation>,
    /// Instructions in evaluation order.
    pub instructions: Vec<GpuInstruction>,
    /// Counts and peak stack depth of the program.
    pub stats: ProgramStats,
}

impl GpuScene {
    /// Pack a flattened scene.
    ///
    /// The program is validated first; a scene that would not evaluate to a
    /// single value is never handed to a backend.
    pub fn from_flat(flat: &FlatScene, limits: &GpuLimits) -> Result<Self, GpuSceneError> {
        let stats = flat.validate()?;

        if flat.primitives.len() > limits.max_primitives {
            return Err(GpuSceneError::TooManyPrimitives {
                count: flat.primitives.len(),
                max: limits.max_primitives,
            });
        }
        if flat.operations.len() > limits.max_operations {
            return Err(GpuSceneError::TooManyOperations {
                count: flat.operations.len(),
                max: limits.max_operations,
            });
        }
        if flat.instructions.len() > limits.max_instructions {
            return Err(GpuSceneError::TooManyInstructions {
                count: flat.instructions.len(),
                max: limits.max_instructions,
            });
        }

        let scene = Self {
            primitives: flat.primitives.iter().map(GpuPrimitive::from).collect(),
            operations: flat.operations.iter().map(GpuOperation::from).collect(),
            instructions: flat.instructions.iter().copied().map(GpuInstruction::from).collect(),
            stats,
        };
        tracing::debug!(
            primitive_bytes = scene.primitive_bytes().len(),
            operation_bytes = scene.operation_bytes().len(),
            instruction_bytes = scene.instruction_bytes().len(),
            "packed GPU scene"
        );
        Ok(scene)
    }

    /// Primitive array as raw bytes.
    pub fn primitive_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.primitives)
    }

    /// Operation array as raw bytes.
    pub fn operation_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.operations)
    }

    /// Instruction array as raw bytes.
    pub fn instruction_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instructions)
    }

    /// Total bytes across all three arrays.
    pub fn total_bytes(&self) -> usize {
        self.primitive_bytes().len() + self.operation_bytes().len() + self.instruction_bytes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csgrn_ir::{Color, CsgNode, CsgTree, FlattenSettings, OpKind, OperandRef, PrimitiveKind};
    use csgrn_math::Transform;
    use std::mem::{align_of, offset_of, size_of};

    fn sample() -> FlatScene {
        // difference(cube, union(sphere, cylinder))
        let mut cube = CsgNode::primitive_with_transform(
            PrimitiveKind::Cube,
            Transform::translation(1.0, 2.0, 3.0),
        );
        cube.set_color(Color::new(1.0, 0.0, 0.0));
        let tree = CsgTree::new(CsgNode::operation(
            OpKind::Difference,
            cube,
            CsgNode::operation(
                OpKind::Union,
                CsgNode::primitive(PrimitiveKind::Sphere),
                CsgNode::primitive(PrimitiveKind::Cylinder),
            ),
        ));
        tree.flatten(&FlattenSettings { specular: 0.5 })
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(size_of::<GpuMaterial>(), 32);
        assert_eq!(size_of::<GpuPrimitive>(), 112);
        assert_eq!(size_of::<GpuOperation>(), 16);
        assert_eq!(size_of::<GpuInstruction>(), 16);
        for size in [
            size_of::<GpuMaterial>(),
            size_of::<GpuPrimitive>(),
            size_of::<GpuOperation>(),
            size_of::<GpuInstruction>(),
        ] {
            assert_eq!(size % 16, 0);
        }
        assert_eq!(align_of::<GpuPrimitive>(), 4);
    }

    #[test]
    fn test_field_offsets() {
        assert_eq!(offset_of!(GpuPrimitive, kind), 0);
        assert_eq!(offset_of!(GpuPrimitive, material), 16);
        assert_eq!(offset_of!(GpuPrimitive, transform), 48);
        assert_eq!(offset_of!(GpuMaterial, specular), 16);
        assert_eq!(offset_of!(GpuOperation, kind), 0);
        assert_eq!(offset_of!(GpuOperation, operand1), 4);
        assert_eq!(offset_of!(GpuOperation, operand2), 8);
        assert_eq!(offset_of!(GpuInstruction, tag), 0);
        assert_eq!(offset_of!(GpuInstruction, index), 4);
    }

    #[test]
    fn test_pack_primitives() {
        let flat = sample();
        let scene = GpuScene::from_flat(&flat, &GpuLimits::default()).unwrap();

        let kinds: Vec<u32> = scene.primitives.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![2, 1, 4]);

        let cube = &scene.primitives[0];
        assert_eq!(cube.material.albedo, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(cube.material.specular, 0.5);
        // Translation lives in the fourth column.
        assert_eq!(cube.transform[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_pack_operations_and_instructions() {
        let flat = sample();
        assert_eq!(
            flat.operations[1].rhs,
            OperandRef::Operation(0),
            "difference takes the union result"
        );
        let scene = GpuScene::from_flat(&flat, &GpuLimits::default()).unwrap();

        assert_eq!(
            scene.operations,
            vec![
                GpuOperation {
                    kind: 1,
                    operand1: 1,
                    operand2: 2,
                    operand_kinds: 0,
                },
                GpuOperation {
                    kind: 4,
                    operand1: 0,
                    operand2: 0,
                    operand_kinds: OPERAND2_IS_OPERATION,
                },
            ]
        );

        let program: Vec<(u32, u32)> = scene.instructions.iter().map(|i| (i.tag, i.index)).collect();
        assert_eq!(program, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)]);
        assert_eq!(scene.stats.max_stack_depth, 3);
    }

    #[test]
    fn test_byte_views() {
        let scene = GpuScene::from_flat(&sample(), &GpuLimits::default()).unwrap();
        assert_eq!(scene.primitive_bytes().len(), 3 * 112);
        assert_eq!(scene.operation_bytes().len(), 2 * 16);
        assert_eq!(scene.instruction_bytes().len(), 5 * 16);
        assert_eq!(scene.total_bytes(), 336 + 32 + 80);

        let words: &[u32] = bytemuck::cast_slice(scene.instruction_bytes());
        assert_eq!(&words[12..16], &[INSTRUCTION_OPERATION, 0, 0, 0]);
    }

    #[test]
    fn test_limits() {
        let flat = sample();
        let limits = GpuLimits {
            max_primitives: 2,
            ..GpuLimits::default()
        };
        assert_eq!(
            GpuScene::from_flat(&flat, &limits),
            Err(GpuSceneError::TooManyPrimitives { count: 3, max: 2 })
        );

        let limits = GpuLimits {
            max_instructions: 4,
            ..GpuLimits::default()
        };
        assert!(matches!(
            GpuScene::from_flat(&flat, &limits),
            Err(GpuSceneError::TooManyInstructions { count: 5, .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_program() {
        let mut flat = sample();
        flat.instructions.pop();
        assert!(matches!(
            GpuScene::from_flat(&flat, &GpuLimits::default()),
            Err(GpuSceneError::InvalidProgram(ProgramError::Unbalanced { remaining: 2 }))
        ));
    }
}
