//! Lowering a [`CsgTree`] into a postfix program.
//!
//! One post-order walk fills three lists:
//!
//! - `primitives`: one entry per leaf, in post-order
//! - `operations`: one entry per operator node, after both of its subtrees
//! - `instructions`: the whole tree in reverse-Polish order, each entry
//!   pointing into one of the two lists above
//!
//! An evaluator pushes a value for every primitive instruction and pops two,
//! pushes one for every operation instruction. The last value standing is
//! the whole scene.

use std::fmt;

use csgrn_math::Transform;
use serde::{Deserialize, Serialize};

use crate::error::ProgramError;
use crate::{CsgNode, CsgTree, NodeKind, OpKind, PrimitiveKind};

/// Knobs applied while flattening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenSettings {
    /// Specular value written into every material.
    pub specular: f32,
}

impl Default for FlattenSettings {
    fn default() -> Self {
        Self { specular: 0.0 }
    }
}

/// Surface parameters of a flattened primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// RGBA base color.
    pub albedo: [f32; 4],
    /// Specular strength.
    pub specular: f32,
}

/// A leaf in flattened form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    /// Shape.
    pub kind: PrimitiveKind,
    /// Surface parameters.
    pub material: Material,
    /// Placement, copied verbatim from the leaf.
    pub transform: Transform,
}

/// Typed reference to an entry of either list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandRef {
    /// Index into `primitives`.
    Primitive(u32),
    /// Index into `operations`.
    Operation(u32),
}

impl OperandRef {
    /// The raw index, without its kind.
    pub fn index(self) -> u32 {
        match self {
            Self::Primitive(i) | Self::Operation(i) => i,
        }
    }

    /// True when this refers to an operation.
    pub fn is_operation(self) -> bool {
        matches!(self, Self::Operation(_))
    }
}

/// An operator node in flattened form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operator.
    pub op: OpKind,
    /// Left operand.
    pub lhs: OperandRef,
    /// Right operand.
    pub rhs: OperandRef,
}

/// One step of the postfix program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// Push primitive `n`.
    Primitive(u32),
    /// Pop two values, apply operation `n`, push the result.
    Operation(u32),
}

impl Instruction {
    /// Discriminator stored on the GPU: 0 for primitives, 1 for operations.
    pub fn tag(self) -> u32 {
        match self {
            Self::Primitive(_) => 0,
            Self::Operation(_) => 1,
        }
    }

    /// Index into the list selected by [`Instruction::tag`].
    pub fn index(self) -> u32 {
        match self {
            Self::Primitive(i) | Self::Operation(i) => i,
        }
    }
}

/// Summary returned by [`FlatScene::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramStats {
    /// Primitive count.
    pub primitives: usize,
    /// Operation count.
    pub operations: usize,
    /// Instruction count.
    pub instructions: usize,
    /// Largest number of values held on the stack at any point.
    pub max_stack_depth: usize,
}

/// The flattened scene handed to a render backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatScene {
    /// Leaves, in post-order.
    pub primitives: Vec<Primitive>,
    /// Operator nodes, in post-order.
    pub operations: Vec<Operation>,
    /// Postfix program over both lists.
    pub instructions: Vec<Instruction>,
}

impl CsgTree {
    /// Flatten the tree into a [`FlatScene`].
    ///
    /// Total over every tree: runs in time linear in the node count and
    /// recurses as deep as the tree.
    pub fn flatten(&self, settings: &FlattenSettings) -> FlatScene {
        let mut flattener = Flattener {
            settings,
            out: FlatScene::default(),
        };
        flattener.visit(self.root());
        tracing::debug!(
            primitives = flattener.out.primitives.len(),
            operations = flattener.out.operations.len(),
            instructions = flattener.out.instructions.len(),
            "flattened CSG tree"
        );
        flattener.out
    }
}

struct Flattener<'a> {
    settings: &'a FlattenSettings,
    out: FlatScene,
}

impl Flattener<'_> {
    fn visit(&mut self, node: &CsgNode) -> OperandRef {
        match &node.kind {
            NodeKind::Primitive { primitive } => {
                let id = self.out.primitives.len() as u32;
                self.out.instructions.push(Instruction::Primitive(id));
                self.out.primitives.push(Primitive {
                    kind: *primitive,
                    material: Material {
                        albedo: node.color.to_albedo(),
                        specular: self.settings.specular,
                    },
                    transform: node.transform,
                });
                OperandRef::Primitive(id)
            }
            NodeKind::Operation { op, left, right } => {
                let lhs = self.visit(left);
                let rhs = self.visit(right);
                let id = self.out.operations.len() as u32;
                self.out.operations.push(Operation { op: *op, lhs, rhs });
                self.out.instructions.push(Instruction::Operation(id));
                OperandRef::Operation(id)
            }
        }
    }
}

impl FlatScene {
    /// Run the instruction program on a stack of operand references.
    ///
    /// Succeeds when no instruction underflows the stack, every index is in
    /// range, every operation names the two values it pops, and exactly one
    /// value remains.
    pub fn validate(&self) -> Result<ProgramStats, ProgramError> {
        if self.instructions.is_empty() {
            return Err(ProgramError::Empty);
        }

        let mut stack: Vec<OperandRef> = Vec::new();
        let mut max_stack_depth = 0;

        for (at, inst) in self.instructions.iter().enumerate() {
            match *inst {
                Instruction::Primitive(index) => {
                    if index as usize >= self.primitives.len() {
                        return Err(ProgramError::DanglingIndex { at, index });
                    }
                    stack.push(OperandRef::Primitive(index));
                }
                Instruction::Operation(index) => {
                    let op = self
                        .operations
                        .get(index as usize)
                        .ok_or(ProgramError::DanglingIndex { at, index })?;
                    let rhs = stack.pop().ok_or(ProgramError::StackUnderflow { at })?;
                    let lhs = stack.pop().ok_or(ProgramError::StackUnderflow { at })?;
                    if op.lhs != lhs || op.rhs != rhs {
                        return Err(ProgramError::OperandMismatch { at });
                    }
                    stack.push(OperandRef::Operation(index));
                }
            }
            max_stack_depth = max_stack_depth.max(stack.len());
        }

        if stack.len() != 1 {
            return Err(ProgramError::Unbalanced {
                remaining: stack.len(),
            });
        }

        Ok(ProgramStats {
            primitives: self.primitives.len(),
            operations: self.operations.len(),
            instructions: self.instructions.len(),
            max_stack_depth,
        })
    }
}

fn primitive_name(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Sphere => "Sphere",
        PrimitiveKind::Cube => "Cube",
        PrimitiveKind::Cylinder => "Cylinder",
    }
}

fn op_name(op: OpKind) -> &'static str {
    match op {
        OpKind::Union => "Union",
        OpKind::Intersection => "Intersection",
        OpKind::Difference => "Difference",
    }
}

/// Instruction table in program order.
impl fmt::Display for FlatScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "| idx | instruction | id     | detail                       |")?;
        writeln!(f, "|-----|-------------|--------|------------------------------|")?;
        for (i, inst) in self.instructions.iter().enumerate() {
            let (label, detail) = match *inst {
                Instruction::Primitive(id) => (
                    "PRIMITIVE",
                    self.primitives
                        .get(id as usize)
                        .map(|p| format!("type: {}", primitive_name(p.kind)))
                        .unwrap_or_else(|| "INVALID ID".to_string()),
                ),
                Instruction::Operation(id) => (
                    "OPERATION",
                    self.operations
                        .get(id as usize)
                        .map(|o| format!("op: {}", op_name(o.op)))
                        .unwrap_or_else(|| "INVALID ID".to_string()),
                ),
            };
            writeln!(
                f,
                "| {:>3} | {:<11} | {:>6} | {:<28} |",
                i,
                label,
                inst.index(),
                detail
            )?;
        }
        Ok(())
    }
}
