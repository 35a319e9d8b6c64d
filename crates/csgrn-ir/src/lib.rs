#![warn(missing_docs)]

//! CSG tree and flattened program for the csgrn ray marcher.
//!
//! A scene is a binary tree: leaves are primitives, internal nodes are
//! boolean operators with exactly two children. Every node carries the
//! transform and color accumulated while it was parsed.
//!
//! The tree is never handed to the renderer directly. [`CsgTree::flatten`]
//! lowers it into three parallel lists (primitives, operations and a postfix
//! instruction program) that a stack-based evaluator can walk without
//! recursion. See [`FlatScene`].

mod error;
mod flatten;

pub use error::ProgramError;
pub use flatten::{
    FlatScene, FlattenSettings, Instruction, Material, OperandRef, Operation, Primitive,
    ProgramStats,
};

use csgrn_math::Transform;
use serde::{Deserialize, Serialize};

/// Shape of a leaf node.
///
/// Discriminants are the tags the GPU evaluator switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum PrimitiveKind {
    /// Unit sphere, scaled by its radius.
    Sphere = 1,
    /// Unit cube centered at the origin.
    Cube = 2,
    /// Unit cylinder along Y, centered at the origin.
    Cylinder = 4,
}

impl PrimitiveKind {
    /// Tag written into GPU records.
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Keyword naming this shape in scene source.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Cube => "cube",
            Self::Cylinder => "cylinder",
        }
    }
}

/// Boolean operator of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum OpKind {
    /// Boolean union of two geometries.
    Union = 1,
    /// Boolean intersection of two geometries.
    Intersection = 2,
    /// Boolean difference (left minus right).
    Difference = 4,
}

impl OpKind {
    /// Tag written into GPU records.
    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Keyword naming this operator in scene source.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Difference => "difference",
        }
    }
}

/// Linear RGB color in 0.0..1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
}

impl Color {
    /// Default node color.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Create a new color.
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Opaque RGBA albedo.
    pub fn to_albedo(self) -> [f32; 4] {
        [self.r, self.g, self.b, 1.0]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Leaf or internal payload of a [`CsgNode`].
///
/// Children are owned through `Box`, so a node has either zero or exactly
/// two children and the tree can contain neither cycles nor shared nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// Leaf primitive.
    Primitive {
        /// Shape of the leaf.
        primitive: PrimitiveKind,
    },
    /// Binary operator.
    Operation {
        /// Operator applied to the children.
        op: OpKind,
        /// Left operand.
        left: Box<CsgNode>,
        /// Right operand.
        right: Box<CsgNode>,
    },
}

/// A node of the CSG tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsgNode {
    /// Leaf or operator payload.
    pub kind: NodeKind,
    /// Accumulated placement. Only leaves carry it into the flattened output.
    pub transform: Transform,
    /// Accumulated color. Only leaves carry it into the flattened output.
    pub color: Color,
}

impl CsgNode {
    /// New leaf with identity transform and white color.
    pub fn primitive(primitive: PrimitiveKind) -> Self {
        Self {
            kind: NodeKind::Primitive { primitive },
            transform: Transform::identity(),
            color: Color::WHITE,
        }
    }

    /// New leaf with the given transform.
    pub fn primitive_with_transform(primitive: PrimitiveKind, transform: Transform) -> Self {
        Self {
            transform,
            ..Self::primitive(primitive)
        }
    }

    /// New operator node owning both children.
    pub fn operation(op: OpKind, left: CsgNode, right: CsgNode) -> Self {
        Self {
            kind: NodeKind::Operation {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            transform: Transform::identity(),
            color: Color::WHITE,
        }
    }

    /// True for primitives.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Primitive { .. })
    }

    /// Left-multiply the accumulated transform: `transform = m * transform`.
    pub fn pre_transform(&mut self, m: &Transform) {
        self.transform = m.then(&self.transform);
    }

    /// Overwrite the color of this node only. Descendants are untouched.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    fn count(&self) -> (usize, usize) {
        match &self.kind {
            NodeKind::Primitive { .. } => (1, 0),
            NodeKind::Operation { left, right, .. } => {
                let (l_leaves, l_ops) = left.count();
                let (r_leaves, r_ops) = right.count();
                (l_leaves + r_leaves, l_ops + r_ops + 1)
            }
        }
    }

    fn depth(&self) -> usize {
        match &self.kind {
            NodeKind::Primitive { .. } => 1,
            NodeKind::Operation { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// A complete scene tree. Owns its root exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsgTree {
    root: CsgNode,
}

impl CsgTree {
    /// Wrap a root node.
    pub fn new(root: CsgNode) -> Self {
        Self { root }
    }

    /// The root node.
    pub fn root(&self) -> &CsgNode {
        &self.root
    }

    /// Give up the tree and return its root.
    pub fn into_root(self) -> CsgNode {
        self.root
    }

    /// Number of primitives.
    pub fn leaf_count(&self) -> usize {
        self.root.count().0
    }

    /// Number of operator nodes.
    pub fn operation_count(&self) -> usize {
        self.root.count().1
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}
