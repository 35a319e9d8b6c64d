#![warn(missing_docs)]

//! csgrn: CSG scene compiler for GPU ray marching.
//!
//! Turns OpenSCAD-style CSG text into three flat GPU buffers: primitives,
//! boolean operations, and a postfix instruction program.
//!
//! ```text
//! text ──tokenize──▶ tokens ──parse──▶ CsgTree ──flatten──▶ FlatScene ──pack──▶ GpuScene
//! ```
//!
//! # Example
//!
//! ```rust
//! use csgrn::{compile_source, Settings};
//!
//! let compiled = compile_source(
//!     "difference() { cube(size=2); sphere(r=1.3); }",
//!     &Settings::default(),
//! )
//! .unwrap();
//! assert_eq!(compiled.stats.instructions, 3);
//! assert_eq!(compiled.gpu.primitive_bytes().len(), 2 * 112);
//! ```

mod error;
mod settings;

use std::path::Path;

pub use error::{CsgrnError, Result};
pub use settings::{GpuSettings, Settings, DEFAULT_STACK_DEPTH};

pub use csgrn_gpu::{
    GpuInstruction, GpuLimits, GpuMaterial, GpuOperation, GpuPrimitive, GpuScene, GpuSceneError,
    RenderBackend,
};
pub use csgrn_ir::{
    Color, CsgNode, CsgTree, FlatScene, FlattenSettings, Instruction, Material, NodeKind, OpKind,
    OperandRef, Operation, Primitive, PrimitiveKind, ProgramError, ProgramStats,
};
pub use csgrn_lang::{parse_scene, Category, Diagnostic, DiagnosticKind, ParseOutcome, SceneError};
pub use csgrn_math::Transform;

/// Summary of a scene tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Primitive leaves.
    pub leaves: usize,
    /// Operator nodes.
    pub operations: usize,
    /// Longest root-to-leaf path, counted in nodes.
    pub depth: usize,
}

impl TreeStats {
    fn of(tree: &CsgTree) -> Self {
        Self {
            leaves: tree.leaf_count(),
            operations: tree.operation_count(),
            depth: tree.depth(),
        }
    }
}

/// Every stage of a successful compile.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Parsed scene.
    pub tree: CsgTree,
    /// Shape of the tree.
    pub tree_stats: TreeStats,
    /// Typed flattened scene.
    pub flat: FlatScene,
    /// Program counts and peak stack depth.
    pub stats: ProgramStats,
    /// Packed GPU buffers.
    pub gpu: GpuScene,
    /// Recoverable problems found while parsing.
    pub diagnostics: Vec<Diagnostic>,
}

impl Compiled {
    /// True if the program's peak stack depth fits the evaluator.
    pub fn fits_evaluator(&self, settings: &Settings) -> bool {
        self.stats.max_stack_depth <= settings.gpu.evaluator_stack_depth
    }

    /// Hand the GPU buffers to `backend`.
    pub fn submit<B: RenderBackend>(self, backend: &mut B) -> std::result::Result<(), B::Error> {
        backend.submit(self.gpu)
    }
}

/// Compile scene source.
///
/// Fails if the scene has no root or does not fit the configured buffers.
/// Recoverable diagnostics are kept in [`Compiled::diagnostics`].
pub fn compile_source(source: &str, settings: &Settings) -> Result<Compiled> {
    compile_outcome(parse_scene(source), settings)
}

/// Read and compile a scene file.
pub fn compile_file(path: impl AsRef<Path>, settings: &Settings) -> Result<Compiled> {
    let outcome = csgrn_lang::read_scene(path)?;
    compile_outcome(outcome, settings)
}

fn compile_outcome(outcome: ParseOutcome, settings: &Settings) -> Result<Compiled> {
    settings.validate()?;

    let (tree, diagnostics) = outcome.into_result()?;
    let tree_stats = TreeStats::of(&tree);
    let flat = tree.flatten(&settings.flatten);
    let gpu = GpuScene::from_flat(&flat, &settings.gpu.limits())?;
    let stats = gpu.stats;

    if stats.max_stack_depth > settings.gpu.evaluator_stack_depth {
        tracing::warn!(
            depth = stats.max_stack_depth,
            limit = settings.gpu.evaluator_stack_depth,
            "program needs a deeper stack than the evaluator provides"
        );
    }
    tracing::info!(
        primitives = stats.primitives,
        operations = stats.operations,
        instructions = stats.instructions,
        diagnostics = diagnostics.len(),
        "compiled scene"
    );

    Ok(Compiled {
        tree,
        tree_stats,
        flat,
        stats,
        gpu,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const WIKIPEDIA: &str = "
        difference() {
            intersection() {
                cube(size=[2,2,2], center=true);
                sphere(r=1.35);
            }
            union() {
                union() {
                    cylinder(h=2.2, r1=0.55, r2=0.55, center=true);
                    multmatrix([[1,0,0,0],[0,0,-1,0],[0,1,0,0],[0,0,0,1]]) {
                        cylinder(h=2.2, r1=0.55, r2=0.55, center=true);
                    }
                }
                multmatrix([[0,0,1,0],[0,1,0,0],[-1,0,0,0],[0,0,0,1]]) {
                    cylinder(h=2.2, r1=0.55, r2=0.55, center=true);
                }
            }
        }";

    #[test]
    fn test_compile_wikipedia_scene() {
        let compiled = compile_source(WIKIPEDIA, &Settings::default()).unwrap();
        assert!(compiled.diagnostics.is_empty());
        assert_eq!(
            compiled.tree_stats,
            TreeStats {
                leaves: 5,
                operations: 4,
                depth: 4,
            }
        );
        assert_eq!(compiled.stats.instructions, 9);
        assert_eq!(compiled.gpu.primitives.len(), 5);
        assert_eq!(compiled.gpu.operations.len(), 4);
        assert_eq!(compiled.flat.operations.last().map(|o| o.op), Some(OpKind::Difference));
        assert!(compiled.fits_evaluator(&Settings::default()));
    }

    #[test]
    fn test_rotated_cylinder_transform() {
        let compiled = compile_source(WIKIPEDIA, &Settings::default()).unwrap();
        // Second cylinder: rotated about the authoring X axis.
        let t = compiled.flat.primitives[3].transform;
        let axis = t.apply_vec(&csgrn_math::Vec3::y());
        assert_relative_eq!(axis.norm(), 2.2, epsilon = 1e-5);
        assert_relative_eq!(axis.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_specular_setting() {
        let settings = Settings::from_toml_str("[flatten]\nspecular = 0.75\n").unwrap();
        let compiled = compile_source("sphere(r=1);", &settings).unwrap();
        assert_eq!(compiled.gpu.primitives[0].material.specular, 0.75);
    }

    #[test]
    fn test_no_root_is_error() {
        let err = compile_source("union() { sphere(); }", &Settings::default()).unwrap_err();
        match err {
            CsgrnError::Scene(SceneError::NoRoot { diagnostics }) => {
                assert!(diagnostics.iter().any(|d| d.is_structural()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_limits_are_applied() {
        let mut settings = Settings::default();
        settings.gpu.max_operations = 1;
        let err = compile_source(WIKIPEDIA, &settings).unwrap_err();
        assert!(matches!(
            err,
            CsgrnError::Gpu(GpuSceneError::TooManyOperations { count: 4, max: 1 })
        ));
    }

    #[test]
    fn test_recoverable_diagnostics_are_kept() {
        let compiled = compile_source("sphere(r=oops);", &Settings::default()).unwrap();
        assert_eq!(compiled.diagnostics.len(), 1);
        assert_eq!(compiled.diagnostics[0].category(), Category::Numeric);
    }

    #[test]
    fn test_stack_depth_check() {
        // Right-leaning chain: every primitive waits on the stack.
        let compiled = compile_source(
            "union() { sphere(); union() { sphere(); union() { sphere(); cube(); } } }",
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(compiled.stats.max_stack_depth, 4);

        let mut settings = Settings::default();
        settings.gpu.evaluator_stack_depth = 3;
        assert!(!compiled.fits_evaluator(&settings));
    }

    #[test]
    fn test_compile_file() {
        let path = std::env::temp_dir().join(format!("csgrn-test-{}.csg", std::process::id()));
        std::fs::write(&path, "color([0,1,0]) { cube(); }").unwrap();
        let compiled = compile_file(&path, &Settings::default()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(compiled.gpu.primitives[0].material.albedo, [0.0, 1.0, 0.0, 1.0]);

        let missing = compile_file("/nonexistent/scene.csg", &Settings::default());
        assert!(matches!(missing, Err(CsgrnError::Scene(SceneError::Io(_)))));
    }

    #[test]
    fn test_submit_to_backend() {
        struct Count(usize);
        impl RenderBackend for Count {
            type Error = ();
            fn submit(&mut self, scene: GpuScene) -> std::result::Result<(), ()> {
                self.0 += scene.instructions.len();
                Ok(())
            }
        }

        let compiled = compile_source("sphere();", &Settings::default()).unwrap();
        let mut backend = Count(0);
        compiled.submit(&mut backend).unwrap();
        assert_eq!(backend.0, 1);
    }
}
