//! Compiler settings, loadable from TOML.
//!
//! ```toml
//! [flatten]
//! specular = 0.25
//!
//! [gpu]
//! max_primitives = 4096
//! max_operations = 4096
//! max_instructions = 8192
//! evaluator_stack_depth = 32
//! ```
//!
//! Every key is optional.

use std::path::Path;

use csgrn_gpu::{GpuLimits, MAX_INSTRUCTIONS, MAX_OPERATIONS, MAX_PRIMITIVES};
use csgrn_ir::FlattenSettings;
use serde::{Deserialize, Serialize};

use crate::error::{CsgrnError, Result};

/// Default stack depth assumed for the GPU evaluator.
pub const DEFAULT_STACK_DEPTH: usize = 32;

/// GPU buffer limits and evaluator assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuSettings {
    /// Maximum primitives per scene.
    pub max_primitives: usize,
    /// Maximum operations per scene.
    pub max_operations: usize,
    /// Maximum instructions per scene.
    pub max_instructions: usize,
    /// Value stack size of the evaluator. Not enforced by the compiler.
    pub evaluator_stack_depth: usize,
}

impl Default for GpuSettings {
    fn default() -> Self {
        Self {
            max_primitives: MAX_PRIMITIVES,
            max_operations: MAX_OPERATIONS,
            max_instructions: MAX_INSTRUCTIONS,
            evaluator_stack_depth: DEFAULT_STACK_DEPTH,
        }
    }
}

impl GpuSettings {
    /// Buffer limits for packing.
    pub fn limits(&self) -> GpuLimits {
        GpuLimits {
            max_primitives: self.max_primitives,
            max_operations: self.max_operations,
            max_instructions: self.max_instructions,
        }
    }
}

/// All compiler settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Flattening.
    pub flatten: FlattenSettings,
    /// GPU packing.
    pub gpu: GpuSettings,
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading settings");
        Self::from_toml_str(&text)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !self.flatten.specular.is_finite() || self.flatten.specular < 0.0 {
            return Err(CsgrnError::InvalidSettings(
                "flatten.specular must be a non-negative number".into(),
            ));
        }
        if self.gpu.max_primitives == 0 || self.gpu.max_operations == 0 {
            return Err(CsgrnError::InvalidSettings(
                "gpu.max_primitives and gpu.max_operations must be positive".into(),
            ));
        }
        if self.gpu.max_instructions == 0 {
            return Err(CsgrnError::InvalidSettings(
                "gpu.max_instructions must be positive".into(),
            ));
        }
        if self.gpu.evaluator_stack_depth == 0 {
            return Err(CsgrnError::InvalidSettings(
                "gpu.evaluator_stack_depth must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.flatten.specular, 0.0);
        assert_eq!(s.gpu.max_primitives, 4096);
        assert_eq!(s.gpu.max_operations, 4096);
        assert_eq!(s.gpu.max_instructions, 8192);
        assert_eq!(s.gpu.evaluator_stack_depth, 32);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_toml() {
        let s = Settings::from_toml_str(
            "[flatten]\nspecular = 0.5\n\n[gpu]\nevaluator_stack_depth = 64\n",
        )
        .unwrap();
        assert_eq!(s.flatten.specular, 0.5);
        assert_eq!(s.gpu.evaluator_stack_depth, 64);
        assert_eq!(s.gpu.max_primitives, 4096);
        assert_eq!(s.gpu.limits().max_instructions, 8192);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Settings::from_toml_str("[flatten]\nspecular = -1.0\n"),
            Err(CsgrnError::InvalidSettings(_))
        ));
        assert!(matches!(
            Settings::from_toml_str("[gpu]\nmax_instructions = 0\n"),
            Err(CsgrnError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            Settings::from_toml_str("[gpu]\nmax_primitives = \"many\"\n"),
            Err(CsgrnError::Config(_))
        ));
    }
}
