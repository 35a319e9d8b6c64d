//! Error type for the compile pipeline.

use thiserror::Error;

use csgrn_gpu::GpuSceneError;
use csgrn_lang::SceneError;

/// Errors returned while compiling a scene.
#[derive(Error, Debug)]
pub enum CsgrnError {
    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The scene could not be loaded.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The flattened scene could not be packed for the GPU.
    #[error("GPU packing failed: {0}")]
    Gpu(#[from] GpuSceneError),

    /// The settings file is not valid TOML for [`Settings`](crate::Settings).
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Settings parsed but hold unusable values.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for csgrn operations.
pub type Result<T> = std::result::Result<T, CsgrnError>;
