//! Binary buffer export.

use std::fs;
use std::path::{Path, PathBuf};

use csgrn::{GpuScene, RenderBackend};

/// Primitive buffer file written by [`BinaryExport`].
pub const PRIMITIVES_FILE: &str = "primitives.bin";
/// Operation buffer file written by [`BinaryExport`].
pub const OPERATIONS_FILE: &str = "operations.bin";
/// Instruction buffer file written by [`BinaryExport`].
pub const INSTRUCTIONS_FILE: &str = "instructions.bin";

/// Writes each GPU buffer to its own file, byte for byte as it would be
/// uploaded.
pub struct BinaryExport {
    dir: PathBuf,
    written: usize,
}

impl BinaryExport {
    /// Export into `dir`, creating it on first submit.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            written: 0,
        }
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl RenderBackend for BinaryExport {
    type Error = std::io::Error;

    fn submit(&mut self, scene: GpuScene) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.dir)?;
        for (name, bytes) in [
            (PRIMITIVES_FILE, scene.primitive_bytes()),
            (OPERATIONS_FILE, scene.operation_bytes()),
            (INSTRUCTIONS_FILE, scene.instruction_bytes()),
        ] {
            let path = self.dir.join(name);
            fs::write(&path, bytes)?;
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote buffer");
            self.written += bytes.len();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csgrn::{compile_source, Settings};

    #[test]
    fn test_writes_three_buffers() {
        let dir = std::env::temp_dir().join(format!("csgrn-export-{}", std::process::id()));
        let compiled =
            compile_source("union() { sphere(); cube(); }", &Settings::default()).unwrap();

        let mut export = BinaryExport::new(&dir);
        compiled.submit(&mut export).unwrap();

        assert_eq!(fs::read(dir.join(PRIMITIVES_FILE)).unwrap().len(), 2 * 112);
        assert_eq!(fs::read(dir.join(OPERATIONS_FILE)).unwrap().len(), 16);
        assert_eq!(fs::read(dir.join(INSTRUCTIONS_FILE)).unwrap().len(), 3 * 16);
        assert_eq!(export.written(), 224 + 16 + 48);

        fs::remove_dir_all(&dir).ok();
    }
}
