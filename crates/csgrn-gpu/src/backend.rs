//! Handoff from the compiler to a renderer.

use crate::buffers::GpuScene;

/// Consumer of packed scenes.
///
/// `submit` takes the scene by value: after the handoff the compiler keeps
/// no reference to the buffers.
pub trait RenderBackend {
    /// Error produced by the backend.
    type Error;

    /// Take ownership of a scene for upload or export.
    fn submit(&mut self, scene: GpuScene) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::GpuLimits;
    use csgrn_ir::{CsgNode, CsgTree, FlattenSettings, PrimitiveKind};

    #[derive(Default)]
    struct Recorder {
        scenes: Vec<GpuScene>,
    }

    impl RenderBackend for Recorder {
        type Error = std::convert::Infallible;

        fn submit(&mut self, scene: GpuScene) -> Result<(), Self::Error> {
            self.scenes.push(scene);
            Ok(())
        }
    }

    #[test]
    fn test_submit_moves_scene() {
        let flat = CsgTree::new(CsgNode::primitive(PrimitiveKind::Sphere))
            .flatten(&FlattenSettings::default());
        let scene = GpuScene::from_flat(&flat, &GpuLimits::default()).unwrap();

        let mut backend = Recorder::default();
        backend.submit(scene).unwrap();
        assert_eq!(backend.scenes.len(), 1);
        assert_eq!(backend.scenes[0].primitives[0].kind, 1);
    }
}
