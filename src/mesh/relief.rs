use std::sync::Arc;

use glam::Vec3;

use super::surface::{BaseSurface, TriangleMesh};
use crate::audio::reduce::MagnitudeSequence;
use crate::error::ContractViolation;

/// Base surface with its side wall pushed out by the audio envelope.
///
/// Shares the index buffer of the surface it was built from. Normals are the
/// base surface normals, not recomputed from the displaced geometry.
#[derive(Clone, Debug)]
pub struct ReliefMesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Arc<[u32]>,
}

impl Default for ReliefMesh {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Arc::from(Vec::new()),
        }
    }
}

impl ReliefMesh {
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn shares_topology_with(&self, base: &BaseSurface) -> bool {
        Arc::ptr_eq(&self.indices, &base.shared_indices())
    }
}

impl TriangleMesh for ReliefMesh {
    fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// Displace every side-wall vertex of `base` along its normal by
/// `magnitudes[segment] * height_scale`.
///
/// Always starts from the undeformed base, so calling it again with the same
/// inputs gives bit-identical positions. Cap centres stay where they are.
pub fn deform(
    base: &BaseSurface,
    magnitudes: &MagnitudeSequence,
    height_scale: f32,
) -> Result<ReliefMesh, ContractViolation> {
    let width = base.width_segments();
    if magnitudes.len() != width {
        return Err(ContractViolation {
            expected: width,
            actual: magnitudes.len(),
        });
    }

    let mut positions = base.positions().to_vec();
    let normals = base.normals();

    for (segment, magnitude) in magnitudes.as_slice().iter().enumerate() {
        let displacement = magnitude * height_scale;
        for ring in 0..base.ring_count() {
            let i = base.vertex_index(ring, segment);
            positions[i] += normals[i] * displacement;
        }
    }

    Ok(ReliefMesh {
        positions,
        normals: normals.to_vec(),
        indices: base.shared_indices(),
    })
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::audio::reduce::reduce;
    use crate::mesh::surface::SurfaceParams;

    fn base(width: usize) -> BaseSurface {
        BaseSurface::generate(SurfaceParams {
            radius_top: 10.0,
            radius_bottom: 10.0,
            height: 100.0,
            width_segments: NonZeroUsize::new(width).unwrap(),
            height_segments: NonZeroUsize::new(100).unwrap(),
            caps: true,
        })
    }

    #[test]
    fn silence_leaves_the_surface_untouched() {
        let base = base(50);
        let magnitudes = reduce(&[0.0; 100], NonZeroUsize::new(50).unwrap());
        let mesh = deform(&base, &magnitudes, 100.0).unwrap();
        assert_eq!(mesh.positions(), base.positions());
    }

    #[test]
    fn full_scale_displaces_by_scaled_normal() {
        let base = base(50);
        let magnitudes = reduce(&[1.0; 100], NonZeroUsize::new(50).unwrap());
        let mesh = deform(&base, &magnitudes, 100.0).unwrap();

        for i in 0..base.side_vertex_count() {
            let expected = base.positions()[i] + base.normals()[i] * 100.0;
            assert_eq!(mesh.positions()[i], expected);
        }
        for i in base.side_vertex_count()..base.positions().len() {
            assert_eq!(mesh.positions()[i], base.positions()[i]);
        }
    }

    #[test]
    fn displacement_is_constant_along_each_segment() {
        let base = base(4);
        let magnitudes = MagnitudeSequence::from_values(vec![0.0, 0.1, 0.2, 0.3]);
        let mesh = deform(&base, &magnitudes, 10.0).unwrap();

        for segment in 0..4 {
            for ring in 0..base.ring_count() {
                let i = base.vertex_index(ring, segment);
                let offset = (mesh.positions()[i] - base.positions()[i]).length();
                assert!((offset - segment as f32).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn repeated_deformation_does_not_accumulate() {
        let base = base(50);
        let samples: Vec<f32> = (0..5000).map(|i| (i as f32 * 0.01).sin()).collect();
        let magnitudes = reduce(&samples, NonZeroUsize::new(50).unwrap());
        let first = deform(&base, &magnitudes, 100.0).unwrap();
        let second = deform(&base, &magnitudes, 100.0).unwrap();
        assert_eq!(first.positions(), second.positions());
    }

    #[test]
    fn keeps_base_normals_and_topology() {
        let base = base(12);
        let magnitudes = MagnitudeSequence::from_values(vec![0.5; 12]);
        let mesh = deform(&base, &magnitudes, 40.0).unwrap();
        assert_eq!(mesh.normals(), base.normals());
        assert_eq!(mesh.indices(), base.indices());
        assert!(mesh.shares_topology_with(&base));
    }

    #[test]
    fn rejects_mismatched_magnitude_count() {
        let base = base(50);
        let magnitudes = MagnitudeSequence::from_values(vec![0.5; 49]);
        let err = deform(&base, &magnitudes, 100.0).unwrap_err();
        assert_eq!(
            err,
            ContractViolation {
                expected: 50,
                actual: 49
            }
        );
    }
}
