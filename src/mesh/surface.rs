//! Parametric cylinder shell that the relief is carved into.

use std::f32::consts::TAU;
use std::num::NonZeroUsize;
use std::sync::Arc;

use glam::Vec3;

/// Anything the exporter can turn into triangles.
pub trait TriangleMesh {
    fn positions(&self) -> &[Vec3];
    /// Triangle list, three indices per face, counter-clockwise seen from outside.
    fn indices(&self) -> &[u32];

    fn triangle_count(&self) -> usize {
        self.indices().len() / 3
    }
}

/// Shape of the undeformed cylinder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceParams {
    pub radius_top: f32,
    pub radius_bottom: f32,
    pub height: f32,
    pub width_segments: NonZeroUsize,
    pub height_segments: NonZeroUsize,
    pub caps: bool,
}

/// Undeformed cylinder side wall, optionally closed by two cap fans.
///
/// Side vertices are laid out ring by ring from the top, `width_segments`
/// per ring, so `(ring, segment)` lives at `ring * width_segments + segment`.
/// The circumference wraps; there is no duplicated seam vertex. When caps are
/// enabled the top and bottom centre vertices follow the side wall.
#[derive(Clone, Debug)]
pub struct BaseSurface {
    params: SurfaceParams,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Arc<[u32]>,
}

impl BaseSurface {
    pub fn generate(params: SurfaceParams) -> Self {
        let width = params.width_segments.get();
        let rings = params.height_segments.get() + 1;
        let half_height = params.height / 2.0;
        let slope = (params.radius_bottom - params.radius_top) / params.height;

        let side_count = rings * width;
        let cap_count = if params.caps { 2 } else { 0 };
        let mut positions = Vec::with_capacity(side_count + cap_count);
        let mut normals = Vec::with_capacity(side_count + cap_count);

        for ring in 0..rings {
            let v = ring as f32 / params.height_segments.get() as f32;
            let radius = v * (params.radius_bottom - params.radius_top) + params.radius_top;
            let y = half_height - v * params.height;

            for segment in 0..width {
                let theta = segment as f32 / width as f32 * TAU;
                let (sin, cos) = theta.sin_cos();
                positions.push(Vec3::new(radius * sin, y, radius * cos));
                normals.push(Vec3::new(sin, slope, cos).normalize());
            }
        }

        let mut indices: Vec<u32> = Vec::with_capacity(6 * width * (rings - 1) + 6 * width);
        let at = |ring: usize, segment: usize| (ring * width + segment % width) as u32;

        for ring in 0..rings - 1 {
            for segment in 0..width {
                let a = at(ring, segment);
                let b = at(ring + 1, segment);
                let c = at(ring + 1, segment + 1);
                let d = at(ring, segment + 1);
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        if params.caps {
            let top = positions.len() as u32;
            positions.push(Vec3::new(0.0, half_height, 0.0));
            normals.push(Vec3::Y);
            let bottom = positions.len() as u32;
            positions.push(Vec3::new(0.0, -half_height, 0.0));
            normals.push(Vec3::NEG_Y);

            let last = rings - 1;
            for segment in 0..width {
                indices.extend_from_slice(&[top, at(0, segment), at(0, segment + 1)]);
                indices.extend_from_slice(&[bottom, at(last, segment + 1), at(last, segment)]);
            }
        }

        log::debug!(
            "Generated base surface: {} vertices, {} triangles",
            positions.len(),
            indices.len() / 3
        );

        Self {
            params,
            positions,
            normals,
            indices: indices.into(),
        }
    }

    pub fn params(&self) -> &SurfaceParams {
        &self.params
    }

    pub fn width_segments(&self) -> usize {
        self.params.width_segments.get()
    }

    pub fn ring_count(&self) -> usize {
        self.params.height_segments.get() + 1
    }

    /// Index of side-wall vertex `(ring, segment)`.
    pub fn vertex_index(&self, ring: usize, segment: usize) -> usize {
        debug_assert!(ring < self.ring_count() && segment < self.width_segments());
        ring * self.width_segments() + segment
    }

    /// Number of leading vertices that belong to the side wall.
    pub fn side_vertex_count(&self) -> usize {
        self.ring_count() * self.width_segments()
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub(crate) fn shared_indices(&self) -> Arc<[u32]> {
        Arc::clone(&self.indices)
    }
}

impl TriangleMesh for BaseSurface {
    fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    fn indices(&self) -> &[u32] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(width: usize, height: usize, caps: bool) -> SurfaceParams {
        SurfaceParams {
            radius_top: 10.0,
            radius_bottom: 10.0,
            height: 100.0,
            width_segments: NonZeroUsize::new(width).unwrap(),
            height_segments: NonZeroUsize::new(height).unwrap(),
            caps,
        }
    }

    #[test]
    fn vertex_and_triangle_counts() {
        let open = BaseSurface::generate(params(50, 100, false));
        assert_eq!(open.positions().len(), 50 * 101);
        assert_eq!(open.triangle_count(), 2 * 50 * 100);

        let closed = BaseSurface::generate(params(50, 100, true));
        assert_eq!(closed.positions().len(), 50 * 101 + 2);
        assert_eq!(closed.triangle_count(), 2 * 50 * 100 + 2 * 50);
        assert_eq!(closed.side_vertex_count(), 50 * 101);
    }

    #[test]
    fn side_normals_are_unit_and_radial() {
        let surface = BaseSurface::generate(params(16, 4, true));
        for ring in 0..surface.ring_count() {
            for segment in 0..surface.width_segments() {
                let i = surface.vertex_index(ring, segment);
                let p = surface.positions()[i];
                let n = surface.normals()[i];
                assert!((n.length() - 1.0).abs() < 1e-5);
                assert!(n.y.abs() < 1e-6);
                let radial = Vec3::new(p.x, 0.0, p.z).normalize();
                assert!(radial.dot(n) > 0.9999);
            }
        }
    }

    #[test]
    fn rings_run_top_to_bottom() {
        let surface = BaseSurface::generate(params(8, 4, false));
        let top = surface.positions()[surface.vertex_index(0, 3)];
        let bottom = surface.positions()[surface.vertex_index(4, 3)];
        assert_eq!(top.y, 50.0);
        assert_eq!(bottom.y, -50.0);
        let segment_zero = surface.positions()[surface.vertex_index(2, 0)];
        assert!(segment_zero.x.abs() < 1e-6);
        assert!((segment_zero.z - 10.0).abs() < 1e-5);
    }

    #[test]
    fn cone_normals_tilt_with_slope() {
        let mut p = params(12, 3, false);
        p.radius_top = 5.0;
        p.radius_bottom = 15.0;
        let surface = BaseSurface::generate(p);
        for n in surface.normals() {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(n.y > 0.0);
        }
        let top = surface.positions()[surface.vertex_index(0, 0)];
        let bottom = surface.positions()[surface.vertex_index(3, 0)];
        assert!((top.z - 5.0).abs() < 1e-5);
        assert!((bottom.z - 15.0).abs() < 1e-5);
    }

    #[test]
    fn indices_wrap_around_the_circumference() {
        let surface = BaseSurface::generate(params(6, 2, true));
        let count = surface.positions().len() as u32;
        assert!(surface.indices().iter().all(|&i| i < count));
        // the last quad of ring 0 closes back onto segment 0
        let last_quad = &surface.indices()[6 * 5..6 * 6];
        assert!(last_quad.contains(&0));
    }

    #[test]
    fn caps_share_the_outer_rings() {
        let surface = BaseSurface::generate(params(10, 5, true));
        let top_centre = surface.side_vertex_count() as u32;
        let cap_triangles: Vec<&[u32]> = surface
            .indices()
            .chunks_exact(3)
            .filter(|t| t[0] == top_centre)
            .collect();
        assert_eq!(cap_triangles.len(), 10);
        for t in cap_triangles {
            assert!((t[1] as usize) < surface.width_segments());
            assert!((t[2] as usize) < surface.width_segments());
        }
    }
}
