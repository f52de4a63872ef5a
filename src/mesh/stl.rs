//! Binary STL writer.
//!
//! Layout: 80-byte header, little-endian `u32` triangle count, then per
//! triangle a face normal, three vertices (all `f32` triples) and a zero
//! `u16` attribute word, 50 bytes in total.

use std::io::Write;

use glam::Vec3;

use super::surface::TriangleMesh;
use crate::error::ExportError;

pub const HEADER_LEN: usize = 80;
pub const TRIANGLE_LEN: usize = 50;

// Must not start with "solid" or readers may sniff the file as ASCII STL.
const HEADER_TAG: &[u8] = b"sonoterra binary STL";

/// Size in bytes of a binary STL holding `triangles` faces.
pub fn encoded_len(triangles: usize) -> usize {
    HEADER_LEN + 4 + TRIANGLE_LEN * triangles
}

/// Write `mesh` as binary STL, faces in index-buffer order.
pub fn write_binary<M, W>(mesh: &M, mut out: W) -> Result<(), ExportError>
where
    M: TriangleMesh + ?Sized,
    W: Write,
{
    let positions = mesh.positions();
    let indices = mesh.indices();

    if indices.len() % 3 != 0 {
        return Err(ExportError::RaggedIndices(indices.len()));
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(ExportError::IndexOutOfRange {
            index,
            vertex_count: positions.len(),
        });
    }

    let triangles = indices.len() / 3;
    let count = u32::try_from(triangles).map_err(|_| ExportError::TooManyTriangles(triangles))?;

    let mut header = [0u8; HEADER_LEN];
    header[..HEADER_TAG.len()].copy_from_slice(HEADER_TAG);
    out.write_all(&header)?;
    out.write_all(&count.to_le_bytes())?;

    let mut record = [0u8; TRIANGLE_LEN];
    for face in indices.chunks_exact(3) {
        let [a, b, c] = [0, 1, 2].map(|k| positions[face[k] as usize]);
        let normal = face_normal(a, b, c);

        for (slot, v) in record.chunks_exact_mut(12).zip([normal, a, b, c]) {
            for (bytes, component) in slot.chunks_exact_mut(4).zip(v.to_array()) {
                bytes.copy_from_slice(&component.to_le_bytes());
            }
        }
        record[48..].copy_from_slice(&0u16.to_le_bytes());
        out.write_all(&record)?;
    }

    out.flush()?;
    Ok(())
}

/// Encode `mesh` into a fresh buffer.
pub fn export_binary<M: TriangleMesh + ?Sized>(mesh: &M) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::with_capacity(encoded_len(mesh.triangle_count()));
    write_binary(mesh, &mut bytes)?;
    Ok(bytes)
}

/// Unit normal of a counter-clockwise triangle, zero when degenerate.
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::audio::reduce::MagnitudeSequence;
    use crate::mesh::relief::{deform, ReliefMesh};
    use crate::mesh::surface::{BaseSurface, SurfaceParams};

    struct Soup {
        positions: Vec<Vec3>,
        indices: Vec<u32>,
    }

    impl TriangleMesh for Soup {
        fn positions(&self) -> &[Vec3] {
            &self.positions
        }

        fn indices(&self) -> &[u32] {
            &self.indices
        }
    }

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn surface() -> BaseSurface {
        BaseSurface::generate(SurfaceParams {
            radius_top: 10.0,
            radius_bottom: 10.0,
            height: 100.0,
            width_segments: NonZeroUsize::new(50).unwrap(),
            height_segments: NonZeroUsize::new(100).unwrap(),
            caps: true,
        })
    }

    #[test]
    fn empty_mesh_is_header_and_zero_count() {
        let bytes = export_binary(&ReliefMesh::default()).unwrap();
        assert_eq!(bytes.len(), 84);
        assert_eq!(&bytes[80..84], &[0, 0, 0, 0]);
        assert!(!bytes.starts_with(b"solid"));
    }

    #[test]
    fn length_matches_declared_triangle_count() {
        let base = surface();
        let mesh = deform(&base, &MagnitudeSequence::from_values(vec![0.3; 50]), 100.0).unwrap();
        let bytes = export_binary(&mesh).unwrap();

        let declared = u32::from_le_bytes(bytes[80..84].try_into().unwrap()) as usize;
        assert_eq!(declared, mesh.triangle_count());
        assert_eq!(declared, 2 * 50 * 100 + 2 * 50);
        assert_eq!(bytes.len(), encoded_len(declared));
        assert_eq!(bytes.len(), 80 + 4 + 50 * declared);
    }

    #[test]
    fn writes_normal_vertices_and_zero_attribute() {
        let soup = Soup {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            indices: vec![0, 1, 2],
        };
        let bytes = export_binary(&soup).unwrap();
        assert_eq!(bytes.len(), 134);

        let record = &bytes[84..];
        let normal = [0, 4, 8].map(|o| read_f32(record, o));
        assert_eq!(normal, [0.0, 0.0, 1.0]);
        let second_vertex = [24, 28, 32].map(|o| read_f32(record, o));
        assert_eq!(second_vertex, [1.0, 0.0, 0.0]);
        assert_eq!(&record[48..50], &[0, 0]);
    }

    #[test]
    fn side_faces_point_outward() {
        let base = surface();
        let side_triangles = 2 * 50 * 100;
        for face in base.indices().chunks_exact(3).take(side_triangles) {
            let [a, b, c] = [0, 1, 2].map(|k| base.positions()[face[k] as usize]);
            let centroid = (a + b + c) / 3.0;
            let outward = Vec3::new(centroid.x, 0.0, centroid.z);
            assert!(face_normal(a, b, c).dot(outward) > 0.0);
        }
    }

    #[test]
    fn cap_faces_point_away_from_the_middle() {
        let base = surface();
        for face in base.indices().chunks_exact(3).skip(2 * 50 * 100) {
            let [a, b, c] = [0, 1, 2].map(|k| base.positions()[face[k] as usize]);
            let n = face_normal(a, b, c);
            assert!(n.y * a.y > 0.0);
        }
    }

    #[test]
    fn output_is_deterministic() {
        let base = surface();
        let mesh = deform(&base, &MagnitudeSequence::from_values(vec![0.7; 50]), 100.0).unwrap();
        assert_eq!(export_binary(&mesh).unwrap(), export_binary(&mesh).unwrap());
    }

    #[test]
    fn degenerate_triangle_gets_zero_normal() {
        assert_eq!(face_normal(Vec3::X, Vec3::X, Vec3::Y), Vec3::ZERO);
    }

    #[test]
    fn rejects_malformed_index_buffers() {
        let ragged = Soup {
            positions: vec![Vec3::ZERO; 3],
            indices: vec![0, 1],
        };
        assert!(matches!(export_binary(&ragged), Err(ExportError::RaggedIndices(2))));

        let dangling = Soup {
            positions: vec![Vec3::ZERO; 3],
            indices: vec![0, 1, 3],
        };
        assert!(matches!(
            export_binary(&dangling),
            Err(ExportError::IndexOutOfRange { index: 3, vertex_count: 3 })
        ));
    }
}
