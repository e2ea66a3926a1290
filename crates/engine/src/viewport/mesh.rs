use glam::{Vec2, Vec3};

use crate::error::{EngineError, Result};
use crate::validation::MeshValidator;

use super::picking::Aabb;

/// Largest vertex count still addressable with 16-bit indices.
pub const MAX_U16_VERTICES: usize = u16::MAX as usize;

/// Storage width of the triangle index list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    pub fn for_vertex_count(count: usize) -> Self {
        if count <= MAX_U16_VERTICES {
            IndexWidth::U16
        } else {
            IndexWidth::U32
        }
    }

    pub fn byte_size(&self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// CPU-side triangle mesh with optional per-vertex normals and UVs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn index_width(&self) -> IndexWidth {
        IndexWidth::for_vertex_count(self.vertex_count())
    }

    /// Bounds of all vertices; `None` for an empty mesh.
    pub fn aabb(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Bounds of the vertices referenced by an index range.
    pub fn aabb_of_range(&self, first_index: usize, index_count: usize) -> Option<Aabb> {
        let end = (first_index + index_count).min(self.indices.len());
        let range = self.indices.get(first_index..end)?;
        Aabb::from_points(
            range
                .iter()
                .filter_map(|&i| self.positions.get(i as usize).copied()),
        )
    }

    /// Corner positions of triangle `tri`, or `None` if any index is dangling.
    pub fn triangle(&self, tri: usize) -> Option<[Vec3; 3]> {
        let base = tri * 3;
        let idx = self.indices.get(base..base + 3)?;
        Some([
            *self.positions.get(idx[0] as usize)?,
            *self.positions.get(idx[1] as usize)?,
            *self.positions.get(idx[2] as usize)?,
        ])
    }

    /// Check the structural invariants, reporting the first few violations.
    pub fn check_integrity(&self) -> Result<()> {
        let errors = MeshValidator::new(self).validate_all();
        if errors.is_empty() {
            Ok(())
        } else {
            tracing::error!("Mesh integrity check failed: {}", errors.join("; "));
            Err(EngineError::Integrity(errors.join("; ")))
        }
    }
}

/// Area-weighted vertex normals for a triangle list.
///
/// Vertices touched only by degenerate triangles get +Y.
pub fn compute_vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        // Unnormalized cross product weights by triangle area
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}
