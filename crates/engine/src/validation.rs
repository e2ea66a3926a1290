//! Mesh validation utilities.
//!
//! `MeshValidator` provides methods to check mesh data integrity:
//! attribute counts, in-range indices, normalized normals, AABB dimensions, etc.

use crate::viewport::mesh::Mesh;
use crate::viewport::picking::Aabb;

/// Validator for `Mesh` integrity checks.
pub struct MeshValidator<'a> {
    mesh: &'a Mesh,
}

impl<'a> MeshValidator<'a> {
    /// Create a new validator for the given mesh.
    pub fn new(mesh: &'a Mesh) -> Self {
        Self { mesh }
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.indices.len() / 3
    }

    /// Check that normals and UVs, when present, have one entry per vertex.
    pub fn are_attributes_aligned(&self) -> bool {
        let n = self.vertex_count();
        self.mesh.normals.as_ref().is_none_or(|v| v.len() == n)
            && self.mesh.uvs.as_ref().is_none_or(|v| v.len() == n)
    }

    /// Check that the index buffer length is a multiple of 3.
    pub fn is_index_stride_valid(&self) -> bool {
        self.mesh.indices.len() % 3 == 0
    }

    /// Check that all indices are within the valid vertex range.
    pub fn are_indices_in_range(&self) -> bool {
        let max_idx = self.vertex_count();
        self.mesh.indices.iter().all(|&i| (i as usize) < max_idx)
    }

    /// Check that every position is finite.
    pub fn are_positions_finite(&self) -> bool {
        self.mesh.positions.iter().all(|p| p.is_finite())
    }

    /// Check that all vertex normals have unit length (within epsilon).
    pub fn are_normals_normalized(&self, epsilon: f32) -> bool {
        self.mesh
            .normals
            .as_ref()
            .is_none_or(|normals| normals.iter().all(|n| (n.length() - 1.0).abs() <= epsilon))
    }

    /// Compute the axis-aligned bounding box of the mesh.
    pub fn aabb(&self) -> Aabb {
        self.mesh.aabb().unwrap_or_default()
    }

    /// Compute the dimensions (width, height, depth) of the bounding box.
    pub fn dimensions(&self) -> [f32; 3] {
        self.aabb().extent().to_array()
    }

    /// Check that the AABB dimensions are approximately equal to `expected`.
    pub fn assert_dimensions_approx(&self, expected: [f32; 3], tolerance: f32) -> bool {
        let dims = self.dimensions();
        (dims[0] - expected[0]).abs() < tolerance
            && (dims[1] - expected[1]).abs() < tolerance
            && (dims[2] - expected[2]).abs() < tolerance
    }

    /// Run the structural checks and return a list of error messages.
    /// An empty list means the mesh is valid.
    ///
    /// Normal length is not checked here; it is a quality property, not a
    /// structural one.
    pub fn validate_all(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.are_attributes_aligned() {
            errors.push(format!(
                "Attribute counts (normals={:?}, uvs={:?}) do not match vertex count {}",
                self.mesh.normals.as_ref().map(Vec::len),
                self.mesh.uvs.as_ref().map(Vec::len),
                self.vertex_count()
            ));
        }

        if !self.is_index_stride_valid() {
            errors.push(format!(
                "Index buffer length {} is not a multiple of 3",
                self.mesh.indices.len()
            ));
        }

        if !self.are_indices_in_range() {
            let max_idx = self.vertex_count();
            let out_of_range: Vec<_> = self
                .mesh
                .indices
                .iter()
                .filter(|&&i| i as usize >= max_idx)
                .take(5)
                .collect();
            errors.push(format!(
                "Indices out of range (vertex_count={}): {:?}",
                max_idx, out_of_range
            ));
        }

        if !self.are_positions_finite() {
            errors.push("Some positions are NaN or infinite".to_string());
        }

        errors
    }
}
