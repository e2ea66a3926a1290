//! Surface aggregation: merge captured fragments into one mesh.
//!
//! Fragments are appended in order. Each fragment's indices are rebased by the
//! number of vertices already appended, and each contributing fragment becomes
//! one region segment. Co-located vertices at fragment seams are kept as is.

pub mod relief;

use glam::{EulerRot, Mat3, Mat4, Quat, Vec2, Vec3};
use shared::{Fragment, Transform};

use crate::error::{EngineError, Result};
use crate::state::material::Material;
use crate::state::scene::{RegionSegment, Scene};
use crate::viewport::mesh::Mesh;
use crate::viewport::picking::Aabb;

/// Output of [`combine`]: the merged mesh, its bounds and one segment per
/// contributing fragment.
#[derive(Clone, Debug)]
pub struct CombinedSurface {
    pub mesh: Mesh,
    pub bounds: Aabb,
    pub segments: Vec<RegionSegment>,
}

impl CombinedSurface {
    pub fn into_scene(self, name: impl Into<String>, material: Material) -> (Scene, Vec<RegionSegment>) {
        let mut scene = Scene::new(name, self.mesh, material);
        scene.bounds = self.bounds;
        (scene, self.segments)
    }
}

/// World matrix of a fragment: translation · rotation (XYZ Euler) · scale.
pub fn transform_matrix(t: &Transform) -> Mat4 {
    let [rx, ry, rz] = t.rotation;
    Mat4::from_scale_rotation_translation(
        Vec3::from_array(t.scale),
        Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
        Vec3::from_array(t.position),
    )
}

/// Merge fragments into a single mesh in the world frame.
///
/// Fragments without vertices are skipped. Normals and UVs are carried only
/// when every contributing fragment has them.
pub fn combine(fragments: &[Fragment]) -> Result<CombinedSurface> {
    if fragments.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    let contributing: Vec<&Fragment> = fragments
        .iter()
        .filter(|f| {
            if f.vertices.is_empty() {
                tracing::debug!("Skipping empty fragment '{}'", f.name);
            }
            !f.vertices.is_empty()
        })
        .collect();
    if contributing.is_empty() {
        return Err(EngineError::EmptyInput);
    }

    for fragment in &contributing {
        validate_fragment(fragment)?;
    }

    let vertex_total: usize = contributing.iter().map(|f| f.vertex_count()).sum();
    if vertex_total > u32::MAX as usize {
        return Err(EngineError::InvalidInput(format!(
            "{vertex_total} vertices exceed the 32-bit index range"
        )));
    }
    let index_total: usize = contributing.iter().map(|f| f.indices.len()).sum();
    let with_normals = contributing.iter().all(|f| f.normals.is_some());
    let with_uvs = contributing.iter().all(|f| f.uvs.is_some());

    let mut positions = Vec::with_capacity(vertex_total);
    let mut normals = with_normals.then(|| Vec::with_capacity(vertex_total));
    let mut uvs = with_uvs.then(|| Vec::with_capacity(vertex_total));
    let mut indices = Vec::with_capacity(index_total);
    let mut segments = Vec::with_capacity(contributing.len());

    for fragment in contributing {
        let offset = positions.len() as u32;
        let matrix = transform_matrix(&fragment.transform);

        positions.extend(
            fragment
                .vertices
                .iter()
                .map(|v| matrix.transform_point3(Vec3::from_array(*v))),
        );

        if let (Some(out), Some(src)) = (normals.as_mut(), fragment.normals.as_ref()) {
            let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();
            out.extend(src.iter().map(|n| {
                (normal_matrix * Vec3::from_array(*n))
                    .try_normalize()
                    .unwrap_or(Vec3::Y)
            }));
        }

        if let (Some(out), Some(src)) = (uvs.as_mut(), fragment.uvs.as_ref()) {
            out.extend(src.iter().map(|uv| Vec2::from_array(*uv)));
        }

        let first_index = indices.len();
        indices.extend(fragment.indices.iter().map(|i| i + offset));
        if !fragment.indices.is_empty() {
            segments.push(RegionSegment::named(
                fragment.name.clone(),
                first_index,
                fragment.indices.len(),
            ));
        }

        tracing::debug!(
            "Appended fragment '{}' ({} vertices at offset {})",
            fragment.name,
            fragment.vertex_count(),
            offset
        );
    }

    let mesh = Mesh {
        positions,
        normals,
        uvs,
        indices,
    };
    let bounds = mesh.aabb().unwrap_or_default();

    Ok(CombinedSurface {
        mesh,
        bounds,
        segments,
    })
}

fn validate_fragment(fragment: &Fragment) -> Result<()> {
    let n = fragment.vertex_count();
    let invalid = |what: String| EngineError::InvalidInput(format!("fragment '{}': {what}", fragment.name));

    if fragment.indices.len() % 3 != 0 {
        return Err(invalid(format!(
            "{} indices is not a whole number of triangles",
            fragment.indices.len()
        )));
    }
    if let Some(&bad) = fragment.indices.iter().find(|&&i| i as usize >= n) {
        return Err(invalid(format!("index {bad} out of range for {n} vertices")));
    }
    if let Some(normals) = &fragment.normals {
        if normals.len() != n {
            return Err(invalid(format!("{} normals for {n} vertices", normals.len())));
        }
    }
    if let Some(uvs) = &fragment.uvs {
        if uvs.len() != n {
            return Err(invalid(format!("{} UVs for {n} vertices", uvs.len())));
        }
    }
    Ok(())
}
