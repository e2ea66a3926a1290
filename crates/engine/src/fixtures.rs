//! Factory functions for creating test data.
//!
//! Provides small captured rooms and fragments for unit tests, integration
//! tests and local experiments with the engine.

use glam::Vec3;
use shared::{Fragment, Transform};

use crate::aggregate::combine;
use crate::state::material::Material;
use crate::state::scene::{RegionId, RegionSegment, Scene, SceneState};

// ── Fragment factories ──────────────────────────────────────────

/// A flat quad with corners in counter-clockwise order, with normals and UVs.
pub fn quad_fragment(name: &str, corners: [Vec3; 4]) -> Fragment {
    let normal = (corners[1] - corners[0])
        .cross(corners[2] - corners[0])
        .try_normalize()
        .unwrap_or(Vec3::Y);
    Fragment {
        name: name.to_string(),
        vertices: corners.iter().map(|c| c.to_array()).collect(),
        normals: Some(vec![normal.to_array(); 4]),
        uvs: Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
        indices: vec![0, 1, 2, 0, 2, 3],
        transform: Transform::new(),
    }
}

/// A zig-zag triangle strip of `count` vertices in the XY plane, without
/// normals or UVs. Needs at least 3 vertices to carry a triangle.
pub fn strip_fragment(name: &str, count: usize) -> Fragment {
    let vertices = (0..count)
        .map(|i| [(i / 2) as f32, (i % 2) as f32, 0.0])
        .collect();
    let indices = (0..count.saturating_sub(2) as u32)
        .flat_map(|i| [i, i + 1, i + 2])
        .collect();
    Fragment {
        name: name.to_string(),
        vertices,
        normals: None,
        uvs: None,
        indices,
        transform: Transform::new(),
    }
}

/// An axis-aligned box centered on the origin, placed by its transform.
pub fn box_fragment(name: &str, size: Vec3, position: Vec3) -> Fragment {
    let h = size * 0.5;
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        let center = normal * h;
        let (du, dv) = (u * h, v * h);
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push((center + du * su + dv * sv).to_array());
            normals.push(normal.to_array());
            uvs.push([(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Fragment {
        name: name.to_string(),
        vertices,
        normals: Some(normals),
        uvs: Some(uvs),
        indices,
        transform: Transform::at(position.to_array()),
    }
}

/// Fragments of a `width × depth × height` room centered on the origin in
/// XZ, floor at y = 0: four walls, floor, ceiling and a sofa in one corner.
pub fn room_fragments(width: f32, depth: f32, height: f32) -> Vec<Fragment> {
    let (x, z, y) = (width * 0.5, depth * 0.5, height);
    let p = Vec3::new;
    vec![
        quad_fragment("wall_north", [p(-x, 0.0, -z), p(x, 0.0, -z), p(x, y, -z), p(-x, y, -z)]),
        quad_fragment("wall_south", [p(x, 0.0, z), p(-x, 0.0, z), p(-x, y, z), p(x, y, z)]),
        quad_fragment("wall_east", [p(x, 0.0, -z), p(x, 0.0, z), p(x, y, z), p(x, y, -z)]),
        quad_fragment("wall_west", [p(-x, 0.0, z), p(-x, 0.0, -z), p(-x, y, -z), p(-x, y, z)]),
        quad_fragment("floor", [p(-x, 0.0, -z), p(-x, 0.0, z), p(x, 0.0, z), p(x, 0.0, -z)]),
        quad_fragment("ceiling", [p(-x, y, -z), p(x, y, -z), p(x, y, z), p(-x, y, z)]),
        box_fragment(
            "sofa",
            Vec3::new(width * 0.2, height * 0.3, depth * 0.2),
            Vec3::new(x * 0.7, height * 0.15, -z * 0.7),
        ),
    ]
}

// ── Scene factories ─────────────────────────────────────────────

/// The room from [`room_fragments`] combined into a scene with its segments.
pub fn box_room_scene(width: f32, depth: f32, height: f32) -> (Scene, Vec<RegionSegment>) {
    match combine(&room_fragments(width, depth, height)) {
        Ok(surface) => surface.into_scene("room", Material::default()),
        Err(e) => unreachable!("room fragments are well formed: {e}"),
    }
}

/// A 4 × 3 × 2.5 room loaded into a fresh scene state.
pub fn loaded_room() -> (SceneState, Vec<RegionId>) {
    let (scene, segments) = box_room_scene(4.0, 3.0, 2.5);
    let mut state = SceneState::new();
    match state.load(scene, segments) {
        Ok(ids) => (state, ids),
        Err(e) => unreachable!("room scene is well formed: {e}"),
    }
}

/// A single-region mesh with exactly `count` vertices, for index-width tests.
pub fn vertex_count_scene(count: usize) -> Scene {
    let fragment = strip_fragment("strip", count);
    match combine(&[fragment]) {
        Ok(surface) => surface.into_scene("strip", Material::default()).0,
        Err(e) => unreachable!("strip fragment is well formed: {e}"),
    }
}
