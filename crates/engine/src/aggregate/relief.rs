//! Relief fragments from depth grids.
//!
//! A depth model produces one relative depth sample per pixel. The grid is laid
//! out facing the viewer: x spans the image width scaled by its aspect ratio,
//! y runs from +0.5 at the top row to -0.5 at the bottom, and z pushes each
//! sample forward by its normalized depth.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use shared::{Fragment, Transform};

use crate::error::{EngineError, Result};
use crate::viewport::mesh::compute_vertex_normals;

/// Largest accepted grid side, in samples
pub const MAX_DEPTH_SIDE: usize = 8192;

/// Row-major grid of relative depth samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthMap {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl DepthMap {
    pub fn new(width: usize, height: usize, values: Vec<f32>) -> Self {
        Self {
            width,
            height,
            values,
        }
    }

    /// Samples rescaled to `[0, 1]`. A flat grid maps to all zeros.
    pub fn normalized(&self) -> Vec<f32> {
        let (min, max) = self
            .values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = max - min;
        if range > 0.0 {
            self.values.iter().map(|v| (v - min) / range).collect()
        } else {
            vec![0.0; self.values.len()]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefOptions {
    /// Forward displacement of the nearest sample
    pub depth_scale: f32,
    /// Sample every `step`-th pixel in both directions
    pub step: usize,
}

impl Default for ReliefOptions {
    fn default() -> Self {
        Self {
            depth_scale: 0.8,
            step: 1,
        }
    }
}

/// Build a grid fragment from a depth map.
pub fn relief_fragment(name: &str, map: &DepthMap, options: ReliefOptions) -> Result<Fragment> {
    let invalid = |msg: String| EngineError::InvalidInput(format!("depth map '{name}': {msg}"));

    if map.width > MAX_DEPTH_SIDE || map.height > MAX_DEPTH_SIDE {
        return Err(invalid(format!(
            "{}x{} grid exceeds {MAX_DEPTH_SIDE} samples per side",
            map.width, map.height
        )));
    }
    if map.width.checked_mul(map.height) != Some(map.values.len()) {
        return Err(invalid(format!(
            "{} samples for a {}x{} grid",
            map.values.len(),
            map.width,
            map.height
        )));
    }
    if options.step == 0 {
        return Err(invalid("step must be at least 1".into()));
    }
    if map.values.iter().any(|v| !v.is_finite()) {
        return Err(invalid("non-finite depth sample".into()));
    }

    let xs: Vec<usize> = (0..map.width).step_by(options.step).collect();
    let ys: Vec<usize> = (0..map.height).step_by(options.step).collect();
    let (grid_w, grid_h) = (xs.len(), ys.len());
    if grid_w < 2 || grid_h < 2 {
        return Err(invalid(format!("{grid_w}x{grid_h} samples is too small for a surface")));
    }

    let depth = map.normalized();
    let width = map.width as f32;
    let height = map.height as f32;
    let aspect = width / height;
    let u_span = (map.width - 1) as f32;
    let v_span = (map.height - 1) as f32;

    let mut vertices = Vec::with_capacity(grid_w * grid_h);
    let mut uvs = Vec::with_capacity(grid_w * grid_h);
    for &y in &ys {
        for &x in &xs {
            let d = depth[y * map.width + x];
            vertices.push([
                (x as f32 / width - 0.5) * aspect,
                0.5 - y as f32 / height,
                d * options.depth_scale,
            ]);
            uvs.push([x as f32 / u_span, y as f32 / v_span]);
        }
    }

    let mut indices = Vec::with_capacity((grid_w - 1) * (grid_h - 1) * 6);
    for row in 0..grid_h - 1 {
        for col in 0..grid_w - 1 {
            let tl = (row * grid_w + col) as u32;
            let tr = tl + 1;
            let bl = tl + grid_w as u32;
            let br = bl + 1;
            indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
        }
    }

    let positions: Vec<Vec3> = vertices.iter().map(|v| Vec3::from_array(*v)).collect();
    let normals = compute_vertex_normals(&positions, &indices)
        .into_iter()
        .map(|n| n.to_array())
        .collect();

    tracing::debug!(
        "Relief '{}': {}x{} grid, {} triangles",
        name,
        grid_w,
        grid_h,
        indices.len() / 3
    );

    Ok(Fragment {
        name: name.to_string(),
        vertices,
        normals: Some(normals),
        uvs: Some(uvs),
        indices,
        transform: Transform::new(),
    })
}
