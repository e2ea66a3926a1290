use glam::Vec3;

use crate::state::scene::{RegionId, SceneState};

use super::mesh::Mesh;

/// A ray in world space
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a point set; `None` when the set is empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// Center of the bounding box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Size along each axis
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f32 {
        self.extent().max_element()
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn approx_eq(&self, other: &Aabb, tolerance: f32) -> bool {
        self.min.abs_diff_eq(other.min, tolerance) && self.max.abs_diff_eq(other.max, tolerance)
    }
}

/// Ray-AABB intersection using the slab method.
/// Returns the distance along the ray to the nearest hit, or None.
pub fn ray_aabb(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    let inv_dir = ray.direction.recip();

    let t1 = (aabb.min - ray.origin) * inv_dir;
    let t2 = (aabb.max - ray.origin) * inv_dir;

    let tmin = t1.min(t2).max_element();
    let tmax = t1.max(t2).min_element();

    if tmax < 0.0 || tmin > tmax {
        return None;
    }

    Some(if tmin < 0.0 { tmax } else { tmin })
}

/// Möller-Trumbore ray-triangle intersection algorithm.
/// Returns the distance along the ray if hit, or None if no intersection.
pub fn ray_triangle_intersect(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);

    // Intersection is behind ray origin
    if t > EPSILON {
        Some(t)
    } else {
        None
    }
}

/// Nearest triangle hit inside an index range of a mesh.
pub fn pick_triangle_in_range(
    ray: &Ray,
    mesh: &Mesh,
    first_index: usize,
    index_count: usize,
) -> Option<f32> {
    let first_tri = first_index / 3;
    let tri_count = index_count / 3;

    (first_tri..first_tri + tri_count)
        .filter_map(|tri| mesh.triangle(tri))
        .filter_map(|[v0, v1, v2]| ray_triangle_intersect(ray, v0, v1, v2))
        .min_by(f32::total_cmp)
}

/// Result of picking a region
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionHit {
    pub region: RegionId,
    /// Distance from ray origin to hit point
    pub distance: f32,
}

/// Pick the nearest region whose triangles are intersected by the ray.
///
/// Region bounds act as a broad phase; candidates are visited front to back
/// so regions behind the current best hit are skipped.
pub fn pick_region(ray: &Ray, scene: &SceneState) -> Option<RegionHit> {
    let mesh = &scene.scene()?.mesh;

    let mut candidates: Vec<(f32, RegionId, usize, usize)> = scene
        .regions()
        .iter()
        .filter_map(|r| {
            // Entry distance; zero when the ray starts inside the box
            let entry = if r.bounds.contains(ray.origin) {
                0.0
            } else {
                ray_aabb(ray, &r.bounds)?
            };
            Some((entry, r.id, r.first_index, r.index_count))
        })
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut best: Option<RegionHit> = None;
    for (entry, id, first, count) in candidates {
        if best.is_some_and(|b| entry > b.distance) {
            break;
        }
        if let Some(dist) = pick_triangle_in_range(ray, mesh, first, count) {
            if best.is_none_or(|b| dist < b.distance) {
                best = Some(RegionHit {
                    region: id,
                    distance: dist,
                });
            }
        }
    }

    best
}
