//! Scene state management
//!
//! This module owns the loaded scene and its region arena. Regions are addressed
//! by integer IDs that are issued once per engine lifetime; a reload issues fresh
//! IDs, so stale IDs held by history or pending work simply stop resolving.

pub mod history;

use std::sync::Arc;

use shared::RegionLabel;

use crate::error::{EngineError, Result};
use crate::state::material::{Material, SharedMaterial};
use crate::viewport::mesh::Mesh;
use crate::viewport::picking::Aabb;

/// Stable region handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// One mesh, one root material, and the bounds of the mesh
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub name: String,
    pub mesh: Mesh,
    pub material: Material,
    pub bounds: Aabb,
}

impl Scene {
    pub fn new(name: impl Into<String>, mesh: Mesh, material: Material) -> Self {
        let bounds = mesh.aabb().unwrap_or_default();
        Self {
            name: name.into(),
            mesh,
            material,
            bounds,
        }
    }
}

/// A named index range of the mesh, before it has been given an ID
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSegment {
    pub name: String,
    pub label: RegionLabel,
    pub first_index: usize,
    pub index_count: usize,
    /// Material to start from; the scene's root material when `None`
    pub material: Option<Material>,
}

impl RegionSegment {
    pub fn named(name: impl Into<String>, first_index: usize, index_count: usize) -> Self {
        let name = name.into();
        Self {
            label: RegionLabel::infer(&name),
            name,
            first_index,
            index_count,
            material: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub label: RegionLabel,
    pub first_index: usize,
    pub index_count: usize,
    pub bounds: Aabb,
    material: SharedMaterial,
    original: SharedMaterial,
    display: Option<SharedMaterial>,
}

impl Region {
    /// Authoritative material, as edited and exported
    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    /// Material the region had when the scene was loaded
    pub fn original_material(&self) -> &SharedMaterial {
        &self.original
    }

    /// Material to draw: the selection highlight if any, else the real one
    pub fn displayed_material(&self) -> &SharedMaterial {
        self.display.as_ref().unwrap_or(&self.material)
    }

    pub fn is_highlighted(&self) -> bool {
        self.display.is_some()
    }
}

/// Loaded scene plus region arena
#[derive(Default)]
pub struct SceneState {
    scene: Option<Scene>,
    regions: Vec<Region>,
    next_region_id: u32,
    /// Monotonically increasing version counter for change detection
    version: u64,
}

impl SceneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current scene. Every segment becomes a region with a new ID
    /// and its own material allocation.
    pub fn load(&mut self, scene: Scene, segments: Vec<RegionSegment>) -> Result<Vec<RegionId>> {
        scene.mesh.check_integrity()?;

        let index_len = scene.mesh.indices.len();
        let segments = if segments.is_empty() {
            vec![RegionSegment::named(scene.name.clone(), 0, index_len)]
        } else {
            segments
        };

        for seg in &segments {
            if seg.first_index % 3 != 0
                || seg.index_count % 3 != 0
                || seg.first_index + seg.index_count > index_len
            {
                return Err(EngineError::Integrity(format!(
                    "region '{}' covers indices {}..{} of {}",
                    seg.name,
                    seg.first_index,
                    seg.first_index + seg.index_count,
                    index_len
                )));
            }
        }

        let mut regions = Vec::with_capacity(segments.len());
        for seg in segments {
            let id = RegionId(self.next_region_id);
            self.next_region_id += 1;

            let material = Arc::new(seg.material.unwrap_or_else(|| scene.material.clone()));
            let bounds = scene
                .mesh
                .aabb_of_range(seg.first_index, seg.index_count)
                .unwrap_or(scene.bounds);

            regions.push(Region {
                id,
                name: seg.name,
                label: seg.label,
                first_index: seg.first_index,
                index_count: seg.index_count,
                bounds,
                original: Arc::clone(&material),
                material,
                display: None,
            });
        }

        tracing::info!(
            "Loaded scene '{}' ({} vertices, {} triangles, {} regions)",
            scene.name,
            scene.mesh.vertex_count(),
            scene.mesh.triangle_count(),
            regions.len()
        );

        let ids = regions.iter().map(|r| r.id).collect();
        self.scene = Some(scene);
        self.regions = regions;
        self.version += 1;
        Ok(ids)
    }

    /// Drop the scene and all regions. Region IDs are not reused.
    pub fn unload(&mut self) {
        if self.scene.take().is_some() {
            tracing::info!("Scene unloaded");
        }
        self.regions.clear();
        self.version += 1;
    }

    pub fn is_loaded(&self) -> bool {
        self.scene.is_some()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// First region whose name matches exactly, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<RegionId> {
        let name = name.trim();
        self.regions
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .map(|r| r.id)
    }

    /// Union of all region bounds
    pub fn bounds(&self) -> Option<Aabb> {
        let mut iter = self.regions.iter().map(|r| r.bounds);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, b| acc.union(&b)))
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Swap a region's material, returning the previous one.
    pub(crate) fn replace_material(
        &mut self,
        id: RegionId,
        material: SharedMaterial,
    ) -> Option<SharedMaterial> {
        let region = self.regions.iter_mut().find(|r| r.id == id)?;
        let prior = std::mem::replace(&mut region.material, material);
        self.version += 1;
        Some(prior)
    }

    /// Restore every region to its load-time material.
    pub(crate) fn restore_originals(&mut self) {
        for region in &mut self.regions {
            region.material = Arc::clone(&region.original);
        }
        self.version += 1;
    }

    pub(crate) fn set_display(&mut self, id: RegionId, display: Option<SharedMaterial>) -> bool {
        match self.regions.iter_mut().find(|r| r.id == id) {
            Some(region) => {
                region.display = display;
                true
            }
            None => false,
        }
    }

    /// Region segments carrying the current materials, for export
    pub fn segments(&self) -> Vec<RegionSegment> {
        self.regions
            .iter()
            .map(|r| RegionSegment {
                name: r.name.clone(),
                label: r.label,
                first_index: r.first_index,
                index_count: r.index_count,
                material: Some(Material::clone(&r.material)),
            })
            .collect()
    }
}
