use std::sync::Arc;

use crate::state::material::SharedMaterial;
use crate::state::scene::{RegionId, SceneState};

/// The selected region and the material it showed before highlighting
#[derive(Clone, Debug)]
pub struct Selection {
    pub region: RegionId,
    pub stored: SharedMaterial,
}

/// Single-region selection with an emissive highlight.
///
/// The highlight lives in the region's display slot, so the authoritative
/// material and the edit history never see it.
pub struct SelectionState {
    selected: Option<Selection>,
    tint: [f32; 3],
    intensity: f32,
    /// Version counter for selection changes
    pub version: u64,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new([0.0, 0.86, 1.0], 0.35)
    }
}

impl SelectionState {
    pub fn new(tint: [f32; 3], intensity: f32) -> Self {
        Self {
            selected: None,
            tint,
            intensity,
            version: 0,
        }
    }

    pub fn selected(&self) -> Option<&Selection> {
        self.selected.as_ref()
    }

    pub fn region(&self) -> Option<RegionId> {
        self.selected.as_ref().map(|s| s.region)
    }

    pub fn is_selected(&self, id: RegionId) -> bool {
        self.region() == Some(id)
    }

    /// Select a region, replacing any previous selection. Returns false if the
    /// region does not exist.
    pub fn select(&mut self, scene: &mut SceneState, id: RegionId) -> bool {
        let Some(region) = scene.region(id) else {
            return false;
        };
        let stored = Arc::clone(region.material());
        self.deselect(scene);
        self.highlight(scene, id, &stored);
        self.selected = Some(Selection { region: id, stored });
        self.version += 1;
        true
    }

    /// Clear the selection, restoring the stored material as the displayed one.
    pub fn deselect(&mut self, scene: &mut SceneState) -> Option<RegionId> {
        let selection = self.selected.take()?;
        scene.set_display(selection.region, None);
        self.version += 1;
        Some(selection.region)
    }

    /// Re-derive the highlight after the selected region's material changed.
    pub fn refresh(&mut self, scene: &mut SceneState) {
        let Some(id) = self.region() else {
            return;
        };
        match scene.region(id).map(|r| Arc::clone(r.material())) {
            Some(current) => {
                self.highlight(scene, id, &current);
                if let Some(selection) = self.selected.as_mut() {
                    selection.stored = current;
                }
            }
            None => {
                // Region vanished with a reload
                self.selected = None;
                self.version += 1;
            }
        }
    }

    /// Forget the selection without touching the scene
    pub fn clear(&mut self) {
        if self.selected.take().is_some() {
            self.version += 1;
        }
    }

    fn highlight(&self, scene: &mut SceneState, id: RegionId, base: &SharedMaterial) {
        let lit = Arc::new(base.highlighted(self.tint, self.intensity));
        scene.set_display(id, Some(lit));
    }
}
