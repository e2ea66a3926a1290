//! Undo/redo functionality

use std::collections::VecDeque;
use std::sync::Arc;

use crate::state::editor::EditProperty;
use crate::state::material::SharedMaterial;

use super::{RegionId, SceneState};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Material swap performed on one region by an edit
#[derive(Debug, Clone)]
pub struct MaterialChange {
    pub region: RegionId,
    pub before: SharedMaterial,
    pub after: SharedMaterial,
}

/// One successful edit, with enough state to revert and reapply it
#[derive(Debug, Clone)]
pub struct EditRecord {
    pub selector: String,
    pub property: EditProperty,
    pub value: String,
    pub changes: Vec<MaterialChange>,
}

impl EditRecord {
    /// Affected region IDs
    pub fn regions(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.changes.iter().map(|c| c.region)
    }

    fn revert(&self, scene: &mut SceneState) {
        for change in &self.changes {
            scene.replace_material(change.region, Arc::clone(&change.before));
        }
    }

    fn reapply(&self, scene: &mut SceneState) {
        for change in &self.changes {
            scene.replace_material(change.region, Arc::clone(&change.after));
        }
    }
}

/// Bounded undo stack plus redo stack
#[derive(Debug)]
pub struct EditHistory {
    undo_stack: VecDeque<EditRecord>,
    redo_stack: Vec<EditRecord>,
    limit: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl EditHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record a new edit; invalidates redo and evicts the oldest entry past the bound.
    pub fn push(&mut self, record: EditRecord) {
        self.redo_stack.clear();
        self.push_undo(record);
    }

    fn push_undo(&mut self, record: EditRecord) {
        if self.limit == 0 {
            return;
        }
        while self.undo_stack.len() >= self.limit {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(record);
    }

    /// Undo last edit. Returns false when there was nothing to undo.
    pub fn undo(&mut self, scene: &mut SceneState) -> bool {
        let Some(record) = self.undo_stack.pop_back() else {
            return false;
        };
        record.revert(scene);
        tracing::debug!("Undid {} edit on '{}'", record.property, record.selector);
        self.redo_stack.push(record);
        true
    }

    /// Redo last undone edit. Returns false when there was nothing to redo.
    pub fn redo(&mut self, scene: &mut SceneState) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };
        record.reapply(scene);
        tracing::debug!("Redid {} edit on '{}'", record.property, record.selector);
        self.push_undo(record);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
