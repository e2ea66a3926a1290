//! Integration tests for appearance editing.
//!
//! Exercises the editor, history and selection together on a captured room.

use std::sync::Arc;

use room_engine::fixtures;
use room_engine::state::editor::EditOutcome;
use room_engine::state::{AppearanceEditor, AssetLibrary, EditHistory, SceneState, SelectionState};
use room_engine::{EngineError, ErrorKind};
use shared::RegionLabel;

fn walls(scene: &SceneState) -> Vec<room_engine::state::RegionId> {
    scene
        .regions()
        .iter()
        .filter(|r| r.label == RegionLabel::Wall)
        .map(|r| r.id)
        .collect()
}

#[test]
fn test_color_edit_undo_redo() {
    let (mut scene, _) = fixtures::loaded_room();
    let mut editor = AppearanceEditor::default();
    let wall_ids = walls(&scene);
    let before: Vec<_> = wall_ids
        .iter()
        .map(|id| Arc::clone(scene.region(*id).unwrap().material()))
        .collect();

    let outcome = editor.apply_edit(&mut scene, "wall", "color", "#112233").unwrap();
    let EditOutcome::Applied(applied) = outcome else {
        panic!("color edits apply immediately");
    };
    assert_eq!(applied.regions, wall_ids);
    let applied_materials: Vec<_> = wall_ids
        .iter()
        .map(|id| Arc::clone(scene.region(*id).unwrap().material()))
        .collect();

    assert!(editor.undo(&mut scene));
    for (id, prior) in wall_ids.iter().zip(&before) {
        let current = scene.region(*id).unwrap().material();
        assert!(Arc::ptr_eq(current, prior));
    }

    assert!(editor.redo(&mut scene));
    for (id, after) in wall_ids.iter().zip(&applied_materials) {
        assert!(Arc::ptr_eq(scene.region(*id).unwrap().material(), after));
    }
}

#[test]
fn test_no_region_shares_a_material_after_edit() {
    let (mut scene, _) = fixtures::loaded_room();
    let mut editor = AppearanceEditor::default();
    editor.apply_edit(&mut scene, "all", "materialPreset", "wood").unwrap();

    let materials: Vec<_> = scene.regions().iter().map(|r| r.material()).collect();
    for (i, a) in materials.iter().enumerate() {
        for b in &materials[i + 1..] {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
}

#[test]
fn test_selectors() {
    let (mut scene, _) = fixtures::loaded_room();
    let mut editor = AppearanceEditor::default();

    let err = editor.apply_edit(&mut scene, "banana", "color", "red").unwrap_err();
    assert!(matches!(err, EngineError::NoMatchingRegion(_)));
    assert_eq!(err.kind(), ErrorKind::RegionResolution);

    assert_eq!(editor.resolve(&scene, "all").unwrap().len(), scene.regions().len());
    assert_eq!(editor.resolve(&scene, "everything").unwrap().len(), 7);
    assert_eq!(editor.resolve(&scene, "walls").unwrap().len(), 4);
    assert_eq!(editor.resolve(&scene, "north").unwrap().len(), 1);
}

#[test]
fn test_invalid_edits_leave_no_history() {
    let (mut scene, _) = fixtures::loaded_room();
    let mut editor = AppearanceEditor::default();

    assert!(matches!(
        editor.apply_edit(&mut scene, "floor", "shininess", "1"),
        Err(EngineError::UnknownProperty(_))
    ));
    assert!(matches!(
        editor.apply_edit(&mut scene, "floor", "color", "#12345"),
        Err(EngineError::InvalidValue { .. })
    ));
    assert!(matches!(
        editor.apply_edit(&mut scene, "floor", "materialPreset", "velvet"),
        Err(EngineError::PresetNotFound(_))
    ));
    assert!(!editor.history().can_undo());
}

#[test]
fn test_undo_bound() {
    let (mut scene, _) = fixtures::loaded_room();
    let mut editor = AppearanceEditor::new(EditHistory::new(20), AssetLibrary::new());
    for i in 0..25 {
        let color = format!("#{:02x}{:02x}{:02x}", i * 10, 0, 0);
        editor.apply_edit(&mut scene, "floor", "color", &color).unwrap();
    }

    let mut undone = 0;
    while editor.undo(&mut scene) {
        undone += 1;
    }
    assert_eq!(undone, 20);
    assert!(!editor.undo(&mut scene));
}

#[test]
fn test_selection_highlight_stays_out_of_history() {
    let (mut scene, ids) = fixtures::loaded_room();
    let mut editor = AppearanceEditor::default();
    let mut selection = SelectionState::default();

    let floor = scene.find_by_name("floor").unwrap();
    assert!(selection.select(&mut scene, floor));
    assert!(selection.select(&mut scene, ids[0]));
    selection.deselect(&mut scene);
    assert!(!editor.history().can_undo());

    assert!(selection.select(&mut scene, floor));
    editor.apply_edit(&mut scene, "floor", "color", "teal").unwrap();
    selection.refresh(&mut scene);
    let region = scene.region(floor).unwrap();
    assert_eq!(region.displayed_material().base_color, region.material().base_color);
    assert_ne!(region.displayed_material().emissive, region.material().emissive);

    assert!(editor.undo(&mut scene));
    selection.refresh(&mut scene);
    selection.deselect(&mut scene);
    let region = scene.region(floor).unwrap();
    assert!(Arc::ptr_eq(region.material(), region.original_material()));
    assert!(Arc::ptr_eq(region.displayed_material(), region.material()));
}

#[test]
fn test_reset_to_original() {
    let (mut scene, _) = fixtures::loaded_room();
    let mut editor = AppearanceEditor::default();
    editor.apply_edit(&mut scene, "ceiling", "color", "white").unwrap();
    editor.apply_edit(&mut scene, "sofa", "materialPreset", "metal").unwrap();
    editor.reset_to_original(&mut scene);
    for region in scene.regions() {
        assert!(Arc::ptr_eq(region.material(), region.original_material()));
    }
    assert!(!editor.history().can_undo());
    assert!(!editor.history().can_redo());
}
