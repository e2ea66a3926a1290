//! Appearance editing: selector resolution, copy-on-write material edits and
//! the undo/redo history that goes with them.

use std::sync::Arc;

use shared::RegionLabel;

use crate::error::{EngineError, Result};
use crate::texture::TextureSource;

use super::material::{Material, Texture};
use super::palette::parse_color;
use super::presets::AssetLibrary;
use super::scene::history::{EditHistory, EditRecord, MaterialChange};
use super::scene::{RegionId, SceneState};

/// Selectors that fall back to every region when nothing else matched
const ALL_SELECTORS: &[&str] = &["all", "everything", "room"];

/// Default ceiling for inline and fetched texture payloads
pub const DEFAULT_MAX_TEXTURE_BYTES: usize = 16 * 1024 * 1024;

/// Editable material property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditProperty {
    Color,
    Texture,
    MaterialPreset,
}

impl EditProperty {
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim() {
            "color" | "colour" => Ok(EditProperty::Color),
            "texture" => Ok(EditProperty::Texture),
            "materialPreset" | "material_preset" | "material" => Ok(EditProperty::MaterialPreset),
            other => Err(EngineError::UnknownProperty(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EditProperty::Color => "color",
            EditProperty::Texture => "texture",
            EditProperty::MaterialPreset => "materialPreset",
        }
    }
}

impl std::fmt::Display for EditProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An edit that has been committed to the scene and history
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedEdit {
    pub selector: String,
    pub property: EditProperty,
    pub regions: Vec<RegionId>,
}

/// A texture edit waiting on a remote fetch. Regions are resolved when the
/// request is made.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRequest {
    pub selector: String,
    pub uri: String,
    pub regions: Vec<RegionId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied(AppliedEdit),
    PendingTexture(TextureRequest),
}

pub struct AppearanceEditor {
    history: EditHistory,
    assets: AssetLibrary,
    max_texture_bytes: usize,
}

impl Default for AppearanceEditor {
    fn default() -> Self {
        Self::new(EditHistory::default(), AssetLibrary::new())
    }
}

impl AppearanceEditor {
    pub fn new(history: EditHistory, assets: AssetLibrary) -> Self {
        Self {
            history,
            assets,
            max_texture_bytes: DEFAULT_MAX_TEXTURE_BYTES,
        }
    }

    pub fn with_max_texture_bytes(mut self, max_bytes: usize) -> Self {
        self.max_texture_bytes = max_bytes;
        self
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn assets(&self) -> &AssetLibrary {
        &self.assets
    }

    pub fn set_assets(&mut self, assets: AssetLibrary) {
        self.assets = assets;
    }

    /// Regions addressed by `selector`.
    ///
    /// Each region matches on its canonical category or on the selector being a
    /// substring of its name. The catch-all selectors only match a region of
    /// exactly that name (`all` must not pick up `wall_north`, nor `room` pick
    /// up `bedroom_floor`); when none exists they expand to the whole scene.
    pub fn resolve(&self, scene: &SceneState, selector: &str) -> Result<Vec<RegionId>> {
        let needle = selector.trim().to_lowercase();
        if needle.is_empty() {
            return Err(EngineError::NoMatchingRegion(selector.to_string()));
        }
        let category = RegionLabel::from_selector(&needle);
        let catch_all = ALL_SELECTORS.contains(&needle.as_str());

        let mut matched: Vec<RegionId> = scene
            .regions()
            .iter()
            .filter(|r| {
                let name = r.name.to_lowercase();
                let by_name = if catch_all {
                    name == needle
                } else {
                    name.contains(&needle)
                };
                category == Some(r.label) || by_name
            })
            .map(|r| r.id)
            .collect();

        if matched.is_empty() && catch_all {
            matched = scene.regions().iter().map(|r| r.id).collect();
        }

        if matched.is_empty() {
            return Err(EngineError::NoMatchingRegion(selector.to_string()));
        }
        Ok(matched)
    }

    /// Apply one edit. Color and preset edits, and inline textures, commit
    /// immediately; remote textures come back as a [`TextureRequest`] for the
    /// caller to fetch and hand to [`complete_texture`](Self::complete_texture).
    pub fn apply_edit(
        &mut self,
        scene: &mut SceneState,
        selector: &str,
        property: &str,
        value: &str,
    ) -> Result<EditOutcome> {
        let property = EditProperty::parse(property)?;
        let regions = self.resolve(scene, selector)?;

        let applied = match property {
            EditProperty::Color => {
                let rgba = parse_color(value)
                    .ok_or_else(|| EngineError::invalid_value(property.as_str(), value))?;
                self.commit(scene, selector, property, value, regions, |m| m.with_color(rgba))
            }
            EditProperty::Texture => match TextureSource::parse(value, self.max_texture_bytes)? {
                TextureSource::Inline(texture) => {
                    self.commit(scene, selector, property, value, regions, |m| {
                        m.with_texture(texture.clone())
                    })
                }
                TextureSource::Remote(uri) => {
                    tracing::debug!("Texture for '{}' pending fetch of {}", selector, uri);
                    return Ok(EditOutcome::PendingTexture(TextureRequest {
                        selector: selector.to_string(),
                        uri,
                        regions,
                    }));
                }
            },
            EditProperty::MaterialPreset => {
                let preset = self.assets.resolve(value)?;
                self.commit(scene, selector, property, value, regions, |_| preset.clone())
            }
        };

        Ok(EditOutcome::Applied(applied))
    }

    /// Finish a remote texture edit with the fetched image. Regions that were
    /// unloaded while the fetch was in flight are skipped.
    pub fn complete_texture(
        &mut self,
        scene: &mut SceneState,
        request: TextureRequest,
        texture: Texture,
    ) -> Result<AppliedEdit> {
        let live: Vec<RegionId> = request
            .regions
            .iter()
            .copied()
            .filter(|id| scene.region(*id).is_some())
            .collect();
        if live.is_empty() {
            return Err(EngineError::NoMatchingRegion(request.selector));
        }
        if live.len() < request.regions.len() {
            tracing::warn!(
                "{} of {} regions for '{}' disappeared before the texture arrived",
                request.regions.len() - live.len(),
                request.regions.len(),
                request.selector
            );
        }
        Ok(self.commit(
            scene,
            &request.selector,
            EditProperty::Texture,
            &request.uri,
            live,
            |m| m.with_texture(texture.clone()),
        ))
    }

    fn commit(
        &mut self,
        scene: &mut SceneState,
        selector: &str,
        property: EditProperty,
        value: &str,
        regions: Vec<RegionId>,
        build: impl Fn(&Material) -> Material,
    ) -> AppliedEdit {
        let mut changes = Vec::with_capacity(regions.len());
        for &id in &regions {
            let Some(region) = scene.region(id) else {
                continue;
            };
            let before = Arc::clone(region.material());
            // A fresh allocation per region, so no two regions ever alias
            let after = Arc::new(build(&before));
            scene.replace_material(id, Arc::clone(&after));
            changes.push(MaterialChange { region: id, before, after });
        }

        tracing::debug!(
            "Applied {} edit to '{}' ({} regions)",
            property,
            selector,
            changes.len()
        );

        let regions = changes.iter().map(|c| c.region).collect();
        self.history.push(EditRecord {
            selector: selector.to_string(),
            property,
            value: value.to_string(),
            changes,
        });

        AppliedEdit {
            selector: selector.to_string(),
            property,
            regions,
        }
    }

    pub fn undo(&mut self, scene: &mut SceneState) -> bool {
        self.history.undo(scene)
    }

    pub fn redo(&mut self, scene: &mut SceneState) -> bool {
        self.history.redo(scene)
    }

    /// Restore load-time materials everywhere and forget all history.
    pub fn reset_to_original(&mut self, scene: &mut SceneState) {
        scene.restore_originals();
        self.history.clear();
        tracing::info!("Appearance reset to original");
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::state::material::AlphaMode;
    use crate::texture::tests::png_data_uri;

    fn setup() -> (SceneState, AppearanceEditor) {
        let (scene, _) = fixtures::loaded_room();
        (scene, AppearanceEditor::default())
    }

    fn labelled(scene: &SceneState, label: RegionLabel) -> Vec<RegionId> {
        scene
            .regions()
            .iter()
            .filter(|r| r.label == label)
            .map(|r| r.id)
            .collect()
    }

    fn applied(outcome: EditOutcome) -> AppliedEdit {
        match outcome {
            EditOutcome::Applied(edit) => edit,
            other => panic!("expected applied edit, got {other:?}"),
        }
    }

    #[test]
    fn test_property_names() {
        assert_eq!(EditProperty::parse("colour").unwrap(), EditProperty::Color);
        assert_eq!(
            EditProperty::parse("material_preset").unwrap(),
            EditProperty::MaterialPreset
        );
        assert!(matches!(
            EditProperty::parse("shininess"),
            Err(EngineError::UnknownProperty(p)) if p == "shininess"
        ));
    }

    #[test]
    fn test_resolve_category() {
        let (scene, editor) = setup();
        let walls = editor.resolve(&scene, "Walls").unwrap();
        assert_eq!(walls, labelled(&scene, RegionLabel::Wall));
        let furniture = editor.resolve(&scene, "couch").unwrap();
        assert_eq!(furniture, labelled(&scene, RegionLabel::Furniture));
    }

    #[test]
    fn test_resolve_substring() {
        let (scene, editor) = setup();
        let ids = editor.resolve(&scene, "north").unwrap();
        assert_eq!(ids.len(), 1);
        assert!(scene.region(ids[0]).unwrap().name.contains("north"));
    }

    #[test]
    fn test_resolve_no_match() {
        let (scene, editor) = setup();
        assert!(matches!(
            editor.resolve(&scene, "banana"),
            Err(EngineError::NoMatchingRegion(s)) if s == "banana"
        ));
        assert!(editor.resolve(&scene, "  ").is_err());
    }

    #[test]
    fn test_resolve_all() {
        let (scene, editor) = setup();
        for selector in ["all", "Everything", "room"] {
            assert_eq!(editor.resolve(&scene, selector).unwrap().len(), scene.regions().len());
        }
    }

    #[test]
    fn test_catch_all_ignores_partial_names() {
        let fragments = ["bedroom_floor", "wall_a", "wall_b", "hallway_rug"]
            .map(|name| fixtures::strip_fragment(name, 4));
        let (combined, segments) = crate::aggregate::combine(&fragments)
            .unwrap()
            .into_scene("flat", Material::default());
        let mut scene = SceneState::new();
        scene.load(combined, segments).unwrap();
        let mut editor = AppearanceEditor::default();

        assert_eq!(editor.resolve(&scene, "all").unwrap().len(), 4);
        assert_eq!(editor.resolve(&scene, "room").unwrap().len(), 4);
        // ordinary selectors still match inside names
        assert_eq!(editor.resolve(&scene, "hall").unwrap().len(), 1);

        let edit = applied(editor.apply_edit(&mut scene, "all", "color", "red").unwrap());
        assert_eq!(edit.regions.len(), 4);
        for region in scene.regions() {
            assert!((region.material().base_color[0] - 200.0 / 255.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_color_edit_and_undo_redo() {
        let (mut scene, mut editor) = setup();
        let walls = labelled(&scene, RegionLabel::Wall);
        let before: Vec<Material> = walls
            .iter()
            .map(|id| Material::clone(scene.region(*id).unwrap().material()))
            .collect();

        let edit = applied(editor.apply_edit(&mut scene, "wall", "color", "#112233").unwrap());
        assert_eq!(edit.regions, walls);
        for id in &walls {
            let m = scene.region(*id).unwrap().material();
            assert!((m.base_color[0] - 17.0 / 255.0).abs() < 1e-6);
            assert!(m.emissive[0] > 0.0);
        }

        assert!(editor.undo(&mut scene));
        for (id, prior) in walls.iter().zip(&before) {
            assert_eq!(**scene.region(*id).unwrap().material(), *prior);
        }

        assert!(editor.redo(&mut scene));
        let m = scene.region(walls[0]).unwrap().material();
        assert!((m.base_color[2] - 51.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_edit_never_aliases_materials() {
        let (mut scene, mut editor) = setup();
        editor.apply_edit(&mut scene, "all", "color", "teal").unwrap();
        let regions = scene.regions();
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                assert!(!Arc::ptr_eq(a.material(), b.material()));
            }
        }
    }

    #[test]
    fn test_invalid_color_leaves_state() {
        let (mut scene, mut editor) = setup();
        let err = editor.apply_edit(&mut scene, "floor", "color", "#zzzzzz").unwrap_err();
        assert!(matches!(err, EngineError::InvalidValue { .. }));
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_preset_edit() {
        let (mut scene, mut editor) = setup();
        editor.apply_edit(&mut scene, "sofa", "materialPreset", "glass").unwrap();
        for id in labelled(&scene, RegionLabel::Furniture) {
            assert_eq!(scene.region(id).unwrap().material().alpha_mode, AlphaMode::Blend);
        }
        assert!(matches!(
            editor.apply_edit(&mut scene, "floor", "material", "velvet"),
            Err(EngineError::PresetNotFound(_))
        ));
    }

    #[test]
    fn test_inline_texture_commits() {
        let (mut scene, mut editor) = setup();
        let outcome = editor
            .apply_edit(&mut scene, "floor", "texture", &png_data_uri(2, 2))
            .unwrap();
        let edit = applied(outcome);
        let tex = scene.region(edit.regions[0]).unwrap().material().texture.clone();
        assert_eq!(tex.map(|t| t.mime_type), Some("image/png".to_string()));
    }

    #[test]
    fn test_remote_texture_is_pending() {
        let (mut scene, mut editor) = setup();
        let outcome = editor
            .apply_edit(&mut scene, "floor", "texture", "https://example.com/oak.png")
            .unwrap();
        let EditOutcome::PendingTexture(request) = outcome else {
            panic!("expected pending texture");
        };
        assert_eq!(request.uri, "https://example.com/oak.png");
        // nothing is committed until the fetch completes
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn test_texture_completion_after_reload() {
        let (mut scene, mut editor) = setup();
        let EditOutcome::PendingTexture(request) = editor
            .apply_edit(&mut scene, "floor", "texture", "https://example.com/oak.png")
            .unwrap()
        else {
            panic!("expected pending texture");
        };
        let (room, segments) = fixtures::box_room_scene(4.0, 3.0, 2.5);
        scene.load(room, segments).unwrap();
        let texture = Texture {
            bytes: Arc::from(vec![0u8; 4]),
            mime_type: "image/png".into(),
            width: 1,
            height: 1,
        };
        assert!(matches!(
            editor.complete_texture(&mut scene, request, texture),
            Err(EngineError::NoMatchingRegion(_))
        ));
    }

    #[test]
    fn test_reset_to_original() {
        let (mut scene, mut editor) = setup();
        let originals: Vec<Material> = scene
            .regions()
            .iter()
            .map(|r| Material::clone(r.material()))
            .collect();
        editor.apply_edit(&mut scene, "all", "color", "red").unwrap();
        editor.apply_edit(&mut scene, "floor", "material", "wood").unwrap();
        editor.reset_to_original(&mut scene);
        for (region, original) in scene.regions().iter().zip(&originals) {
            assert_eq!(**region.material(), *original);
        }
        assert!(!editor.history().can_undo());
        assert!(!editor.history().can_redo());
    }

    #[test]
    fn test_undo_bound() {
        let (mut scene, _) = fixtures::loaded_room();
        let mut editor = AppearanceEditor::new(EditHistory::new(20), AssetLibrary::new());
        for i in 0..25 {
            let value = format!("#{:02x}0000", i * 10);
            editor.apply_edit(&mut scene, "floor", "color", &value).unwrap();
        }
        let mut undone = 0;
        while editor.undo(&mut scene) {
            undone += 1;
        }
        assert_eq!(undone, 20);
        assert!(!editor.undo(&mut scene));
    }
}
