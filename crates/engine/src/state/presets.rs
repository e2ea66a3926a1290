//! Material presets: the built-in procedural vocabulary and the external
//! named-asset table.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

use super::material::{AlphaMode, Material};

/// Built-in procedural presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetKind {
    Wood,
    Marble,
    Metal,
    Glass,
}

impl PresetKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "wood" | "hardwood" => Some(PresetKind::Wood),
            "marble" | "stone" => Some(PresetKind::Marble),
            "metal" | "steel" => Some(PresetKind::Metal),
            "glass" => Some(PresetKind::Glass),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PresetKind::Wood => "wood",
            PresetKind::Marble => "marble",
            PresetKind::Metal => "metal",
            PresetKind::Glass => "glass",
        }
    }

    /// Build the preset's parameter set. Textures are dropped; a preset
    /// replaces the whole surface look.
    pub fn build(&self) -> Material {
        let (base_color, metallic, roughness, alpha_mode) = match self {
            PresetKind::Wood => ([0.55, 0.36, 0.2, 1.0], 0.05, 0.6, AlphaMode::Opaque),
            PresetKind::Marble => ([0.93, 0.92, 0.89, 1.0], 0.0, 0.2, AlphaMode::Opaque),
            PresetKind::Metal => ([0.77, 0.78, 0.8, 1.0], 0.95, 0.25, AlphaMode::Opaque),
            PresetKind::Glass => ([0.85, 0.93, 0.96, 0.25], 0.02, 0.05, AlphaMode::Blend),
        };
        Material {
            name: self.name().to_string(),
            base_color,
            metallic,
            roughness,
            emissive: [0.0; 3],
            alpha_mode,
            texture: None,
        }
    }
}

/// One entry of the external asset table, as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialAsset {
    pub base_color: [f32; 4],
    #[serde(default)]
    pub metallic: f32,
    #[serde(default = "default_roughness")]
    pub roughness: f32,
    #[serde(default)]
    pub emissive: [f32; 3],
    #[serde(default)]
    pub alpha_mode: AlphaMode,
}

fn default_roughness() -> f32 {
    0.5
}

impl MaterialAsset {
    fn to_material(&self, name: &str) -> Material {
        Material {
            name: name.to_string(),
            base_color: self.base_color,
            metallic: self.metallic,
            roughness: self.roughness,
            emissive: self.emissive,
            alpha_mode: self.alpha_mode,
            texture: None,
        }
    }
}

/// Named materials supplied from outside the engine, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    assets: HashMap<String, MaterialAsset>,
}

impl AssetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object of `name -> MaterialAsset`.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, MaterialAsset> = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidInput(format!("asset table: {e}")))?;
        let mut library = Self::new();
        for (name, asset) in raw {
            library.insert(&name, asset);
        }
        Ok(library)
    }

    pub fn insert(&mut self, name: &str, asset: MaterialAsset) {
        self.assets.insert(name.trim().to_lowercase(), asset);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Material> {
        let key = name.trim().to_lowercase();
        self.assets.get(&key).map(|a| a.to_material(&key))
    }

    /// Resolve a preset name: built-in vocabulary first, then the table.
    pub fn resolve(&self, name: &str) -> Result<Material> {
        if let Some(kind) = PresetKind::from_name(name) {
            return Ok(kind.build());
        }
        self.get(name)
            .ok_or_else(|| EngineError::PresetNotFound(name.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_aliases() {
        assert_eq!(PresetKind::from_name("Hardwood"), Some(PresetKind::Wood));
        assert_eq!(PresetKind::from_name("stone"), Some(PresetKind::Marble));
        assert_eq!(PresetKind::from_name("steel"), Some(PresetKind::Metal));
        assert_eq!(PresetKind::from_name("velvet"), None);
    }

    #[test]
    fn test_glass_is_blended() {
        let glass = PresetKind::Glass.build();
        assert_eq!(glass.alpha_mode, AlphaMode::Blend);
        assert!(glass.metallic < 0.1);
        assert!(glass.roughness < 0.2);
        assert!(glass.base_color[3] < 1.0);
    }

    #[test]
    fn test_wood_is_brown_and_rough() {
        let wood = PresetKind::Wood.build();
        assert!(wood.metallic < 0.2);
        assert!(wood.roughness > 0.4 && wood.roughness < 0.8);
        assert!(wood.base_color[0] > wood.base_color[2]);
    }

    #[test]
    fn test_asset_table_lookup() {
        let lib = AssetLibrary::from_json(
            r#"{"Velvet": {"baseColor": [0.4, 0.1, 0.2, 1.0], "roughness": 0.9}}"#,
        )
        .unwrap();
        assert_eq!(lib.len(), 1);
        let m = lib.resolve("velvet").unwrap();
        assert_eq!(m.roughness, 0.9);
        assert_eq!(m.metallic, 0.0);
        assert_eq!(m.alpha_mode, AlphaMode::Opaque);
    }

    #[test]
    fn test_builtin_wins_over_table() {
        let mut lib = AssetLibrary::new();
        lib.insert(
            "glass",
            MaterialAsset {
                base_color: [1.0; 4],
                metallic: 1.0,
                roughness: 1.0,
                emissive: [0.0; 3],
                alpha_mode: AlphaMode::Opaque,
            },
        );
        assert_eq!(lib.resolve("glass").unwrap().alpha_mode, AlphaMode::Blend);
    }

    #[test]
    fn test_missing_preset() {
        let lib = AssetLibrary::new();
        assert!(matches!(lib.resolve("velvet"), Err(EngineError::PresetNotFound(n)) if n == "velvet"));
    }

    #[test]
    fn test_bad_table_json() {
        assert!(matches!(
            AssetLibrary::from_json("[1, 2]"),
            Err(EngineError::InvalidInput(_))
        ));
    }
}
