//! glTF 2.0 JSON document, limited to what a single captured room needs.
//!
//! Field order here is the serialized order, which keeps encoding
//! deterministic. Unknown fields are ignored on read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::RegionLabel;

use crate::state::material::{AlphaMode, Material};

/// Component types
pub const UNSIGNED_BYTE: u32 = 5121;
pub const UNSIGNED_SHORT: u32 = 5123;
pub const UNSIGNED_INT: u32 = 5125;
pub const FLOAT: u32 = 5126;

/// Buffer view targets
pub const ARRAY_BUFFER: u32 = 34962;
pub const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Primitive topology
pub const TRIANGLES: u32 = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scenes: Vec<SceneDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meshes: Vec<MeshDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessors: Vec<Accessor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffer_views: Vec<BufferView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffers: Vec<Buffer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub textures: Vec<TextureDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<MeshExtras>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    /// Attribute semantic to accessor index
    pub attributes: BTreeMap<String, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f32>>,
}

impl Accessor {
    /// Number of components per element, or `None` for types we never read.
    pub fn components(&self) -> Option<usize> {
        match self.kind.as_str() {
            "SCALAR" => Some(1),
            "VEC2" => Some(2),
            "VEC3" => Some(3),
            "VEC4" => Some(4),
            _ => None,
        }
    }
}

pub fn component_size(component_type: u32) -> Option<usize> {
    match component_type {
        UNSIGNED_BYTE => Some(1),
        UNSIGNED_SHORT => Some(2),
        UNSIGNED_INT | FLOAT => Some(4),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub pbr_metallic_roughness: Pbr,
    #[serde(default)]
    pub emissive_factor: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pbr {
    #[serde(default = "unit_color")]
    pub base_color_factor: [f32; 4],
    #[serde(default = "one")]
    pub metallic_factor: f32,
    #[serde(default = "one")]
    pub roughness_factor: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_color_texture: Option<TextureRef>,
}

impl Default for Pbr {
    fn default() -> Self {
        Self {
            base_color_factor: unit_color(),
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            base_color_texture: None,
        }
    }
}

fn unit_color() -> [f32; 4] {
    [1.0; 4]
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureRef {
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
}

impl MaterialDef {
    pub fn from_material(material: &Material, texture: Option<usize>) -> Self {
        Self {
            name: Some(material.name.clone()),
            pbr_metallic_roughness: Pbr {
                base_color_factor: material.base_color,
                metallic_factor: material.metallic,
                roughness_factor: material.roughness,
                base_color_texture: texture.map(|index| TextureRef { index }),
            },
            emissive_factor: material.emissive,
            alpha_mode: match material.alpha_mode {
                AlphaMode::Opaque => None,
                AlphaMode::Blend => Some("BLEND".to_string()),
            },
        }
    }

    /// Material parameters without the texture, which the caller resolves.
    pub fn to_material(&self) -> Material {
        Material {
            name: self.name.clone().unwrap_or_else(|| "Material".to_string()),
            base_color: self.pbr_metallic_roughness.base_color_factor,
            metallic: self.pbr_metallic_roughness.metallic_factor,
            roughness: self.pbr_metallic_roughness.roughness_factor,
            emissive: self.emissive_factor,
            alpha_mode: match self.alpha_mode.as_deref() {
                Some("BLEND") => AlphaMode::Blend,
                _ => AlphaMode::Opaque,
            },
            texture: None,
        }
    }
}

// ── Engine extras ───────────────────────────────────────────────

/// Region table carried in `meshes[0].extras`; standard viewers ignore it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshExtras {
    #[serde(default)]
    pub regions: Vec<RegionExtra>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionExtra {
    pub name: String,
    #[serde(default)]
    pub label: RegionLabel,
    pub first_index: usize,
    pub index_count: usize,
    pub material: MaterialParams,
    /// Index into `textures`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialParams {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    #[serde(default)]
    pub emissive: [f32; 3],
    #[serde(default)]
    pub alpha_mode: AlphaMode,
}

impl From<&Material> for MaterialParams {
    fn from(m: &Material) -> Self {
        Self {
            name: m.name.clone(),
            base_color: m.base_color,
            metallic: m.metallic,
            roughness: m.roughness,
            emissive: m.emissive,
            alpha_mode: m.alpha_mode,
        }
    }
}

impl MaterialParams {
    pub fn to_material(&self) -> Material {
        Material {
            name: self.name.clone(),
            base_color: self.base_color,
            metallic: self.metallic,
            roughness: self.roughness,
            emissive: self.emissive,
            alpha_mode: self.alpha_mode,
            texture: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_def_roundtrip() {
        let mut m = Material::default().with_color([0.1, 0.2, 0.3, 0.5]);
        m.name = "glassy".into();
        let def = MaterialDef::from_material(&m, Some(2));
        assert_eq!(def.alpha_mode.as_deref(), Some("BLEND"));
        assert_eq!(def.pbr_metallic_roughness.base_color_texture, Some(TextureRef { index: 2 }));
        assert_eq!(def.to_material(), m);
    }

    #[test]
    fn test_opaque_omits_alpha_mode() {
        let def = MaterialDef::from_material(&Material::default(), None);
        let json = serde_json::to_value(&def).unwrap();
        assert!(json.get("alphaMode").is_none());
        assert!(json["pbrMetallicRoughness"].get("baseColorTexture").is_none());
        let metallic = json["pbrMetallicRoughness"]["metallicFactor"].as_f64().unwrap();
        assert!((metallic - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_pbr_defaults_follow_gltf() {
        let def: MaterialDef = serde_json::from_str("{}").unwrap();
        assert_eq!(def.pbr_metallic_roughness.base_color_factor, [1.0; 4]);
        assert_eq!(def.pbr_metallic_roughness.metallic_factor, 1.0);
        assert_eq!(def.to_material().alpha_mode, AlphaMode::Opaque);
    }

    #[test]
    fn test_accessor_type_field() {
        let acc = Accessor {
            buffer_view: Some(0),
            component_type: FLOAT,
            count: 3,
            kind: "VEC3".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&acc).unwrap();
        assert_eq!(json["type"], "VEC3");
        assert_eq!(json["bufferView"], 0);
        assert_eq!(acc.components(), Some(3));
        assert_eq!(component_size(UNSIGNED_SHORT), Some(2));
    }

    #[test]
    fn test_region_extra_camel_case() {
        let extra = RegionExtra {
            name: "wall_north".into(),
            label: RegionLabel::Wall,
            first_index: 6,
            index_count: 6,
            material: MaterialParams::from(&Material::default()),
            texture: None,
        };
        let json = serde_json::to_value(&extra).unwrap();
        assert_eq!(json["firstIndex"], 6);
        assert_eq!(json["label"], "wall");
        assert_eq!(json["material"]["alphaMode"], "opaque");
    }
}
