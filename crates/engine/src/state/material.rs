//! Surface materials.
//!
//! Materials are immutable once shared: regions hold `Arc<Material>` and every
//! edit builds a fresh value from a clone of the prior one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Strength of the self-emissive tint applied alongside a color edit.
pub const COLOR_EMISSIVE_TINT: f32 = 0.1;

pub type SharedMaterial = Arc<Material>;

/// How the alpha channel of the base color is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaMode {
    #[default]
    Opaque,
    Blend,
}

/// Encoded image attached to a material
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// PNG or JPEG bytes, exactly as embedded in the container
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Linear RGBA
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub texture: Option<Texture>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            base_color: [0.7, 0.7, 0.72, 1.0],
            metallic: 0.3,
            roughness: 0.5,
            emissive: [0.0; 3],
            alpha_mode: AlphaMode::Opaque,
            texture: None,
        }
    }
}

impl Material {
    /// Copy with a new base color and a faint emissive tint of the same hue.
    pub fn with_color(&self, rgba: [f32; 4]) -> Self {
        let mut m = self.clone();
        m.base_color = rgba;
        m.emissive = [
            rgba[0] * COLOR_EMISSIVE_TINT,
            rgba[1] * COLOR_EMISSIVE_TINT,
            rgba[2] * COLOR_EMISSIVE_TINT,
        ];
        if rgba[3] < 1.0 {
            m.alpha_mode = AlphaMode::Blend;
        }
        m
    }

    pub fn with_texture(&self, texture: Texture) -> Self {
        let mut m = self.clone();
        m.texture = Some(texture);
        m
    }

    /// Display variant used while the region is selected.
    pub fn highlighted(&self, tint: [f32; 3], intensity: f32) -> Self {
        let mut m = self.clone();
        for (e, t) in m.emissive.iter_mut().zip(tint) {
            *e = (*e + t * intensity).min(1.0);
        }
        m
    }
}
