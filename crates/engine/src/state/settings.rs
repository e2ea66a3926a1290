//! Engine settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Orbit camera limits and gesture gains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Radians of orbit per pixel of single-pointer drag
    pub orbit_gain: f32,
    /// Distance change per pixel of pinch (and per wheel unit)
    pub zoom_gain: f32,
    /// Target motion per pixel of two-pointer drag
    pub pan_gain: f32,
    /// Pointer travel in pixels below which a release counts as a tap
    pub tap_slop: f32,
    /// Distance = largest extent × this factor when framing a scene
    pub framing_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            max_distance: 50.0,
            fov_degrees: 45.0,
            orbit_gain: 0.005,
            zoom_gain: 0.01,
            pan_gain: 0.002,
            tap_slop: 6.0,
            framing_factor: 1.5,
        }
    }
}

/// Live capture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Minimum spacing of `capture-progress` events
    pub progress_interval_ms: u64,
    /// Fragment count treated as a complete scan
    pub target_fragments: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            progress_interval_ms: 250,
            target_fragments: 32,
        }
    }
}

impl CaptureSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// Texture edit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    pub fetch_timeout_ms: u64,
    pub max_bytes: usize,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            max_bytes: crate::state::editor::DEFAULT_MAX_TEXTURE_BYTES,
        }
    }
}

impl TextureSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// Largest accepted undo depth
pub const MAX_HISTORY_LIMIT: usize = 10_000;

/// Appearance editing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Undo depth; oldest edits are dropped beyond it
    pub history_limit: usize,
    /// JSON table of named material assets
    pub assets_path: Option<PathBuf>,
    /// Emissive tint added to the selected region, RGB 0-255
    pub highlight_color: [u8; 3],
    pub highlight_intensity: f32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            assets_path: None,
            highlight_color: [0, 220, 255],
            highlight_intensity: 0.35,
        }
    }
}

impl EditorSettings {
    pub fn highlight_tint(&self) -> [f32; 3] {
        self.highlight_color.map(|c| c as f32 / 255.0)
    }
}

/// All engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub editor: EditorSettings,
    pub camera: CameraSettings,
    pub capture: CaptureSettings,
    pub texture: TextureSettings,
    /// Where exported containers are written; the platform data dir when unset
    pub export_dir: Option<PathBuf>,
}

impl EngineSettings {
    /// Load settings from the platform config dir, or defaults if absent or unreadable
    pub fn load() -> Self {
        if let Some(path) = Self::default_path() {
            match Self::load_from(&path) {
                Ok(settings) => return settings,
                Err(EngineError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)
            .map_err(|e| EngineError::InvalidInput(format!("{}: {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the camera, history or capture cannot work with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, value: String| {
            Err(EngineError::InvalidInput(format!("settings: {field} = {value}")))
        };

        let cam = &self.camera;
        if !(cam.min_distance.is_finite() && cam.min_distance > 0.0) {
            return invalid("camera.min_distance", cam.min_distance.to_string());
        }
        if !(cam.max_distance.is_finite() && cam.max_distance >= cam.min_distance) {
            return invalid(
                "camera.max_distance",
                format!("{} (min_distance {})", cam.max_distance, cam.min_distance),
            );
        }
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return invalid("camera.fov_degrees", cam.fov_degrees.to_string());
        }
        for (field, value) in [
            ("camera.orbit_gain", cam.orbit_gain),
            ("camera.zoom_gain", cam.zoom_gain),
            ("camera.pan_gain", cam.pan_gain),
            ("camera.tap_slop", cam.tap_slop),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(field, value.to_string());
            }
        }
        if !(cam.framing_factor.is_finite() && cam.framing_factor > 0.0) {
            return invalid("camera.framing_factor", cam.framing_factor.to_string());
        }

        if self.editor.history_limit > MAX_HISTORY_LIMIT {
            return invalid(
                "editor.history_limit",
                format!("{} (at most {MAX_HISTORY_LIMIT})", self.editor.history_limit),
            );
        }
        if !self.editor.highlight_intensity.is_finite() {
            return invalid(
                "editor.highlight_intensity",
                self.editor.highlight_intensity.to_string(),
            );
        }
        if self.capture.target_fragments == 0 {
            return invalid("capture.target_fragments", "0".into());
        }
        if self.texture.fetch_timeout_ms == 0 {
            return invalid("texture.fetch_timeout_ms", "0".into());
        }
        Ok(())
    }

    /// Save settings to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Directory exported containers go to
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join("meshes")))
            .unwrap_or_else(|| std::env::temp_dir().join("room-engine").join("meshes"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "roomengine", "room-engine")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = EngineSettings::default();
        assert_eq!(s.editor.history_limit, 20);
        assert_eq!(s.capture.progress_interval(), Duration::from_millis(250));
        assert_eq!(s.texture.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(s.camera.framing_factor, 1.5);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: EngineSettings =
            serde_json::from_str(r#"{"editor": {"history_limit": 5}, "camera": {"max_distance": 8.0}}"#)
                .unwrap();
        assert_eq!(s.editor.history_limit, 5);
        assert_eq!(s.editor.highlight_color, [0, 220, 255]);
        assert_eq!(s.camera.max_distance, 8.0);
        assert_eq!(s.camera.min_distance, 0.5);
        assert_eq!(s.capture, CaptureSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = EngineSettings::default();
        s.texture.fetch_timeout_ms = 1500;
        s.export_dir = Some(dir.path().join("out"));
        s.save_to(&path).unwrap();

        let loaded = EngineSettings::load_from(&path).unwrap();
        assert_eq!(loaded, s);
        assert_eq!(loaded.export_dir(), dir.path().join("out"));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            EngineSettings::load_from(&path),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        assert!(EngineSettings::default().validate().is_ok());

        let mut s = EngineSettings::default();
        s.camera.min_distance = 10.0;
        s.camera.max_distance = 5.0;
        assert!(matches!(s.validate(), Err(EngineError::InvalidInput(_))));

        let mut s = EngineSettings::default();
        s.editor.history_limit = usize::MAX;
        assert!(matches!(s.validate(), Err(EngineError::InvalidInput(_))));

        let mut s = EngineSettings::default();
        s.camera.fov_degrees = f32::NAN;
        assert!(s.validate().is_err());

        let mut s = EngineSettings::default();
        s.capture.target_fragments = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_load_rejects_inverted_distances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"camera": {"min_distance": 10.0, "max_distance": 5.0}}"#).unwrap();
        let err = EngineSettings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("camera.max_distance"), "{err}");
    }

    #[test]
    fn test_highlight_tint() {
        let s = EditorSettings::default();
        assert_eq!(s.highlight_tint()[0], 0.0);
        assert!((s.highlight_tint()[2] - 1.0).abs() < 1e-6);
    }
}
