pub mod editor;
pub mod material;
pub mod palette;
pub mod presets;
pub mod scene;
pub mod selection;
pub mod settings;

pub use editor::{AppearanceEditor, AppliedEdit, EditOutcome, EditProperty, TextureRequest};
pub use material::{AlphaMode, Material, SharedMaterial, Texture};
pub use presets::{AssetLibrary, MaterialAsset, PresetKind};
pub use scene::history::{EditHistory, EditRecord};
pub use scene::{Region, RegionId, RegionSegment, Scene, SceneState};
pub use selection::SelectionState;
pub use settings::EngineSettings;
