use serde::{Deserialize, Serialize};

/// Name of a captured surface, as reported by the spatial-mapping source
pub type SurfaceName = String;

/// Semantic category of a room region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionLabel {
    Wall,
    Floor,
    Ceiling,
    Door,
    Window,
    Furniture,
    #[default]
    Other,
}

/// Keywords that identify furniture, in both names and edit selectors
pub const FURNITURE_KEYWORDS: &[&str] = &[
    "furniture",
    "sofa",
    "couch",
    "chair",
    "table",
    "desk",
    "bed",
    "cabinet",
    "shelf",
    "shelves",
    "bookshelf",
    "bookshelves",
    "dresser",
    "wardrobe",
    "bench",
    "stool",
    "ottoman",
];

impl RegionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionLabel::Wall => "wall",
            RegionLabel::Floor => "floor",
            RegionLabel::Ceiling => "ceiling",
            RegionLabel::Door => "door",
            RegionLabel::Window => "window",
            RegionLabel::Furniture => "furniture",
            RegionLabel::Other => "other",
        }
    }

    /// Infer a label from a surface name such as `wall_north_02` or `Sofa.001`.
    ///
    /// Keywords are matched against whole name tokens, so `bedroom_wall` is a
    /// wall. Openings are checked before walls because sources commonly name
    /// them after the wall they sit in (`wall_3_window`).
    pub fn infer(name: &str) -> Self {
        let labels: Vec<Self> = name_tokens(name)
            .iter()
            .filter_map(|token| Self::from_keyword(token))
            .collect();
        [
            RegionLabel::Door,
            RegionLabel::Window,
            RegionLabel::Furniture,
            RegionLabel::Ceiling,
            RegionLabel::Floor,
            RegionLabel::Wall,
        ]
        .into_iter()
        .find(|label| labels.contains(label))
        .unwrap_or(RegionLabel::Other)
    }

    /// Canonical category named by an edit selector, if the selector is one.
    pub fn from_selector(selector: &str) -> Option<Self> {
        Self::from_keyword(&selector.trim().to_lowercase())
    }

    /// Category for one lowercase word, singular or plural.
    fn from_keyword(word: &str) -> Option<Self> {
        singular_forms(word).into_iter().find_map(|w| match w {
            "wall" => Some(RegionLabel::Wall),
            "floor" => Some(RegionLabel::Floor),
            "ceiling" | "roof" => Some(RegionLabel::Ceiling),
            "door" => Some(RegionLabel::Door),
            "window" => Some(RegionLabel::Window),
            _ if FURNITURE_KEYWORDS.contains(&w) => Some(RegionLabel::Furniture),
            _ => None,
        })
    }
}

/// Lowercase words of a surface name. Splits on any non-alphanumeric
/// character, on lower-to-upper case changes (`SofaLeft`) and between letters
/// and digits (`wall3`).
pub fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        if let Some(p) = prev {
            let case_break = p.is_lowercase() && c.is_uppercase();
            let digit_break = p.is_ascii_digit() != c.is_ascii_digit();
            if (case_break || digit_break) && !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
        prev = Some(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// The word itself followed by its plausible singulars
/// (`benches` → `bench`, `walls` → `wall`).
fn singular_forms(word: &str) -> Vec<&str> {
    let mut forms = vec![word];
    if let Some(stem) = word.strip_suffix("es") {
        forms.push(stem);
    }
    if let Some(stem) = word.strip_suffix('s') {
        forms.push(stem);
    }
    forms
}

impl std::fmt::Display for RegionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placement of a fragment in the world frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    /// XYZ Euler angles in radians
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }

    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// A locally captured mesh piece, in its own frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Fragment {
    pub name: SurfaceName,
    pub vertices: Vec<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<[f32; 3]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    #[serde(default)]
    pub transform: Transform,
}

impl Fragment {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Raw message crossing the host bridge, in either direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub method: String,
    #[serde(default)]
    pub data: String,
}

impl BridgeMessage {
    pub fn new(method: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            data: data.into(),
        }
    }
}

/// Payload of an `apply-edit` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub selector: String,
    pub property: String,
    pub value: String,
}

/// Pointer input forwarded by the host UI, in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { id: u64, x: f32, y: f32 },
    Move { id: u64, x: f32, y: f32 },
    Up { id: u64, x: f32, y: f32 },
    Cancel { id: u64 },
    Wheel { delta: f32 },
}
