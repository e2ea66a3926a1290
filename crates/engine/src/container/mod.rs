//! Scene container: binary glTF 2.0 (GLB) encode and decode.
//!
//! Layout of an encoded scene:
//!
//! ```text
//! header   magic "glTF" | version 2 | total length        (12 bytes)
//! chunk 0  length | "JSON" | document, space padded
//! chunk 1  length | "BIN\0" | indices, positions, normals, uvs, images
//! ```
//!
//! Every section in the binary chunk starts on a 4-byte boundary and the
//! JSON bufferViews mirror those offsets exactly.

pub mod gltf;

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use shared::RegionLabel;

use crate::error::{EngineError, Result};
use crate::state::material::{Material, Texture};
use crate::state::scene::{RegionSegment, Scene};
use crate::validation::MeshValidator;
use crate::viewport::mesh::{IndexWidth, Mesh};

use gltf::{
    Accessor, Asset, Buffer, BufferView, Document, ImageDef, MaterialDef, MaterialParams, MeshDef,
    MeshExtras, Node, Primitive, RegionExtra, SceneDef, TextureDef,
};

/// GLB magic number: "glTF"
pub const GLB_MAGIC: u32 = 0x46546C67;
/// GLB version 2
pub const GLB_VERSION: u32 = 2;
/// JSON chunk type
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F534A;
/// BIN chunk type
pub const CHUNK_TYPE_BIN: u32 = 0x004E4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

const GENERATOR: &str = concat!("room-engine ", env!("CARGO_PKG_VERSION"));

/// A decoded container: the scene plus the region table it carried.
#[derive(Clone, Debug)]
pub struct DecodedScene {
    pub scene: Scene,
    pub segments: Vec<RegionSegment>,
}

// ── Encoding ────────────────────────────────────────────────────

/// Encode a scene and its region segments as GLB.
///
/// With no segments the container carries no region table. Output is
/// deterministic for identical input.
pub fn encode(scene: &Scene, segments: &[RegionSegment]) -> Result<Vec<u8>> {
    let mesh = &scene.mesh;
    if mesh.is_empty() || mesh.indices.is_empty() {
        return Err(EngineError::InvalidInput("cannot encode an empty mesh".into()));
    }
    mesh.check_integrity()?;
    for seg in segments {
        if seg.first_index % 3 != 0
            || seg.index_count % 3 != 0
            || seg.first_index + seg.index_count > mesh.indices.len()
        {
            return Err(EngineError::Integrity(format!(
                "region '{}' lies outside the index buffer",
                seg.name
            )));
        }
    }

    let mut bin = BinWriter::default();
    let mut doc = Document {
        asset: Asset {
            version: "2.0".to_string(),
            generator: Some(GENERATOR.to_string()),
        },
        scene: Some(0),
        scenes: vec![SceneDef {
            name: Some(scene.name.clone()),
            nodes: vec![0],
        }],
        nodes: vec![Node {
            name: Some(scene.name.clone()),
            mesh: Some(0),
        }],
        ..Default::default()
    };

    // Indices first, then attributes, in the order the bufferViews list them
    let width = mesh.index_width();
    let index_bytes = match width {
        IndexWidth::U16 => mesh
            .indices
            .iter()
            .flat_map(|&i| (i as u16).to_le_bytes())
            .collect::<Vec<u8>>(),
        IndexWidth::U32 => mesh.indices.iter().flat_map(|&i| i.to_le_bytes()).collect(),
    };
    let index_component = match width {
        IndexWidth::U16 => gltf::UNSIGNED_SHORT,
        IndexWidth::U32 => gltf::UNSIGNED_INT,
    };
    let indices = push_accessor(
        &mut doc,
        &mut bin,
        &index_bytes,
        Some(gltf::ELEMENT_ARRAY_BUFFER),
        index_component,
        mesh.indices.len(),
        "SCALAR",
    );

    let mut attributes = BTreeMap::new();

    let bounds = mesh.aabb().unwrap_or_default();
    let position = push_accessor(
        &mut doc,
        &mut bin,
        &vec3_bytes(&mesh.positions),
        Some(gltf::ARRAY_BUFFER),
        gltf::FLOAT,
        mesh.vertex_count(),
        "VEC3",
    );
    doc.accessors[position].min = Some(bounds.min.to_array().to_vec());
    doc.accessors[position].max = Some(bounds.max.to_array().to_vec());
    attributes.insert("POSITION".to_string(), position);

    if let Some(normals) = &mesh.normals {
        let normal = push_accessor(
            &mut doc,
            &mut bin,
            &vec3_bytes(normals),
            Some(gltf::ARRAY_BUFFER),
            gltf::FLOAT,
            normals.len(),
            "VEC3",
        );
        attributes.insert("NORMAL".to_string(), normal);
    }

    if let Some(uvs) = &mesh.uvs {
        let bytes: Vec<u8> = uvs
            .iter()
            .flat_map(|uv| uv.to_array())
            .flat_map(f32::to_le_bytes)
            .collect();
        let uv = push_accessor(
            &mut doc,
            &mut bin,
            &bytes,
            Some(gltf::ARRAY_BUFFER),
            gltf::FLOAT,
            uvs.len(),
            "VEC2",
        );
        attributes.insert("TEXCOORD_0".to_string(), uv);
    }

    // Images go last; identical textures are embedded once
    let mut images = ImageTable::default();
    let root = root_material(scene, segments);
    let root_texture = images.index(root.texture.as_ref(), &mut doc, &mut bin);
    doc.materials.push(MaterialDef::from_material(root, root_texture));

    let mut regions = Vec::with_capacity(segments.len());
    for seg in segments {
        let material = seg.material.as_ref().unwrap_or(&scene.material);
        regions.push(RegionExtra {
            name: seg.name.clone(),
            label: seg.label,
            first_index: seg.first_index,
            index_count: seg.index_count,
            material: MaterialParams::from(material),
            texture: images.index(material.texture.as_ref(), &mut doc, &mut bin),
        });
    }

    doc.meshes.push(MeshDef {
        name: Some(scene.name.clone()),
        primitives: vec![Primitive {
            attributes,
            indices: Some(indices),
            material: Some(0),
            mode: Some(gltf::TRIANGLES),
        }],
        extras: (!regions.is_empty()).then_some(MeshExtras { regions }),
    });
    doc.buffers.push(Buffer {
        byte_length: bin.data.len(),
    });

    let json = serde_json::to_vec(&doc)
        .map_err(|e| EngineError::InvalidInput(format!("scene document: {e}")))?;
    assemble(json, bin.data)
}

/// Material written as the primitive's own, which is all a standard viewer
/// draws. When every region looks the same that look is it, so a room edited
/// as a whole exports as edited; otherwise the scene's base material.
fn root_material<'a>(scene: &'a Scene, segments: &'a [RegionSegment]) -> &'a Material {
    let mut materials = segments
        .iter()
        .map(|seg| seg.material.as_ref().unwrap_or(&scene.material));
    match materials.next() {
        Some(first) if materials.all(|m| m == first) => first,
        _ => &scene.material,
    }
}

/// Embedded images, keyed by their encoded bytes
#[derive(Default)]
struct ImageTable {
    embedded: Vec<Arc<[u8]>>,
}

impl ImageTable {
    /// Texture index for `texture`, embedding its image on first use.
    fn index(&mut self, texture: Option<&Texture>, doc: &mut Document, bin: &mut BinWriter) -> Option<usize> {
        let texture = texture?;
        if let Some(i) = self.embedded.iter().position(|b| *b == texture.bytes) {
            return Some(i);
        }
        let (offset, len) = bin.push(&texture.bytes);
        doc.buffer_views.push(BufferView {
            buffer: 0,
            byte_offset: offset,
            byte_length: len,
            ..Default::default()
        });
        doc.images.push(ImageDef {
            buffer_view: Some(doc.buffer_views.len() - 1),
            mime_type: Some(texture.mime_type.clone()),
        });
        doc.textures.push(TextureDef {
            source: Some(doc.images.len() - 1),
        });
        self.embedded.push(texture.bytes.clone());
        Some(doc.textures.len() - 1)
    }
}

/// Binary chunk under construction; every section starts 4-byte aligned.
#[derive(Default)]
struct BinWriter {
    data: Vec<u8>,
}

impl BinWriter {
    /// Append a section, returning its offset and unpadded length.
    fn push(&mut self, bytes: &[u8]) -> (usize, usize) {
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        // Pad to 4-byte alignment with zeros
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        (offset, bytes.len())
    }
}

fn push_accessor(
    doc: &mut Document,
    bin: &mut BinWriter,
    bytes: &[u8],
    target: Option<u32>,
    component_type: u32,
    count: usize,
    kind: &str,
) -> usize {
    let (offset, len) = bin.push(bytes);
    doc.buffer_views.push(BufferView {
        buffer: 0,
        byte_offset: offset,
        byte_length: len,
        byte_stride: None,
        target,
    });
    doc.accessors.push(Accessor {
        buffer_view: Some(doc.buffer_views.len() - 1),
        byte_offset: 0,
        component_type,
        count,
        kind: kind.to_string(),
        min: None,
        max: None,
    });
    doc.accessors.len() - 1
}

fn vec3_bytes(data: &[Vec3]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(data.len() * 12);
    for v in data {
        for f in v.to_array() {
            bytes.extend_from_slice(&f.to_le_bytes());
        }
    }
    bytes
}

fn assemble(mut json: Vec<u8>, bin: Vec<u8>) -> Result<Vec<u8>> {
    // JSON chunk pads with spaces, BIN with zeros
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = HEADER_LEN + CHUNK_HEADER_LEN + json.len() + CHUNK_HEADER_LEN + bin.len();
    let total_length = u32::try_from(total)
        .map_err(|_| EngineError::InvalidInput(format!("container of {total} bytes exceeds 4 GiB")))?;

    let mut glb = Vec::with_capacity(total);

    // Header
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&total_length.to_le_bytes());

    // JSON chunk
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
    glb.extend_from_slice(&json);

    // BIN chunk
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
    glb.extend_from_slice(&bin);

    Ok(glb)
}

// ── Decoding ────────────────────────────────────────────────────

/// Decode a GLB container.
pub fn decode(bytes: &[u8]) -> Result<DecodedScene> {
    let (json, bin) = split_chunks(bytes)?;

    let doc: Document = serde_json::from_slice(json)
        .map_err(|e| EngineError::malformed(format!("JSON chunk: {e}")))?;
    if let Some(buffer) = doc.buffers.first() {
        if buffer.byte_length > bin.len() {
            return Err(EngineError::malformed(format!(
                "buffer declares {} bytes, BIN chunk has {}",
                buffer.byte_length,
                bin.len()
            )));
        }
    }

    let reader = Reader { doc: &doc, bin };
    let mesh_index = doc
        .scene
        .and_then(|s| doc.scenes.get(s))
        .and_then(|s| s.nodes.iter().find_map(|&n| doc.nodes.get(n)?.mesh))
        .unwrap_or(0);
    let mesh_def = doc
        .meshes
        .get(mesh_index)
        .ok_or_else(|| EngineError::malformed("no mesh"))?;
    let primitive = mesh_def
        .primitives
        .first()
        .ok_or_else(|| EngineError::malformed("mesh has no primitives"))?;
    if primitive.mode.is_some_and(|m| m != gltf::TRIANGLES) {
        return Err(EngineError::malformed("only triangle lists are supported"));
    }

    let position = *primitive
        .attributes
        .get("POSITION")
        .ok_or_else(|| EngineError::malformed("primitive has no POSITION"))?;
    let positions: Vec<Vec3> = reader
        .floats(position, "VEC3")?
        .chunks_exact(3)
        .map(Vec3::from_slice)
        .collect();

    let normals = match primitive.attributes.get("NORMAL") {
        Some(&i) => Some(
            reader
                .floats(i, "VEC3")?
                .chunks_exact(3)
                .map(Vec3::from_slice)
                .collect(),
        ),
        None => None,
    };
    let uvs = match primitive.attributes.get("TEXCOORD_0") {
        Some(&i) => Some(
            reader
                .floats(i, "VEC2")?
                .chunks_exact(2)
                .map(Vec2::from_slice)
                .collect(),
        ),
        None => None,
    };
    let indices = match primitive.indices {
        Some(i) => reader.indices(i)?,
        None => (0..positions.len() as u32).collect(),
    };

    let mesh = Mesh {
        positions,
        normals,
        uvs,
        indices,
    };
    let problems = MeshValidator::new(&mesh).validate_all();
    if !problems.is_empty() {
        return Err(EngineError::malformed(problems.join("; ")));
    }

    let material = match primitive.material.and_then(|m| doc.materials.get(m)) {
        Some(def) => {
            let mut material = def.to_material();
            material.texture = def
                .pbr_metallic_roughness
                .base_color_texture
                .map(|t| reader.texture(t.index))
                .transpose()?;
            material
        }
        None => Material::default(),
    };

    let name = mesh_def.name.clone().unwrap_or_else(|| "scene".to_string());
    let index_len = mesh.indices.len();
    let scene = Scene::new(name.clone(), mesh, material);

    let segments = match &mesh_def.extras {
        Some(extras) if !extras.regions.is_empty() => extras
            .regions
            .iter()
            .map(|r| region_segment(r, &reader, index_len))
            .collect::<Result<Vec<_>>>()?,
        _ => vec![RegionSegment {
            label: RegionLabel::infer(&name),
            name,
            first_index: 0,
            index_count: index_len,
            material: None,
        }],
    };

    tracing::debug!(
        "Decoded container: {} vertices, {} regions",
        scene.mesh.vertex_count(),
        segments.len()
    );
    Ok(DecodedScene { scene, segments })
}

fn region_segment(extra: &RegionExtra, reader: &Reader<'_>, index_len: usize) -> Result<RegionSegment> {
    let end = extra.first_index.checked_add(extra.index_count);
    if extra.first_index % 3 != 0 || extra.index_count % 3 != 0 || !matches!(end, Some(e) if e <= index_len) {
        return Err(EngineError::malformed(format!(
            "region '{}' lies outside the index buffer",
            extra.name
        )));
    }
    let mut material = extra.material.to_material();
    material.texture = extra.texture.map(|t| reader.texture(t)).transpose()?;
    Ok(RegionSegment {
        name: extra.name.clone(),
        label: extra.label,
        first_index: extra.first_index,
        index_count: extra.index_count,
        material: Some(material),
    })
}

/// Validate the header and return the JSON and BIN chunk payloads.
fn split_chunks(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    if bytes.len() < HEADER_LEN {
        return Err(EngineError::malformed("truncated header"));
    }
    if read_u32(bytes, 0) != GLB_MAGIC {
        return Err(EngineError::malformed("bad magic"));
    }
    let version = read_u32(bytes, 4);
    if version != GLB_VERSION {
        return Err(EngineError::UnsupportedVersion(version));
    }
    let declared = read_u32(bytes, 8) as usize;
    if declared != bytes.len() {
        return Err(EngineError::malformed(format!(
            "header declares {} bytes, got {}",
            declared,
            bytes.len()
        )));
    }

    let (json, next) = read_chunk(bytes, HEADER_LEN, CHUNK_TYPE_JSON, "JSON")?;
    let (bin, _) = read_chunk(bytes, next, CHUNK_TYPE_BIN, "BIN")?;
    Ok((json, bin))
}

fn read_chunk<'a>(bytes: &'a [u8], at: usize, tag: u32, name: &str) -> Result<(&'a [u8], usize)> {
    if bytes.len() < at + CHUNK_HEADER_LEN {
        return Err(EngineError::malformed(format!("missing {name} chunk")));
    }
    if read_u32(bytes, at + 4) != tag {
        return Err(EngineError::malformed(format!("expected {name} chunk tag")));
    }
    let len = read_u32(bytes, at) as usize;
    let start = at + CHUNK_HEADER_LEN;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| EngineError::malformed(format!("{name} chunk overruns the container")))?;
    Ok((&bytes[start..end], end))
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Bounds-checked access to accessor and image data
struct Reader<'a> {
    doc: &'a Document,
    bin: &'a [u8],
}

impl<'a> Reader<'a> {
    fn view_bytes(&self, view_index: usize) -> Result<&'a [u8]> {
        let view = self
            .doc
            .buffer_views
            .get(view_index)
            .ok_or_else(|| EngineError::malformed(format!("bufferView {view_index} missing")))?;
        if view.buffer != 0 {
            return Err(EngineError::malformed("external buffers are not supported"));
        }
        view.byte_offset
            .checked_add(view.byte_length)
            .and_then(|end| self.bin.get(view.byte_offset..end))
            .ok_or_else(|| EngineError::malformed(format!("bufferView {view_index} outside BIN chunk")))
    }

    /// Raw, tightly packed bytes of an accessor plus its component type.
    fn accessor_bytes(&self, index: usize, kind: &str) -> Result<(&'a [u8], u32)> {
        let acc = self
            .doc
            .accessors
            .get(index)
            .ok_or_else(|| EngineError::malformed(format!("accessor {index} missing")))?;
        if acc.kind != kind {
            return Err(EngineError::malformed(format!(
                "accessor {index} is {}, expected {kind}",
                acc.kind
            )));
        }
        let view_index = acc
            .buffer_view
            .ok_or_else(|| EngineError::malformed(format!("accessor {index} has no bufferView")))?;
        let element = acc.components().zip(gltf::component_size(acc.component_type));
        let Some((components, size)) = element else {
            return Err(EngineError::malformed(format!("accessor {index} has an unknown layout")));
        };
        let stride = components * size;
        let interleaved = self
            .doc
            .buffer_views
            .get(view_index)
            .and_then(|v| v.byte_stride)
            .is_some_and(|s| s != stride);
        if interleaved {
            return Err(EngineError::malformed(format!("accessor {index} is interleaved")));
        }

        let view = self.view_bytes(view_index)?;
        acc.count
            .checked_mul(stride)
            .and_then(|len| acc.byte_offset.checked_add(len))
            .and_then(|end| view.get(acc.byte_offset..end))
            .map(|data| (data, acc.component_type))
            .ok_or_else(|| EngineError::malformed(format!("accessor {index} overruns its bufferView")))
    }

    fn floats(&self, index: usize, kind: &str) -> Result<Vec<f32>> {
        let (data, component_type) = self.accessor_bytes(index, kind)?;
        if component_type != gltf::FLOAT {
            return Err(EngineError::malformed(format!("accessor {index} is not float")));
        }
        Ok(data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn indices(&self, index: usize) -> Result<Vec<u32>> {
        let (data, component_type) = self.accessor_bytes(index, "SCALAR")?;
        Ok(match component_type {
            gltf::UNSIGNED_BYTE => data.iter().map(|&b| b as u32).collect(),
            gltf::UNSIGNED_SHORT => data
                .chunks_exact(2)
                .map(|b| u16::from_le_bytes([b[0], b[1]]) as u32)
                .collect(),
            gltf::UNSIGNED_INT => data
                .chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            other => {
                return Err(EngineError::malformed(format!(
                    "index component type {other} is not an unsigned integer"
                )))
            }
        })
    }

    fn texture(&self, index: usize) -> Result<Texture> {
        let image = self
            .doc
            .textures
            .get(index)
            .and_then(|t| t.source)
            .and_then(|s| self.doc.images.get(s))
            .ok_or_else(|| EngineError::malformed(format!("texture {index} has no image")))?;
        let view = image
            .buffer_view
            .ok_or_else(|| EngineError::malformed("image without bufferView"))?;
        let bytes = self.view_bytes(view)?.to_vec();
        crate::texture::decode_texture(bytes, "embedded image")
            .map_err(|_| EngineError::malformed(format!("texture {index} is not a PNG or JPEG image")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::state::material::AlphaMode;

    fn room_bytes() -> Vec<u8> {
        let (scene, segments) = fixtures::box_room_scene(4.0, 3.0, 2.5);
        encode(&scene, &segments).unwrap()
    }

    fn json_of(glb: &[u8]) -> serde_json::Value {
        let (json, _) = split_chunks(glb).unwrap();
        serde_json::from_slice(json).unwrap()
    }

    #[test]
    fn test_header_and_alignment() {
        let glb = room_bytes();
        assert_eq!(read_u32(&glb, 0), GLB_MAGIC);
        assert_eq!(read_u32(&glb, 4), 2);
        assert_eq!(read_u32(&glb, 8) as usize, glb.len());
        assert_eq!(glb.len() % 4, 0);

        let json_len = read_u32(&glb, 12) as usize;
        assert_eq!(json_len % 4, 0);
        assert_eq!(read_u32(&glb, 16), CHUNK_TYPE_JSON);
        let bin_at = 20 + json_len;
        assert_eq!(read_u32(&glb, bin_at + 4), CHUNK_TYPE_BIN);
        assert_eq!(read_u32(&glb, bin_at) as usize % 4, 0);
    }

    #[test]
    fn test_buffer_views_are_aligned_and_targeted() {
        let json = json_of(&room_bytes());
        let views = json["bufferViews"].as_array().unwrap();
        assert_eq!(views[0]["target"], gltf::ELEMENT_ARRAY_BUFFER);
        assert_eq!(views[0]["byteOffset"], 0);
        for view in &views[1..] {
            assert_eq!(view["target"], gltf::ARRAY_BUFFER);
            assert_eq!(view["byteOffset"].as_u64().unwrap() % 4, 0);
        }
        let attrs = &json["meshes"][0]["primitives"][0]["attributes"];
        assert!(attrs.get("NORMAL").is_some());
        assert!(attrs.get("TEXCOORD_0").is_some());
        assert_eq!(json["buffers"].as_array().unwrap().len(), 1);
        assert!(json["buffers"][0].get("uri").is_none());
    }

    #[test]
    fn test_u16_index_padding() {
        // 3 u16 indices take 6 bytes; positions must start at 8
        let scene = Scene::new(
            "tri",
            Mesh {
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                normals: None,
                uvs: None,
                indices: vec![0, 1, 2],
            },
            Material::default(),
        );
        let glb = encode(&scene, &[]).unwrap();
        let json = json_of(&glb);
        assert_eq!(json["bufferViews"][0]["byteLength"], 6);
        assert_eq!(json["bufferViews"][1]["byteOffset"], 8);
        assert_eq!(json["accessors"][0]["componentType"], gltf::UNSIGNED_SHORT);
        assert_eq!(json["accessors"][1]["min"], serde_json::json!([0.0, 0.0, 0.0]));
        assert_eq!(json["accessors"][1]["max"], serde_json::json!([1.0, 1.0, 0.0]));
        assert!(json["meshes"][0].get("extras").is_none());

        let (_, bin) = split_chunks(&glb).unwrap();
        assert_eq!(&bin[6..8], &[0, 0]);
    }

    #[test]
    fn test_roundtrip_with_regions() {
        let (scene, segments) = fixtures::box_room_scene(4.0, 3.0, 2.5);
        let decoded = decode(&encode(&scene, &segments).unwrap()).unwrap();
        assert_eq!(decoded.scene.mesh, scene.mesh);
        assert!(decoded.scene.bounds.approx_eq(&scene.bounds, 1e-6));
        assert_eq!(decoded.segments.len(), segments.len());
        for (got, want) in decoded.segments.iter().zip(&segments) {
            assert_eq!(got.name, want.name);
            assert_eq!(got.label, want.label);
            assert_eq!(got.first_index, want.first_index);
            assert_eq!(got.index_count, want.index_count);
        }
    }

    #[test]
    fn test_without_extras_is_single_region() {
        let (scene, _) = fixtures::box_room_scene(1.0, 1.0, 1.0);
        let decoded = decode(&encode(&scene, &[]).unwrap()).unwrap();
        assert_eq!(decoded.segments.len(), 1);
        assert_eq!(decoded.segments[0].name, "room");
        assert_eq!(decoded.segments[0].index_count, scene.mesh.indices.len());
    }

    #[test]
    fn test_materials_and_textures_survive() {
        let (mut scene, mut segments) = fixtures::box_room_scene(4.0, 3.0, 2.5);
        let png = crate::texture::tests::png_bytes(2, 2);
        let texture = crate::texture::decode_texture(png, "test").unwrap();
        scene.material = scene.material.with_texture(texture.clone());
        segments[0].material = Some(Material::default().with_color([1.0, 0.0, 0.0, 0.5]));
        segments[1].material = Some(Material::default().with_texture(texture));

        let glb = encode(&scene, &segments).unwrap();
        let json = json_of(&glb);
        // one image shared by the root material and the second region
        assert_eq!(json["images"].as_array().unwrap().len(), 1);
        assert_eq!(json["materials"][0]["pbrMetallicRoughness"]["baseColorTexture"]["index"], 0);

        let decoded = decode(&glb).unwrap();
        assert_eq!(decoded.scene.material.texture.as_ref().unwrap().width, 2);
        let first = decoded.segments[0].material.as_ref().unwrap();
        assert_eq!(first.alpha_mode, AlphaMode::Blend);
        assert_eq!(first.base_color, [1.0, 0.0, 0.0, 0.5]);
        assert!(decoded.segments[1].material.as_ref().unwrap().texture.is_some());
    }

    #[test]
    fn test_uniform_region_material_becomes_root() {
        let (scene, mut segments) = fixtures::box_room_scene(4.0, 3.0, 2.5);
        let red = Material::default().with_color([1.0, 0.0, 0.0, 1.0]);
        for seg in &mut segments {
            seg.material = Some(red.clone());
        }
        let json = json_of(&encode(&scene, &segments).unwrap());
        assert_eq!(
            json["materials"][0]["pbrMetallicRoughness"]["baseColorFactor"],
            serde_json::json!([1.0, 0.0, 0.0, 1.0])
        );

        // one region differing keeps the scene's base material at the root
        segments[3].material = Some(Material::default());
        let json = json_of(&encode(&scene, &segments).unwrap());
        let base = scene.material.base_color.map(|c| c as f64);
        let root = json["materials"][0]["pbrMetallicRoughness"]["baseColorFactor"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect::<Vec<_>>();
        for (got, want) in root.iter().zip(base) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(room_bytes(), room_bytes());
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let scene = Scene::new("empty", Mesh::default(), Material::default());
        assert!(matches!(encode(&scene, &[]), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_broken_mesh_is_integrity_error() {
        let (mut scene, _) = fixtures::box_room_scene(1.0, 1.0, 1.0);
        scene.mesh.indices[0] = 10_000;
        assert!(matches!(encode(&scene, &[]), Err(EngineError::Integrity(_))));
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let mut glb = room_bytes();
        glb[0] = b'x';
        assert!(matches!(decode(&glb), Err(EngineError::MalformedContainer(_))));
    }

    #[test]
    fn test_decode_rejects_version() {
        let mut glb = room_bytes();
        glb[4..8].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(decode(&glb), Err(EngineError::UnsupportedVersion(1))));
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        let mut glb = room_bytes();
        glb.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(decode(&glb), Err(EngineError::MalformedContainer(_))));
        assert!(matches!(decode(&glb[..10]), Err(EngineError::MalformedContainer(_))));
    }

    #[test]
    fn test_decode_rejects_bad_chunk_tag() {
        let mut glb = room_bytes();
        glb[16..20].copy_from_slice(b"JSOX");
        assert!(matches!(decode(&glb), Err(EngineError::MalformedContainer(_))));
    }

    #[test]
    fn test_decode_rejects_overrunning_accessor() {
        let (scene, _) = fixtures::box_room_scene(1.0, 1.0, 1.0);
        let glb = encode(&scene, &[]).unwrap();
        let (json, bin) = split_chunks(&glb).unwrap();
        let mut doc: Document = serde_json::from_slice(json).unwrap();
        doc.accessors[1].count += 100;
        let rebuilt = assemble(serde_json::to_vec(&doc).unwrap(), bin.to_vec()).unwrap();
        assert!(matches!(decode(&rebuilt), Err(EngineError::MalformedContainer(_))));
    }
}
