//! Directory of exported scene containers, addressed by mesh ID.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{EngineError, Result};

const EXTENSION: &str = "glb";

/// One stored container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMesh {
    pub id: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct MeshStore {
    dir: PathBuf,
}

impl MeshStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh ID of the form `mesh_<12 hex digits>`
    pub fn generate_id() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("mesh_{}", &hex[..12])
    }

    /// IDs are file stems; only `[a-z0-9_]` is accepted so an ID can never
    /// name a path outside the store.
    pub fn validate_id(id: &str) -> Result<()> {
        let valid = !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if valid {
            Ok(())
        } else {
            Err(EngineError::invalid_value("mesh id", id))
        }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{EXTENSION}"))
    }

    /// Write a container under a new ID.
    pub fn save(&self, bytes: &[u8]) -> Result<StoredMesh> {
        std::fs::create_dir_all(&self.dir)?;
        let id = Self::generate_id();
        let path = self.path_for(&id);
        std::fs::write(&path, bytes)?;
        tracing::info!("Stored {} ({} bytes)", path.display(), bytes.len());
        Ok(StoredMesh {
            id,
            path,
            size: bytes.len() as u64,
        })
    }

    /// Stored container by ID, or `None` if absent.
    pub fn get(&self, id: &str) -> Result<Option<StoredMesh>> {
        Self::validate_id(id)?;
        let path = self.path_for(id);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(StoredMesh {
                id: id.to_string(),
                path,
                size: meta.len(),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn read(&self, id: &str) -> Result<Vec<u8>> {
        match self.get(id)? {
            Some(stored) => Ok(std::fs::read(stored.path)?),
            None => Err(EngineError::InvalidInput(format!("mesh '{id}' not found"))),
        }
    }

    /// Delete a stored container. Returns false if it did not exist.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let Some(stored) = self.get(id)? else {
            return Ok(false);
        };
        std::fs::remove_file(&stored.path)?;
        tracing::info!("Deleted {}", stored.path.display());
        Ok(true)
    }

    /// All stored containers, sorted by ID. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<StoredMesh>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut meshes = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if Self::validate_id(id).is_err() {
                continue;
            }
            let meta = entry.metadata()?;
            if meta.is_file() {
                meshes.push(StoredMesh {
                    id: id.to_string(),
                    path: path.clone(),
                    size: meta.len(),
                });
            }
        }
        meshes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(meshes)
    }
}
