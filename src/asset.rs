//! Static asset loading (OBJ models and textures).
//!
//! Assets are requested by path relative to the asset root and resolve on
//! the next [`Assets::poll`], the way an asynchronous loader would hand them
//! back a frame later. Until then a request is [`AssetState::Pending`] and the
//! caller keeps showing its fallback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use glam::Vec3;

use crate::scene_graph::CustomGeometry;

/// Load state of a requested asset.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetState<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> AssetState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AssetState::Pending)
    }

    pub fn ready(self) -> Option<T> {
        match self {
            AssetState::Ready(v) => Some(v),
            _ => None,
        }
    }

    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(v) => AssetState::Ready(v),
            Err(e) => AssetState::Failed(format!("{:#}", e)),
        }
    }
}

/// One named object of a loaded model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPart {
    pub name: String,
    pub geometry: CustomGeometry,
}

/// A model decoded from an OBJ file. Each OBJ object becomes one part.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub name: String,
    pub parts: Vec<ModelPart>,
}

impl ModelData {
    /// Parse Wavefront OBJ content. Material libraries are ignored.
    pub fn from_obj(name: &str, obj_content: &str) -> Result<Self> {
        let mut cursor = std::io::Cursor::new(obj_content.as_bytes());

        let load_options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };

        let (models, _materials) =
            tobj::load_obj_buf(&mut cursor, &load_options, |_| Ok((vec![], HashMap::new())))
                .map_err(|e| anyhow!("failed to parse OBJ: {}", e))?;

        let parts: Vec<ModelPart> = models
            .into_iter()
            .filter(|model| !model.mesh.positions.is_empty())
            .map(|model| {
                let positions = model
                    .mesh
                    .positions
                    .chunks_exact(3)
                    .map(|p| Vec3::new(p[0], p[1], p[2]))
                    .collect();
                ModelPart {
                    name: model.name,
                    geometry: CustomGeometry::new(positions, model.mesh.indices),
                }
            })
            .collect();

        if parts.is_empty() {
            return Err(anyhow!("OBJ file contains no vertices"));
        }

        Ok(Self {
            name: name.to_string(),
            parts,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.geometry.vertex_count).sum()
    }
}

/// Texture metadata. Pixels stay with the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
}

/// Handle to an asset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    Model,
    Texture,
}

#[derive(Debug)]
enum Loaded {
    Model(AssetState<ModelData>),
    Texture(AssetState<TextureInfo>),
}

#[derive(Debug)]
struct Request {
    path: String,
    kind: AssetKind,
    result: Option<Loaded>,
}

/// Loader rooted at the public asset directory.
#[derive(Debug)]
pub struct Assets {
    root: PathBuf,
    requests: HashMap<AssetHandle, Request>,
    next_handle: u64,
}

impl Assets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            requests: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an asset path (leading `/` allowed) against the root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    /// Load an OBJ model immediately.
    pub fn load_obj(&self, path: &str) -> AssetState<ModelData> {
        AssetState::from_result(self.read_obj(path))
    }

    /// Read texture dimensions immediately.
    pub fn load_texture(&self, path: &str) -> AssetState<TextureInfo> {
        AssetState::from_result(self.read_texture(path))
    }

    fn read_obj(&self, path: &str) -> Result<ModelData> {
        let full = self.resolve(path);
        let content = std::fs::read_to_string(&full)
            .with_context(|| format!("failed to read model {}", full.display()))?;
        let name = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(path);
        ModelData::from_obj(name, &content)
            .with_context(|| format!("failed to load model {}", full.display()))
    }

    fn read_texture(&self, path: &str) -> Result<TextureInfo> {
        let full = self.resolve(path);
        let (width, height) = image::image_dimensions(&full)
            .with_context(|| format!("failed to read texture {}", full.display()))?;
        Ok(TextureInfo { width, height })
    }

    /// Queue an OBJ load; it resolves on the next [`poll`](Self::poll).
    pub fn request_obj(&mut self, path: &str) -> AssetHandle {
        self.request(path, AssetKind::Model)
    }

    /// Queue a texture load; it resolves on the next [`poll`](Self::poll).
    pub fn request_texture(&mut self, path: &str) -> AssetHandle {
        self.request(path, AssetKind::Texture)
    }

    fn request(&mut self, path: &str, kind: AssetKind) -> AssetHandle {
        let handle = AssetHandle(self.next_handle);
        self.next_handle += 1;
        self.requests.insert(
            handle,
            Request {
                path: path.to_string(),
                kind,
                result: None,
            },
        );
        handle
    }

    /// Resolve every pending request. Returns the number resolved.
    pub fn poll(&mut self) -> usize {
        let pending: Vec<(AssetHandle, String, AssetKind)> = self
            .requests
            .iter()
            .filter(|(_, r)| r.result.is_none())
            .map(|(h, r)| (*h, r.path.clone(), r.kind))
            .collect();

        for (handle, path, kind) in &pending {
            let loaded = match kind {
                AssetKind::Model => Loaded::Model(self.load_obj(path)),
                AssetKind::Texture => Loaded::Texture(self.load_texture(path)),
            };
            match &loaded {
                Loaded::Model(AssetState::Failed(e)) | Loaded::Texture(AssetState::Failed(e)) => {
                    log::warn!("asset {} failed: {}", path, e)
                }
                _ => log::info!("asset {} loaded", path),
            }
            if let Some(request) = self.requests.get_mut(handle) {
                request.result = Some(loaded);
            }
        }
        pending.len()
    }

    /// State of a model request. Unknown handles read as failed.
    pub fn model(&self, handle: AssetHandle) -> AssetState<&ModelData> {
        match self.requests.get(&handle) {
            None => AssetState::Failed("unknown asset handle".to_string()),
            Some(Request { result: None, .. }) => AssetState::Pending,
            Some(Request {
                result: Some(Loaded::Model(state)),
                ..
            }) => match state {
                AssetState::Ready(m) => AssetState::Ready(m),
                AssetState::Failed(e) => AssetState::Failed(e.clone()),
                AssetState::Pending => AssetState::Pending,
            },
            Some(_) => AssetState::Failed("asset is not a model".to_string()),
        }
    }

    /// State of a texture request. Unknown handles read as failed.
    pub fn texture(&self, handle: AssetHandle) -> AssetState<TextureInfo> {
        match self.requests.get(&handle) {
            None => AssetState::Failed("unknown asset handle".to_string()),
            Some(Request { result: None, .. }) => AssetState::Pending,
            Some(Request {
                result: Some(Loaded::Texture(state)),
                ..
            }) => state.clone(),
            Some(_) => AssetState::Failed("asset is not a texture".to_string()),
        }
    }

    /// Drop a request, discarding its result whether or not it resolved.
    pub fn release(&mut self, handle: AssetHandle) -> bool {
        self.requests.remove(&handle).is_some()
    }

    pub fn pending(&self) -> usize {
        self.requests.values().filter(|r| r.result.is_none()).count()
    }
}

impl Default for Assets {
    fn default() -> Self {
        Self::new("public")
    }
}
