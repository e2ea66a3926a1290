//! The long-lived engine service.
//!
//! [`RoomEngine`] owns every piece of state for one capture/editing session
//! and runs on a single task. Commands arrive as [`HostCommand`]s, results
//! leave as [`EngineEvent`]s through the [`HostBridge`]. The only work that
//! leaves the owning task is remote texture fetching, whose results come back
//! through an internal completion queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use shared::{EditRequest, Fragment, PointerEvent};
use tokio::sync::mpsc;

use crate::aggregate::relief::relief_fragment;
use crate::bridge::{EngineEvent, HostBridge};
use crate::capture::CaptureSession;
use crate::command::{DepthRequest, HostCommand};
use crate::container::{self, DecodedScene};
use crate::error::{EngineError, Result};
use crate::state::editor::{AppearanceEditor, AppliedEdit, EditOutcome, TextureRequest};
use crate::state::material::{Material, Texture};
use crate::state::presets::AssetLibrary;
use crate::state::scene::history::EditHistory;
use crate::state::scene::{RegionId, SceneState};
use crate::state::selection::SelectionState;
use crate::state::settings::EngineSettings;
use crate::store::{MeshStore, StoredMesh};
use crate::texture::{fetch_texture, HttpFetcher, TextureFetcher};
use crate::viewport::{SelectionChange, ViewportController};

/// Result of a remote texture fetch, waiting to be applied
#[derive(Debug)]
pub struct TextureCompletion {
    pub request: TextureRequest,
    pub result: Result<Texture>,
}

pub struct RoomEngine {
    settings: EngineSettings,
    scene: SceneState,
    editor: AppearanceEditor,
    selection: SelectionState,
    viewport: ViewportController,
    capture: CaptureSession,
    store: MeshStore,
    bridge: HostBridge,
    fetcher: Arc<dyn TextureFetcher>,
    completions_tx: mpsc::UnboundedSender<TextureCompletion>,
    completions_rx: mpsc::UnboundedReceiver<TextureCompletion>,
    pending_fetches: usize,
}

impl RoomEngine {
    /// Engine with an HTTP texture fetcher
    pub fn new(settings: EngineSettings, bridge: HostBridge) -> Result<Self> {
        settings.validate()?;
        let fetcher = HttpFetcher::new(settings.texture.fetch_timeout(), settings.texture.max_bytes)?;
        Self::with_fetcher(settings, bridge, Arc::new(fetcher))
    }

    pub fn with_fetcher(
        settings: EngineSettings,
        bridge: HostBridge,
        fetcher: Arc<dyn TextureFetcher>,
    ) -> Result<Self> {
        settings.validate()?;
        let assets = match &settings.editor.assets_path {
            Some(path) => AssetLibrary::load(path)?,
            None => AssetLibrary::new(),
        };
        let editor = AppearanceEditor::new(EditHistory::new(settings.editor.history_limit), assets)
            .with_max_texture_bytes(settings.texture.max_bytes);
        let selection = SelectionState::new(
            settings.editor.highlight_tint(),
            settings.editor.highlight_intensity,
        );
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        tracing::info!(
            "Engine ready (history {}, exports to {})",
            settings.editor.history_limit,
            settings.export_dir().display()
        );

        Ok(Self {
            viewport: ViewportController::new(settings.camera.clone()),
            capture: CaptureSession::new(&settings.capture),
            store: MeshStore::new(settings.export_dir()),
            scene: SceneState::new(),
            editor,
            selection,
            bridge,
            fetcher,
            completions_tx,
            completions_rx,
            pending_fetches: 0,
            settings,
        })
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn editor(&self) -> &AppearanceEditor {
        &self.editor
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn capture(&self) -> &CaptureSession {
        &self.capture
    }

    pub fn store(&self) -> &MeshStore {
        &self.store
    }

    /// Remote texture fetches not yet applied
    pub fn pending_fetches(&self) -> usize {
        self.pending_fetches
    }

    // ── Command dispatch ────────────────────────────────────────

    /// Run one host command. Failures are reported as `error` events.
    pub fn handle(&mut self, cmd: HostCommand) {
        tracing::debug!("Command {}", cmd.method());
        let result = match cmd {
            HostCommand::StartCapture => {
                self.start_capture();
                Ok(())
            }
            HostCommand::StopCapture => self.stop_capture(),
            HostCommand::IngestFragment(fragment) => self.ingest_fragment(*fragment),
            HostCommand::IngestDepth(request) => self.ingest_depth(*request),
            HostCommand::ExportScene => self.export_scene().map(|_| ()),
            HostCommand::LoadScene { path } => self.load_scene(&path).map(|_| ()),
            HostCommand::ApplyEdit(request) => self.apply_edit(&request),
            HostCommand::SelectRegion { name } => self.select_region(&name),
            HostCommand::Undo => {
                self.undo();
                Ok(())
            }
            HostCommand::Redo => {
                self.redo();
                Ok(())
            }
            HostCommand::ResetAppearance => {
                self.reset_appearance();
                Ok(())
            }
            HostCommand::Pointer(event) => {
                self.pointer(event);
                Ok(())
            }
            HostCommand::Resize { width, height } => self.viewport.resize(width, height),
        };
        if let Err(e) = result {
            self.bridge.report(&e);
        }
    }

    /// Parse and run one bridge line; parse failures become `error` events.
    pub fn handle_line(&mut self, line: &str) {
        match HostCommand::from_json_line(line) {
            Ok(cmd) => self.handle(cmd),
            Err(e) => self.bridge.report(&e),
        }
    }

    // ── Capture ─────────────────────────────────────────────────

    /// Discard the current scene, selection and history and begin capturing.
    pub fn start_capture(&mut self) {
        self.selection.clear();
        self.scene.unload();
        self.editor.clear_history();
        self.capture.start();
        self.emit_progress();
    }

    /// Freeze the capture into the scene. Idempotent.
    pub fn stop_capture(&mut self) -> Result<()> {
        if !self.capture.stop() {
            return Ok(());
        }
        if self.capture.fragments().is_empty() {
            tracing::info!("Capture stopped without fragments");
            return Ok(());
        }
        let (scene, segments) = self.capture.combine()?.into_scene("room", Material::default());
        self.scene.load(scene, segments)?;
        self.viewport.frame_scene(&self.scene);
        self.bridge
            .send(EngineEvent::CaptureProgress(self.capture.progress()));
        Ok(())
    }

    pub fn ingest_fragment(&mut self, fragment: Fragment) -> Result<()> {
        self.capture.ingest(fragment)?;
        self.emit_progress();
        Ok(())
    }

    /// Turn a depth grid into a relief fragment and ingest it.
    pub fn ingest_depth(&mut self, request: DepthRequest) -> Result<()> {
        let fragment = relief_fragment(&request.name, &request.map, request.options)?;
        self.ingest_fragment(fragment)
    }

    fn emit_progress(&mut self) {
        if let Some(ratio) = self.capture.poll_progress(Instant::now()) {
            self.bridge.send(EngineEvent::CaptureProgress(ratio));
        }
    }

    // ── Container I/O ───────────────────────────────────────────

    /// Encode the scene into the mesh store. While a capture is running the
    /// fragments collected so far are exported without stopping it.
    pub fn export_scene(&mut self) -> Result<StoredMesh> {
        let bytes = if self.capture.is_capturing() {
            let (scene, segments) = self.capture.combine()?.into_scene("room", Material::default());
            container::encode(&scene, &segments)?
        } else {
            let scene = self.scene.scene().ok_or(EngineError::EmptyInput)?;
            container::encode(scene, &self.scene.segments())?
        };
        let stored = self.store.save(&bytes)?;
        self.bridge
            .send(EngineEvent::SceneExported(stored.path.clone()));
        Ok(stored)
    }

    /// Load a container by mesh-store ID or file path, replacing the scene.
    pub fn load_scene(&mut self, target: &str) -> Result<PathBuf> {
        let path = self.resolve_scene_path(target)?;
        let bytes = std::fs::read(&path)?;
        let DecodedScene { scene, segments } = container::decode(&bytes)?;

        self.capture.stop();
        self.selection.clear();
        self.scene.load(scene, segments)?;
        self.editor.clear_history();
        self.viewport.frame_scene(&self.scene);

        tracing::info!("Loaded {}", path.display());
        self.bridge.send(EngineEvent::SceneLoaded(path.clone()));
        Ok(path)
    }

    fn resolve_scene_path(&self, target: &str) -> Result<PathBuf> {
        if MeshStore::validate_id(target).is_ok() {
            if let Some(stored) = self.store.get(target)? {
                return Ok(stored.path);
            }
        }
        Ok(Path::new(target).to_path_buf())
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Apply an appearance edit. Remote textures are fetched in the background
    /// and applied when [`apply_completion`](Self::apply_completion) sees them.
    pub fn apply_edit(&mut self, request: &EditRequest) -> Result<()> {
        let outcome = self.editor.apply_edit(
            &mut self.scene,
            &request.selector,
            &request.property,
            &request.value,
        )?;
        match outcome {
            EditOutcome::Applied(applied) => self.edit_applied(applied),
            EditOutcome::PendingTexture(texture_request) => self.spawn_fetch(texture_request)?,
        }
        Ok(())
    }

    fn spawn_fetch(&mut self, request: TextureRequest) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| EngineError::Network("no async runtime for texture fetch".into()))?;
        let fetcher = Arc::clone(&self.fetcher);
        let timeout = self.settings.texture.fetch_timeout();
        let tx = self.completions_tx.clone();

        tracing::debug!("Fetching texture {}", request.uri);
        runtime.spawn(async move {
            let result = fetch_texture(fetcher, request.uri.clone(), timeout).await;
            // The engine may have shut down meanwhile
            let _ = tx.send(TextureCompletion { request, result });
        });
        self.pending_fetches += 1;
        Ok(())
    }

    /// Wait for the next texture fetch to finish. Pends forever when nothing
    /// is in flight, which suits a `select!` loop.
    pub async fn next_completion(&mut self) -> Option<TextureCompletion> {
        self.completions_rx.recv().await
    }

    /// Apply a finished fetch. A failed fetch leaves every material as it was.
    pub fn apply_completion(&mut self, completion: TextureCompletion) {
        self.pending_fetches = self.pending_fetches.saturating_sub(1);
        let result = completion
            .result
            .and_then(|texture| self.editor.complete_texture(&mut self.scene, completion.request, texture));
        match result {
            Ok(applied) => self.edit_applied(applied),
            Err(e) => self.bridge.report(&e),
        }
    }

    /// Apply every fetch that has already finished, without waiting.
    pub fn poll_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Wait until every in-flight fetch has been applied.
    pub async fn settle(&mut self) {
        while self.pending_fetches > 0 {
            match self.completions_rx.recv().await {
                Some(completion) => self.apply_completion(completion),
                None => break,
            }
        }
    }

    fn edit_applied(&mut self, applied: AppliedEdit) {
        if applied
            .regions
            .iter()
            .any(|id| self.selection.is_selected(*id))
        {
            self.selection.refresh(&mut self.scene);
        }
        self.bridge.send(EngineEvent::EditApplied {
            selector: applied.selector,
        });
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.editor.undo(&mut self.scene);
        if undone {
            self.selection.refresh(&mut self.scene);
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.editor.redo(&mut self.scene);
        if redone {
            self.selection.refresh(&mut self.scene);
        }
        redone
    }

    pub fn reset_appearance(&mut self) {
        self.editor.reset_to_original(&mut self.scene);
        self.selection.refresh(&mut self.scene);
    }

    // ── Selection & viewport ────────────────────────────────────

    /// Select a region by exact name (case-insensitive). An empty name clears
    /// the selection.
    pub fn select_region(&mut self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            self.selection.deselect(&mut self.scene);
            self.bridge.send(EngineEvent::RegionSelected(None));
            return Ok(());
        }
        let id = self
            .scene
            .find_by_name(name)
            .ok_or_else(|| EngineError::NoMatchingRegion(name.to_string()))?;
        self.select(id);
        Ok(())
    }

    fn select(&mut self, id: RegionId) {
        if self.selection.select(&mut self.scene, id) {
            let name = self.scene.region(id).map(|r| r.name.clone());
            self.bridge.send(EngineEvent::RegionSelected(name));
        }
    }

    pub fn pointer(&mut self, event: PointerEvent) {
        let change = self
            .viewport
            .handle_pointer(event, &mut self.scene, &mut self.selection);
        match change {
            Some(SelectionChange::Selected(id)) => {
                let name = self.scene.region(id).map(|r| r.name.clone());
                self.bridge.send(EngineEvent::RegionSelected(name));
            }
            Some(SelectionChange::Deselected(_)) => {
                self.bridge.send(EngineEvent::RegionSelected(None));
            }
            None => {}
        }
    }
}
