//! Scene Lifecycle
//!
//! Owns every mesh uploaded to the backend and swaps whole frames of
//! schedule data in and out. A frame is staged CPU-side in a
//! [`RebuildCycle`] and only reaches the backend on commit, so a frame that
//! fails to build leaves the previous one on screen.

use std::time::Instant;

use ahash::AHashMap;
use serde::Serialize;
use surgeryvis_core::{BoundsTracker, BoxDescriptor, DrawOptions, VisualiserConfig};

use crate::backend::{Layer, MeshHandle, RenderBackend};
use crate::builders::{self, StagedScene, piece_counts};
use crate::schedule::{DefectScene, LatticeLayout, PlumbingSchedule};
use crate::{SceneError, SceneResult};

/// A mesh currently uploaded by the manager
#[derive(Debug, Clone, PartialEq)]
pub struct LiveMesh {
    pub handle: MeshHandle,
    pub layer: Layer,
    pub name: String,
    pub vertex_count: usize,
    pub bytes: usize,
}

/// Counts reported after a committed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    /// Frame number, starting at 1
    pub frame: u64,
    pub meshes: usize,
    pub attached: usize,
    pub vertices: usize,
    pub bytes: usize,
    /// Envelope of the frame, `None` when nothing was drawn
    pub bounds: Option<BoxDescriptor>,
    /// Envelope size in plumbing pieces
    pub pieces: Option<[u32; 3]>,
}

/// Owner of the renderer-side scene
pub struct SceneLifecycleManager<B: RenderBackend> {
    backend: B,
    live: Vec<LiveMesh>,
    bounds: BoundsTracker,
    visibility: AHashMap<Layer, bool>,
    config: VisualiserConfig,
    frames: u64,
}

impl<B: RenderBackend> SceneLifecycleManager<B> {
    /// Create a manager with an empty scene
    pub fn new(backend: B, config: VisualiserConfig) -> Self {
        let visibility = Self::visibility_for(config.draw);
        Self {
            backend,
            live: Vec::new(),
            bounds: BoundsTracker::new(),
            visibility,
            config,
            frames: 0,
        }
    }

    fn visibility_for(options: DrawOptions) -> AHashMap<Layer, bool> {
        Layer::ALL
            .into_iter()
            .map(|layer| (layer, layer.visible_under(options)))
            .collect()
    }

    /// Start staging a new frame
    pub fn begin_rebuild(&mut self) -> RebuildCycle<'_, B> {
        RebuildCycle {
            manager: self,
            scene: StagedScene::new(),
        }
    }

    /// Replace the draw options and re-apply layer visibility
    pub fn set_draw_options(&mut self, options: DrawOptions) {
        self.config.draw = options;
        for layer in Layer::ALL {
            self.set_layer_visible(layer, layer.visible_under(options));
        }
    }

    /// Attach or detach every live mesh on `layer`
    pub fn set_layer_visible(&mut self, layer: Layer, visible: bool) {
        self.visibility.insert(layer, visible);
        for mesh in self.live.iter().filter(|mesh| mesh.layer == layer) {
            self.backend.set_attached(mesh.handle, visible);
        }
    }

    pub fn is_layer_visible(&self, layer: Layer) -> bool {
        self.visibility.get(&layer).copied().unwrap_or(true)
    }

    /// Dispose every live mesh and forget the scene bounds
    pub fn clear(&mut self) {
        if self.live.is_empty() {
            self.bounds.reset();
            return;
        }
        log::debug!("disposing {} live meshes", self.live.len());
        for mesh in self.live.drain(..) {
            self.backend.dispose(mesh.handle);
        }
        self.bounds.reset();
    }

    /// Meshes uploaded by the last committed frame
    pub fn live_meshes(&self) -> &[LiveMesh] {
        &self.live
    }

    pub fn mesh_count(&self) -> usize {
        self.live.len()
    }

    /// Envelope of the last committed frame
    pub fn bounds(&self) -> &BoundsTracker {
        &self.bounds
    }

    pub fn config(&self) -> &VisualiserConfig {
        &self.config
    }

    /// Frames committed so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Rebuild the scene from a defect frame
    pub fn show_defects(&mut self, defects: &DefectScene) -> SceneResult<FrameSummary> {
        self.rebuild_with(|scene, config| {
            builders::stage_defects(scene, defects, config)
        })
    }

    /// Rebuild the scene from a plumbing-piece schedule
    pub fn show_plumbing(&mut self, schedule: &PlumbingSchedule) -> SceneResult<FrameSummary> {
        self.rebuild_with(|scene, config| {
            builders::stage_plumbing(scene, schedule, config)
        })
    }

    /// Rebuild the scene from a lattice-surgery layout
    pub fn show_lattice(&mut self, layout: &LatticeLayout) -> SceneResult<FrameSummary> {
        self.rebuild_with(|scene, config| {
            builders::stage_lattice(scene, layout, config)
        })
    }

    fn rebuild_with<F>(&mut self, build: F) -> SceneResult<FrameSummary>
    where
        F: FnOnce(&mut StagedScene, &VisualiserConfig) -> SceneResult<()>,
    {
        let mut cycle = self.begin_rebuild();
        let (scene, config) = cycle.staging();
        if let Err(err) = build(scene, config) {
            if err.is_capacity_exceeded() {
                log::warn!("rebuild aborted, previous scene kept: {}", err);
            }
            return Err(err);
        }
        cycle.commit()
    }
}

impl<B: RenderBackend> Drop for SceneLifecycleManager<B> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// A frame being staged.
///
/// Nothing reaches the backend until [`RebuildCycle::commit`]. Dropping the
/// cycle without committing discards the staged buffers and leaves the
/// previous frame untouched.
pub struct RebuildCycle<'a, B: RenderBackend> {
    manager: &'a mut SceneLifecycleManager<B>,
    scene: StagedScene,
}

impl<B: RenderBackend> RebuildCycle<'_, B> {
    /// Staged scene together with the manager configuration
    pub fn staging(&mut self) -> (&mut StagedScene, &VisualiserConfig) {
        (&mut self.scene, &self.manager.config)
    }

    pub fn scene(&self) -> &StagedScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut StagedScene {
        &mut self.scene
    }

    pub fn config(&self) -> &VisualiserConfig {
        &self.manager.config
    }

    /// Replace the previous frame with the staged one.
    ///
    /// The previous frame is disposed first, then every staged payload is
    /// uploaded and the ones on visible layers are attached. If an upload
    /// fails, whatever this commit already uploaded is disposed and the
    /// scene is left empty. Every uploaded handle is owned by the manager
    /// as soon as the backend returns it, so an upload that panics leaves
    /// the earlier ones to [`SceneLifecycleManager::clear`] or drop.
    pub fn commit(mut self) -> SceneResult<FrameSummary> {
        let started = Instant::now();
        let (payloads, bounds) = std::mem::take(&mut self.scene).into_parts();
        let manager = &mut *self.manager;

        manager.clear();
        manager.live.reserve(payloads.len());

        for payload in &payloads {
            let handle = match manager.backend.upload(payload) {
                Ok(handle) => handle,
                Err(err) => {
                    log::warn!(
                        "upload of '{}' failed, disposing {} meshes from this frame",
                        payload.name,
                        manager.live.len()
                    );
                    manager.clear();
                    return Err(SceneError::backend(err));
                }
            };
            manager.live.push(LiveMesh {
                handle,
                layer: payload.layer,
                name: payload.name.clone(),
                vertex_count: payload.vertex_count(),
                bytes: payload.byte_size(),
            });
        }

        let mut attached = 0;
        for mesh in &manager.live {
            if manager.is_layer_visible(mesh.layer) {
                manager.backend.set_attached(mesh.handle, true);
                attached += 1;
            }
        }

        manager.bounds = bounds;
        manager.frames += 1;

        let descriptor = bounds.to_box_descriptor();
        let summary = FrameSummary {
            frame: manager.frames,
            meshes: manager.live.len(),
            attached,
            vertices: manager.live.iter().map(|mesh| mesh.vertex_count).sum(),
            bytes: manager.live.iter().map(|mesh| mesh.bytes).sum(),
            bounds: descriptor,
            pieces: descriptor.map(|d| piece_counts(d.dimensions, manager.config.piece_unit)),
        };

        log::info!(
            "frame {}: {} meshes ({} attached), {} vertices",
            summary.frame,
            summary.meshes,
            summary.attached,
            summary.vertices
        );
        tracing::debug!(
            target: "timing",
            name = "scene_commit",
            duration_us = started.elapsed().as_micros() as u64,
            "Rebuild committed"
        );

        Ok(summary)
    }
}

impl<B: RenderBackend> Drop for RebuildCycle<'_, B> {
    fn drop(&mut self) {
        if !self.scene.is_empty() {
            log::debug!("discarding {} staged meshes", self.scene.len());
        }
    }
}
