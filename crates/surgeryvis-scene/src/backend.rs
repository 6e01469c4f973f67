//! Render Backend
//!
//! The scene reaches the renderer only through [`RenderBackend`]. Payloads
//! are CPU-side buffers ready for upload; the backend hands back an opaque
//! handle that owns the uploaded resource until it is disposed.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use surgeryvis_core::{DrawOptions, MemoryStats};
use surgeryvis_geometry::FinalizedMesh;
use thiserror::Error;

/// Opaque handle to an uploaded mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(u64);

impl MeshHandle {
    /// Create a handle from a backend-specific id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Scene layer a mesh belongs to; visibility is toggled per layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Boxes,
    Primal,
    Dual,
    NotWorking,
    Injections,
    Debug,
    BoundingBox,
    PlumbingUnits,
    PlumbingPrimals,
    PlumbingDuals,
    Lattice,
    LatticeLinks,
}

impl Layer {
    /// All layers
    pub const ALL: [Layer; 12] = [
        Layer::Boxes,
        Layer::Primal,
        Layer::Dual,
        Layer::NotWorking,
        Layer::Injections,
        Layer::Debug,
        Layer::BoundingBox,
        Layer::PlumbingUnits,
        Layer::PlumbingPrimals,
        Layer::PlumbingDuals,
        Layer::Lattice,
        Layer::LatticeLinks,
    ];

    /// Draw option gating this layer, if any
    pub fn draw_option(self) -> Option<DrawOptions> {
        match self {
            Layer::Boxes => Some(DrawOptions::BOXES),
            Layer::Primal => Some(DrawOptions::PRIMALS),
            Layer::Dual => Some(DrawOptions::DUALS),
            Layer::NotWorking | Layer::Injections => Some(DrawOptions::GEOMETRY),
            Layer::Debug => Some(DrawOptions::DEBUG),
            _ => None,
        }
    }

    /// Whether the layer starts attached under `options`
    pub fn visible_under(self, options: DrawOptions) -> bool {
        self.draw_option().is_none_or(|option| options.contains(option))
    }
}

/// How the indices of a payload are assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Triangles,
    Lines,
    Points,
}

/// Material parameters of a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceStyle {
    /// CSS colour name or `#rrggbb`
    pub color: String,
    pub opacity: f32,
    pub wireframe: bool,
    pub double_sided: bool,
    pub flat_shading: bool,
    /// Line width for line primitives
    pub line_width: f32,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            color: "white".to_string(),
            opacity: 1.0,
            wireframe: false,
            double_sided: false,
            flat_shading: false,
            line_width: 1.0,
        }
    }
}

impl SurfaceStyle {
    /// Solid colour
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            ..Default::default()
        }
    }

    /// Wireframe in the given colour
    pub fn wireframe(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            wireframe: true,
            ..Default::default()
        }
    }

    /// Line material of the given width
    pub fn line(color: impl Into<String>, line_width: f32) -> Self {
        Self {
            color: color.into(),
            line_width,
            ..Default::default()
        }
    }

    /// Flat-shaded, double-sided solid
    pub fn flat(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            double_sided: true,
            flat_shading: true,
            ..Default::default()
        }
    }

    /// Style of a lattice-layout colour group.
    ///
    /// `wireframe` and `links` are reserved names for black and aqua
    /// wireframes, `black` is opaque and every other colour is drawn
    /// slightly transparent.
    pub fn for_lattice_color(color: &str) -> Self {
        let (color, wireframe, opacity) = match color {
            "wireframe" => ("black", true, 0.8),
            "links" => ("aqua", true, 0.8),
            "black" => ("black", false, 1.0),
            other => (other, false, 0.8),
        };
        Self {
            color: color.to_string(),
            opacity,
            wireframe,
            double_sided: true,
            ..Default::default()
        }
    }

    /// Whether blending is needed
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// CPU-side buffers staged for upload
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPayload {
    /// Name used in logs and summaries
    pub name: String,
    pub layer: Layer,
    pub primitive: Primitive,
    /// Position triples
    pub positions: Vec<f32>,
    pub indices: Vec<u32>,
    /// Optional per-vertex normal triples
    pub normals: Option<Vec<f32>>,
    pub style: SurfaceStyle,
}

impl MeshPayload {
    /// Wrap finalized buffers
    pub fn from_mesh(
        name: impl Into<String>,
        layer: Layer,
        primitive: Primitive,
        mesh: FinalizedMesh,
        style: SurfaceStyle,
    ) -> Self {
        Self {
            name: name.into(),
            layer,
            primitive,
            positions: mesh.positions,
            indices: mesh.indices,
            normals: None,
            style,
        }
    }

    /// Attach flat per-triangle normals
    pub fn with_flat_normals(mut self) -> Self {
        let mesh = FinalizedMesh {
            positions: std::mem::take(&mut self.positions),
            indices: std::mem::take(&mut self.indices),
        };
        self.normals = Some(mesh.flat_normals());
        self.positions = mesh.positions;
        self.indices = mesh.indices;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Bytes of every buffer in the payload
    pub fn byte_size(&self) -> usize {
        let positions = std::mem::size_of_val(self.positions.as_slice());
        let indices = std::mem::size_of_val(self.indices.as_slice());
        let normals = self.normals.as_deref().map_or(0, std::mem::size_of_val);
        positions + indices + normals
    }
}

/// Renderer seam used by the scene lifecycle manager
pub trait RenderBackend {
    /// Upload failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Upload a payload and return a handle owning the resource
    fn upload(&mut self, payload: &MeshPayload) -> Result<MeshHandle, Self::Error>;

    /// Release the resource behind `handle`
    fn dispose(&mut self, handle: MeshHandle);

    /// Attach to or detach from the drawn scene
    fn set_attached(&mut self, handle: MeshHandle, attached: bool);
}

/// Headless backend errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeadlessError {
    #[error("out of memory: {requested} bytes requested, {available} available")]
    OutOfMemory { requested: usize, available: usize },
}

/// A mesh resident in the headless backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidentMesh {
    pub name: String,
    pub layer: Layer,
    pub primitive: Primitive,
    pub vertex_count: usize,
    pub bytes: usize,
    pub attached: bool,
}

/// In-memory backend that records uploads instead of drawing them
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    resident: AHashMap<MeshHandle, ResidentMesh>,
    next_id: u64,
    stats: MemoryStats,
    /// Maximum resident bytes, unlimited when `None`
    budget: Option<usize>,
}

impl HeadlessBackend {
    /// Create an unlimited backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that refuses uploads beyond `bytes` resident bytes
    pub fn with_budget(bytes: usize) -> Self {
        Self {
            budget: Some(bytes),
            ..Default::default()
        }
    }

    /// Meshes currently resident
    pub fn resident(&self) -> impl Iterator<Item = (MeshHandle, &ResidentMesh)> {
        self.resident.iter().map(|(handle, mesh)| (*handle, mesh))
    }

    /// Look up a resident mesh
    pub fn get(&self, handle: MeshHandle) -> Option<&ResidentMesh> {
        self.resident.get(&handle)
    }

    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    pub fn attached_count(&self) -> usize {
        self.resident.values().filter(|mesh| mesh.attached).count()
    }

    /// Upload and release accounting
    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }
}

impl RenderBackend for HeadlessBackend {
    type Error = HeadlessError;

    fn upload(&mut self, payload: &MeshPayload) -> Result<MeshHandle, HeadlessError> {
        let bytes = payload.byte_size();
        if let Some(budget) = self.budget {
            let available = budget.saturating_sub(self.stats.current());
            if bytes > available {
                return Err(HeadlessError::OutOfMemory {
                    requested: bytes,
                    available,
                });
            }
        }

        let handle = MeshHandle::new(self.next_id);
        self.next_id += 1;
        self.stats.record_alloc(bytes);
        self.resident.insert(
            handle,
            ResidentMesh {
                name: payload.name.clone(),
                layer: payload.layer,
                primitive: payload.primitive,
                vertex_count: payload.vertex_count(),
                bytes,
                attached: false,
            },
        );
        Ok(handle)
    }

    fn dispose(&mut self, handle: MeshHandle) {
        match self.resident.remove(&handle) {
            Some(mesh) => self.stats.record_dealloc(mesh.bytes),
            None => log::warn!("dispose of unknown mesh handle {}", handle.id()),
        }
    }

    fn set_attached(&mut self, handle: MeshHandle, attached: bool) {
        if let Some(mesh) = self.resident.get_mut(&handle) {
            mesh.attached = attached;
        }
    }
}
