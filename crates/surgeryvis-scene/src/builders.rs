//! Scene Builders
//!
//! Turn schedule descriptors into staged payloads. Builders never touch the
//! renderer: everything lands in a [`StagedScene`] that is uploaded on
//! commit or dropped with the rebuild cycle.

use ahash::AHashMap;
use smallvec::SmallVec;
use surgeryvis_core::{Axis, BoundsTracker, PlumbingConfig, Vec3, VisualiserConfig};
use surgeryvis_geometry::{
    BoxMeshAccumulator, FaceMask, FinalizedMesh, LineBatch, SegmentedBoxGeometry,
};

use crate::backend::{Layer, MeshPayload, Primitive, SurfaceStyle};
use crate::schedule::{
    BoxSchedule, DefectGraph, DefectKind, DefectScene, LatticeLayout, PlumbingPiece,
    PlumbingSchedule,
};
use crate::{SceneError, SceneResult};

/// Bit enabling the core box of a plumbing piece
const PIECE_CORE_BIT: u32 = 1 << 3;

/// Line colours and widths of the primal lattice, outline first
const PRIMAL_LINES: [(&str, f32); 2] = [("#181919", 4.0), ("#fcf2f3", 2.0)];
/// Line colours and widths of the dual lattice, outline first
const DUAL_LINES: [(&str, f32); 2] = [("#181919", 8.0), ("#686565", 6.0)];
const NOT_WORKING_LINE: (&str, f32) = ("#ffff00", 20.0);
const DEBUG_LINES: [(&str, f32); 2] = [("#00ff00", 5.0), ("#f442eb", 5.0)];

/// Payloads and bounds collected for one frame
#[derive(Debug, Default)]
pub struct StagedScene {
    payloads: Vec<MeshPayload>,
    bounds: BoundsTracker,
}

impl StagedScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a payload for upload; empty payloads are skipped
    pub fn stage(&mut self, payload: MeshPayload) {
        if payload.positions.is_empty() {
            log::debug!("skipping empty mesh '{}'", payload.name);
            return;
        }
        self.payloads.push(payload);
    }

    /// Grow the frame bounds by another envelope
    pub fn include_bounds(&mut self, bounds: &BoundsTracker) {
        self.bounds.union(bounds);
    }

    /// Envelope of everything staged so far
    pub fn bounds(&self) -> &BoundsTracker {
        &self.bounds
    }

    pub fn payloads(&self) -> &[MeshPayload] {
        &self.payloads
    }

    /// Staged payloads on `layer`
    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &MeshPayload> {
        self.payloads
            .iter()
            .filter(move |payload| payload.layer == layer)
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Vertices across every staged payload
    pub fn vertex_count(&self) -> usize {
        self.payloads.iter().map(MeshPayload::vertex_count).sum()
    }

    pub fn into_parts(self) -> (Vec<MeshPayload>, BoundsTracker) {
        (self.payloads, self.bounds)
    }
}

/// Size of an extent in plumbing pieces, rounded up per axis
pub fn piece_counts(size: Vec3, piece_unit: f32) -> [u32; 3] {
    if piece_unit <= 0.0 {
        return [0; 3];
    }
    (size / piece_unit)
        .ceil()
        .max(Vec3::ZERO)
        .to_array()
        .map(|n| n as u32)
}

/// Stage every box of a whole-box schedule as one flat-shaded mesh
pub fn stage_box_schedule(
    scene: &mut StagedScene,
    schedule: &BoxSchedule,
    config: &VisualiserConfig,
) -> SceneResult<()> {
    if schedule.is_empty() {
        return Ok(());
    }

    let mut boxes = BoxMeshAccumulator::new(config.accumulator_capacity)?;
    for descriptor in schedule.descriptors() {
        boxes.add_box_descriptor(FaceMask::ALL, &descriptor?)?;
    }

    scene.include_bounds(boxes.bounds());
    scene.stage(
        MeshPayload::from_mesh(
            "boxes",
            Layer::Boxes,
            Primitive::Triangles,
            boxes.finalize(),
            SurfaceStyle::flat("green"),
        )
        .with_flat_normals(),
    );
    Ok(())
}

/// Core box at `origin` followed by one arm per enabled axis bit.
///
/// Boxes are `(centre, dimensions)` pairs.
fn core_with_arms(
    origin: Vec3,
    bits: u32,
    plumbing: &PlumbingConfig,
) -> SmallVec<[(Vec3, Vec3); 4]> {
    let mut boxes = SmallVec::new();
    if bits & PIECE_CORE_BIT == 0 {
        return boxes;
    }

    let core = Vec3::splat(plumbing.core_size);
    boxes.push((origin, core));

    for axis in Axis::ALL {
        let i = axis.index();
        if bits & (1 << (2 - i)) == 0 {
            continue;
        }
        let mut dimensions = core;
        dimensions[i] = plumbing.arm_length;
        let mut center = origin;
        center[i] += plumbing.arm_offset;
        boxes.push((center, dimensions));
    }

    boxes
}

/// Boxes a plumbing piece expands to
#[derive(Debug, Clone, PartialEq)]
pub struct PieceBoxes {
    /// Unit box bounding the piece
    pub unit: (Vec3, Vec3),
    pub primal: SmallVec<[(Vec3, Vec3); 4]>,
    pub dual: SmallVec<[(Vec3, Vec3); 4]>,
}

/// Expand one plumbing piece into its unit, primal and dual boxes
pub fn piece_boxes(piece: &PlumbingPiece, plumbing: &PlumbingConfig) -> PieceBoxes {
    let origin = piece.position;
    let dual_origin = origin + Vec3::splat(plumbing.dual_offset);
    PieceBoxes {
        unit: (origin, Vec3::splat(plumbing.unit_size)),
        primal: core_with_arms(origin, piece.bits.p, plumbing),
        dual: core_with_arms(dual_origin, piece.bits.d, plumbing),
    }
}

/// Stage units, primals and duals of a plumbing schedule
pub fn stage_plumbing(
    scene: &mut StagedScene,
    schedule: &PlumbingSchedule,
    config: &VisualiserConfig,
) -> SceneResult<()> {
    let capacity = config.accumulator_capacity;
    let mut units = BoxMeshAccumulator::new(capacity)?;
    let mut primals = BoxMeshAccumulator::new(capacity)?;
    let mut duals = BoxMeshAccumulator::new(capacity)?;

    for piece in &schedule.plumbs {
        let boxes = piece_boxes(piece, &config.plumbing);
        units.add_box(FaceMask::ALL, boxes.unit.0, boxes.unit.1)?;
        for (center, dimensions) in boxes.primal {
            primals.add_box(FaceMask::ALL, center, dimensions)?;
        }
        for (center, dimensions) in boxes.dual {
            duals.add_box(FaceMask::ALL, center, dimensions)?;
        }
    }

    let layers = [
        ("plumbing-units", Layer::PlumbingUnits, units),
        ("plumbing-primals", Layer::PlumbingPrimals, primals),
        ("plumbing-duals", Layer::PlumbingDuals, duals),
    ];
    let styles = [
        SurfaceStyle::wireframe("grey"),
        SurfaceStyle::flat("red"),
        SurfaceStyle::flat("blue"),
    ];
    for ((name, layer, accumulator), style) in layers.into_iter().zip(styles) {
        scene.include_bounds(accumulator.bounds());
        let payload = MeshPayload::from_mesh(
            name,
            layer,
            Primitive::Triangles,
            accumulator.finalize(),
            style,
        );
        scene.stage(payload.with_flat_normals());
    }

    log::debug!("expanded {} plumbing pieces", schedule.plumbs.len());
    Ok(())
}

/// Line batches of a defect frame
#[derive(Debug, Default)]
pub struct DefectBatches {
    pub primal: LineBatch,
    pub dual: LineBatch,
    /// Last edge of each circuit graph, the connection that could not be routed
    pub not_working: LineBatch,
    /// One batch per debug graph
    pub debug: SmallVec<[LineBatch; 2]>,
    /// Injection markers
    pub injections: Vec<Vec3>,
}

impl DefectBatches {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_injections(&mut self, graph: &DefectGraph) -> SceneResult<()> {
        for &reference in &graph.inj {
            self.injections.push(graph.node(reference)?.position());
        }
        Ok(())
    }

    /// Sort the edges of a circuit graph by the sublattice of their first
    /// endpoint. Mixed-parity edges are not drawn.
    pub fn add_circuit_graph(&mut self, graph: &DefectGraph) -> SceneResult<()> {
        self.add_injections(graph)?;

        let last = graph.edges.len().checked_sub(1);
        for i in 0..graph.edges.len() {
            let (a, b) = graph.edge(i)?;
            let (start, end) = (a.position(), b.position());
            match a.kind() {
                Some(DefectKind::Primal) => self.primal.add_segment(start, end),
                Some(DefectKind::Dual) => self.dual.add_segment(start, end),
                None => {}
            }
            if Some(i) == last {
                self.not_working.add_segment(start, end);
            }
        }
        Ok(())
    }

    /// Put every edge of a debug graph into its own batch
    pub fn add_debug_graph(&mut self, graph: &DefectGraph) -> SceneResult<()> {
        self.add_injections(graph)?;

        let mut batch = LineBatch::new();
        for i in 0..graph.edges.len() {
            let (a, b) = graph.edge(i)?;
            batch.add_segment(a.position(), b.position());
        }
        self.debug.push(batch);
        Ok(())
    }

    /// Envelope of every segment endpoint
    pub fn bounds(&self) -> BoundsTracker {
        let mut bounds = BoundsTracker::new();
        let circuit = [&self.primal, &self.dual, &self.not_working];
        for batch in circuit.into_iter().chain(&self.debug) {
            bounds.union(batch.bounds());
        }
        bounds
    }

    /// Chunk every batch and stage the chunks
    pub fn stage(self, scene: &mut StagedScene, config: &VisualiserConfig) -> SceneResult<()> {
        scene.include_bounds(&self.bounds());
        let max = config.line_chunk_vertices;

        let primal = self.primal;
        stage_lines(scene, "primal", Layer::Primal, primal, max, &PRIMAL_LINES)?;
        stage_lines(scene, "dual", Layer::Dual, self.dual, max, &DUAL_LINES)?;
        stage_lines(
            scene,
            "not-working",
            Layer::NotWorking,
            self.not_working,
            max,
            &[NOT_WORKING_LINE],
        )?;

        for (i, batch) in self.debug.into_iter().enumerate() {
            let name = format!("debug-{i}");
            let style = [DEBUG_LINES[i % DEBUG_LINES.len()]];
            stage_lines(scene, &name, Layer::Debug, batch, max, &style)?;
        }

        let count = self.injections.len() as u32;
        let markers = FinalizedMesh {
            positions: self.injections.iter().flat_map(|p| p.to_array()).collect(),
            indices: (0..count).collect(),
        };
        scene.stage(MeshPayload::from_mesh(
            "injections",
            Layer::Injections,
            Primitive::Points,
            markers,
            SurfaceStyle::solid("green"),
        ));
        Ok(())
    }
}

/// Stage every chunk of `batch` once per style
fn stage_lines(
    scene: &mut StagedScene,
    name: &str,
    layer: Layer,
    batch: LineBatch,
    max_vertices: usize,
    styles: &[(&str, f32)],
) -> SceneResult<()> {
    for (i, chunk) in batch.into_chunks(max_vertices)?.into_iter().enumerate() {
        for (pass, &(color, width)) in styles.iter().enumerate() {
            scene.stage(MeshPayload::from_mesh(
                format!("{name}-{i}-{pass}"),
                layer,
                Primitive::Lines,
                chunk.clone(),
                SurfaceStyle::line(color, width),
            ));
        }
    }
    Ok(())
}

/// Stage an all-faces wireframe around everything staged so far.
///
/// Returns the size of the box in plumbing pieces, or `None` when nothing
/// has been staged. Flat extents fall back to a unit size.
pub fn stage_bounding_box(scene: &mut StagedScene, config: &VisualiserConfig) -> Option<[u32; 3]> {
    let descriptor = scene.bounds().to_box_descriptor()?;
    let pieces = piece_counts(descriptor.dimensions, config.piece_unit);
    log::info!(
        "bounding box plumbing pieces: {} {} {}",
        pieces[0],
        pieces[1],
        pieces[2]
    );

    let center = descriptor.center();
    let geometry = SegmentedBoxGeometry::all_faces(descriptor.dimensions, [1, 1, 1]);
    let (mut positions, normals, _uvs, indices, _groups) = geometry.into_parts();
    for point in positions.chunks_exact_mut(3) {
        point[0] += center.x;
        point[1] += center.y;
        point[2] += center.z;
    }

    let mut payload = MeshPayload::from_mesh(
        "bounding-box",
        Layer::BoundingBox,
        Primitive::Triangles,
        FinalizedMesh { positions, indices },
        SurfaceStyle::wireframe("black"),
    );
    payload.normals = Some(normals);
    scene.stage(payload);

    Some(pieces)
}

/// Stage boxes, defect lines, injections and the bounding box of one frame
pub fn stage_defects(
    scene: &mut StagedScene,
    defects: &DefectScene,
    config: &VisualiserConfig,
) -> SceneResult<()> {
    stage_box_schedule(scene, &defects.boxes, config)?;

    let mut batches = DefectBatches::new();
    batches.add_circuit_graph(&defects.circuit)?;
    batches.add_circuit_graph(&defects.connections)?;
    for graph in &defects.debug {
        batches.add_debug_graph(graph)?;
    }
    batches.stage(scene, config)?;

    stage_bounding_box(scene, config);
    Ok(())
}

/// Stage one surface per colour of a lattice layout, in first-seen colour
/// order, plus the operation links between cells
pub fn stage_lattice(
    scene: &mut StagedScene,
    layout: &LatticeLayout,
    config: &VisualiserConfig,
) -> SceneResult<()> {
    let cell = Vec3::splat(config.plumbing.unit_size);
    let mut surfaces: Vec<(&str, BoxMeshAccumulator)> = Vec::new();
    let mut slots: AHashMap<&str, usize> = AHashMap::new();
    let mut centers: AHashMap<u64, Vec3> = AHashMap::with_capacity(layout.nodes.len());

    for node in &layout.nodes {
        let color = node.c.as_str();
        let slot = match slots.get(color) {
            Some(&slot) => slot,
            None => {
                let accumulator = BoxMeshAccumulator::new(config.accumulator_capacity)?;
                surfaces.push((color, accumulator));
                slots.insert(color, surfaces.len() - 1);
                surfaces.len() - 1
            }
        };
        let mask = node.s.map_or(FaceMask::ALL, FaceMask::from_raw);
        surfaces[slot].1.add_box(mask, node.position(), cell)?;
        centers.insert(node.id, node.position());
    }

    for (color, surface) in surfaces {
        log::debug!("draw color {}", color);
        scene.include_bounds(surface.bounds());
        let payload = MeshPayload::from_mesh(
            format!("lattice-{color}"),
            Layer::Lattice,
            Primitive::Triangles,
            surface.finalize(),
            SurfaceStyle::for_lattice_color(color),
        );
        scene.stage(payload.with_flat_normals());
    }

    let mut links: Vec<(&str, LineBatch)> = Vec::new();
    for link in &layout.links {
        let source = centers
            .get(&link.source)
            .ok_or(SceneError::UnknownCell(link.source))?;
        let target = centers
            .get(&link.target)
            .ok_or(SceneError::UnknownCell(link.target))?;
        let color = link.c.as_deref().unwrap_or("blue");
        let slot = match links.iter().position(|(c, _)| *c == color) {
            Some(slot) => slot,
            None => {
                links.push((color, LineBatch::new()));
                links.len() - 1
            }
        };
        links[slot].1.add_segment(*source, *target);
    }

    let chunk = config.line_chunk_vertices;
    for (color, batch) in links {
        scene.include_bounds(batch.bounds());
        let name = format!("links-{color}");
        let style = [(color, 1.0)];
        stage_lines(scene, &name, Layer::LatticeLinks, batch, chunk, &style)?;
    }

    Ok(())
}
