//! Schedule Descriptors
//!
//! JSON shapes produced by the layout compiler, deserialised with serde.

use ahash::AHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use surgeryvis_core::{BoxDescriptor, Vec3};

use crate::{SceneError, SceneResult};

/// Parse any schedule descriptor from a JSON string
pub fn from_json<T: DeserializeOwned>(json: &str) -> SceneResult<T> {
    Ok(serde_json::from_str(json)?)
}

/// Parse any schedule descriptor from a reader
pub fn from_reader<T: DeserializeOwned, R: std::io::Read>(reader: R) -> SceneResult<T> {
    Ok(serde_json::from_reader(reader)?)
}

/// One box of a schedule: `[type, x, y, z]` with the minimum corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxPlacement(pub u32, pub f32, pub f32, pub f32);

impl BoxPlacement {
    /// Index into [`BoxSchedule::types`]
    pub fn box_type(&self) -> u32 {
        self.0
    }

    /// Minimum corner
    pub fn corner(&self) -> Vec3 {
        Vec3::new(self.1, self.2, self.3)
    }
}

/// Whole-box schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxSchedule {
    /// Placed boxes
    pub coords: Vec<BoxPlacement>,
    /// Box type to `[width, height, depth]`
    pub types: AHashMap<u32, [f32; 3]>,
}

impl BoxSchedule {
    /// Resolve every placement into a corner-based descriptor
    pub fn descriptors(&self) -> impl Iterator<Item = SceneResult<BoxDescriptor>> + '_ {
        self.coords.iter().map(|placement| {
            let dimensions = self
                .types
                .get(&placement.box_type())
                .ok_or(SceneError::UnknownBoxType(placement.box_type()))?;
            Ok(BoxDescriptor::new(placement.corner(), Vec3::from_array(*dimensions)))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// Primal and dual bits of a plumbing piece.
///
/// Bit 3 enables the core, bits 2, 1 and 0 enable the arms along x, y and z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceBits {
    pub p: u32,
    pub d: u32,
}

/// One unit cell of a plumbing schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlumbingPiece {
    /// Piece origin
    #[serde(rename = "P")]
    pub position: Vec3,
    #[serde(rename = "D")]
    pub bits: PieceBits,
}

/// Plumbing-piece schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlumbingSchedule {
    pub plumbs: Vec<PlumbingPiece>,
}

/// Graph node: `[id, x, y, z]` on the integer defect lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectNode(pub i64, pub i64, pub i64, pub i64);

/// Which sublattice an edge lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefectKind {
    /// All coordinates odd
    Primal,
    /// All coordinates even
    Dual,
}

impl DefectNode {
    /// Lattice coordinates
    pub fn coordinates(&self) -> [i64; 3] {
        [self.1, self.2, self.3]
    }

    /// Position in scene units
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.1 as f32, self.2 as f32, self.3 as f32)
    }

    /// Sublattice of this node, `None` for mixed parity
    pub fn kind(&self) -> Option<DefectKind> {
        let odd = self
            .coordinates()
            .iter()
            .filter(|c| c.rem_euclid(2) == 1)
            .count();
        match odd {
            3 => Some(DefectKind::Primal),
            0 => Some(DefectKind::Dual),
            _ => None,
        }
    }
}

/// Defect graph with 1-based edge and injection references
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectGraph {
    pub nodes: Vec<DefectNode>,
    #[serde(default)]
    pub edges: Vec<[usize; 2]>,
    /// Nodes where magic states are injected
    #[serde(default)]
    pub inj: Vec<usize>,
}

impl DefectGraph {
    /// Node at a 1-based reference
    pub fn node(&self, reference: usize) -> SceneResult<&DefectNode> {
        reference
            .checked_sub(1)
            .and_then(|index| self.nodes.get(index))
            .ok_or(SceneError::DanglingNode {
                reference,
                nodes: self.nodes.len(),
            })
    }

    /// Both endpoints of the edge at `index`
    pub fn edge(&self, index: usize) -> SceneResult<(&DefectNode, &DefectNode)> {
        let [a, b] = self
            .edges
            .get(index)
            .copied()
            .ok_or(SceneError::DanglingNode {
                reference: index,
                nodes: self.edges.len(),
            })?;
        Ok((self.node(a)?, self.node(b)?))
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.inj.is_empty()
    }
}

/// Everything drawn in one defect frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectScene {
    /// The compiled circuit
    #[serde(alias = "gr1")]
    pub circuit: DefectGraph,
    /// Defects connecting pins to boxes
    #[serde(default, alias = "gr2")]
    pub connections: DefectGraph,
    /// Debug graphs, every edge drawn as is
    #[serde(default)]
    pub debug: Vec<DefectGraph>,
    /// Distillation boxes
    #[serde(default, alias = "bx0")]
    pub boxes: BoxSchedule,
}

/// A cell of a lattice-surgery layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeNode {
    #[serde(default)]
    pub id: u64,
    pub fx: f32,
    pub fy: f32,
    pub fz: f32,
    /// Colour, also selects the surface style
    pub c: String,
    /// Operation occupying the cell
    #[serde(default)]
    pub op: Option<u64>,
    /// Face mask, all faces when absent
    #[serde(default)]
    pub s: Option<u32>,
}

impl LatticeNode {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.fx, self.fy, self.fz)
    }
}

/// Connection between two cells touched by the same operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeLink {
    pub source: u64,
    pub target: u64,
    #[serde(default)]
    pub c: Option<String>,
}

/// Lattice-surgery layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatticeLayout {
    pub nodes: Vec<LatticeNode>,
    #[serde(default)]
    pub links: Vec<LatticeLink>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_schedule_json() {
        let json = r#"{ "coords": [[0, 1, 2, 3], [1, 0, 0, 0]],
                        "types": { "0": [2, 2, 2], "1": [1, 4, 1] } }"#;
        let schedule: BoxSchedule = from_json(json).unwrap();
        let descriptors: Vec<_> = schedule.descriptors().collect::<SceneResult<_>>().unwrap();
        assert_eq!(descriptors[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(descriptors[0].dimensions, Vec3::splat(2.0));
        assert_eq!(descriptors[1].dimensions, Vec3::new(1.0, 4.0, 1.0));
    }

    #[test]
    fn test_unknown_box_type() {
        let json = r#"{ "coords": [[7, 0, 0, 0]], "types": {} }"#;
        let schedule: BoxSchedule = from_json(json).unwrap();
        let err = schedule.descriptors().next().unwrap().unwrap_err();
        assert!(matches!(err, SceneError::UnknownBoxType(7)));
    }

    #[test]
    fn test_plumbing_json() {
        let json = r#"{ "plumbs": [{ "P": [1, 2, 3], "D": { "p": 12, "d": 0 } }] }"#;
        let schedule: PlumbingSchedule = from_json(json).unwrap();
        assert_eq!(schedule.plumbs[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(schedule.plumbs[0].bits, PieceBits { p: 12, d: 0 });
    }

    #[test]
    fn test_node_kind() {
        assert_eq!(DefectNode(1, 1, 3, -5).kind(), Some(DefectKind::Primal));
        assert_eq!(DefectNode(2, 0, 2, -4).kind(), Some(DefectKind::Dual));
        assert_eq!(DefectNode(3, 1, 2, 3).kind(), None);
    }

    #[test]
    fn test_node_references_are_one_based() {
        let graph = DefectGraph {
            nodes: vec![DefectNode(1, 0, 0, 0), DefectNode(2, 2, 0, 0)],
            edges: vec![[1, 2], [2, 3]],
            inj: vec![],
        };
        assert_eq!(graph.node(1).unwrap().0, 1);
        assert!(matches!(
            graph.node(0),
            Err(SceneError::DanglingNode {
                reference: 0,
                nodes: 2
            })
        ));
        assert!(graph.edge(0).is_ok());
        assert!(matches!(
            graph.edge(1),
            Err(SceneError::DanglingNode {
                reference: 3,
                nodes: 2
            })
        ));
    }

    #[test]
    fn test_defect_scene_aliases() {
        let scene: DefectScene = from_json(
            r#"{ "gr1": { "nodes": [[1, 1, 1, 1]], "edges": [], "inj": [1] },
                 "bx0": { "coords": [], "types": {} } }"#,
        )
        .unwrap();
        assert_eq!(scene.circuit.inj, vec![1]);
        assert!(scene.connections.is_empty());
        assert!(scene.debug.is_empty());
    }

    #[test]
    fn test_lattice_layout_json() {
        let layout: LatticeLayout = from_json(
            r#"{ "nodes": [{ "id": 0, "fx": 1, "fy": 0, "fz": 2, "c": "red", "op": 3, "s": 60 }],
                 "links": [{ "source": 0, "target": 0, "c": "blue" }] }"#,
        )
        .unwrap();
        assert_eq!(layout.nodes[0].position(), Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(layout.nodes[0].s, Some(60));
        assert_eq!(layout.links.len(), 1);
    }

    #[test]
    fn test_malformed_json() {
        let result: SceneResult<PlumbingSchedule> = from_json("{ \"plumbs\": 3 }");
        assert!(matches!(result, Err(SceneError::Json(_))));
    }
}
