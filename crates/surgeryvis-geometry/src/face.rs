//! Face construction
//!
//! Maps a 2D grid over one rectangular face to 3D points. A face is described
//! by the axes its grid spans (`u`, `v`), the axis it is pushed out along
//! (`w`) and the direction signs of the grid axes.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use surgeryvis_core::{Axis, Vec3};

bitflags! {
    /// Selects which of the six axis-aligned faces of a box are generated
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FaceMask: u8 {
        const POS_X = 1 << 0;
        const NEG_X = 1 << 1;
        const POS_Y = 1 << 2;
        const NEG_Y = 1 << 3;
        const POS_Z = 1 << 4;
        const NEG_Z = 1 << 5;
        const ALL = 0b11_1111;
    }
}

impl FaceMask {
    /// Build a mask from raw schedule bits, ignoring everything above bit 5
    pub fn from_raw(bits: u32) -> Self {
        Self::from_bits_truncate((bits & 0b11_1111) as u8)
    }

    /// Number of faces enabled
    pub fn face_count(self) -> usize {
        self.bits().count_ones() as usize
    }

    /// Enabled faces in bit order
    pub fn faces(self) -> impl Iterator<Item = BoxFace> {
        BoxFace::ALL
            .into_iter()
            .filter(move |face| self.contains(face.mask()))
    }
}

/// One of the six faces of an axis-aligned box, in mask bit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxFace {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl BoxFace {
    /// All faces in mask bit order
    pub const ALL: [BoxFace; 6] = [
        BoxFace::PosX,
        BoxFace::NegX,
        BoxFace::PosY,
        BoxFace::NegY,
        BoxFace::PosZ,
        BoxFace::NegZ,
    ];

    /// Bit position of this face in a [`FaceMask`], also its material slot
    pub const fn slot(self) -> u32 {
        match self {
            BoxFace::PosX => 0,
            BoxFace::NegX => 1,
            BoxFace::PosY => 2,
            BoxFace::NegY => 3,
            BoxFace::PosZ => 4,
            BoxFace::NegZ => 5,
        }
    }

    /// Single-face mask for this face
    pub fn mask(self) -> FaceMask {
        FaceMask::from_bits_truncate(1 << self.slot())
    }

    /// Canonical grid orientation of this face
    pub const fn spec(self) -> FaceSpec {
        match self {
            BoxFace::PosX => FaceSpec::new(Axis::Z, Axis::Y, Axis::X, -1.0, -1.0),
            BoxFace::NegX => FaceSpec::new(Axis::Z, Axis::Y, Axis::X, 1.0, -1.0),
            BoxFace::PosY => FaceSpec::new(Axis::X, Axis::Z, Axis::Y, 1.0, 1.0),
            BoxFace::NegY => FaceSpec::new(Axis::X, Axis::Z, Axis::Y, 1.0, -1.0),
            BoxFace::PosZ => FaceSpec::new(Axis::X, Axis::Y, Axis::Z, 1.0, -1.0),
            BoxFace::NegZ => FaceSpec::new(Axis::X, Axis::Y, Axis::Z, -1.0, -1.0),
        }
    }

    /// Face width, height and signed depth for a box of the given dimensions.
    ///
    /// The depth is negated on the negative faces so the face lands on the
    /// far side of the box and its normal points outward.
    pub fn extents(self, dimensions: Vec3) -> (f32, f32, f32) {
        let Vec3 {
            x: width,
            y: height,
            z: depth,
        } = dimensions;
        match self {
            BoxFace::PosX => (depth, height, width),
            BoxFace::NegX => (depth, height, -width),
            BoxFace::PosY => (width, depth, height),
            BoxFace::NegY => (width, depth, -height),
            BoxFace::PosZ => (width, height, depth),
            BoxFace::NegZ => (width, height, -depth),
        }
    }

    /// Grid segments along the face's `u` and `v` axes, from per-box
    /// `[width, height, depth]` segment counts
    pub fn segments(self, segments: [u32; 3]) -> (u32, u32) {
        let [width, height, depth] = segments;
        match self {
            BoxFace::PosX | BoxFace::NegX => (depth, height),
            BoxFace::PosY | BoxFace::NegY => (width, depth),
            BoxFace::PosZ | BoxFace::NegZ => (width, height),
        }
    }
}

/// Grid orientation of a face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSpec {
    /// Axis the grid columns advance along
    pub u: Axis,
    /// Axis the grid rows advance along
    pub v: Axis,
    /// Axis the face is offset along
    pub w: Axis,
    /// Direction of `u`, `1.0` or `-1.0`
    pub u_sign: f32,
    /// Direction of `v`, `1.0` or `-1.0`
    pub v_sign: f32,
}

impl FaceSpec {
    /// Create a face orientation
    pub const fn new(u: Axis, v: Axis, w: Axis, u_sign: f32, v_sign: f32) -> Self {
        Self {
            u,
            v,
            w,
            u_sign,
            v_sign,
        }
    }

    /// Unit normal of a face pushed out by `depth`
    pub fn normal(&self, depth: f32) -> Vec3 {
        let sign = if depth > 0.0 { 1.0 } else { -1.0 };
        self.w.unit() * sign
    }
}

/// Triangles of the single quad cell, indexing [`FaceQuad::corners`].
///
/// These are `(a, b, d)` and `(b, c, d)` for the cell at the grid origin.
pub const QUAD_TRIANGLES: [[usize; 3]; 2] = cell_triangles(0, 0, 2);

/// Corner indices `(a, b, d)` and `(b, c, d)` of the grid cell at `(ix, iy)`
/// in a grid `row_width` vertices wide
pub const fn cell_triangles(ix: usize, iy: usize, row_width: usize) -> [[usize; 3]; 2] {
    let a = ix + row_width * iy;
    let b = ix + row_width * (iy + 1);
    let c = (ix + 1) + row_width * (iy + 1);
    let d = (ix + 1) + row_width * iy;
    [[a, b, d], [b, c, d]]
}

/// The four corners of a single-segment face and its normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceQuad {
    /// Corners, row-major with `iy` outer and `ix` inner
    pub corners: [Vec3; 4],
    /// Outward unit normal implied by the depth sign
    pub normal: Vec3,
}

impl FaceQuad {
    /// Vertices of both triangles in emission order
    pub fn triangle_vertices(&self) -> [Vec3; 6] {
        let [[a, b, d], [b2, c, d2]] = QUAD_TRIANGLES;
        [
            self.corners[a],
            self.corners[b],
            self.corners[d],
            self.corners[b2],
            self.corners[c],
            self.corners[d2],
        ]
    }
}

/// Point of a face grid.
///
/// `x` and `y` are the grid offsets already scaled to face units, measured
/// from the face's lower edge.
fn grid_point(origin: Vec3, spec: &FaceSpec, x: f32, y: f32, half: (f32, f32, f32)) -> Vec3 {
    let (width_half, height_half, depth_half) = half;
    let mut point = Vec3::ZERO;
    point[spec.u.index()] = (x - width_half) * spec.u_sign + origin[spec.u.index()];
    point[spec.v.index()] = (y - height_half) * spec.v_sign + origin[spec.v.index()];
    point[spec.w.index()] = depth_half + origin[spec.w.index()];
    point
}

/// Build the four corners of one face centred on `origin`
pub fn build_face(origin: Vec3, spec: FaceSpec, width: f32, height: f32, depth: f32) -> FaceQuad {
    let half = (width / 2.0, height / 2.0, depth / 2.0);
    let mut corners = [Vec3::ZERO; 4];

    for iy in 0..2 {
        let y = iy as f32 * height;
        for ix in 0..2 {
            let x = ix as f32 * width;
            corners[iy * 2 + ix] = grid_point(origin, &spec, x, y, half);
        }
    }

    FaceQuad {
        corners,
        normal: spec.normal(depth),
    }
}

/// Points of a `grid_x` × `grid_y` subdivided face, yielded as
/// `(ix, iy, point)` row-major with `iy` outer.
///
/// Segment counts must be at least one.
pub fn grid_points(
    origin: Vec3,
    spec: FaceSpec,
    extents: (f32, f32, f32),
    grid_x: u32,
    grid_y: u32,
) -> impl Iterator<Item = (u32, u32, Vec3)> {
    let (width, height, depth) = extents;
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;
    let half = (width / 2.0, height / 2.0, depth / 2.0);

    (0..=grid_y).flat_map(move |iy| {
        let y = iy as f32 * segment_height;
        (0..=grid_x).map(move |ix| {
            let x = ix as f32 * segment_width;
            (ix, iy, grid_point(origin, &spec, x, y, half))
        })
    })
}
