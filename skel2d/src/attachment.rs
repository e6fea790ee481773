use crate::math::{DEG_RAD, atan2_deg};
use crate::{Bone, Color, Skeleton, Slot};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_VERTEX_ID: AtomicU32 = AtomicU32::new(1);
static NEXT_SEQUENCE_ID: AtomicU32 = AtomicU32::new(1);

fn next_id(counter: &AtomicU32) -> u32 {
    counter.fetch_add(1, Ordering::Relaxed)
}

/// Immutable attachment geometry, shared between skins through `Arc`.
#[derive(Clone, Debug)]
pub enum Attachment {
    Region(RegionAttachment),
    Mesh(MeshAttachment),
    BoundingBox(BoundingBoxAttachment),
    Path(PathAttachment),
    Clipping(ClippingAttachment),
    Point(PointAttachment),
}

impl Attachment {
    pub fn name(&self) -> &str {
        match self {
            Self::Region(a) => &a.name,
            Self::Mesh(a) => &a.name,
            Self::BoundingBox(a) => &a.name,
            Self::Path(a) => &a.name,
            Self::Clipping(a) => &a.name,
            Self::Point(a) => &a.name,
        }
    }

    pub fn vertex_data(&self) -> Option<&VertexData> {
        match self {
            Self::Mesh(a) => Some(&a.vertex_data),
            Self::BoundingBox(a) => Some(&a.vertex_data),
            Self::Path(a) => Some(&a.vertex_data),
            Self::Clipping(a) => Some(&a.vertex_data),
            Self::Region(_) | Self::Point(_) => None,
        }
    }

    pub fn sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Region(a) => a.sequence.as_ref(),
            Self::Mesh(a) => a.sequence.as_ref(),
            _ => None,
        }
    }

    /// Id matched against deform timelines, shared by a mesh and the meshes linked to it.
    pub fn timeline_id(&self) -> Option<u32> {
        self.vertex_data().map(VertexData::timeline_id)
    }

    pub fn as_path(&self) -> Option<&PathAttachment> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_clipping(&self) -> Option<&ClippingAttachment> {
        match self {
            Self::Clipping(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexWeight {
    pub bone: usize,
    pub x: f32,
    pub y: f32,
    pub weight: f32,
}

#[derive(Clone, Debug)]
pub enum Vertices {
    /// Positions local to the slot's bone.
    Unweighted(Vec<[f32; 2]>),
    /// Per vertex, the bones influencing it with positions local to each bone.
    Weighted(Vec<Vec<VertexWeight>>),
}

#[derive(Clone, Debug)]
pub struct VertexData {
    id: u32,
    pub vertices: Vertices,
    /// Set on linked meshes so they share the deform keys of their source mesh.
    pub timeline_attachment: Option<u32>,
}

impl VertexData {
    pub fn new(vertices: Vertices) -> Self {
        Self {
            id: next_id(&NEXT_VERTEX_ID),
            vertices,
            timeline_attachment: None,
        }
    }

    pub fn unweighted(positions: &[f32]) -> Self {
        Self::new(Vertices::Unweighted(
            positions.chunks_exact(2).map(|p| [p[0], p[1]]).collect(),
        ))
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn timeline_id(&self) -> u32 {
        self.timeline_attachment.unwrap_or(self.id)
    }

    pub fn is_weighted(&self) -> bool {
        matches!(self.vertices, Vertices::Weighted(_))
    }

    pub fn vertex_count(&self) -> usize {
        match &self.vertices {
            Vertices::Unweighted(v) => v.len(),
            Vertices::Weighted(v) => v.len(),
        }
    }

    /// Floats written by [`Self::compute_world_vertices`] for the whole attachment.
    pub fn world_vertices_length(&self) -> usize {
        self.vertex_count() * 2
    }

    /// Length of a slot deform buffer: two floats per vertex, or per bone influence when
    /// weighted.
    pub fn deform_length(&self) -> usize {
        match &self.vertices {
            Vertices::Unweighted(v) => v.len() * 2,
            Vertices::Weighted(v) => v.iter().map(Vec::len).sum::<usize>() * 2,
        }
    }

    /// Flat setup positions for unweighted attachments.
    pub fn setup_positions(&self) -> Option<&[f32]> {
        match &self.vertices {
            Vertices::Unweighted(v) => Some(v.as_flattened()),
            Vertices::Weighted(_) => None,
        }
    }

    /// Transforms `count` floats of local vertices starting at float `start` to world
    /// coordinates, writing pairs into `out` at `offset` every `stride` floats. The slot's
    /// deform buffer is applied when it is populated.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_world_vertices(
        &self,
        skeleton: &Skeleton,
        slot: &Slot,
        start: usize,
        count: usize,
        out: &mut [f32],
        offset: usize,
        stride: usize,
    ) {
        let first = start / 2;
        let n = count / 2;
        if n == 0 || out.len() < offset + (n - 1) * stride + 2 {
            return;
        }
        match &self.vertices {
            Vertices::Unweighted(vertices) => {
                let Some(bone) = skeleton.bones.get(slot.bone) else {
                    return;
                };
                let positions = if slot.deform.len() >= vertices.len() * 2 {
                    slot.deform.as_slice()
                } else {
                    vertices.as_flattened()
                };
                let Some(positions) = positions.get(first * 2..(first + n) * 2) else {
                    return;
                };
                for (i, p) in positions.chunks_exact(2).enumerate() {
                    let w = offset + i * stride;
                    out[w] = p[0] * bone.a + p[1] * bone.b + bone.world_x;
                    out[w + 1] = p[0] * bone.c + p[1] * bone.d + bone.world_y;
                }
            }
            Vertices::Weighted(vertices) => {
                let Some(range) = vertices.get(first..first + n) else {
                    return;
                };
                let mut f = vertices[..first].iter().map(Vec::len).sum::<usize>() * 2;
                let deform = if slot.deform.len() >= self.deform_length() {
                    slot.deform.as_slice()
                } else {
                    &[]
                };
                for (i, weights) in range.iter().enumerate() {
                    let (mut wx, mut wy) = (0.0, 0.0);
                    for vw in weights {
                        let (mut vx, mut vy) = (vw.x, vw.y);
                        if !deform.is_empty() {
                            vx += deform[f];
                            vy += deform[f + 1];
                        }
                        f += 2;
                        let Some(bone) = skeleton.bones.get(vw.bone) else {
                            continue;
                        };
                        wx += (vx * bone.a + vy * bone.b + bone.world_x) * vw.weight;
                        wy += (vx * bone.c + vy * bone.d + bone.world_y) * vw.weight;
                    }
                    let w = offset + i * stride;
                    out[w] = wx;
                    out[w + 1] = wy;
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum SequenceMode {
    #[default]
    Hold,
    Once,
    Loop,
    Pingpong,
    OnceReverse,
    LoopReverse,
    PingpongReverse,
}

/// A flipbook of texture regions. Only the frame index is tracked here; region lookup
/// belongs to the renderer.
#[derive(Clone, Debug)]
pub struct Sequence {
    id: u32,
    pub count: usize,
    pub start: i32,
    pub digits: usize,
    pub setup_index: usize,
}

impl Sequence {
    pub fn new(count: usize) -> Self {
        Self {
            id: next_id(&NEXT_SEQUENCE_ID),
            count,
            start: 0,
            digits: 0,
            setup_index: 0,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The region index a slot currently shows.
    pub fn resolve_index(&self, slot: &Slot) -> usize {
        usize::try_from(slot.sequence_index).unwrap_or(self.setup_index)
    }

    pub fn path(&self, base_path: &str, index: usize) -> String {
        let frame = self.start + index as i32;
        format!("{base_path}{frame:0width$}", width = self.digits)
    }
}

/// A textured quad. `offset` holds the four local corners and is rebuilt by
/// [`RegionAttachment::update_offsets`].
#[derive(Clone, Debug)]
pub struct RegionAttachment {
    pub name: String,
    pub path: String,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
    /// Corner uvs in the same order as the offsets.
    pub uvs: [f32; 8],
    pub sequence: Option<Sequence>,
    offset: [f32; 8],
}

impl RegionAttachment {
    pub fn new(name: impl Into<String>, width: f32, height: f32) -> Self {
        let name = name.into();
        let mut region = Self {
            path: name.clone(),
            name,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width,
            height,
            color: Color::WHITE,
            uvs: [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0],
            sequence: None,
            offset: [0.0; 8],
        };
        region.update_offsets();
        region
    }

    pub fn offset(&self) -> &[f32; 8] {
        &self.offset
    }

    pub fn update_offsets(&mut self) {
        let local_x = -self.width / 2.0 * self.scale_x;
        let local_y = -self.height / 2.0 * self.scale_y;
        let local_x2 = local_x + self.width * self.scale_x;
        let local_y2 = local_y + self.height * self.scale_y;
        let (sin, cos) = (self.rotation * DEG_RAD).sin_cos();
        let local_x_cos = local_x * cos + self.x;
        let local_x_sin = local_x * sin;
        let local_y_cos = local_y * cos + self.y;
        let local_y_sin = local_y * sin;
        let local_x2_cos = local_x2 * cos + self.x;
        let local_x2_sin = local_x2 * sin;
        let local_y2_cos = local_y2 * cos + self.y;
        let local_y2_sin = local_y2 * sin;

        self.offset = [
            local_x_cos - local_y_sin,
            local_y_cos + local_x_sin,
            local_x_cos - local_y2_sin,
            local_y2_cos + local_x_sin,
            local_x2_cos - local_y2_sin,
            local_y2_cos + local_x2_sin,
            local_x2_cos - local_y_sin,
            local_y_cos + local_x2_sin,
        ];
    }

    /// Writes the four world corners (8 floats) into `out`.
    pub fn compute_world_vertices(
        &self,
        bone: &Bone,
        out: &mut [f32],
        offset: usize,
        stride: usize,
    ) {
        if out.len() < offset + stride * 3 + 2 {
            return;
        }
        for (i, corner) in self.offset.chunks_exact(2).enumerate() {
            let w = offset + i * stride;
            out[w] = corner[0] * bone.a + corner[1] * bone.b + bone.world_x;
            out[w + 1] = corner[0] * bone.c + corner[1] * bone.d + bone.world_y;
        }
    }
}

#[derive(Clone, Debug)]
pub struct MeshAttachment {
    pub name: String,
    pub path: String,
    pub vertex_data: VertexData,
    pub uvs: Vec<f32>,
    pub triangles: Vec<u16>,
    /// Number of floats on the convex hull, at the start of the vertex list.
    pub hull_length: usize,
    pub color: Color,
    pub sequence: Option<Sequence>,
}

impl MeshAttachment {
    pub fn new(
        name: impl Into<String>,
        vertex_data: VertexData,
        uvs: Vec<f32>,
        triangles: Vec<u16>,
    ) -> Self {
        let name = name.into();
        let hull_length = vertex_data.world_vertices_length();
        Self {
            path: name.clone(),
            name,
            vertex_data,
            uvs,
            triangles,
            hull_length,
            color: Color::WHITE,
            sequence: None,
        }
    }

    /// A mesh sharing this mesh's geometry and deform keys.
    pub fn new_linked(&self, name: impl Into<String>) -> Self {
        let mut linked = self.clone();
        linked.name = name.into();
        let timeline = self.vertex_data.timeline_id();
        linked.vertex_data = VertexData::new(self.vertex_data.vertices.clone());
        linked.vertex_data.timeline_attachment = Some(timeline);
        linked
    }
}

#[derive(Clone, Debug)]
pub struct BoundingBoxAttachment {
    pub name: String,
    pub vertex_data: VertexData,
    pub color: Color,
}

impl BoundingBoxAttachment {
    pub fn new(name: impl Into<String>, vertex_data: VertexData) -> Self {
        Self {
            name: name.into(),
            vertex_data,
            color: Color::WHITE,
        }
    }
}

/// A cubic bezier spline: for each curve, anchor and control points in the order
/// `[c1, anchor, c2]`, three points per curve.
#[derive(Clone, Debug)]
pub struct PathAttachment {
    pub name: String,
    pub vertex_data: VertexData,
    /// Cumulative length at the end of each curve.
    pub lengths: Vec<f32>,
    pub closed: bool,
    pub constant_speed: bool,
    pub color: Color,
}

impl PathAttachment {
    pub fn new(name: impl Into<String>, vertex_data: VertexData, lengths: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            vertex_data,
            lengths,
            closed: false,
            constant_speed: true,
            color: Color::WHITE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClippingAttachment {
    pub name: String,
    pub vertex_data: VertexData,
    /// Clipping stops after this slot is drawn; `None` clips to the end of the draw order.
    pub end_slot: Option<usize>,
    pub color: Color,
}

impl ClippingAttachment {
    pub fn new(name: impl Into<String>, vertex_data: VertexData) -> Self {
        Self {
            name: name.into(),
            vertex_data,
            end_slot: None,
            color: Color::WHITE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PointAttachment {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub color: Color,
}

impl PointAttachment {
    pub fn new(name: impl Into<String>, x: f32, y: f32, rotation: f32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            rotation,
            color: Color::WHITE,
        }
    }

    pub fn compute_world_position(&self, bone: &Bone) -> (f32, f32) {
        (
            self.x * bone.a + self.y * bone.b + bone.world_x,
            self.x * bone.c + self.y * bone.d + bone.world_y,
        )
    }

    pub fn compute_world_rotation(&self, bone: &Bone) -> f32 {
        let (sin, cos) = (self.rotation * DEG_RAD).sin_cos();
        let x = cos * bone.a + sin * bone.b;
        let y = cos * bone.c + sin * bone.d;
        atan2_deg(y, x)
    }
}
