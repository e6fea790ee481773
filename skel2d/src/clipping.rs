use crate::{ClippingAttachment, Skeleton};

/// Ear-clipping triangulation of simple polygons, and merging of the resulting triangles into
/// convex pieces.
#[derive(Debug, Default)]
pub struct Triangulator {
    indices: Vec<usize>,
    concave: Vec<bool>,
    triangles: Vec<u16>,
}

impl Triangulator {
    /// Triangulates a simple polygon given as flat `x, y` pairs.
    pub fn triangulate(&mut self, vertices: &[f32]) -> &[u16] {
        self.triangles.clear();
        let mut vertex_count = vertices.len() / 2;
        if vertex_count < 3 {
            return &self.triangles;
        }
        let indices = &mut self.indices;
        indices.clear();
        indices.extend(0..vertex_count);
        let concave = &mut self.concave;
        concave.clear();
        concave.extend(
            (0..vertex_count).map(|i| is_concave(i, vertex_count, vertices, &indices[..])),
        );

        while vertex_count > 3 {
            // Find an ear tip: a convex vertex whose triangle holds no concave vertex.
            let mut previous = vertex_count - 1;
            let mut i = 0;
            let mut next = 1;
            loop {
                if !concave[i] {
                    let p1 = point(vertices, indices[previous]);
                    let p2 = point(vertices, indices[i]);
                    let p3 = point(vertices, indices[next]);
                    let mut ear = true;
                    let mut ii = (next + 1) % vertex_count;
                    while ii != previous {
                        if concave[ii] {
                            let v = point(vertices, indices[ii]);
                            if positive_area(p3, p1, v)
                                && positive_area(p1, p2, v)
                                && positive_area(p2, p3, v)
                            {
                                ear = false;
                                break;
                            }
                        }
                        ii = (ii + 1) % vertex_count;
                    }
                    if ear {
                        break;
                    }
                }
                if next == 0 {
                    // No ear found; take the last convex vertex so degenerate input still ends.
                    while i > 0 && concave[i] {
                        i -= 1;
                    }
                    break;
                }
                previous = i;
                i = next;
                next = (next + 1) % vertex_count;
            }

            self.triangles.extend([
                indices[(vertex_count + i - 1) % vertex_count] as u16,
                indices[i] as u16,
                indices[(i + 1) % vertex_count] as u16,
            ]);
            indices.remove(i);
            concave.remove(i);
            vertex_count -= 1;

            let previous = (vertex_count + i - 1) % vertex_count;
            let next = if i == vertex_count { 0 } else { i };
            concave[previous] = is_concave(previous, vertex_count, vertices, indices);
            concave[next] = is_concave(next, vertex_count, vertices, indices);
        }

        if vertex_count == 3 {
            self.triangles
                .extend([indices[2] as u16, indices[0] as u16, indices[1] as u16]);
        }
        &self.triangles
    }

    /// Merges `triangles` of `vertices` into convex polygons, each as flat `x, y` pairs.
    pub fn decompose(&self, vertices: &[f32], triangles: &[u16]) -> Vec<Vec<f32>> {
        let mut polygons: Vec<Vec<f32>> = Vec::new();
        let mut polygon_indices: Vec<Vec<usize>> = Vec::new();
        let mut polygon: Vec<f32> = Vec::new();
        let mut indices: Vec<usize> = Vec::new();
        let mut fan_base = None;
        let mut last_winding = 0;

        // Merge fans of consecutive triangles sharing their first vertex.
        for triangle in triangles.chunks_exact(3) {
            let [t1, t2, t3] = [triangle[0], triangle[1], triangle[2]].map(usize::from);
            let [x1, y1] = point(vertices, t1);
            let [x2, y2] = point(vertices, t2);
            let [x3, y3] = point(vertices, t3);

            if fan_base == Some(t1) && polygon.len() >= 4 {
                let o = polygon.len() - 4;
                let winding1 = winding(
                    [polygon[o], polygon[o + 1]],
                    [polygon[o + 2], polygon[o + 3]],
                    [x3, y3],
                );
                let winding2 =
                    winding([x3, y3], [polygon[0], polygon[1]], [polygon[2], polygon[3]]);
                if winding1 == last_winding && winding2 == last_winding {
                    polygon.extend([x3, y3]);
                    indices.push(t3);
                    continue;
                }
            }
            if !polygon.is_empty() {
                polygons.push(std::mem::take(&mut polygon));
                polygon_indices.push(std::mem::take(&mut indices));
            }
            polygon.extend([x1, y1, x2, y2, x3, y3]);
            indices.extend([t1, t2, t3]);
            last_winding = winding([x1, y1], [x2, y2], [x3, y3]);
            fan_base = Some(t1);
        }
        if !polygon.is_empty() {
            polygons.push(polygon);
            polygon_indices.push(indices);
        }

        // Go through the list of polygons and try to merge the remaining triangles.
        for i in 0..polygons.len() {
            let (Some(&first_index), Some(&last_index)) =
                (polygon_indices[i].first(), polygon_indices[i].last())
            else {
                continue;
            };
            let len = polygons[i].len();
            let mut prev_prev = [polygons[i][len - 4], polygons[i][len - 3]];
            let mut prev = [polygons[i][len - 2], polygons[i][len - 1]];
            let first = [polygons[i][0], polygons[i][1]];
            let second = [polygons[i][2], polygons[i][3]];
            let winding0 = winding(prev_prev, prev, first);

            let mut ii = 0;
            while ii < polygons.len() {
                let other = &polygon_indices[ii];
                if ii == i
                    || other.len() != 3
                    || other[0] != first_index
                    || other[1] != last_index
                {
                    ii += 1;
                    continue;
                }
                let other_last = other[2];
                let other_len = polygons[ii].len();
                let p3 = [polygons[ii][other_len - 2], polygons[ii][other_len - 1]];
                if winding(prev_prev, prev, p3) == winding0
                    && winding(p3, first, second) == winding0
                {
                    polygons[ii].clear();
                    polygon_indices[ii].clear();
                    polygons[i].extend(p3);
                    polygon_indices[i].push(other_last);
                    prev_prev = prev;
                    prev = p3;
                    ii = 0;
                    continue;
                }
                ii += 1;
            }
        }

        polygons.retain(|polygon| !polygon.is_empty());
        polygons
    }
}

fn point(vertices: &[f32], index: usize) -> [f32; 2] {
    [vertices[index * 2], vertices[index * 2 + 1]]
}

fn positive_area([p1x, p1y]: [f32; 2], [p2x, p2y]: [f32; 2], [p3x, p3y]: [f32; 2]) -> bool {
    p1x * (p3y - p2y) + p2x * (p1y - p3y) + p3x * (p2y - p1y) >= 0.0
}

fn is_concave(index: usize, vertex_count: usize, vertices: &[f32], indices: &[usize]) -> bool {
    let previous = point(vertices, indices[(vertex_count + index - 1) % vertex_count]);
    let current = point(vertices, indices[index]);
    let next = point(vertices, indices[(index + 1) % vertex_count]);
    !positive_area(previous, current, next)
}

fn winding([p1x, p1y]: [f32; 2], [p2x, p2y]: [f32; 2], [p3x, p3y]: [f32; 2]) -> i32 {
    let px = p2x - p1x;
    let py = p2y - p1y;
    if p3x * py - p3y * px + px * p1y - p1x * py >= 0.0 {
        1
    } else {
        -1
    }
}

/// Reverses `polygon` in place unless it is already clockwise.
fn make_clockwise(polygon: &mut [f32]) {
    let len = polygon.len();
    if len < 6 {
        return;
    }
    let mut area = polygon[len - 2] * polygon[1] - polygon[0] * polygon[len - 1];
    for pair in polygon.windows(4).step_by(2) {
        area += pair[0] * pair[3] - pair[2] * pair[1];
    }
    if area < 0.0 {
        return;
    }
    let last = len - 2;
    let mut i = 0;
    while i < len / 2 {
        polygon.swap(i, last - i);
        polygon.swap(i + 1, last - i + 1);
        i += 2;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Clip {
    /// The triangle lies inside the clip polygon.
    Inside,
    /// Nothing of the triangle remains.
    Outside,
    /// The clipped polygon was written to the output buffer.
    Clipped,
}

/// Masks attachments with the polygon of a clipping attachment. A clip started at one slot
/// stays active for the following slots in draw order until its end slot is reached.
///
/// Output buffers are reused between calls; read them before clipping the next slot.
#[derive(Debug, Default)]
pub struct SkeletonClipping {
    triangulator: Triangulator,
    clipping_polygon: Vec<f32>,
    clipping_polygons: Vec<Vec<f32>>,
    end_slot: Option<usize>,
    clip_output: Vec<f32>,
    scratch: Vec<f32>,
    scratch2: Vec<f32>,
    clipped_vertices: Vec<f32>,
    clipped_uvs: Vec<f32>,
    clipped_triangles: Vec<u16>,
}

impl SkeletonClipping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts clipping with `clip`, attached to the slot at `slot_index`, in world space.
    /// Returns the number of convex pieces of the clip polygon, or 0 if a clip is already
    /// active or the polygon is degenerate.
    pub fn clip_start(
        &mut self,
        skeleton: &Skeleton,
        slot_index: usize,
        clip: &ClippingAttachment,
    ) -> usize {
        if self.is_clipping() {
            return 0;
        }
        let Some(slot) = skeleton.slots.get(slot_index) else {
            return 0;
        };
        let n = clip.vertex_data.world_vertices_length();
        if n < 6 {
            return 0;
        }
        let mut polygon = std::mem::take(&mut self.clipping_polygon);
        polygon.clear();
        polygon.resize(n, 0.0);
        clip.vertex_data
            .compute_world_vertices(skeleton, slot, 0, n, &mut polygon, 0, 2);
        let count = self.start_polygon(&polygon);
        self.clipping_polygon = polygon;
        if count > 0 {
            self.end_slot = clip.end_slot;
        }
        count
    }

    /// Starts clipping with a polygon already in world space, as flat `x, y` pairs.
    pub fn clip_start_polygon(&mut self, polygon: &[f32]) -> usize {
        if self.is_clipping() {
            return 0;
        }
        self.end_slot = None;
        self.start_polygon(polygon)
    }

    fn start_polygon(&mut self, polygon: &[f32]) -> usize {
        if polygon.len() < 6 || polygon.len() % 2 != 0 {
            return 0;
        }
        let mut clockwise = polygon.to_vec();
        make_clockwise(&mut clockwise);
        let triangles = self.triangulator.triangulate(&clockwise).to_vec();
        let mut polygons = self.triangulator.decompose(&clockwise, &triangles);
        for polygon in &mut polygons {
            make_clockwise(polygon);
            // Close the loop so every edge is a consecutive pair of points.
            let (x, y) = (polygon[0], polygon[1]);
            polygon.extend([x, y]);
        }
        self.clipping_polygons = polygons;
        self.clipping_polygons.len()
    }

    /// Ends clipping if `slot_index` is the end slot of the active clip.
    pub fn clip_end_with_slot(&mut self, slot_index: usize) {
        if self.is_clipping() && self.end_slot == Some(slot_index) {
            self.clip_end();
        }
    }

    pub fn clip_end(&mut self) {
        self.clipping_polygons.clear();
        self.end_slot = None;
        self.clip_output.clear();
        self.scratch.clear();
        self.scratch2.clear();
    }

    pub fn is_clipping(&self) -> bool {
        !self.clipping_polygons.is_empty()
    }

    pub fn clipped_vertices(&self) -> &[f32] {
        &self.clipped_vertices
    }

    pub fn clipped_uvs(&self) -> &[f32] {
        &self.clipped_uvs
    }

    pub fn clipped_triangles(&self) -> &[u16] {
        &self.clipped_triangles
    }

    /// Clips `triangles` against the active clip polygon. `vertices` holds positions every
    /// `stride` floats and `uvs` holds one `u, v` pair per vertex. The result replaces the
    /// contents of the clipped buffers; returns true if any triangle was cut or dropped.
    ///
    /// Output indices are `u16` and wrap past 65535 clipped vertices.
    pub fn clip_triangles(
        &mut self,
        vertices: &[f32],
        triangles: &[u16],
        uvs: &[f32],
        stride: usize,
    ) -> bool {
        self.clipped_vertices.clear();
        self.clipped_uvs.clear();
        self.clipped_triangles.clear();
        let mut clipped_any = false;
        let mut index: u16 = 0;

        'triangles: for triangle in triangles.chunks_exact(3) {
            let Some(([x1, y1], [u1, v1])) = read_vertex(vertices, uvs, triangle[0], stride) else {
                continue;
            };
            let Some(([x2, y2], [u2, v2])) = read_vertex(vertices, uvs, triangle[1], stride) else {
                continue;
            };
            let Some(([x3, y3], [u3, v3])) = read_vertex(vertices, uvs, triangle[2], stride) else {
                continue;
            };

            for polygon in &self.clipping_polygons {
                let clip = clip_triangle(
                    &mut self.clip_output,
                    &mut self.scratch,
                    &mut self.scratch2,
                    [x1, y1, x2, y2, x3, y3],
                    polygon,
                );
                match clip {
                    Clip::Inside => {
                        self.clipped_vertices.extend([x1, y1, x2, y2, x3, y3]);
                        self.clipped_uvs.extend([u1, v1, u2, v2, u3, v3]);
                        self.clipped_triangles
                            .extend([index, index.wrapping_add(1), index.wrapping_add(2)]);
                        index = index.wrapping_add(3);
                        continue 'triangles;
                    }
                    Clip::Outside => clipped_any = true,
                    Clip::Clipped => {
                        clipped_any = true;
                        let count = self.clip_output.len() / 2;
                        if count < 3 {
                            continue;
                        }
                        // Barycentric coordinates of each clipped point give its UVs.
                        let d0 = y2 - y3;
                        let d1 = x3 - x2;
                        let d2 = x1 - x3;
                        let d4 = y3 - y1;
                        let d = 1.0 / (d0 * d2 + d1 * (y1 - y3));
                        for xy in self.clip_output.chunks_exact(2) {
                            let (x, y) = (xy[0], xy[1]);
                            let c0 = x - x3;
                            let c1 = y - y3;
                            let a = (d0 * c0 + d1 * c1) * d;
                            let b = (d4 * c0 + d2 * c1) * d;
                            let c = 1.0 - a - b;
                            self.clipped_vertices.extend([x, y]);
                            self.clipped_uvs
                                .extend([u1 * a + u2 * b + u3 * c, v1 * a + v2 * b + v3 * c]);
                        }
                        for ii in 1..count as u16 - 1 {
                            self.clipped_triangles.extend([
                                index,
                                index.wrapping_add(ii),
                                index.wrapping_add(ii + 1),
                            ]);
                        }
                        index = index.wrapping_add(count as u16);
                    }
                }
            }
        }
        clipped_any
    }
}

fn read_vertex(
    vertices: &[f32],
    uvs: &[f32],
    vertex: u16,
    stride: usize,
) -> Option<([f32; 2], [f32; 2])> {
    let offset = usize::from(vertex) * stride;
    let uv = usize::from(vertex) * 2;
    Some((
        [*vertices.get(offset)?, *vertices.get(offset + 1)?],
        [*uvs.get(uv)?, *uvs.get(uv + 1)?],
    ))
}

/// Sutherland-Hodgman clip of one triangle against a closed convex polygon. On
/// [`Clip::Clipped`], `out` holds the resulting polygon.
fn clip_triangle(
    out: &mut Vec<f32>,
    scratch: &mut Vec<f32>,
    scratch2: &mut Vec<f32>,
    [x1, y1, x2, y2, x3, y3]: [f32; 6],
    polygon: &[f32],
) -> Clip {
    let mut result = Clip::Inside;
    let mut input = scratch;
    let mut output = scratch2;
    input.clear();
    input.extend([x1, y1, x2, y2, x3, y3, x1, y1]);
    output.clear();

    let last_edge = polygon.len() - 4;
    let mut i = 0;
    loop {
        let edge_x = polygon[i];
        let edge_y = polygon[i + 1];
        let ex = edge_x - polygon[i + 2];
        let ey = edge_y - polygon[i + 3];

        let output_start = output.len();
        for segment in input.windows(4).step_by(2) {
            let (input_x, input_y) = (segment[0], segment[1]);
            let (input_x2, input_y2) = (segment[2], segment[3]);
            let s1 = ey * (edge_x - input_x) - ex * (edge_y - input_y);
            let s2 = ey * (edge_x - input_x2) > ex * (edge_y - input_y2);
            let ix = input_x2 - input_x;
            let iy = input_y2 - input_y;
            if s1 > 0.0 {
                if s2 {
                    // Both inside.
                    output.extend([input_x2, input_y2]);
                    continue;
                }
                // Leaving: keep the intersection.
                let t = s1 / (ix * ey - iy * ex);
                if (0.0..=1.0).contains(&t) {
                    output.extend([input_x + ix * t, input_y + iy * t]);
                } else {
                    output.extend([input_x2, input_y2]);
                }
            } else if s2 {
                // Entering: keep the intersection and the end point.
                let t = s1 / (ix * ey - iy * ex);
                if (0.0..=1.0).contains(&t) {
                    output.extend([input_x + ix * t, input_y + iy * t, input_x2, input_y2]);
                } else {
                    output.extend([input_x2, input_y2]);
                    continue;
                }
            }
            result = Clip::Clipped;
        }

        if output_start == output.len() {
            out.clear();
            return Clip::Outside;
        }
        let (x, y) = (output[0], output[1]);
        output.extend([x, y]);
        if i == last_edge {
            break;
        }
        std::mem::swap(&mut input, &mut output);
        output.clear();
        i += 2;
    }

    out.clear();
    out.extend_from_slice(&output[..output.len() - 2]);
    result
}
