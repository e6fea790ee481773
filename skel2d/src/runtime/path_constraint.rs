use crate::math::{DEG_RAD, wrap_radians};
use crate::{
    Attachment, PathAttachment, PathConstraintData, PositionMode, RotateMode, Skeleton, Slot,
    SpacingMode,
};
use std::sync::Arc;

const EPSILON: f32 = 0.00001;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum CachedCurve {
    None,
    Before,
    After,
    Curve(usize),
}

/// Buffers reused between updates so solving a path allocates only when the bone count or
/// path size grows.
#[derive(Clone, Debug, Default)]
struct PathScratch {
    spaces: Vec<f32>,
    positions: Vec<f32>,
    world: Vec<f32>,
    curves: Vec<f32>,
    lengths: Vec<f32>,
    segments: [f32; 10],
}

#[derive(Clone, Debug)]
pub struct PathConstraint {
    pub data: usize,
    pub bones: Vec<usize>,
    /// Slot holding the path attachment.
    pub target: usize,
    pub position: f32,
    pub spacing: f32,
    pub mix_rotate: f32,
    pub mix_x: f32,
    pub mix_y: f32,
    pub(crate) active: bool,
    scratch: PathScratch,
}

impl PathConstraint {
    pub fn new(index: usize, data: &PathConstraintData) -> Self {
        Self {
            data: index,
            bones: data.bones.clone(),
            target: data.target,
            position: data.position,
            spacing: data.spacing,
            mix_rotate: data.mix_rotate,
            mix_x: data.mix_x,
            mix_y: data.mix_y,
            active: false,
            scratch: PathScratch::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_to_setup_pose(&mut self, data: &PathConstraintData) {
        self.position = data.position;
        self.spacing = data.spacing;
        self.mix_rotate = data.mix_rotate;
        self.mix_x = data.mix_x;
        self.mix_y = data.mix_y;
    }
}

impl Skeleton {
    pub(crate) fn update_path_constraint(&mut self, index: usize) {
        let Some(constraint) = self.path_constraints.get(index) else {
            return;
        };
        let Some(slot) = self.slots.get(constraint.target) else {
            return;
        };
        let Some(attachment) = slot.attachment().cloned() else {
            return;
        };
        let Attachment::Path(path) = attachment.as_ref() else {
            return;
        };
        let (mix_rotate, mix_x, mix_y) =
            (constraint.mix_rotate, constraint.mix_x, constraint.mix_y);
        if mix_rotate == 0.0 && mix_x == 0.0 && mix_y == 0.0 {
            return;
        }
        if constraint.bones.is_empty() {
            return;
        }
        let data = Arc::clone(&self.data);
        let constraint_data = &data.path_constraints[constraint.data];
        let bones = constraint.bones.clone();
        let (position, spacing, slot_index) =
            (constraint.position, constraint.spacing, constraint.target);
        let mut scratch = std::mem::take(&mut self.path_constraints[index].scratch);

        let tangents = constraint_data.rotate_mode == RotateMode::Tangent;
        let scale = constraint_data.rotate_mode == RotateMode::ChainScale;
        let bone_count = bones.len();
        let spaces_count = if tangents { bone_count } else { bone_count + 1 };

        scratch.spaces.clear();
        scratch.spaces.resize(spaces_count, 0.0);
        scratch.lengths.clear();
        if scale {
            scratch.lengths.resize(bone_count, 0.0);
        }
        let bone_length = |i: usize| -> (f32, f32) {
            let bone = &self.bones[bones[i]];
            let setup_length = data.bones[bone.data].length;
            let x = setup_length * bone.a;
            let y = setup_length * bone.c;
            (setup_length, (x * x + y * y).sqrt())
        };
        match constraint_data.spacing_mode {
            SpacingMode::Percent => {
                if scale {
                    for i in 0..spaces_count - 1 {
                        scratch.lengths[i] = bone_length(i).1;
                    }
                }
                scratch.spaces[1..].fill(spacing);
            }
            SpacingMode::Proportional => {
                let mut sum = 0.0;
                for i in 0..spaces_count - 1 {
                    let (setup_length, length) = bone_length(i);
                    if setup_length < EPSILON {
                        if scale {
                            scratch.lengths[i] = 0.0;
                        }
                        scratch.spaces[i + 1] = spacing;
                    } else {
                        if scale {
                            scratch.lengths[i] = length;
                        }
                        scratch.spaces[i + 1] = length;
                        sum += length;
                    }
                }
                if sum > 0.0 {
                    let sum = spaces_count as f32 / sum * spacing;
                    for space in &mut scratch.spaces[1..] {
                        *space *= sum;
                    }
                }
            }
            SpacingMode::Length | SpacingMode::Fixed => {
                let length_spacing = constraint_data.spacing_mode == SpacingMode::Length;
                for i in 0..spaces_count - 1 {
                    let (setup_length, length) = bone_length(i);
                    if setup_length < EPSILON {
                        if scale {
                            scratch.lengths[i] = 0.0;
                        }
                        scratch.spaces[i + 1] = spacing;
                    } else {
                        if scale {
                            scratch.lengths[i] = length;
                        }
                        let space = if length_spacing {
                            setup_length + spacing
                        } else {
                            spacing
                        };
                        scratch.spaces[i + 1] = space * length / setup_length;
                    }
                }
            }
        }

        let slot = &self.slots[slot_index];
        compute_world_positions(
            self,
            slot,
            path,
            constraint_data,
            position,
            spaces_count,
            tangents,
            &mut scratch,
        );

        if scratch.positions.len() < spaces_count * 3 {
            self.path_constraints[index].scratch = scratch;
            return;
        }
        let positions = &scratch.positions;
        let (mut bone_x, mut bone_y) = (positions[0], positions[1]);
        let mut offset_rotation = constraint_data.offset_rotation;
        let tip = if offset_rotation == 0.0 {
            constraint_data.rotate_mode == RotateMode::Chain
        } else {
            let p = &self.bones[self.slots[slot_index].bone];
            offset_rotation *= if p.a * p.d - p.b * p.c > 0.0 {
                DEG_RAD
            } else {
                -DEG_RAD
            };
            false
        };

        for (i, &bone_index) in bones.iter().enumerate() {
            let p = 3 + i * 3;
            let setup_length = data.bones[self.bones[bone_index].data].length;
            let bone = &mut self.bones[bone_index];
            bone.world_x += (bone_x - bone.world_x) * mix_x;
            bone.world_y += (bone_y - bone.world_y) * mix_y;
            let (x, y) = (positions[p], positions[p + 1]);
            let (dx, dy) = (x - bone_x, y - bone_y);
            if scale {
                let length = scratch.lengths[i];
                if length != 0.0 {
                    let s = ((dx * dx + dy * dy).sqrt() / length - 1.0) * mix_rotate + 1.0;
                    bone.a *= s;
                    bone.c *= s;
                }
            }
            bone_x = x;
            bone_y = y;
            if mix_rotate > 0.0 {
                let (a, b, c, d) = (bone.a, bone.b, bone.c, bone.d);
                let mut r = if tangents {
                    positions[p - 1]
                } else if scratch.spaces[i + 1] == 0.0 {
                    positions[p + 2]
                } else {
                    dy.atan2(dx)
                };
                r -= c.atan2(a);
                if tip {
                    let (sin, cos) = r.sin_cos();
                    bone_x += (setup_length * (cos * a - sin * c) - dx) * mix_rotate;
                    bone_y += (setup_length * (sin * a + cos * c) - dy) * mix_rotate;
                } else {
                    r += offset_rotation;
                }
                let r = wrap_radians(r) * mix_rotate;
                let (sin, cos) = r.sin_cos();
                bone.a = cos * a - sin * c;
                bone.b = cos * b - sin * d;
                bone.c = sin * a + cos * c;
                bone.d = sin * b + cos * d;
            }
            self.update_bone_applied(bone_index);
        }

        self.path_constraints[index].scratch = scratch;
    }
}

/// Fills `scratch.positions` with `[x, y, rotation]` per space along the path, extrapolating
/// in a straight line before the start and past the end of open paths.
#[allow(clippy::too_many_arguments)]
fn compute_world_positions(
    skeleton: &Skeleton,
    slot: &Slot,
    path: &PathAttachment,
    data: &PathConstraintData,
    mut position: f32,
    spaces_count: usize,
    tangents: bool,
    scratch: &mut PathScratch,
) {
    let closed = path.closed;
    let vertex_data = &path.vertex_data;
    let mut vertices_length = vertex_data.world_vertices_length();
    let out = &mut scratch.positions;
    out.clear();
    if vertices_length < 6 || spaces_count == 0 {
        return;
    }
    out.resize(spaces_count * 3 + 2, 0.0);
    let spaces = &scratch.spaces;
    let world = &mut scratch.world;
    let mut curve_count = vertices_length / 6;
    let mut prev_curve = CachedCurve::None;

    if !path.constant_speed {
        let Some(curve_count) = curve_count.checked_sub(if closed { 1 } else { 2 }) else {
            return;
        };
        let lengths = &path.lengths;
        let Some(&path_length) = lengths.get(curve_count) else {
            return;
        };
        if data.position_mode == PositionMode::Percent {
            position *= path_length;
        }
        let multiplier = spacing_multiplier(data.spacing_mode, path_length, spaces_count);

        world.clear();
        world.resize(8, 0.0);
        let mut curve = 0;
        for i in 0..spaces_count {
            let o = i * 3;
            let space = spaces[i] * multiplier;
            position += space;
            let mut p = position;

            if closed {
                p %= path_length;
                if p < 0.0 {
                    p += path_length;
                }
                curve = 0;
            } else if p < 0.0 {
                if prev_curve != CachedCurve::Before {
                    prev_curve = CachedCurve::Before;
                    vertex_data.compute_world_vertices(skeleton, slot, 2, 4, world, 0, 2);
                }
                add_before_position(p, world, 0, out, o);
                continue;
            } else if p > path_length {
                if prev_curve != CachedCurve::After {
                    prev_curve = CachedCurve::After;
                    vertex_data.compute_world_vertices(
                        skeleton,
                        slot,
                        vertices_length - 6,
                        4,
                        world,
                        0,
                        2,
                    );
                }
                add_after_position(p - path_length, world, 0, out, o);
                continue;
            }

            loop {
                let Some(&length) = lengths.get(curve) else {
                    break;
                };
                if p > length {
                    curve += 1;
                    continue;
                }
                if curve == 0 {
                    p /= length;
                } else {
                    let prev = lengths[curve - 1];
                    p = (p - prev) / (length - prev);
                }
                break;
            }
            if prev_curve != CachedCurve::Curve(curve) {
                prev_curve = CachedCurve::Curve(curve);
                if closed && curve == curve_count {
                    vertex_data.compute_world_vertices(
                        skeleton,
                        slot,
                        vertices_length - 4,
                        4,
                        world,
                        0,
                        2,
                    );
                    vertex_data.compute_world_vertices(skeleton, slot, 0, 4, world, 4, 2);
                } else {
                    vertex_data.compute_world_vertices(
                        skeleton,
                        slot,
                        curve * 6 + 2,
                        8,
                        world,
                        0,
                        2,
                    );
                }
            }
            let w = &world[..8];
            add_curve_position(
                p,
                [w[0], w[1], w[2], w[3], w[4], w[5], w[6], w[7]],
                out,
                o,
                tangents || (i > 0 && space == 0.0),
            );
        }
        return;
    }

    if closed {
        vertices_length += 2;
        world.clear();
        world.resize(vertices_length, 0.0);
        vertex_data.compute_world_vertices(skeleton, slot, 2, vertices_length - 4, world, 0, 2);
        vertex_data.compute_world_vertices(skeleton, slot, 0, 2, world, vertices_length - 4, 2);
        world[vertices_length - 2] = world[0];
        world[vertices_length - 1] = world[1];
    } else {
        curve_count -= 1;
        vertices_length -= 4;
        world.clear();
        world.resize(vertices_length, 0.0);
        vertex_data.compute_world_vertices(skeleton, slot, 2, vertices_length, world, 0, 2);
    }

    let curves = &mut scratch.curves;
    curves.clear();
    curves.resize(curve_count, 0.0);
    let mut path_length = 0.0;
    let (mut x1, mut y1) = (world[0], world[1]);
    for (i, curve_length) in curves.iter_mut().enumerate() {
        let w = 2 + i * 6;
        let (cx1, cy1, cx2, cy2, x2, y2) = (
            world[w],
            world[w + 1],
            world[w + 2],
            world[w + 3],
            world[w + 4],
            world[w + 5],
        );
        let tmpx = (x1 - cx1 * 2.0 + cx2) * 0.1875;
        let tmpy = (y1 - cy1 * 2.0 + cy2) * 0.1875;
        let dddfx = ((cx1 - cx2) * 3.0 - x1 + x2) * 0.09375;
        let dddfy = ((cy1 - cy2) * 3.0 - y1 + y2) * 0.09375;
        let mut ddfx = tmpx * 2.0 + dddfx;
        let mut ddfy = tmpy * 2.0 + dddfy;
        let mut dfx = (cx1 - x1) * 0.75 + tmpx + dddfx * 0.166_666_67;
        let mut dfy = (cy1 - y1) * 0.75 + tmpy + dddfy * 0.166_666_67;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx;
        dfy += ddfy;
        ddfx += dddfx;
        ddfy += dddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx;
        dfy += ddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        dfx += ddfx + dddfx;
        dfy += ddfy + dddfy;
        path_length += (dfx * dfx + dfy * dfy).sqrt();
        *curve_length = path_length;
        x1 = x2;
        y1 = y2;
    }

    if data.position_mode == PositionMode::Percent {
        position *= path_length;
    }
    let multiplier = spacing_multiplier(data.spacing_mode, path_length, spaces_count);

    let segments = &mut scratch.segments;
    let mut curve_length = 0.0;
    let mut points = [0.0; 8];
    let (mut curve, mut segment) = (0, 0);
    for i in 0..spaces_count {
        let o = i * 3;
        let space = spaces[i] * multiplier;
        position += space;
        let mut p = position;

        if closed {
            p %= path_length;
            if p < 0.0 {
                p += path_length;
            }
            curve = 0;
        } else if p < 0.0 {
            add_before_position(p, world, 0, out, o);
            continue;
        } else if p > path_length {
            add_after_position(p - path_length, world, vertices_length - 4, out, o);
            continue;
        }

        loop {
            let Some(&length) = curves.get(curve) else {
                break;
            };
            if p > length {
                curve += 1;
                continue;
            }
            if curve == 0 {
                p /= length;
            } else {
                let prev = curves[curve - 1];
                p = (p - prev) / (length - prev);
            }
            break;
        }

        if prev_curve != CachedCurve::Curve(curve) {
            prev_curve = CachedCurve::Curve(curve);
            let ii = curve * 6;
            let Some(w) = world.get(ii..ii + 8) else {
                continue;
            };
            points.copy_from_slice(w);
            curve_length = fill_segments(&points, segments);
            segment = 0;
        }

        p *= curve_length;
        loop {
            let length = segments[segment];
            if p > length && segment < segments.len() - 1 {
                segment += 1;
                continue;
            }
            if segment == 0 {
                p /= length;
            } else {
                let prev = segments[segment - 1];
                p = segment as f32 + (p - prev) / (length - prev);
            }
            break;
        }
        add_curve_position(
            p * 0.1,
            points,
            out,
            o,
            tangents || (i > 0 && space == 0.0),
        );
    }
}

fn spacing_multiplier(mode: SpacingMode, path_length: f32, spaces_count: usize) -> f32 {
    match mode {
        SpacingMode::Percent => path_length,
        SpacingMode::Proportional => path_length / spaces_count as f32,
        SpacingMode::Length | SpacingMode::Fixed => 1.0,
    }
}

/// Samples a curve at ten points by forward differencing, storing cumulative lengths.
/// Returns the curve's total length.
fn fill_segments(points: &[f32; 8], segments: &mut [f32; 10]) -> f32 {
    let [x1, y1, cx1, cy1, cx2, cy2, x2, y2] = *points;
    let tmpx = (x1 - cx1 * 2.0 + cx2) * 0.03;
    let tmpy = (y1 - cy1 * 2.0 + cy2) * 0.03;
    let dddfx = ((cx1 - cx2) * 3.0 - x1 + x2) * 0.006;
    let dddfy = ((cy1 - cy2) * 3.0 - y1 + y2) * 0.006;
    let mut ddfx = tmpx * 2.0 + dddfx;
    let mut ddfy = tmpy * 2.0 + dddfy;
    let mut dfx = (cx1 - x1) * 0.3 + tmpx + dddfx * 0.166_666_67;
    let mut dfy = (cy1 - y1) * 0.3 + tmpy + dddfy * 0.166_666_67;
    let mut curve_length = (dfx * dfx + dfy * dfy).sqrt();
    segments[0] = curve_length;
    for segment in segments.iter_mut().take(8).skip(1) {
        dfx += ddfx;
        dfy += ddfy;
        ddfx += dddfx;
        ddfy += dddfy;
        curve_length += (dfx * dfx + dfy * dfy).sqrt();
        *segment = curve_length;
    }
    dfx += ddfx;
    dfy += ddfy;
    curve_length += (dfx * dfx + dfy * dfy).sqrt();
    segments[8] = curve_length;
    dfx += ddfx + dddfx;
    dfy += ddfy + dddfy;
    curve_length += (dfx * dfx + dfy * dfy).sqrt();
    segments[9] = curve_length;
    curve_length
}

fn add_before_position(p: f32, temp: &[f32], i: usize, out: &mut [f32], o: usize) {
    let (x1, y1) = (temp[i], temp[i + 1]);
    let r = (temp[i + 3] - y1).atan2(temp[i + 2] - x1);
    out[o] = x1 + p * r.cos();
    out[o + 1] = y1 + p * r.sin();
    out[o + 2] = r;
}

fn add_after_position(p: f32, temp: &[f32], i: usize, out: &mut [f32], o: usize) {
    let (x1, y1) = (temp[i + 2], temp[i + 3]);
    let r = (y1 - temp[i + 1]).atan2(x1 - temp[i]);
    out[o] = x1 + p * r.cos();
    out[o + 1] = y1 + p * r.sin();
    out[o + 2] = r;
}

fn add_curve_position(p: f32, points: [f32; 8], out: &mut [f32], o: usize, tangents: bool) {
    let [x1, y1, cx1, cy1, cx2, cy2, x2, y2] = points;
    if p == 0.0 || p.is_nan() {
        out[o] = x1;
        out[o + 1] = y1;
        out[o + 2] = (cy1 - y1).atan2(cx1 - x1);
        return;
    }
    let (tt, u) = (p * p, 1.0 - p);
    let (ttt, uu) = (tt * p, u * u);
    let uuu = uu * u;
    let ut = u * p;
    let ut3 = ut * 3.0;
    let (uut3, utt3) = (u * ut3, ut3 * p);
    let x = x1 * uuu + cx1 * uut3 + cx2 * utt3 + x2 * ttt;
    let y = y1 * uuu + cy1 * uut3 + cy2 * utt3 + y2 * ttt;
    out[o] = x;
    out[o + 1] = y;
    if tangents {
        out[o + 2] = if p < 0.001 {
            (cy1 - y1).atan2(cx1 - x1)
        } else {
            let dy = y - (y1 * uu + cy1 * ut * 2.0 + cy2 * tt);
            let dx = x - (x1 * uu + cx1 * ut * 2.0 + cx2 * tt);
            dy.atan2(dx)
        };
    }
}
