use crate::math::{RAD_DEG, atan2_deg, signum};
use crate::{IkConstraintData, Inherit, Skeleton};
use std::f32::consts::PI;

/// Runtime state of an IK constraint. Timelines animate the mutable fields; the bone list and
/// target come from the setup data.
#[derive(Clone, Debug)]
pub struct IkConstraint {
    pub data: usize,
    pub bones: Vec<usize>,
    pub target: usize,
    pub mix: f32,
    pub softness: f32,
    pub bend_direction: i32,
    pub compress: bool,
    pub stretch: bool,
    pub(crate) active: bool,
}

impl IkConstraint {
    pub fn new(index: usize, data: &IkConstraintData) -> Self {
        Self {
            data: index,
            bones: data.bones.clone(),
            target: data.target,
            mix: data.mix,
            softness: data.softness,
            bend_direction: data.bend_direction,
            compress: data.compress,
            stretch: data.stretch,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_to_setup_pose(&mut self, data: &IkConstraintData) {
        self.mix = data.mix;
        self.softness = data.softness;
        self.bend_direction = data.bend_direction;
        self.compress = data.compress;
        self.stretch = data.stretch;
    }
}

impl Skeleton {
    pub(crate) fn update_ik_constraint(&mut self, index: usize) {
        let Some(ik) = self.ik_constraints.get(index) else {
            return;
        };
        if ik.mix == 0.0 {
            return;
        }
        let Some(target) = self.bones.get(ik.target) else {
            return;
        };
        let (target_x, target_y) = (target.world_x, target.world_y);
        let uniform = self.data.ik_constraints[ik.data].uniform;
        let (mix, softness, bend, compress, stretch) =
            (ik.mix, ik.softness, ik.bend_direction, ik.compress, ik.stretch);

        let chain = match *ik.bones.as_slice() {
            [bone] => (bone, None),
            [parent, child] => (parent, Some(child)),
            _ => return,
        };
        match chain {
            (bone, None) => {
                self.apply_ik_one(bone, target_x, target_y, compress, stretch, uniform, mix)
            }
            (parent, Some(child)) => self.apply_ik_two(
                parent, child, target_x, target_y, bend, stretch, uniform, softness, mix,
            ),
        }
    }

    /// Rotates `bone` so its X axis points at the target, optionally scaling it to reach.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_ik_one(
        &mut self,
        bone_index: usize,
        target_x: f32,
        target_y: f32,
        compress: bool,
        stretch: bool,
        uniform: bool,
        alpha: f32,
    ) {
        let Some(bone) = self.bones.get(bone_index) else {
            return;
        };
        let Some(parent) = bone.parent.and_then(|p| self.bones.get(p)) else {
            return;
        };
        let root = self.root_transform();
        let (pa, mut pb, pc, mut pd) = (parent.a, parent.b, parent.c, parent.d);

        let mut rotation_ik = -bone.ashear_x - bone.arotation;
        let (mut tx, mut ty);
        match bone.inherit {
            Inherit::OnlyTranslation => {
                tx = (target_x - bone.world_x) * signum(root.scale_x);
                ty = (target_y - bone.world_y) * signum(root.scale_y);
            }
            inherit => {
                if inherit == Inherit::NoRotationOrReflection {
                    let s = (pa * pd - pb * pc).abs() / (pa * pa + pc * pc).max(0.0001);
                    let sa = pa / root.scale_x;
                    let sc = pc / root.scale_y;
                    pb = -sc * s * root.scale_x;
                    pd = sa * s * root.scale_y;
                    rotation_ik += atan2_deg(sc, sa);
                }
                let x = target_x - parent.world_x;
                let y = target_y - parent.world_y;
                let d = pa * pd - pb * pc;
                if d.abs() <= 0.0001 {
                    tx = 0.0;
                    ty = 0.0;
                } else {
                    tx = (x * pd - y * pb) / d - bone.ax;
                    ty = (y * pa - x * pc) / d - bone.ay;
                }
            }
        }

        rotation_ik += atan2_deg(ty, tx);
        if bone.ascale_x < 0.0 {
            rotation_ik += 180.0;
        }
        if rotation_ik > 180.0 {
            rotation_ik -= 360.0;
        } else if rotation_ik < -180.0 {
            rotation_ik += 360.0;
        }

        let (mut sx, mut sy) = (bone.ascale_x, bone.ascale_y);
        if compress || stretch {
            if matches!(bone.inherit, Inherit::NoScale | Inherit::NoScaleOrReflection) {
                tx = target_x - bone.world_x;
                ty = target_y - bone.world_y;
            }
            let b = self.data.bones[bone.data].length * sx;
            if b > 0.0001 {
                let dd = tx * tx + ty * ty;
                if (compress && dd < b * b) || (stretch && dd > b * b) {
                    let s = (dd.sqrt() / b - 1.0) * alpha + 1.0;
                    sx *= s;
                    if uniform {
                        sy *= s;
                    }
                }
            }
        }

        let (x, y, rotation) = (bone.ax, bone.ay, bone.arotation + rotation_ik * alpha);
        let (shear_x, shear_y) = (bone.ashear_x, bone.ashear_y);
        self.update_bone_with(bone_index, x, y, rotation, sx, sy, shear_x, shear_y);
    }

    /// Solves a parent/child chain so the child's tip reaches the target. Both bones must
    /// inherit normally; `bend_direction` picks the elbow side.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_ik_two(
        &mut self,
        parent_index: usize,
        child_index: usize,
        target_x: f32,
        target_y: f32,
        bend_direction: i32,
        stretch: bool,
        uniform: bool,
        softness: f32,
        alpha: f32,
    ) {
        let (Some(parent), Some(child)) =
            (self.bones.get(parent_index), self.bones.get(child_index))
        else {
            return;
        };
        if parent.inherit != Inherit::Normal || child.inherit != Inherit::Normal {
            return;
        }
        let Some(pp) = parent.parent.and_then(|p| self.bones.get(p)) else {
            return;
        };
        let bend_dir = if bend_direction < 0 { -1.0 } else { 1.0 };

        let (px, py) = (parent.ax, parent.ay);
        let (mut psx, mut psy) = (parent.ascale_x, parent.ascale_y);
        let (mut sx, mut sy) = (psx, psy);
        let mut csx = child.ascale_x;
        let (os1, mut s2) = if psx < 0.0 {
            psx = -psx;
            (180.0, -1.0)
        } else {
            (0.0, 1.0)
        };
        if psy < 0.0 {
            psy = -psy;
            s2 = -s2;
        }
        let os2 = if csx < 0.0 {
            csx = -csx;
            180.0
        } else {
            0.0
        };

        let cx = child.ax;
        let u = (psx - psy).abs() <= 0.0001;
        let (cy, cwx, cwy) = if !u || stretch {
            (0.0, parent.a * cx + parent.world_x, parent.c * cx + parent.world_y)
        } else {
            let cy = child.ay;
            (
                cy,
                parent.a * cx + parent.b * cy + parent.world_x,
                parent.c * cx + parent.d * cy + parent.world_y,
            )
        };

        let (a, b, c, d) = (pp.a, pp.b, pp.c, pp.d);
        let mut id = a * d - b * c;
        id = if id.abs() <= 0.0001 { 0.0 } else { 1.0 / id };
        let x = cwx - pp.world_x;
        let y = cwy - pp.world_y;
        let dx = (x * d - y * b) * id - px;
        let dy = (y * a - x * c) * id - py;
        let l1 = (dx * dx + dy * dy).sqrt();
        let mut l2 = self.data.bones[child.data].length * csx;

        if l1 < 0.0001 {
            let (csx, csy, cshx, cshy) =
                (child.ascale_x, child.ascale_y, child.ashear_x, child.ashear_y);
            self.apply_ik_one(parent_index, target_x, target_y, false, stretch, false, alpha);
            self.update_bone_with(child_index, cx, cy, 0.0, csx, csy, cshx, cshy);
            return;
        }

        let x = target_x - pp.world_x;
        let y = target_y - pp.world_y;
        let mut tx = (x * d - y * b) * id - px;
        let mut ty = (y * a - x * c) * id - py;
        let mut dd = tx * tx + ty * ty;
        if softness != 0.0 {
            let softness = softness * psx * (csx + 1.0) * 0.5;
            let td = dd.sqrt();
            let sd = td - l1 - l2 * psx + softness;
            if sd > 0.0 {
                let mut p = (sd / (softness * 2.0)).min(1.0) - 1.0;
                p = (sd - softness * (1.0 - p * p)) / td;
                tx -= p * tx;
                ty -= p * ty;
                dd = tx * tx + ty * ty;
            }
        }

        let (a1, a2) = if u {
            l2 *= psx;
            let mut cos = (dd - l1 * l1 - l2 * l2) / (2.0 * l1 * l2);
            let a2 = if cos < -1.0 {
                cos = -1.0;
                PI * bend_dir
            } else if cos > 1.0 {
                cos = 1.0;
                if stretch {
                    let s = (dd.sqrt() / (l1 + l2) - 1.0) * alpha + 1.0;
                    sx *= s;
                    if uniform {
                        sy *= s;
                    }
                }
                0.0
            } else {
                cos.acos() * bend_dir
            };
            let a = l1 + l2 * cos;
            let b = l2 * a2.sin();
            ((ty * a - tx * b).atan2(tx * a + ty * b), a2)
        } else {
            solve_non_uniform(l1, l2, psx, psy, tx, ty, dd, bend_dir)
        };

        let os = cy.atan2(cx) * s2;
        let parent = &self.bones[parent_index];
        let rotation = parent.arotation;
        let mut a1 = (a1 - os) * RAD_DEG + os1 - rotation;
        if a1 > 180.0 {
            a1 -= 360.0;
        } else if a1 < -180.0 {
            a1 += 360.0;
        }
        self.update_bone_with(parent_index, px, py, rotation + a1 * alpha, sx, sy, 0.0, 0.0);

        let child = &self.bones[child_index];
        let rotation = child.arotation;
        let mut a2 = ((a2 + os) * RAD_DEG - child.ashear_x) * s2 + os2 - rotation;
        if a2 > 180.0 {
            a2 -= 360.0;
        } else if a2 < -180.0 {
            a2 += 360.0;
        }
        let (csx, csy, cshx, cshy) =
            (child.ascale_x, child.ascale_y, child.ashear_x, child.ashear_y);
        self.update_bone_with(child_index, cx, cy, rotation + a2 * alpha, csx, csy, cshx, cshy);
    }
}

/// Two-bone solve when the parent is scaled non-uniformly: the child's reach is an ellipse,
/// so intersect it with the target circle, or pick the closest/farthest reachable point.
#[allow(clippy::too_many_arguments)]
fn solve_non_uniform(
    l1: f32,
    l2: f32,
    psx: f32,
    psy: f32,
    tx: f32,
    ty: f32,
    dd: f32,
    bend_dir: f32,
) -> (f32, f32) {
    let a = psx * l2;
    let b = psy * l2;
    let (aa, bb) = (a * a, b * b);
    let ta = ty.atan2(tx);
    let c = bb * l1 * l1 + aa * dd - aa * bb;
    let c1 = -2.0 * bb * l1;
    let c2 = bb - aa;
    let d = c1 * c1 - 4.0 * c2 * c;
    if d >= 0.0 {
        let mut q = d.sqrt();
        if c1 < 0.0 {
            q = -q;
        }
        q = -(c1 + q) * 0.5;
        let (r0, r1) = (q / c2, c / q);
        let r = if r0.abs() < r1.abs() { r0 } else { r1 };
        let r0 = dd - r * r;
        if r0 >= 0.0 {
            let y = r0.sqrt() * bend_dir;
            return (ta - y.atan2(r), (y / psy).atan2((r - l1) / psx));
        }
    }

    let (mut min_angle, mut min_x, mut min_y) = (PI, l1 - a, 0.0_f32);
    let mut min_dist = min_x * min_x;
    let (mut max_angle, mut max_x, mut max_y) = (0.0_f32, l1 + a, 0.0_f32);
    let mut max_dist = max_x * max_x;
    let c = -a * l1 / (aa - bb);
    if (-1.0..=1.0).contains(&c) {
        let c = c.acos();
        let x = a * c.cos() + l1;
        let y = b * c.sin();
        let d = x * x + y * y;
        if d < min_dist {
            min_angle = c;
            min_dist = d;
            min_x = x;
            min_y = y;
        }
        if d > max_dist {
            max_angle = c;
            max_dist = d;
            max_x = x;
            max_y = y;
        }
    }
    if dd <= (min_dist + max_dist) * 0.5 {
        (ta - (min_y * bend_dir).atan2(min_x), min_angle * bend_dir)
    } else {
        (ta - (max_y * bend_dir).atan2(max_x), max_angle * bend_dir)
    }
}
