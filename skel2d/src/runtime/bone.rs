use crate::math::{DEG_RAD, atan2_deg, cos_deg, sin_deg};
use crate::{BoneData, Inherit};
use std::f32::consts::FRAC_PI_2;

/// Skeleton placement applied to root bones. `scale_y` is already negated for y-down
/// skeletons.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RootTransform {
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for RootTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Runtime state of a bone: the local pose written by timelines, the applied pose the
/// world transform was last computed from, and the world affine.
#[derive(Clone, Debug)]
pub struct Bone {
    pub data: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,

    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub shear_x: f32,
    pub shear_y: f32,

    pub ax: f32,
    pub ay: f32,
    pub arotation: f32,
    pub ascale_x: f32,
    pub ascale_y: f32,
    pub ashear_x: f32,
    pub ashear_y: f32,

    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub world_x: f32,
    pub world_y: f32,

    pub inherit: Inherit,
    pub(crate) sorted: bool,
    pub(crate) active: bool,
}

impl Bone {
    pub fn new(data: &BoneData) -> Self {
        let mut bone = Self {
            data: data.index,
            parent: data.parent,
            children: Vec::new(),
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            shear_x: 0.0,
            shear_y: 0.0,
            ax: 0.0,
            ay: 0.0,
            arotation: 0.0,
            ascale_x: 1.0,
            ascale_y: 1.0,
            ashear_x: 0.0,
            ashear_y: 0.0,
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            world_x: 0.0,
            world_y: 0.0,
            inherit: data.inherit,
            sorted: false,
            active: false,
        };
        bone.set_to_setup_pose(data);
        bone
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_to_setup_pose(&mut self, data: &BoneData) {
        self.x = data.x;
        self.y = data.y;
        self.rotation = data.rotation;
        self.scale_x = data.scale_x;
        self.scale_y = data.scale_y;
        self.shear_x = data.shear_x;
        self.shear_y = data.shear_y;
        self.inherit = data.inherit;
    }

    pub(crate) fn copy_local_to_applied(&mut self) {
        self.ax = self.x;
        self.ay = self.y;
        self.arotation = self.rotation;
        self.ascale_x = self.scale_x;
        self.ascale_y = self.scale_y;
        self.ashear_x = self.shear_x;
        self.ashear_y = self.shear_y;
    }

    /// Recomputes the world transform from the applied pose.
    pub fn update_world_transform(&mut self, parent: Option<&Bone>, root: RootTransform) {
        self.update_world_transform_with(
            parent,
            root,
            self.ax,
            self.ay,
            self.arotation,
            self.ascale_x,
            self.ascale_y,
            self.ashear_x,
            self.ashear_y,
        );
    }

    /// Sets the applied pose and computes the world transform from it.
    #[allow(clippy::too_many_arguments)]
    pub fn update_world_transform_with(
        &mut self,
        parent: Option<&Bone>,
        root: RootTransform,
        x: f32,
        y: f32,
        rotation: f32,
        scale_x: f32,
        scale_y: f32,
        shear_x: f32,
        shear_y: f32,
    ) {
        self.ax = x;
        self.ay = y;
        self.arotation = rotation;
        self.ascale_x = scale_x;
        self.ascale_y = scale_y;
        self.ashear_x = shear_x;
        self.ashear_y = shear_y;

        let (sx, sy) = (root.scale_x, root.scale_y);
        let Some(parent) = parent else {
            let rx = (rotation + shear_x) * DEG_RAD;
            let ry = (rotation + 90.0 + shear_y) * DEG_RAD;
            self.a = rx.cos() * scale_x * sx;
            self.b = ry.cos() * scale_y * sx;
            self.c = rx.sin() * scale_x * sy;
            self.d = ry.sin() * scale_y * sy;
            self.world_x = x * sx + root.x;
            self.world_y = y * sy + root.y;
            return;
        };

        let (mut pa, mut pb, mut pc, mut pd) = (parent.a, parent.b, parent.c, parent.d);
        self.world_x = pa * x + pb * y + parent.world_x;
        self.world_y = pc * x + pd * y + parent.world_y;

        match self.inherit {
            Inherit::Normal => {
                let rx = (rotation + shear_x) * DEG_RAD;
                let ry = (rotation + 90.0 + shear_y) * DEG_RAD;
                let la = rx.cos() * scale_x;
                let lb = ry.cos() * scale_y;
                let lc = rx.sin() * scale_x;
                let ld = ry.sin() * scale_y;
                self.a = pa * la + pb * lc;
                self.b = pa * lb + pb * ld;
                self.c = pc * la + pd * lc;
                self.d = pc * lb + pd * ld;
                return;
            }
            Inherit::OnlyTranslation => {
                let rx = (rotation + shear_x) * DEG_RAD;
                let ry = (rotation + 90.0 + shear_y) * DEG_RAD;
                self.a = rx.cos() * scale_x;
                self.b = ry.cos() * scale_y;
                self.c = rx.sin() * scale_x;
                self.d = ry.sin() * scale_y;
            }
            Inherit::NoRotationOrReflection => {
                let isx = 1.0 / sx;
                let isy = 1.0 / sy;
                pa *= isx;
                pc *= isy;
                let mut s = pa * pa + pc * pc;
                let prx;
                if s > 0.0001 {
                    s = (pa * pd * isy - pb * isx * pc).abs() / s;
                    pb = pc * s;
                    pd = pa * s;
                    prx = atan2_deg(pc, pa);
                } else {
                    pa = 0.0;
                    pc = 0.0;
                    prx = 90.0 - atan2_deg(pd, pb);
                }
                let rx = (rotation + shear_x - prx) * DEG_RAD;
                let ry = (rotation + shear_y - prx + 90.0) * DEG_RAD;
                let la = rx.cos() * scale_x;
                let lb = ry.cos() * scale_y;
                let lc = rx.sin() * scale_x;
                let ld = ry.sin() * scale_y;
                self.a = pa * la - pb * lc;
                self.b = pa * lb - pb * ld;
                self.c = pc * la + pd * lc;
                self.d = pc * lb + pd * ld;
            }
            Inherit::NoScale | Inherit::NoScaleOrReflection => {
                let (sin, cos) = (rotation * DEG_RAD).sin_cos();
                let mut za = (pa * cos + pb * sin) / sx;
                let mut zc = (pc * cos + pd * sin) / sy;
                let mut s = (za * za + zc * zc).sqrt();
                if s > 0.00001 {
                    s = 1.0 / s;
                }
                za *= s;
                zc *= s;
                s = (za * za + zc * zc).sqrt();
                if self.inherit == Inherit::NoScale
                    && ((pa * pd - pb * pc < 0.0) != ((sx < 0.0) != (sy < 0.0)))
                {
                    s = -s;
                }
                let r = FRAC_PI_2 + zc.atan2(za);
                let zb = r.cos() * s;
                let zd = r.sin() * s;
                let shx = shear_x * DEG_RAD;
                let shy = (90.0 + shear_y) * DEG_RAD;
                let la = shx.cos() * scale_x;
                let lb = shy.cos() * scale_y;
                let lc = shx.sin() * scale_x;
                let ld = shy.sin() * scale_y;
                self.a = za * la + zb * lc;
                self.b = za * lb + zb * ld;
                self.c = zc * la + zd * lc;
                self.d = zc * lb + zd * ld;
            }
        }
        self.a *= sx;
        self.b *= sx;
        self.c *= sy;
        self.d *= sy;
    }

    /// Derives the applied pose from the current world transform. Used after a constraint
    /// edits the world transform directly so later local edits start from what is shown.
    pub fn update_applied_transform(&mut self, parent: Option<&Bone>, root: RootTransform) {
        let Some(parent) = parent else {
            self.ax = self.world_x - root.x;
            self.ay = self.world_y - root.y;
            self.arotation = atan2_deg(self.c, self.a);
            self.ascale_x = (self.a * self.a + self.c * self.c).sqrt();
            self.ascale_y = (self.b * self.b + self.d * self.d).sqrt();
            self.ashear_x = 0.0;
            self.ashear_y = atan2_deg(
                self.a * self.b + self.c * self.d,
                self.a * self.d - self.b * self.c,
            );
            return;
        };

        let (mut pa, mut pb, mut pc, mut pd) = (parent.a, parent.b, parent.c, parent.d);
        let mut pid = 1.0 / (pa * pd - pb * pc);
        let (mut ia, mut ib, mut ic, mut id) = (pd * pid, pb * pid, pc * pid, pa * pid);
        let dx = self.world_x - parent.world_x;
        let dy = self.world_y - parent.world_y;
        self.ax = dx * ia - dy * ib;
        self.ay = dy * id - dx * ic;

        let (ra, rb, rc, rd);
        if self.inherit == Inherit::OnlyTranslation {
            ra = self.a;
            rb = self.b;
            rc = self.c;
            rd = self.d;
        } else {
            let (sx, sy) = (root.scale_x, root.scale_y);
            match self.inherit {
                Inherit::NoRotationOrReflection => {
                    let s = (pa * pd - pb * pc).abs() / (pa * pa + pc * pc);
                    let sa = pa / sx;
                    let sc = pc / sy;
                    pb = -sc * s * sx;
                    pd = sa * s * sy;
                    pid = 1.0 / (pa * pd - pb * pc);
                    ia = pd * pid;
                    ib = pb * pid;
                }
                Inherit::NoScale | Inherit::NoScaleOrReflection => {
                    let (sin, cos) = (self.rotation * DEG_RAD).sin_cos();
                    pa = (pa * cos + pb * sin) / sx;
                    pc = (pc * cos + pd * sin) / sy;
                    let mut s = (pa * pa + pc * pc).sqrt();
                    if s > 0.00001 {
                        s = 1.0 / s;
                    }
                    pa *= s;
                    pc *= s;
                    s = (pa * pa + pc * pc).sqrt();
                    if self.inherit == Inherit::NoScale
                        && ((pid < 0.0) != ((sx < 0.0) != (sy < 0.0)))
                    {
                        s = -s;
                    }
                    let r = FRAC_PI_2 + pc.atan2(pa);
                    pb = r.cos() * s;
                    pd = r.sin() * s;
                    pid = 1.0 / (pa * pd - pb * pc);
                    ia = pd * pid;
                    ib = pb * pid;
                    ic = pc * pid;
                    id = pa * pid;
                }
                Inherit::Normal | Inherit::OnlyTranslation => {}
            }
            ra = ia * self.a - ib * self.c;
            rb = ia * self.b - ib * self.d;
            rc = id * self.c - ic * self.a;
            rd = id * self.d - ic * self.b;
        }

        self.ashear_x = 0.0;
        self.ascale_x = (ra * ra + rc * rc).sqrt();
        if self.ascale_x > 0.0001 {
            let det = ra * rd - rb * rc;
            self.ascale_y = det / self.ascale_x;
            self.ashear_y = -atan2_deg(ra * rb + rc * rd, det);
            self.arotation = atan2_deg(rc, ra);
        } else {
            self.ascale_x = 0.0;
            self.ascale_y = (rb * rb + rd * rd).sqrt();
            self.ashear_y = 0.0;
            self.arotation = 90.0 - atan2_deg(rd, rb);
        }
    }

    /// Makes the local pose match the applied pose.
    pub fn apply_to_local(&mut self) {
        self.x = self.ax;
        self.y = self.ay;
        self.rotation = self.arotation;
        self.scale_x = self.ascale_x;
        self.scale_y = self.ascale_y;
        self.shear_x = self.ashear_x;
        self.shear_y = self.ashear_y;
    }

    pub fn world_rotation_x(&self) -> f32 {
        atan2_deg(self.c, self.a)
    }

    pub fn world_rotation_y(&self) -> f32 {
        atan2_deg(self.d, self.b)
    }

    pub fn world_scale_x(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }

    pub fn world_scale_y(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }

    pub fn world_to_local(&self, world_x: f32, world_y: f32) -> (f32, f32) {
        let inv_det = 1.0 / (self.a * self.d - self.b * self.c);
        let x = world_x - self.world_x;
        let y = world_y - self.world_y;
        (
            x * self.d * inv_det - y * self.b * inv_det,
            y * self.a * inv_det - x * self.c * inv_det,
        )
    }

    pub fn local_to_world(&self, local_x: f32, local_y: f32) -> (f32, f32) {
        (
            local_x * self.a + local_y * self.b + self.world_x,
            local_x * self.c + local_y * self.d + self.world_y,
        )
    }

    pub fn world_to_local_rotation(&self, world_rotation: f32) -> f32 {
        let (sin, cos) = (sin_deg(world_rotation), cos_deg(world_rotation));
        atan2_deg(self.a * sin - self.c * cos, self.d * cos - self.b * sin) + self.rotation
            - self.shear_x
    }

    pub fn local_to_world_rotation(&self, local_rotation: f32) -> f32 {
        let local_rotation = local_rotation - (self.rotation - self.shear_x);
        let (sin, cos) = (sin_deg(local_rotation), cos_deg(local_rotation));
        atan2_deg(
            cos * self.c + sin * self.d,
            cos * self.a + sin * self.b,
        )
    }

    /// Rotates the world transform. The applied pose is stale afterwards until
    /// [`Bone::update_applied_transform`] runs.
    pub fn rotate_world(&mut self, degrees: f32) {
        let (sin, cos) = (degrees * DEG_RAD).sin_cos();
        let (ra, rb) = (self.a, self.b);
        self.a = cos * ra - sin * self.c;
        self.b = cos * rb - sin * self.d;
        self.c = sin * ra + cos * self.c;
        self.d = sin * rb + cos * self.d;
    }

    #[cfg(feature = "glam")]
    pub fn world_affine(&self) -> glam::Affine2 {
        glam::Affine2::from_cols_array(&[
            self.a,
            self.c,
            self.b,
            self.d,
            self.world_x,
            self.world_y,
        ])
    }

    #[cfg(feature = "glam")]
    pub fn world_position(&self) -> glam::Vec2 {
        glam::Vec2::new(self.world_x, self.world_y)
    }
}

/// Splits a bone from its parent so one can be mutated while reading the other.
/// Parents always precede children.
pub(crate) fn bone_and_parent(bones: &mut [Bone], index: usize) -> (&mut Bone, Option<&Bone>) {
    let (head, tail) = bones.split_at_mut(index);
    let bone = &mut tail[0];
    let parent = bone.parent.and_then(|p| head.get(p));
    (bone, parent)
}
