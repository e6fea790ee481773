use crate::math::{DEG_RAD, wrap_degrees, wrap_radians};
use crate::{Skeleton, TransformConstraintData};
use std::f32::consts::FRAC_PI_2;

#[derive(Clone, Debug)]
pub struct TransformConstraint {
    pub data: usize,
    pub bones: Vec<usize>,
    pub target: usize,
    pub mix_rotate: f32,
    pub mix_x: f32,
    pub mix_y: f32,
    pub mix_scale_x: f32,
    pub mix_scale_y: f32,
    pub mix_shear_y: f32,
    pub(crate) active: bool,
}

impl TransformConstraint {
    pub fn new(index: usize, data: &TransformConstraintData) -> Self {
        Self {
            data: index,
            bones: data.bones.clone(),
            target: data.target,
            mix_rotate: data.mix_rotate,
            mix_x: data.mix_x,
            mix_y: data.mix_y,
            mix_scale_x: data.mix_scale_x,
            mix_scale_y: data.mix_scale_y,
            mix_shear_y: data.mix_shear_y,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_to_setup_pose(&mut self, data: &TransformConstraintData) {
        self.mix_rotate = data.mix_rotate;
        self.mix_x = data.mix_x;
        self.mix_y = data.mix_y;
        self.mix_scale_x = data.mix_scale_x;
        self.mix_scale_y = data.mix_scale_y;
        self.mix_shear_y = data.mix_shear_y;
    }

    fn mixes(&self) -> Mixes {
        Mixes {
            rotate: self.mix_rotate,
            x: self.mix_x,
            y: self.mix_y,
            scale_x: self.mix_scale_x,
            scale_y: self.mix_scale_y,
            shear_y: self.mix_shear_y,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Mixes {
    rotate: f32,
    x: f32,
    y: f32,
    scale_x: f32,
    scale_y: f32,
    shear_y: f32,
}

impl Mixes {
    fn is_zero(&self) -> bool {
        self.rotate == 0.0
            && self.x == 0.0
            && self.y == 0.0
            && self.scale_x == 0.0
            && self.scale_y == 0.0
            && self.shear_y == 0.0
    }
}

impl Skeleton {
    pub(crate) fn update_transform_constraint(&mut self, index: usize) {
        let Some(constraint) = self.transform_constraints.get(index) else {
            return;
        };
        let mixes = constraint.mixes();
        if mixes.is_zero() {
            return;
        }
        let data = std::sync::Arc::clone(&self.data);
        let constraint_data = &data.transform_constraints[constraint.data];
        let bones = constraint.bones.clone();
        let target = constraint.target;
        if target >= self.bones.len() {
            return;
        }

        match (constraint_data.local, constraint_data.relative) {
            (true, true) => self.apply_relative_local(constraint_data, mixes, target, &bones),
            (true, false) => self.apply_absolute_local(constraint_data, mixes, target, &bones),
            (false, true) => self.apply_relative_world(constraint_data, mixes, target, &bones),
            (false, false) => self.apply_absolute_world(constraint_data, mixes, target, &bones),
        }
    }

    fn apply_absolute_world(
        &mut self,
        data: &TransformConstraintData,
        mix: Mixes,
        target: usize,
        bones: &[usize],
    ) {
        let translate = mix.x != 0.0 || mix.y != 0.0;
        let t = &self.bones[target];
        let (ta, tb, tc, td) = (t.a, t.b, t.c, t.d);
        let deg_rad_reflect = if ta * td - tb * tc > 0.0 {
            DEG_RAD
        } else {
            -DEG_RAD
        };
        let offset_rotation = data.offset_rotation * deg_rad_reflect;
        let offset_shear_y = data.offset_shear_y * deg_rad_reflect;
        let (offset_x, offset_y) = t.local_to_world(data.offset_x, data.offset_y);
        let target_scale_x = (ta * ta + tc * tc).sqrt();
        let target_scale_y = (tb * tb + td * td).sqrt();

        for &index in bones {
            let Some(bone) = self.bones.get_mut(index) else {
                continue;
            };
            if mix.rotate != 0.0 {
                let (a, b, c, d) = (bone.a, bone.b, bone.c, bone.d);
                let r = wrap_radians(tc.atan2(ta) - c.atan2(a) + offset_rotation) * mix.rotate;
                let (sin, cos) = r.sin_cos();
                bone.a = cos * a - sin * c;
                bone.b = cos * b - sin * d;
                bone.c = sin * a + cos * c;
                bone.d = sin * b + cos * d;
            }
            if translate {
                bone.world_x += (offset_x - bone.world_x) * mix.x;
                bone.world_y += (offset_y - bone.world_y) * mix.y;
            }
            if mix.scale_x != 0.0 {
                let mut s = (bone.a * bone.a + bone.c * bone.c).sqrt();
                if s != 0.0 {
                    s = (s + (target_scale_x - s + data.offset_scale_x) * mix.scale_x) / s;
                }
                bone.a *= s;
                bone.c *= s;
            }
            if mix.scale_y != 0.0 {
                let mut s = (bone.b * bone.b + bone.d * bone.d).sqrt();
                if s != 0.0 {
                    s = (s + (target_scale_y - s + data.offset_scale_y) * mix.scale_y) / s;
                }
                bone.b *= s;
                bone.d *= s;
            }
            if mix.shear_y > 0.0 {
                let (b, d) = (bone.b, bone.d);
                let by = d.atan2(b);
                let r = wrap_radians(td.atan2(tb) - tc.atan2(ta) - (by - bone.c.atan2(bone.a)));
                let r = by + (r + offset_shear_y) * mix.shear_y;
                let s = (b * b + d * d).sqrt();
                bone.b = r.cos() * s;
                bone.d = r.sin() * s;
            }
            self.update_bone_applied(index);
        }
    }

    fn apply_relative_world(
        &mut self,
        data: &TransformConstraintData,
        mix: Mixes,
        target: usize,
        bones: &[usize],
    ) {
        let translate = mix.x != 0.0 || mix.y != 0.0;
        let t = &self.bones[target];
        let (ta, tb, tc, td) = (t.a, t.b, t.c, t.d);
        let deg_rad_reflect = if ta * td - tb * tc > 0.0 {
            DEG_RAD
        } else {
            -DEG_RAD
        };
        let offset_rotation = data.offset_rotation * deg_rad_reflect;
        let offset_shear_y = data.offset_shear_y * deg_rad_reflect;
        let (offset_x, offset_y) = t.local_to_world(data.offset_x, data.offset_y);
        let target_scale_x = (ta * ta + tc * tc).sqrt();
        let target_scale_y = (tb * tb + td * td).sqrt();

        for &index in bones {
            let Some(bone) = self.bones.get_mut(index) else {
                continue;
            };
            if mix.rotate != 0.0 {
                let (a, b, c, d) = (bone.a, bone.b, bone.c, bone.d);
                let r = wrap_radians(tc.atan2(ta) + offset_rotation) * mix.rotate;
                let (sin, cos) = r.sin_cos();
                bone.a = cos * a - sin * c;
                bone.b = cos * b - sin * d;
                bone.c = sin * a + cos * c;
                bone.d = sin * b + cos * d;
            }
            if translate {
                bone.world_x += offset_x * mix.x;
                bone.world_y += offset_y * mix.y;
            }
            if mix.scale_x != 0.0 {
                let s = (target_scale_x - 1.0 + data.offset_scale_x) * mix.scale_x + 1.0;
                bone.a *= s;
                bone.c *= s;
            }
            if mix.scale_y != 0.0 {
                let s = (target_scale_y - 1.0 + data.offset_scale_y) * mix.scale_y + 1.0;
                bone.b *= s;
                bone.d *= s;
            }
            if mix.shear_y > 0.0 {
                let r = wrap_radians(td.atan2(tb) - tc.atan2(ta));
                let (b, d) = (bone.b, bone.d);
                let r = d.atan2(b) + (r - FRAC_PI_2 + offset_shear_y) * mix.shear_y;
                let s = (b * b + d * d).sqrt();
                bone.b = r.cos() * s;
                bone.d = r.sin() * s;
            }
            self.update_bone_applied(index);
        }
    }

    fn apply_absolute_local(
        &mut self,
        data: &TransformConstraintData,
        mix: Mixes,
        target: usize,
        bones: &[usize],
    ) {
        let t = self.bones[target].clone();
        for &index in bones {
            let Some(bone) = self.bones.get(index) else {
                continue;
            };
            let mut rotation = bone.arotation;
            if mix.rotate != 0.0 {
                let r = wrap_degrees(t.arotation - rotation + data.offset_rotation);
                rotation += r * mix.rotate;
            }
            let x = bone.ax + (t.ax - bone.ax + data.offset_x) * mix.x;
            let y = bone.ay + (t.ay - bone.ay + data.offset_y) * mix.y;
            let mut scale_x = bone.ascale_x;
            if mix.scale_x != 0.0 && scale_x != 0.0 {
                scale_x += (t.ascale_x - scale_x + data.offset_scale_x) * mix.scale_x;
            }
            let mut scale_y = bone.ascale_y;
            if mix.scale_y != 0.0 && scale_y != 0.0 {
                scale_y += (t.ascale_y - scale_y + data.offset_scale_y) * mix.scale_y;
            }
            let mut shear_y = bone.ashear_y;
            if mix.shear_y != 0.0 {
                let r = wrap_degrees(t.ashear_y - shear_y + data.offset_shear_y);
                shear_y += r * mix.shear_y;
            }
            let shear_x = bone.ashear_x;
            self.update_bone_with(index, x, y, rotation, scale_x, scale_y, shear_x, shear_y);
        }
    }

    fn apply_relative_local(
        &mut self,
        data: &TransformConstraintData,
        mix: Mixes,
        target: usize,
        bones: &[usize],
    ) {
        let t = self.bones[target].clone();
        for &index in bones {
            let Some(bone) = self.bones.get(index) else {
                continue;
            };
            let rotation = bone.arotation + (t.arotation + data.offset_rotation) * mix.rotate;
            let x = bone.ax + (t.ax + data.offset_x) * mix.x;
            let y = bone.ay + (t.ay + data.offset_y) * mix.y;
            let scale_x =
                bone.ascale_x * ((t.ascale_x - 1.0 + data.offset_scale_x) * mix.scale_x + 1.0);
            let scale_y =
                bone.ascale_y * ((t.ascale_y - 1.0 + data.offset_scale_y) * mix.scale_y + 1.0);
            let shear_y = bone.ashear_y + (t.ashear_y + data.offset_shear_y) * mix.shear_y;
            let shear_x = bone.ashear_x;
            self.update_bone_with(index, x, y, rotation, scale_x, scale_y, shear_x, shear_y);
        }
    }
}
