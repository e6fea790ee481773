use crate::math::{DEG_RAD, PI2, clamp};
use crate::{Physics, PhysicsConstraintData, Skeleton};
use std::sync::Arc;

/// Spring simulation driving one bone. Offsets and velocities persist across frames; the
/// remaining fields are animatable copies of the setup data.
#[derive(Clone, Debug)]
pub struct PhysicsConstraint {
    pub data: usize,
    pub bone: usize,
    pub inertia: f32,
    pub strength: f32,
    pub damping: f32,
    pub mass_inverse: f32,
    pub wind: f32,
    pub gravity: f32,
    pub mix: f32,
    pub(crate) active: bool,

    needs_reset: bool,
    ux: f32,
    uy: f32,
    cx: f32,
    cy: f32,
    tx: f32,
    ty: f32,
    x_offset: f32,
    x_velocity: f32,
    y_offset: f32,
    y_velocity: f32,
    rotate_offset: f32,
    rotate_velocity: f32,
    scale_offset: f32,
    scale_velocity: f32,
    remaining: f32,
    last_time: f32,
}

impl PhysicsConstraint {
    pub fn new(index: usize, data: &PhysicsConstraintData) -> Self {
        Self {
            data: index,
            bone: data.bone,
            inertia: data.inertia,
            strength: data.strength,
            damping: data.damping,
            mass_inverse: data.mass_inverse,
            wind: data.wind,
            gravity: data.gravity,
            mix: data.mix,
            active: false,
            needs_reset: true,
            ux: 0.0,
            uy: 0.0,
            cx: 0.0,
            cy: 0.0,
            tx: 0.0,
            ty: 0.0,
            x_offset: 0.0,
            x_velocity: 0.0,
            y_offset: 0.0,
            y_velocity: 0.0,
            rotate_offset: 0.0,
            rotate_velocity: 0.0,
            scale_offset: 0.0,
            scale_velocity: 0.0,
            remaining: 0.0,
            last_time: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_to_setup_pose(&mut self, data: &PhysicsConstraintData) {
        self.inertia = data.inertia;
        self.strength = data.strength;
        self.damping = data.damping;
        self.mass_inverse = data.mass_inverse;
        self.wind = data.wind;
        self.gravity = data.gravity;
        self.mix = data.mix;
    }

    /// Clears all spring motion. The next update captures the bone's pose as the rest pose.
    pub fn reset(&mut self, time: f32) {
        self.remaining = 0.0;
        self.last_time = time;
        self.needs_reset = true;
        self.x_offset = 0.0;
        self.x_velocity = 0.0;
        self.y_offset = 0.0;
        self.y_velocity = 0.0;
        self.rotate_offset = 0.0;
        self.rotate_velocity = 0.0;
        self.scale_offset = 0.0;
        self.scale_velocity = 0.0;
    }

    /// Shifts the remembered positions so the next update sees an extra move of (`x`, `y`).
    pub fn translate(&mut self, x: f32, y: f32) {
        self.ux -= x;
        self.uy -= y;
        self.cx -= x;
        self.cy -= y;
    }

    /// Rotates the remembered position about (`x`, `y`).
    pub fn rotate(&mut self, x: f32, y: f32, degrees: f32) {
        let (sin, cos) = (degrees * DEG_RAD).sin_cos();
        let dx = self.cx - x;
        let dy = self.cy - y;
        self.translate(dx * cos - dy * sin - dx, dx * sin + dy * cos - dy);
    }

    /// Offset of the simulated bone position from the animated one, before mixing.
    pub fn offset(&self) -> (f32, f32) {
        (self.x_offset, self.y_offset)
    }
}

impl Skeleton {
    pub(crate) fn update_physics_constraint(&mut self, index: usize, physics: Physics) {
        let Some(constraint) = self.physics_constraints.get(index) else {
            return;
        };
        let mix = constraint.mix;
        if mix == 0.0 || physics == Physics::None {
            return;
        }
        let skeleton_data = Arc::clone(&self.data);
        let data = &skeleton_data.physics_constraints[constraint.data];
        let bone_index = constraint.bone;
        if bone_index >= self.bones.len() {
            return;
        }
        let root = self.root_transform();
        let (time, y_down) = (self.time, self.y_down());
        let reference_scale = skeleton_data.reference_scale;
        let length = skeleton_data.bones[self.bones[bone_index].data].length;

        let x = data.x > 0.0;
        let y = data.y > 0.0;
        let rotate_or_shear_x = data.rotate > 0.0 || data.shear_x > 0.0;
        let scale_x = data.scale_x > 0.0;

        let c = &mut self.physics_constraints[index];
        let bone = &mut self.bones[bone_index];

        match physics {
            Physics::None => return,
            Physics::Reset | Physics::Update => {
                if physics == Physics::Reset {
                    c.reset(time);
                }
                let delta = (time - c.last_time).max(0.0);
                c.remaining += delta;
                c.last_time = time;

                let (bx, by) = (bone.world_x, bone.world_y);
                if c.needs_reset {
                    c.needs_reset = false;
                    c.ux = bx;
                    c.uy = by;
                } else {
                    let mut a = c.remaining;
                    let i = c.inertia;
                    let t = data.step;
                    let mut d = None;
                    let qx = data.limit * delta * root.scale_x.abs();
                    let qy = data.limit * delta * root.scale_y.abs();
                    if x || y {
                        if x {
                            c.x_offset += clamp((c.ux - bx) * i, -qx, qx);
                            c.ux = bx;
                        }
                        if y {
                            c.y_offset += clamp((c.uy - by) * i, -qy, qy);
                            c.uy = by;
                        }
                        if a >= t {
                            let damping = c.damping.powf(60.0 * t);
                            d = Some(damping);
                            let m = c.mass_inverse * t;
                            let e = c.strength;
                            let w = c.wind * reference_scale * root.scale_x;
                            let g = c.gravity * reference_scale * root.scale_y;
                            while a >= t {
                                if x {
                                    c.x_velocity += (w - c.x_offset * e) * m;
                                    c.x_offset += c.x_velocity * t;
                                    c.x_velocity *= damping;
                                }
                                if y {
                                    c.y_velocity -= (g + c.y_offset * e) * m;
                                    c.y_offset += c.y_velocity * t;
                                    c.y_velocity *= damping;
                                }
                                a -= t;
                            }
                        }
                        if x {
                            bone.world_x += c.x_offset * mix * data.x;
                        }
                        if y {
                            bone.world_y += c.y_offset * mix * data.y;
                        }
                    }

                    if rotate_or_shear_x || scale_x {
                        let ca = bone.c.atan2(bone.a);
                        let (mut sin, mut cos): (f32, f32);
                        let mut mr = 0.0;
                        let dx = clamp(c.cx - bone.world_x, -qx, qx);
                        let dy = clamp(c.cy - bone.world_y, -qy, qy);
                        if rotate_or_shear_x {
                            mr = (data.rotate + data.shear_x) * mix;
                            let r = (dy + c.ty).atan2(dx + c.tx) - ca - c.rotate_offset * mr;
                            c.rotate_offset += (r - (r / PI2 - 0.5).ceil() * PI2) * i;
                            let r = c.rotate_offset * mr + ca;
                            (sin, cos) = r.sin_cos();
                            if scale_x {
                                let r = length * bone.world_scale_x();
                                if r > 0.0 {
                                    c.scale_offset += (dx * cos + dy * sin) * i / r;
                                }
                            }
                        } else {
                            (sin, cos) = ca.sin_cos();
                            let r = length * bone.world_scale_x();
                            if r > 0.0 {
                                c.scale_offset += (dx * cos + dy * sin) * i / r;
                            }
                        }

                        a = c.remaining;
                        if a >= t {
                            let damping = d.unwrap_or_else(|| c.damping.powf(60.0 * t));
                            let m = c.mass_inverse * t;
                            let e = c.strength;
                            let w = c.wind;
                            let g = if y_down { -c.gravity } else { c.gravity };
                            let h = length / reference_scale;
                            loop {
                                a -= t;
                                if scale_x {
                                    c.scale_velocity +=
                                        (w * cos - g * sin - c.scale_offset * e) * m;
                                    c.scale_offset += c.scale_velocity * t;
                                    c.scale_velocity *= damping;
                                }
                                if rotate_or_shear_x {
                                    c.rotate_velocity -=
                                        ((w * sin + g * cos) * h + c.rotate_offset * e) * m;
                                    c.rotate_offset += c.rotate_velocity * t;
                                    c.rotate_velocity *= damping;
                                    if a < t {
                                        break;
                                    }
                                    let r = c.rotate_offset * mr + ca;
                                    (sin, cos) = r.sin_cos();
                                } else if a < t {
                                    break;
                                }
                            }
                        }
                    }
                    c.remaining = a;
                }
                c.cx = bone.world_x;
                c.cy = bone.world_y;
            }
            Physics::Pose => {
                if x {
                    bone.world_x += c.x_offset * mix * data.x;
                }
                if y {
                    bone.world_y += c.y_offset * mix * data.y;
                }
            }
        }

        if rotate_or_shear_x {
            let mut o = c.rotate_offset * mix;
            if data.shear_x > 0.0 {
                let mut r = 0.0;
                if data.rotate > 0.0 {
                    r = o * data.rotate;
                    let (s, co) = r.sin_cos();
                    let a = bone.b;
                    bone.b = co * a - s * bone.d;
                    bone.d = s * a + co * bone.d;
                }
                r += o * data.shear_x;
                let (s, co) = r.sin_cos();
                let a = bone.a;
                bone.a = co * a - s * bone.c;
                bone.c = s * a + co * bone.c;
            } else {
                o *= data.rotate;
                let (s, co) = o.sin_cos();
                let a = bone.a;
                bone.a = co * a - s * bone.c;
                bone.c = s * a + co * bone.c;
                let a = bone.b;
                bone.b = co * a - s * bone.d;
                bone.d = s * a + co * bone.d;
            }
        }
        if scale_x {
            let s = 1.0 + c.scale_offset * mix * data.scale_x;
            bone.a *= s;
            bone.c *= s;
        }
        if physics != Physics::Pose {
            c.tx = length * bone.a;
            c.ty = length * bone.c;
        }
        self.update_bone_applied(bone_index);
    }
}
