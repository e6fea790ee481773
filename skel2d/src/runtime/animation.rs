use crate::math::signum;
use crate::{
    Animation, AttachmentTimeline, Bone, BoneData, BoneTimeline, Color, ConstraintTimeline,
    CurveFrames, DeformTimeline, DrawOrderTimeline, Event, EventTimeline, InheritTimeline,
    PhysicsConstraint, PhysicsConstraintData, PhysicsConstraintResetTimeline,
    PhysicsConstraintTimeline, PhysicsProperty, SequenceMode, SequenceTimeline, Skeleton, Slot,
    SlotData, SlotTimeline, Timeline,
};
use std::sync::Arc;

/// How a timeline value combines with the current pose.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum MixBlend {
    /// The setup value is used as the base, ignoring the current value.
    Setup,
    /// Like `Replace`, but the setup value is restored before the first key.
    First,
    /// The current value is mixed toward the timeline value.
    #[default]
    Replace,
    /// The timeline value is added to the current value.
    Add,
}

/// Whether a timeline is mixing in (the "to" animation) or out (the "from" animation).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MixDirection {
    In,
    Out,
}

pub(crate) const ANIMATION_STATE_SETUP: i32 = 1;
pub(crate) const ANIMATION_STATE_CURRENT: i32 = 2;

impl Animation {
    /// Applies every timeline. Looping wraps both times into the animation duration, which is
    /// how events are fired across the loop boundary.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        skeleton: &mut Skeleton,
        mut last_time: f32,
        mut time: f32,
        looped: bool,
        mut events: Option<&mut Vec<Event>>,
        alpha: f32,
        blend: MixBlend,
        direction: MixDirection,
    ) {
        if looped && self.duration != 0.0 {
            time %= self.duration;
            if last_time > 0.0 {
                last_time %= self.duration;
            }
        }
        for timeline in &self.timelines {
            timeline.apply(
                skeleton,
                last_time,
                time,
                events.as_deref_mut(),
                alpha,
                blend,
                direction,
            );
        }
    }
}

impl Timeline {
    /// Writes this timeline's value at `time` into `skeleton`. `last_time` bounds the window
    /// for event and reset keys.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        skeleton: &mut Skeleton,
        last_time: f32,
        time: f32,
        events: Option<&mut Vec<Event>>,
        alpha: f32,
        blend: MixBlend,
        direction: MixDirection,
    ) {
        match self {
            Self::Rotate(t) => {
                apply_bone_value(t, skeleton, time, alpha, blend, |b| &mut b.rotation, |d| {
                    d.rotation
                })
            }
            Self::TranslateX(t) => {
                apply_bone_value(t, skeleton, time, alpha, blend, |b| &mut b.x, |d| d.x)
            }
            Self::TranslateY(t) => {
                apply_bone_value(t, skeleton, time, alpha, blend, |b| &mut b.y, |d| d.y)
            }
            Self::ShearX(t) => {
                apply_bone_value(t, skeleton, time, alpha, blend, |b| &mut b.shear_x, |d| {
                    d.shear_x
                })
            }
            Self::ShearY(t) => {
                apply_bone_value(t, skeleton, time, alpha, blend, |b| &mut b.shear_y, |d| {
                    d.shear_y
                })
            }
            Self::Translate(t) => apply_translate(t, skeleton, time, alpha, blend),
            Self::Shear(t) => apply_shear(t, skeleton, time, alpha, blend),
            Self::Scale(t) => apply_scale(t, skeleton, time, alpha, blend, direction),
            Self::ScaleX(t) => {
                apply_scale_axis(t, skeleton, time, alpha, blend, direction, Axis::X)
            }
            Self::ScaleY(t) => {
                apply_scale_axis(t, skeleton, time, alpha, blend, direction, Axis::Y)
            }
            Self::Inherit(t) => apply_inherit(t, skeleton, time, blend, direction),
            Self::Rgba(t) => apply_rgba(t, skeleton, time, alpha, blend),
            Self::Rgb(t) => apply_rgb(t, skeleton, time, alpha, blend),
            Self::Alpha(t) => apply_alpha(t, skeleton, time, alpha, blend),
            Self::Rgba2(t) => apply_rgba2(t, skeleton, time, alpha, blend),
            Self::Rgb2(t) => apply_rgb2(t, skeleton, time, alpha, blend),
            Self::Attachment(t) => apply_attachment(t, skeleton, time, blend, direction),
            Self::Deform(t) => apply_deform(t, skeleton, time, alpha, blend),
            Self::Sequence(t) => apply_sequence(t, skeleton, time, blend, direction),
            Self::Event(t) => {
                if let Some(events) = events {
                    apply_event(t, last_time, time, events);
                }
            }
            Self::DrawOrder(t) => apply_draw_order(t, skeleton, time, blend, direction),
            Self::IkConstraint(t) => {
                apply_ik_constraint(t, skeleton, time, alpha, blend, direction)
            }
            Self::TransformConstraint(t) => {
                apply_transform_constraint(t, skeleton, time, alpha, blend)
            }
            Self::PathConstraintPosition(t) => {
                apply_path_position(t, skeleton, time, alpha, blend)
            }
            Self::PathConstraintSpacing(t) => {
                apply_path_spacing(t, skeleton, time, alpha, blend)
            }
            Self::PathConstraintMix(t) => apply_path_mix(t, skeleton, time, alpha, blend),
            Self::PhysicsConstraint(t) => apply_physics(t, skeleton, time, alpha, blend),
            Self::PhysicsConstraintReset(t) => {
                apply_physics_reset(t, skeleton, last_time, time)
            }
        }
    }
}

impl CurveFrames {
    /// Value for properties keyed relative to the setup pose (rotation, translation, shear).
    pub fn relative_value(
        &self,
        time: f32,
        alpha: f32,
        blend: MixBlend,
        current: f32,
        setup: f32,
    ) -> f32 {
        if self.is_empty() || time < self.time(0) {
            return before_first_key(alpha, blend, current, setup);
        }
        mix_relative(self.curve_value(time, 0), alpha, blend, current, setup)
    }

    /// Value for properties keyed as absolute values (constraint position, spacing, physics).
    pub fn absolute_value(
        &self,
        time: f32,
        alpha: f32,
        blend: MixBlend,
        current: f32,
        setup: f32,
    ) -> f32 {
        if self.is_empty() || time < self.time(0) {
            return before_first_key(alpha, blend, current, setup);
        }
        mix_absolute(self.curve_value(time, 0), alpha, blend, current, setup)
    }

    /// Like [`CurveFrames::absolute_value`] for a value the caller already sampled.
    #[allow(clippy::too_many_arguments)]
    pub fn absolute_value_with(
        &self,
        time: f32,
        alpha: f32,
        blend: MixBlend,
        current: f32,
        setup: f32,
        value: f32,
    ) -> f32 {
        if self.is_empty() || time < self.time(0) {
            return before_first_key(alpha, blend, current, setup);
        }
        mix_absolute(value, alpha, blend, current, setup)
    }

    /// Value for scale keys, which are multipliers of the setup scale. Mixing keeps the sign
    /// of the base so a flip happens at the end of the mix rather than passing through zero.
    #[allow(clippy::too_many_arguments)]
    pub fn scale_value(
        &self,
        time: f32,
        alpha: f32,
        blend: MixBlend,
        direction: MixDirection,
        current: f32,
        setup: f32,
    ) -> f32 {
        if self.is_empty() || time < self.time(0) {
            return before_first_key(alpha, blend, current, setup);
        }
        let value = self.curve_value(time, 0) * setup;
        mix_scale(value, alpha, blend, direction, current, setup)
    }
}

fn before_first_key(alpha: f32, blend: MixBlend, current: f32, setup: f32) -> f32 {
    match blend {
        MixBlend::Setup => setup,
        MixBlend::First => current + (setup - current) * alpha,
        MixBlend::Replace | MixBlend::Add => current,
    }
}

fn mix_relative(value: f32, alpha: f32, blend: MixBlend, current: f32, setup: f32) -> f32 {
    match blend {
        MixBlend::Setup => setup + value * alpha,
        MixBlend::First | MixBlend::Replace => current + (value + setup - current) * alpha,
        MixBlend::Add => current + value * alpha,
    }
}

fn mix_absolute(value: f32, alpha: f32, blend: MixBlend, current: f32, setup: f32) -> f32 {
    if blend == MixBlend::Setup {
        setup + (value - setup) * alpha
    } else {
        current + (value - current) * alpha
    }
}

fn mix_scale(
    value: f32,
    alpha: f32,
    blend: MixBlend,
    direction: MixDirection,
    current: f32,
    setup: f32,
) -> f32 {
    if alpha == 1.0 {
        return if blend == MixBlend::Add {
            current + value - setup
        } else {
            value
        };
    }
    match (direction, blend) {
        (_, MixBlend::Add) => current + (value - setup) * alpha,
        (MixDirection::Out, MixBlend::Setup) => {
            setup + (value.abs() * signum(setup) - setup) * alpha
        }
        (MixDirection::Out, _) => current + (value.abs() * signum(current) - current) * alpha,
        (MixDirection::In, MixBlend::Setup) => {
            let s = setup.abs() * signum(value);
            s + (value - s) * alpha
        }
        (MixDirection::In, _) => {
            let s = current.abs() * signum(value);
            s + (value - s) * alpha
        }
    }
}

/// The bone a timeline writes to with its setup data, or `None` when the bone is inactive.
fn active_bone(skeleton: &mut Skeleton, index: usize) -> Option<(&mut Bone, &BoneData)> {
    let bone = skeleton.bones.get_mut(index)?;
    if !bone.active {
        return None;
    }
    let data = skeleton.data.bones.get(bone.data)?;
    Some((bone, data))
}

fn active_slot(skeleton: &mut Skeleton, index: usize) -> Option<(&mut Slot, &SlotData)> {
    let slot = skeleton.slots.get_mut(index)?;
    if !skeleton.bones.get(slot.bone).is_some_and(|b| b.active) {
        return None;
    }
    let data = skeleton.data.slots.get(slot.data)?;
    Some((slot, data))
}

fn apply_bone_value(
    timeline: &BoneTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
    value: impl Fn(&mut Bone) -> &mut f32,
    setup: impl Fn(&BoneData) -> f32,
) {
    let Some((bone, data)) = active_bone(skeleton, timeline.bone_index) else {
        return;
    };
    let setup = setup(data);
    let current = value(bone);
    *current = timeline
        .frames
        .relative_value(time, alpha, blend, *current, setup);
}

fn apply_translate(
    timeline: &BoneTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some((bone, data)) = active_bone(skeleton, timeline.bone_index) else {
        return;
    };
    let frames = &timeline.frames;
    if frames.is_empty() || time < frames.time(0) {
        bone.x = before_first_key(alpha, blend, bone.x, data.x);
        bone.y = before_first_key(alpha, blend, bone.y, data.y);
        return;
    }
    let frame = frames.search(time);
    let x = frames.value_in_frame(time, frame, 0);
    let y = frames.value_in_frame(time, frame, 1);
    bone.x = mix_relative(x, alpha, blend, bone.x, data.x);
    bone.y = mix_relative(y, alpha, blend, bone.y, data.y);
}

fn apply_shear(
    timeline: &BoneTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some((bone, data)) = active_bone(skeleton, timeline.bone_index) else {
        return;
    };
    let frames = &timeline.frames;
    if frames.is_empty() || time < frames.time(0) {
        bone.shear_x = before_first_key(alpha, blend, bone.shear_x, data.shear_x);
        bone.shear_y = before_first_key(alpha, blend, bone.shear_y, data.shear_y);
        return;
    }
    let frame = frames.search(time);
    let x = frames.value_in_frame(time, frame, 0);
    let y = frames.value_in_frame(time, frame, 1);
    bone.shear_x = mix_relative(x, alpha, blend, bone.shear_x, data.shear_x);
    bone.shear_y = mix_relative(y, alpha, blend, bone.shear_y, data.shear_y);
}

fn apply_scale(
    timeline: &BoneTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
    direction: MixDirection,
) {
    let Some((bone, data)) = active_bone(skeleton, timeline.bone_index) else {
        return;
    };
    let frames = &timeline.frames;
    if frames.is_empty() || time < frames.time(0) {
        bone.scale_x = before_first_key(alpha, blend, bone.scale_x, data.scale_x);
        bone.scale_y = before_first_key(alpha, blend, bone.scale_y, data.scale_y);
        return;
    }
    let frame = frames.search(time);
    let x = frames.value_in_frame(time, frame, 0) * data.scale_x;
    let y = frames.value_in_frame(time, frame, 1) * data.scale_y;
    bone.scale_x = mix_scale(x, alpha, blend, direction, bone.scale_x, data.scale_x);
    bone.scale_y = mix_scale(y, alpha, blend, direction, bone.scale_y, data.scale_y);
}

#[derive(Copy, Clone)]
enum Axis {
    X,
    Y,
}

fn apply_scale_axis(
    timeline: &BoneTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
    direction: MixDirection,
    axis: Axis,
) {
    let Some((bone, data)) = active_bone(skeleton, timeline.bone_index) else {
        return;
    };
    let (current, setup) = match axis {
        Axis::X => (&mut bone.scale_x, data.scale_x),
        Axis::Y => (&mut bone.scale_y, data.scale_y),
    };
    *current = timeline
        .frames
        .scale_value(time, alpha, blend, direction, *current, setup);
}

fn apply_inherit(
    timeline: &InheritTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    blend: MixBlend,
    direction: MixDirection,
) {
    let Some((bone, data)) = active_bone(skeleton, timeline.bone_index) else {
        return;
    };
    if direction == MixDirection::Out {
        if blend == MixBlend::Setup {
            bone.inherit = data.inherit;
        }
        return;
    }
    let Some(&first) = timeline.frames.first() else {
        return;
    };
    if time < first {
        if matches!(blend, MixBlend::Setup | MixBlend::First) {
            bone.inherit = data.inherit;
        }
        return;
    }
    let frame = crate::curve::search(&timeline.frames, time, 1);
    if let Some(&inherit) = timeline.inherits.get(frame) {
        bone.inherit = inherit;
    }
}

fn apply_rgba(
    timeline: &SlotTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some((slot, data)) = active_slot(skeleton, timeline.slot_index) else {
        return;
    };
    let frames = &timeline.frames;
    let color = &mut slot.color;
    let setup = data.color;
    if frames.is_empty() || time < frames.time(0) {
        match blend {
            MixBlend::Setup => *color = setup,
            MixBlend::First => color.add(
                (setup.r - color.r) * alpha,
                (setup.g - color.g) * alpha,
                (setup.b - color.b) * alpha,
                (setup.a - color.a) * alpha,
            ),
            MixBlend::Replace | MixBlend::Add => {}
        }
        return;
    }
    let [r, g, b, a] = sample(frames, time);
    if alpha == 1.0 {
        color.set(r, g, b, a);
    } else {
        if blend == MixBlend::Setup {
            *color = setup;
        }
        color.add(
            (r - color.r) * alpha,
            (g - color.g) * alpha,
            (b - color.b) * alpha,
            (a - color.a) * alpha,
        );
    }
}

fn apply_rgb(
    timeline: &SlotTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some((slot, data)) = active_slot(skeleton, timeline.slot_index) else {
        return;
    };
    let frames = &timeline.frames;
    if frames.is_empty() || time < frames.time(0) {
        mix_rgb_to_setup(&mut slot.color, data.color, alpha, blend);
        return;
    }
    let rgb = sample::<3>(frames, time);
    mix_rgb(&mut slot.color, data.color, rgb, alpha, blend);
}

fn apply_alpha(
    timeline: &SlotTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some((slot, data)) = active_slot(skeleton, timeline.slot_index) else {
        return;
    };
    let frames = &timeline.frames;
    let color = &mut slot.color;
    if frames.is_empty() || time < frames.time(0) {
        color.a = before_first_key(alpha, blend, color.a, data.color.a);
        return;
    }
    let a = frames.curve_value(time, 0);
    if alpha == 1.0 {
        color.a = a;
    } else {
        if blend == MixBlend::Setup {
            color.a = data.color.a;
        }
        color.a += (a - color.a) * alpha;
    }
}

fn apply_rgba2(
    timeline: &SlotTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some((slot, data)) = active_slot(skeleton, timeline.slot_index) else {
        return;
    };
    let (Some(dark), Some(setup_dark)) = (slot.dark_color.as_mut(), data.dark_color) else {
        return;
    };
    let light = &mut slot.color;
    let setup_light = data.color;
    let frames = &timeline.frames;
    if frames.is_empty() || time < frames.time(0) {
        match blend {
            MixBlend::Setup => *light = setup_light,
            MixBlend::First => light.add(
                (setup_light.r - light.r) * alpha,
                (setup_light.g - light.g) * alpha,
                (setup_light.b - light.b) * alpha,
                (setup_light.a - light.a) * alpha,
            ),
            MixBlend::Replace | MixBlend::Add => {}
        }
        mix_rgb_to_setup(dark, setup_dark, alpha, blend);
        return;
    }
    let [r, g, b, a, r2, g2, b2] = sample(frames, time);
    if alpha == 1.0 {
        light.set(r, g, b, a);
    } else {
        if blend == MixBlend::Setup {
            *light = setup_light;
        }
        light.add(
            (r - light.r) * alpha,
            (g - light.g) * alpha,
            (b - light.b) * alpha,
            (a - light.a) * alpha,
        );
    }
    mix_rgb(dark, setup_dark, [r2, g2, b2], alpha, blend);
}

fn apply_rgb2(
    timeline: &SlotTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some((slot, data)) = active_slot(skeleton, timeline.slot_index) else {
        return;
    };
    let (Some(dark), Some(setup_dark)) = (slot.dark_color.as_mut(), data.dark_color) else {
        return;
    };
    let frames = &timeline.frames;
    if frames.is_empty() || time < frames.time(0) {
        mix_rgb_to_setup(&mut slot.color, data.color, alpha, blend);
        mix_rgb_to_setup(dark, setup_dark, alpha, blend);
        return;
    }
    let [r, g, b, r2, g2, b2] = sample(frames, time);
    mix_rgb(&mut slot.color, data.color, [r, g, b], alpha, blend);
    mix_rgb(dark, setup_dark, [r2, g2, b2], alpha, blend);
}

fn sample<const N: usize>(frames: &CurveFrames, time: f32) -> [f32; N] {
    let frame = frames.search(time);
    std::array::from_fn(|i| frames.value_in_frame(time, frame, i))
}

/// RGB channels are not clamped, matching how the light color of rgb keys is written.
fn mix_rgb_to_setup(color: &mut Color, setup: Color, alpha: f32, blend: MixBlend) {
    match blend {
        MixBlend::Setup => {
            color.r = setup.r;
            color.g = setup.g;
            color.b = setup.b;
        }
        MixBlend::First => {
            color.r += (setup.r - color.r) * alpha;
            color.g += (setup.g - color.g) * alpha;
            color.b += (setup.b - color.b) * alpha;
        }
        MixBlend::Replace | MixBlend::Add => {}
    }
}

fn mix_rgb(color: &mut Color, setup: Color, [r, g, b]: [f32; 3], alpha: f32, blend: MixBlend) {
    if alpha == 1.0 {
        color.r = r;
        color.g = g;
        color.b = b;
        return;
    }
    if blend == MixBlend::Setup {
        color.r = setup.r;
        color.g = setup.g;
        color.b = setup.b;
    }
    color.r += (r - color.r) * alpha;
    color.g += (g - color.g) * alpha;
    color.b += (b - color.b) * alpha;
}

fn apply_attachment(
    timeline: &AttachmentTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    blend: MixBlend,
    direction: MixDirection,
) {
    let slot_index = timeline.slot_index;
    let Some((_, data)) = active_slot(skeleton, slot_index) else {
        return;
    };
    let setup_name = data.attachment_name.clone();
    if direction == MixDirection::Out {
        if blend == MixBlend::Setup {
            set_attachment_by_name(skeleton, slot_index, setup_name.as_deref());
        }
        return;
    }
    let Some(&first) = timeline.frames.first() else {
        return;
    };
    if time < first {
        if matches!(blend, MixBlend::Setup | MixBlend::First) {
            set_attachment_by_name(skeleton, slot_index, setup_name.as_deref());
        }
        return;
    }
    let frame = crate::curve::search(&timeline.frames, time, 1);
    let name = timeline.attachment_names.get(frame).and_then(Option::as_deref);
    set_attachment_by_name(skeleton, slot_index, name);
}

/// Resolves `name` through the skeleton's skins and sets it on the slot. A name missing from
/// every skin clears the slot.
pub(crate) fn set_attachment_by_name(
    skeleton: &mut Skeleton,
    slot_index: usize,
    name: Option<&str>,
) {
    let attachment = name.and_then(|name| skeleton.attachment(slot_index, name).cloned());
    if let Some(slot) = skeleton.slots.get_mut(slot_index) {
        slot.set_attachment(attachment);
    }
}

fn apply_deform(
    timeline: &DeformTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    mut alpha: f32,
    mut blend: MixBlend,
) {
    let Some((slot, _)) = active_slot(skeleton, timeline.slot_index) else {
        return;
    };
    let Some(attachment) = slot.attachment().map(Arc::clone) else {
        return;
    };
    let (Some(vertex_data), Some(keyed)) =
        (attachment.vertex_data(), timeline.attachment.vertex_data())
    else {
        return;
    };
    if vertex_data.timeline_id() != keyed.id() {
        return;
    }
    let frames = &timeline.frames;
    let Some(vertex_count) = timeline.vertices.first().map(Vec::len) else {
        return;
    };
    if frames.is_empty() {
        return;
    }
    let setup_positions = vertex_data.setup_positions();
    // Weighted vertices deform offsets from zero.
    let setup = |i: usize| setup_positions.and_then(|s| s.get(i)).copied().unwrap_or(0.0);
    let deform = &mut slot.deform;
    if deform.is_empty() {
        blend = MixBlend::Setup;
    }

    if time < frames.time(0) {
        match blend {
            MixBlend::Setup => deform.clear(),
            MixBlend::First => {
                if alpha == 1.0 {
                    deform.clear();
                    return;
                }
                deform.resize(vertex_count, 0.0);
                if setup_positions.is_none() {
                    alpha = 1.0 - alpha;
                    for v in deform.iter_mut() {
                        *v *= alpha;
                    }
                } else {
                    for (i, v) in deform.iter_mut().enumerate() {
                        *v += (setup(i) - *v) * alpha;
                    }
                }
            }
            MixBlend::Replace | MixBlend::Add => {}
        }
        return;
    }

    deform.resize(vertex_count, 0.0);
    let last = frames.frame_count() - 1;
    let (frame, percent) = if time >= frames.time(last) {
        (last, 0.0)
    } else {
        let frame = frames.search(time);
        (frame, frames.curve_percent(time, frame))
    };
    let prev = &timeline.vertices[frame];
    let next = timeline.vertices.get(frame + 1).unwrap_or(prev);
    let key = |i: usize| {
        let p = prev.get(i).copied().unwrap_or(0.0);
        if percent == 0.0 {
            return p;
        }
        p + (next.get(i).copied().unwrap_or(0.0) - p) * percent
    };

    if alpha == 1.0 {
        if blend == MixBlend::Add {
            for (i, v) in deform.iter_mut().enumerate() {
                *v += key(i) - setup(i);
            }
        } else {
            for (i, v) in deform.iter_mut().enumerate() {
                *v = key(i);
            }
        }
        return;
    }
    match blend {
        MixBlend::Setup => {
            for (i, v) in deform.iter_mut().enumerate() {
                let s = setup(i);
                *v = s + (key(i) - s) * alpha;
            }
        }
        MixBlend::First | MixBlend::Replace => {
            for (i, v) in deform.iter_mut().enumerate() {
                *v += (key(i) - *v) * alpha;
            }
        }
        MixBlend::Add => {
            for (i, v) in deform.iter_mut().enumerate() {
                *v += (key(i) - setup(i)) * alpha;
            }
        }
    }
}

fn apply_sequence(
    timeline: &SequenceTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    blend: MixBlend,
    direction: MixDirection,
) {
    let Some((slot, _)) = active_slot(skeleton, timeline.slot_index) else {
        return;
    };
    let keyed = &timeline.attachment;
    let applies = slot.attachment().is_some_and(|current| {
        Arc::ptr_eq(current, keyed)
            || current
                .vertex_data()
                .zip(keyed.vertex_data())
                .is_some_and(|(c, k)| c.timeline_id() == k.id())
    });
    if !applies {
        return;
    }
    let Some(sequence) = keyed.sequence() else {
        return;
    };
    if direction == MixDirection::Out {
        if blend == MixBlend::Setup {
            slot.sequence_index = -1;
        }
        return;
    }
    let Some(&first) = timeline.frames.first() else {
        return;
    };
    if time < first {
        if matches!(blend, MixBlend::Setup | MixBlend::First) {
            slot.sequence_index = -1;
        }
        return;
    }

    let frame = crate::curve::search(&timeline.frames, time, 1);
    let before = timeline.frames[frame];
    let key = timeline.keys[frame];
    let count = i32::try_from(sequence.count).unwrap_or(i32::MAX);
    let mut index = key.index;
    if key.mode != SequenceMode::Hold {
        if key.delay > 0.0 {
            index += ((time - before) / key.delay + 0.00001) as i32;
        }
        index = match key.mode {
            SequenceMode::Hold => index,
            SequenceMode::Once => index.min(count - 1),
            SequenceMode::Loop => index.checked_rem(count).unwrap_or(0),
            SequenceMode::Pingpong => {
                let n = count * 2 - 2;
                let index = if n <= 0 { 0 } else { index % n };
                if index >= count { n - index } else { index }
            }
            SequenceMode::OnceReverse => (count - 1 - index).max(0),
            SequenceMode::LoopReverse => count - 1 - index.checked_rem(count).unwrap_or(0),
            SequenceMode::PingpongReverse => {
                let n = count * 2 - 2;
                let index = if n <= 0 { 0 } else { (index + count - 1) % n };
                if index >= count { n - index } else { index }
            }
        };
    }
    slot.sequence_index = index;
}

/// Fires events keyed in `(last_time, time]`. When `last_time > time` the animation looped, so
/// the keys after `last_time` fire first, then the window restarts from the beginning.
fn apply_event(timeline: &EventTimeline, mut last_time: f32, time: f32, events: &mut Vec<Event>) {
    let frames = &timeline.frames;
    let (Some(&first), Some(&last)) = (frames.first(), frames.last()) else {
        return;
    };
    if last_time > time {
        apply_event(timeline, last_time, f32::MAX, events);
        last_time = -1.0;
    } else if last_time >= last {
        return;
    }
    if time < first {
        return;
    }

    let mut i = if last_time < first {
        0
    } else {
        let mut i = crate::curve::search(frames, last_time, 1) + 1;
        if let Some(&frame_time) = frames.get(i) {
            while i > 0 && frames[i - 1] == frame_time {
                i -= 1;
            }
        }
        i
    };
    while i < frames.len() && time >= frames[i] {
        if let Some(event) = timeline.events.get(i) {
            events.push(event.clone());
        }
        i += 1;
    }
}

fn apply_draw_order(
    timeline: &DrawOrderTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    blend: MixBlend,
    direction: MixDirection,
) {
    let reset = |skeleton: &mut Skeleton| {
        let count = skeleton.slots.len();
        skeleton.draw_order.clear();
        skeleton.draw_order.extend(0..count);
    };
    if direction == MixDirection::Out {
        if blend == MixBlend::Setup {
            reset(skeleton);
        }
        return;
    }
    let Some(&first) = timeline.frames.first() else {
        return;
    };
    if time < first {
        if matches!(blend, MixBlend::Setup | MixBlend::First) {
            reset(skeleton);
        }
        return;
    }
    let frame = crate::curve::search(&timeline.frames, time, 1);
    match timeline.draw_orders.get(frame).and_then(Option::as_ref) {
        Some(order) if order.len() == skeleton.slots.len() => {
            skeleton.draw_order.clear();
            skeleton.draw_order.extend_from_slice(order);
        }
        _ => reset(skeleton),
    }
}

fn apply_ik_constraint(
    timeline: &ConstraintTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
    direction: MixDirection,
) {
    let Some(constraint) = skeleton.ik_constraints.get_mut(timeline.constraint_index) else {
        return;
    };
    if !constraint.active {
        return;
    }
    let Some(data) = skeleton.data.ik_constraints.get(constraint.data) else {
        return;
    };
    let frames = &timeline.frames;
    if frames.is_empty() || time < frames.time(0) {
        match blend {
            MixBlend::Setup => constraint.set_to_setup_pose(data),
            MixBlend::First => {
                constraint.mix += (data.mix - constraint.mix) * alpha;
                constraint.softness += (data.softness - constraint.softness) * alpha;
                constraint.bend_direction = data.bend_direction;
                constraint.compress = data.compress;
                constraint.stretch = data.stretch;
            }
            MixBlend::Replace | MixBlend::Add => {}
        }
        return;
    }

    let frame = frames.search(time);
    let mix = frames.value_in_frame(time, frame, 0);
    let softness = frames.value_in_frame(time, frame, 1);
    let keyed_bend = frames.value(frame, 2) as i32;
    let keyed_compress = frames.value(frame, 3) != 0.0;
    let keyed_stretch = frames.value(frame, 4) != 0.0;

    if blend == MixBlend::Setup {
        constraint.mix = data.mix + (mix - data.mix) * alpha;
        constraint.softness = data.softness + (softness - data.softness) * alpha;
        if direction == MixDirection::Out {
            constraint.bend_direction = data.bend_direction;
            constraint.compress = data.compress;
            constraint.stretch = data.stretch;
            return;
        }
    } else {
        constraint.mix += (mix - constraint.mix) * alpha;
        constraint.softness += (softness - constraint.softness) * alpha;
        if direction == MixDirection::Out {
            return;
        }
    }
    constraint.bend_direction = keyed_bend;
    constraint.compress = keyed_compress;
    constraint.stretch = keyed_stretch;
}

/// Mixes `current` toward keyed values, from setup when `blend` is `Setup`. Before the first
/// key only `Setup` and `First` restore setup values.
fn mix_values<const N: usize>(
    frames: &CurveFrames,
    time: f32,
    alpha: f32,
    blend: MixBlend,
    current: [&mut f32; N],
    setup: [f32; N],
) {
    if frames.is_empty() || time < frames.time(0) {
        for (value, setup) in current.into_iter().zip(setup) {
            *value = before_first_key(alpha, blend, *value, setup);
        }
        return;
    }
    let keyed = sample::<N>(frames, time);
    for ((value, setup), keyed) in current.into_iter().zip(setup).zip(keyed) {
        *value = mix_absolute(keyed, alpha, blend, *value, setup);
    }
}

fn apply_transform_constraint(
    timeline: &ConstraintTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some(c) = skeleton
        .transform_constraints
        .get_mut(timeline.constraint_index)
    else {
        return;
    };
    if !c.active {
        return;
    }
    let Some(data) = skeleton.data.transform_constraints.get(c.data) else {
        return;
    };
    mix_values(
        &timeline.frames,
        time,
        alpha,
        blend,
        [
            &mut c.mix_rotate,
            &mut c.mix_x,
            &mut c.mix_y,
            &mut c.mix_scale_x,
            &mut c.mix_scale_y,
            &mut c.mix_shear_y,
        ],
        [
            data.mix_rotate,
            data.mix_x,
            data.mix_y,
            data.mix_scale_x,
            data.mix_scale_y,
            data.mix_shear_y,
        ],
    );
}

fn apply_path_position(
    timeline: &ConstraintTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some(c) = skeleton.path_constraints.get_mut(timeline.constraint_index) else {
        return;
    };
    if !c.active {
        return;
    }
    let Some(data) = skeleton.data.path_constraints.get(c.data) else {
        return;
    };
    c.position = timeline
        .frames
        .absolute_value(time, alpha, blend, c.position, data.position);
}

fn apply_path_spacing(
    timeline: &ConstraintTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some(c) = skeleton.path_constraints.get_mut(timeline.constraint_index) else {
        return;
    };
    if !c.active {
        return;
    }
    let Some(data) = skeleton.data.path_constraints.get(c.data) else {
        return;
    };
    c.spacing = timeline
        .frames
        .absolute_value(time, alpha, blend, c.spacing, data.spacing);
}

fn apply_path_mix(
    timeline: &ConstraintTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let Some(c) = skeleton.path_constraints.get_mut(timeline.constraint_index) else {
        return;
    };
    if !c.active {
        return;
    }
    let Some(data) = skeleton.data.path_constraints.get(c.data) else {
        return;
    };
    mix_values(
        &timeline.frames,
        time,
        alpha,
        blend,
        [&mut c.mix_rotate, &mut c.mix_x, &mut c.mix_y],
        [data.mix_rotate, data.mix_x, data.mix_y],
    );
}

impl PhysicsProperty {
    fn get(self, c: &PhysicsConstraint) -> f32 {
        match self {
            Self::Inertia => c.inertia,
            Self::Strength => c.strength,
            Self::Damping => c.damping,
            Self::Mass => 1.0 / c.mass_inverse,
            Self::Wind => c.wind,
            Self::Gravity => c.gravity,
            Self::Mix => c.mix,
        }
    }

    fn set(self, c: &mut PhysicsConstraint, value: f32) {
        match self {
            Self::Inertia => c.inertia = value,
            Self::Strength => c.strength = value,
            Self::Damping => c.damping = value,
            Self::Mass => c.mass_inverse = 1.0 / value,
            Self::Wind => c.wind = value,
            Self::Gravity => c.gravity = value,
            Self::Mix => c.mix = value,
        }
    }

    fn setup(self, data: &PhysicsConstraintData) -> f32 {
        match self {
            Self::Inertia => data.inertia,
            Self::Strength => data.strength,
            Self::Damping => data.damping,
            Self::Mass => 1.0 / data.mass_inverse,
            Self::Wind => data.wind,
            Self::Gravity => data.gravity,
            Self::Mix => data.mix,
        }
    }

    fn global(self, data: &PhysicsConstraintData) -> bool {
        match self {
            Self::Inertia => data.inertia_global,
            Self::Strength => data.strength_global,
            Self::Damping => data.damping_global,
            Self::Mass => data.mass_global,
            Self::Wind => data.wind_global,
            Self::Gravity => data.gravity_global,
            Self::Mix => data.mix_global,
        }
    }
}

fn apply_physics(
    timeline: &PhysicsConstraintTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
) {
    let frames = &timeline.frames;
    let property = timeline.property;
    let data = &skeleton.data.physics_constraints;
    match timeline.constraint_index {
        Some(index) => {
            let Some(c) = skeleton.physics_constraints.get_mut(index) else {
                return;
            };
            let Some(setup) = data.get(c.data) else {
                return;
            };
            if c.active {
                let value = frames.absolute_value(
                    time,
                    alpha,
                    blend,
                    property.get(c),
                    property.setup(setup),
                );
                property.set(c, value);
            }
        }
        None => {
            let value = if !frames.is_empty() && time >= frames.time(0) {
                frames.curve_value(time, 0)
            } else {
                0.0
            };
            for c in &mut skeleton.physics_constraints {
                let Some(setup) = data.get(c.data) else {
                    continue;
                };
                if c.active && property.global(setup) {
                    let mixed = frames.absolute_value_with(
                        time,
                        alpha,
                        blend,
                        property.get(c),
                        property.setup(setup),
                        value,
                    );
                    property.set(c, mixed);
                }
            }
        }
    }
}

fn apply_physics_reset(
    timeline: &PhysicsConstraintResetTimeline,
    skeleton: &mut Skeleton,
    mut last_time: f32,
    time: f32,
) {
    if let Some(index) = timeline.constraint_index {
        if !skeleton
            .physics_constraints
            .get(index)
            .is_some_and(|c| c.active)
        {
            return;
        }
    }
    let frames = &timeline.frames;
    let (Some(&first), Some(&last)) = (frames.first(), frames.last()) else {
        return;
    };
    if last_time > time {
        apply_physics_reset(timeline, skeleton, last_time, f32::MAX);
        last_time = -1.0;
    } else if last_time >= last {
        return;
    }
    if time < first {
        return;
    }
    let crossed = last_time < first
        || frames
            .get(crate::curve::search(frames, last_time, 1) + 1)
            .is_some_and(|&next| time >= next);
    if !crossed {
        return;
    }
    let now = skeleton.time;
    match timeline.constraint_index {
        Some(index) => {
            if let Some(c) = skeleton.physics_constraints.get_mut(index) {
                c.reset(now);
            }
        }
        None => {
            for c in skeleton.physics_constraints.iter_mut().filter(|c| c.active) {
                c.reset(now);
            }
        }
    }
}
