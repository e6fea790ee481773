use crate::{Attachment, CurveFrames, Error, Event, Inherit, SequenceMode, SkeletonData};
use std::collections::HashSet;
use std::sync::Arc;

/// Identifies one animatable property of one target. Two timelines with the same id write the
/// same value.
pub type PropertyId = u64;

/// Kinds of animatable properties. The discriminant lands in the high byte of a [`PropertyId`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Property {
    Rotate,
    X,
    Y,
    ScaleX,
    ScaleY,
    ShearX,
    ShearY,
    Inherit,
    Rgb,
    Alpha,
    Rgb2,
    Attachment,
    Deform,
    Event,
    DrawOrder,
    IkConstraint,
    TransformConstraint,
    PathConstraintPosition,
    PathConstraintSpacing,
    PathConstraintMix,
    PhysicsConstraintInertia,
    PhysicsConstraintStrength,
    PhysicsConstraintDamping,
    PhysicsConstraintMass,
    PhysicsConstraintWind,
    PhysicsConstraintGravity,
    PhysicsConstraintMix,
    PhysicsConstraintReset,
    Sequence,
}

impl Property {
    /// `index` is a bone, slot or constraint index, or `u32::MAX` for "all constraints".
    pub fn id(self, index: u32) -> PropertyId {
        ((self as u64) << 56) | u64::from(index)
    }

    /// Like [`Property::id`] with a 24 bit secondary key, used for per-attachment properties.
    pub fn id_with(self, secondary: u32, index: u32) -> PropertyId {
        self.id(index) | ((u64::from(secondary) & 0x00FF_FFFF) << 32)
    }
}

fn target_id(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// Keys for a single bone. One value per frame for rotate and the single-axis kinds, two for
/// translate, scale and shear.
#[derive(Clone, Debug)]
pub struct BoneTimeline {
    pub bone_index: usize,
    pub frames: CurveFrames,
}

impl BoneTimeline {
    pub fn new(bone_index: usize, value_count: usize, frame_count: usize) -> Self {
        Self {
            bone_index,
            frames: CurveFrames::new(value_count + 1, frame_count),
        }
    }
}

/// Stepped inherit-mode keys for a bone.
#[derive(Clone, Debug)]
pub struct InheritTimeline {
    pub bone_index: usize,
    pub frames: Vec<f32>,
    pub inherits: Vec<Inherit>,
}

impl InheritTimeline {
    pub fn new(bone_index: usize, frame_count: usize) -> Self {
        Self {
            bone_index,
            frames: vec![0.0; frame_count],
            inherits: vec![Inherit::Normal; frame_count],
        }
    }

    pub fn set_frame(&mut self, frame: usize, time: f32, inherit: Inherit) {
        self.frames[frame] = time;
        self.inherits[frame] = inherit;
    }
}

/// Color keys for a slot. Values per frame: rgba 4, rgb 3, alpha 1, rgba2 7 (light rgba then
/// dark rgb), rgb2 6.
#[derive(Clone, Debug)]
pub struct SlotTimeline {
    pub slot_index: usize,
    pub frames: CurveFrames,
}

impl SlotTimeline {
    pub fn new(slot_index: usize, value_count: usize, frame_count: usize) -> Self {
        Self {
            slot_index,
            frames: CurveFrames::new(value_count + 1, frame_count),
        }
    }
}

/// Changes a slot's attachment by name. `None` clears the slot.
#[derive(Clone, Debug)]
pub struct AttachmentTimeline {
    pub slot_index: usize,
    pub frames: Vec<f32>,
    pub attachment_names: Vec<Option<String>>,
}

impl AttachmentTimeline {
    pub fn new(slot_index: usize, frame_count: usize) -> Self {
        Self {
            slot_index,
            frames: vec![0.0; frame_count],
            attachment_names: vec![None; frame_count],
        }
    }

    pub fn set_frame(&mut self, frame: usize, time: f32, attachment_name: Option<&str>) {
        self.frames[frame] = time;
        self.attachment_names[frame] = attachment_name.map(str::to_string);
    }
}

/// Vertex offsets for a vertex attachment. Each key holds a full deform buffer; its curve is
/// stored as a percentage from one key to the next.
#[derive(Clone, Debug)]
pub struct DeformTimeline {
    pub slot_index: usize,
    pub attachment: Arc<Attachment>,
    pub frames: CurveFrames,
    pub vertices: Vec<Vec<f32>>,
}

impl DeformTimeline {
    pub fn new(slot_index: usize, attachment: Arc<Attachment>, frame_count: usize) -> Self {
        Self {
            slot_index,
            attachment,
            frames: CurveFrames::new(1, frame_count),
            vertices: vec![Vec::new(); frame_count],
        }
    }

    pub fn set_frame(&mut self, frame: usize, time: f32, vertices: Vec<f32>) -> Result<(), Error> {
        self.frames.set_frame(frame, time, &[])?;
        self.vertices[frame] = vertices;
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SequenceKey {
    pub mode: SequenceMode,
    pub index: i32,
    /// Seconds per region.
    pub delay: f32,
}

/// Drives the frame index of an attachment's sequence.
#[derive(Clone, Debug)]
pub struct SequenceTimeline {
    pub slot_index: usize,
    pub attachment: Arc<Attachment>,
    pub frames: Vec<f32>,
    pub keys: Vec<SequenceKey>,
}

impl SequenceTimeline {
    pub fn new(slot_index: usize, attachment: Arc<Attachment>, frame_count: usize) -> Self {
        Self {
            slot_index,
            attachment,
            frames: vec![0.0; frame_count],
            keys: vec![
                SequenceKey {
                    mode: SequenceMode::Hold,
                    index: 0,
                    delay: 0.0,
                };
                frame_count
            ],
        }
    }

    pub fn set_frame(&mut self, frame: usize, time: f32, key: SequenceKey) {
        self.frames[frame] = time;
        self.keys[frame] = key;
    }
}

#[derive(Clone, Debug)]
pub struct EventTimeline {
    pub frames: Vec<f32>,
    pub events: Vec<Event>,
}

impl EventTimeline {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            frames: events.iter().map(|e| e.time).collect(),
            events,
        }
    }
}

/// Each key is a slot order, or `None` for the setup order.
#[derive(Clone, Debug)]
pub struct DrawOrderTimeline {
    pub frames: Vec<f32>,
    pub draw_orders: Vec<Option<Vec<usize>>>,
}

impl DrawOrderTimeline {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frames: vec![0.0; frame_count],
            draw_orders: vec![None; frame_count],
        }
    }

    pub fn set_frame(&mut self, frame: usize, time: f32, draw_order: Option<Vec<usize>>) {
        self.frames[frame] = time;
        self.draw_orders[frame] = draw_order;
    }
}

/// Keys for one constraint. Values per frame: ik 5 (mix, softness, bend direction, compress,
/// stretch), transform 6 mixes, path position 1, path spacing 1, path mix 3.
#[derive(Clone, Debug)]
pub struct ConstraintTimeline {
    pub constraint_index: usize,
    pub frames: CurveFrames,
}

impl ConstraintTimeline {
    pub fn new(constraint_index: usize, value_count: usize, frame_count: usize) -> Self {
        Self {
            constraint_index,
            frames: CurveFrames::new(value_count + 1, frame_count),
        }
    }
}

/// The physics constraint value a [`PhysicsConstraintTimeline`] drives.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PhysicsProperty {
    Inertia,
    Strength,
    Damping,
    Mass,
    Wind,
    Gravity,
    Mix,
}

impl PhysicsProperty {
    fn property(self) -> Property {
        match self {
            Self::Inertia => Property::PhysicsConstraintInertia,
            Self::Strength => Property::PhysicsConstraintStrength,
            Self::Damping => Property::PhysicsConstraintDamping,
            Self::Mass => Property::PhysicsConstraintMass,
            Self::Wind => Property::PhysicsConstraintWind,
            Self::Gravity => Property::PhysicsConstraintGravity,
            Self::Mix => Property::PhysicsConstraintMix,
        }
    }
}

/// `constraint_index` of `None` keys every physics constraint whose data marks the property
/// as global.
#[derive(Clone, Debug)]
pub struct PhysicsConstraintTimeline {
    pub constraint_index: Option<usize>,
    pub property: PhysicsProperty,
    pub frames: CurveFrames,
}

impl PhysicsConstraintTimeline {
    pub fn new(
        constraint_index: Option<usize>,
        property: PhysicsProperty,
        frame_count: usize,
    ) -> Self {
        Self {
            constraint_index,
            property,
            frames: CurveFrames::new(2, frame_count),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PhysicsConstraintResetTimeline {
    pub constraint_index: Option<usize>,
    pub frames: Vec<f32>,
}

impl PhysicsConstraintResetTimeline {
    pub fn new(constraint_index: Option<usize>, frames: Vec<f32>) -> Self {
        Self {
            constraint_index,
            frames,
        }
    }
}

/// Every kind of keyed property.
#[derive(Clone, Debug)]
pub enum Timeline {
    Rotate(BoneTimeline),
    Translate(BoneTimeline),
    TranslateX(BoneTimeline),
    TranslateY(BoneTimeline),
    Scale(BoneTimeline),
    ScaleX(BoneTimeline),
    ScaleY(BoneTimeline),
    Shear(BoneTimeline),
    ShearX(BoneTimeline),
    ShearY(BoneTimeline),
    Inherit(InheritTimeline),
    Rgba(SlotTimeline),
    Rgb(SlotTimeline),
    Alpha(SlotTimeline),
    Rgba2(SlotTimeline),
    Rgb2(SlotTimeline),
    Attachment(AttachmentTimeline),
    Deform(DeformTimeline),
    Sequence(SequenceTimeline),
    Event(EventTimeline),
    DrawOrder(DrawOrderTimeline),
    IkConstraint(ConstraintTimeline),
    TransformConstraint(ConstraintTimeline),
    PathConstraintPosition(ConstraintTimeline),
    PathConstraintSpacing(ConstraintTimeline),
    PathConstraintMix(ConstraintTimeline),
    PhysicsConstraint(PhysicsConstraintTimeline),
    PhysicsConstraintReset(PhysicsConstraintResetTimeline),
}

impl Timeline {
    pub fn property_ids(&self) -> Vec<PropertyId> {
        match self {
            Self::Rotate(t) => vec![Property::Rotate.id(target_id(t.bone_index))],
            Self::Translate(t) => {
                let bone = target_id(t.bone_index);
                vec![Property::X.id(bone), Property::Y.id(bone)]
            }
            Self::TranslateX(t) => vec![Property::X.id(target_id(t.bone_index))],
            Self::TranslateY(t) => vec![Property::Y.id(target_id(t.bone_index))],
            Self::Scale(t) => {
                let bone = target_id(t.bone_index);
                vec![Property::ScaleX.id(bone), Property::ScaleY.id(bone)]
            }
            Self::ScaleX(t) => vec![Property::ScaleX.id(target_id(t.bone_index))],
            Self::ScaleY(t) => vec![Property::ScaleY.id(target_id(t.bone_index))],
            Self::Shear(t) => {
                let bone = target_id(t.bone_index);
                vec![Property::ShearX.id(bone), Property::ShearY.id(bone)]
            }
            Self::ShearX(t) => vec![Property::ShearX.id(target_id(t.bone_index))],
            Self::ShearY(t) => vec![Property::ShearY.id(target_id(t.bone_index))],
            Self::Inherit(t) => vec![Property::Inherit.id(target_id(t.bone_index))],
            Self::Rgba(t) => {
                let slot = target_id(t.slot_index);
                vec![Property::Rgb.id(slot), Property::Alpha.id(slot)]
            }
            Self::Rgb(t) => vec![Property::Rgb.id(target_id(t.slot_index))],
            Self::Alpha(t) => vec![Property::Alpha.id(target_id(t.slot_index))],
            Self::Rgba2(t) => {
                let slot = target_id(t.slot_index);
                vec![
                    Property::Rgb.id(slot),
                    Property::Alpha.id(slot),
                    Property::Rgb2.id(slot),
                ]
            }
            Self::Rgb2(t) => {
                let slot = target_id(t.slot_index);
                vec![Property::Rgb.id(slot), Property::Rgb2.id(slot)]
            }
            Self::Attachment(t) => vec![Property::Attachment.id(target_id(t.slot_index))],
            Self::Deform(t) => {
                let attachment = t.attachment.vertex_data().map_or(0, |v| v.id());
                vec![Property::Deform.id_with(attachment, target_id(t.slot_index))]
            }
            Self::Sequence(t) => {
                let sequence = t.attachment.sequence().map_or(0, |s| s.id());
                vec![Property::Sequence.id_with(sequence, target_id(t.slot_index))]
            }
            Self::Event(_) => vec![Property::Event.id(0)],
            Self::DrawOrder(_) => vec![Property::DrawOrder.id(0)],
            Self::IkConstraint(t) => {
                vec![Property::IkConstraint.id(target_id(t.constraint_index))]
            }
            Self::TransformConstraint(t) => {
                vec![Property::TransformConstraint.id(target_id(t.constraint_index))]
            }
            Self::PathConstraintPosition(t) => {
                vec![Property::PathConstraintPosition.id(target_id(t.constraint_index))]
            }
            Self::PathConstraintSpacing(t) => {
                vec![Property::PathConstraintSpacing.id(target_id(t.constraint_index))]
            }
            Self::PathConstraintMix(t) => {
                vec![Property::PathConstraintMix.id(target_id(t.constraint_index))]
            }
            Self::PhysicsConstraint(t) => {
                let index = t.constraint_index.map_or(u32::MAX, target_id);
                vec![t.property.property().id(index)]
            }
            Self::PhysicsConstraintReset(_) => vec![Property::PhysicsConstraintReset.id(0)],
        }
    }

    fn curve_frames(&self) -> Option<&CurveFrames> {
        match self {
            Self::Rotate(t)
            | Self::Translate(t)
            | Self::TranslateX(t)
            | Self::TranslateY(t)
            | Self::Scale(t)
            | Self::ScaleX(t)
            | Self::ScaleY(t)
            | Self::Shear(t)
            | Self::ShearX(t)
            | Self::ShearY(t) => Some(&t.frames),
            Self::Rgba(t) | Self::Rgb(t) | Self::Alpha(t) | Self::Rgba2(t) | Self::Rgb2(t) => {
                Some(&t.frames)
            }
            Self::Deform(t) => Some(&t.frames),
            Self::IkConstraint(t)
            | Self::TransformConstraint(t)
            | Self::PathConstraintPosition(t)
            | Self::PathConstraintSpacing(t)
            | Self::PathConstraintMix(t) => Some(&t.frames),
            Self::PhysicsConstraint(t) => Some(&t.frames),
            _ => None,
        }
    }

    /// Key times for the kinds that store them apart from their values.
    fn key_times(&self) -> Option<&[f32]> {
        match self {
            Self::Inherit(t) => Some(&t.frames),
            Self::Attachment(t) => Some(&t.frames),
            Self::Sequence(t) => Some(&t.frames),
            Self::Event(t) => Some(&t.frames),
            Self::DrawOrder(t) => Some(&t.frames),
            Self::PhysicsConstraintReset(t) => Some(&t.frames),
            _ => None,
        }
    }

    pub fn frame_count(&self) -> usize {
        match (self.curve_frames(), self.key_times()) {
            (Some(frames), _) => frames.frame_count(),
            (None, Some(times)) => times.len(),
            (None, None) => 0,
        }
    }

    /// Time of the last key.
    pub fn duration(&self) -> f32 {
        match (self.curve_frames(), self.key_times()) {
            (Some(frames), _) => frames.duration(),
            (None, Some(times)) => times.last().copied().unwrap_or(0.0),
            (None, None) => 0.0,
        }
    }

    /// Values per frame each curve-based kind expects.
    fn expected_values(&self) -> Option<usize> {
        Some(match self {
            Self::Rotate(_)
            | Self::TranslateX(_)
            | Self::TranslateY(_)
            | Self::ScaleX(_)
            | Self::ScaleY(_)
            | Self::ShearX(_)
            | Self::ShearY(_)
            | Self::Alpha(_)
            | Self::PathConstraintPosition(_)
            | Self::PathConstraintSpacing(_)
            | Self::PhysicsConstraint(_) => 1,
            Self::Translate(_) | Self::Scale(_) | Self::Shear(_) => 2,
            Self::Rgba(_) => 4,
            Self::Rgb(_) | Self::PathConstraintMix(_) => 3,
            Self::Rgba2(_) => 7,
            Self::Rgb2(_) | Self::TransformConstraint(_) => 6,
            Self::IkConstraint(_) => 5,
            Self::Deform(_) => 0,
            _ => return None,
        })
    }

    /// Checks target indices, key counts and key order against `data`.
    pub fn validate(&self, data: &SkeletonData) -> Result<(), Error> {
        if let (Some(frames), Some(expected)) = (self.curve_frames(), self.expected_values()) {
            if frames.value_count() != expected {
                return Err(Error::invalid_data(format!(
                    "{} timeline has {} values per frame, expected {expected}",
                    self.kind_name(),
                    frames.value_count()
                )));
            }
            check_sorted(self.kind_name(), (0..frames.frame_count()).map(|i| frames.time(i)))?;
        }
        if let Some(times) = self.key_times() {
            check_sorted(self.kind_name(), times.iter().copied())?;
        }

        let in_range = |what: &str, index: usize, len: usize| -> Result<(), Error> {
            if index >= len {
                return Err(Error::invalid_data(format!(
                    "{} timeline references {what} {index} ({len} total)",
                    self.kind_name()
                )));
            }
            Ok(())
        };
        let paired = |keys: usize, values: usize| -> Result<(), Error> {
            if keys != values {
                return Err(Error::invalid_data(format!(
                    "{} timeline has {keys} keys but {values} values",
                    self.kind_name()
                )));
            }
            Ok(())
        };
        let slots = data.slots.len();

        match self {
            Self::Rotate(t)
            | Self::Translate(t)
            | Self::TranslateX(t)
            | Self::TranslateY(t)
            | Self::Scale(t)
            | Self::ScaleX(t)
            | Self::ScaleY(t)
            | Self::Shear(t)
            | Self::ShearX(t)
            | Self::ShearY(t) => in_range("bone", t.bone_index, data.bones.len()),
            Self::Inherit(t) => {
                in_range("bone", t.bone_index, data.bones.len())?;
                paired(t.frames.len(), t.inherits.len())
            }
            Self::Rgba(t) | Self::Rgb(t) | Self::Alpha(t) | Self::Rgba2(t) | Self::Rgb2(t) => {
                in_range("slot", t.slot_index, slots)
            }
            Self::Attachment(t) => {
                in_range("slot", t.slot_index, slots)?;
                paired(t.frames.len(), t.attachment_names.len())
            }
            Self::Deform(t) => {
                in_range("slot", t.slot_index, slots)?;
                paired(t.frames.frame_count(), t.vertices.len())?;
                let Some(vertex_data) = t.attachment.vertex_data() else {
                    return Err(Error::invalid_data(format!(
                        "deform timeline keys attachment '{}' without vertices",
                        t.attachment.name()
                    )));
                };
                let length = vertex_data.deform_length();
                if let Some(key) = t.vertices.iter().find(|v| v.len() != length) {
                    return Err(Error::invalid_data(format!(
                        "deform key for '{}' has {} floats, expected {length}",
                        t.attachment.name(),
                        key.len()
                    )));
                }
                Ok(())
            }
            Self::Sequence(t) => {
                in_range("slot", t.slot_index, slots)?;
                paired(t.frames.len(), t.keys.len())?;
                if t.attachment.sequence().is_none() {
                    return Err(Error::invalid_data(format!(
                        "sequence timeline keys attachment '{}' without a sequence",
                        t.attachment.name()
                    )));
                }
                Ok(())
            }
            Self::Event(t) => {
                paired(t.frames.len(), t.events.len())?;
                for event in &t.events {
                    in_range("event", event.data, data.events.len())?;
                }
                Ok(())
            }
            Self::DrawOrder(t) => {
                paired(t.frames.len(), t.draw_orders.len())?;
                for order in t.draw_orders.iter().flatten() {
                    let mut seen = HashSet::with_capacity(order.len());
                    let permutation = order.len() == slots
                        && order.iter().all(|&slot| slot < slots && seen.insert(slot));
                    if !permutation {
                        return Err(Error::invalid_data(
                            "draw order key is not a permutation of the slots",
                        ));
                    }
                }
                Ok(())
            }
            Self::IkConstraint(t) => {
                in_range("ik constraint", t.constraint_index, data.ik_constraints.len())
            }
            Self::TransformConstraint(t) => in_range(
                "transform constraint",
                t.constraint_index,
                data.transform_constraints.len(),
            ),
            Self::PathConstraintPosition(t)
            | Self::PathConstraintSpacing(t)
            | Self::PathConstraintMix(t) => in_range(
                "path constraint",
                t.constraint_index,
                data.path_constraints.len(),
            ),
            Self::PhysicsConstraint(PhysicsConstraintTimeline {
                constraint_index, ..
            })
            | Self::PhysicsConstraintReset(PhysicsConstraintResetTimeline {
                constraint_index, ..
            }) => match *constraint_index {
                Some(index) => in_range(
                    "physics constraint",
                    index,
                    data.physics_constraints.len(),
                ),
                None => Ok(()),
            },
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Rotate(_) => "rotate",
            Self::Translate(_) => "translate",
            Self::TranslateX(_) => "translate x",
            Self::TranslateY(_) => "translate y",
            Self::Scale(_) => "scale",
            Self::ScaleX(_) => "scale x",
            Self::ScaleY(_) => "scale y",
            Self::Shear(_) => "shear",
            Self::ShearX(_) => "shear x",
            Self::ShearY(_) => "shear y",
            Self::Inherit(_) => "inherit",
            Self::Rgba(_) => "rgba",
            Self::Rgb(_) => "rgb",
            Self::Alpha(_) => "alpha",
            Self::Rgba2(_) => "rgba2",
            Self::Rgb2(_) => "rgb2",
            Self::Attachment(_) => "attachment",
            Self::Deform(_) => "deform",
            Self::Sequence(_) => "sequence",
            Self::Event(_) => "event",
            Self::DrawOrder(_) => "draw order",
            Self::IkConstraint(_) => "ik constraint",
            Self::TransformConstraint(_) => "transform constraint",
            Self::PathConstraintPosition(_) => "path position",
            Self::PathConstraintSpacing(_) => "path spacing",
            Self::PathConstraintMix(_) => "path mix",
            Self::PhysicsConstraint(_) => "physics constraint",
            Self::PhysicsConstraintReset(_) => "physics reset",
        }
    }
}

fn check_sorted(kind: &str, mut times: impl Iterator<Item = f32>) -> Result<(), Error> {
    let Some(mut previous) = times.next() else {
        return Ok(());
    };
    for time in times {
        if time < previous {
            return Err(Error::invalid_data(format!(
                "{kind} timeline keys are out of order ({time} after {previous})"
            )));
        }
        previous = time;
    }
    Ok(())
}

/// A named set of timelines. Immutable once built and shared between skeletons.
#[derive(Clone, Debug)]
pub struct Animation {
    pub name: String,
    pub timelines: Vec<Timeline>,
    pub duration: f32,
    timeline_ids: HashSet<PropertyId>,
}

impl Animation {
    pub fn new(name: impl Into<String>, timelines: Vec<Timeline>, duration: f32) -> Self {
        let timeline_ids = timelines.iter().flat_map(Timeline::property_ids).collect();
        Self {
            name: name.into(),
            timelines,
            duration,
            timeline_ids,
        }
    }

    /// True if any timeline keys one of `ids`.
    pub fn has_timeline(&self, ids: &[PropertyId]) -> bool {
        ids.iter().any(|id| self.timeline_ids.contains(id))
    }

    pub(crate) fn timeline_ids(&self) -> &HashSet<PropertyId> {
        &self.timeline_ids
    }
}
