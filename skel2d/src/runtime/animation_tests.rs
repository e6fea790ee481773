use crate::{
    Animation, Attachment, AttachmentTimeline, BoneData, BoneTimeline, Color, CurveFrames,
    DrawOrderTimeline, Event, EventData, EventTimeline, MixBlend, MixDirection, Physics,
    Property, RegionAttachment, Skeleton, SkeletonData, Skin, SlotData, SlotTimeline, Timeline,
};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

const ARM: usize = 1;

/// root and an arm (x 5, rotation 10) with a hand slot on the arm and an empty slot on root.
fn rig() -> Skeleton {
    let mut arm = BoneData::new(ARM, "arm", Some(0));
    arm.x = 5.0;
    arm.rotation = 10.0;
    let mut hand = SlotData::new(0, "hand", ARM);
    hand.attachment_name = Some("hand".to_string());
    let mut skin = Skin::new("default");
    for name in ["hand", "fist"] {
        let region = RegionAttachment::new(name, 4.0, 4.0);
        skin.set_attachment(0, name, Arc::new(Attachment::Region(region)));
    }
    let data = SkeletonData {
        bones: vec![BoneData::new(0, "root", None), arm],
        slots: vec![hand, SlotData::new(1, "shadow", 0)],
        skins: vec![skin],
        default_skin: Some(0),
        ..SkeletonData::default()
    };
    Skeleton::try_new(Arc::new(data)).unwrap()
}

fn single_key(time: f32, value: f32) -> CurveFrames {
    let mut frames = CurveFrames::new(2, 1);
    frames.set_frame(0, time, &[value]).unwrap();
    frames
}

fn apply(skeleton: &mut Skeleton, animation: &Animation, time: f32, blend: MixBlend) {
    animation.apply(skeleton, time, time, false, None, 1.0, blend, MixDirection::In);
}

fn attachment_name(skeleton: &Skeleton) -> Option<&str> {
    skeleton.slots[0].attachment().map(|a| a.name())
}

#[test]
fn relative_values_blend_by_mode() {
    let frames = single_key(0.0, 20.0);
    let (current, setup) = (50.0, 10.0);
    let value = |blend| frames.relative_value(0.5, 0.5, blend, current, setup);
    assert_approx(value(MixBlend::Setup), 20.0);
    assert_approx(value(MixBlend::First), 40.0);
    assert_approx(value(MixBlend::Replace), 40.0);
    assert_approx(value(MixBlend::Add), 60.0);
}

#[test]
fn before_the_first_key_only_setup_and_first_touch_the_value() {
    let frames = single_key(1.0, 20.0);
    let value = |blend| frames.relative_value(0.5, 0.5, blend, 50.0, 10.0);
    assert_approx(value(MixBlend::Setup), 10.0);
    assert_approx(value(MixBlend::First), 30.0);
    assert_approx(value(MixBlend::Replace), 50.0);
    assert_approx(value(MixBlend::Add), 50.0);
}

#[test]
fn absolute_values_ignore_the_setup_unless_blending_from_it() {
    let frames = single_key(0.0, 20.0);
    assert_approx(
        frames.absolute_value(0.0, 0.5, MixBlend::Setup, 50.0, 10.0),
        15.0,
    );
    assert_approx(
        frames.absolute_value(0.0, 0.5, MixBlend::Replace, 50.0, 10.0),
        35.0,
    );
}

#[test]
fn scale_mixing_keeps_the_sign_of_the_base() {
    let frames = single_key(0.0, -1.0);
    let value =
        |alpha, blend, direction| frames.scale_value(0.0, alpha, blend, direction, 1.0, 1.0);
    assert_approx(value(1.0, MixBlend::Replace, MixDirection::In), -1.0);
    assert_approx(value(0.5, MixBlend::Replace, MixDirection::In), -1.0);
    assert_approx(value(0.5, MixBlend::Replace, MixDirection::Out), 1.0);
    assert_approx(value(0.5, MixBlend::Add, MixDirection::In), 0.0);
}

#[test]
fn rotate_timeline_interpolates_relative_to_setup() {
    let mut rotate = BoneTimeline::new(ARM, 1, 2);
    rotate.frames.set_frame(0, 0.0, &[0.0]).unwrap();
    rotate.frames.set_frame(1, 1.0, &[90.0]).unwrap();
    let animation = Animation::new("swing", vec![Timeline::Rotate(rotate)], 1.0);
    assert!(animation.has_timeline(&[Property::Rotate.id(ARM as u32)]));
    assert!(!animation.has_timeline(&[Property::Rotate.id(0)]));

    let mut skeleton = rig();
    apply(&mut skeleton, &animation, 0.5, MixBlend::Replace);
    assert_approx(skeleton.bones[ARM].rotation, 55.0);
    skeleton.update_world_transform(Physics::None);
    assert_approx(skeleton.bones[ARM].world_rotation_x(), 55.0);

    apply(&mut skeleton, &animation, 3.0, MixBlend::Replace);
    assert_approx(skeleton.bones[ARM].rotation, 100.0);
}

#[test]
fn translate_timeline_applies_alpha() {
    let mut translate = BoneTimeline::new(ARM, 2, 1);
    translate.frames.set_frame(0, 0.0, &[10.0, 20.0]).unwrap();
    let animation = Animation::new("reach", vec![Timeline::Translate(translate)], 1.0);

    let mut skeleton = rig();
    animation.apply(
        &mut skeleton,
        0.0,
        0.0,
        false,
        None,
        0.5,
        MixBlend::Replace,
        MixDirection::In,
    );
    assert_approx(skeleton.bones[ARM].x, 10.0);
    assert_approx(skeleton.bones[ARM].y, 10.0);

    animation.apply(
        &mut skeleton,
        0.0,
        0.0,
        false,
        None,
        1.0,
        MixBlend::Add,
        MixDirection::In,
    );
    assert_approx(skeleton.bones[ARM].x, 20.0);
    assert_approx(skeleton.bones[ARM].y, 30.0);
}

#[test]
fn color_timeline_mixes_toward_the_key() {
    let mut rgba = SlotTimeline::new(0, 4, 1);
    rgba.frames.set_frame(0, 0.0, &[0.0, 0.0, 0.0, 1.0]).unwrap();
    let animation = Animation::new("fade", vec![Timeline::Rgba(rgba)], 1.0);

    let mut skeleton = rig();
    animation.apply(
        &mut skeleton,
        0.0,
        0.0,
        false,
        None,
        0.5,
        MixBlend::Replace,
        MixDirection::In,
    );
    assert_eq!(skeleton.slots[0].color, Color::new(0.5, 0.5, 0.5, 1.0));
    apply(&mut skeleton, &animation, 0.0, MixBlend::Replace);
    assert_eq!(skeleton.slots[0].color, Color::BLACK);
}

#[test]
fn looping_fires_an_event_once_across_the_wrap() {
    let data = EventData::new("step");
    let events = EventTimeline::new(vec![Event::new(1.9, 0, &data)]);
    let animation = Animation::new("walk", vec![Timeline::Event(events)], 2.0);
    let mut skeleton = rig();

    let mut fired = Vec::new();
    animation.apply(
        &mut skeleton,
        1.8,
        2.1,
        true,
        Some(&mut fired),
        1.0,
        MixBlend::Replace,
        MixDirection::In,
    );
    assert_eq!(fired.len(), 1);
    assert_approx(fired[0].time, 1.9);

    fired.clear();
    animation.apply(
        &mut skeleton,
        2.1,
        2.5,
        true,
        Some(&mut fired),
        1.0,
        MixBlend::Replace,
        MixDirection::In,
    );
    assert!(fired.is_empty());
}

#[test]
fn events_fire_in_the_half_open_window() {
    let data = EventData::new("hit");
    let keyed = vec![Event::new(0.0, 0, &data), Event::new(0.5, 0, &data)];
    let timeline = Timeline::Event(EventTimeline::new(keyed));
    let animation = Animation::new("attack", vec![timeline], 1.0);
    let mut skeleton = rig();
    let mut fired = Vec::new();
    let mut window = |last_time, time, fired: &mut Vec<Event>| {
        fired.clear();
        animation.apply(
            &mut skeleton,
            last_time,
            time,
            false,
            Some(fired),
            1.0,
            MixBlend::Replace,
            MixDirection::In,
        );
        fired.len()
    };
    assert_eq!(window(-1.0, 0.0, &mut fired), 1);
    assert_eq!(window(0.0, 0.5, &mut fired), 1);
    assert_eq!(window(0.5, 0.7, &mut fired), 0);
    assert_eq!(window(-1.0, 1.0, &mut fired), 2);
}

#[test]
fn attachment_timeline_switches_and_restores_attachments() {
    let mut keys = AttachmentTimeline::new(0, 2);
    keys.set_frame(0, 0.5, Some("fist"));
    keys.set_frame(1, 1.0, None);
    let animation = Animation::new("grab", vec![Timeline::Attachment(keys)], 1.0);
    let mut skeleton = rig();

    apply(&mut skeleton, &animation, 0.75, MixBlend::Replace);
    assert_eq!(attachment_name(&skeleton), Some("fist"));
    apply(&mut skeleton, &animation, 1.0, MixBlend::Replace);
    assert_eq!(attachment_name(&skeleton), None);

    apply(&mut skeleton, &animation, 0.2, MixBlend::Replace);
    assert_eq!(attachment_name(&skeleton), None);
    apply(&mut skeleton, &animation, 0.2, MixBlend::First);
    assert_eq!(attachment_name(&skeleton), Some("hand"));

    apply(&mut skeleton, &animation, 0.75, MixBlend::Replace);
    animation.apply(
        &mut skeleton,
        0.75,
        0.75,
        false,
        None,
        1.0,
        MixBlend::Replace,
        MixDirection::Out,
    );
    assert_eq!(attachment_name(&skeleton), Some("fist"));
    animation.apply(
        &mut skeleton,
        0.75,
        0.75,
        false,
        None,
        1.0,
        MixBlend::Setup,
        MixDirection::Out,
    );
    assert_eq!(attachment_name(&skeleton), Some("hand"));
}

#[test]
fn draw_order_timeline_reorders_and_resets() {
    let mut keys = DrawOrderTimeline::new(2);
    keys.set_frame(0, 0.0, Some(vec![1, 0]));
    keys.set_frame(1, 1.0, None);
    let animation = Animation::new("swap", vec![Timeline::DrawOrder(keys)], 1.0);
    let mut skeleton = rig();

    apply(&mut skeleton, &animation, 0.5, MixBlend::Replace);
    assert_eq!(skeleton.draw_order, vec![1, 0]);
    apply(&mut skeleton, &animation, 1.0, MixBlend::Replace);
    assert_eq!(skeleton.draw_order, vec![0, 1]);

    apply(&mut skeleton, &animation, 0.5, MixBlend::Replace);
    animation.apply(
        &mut skeleton,
        0.5,
        0.5,
        false,
        None,
        1.0,
        MixBlend::Setup,
        MixDirection::Out,
    );
    assert_eq!(skeleton.draw_order, vec![0, 1]);
}

#[test]
fn timelines_on_inactive_bones_are_ignored() {
    let mut rotate = BoneTimeline::new(ARM, 1, 1);
    rotate.frames.set_frame(0, 0.0, &[45.0]).unwrap();
    let animation = Animation::new("swing", vec![Timeline::Rotate(rotate)], 1.0);
    let mut skeleton = rig();
    skeleton.bones[ARM].active = false;
    apply(&mut skeleton, &animation, 0.0, MixBlend::Replace);
    assert_approx(skeleton.bones[ARM].rotation, 10.0);
}
