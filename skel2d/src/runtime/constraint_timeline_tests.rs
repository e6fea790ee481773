use crate::{
    Animation, BoneData, ConstraintTimeline, IkConstraintData, MixBlend, MixDirection,
    PathConstraintData, Physics, PhysicsConstraintData, PhysicsConstraintResetTimeline,
    PhysicsConstraintTimeline, PhysicsProperty, Skeleton, SkeletonData, SlotData, Timeline,
    TransformConstraintData,
};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

/// An upper and lower arm reaching for a target, copying it, and following a rail slot.
fn rig() -> Skeleton {
    let mut upper = BoneData::new(1, "upper", Some(0));
    upper.length = 10.0;
    let mut lower = BoneData::new(2, "lower", Some(1));
    lower.x = 10.0;
    lower.length = 10.0;
    let mut target = BoneData::new(3, "target", Some(0));
    target.x = 15.0;
    target.y = 5.0;
    let data = SkeletonData {
        bones: vec![BoneData::new(0, "root", None), upper, lower, target],
        slots: vec![SlotData::new(0, "rail", 0)],
        ik_constraints: vec![IkConstraintData::new("reach", vec![1, 2], 3)],
        transform_constraints: vec![TransformConstraintData::new("copy", vec![2], 3)],
        path_constraints: vec![PathConstraintData::new("follow", vec![1], 0)],
        ..SkeletonData::default()
    };
    Skeleton::try_new(Arc::new(data)).unwrap()
}

/// `sway` on the tail uses the global strength, `bounce` on the tip does not.
fn physics_rig() -> Skeleton {
    let mut tail = BoneData::new(1, "tail", Some(0));
    tail.length = 10.0;
    let mut tip = BoneData::new(2, "tip", Some(0));
    tip.length = 10.0;
    let mut sway = PhysicsConstraintData::new("sway", 1);
    sway.x = 1.0;
    sway.strength_global = true;
    let mut bounce = PhysicsConstraintData::new("bounce", 2);
    bounce.x = 1.0;
    let data = SkeletonData {
        bones: vec![BoneData::new(0, "root", None), tail, tip],
        physics_constraints: vec![sway, bounce],
        ..SkeletonData::default()
    };
    let mut skeleton = Skeleton::try_new(Arc::new(data)).unwrap();
    skeleton.update_world_transform(Physics::Update);
    skeleton
}

fn apply(
    skeleton: &mut Skeleton,
    timeline: Timeline,
    time: f32,
    alpha: f32,
    blend: MixBlend,
    direction: MixDirection,
) {
    let animation = Animation::new("keys", vec![timeline], 1.0);
    animation.apply(skeleton, time, time, false, None, alpha, blend, direction);
}

fn keys(value_count: usize, time: f32, values: &[f32]) -> ConstraintTimeline {
    let mut timeline = ConstraintTimeline::new(0, value_count, 1);
    timeline.frames.set_frame(0, time, values).unwrap();
    timeline
}

/// mix 0.5, softness 2, bend -1, compress and stretch on.
fn ik_keys(time: f32) -> Timeline {
    Timeline::IkConstraint(keys(5, time, &[0.5, 2.0, -1.0, 1.0, 1.0]))
}

#[test]
fn ik_keys_set_mix_and_flags() {
    let mut skeleton = rig();
    apply(&mut skeleton, ik_keys(0.0), 0.0, 1.0, MixBlend::Replace, MixDirection::In);
    let ik = &skeleton.ik_constraints[0];
    assert_approx(ik.mix, 0.5);
    assert_approx(ik.softness, 2.0);
    assert_eq!(ik.bend_direction, -1);
    assert!(ik.compress && ik.stretch);
}

#[test]
fn ik_mixing_out_restores_flags_only_from_setup() {
    let mut skeleton = rig();
    apply(&mut skeleton, ik_keys(0.0), 0.0, 1.0, MixBlend::Replace, MixDirection::In);

    apply(&mut skeleton, ik_keys(0.0), 0.0, 1.0, MixBlend::Replace, MixDirection::Out);
    assert_eq!(skeleton.ik_constraints[0].bend_direction, -1);
    assert!(skeleton.ik_constraints[0].stretch);

    apply(&mut skeleton, ik_keys(0.0), 0.0, 0.5, MixBlend::Setup, MixDirection::Out);
    let ik = &skeleton.ik_constraints[0];
    assert_approx(ik.mix, 0.75);
    assert_approx(ik.softness, 1.0);
    assert_eq!(ik.bend_direction, 1);
    assert!(!ik.compress && !ik.stretch);
}

#[test]
fn ik_before_the_first_key_returns_toward_setup() {
    let mut skeleton = rig();
    apply(&mut skeleton, ik_keys(0.0), 0.0, 1.0, MixBlend::Replace, MixDirection::In);

    apply(&mut skeleton, ik_keys(0.5), 0.0, 0.5, MixBlend::First, MixDirection::In);
    let ik = &skeleton.ik_constraints[0];
    assert_approx(ik.mix, 0.75);
    assert_approx(ik.softness, 1.0);
    assert_eq!(ik.bend_direction, 1);
    assert!(!ik.compress);

    apply(&mut skeleton, ik_keys(0.5), 0.0, 1.0, MixBlend::Setup, MixDirection::In);
    assert_approx(skeleton.ik_constraints[0].mix, 1.0);
    assert_approx(skeleton.ik_constraints[0].softness, 0.0);
}

#[test]
fn transform_keys_mix_every_channel() {
    let mut skeleton = rig();
    let mixes = |time| {
        Timeline::TransformConstraint(keys(6, time, &[0.5, 0.4, 0.3, 0.2, 0.1, 0.0]))
    };
    let read = |skeleton: &Skeleton| {
        let c = &skeleton.transform_constraints[0];
        [
            c.mix_rotate,
            c.mix_x,
            c.mix_y,
            c.mix_scale_x,
            c.mix_scale_y,
            c.mix_shear_y,
        ]
    };

    apply(&mut skeleton, mixes(0.0), 0.0, 0.5, MixBlend::Setup, MixDirection::In);
    let expected = [0.75, 0.7, 0.65, 0.6, 0.55, 0.5];
    for (actual, expected) in read(&skeleton).into_iter().zip(expected) {
        assert_approx(actual, expected);
    }

    apply(&mut skeleton, mixes(0.5), 0.0, 1.0, MixBlend::Replace, MixDirection::In);
    assert_approx(read(&skeleton)[0], 0.75);
    apply(&mut skeleton, mixes(0.5), 0.0, 1.0, MixBlend::Setup, MixDirection::In);
    assert_eq!(read(&skeleton), [1.0; 6]);
}

#[test]
fn path_position_and_spacing_keys_are_absolute() {
    let mut skeleton = rig();
    let mut position = ConstraintTimeline::new(0, 1, 2);
    position.frames.set_frame(0, 0.0, &[0.0]).unwrap();
    position.frames.set_frame(1, 1.0, &[1.0]).unwrap();
    let position = Timeline::PathConstraintPosition(position);
    apply(&mut skeleton, position, 0.25, 1.0, MixBlend::Replace, MixDirection::In);
    assert_approx(skeleton.path_constraints[0].position, 0.25);

    let spacing = Timeline::PathConstraintSpacing(keys(1, 0.0, &[10.0]));
    apply(&mut skeleton, spacing, 0.0, 0.5, MixBlend::Setup, MixDirection::In);
    assert_approx(skeleton.path_constraints[0].spacing, 5.0);
}

#[test]
fn path_mix_keys_restore_setup_before_the_first_key() {
    let mut skeleton = rig();
    let mixes = || Timeline::PathConstraintMix(keys(3, 0.5, &[0.2, 0.4, 0.6]));

    apply(&mut skeleton, mixes(), 0.5, 1.0, MixBlend::Replace, MixDirection::In);
    let path = &skeleton.path_constraints[0];
    assert_approx(path.mix_rotate, 0.2);
    assert_approx(path.mix_x, 0.4);
    assert_approx(path.mix_y, 0.6);

    apply(&mut skeleton, mixes(), 0.0, 1.0, MixBlend::Replace, MixDirection::In);
    assert_approx(skeleton.path_constraints[0].mix_rotate, 0.2);
    apply(&mut skeleton, mixes(), 0.0, 1.0, MixBlend::Setup, MixDirection::In);
    let path = &skeleton.path_constraints[0];
    assert_eq!([path.mix_rotate, path.mix_x, path.mix_y], [1.0; 3]);
}

fn physics_keys(
    constraint: Option<usize>,
    property: PhysicsProperty,
    time: f32,
    value: f32,
) -> Timeline {
    let mut timeline = PhysicsConstraintTimeline::new(constraint, property, 1);
    timeline.frames.set_frame(0, time, &[value]).unwrap();
    Timeline::PhysicsConstraint(timeline)
}

#[test]
fn physics_keys_target_one_constraint() {
    let mut skeleton = physics_rig();
    let strength = physics_keys(Some(1), PhysicsProperty::Strength, 0.0, 40.0);
    apply(&mut skeleton, strength, 0.0, 1.0, MixBlend::Replace, MixDirection::In);
    assert_approx(skeleton.physics_constraints[0].strength, 100.0);
    assert_approx(skeleton.physics_constraints[1].strength, 40.0);

    let mass = physics_keys(Some(0), PhysicsProperty::Mass, 0.0, 2.0);
    apply(&mut skeleton, mass, 0.0, 1.0, MixBlend::Replace, MixDirection::In);
    assert_approx(skeleton.physics_constraints[0].mass_inverse, 0.5);
}

#[test]
fn global_physics_keys_reach_constraints_marked_global() {
    let mut skeleton = physics_rig();
    let strength = |time| physics_keys(None, PhysicsProperty::Strength, time, 20.0);

    apply(&mut skeleton, strength(0.0), 0.0, 1.0, MixBlend::Replace, MixDirection::In);
    assert_approx(skeleton.physics_constraints[0].strength, 20.0);
    assert_approx(skeleton.physics_constraints[1].strength, 100.0);

    apply(&mut skeleton, strength(0.5), 0.0, 1.0, MixBlend::Setup, MixDirection::In);
    assert_approx(skeleton.physics_constraints[0].strength, 100.0);
}

#[test]
fn reset_keys_fire_once_including_across_the_loop() {
    let mut skeleton = physics_rig();
    skeleton.bones[1].x = 10.0;
    skeleton.update(0.05);
    skeleton.update_world_transform(Physics::Update);
    let (moving, _) = skeleton.physics_constraints[0].offset();
    assert!(moving != 0.0, "expected the spring to lag");

    let reset = Timeline::PhysicsConstraintReset(PhysicsConstraintResetTimeline::new(
        Some(0),
        vec![0.1],
    ));
    let animation = Animation::new("settle", vec![reset], 1.0);
    let play = |skeleton: &mut Skeleton, last_time, time| {
        animation.apply(
            skeleton,
            last_time,
            time,
            true,
            None,
            1.0,
            MixBlend::Replace,
            MixDirection::In,
        );
    };

    play(&mut skeleton, 0.2, 0.5);
    assert_eq!(skeleton.physics_constraints[0].offset().0, moving);

    play(&mut skeleton, 0.9, 1.2);
    assert_eq!(skeleton.physics_constraints[0].offset(), (0.0, 0.0));
}
