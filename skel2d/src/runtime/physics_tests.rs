use crate::{BoneData, Physics, PhysicsConstraintData, Skeleton, SkeletonData};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

const TAIL: usize = 1;

/// A root and a tail bone driven by a spring on world x.
fn rig(configure: impl FnOnce(&mut PhysicsConstraintData)) -> Skeleton {
    let mut tail = BoneData::new(TAIL, "tail", Some(0));
    tail.length = 10.0;
    let mut constraint = PhysicsConstraintData::new("sway", TAIL);
    constraint.x = 1.0;
    configure(&mut constraint);
    let data = SkeletonData {
        bones: vec![BoneData::new(0, "root", None), tail],
        physics_constraints: vec![constraint],
        ..SkeletonData::default()
    };
    let mut skeleton = Skeleton::try_new(Arc::new(data)).unwrap();
    skeleton.update_world_transform(Physics::Update);
    skeleton
}

/// Moves the tail to x = 10 and simulates `delta` seconds.
fn jump(skeleton: &mut Skeleton, delta: f32) {
    skeleton.bones[TAIL].x = 10.0;
    skeleton.update(delta);
    skeleton.update_world_transform(Physics::Update);
}

#[test]
fn first_update_captures_the_rest_pose() {
    let skeleton = rig(|_| {});
    assert_approx(skeleton.bones[TAIL].world_x, 0.0);
    assert_eq!(skeleton.physics_constraints[0].offset(), (0.0, 0.0));
}

#[test]
fn physics_none_leaves_the_pose_alone() {
    let mut skeleton = rig(|_| {});
    skeleton.bones[TAIL].x = 10.0;
    skeleton.update(0.05);
    skeleton.update_world_transform(Physics::None);
    assert_approx(skeleton.bones[TAIL].world_x, 10.0);
}

#[test]
fn moving_bone_lags_behind_its_animated_position() {
    let mut skeleton = rig(|_| {});
    jump(&mut skeleton, 0.05);
    let x = skeleton.bones[TAIL].world_x;
    assert!(x > 0.0 && x < 9.0, "expected lag, got {x}");
    let (offset, _) = skeleton.physics_constraints[0].offset();
    assert_approx(x, 10.0 + offset);
}

#[test]
fn pose_reapplies_the_offset_without_simulating() {
    let mut skeleton = rig(|_| {});
    jump(&mut skeleton, 0.05);
    let lagged = skeleton.bones[TAIL].world_x;
    let offset = skeleton.physics_constraints[0].offset();

    skeleton.update(0.05);
    skeleton.update_world_transform(Physics::Pose);
    assert_approx(skeleton.bones[TAIL].world_x, lagged);
    assert_eq!(skeleton.physics_constraints[0].offset(), offset);
}

#[test]
fn zero_mix_disables_the_spring() {
    let mut skeleton = rig(|c| c.mix = 0.0);
    jump(&mut skeleton, 0.05);
    assert_approx(skeleton.bones[TAIL].world_x, 10.0);
}

#[test]
fn translating_physics_cancels_a_teleport() {
    let mut skeleton = rig(|_| {});
    skeleton.physics_translate(-10.0, 0.0);
    jump(&mut skeleton, 0.05);
    assert_approx(skeleton.bones[TAIL].world_x, 10.0);
    assert_eq!(skeleton.physics_constraints[0].offset(), (0.0, 0.0));
}

#[test]
fn reset_snaps_to_the_current_pose() {
    let mut skeleton = rig(|_| {});
    jump(&mut skeleton, 0.05);
    skeleton.update(0.05);
    skeleton.update_world_transform(Physics::Reset);
    assert_approx(skeleton.bones[TAIL].world_x, 10.0);
    assert_eq!(skeleton.physics_constraints[0].offset(), (0.0, 0.0));

    skeleton.update(0.05);
    skeleton.update_world_transform(Physics::Update);
    assert_approx(skeleton.bones[TAIL].world_x, 10.0);
}

#[test]
fn setup_pose_restores_spring_settings() {
    let mut skeleton = rig(|c| c.strength = 50.0);
    let constraint = &mut skeleton.physics_constraints[0];
    constraint.strength = 5.0;
    constraint.mix = 0.25;
    skeleton.set_to_setup_pose();
    let constraint = &skeleton.physics_constraints[0];
    assert_approx(constraint.strength, 50.0);
    assert_approx(constraint.mix, 1.0);
}
