use crate::{BoneData, IkConstraintData, Physics, Skeleton, SkeletonData};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-3,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

const UPPER: usize = 1;
const LOWER: usize = 2;
const TARGET: usize = 3;

/// root, a 5+5 arm and a target bone, constrained by one IK over `bones`.
fn arm(bones: Vec<usize>, configure: impl FnOnce(&mut IkConstraintData)) -> Skeleton {
    let mut upper = BoneData::new(UPPER, "upper", Some(0));
    upper.length = 5.0;
    let mut lower = BoneData::new(LOWER, "lower", Some(UPPER));
    lower.x = 5.0;
    lower.length = 5.0;
    let mut ik = IkConstraintData::new("ik", bones, TARGET);
    configure(&mut ik);
    let data = SkeletonData {
        bones: vec![
            BoneData::new(0, "root", None),
            upper,
            lower,
            BoneData::new(TARGET, "target", Some(0)),
        ],
        ik_constraints: vec![ik],
        ..SkeletonData::default()
    };
    Skeleton::try_new(Arc::new(data)).unwrap()
}

fn solve(skeleton: &mut Skeleton, target_x: f32, target_y: f32) {
    skeleton.bones[TARGET].x = target_x;
    skeleton.bones[TARGET].y = target_y;
    skeleton.update_world_transform(Physics::None);
}

fn tip(skeleton: &Skeleton) -> (f32, f32) {
    skeleton.bones[LOWER].local_to_world(5.0, 0.0)
}

#[test]
fn fully_extended_target_gives_a_straight_chain() {
    let mut skeleton = arm(vec![UPPER, LOWER], |_| {});
    solve(&mut skeleton, 10.0, 0.0);
    assert_approx(skeleton.bones[UPPER].world_rotation_x(), 0.0);
    assert_approx(skeleton.bones[LOWER].world_rotation_x(), 0.0);
    assert_approx(skeleton.bones[LOWER].world_x, 5.0);
    let (x, y) = tip(&skeleton);
    assert_approx(x, 10.0);
    assert_approx(y, 0.0);
}

#[test]
fn unreachable_target_without_stretch_clamps_to_straight_chain() {
    let mut skeleton = arm(vec![UPPER, LOWER], |_| {});
    solve(&mut skeleton, 0.0, 25.0);
    for bone in [UPPER, LOWER] {
        let bone = &skeleton.bones[bone];
        assert!(bone.a.is_finite() && bone.c.is_finite());
        assert_approx(bone.world_rotation_x(), 90.0);
        assert_approx(bone.world_scale_x(), 1.0);
    }
    let (x, y) = tip(&skeleton);
    assert_approx(x, 0.0);
    assert_approx(y, 10.0);
}

#[test]
fn unreachable_target_with_stretch_scales_the_parent() {
    let mut skeleton = arm(vec![UPPER, LOWER], |ik| ik.stretch = true);
    solve(&mut skeleton, 20.0, 0.0);
    assert_approx(skeleton.bones[UPPER].world_scale_x(), 2.0);
    let (x, _) = tip(&skeleton);
    assert_approx(x, 20.0);
}

#[test]
fn bend_direction_picks_the_elbow_side() {
    let mut positive = arm(vec![UPPER, LOWER], |ik| ik.bend_direction = 1);
    solve(&mut positive, 5.0, 5.0);
    assert_approx(positive.bones[UPPER].world_rotation_x(), 0.0);
    assert_approx(positive.bones[LOWER].world_rotation_x(), 90.0);

    let mut negative = arm(vec![UPPER, LOWER], |ik| ik.bend_direction = -1);
    solve(&mut negative, 5.0, 5.0);
    assert_approx(negative.bones[UPPER].world_rotation_x(), 90.0);
    assert_approx(negative.bones[LOWER].world_rotation_x(), 0.0);

    for skeleton in [&positive, &negative] {
        let (x, y) = tip(skeleton);
        assert_approx(x, 5.0);
        assert_approx(y, 5.0);
    }
}

#[test]
fn one_bone_points_at_the_target() {
    let mut skeleton = arm(vec![UPPER], |_| {});
    solve(&mut skeleton, 0.0, 3.0);
    assert_approx(skeleton.bones[UPPER].world_rotation_x(), 90.0);
    assert_approx(skeleton.bones[UPPER].world_scale_x(), 1.0);
}

#[test]
fn one_bone_stretch_and_compress_scale_to_reach() {
    let mut stretched = arm(vec![UPPER], |ik| ik.stretch = true);
    solve(&mut stretched, 10.0, 0.0);
    assert_approx(stretched.bones[UPPER].world_scale_x(), 2.0);

    let mut compressed = arm(vec![UPPER], |ik| {
        ik.compress = true;
        ik.uniform = true;
    });
    solve(&mut compressed, 2.5, 0.0);
    assert_approx(compressed.bones[UPPER].world_scale_x(), 0.5);
    assert_approx(compressed.bones[UPPER].world_scale_y(), 0.5);
}

#[test]
fn mix_blends_between_pose_and_solution() {
    let mut skeleton = arm(vec![UPPER], |ik| ik.mix = 0.5);
    solve(&mut skeleton, 0.0, 3.0);
    assert_approx(skeleton.bones[UPPER].world_rotation_x(), 45.0);

    skeleton.ik_constraints[0].mix = 0.0;
    skeleton.update_world_transform(Physics::None);
    assert_approx(skeleton.bones[UPPER].world_rotation_x(), 0.0);
}

#[test]
fn child_at_parent_origin_falls_back_to_one_bone() {
    let mut skeleton = arm(vec![UPPER, LOWER], |_| {});
    skeleton.bones[LOWER].x = 0.0;
    solve(&mut skeleton, 0.0, 4.0);
    assert_approx(skeleton.bones[UPPER].world_rotation_x(), 90.0);
    assert!(skeleton.bones[LOWER].a.is_finite());
}
