use crate::{BoneData, Inherit, Physics, Skeleton, SkeletonData};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

/// root -> parent -> child, with `configure` editing the setup data.
fn chain(configure: impl FnOnce(&mut [BoneData])) -> Skeleton {
    let mut bones = vec![
        BoneData::new(0, "root", None),
        BoneData::new(1, "parent", Some(0)),
        BoneData::new(2, "child", Some(1)),
    ];
    configure(&mut bones);
    let data = SkeletonData {
        bones,
        ..SkeletonData::default()
    };
    let mut skeleton = Skeleton::try_new(Arc::new(data)).unwrap();
    skeleton.update_world_transform(Physics::None);
    skeleton
}

#[test]
fn child_of_identity_parent_is_translated_by_its_local_position() {
    let skeleton = chain(|bones| bones[2].x = 10.0);
    let child = &skeleton.bones[2];
    assert_approx(child.world_x, 10.0);
    assert_approx(child.world_y, 0.0);
    assert_approx(child.a, 1.0);
    assert_approx(child.b, 0.0);
    assert_approx(child.c, 0.0);
    assert_approx(child.d, 1.0);
}

#[test]
fn child_follows_parent_rotation_and_scale() {
    let skeleton = chain(|bones| {
        bones[1].rotation = 90.0;
        bones[1].scale_x = 2.0;
        bones[2].x = 10.0;
    });
    let child = &skeleton.bones[2];
    assert_approx(child.world_x, 0.0);
    assert_approx(child.world_y, 20.0);
    assert_approx(child.world_rotation_x(), 90.0);
    assert_approx(child.world_scale_x(), 2.0);
}

#[test]
fn only_translation_ignores_parent_rotation() {
    let skeleton = chain(|bones| {
        bones[1].rotation = 45.0;
        bones[2].x = 10.0;
        bones[2].inherit = Inherit::OnlyTranslation;
    });
    let child = &skeleton.bones[2];
    assert_approx(child.world_rotation_x(), 0.0);
    assert_approx(child.world_x, 10.0 * 45f32.to_radians().cos());
}

#[test]
fn no_scale_keeps_unit_world_scale() {
    let skeleton = chain(|bones| {
        bones[1].scale_x = 3.0;
        bones[1].scale_y = 3.0;
        bones[2].inherit = Inherit::NoScale;
    });
    let child = &skeleton.bones[2];
    assert_approx(child.world_scale_x(), 1.0);
    assert_approx(child.world_scale_y(), 1.0);
}

#[test]
fn no_rotation_keeps_world_rotation_local() {
    let skeleton = chain(|bones| {
        bones[1].rotation = 60.0;
        bones[2].rotation = 10.0;
        bones[2].inherit = Inherit::NoRotationOrReflection;
    });
    assert_approx(skeleton.bones[2].world_rotation_x(), 10.0);
}

#[test]
fn world_and_local_conversions_round_trip() {
    let skeleton = chain(|bones| {
        bones[1].x = 5.0;
        bones[1].rotation = 30.0;
        bones[1].scale_x = 1.5;
        bones[2].x = 7.0;
        bones[2].rotation = -20.0;
    });
    let child = &skeleton.bones[2];
    let (wx, wy) = child.local_to_world(3.0, -4.0);
    let (lx, ly) = child.world_to_local(wx, wy);
    assert_approx(lx, 3.0);
    assert_approx(ly, -4.0);

    let world = child.local_to_world_rotation(15.0);
    assert_approx(child.world_to_local_rotation(world), 15.0);
}

#[test]
fn applied_transform_is_recovered_from_the_world_transform() {
    let mut skeleton = chain(|bones| {
        bones[1].rotation = 30.0;
        bones[2].x = 4.0;
        bones[2].rotation = 10.0;
        bones[2].scale_x = 2.0;
    });
    skeleton.bones[2].rotate_world(25.0);
    skeleton.update_bone_applied(2);
    let child = &skeleton.bones[2];
    assert_approx(child.ax, 4.0);
    assert_approx(child.arotation, 35.0);
    assert_approx(child.ascale_x, 2.0);
    assert_approx(child.ascale_y, 1.0);
}

#[test]
fn y_down_flips_the_vertical_axis() {
    let mut skeleton = chain(|bones| bones[2].y = 10.0);
    skeleton.set_y_down(true);
    skeleton.update_world_transform(Physics::None);
    assert_approx(skeleton.bones[2].world_y, -10.0);
    assert_approx(skeleton.bones[2].d, -1.0);
}

#[test]
fn skeleton_placement_moves_root_bones() {
    let mut skeleton = chain(|bones| bones[2].x = 1.0);
    skeleton.x = 100.0;
    skeleton.y = 50.0;
    skeleton.scale_x = 2.0;
    skeleton.update_world_transform(Physics::None);
    assert_approx(skeleton.bones[2].world_x, 102.0);
    assert_approx(skeleton.bones[2].world_y, 50.0);
}
