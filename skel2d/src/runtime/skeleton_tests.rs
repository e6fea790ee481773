use crate::{
    Attachment, Bone, BoneData, Color, Error, IkConstraintData, Physics, RegionAttachment,
    Skeleton, SkeletonData, Skin, SlotData,
};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn region(name: &str, width: f32, height: f32) -> Arc<Attachment> {
    Arc::new(Attachment::Region(RegionAttachment::new(name, width, height)))
}

/// A root, an arm and a skin-only tail, with one slot on the arm.
fn rig_data() -> SkeletonData {
    let mut arm = BoneData::new(1, "arm", Some(0));
    arm.x = 5.0;
    arm.rotation = 20.0;
    let mut tail = BoneData::new(2, "tail", Some(0));
    tail.skin_required = true;

    let mut slot = SlotData::new(0, "arm", 1);
    slot.attachment_name = Some("arm".to_string());
    slot.color = Color::new(1.0, 0.5, 0.5, 1.0);

    let mut default_skin = Skin::new("default");
    default_skin.set_attachment(0, "arm", region("arm", 10.0, 20.0));
    let mut armored = Skin::new("armored");
    armored.set_attachment(0, "arm", region("arm-armored", 12.0, 22.0));
    armored.bones.push(2);
    armored.ik_constraints.push(0);

    let mut ik = IkConstraintData::new("tail-ik", vec![2], 1);
    ik.skin_required = true;

    SkeletonData {
        bones: vec![BoneData::new(0, "root", None), arm, tail],
        slots: vec![slot],
        skins: vec![default_skin, armored],
        default_skin: Some(0),
        ik_constraints: vec![ik],
        ..SkeletonData::default()
    }
}

fn rig() -> Skeleton {
    Skeleton::try_new(Arc::new(rig_data())).unwrap()
}

fn attachment_name(skeleton: &Skeleton, slot: usize) -> Option<&str> {
    skeleton.slots[slot].attachment().map(|a| a.name())
}

#[test]
fn new_skeleton_starts_in_the_setup_pose() {
    let skeleton = rig();
    assert_eq!(attachment_name(&skeleton, 0), Some("arm"));
    assert_eq!(skeleton.slots[0].color, Color::new(1.0, 0.5, 0.5, 1.0));
    assert_eq!(skeleton.draw_order, vec![0]);
    assert!(!skeleton.bones[2].is_active());
    assert!(!skeleton.ik_constraints[0].is_active());
}

#[test]
fn setup_pose_is_idempotent() {
    let mut skeleton = rig();
    skeleton.bones[1].rotation = 90.0;
    skeleton.bones[1].scale_x = 3.0;
    skeleton.slots[0].color = Color::BLACK;
    skeleton.slots[0].set_attachment(None);
    skeleton.ik_constraints[0].mix = 0.2;

    skeleton.set_to_setup_pose();
    let once = (
        format!("{:?}", skeleton.bones),
        format!("{:?}", skeleton.slots),
        format!("{:?}", skeleton.ik_constraints),
        skeleton.draw_order.clone(),
    );
    skeleton.set_to_setup_pose();
    let twice = (
        format!("{:?}", skeleton.bones),
        format!("{:?}", skeleton.slots),
        format!("{:?}", skeleton.ik_constraints),
        skeleton.draw_order.clone(),
    );
    assert_eq!(once, twice);
    assert_approx(skeleton.bones[1].rotation, 20.0);
    assert_eq!(attachment_name(&skeleton, 0), Some("arm"));
}

#[test]
fn skin_switch_swaps_attachments_and_activates_skin_bones() {
    let mut skeleton = rig();
    skeleton.set_skin_by_name("armored").unwrap();
    assert_eq!(attachment_name(&skeleton, 0), Some("arm-armored"));
    assert!(skeleton.bones[2].is_active());
    assert!(skeleton.ik_constraints[0].is_active());

    skeleton.set_skin(Some(0));
    assert_eq!(attachment_name(&skeleton, 0), Some("arm"));
    assert!(!skeleton.bones[2].is_active());

    assert!(matches!(
        skeleton.set_skin_by_name("missing"),
        Err(Error::UnknownSkin { .. })
    ));
}

#[test]
fn set_attachment_reports_unknown_names() {
    let mut skeleton = rig();
    skeleton.set_attachment("arm", None).unwrap();
    assert_eq!(attachment_name(&skeleton, 0), None);
    skeleton.set_attachment("arm", Some("arm")).unwrap();
    assert_eq!(attachment_name(&skeleton, 0), Some("arm"));

    assert!(matches!(
        skeleton.set_attachment("leg", Some("arm")),
        Err(Error::UnknownSlot { .. })
    ));
    assert!(matches!(
        skeleton.set_attachment("arm", Some("wing")),
        Err(Error::UnknownAttachment { .. })
    ));
}

#[test]
fn inactive_bones_are_not_updated() {
    let mut skeleton = rig();
    skeleton.bones[2].x = 40.0;
    skeleton.update_world_transform(Physics::None);
    assert_approx(skeleton.bones[2].world_x, 0.0);

    skeleton.set_skin(Some(1));
    skeleton.update_world_transform(Physics::None);
    assert_approx(skeleton.bones[2].world_x, 40.0);
}

#[test]
fn bounds_cover_visible_regions() {
    let mut skeleton = rig();
    skeleton.bones[1].rotation = 0.0;
    skeleton.update_world_transform(Physics::None);
    let mut scratch = Vec::new();
    let bounds = skeleton.bounds(&mut scratch).unwrap();
    assert_approx(bounds.x, 0.0);
    assert_approx(bounds.y, -10.0);
    assert_approx(bounds.width, 10.0);
    assert_approx(bounds.height, 20.0);

    skeleton.slots[0].set_attachment(None);
    assert!(skeleton.bounds(&mut scratch).is_none());
}

#[test]
fn skeleton_can_be_parented_to_a_bone_of_another_skeleton() {
    let mut skeleton = rig();
    skeleton.bones[1].rotation = 0.0;

    let mut host = Bone::new(&BoneData::new(0, "host", None));
    host.world_x = 50.0;
    host.a = 0.0;
    host.b = -1.0;
    host.c = 1.0;
    host.d = 0.0;

    skeleton.update_world_transform_with_parent(Physics::None, &host);
    let arm = &skeleton.bones[1];
    assert_approx(arm.world_x, 50.0);
    assert_approx(arm.world_y, 5.0);
    assert_approx(arm.world_rotation_x(), 90.0);
}

#[test]
fn update_advances_physics_time() {
    let mut skeleton = rig();
    skeleton.update(0.25);
    skeleton.update(0.25);
    assert_approx(skeleton.time, 0.5);
}
