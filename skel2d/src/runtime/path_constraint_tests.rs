use crate::{
    Attachment, BoneData, PathAttachment, PathConstraintData, Physics, PositionMode,
    RegionAttachment, RotateMode, Skeleton, SkeletonData, Skin, SlotData, VertexData,
};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-3,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

const FIRST: usize = 1;
const SECOND: usize = 2;

/// An open path with one curve whose anchors and handles are the four given points.
fn path(points: [(f32, f32); 4], constant_speed: bool) -> Attachment {
    let [p0, p1, p2, p3] = points;
    // The leading handle of the first anchor and the trailing handle of the last are unused
    // by open paths.
    let vertices = [
        p0.0, p0.1, p0.0, p0.1, p1.0, p1.1, p2.0, p2.1, p3.0, p3.1, p3.0, p3.1,
    ];
    let length = (p3.0 - p0.0).hypot(p3.1 - p0.1);
    let mut path = PathAttachment::new("path", VertexData::unweighted(&vertices), vec![length]);
    path.constant_speed = constant_speed;
    Attachment::Path(path)
}

/// A vertical straight path of length 30 from the origin.
fn vertical(constant_speed: bool) -> Attachment {
    path(
        [(0.0, 0.0), (0.0, 10.0), (0.0, 20.0), (0.0, 30.0)],
        constant_speed,
    )
}

/// root with two chained 10-long bones, and a root slot showing `attachment`.
fn rig(
    attachment: Attachment,
    bones: Vec<usize>,
    configure: impl FnOnce(&mut PathConstraintData),
) -> Skeleton {
    let mut first = BoneData::new(FIRST, "first", Some(0));
    first.length = 10.0;
    let mut second = BoneData::new(SECOND, "second", Some(FIRST));
    second.x = 10.0;
    second.length = 10.0;

    let name = attachment.name().to_string();
    let mut slot = SlotData::new(0, "path", 0);
    slot.attachment_name = Some(name.clone());
    let mut skin = Skin::new("default");
    skin.set_attachment(0, &name, Arc::new(attachment));

    let mut constraint = PathConstraintData::new("follow", bones, 0);
    configure(&mut constraint);
    let data = SkeletonData {
        bones: vec![BoneData::new(0, "root", None), first, second],
        slots: vec![slot],
        skins: vec![skin],
        default_skin: Some(0),
        path_constraints: vec![constraint],
        ..SkeletonData::default()
    };
    let mut skeleton = Skeleton::try_new(Arc::new(data)).unwrap();
    skeleton.update_world_transform(Physics::None);
    skeleton
}

#[test]
fn percent_position_places_the_bone_along_the_path() {
    let skeleton = rig(vertical(true), vec![FIRST], |c| c.position = 0.5);
    let bone = &skeleton.bones[FIRST];
    assert_approx(bone.world_x, 0.0);
    assert_approx(bone.world_y, 15.0);
    assert_approx(bone.world_rotation_x(), 90.0);
}

#[test]
fn fixed_position_is_measured_in_world_units() {
    let skeleton = rig(vertical(true), vec![FIRST], |c| {
        c.position_mode = PositionMode::Fixed;
        c.position = 6.0;
    });
    assert_approx(skeleton.bones[FIRST].world_y, 6.0);
}

#[test]
fn position_past_the_end_extrapolates_in_a_straight_line() {
    let skeleton = rig(vertical(true), vec![FIRST], |c| {
        c.position_mode = PositionMode::Fixed;
        c.position = 40.0;
    });
    let bone = &skeleton.bones[FIRST];
    assert_approx(bone.world_x, 0.0);
    assert_approx(bone.world_y, 40.0);
}

#[test]
fn chain_mode_lays_bones_end_to_end() {
    let skeleton = rig(vertical(true), vec![FIRST, SECOND], |c| {
        c.rotate_mode = RotateMode::Chain;
    });
    let (first, second) = (&skeleton.bones[FIRST], &skeleton.bones[SECOND]);
    assert_approx(first.world_y, 0.0);
    assert_approx(first.world_rotation_x(), 90.0);
    assert_approx(second.world_x, 0.0);
    assert_approx(second.world_y, 10.0);
    assert_approx(second.world_rotation_x(), 90.0);
    let (x, y) = second.local_to_world(10.0, 0.0);
    assert_approx(x, 0.0);
    assert_approx(y, 20.0);
}

#[test]
fn zero_mixes_leave_bones_in_place() {
    let skeleton = rig(vertical(true), vec![FIRST], |c| {
        c.position = 0.5;
        c.mix_rotate = 0.0;
        c.mix_x = 0.0;
        c.mix_y = 0.0;
    });
    let bone = &skeleton.bones[FIRST];
    assert_approx(bone.world_y, 0.0);
    assert_approx(bone.world_rotation_x(), 0.0);
}

#[test]
fn constant_speed_measures_arc_length() {
    // All three leading points coincide, so the curve moves slowly at first.
    let eased = [(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, 30.0)];

    let parametric = rig(path(eased, false), vec![FIRST], |c| c.position = 0.5);
    assert_approx(parametric.bones[FIRST].world_y, 3.75);

    let constant = rig(path(eased, true), vec![FIRST], |c| c.position = 0.5);
    let y = constant.bones[FIRST].world_y;
    assert!((y - 15.0).abs() < 0.1, "expected about 15, got {y}");
}

#[test]
fn target_slot_without_a_path_is_skipped() {
    let region = Attachment::Region(RegionAttachment::new("path", 4.0, 4.0));
    let skeleton = rig(region, vec![FIRST], |c| c.position = 0.5);
    let bone = &skeleton.bones[FIRST];
    assert!(skeleton.path_constraints[0].is_active());
    assert_approx(bone.world_y, 0.0);
    assert_approx(bone.world_rotation_x(), 0.0);
}
