use crate::{
    BoneData, ClippingAttachment, Physics, Skeleton, SkeletonClipping, SkeletonData, SlotData,
    Triangulator, VertexData,
};
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 0.001,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn assert_all_approx(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (&a, &e) in actual.iter().zip(expected) {
        assert_approx(a, e);
    }
}

const SQUARE: [f32; 8] = [0.0, 0.0, 100.0, 0.0, 100.0, 100.0, 0.0, 100.0];

#[test]
fn triangulator_splits_a_rectangle_into_one_convex_piece() {
    let mut triangulator = Triangulator::default();
    let triangles = triangulator.triangulate(&SQUARE).to_vec();
    assert_eq!(triangles, vec![3, 0, 1, 3, 1, 2]);

    let polygons = triangulator.decompose(&SQUARE, &triangles);
    assert_eq!(polygons.len(), 1);
    assert_all_approx(&polygons[0], &[0.0, 100.0, 0.0, 0.0, 100.0, 0.0, 100.0, 100.0]);
}

#[test]
fn triangulator_decomposes_a_concave_polygon() {
    // Clockwise, as the clipper hands polygons to the triangulator.
    let l_shape = [
        0.0, 100.0, 50.0, 100.0, 50.0, 50.0, 100.0, 50.0, 100.0, 0.0, 0.0, 0.0,
    ];
    let mut triangulator = Triangulator::default();
    let triangles = triangulator.triangulate(&l_shape).to_vec();
    assert_eq!(triangles.len(), 12);
    assert!(triangles.iter().all(|&i| i < 6));

    let polygons = triangulator.decompose(&l_shape, &triangles);
    assert!(polygons.len() >= 2, "{polygons:?}");
    let points: usize = polygons.iter().map(|p| p.len() / 2).sum();
    assert!(points >= 6);
}

#[test]
fn clipping_cuts_a_triangle_crossing_the_clip_polygon() {
    let mut clipper = SkeletonClipping::new();
    assert_eq!(
        clipper.clip_start_polygon(&[0.0, 50.0, 100.0, 50.0, 100.0, 70.0, 0.0, 70.0]),
        1
    );
    assert!(clipper.is_clipping());

    let vertices = [0.0, 0.0, 100.0, 0.0, 50.0, 150.0];
    let uvs = [0.0, 0.0, 1.0, 0.0, 0.5, 1.0];
    assert!(clipper.clip_triangles(&vertices, &[0, 1, 2], &uvs, 2));

    assert_all_approx(
        clipper.clipped_vertices(),
        &[83.333328, 50.0, 76.666664, 70.0, 23.333334, 70.0, 16.666672, 50.0],
    );
    assert_all_approx(
        clipper.clipped_uvs(),
        &[0.833333, 0.333333, 0.766667, 0.466667, 0.233333, 0.466667, 0.166667, 0.333333],
    );
    assert_eq!(clipper.clipped_triangles(), &[0, 1, 2, 0, 2, 3]);
}

#[test]
fn triangle_inside_the_clip_polygon_is_unchanged() {
    let mut clipper = SkeletonClipping::new();
    clipper.clip_start_polygon(&SQUARE);

    let vertices = [10.0, 10.0, 50.0, 10.0, 30.0, 40.0];
    let uvs = [0.0, 0.0, 1.0, 0.0, 0.5, 1.0];
    assert!(!clipper.clip_triangles(&vertices, &[0, 1, 2], &uvs, 2));
    assert_eq!(clipper.clipped_vertices(), &vertices);
    assert_eq!(clipper.clipped_uvs(), &uvs);
    assert_eq!(clipper.clipped_triangles(), &[0, 1, 2]);
}

#[test]
fn clipped_indices_wrap_past_the_u16_range() {
    let mut clipper = SkeletonClipping::new();
    clipper.clip_start_polygon(&SQUARE);

    let vertices = [10.0, 10.0, 50.0, 10.0, 30.0, 40.0];
    let uvs = [0.0, 0.0, 1.0, 0.0, 0.5, 1.0];
    let copies = 21_846;
    let triangles: Vec<u16> = [0, 1, 2].repeat(copies);
    assert!(!clipper.clip_triangles(&vertices, &triangles, &uvs, 2));

    let clipped = clipper.clipped_triangles();
    assert_eq!(clipped.len(), copies * 3);
    assert_eq!(&clipped[clipped.len() - 6..], &[65532, 65533, 65534, 65535, 0, 1]);
    assert_eq!(clipper.clipped_vertices().len(), copies * 6);
}

#[test]
fn triangle_outside_the_clip_polygon_is_dropped() {
    let mut clipper = SkeletonClipping::new();
    clipper.clip_start_polygon(&SQUARE);

    let vertices = [200.0, 200.0, 250.0, 200.0, 220.0, 250.0];
    let uvs = [0.0, 0.0, 1.0, 0.0, 0.5, 1.0];
    assert!(clipper.clip_triangles(&vertices, &[0, 1, 2], &uvs, 2));
    assert!(clipper.clipped_vertices().is_empty());
    assert!(clipper.clipped_triangles().is_empty());
}

#[test]
fn triangle_in_the_notch_of_a_concave_clip_is_dropped() {
    let mut clipper = SkeletonClipping::new();
    let pieces = clipper.clip_start_polygon(&[
        0.0, 0.0, 100.0, 0.0, 100.0, 50.0, 50.0, 50.0, 50.0, 100.0, 0.0, 100.0,
    ]);
    assert!(pieces >= 2);

    let vertices = [60.0, 60.0, 90.0, 60.0, 75.0, 90.0];
    let uvs = [0.0; 6];
    clipper.clip_triangles(&vertices, &[0, 1, 2], &uvs, 2);
    assert!(clipper.clipped_triangles().is_empty());
}

#[test]
fn interleaved_vertices_use_the_stride() {
    let mut clipper = SkeletonClipping::new();
    clipper.clip_start_polygon(&SQUARE);

    // x, y, then two unrelated floats per vertex.
    let vertices = [
        10.0, 10.0, -1.0, -1.0, 50.0, 10.0, -1.0, -1.0, 30.0, 40.0, -1.0, -1.0,
    ];
    let uvs = [0.0, 0.0, 1.0, 0.0, 0.5, 1.0];
    assert!(!clipper.clip_triangles(&vertices, &[0, 1, 2], &uvs, 4));
    assert_eq!(
        clipper.clipped_vertices(),
        &[10.0, 10.0, 50.0, 10.0, 30.0, 40.0]
    );
}

#[test]
fn degenerate_clip_polygons_do_not_start_clipping() {
    let mut clipper = SkeletonClipping::new();
    assert_eq!(clipper.clip_start_polygon(&[0.0, 0.0, 1.0, 1.0]), 0);
    assert!(!clipper.is_clipping());
}

#[test]
fn clip_attachment_follows_its_bone_and_ends_at_the_end_slot() {
    let mut root = BoneData::new(0, "root", None);
    root.x = 100.0;
    let data = SkeletonData {
        bones: vec![root],
        slots: vec![
            SlotData::new(0, "clip", 0),
            SlotData::new(1, "body", 0),
            SlotData::new(2, "after", 0),
        ],
        ..SkeletonData::default()
    };
    let mut skeleton = Skeleton::try_new(Arc::new(data)).unwrap();
    skeleton.update_world_transform(Physics::None);

    let mut clip = ClippingAttachment::new(
        "clip",
        VertexData::unweighted(&[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]),
    );
    clip.end_slot = Some(1);

    let mut clipper = SkeletonClipping::new();
    assert_eq!(clipper.clip_start(&skeleton, 0, &clip), 1);
    // A second clip cannot start while one is active.
    assert_eq!(clipper.clip_start(&skeleton, 0, &clip), 0);

    let vertices = [101.0, 1.0, 105.0, 1.0, 103.0, 5.0];
    let uvs = [0.0; 6];
    assert!(!clipper.clip_triangles(&vertices, &[0, 1, 2], &uvs, 2));
    assert_eq!(clipper.clipped_triangles(), &[0, 1, 2]);

    let local = [1.0, 1.0, 5.0, 1.0, 3.0, 5.0];
    assert!(clipper.clip_triangles(&local, &[0, 1, 2], &uvs, 2));
    assert!(clipper.clipped_triangles().is_empty());

    clipper.clip_end_with_slot(0);
    assert!(clipper.is_clipping());
    clipper.clip_end_with_slot(1);
    assert!(!clipper.is_clipping());
}
