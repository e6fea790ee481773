use crate::{BEZIER_SIZE, Curve, CurveFrames, Error};

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-4,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

fn two_keys(v0: f32, v1: f32) -> CurveFrames {
    let mut frames = CurveFrames::new(2, 2);
    frames.set_frame(0, 0.0, &[v0]).unwrap();
    frames.set_frame(1, 1.0, &[v1]).unwrap();
    frames
}

#[test]
fn linear_segment_hits_endpoints_and_midpoint() {
    let frames = two_keys(2.0, 6.0);
    assert_approx(frames.curve_value(0.0, 0), 2.0);
    assert_approx(frames.curve_value(0.5, 0), 4.0);
    assert_approx(frames.curve_value(1.0, 0), 6.0);
    assert_approx(frames.curve_value(3.0, 0), 6.0);
}

#[test]
fn stepped_segment_holds_the_first_value() {
    let mut frames = two_keys(2.0, 6.0);
    frames.set_stepped(0);
    assert_approx(frames.curve_value(0.99, 0), 2.0);
    assert_approx(frames.curve_value(1.0, 0), 6.0);
}

#[test]
fn bezier_with_linear_handles_is_monotonic_and_exact_at_keys() {
    for (v0, v1) in [(0.0, 10.0), (5.0, -3.0)] {
        let mut frames = two_keys(v0, v1);
        frames
            .set_curve(
                0,
                Curve::Bezier {
                    cx1: 1.0 / 3.0,
                    cy1: 1.0 / 3.0,
                    cx2: 2.0 / 3.0,
                    cy2: 2.0 / 3.0,
                },
            )
            .unwrap();
        assert_eq!(frames.curve_value(0.0, 0), v0);
        assert_eq!(frames.curve_value(1.0, 0), v1);

        let direction = (v1 - v0).signum();
        let mut previous = v0;
        for step in 1..=100 {
            let t = step as f32 / 100.0;
            let value = frames.curve_value(t, 0);
            assert!(
                (value - previous) * direction >= -1.0e-5,
                "not monotonic at {t}: {previous} -> {value}"
            );
            assert!(value.min(v0.min(v1)) >= v0.min(v1) - 1.0e-4);
            assert!(value.max(v0.max(v1)) <= v0.max(v1) + 1.0e-4);
            assert_approx(value, v0 + (v1 - v0) * t);
            previous = value;
        }
    }
}

#[test]
fn ease_in_bezier_lags_behind_linear() {
    let mut frames = two_keys(0.0, 1.0);
    frames
        .set_curve(
            0,
            Curve::Bezier {
                cx1: 0.5,
                cy1: 0.0,
                cx2: 1.0,
                cy2: 1.0,
            },
        )
        .unwrap();
    assert!(frames.curve_value(0.5, 0) < 0.4);
    assert_eq!(frames.curves().len(), 2 + BEZIER_SIZE);
}

#[test]
fn search_returns_last_frame_not_after_time() {
    let mut frames = CurveFrames::new(2, 4);
    for (i, t) in [0.0, 0.5, 1.0, 2.0].into_iter().enumerate() {
        frames.set_frame(i, t, &[i as f32]).unwrap();
    }
    assert_eq!(frames.search(-1.0), 0);
    assert_eq!(frames.search(0.0), 0);
    assert_eq!(frames.search(0.75), 1);
    assert_eq!(frames.search(1.0), 2);
    assert_eq!(frames.search(10.0), 3);
    assert_approx(frames.duration(), 2.0);
}

#[test]
fn multi_value_frames_interpolate_each_value() {
    let mut frames = CurveFrames::new(3, 2);
    frames.set_frame(0, 0.0, &[0.0, 10.0]).unwrap();
    frames.set_frame(1, 2.0, &[4.0, 20.0]).unwrap();
    assert_approx(frames.curve_value(1.0, 0), 2.0);
    assert_approx(frames.curve_value(1.0, 1), 15.0);
}

#[test]
fn curve_percent_uses_unit_value_space() {
    let mut frames = CurveFrames::new(1, 2);
    frames.set_frame(0, 0.0, &[]).unwrap();
    frames.set_frame(1, 4.0, &[]).unwrap();
    assert_approx(frames.curve_percent(1.0, 0), 0.25);
    frames.set_stepped(0);
    assert_approx(frames.curve_percent(3.0, 0), 0.0);
}

#[test]
fn malformed_keyframes_are_rejected() {
    let mut frames = CurveFrames::new(3, 2);
    assert!(matches!(
        frames.set_frame(2, 0.0, &[0.0, 0.0]),
        Err(Error::InvalidData { .. })
    ));
    assert!(matches!(
        frames.set_frame(0, 0.0, &[0.0]),
        Err(Error::InvalidData { .. })
    ));
    assert!(matches!(
        frames.set_bezier(0, 1, 0.0, 0.0, 0.3, 0.3, 0.6, 0.6, 1.0, 1.0),
        Err(Error::InvalidData { .. })
    ));
    assert!(matches!(
        frames.set_curve(
            1,
            Curve::Bezier {
                cx1: 0.0,
                cy1: 0.0,
                cx2: 1.0,
                cy2: 1.0
            }
        ),
        Err(Error::InvalidData { .. })
    ));
}
