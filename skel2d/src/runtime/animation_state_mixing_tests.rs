use crate::{
    Animation, AnimationState, AnimationStateData, AnimationStateEvent, BoneData, BoneTimeline,
    Skeleton, SkeletonData, Timeline, TrackEntrySnapshot,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-3,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

const ARM: usize = 1;
const HAND: usize = 2;

fn rotate(bone: usize, degrees: f32) -> Timeline {
    let mut timeline = BoneTimeline::new(bone, 1, 1);
    timeline.frames.set_frame(0, 0.0, &[degrees]).unwrap();
    Timeline::Rotate(timeline)
}

/// "up" and "down" key the arm, "wave" keys only the hand. Crossfades take half a second.
fn rig() -> (Skeleton, AnimationState) {
    let data = Arc::new(SkeletonData {
        bones: vec![
            BoneData::new(0, "root", None),
            BoneData::new(ARM, "arm", Some(0)),
            BoneData::new(HAND, "hand", Some(ARM)),
        ],
        animations: vec![
            Arc::new(Animation::new("up", vec![rotate(ARM, 90.0)], 1.0)),
            Arc::new(Animation::new("down", vec![rotate(ARM, -45.0)], 1.0)),
            Arc::new(Animation::new("wave", vec![rotate(HAND, 30.0)], 1.0)),
        ],
        ..SkeletonData::default()
    });
    let skeleton = Skeleton::try_new(Arc::clone(&data)).unwrap();
    let mut state_data = AnimationStateData::new(data);
    state_data.default_mix = 0.5;
    (skeleton, AnimationState::new(state_data))
}

fn arm(skeleton: &Skeleton) -> f32 {
    skeleton.bones[ARM].rotation
}

fn mixing_from_name(state: &AnimationState) -> Option<String> {
    let from = state.with_track_entry(0, |entry| entry.mixing_from())??;
    state
        .track_entry(from)
        .map(|entry| entry.animation.name.clone())
}

#[test]
fn crossfade_blends_both_animations() {
    let (mut skeleton, mut state) = rig();
    state.set_animation(0, "up", false).unwrap();
    state.apply(&mut skeleton);
    assert_approx(arm(&skeleton), 90.0);

    state.set_animation(0, "down", false).unwrap();
    assert_eq!(mixing_from_name(&state).as_deref(), Some("up"));
    state.update(0.25);
    state.apply(&mut skeleton);
    assert_approx(arm(&skeleton), 22.5);
}

#[test]
fn mix_completes_on_the_update_after_reaching_its_duration() {
    let (mut skeleton, mut state) = rig();
    let ended = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&ended);
    state.set_listener(
        move |_: &mut AnimationState, entry: &TrackEntrySnapshot, event: &AnimationStateEvent| {
            if *event == AnimationStateEvent::End {
                sink.borrow_mut().push(entry.animation_name.clone());
            }
        },
    );
    state.set_animation(0, "up", false).unwrap();
    state.apply(&mut skeleton);
    let down = state.set_animation(0, "down", false).unwrap();

    state.update(0.5);
    assert!(mixing_from_name(&state).is_some());
    state.apply(&mut skeleton);
    assert_approx(arm(&skeleton), -45.0);
    assert!(ended.borrow().is_empty());

    state.update(0.0);
    assert_eq!(mixing_from_name(&state), None);
    assert_eq!(state.current(0), Some(down));
    assert_eq!(*ended.borrow(), vec!["up".to_string()]);
}

#[test]
fn mix_waits_for_the_incoming_entry_to_be_applied() {
    let (mut skeleton, mut state) = rig();
    state.set_animation(0, "up", false).unwrap();
    state.apply(&mut skeleton);
    state.set_animation(0, "down", false).unwrap();
    state.update(1.0);
    state.update(1.0);
    assert_eq!(mixing_from_name(&state).as_deref(), Some("up"));
}

#[test]
fn entry_that_was_never_applied_is_replaced_without_mixing() {
    let (mut skeleton, mut state) = rig();
    let up = state.set_animation(0, "up", false).unwrap();
    let down = state.set_animation(0, "down", false).unwrap();
    assert!(!up.is_valid(&state));
    assert_eq!(mixing_from_name(&state), None);
    assert_approx(state.track_entry(down).unwrap().mix_duration, 0.0);

    state.apply(&mut skeleton);
    assert_approx(arm(&skeleton), -45.0);
}

#[test]
fn unkeyed_bones_fade_to_setup_unless_held() {
    let (mut faded, mut state) = rig();
    state.set_animation(0, "up", false).unwrap();
    state.apply(&mut faded);
    state.set_animation(0, "wave", false).unwrap();
    state.update(0.25);
    state.apply(&mut faded);
    assert_approx(arm(&faded), 45.0);
    assert_approx(faded.bones[HAND].rotation, 15.0);

    let (mut held, mut state) = rig();
    state.set_animation(0, "up", false).unwrap();
    state.apply(&mut held);
    let wave = state.set_animation(0, "wave", false).unwrap();
    wave.set_hold_previous(&mut state, true);
    state.update(0.25);
    state.apply(&mut held);
    assert_approx(arm(&held), 90.0);
}

#[test]
fn empty_animation_mixes_back_to_the_setup_pose() {
    let (mut skeleton, mut state) = rig();
    state.set_animation(0, "up", false).unwrap();
    state.apply(&mut skeleton);

    let empty = state.set_empty_animation(0, 0.5).unwrap();
    assert!(state.track_entry(empty).unwrap().is_empty_animation());
    state.update(0.25);
    state.apply(&mut skeleton);
    assert_approx(arm(&skeleton), 45.0);

    state.update(0.25);
    state.apply(&mut skeleton);
    assert_approx(arm(&skeleton), 0.0);

    state.update(0.0);
    assert_eq!(mixing_from_name(&state), None);
    state.update(0.0);
    assert!(state.current(0).is_none());
}

#[test]
fn set_empty_animations_covers_every_track() {
    let (mut skeleton, mut state) = rig();
    state.set_animation(0, "up", true).unwrap();
    state.set_animation(2, "wave", true).unwrap();
    state.apply(&mut skeleton);
    state.set_empty_animations(0.0).unwrap();
    for track in [0, 2] {
        let current = state.current(track).unwrap();
        assert!(state.track_entry(current).unwrap().is_empty_animation());
    }
    assert!(state.current(1).is_none());
}

#[test]
fn interrupting_a_mix_keeps_its_progress() {
    let (mut skeleton, mut state) = rig();
    state.set_animation(0, "up", false).unwrap();
    state.apply(&mut skeleton);
    state.set_animation(0, "down", false).unwrap();
    state.update(0.25);
    state.apply(&mut skeleton);

    let wave = state.set_animation(0, "wave", false).unwrap();
    let entry = state.track_entry(wave).unwrap();
    assert_approx(entry.mix_time, 0.0);
    assert_eq!(mixing_from_name(&state).as_deref(), Some("down"));
    state.update(0.1);
    state.apply(&mut skeleton);
    assert!(arm(&skeleton).is_finite());
}
