use super::animation::{
    ANIMATION_STATE_CURRENT, ANIMATION_STATE_SETUP, set_attachment_by_name,
};
use crate::math::signum;
use crate::{
    Animation, AttachmentTimeline, Bone, BoneTimeline, Error, Event, MixBlend, MixDirection,
    PropertyId, Skeleton, SkeletonData, Timeline,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

const EMPTY_ANIMATION_NAME: &str = "<empty>";

/// How a timeline of a track entry is applied while mixing, decided from which other entries
/// key the same properties.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum TimelineMode {
    /// A lower track or earlier timeline already keys the property; blend on top of it.
    Subsequent,
    /// First to key the property; mix from the setup pose.
    First,
    /// Like `Subsequent`, but held at full alpha while the next entry mixes in.
    HoldSubsequent,
    /// Like `First`, held at full alpha because the next entry also keys the property.
    HoldFirst,
    /// Held, then faded out as a later entry that does not key the property mixes in.
    HoldMix,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
struct EntryId {
    index: usize,
    generation: u32,
}

struct EntrySlot {
    generation: u32,
    entry: Option<TrackEntry>,
}

/// Crossfade durations between pairs of animations, with a default for unlisted pairs.
#[derive(Clone, Debug)]
pub struct AnimationStateData {
    pub skeleton_data: Arc<SkeletonData>,
    pub default_mix: f32,
    mixes: HashMap<String, HashMap<String, f32>>,
}

impl AnimationStateData {
    pub fn new(skeleton_data: Arc<SkeletonData>) -> Self {
        Self {
            skeleton_data,
            default_mix: 0.0,
            mixes: HashMap::new(),
        }
    }

    pub fn set_mix(&mut self, from: &str, to: &str, duration: f32) -> Result<(), Error> {
        check_mix_duration(duration)?;
        for name in [from, to] {
            if self.skeleton_data.find_animation(name).is_none() {
                return Err(Error::UnknownAnimation {
                    name: name.to_string(),
                });
            }
        }
        self.mixes
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), duration);
        Ok(())
    }

    /// The crossfade duration from `from` to `to`.
    pub fn mix(&self, from: &Animation, to: &Animation) -> f32 {
        self.mixes
            .get(&from.name)
            .and_then(|targets| targets.get(&to.name))
            .copied()
            .unwrap_or(self.default_mix)
    }
}

fn check_mix_duration(duration: f32) -> Result<(), Error> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(Error::invalid_value("mix duration must be finite and >= 0"));
    }
    Ok(())
}

/// One animation queued or playing on a track. Owned by the [`AnimationState`]; modify it
/// through its [`TrackEntryHandle`].
pub struct TrackEntry {
    pub track_index: usize,
    pub animation: Arc<Animation>,
    pub looped: bool,
    pub hold_previous: bool,
    pub reverse: bool,
    pub shortest_rotation: bool,

    /// Seconds to wait before this entry becomes current, counted on the previous entry's
    /// track time.
    pub delay: f32,
    pub track_time: f32,
    pub track_end: f32,
    pub time_scale: f32,
    pub alpha: f32,
    pub mix_time: f32,
    pub mix_duration: f32,
    pub mix_blend: MixBlend,

    pub event_threshold: f32,
    pub alpha_attachment_threshold: f32,
    pub mix_attachment_threshold: f32,
    pub mix_draw_order_threshold: f32,

    pub animation_start: f32,
    pub animation_end: f32,
    pub animation_last: f32,

    next_animation_last: f32,
    track_last: f32,
    next_track_last: f32,
    interrupt_alpha: f32,
    total_alpha: f32,
    empty: bool,

    previous: Option<EntryId>,
    mixing_from: Option<EntryId>,
    mixing_to: Option<EntryId>,
    timeline_mode: Vec<TimelineMode>,
    timeline_hold_mix: Vec<Option<EntryId>>,
    timelines_rotation: Vec<f32>,
    listener: Option<Box<dyn TrackEntryListener>>,
}

impl std::fmt::Debug for TrackEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackEntry")
            .field("track_index", &self.track_index)
            .field("animation", &self.animation.name)
            .field("looped", &self.looped)
            .field("delay", &self.delay)
            .field("track_time", &self.track_time)
            .field("track_end", &self.track_end)
            .field("time_scale", &self.time_scale)
            .field("alpha", &self.alpha)
            .field("mix_time", &self.mix_time)
            .field("mix_duration", &self.mix_duration)
            .field("mix_blend", &self.mix_blend)
            .field("mixing_from", &self.mixing_from)
            .field("mixing_to", &self.mixing_to)
            .finish_non_exhaustive()
    }
}

impl TrackEntry {
    fn new(
        track_index: usize,
        animation: Arc<Animation>,
        looped: bool,
        mix_duration: f32,
        empty: bool,
    ) -> Self {
        let animation_end = animation.duration;
        Self {
            track_index,
            animation,
            looped,
            hold_previous: false,
            reverse: false,
            shortest_rotation: false,
            delay: 0.0,
            track_time: 0.0,
            track_end: f32::MAX,
            time_scale: 1.0,
            alpha: 1.0,
            mix_time: 0.0,
            mix_duration,
            mix_blend: MixBlend::Replace,
            event_threshold: 0.0,
            alpha_attachment_threshold: 0.0,
            mix_attachment_threshold: 0.0,
            mix_draw_order_threshold: 0.0,
            animation_start: 0.0,
            animation_end,
            animation_last: -1.0,
            next_animation_last: -1.0,
            track_last: -1.0,
            next_track_last: -1.0,
            interrupt_alpha: 1.0,
            total_alpha: 0.0,
            empty,
            previous: None,
            mixing_from: None,
            mixing_to: None,
            timeline_mode: Vec::new(),
            timeline_hold_mix: Vec::new(),
            timelines_rotation: Vec::new(),
            listener: None,
        }
    }

    /// Track time mapped into `[animation_start, animation_end]`, wrapped when looping.
    pub fn animation_time(&self) -> f32 {
        if self.looped {
            let duration = self.animation_end - self.animation_start;
            if duration == 0.0 {
                return self.animation_start;
            }
            return self.track_time % duration + self.animation_start;
        }
        (self.track_time + self.animation_start).min(self.animation_end)
    }

    /// Track time at which the current loop (or the whole animation) completes.
    pub fn track_complete(&self) -> f32 {
        let duration = self.animation_end - self.animation_start;
        if duration != 0.0 {
            if self.looped {
                return duration * (1.0 + (self.track_time / duration).trunc());
            }
            if self.track_time < duration {
                return duration;
            }
        }
        self.track_time
    }

    pub fn is_complete(&self) -> bool {
        self.track_time >= self.animation_end - self.animation_start
    }

    /// False until the entry has been applied at least once.
    pub fn was_applied(&self) -> bool {
        self.next_track_last != -1.0
    }

    pub fn is_empty_animation(&self) -> bool {
        self.empty
    }

    /// The entry this one is crossfading from, if a mix is in progress.
    pub fn mixing_from(&self) -> Option<TrackEntryHandle> {
        self.mixing_from.map(|id| TrackEntryHandle { id })
    }

    /// The entry crossfading from this one.
    pub fn mixing_to(&self) -> Option<TrackEntryHandle> {
        self.mixing_to.map(|id| TrackEntryHandle { id })
    }

    /// The entry this one was queued after.
    pub fn previous(&self) -> Option<TrackEntryHandle> {
        self.previous.map(|id| TrackEntryHandle { id })
    }
}

/// Stable reference to a [`TrackEntry`]. Stale handles (entries that were disposed) are
/// ignored by every setter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackEntryHandle {
    id: EntryId,
}

impl TrackEntryHandle {
    fn with_entry_mut(&self, state: &mut AnimationState, f: impl FnOnce(&mut TrackEntry)) {
        if let Some(entry) = state.entry_mut(self.id) {
            f(entry);
        }
    }

    pub fn is_valid(&self, state: &AnimationState) -> bool {
        state.entry(self.id).is_some()
    }

    pub fn set_listener<L: TrackEntryListener + 'static>(
        &self,
        state: &mut AnimationState,
        listener: L,
    ) {
        self.with_entry_mut(state, |entry| {
            entry.listener = Some(Box::new(listener));
        });
    }

    pub fn clear_listener(&self, state: &mut AnimationState) {
        self.with_entry_mut(state, |entry| entry.listener = None);
    }

    pub fn set_looped(&self, state: &mut AnimationState, looped: bool) {
        self.with_entry_mut(state, |entry| entry.looped = looped);
    }

    pub fn set_track_time(&self, state: &mut AnimationState, track_time: f32) {
        self.with_entry_mut(state, |entry| entry.track_time = track_time);
    }

    pub fn set_track_end(&self, state: &mut AnimationState, track_end: f32) {
        self.with_entry_mut(state, |entry| entry.track_end = track_end);
    }

    pub fn set_delay(&self, state: &mut AnimationState, delay: f32) {
        self.with_entry_mut(state, |entry| entry.delay = delay);
    }

    pub fn set_time_scale(&self, state: &mut AnimationState, time_scale: f32) {
        self.with_entry_mut(state, |entry| entry.time_scale = time_scale);
    }

    pub fn set_alpha(&self, state: &mut AnimationState, alpha: f32) {
        self.with_entry_mut(state, |entry| entry.alpha = alpha);
    }

    pub fn set_mix_duration(&self, state: &mut AnimationState, mix_duration: f32) {
        self.with_entry_mut(state, |entry| entry.mix_duration = mix_duration);
    }

    /// Sets the mix duration and recomputes the start delay. A `delay <= 0` is relative to the
    /// previous entry's completion, as with [`AnimationState::add_animation`].
    pub fn set_mix_duration_with_delay(
        &self,
        state: &mut AnimationState,
        mix_duration: f32,
        delay: f32,
    ) {
        let previous_complete = state
            .entry(self.id)
            .and_then(|entry| entry.previous)
            .and_then(|previous| state.entry(previous))
            .map(TrackEntry::track_complete);
        self.with_entry_mut(state, |entry| {
            entry.mix_duration = mix_duration;
            entry.delay = if delay <= 0.0 {
                previous_complete.map_or(0.0, |complete| (delay + complete - mix_duration).max(0.0))
            } else {
                delay
            };
        });
    }

    pub fn set_mix_blend(&self, state: &mut AnimationState, mix_blend: MixBlend) {
        self.with_entry_mut(state, |entry| entry.mix_blend = mix_blend);
    }

    pub fn set_hold_previous(&self, state: &mut AnimationState, hold_previous: bool) {
        self.with_entry_mut(state, |entry| entry.hold_previous = hold_previous);
        state.animations_changed = true;
    }

    pub fn set_reverse(&self, state: &mut AnimationState, reverse: bool) {
        self.with_entry_mut(state, |entry| entry.reverse = reverse);
    }

    pub fn set_shortest_rotation(&self, state: &mut AnimationState, shortest_rotation: bool) {
        self.with_entry_mut(state, |entry| entry.shortest_rotation = shortest_rotation);
    }

    /// Forgets the rotation direction remembered for crossfades, so the next mix picks the
    /// shortest way again.
    pub fn reset_rotation_directions(&self, state: &mut AnimationState) {
        self.with_entry_mut(state, |entry| entry.timelines_rotation.clear());
    }

    pub fn set_event_threshold(&self, state: &mut AnimationState, threshold: f32) {
        self.with_entry_mut(state, |entry| entry.event_threshold = threshold);
    }

    pub fn set_alpha_attachment_threshold(&self, state: &mut AnimationState, threshold: f32) {
        self.with_entry_mut(state, |entry| entry.alpha_attachment_threshold = threshold);
    }

    pub fn set_mix_attachment_threshold(&self, state: &mut AnimationState, threshold: f32) {
        self.with_entry_mut(state, |entry| entry.mix_attachment_threshold = threshold);
    }

    pub fn set_mix_draw_order_threshold(&self, state: &mut AnimationState, threshold: f32) {
        self.with_entry_mut(state, |entry| entry.mix_draw_order_threshold = threshold);
    }

    pub fn set_animation_start(&self, state: &mut AnimationState, animation_start: f32) {
        self.with_entry_mut(state, |entry| entry.animation_start = animation_start);
    }

    pub fn set_animation_end(&self, state: &mut AnimationState, animation_end: f32) {
        self.with_entry_mut(state, |entry| entry.animation_end = animation_end);
    }

    pub fn set_animation_last(&self, state: &mut AnimationState, animation_last: f32) {
        self.with_entry_mut(state, |entry| {
            entry.animation_last = animation_last;
            entry.next_animation_last = animation_last;
        });
    }
}

/// What a listener learns about the entry an event belongs to.
#[derive(Clone, Debug)]
pub struct TrackEntrySnapshot {
    pub handle: TrackEntryHandle,
    pub track_index: usize,
    pub animation_name: String,
    pub track_time: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnimationStateEvent {
    /// The entry became current.
    Start,
    /// Another entry replaced this one as current.
    Interrupt,
    /// The entry is no longer current or mixed. `Dispose` follows immediately.
    End,
    /// The entry is freed; its handle goes stale after this callback.
    Dispose,
    /// A loop or the whole animation finished.
    Complete,
    Event(Event),
}

pub trait TrackEntryListener {
    fn on_event(
        &mut self,
        state: &mut AnimationState,
        entry: &TrackEntrySnapshot,
        event: &AnimationStateEvent,
    );
}

pub trait AnimationStateListener {
    fn on_event(
        &mut self,
        state: &mut AnimationState,
        entry: &TrackEntrySnapshot,
        event: &AnimationStateEvent,
    );
}

impl<F> TrackEntryListener for F
where
    F: FnMut(&mut AnimationState, &TrackEntrySnapshot, &AnimationStateEvent),
{
    fn on_event(
        &mut self,
        state: &mut AnimationState,
        entry: &TrackEntrySnapshot,
        event: &AnimationStateEvent,
    ) {
        self(state, entry, event)
    }
}

impl<F> AnimationStateListener for F
where
    F: FnMut(&mut AnimationState, &TrackEntrySnapshot, &AnimationStateEvent),
{
    fn on_event(
        &mut self,
        state: &mut AnimationState,
        entry: &TrackEntrySnapshot,
        event: &AnimationStateEvent,
    ) {
        self(state, entry, event)
    }
}

#[derive(Clone, Debug)]
struct QueuedEvent {
    entry: EntryId,
    event: AnimationStateEvent,
}

#[derive(Default)]
struct Track {
    current: Option<EntryId>,
    queue: VecDeque<EntryId>,
}

/// Plays animations on layered tracks, crossfading between entries and reporting playback
/// events.
pub struct AnimationState {
    data: AnimationStateData,
    tracks: Vec<Track>,
    entries: Vec<EntrySlot>,
    free_list: Vec<usize>,
    event_queue: VecDeque<QueuedEvent>,
    events: Vec<Event>,
    listener: Option<Box<dyn AnimationStateListener>>,
    draining_events: bool,
    animations_changed: bool,
    property_ids: HashSet<PropertyId>,
    unkeyed_state: i32,
    time_scale: f32,
    empty_animation: Arc<Animation>,
}

impl AnimationState {
    pub fn new(data: AnimationStateData) -> Self {
        Self {
            data,
            tracks: Vec::new(),
            entries: Vec::new(),
            free_list: Vec::new(),
            event_queue: VecDeque::new(),
            events: Vec::new(),
            listener: None,
            draining_events: false,
            animations_changed: false,
            property_ids: HashSet::new(),
            unkeyed_state: 0,
            time_scale: 1.0,
            empty_animation: Arc::new(Animation::new(EMPTY_ANIMATION_NAME, Vec::new(), 0.0)),
        }
    }

    pub fn set_listener<L: AnimationStateListener + 'static>(&mut self, listener: L) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn data(&self) -> &AnimationStateData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut AnimationStateData {
        &mut self.data
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Multiplies the delta of every [`AnimationState::update`].
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    pub fn tracks_len(&self) -> usize {
        self.tracks.len()
    }

    pub fn current(&self, track_index: usize) -> Option<TrackEntryHandle> {
        let id = self.tracks.get(track_index)?.current?;
        self.entry(id).map(|_| TrackEntryHandle { id })
    }

    pub fn track_entry(&self, handle: TrackEntryHandle) -> Option<&TrackEntry> {
        self.entry(handle.id)
    }

    /// The current entry of `track_index`, passed to `f`.
    pub fn with_track_entry<F: FnOnce(&TrackEntry) -> R, R>(
        &self,
        track_index: usize,
        f: F,
    ) -> Option<R> {
        let id = self.tracks.get(track_index)?.current?;
        self.entry(id).map(f)
    }

    /// The entry queued to play after `handle`.
    pub fn next(&self, handle: TrackEntryHandle) -> Option<TrackEntryHandle> {
        let entry = self.entry(handle.id)?;
        let track = self.tracks.get(entry.track_index)?;
        let next = if track.current == Some(handle.id) {
            track.queue.front().copied()
        } else {
            let position = track.queue.iter().position(|id| *id == handle.id)?;
            track.queue.get(position + 1).copied()
        };
        next.map(|id| TrackEntryHandle { id })
    }

    /// True when the next queued entry will become current on the next update.
    pub fn is_next_ready(&self, handle: TrackEntryHandle) -> bool {
        let Some(entry) = self.entry(handle.id) else {
            return false;
        };
        self.next(handle)
            .and_then(|next| self.entry(next.id))
            .is_some_and(|next| entry.next_track_last - next.delay >= 0.0)
    }

    /// Sets the current animation of a track, discarding any queued entries. The previous
    /// current entry is mixed out over the configured mix duration.
    pub fn set_animation(
        &mut self,
        track_index: usize,
        animation_name: &str,
        looped: bool,
    ) -> Result<TrackEntryHandle, Error> {
        let animation = self.find_animation(animation_name)?;
        Ok(self.set_animation_with(track_index, animation, looped))
    }

    pub fn set_animation_with(
        &mut self,
        track_index: usize,
        animation: Arc<Animation>,
        looped: bool,
    ) -> TrackEntryHandle {
        let mut interrupt = true;
        let mut current = self.expand_to_index(track_index);
        if let Some(current_id) = current {
            let (applied, mixing_from) = self
                .entry(current_id)
                .map_or((true, None), |entry| (entry.was_applied(), entry.mixing_from));
            if applied {
                self.clear_next(track_index);
            } else {
                // Mixing from an entry that was never applied would pop; drop it instead.
                self.tracks[track_index].current = mixing_from;
                self.push_event(current_id, AnimationStateEvent::Interrupt);
                self.push_event(current_id, AnimationStateEvent::End);
                self.clear_next(track_index);
                current = mixing_from;
                interrupt = false;
            }
        }
        log::debug!(
            "track {track_index}: set animation '{}' (loop: {looped})",
            animation.name
        );
        let entry = self.new_entry(track_index, animation, looped, current);
        let id = self.alloc_entry(entry);
        self.set_current(track_index, id, interrupt);
        self.drain_event_queue();
        TrackEntryHandle { id }
    }

    /// Queues an animation after the last entry of a track. A `delay <= 0` starts it that many
    /// seconds before the previous entry completes, minus the mix duration.
    pub fn add_animation(
        &mut self,
        track_index: usize,
        animation_name: &str,
        looped: bool,
        delay: f32,
    ) -> Result<TrackEntryHandle, Error> {
        let animation = self.find_animation(animation_name)?;
        Ok(self.add_animation_with(track_index, animation, looped, delay))
    }

    pub fn add_animation_with(
        &mut self,
        track_index: usize,
        animation: Arc<Animation>,
        looped: bool,
        mut delay: f32,
    ) -> TrackEntryHandle {
        let last = self
            .expand_to_index(track_index)
            .map(|current| self.tracks[track_index].queue.back().copied().unwrap_or(current));
        log::debug!(
            "track {track_index}: add animation '{}' (loop: {looped}, delay: {delay})",
            animation.name
        );
        let entry = self.new_entry(track_index, animation, looped, last);
        let mix_duration = entry.mix_duration;
        let id = self.alloc_entry(entry);
        match last {
            None => {
                self.set_current(track_index, id, true);
                self.drain_event_queue();
                delay = delay.max(0.0);
            }
            Some(last_id) => {
                self.tracks[track_index].queue.push_back(id);
                let last_complete = self.entry(last_id).map_or(0.0, TrackEntry::track_complete);
                if let Some(entry) = self.entry_mut(id) {
                    entry.previous = Some(last_id);
                }
                if delay <= 0.0 {
                    delay = (delay + last_complete - mix_duration).max(0.0);
                }
            }
        }
        if let Some(entry) = self.entry_mut(id) {
            entry.delay = delay;
        }
        TrackEntryHandle { id }
    }

    /// Mixes the current entry of a track out to the setup pose over `mix_duration`.
    pub fn set_empty_animation(
        &mut self,
        track_index: usize,
        mix_duration: f32,
    ) -> Result<TrackEntryHandle, Error> {
        check_mix_duration(mix_duration)?;
        Ok(self.set_empty(track_index, mix_duration))
    }

    fn set_empty(&mut self, track_index: usize, mix_duration: f32) -> TrackEntryHandle {
        let empty = Arc::clone(&self.empty_animation);
        let handle = self.set_animation_with(track_index, empty, false);
        handle.with_entry_mut(self, |entry| {
            entry.mix_duration = mix_duration;
            entry.track_end = mix_duration;
        });
        handle
    }

    /// Queues a mix out to the setup pose after the last entry of a track.
    pub fn add_empty_animation(
        &mut self,
        track_index: usize,
        mix_duration: f32,
        delay: f32,
    ) -> Result<TrackEntryHandle, Error> {
        check_mix_duration(mix_duration)?;
        let empty = Arc::clone(&self.empty_animation);
        let handle = self.add_animation_with(track_index, empty, false, delay);
        handle.with_entry_mut(self, |entry| {
            if delay <= 0.0 {
                entry.delay = (entry.delay + entry.mix_duration - mix_duration).max(0.0);
            }
            entry.mix_duration = mix_duration;
            entry.track_end = mix_duration;
        });
        Ok(handle)
    }

    /// Mixes every track out to the setup pose.
    pub fn set_empty_animations(&mut self, mix_duration: f32) -> Result<(), Error> {
        check_mix_duration(mix_duration)?;
        let draining = std::mem::replace(&mut self.draining_events, true);
        for track_index in 0..self.tracks.len() {
            if self.tracks[track_index].current.is_some() {
                self.set_empty(track_index, mix_duration);
            }
        }
        self.draining_events = draining;
        self.drain_event_queue();
        Ok(())
    }

    /// Removes all entries of a track. The skeleton keeps its last applied pose.
    pub fn clear_track(&mut self, track_index: usize) {
        let Some(current_id) = self.tracks.get(track_index).and_then(|track| track.current)
        else {
            return;
        };
        log::debug!("track {track_index}: clear");
        self.push_event(current_id, AnimationStateEvent::End);
        self.clear_next(track_index);
        let mut id = current_id;
        while let Some(from) = self.entry(id).and_then(|entry| entry.mixing_from) {
            self.push_event(from, AnimationStateEvent::End);
            if let Some(entry) = self.entry_mut(id) {
                entry.mixing_from = None;
                entry.mixing_to = None;
            }
            id = from;
        }
        self.tracks[track_index].current = None;
        self.drain_event_queue();
    }

    pub fn clear_tracks(&mut self) {
        let draining = std::mem::replace(&mut self.draining_events, true);
        for track_index in 0..self.tracks.len() {
            self.clear_track(track_index);
        }
        self.tracks.clear();
        self.draining_events = draining;
        self.drain_event_queue();
    }

    /// Advances every track by `delta` seconds, promoting queued entries whose delay elapsed
    /// and finishing completed crossfades.
    pub fn update(&mut self, delta: f32) {
        let delta = delta * self.time_scale;
        for track_index in 0..self.tracks.len() {
            let Some(current_id) = self.tracks[track_index].current else {
                continue;
            };
            let Some(current) = self.entry_mut(current_id) else {
                self.tracks[track_index].current = None;
                continue;
            };
            current.animation_last = current.next_animation_last;
            current.track_last = current.next_track_last;

            let mut current_delta = delta * current.time_scale;
            if current.delay > 0.0 {
                current.delay -= current_delta;
                if current.delay > 0.0 {
                    continue;
                }
                current_delta = -current.delay;
                current.delay = 0.0;
            }
            let track_last = current.track_last;
            let track_end = current.track_end;
            let current_time_scale = current.time_scale;
            let mixing = current.mixing_from.is_some();

            if let Some(next_id) = self.tracks[track_index].queue.front().copied() {
                let next_delay = self.entry(next_id).map_or(0.0, |next| next.delay);
                let next_time = track_last - next_delay;
                if next_time >= 0.0 {
                    // Carry the time left over past the delay into the next entry.
                    if let Some(next) = self.entry_mut(next_id) {
                        next.delay = 0.0;
                        next.track_time += if current_time_scale == 0.0 {
                            0.0
                        } else {
                            (next_time / current_time_scale + delta) * next.time_scale
                        };
                    }
                    if let Some(current) = self.entry_mut(current_id) {
                        current.track_time += current_delta;
                    }
                    self.tracks[track_index].queue.pop_front();
                    self.set_current(track_index, next_id, true);
                    let mut cursor = next_id;
                    while let Some(entry) = self.entry_mut(cursor) {
                        let Some(from) = entry.mixing_from else {
                            break;
                        };
                        entry.mix_time += delta;
                        cursor = from;
                    }
                    continue;
                }
            } else if track_last >= track_end && !mixing {
                log::trace!("track {track_index}: reached track end");
                self.tracks[track_index].current = None;
                self.push_event(current_id, AnimationStateEvent::End);
                self.clear_next(track_index);
                continue;
            }

            if mixing && self.update_mixing_from(current_id, delta) {
                let mut from = self
                    .entry_mut(current_id)
                    .and_then(|entry| entry.mixing_from.take());
                if let Some(entry) = from.and_then(|id| self.entry_mut(id)) {
                    entry.mixing_to = None;
                }
                while let Some(id) = from {
                    self.push_event(id, AnimationStateEvent::End);
                    from = self.entry(id).and_then(|entry| entry.mixing_from);
                }
                log::trace!("track {track_index}: all mixes complete");
            }
            if let Some(current) = self.entry_mut(current_id) {
                current.track_time += current_delta;
            }
        }
        self.drain_event_queue();
    }

    /// Returns true when every entry before `to` in the mix chain has finished mixing out.
    fn update_mixing_from(&mut self, to_id: EntryId, delta: f32) -> bool {
        let Some(from_id) = self.entry(to_id).and_then(|entry| entry.mixing_from) else {
            return true;
        };
        let finished = self.update_mixing_from(from_id, delta);

        let Some(from) = self.entry_mut(from_id) else {
            return true;
        };
        from.animation_last = from.next_animation_last;
        from.track_last = from.next_track_last;
        let from_total_alpha = from.total_alpha;
        let from_mixing_from = from.mixing_from;
        let from_interrupt_alpha = from.interrupt_alpha;
        let from_time_scale = from.time_scale;

        let Some(to) = self.entry_mut(to_id) else {
            return true;
        };
        if to.was_applied() && to.mix_time >= to.mix_duration {
            // Drop `from` only once nothing before it is still contributing.
            if from_total_alpha == 0.0 || to.mix_duration == 0.0 {
                to.mixing_from = from_mixing_from;
                to.interrupt_alpha = from_interrupt_alpha;
                if let Some(entry) = from_mixing_from.and_then(|id| self.entry_mut(id)) {
                    entry.mixing_to = Some(to_id);
                }
                log::trace!("mix out of entry {from_id:?} complete");
                self.push_event(from_id, AnimationStateEvent::End);
            }
            return finished;
        }
        to.mix_time += delta;
        if let Some(from) = self.entry_mut(from_id) {
            from.track_time += delta * from_time_scale;
        }
        false
    }

    /// Poses `skeleton` from every track. Returns false if no track had an entry to apply.
    pub fn apply(&mut self, skeleton: &mut Skeleton) -> bool {
        if self.animations_changed {
            self.compute_timeline_modes();
        }
        let mut applied = false;
        for track_index in 0..self.tracks.len() {
            let Some(current_id) = self.tracks[track_index].current else {
                continue;
            };
            let Some(current) = self.entry(current_id) else {
                continue;
            };
            if current.delay > 0.0 {
                continue;
            }
            applied = true;
            let blend = if track_index == 0 {
                MixBlend::First
            } else {
                current.mix_blend
            };

            let mut alpha = current.alpha;
            if current.mixing_from.is_some() {
                alpha *= self.apply_mixing_from(current_id, skeleton, blend);
            } else if current.track_time >= current.track_end
                && self.tracks[track_index].queue.is_empty()
            {
                alpha = 0.0;
            }
            self.apply_current(current_id, track_index, skeleton, alpha, blend);
        }
        self.reset_unkeyed_attachments(skeleton);
        self.drain_event_queue();
        applied
    }

    fn apply_current(
        &mut self,
        id: EntryId,
        track_index: usize,
        skeleton: &mut Skeleton,
        alpha: f32,
        blend: MixBlend,
    ) {
        let unkeyed_state = self.unkeyed_state;
        let mut events = std::mem::take(&mut self.events);
        let Some(current) = self.entry_mut(id) else {
            self.events = events;
            return;
        };
        let mut attachments = alpha >= current.alpha_attachment_threshold;
        let animation_last = current.animation_last;
        let animation_time = current.animation_time();
        let animation = Arc::clone(&current.animation);
        let reverse = current.reverse;
        let apply_time = if reverse {
            animation.duration - animation_time
        } else {
            animation_time
        };

        let mut apply_events = if reverse { None } else { Some(&mut events) };
        if (track_index == 0 && alpha == 1.0) || blend == MixBlend::Add {
            if track_index == 0 {
                attachments = true;
            }
            for timeline in &animation.timelines {
                if let Timeline::Attachment(t) = timeline {
                    apply_attachment_timeline(
                        t,
                        skeleton,
                        apply_time,
                        blend,
                        attachments,
                        unkeyed_state,
                    );
                } else {
                    timeline.apply(
                        skeleton,
                        animation_last,
                        apply_time,
                        apply_events.as_deref_mut(),
                        alpha,
                        blend,
                        MixDirection::In,
                    );
                }
            }
        } else {
            let modes = std::mem::take(&mut current.timeline_mode);
            let shortest_rotation = current.shortest_rotation;
            let mut rotations = std::mem::take(&mut current.timelines_rotation);
            let count = animation.timelines.len();
            let first_frame = !shortest_rotation && rotations.len() != count << 1;
            if first_frame {
                rotations.clear();
                rotations.resize(count << 1, 0.0);
            }
            for (i, timeline) in animation.timelines.iter().enumerate() {
                let timeline_blend = match modes.get(i) {
                    Some(TimelineMode::Subsequent) => blend,
                    _ => MixBlend::Setup,
                };
                match timeline {
                    Timeline::Rotate(t) if !shortest_rotation => apply_rotate_timeline(
                        timeline,
                        t,
                        skeleton,
                        apply_time,
                        alpha,
                        timeline_blend,
                        &mut rotations,
                        i << 1,
                        first_frame,
                    ),
                    Timeline::Attachment(t) => apply_attachment_timeline(
                        t,
                        skeleton,
                        apply_time,
                        blend,
                        attachments,
                        unkeyed_state,
                    ),
                    _ => timeline.apply(
                        skeleton,
                        animation_last,
                        apply_time,
                        apply_events.as_deref_mut(),
                        alpha,
                        timeline_blend,
                        MixDirection::In,
                    ),
                }
            }
            if let Some(current) = self.entry_mut(id) {
                current.timeline_mode = modes;
                current.timelines_rotation = rotations;
            }
        }

        self.queue_events(id, animation_time, &events);
        events.clear();
        self.events = events;
        if let Some(current) = self.entry_mut(id) {
            current.next_animation_last = animation_time;
            current.next_track_last = current.track_time;
        }
    }

    /// Applies the entries `to` is mixing from, oldest first. Returns the mix percentage of `to`.
    fn apply_mixing_from(
        &mut self,
        to_id: EntryId,
        skeleton: &mut Skeleton,
        blend: MixBlend,
    ) -> f32 {
        let Some(to) = self.entry(to_id) else {
            return 1.0;
        };
        let Some(from_id) = to.mixing_from else {
            return 1.0;
        };
        let (to_mix_time, to_mix_duration, to_interrupt_alpha) =
            (to.mix_time, to.mix_duration, to.interrupt_alpha);
        if self.entry(from_id).is_some_and(|from| from.mixing_from.is_some()) {
            self.apply_mixing_from(from_id, skeleton, blend);
        }

        let unkeyed_state = self.unkeyed_state;
        let mut events = std::mem::take(&mut self.events);
        let Some(from) = self.entry_mut(from_id) else {
            self.events = events;
            return 1.0;
        };
        let (mix, blend) = if to_mix_duration == 0.0 {
            // Single frame mix to undo the from entry's changes.
            let blend = if blend == MixBlend::First {
                MixBlend::Setup
            } else {
                blend
            };
            (1.0, blend)
        } else {
            let blend = if blend == MixBlend::First {
                blend
            } else {
                from.mix_blend
            };
            ((to_mix_time / to_mix_duration).min(1.0), blend)
        };

        let attachments = mix < from.mix_attachment_threshold;
        let draw_order = mix < from.mix_draw_order_threshold;
        let alpha_attachment_threshold = from.alpha_attachment_threshold;
        let alpha_hold = from.alpha * to_interrupt_alpha;
        let alpha_mix = alpha_hold * (1.0 - mix);
        let animation_last = from.animation_last;
        let animation_time = from.animation_time();
        let animation = Arc::clone(&from.animation);
        let apply_time = if from.reverse {
            animation.duration - animation_time
        } else {
            animation_time
        };
        let collect_events = !from.reverse && mix < from.event_threshold;

        let mut apply_events = if collect_events { Some(&mut events) } else { None };
        if blend == MixBlend::Add {
            for timeline in &animation.timelines {
                timeline.apply(
                    skeleton,
                    animation_last,
                    apply_time,
                    apply_events.as_deref_mut(),
                    alpha_mix,
                    blend,
                    MixDirection::Out,
                );
            }
        } else {
            let modes = std::mem::take(&mut from.timeline_mode);
            let hold_mix = std::mem::take(&mut from.timeline_hold_mix);
            let shortest_rotation = from.shortest_rotation;
            let mut rotations = std::mem::take(&mut from.timelines_rotation);
            let count = animation.timelines.len();
            let first_frame = !shortest_rotation && rotations.len() != count << 1;
            if first_frame {
                rotations.clear();
                rotations.resize(count << 1, 0.0);
            }

            let mut total_alpha = 0.0;
            for (i, timeline) in animation.timelines.iter().enumerate() {
                let is_draw_order = matches!(timeline, Timeline::DrawOrder(_));
                let (timeline_blend, alpha) = match modes.get(i).copied() {
                    Some(TimelineMode::Subsequent) => {
                        if !draw_order && is_draw_order {
                            continue;
                        }
                        (blend, alpha_mix)
                    }
                    Some(TimelineMode::HoldSubsequent) => (blend, alpha_hold),
                    Some(TimelineMode::HoldFirst) => (MixBlend::Setup, alpha_hold),
                    Some(TimelineMode::HoldMix) => {
                        let hold = hold_mix
                            .get(i)
                            .copied()
                            .flatten()
                            .and_then(|id| self.entry(id));
                        let alpha = hold.map_or(alpha_hold, |hold| {
                            alpha_hold * (1.0 - hold.mix_time / hold.mix_duration).max(0.0)
                        });
                        (MixBlend::Setup, alpha)
                    }
                    Some(TimelineMode::First) | None => (MixBlend::Setup, alpha_mix),
                };
                total_alpha += alpha;

                match timeline {
                    Timeline::Rotate(t) if !shortest_rotation => apply_rotate_timeline(
                        timeline,
                        t,
                        skeleton,
                        apply_time,
                        alpha,
                        timeline_blend,
                        &mut rotations,
                        i << 1,
                        first_frame,
                    ),
                    Timeline::Attachment(t) => apply_attachment_timeline(
                        t,
                        skeleton,
                        apply_time,
                        timeline_blend,
                        attachments && alpha >= alpha_attachment_threshold,
                        unkeyed_state,
                    ),
                    _ => {
                        let direction =
                            if draw_order && is_draw_order && timeline_blend == MixBlend::Setup {
                                MixDirection::In
                            } else {
                                MixDirection::Out
                            };
                        timeline.apply(
                            skeleton,
                            animation_last,
                            apply_time,
                            apply_events.as_deref_mut(),
                            alpha,
                            timeline_blend,
                            direction,
                        );
                    }
                }
            }
            if let Some(from) = self.entry_mut(from_id) {
                from.timeline_mode = modes;
                from.timeline_hold_mix = hold_mix;
                from.timelines_rotation = rotations;
                from.total_alpha = total_alpha;
            }
        }

        if to_mix_duration > 0.0 {
            self.queue_events(from_id, animation_time, &events);
        }
        events.clear();
        self.events = events;
        if let Some(from) = self.entry_mut(from_id) {
            from.next_animation_last = animation_time;
            from.next_track_last = from.track_time;
        }
        mix
    }

    /// Queues the fired `events` and, when a loop or the animation finished, `Complete`.
    /// Events keyed before the loop point are delivered after `Complete`.
    fn queue_events(&mut self, id: EntryId, animation_time: f32, events: &[Event]) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let animation_start = entry.animation_start;
        let animation_end = entry.animation_end;
        let duration = animation_end - animation_start;
        let track_last_wrapped = entry.track_last % duration;
        let complete = if entry.looped {
            duration == 0.0 || {
                let cycles = (entry.track_time / duration).floor();
                cycles > 0.0 && cycles > (entry.track_last / duration).floor()
            }
        } else {
            animation_time >= animation_end && entry.animation_last < animation_end
        };

        let mut split = 0;
        for event in events {
            if event.time < track_last_wrapped {
                break;
            }
            split += 1;
            if event.time > animation_end {
                continue;
            }
            self.push_event(id, AnimationStateEvent::Event(event.clone()));
        }
        if complete {
            self.push_event(id, AnimationStateEvent::Complete);
        }
        for event in &events[split..] {
            if event.time < animation_start {
                continue;
            }
            self.push_event(id, AnimationStateEvent::Event(event.clone()));
        }
    }

    fn reset_unkeyed_attachments(&mut self, skeleton: &mut Skeleton) {
        let setup_state = self.unkeyed_state + ANIMATION_STATE_SETUP;
        let data = Arc::clone(&skeleton.data);
        for slot_index in 0..skeleton.slots.len() {
            let slot = &skeleton.slots[slot_index];
            if slot.attachment_state != setup_state {
                continue;
            }
            let name = data
                .slots
                .get(slot.data)
                .and_then(|slot_data| slot_data.attachment_name.as_deref());
            set_attachment_by_name(skeleton, slot_index, name);
        }
        self.unkeyed_state += 2;
    }

    fn compute_timeline_modes(&mut self) {
        self.animations_changed = false;
        self.property_ids.clear();
        for track_index in 0..self.tracks.len() {
            let Some(mut id) = self.tracks[track_index].current else {
                continue;
            };
            while let Some(from) = self.entry(id).and_then(|entry| entry.mixing_from) {
                id = from;
            }
            let mut cursor = Some(id);
            while let Some(id) = cursor {
                let Some(entry) = self.entry(id) else {
                    break;
                };
                cursor = entry.mixing_to;
                if cursor.is_none() || entry.mix_blend != MixBlend::Add {
                    self.compute_hold(id);
                }
            }
        }
    }

    fn compute_hold(&mut self, id: EntryId) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let animation = Arc::clone(&entry.animation);
        let to = entry
            .mixing_to
            .and_then(|to| self.entry(to))
            .map(|to| (to.hold_previous, Arc::clone(&to.animation), to.mixing_to));
        let count = animation.timelines.len();
        let mut modes = Vec::with_capacity(count);
        let mut hold_mix = vec![None; count];

        if let Some((true, _, _)) = to {
            for timeline in &animation.timelines {
                let added = add_property_ids(&mut self.property_ids, &timeline.property_ids());
                modes.push(if added {
                    TimelineMode::HoldFirst
                } else {
                    TimelineMode::HoldSubsequent
                });
            }
        } else {
            for (i, timeline) in animation.timelines.iter().enumerate() {
                let ids = timeline.property_ids();
                let mode = if !add_property_ids(&mut self.property_ids, &ids) {
                    TimelineMode::Subsequent
                } else {
                    match &to {
                        Some((_, to_animation, to_mixing_to))
                            if !matches!(
                                timeline,
                                Timeline::Attachment(_)
                                    | Timeline::DrawOrder(_)
                                    | Timeline::Event(_)
                            ) && to_animation.has_timeline(&ids) =>
                        {
                            let mut mode = TimelineMode::HoldFirst;
                            let mut next = *to_mixing_to;
                            while let Some(next_id) = next {
                                let Some(next_entry) = self.entry(next_id) else {
                                    break;
                                };
                                if next_entry.animation.has_timeline(&ids) {
                                    next = next_entry.mixing_to;
                                    continue;
                                }
                                if next_entry.mix_duration > 0.0 {
                                    mode = TimelineMode::HoldMix;
                                    hold_mix[i] = Some(next_id);
                                }
                                break;
                            }
                            mode
                        }
                        _ => TimelineMode::First,
                    }
                };
                modes.push(mode);
            }
        }

        if let Some(entry) = self.entry_mut(id) {
            entry.timeline_mode = modes;
            entry.timeline_hold_mix = hold_mix;
        }
    }

    fn find_animation(&self, name: &str) -> Result<Arc<Animation>, Error> {
        self.data
            .skeleton_data
            .find_animation(name)
            .cloned()
            .ok_or_else(|| Error::UnknownAnimation {
                name: name.to_string(),
            })
    }

    fn new_entry(
        &self,
        track_index: usize,
        animation: Arc<Animation>,
        looped: bool,
        last: Option<EntryId>,
    ) -> TrackEntry {
        let mix_duration = last
            .and_then(|id| self.entry(id))
            .map_or(0.0, |last| self.data.mix(&last.animation, &animation));
        let empty = Arc::ptr_eq(&animation, &self.empty_animation);
        TrackEntry::new(track_index, animation, looped, mix_duration, empty)
    }

    fn set_current(&mut self, track_index: usize, id: EntryId, interrupt: bool) {
        let from = self.expand_to_index(track_index);
        self.tracks[track_index].current = Some(id);
        if let Some(entry) = self.entry_mut(id) {
            entry.previous = None;
        }
        if let Some(from_id) = from {
            if interrupt {
                self.push_event(from_id, AnimationStateEvent::Interrupt);
            }
            // Keep how far an interrupted mix got so it does not snap.
            let mut interrupt_scale = 1.0;
            if let Some(from) = self.entry_mut(from_id) {
                if from.mixing_from.is_some() && from.mix_duration > 0.0 {
                    interrupt_scale = (from.mix_time / from.mix_duration).min(1.0);
                }
                from.mixing_to = Some(id);
                from.timelines_rotation.clear();
            }
            if let Some(entry) = self.entry_mut(id) {
                entry.mixing_from = Some(from_id);
                entry.mix_time = 0.0;
                entry.interrupt_alpha *= interrupt_scale;
            }
        }
        self.push_event(id, AnimationStateEvent::Start);
    }

    fn expand_to_index(&mut self, track_index: usize) -> Option<EntryId> {
        if track_index >= self.tracks.len() {
            self.tracks.resize_with(track_index + 1, Track::default);
        }
        self.tracks[track_index].current
    }

    fn clear_next(&mut self, track_index: usize) {
        let queued = std::mem::take(&mut self.tracks[track_index].queue);
        for id in queued {
            self.push_event(id, AnimationStateEvent::Dispose);
        }
    }

    fn push_event(&mut self, entry: EntryId, event: AnimationStateEvent) {
        if matches!(event, AnimationStateEvent::Start | AnimationStateEvent::End) {
            self.animations_changed = true;
        }
        self.event_queue.push_back(QueuedEvent { entry, event });
    }

    fn drain_event_queue(&mut self) {
        if self.draining_events {
            return;
        }
        self.draining_events = true;
        while let Some(QueuedEvent { entry, event }) = self.event_queue.pop_front() {
            match event {
                AnimationStateEvent::End => {
                    self.notify(entry, &AnimationStateEvent::End);
                    self.notify(entry, &AnimationStateEvent::Dispose);
                    self.free_entry(entry);
                }
                AnimationStateEvent::Dispose => {
                    self.notify(entry, &event);
                    self.free_entry(entry);
                }
                _ => self.notify(entry, &event),
            }
        }
        self.draining_events = false;
    }

    fn notify(&mut self, id: EntryId, event: &AnimationStateEvent) {
        let Some(entry) = self.entry_mut(id) else {
            return;
        };
        let snapshot = TrackEntrySnapshot {
            handle: TrackEntryHandle { id },
            track_index: entry.track_index,
            animation_name: entry.animation.name.clone(),
            track_time: entry.track_time,
        };
        if let Some(mut listener) = entry.listener.take() {
            listener.on_event(self, &snapshot, event);
            if let Some(entry) = self.entry_mut(id) {
                if entry.listener.is_none() {
                    entry.listener = Some(listener);
                }
            }
        }
        if let Some(mut listener) = self.listener.take() {
            listener.on_event(self, &snapshot, event);
            if self.listener.is_none() {
                self.listener = Some(listener);
            }
        }
    }

    fn alloc_entry(&mut self, entry: TrackEntry) -> EntryId {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.entries[index];
            slot.entry = Some(entry);
            EntryId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.entries.len();
            self.entries.push(EntrySlot {
                generation: 0,
                entry: Some(entry),
            });
            EntryId {
                index,
                generation: 0,
            }
        }
    }

    fn free_entry(&mut self, id: EntryId) {
        let Some(slot) = self.entries.get_mut(id.index) else {
            return;
        };
        if slot.generation != id.generation || slot.entry.take().is_none() {
            return;
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
    }

    fn entry(&self, id: EntryId) -> Option<&TrackEntry> {
        let slot = self.entries.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut TrackEntry> {
        let slot = self.entries.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }
}

/// Returns true if any of `ids` was not yet in `set`.
fn add_property_ids(set: &mut HashSet<PropertyId>, ids: &[PropertyId]) -> bool {
    let mut added = false;
    for &id in ids {
        added |= set.insert(id);
    }
    added
}

fn apply_attachment_timeline(
    timeline: &AttachmentTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    blend: MixBlend,
    attachments: bool,
    unkeyed_state: i32,
) {
    let slot_index = timeline.slot_index;
    let Some(slot) = skeleton.slots.get(slot_index) else {
        return;
    };
    if !skeleton.bones.get(slot.bone).is_some_and(Bone::is_active) {
        return;
    }
    let Some(&first) = timeline.frames.first() else {
        return;
    };
    if time < first {
        if matches!(blend, MixBlend::Setup | MixBlend::First) {
            let data = Arc::clone(&skeleton.data);
            let name = data
                .slots
                .get(slot.data)
                .and_then(|slot_data| slot_data.attachment_name.as_deref());
            set_slot_attachment(skeleton, slot_index, name, attachments, unkeyed_state);
        }
    } else {
        let frame = crate::curve::search(&timeline.frames, time, 1);
        let name = timeline.attachment_names.get(frame).and_then(Option::as_deref);
        set_slot_attachment(skeleton, slot_index, name, attachments, unkeyed_state);
    }
    // Slots left unkeyed this frame are reset to their setup attachment after apply.
    if let Some(slot) = skeleton.slots.get_mut(slot_index) {
        if slot.attachment_state <= unkeyed_state {
            slot.attachment_state = unkeyed_state + ANIMATION_STATE_SETUP;
        }
    }
}

fn set_slot_attachment(
    skeleton: &mut Skeleton,
    slot_index: usize,
    name: Option<&str>,
    attachments: bool,
    unkeyed_state: i32,
) {
    set_attachment_by_name(skeleton, slot_index, name);
    if attachments {
        if let Some(slot) = skeleton.slots.get_mut(slot_index) {
            slot.attachment_state = unkeyed_state + ANIMATION_STATE_CURRENT;
        }
    }
}

/// Mixes a rotate timeline the short way around, remembering the direction in `rotations` so
/// that later frames of the same crossfade keep turning the same way even past 180 degrees.
#[allow(clippy::too_many_arguments)]
fn apply_rotate_timeline(
    timeline: &Timeline,
    rotate: &BoneTimeline,
    skeleton: &mut Skeleton,
    time: f32,
    alpha: f32,
    blend: MixBlend,
    rotations: &mut [f32],
    i: usize,
    first_frame: bool,
) {
    if first_frame {
        rotations[i] = 0.0;
    }
    if alpha == 1.0 {
        timeline.apply(skeleton, 0.0, time, None, 1.0, blend, MixDirection::In);
        return;
    }
    let data = Arc::clone(&skeleton.data);
    let Some(bone) = skeleton.bones.get_mut(rotate.bone_index) else {
        return;
    };
    if !bone.active || rotate.frames.is_empty() {
        return;
    }
    let Some(setup) = data.bones.get(bone.data).map(|bone_data| bone_data.rotation) else {
        return;
    };

    let (r1, r2) = if time < rotate.frames.time(0) {
        match blend {
            MixBlend::Setup => {
                bone.rotation = setup;
                return;
            }
            MixBlend::First => (bone.rotation, setup),
            _ => return,
        }
    } else {
        let r1 = if blend == MixBlend::Setup {
            setup
        } else {
            bone.rotation
        };
        (r1, setup + rotate.frames.curve_value(time, 0))
    };

    let mut diff = r2 - r1;
    diff -= (diff / 360.0 - 0.5).ceil() * 360.0;
    let total = if diff == 0.0 {
        rotations[i]
    } else {
        let (last_total, last_diff) = if first_frame {
            (0.0, diff)
        } else {
            (rotations[i], rotations[i + 1])
        };
        let loops = last_total - last_total % 360.0;
        let mut total = diff + loops;
        let current = diff >= 0.0;
        let mut dir = last_total >= 0.0;
        // Detect crossing the opposite side of the circle since the last frame.
        if last_diff.abs() <= 90.0 && signum(last_diff) != signum(diff) {
            if (last_total - loops).abs() > 180.0 {
                total += 360.0 * signum(last_total);
                dir = current;
            } else if loops != 0.0 {
                total -= 360.0 * signum(last_total);
            } else {
                dir = current;
            }
        }
        if dir != current {
            total += 360.0 * signum(last_total);
        }
        rotations[i] = total;
        total
    };
    rotations[i + 1] = diff;
    bone.rotation = r1 + total * alpha;
}
