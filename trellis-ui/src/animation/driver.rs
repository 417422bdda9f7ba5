//! Running animations and the frame driver that advances them.
//!
//! At most one animation runs per element. Starting another on the same
//! element interrupts the first: its opacity and scale snap to their end
//! values, the frame stays where it is, and the new animation starts from
//! there.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use trellis_api::{Rect, ViewTag};

use super::storyboard::{AnimatedProperty, AnimationState, Easing};
use crate::element::{Element, ElementTree};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Track {
    Opacity { from: f64, to: f64 },
    Scale { from: (f64, f64), to: (f64, f64) },
    Frame { from: Rect, to: Rect },
}

impl Track {
    fn write(&self, element: &mut Element, progress: f64) {
        let mix = |a: f64, b: f64| a + (b - a) * progress;
        match *self {
            Track::Opacity { from, to } => element.opacity = mix(from, to),
            Track::Scale { from, to } => {
                let transform = element.ensure_transform();
                transform.scale_x = mix(from.0, to.0);
                transform.scale_y = mix(from.1, to.1);
            }
            Track::Frame { from, to } => element.frame = from.lerp(&to, progress),
        }
    }

    fn retarget(&mut self, element: &Element, property: AnimatedProperty) -> bool {
        match (self, property) {
            (Track::Opacity { to, .. }, AnimatedProperty::Opacity) => *to = element.opacity,
            (Track::Scale { to, .. }, AnimatedProperty::ScaleXY) => *to = element.scale(),
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    tag: ViewTag,
    state: AnimationState,
    tracks: Vec<Track>,
    duration: Duration,
    delay: Duration,
    easing: Easing,
    /// Set by the first tick.
    started_at: Option<Instant>,
}

impl Animation {
    pub fn new(
        tag: ViewTag,
        state: AnimationState,
        tracks: Vec<Track>,
        duration: Duration,
        delay: Duration,
        easing: Easing,
    ) -> Self {
        Self {
            tag,
            state,
            tracks,
            duration,
            delay,
            easing,
            started_at: None,
        }
    }

    pub fn tag(&self) -> ViewTag {
        self.tag
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    fn write(&self, element: &mut Element, progress: f64) {
        let eased = self.easing.apply(progress);
        for track in &self.tracks {
            track.write(element, eased);
        }
    }

    /// Writes the first frame.
    pub fn begin(&self, element: &mut Element) {
        self.write(element, 0.0);
    }

    /// Advances to `now`. Returns true once the final frame is written.
    pub fn advance(&mut self, element: &mut Element, now: Instant) -> bool {
        let started = *self.started_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        if elapsed < self.delay {
            self.write(element, 0.0);
            return false;
        }
        let running = elapsed - self.delay;
        let progress = if self.duration.is_zero() {
            1.0
        } else {
            (running.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        };
        self.write(element, progress);
        progress >= 1.0
    }

    /// Points the tracks animating `property` at the element's current
    /// value.
    pub fn retarget(&mut self, element: &Element, property: AnimatedProperty) -> bool {
        let mut hit = false;
        for track in &mut self.tracks {
            hit |= track.retarget(element, property);
        }
        hit
    }

    /// Snaps appearance tracks to their end values; the frame is left as is.
    pub fn interrupt(&self, element: &mut Element) {
        for track in &self.tracks {
            if !matches!(track, Track::Frame { .. }) {
                track.write(element, 1.0);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct AnimationDriver {
    running: HashMap<ViewTag, Animation>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `animation`, replacing any animation already running on the
    /// element.
    pub fn begin(&mut self, animation: Animation, element: &mut Element) {
        if let Some(previous) = self.running.remove(&animation.tag) {
            tracing::debug!(tag = %animation.tag, "interrupting running animation");
            previous.interrupt(element);
        }
        animation.begin(element);
        self.running.insert(animation.tag, animation);
    }

    /// Advances every animation; returns how many are still running.
    pub fn tick(&mut self, elements: &mut ElementTree, now: Instant) -> usize {
        self.running.retain(|tag, animation| match elements.get_mut(*tag) {
            Some(element) => !animation.advance(element, now),
            None => false,
        });
        self.running.len()
    }

    /// A prop wrote `property` on `element` mid-animation: the running
    /// animation now ends on the written value.
    pub fn retarget(&mut self, element: &Element, property: AnimatedProperty) -> bool {
        self.running
            .get_mut(&element.tag)
            .is_some_and(|animation| animation.retarget(element, property))
    }

    /// Drops the animation on `tag` without writing anything.
    pub fn cancel(&mut self, tag: ViewTag) -> bool {
        self.running.remove(&tag).is_some()
    }

    pub fn is_animating(&self, tag: ViewTag) -> bool {
        self.running.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }
}
