//! Layout animation: decides whether a layout change animates and owns the
//! running animations.

mod driver;
mod storyboard;

pub use driver::{Animation, AnimationDriver, Track};
pub use storyboard::{AnimatedProperty, AnimationState, Easing, StoryboardAnimation};

use std::thread::{self, ThreadId};
use std::time::Instant;

use trellis_api::{Rect, Value, ViewTag};

use crate::element::{Element, ElementTree};

const CONFIG_DURATION: &str = "duration";
const CONFIG_CREATE: &str = "create";
const CONFIG_UPDATE: &str = "update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutAnimationState {
    Idle,
    Configured,
}

/// Thread-affine: every mutating call must come from the creating thread.
#[derive(Debug)]
pub struct LayoutAnimationManager {
    create: StoryboardAnimation,
    update: StoryboardAnimation,
    state: LayoutAnimationState,
    driver: AnimationDriver,
    owner: ThreadId,
}

impl LayoutAnimationManager {
    pub fn new() -> Self {
        Self {
            create: StoryboardAnimation::new(AnimationState::Create),
            update: StoryboardAnimation::new(AnimationState::Update),
            state: LayoutAnimationState::Idle,
            driver: AnimationDriver::new(),
            owner: thread::current().id(),
        }
    }

    fn assert_owner(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "layout animation manager used off its UI thread"
        );
    }

    /// Configures both storyboards from a `configureLayoutAnimation` map.
    /// A missing or malformed config resets.
    pub fn initialize_from_config(&mut self, config: Option<&Value>) {
        self.assert_owner();
        let Some(config) = config.and_then(Value::as_map) else {
            self.reset();
            return;
        };

        self.create.reset();
        self.update.reset();
        let global_duration = config
            .get(CONFIG_DURATION)
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let mut configured = false;
        for (key, storyboard) in [
            (CONFIG_CREATE, &mut self.create),
            (CONFIG_UPDATE, &mut self.update),
        ] {
            match config.get(key) {
                Some(Value::Map(section)) => {
                    storyboard.initialize_from_config(section, global_duration);
                    configured = true;
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    tracing::warn!(
                        section = key,
                        found = other.type_name(),
                        "ignoring non-map animation section"
                    );
                }
            }
        }

        self.state = if configured {
            LayoutAnimationState::Configured
        } else {
            LayoutAnimationState::Idle
        };
        tracing::debug!(state = ?self.state, "layout animation configured");
    }

    /// Both storyboards go idle. Running animations finish normally.
    pub fn reset(&mut self) {
        self.assert_owner();
        self.create.reset();
        self.update.reset();
        self.state = LayoutAnimationState::Idle;
    }

    pub fn state(&self) -> LayoutAnimationState {
        self.state
    }

    pub fn storyboard(&self, state: AnimationState) -> &StoryboardAnimation {
        match state {
            AnimationState::Create => &self.create,
            AnimationState::Update => &self.update,
        }
    }

    /// Only attached elements animate.
    pub fn should_animate(&self, element: &Element) -> bool {
        self.state == LayoutAnimationState::Configured && element.parent.is_some()
    }

    /// Moves `element` to `rect`, animated when the matching storyboard is
    /// live and directly otherwise.
    pub fn apply_layout_update(&mut self, element: &mut Element, rect: Rect) {
        self.assert_owner();
        let state = if element.frame.is_empty() {
            AnimationState::Create
        } else {
            AnimationState::Update
        };
        match self.storyboard(state).create_animation(element, rect) {
            Some(animation) => {
                tracing::debug!(tag = %element.tag, ?state, "starting layout animation");
                self.driver.begin(animation, element);
            }
            None => {
                self.driver.cancel(element.tag);
                element.frame = rect;
            }
        }
    }

    /// Keeps a running animation from overwriting a prop just written to
    /// `element`.
    pub fn retarget(&mut self, element: &Element, property: AnimatedProperty) -> bool {
        self.assert_owner();
        self.driver.retarget(element, property)
    }

    /// Advances running animations; returns how many are still running.
    pub fn tick(&mut self, elements: &mut ElementTree, now: Instant) -> usize {
        self.assert_owner();
        self.driver.tick(elements, now)
    }

    pub fn cancel(&mut self, tag: ViewTag) -> bool {
        self.assert_owner();
        self.driver.cancel(tag)
    }

    pub fn is_animating(&self, tag: ViewTag) -> bool {
        self.driver.is_animating(tag)
    }

    pub fn active(&self) -> usize {
        self.driver.len()
    }
}

impl Default for LayoutAnimationManager {
    fn default() -> Self {
        Self::new()
    }
}
