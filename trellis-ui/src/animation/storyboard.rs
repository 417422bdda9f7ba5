//! Storyboard templates, one per `AnimationState`.

use std::time::Duration;

use trellis_api::{Map, Rect, Value};

use super::driver::{Animation, Track};
use crate::element::Element;

const KEY_TYPE: &str = "type";
const KEY_PROPERTY: &str = "property";
const KEY_DURATION: &str = "duration";
const KEY_DELAY: &str = "delay";
const KEY_SPRING_DAMPING: &str = "springDamping";

/// Which transition a layout change is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationState {
    /// First layout of an element that has not rendered yet.
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInEaseOut,
    Spring { damping: f64 },
    Keyboard,
}

impl Easing {
    pub fn parse(name: &str, spring_damping: Option<f64>) -> Option<Self> {
        Some(match name {
            "linear" => Easing::Linear,
            "easeIn" => Easing::EaseIn,
            "easeOut" => Easing::EaseOut,
            "easeInEaseOut" => Easing::EaseInEaseOut,
            "spring" => Easing::Spring {
                damping: spring_damping.unwrap_or(0.5).clamp(0.05, 1.0),
            },
            "keyboard" => Easing::Keyboard,
            _ => return None,
        })
    }

    /// Eased progress for linear progress `t` in `[0, 1]`.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInEaseOut | Easing::Keyboard => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::Spring { damping } => {
                let decay = (-t * 10.0 * damping).exp();
                let wobble = ((1.0 - damping) * 12.0 * t).cos();
                1.0 - decay * wobble * (1.0 - t)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatedProperty {
    Opacity,
    ScaleXY,
}

impl AnimatedProperty {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "opacity" => Some(AnimatedProperty::Opacity),
            "scaleXY" => Some(AnimatedProperty::ScaleXY),
            _ => None,
        }
    }

    /// The animated property a view prop writes to, if any.
    pub fn driven_by(prop: &str) -> Option<Self> {
        match prop {
            "opacity" => Some(AnimatedProperty::Opacity),
            "scaleX" | "scaleY" | "decomposedMatrix" => Some(AnimatedProperty::ScaleXY),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryboardAnimation {
    state: AnimationState,
    duration: Duration,
    delay: Duration,
    easing: Easing,
    property: AnimatedProperty,
    live: bool,
}

/// Longest duration or delay a config can ask for: one hour.
const MAX_MILLIS: f64 = 3_600_000.0;

fn millis(key: &str, value: f64) -> Duration {
    if !value.is_finite() || value <= 0.0 {
        return Duration::ZERO;
    }
    if value > MAX_MILLIS {
        tracing::warn!(key, value, "animation time out of range, clamping");
    }
    Duration::from_secs_f64(value.min(MAX_MILLIS) / 1000.0)
}

impl StoryboardAnimation {
    pub fn new(state: AnimationState) -> Self {
        Self {
            state,
            duration: Duration::ZERO,
            delay: Duration::ZERO,
            easing: Easing::Linear,
            property: AnimatedProperty::Opacity,
            live: false,
        }
    }

    /// Reads one config section. `global_duration_ms` applies unless the
    /// section carries its own `duration`.
    pub fn initialize_from_config(&mut self, section: &Map, global_duration_ms: f64) {
        let number = |key: &str| section.get(key).and_then(Value::as_f64);

        self.duration = millis(KEY_DURATION, number(KEY_DURATION).unwrap_or(global_duration_ms));
        self.delay = millis(KEY_DELAY, number(KEY_DELAY).unwrap_or(0.0));

        self.easing = match section.get(KEY_TYPE).and_then(Value::as_str) {
            Some(name) => Easing::parse(name, number(KEY_SPRING_DAMPING)).unwrap_or_else(|| {
                tracing::warn!(easing = name, "unknown animation type, using linear");
                Easing::Linear
            }),
            None => Easing::Linear,
        };

        self.property = match section.get(KEY_PROPERTY).and_then(Value::as_str) {
            Some(name) => AnimatedProperty::parse(name).unwrap_or_else(|| {
                tracing::warn!(property = name, "unknown animated property, using opacity");
                AnimatedProperty::Opacity
            }),
            None => AnimatedProperty::Opacity,
        };

        self.live = true;
    }

    pub fn reset(&mut self) {
        self.live = false;
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn property(&self) -> AnimatedProperty {
        self.property
    }

    /// Builds an animation moving `element` to `target`; `None` while idle.
    pub fn create_animation(&self, element: &Element, target: Rect) -> Option<Animation> {
        if !self.live {
            return None;
        }
        let tracks = match self.state {
            AnimationState::Create => {
                let appear = match self.property {
                    AnimatedProperty::Opacity => Track::Opacity {
                        from: 0.0,
                        to: element.opacity,
                    },
                    AnimatedProperty::ScaleXY => Track::Scale {
                        from: (0.0, 0.0),
                        to: element.scale(),
                    },
                };
                vec![
                    Track::Frame {
                        from: target,
                        to: target,
                    },
                    appear,
                ]
            }
            AnimationState::Update => vec![Track::Frame {
                from: element.frame,
                to: target,
            }],
        };
        Some(Animation::new(
            element.tag,
            self.state,
            tracks,
            self.duration,
            self.delay,
            self.easing,
        ))
    }
}
