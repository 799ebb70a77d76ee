//! Tweening: easing curves and time-based property animation.

mod easing;
mod tween;

pub use easing::Easing;
pub use tween::{
    DEFAULT_DURATION, Property, Repeat, Tween, TweenBuilder, TweenError, TweenValue, Tweener,
    ValueKind,
};
