//! Time-based interpolation of entity properties.
//!
//! A [`Tween`] describes one animation: which entity, which [`Property`],
//! where it ends up, how long it takes and what to report when it is done.
//! Tweens are built with [`Tween::to`] and validated by
//! [`TweenBuilder::build`]; a [`Tweener`] runs them.
//!
//! ```ignore
//! let shrink = Tween::to(mesh, Property::Scale, Vec3::ZERO)
//!     .duration(1.0)
//!     .easing(Easing::CubicIn)
//!     .on_complete(Cue::Shrunk)
//!     .build()?;
//! tweener.add(shrink, world, now);
//! ```
//!
//! Completion is reported as a value of the caller's cue type `C` returned
//! from [`Tweener::update`], rather than a callback, so whoever owns the
//! tweener also decides what happens next.

use glam::Vec3;
use hecs::{Entity, World};

use super::easing::Easing;
use crate::color::Color;
use crate::mesh::Transform;
use crate::scene::Material;

/// An animatable property of a scene entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    /// `Transform::scale` (a [`Vec3`]).
    Scale,
    /// `Transform::rotation.y` in radians (a scalar).
    RotationY,
    /// `Material::color` (a [`Color`]).
    Color,
    /// `Material::opacity` (a scalar).
    Opacity,
}

/// Shape of the value a [`Property`] holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Vec3,
    Color,
}

/// A property value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenValue {
    Scalar(f32),
    Vec3(Vec3),
    Color(Color),
}

impl From<f32> for TweenValue {
    fn from(v: f32) -> Self {
        TweenValue::Scalar(v)
    }
}

impl From<Vec3> for TweenValue {
    fn from(v: Vec3) -> Self {
        TweenValue::Vec3(v)
    }
}

impl From<Color> for TweenValue {
    fn from(v: Color) -> Self {
        TweenValue::Color(v)
    }
}

impl TweenValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TweenValue::Scalar(_) => ValueKind::Scalar,
            TweenValue::Vec3(_) => ValueKind::Vec3,
            TweenValue::Color(_) => ValueKind::Color,
        }
    }

    /// Interpolate towards `to`. Mismatched kinds snap to `to`.
    pub fn lerp(self, to: TweenValue, t: f32) -> TweenValue {
        match (self, to) {
            (TweenValue::Scalar(a), TweenValue::Scalar(b)) => TweenValue::Scalar(a + (b - a) * t),
            (TweenValue::Vec3(a), TweenValue::Vec3(b)) => TweenValue::Vec3(a.lerp(b, t)),
            (TweenValue::Color(a), TweenValue::Color(b)) => TweenValue::Color(a.lerp(b, t)),
            (_, to) => to,
        }
    }
}

impl Property {
    /// The value kind this property reads and writes.
    pub fn kind(self) -> ValueKind {
        match self {
            Property::Scale => ValueKind::Vec3,
            Property::RotationY | Property::Opacity => ValueKind::Scalar,
            Property::Color => ValueKind::Color,
        }
    }

    /// Current value on `entity`, or `None` when the entity or component is gone.
    pub fn read(self, world: &World, entity: Entity) -> Option<TweenValue> {
        match self {
            Property::Scale => world
                .get::<&Transform>(entity)
                .ok()
                .map(|t| TweenValue::Vec3(t.scale)),
            Property::RotationY => world
                .get::<&Transform>(entity)
                .ok()
                .map(|t| TweenValue::Scalar(t.rotation.y)),
            Property::Color => world
                .get::<&Material>(entity)
                .ok()
                .map(|m| TweenValue::Color(m.color)),
            Property::Opacity => world
                .get::<&Material>(entity)
                .ok()
                .map(|m| TweenValue::Scalar(m.opacity)),
        }
    }

    /// Write `value` to `entity`. Returns `false` when there was nothing to write to.
    pub fn write(self, world: &mut World, entity: Entity, value: TweenValue) -> bool {
        match (self, value) {
            (Property::Scale, TweenValue::Vec3(v)) => world
                .query_one_mut::<&mut Transform>(entity)
                .map(|t| t.scale = v)
                .is_ok(),
            (Property::RotationY, TweenValue::Scalar(v)) => world
                .query_one_mut::<&mut Transform>(entity)
                .map(|t| t.rotation.y = v)
                .is_ok(),
            (Property::Color, TweenValue::Color(c)) => world
                .query_one_mut::<&mut Material>(entity)
                .map(|m| {
                    m.color.r = c.r;
                    m.color.g = c.g;
                    m.color.b = c.b;
                })
                .is_ok(),
            (Property::Opacity, TweenValue::Scalar(v)) => world
                .query_one_mut::<&mut Material>(entity)
                .map(|m| m.opacity = v)
                .is_ok(),
            _ => false,
        }
    }
}

/// How many times a tween plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Repeat {
    /// Play once.
    #[default]
    Once,
    /// Play once, then this many more times.
    Times(u32),
    /// Restart from the start value forever. Never completes.
    Forever,
}

/// Reasons a tween configuration is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TweenError {
    #[error("tween duration must be finite and non-negative, got {0}")]
    InvalidDuration(f32),
    #[error("tween delay must be finite and non-negative, got {0}")]
    InvalidDelay(f32),
    #[error("{property:?} holds {expected:?} values, got {found:?}")]
    ValueMismatch {
        property: Property,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("an endlessly repeating tween needs a positive duration")]
    EndlessWithoutDuration,
    #[error("an endlessly repeating tween never completes, so it cannot carry a completion cue")]
    EndlessWithCompletion,
}

/// A validated tween, ready for [`Tweener::add`].
#[derive(Clone, Debug)]
pub struct Tween<C> {
    pub target: Entity,
    pub property: Property,
    /// Explicit start value. When `None` the property's value at the end of
    /// the delay is used.
    pub from: Option<TweenValue>,
    pub to: TweenValue,
    /// Seconds per play.
    pub duration: f32,
    pub easing: Easing,
    /// Seconds to wait before the first play.
    pub delay: f32,
    pub repeat: Repeat,
    pub on_complete: Option<C>,
}

/// Default duration in seconds when none is given.
pub const DEFAULT_DURATION: f32 = 0.5;

impl<C> Tween<C> {
    /// Start describing a tween of `property` on `target` towards `to`.
    pub fn to(target: Entity, property: Property, to: impl Into<TweenValue>) -> TweenBuilder<C> {
        TweenBuilder {
            tween: Tween {
                target,
                property,
                from: None,
                to: to.into(),
                duration: DEFAULT_DURATION,
                easing: Easing::default(),
                delay: 0.0,
                repeat: Repeat::Once,
                on_complete: None,
            },
        }
    }

    /// Total playing time, or `None` if it repeats forever.
    pub fn total_duration(&self) -> Option<f32> {
        match self.repeat {
            Repeat::Once => Some(self.duration),
            Repeat::Times(n) => Some(self.duration * (n as f32 + 1.0)),
            Repeat::Forever => None,
        }
    }
}

/// Builder for [`Tween`]; see [`Tween::to`].
#[derive(Clone, Debug)]
#[must_use]
pub struct TweenBuilder<C> {
    tween: Tween<C>,
}

impl<C> TweenBuilder<C> {
    /// Start from this value instead of the property's current value.
    ///
    /// The start value is written as soon as the tween is added, even when
    /// it has a delay.
    ///
    /// Without `from`, the start value is read lazily on the first update
    /// after the delay, not when the tween is added.
    pub fn from(mut self, from: impl Into<TweenValue>) -> Self {
        self.tween.from = Some(from.into());
        self
    }

    pub fn duration(mut self, seconds: f32) -> Self {
        self.tween.duration = seconds;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.tween.easing = easing;
        self
    }

    pub fn delay(mut self, seconds: f32) -> Self {
        self.tween.delay = seconds;
        self
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.tween.repeat = repeat;
        self
    }

    /// Report `cue` from [`Tweener::update`] when the tween finishes.
    pub fn on_complete(mut self, cue: C) -> Self {
        self.tween.on_complete = Some(cue);
        self
    }

    /// Validate and produce the tween.
    pub fn build(self) -> Result<Tween<C>, TweenError> {
        let tween = self.tween;

        if !tween.duration.is_finite() || tween.duration < 0.0 {
            return Err(TweenError::InvalidDuration(tween.duration));
        }
        if !tween.delay.is_finite() || tween.delay < 0.0 {
            return Err(TweenError::InvalidDelay(tween.delay));
        }

        let expected = tween.property.kind();
        for value in tween.from.iter().chain(std::iter::once(&tween.to)) {
            if value.kind() != expected {
                return Err(TweenError::ValueMismatch {
                    property: tween.property,
                    expected,
                    found: value.kind(),
                });
            }
        }

        if tween.repeat == Repeat::Forever {
            if tween.duration == 0.0 {
                return Err(TweenError::EndlessWithoutDuration);
            }
            if tween.on_complete.is_some() {
                return Err(TweenError::EndlessWithCompletion);
            }
        }

        Ok(tween)
    }
}

struct ActiveTween<C> {
    tween: Tween<C>,
    start_time: f32,
    /// Start value, captured when the delay runs out.
    from: Option<TweenValue>,
}

/// Runs tweens against a [`World`].
///
/// Tweens update in the order they were added, so when two tweens drive the
/// same property the one added last wins each frame. Nothing is ever
/// cancelled implicitly: a tween runs until it completes, or until its
/// target disappears from the world.
pub struct Tweener<C> {
    active: Vec<ActiveTween<C>>,
}

impl<C> Default for Tweener<C> {
    fn default() -> Self {
        Self { active: Vec::new() }
    }
}

impl<C> Tweener<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tween at time `now`.
    ///
    /// An explicit start value is applied to the world immediately.
    pub fn add(&mut self, tween: Tween<C>, world: &mut World, now: f32) {
        if let Some(from) = tween.from {
            tween.property.write(world, tween.target, from);
        }
        self.active.push(ActiveTween {
            from: None,
            tween,
            start_time: now,
        });
    }

    /// Advance every tween to time `now` and return the cues of the ones that finished.
    pub fn update(&mut self, now: f32, world: &mut World) -> Vec<C> {
        let mut finished = Vec::new();

        self.active.retain_mut(|active| {
            let local = now - active.start_time - active.tween.delay;
            if local < 0.0 {
                return true;
            }

            if active.from.is_none() {
                active.from = active
                    .tween
                    .from
                    .or_else(|| active.tween.property.read(world, active.tween.target));
            }

            let tween = &mut active.tween;
            let Some(from) = active.from else {
                log::debug!(
                    "Dropping {:?} tween: target {:?} is gone",
                    tween.property,
                    tween.target
                );
                return false;
            };

            let done = tween.total_duration().is_some_and(|total| local >= total);
            let progress = if done || tween.duration <= 0.0 {
                1.0
            } else {
                (local % tween.duration) / tween.duration
            };

            let value = from.lerp(tween.to, tween.easing.apply(progress));
            if !tween.property.write(world, tween.target, value) {
                log::debug!(
                    "Dropping {:?} tween: target {:?} is gone",
                    tween.property,
                    tween.target
                );
                return false;
            }

            if done {
                finished.push(tween.on_complete.take());
                return false;
            }
            true
        });

        finished.into_iter().flatten().collect()
    }

    /// Number of running tweens, including delayed ones.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Whether any tween targets `entity`.
    pub fn targets(&self, entity: Entity) -> bool {
        self.active.iter().any(|a| a.tween.target == entity)
    }

    /// Whether every tween targeting `entity` repeats forever.
    ///
    /// Also true when nothing targets it.
    pub fn only_endless_on(&self, entity: Entity) -> bool {
        self.active
            .iter()
            .filter(|a| a.tween.target == entity)
            .all(|a| a.tween.repeat == Repeat::Forever)
    }

    /// Stop every tween on `entity` without reporting completion.
    pub fn drop_target(&mut self, entity: Entity) {
        self.active.retain(|a| a.tween.target != entity);
    }
}
