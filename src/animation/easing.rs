//! Easing curves for tweens.

use serde::{Deserialize, Serialize};

/// Easing functions that shape a tween's progress.
///
/// The quad and cubic families match the "power1" and "power2" curves found in
/// most web tweening libraries: `QuadOut` is the usual default, `CubicIn` is
/// a sharper acceleration used for shrink-outs and `CubicOut` the matching
/// deceleration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    /// Constant speed throughout.
    Linear,
    /// Start slow, accelerate.
    QuadIn,
    /// Start fast, decelerate.
    #[default]
    QuadOut,
    /// Start slow, speed up, then slow down.
    QuadInOut,
    /// Stronger acceleration than [`Easing::QuadIn`].
    CubicIn,
    /// Stronger deceleration than [`Easing::QuadOut`].
    CubicOut,
}

impl Easing {
    /// Apply the easing function to a linear progress value (0.0 to 1.0).
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 6] = [
        Easing::Linear,
        Easing::QuadIn,
        Easing::QuadOut,
        Easing::QuadInOut,
        Easing::CubicIn,
        Easing::CubicOut,
    ];

    #[test]
    fn endpoints_are_fixed() {
        for easing in ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?} at 1");
        }
    }

    #[test]
    fn curves_never_move_backwards() {
        for easing in ALL {
            let mut last = 0.0;
            for step in 1..=100 {
                let value = easing.apply(step as f32 / 100.0);
                assert!(value >= last, "{easing:?} dipped at step {step}");
                last = value;
            }
        }
    }

    #[test]
    fn input_is_clamped() {
        assert_eq!(Easing::CubicOut.apply(-3.0), 0.0);
        assert_eq!(Easing::CubicIn.apply(7.0), 1.0);
    }

    #[test]
    fn in_and_out_bend_opposite_ways() {
        assert!(Easing::CubicIn.apply(0.5) < 0.5);
        assert!(Easing::CubicOut.apply(0.5) > 0.5);
        assert!(Easing::CubicIn.apply(0.5) < Easing::QuadIn.apply(0.5));
        assert_eq!(Easing::QuadInOut.apply(0.5), 0.5);
    }
}
