// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Easing curves for interpolating activities.

/// Maps a linear loop fraction onto an eased one.
///
/// Inputs are clamped to `[0, 1]`, so a clamped final scheduler step always
/// eases to exactly `1.0`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// No easing.
    #[default]
    Linear,
    /// Slow start, quadratic.
    EaseIn,
    /// Slow finish, quadratic.
    EaseOut,
    /// Slow start and finish.
    EaseInOut,
}

impl Easing {
    /// Apply the curve to a linear fraction.
    pub fn ease(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => {
                let u = 1.0 - t;
                1.0 - u * u
            }
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = 1.0 - t;
                    1.0 - 2.0 * u * u
                }
            }
        }
    }
}
