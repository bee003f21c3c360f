//! Shared DSP, math and buffer helpers used by the encoder.

pub mod ambisonics;
pub mod buffer;
pub mod capture;
pub mod direction;
pub mod orientation;
pub mod smoothed;
pub mod window;

use lazy_static::lazy_static;
use rand::Rng;

// -------------------------------------------------------------------------------------------------

/// Volume in dB which gets treated as silence.
pub const MINUS_INF_IN_DB: f32 = -200.0f32;

/// Convert a linear gain into decibels. Values near zero map to [`MINUS_INF_IN_DB`].
pub fn linear_to_db(value: f32) -> f32 {
    lazy_static! {
        static ref LIN_TO_DB_FACTOR: f32 = 20.0f32 / 10.0f32.ln();
    }
    if value == 1.0 {
        return 0.0; // avoid rounding errors at exactly 0 dB
    } else if value > 1e-12f32 {
        return value.ln() * *LIN_TO_DB_FACTOR;
    }
    MINUS_INF_IN_DB
}

/// Convert decibels into a linear gain.
pub fn db_to_linear(value: f32) -> f32 {
    lazy_static! {
        static ref DB_TO_LIN_FACTOR: f32 = 10.0f32.ln() / 20.0f32;
    }
    if value == 0.0f32 {
        return 1.0f32;
    } else if value > MINUS_INF_IN_DB {
        return (value * *DB_TO_LIN_FACTOR).exp();
    }
    0.0f32
}

// -------------------------------------------------------------------------------------------------

/// Draw a uniformly distributed bipolar random value in range `-1.0..=1.0`.
#[inline]
pub fn bipolar_random<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.random_range(-1.0..=1.0)
}

/// Randomize the given value relative to its magnitude: `value * (1 + jitter * u)`, with `u`
/// being a bipolar random value. A jitter of 0 returns the value unchanged.
#[inline]
pub fn randomize_relative<R: Rng + ?Sized>(rng: &mut R, value: f32, jitter: f32) -> f32 {
    if jitter > 0.0 {
        value * (1.0 + jitter * bipolar_random(rng))
    } else {
        value
    }
}

/// Randomize the given value by adding a bipolar random offset of at most `spread`.
/// A spread of 0 returns the value unchanged.
#[inline]
pub fn randomize_absolute<R: Rng + ?Sized>(rng: &mut R, value: f32, spread: f32) -> f32 {
    if spread > 0.0 {
        value + spread * bipolar_random(rng)
    } else {
        value
    }
}

/// Convert a pitch offset in semitones into a playback speed factor.
#[inline]
pub fn pitch_from_semitones(semitones: f32) -> f64 {
    2.0_f64.powf(semitones as f64 / 12.0)
}

// -------------------------------------------------------------------------------------------------
