//! Per-frame parameter smoothing.

use std::fmt::Debug;

// -------------------------------------------------------------------------------------------------

/// A value which moves from its current towards a target value, one step per audio frame.
pub trait SmoothedValue: Debug {
    /// The current, possibly ramping value.
    #[must_use]
    fn current(&self) -> f32;
    /// The value the smoother moves towards.
    #[must_use]
    fn target(&self) -> f32;

    /// Advance the ramp, if needed, and return the new current value.
    #[must_use]
    fn next(&mut self) -> f32 {
        if self.need_ramp() {
            self.ramp();
            self.current()
        } else {
            self.target()
        }
    }

    /// True while the current value has not yet reached the target.
    #[must_use]
    fn need_ramp(&self) -> bool;
    /// Move one frame towards the target. Does nothing when no ramp is needed.
    fn ramp(&mut self);

    /// Jump to the given value without ramping.
    fn init(&mut self, value: f32);
    /// Set a new target value, starting a ramp from the current value.
    fn set_target(&mut self, target: f32);

    /// Ramps are specified in frames of the given sample rate.
    fn set_sample_rate(&mut self, sample_rate: u32);
}

// -------------------------------------------------------------------------------------------------

/// One-pole smoother: approaches the target by a fixed share of the remaining distance per frame.
///
/// Used for continuous controls such as the dry/wet mix, where an asymptotic ramp sounds natural.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothedValue {
    current: f32,
    target: f32,
    coefficient: f32,
}

impl ExponentialSmoothedValue {
    /// Time in seconds to cover about 63% of the distance to the target.
    pub const TIME_CONSTANT: f32 = 0.005;

    pub fn new(value: f32, sample_rate: u32) -> Self {
        let mut smoothed = Self {
            current: value,
            target: value,
            coefficient: 1.0,
        };
        smoothed.set_sample_rate(sample_rate);
        smoothed
    }
}

impl SmoothedValue for ExponentialSmoothedValue {
    #[inline(always)]
    fn current(&self) -> f32 {
        self.current
    }

    #[inline(always)]
    fn target(&self) -> f32 {
        self.target
    }

    fn need_ramp(&self) -> bool {
        const EPSILON: f32 = f32::EPSILON * 100.0;
        (self.target - self.current).abs() * self.coefficient > EPSILON
    }

    fn ramp(&mut self) {
        self.current += (self.target - self.current) * self.coefficient;
        if !self.need_ramp() {
            self.current = self.target;
        }
    }

    fn init(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    fn set_target(&mut self, target: f32) {
        self.target = target;
        if !self.need_ramp() {
            self.current = target;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        let frames = Self::TIME_CONSTANT * sample_rate.max(1) as f32;
        self.coefficient = (1.0 - (-1.0 / frames).exp()).clamp(f32::EPSILON, 1.0);
    }
}

impl From<f32> for ExponentialSmoothedValue {
    fn from(value: f32) -> Self {
        Self::new(value, 44100)
    }
}

// -------------------------------------------------------------------------------------------------

/// Linear ramp which reaches its target after an exact number of frames.
///
/// The last step snaps to the target, so a ramp towards 0 or 1 ends bit-exact. This makes it
/// usable as sample accurate crossfade gain.
#[derive(Debug, Clone)]
pub struct LinearSmoothedValue {
    current: f32,
    target: f32,
    increment: f32,
    pending_steps: u32,
    default_steps: u32,
}

impl LinearSmoothedValue {
    /// Ramp duration in seconds of [`SmoothedValue::set_target`].
    pub const DEFAULT_DURATION: f64 = 0.02;

    pub fn new(value: f32, sample_rate: u32) -> Self {
        let mut smoothed = Self {
            current: value,
            target: value,
            increment: 0.0,
            pending_steps: 0,
            default_steps: 1,
        };
        smoothed.set_sample_rate(sample_rate);
        smoothed
    }

    /// Number of frames left until the target is reached.
    #[inline(always)]
    pub fn pending_steps(&self) -> u32 {
        self.pending_steps
    }

    /// Ramp to `target` in exactly `frames` frames, or in the default duration when None.
    /// A duration of zero frames jumps to the target.
    pub fn set_target_with_duration(&mut self, target: f32, frames: Option<u32>) {
        self.target = target;
        let frames = frames.unwrap_or(self.default_steps);
        if self.current == target || frames == 0 {
            self.current = target;
            self.pending_steps = 0;
        } else {
            self.increment = (target - self.current) / frames as f32;
            self.pending_steps = frames;
        }
    }
}

impl SmoothedValue for LinearSmoothedValue {
    #[inline(always)]
    fn current(&self) -> f32 {
        self.current
    }

    #[inline(always)]
    fn target(&self) -> f32 {
        self.target
    }

    #[inline(always)]
    fn need_ramp(&self) -> bool {
        self.pending_steps > 0
    }

    fn ramp(&mut self) {
        if self.pending_steps > 0 {
            self.pending_steps -= 1;
            if self.pending_steps == 0 {
                self.current = self.target;
            } else {
                self.current += self.increment;
            }
        }
    }

    fn init(&mut self, value: f32) {
        self.target = value;
        self.current = value;
        self.pending_steps = 0;
    }

    fn set_target(&mut self, target: f32) {
        self.set_target_with_duration(target, None);
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        debug_assert!(sample_rate > 0, "Invalid sample rate");
        self.default_steps = ((Self::DEFAULT_DURATION * sample_rate as f64).round() as u32).max(1);
    }
}

impl From<f32> for LinearSmoothedValue {
    fn from(value: f32) -> Self {
        Self::new(value, 44100)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_ramps() {
        let mut value = ExponentialSmoothedValue::new(0.0, 48000);
        value.set_target(0.0);
        assert!(!value.need_ramp());
        assert_eq!(value.next(), 0.0);

        value.set_target(1.0);
        assert!(value.need_ramp());
        let mut last = 0.0;
        for _ in 0..10 {
            let next = value.next();
            assert!(next > last && next < 1.0);
            last = next;
        }
        for _ in 0..48000 {
            let _ = value.next();
        }
        assert!(!value.need_ramp());
        assert_eq!(value.current(), 1.0);

        value.init(0.25);
        assert_eq!(value.current(), 0.25);
        assert_eq!(value.target(), 0.25);
    }

    #[test]
    fn exponential_speed_follows_sample_rate() {
        let mut slow = ExponentialSmoothedValue::new(0.0, 96000);
        let mut fast = ExponentialSmoothedValue::new(0.0, 24000);
        slow.set_target(1.0);
        fast.set_target(1.0);
        assert!(fast.next() > slow.next());
    }

    #[test]
    fn linear_ramps_are_exact() {
        let mut value = LinearSmoothedValue::new(1.0, 48000);
        value.set_target_with_duration(0.0, Some(480));
        assert_eq!(value.pending_steps(), 480);
        for _ in 0..479 {
            assert!(value.next() > 0.0);
        }
        assert_eq!(value.next(), 0.0);
        assert!(!value.need_ramp());

        value.set_target_with_duration(1.0, Some(0));
        assert_eq!(value.current(), 1.0);
        assert!(!value.need_ramp());

        // default duration
        value.set_target(0.5);
        assert_eq!(value.pending_steps(), 960);
        value.init(0.0);
        assert_eq!(value.pending_steps(), 0);
        assert_eq!(value.next(), 0.0);
    }
}
