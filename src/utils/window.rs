//! Precomputed attack/decay grain window.

use std::f32::consts::PI;

// -------------------------------------------------------------------------------------------------

/// Precomputed grain amplitude window with an adjustable half-cosine attack and decay and a flat
/// sustain section in between.
///
/// Attack and decay are fractions of the grain length. When their sum exceeds 1, both get scaled
/// down proportionally so that the attack ends exactly where the decay starts.
#[derive(Debug, Clone)]
pub struct WindowTable {
    table: [f32; Self::RESOLUTION],
    attack: f32,
    decay: f32,
    mean_gain: f32,
}

impl Default for WindowTable {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

impl WindowTable {
    /// Number of precomputed window points.
    pub const RESOLUTION: usize = 1024;
    /// Minimum attack or decay change which triggers a rebuild of the table.
    pub const REBUILD_THRESHOLD: f32 = 1.0e-3;

    pub fn new(attack: f32, decay: f32) -> Self {
        let mut window = Self {
            table: [0.0; Self::RESOLUTION],
            attack: f32::NAN,
            decay: f32::NAN,
            mean_gain: 0.0,
        };
        window.rebuild(attack, decay);
        window
    }

    /// Attack fraction the table was built with, before normalization.
    pub fn attack(&self) -> f32 {
        self.attack
    }

    /// Decay fraction the table was built with, before normalization.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Average window amplitude over the whole grain.
    pub fn mean_gain(&self) -> f32 {
        self.mean_gain
    }

    /// Rebuild the table if the given shape differs noticeably from the current one.
    /// Returns true when the table was rebuilt.
    pub fn update(&mut self, attack: f32, decay: f32) -> bool {
        if (attack - self.attack).abs() > Self::REBUILD_THRESHOLD
            || (decay - self.decay).abs() > Self::REBUILD_THRESHOLD
            || self.attack.is_nan()
        {
            self.rebuild(attack, decay);
            true
        } else {
            false
        }
    }

    fn rebuild(&mut self, attack: f32, decay: f32) {
        let attack = if attack.is_finite() { attack.clamp(0.0, 1.0) } else { 0.5 };
        let decay = if decay.is_finite() { decay.clamp(0.0, 1.0) } else { 0.5 };
        self.attack = attack;
        self.decay = decay;

        let (attack, decay) = if attack + decay > 1.0 {
            let scale = 1.0 / (attack + decay);
            (attack * scale, decay * scale)
        } else {
            (attack, decay)
        };

        let mut sum = 0.0;
        for (i, value) in self.table.iter_mut().enumerate() {
            let phase = i as f32 / (Self::RESOLUTION - 1) as f32;
            *value = if phase < attack {
                0.5 * (1.0 - (PI * phase / attack).cos())
            } else if phase > 1.0 - decay {
                0.5 * (1.0 - (PI * (1.0 - phase) / decay).cos())
            } else {
                1.0
            };
            sum += *value;
        }
        self.mean_gain = sum / Self::RESOLUTION as f32;
    }

    /// Evaluate the window at the given normalized phase in range `0.0..=1.0`.
    #[inline]
    pub fn sample(&self, phase: f32) -> f32 {
        debug_assert!((0.0..=1.0).contains(&phase), "Invalid window phase");
        let index_float = phase.clamp(0.0, 1.0) * (Self::RESOLUTION - 1) as f32;
        let index = index_float as usize;
        if index < Self::RESOLUTION - 1 {
            let fraction = index_float - index as f32;
            self.table[index] * (1.0 - fraction) + self.table[index + 1] * fraction
        } else {
            self.table[Self::RESOLUTION - 1]
        }
    }
}

// -------------------------------------------------------------------------------------------------
