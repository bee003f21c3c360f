use strum::{Display, EnumString, VariantNames};

use crate::utils::smoothed::{LinearSmoothedValue, SmoothedValue};

// -------------------------------------------------------------------------------------------------

/// Capture state of the encoder's input history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
pub enum OperationMode {
    /// Input gets recorded into the capture buffer.
    #[default]
    Realtime,
    /// Fading out recording, towards [`OperationMode::Freeze`].
    ToFreeze,
    /// Recording is stopped: the captured history stays untouched.
    Freeze,
    /// Fading in recording, towards [`OperationMode::Realtime`].
    ToRealtime,
}

// -------------------------------------------------------------------------------------------------

/// Crossfades the capture buffer's write gain when freezing or unfreezing the input history.
///
/// Toggle edges are applied once per block via [`Self::update`]. The write gain then ramps
/// linearly per frame, and the machine settles in `Freeze` or `Realtime` exactly when the ramp
/// completes. Reversing a transition midway ramps back from the current gain, taking a share of
/// the full ramp time proportional to the remaining distance.
#[derive(Debug, Clone)]
pub(crate) struct FreezeStateMachine {
    mode: OperationMode,
    freeze: bool,
    write_gain: LinearSmoothedValue,
    ramp_frames: u32,
}

impl FreezeStateMachine {
    /// Duration of a full write gain ramp in seconds.
    pub const RAMP_DURATION: f64 = 0.1;

    pub fn new(sample_rate: u32) -> Self {
        let mut machine = Self {
            mode: OperationMode::Realtime,
            freeze: false,
            write_gain: LinearSmoothedValue::new(1.0, sample_rate),
            ramp_frames: 1,
        };
        machine.set_sample_rate(sample_rate);
        machine
    }

    /// Update the ramp duration for the given sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.write_gain.set_sample_rate(sample_rate);
        self.ramp_frames = ((Self::RAMP_DURATION * sample_rate as f64).round() as u32).max(1);
    }

    /// Go back to realtime recording without any ramp.
    pub fn reset(&mut self) {
        self.mode = OperationMode::Realtime;
        self.freeze = false;
        self.write_gain.init(1.0);
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    /// Length of a full ramp in frames.
    #[cfg(test)]
    pub fn ramp_frames(&self) -> u32 {
        self.ramp_frames
    }

    /// Apply the freeze toggle state. Returns true when a new transition started.
    pub fn update(&mut self, freeze: bool) -> bool {
        if freeze == self.freeze {
            return false;
        }
        self.freeze = freeze;
        let (mode, target) = if freeze {
            (OperationMode::ToFreeze, 0.0)
        } else {
            (OperationMode::ToRealtime, 1.0)
        };
        let distance = (target - self.write_gain.current()).abs();
        let frames = (distance as f64 * self.ramp_frames as f64).round() as u32;
        if frames == 0 {
            self.write_gain.init(target);
            self.mode = Self::settled_mode(mode);
        } else {
            self.write_gain.set_target_with_duration(target, Some(frames));
            self.mode = mode;
        }
        log::debug!("Input capture mode changed to '{}'", self.mode);
        true
    }

    /// Write gain for the next frame, or None when recording is stopped.
    #[inline]
    pub fn next_write_gain(&mut self) -> Option<f32> {
        match self.mode {
            OperationMode::Realtime => Some(1.0),
            OperationMode::Freeze => None,
            OperationMode::ToFreeze | OperationMode::ToRealtime => {
                let gain = self.write_gain.next();
                if !self.write_gain.need_ramp() {
                    self.mode = Self::settled_mode(self.mode);
                }
                Some(gain)
            }
        }
    }

    fn settled_mode(mode: OperationMode) -> OperationMode {
        match mode {
            OperationMode::ToFreeze | OperationMode::Freeze => OperationMode::Freeze,
            OperationMode::ToRealtime | OperationMode::Realtime => OperationMode::Realtime,
        }
    }
}

// -------------------------------------------------------------------------------------------------
