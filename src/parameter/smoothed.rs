use crate::utils::smoothed::{ExponentialSmoothedValue, SmoothedValue};

use super::FloatParameter;

// -------------------------------------------------------------------------------------------------

/// A float parameter's value on the render side, smoothed per frame to avoid zipper noise.
///
/// New targets are clamped into the parameter's range before they get applied. Call
/// [`Self::set_sample_rate`] whenever the encoder gets initialized.
#[derive(Debug, Clone)]
pub struct SmoothedParameterValue<Value: SmoothedValue = ExponentialSmoothedValue> {
    description: FloatParameter,
    value: Value,
}

impl<Value: SmoothedValue + From<f32>> SmoothedParameterValue<Value> {
    /// Create a new smoothed value, starting at the parameter's default value.
    pub fn from_description(description: FloatParameter) -> Self {
        let value = Value::from(description.default_value());
        Self { description, value }
    }
}

impl<Value: SmoothedValue> SmoothedParameterValue<Value> {
    pub fn description(&self) -> &FloatParameter {
        &self.description
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.value.set_sample_rate(sample_rate)
    }

    /// Advance the smoother by one frame and return the new value.
    #[inline(always)]
    pub fn next_value(&mut self) -> f32 {
        self.value.next()
    }

    #[inline(always)]
    pub fn current_value(&self) -> f32 {
        self.value.current()
    }

    #[inline(always)]
    pub fn target_value(&self) -> f32 {
        self.value.target()
    }

    /// Ramp towards the given value.
    pub fn set_target_value_clamped(&mut self, value: f32) {
        let value = self.description.clamp_value(value);
        if value != self.value.target() {
            self.value.set_target(value);
        }
    }

    /// Jump to the given value without ramping.
    pub fn init_value_clamped(&mut self, value: f32) {
        self.value.init(self.description.clamp_value(value));
    }
}

// -------------------------------------------------------------------------------------------------
