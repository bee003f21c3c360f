//! Lock-free parameter value storage.
//!
//! Slots are written by a control context (UI, host automation, remote control) and read by the
//! real-time thread. Each slot is a single atomic scalar: writers clamp before storing, so
//! readers always see a valid value and never need to lock or validate.

use std::{
    marker::PhantomData,
    sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering},
};

use atomic_float::AtomicF32;

use super::{
    BooleanParameter, EnumParameter, FloatParameter, IntegerParameter, ParameterValueUpdate,
};

// -------------------------------------------------------------------------------------------------

/// Atomic float parameter value and its description.
#[derive(Debug)]
pub struct FloatParameterSlot {
    description: FloatParameter,
    value: AtomicF32,
}

impl FloatParameterSlot {
    /// Create a new slot, initialized to the parameter's default value.
    pub fn from_description(description: FloatParameter) -> Self {
        let value = AtomicF32::new(description.default_value());
        Self { description, value }
    }

    /// Access the slot's parameter description.
    pub fn description(&self) -> &FloatParameter {
        &self.description
    }

    /// Load the current plain value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    /// Store a new plain value, clamping it into the parameter's range.
    pub fn set_value(&self, value: f32) {
        self.value
            .store(self.description.clamp_value(value), Ordering::Release);
    }

    /// Load the current value as normalized value.
    pub fn normalized_value(&self) -> f32 {
        self.description.normalize_value(self.value())
    }

    /// Store a new value from a normalized value.
    pub fn set_normalized_value(&self, normalized: f32) {
        let normalized = if normalized.is_nan() {
            self.description.normalize_value(self.description.default_value())
        } else {
            normalized.clamp(0.0, 1.0)
        };
        self.set_value(self.description.denormalize_value(normalized));
    }

    /// Applies a parameter update.
    pub fn apply_update(&self, update: &ParameterValueUpdate) {
        match update {
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<f32>() {
                    self.set_value(*value);
                } else if let Some(value) = raw.downcast_ref::<f64>() {
                    self.set_value(*value as f32);
                } else {
                    log::warn!(
                        "Invalid value type for float parameter '{}'",
                        self.description.id()
                    );
                }
            }
            ParameterValueUpdate::Normalized(normalized) => {
                self.set_normalized_value(*normalized);
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Atomic integer parameter value and its description.
#[derive(Debug)]
pub struct IntegerParameterSlot {
    description: IntegerParameter,
    value: AtomicI32,
}

impl IntegerParameterSlot {
    pub fn from_description(description: IntegerParameter) -> Self {
        let value = AtomicI32::new(description.default_value());
        Self { description, value }
    }

    pub fn description(&self) -> &IntegerParameter {
        &self.description
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set_value(&self, value: i32) {
        self.value
            .store(self.description.clamp_value(value), Ordering::Release);
    }

    pub fn normalized_value(&self) -> f32 {
        self.description.normalize_value(self.value())
    }

    pub fn set_normalized_value(&self, normalized: f32) {
        if !normalized.is_nan() {
            self.set_value(self.description.denormalize_value(normalized.clamp(0.0, 1.0)));
        }
    }

    pub fn apply_update(&self, update: &ParameterValueUpdate) {
        match update {
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<i32>() {
                    self.set_value(*value);
                } else if let Some(value) = raw.downcast_ref::<usize>() {
                    self.set_value((*value).min(i32::MAX as usize) as i32);
                } else if let Some(value) = raw.downcast_ref::<f32>() {
                    self.set_value(value.round() as i32);
                } else {
                    log::warn!(
                        "Invalid value type for integer parameter '{}'",
                        self.description.id()
                    );
                }
            }
            ParameterValueUpdate::Normalized(normalized) => {
                self.set_normalized_value(*normalized);
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Atomic boolean parameter value and its description.
#[derive(Debug)]
pub struct BooleanParameterSlot {
    description: BooleanParameter,
    value: AtomicBool,
}

impl BooleanParameterSlot {
    pub fn from_description(description: BooleanParameter) -> Self {
        let value = AtomicBool::new(description.default_value());
        Self { description, value }
    }

    pub fn description(&self) -> &BooleanParameter {
        &self.description
    }

    #[inline]
    pub fn value(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    pub fn set_value(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    pub fn normalized_value(&self) -> f32 {
        self.description.normalize_value(self.value())
    }

    pub fn set_normalized_value(&self, normalized: f32) {
        if !normalized.is_nan() {
            self.set_value(self.description.denormalize_value(normalized.clamp(0.0, 1.0)));
        }
    }

    pub fn apply_update(&self, update: &ParameterValueUpdate) {
        match update {
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<bool>() {
                    self.set_value(*value);
                } else {
                    log::warn!(
                        "Invalid value type for boolean parameter '{}'",
                        self.description.id()
                    );
                }
            }
            ParameterValueUpdate::Normalized(normalized) => {
                self.set_normalized_value(*normalized);
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Atomic enum parameter value and its description. The enum is stored as variant index.
#[derive(Debug)]
pub struct EnumParameterSlot<T> {
    description: EnumParameter,
    index: AtomicUsize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> EnumParameterSlot<T>
where
    T: strum::VariantArray + Copy + PartialEq + 'static,
{
    pub fn from_description(description: EnumParameter) -> Self {
        debug_assert_eq!(
            description.values().len(),
            T::VARIANTS.len(),
            "Enum parameter values don't match the enum's variants"
        );
        let index = AtomicUsize::new(description.default_index());
        Self {
            description,
            index,
            _marker: PhantomData,
        }
    }

    pub fn description(&self) -> &EnumParameter {
        &self.description
    }

    #[inline]
    pub fn value(&self) -> T {
        let index = self.index.load(Ordering::Acquire);
        T::VARIANTS[index.min(T::VARIANTS.len() - 1)]
    }

    pub fn set_value(&self, value: T) {
        if let Some(index) = T::VARIANTS.iter().position(|v| *v == value) {
            self.index.store(index, Ordering::Release);
        }
    }

    pub fn normalized_value(&self) -> f32 {
        self.description
            .normalize_index(self.index.load(Ordering::Acquire))
    }

    pub fn set_normalized_value(&self, normalized: f32) {
        if !normalized.is_nan() {
            let index = self
                .description
                .denormalize_index(normalized.clamp(0.0, 1.0));
            self.index
                .store(index.min(T::VARIANTS.len() - 1), Ordering::Release);
        }
    }

    pub fn apply_update(&self, update: &ParameterValueUpdate) {
        match update {
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<T>() {
                    self.set_value(*value);
                } else if let Some(index) = raw
                    .downcast_ref::<String>()
                    .and_then(|name| self.description.index_of(name))
                {
                    self.index.store(index, Ordering::Release);
                } else {
                    log::warn!(
                        "Invalid value type for enum parameter '{}'",
                        self.description.id()
                    );
                }
            }
            ParameterValueUpdate::Normalized(normalized) => {
                self.set_normalized_value(*normalized);
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
