use four_cc::FourCC;

use super::{Parameter, ParameterType};

// -------------------------------------------------------------------------------------------------

/// An enum parameter descriptor.
///
/// Values are the enum's variant names, as provided by `strum::VariantNames`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumParameter {
    id: FourCC,
    name: &'static str,
    values: &'static [&'static str],
    default_index: usize,
}

impl EnumParameter {
    pub const fn new(
        id: FourCC,
        name: &'static str,
        values: &'static [&'static str],
        default_index: usize,
    ) -> Self {
        assert!(!values.is_empty(), "Need at least one enum value");
        assert!(default_index < values.len(), "Invalid default index");
        Self {
            id,
            name,
            values,
            default_index,
        }
    }

    pub const fn id(&self) -> FourCC {
        self.id
    }

    pub const fn values(&self) -> &'static [&'static str] {
        self.values
    }

    pub const fn default_index(&self) -> usize {
        self.default_index
    }

    pub fn default_value(&self) -> &'static str {
        self.values[self.default_index]
    }

    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| *v == value)
    }

    pub fn normalize_index(&self, index: usize) -> f32 {
        if self.values.len() > 1 {
            index.min(self.values.len() - 1) as f32 / (self.values.len() - 1) as f32
        } else {
            0.0
        }
    }

    pub fn denormalize_index(&self, normalized: f32) -> usize {
        assert!((0.0..=1.0).contains(&normalized));
        (normalized * (self.values.len() - 1) as f32).round() as usize
    }
}

impl Parameter for EnumParameter {
    fn id(&self) -> FourCC {
        self.id
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn parameter_type(&self) -> ParameterType {
        ParameterType::Enum {
            values: self.values,
            default_index: self.default_index,
        }
    }

    fn default_normalized_value(&self) -> f32 {
        self.normalize_index(self.default_index)
    }

    fn normalized_value_to_string(&self, normalized: f32, _include_unit: bool) -> String {
        self.values[self.denormalize_index(normalized.clamp(0.0, 1.0))].to_string()
    }

    fn string_to_normalized_value(&self, string: String) -> Option<f32> {
        let string = string.trim();
        let index = self
            .values
            .iter()
            .position(|v| v.eq_ignore_ascii_case(string))?;
        Some(self.normalize_index(index))
    }
}
