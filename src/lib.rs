#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod encoder;
mod error;
mod parameter;

// public, flat re-exports
pub use error::Error;

pub use encoder::{
    freeze::OperationMode,
    grain::GrainInfo,
    parameters::{EncoderParameters, ParameterSnapshot, SharedEncoderParameters},
    EncoderStatistics, GranularEncoder,
};

// public mods
pub mod utils;

pub mod parameters {
    //! Parameter descriptors and value types, e.g. to build generic UIs or automation bindings.

    pub use super::parameter::{
        BooleanParameter, BooleanParameterSlot, ClonableParameter, EnumParameter,
        EnumParameterSlot, FloatParameter, FloatParameterSlot, IntegerParameter,
        IntegerParameterSlot, Parameter, ParameterScaling, ParameterType, ParameterValueUpdate,
        SmoothedParameterValue,
    };
}
