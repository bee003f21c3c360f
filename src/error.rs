use std::{error, fmt, io};

// -------------------------------------------------------------------------------------------------

/// Provides an enumeration of all possible errors reported by grainfield.
///
/// Errors are only reported from setup and control functions. The real-time processing path
/// never fails: all values it uses got clamped when they were written.
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    ParameterError(String),
    UnsupportedChannelLayout { inputs: usize, outputs: usize },
    InvalidSampleRate(u32),
    InvalidBlockSize(usize),
    IoError(io::Error),
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterError(str) => write!(f, "Invalid parameter: {str}"),
            Self::UnsupportedChannelLayout { inputs, outputs } => write!(
                f,
                "Unsupported channel layout: {inputs} inputs, {outputs} outputs \
                (expecting 2 inputs and 1 to 64 outputs)"
            ),
            Self::InvalidSampleRate(rate) => write!(f, "Invalid sample rate: {rate}"),
            Self::InvalidBlockSize(size) => write!(f, "Invalid block size: {size}"),
            Self::IoError(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}
