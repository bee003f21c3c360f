//! Encodes a WAV file into an ambisonic WAV file with the granular encoder.
//!
//! The input is fed to the encoder in varying block sizes, the way audio hosts do.

use std::{io, path::PathBuf};

use arg::{parse_args, Args};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use grainfield::{
    utils::{ambisonics, buffer::to_interleaved_stereo, db_to_linear},
    EncoderParameters, Error, GranularEncoder,
};

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const DEFAULT_LOG_LEVEL: log::Level = if cfg!(debug_assertions) {
    log::Level::Debug
} else {
    log::Level::Warn
};

const MAX_FRAMES: usize = 1024;
const BLOCK_SIZES: [usize; 6] = [64, 480, 1024, 17, 256, 3000];

// -------------------------------------------------------------------------------------------------

/// Program arguments.
#[derive(Args, Debug, Default)]
struct Arguments {
    #[arg(short = "i", long = "input")]
    /// Path of the WAV file to encode.
    input_path: Option<PathBuf>,
    #[arg(short = "o", long = "output")]
    /// Path of the ambisonic WAV file to write. By default \"encoded.wav\".
    output_path: Option<PathBuf>,
    #[arg(long = "order")]
    /// Ambisonic order of the output in range 0 to 7. By default 3.
    order: Option<usize>,
    #[arg(long = "size")]
    /// Spread of the grain directions in degrees. By default 90.
    size: Option<f32>,
    #[arg(long = "freeze-at")]
    /// Freeze the input history after the given number of seconds.
    freeze_at: Option<f32>,
    #[arg(long = "tail")]
    /// Seconds of silence to append to the input. By default 2.
    tail: Option<f32>,
    #[arg(long = "gain")]
    /// Output gain in dB. By default 0.
    gain: Option<f32>,
    #[arg(short = "l", long = "log-level")]
    /// Set logging level to \"debug\", \"info\", \"warn\" or \"error\".
    /// By default \"debug\" in dev builds and \"warn\" in release builds.
    log_level: Option<log::Level>,
}

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Error> {
    let args = parse_args::<Arguments>();

    simple_logger::SimpleLogger::new()
        .with_level(args.log_level.unwrap_or(DEFAULT_LOG_LEVEL).to_level_filter())
        .init()
        .expect("Failed to set logger");

    let input_path = args.input_path.clone().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "Missing input file argument")
    })?;
    let output_path = args
        .output_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("encoded.wav"));

    // Read and convert input to stereo
    let mut reader = WavReader::open(&input_path).map_err(wav_error)?;
    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>(),
        SampleFormat::Int => {
            let scale = 1.0 / (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()
        }
    }
    .map_err(wav_error)?;
    let mut input = Vec::new();
    to_interleaved_stereo(&samples, spec.channels as usize, &mut input);
    let tail_frames = (args.tail.unwrap_or(2.0).max(0.0) * spec.sample_rate as f32) as usize;
    input.resize(input.len() + tail_frames * 2, 0.0);
    log::info!(
        "Read '{}': {} Hz, {} channels, {} frames",
        input_path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len() / spec.channels as usize
    );

    // Create and configure the encoder
    let order = args.order.unwrap_or(3).min(ambisonics::MAX_ORDER);
    let output_channel_count = ambisonics::channel_count(order);
    let parameters = EncoderParameters::new_shared();
    parameters.set_value(EncoderParameters::ORDER.id(), order as f32)?;
    parameters.set_value(EncoderParameters::SIZE.id(), args.size.unwrap_or(90.0))?;
    parameters.set_value(EncoderParameters::DELTA_TIME.id(), 0.02)?;
    parameters.set_value(EncoderParameters::DELTA_TIME_JITTER.id(), 0.3)?;
    parameters.set_value(EncoderParameters::GRAIN_LENGTH.id(), 0.15)?;
    parameters.set_value(EncoderParameters::POSITION_JITTER.id(), 0.2)?;
    parameters.set_value(EncoderParameters::MIX.id(), 0.8)?;

    let mut encoder = GranularEncoder::new(parameters.clone());
    encoder.initialize(spec.sample_rate, 2, output_channel_count, MAX_FRAMES)?;

    // Process in varying block sizes
    let frame_count = input.len() / 2;
    let freeze_frame = args
        .freeze_at
        .map(|seconds| (seconds.max(0.0) * spec.sample_rate as f32) as usize);
    let mut output = vec![0.0; frame_count * output_channel_count];
    let mut frame = 0;
    for block_size in BLOCK_SIZES.iter().cycle() {
        if frame >= frame_count {
            break;
        }
        if freeze_frame.is_some_and(|freeze_frame| frame >= freeze_frame) {
            parameters.set_value(EncoderParameters::FREEZE.id(), 1.0)?;
        }
        let block_size = (*block_size).min(frame_count - frame);
        encoder.process(
            &input[frame * 2..(frame + block_size) * 2],
            &mut output[frame * output_channel_count..(frame + block_size) * output_channel_count],
        );
        frame += block_size;
    }
    let statistics = encoder.statistics();
    log::info!(
        "Encoded {frame_count} frames: {} grains spawned, {} dropped",
        statistics.spawned_grains,
        statistics.dropped_grains
    );

    // Write ambisonic output
    let mut writer = WavWriter::create(
        &output_path,
        WavSpec {
            channels: output_channel_count as u16,
            sample_rate: spec.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )
    .map_err(wav_error)?;
    let gain = db_to_linear(args.gain.unwrap_or(0.0));
    for sample in output {
        writer.write_sample(sample * gain).map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)?;
    log::info!(
        "Wrote '{}': order {order}, {output_channel_count} channels",
        output_path.display()
    );

    Ok(())
}

fn wav_error(err: hound::Error) -> Error {
    match err {
        hound::Error::IoError(err) => Error::IoError(err),
        err => Error::IoError(io::Error::new(io::ErrorKind::InvalidData, err)),
    }
}
