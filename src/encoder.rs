use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    parameter::SmoothedParameterValue,
    utils::{
        ambisonics::{self, Coefficients, MAX_CHANNEL_COUNT},
        buffer::clear_buffer,
        capture::{CaptureBuffer, InterpolationQuality},
        direction::DirectionSampler,
        orientation::Vec3,
        pitch_from_semitones,
        randomize_absolute, randomize_relative,
        window::WindowTable,
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

pub(crate) mod freeze;
pub(crate) mod grain;
pub(crate) mod parameters;
pub(crate) mod scheduler;

use freeze::{FreezeStateMachine, OperationMode};
use grain::{GrainInfo, GrainPool, GrainSpawn};
use parameters::{EncoderParameters, ParameterSnapshot, SharedEncoderParameters};
use scheduler::{interval_in_frames, GrainScheduler};

// -------------------------------------------------------------------------------------------------

/// Grain spawn counters, e.g. to show pool usage in UIs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncoderStatistics {
    /// Number of grains which got started.
    pub spawned_grains: u64,
    /// Number of grains which got dropped because the grain pool was exhausted.
    pub dropped_grains: u64,
}

// -------------------------------------------------------------------------------------------------

/// Real-time granular ambisonic encoder.
///
/// Continuously records a stereo input into a circular capture buffer, cuts it into short
/// overlapping grains with randomized position, length, pitch and direction and encodes them
/// into an ambisonic sound field, mixed with the encoded dry input.
///
/// Call [`Self::initialize`] before processing and whenever the sample rate, channel layout or
/// maximum block size changes. [`Self::process`] is real-time safe: it never allocates, locks or
/// fails. Its output is independent of how the input gets split into blocks.
///
/// Parameters are read from a [`SharedEncoderParameters`] instance, which can be modified from
/// any other thread.
pub struct GranularEncoder {
    parameters: SharedEncoderParameters,
    sample_rate: u32,
    output_channel_count: usize,
    max_frames: usize,
    max_order: usize,
    initialized: bool,
    capture: CaptureBuffer,
    pool: GrainPool,
    scheduler: GrainScheduler,
    freeze: FreezeStateMachine,
    reference_window: WindowTable,
    mix: SmoothedParameterValue,
    dry_coefficients: Coefficients,
    previous_dry_coefficients: Coefficients,
    rng: SmallRng,
    statistics: EncoderStatistics,
}

impl GranularEncoder {
    /// Number of input channels the encoder records.
    pub const INPUT_CHANNEL_COUNT: usize = CaptureBuffer::CHANNEL_COUNT;
    /// Maximum number of simultaneously playing grains.
    pub const MAX_GRAINS: usize = GrainPool::POOL_SIZE;

    /// Minimum distance in frames between a grain's read position and the capture buffer's
    /// write head or oldest frame: the widest interpolator's lookahead plus one frame.
    const READ_MARGIN: usize = InterpolationQuality::Cubic.lookahead() + 1;
    /// Maximum random read position offset in seconds at full position jitter.
    const POSITION_SPREAD: f32 = 2.0;

    /// Create a new encoder with a randomly seeded random number generator.
    pub fn new(parameters: SharedEncoderParameters) -> Self {
        Self::with_rng(parameters, SmallRng::from_os_rng())
    }

    /// Create a new encoder with a deterministic random number generator.
    pub fn with_seed(parameters: SharedEncoderParameters, seed: u64) -> Self {
        Self::with_rng(parameters, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(parameters: SharedEncoderParameters, rng: SmallRng) -> Self {
        const DEFAULT_SAMPLE_RATE: u32 = 44100;
        let mut mix = SmoothedParameterValue::from_description(EncoderParameters::MIX);
        mix.set_sample_rate(DEFAULT_SAMPLE_RATE);
        Self {
            parameters,
            sample_rate: DEFAULT_SAMPLE_RATE,
            output_channel_count: 0,
            max_frames: 0,
            max_order: 0,
            initialized: false,
            capture: CaptureBuffer::new(),
            pool: GrainPool::new(),
            scheduler: GrainScheduler::new(),
            freeze: FreezeStateMachine::new(DEFAULT_SAMPLE_RATE),
            reference_window: WindowTable::default(),
            mix,
            dry_coefficients: [0.0; MAX_CHANNEL_COUNT],
            previous_dry_coefficients: [0.0; MAX_CHANNEL_COUNT],
            rng,
            statistics: EncoderStatistics::default(),
        }
    }

    /// Access to the encoder's shared parameters.
    pub fn parameters(&self) -> &SharedEncoderParameters {
        &self.parameters
    }

    /// Sample rate the encoder got initialized with.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved output channels the encoder got initialized with.
    pub fn output_channel_count(&self) -> usize {
        self.output_channel_count
    }

    /// Current capture mode of the input history.
    pub fn operation_mode(&self) -> OperationMode {
        self.freeze.mode()
    }

    /// Ambisonic order of the output, limited by the parameter and the output channel count.
    pub fn effective_order(&self) -> usize {
        self.parameters.snapshot().order.min(self.max_order)
    }

    /// Number of currently playing grains.
    pub fn active_grain_count(&self) -> usize {
        self.pool.active_count()
    }

    /// Direction, source channel and progress of all currently playing grains.
    pub fn grain_directions(&self) -> impl Iterator<Item = GrainInfo> + '_ {
        self.pool.active_grains().map(|grain| grain.info())
    }

    /// Grain spawn counters since the last reset.
    pub fn statistics(&self) -> EncoderStatistics {
        self.statistics
    }

    /// Read-only access to the recorded input history.
    pub fn capture_buffer(&self) -> &CaptureBuffer {
        &self.capture
    }

    /// Prepare the encoder for processing. Reallocates the capture buffer and resets all state.
    ///
    /// Expects a stereo input and 1 to 64 output channels. Blocks passed to [`Self::process`]
    /// may be larger than `max_frames`: they get processed in chunks of `max_frames`.
    pub fn initialize(
        &mut self,
        sample_rate: u32,
        input_channel_count: usize,
        output_channel_count: usize,
        max_frames: usize,
    ) -> Result<(), Error> {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate(sample_rate));
        }
        if input_channel_count != Self::INPUT_CHANNEL_COUNT
            || output_channel_count == 0
            || output_channel_count > MAX_CHANNEL_COUNT
        {
            return Err(Error::UnsupportedChannelLayout {
                inputs: input_channel_count,
                outputs: output_channel_count,
            });
        }
        let capacity = (CaptureBuffer::DURATION * sample_rate as f64).ceil() as usize;
        if max_frames == 0 || max_frames > capacity / 4 {
            return Err(Error::InvalidBlockSize(max_frames));
        }

        self.initialized = false;
        self.sample_rate = sample_rate;
        self.output_channel_count = output_channel_count;
        self.max_frames = max_frames;
        self.max_order = ambisonics::order_for_channel_count(output_channel_count)
            .ok_or(Error::UnsupportedChannelLayout {
                inputs: input_channel_count,
                outputs: output_channel_count,
            })?;

        self.capture.allocate(sample_rate);
        self.freeze.set_sample_rate(sample_rate);
        self.mix.set_sample_rate(sample_rate);
        self.initialized = true;
        self.reset();

        log::info!(
            "Initialized granular encoder: {sample_rate} Hz, {output_channel_count} outputs \
            (max order {}), {max_frames} max frames, {} frames capture buffer",
            self.max_order,
            self.capture.capacity()
        );
        Ok(())
    }

    /// Stop all grains, clear the recorded history and restart the spawn scheduler.
    pub fn reset(&mut self) {
        let snapshot = self.parameters.snapshot();
        self.capture.clear();
        self.pool.reset();
        self.scheduler.reset();
        self.freeze.reset();
        self.mix.init_value_clamped(snapshot.mix);
        self.reference_window
            .update(snapshot.window_attack, snapshot.window_decay);
        let order = snapshot.order.min(self.max_order);
        ambisonics::encode(
            Self::dry_direction(&snapshot),
            order,
            snapshot.normalization,
            &mut self.dry_coefficients,
        );
        self.previous_dry_coefficients = self.dry_coefficients;
        self.statistics = EncoderStatistics::default();
        log::debug!("Reset granular encoder");
    }

    /// Process a block of interleaved stereo input frames into interleaved ambisonic output
    /// frames with `output_channel_count` channels.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        Self::assert_no_alloc(|| self.process_frames(input, output));
    }

    fn process_frames(&mut self, input: &[f32], output: &mut [f32]) {
        if !self.initialized {
            clear_buffer(output);
            return;
        }
        let input_channel_count = Self::INPUT_CHANNEL_COUNT;
        let output_channel_count = self.output_channel_count;
        debug_assert_eq!(
            input.len() / input_channel_count,
            output.len() / output_channel_count,
            "Input and output frame counts don't match"
        );
        let frame_count =
            (input.len() / input_channel_count).min(output.len() / output_channel_count);
        clear_buffer(&mut output[frame_count * output_channel_count..]);

        for (input, output) in input[..frame_count * input_channel_count]
            .chunks(self.max_frames * input_channel_count)
            .zip(output.chunks_mut(self.max_frames * output_channel_count))
        {
            self.process_block(input, output);
        }
    }

    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        let snapshot = self.parameters.snapshot();
        let output_channel_count = self.output_channel_count;
        let order = snapshot.order.min(self.max_order);
        let encoded_channel_count = ambisonics::channel_count(order);
        let quality = snapshot.interpolation();

        self.freeze.update(snapshot.freeze);
        self.mix.set_target_value_clamped(snapshot.mix);
        self.reference_window
            .update(snapshot.window_attack, snapshot.window_decay);

        self.previous_dry_coefficients = self.dry_coefficients;
        ambisonics::encode(
            Self::dry_direction(&snapshot),
            order,
            snapshot.normalization,
            &mut self.dry_coefficients,
        );

        // record the whole block first: grains only read up to each frame's own write head
        let head_start = self.capture.write_head();
        let freeze = &mut self.freeze;
        let frames_written = self.capture.write(input, || freeze.next_write_gain());

        let frame_count = input.len() / Self::INPUT_CHANNEL_COUNT;
        let dry_ramp_step = 1.0 / frame_count as f32;
        for (frame_index, (input_frame, output_frame)) in input
            .chunks_exact(Self::INPUT_CHANNEL_COUNT)
            .zip(output.chunks_exact_mut(output_channel_count))
            .enumerate()
        {
            let write_head = (head_start + (frame_index + 1).min(frames_written))
                % self.capture.capacity();
            if self.scheduler.tick() {
                let interval = self.spawn_grain(write_head);
                self.scheduler.schedule(interval);
            }

            let mut wet = [0.0; MAX_CHANNEL_COUNT];
            self.pool
                .process(&self.capture, quality, &mut wet[..encoded_channel_count]);

            let mix = self.mix.next_value();
            let dry = (input_frame[0] + input_frame[1]) * 0.5;
            let dry_ramp = (frame_index + 1) as f32 * dry_ramp_step;
            for (channel, out) in output_frame[..encoded_channel_count].iter_mut().enumerate() {
                let previous = self.previous_dry_coefficients[channel];
                let coefficient = previous + (self.dry_coefficients[channel] - previous) * dry_ramp;
                *out = dry * coefficient * (1.0 - mix) + wet[channel] * mix;
            }
            clear_buffer(&mut output_frame[encoded_channel_count..]);
        }
    }

    /// Draw a new grain's parameters from a fresh parameter snapshot and start it.
    /// Returns the interval in frames until the next grain should spawn.
    fn spawn_grain(&mut self, write_head: usize) -> usize {
        let snapshot = self.parameters.snapshot();
        let sample_rate = self.sample_rate as f32;
        let rng = &mut self.rng;

        let delta_time = EncoderParameters::DELTA_TIME;
        let interval_seconds = delta_time.clamp_value(randomize_relative(
            rng,
            snapshot.delta_time,
            snapshot.delta_time_jitter,
        ));
        let interval = interval_in_frames(interval_seconds, self.sample_rate);

        let grain_length = EncoderParameters::GRAIN_LENGTH;
        let length_seconds = grain_length.clamp_value(randomize_relative(
            rng,
            snapshot.grain_length,
            snapshot.grain_length_jitter,
        ));
        let length = ((length_seconds * sample_rate).round() as usize).max(1);

        let pitch = pitch_from_semitones(EncoderParameters::PITCH.clamp_value(randomize_absolute(
            rng,
            snapshot.pitch,
            snapshot.pitch_jitter,
        )));

        let position_seconds = EncoderParameters::POSITION.clamp_value(randomize_absolute(
            rng,
            snapshot.position,
            snapshot.position_jitter * Self::POSITION_SPREAD,
        ));

        let attack = randomize_absolute(rng, snapshot.window_attack, snapshot.window_attack_jitter)
            .clamp(0.0, 1.0);
        let decay = randomize_absolute(rng, snapshot.window_decay, snapshot.window_decay_jitter)
            .clamp(0.0, 1.0);

        let right_channel_probability = (snapshot.source_probability + 1.0) * 0.5;
        let channel = (rng.random::<f32>() < right_channel_probability) as usize;

        let direction = DirectionSampler::new(
            snapshot.orientation,
            snapshot.size,
            snapshot.shape,
            snapshot.two_dimensional,
        )
        .sample(rng);

        let read_position = self.read_position(write_head, position_seconds, pitch, length);

        let overlap = self.reference_window.mean_gain() * snapshot.grain_length
            / snapshot.delta_time.max(f32::EPSILON);
        let gain = 1.0 / overlap.max(1.0).sqrt();

        let spawn = GrainSpawn {
            read_position,
            pitch,
            length,
            channel,
            direction,
            attack,
            decay,
            gain,
            order: snapshot.order.min(self.max_order),
            normalization: snapshot.normalization,
        };
        if self.pool.activate_new_grain(&spawn).is_some() {
            self.statistics.spawned_grains += 1;
        } else {
            self.statistics.dropped_grains += 1;
        }
        interval
    }

    /// Map a grain's read offset into the valid history behind the given write head.
    ///
    /// Over its whole lifetime the grain neither reads ahead of the write head nor reaches
    /// frames which get overwritten by the blocks that are recorded while it plays.
    fn read_position(
        &self,
        write_head: usize,
        position_seconds: f32,
        pitch: f64,
        length: usize,
    ) -> f64 {
        let margin = Self::READ_MARGIN as f64;
        let length = length as f64;
        let min_offset = pitch * length + margin;
        let max_offset = self.capture.capacity() as f64
            - self.max_frames as f64
            - margin
            - length * (1.0 - pitch).max(0.0);
        let offset = (position_seconds as f64 * self.sample_rate as f64 + min_offset)
            .min(max_offset)
            .max(min_offset);
        self.capture.wrap_position(write_head as f64 - offset)
    }

    /// Aim direction used for the dry signal.
    fn dry_direction(snapshot: &ParameterSnapshot) -> Vec3 {
        DirectionSampler::new(snapshot.orientation, 0.0, 0.0, snapshot.two_dimensional).aim()
    }

    fn assert_no_alloc<T, F: FnOnce() -> T>(func: F) -> T {
        #[cfg(feature = "assert-allocs")]
        return assert_no_alloc::assert_no_alloc::<T, F>(func);

        #[cfg(not(feature = "assert-allocs"))]
        return func();
    }
}

// -------------------------------------------------------------------------------------------------
