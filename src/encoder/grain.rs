use crate::utils::{
    ambisonics::{self, Coefficients, Normalization, MAX_CHANNEL_COUNT},
    capture::{CaptureBuffer, InterpolationQuality},
    orientation::Vec3,
    window::WindowTable,
};

// -------------------------------------------------------------------------------------------------

/// Everything needed to start a new grain. Values are drawn once when the grain gets spawned.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrainSpawn {
    /// Fractional frame position in the capture buffer where the grain starts reading.
    pub read_position: f64,
    /// Playback speed factor.
    pub pitch: f64,
    /// Grain length in output frames.
    pub length: usize,
    /// Source channel in the capture buffer: 0 = left, 1 = right.
    pub channel: usize,
    /// Unit direction the grain is encoded to.
    pub direction: Vec3,
    /// Window attack fraction.
    pub attack: f32,
    /// Window decay fraction.
    pub decay: f32,
    /// Overall grain gain, baked into the encoding coefficients.
    pub gain: f32,
    /// Ambisonic order of the encoding coefficients.
    pub order: usize,
    pub normalization: Normalization,
}

// -------------------------------------------------------------------------------------------------

/// Public, read-only view on an active grain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainInfo {
    /// Unit direction the grain is encoded to.
    pub direction: Vec3,
    /// Source channel in the capture buffer: 0 = left, 1 = right.
    pub channel: usize,
    /// Normalized progress of the grain's lifetime in range `0.0..1.0`.
    pub progress: f32,
}

// -------------------------------------------------------------------------------------------------

/// A single grain: reads a windowed, pitched excerpt from the capture buffer and encodes it
/// into an ambisonic sound field at a fixed direction.
///
/// The grain becomes idle exactly when `elapsed` reaches `length`.
#[derive(Debug, Clone)]
pub(crate) struct Grain {
    active: bool,
    read_position: f64,
    pitch: f64,
    length: usize,
    elapsed: usize,
    channel: usize,
    direction: Vec3,
    coefficients: Coefficients,
    window: WindowTable,
}

impl Default for Grain {
    fn default() -> Self {
        Self::new()
    }
}

impl Grain {
    pub fn new() -> Self {
        Self {
            active: false,
            read_position: 0.0,
            pitch: 1.0,
            length: 0,
            elapsed: 0,
            channel: 0,
            direction: Vec3::X,
            coefficients: [0.0; MAX_CHANNEL_COUNT],
            window: WindowTable::default(),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub fn elapsed(&self) -> usize {
        self.elapsed
    }

    #[cfg(test)]
    pub fn length(&self) -> usize {
        self.length
    }

    #[cfg(test)]
    pub fn read_position(&self) -> f64 {
        self.read_position
    }

    #[cfg(test)]
    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn info(&self) -> GrainInfo {
        GrainInfo {
            direction: self.direction,
            channel: self.channel,
            progress: if self.length > 0 {
                self.elapsed as f32 / self.length as f32
            } else {
                0.0
            },
        }
    }

    /// Start the grain. The window table only gets rebuilt when the shape changed.
    pub fn activate(&mut self, spawn: &GrainSpawn) {
        debug_assert!(spawn.length > 0, "Invalid grain length");
        debug_assert!(spawn.channel < CaptureBuffer::CHANNEL_COUNT);
        self.active = spawn.length > 0;
        self.read_position = spawn.read_position;
        self.pitch = spawn.pitch;
        self.length = spawn.length;
        self.elapsed = 0;
        self.channel = spawn.channel;
        self.direction = spawn.direction;

        ambisonics::encode(
            spawn.direction,
            spawn.order,
            spawn.normalization,
            &mut self.coefficients,
        );
        if spawn.gain != 1.0 {
            for coefficient in &mut self.coefficients {
                *coefficient *= spawn.gain;
            }
        }
        self.window.update(spawn.attack, spawn.decay);
    }

    /// Render the next windowed sample and advance the grain by one frame.
    #[inline]
    pub fn process(&mut self, capture: &CaptureBuffer, quality: InterpolationQuality) -> f32 {
        debug_assert!(self.active, "Should only process active grains");
        let window = self
            .window
            .sample(self.elapsed as f32 / self.length as f32);
        let sample = capture.read(&mut self.read_position, self.pitch, self.channel, quality);

        self.elapsed += 1;
        if self.elapsed >= self.length {
            self.active = false;
        }
        sample * window
    }
}

// -------------------------------------------------------------------------------------------------

/// A fixed size pool of reusable [`Grain`] instances.
///
/// All grains are allocated upfront, so activating and deactivating grains never allocates in
/// the real-time thread. When all grains are busy, new grains are silently dropped.
pub(crate) struct GrainPool {
    /// Pool of reusable grain instances.
    grains: Box<[Grain]>,
    /// Indices of currently active grains.
    active_grain_indices: Vec<usize>,
}

impl Default for GrainPool {
    fn default() -> Self {
        Self::new()
    }
}

impl GrainPool {
    /// Maximum number of simultaneously playing grains.
    pub const POOL_SIZE: usize = 512;

    pub fn new() -> Self {
        let grains = (0..Self::POOL_SIZE).map(|_| Grain::new()).collect();
        let active_grain_indices = Vec::with_capacity(Self::POOL_SIZE);
        Self {
            grains,
            active_grain_indices,
        }
    }

    /// Stop all grains immediately.
    pub fn reset(&mut self) {
        for index in self.active_grain_indices.drain(..) {
            self.grains[index].active = false;
        }
    }

    /// Number of currently playing grains.
    pub fn active_count(&self) -> usize {
        self.active_grain_indices.len()
    }

    /// Iterate over all currently playing grains.
    pub fn active_grains(&self) -> impl Iterator<Item = &Grain> + '_ {
        self.active_grain_indices
            .iter()
            .map(|index| &self.grains[*index])
    }

    /// Start a new grain in a free pool slot.
    /// Returns the grain's index, or None when the pool is exhausted.
    pub fn activate_new_grain(&mut self, spawn: &GrainSpawn) -> Option<usize> {
        if self.active_grain_indices.len() >= Self::POOL_SIZE {
            return None;
        }
        let index = self.grains.iter().position(|g| !g.is_active())?;
        self.grains[index].activate(spawn);
        if self.grains[index].is_active() {
            self.active_grain_indices.push(index);
            Some(index)
        } else {
            None
        }
    }

    /// Render a single frame of all active grains, accumulating the encoded output into the
    /// first `channel_count` channels of `output`. Finished grains are returned to the pool.
    #[inline]
    pub fn process(
        &mut self,
        capture: &CaptureBuffer,
        quality: InterpolationQuality,
        output: &mut [f32],
    ) {
        let channel_count = output.len().min(MAX_CHANNEL_COUNT);
        let mut i = 0;
        while i < self.active_grain_indices.len() {
            let index = self.active_grain_indices[i];
            let grain = &mut self.grains[index];
            let sample = grain.process(capture, quality);
            for (out, coefficient) in output[..channel_count]
                .iter_mut()
                .zip(&grain.coefficients[..channel_count])
            {
                *out += sample * coefficient;
            }
            if grain.is_active() {
                i += 1;
            } else {
                self.active_grain_indices.swap_remove(i);
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------
