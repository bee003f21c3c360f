//! Circular stereo capture buffer, continuously recording the encoder's input.

use assume::assume;
use strum::{Display, EnumString, VariantArray, VariantNames};

// -------------------------------------------------------------------------------------------------

/// Interpolation used when reading from a [`CaptureBuffer`] at fractional positions.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames, VariantArray,
)]
pub enum InterpolationQuality {
    /// Cheap 2-point linear interpolation.
    #[default]
    Linear,
    /// 4-point cubic (Catmull-Rom) interpolation.
    Cubic,
}

impl InterpolationQuality {
    /// Number of frames the interpolator reads ahead of the integer read position.
    pub const fn lookahead(&self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Cubic => 2,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Fixed capacity circular buffer holding interleaved stereo frames.
///
/// The buffer is sized once in the setup phase via [`Self::allocate`] and never reallocates
/// afterwards. Writes can be gated per frame: a gated frame leaves the buffer and the write head
/// untouched, which is how the encoder freezes its recorded history.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    samples: Vec<f32>,
    capacity: usize,
    write_head: usize,
}

impl CaptureBuffer {
    /// Number of interleaved channels in the buffer.
    pub const CHANNEL_COUNT: usize = 2;
    /// Length of the captured history in seconds.
    pub const DURATION: f64 = 8.0;

    /// Create a new, empty buffer. Call [`Self::allocate`] before using it.
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)allocate the buffer for the given sample rate and clear it.
    pub fn allocate(&mut self, sample_rate: u32) {
        self.allocate_frames((Self::DURATION * sample_rate as f64).ceil() as usize);
    }

    /// (Re)allocate the buffer with the given capacity in frames and clear it.
    pub fn allocate_frames(&mut self, capacity: usize) {
        debug_assert!(capacity > 0, "Invalid capture buffer capacity");
        self.capacity = capacity.max(1);
        self.samples.clear();
        self.samples
            .resize(self.capacity * Self::CHANNEL_COUNT, 0.0);
        self.write_head = 0;
    }

    /// Silence the buffer and reset the write head.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
        self.write_head = 0;
    }

    /// Capacity in frames.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frame index of the next frame that will be written.
    #[inline]
    pub fn write_head(&self) -> usize {
        self.write_head
    }

    /// Raw interleaved buffer content.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Wrap the given, possibly negative or overflowing frame position into the buffer.
    #[inline]
    pub fn wrap_position(&self, position: f64) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        let capacity = self.capacity as f64;
        let wrapped = position.rem_euclid(capacity);
        // rem_euclid may round up to capacity for tiny negative values
        if wrapped >= capacity {
            0.0
        } else {
            wrapped
        }
    }

    /// Write a block of interleaved stereo frames, always at full gain.
    pub fn write_unity(&mut self, input: &[f32]) -> usize {
        self.write(input, || Some(1.0))
    }

    /// Write a block of interleaved stereo frames, asking `gain` for the write gain of each frame.
    ///
    /// `None` gates the frame: neither the buffer nor the write head change. `Some(gain)`
    /// crossfades the stored frame with the new one as `old * (1 - gain) + new * gain`. A gain
    /// of exactly 1 replaces and a gain of exactly 0 keeps the stored content bit-identical.
    ///
    /// Returns the number of frames that advanced the write head. Once `gain` returns `None`,
    /// the rest of the block is skipped. An unallocated buffer writes nothing.
    pub fn write<F>(&mut self, input: &[f32], mut gain: F) -> usize
    where
        F: FnMut() -> Option<f32>,
    {
        debug_assert!(
            input.len() % Self::CHANNEL_COUNT == 0,
            "Expecting interleaved stereo input"
        );
        debug_assert!(self.capacity > 0, "Buffer must be allocated before writing");
        if self.capacity == 0 {
            return 0;
        }
        let mut written = 0;
        for frame in input.chunks_exact(Self::CHANNEL_COUNT) {
            let Some(gain) = gain() else {
                break;
            };
            let offset = self.write_head * Self::CHANNEL_COUNT;
            let target = &mut self.samples[offset..offset + Self::CHANNEL_COUNT];
            if gain == 1.0 {
                target.copy_from_slice(frame);
            } else if gain != 0.0 {
                for (stored, new) in target.iter_mut().zip(frame) {
                    *stored = *stored * (1.0 - gain) + *new * gain;
                }
            }
            self.write_head += 1;
            if self.write_head == self.capacity {
                self.write_head = 0;
            }
            written += 1;
        }
        written
    }

    /// Read a single channel sample at the given fractional frame position, then move the
    /// position forward by `speed` frames, wrapping around the buffer's end.
    #[inline]
    pub fn read(
        &self,
        position: &mut f64,
        speed: f64,
        channel: usize,
        quality: InterpolationQuality,
    ) -> f32 {
        let sample = self.sample_at(*position, channel, quality);
        *position += speed;
        if self.capacity > 0 && *position >= self.capacity as f64 {
            *position -= self.capacity as f64;
        }
        sample
    }

    /// Interpolated sample of the given channel at the given frame position.
    ///
    /// Channel indices past the last channel read the last channel. Unallocated buffers are
    /// silent.
    #[inline]
    pub fn sample_at(&self, position: f64, channel: usize, quality: InterpolationQuality) -> f32 {
        let capacity = self.capacity;
        if capacity == 0 {
            return 0.0;
        }
        let channel = channel.min(Self::CHANNEL_COUNT - 1);
        debug_assert!(
            position >= 0.0 && position < capacity as f64,
            "Read position must be wrapped"
        );

        // negative and NaN positions saturate to 0
        let index = (position as usize).min(capacity - 1);
        let fraction = (position - index as f64) as f32;

        let at = |frame: usize| -> f32 {
            let sample_index = frame * Self::CHANNEL_COUNT + channel;
            assume!(unsafe: sample_index < self.samples.len());
            self.samples[sample_index]
        };

        let i1 = index;
        let i2 = if i1 + 1 < capacity { i1 + 1 } else { 0 };
        match quality {
            InterpolationQuality::Linear => {
                let y1 = at(i1);
                let y2 = at(i2);
                y1 + (y2 - y1) * fraction
            }
            InterpolationQuality::Cubic => {
                let i0 = if i1 > 0 { i1 - 1 } else { capacity - 1 };
                let i3 = if i2 + 1 < capacity { i2 + 1 } else { 0 };
                let (y0, y1, y2, y3) = (at(i0), at(i1), at(i2), at(i3));

                // Catmull-Rom
                let a = -0.5 * y0 + 1.5 * y1 - 1.5 * y2 + 0.5 * y3;
                let b = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
                let c = -0.5 * y0 + 0.5 * y2;
                let d = y1;

                ((a * fraction + b) * fraction + c) * fraction + d
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn ramp(frames: usize, start: f32) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let value = start + i as f32;
                [value, -value]
            })
            .collect()
    }

    #[test]
    fn write_wraps_around() {
        let mut buffer = CaptureBuffer::new();
        buffer.allocate_frames(8);
        assert_eq!(buffer.write_unity(&ramp(6, 0.0)), 6);
        assert_eq!(buffer.write_head(), 6);
        assert_eq!(buffer.write_unity(&ramp(4, 6.0)), 4);
        assert_eq!(buffer.write_head(), 2);
        // frames 8 and 9 overwrote frames 0 and 1
        assert_eq!(&buffer.samples()[0..4], &[8.0, -8.0, 9.0, -9.0]);
        assert_eq!(&buffer.samples()[4..6], &[2.0, -2.0]);
    }

    #[test]
    fn gated_and_crossfaded_writes() {
        let mut buffer = CaptureBuffer::new();
        buffer.allocate_frames(16);
        buffer.write_unity(&ramp(4, 1.0));
        let before = buffer.samples().to_vec();
        buffer.write_head = 0;

        // zero gain keeps content but moves the head
        assert_eq!(buffer.write(&ramp(2, 100.0), || Some(0.0)), 2);
        assert_eq!(buffer.write_head(), 2);
        assert_eq!(buffer.samples(), &before[..]);

        // gating stops the head
        let mut gains = [Some(0.5), None, Some(1.0)].into_iter();
        assert_eq!(buffer.write(&ramp(3, 10.0), || gains.next().flatten()), 1);
        assert_eq!(buffer.write_head(), 3);
        assert_eq!(buffer.samples()[4], 3.0 * 0.5 + 10.0 * 0.5);
        assert_eq!(&buffer.samples()[6..], &before[6..]);
    }

    #[test]
    fn interpolated_reads() {
        let mut buffer = CaptureBuffer::new();
        buffer.allocate_frames(32);
        buffer.write_unity(&ramp(32, 0.0));

        for quality in [InterpolationQuality::Linear, InterpolationQuality::Cubic] {
            // exact on integer positions
            assert_eq!(buffer.sample_at(5.0, 0, quality), 5.0);
            assert_eq!(buffer.sample_at(5.0, 1, quality), -5.0);
            // both interpolators reproduce a linear ramp
            assert_abs_diff_eq!(buffer.sample_at(10.25, 0, quality), 10.25, epsilon = 1e-5);
            assert_abs_diff_eq!(buffer.sample_at(10.75, 1, quality), -10.75, epsilon = 1e-5);
        }
    }

    #[test]
    fn read_advances_by_speed() {
        let mut buffer = CaptureBuffer::new();
        buffer.allocate_frames(10);
        buffer.write_unity(&ramp(10, 0.0));

        let mut position = 6.0;
        let mut samples = Vec::new();
        for _ in 0..3 {
            samples.push(buffer.read(&mut position, 2.0, 0, InterpolationQuality::Linear));
        }
        assert_eq!(samples, vec![6.0, 8.0, 0.0]);
        assert_eq!(position, 2.0);

        assert_eq!(buffer.wrap_position(-1.0), 9.0);
        assert_eq!(buffer.wrap_position(12.5), 2.5);
    }

    #[test]
    fn unallocated_buffer_is_silent() {
        let mut buffer = CaptureBuffer::new();
        for quality in [InterpolationQuality::Linear, InterpolationQuality::Cubic] {
            assert_eq!(buffer.sample_at(0.0, 0, quality), 0.0);
        }
        let mut position = 0.0;
        assert_eq!(buffer.read(&mut position, 1.5, 1, InterpolationQuality::Cubic), 0.0);
        assert_eq!(buffer.wrap_position(3.0), 0.0);
        if !cfg!(debug_assertions) {
            assert_eq!(buffer.write_unity(&ramp(4, 1.0)), 0);
            assert_eq!(buffer.write_head(), 0);
        }
    }

    #[test]
    fn invalid_channel_is_clamped() {
        let mut buffer = CaptureBuffer::new();
        buffer.allocate_frames(4);
        buffer.write_unity(&ramp(4, 0.0));
        for quality in [InterpolationQuality::Linear, InterpolationQuality::Cubic] {
            assert_eq!(buffer.sample_at(3.0, 9, quality), -3.0);
            assert_eq!(buffer.sample_at(3.0, usize::MAX, quality), -3.0);
        }
    }
}
