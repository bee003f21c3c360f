//! Interleaved sample buffer helpers.

// -------------------------------------------------------------------------------------------------

/// Set all samples in the given buffer to zero.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.fill(0.0);
}

/// Convert a mono or multi-channel interleaved buffer into an interleaved stereo buffer.
/// Mono input is copied to both channels, additional input channels are dropped.
pub fn to_interleaved_stereo(input: &[f32], channel_count: usize, output: &mut Vec<f32>) {
    debug_assert!(channel_count > 0, "Invalid channel count");
    output.clear();
    match channel_count {
        1 => output.extend(input.iter().flat_map(|s| [*s, *s])),
        2 => output.extend_from_slice(input),
        _ => output.extend(
            input
                .chunks_exact(channel_count)
                .flat_map(|frame| [frame[0], frame[1]]),
        ),
    }
}

// -------------------------------------------------------------------------------------------------
