use rand::{rngs::SmallRng, Rng, SeedableRng};

use grainfield::{EncoderParameters, Error, GranularEncoder, OperationMode};

// -------------------------------------------------------------------------------------------------

#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const SAMPLE_RATE: u32 = 48000;
const MAX_FRAMES: usize = 512;

fn noise(frame_count: usize, seed: u64) -> Vec<f32> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..frame_count * 2)
        .map(|_| rng.random_range(-0.5..0.5))
        .collect()
}

fn new_encoder(sample_rate: u32, outputs: usize) -> Result<GranularEncoder, Error> {
    let parameters = EncoderParameters::new_shared();
    let mut encoder = GranularEncoder::with_seed(parameters, 0xdecaf);
    encoder.initialize(sample_rate, 2, outputs, MAX_FRAMES)?;
    Ok(encoder)
}

fn process_in_blocks(
    encoder: &mut GranularEncoder,
    input: &[f32],
    block_sizes: &[usize],
) -> Vec<f32> {
    let outputs = encoder.output_channel_count();
    let frame_count = input.len() / 2;
    let mut output = vec![0.0; frame_count * outputs];
    let mut frame = 0;
    for block_size in block_sizes.iter().cycle() {
        if frame >= frame_count {
            break;
        }
        let block_size = (*block_size).min(frame_count - frame);
        encoder.process(
            &input[frame * 2..(frame + block_size) * 2],
            &mut output[frame * outputs..(frame + block_size) * outputs],
        );
        frame += block_size;
    }
    output
}

// -------------------------------------------------------------------------------------------------

#[test]
fn output_does_not_depend_on_block_splits() -> Result<(), Error> {
    let input = noise(2 * SAMPLE_RATE as usize, 1);

    let mut outputs = Vec::new();
    for block_sizes in [&[512][..], &[1, 7, 300, 512, 129, 1000][..], &[96000][..]] {
        let mut encoder = new_encoder(SAMPLE_RATE, 16)?;
        let parameters = encoder.parameters().clone();
        parameters.set_value(EncoderParameters::DELTA_TIME.id(), 0.5)?;
        parameters.set_value(EncoderParameters::GRAIN_LENGTH.id(), 0.1)?;
        parameters.set_value(EncoderParameters::PITCH_JITTER.id(), 3.0)?;
        parameters.set_value(EncoderParameters::POSITION.id(), 0.2)?;
        parameters.set_value(EncoderParameters::POSITION_JITTER.id(), 0.1)?;
        parameters.set_value(EncoderParameters::SIZE.id(), 120.0)?;
        encoder.reset();

        outputs.push(process_in_blocks(&mut encoder, &input, block_sizes));
        assert_eq!(encoder.statistics().spawned_grains, 4);
        assert_eq!(encoder.statistics().dropped_grains, 0);
    }
    assert!(outputs[0].iter().any(|s| *s != 0.0));
    assert!(outputs[0] == outputs[1]);
    assert!(outputs[0] == outputs[2]);
    Ok(())
}

#[test]
fn frozen_history_is_not_modified() -> Result<(), Error> {
    let mut encoder = new_encoder(SAMPLE_RATE, 4)?;
    let parameters = encoder.parameters().clone();

    let input = noise(MAX_FRAMES, 2);
    let mut output = vec![0.0; MAX_FRAMES * 4];
    for _ in 0..20 {
        encoder.process(&input, &mut output);
    }
    assert_eq!(encoder.operation_mode(), OperationMode::Realtime);

    parameters.set_value(EncoderParameters::FREEZE.id(), 1.0)?;
    encoder.process(&input, &mut output);
    assert_eq!(encoder.operation_mode(), OperationMode::ToFreeze);
    let mut blocks = 1;
    while encoder.operation_mode() != OperationMode::Freeze {
        encoder.process(&input, &mut output);
        blocks += 1;
        assert!(blocks < 100, "freeze ramp never completes");
    }

    let frozen_history = encoder.capture_buffer().samples().to_vec();
    let frozen_head = encoder.capture_buffer().write_head();
    for seed in 3..13 {
        encoder.process(&noise(MAX_FRAMES, seed), &mut output);
    }
    assert_eq!(encoder.capture_buffer().write_head(), frozen_head);
    assert!(encoder.capture_buffer().samples() == frozen_history.as_slice());
    // grains keep playing from the frozen history
    assert!(encoder.active_grain_count() > 0);

    parameters.set_value(EncoderParameters::FREEZE.id(), 0.0)?;
    encoder.process(&input, &mut output);
    assert_eq!(encoder.operation_mode(), OperationMode::ToRealtime);
    assert_ne!(encoder.capture_buffer().write_head(), frozen_head);
    Ok(())
}

#[test]
fn grain_pool_is_bounded() -> Result<(), Error> {
    let sample_rate = 8000;
    let mut encoder = new_encoder(sample_rate, 4)?;
    let parameters = encoder.parameters().clone();
    parameters.set_value(EncoderParameters::DELTA_TIME.id(), 0.001)?;
    parameters.set_value(EncoderParameters::GRAIN_LENGTH.id(), 2.0)?;
    encoder.reset();

    let input = noise(256, 4);
    let mut output = vec![0.0; 256 * 4];
    let mut max_active = 0;
    for _ in 0..(sample_rate as usize / 256) {
        encoder.process(&input, &mut output);
        max_active = max_active.max(encoder.active_grain_count());
        assert!(encoder.active_grain_count() <= GranularEncoder::MAX_GRAINS);
    }
    assert_eq!(max_active, GranularEncoder::MAX_GRAINS);
    assert!(encoder.statistics().dropped_grains > 0);
    assert!(output.iter().all(|s| s.is_finite()));
    Ok(())
}

#[test]
fn grains_follow_the_aim() -> Result<(), Error> {
    let mut encoder = new_encoder(SAMPLE_RATE, 9)?;
    let parameters = encoder.parameters().clone();
    parameters.set_value(EncoderParameters::SIZE.id(), 0.0)?;
    parameters.set_value(EncoderParameters::DELTA_TIME.id(), 0.01)?;
    parameters.set_azimuth(90.0);
    parameters.set_elevation(30.0);
    assert!(parameters.take_positions_changed());
    assert!(!parameters.take_positions_changed());

    let input = noise(MAX_FRAMES * 4, 5);
    let mut output = vec![0.0; MAX_FRAMES * 4 * 9];
    encoder.process(&input, &mut output);
    assert!(encoder.active_grain_count() > 0);

    let aim = parameters.aim_direction();
    for grain in encoder.grain_directions() {
        assert!((grain.direction.dot(aim) - 1.0).abs() < 1e-5);
        assert!((0.0..1.0).contains(&grain.progress));
        assert!(grain.channel < 2);
    }
    Ok(())
}

#[test]
fn channel_probability_selects_sources() -> Result<(), Error> {
    let mut encoder = new_encoder(SAMPLE_RATE, 4)?;
    let parameters = encoder.parameters().clone();
    parameters.set_value(EncoderParameters::DELTA_TIME.id(), 0.002)?;
    parameters.set_value(EncoderParameters::SOURCE_PROBABILITY.id(), 1.0)?;
    encoder.reset();

    let input = noise(MAX_FRAMES * 8, 6);
    let mut output = vec![0.0; MAX_FRAMES * 8 * 4];
    encoder.process(&input, &mut output);
    assert!(encoder.grain_directions().all(|grain| grain.channel == 1));

    parameters.set_value(EncoderParameters::SOURCE_PROBABILITY.id(), -1.0)?;
    encoder.reset();
    encoder.process(&input, &mut output);
    assert!(encoder.grain_directions().all(|grain| grain.channel == 0));
    Ok(())
}

#[test]
fn reset_restarts_statistics() -> Result<(), Error> {
    let mut encoder = new_encoder(SAMPLE_RATE, 4)?;
    let input = noise(MAX_FRAMES, 7);
    let mut output = vec![0.0; MAX_FRAMES * 4];
    encoder.process(&input, &mut output);
    assert!(encoder.statistics().spawned_grains > 0);

    encoder.reset();
    assert_eq!(encoder.statistics().spawned_grains, 0);
    assert_eq!(encoder.active_grain_count(), 0);
    assert!(encoder.capture_buffer().samples().iter().all(|s| *s == 0.0));
    Ok(())
}

#[cfg(debug_assertions)]
#[test]
fn processing_does_not_allocate() -> Result<(), Error> {
    let mut encoder = new_encoder(SAMPLE_RATE, 64)?;
    let parameters = encoder.parameters().clone();
    parameters.set_value(EncoderParameters::ORDER.id(), 7.0)?;
    parameters.set_value(EncoderParameters::HIGH_QUALITY.id(), 1.0)?;
    parameters.set_value(EncoderParameters::DELTA_TIME.id(), 0.001)?;

    let input = noise(2048, 8);
    let mut output = vec![0.0; 2048 * 64];
    assert_no_alloc::reset_violation_count();
    assert_no_alloc::assert_no_alloc(|| {
        encoder.process(&input[..200], &mut output[..100 * 64]);
        encoder.process(&input, &mut output);
    });
    parameters.set_value(EncoderParameters::FREEZE.id(), 1.0)?;
    assert_no_alloc::assert_no_alloc(|| encoder.process(&input, &mut output));
    assert_eq!(assert_no_alloc::violation_count(), 0);
    Ok(())
}
