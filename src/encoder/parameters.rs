//! The encoder's shared, lock-free parameter set.

use std::{
    hint,
    sync::{
        atomic::{fence, AtomicBool, AtomicU32, Ordering},
        Arc,
    },
};

use four_cc::FourCC;

use crate::{
    parameter::{
        BooleanParameter, BooleanParameterSlot, ClonableParameter, EnumParameter,
        EnumParameterSlot, FloatParameter, FloatParameterSlot, IntegerParameter,
        IntegerParameterSlot, ParameterScaling, ParameterValueUpdate,
    },
    utils::{
        ambisonics::{Normalization, MAX_ORDER},
        capture::InterpolationQuality,
        orientation::{self, Quat, Vec3},
    },
    Error,
};

// -------------------------------------------------------------------------------------------------

/// Shared handle to the encoder parameters, cloned into control threads.
pub type SharedEncoderParameters = Arc<EncoderParameters>;

// -------------------------------------------------------------------------------------------------

/// A consistent copy of all parameter values, taken by the render thread once per use.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSnapshot {
    /// Spawn interval in seconds.
    pub delta_time: f32,
    pub delta_time_jitter: f32,
    /// Grain length in seconds.
    pub grain_length: f32,
    pub grain_length_jitter: f32,
    /// Pitch in semitones.
    pub pitch: f32,
    /// Pitch jitter in semitones.
    pub pitch_jitter: f32,
    /// Read offset behind the write head in seconds.
    pub position: f32,
    pub position_jitter: f32,
    pub window_attack: f32,
    pub window_attack_jitter: f32,
    pub window_decay: f32,
    pub window_decay_jitter: f32,
    pub shape: f32,
    /// Direction spread in degrees.
    pub size: f32,
    pub mix: f32,
    pub source_probability: f32,
    pub freeze: bool,
    pub two_dimensional: bool,
    pub high_quality: bool,
    /// Normalized aim orientation.
    pub orientation: Quat,
    pub order: usize,
    pub normalization: Normalization,
}

impl ParameterSnapshot {
    /// Capture buffer interpolation selected by the quality toggle.
    pub fn interpolation(&self) -> InterpolationQuality {
        if self.high_quality {
            InterpolationQuality::Cubic
        } else {
            InterpolationQuality::Linear
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// All parameters of a [`GranularEncoder`](crate::GranularEncoder).
///
/// Values are stored in atomic slots, so any thread can write them while the render thread reads
/// them. Writes are clamped into the parameter's ranges before they get stored.
///
/// The aim orientation is stored as quaternion only. Azimuth and elevation are derived from it
/// and get converted back into a quaternion when written. The four quaternion slots are guarded
/// by a sequence counter: writers serialize on it and readers retry until they got a copy which
/// no writer touched in between, so the render thread never sees a half-updated quaternion.
#[derive(Debug)]
pub struct EncoderParameters {
    delta_time: FloatParameterSlot,
    delta_time_jitter: FloatParameterSlot,
    grain_length: FloatParameterSlot,
    grain_length_jitter: FloatParameterSlot,
    pitch: FloatParameterSlot,
    pitch_jitter: FloatParameterSlot,
    position: FloatParameterSlot,
    position_jitter: FloatParameterSlot,
    window_attack: FloatParameterSlot,
    window_attack_jitter: FloatParameterSlot,
    window_decay: FloatParameterSlot,
    window_decay_jitter: FloatParameterSlot,
    shape: FloatParameterSlot,
    size: FloatParameterSlot,
    mix: FloatParameterSlot,
    source_probability: FloatParameterSlot,
    freeze: BooleanParameterSlot,
    two_dimensional: BooleanParameterSlot,
    high_quality: BooleanParameterSlot,
    quaternion_w: FloatParameterSlot,
    quaternion_x: FloatParameterSlot,
    quaternion_y: FloatParameterSlot,
    quaternion_z: FloatParameterSlot,
    azimuth: FloatParameter,
    elevation: FloatParameter,
    order: IntegerParameterSlot,
    normalization: EnumParameterSlot<Normalization>,
    orientation_sequence: AtomicU32,
    positions_changed: AtomicBool,
}

/// Resolved parameter storage for an id.
enum Target<'a> {
    Float(&'a FloatParameterSlot),
    Integer(&'a IntegerParameterSlot),
    Boolean(&'a BooleanParameterSlot),
    Normalization(&'a EnumParameterSlot<Normalization>),
    Azimuth,
    Elevation,
}

impl Default for EncoderParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderParameters {
    pub const DELTA_TIME: FloatParameter =
        FloatParameter::new(FourCC(*b"dltT"), "Delta Time", 0.001..=2.0, 0.005)
            .with_unit("s")
            .with_scaling(ParameterScaling::Exponential(2.0));
    pub const DELTA_TIME_JITTER: FloatParameter =
        FloatParameter::new(FourCC(*b"dltM"), "Delta Time Jitter", 0.0..=1.0, 0.0);
    pub const GRAIN_LENGTH: FloatParameter =
        FloatParameter::new(FourCC(*b"lenT"), "Grain Length", 0.001..=2.0, 0.25)
            .with_unit("s")
            .with_scaling(ParameterScaling::Exponential(2.0));
    pub const GRAIN_LENGTH_JITTER: FloatParameter =
        FloatParameter::new(FourCC(*b"lenM"), "Grain Length Jitter", 0.0..=1.0, 0.0);
    pub const PITCH: FloatParameter =
        FloatParameter::new(FourCC(*b"ptch"), "Pitch", -12.0..=12.0, 0.0).with_unit("st");
    pub const PITCH_JITTER: FloatParameter =
        FloatParameter::new(FourCC(*b"ptcM"), "Pitch Jitter", 0.0..=12.0, 0.0).with_unit("st");
    pub const POSITION: FloatParameter =
        FloatParameter::new(FourCC(*b"posT"), "Position", 0.0..=4.0, 0.0)
            .with_unit("s")
            .with_scaling(ParameterScaling::Exponential(2.0));
    pub const POSITION_JITTER: FloatParameter =
        FloatParameter::new(FourCC(*b"posM"), "Position Jitter", 0.0..=1.0, 0.0);
    pub const WINDOW_ATTACK: FloatParameter =
        FloatParameter::new(FourCC(*b"wAtk"), "Window Attack", 0.0..=1.0, 0.5);
    pub const WINDOW_ATTACK_JITTER: FloatParameter =
        FloatParameter::new(FourCC(*b"wAtM"), "Window Attack Jitter", 0.0..=1.0, 0.0);
    pub const WINDOW_DECAY: FloatParameter =
        FloatParameter::new(FourCC(*b"wDcy"), "Window Decay", 0.0..=1.0, 0.5);
    pub const WINDOW_DECAY_JITTER: FloatParameter =
        FloatParameter::new(FourCC(*b"wDcM"), "Window Decay Jitter", 0.0..=1.0, 0.0);
    pub const SHAPE: FloatParameter =
        FloatParameter::new(FourCC(*b"shap"), "Shape", -10.0..=10.0, 0.0);
    pub const SIZE: FloatParameter =
        FloatParameter::new(FourCC(*b"size"), "Size", 0.0..=360.0, 30.0).with_unit("°");
    pub const MIX: FloatParameter = FloatParameter::new(FourCC(*b"mix_"), "Mix", 0.0..=1.0, 0.5);
    pub const SOURCE_PROBABILITY: FloatParameter =
        FloatParameter::new(FourCC(*b"srcP"), "Source Probability", -1.0..=1.0, 0.0);
    pub const FREEZE: BooleanParameter = BooleanParameter::new(FourCC(*b"frez"), "Freeze", false);
    pub const TWO_DIMENSIONAL: BooleanParameter =
        BooleanParameter::new(FourCC(*b"sp2D"), "2D Mode", false);
    pub const HIGH_QUALITY: BooleanParameter =
        BooleanParameter::new(FourCC(*b"hiQ_"), "High Quality", false);
    pub const QUATERNION_W: FloatParameter =
        FloatParameter::new(FourCC(*b"qw__"), "Quaternion W", -1.0..=1.0, 1.0);
    pub const QUATERNION_X: FloatParameter =
        FloatParameter::new(FourCC(*b"qx__"), "Quaternion X", -1.0..=1.0, 0.0);
    pub const QUATERNION_Y: FloatParameter =
        FloatParameter::new(FourCC(*b"qy__"), "Quaternion Y", -1.0..=1.0, 0.0);
    pub const QUATERNION_Z: FloatParameter =
        FloatParameter::new(FourCC(*b"qz__"), "Quaternion Z", -1.0..=1.0, 0.0);
    pub const AZIMUTH: FloatParameter =
        FloatParameter::new(FourCC(*b"azim"), "Azimuth", -180.0..=180.0, 0.0).with_unit("°");
    pub const ELEVATION: FloatParameter =
        FloatParameter::new(FourCC(*b"elev"), "Elevation", -90.0..=90.0, 0.0).with_unit("°");
    pub const ORDER: IntegerParameter =
        IntegerParameter::new(FourCC(*b"ordr"), "Order", 0..=MAX_ORDER as i32, 3);
    pub const NORMALIZATION: EnumParameter = EnumParameter::new(
        FourCC(*b"norm"),
        "Normalization",
        <Normalization as strum::VariantNames>::VARIANTS,
        1,
    );

    /// Create a new parameter set with all values set to their defaults.
    pub fn new() -> Self {
        Self {
            delta_time: FloatParameterSlot::from_description(Self::DELTA_TIME),
            delta_time_jitter: FloatParameterSlot::from_description(Self::DELTA_TIME_JITTER),
            grain_length: FloatParameterSlot::from_description(Self::GRAIN_LENGTH),
            grain_length_jitter: FloatParameterSlot::from_description(Self::GRAIN_LENGTH_JITTER),
            pitch: FloatParameterSlot::from_description(Self::PITCH),
            pitch_jitter: FloatParameterSlot::from_description(Self::PITCH_JITTER),
            position: FloatParameterSlot::from_description(Self::POSITION),
            position_jitter: FloatParameterSlot::from_description(Self::POSITION_JITTER),
            window_attack: FloatParameterSlot::from_description(Self::WINDOW_ATTACK),
            window_attack_jitter: FloatParameterSlot::from_description(Self::WINDOW_ATTACK_JITTER),
            window_decay: FloatParameterSlot::from_description(Self::WINDOW_DECAY),
            window_decay_jitter: FloatParameterSlot::from_description(Self::WINDOW_DECAY_JITTER),
            shape: FloatParameterSlot::from_description(Self::SHAPE),
            size: FloatParameterSlot::from_description(Self::SIZE),
            mix: FloatParameterSlot::from_description(Self::MIX),
            source_probability: FloatParameterSlot::from_description(Self::SOURCE_PROBABILITY),
            freeze: BooleanParameterSlot::from_description(Self::FREEZE),
            two_dimensional: BooleanParameterSlot::from_description(Self::TWO_DIMENSIONAL),
            high_quality: BooleanParameterSlot::from_description(Self::HIGH_QUALITY),
            quaternion_w: FloatParameterSlot::from_description(Self::QUATERNION_W),
            quaternion_x: FloatParameterSlot::from_description(Self::QUATERNION_X),
            quaternion_y: FloatParameterSlot::from_description(Self::QUATERNION_Y),
            quaternion_z: FloatParameterSlot::from_description(Self::QUATERNION_Z),
            azimuth: Self::AZIMUTH,
            elevation: Self::ELEVATION,
            order: IntegerParameterSlot::from_description(Self::ORDER),
            normalization: EnumParameterSlot::from_description(Self::NORMALIZATION),
            orientation_sequence: AtomicU32::new(0),
            positions_changed: AtomicBool::new(true),
        }
    }

    /// Create a new, shared parameter set with default values.
    pub fn new_shared() -> SharedEncoderParameters {
        Arc::new(Self::new())
    }

    /// Descriptors of all parameters, e.g. to build generic UIs or automation bindings.
    pub fn descriptors(&self) -> Vec<&dyn ClonableParameter> {
        let descriptors: [&dyn ClonableParameter; 27] = [
            self.delta_time.description(),
            self.delta_time_jitter.description(),
            self.grain_length.description(),
            self.grain_length_jitter.description(),
            self.pitch.description(),
            self.pitch_jitter.description(),
            self.position.description(),
            self.position_jitter.description(),
            self.window_attack.description(),
            self.window_attack_jitter.description(),
            self.window_decay.description(),
            self.window_decay_jitter.description(),
            self.shape.description(),
            self.size.description(),
            self.mix.description(),
            self.source_probability.description(),
            self.freeze.description(),
            self.two_dimensional.description(),
            self.high_quality.description(),
            self.quaternion_w.description(),
            self.quaternion_x.description(),
            self.quaternion_y.description(),
            self.quaternion_z.description(),
            &self.azimuth,
            &self.elevation,
            self.order.description(),
            self.normalization.description(),
        ];
        descriptors.to_vec()
    }

    fn target(&self, id: FourCC) -> Result<Target<'_>, Error> {
        let float_slots = [
            &self.delta_time,
            &self.delta_time_jitter,
            &self.grain_length,
            &self.grain_length_jitter,
            &self.pitch,
            &self.pitch_jitter,
            &self.position,
            &self.position_jitter,
            &self.window_attack,
            &self.window_attack_jitter,
            &self.window_decay,
            &self.window_decay_jitter,
            &self.shape,
            &self.size,
            &self.mix,
            &self.source_probability,
            &self.quaternion_w,
            &self.quaternion_x,
            &self.quaternion_y,
            &self.quaternion_z,
        ];
        if let Some(slot) = float_slots
            .into_iter()
            .find(|slot| slot.description().id() == id)
        {
            return Ok(Target::Float(slot));
        }
        if let Some(slot) = [&self.freeze, &self.two_dimensional, &self.high_quality]
            .into_iter()
            .find(|slot| slot.description().id() == id)
        {
            return Ok(Target::Boolean(slot));
        }
        if id == self.order.description().id() {
            Ok(Target::Integer(&self.order))
        } else if id == self.normalization.description().id() {
            Ok(Target::Normalization(&self.normalization))
        } else if id == self.azimuth.id() {
            Ok(Target::Azimuth)
        } else if id == self.elevation.id() {
            Ok(Target::Elevation)
        } else {
            Err(Error::ParameterError(format!("Unknown parameter: '{id}'")))
        }
    }

    fn is_orientation_id(id: FourCC) -> bool {
        [
            Self::QUATERNION_W.id(),
            Self::QUATERNION_X.id(),
            Self::QUATERNION_Y.id(),
            Self::QUATERNION_Z.id(),
        ]
        .contains(&id)
    }

    /// Current plain value of the given parameter. Booleans and enums are returned as 0/1 and
    /// as variant index.
    pub fn value(&self, id: FourCC) -> Result<f32, Error> {
        Ok(match self.target(id)? {
            Target::Float(slot) => slot.value(),
            Target::Integer(slot) => slot.value() as f32,
            Target::Boolean(slot) => slot.value() as u8 as f32,
            Target::Normalization(slot) => {
                let value = slot.value();
                <Normalization as strum::VariantArray>::VARIANTS
                    .iter()
                    .position(|v| *v == value)
                    .unwrap_or_default() as f32
            }
            Target::Azimuth => self.azimuth(),
            Target::Elevation => self.elevation(),
        })
    }

    /// Current normalized value of the given parameter.
    pub fn normalized_value(&self, id: FourCC) -> Result<f32, Error> {
        Ok(match self.target(id)? {
            Target::Float(slot) => slot.normalized_value(),
            Target::Integer(slot) => slot.normalized_value(),
            Target::Boolean(slot) => slot.normalized_value(),
            Target::Normalization(slot) => slot.normalized_value(),
            Target::Azimuth => self.azimuth.normalize_value(self.azimuth()),
            Target::Elevation => self.elevation.normalize_value(self.elevation()),
        })
    }

    /// Set a plain value. Booleans treat values >= 0.5 as on, enums expect a variant index.
    pub fn set_value(&self, id: FourCC, value: f32) -> Result<(), Error> {
        match self.target(id)? {
            Target::Float(slot) if Self::is_orientation_id(id) => {
                self.write_orientation(|| slot.set_value(value))
            }
            Target::Float(slot) => slot.set_value(value),
            Target::Integer(slot) => {
                if !value.is_nan() {
                    slot.set_value(value.round() as i32)
                }
            }
            Target::Boolean(slot) => slot.set_value(value >= 0.5),
            Target::Normalization(slot) => {
                let variants = <Normalization as strum::VariantArray>::VARIANTS;
                if let Some(variant) = (!value.is_nan())
                    .then(|| variants.get(value.round().max(0.0) as usize))
                    .flatten()
                {
                    slot.set_value(*variant);
                }
            }
            Target::Azimuth => self.set_azimuth(value),
            Target::Elevation => self.set_elevation(value),
        }
        if Self::is_orientation_id(id) {
            self.positions_changed.store(true, Ordering::Release);
        }
        Ok(())
    }

    /// Set a normalized value in range `0.0..=1.0`.
    pub fn set_normalized(&self, id: FourCC, normalized: f32) -> Result<(), Error> {
        self.apply_update(id, &ParameterValueUpdate::Normalized(normalized))
    }

    /// Apply a raw or normalized parameter value update.
    pub fn apply_update(&self, id: FourCC, update: &ParameterValueUpdate) -> Result<(), Error> {
        match self.target(id)? {
            Target::Float(slot) if Self::is_orientation_id(id) => {
                self.write_orientation(|| slot.apply_update(update))
            }
            Target::Float(slot) => slot.apply_update(update),
            Target::Integer(slot) => slot.apply_update(update),
            Target::Boolean(slot) => slot.apply_update(update),
            Target::Normalization(slot) => slot.apply_update(update),
            Target::Azimuth => {
                if let Some(value) = Self::angle_update(&self.azimuth, update) {
                    self.set_azimuth(value);
                }
            }
            Target::Elevation => {
                if let Some(value) = Self::angle_update(&self.elevation, update) {
                    self.set_elevation(value);
                }
            }
        }
        if Self::is_orientation_id(id) {
            self.positions_changed.store(true, Ordering::Release);
        }
        Ok(())
    }

    fn angle_update(description: &FloatParameter, update: &ParameterValueUpdate) -> Option<f32> {
        match update {
            ParameterValueUpdate::Raw(raw) => {
                if let Some(value) = raw.downcast_ref::<f32>() {
                    Some(*value)
                } else if let Some(value) = raw.downcast_ref::<f64>() {
                    Some(*value as f32)
                } else {
                    log::warn!(
                        "Invalid value type for angle parameter '{}'",
                        description.id()
                    );
                    None
                }
            }
            ParameterValueUpdate::Normalized(normalized) => {
                if normalized.is_nan() {
                    None
                } else {
                    Some(description.denormalize_value(normalized.clamp(0.0, 1.0)))
                }
            }
        }
    }

    /// The canonical aim orientation, normalized.
    ///
    /// Lock-free: retries while a writer is busy, and gives up after a bounded number of attempts
    /// with the last read copy.
    pub fn orientation(&self) -> Quat {
        const MAX_ATTEMPTS: usize = 1024;
        let mut orientation = self.load_orientation();
        for _ in 0..MAX_ATTEMPTS {
            let sequence = self.orientation_sequence.load(Ordering::Acquire);
            if sequence % 2 == 0 {
                orientation = self.load_orientation();
                fence(Ordering::Acquire);
                if self.orientation_sequence.load(Ordering::Relaxed) == sequence {
                    break;
                }
            }
            hint::spin_loop();
        }
        orientation::normalized_orientation(orientation)
    }

    /// Set the canonical aim orientation.
    pub fn set_orientation(&self, orientation: Quat) {
        let orientation = orientation::normalized_orientation(orientation);
        self.write_orientation(|| {
            self.quaternion_w.set_value(orientation.w);
            self.quaternion_x.set_value(orientation.x);
            self.quaternion_y.set_value(orientation.y);
            self.quaternion_z.set_value(orientation.z);
        });
        self.positions_changed.store(true, Ordering::Release);
    }

    fn load_orientation(&self) -> Quat {
        Quat::from_xyzw(
            self.quaternion_x.value(),
            self.quaternion_y.value(),
            self.quaternion_z.value(),
            self.quaternion_w.value(),
        )
    }

    /// Run `write` with exclusive access to the quaternion slots. The sequence counter is odd
    /// while a write is in progress.
    fn write_orientation<F: FnOnce()>(&self, write: F) {
        let mut sequence = self.orientation_sequence.load(Ordering::Relaxed);
        loop {
            if sequence % 2 == 0 {
                match self.orientation_sequence.compare_exchange_weak(
                    sequence,
                    sequence.wrapping_add(1),
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(current) => sequence = current,
                }
            } else {
                hint::spin_loop();
                sequence = self.orientation_sequence.load(Ordering::Relaxed);
            }
        }
        fence(Ordering::Release);
        write();
        self.orientation_sequence
            .store(sequence.wrapping_add(2), Ordering::Release);
    }

    /// The unit direction the encoder currently aims at.
    pub fn aim_direction(&self) -> Vec3 {
        orientation::aim_direction(self.orientation())
    }

    /// Point the aim orientation at the given direction, without roll.
    pub fn re_aim(&self, direction: Vec3) {
        self.set_orientation(orientation::looking_at(direction));
    }

    /// Aim azimuth in degrees, derived from the orientation.
    pub fn azimuth(&self) -> f32 {
        orientation::azimuth_elevation(self.orientation()).0.to_degrees()
    }

    /// Aim elevation in degrees, derived from the orientation.
    pub fn elevation(&self) -> f32 {
        orientation::azimuth_elevation(self.orientation()).1.to_degrees()
    }

    /// Set the aim azimuth in degrees, keeping the current elevation.
    pub fn set_azimuth(&self, degrees: f32) {
        let azimuth = self.azimuth.clamp_value(degrees).to_radians();
        let (_, elevation) = orientation::azimuth_elevation(self.orientation());
        self.set_orientation(orientation::from_azimuth_elevation(azimuth, elevation));
    }

    /// Set the aim elevation in degrees, keeping the current azimuth.
    pub fn set_elevation(&self, degrees: f32) {
        let elevation = self.elevation.clamp_value(degrees).to_radians();
        let (azimuth, _) = orientation::azimuth_elevation(self.orientation());
        self.set_orientation(orientation::from_azimuth_elevation(azimuth, elevation));
    }

    /// Returns true when the aim changed since the last call, then clears the flag.
    pub fn take_positions_changed(&self) -> bool {
        self.positions_changed.swap(false, Ordering::AcqRel)
    }

    /// Read all current parameter values.
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            delta_time: self.delta_time.value(),
            delta_time_jitter: self.delta_time_jitter.value(),
            grain_length: self.grain_length.value(),
            grain_length_jitter: self.grain_length_jitter.value(),
            pitch: self.pitch.value(),
            pitch_jitter: self.pitch_jitter.value(),
            position: self.position.value(),
            position_jitter: self.position_jitter.value(),
            window_attack: self.window_attack.value(),
            window_attack_jitter: self.window_attack_jitter.value(),
            window_decay: self.window_decay.value(),
            window_decay_jitter: self.window_decay_jitter.value(),
            shape: self.shape.value(),
            size: self.size.value(),
            mix: self.mix.value(),
            source_probability: self.source_probability.value(),
            freeze: self.freeze.value(),
            two_dimensional: self.two_dimensional.value(),
            high_quality: self.high_quality.value(),
            orientation: self.orientation(),
            order: self.order.value().clamp(0, MAX_ORDER as i32) as usize,
            normalization: self.normalization.value(),
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn defaults() {
        let parameters = EncoderParameters::new();
        let snapshot = parameters.snapshot();
        assert_eq!(snapshot.delta_time, 0.005);
        assert_eq!(snapshot.grain_length, 0.25);
        assert_eq!(snapshot.size, 30.0);
        assert_eq!(snapshot.order, 3);
        assert_eq!(snapshot.normalization, Normalization::SN3D);
        assert_eq!(snapshot.orientation, Quat::IDENTITY);
        assert_eq!(snapshot.interpolation(), InterpolationQuality::Linear);
        assert_eq!(parameters.descriptors().len(), 27);
    }

    #[test]
    fn writes_are_clamped() -> Result<(), Error> {
        let parameters = EncoderParameters::new();
        parameters.set_value(EncoderParameters::PITCH.id(), 30.0)?;
        parameters.set_value(EncoderParameters::ORDER.id(), 12.0)?;
        parameters.set_value(EncoderParameters::DELTA_TIME.id(), f32::NAN)?;
        parameters.set_value(EncoderParameters::HIGH_QUALITY.id(), 1.0)?;
        parameters.set_value(EncoderParameters::NORMALIZATION.id(), 0.0)?;
        let snapshot = parameters.snapshot();
        assert_eq!(snapshot.pitch, 12.0);
        assert_eq!(snapshot.order, 7);
        assert_eq!(snapshot.delta_time, 0.005);
        assert_eq!(snapshot.interpolation(), InterpolationQuality::Cubic);
        assert_eq!(snapshot.normalization, Normalization::N3D);

        parameters.set_normalized(EncoderParameters::MIX.id(), 2.0)?;
        assert_eq!(parameters.value(EncoderParameters::MIX.id())?, 1.0);
        parameters.apply_update(
            EncoderParameters::NORMALIZATION.id(),
            &ParameterValueUpdate::Raw(Box::new(Normalization::SN3D)),
        )?;
        assert_eq!(parameters.snapshot().normalization, Normalization::SN3D);

        assert!(parameters.set_value(FourCC(*b"nope"), 1.0).is_err());
        Ok(())
    }

    #[test]
    fn orientation_views() -> Result<(), Error> {
        let parameters = EncoderParameters::new();
        assert!(parameters.take_positions_changed());
        assert!(!parameters.take_positions_changed());

        parameters.set_value(EncoderParameters::AZIMUTH.id(), 90.0)?;
        parameters.set_value(EncoderParameters::ELEVATION.id(), 30.0)?;
        assert!(parameters.take_positions_changed());
        assert_abs_diff_eq!(parameters.azimuth(), 90.0, epsilon = 1e-3);
        assert_abs_diff_eq!(parameters.elevation(), 30.0, epsilon = 1e-3);
        let aim = parameters.aim_direction();
        assert_abs_diff_eq!(aim.x, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(aim.z, 0.5, epsilon = 1e-5);

        // quaternion writes are the source of truth for the derived view
        let q = orientation::from_azimuth_elevation((-45f32).to_radians(), 0.0);
        parameters.set_value(EncoderParameters::QUATERNION_W.id(), q.w)?;
        parameters.set_value(EncoderParameters::QUATERNION_X.id(), q.x)?;
        parameters.set_value(EncoderParameters::QUATERNION_Y.id(), q.y)?;
        parameters.set_value(EncoderParameters::QUATERNION_Z.id(), q.z)?;
        assert!(parameters.take_positions_changed());
        assert_abs_diff_eq!(parameters.azimuth(), -45.0, epsilon = 1e-3);
        assert_abs_diff_eq!(parameters.elevation(), 0.0, epsilon = 1e-3);

        parameters.re_aim(Vec3::new(0.0, 0.0, -1.0));
        assert_abs_diff_eq!(parameters.elevation(), -90.0, epsilon = 1e-2);
        assert!(parameters.take_positions_changed());
        Ok(())
    }

    #[test]
    fn azimuth_edits_at_the_poles_are_kept() {
        let parameters = EncoderParameters::new();
        parameters.set_azimuth(45.0);
        parameters.set_elevation(90.0);
        assert_abs_diff_eq!(parameters.azimuth(), 45.0, epsilon = 1e-3);
        assert_abs_diff_eq!(parameters.elevation(), 90.0, epsilon = 1e-3);

        parameters.set_azimuth(120.0);
        assert_abs_diff_eq!(parameters.azimuth(), 120.0, epsilon = 1e-3);
        parameters.set_elevation(0.0);
        assert_abs_diff_eq!(parameters.azimuth(), 120.0, epsilon = 1e-3);
        assert_abs_diff_eq!(parameters.elevation(), 0.0, epsilon = 1e-3);

        parameters.set_elevation(-90.0);
        parameters.set_azimuth(-30.0);
        parameters.set_elevation(10.0);
        assert_abs_diff_eq!(parameters.azimuth(), -30.0, epsilon = 1e-3);
        assert_abs_diff_eq!(parameters.elevation(), 10.0, epsilon = 1e-3);
    }

    #[test]
    fn orientation_reads_are_never_torn() -> Result<(), Error> {
        let parameters = EncoderParameters::new_shared();
        let first = Quat::IDENTITY;
        let second = orientation::from_azimuth_elevation(90f32.to_radians(), 45f32.to_radians());
        let is_one_of_both = |q: Quat| {
            [first, second].iter().any(|expected| {
                (q.w - expected.w).abs() < 1e-5
                    && (q.x - expected.x).abs() < 1e-5
                    && (q.y - expected.y).abs() < 1e-5
                    && (q.z - expected.z).abs() < 1e-5
            })
        };

        let writer = std::thread::spawn({
            let parameters = Arc::clone(&parameters);
            move || {
                for i in 0..20000 {
                    parameters.set_orientation(if i % 2 == 0 { second } else { first });
                    std::thread::yield_now();
                }
            }
        });
        for _ in 0..20000 {
            let q = parameters.snapshot().orientation;
            assert!(is_one_of_both(q), "{q:?}");
        }
        writer.join().expect("Writer thread panicked");

        // single component writes go through the same sequence
        parameters.set_value(EncoderParameters::QUATERNION_Z.id(), 0.5)?;
        assert_eq!(parameters.orientation_sequence.load(Ordering::Relaxed) % 2, 0);
        assert!(parameters.orientation().z > 0.0);
        Ok(())
    }
}
