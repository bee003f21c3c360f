//! Random grain direction sampling within a spherical cap or horizontal arc.

use std::f32::consts::TAU;

use rand::Rng;

use super::orientation::{
    self, aim_direction, direction_from_azimuth_elevation, normalized_direction,
    normalized_orientation, Quat, Vec3,
};

// -------------------------------------------------------------------------------------------------

/// Draws random grain directions around an aim orientation.
///
/// In 3D mode directions are spread over a spherical cap with an opening angle of `size`
/// degrees around the aim direction. In 2D mode they are spread over a horizontal arc of `size`
/// degrees around the aim azimuth, with zero elevation.
///
/// `shape` controls the distribution within the cap or arc: 0 distributes uniformly over the
/// cap's surface (or the arc's length), positive values concentrate directions towards the aim
/// and negative values towards the rim. The density over the normalized distance `t` from the aim
/// (`t = 0` at the aim, `t = 1` at the rim) is proportional to `(1 - t)^shape` for positive and
/// to `t^-shape` for negative shapes, with `t` measured in `cos(angle)` on the sphere and in
/// angle on the arc.
#[derive(Debug, Clone, Copy)]
pub struct DirectionSampler {
    orientation: Quat,
    half_angle: f32,
    shape: f32,
    two_dimensional: bool,
}

impl DirectionSampler {
    /// Create a new sampler. `size` is the full opening angle in degrees, `0..=360`.
    pub fn new(orientation: Quat, size: f32, shape: f32, two_dimensional: bool) -> Self {
        let size = if size.is_finite() { size.clamp(0.0, 360.0) } else { 0.0 };
        let shape = if shape.is_finite() { shape } else { 0.0 };
        Self {
            orientation: normalized_orientation(orientation),
            half_angle: (size * 0.5).to_radians(),
            shape,
            two_dimensional,
        }
    }

    /// The aim direction of the sampler.
    pub fn aim(&self) -> Vec3 {
        if self.two_dimensional {
            direction_from_azimuth_elevation(self.aim_azimuth(), 0.0)
        } else {
            aim_direction(self.orientation)
        }
    }

    /// Draw a new random unit direction.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        if self.half_angle <= 0.0 {
            return self.aim();
        }
        if self.two_dimensional {
            let offset = self.half_angle * self.shaped_distance(rng.random::<f32>());
            let offset = if rng.random::<bool>() { offset } else { -offset };
            direction_from_azimuth_elevation(self.aim_azimuth() + offset, 0.0)
        } else {
            let cos_max = self.half_angle.cos();
            let t = self.shaped_distance(rng.random::<f32>());
            let cos_theta = (1.0 - t * (1.0 - cos_max)).clamp(-1.0, 1.0);
            let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
            let (sin_phi, cos_phi) = (TAU * rng.random::<f32>()).sin_cos();
            let local = Vec3::new(cos_theta, sin_theta * cos_phi, sin_theta * sin_phi);
            normalized_direction(self.orientation.mul_vec3(local))
        }
    }

    fn aim_azimuth(&self) -> f32 {
        orientation::azimuth_elevation(self.orientation).0
    }

    /// Map a uniform random value in `0..1` to a normalized distance from the aim.
    #[inline]
    fn shaped_distance(&self, u: f32) -> f32 {
        if self.shape >= 0.0 {
            1.0 - u.powf(1.0 / (self.shape + 1.0))
        } else {
            u.powf(1.0 / (1.0 - self.shape))
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    fn angle_between(a: Vec3, b: Vec3) -> f32 {
        a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
    }

    #[test]
    fn zero_size_returns_aim() {
        let mut rng = SmallRng::seed_from_u64(1);
        let orientation =
            orientation::from_azimuth_elevation(40f32.to_radians(), 20f32.to_radians());
        let sampler = DirectionSampler::new(orientation, 0.0, 3.0, false);
        let aim = sampler.aim();
        assert_abs_diff_eq!(aim.dot(aim_direction(orientation)), 1.0, epsilon = 1e-6);
        for _ in 0..10 {
            assert_eq!(sampler.sample(&mut rng), aim);
        }
    }

    #[test]
    fn samples_stay_within_cap() {
        let mut rng = SmallRng::seed_from_u64(2);
        let orientation =
            orientation::from_azimuth_elevation(-100f32.to_radians(), 35f32.to_radians());
        let aim = aim_direction(orientation);
        for shape in [-5.0, 0.0, 5.0] {
            let sampler = DirectionSampler::new(orientation, 60.0, shape, false);
            for _ in 0..500 {
                let direction = sampler.sample(&mut rng);
                assert_abs_diff_eq!(direction.length(), 1.0, epsilon = 1e-5);
                assert!(angle_between(direction, aim) <= 30.0 + 1e-2);
            }
        }
    }

    #[test]
    fn shape_concentrates_directions() {
        let mut rng = SmallRng::seed_from_u64(3);
        let aim = Vec3::X;
        let mean_angle = |shape: f32, rng: &mut SmallRng| {
            let sampler = DirectionSampler::new(Quat::IDENTITY, 90.0, shape, false);
            (0..2000)
                .map(|_| angle_between(sampler.sample(rng), aim))
                .sum::<f32>()
                / 2000.0
        };
        let centered = mean_angle(8.0, &mut rng);
        let uniform = mean_angle(0.0, &mut rng);
        let rim = mean_angle(-8.0, &mut rng);
        assert!(centered < uniform, "{centered} < {uniform}");
        assert!(uniform < rim, "{uniform} < {rim}");
    }

    #[test]
    fn full_sphere_is_uniform() {
        let mut rng = SmallRng::seed_from_u64(4);
        let sampler = DirectionSampler::new(Quat::IDENTITY, 360.0, 0.0, false);
        let count = 20000;
        let mut sum = Vec3::ZERO;
        for _ in 0..count {
            sum = sum + sampler.sample(&mut rng);
        }
        let mean = sum * (1.0 / count as f32);
        assert!(mean.length() < 0.03, "{mean:?}");
    }

    #[test]
    fn two_dimensional_arc() {
        let mut rng = SmallRng::seed_from_u64(5);
        let orientation =
            orientation::from_azimuth_elevation(90f32.to_radians(), 45f32.to_radians());
        let sampler = DirectionSampler::new(orientation, 40.0, 0.0, true);
        assert_abs_diff_eq!(sampler.aim().y, 1.0, epsilon = 1e-6);
        for _ in 0..500 {
            let direction = sampler.sample(&mut rng);
            assert_eq!(direction.z, 0.0);
            let azimuth = orientation::azimuth(direction).to_degrees();
            assert!((70.0 - 1e-3..=110.0 + 1e-3).contains(&azimuth), "{azimuth}");
        }
    }
}
