//! Real spherical harmonics evaluation for ambisonic encoding.
//!
//! Channels use ACN ordering (`acn = n * n + n + m`). Harmonics are real valued, without the
//! Condon-Shortley phase, and are either N3D or SN3D normalized.

use strum::{Display, EnumString, VariantArray, VariantNames};

use super::orientation::{normalized_direction, Vec3};

// -------------------------------------------------------------------------------------------------

/// Highest supported ambisonic order.
pub const MAX_ORDER: usize = 7;
/// Number of channels of a [`MAX_ORDER`] sound field.
pub const MAX_CHANNEL_COUNT: usize = channel_count(MAX_ORDER);

/// One coefficient per ambisonic channel, up to the maximum order.
pub type Coefficients = [f32; MAX_CHANNEL_COUNT];

// -------------------------------------------------------------------------------------------------

/// Spherical harmonics normalization scheme.
#[allow(clippy::upper_case_acronyms)]
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames, VariantArray,
)]
pub enum Normalization {
    /// Full 3D normalization: every harmonic has the same energy.
    N3D,
    /// Schmidt semi-normalization: N3D scaled by `1 / sqrt(2n + 1)` per degree `n`.
    #[default]
    SN3D,
}

impl Normalization {
    /// Per degree scale factor relative to N3D.
    #[inline]
    pub fn degree_scale(&self, degree: usize) -> f32 {
        match self {
            Normalization::N3D => 1.0,
            Normalization::SN3D => SN3D_FROM_N3D[degree],
        }
    }
}

/// `1 / sqrt(2n + 1)` for n in 0..=MAX_ORDER.
const SN3D_FROM_N3D: [f32; MAX_ORDER + 1] = [
    1.0,
    0.577_350_26,
    0.447_213_6,
    0.377_964_47,
    0.333_333_34,
    0.301_511_34,
    0.277_350_1,
    0.258_198_9,
];

// -------------------------------------------------------------------------------------------------

/// Number of ambisonic channels of the given order.
pub const fn channel_count(order: usize) -> usize {
    (order + 1) * (order + 1)
}

/// Highest full ambisonic order which fits into the given number of channels, if any.
pub fn order_for_channel_count(channel_count: usize) -> Option<usize> {
    let order_plus_one = (channel_count as f64).sqrt().floor() as usize;
    if order_plus_one == 0 {
        None
    } else {
        Some((order_plus_one - 1).min(MAX_ORDER))
    }
}

/// ACN channel index of degree `n` and index `m` with `-n <= m <= n`.
#[inline]
pub const fn acn(n: usize, m: isize) -> usize {
    ((n * n + n) as isize + m) as usize
}

// -------------------------------------------------------------------------------------------------

/// Evaluate real spherical harmonics up to the given order for a unit direction.
///
/// Writes `channel_count(order)` coefficients and zeroes all remaining ones.
pub fn encode(
    direction: Vec3,
    order: usize,
    normalization: Normalization,
    coefficients: &mut Coefficients,
) {
    let order = order.min(MAX_ORDER);
    let direction = normalized_direction(direction);

    // associated Legendre functions are evaluated in double precision
    let z = (direction.z as f64).clamp(-1.0, 1.0);
    let rho = (1.0 - z * z).max(0.0).sqrt();
    let azimuth = (direction.y as f64).atan2(direction.x as f64);

    let mut legendre = [[0.0_f64; MAX_ORDER + 1]; MAX_ORDER + 1];
    associated_legendre(order, z, rho, &mut legendre);

    coefficients.fill(0.0);
    for n in 0..=order {
        let degree_scale = normalization.degree_scale(n);
        for m in 0..=n {
            let norm = n3d_norm(n, m) * legendre[n][m];
            if m == 0 {
                coefficients[acn(n, 0)] = (norm as f32) * degree_scale;
            } else {
                let (sin, cos) = (m as f64 * azimuth).sin_cos();
                coefficients[acn(n, m as isize)] = ((norm * cos) as f32) * degree_scale;
                coefficients[acn(n, -(m as isize))] = ((norm * sin) as f32) * degree_scale;
            }
        }
    }
}

/// Evaluate `P_n^m(z)` without Condon-Shortley phase for all `m <= n <= order`.
fn associated_legendre(
    order: usize,
    z: f64,
    rho: f64,
    legendre: &mut [[f64; MAX_ORDER + 1]; MAX_ORDER + 1],
) {
    // P_m^m = (2m - 1)!! * rho^m
    legendre[0][0] = 1.0;
    for m in 1..=order {
        legendre[m][m] = legendre[m - 1][m - 1] * (2 * m - 1) as f64 * rho;
    }
    for m in 0..order {
        // P_{m+1}^m = (2m + 1) * z * P_m^m
        legendre[m + 1][m] = (2 * m + 1) as f64 * z * legendre[m][m];
        // (n - m) P_n^m = (2n - 1) z P_{n-1}^m - (n + m - 1) P_{n-2}^m
        for n in (m + 2)..=order {
            legendre[n][m] = ((2 * n - 1) as f64 * z * legendre[n - 1][m]
                - (n + m - 1) as f64 * legendre[n - 2][m])
                / (n - m) as f64;
        }
    }
}

/// N3D normalization factor `sqrt((2n + 1) * (2 - delta_m) * (n - m)! / (n + m)!)`.
fn n3d_norm(n: usize, m: usize) -> f64 {
    // (n - m)! / (n + m)! = 1 / ((n - m + 1) * ... * (n + m))
    let mut ratio = 1.0_f64;
    for k in (n - m + 1)..=(n + m) {
        ratio /= k as f64;
    }
    let delta = if m == 0 { 1.0 } else { 2.0 };
    ((2 * n + 1) as f64 * delta * ratio).sqrt()
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    use super::*;

    fn random_direction(rng: &mut SmallRng) -> Vec3 {
        normalized_direction(Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        ))
    }

    #[test]
    fn channel_layouts() {
        assert_eq!(channel_count(0), 1);
        assert_eq!(channel_count(3), 16);
        assert_eq!(MAX_CHANNEL_COUNT, 64);
        assert_eq!(acn(1, -1), 1);
        assert_eq!(acn(1, 1), 3);
        assert_eq!(acn(7, 7), 63);
        assert_eq!(order_for_channel_count(0), None);
        assert_eq!(order_for_channel_count(1), Some(0));
        assert_eq!(order_for_channel_count(15), Some(2));
        assert_eq!(order_for_channel_count(16), Some(3));
        assert_eq!(order_for_channel_count(128), Some(7));
    }

    #[test]
    fn first_order_components() {
        let mut coefficients = [0.0; MAX_CHANNEL_COUNT];
        let direction = Vec3::new(0.48, 0.6, 0.64);
        encode(direction, 1, Normalization::SN3D, &mut coefficients);
        // W, Y, Z, X
        assert_abs_diff_eq!(coefficients[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(coefficients[1], direction.y, epsilon = 1e-6);
        assert_abs_diff_eq!(coefficients[2], direction.z, epsilon = 1e-6);
        assert_abs_diff_eq!(coefficients[3], direction.x, epsilon = 1e-6);
        assert!(coefficients[4..].iter().all(|c| *c == 0.0));

        encode(Vec3::X, 2, Normalization::N3D, &mut coefficients);
        assert_abs_diff_eq!(coefficients[3], 3.0_f32.sqrt(), epsilon = 1e-6);
        // R (ACN 6) is -sqrt(5) / 2 on the horizon
        assert_abs_diff_eq!(coefficients[6], -(5.0_f32.sqrt()) / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn energy_matches_normalization() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut coefficients = [0.0; MAX_CHANNEL_COUNT];
        for order in 0..=MAX_ORDER {
            for _ in 0..20 {
                let direction = random_direction(&mut rng);
                encode(direction, order, Normalization::N3D, &mut coefficients);
                let energy: f32 = coefficients.iter().map(|c| c * c).sum();
                assert_abs_diff_eq!(energy, channel_count(order) as f32, epsilon = 1e-3);

                encode(direction, order, Normalization::SN3D, &mut coefficients);
                let energy: f32 = coefficients.iter().map(|c| c * c).sum();
                assert_abs_diff_eq!(energy, (order + 1) as f32, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn poles_are_stable() {
        let mut coefficients = [0.0; MAX_CHANNEL_COUNT];
        encode(Vec3::new(0.0, 0.0, 1.0), MAX_ORDER, Normalization::N3D, &mut coefficients);
        assert!(coefficients.iter().all(|c| c.is_finite()));
        // only zonal harmonics are non-zero at the poles
        for n in 0..=MAX_ORDER {
            for m in 1..=n as isize {
                assert_abs_diff_eq!(coefficients[acn(n, m)], 0.0, epsilon = 1e-6);
                assert_abs_diff_eq!(coefficients[acn(n, -m)], 0.0, epsilon = 1e-6);
            }
            assert_abs_diff_eq!(
                coefficients[acn(n, 0)],
                ((2 * n + 1) as f32).sqrt(),
                epsilon = 1e-5
            );
        }
    }
}
