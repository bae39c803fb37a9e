//! Plane-wave encoding (ACN, SN3D) for building test sound fields

use af_core::Sample;

use super::AmbisonicOrder;

/// Real spherical-harmonic coefficients of a plane wave. Angles are in
/// degrees: azimuth counter-clockwise from front, elevation up from the
/// horizon.
pub(crate) fn plane_wave(
    azimuth: Sample,
    elevation: Sample,
    order: AmbisonicOrder,
) -> Vec<Sample> {
    let az = azimuth.to_radians();
    let el = elevation.to_radians();
    let (sin_el, cos_el) = el.sin_cos();
    let n = order.as_usize();

    let mut coeffs = vec![0.0; order.channel_count()];
    coeffs[0] = 1.0;

    if n >= 1 {
        coeffs[1] = cos_el * az.sin();
        coeffs[2] = sin_el;
        coeffs[3] = cos_el * az.cos();
    }

    if n >= 2 {
        let k = 3.0_f64.sqrt() / 2.0;
        let cos2_el = cos_el * cos_el;

        coeffs[4] = k * cos2_el * (2.0 * az).sin();
        coeffs[5] = k * (2.0 * el).sin() * az.sin();
        coeffs[6] = 0.5 * (3.0 * sin_el * sin_el - 1.0);
        coeffs[7] = k * (2.0 * el).sin() * az.cos();
        coeffs[8] = k * cos2_el * (2.0 * az).cos();
    }

    if n >= 3 {
        let k3 = (5.0_f64 / 8.0).sqrt();
        let k2 = 15.0_f64.sqrt() / 2.0;
        let k1 = (3.0_f64 / 8.0).sqrt();
        let cos2_el = cos_el * cos_el;
        let cos3_el = cos2_el * cos_el;
        let tilt = 5.0 * sin_el * sin_el - 1.0;

        coeffs[9] = k3 * cos3_el * (3.0 * az).sin();
        coeffs[10] = k2 * sin_el * cos2_el * (2.0 * az).sin();
        coeffs[11] = k1 * cos_el * tilt * az.sin();
        coeffs[12] = 0.5 * sin_el * (5.0 * sin_el * sin_el - 3.0);
        coeffs[13] = k1 * cos_el * tilt * az.cos();
        coeffs[14] = k2 * sin_el * cos2_el * (2.0 * az).cos();
        coeffs[15] = k3 * cos3_el * (3.0 * az).cos();
    }

    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_front() {
        let sh = plane_wave(0.0, 0.0, AmbisonicOrder::First);
        for (a, b) in sh.iter().zip([1.0, 0.0, 0.0, 1.0]) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_left() {
        let sh = plane_wave(90.0, 0.0, AmbisonicOrder::Second);

        assert_abs_diff_eq!(sh[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sh[3], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sh[6], -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(sh[8], -(3.0_f64.sqrt()) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sn3d_peak_values() {
        // Sectoral harmonics peak on the horizon
        let sh = plane_wave(45.0, 0.0, AmbisonicOrder::Third);
        assert_abs_diff_eq!(sh[4], 3.0_f64.sqrt() / 2.0, epsilon = 1e-12);
        let sh = plane_wave(30.0, 0.0, AmbisonicOrder::Third);
        assert_abs_diff_eq!(sh[9], (5.0_f64 / 8.0).sqrt(), epsilon = 1e-12);
    }
}
