//! Spherical-harmonic rotation
//!
//! Extends a 3x3 world rotation to every ambisonic degree using the
//! recursion of Ivanic & Ruedenberg (with the corrections published by
//! Green). The degree-1 block comes straight from the world matrix; each
//! higher block is a function of the degree-1 block and the block one
//! degree below, so degrees are always rebuilt in increasing order.
//!
//! World matrices are column-major: element `(row, col)` is `m[col * 3 + row]`.

use af_core::Sample;
use ndarray::Array2;

/// Column-major 3x3 rotation
pub type RotationMatrix3 = [Sample; 9];

/// Column-major 4x4 transform; only the upper-left 3x3 block is used
pub type RotationMatrix4 = [Sample; 16];

pub const IDENTITY_MATRIX3: RotationMatrix3 = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Sign applied to world rows/columns for the ACN (Y, Z, X) axes
pub(crate) const ACN_AXIS_SIGN: [Sample; 3] = [-1.0, 1.0, -1.0];

/// Rotation block for one degree, indexed by centered `-l..=l` row/column
#[derive(Debug, Clone, PartialEq)]
pub struct BandRotation {
    degree: i32,
    data: Array2<Sample>,
}

impl BandRotation {
    fn identity(degree: usize) -> Self {
        Self {
            degree: degree as i32,
            data: Array2::eye(2 * degree + 1),
        }
    }

    pub fn degree(&self) -> usize {
        self.degree as usize
    }

    /// Rows (and columns) in the block, `2l + 1`
    pub fn size(&self) -> usize {
        self.data.nrows()
    }

    /// Entry at centered indices `m, n` in `-l..=l`
    #[inline]
    pub fn get(&self, m: i32, n: i32) -> Sample {
        self.data[[(m + self.degree) as usize, (n + self.degree) as usize]]
    }

    #[inline]
    fn set(&mut self, m: i32, n: i32, value: Sample) {
        let l = self.degree;
        self.data[[(m + l) as usize, (n + l) as usize]] = value;
    }

    /// Dense block, row = output index, column = input index
    pub fn as_array(&self) -> &Array2<Sample> {
        &self.data
    }
}

/// Full rotation operator for an ambisonic order.
///
/// Holds one [`BandRotation`] per degree `1..=order`; degree 0 is the
/// rotation-invariant W channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalHarmonicRotation {
    bands: Vec<BandRotation>,
}

impl SphericalHarmonicRotation {
    pub fn identity(order: usize) -> Self {
        Self {
            bands: (1..=order).map(BandRotation::identity).collect(),
        }
    }

    pub fn from_world_matrix3(order: usize, matrix: &RotationMatrix3) -> Self {
        let mut rotation = Self::identity(order);
        rotation.set_world_matrix3(matrix);
        rotation
    }

    pub fn order(&self) -> usize {
        self.bands.len()
    }

    pub fn channel_count(&self) -> usize {
        (self.order() + 1) * (self.order() + 1)
    }

    /// Replace the world rotation and rebuild every band.
    ///
    /// No orthonormality check is made.
    pub fn set_world_matrix3(&mut self, matrix: &RotationMatrix3) {
        let Some(first) = self.bands.first_mut() else {
            return;
        };

        for row in 0..3 {
            for col in 0..3 {
                let value = ACN_AXIS_SIGN[row] * ACN_AXIS_SIGN[col] * matrix[col * 3 + row];
                first.set(row as i32 - 1, col as i32 - 1, value);
            }
        }

        for l in 2..=self.bands.len() {
            let band = compute_band(&self.bands[0], &self.bands[l - 2], l as i32);
            self.bands[l - 1] = band;
        }
    }

    /// The world rotation, read back from the degree-1 block
    pub fn world_matrix3(&self) -> RotationMatrix3 {
        let mut matrix = IDENTITY_MATRIX3;
        if let Some(first) = self.bands.first() {
            for row in 0..3 {
                for col in 0..3 {
                    matrix[col * 3 + row] = ACN_AXIS_SIGN[row]
                        * ACN_AXIS_SIGN[col]
                        * first.get(row as i32 - 1, col as i32 - 1);
                }
            }
        }
        matrix
    }

    /// Block for `degree` (1..=order)
    pub fn band(&self, degree: usize) -> Option<&BandRotation> {
        degree.checked_sub(1).and_then(|i| self.bands.get(i))
    }

    pub fn bands(&self) -> &[BandRotation] {
        &self.bands
    }

    /// Rotate one frame of ACN coefficients. Both slices hold at least
    /// `channel_count()` values.
    pub fn apply(&self, input: &[Sample], output: &mut [Sample]) {
        output[0] = input[0];
        for band in &self.bands {
            let offset = band.degree() * band.degree();
            let size = band.size();
            for row in 0..size {
                output[offset + row] = (0..size)
                    .map(|col| band.data[[row, col]] * input[offset + col])
                    .sum();
            }
        }
    }

    /// The block-diagonal operator as a dense K x K matrix
    pub fn to_dense(&self) -> Array2<Sample> {
        let k = self.channel_count();
        let mut dense = Array2::zeros((k, k));
        dense[[0, 0]] = 1.0;
        for band in &self.bands {
            let offset = band.degree() * band.degree();
            let size = band.size();
            dense
                .slice_mut(ndarray::s![offset..offset + size, offset..offset + size])
                .assign(&band.data);
        }
        dense
    }
}

fn kronecker(a: i32, b: i32) -> Sample {
    if a == b { 1.0 } else { 0.0 }
}

/// Shared term of U, V and W
fn centered_p(i: i32, a: i32, b: i32, l: i32, r1: &BandRotation, prev: &BandRotation) -> Sample {
    if b == l {
        r1.get(i, 1) * prev.get(a, l - 1) - r1.get(i, -1) * prev.get(a, -l + 1)
    } else if b == -l {
        r1.get(i, 1) * prev.get(a, -l + 1) + r1.get(i, -1) * prev.get(a, l - 1)
    } else {
        r1.get(i, 0) * prev.get(a, b)
    }
}

fn u_term(m: i32, n: i32, l: i32, r1: &BandRotation, prev: &BandRotation) -> Sample {
    centered_p(0, m, n, l, r1, prev)
}

fn v_term(m: i32, n: i32, l: i32, r1: &BandRotation, prev: &BandRotation) -> Sample {
    if m == 0 {
        centered_p(1, 1, n, l, r1, prev) + centered_p(-1, -1, n, l, r1, prev)
    } else if m > 0 {
        let d = kronecker(m, 1);
        centered_p(1, m - 1, n, l, r1, prev) * (1.0 + d).sqrt()
            - centered_p(-1, -m + 1, n, l, r1, prev) * (1.0 - d)
    } else {
        let d = kronecker(m, -1);
        centered_p(1, m + 1, n, l, r1, prev) * (1.0 - d)
            + centered_p(-1, -m - 1, n, l, r1, prev) * (1.0 + d).sqrt()
    }
}

fn w_term(m: i32, n: i32, l: i32, r1: &BandRotation, prev: &BandRotation) -> Sample {
    if m == 0 {
        0.0
    } else if m > 0 {
        centered_p(1, m + 1, n, l, r1, prev) + centered_p(-1, -m - 1, n, l, r1, prev)
    } else {
        centered_p(1, m - 1, n, l, r1, prev) - centered_p(-1, -m + 1, n, l, r1, prev)
    }
}

/// Coefficients `(u, v, w)` for entry `(m, n)` of the degree-`l` block
fn uvw_coefficients(m: i32, n: i32, l: i32) -> (Sample, Sample, Sample) {
    let d = kronecker(m, 0);
    let abs_m = m.abs();

    let reciprocal = if n.abs() == l {
        1.0 / (2 * l * (2 * l - 1)) as Sample
    } else {
        1.0 / ((l + n) * (l - n)) as Sample
    };

    let u = (((l + m) * (l - m)) as Sample * reciprocal).sqrt();
    let v = 0.5
        * (1.0 - 2.0 * d)
        * ((1.0 + d) * ((l + abs_m - 1) * (l + abs_m)) as Sample * reciprocal).sqrt();
    let w = -0.5 * (1.0 - d) * (((l - abs_m - 1) * (l - abs_m)) as Sample * reciprocal).sqrt();

    (u, v, w)
}

fn compute_band(r1: &BandRotation, prev: &BandRotation, l: i32) -> BandRotation {
    let mut band = BandRotation::identity(l as usize);

    for m in -l..=l {
        for n in -l..=l {
            let (u, v, w) = uvw_coefficients(m, n, l);

            // A zero coefficient means its term would index outside prev
            let mut value = 0.0;
            if u != 0.0 {
                value += u * u_term(m, n, l, r1, prev);
            }
            if v != 0.0 {
                value += v * v_term(m, n, l, r1, prev);
            }
            if w != 0.0 {
                value += w * w_term(m, n, l, r1, prev);
            }
            band.set(m, n, value);
        }
    }

    band
}
