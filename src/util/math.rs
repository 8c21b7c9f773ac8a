//! Scalar helpers shared by the geometry kernel and the overlap cascade.

use glam::Vec3;

/// Guard added to denominators of volume ratios.
pub(crate) const RATIO_EPS: f32 = 1e-10;

/// Rounds to the nearest integer with ties going to the even neighbour.
#[inline]
pub(crate) fn round_to_int(value: f32) -> i32 {
    value.round_ties_even() as i32
}

/// Determinant of the 3x3 matrix with rows `(b - a, c - a, p - a)`.
#[inline]
pub(crate) fn det_rows(a: Vec3, b: Vec3, c: Vec3, p: Vec3) -> f32 {
    let m0 = b - a;
    let m1 = c - a;
    let m2 = p - a;
    m0[0] * (m1[1] * m2[2] - m2[1] * m1[2]) - m0[1] * (m1[0] * m2[2] - m1[2] * m2[0])
        + m0[2] * (m1[0] * m2[1] - m1[1] * m2[0])
}

/// Ratio of an intersection volume to the smaller of two volumes.
#[inline]
pub(crate) fn overlap_ratio(inter: f32, min_volume: f32) -> f32 {
    inter / (min_volume + RATIO_EPS)
}

#[cfg(test)]
mod tests {
    use super::{det_rows, overlap_ratio, round_to_int};
    use glam::Vec3;

    #[test]
    fn round_to_int_breaks_ties_to_even() {
        assert_eq!(round_to_int(0.5), 0);
        assert_eq!(round_to_int(1.5), 2);
        assert_eq!(round_to_int(-2.5), -2);
        assert_eq!(round_to_int(2.6), 3);
    }

    #[test]
    fn det_rows_is_six_times_signed_tetra_volume() {
        let a = Vec3::ZERO;
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 1.0, 0.0);
        let p = Vec3::new(0.0, 0.0, 1.0);
        assert!((det_rows(a, b, c, p) - 1.0).abs() < 1e-6);
        assert!((det_rows(a, c, b, p) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn overlap_ratio_handles_zero_volume() {
        assert_eq!(overlap_ratio(0.0, 0.0), 0.0);
        assert!((overlap_ratio(2.0, 4.0) - 0.5).abs() < 1e-6);
    }
}
