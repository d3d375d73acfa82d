pub mod roots;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix type, used for quadric coefficient forms and rigid rotations.
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Global tolerance for degenerate-vector and parameter checks.
pub const TOLERANCE: f64 = 1e-10;

/// Normalises `v`, returning `None` for a vector shorter than [`TOLERANCE`].
#[must_use]
pub fn unit(v: &Vector3) -> Option<Vector3> {
    let len = v.norm();
    (len >= TOLERANCE).then(|| v / len)
}

/// Returns the coordinate axis (0 = x, 1 = y, 2 = z) that `dir` is parallel
/// to, if any, together with the sign of the matching component.
#[must_use]
pub fn axis_alignment(dir: &Vector3, tol: f64) -> Option<(usize, f64)> {
    (0..3).find_map(|i| {
        let others = (0..3)
            .filter(|&j| j != i)
            .all(|j| dir[j].abs() <= tol);
        (others && dir[i].abs() > tol).then(|| (i, dir[i].signum()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unit_rejects_zero() {
        assert!(unit(&Vector3::zeros()).is_none());
        let u = unit(&Vector3::new(0.0, 3.0, 4.0)).unwrap();
        assert!((u.norm() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn axis_alignment_detects_sign() {
        assert_eq!(axis_alignment(&Vector3::new(0.0, -2.0, 0.0), 1e-9), Some((1, -1.0)));
        assert_eq!(axis_alignment(&Vector3::new(1.0, 1.0, 0.0), 1e-9), None);
    }
}
