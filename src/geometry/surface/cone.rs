use crate::error::{GeometryError, Result};
use crate::geometry::transform::Transform;
use crate::math::{axis_alignment, unit, Matrix3, Point3, Vector3, TOLERANCE};

use super::{positive_roots, ImplicitSurface, QuadricForm, SurfaceCard};

/// A double (two-sheeted) circular cone.
///
/// Defined by the apex, the axis direction and `tan^2` of the half-angle.
/// Points are inside (negative side) when their distance from the axis is
/// less than `|h| tan(alpha)`, `h` being the axial distance from the apex.
#[derive(Debug, Clone)]
pub struct Cone {
    apex: Point3,
    axis: Vector3,
    tan_sq: f64,
}

impl Cone {
    /// Creates a new cone.
    ///
    /// # Arguments
    ///
    /// * `apex` - The apex (tip) of the cone
    /// * `axis` - Axis direction (will be normalized)
    /// * `half_angle` - Half-angle in radians (must be in `(0, pi/2)`)
    ///
    /// # Errors
    ///
    /// Returns an error if the half-angle is out of range or the axis is
    /// zero-length.
    pub fn new(apex: Point3, axis: Vector3, half_angle: f64) -> Result<Self> {
        if half_angle <= TOLERANCE || half_angle >= std::f64::consts::FRAC_PI_2 - TOLERANCE {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "half_angle",
                value: half_angle,
                min: 0.0,
                max: std::f64::consts::FRAC_PI_2,
            }
            .into());
        }
        let t = half_angle.tan();
        Self::from_tan_squared(apex, axis, t * t)
    }

    /// Creates a cone from `tan^2` of its half-angle, the parameter used on
    /// cone cards.
    ///
    /// # Errors
    ///
    /// Returns an error if `tan_sq` is non-positive or the axis is
    /// zero-length.
    pub fn from_tan_squared(apex: Point3, axis: Vector3, tan_sq: f64) -> Result<Self> {
        if tan_sq <= TOLERANCE {
            return Err(
                GeometryError::Degenerate("cone opening must be positive".into()).into(),
            );
        }
        let axis = unit(&axis).ok_or(GeometryError::ZeroVector)?;
        Ok(Self { apex, axis, tan_sq })
    }

    /// Returns the apex point.
    #[must_use]
    pub fn apex(&self) -> &Point3 {
        &self.apex
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the half-angle in radians.
    #[must_use]
    pub fn half_angle(&self) -> f64 {
        self.tan_sq.sqrt().atan()
    }

    /// Returns `tan^2` of the half-angle.
    #[must_use]
    pub fn tan_squared(&self) -> f64 {
        self.tan_sq
    }

    /// Axial and radial coordinates of `point` relative to the apex.
    fn local(&self, point: &Point3) -> (f64, f64) {
        let q = point - self.apex;
        let h = q.dot(&self.axis);
        (h, (q - self.axis * h).norm())
    }

    /// Returns the implicit form `|q|^2 - (1 + tan^2) (q . a)^2` with
    /// `q = p - apex`.
    #[must_use]
    pub fn form(&self) -> QuadricForm {
        let m = Matrix3::identity() - self.axis * self.axis.transpose() * (1.0 + self.tan_sq);
        let v = self.apex.coords;
        QuadricForm {
            m,
            b: m * v * -2.0,
            c: v.dot(&(m * v)),
        }
    }
}

impl ImplicitSurface for Cone {
    fn value(&self, point: &Point3) -> f64 {
        let (h, rho) = self.local(point);
        rho * rho - self.tan_sq * h * h
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        // distance to the nearest generator in the (h, rho) half-plane
        let (h, rho) = self.local(point);
        let alpha = self.half_angle();
        rho * alpha.cos() - h.abs() * alpha.sin()
    }

    fn normal(&self, point: &Point3) -> Result<Vector3> {
        if (point - self.apex).norm() < TOLERANCE {
            return Err(GeometryError::Degenerate(
                "cone normal is degenerate at apex".into(),
            )
            .into());
        }
        unit(&self.form().gradient(point)).ok_or_else(|| GeometryError::ZeroVector.into())
    }

    fn intersect(&self, origin: &Point3, direction: &Vector3) -> Vec<f64> {
        positive_roots(self.form().ray_roots(origin, direction))
    }

    fn transformed(&self, transform: &Transform) -> Self {
        Self {
            apex: transform.apply_point(&self.apex),
            axis: transform.apply_vector(&self.axis),
            tan_sq: self.tan_sq,
        }
    }

    fn card(&self) -> Result<SurfaceCard> {
        let Some((axis, _)) = axis_alignment(&self.axis, TOLERANCE) else {
            return Ok(self.form().card());
        };
        let a = self.apex;
        let off_axis = (0..3).filter(|&i| i != axis).all(|i| a[i].abs() < TOLERANCE);
        Ok(if off_axis {
            SurfaceCard::new(["kx", "ky", "kz"][axis], vec![a[axis], self.tan_sq])
        } else {
            SurfaceCard::new(["k/x", "k/y", "k/z"][axis], vec![a.x, a.y, a.z, self.tan_sq])
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::surface::Side;

    fn z_cone_45() -> Cone {
        Cone::new(Point3::origin(), Vector3::z(), FRAC_PI_4).unwrap()
    }

    #[test]
    fn both_sheets_are_inside() {
        let c = z_cone_45();
        assert_eq!(c.side(&Point3::new(0.5, 0.0, 2.0)), Side::Negative);
        assert_eq!(c.side(&Point3::new(0.5, 0.0, -2.0)), Side::Negative);
        assert_eq!(c.side(&Point3::new(3.0, 0.0, 2.0)), Side::Positive);
        assert_eq!(c.side(&Point3::new(2.0, 0.0, 2.0)), Side::On);
    }

    #[test]
    fn signed_distance_is_euclidean() {
        let c = z_cone_45();
        // (2, 0, 0) is sqrt(2) from the generator x = z
        assert_relative_eq!(c.signed_distance(&Point3::new(2.0, 0.0, 0.0)), 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn intersect_along_radial_line() {
        let c = z_cone_45();
        let hits = c.intersect(&Point3::new(-5.0, 0.0, 1.0), &Vector3::x());
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0], 4.0, epsilon = 1e-12);
        assert_relative_eq!(hits[1], 6.0, epsilon = 1e-12);
    }

    #[test]
    fn normal_degenerate_at_apex() {
        let c = z_cone_45();
        assert!(c.normal(&Point3::origin()).is_err());
        let n = c.normal(&Point3::new(1.0, 0.0, 1.0)).unwrap();
        assert!(n.x > 0.0 && n.z < 0.0);
    }

    #[test]
    fn invalid_half_angle() {
        assert!(Cone::new(Point3::origin(), Vector3::z(), 0.0).is_err());
        assert!(Cone::new(Point3::origin(), Vector3::z(), FRAC_PI_2).is_err());
    }

    #[test]
    fn card_forms() {
        let kz = Cone::from_tan_squared(Point3::new(0.0, 0.0, 3.0), Vector3::z(), 0.25).unwrap();
        assert_eq!(kz.card().unwrap().to_string(), "kz 3 0.25");
        let k = Cone::from_tan_squared(Point3::new(1.0, 0.0, 3.0), Vector3::z(), 0.25).unwrap();
        assert_eq!(k.card().unwrap().to_string(), "k/z 1 0 3 0.25");
    }
}
