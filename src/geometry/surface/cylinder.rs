use crate::error::{GeometryError, Result};
use crate::geometry::transform::Transform;
use crate::math::{axis_alignment, unit, Matrix3, Point3, Vector3, TOLERANCE};

use super::{positive_roots, ImplicitSurface, QuadricForm, SurfaceCard};

/// An infinite circular cylinder.
///
/// Defined by a point on the axis, the axis direction and the radius. Only
/// the axis line matters geometrically: the reference point may sit anywhere
/// along it and the axis may point either way. The inside is the negative
/// side.
#[derive(Debug, Clone)]
pub struct Cylinder {
    center: Point3,
    axis: Vector3,
    radius: f64,
}

impl Cylinder {
    /// Creates a new cylinder.
    ///
    /// # Arguments
    ///
    /// * `center` - A point on the cylinder axis
    /// * `axis` - Axis direction (will be normalized)
    /// * `radius` - Radius (must be positive)
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive or the axis is
    /// zero-length.
    pub fn new(center: Point3, axis: Vector3, radius: f64) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("cylinder radius must be positive".into()).into(),
            );
        }
        let axis = unit(&axis).ok_or(GeometryError::ZeroVector)?;
        Ok(Self {
            center,
            axis,
            radius,
        })
    }

    /// Returns the reference point on the axis.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Component of `point - center` perpendicular to the axis.
    fn radial(&self, point: &Point3) -> Vector3 {
        let dp = point - self.center;
        dp - self.axis * dp.dot(&self.axis)
    }

    /// Returns the implicit form `|q|^2 - (q . a)^2 - r^2` with
    /// `q = p - center`.
    #[must_use]
    pub fn form(&self) -> QuadricForm {
        let m = Matrix3::identity() - self.axis * self.axis.transpose();
        let c = self.center.coords;
        QuadricForm {
            m,
            b: m * c * -2.0,
            c: c.dot(&(m * c)) - self.radius * self.radius,
        }
    }
}

impl ImplicitSurface for Cylinder {
    fn value(&self, point: &Point3) -> f64 {
        self.radial(point).norm_squared() - self.radius * self.radius
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        self.radial(point).norm() - self.radius
    }

    fn normal(&self, point: &Point3) -> Result<Vector3> {
        unit(&self.radial(point)).ok_or_else(|| {
            GeometryError::Degenerate("cylinder normal is undefined on the axis".into()).into()
        })
    }

    fn intersect(&self, origin: &Point3, direction: &Vector3) -> Vec<f64> {
        positive_roots(self.form().ray_roots(origin, direction))
    }

    fn transformed(&self, transform: &Transform) -> Self {
        Self {
            center: transform.apply_point(&self.center),
            axis: transform.apply_vector(&self.axis),
            radius: self.radius,
        }
    }

    fn card(&self) -> Result<SurfaceCard> {
        let Some((axis, _)) = axis_alignment(&self.axis, TOLERANCE) else {
            return Ok(self.form().card());
        };
        let (j, k) = ((axis + 1) % 3, (axis + 2) % 3);
        let (u, v) = if axis == 1 {
            // c/y lists x then z
            (self.center[k], self.center[j])
        } else {
            (self.center[j], self.center[k])
        };
        Ok(if u.abs() < TOLERANCE && v.abs() < TOLERANCE {
            SurfaceCard::new(["cx", "cy", "cz"][axis], vec![self.radius])
        } else {
            SurfaceCard::new(["c/x", "c/y", "c/z"][axis], vec![u, v, self.radius])
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::surface::Side;

    fn z_cylinder(radius: f64) -> Cylinder {
        Cylinder::new(Point3::origin(), Vector3::z(), radius).unwrap()
    }

    #[test]
    fn distance_to_x_axis_cylinder() {
        let c = Cylinder::new(Point3::origin(), Vector3::x(), 5.0).unwrap();
        let expected = 5.0 - (0.6_f64 * 0.6 + 0.4 * 0.4).sqrt();
        assert_relative_eq!(c.distance(&Point3::new(1.2, 0.6, 0.4)), expected, epsilon = 1e-5);
    }

    #[test]
    fn inside_is_negative() {
        let c = z_cylinder(2.0);
        assert_eq!(c.side(&Point3::new(1.0, 0.0, 100.0)), Side::Negative);
        assert_eq!(c.side(&Point3::new(3.0, 0.0, -4.0)), Side::Positive);
        assert_eq!(c.side(&Point3::new(0.0, 2.0, 9.0)), Side::On);
    }

    #[test]
    fn invalid_radius() {
        assert!(Cylinder::new(Point3::origin(), Vector3::z(), 0.0).is_err());
        assert!(Cylinder::new(Point3::origin(), Vector3::zeros(), 1.0).is_err());
    }

    #[test]
    fn intersect_across_axis() {
        let c = z_cylinder(1.0);
        let hits = c.intersect(&Point3::new(-3.0, 0.0, 0.0), &Vector3::x());
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(hits[1], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn parallel_ray_misses() {
        let c = z_cylinder(1.0);
        assert!(c.intersect(&Point3::new(0.5, 0.0, 0.0), &Vector3::z()).is_empty());
    }

    #[test]
    fn tangent_ray_single_root() {
        let c = z_cylinder(1.0);
        let hits = c.intersect(&Point3::new(-4.0, 1.0, 0.0), &Vector3::x());
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn normal_outward() {
        let c = z_cylinder(1.0);
        assert_relative_eq!(c.normal(&Point3::new(1.0, 0.0, 3.0)).unwrap(), Vector3::x());
        assert!(c.normal(&Point3::new(0.0, 0.0, 3.0)).is_err());
    }

    #[test]
    fn card_forms() {
        assert_eq!(z_cylinder(2.0).card().unwrap().to_string(), "cz 2");
        let cy = Cylinder::new(Point3::new(1.0, 5.0, 3.0), -Vector3::y(), 1.5).unwrap();
        assert_eq!(cy.card().unwrap().to_string(), "c/y 1 3 1.5");
        let tilted = Cylinder::new(Point3::origin(), Vector3::new(1.0, 1.0, 0.0), 1.0).unwrap();
        assert_eq!(tilted.card().unwrap().keyword, "gq");
    }
}
