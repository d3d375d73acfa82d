use crate::error::{GeometryError, Result};
use crate::geometry::transform::Transform;
use crate::math::{axis_alignment, Matrix3, Point3, Vector3, TOLERANCE};

use super::{positive_roots, ImplicitSurface, QuadricForm, SurfaceCard};

/// A sphere `|p - center|^2 = radius^2`. The inside is the negative side.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
}

impl Sphere {
    /// Creates a new sphere.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive.
    pub fn new(center: Point3, radius: f64) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("sphere radius must be positive".into()).into(),
            );
        }
        Ok(Self { center, radius })
    }

    /// Returns the center of the sphere.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the implicit form `|p - c|^2 - r^2`.
    #[must_use]
    pub fn form(&self) -> QuadricForm {
        let c = self.center.coords;
        QuadricForm {
            m: Matrix3::identity(),
            b: c * -2.0,
            c: c.norm_squared() - self.radius * self.radius,
        }
    }
}

impl ImplicitSurface for Sphere {
    fn value(&self, point: &Point3) -> f64 {
        (point - self.center).norm_squared() - self.radius * self.radius
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        (point - self.center).norm() - self.radius
    }

    fn normal(&self, point: &Point3) -> Result<Vector3> {
        let d = point - self.center;
        let len = d.norm();
        if len < TOLERANCE {
            return Err(GeometryError::Degenerate(
                "sphere normal is undefined at the center".into(),
            )
            .into());
        }
        Ok(d / len)
    }

    fn intersect(&self, origin: &Point3, direction: &Vector3) -> Vec<f64> {
        positive_roots(self.form().ray_roots(origin, direction))
    }

    fn transformed(&self, transform: &Transform) -> Self {
        Self {
            center: transform.apply_point(&self.center),
            radius: self.radius,
        }
    }

    fn card(&self) -> Result<SurfaceCard> {
        let c = self.center;
        if c.coords.norm() < TOLERANCE {
            return Ok(SurfaceCard::new("so", vec![self.radius]));
        }
        Ok(match axis_alignment(&c.coords, TOLERANCE) {
            Some((axis, _)) => SurfaceCard::new(["sx", "sy", "sz"][axis], vec![c[axis], self.radius]),
            None => SurfaceCard::new("s", vec![c.x, c.y, c.z, self.radius]),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::surface::Side;

    #[test]
    fn inside_is_negative() {
        let s = Sphere::new(Point3::origin(), 2.0).unwrap();
        assert_eq!(s.side(&Point3::origin()), Side::Negative);
        assert_eq!(s.side(&Point3::new(0.0, 3.0, 0.0)), Side::Positive);
        assert_eq!(s.side(&Point3::new(0.0, 0.0, 2.0)), Side::On);
        assert_relative_eq!(s.distance(&Point3::new(0.5, 0.0, 0.0)), 1.5);
    }

    #[test]
    fn intersect_from_inside_and_outside() {
        let s = Sphere::new(Point3::origin(), 1.0).unwrap();
        let from_inside = s.intersect(&Point3::origin(), &Vector3::x());
        assert_eq!(from_inside.len(), 1);
        assert_relative_eq!(from_inside[0], 1.0, epsilon = 1e-12);
        let from_outside = s.intersect(&Point3::new(2.0, 0.0, 0.0), &-Vector3::x());
        assert_eq!(from_outside.len(), 2);
        assert!(s.intersect(&Point3::new(2.0, 0.0, 0.0), &Vector3::x()).is_empty());
    }

    #[test]
    fn grazing_ray_gives_single_root() {
        let s = Sphere::new(Point3::origin(), 1.0).unwrap();
        let hits = s.intersect(&Point3::new(-5.0, 1.0, 0.0), &Vector3::x());
        assert_eq!(hits.len(), 1);
        assert_relative_eq!(hits[0], 5.0, epsilon = 1e-6);
    }

    #[test]
    fn invalid_radius() {
        assert!(Sphere::new(Point3::origin(), 0.0).is_err());
    }

    #[test]
    fn normal_outward() {
        let s = Sphere::new(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();
        assert_relative_eq!(s.normal(&Point3::new(1.0, 0.0, 1.0)).unwrap(), Vector3::z());
        assert!(s.normal(&Point3::new(1.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn card_forms() {
        let so = Sphere::new(Point3::origin(), 3.0).unwrap();
        assert_eq!(so.card().unwrap().to_string(), "so 3");
        let sz = Sphere::new(Point3::new(0.0, 0.0, -4.0), 1.0).unwrap();
        assert_eq!(sz.card().unwrap().to_string(), "sz -4 1");
        let s = Sphere::new(Point3::new(1.0, 2.0, 0.0), 1.0).unwrap();
        assert_eq!(s.card().unwrap().to_string(), "s 1 2 0 1");
    }
}
