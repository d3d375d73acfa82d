use crate::error::{GeometryError, Result};
use crate::geometry::transform::Transform;
use crate::math::{axis_alignment, unit, Point3, Vector3, TOLERANCE};

use super::{ImplicitSurface, QuadricForm, SurfaceCard};

/// An infinite plane `n . p = d` with unit normal `n`.
///
/// The positive side is the half-space the normal points into.
#[derive(Debug, Clone)]
pub struct Plane {
    normal: Vector3,
    distance: f64,
}

impl Plane {
    /// Creates the plane `normal . p = distance`.
    ///
    /// The normal is normalised and `distance` is rescaled to match, so
    /// `Plane::new((2, 0, 0), 4)` is the plane `x = 2`.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal is zero-length.
    pub fn new(normal: Vector3, distance: f64) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            normal: normal / len,
            distance: distance / len,
        })
    }

    /// Creates a plane through `origin` with the given normal.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal is zero-length.
    pub fn from_normal(origin: Point3, normal: Vector3) -> Result<Self> {
        let n = unit(&normal).ok_or(GeometryError::ZeroVector)?;
        Ok(Self {
            normal: n,
            distance: n.dot(&origin.coords),
        })
    }

    /// Creates the plane through three points, with normal
    /// `(b - a) x (c - a)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the points are collinear.
    pub fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Result<Self> {
        let n = (b - a).cross(&(c - a));
        unit(&n)
            .map(|normal| Self {
                normal,
                distance: normal.dot(&a.coords),
            })
            .ok_or_else(|| GeometryError::Degenerate("plane points are collinear".into()).into())
    }

    /// The plane `x = d` with normal `+x`.
    #[must_use]
    pub fn px(d: f64) -> Self {
        Self {
            normal: Vector3::x(),
            distance: d,
        }
    }

    /// The plane `y = d` with normal `+y`.
    #[must_use]
    pub fn py(d: f64) -> Self {
        Self {
            normal: Vector3::y(),
            distance: d,
        }
    }

    /// The plane `z = d` with normal `+z`.
    #[must_use]
    pub fn pz(d: f64) -> Self {
        Self {
            normal: Vector3::z(),
            distance: d,
        }
    }

    /// Returns the unit normal.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Returns the signed offset along the normal.
    #[must_use]
    pub fn distance_from_origin(&self) -> f64 {
        self.distance
    }

    /// Returns the implicit form `n . p - d`.
    #[must_use]
    pub fn form(&self) -> QuadricForm {
        QuadricForm {
            m: crate::math::Matrix3::zeros(),
            b: self.normal,
            c: -self.distance,
        }
    }
}

impl ImplicitSurface for Plane {
    fn value(&self, point: &Point3) -> f64 {
        self.normal.dot(&point.coords) - self.distance
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        self.value(point)
    }

    fn normal(&self, _point: &Point3) -> Result<Vector3> {
        Ok(self.normal)
    }

    fn intersect(&self, origin: &Point3, direction: &Vector3) -> Vec<f64> {
        let denom = self.normal.dot(direction);
        if denom.abs() < TOLERANCE {
            return Vec::new();
        }
        let t = -self.value(origin) / denom;
        if t > 0.0 {
            vec![t]
        } else {
            Vec::new()
        }
    }

    fn transformed(&self, transform: &Transform) -> Self {
        let normal = transform.apply_vector(&self.normal);
        let on_plane = Point3::from(self.normal * self.distance);
        let moved = transform.apply_point(&on_plane);
        Self {
            normal,
            distance: normal.dot(&moved.coords),
        }
    }

    fn card(&self) -> Result<SurfaceCard> {
        Ok(match axis_alignment(&self.normal, TOLERANCE) {
            Some((axis, sign)) if sign > 0.0 => {
                SurfaceCard::new(["px", "py", "pz"][axis], vec![self.distance])
            }
            _ => {
                let n = self.normal;
                SurfaceCard::new("p", vec![n.x, n.y, n.z, self.distance])
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::surface::Side;

    #[test]
    fn new_normalises_offset() {
        let p = Plane::new(Vector3::new(2.0, 0.0, 0.0), 4.0).unwrap();
        assert_relative_eq!(p.distance_from_origin(), 2.0);
        assert_relative_eq!(p.value(&Point3::new(2.0, 7.0, -1.0)), 0.0);
    }

    #[test]
    fn zero_normal_is_error() {
        assert!(Plane::new(Vector3::zeros(), 1.0).is_err());
    }

    #[test]
    fn side_follows_normal() {
        let p = Plane::pz(1.0);
        assert_eq!(p.side(&Point3::new(0.0, 0.0, 2.0)), Side::Positive);
        assert_eq!(p.side(&Point3::new(0.0, 0.0, 0.0)), Side::Negative);
        assert_eq!(p.side(&Point3::new(5.0, 5.0, 1.0)), Side::On);
    }

    #[test]
    fn intersect_forward_only() {
        let p = Plane::px(5.0);
        assert_eq!(p.intersect(&Point3::origin(), &Vector3::x()), vec![5.0]);
        assert!(p.intersect(&Point3::origin(), &-Vector3::x()).is_empty());
        assert!(p.intersect(&Point3::origin(), &Vector3::y()).is_empty());
        assert_eq!(p.intersect(&Point3::new(10.0, 0.0, 0.0), &-Vector3::x()), vec![5.0]);
    }

    #[test]
    fn from_points_orientation() {
        let p = Plane::from_points(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(*p.plane_normal(), Vector3::z());
    }

    #[test]
    fn rotated_plane_moves() {
        let t = Transform::rotation(Point3::origin(), Vector3::z(), FRAC_PI_2).unwrap();
        let p = Plane::px(3.0).transformed(&t);
        assert_relative_eq!(p.value(&Point3::new(0.0, 3.0, 0.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(*p.plane_normal(), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn card_forms() {
        assert_eq!(Plane::py(-2.0).card().unwrap().to_string(), "py -2");
        let flipped = Plane::new(-Vector3::x(), 1.0).unwrap();
        assert_eq!(flipped.card().unwrap().to_string(), "p -1 0 0 1");
    }
}
