use crate::error::{GeometryError, Result};
use crate::geometry::transform::Transform;
use crate::math::roots::solve_polynomial;
use crate::math::{axis_alignment, unit, Point3, Vector3, TOLERANCE};

use super::{positive_roots, ImplicitSurface, SurfaceCard};

/// A circular torus.
///
/// Defined by a center, the symmetry axis, the major radius (center to tube
/// center) and the minor (tube) radius. The inside of the tube is the
/// negative side.
#[derive(Debug, Clone)]
pub struct Torus {
    center: Point3,
    axis: Vector3,
    major_radius: f64,
    minor_radius: f64,
}

impl Torus {
    /// Creates a new torus.
    ///
    /// # Errors
    ///
    /// Returns an error if either radius is non-positive, minor >= major or
    /// the axis is zero-length.
    pub fn new(center: Point3, axis: Vector3, major_radius: f64, minor_radius: f64) -> Result<Self> {
        if major_radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("torus major radius must be positive".into()).into(),
            );
        }
        if minor_radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("torus minor radius must be positive".into()).into(),
            );
        }
        if minor_radius >= major_radius {
            return Err(GeometryError::Degenerate(
                "torus minor radius must be less than major radius".into(),
            )
            .into());
        }
        let axis = unit(&axis).ok_or(GeometryError::ZeroVector)?;
        Ok(Self {
            center,
            axis,
            major_radius,
            minor_radius,
        })
    }

    /// Returns the center of the torus.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the axis direction (unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the major radius (center to tube center).
    #[must_use]
    pub fn major_radius(&self) -> f64 {
        self.major_radius
    }

    /// Returns the minor radius (tube radius).
    #[must_use]
    pub fn minor_radius(&self) -> f64 {
        self.minor_radius
    }

    /// Axial offset and radial vector of `point` relative to the center.
    fn local(&self, point: &Point3) -> (f64, Vector3) {
        let q = point - self.center;
        let h = q.dot(&self.axis);
        (h, q - self.axis * h)
    }

    /// Returns `true` if both tori describe the same surface within `tol`.
    #[must_use]
    pub fn same_geometry(&self, other: &Torus, tol: f64) -> bool {
        (self.center - other.center).norm() <= tol
            && (1.0 - self.axis.dot(&other.axis).abs()) <= tol
            && (self.major_radius - other.major_radius).abs() <= tol
            && (self.minor_radius - other.minor_radius).abs() <= tol
    }
}

impl ImplicitSurface for Torus {
    fn value(&self, point: &Point3) -> f64 {
        let q = point - self.center;
        let (_, radial) = self.local(point);
        let r2 = self.major_radius * self.major_radius;
        let g = q.norm_squared() + r2 - self.minor_radius * self.minor_radius;
        g * g - 4.0 * r2 * radial.norm_squared()
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        let (h, radial) = self.local(point);
        (radial.norm() - self.major_radius).hypot(h) - self.minor_radius
    }

    fn normal(&self, point: &Point3) -> Result<Vector3> {
        let (_, radial) = self.local(point);
        let ring = unit(&radial).ok_or_else(|| {
            GeometryError::Degenerate("torus normal is undefined on the axis".into())
        })?;
        let tube_center = self.center + ring * self.major_radius;
        unit(&(point - tube_center)).ok_or_else(|| {
            GeometryError::Degenerate("torus normal is undefined on the tube circle".into()).into()
        })
    }

    fn intersect(&self, origin: &Point3, direction: &Vector3) -> Vec<f64> {
        let (_, rad0) = self.local(origin);
        let dh = direction.dot(&self.axis);
        let drad = direction - self.axis * dh;
        let q0 = origin - self.center;

        // g(t) = |q|^2 + R^2 - r^2 and rho^2(t) as quadratics in t
        let r2 = self.major_radius * self.major_radius;
        let g = [
            direction.norm_squared(),
            2.0 * q0.dot(direction),
            q0.norm_squared() + r2 - self.minor_radius * self.minor_radius,
        ];
        let rho = [
            drad.norm_squared(),
            2.0 * rad0.dot(&drad),
            rad0.norm_squared(),
        ];

        let k = 4.0 * r2;
        let coeffs = [
            g[0] * g[0],
            2.0 * g[0] * g[1],
            g[1] * g[1] + 2.0 * g[0] * g[2] - k * rho[0],
            2.0 * g[1] * g[2] - k * rho[1],
            g[2] * g[2] - k * rho[2],
        ];
        positive_roots(solve_polynomial(&coeffs))
    }

    fn transformed(&self, transform: &Transform) -> Self {
        Self {
            center: transform.apply_point(&self.center),
            axis: transform.apply_vector(&self.axis),
            major_radius: self.major_radius,
            minor_radius: self.minor_radius,
        }
    }

    fn card(&self) -> Result<SurfaceCard> {
        let Some((axis, _)) = axis_alignment(&self.axis, TOLERANCE) else {
            return Err(GeometryError::Unrepresentable(
                "torus axis is not parallel to a coordinate axis".into(),
            )
            .into());
        };
        let c = self.center;
        Ok(SurfaceCard::new(
            ["tx", "ty", "tz"][axis],
            vec![
                c.x,
                c.y,
                c.z,
                self.major_radius,
                self.minor_radius,
                self.minor_radius,
            ],
        ))
    }
}
