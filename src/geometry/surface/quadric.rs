use crate::error::{GeometryError, Result};
use crate::geometry::transform::Transform;
use crate::math::{unit, Point3, Vector3, TOLERANCE};

use super::{positive_roots, ImplicitSurface, QuadricForm, SurfaceCard};

/// A general quadric given by its ten coefficients.
#[derive(Debug, Clone)]
pub struct Quadric {
    form: QuadricForm,
}

impl Quadric {
    /// Creates a quadric from `[A, B, C, D, E, F, G, H, J, K]` for
    /// `A x^2 + B y^2 + C z^2 + D xy + E yz + F zx + G x + H y + J z + K = 0`.
    ///
    /// # Errors
    ///
    /// Returns an error if every non-constant coefficient vanishes.
    pub fn new(coefficients: [f64; 10]) -> Result<Self> {
        Self::from_form(QuadricForm::from_coefficients(&coefficients))
    }

    /// Wraps an existing implicit form.
    ///
    /// # Errors
    ///
    /// Returns an error if the form has no second- or first-order terms.
    pub fn from_form(form: QuadricForm) -> Result<Self> {
        if form.normalized().is_none() {
            return Err(
                GeometryError::Degenerate("quadric has no variable terms".into()).into(),
            );
        }
        Ok(Self { form })
    }

    /// Returns the implicit form.
    #[must_use]
    pub fn form(&self) -> &QuadricForm {
        &self.form
    }
}

impl ImplicitSurface for Quadric {
    fn value(&self, point: &Point3) -> f64 {
        self.form.value(point)
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        let f = self.form.value(point);
        let g = self.form.gradient(point).norm();
        if g < TOLERANCE {
            f
        } else {
            f / g
        }
    }

    fn normal(&self, point: &Point3) -> Result<Vector3> {
        unit(&self.form.gradient(point)).ok_or_else(|| {
            GeometryError::Degenerate("quadric gradient vanishes at point".into()).into()
        })
    }

    fn intersect(&self, origin: &Point3, direction: &Vector3) -> Vec<f64> {
        positive_roots(self.form.ray_roots(origin, direction))
    }

    fn transformed(&self, transform: &Transform) -> Self {
        Self {
            form: self.form.transformed(transform),
        }
    }

    fn card(&self) -> Result<SurfaceCard> {
        Ok(self.form.card())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::surface::Side;

    // ellipsoid x^2/4 + y^2 + z^2 = 1
    fn ellipsoid() -> Quadric {
        Quadric::new([0.25, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0]).unwrap()
    }

    #[test]
    fn ellipsoid_sides() {
        let q = ellipsoid();
        assert_eq!(q.side(&Point3::new(1.9, 0.0, 0.0)), Side::Negative);
        assert_eq!(q.side(&Point3::new(2.1, 0.0, 0.0)), Side::Positive);
        assert_eq!(q.side(&Point3::new(0.0, 1.0, 0.0)), Side::On);
    }

    #[test]
    fn ellipsoid_intersection() {
        let hits = ellipsoid().intersect(&Point3::new(-3.0, 0.0, 0.0), &Vector3::x());
        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(hits[1], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_quadric_rejected() {
        assert!(Quadric::new([0.0; 10]).is_err());
    }

    #[test]
    fn translation_moves_surface() {
        let q = ellipsoid().transformed(&Transform::translation(Vector3::new(0.0, 0.0, 10.0)));
        assert_eq!(q.side(&Point3::new(0.0, 0.0, 10.0)), Side::Negative);
        assert_eq!(q.side(&Point3::origin()), Side::Positive);
    }
}
