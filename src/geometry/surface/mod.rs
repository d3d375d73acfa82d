mod card;
mod cone;
mod cylinder;
mod form;
mod plane;
mod quadric;
mod sphere;
mod torus;

pub use card::SurfaceCard;
pub use cone::Cone;
pub use cylinder::Cylinder;
pub use form::QuadricForm;
pub use plane::Plane;
pub use quadric::Quadric;
pub use sphere::Sphere;
pub use torus::Torus;

use crate::config::{EQUALITY_TOLERANCE, SIDE_TOLERANCE};
use crate::error::Result;
use crate::geometry::transform::Transform;
use crate::math::{Point3, Vector3};

/// Which side of a surface a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// `f(p) < 0`, e.g. inside a cylinder or sphere.
    Negative,
    /// Within the tolerance band around the surface.
    On,
    /// `f(p) > 0`.
    Positive,
}

impl Side {
    /// Classifies a signed distance against a tolerance band.
    #[must_use]
    pub fn classify(signed_distance: f64, tol: f64) -> Self {
        if signed_distance > tol {
            Self::Positive
        } else if signed_distance < -tol {
            Self::Negative
        } else {
            Self::On
        }
    }

    /// Returns -1, 0 or +1.
    #[must_use]
    pub fn sign(self) -> i8 {
        match self {
            Self::Negative => -1,
            Self::On => 0,
            Self::Positive => 1,
        }
    }
}

/// Relative orientation of two geometrically equal surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Same positive side.
    Same,
    /// Positive and negative sides swapped.
    Reversed,
}

/// Capabilities shared by every implicit surface.
///
/// The sign convention follows the transport-code convention: the positive
/// sense of a surface is where its implicit function is positive, so the
/// inside of a closed quadric is its negative sense.
pub trait ImplicitSurface {
    /// Evaluates the implicit function.
    fn value(&self, point: &Point3) -> f64;

    /// Signed distance to the surface, exact for planes, spheres, cylinders,
    /// cones and tori and first-order for general quadrics.
    fn signed_distance(&self, point: &Point3) -> f64;

    /// Unit normal pointing towards the positive side.
    ///
    /// # Errors
    ///
    /// Returns an error where the normal is undefined (cylinder axis, cone
    /// apex, sphere center).
    fn normal(&self, point: &Point3) -> Result<Vector3>;

    /// Returns every `t > 0` where `origin + t * direction` lies on the
    /// surface, in ascending order. Tangent contacts are reported once.
    fn intersect(&self, origin: &Point3, direction: &Vector3) -> Vec<f64>;

    /// Returns the surface moved by `transform`.
    #[must_use]
    fn transformed(&self, transform: &Transform) -> Self
    where
        Self: Sized;

    /// Returns the canonical card keyword and parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface has no card representation.
    fn card(&self) -> Result<SurfaceCard>;

    /// Classifies `point` using a tolerance band of half-width `tol`.
    fn side_within(&self, point: &Point3, tol: f64) -> Side {
        Side::classify(self.signed_distance(point), tol)
    }

    /// Classifies `point` using [`SIDE_TOLERANCE`].
    fn side(&self, point: &Point3) -> Side {
        self.side_within(point, SIDE_TOLERANCE)
    }

    /// Unsigned distance to the surface.
    fn distance(&self, point: &Point3) -> f64 {
        self.signed_distance(point).abs()
    }
}

/// Keeps only strictly positive roots, in ascending order.
pub(crate) fn positive_roots(mut roots: Vec<f64>) -> Vec<f64> {
    roots.retain(|t| *t > 0.0);
    roots.sort_by(f64::total_cmp);
    roots
}

/// A surface of any supported kind.
#[derive(Debug, Clone)]
pub enum Surface {
    Plane(Plane),
    Sphere(Sphere),
    Cylinder(Cylinder),
    Cone(Cone),
    Quadric(Quadric),
    Torus(Torus),
}

macro_rules! each_kind {
    ($value:expr, $s:ident => $body:expr) => {
        match $value {
            Surface::Plane($s) => $body,
            Surface::Sphere($s) => $body,
            Surface::Cylinder($s) => $body,
            Surface::Cone($s) => $body,
            Surface::Quadric($s) => $body,
            Surface::Torus($s) => $body,
        }
    };
}

impl Surface {
    /// Short lowercase name of the surface kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Plane(_) => "plane",
            Self::Sphere(_) => "sphere",
            Self::Cylinder(_) => "cylinder",
            Self::Cone(_) => "cone",
            Self::Quadric(_) => "quadric",
            Self::Torus(_) => "torus",
        }
    }

    /// Returns the second-order implicit form, or `None` for a torus.
    #[must_use]
    pub fn quadric_form(&self) -> Option<QuadricForm> {
        match self {
            Self::Plane(s) => Some(s.form()),
            Self::Sphere(s) => Some(s.form()),
            Self::Cylinder(s) => Some(s.form()),
            Self::Cone(s) => Some(s.form()),
            Self::Quadric(s) => Some(*s.form()),
            Self::Torus(_) => None,
        }
    }

    /// Compares two surfaces geometrically within `tol`.
    ///
    /// The comparison ignores parameterisation: a cylinder whose reference
    /// point slides along its axis, or a plane whose normal and offset are
    /// both negated, describes the same surface. The latter comes back as
    /// [`Orientation::Reversed`].
    #[must_use]
    pub fn compare(&self, other: &Surface, tol: f64) -> Option<Orientation> {
        match (self, other) {
            (Self::Torus(a), Self::Torus(b)) => a.same_geometry(b, tol).then_some(Orientation::Same),
            (Self::Torus(_), _) | (_, Self::Torus(_)) => None,
            _ => self.quadric_form()?.compare(&other.quadric_form()?, tol),
        }
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other, EQUALITY_TOLERANCE).is_some()
    }
}

impl ImplicitSurface for Surface {
    fn value(&self, point: &Point3) -> f64 {
        each_kind!(self, s => s.value(point))
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        each_kind!(self, s => s.signed_distance(point))
    }

    fn normal(&self, point: &Point3) -> Result<Vector3> {
        each_kind!(self, s => s.normal(point))
    }

    fn intersect(&self, origin: &Point3, direction: &Vector3) -> Vec<f64> {
        each_kind!(self, s => s.intersect(origin, direction))
    }

    fn transformed(&self, transform: &Transform) -> Self {
        match self {
            Self::Plane(s) => Self::Plane(s.transformed(transform)),
            Self::Sphere(s) => Self::Sphere(s.transformed(transform)),
            Self::Cylinder(s) => Self::Cylinder(s.transformed(transform)),
            Self::Cone(s) => Self::Cone(s.transformed(transform)),
            Self::Quadric(s) => Self::Quadric(s.transformed(transform)),
            Self::Torus(s) => Self::Torus(s.transformed(transform)),
        }
    }

    fn card(&self) -> Result<SurfaceCard> {
        each_kind!(self, s => s.card())
    }
}

macro_rules! impl_from_kind {
    ($($kind:ident),*) => {
        $(impl From<$kind> for Surface {
            fn from(s: $kind) -> Self {
                Surface::$kind(s)
            }
        })*
    };
}

impl_from_kind!(Plane, Sphere, Cylinder, Cone, Quadric, Torus);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn z_cylinder(x: f64, y: f64, z: f64, r: f64) -> Surface {
        Cylinder::new(Point3::new(x, y, z), Vector3::z(), r).unwrap().into()
    }

    #[test]
    fn cylinder_equality_ignores_axial_offset() {
        let a = z_cylinder(1.0, 2.0, 0.0, 3.0);
        let b = z_cylinder(1.0, 2.0, 17.5, 3.0);
        assert_eq!(a, b);
        assert_ne!(a, z_cylinder(1.0, 2.0, 0.0, 3.1));
    }

    #[test]
    fn flipped_plane_is_reversed() {
        let a: Surface = Plane::new(Vector3::new(1.0, 0.0, 0.0), 5.0).unwrap().into();
        let b: Surface = Plane::new(Vector3::new(-1.0, 0.0, 0.0), -5.0).unwrap().into();
        assert_eq!(a.compare(&b, EQUALITY_TOLERANCE), Some(Orientation::Reversed));
        assert_eq!(a, b);
    }

    #[test]
    fn equality_is_symmetric_across_kinds() {
        let cyl = z_cylinder(0.0, 0.0, 0.0, 2.0);
        let gq: Surface = Quadric::new([1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -4.0])
            .unwrap()
            .into();
        assert_eq!(cyl, gq);
        assert_eq!(gq, cyl);
        let torus: Surface = Torus::new(Point3::origin(), Vector3::z(), 5.0, 1.0).unwrap().into();
        assert_ne!(torus, cyl);
        assert_eq!(torus, torus.clone());
    }

    #[test]
    fn equality_survives_common_transform() {
        let t = Transform::rotation(Point3::new(1.0, 2.0, 3.0), Vector3::new(1.0, -1.0, 2.0), 0.8)
            .unwrap()
            .then(&Transform::translation(Vector3::new(4.0, 0.0, -1.0)));
        let a = z_cylinder(1.0, 1.0, 0.0, 2.0);
        let b = z_cylinder(1.0, 1.0, -9.0, 2.0);
        let c = z_cylinder(1.5, 1.0, 0.0, 2.0);
        assert_eq!(a.transformed(&t), b.transformed(&t));
        assert_ne!(a.transformed(&t), c.transformed(&t));
    }

    #[test]
    fn side_signs() {
        assert_eq!(Side::classify(0.5, 1e-8).sign(), 1);
        assert_eq!(Side::classify(-0.5, 1e-8).sign(), -1);
        assert_eq!(Side::classify(1e-9, 1e-8), Side::On);
    }

    #[test]
    fn positive_roots_drops_non_positive() {
        assert_eq!(positive_roots(vec![3.0, -1.0, 0.0, 1.0]), vec![1.0, 3.0]);
    }
}
