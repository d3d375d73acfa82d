use crate::geometry::transform::Transform;
use crate::math::roots::solve_quadratic;
use crate::math::{Matrix3, Point3, Vector3, TOLERANCE};

use super::{Orientation, SurfaceCard};

/// Implicit second-order form `f(p) = p^T M p + b . p + c` with `M`
/// symmetric.
///
/// Every quadric surface variant can be expressed this way, which gives one
/// place to implement ray intersection, rigid motion and geometric
/// equality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadricForm {
    /// Symmetric second-order part.
    pub m: Matrix3,
    /// First-order part.
    pub b: Vector3,
    /// Constant part.
    pub c: f64,
}

impl QuadricForm {
    /// Builds the form from the ten general-quadric coefficients
    /// `A x^2 + B y^2 + C z^2 + D xy + E yz + F zx + G x + H y + J z + K`.
    #[must_use]
    pub fn from_coefficients(k: &[f64; 10]) -> Self {
        let m = Matrix3::new(
            k[0],
            0.5 * k[3],
            0.5 * k[5],
            0.5 * k[3],
            k[1],
            0.5 * k[4],
            0.5 * k[5],
            0.5 * k[4],
            k[2],
        );
        Self {
            m,
            b: Vector3::new(k[6], k[7], k[8]),
            c: k[9],
        }
    }

    /// Returns the ten general-quadric coefficients in card order.
    #[must_use]
    pub fn coefficients(&self) -> [f64; 10] {
        let m = &self.m;
        [
            m[(0, 0)],
            m[(1, 1)],
            m[(2, 2)],
            2.0 * m[(0, 1)],
            2.0 * m[(1, 2)],
            2.0 * m[(0, 2)],
            self.b.x,
            self.b.y,
            self.b.z,
            self.c,
        ]
    }

    /// Evaluates the implicit function.
    #[must_use]
    pub fn value(&self, p: &Point3) -> f64 {
        let v = p.coords;
        v.dot(&(self.m * v)) + self.b.dot(&v) + self.c
    }

    /// Evaluates the gradient of the implicit function.
    #[must_use]
    pub fn gradient(&self, p: &Point3) -> Vector3 {
        self.m * p.coords * 2.0 + self.b
    }

    /// Returns every real parameter `t` where `origin + t * direction`
    /// satisfies `f = 0`, ascending.
    #[must_use]
    pub fn ray_roots(&self, origin: &Point3, direction: &Vector3) -> Vec<f64> {
        let md = self.m * direction;
        let a = direction.dot(&md);
        let b = 2.0 * origin.coords.dot(&md) + self.b.dot(direction);
        let c = self.value(origin);
        solve_quadratic(a, b, c)
    }

    /// Returns the form of the surface after moving it by `transform`.
    #[must_use]
    pub fn transformed(&self, transform: &Transform) -> Self {
        let l = transform.linear();
        let t = transform.translation_part();
        let m = l * self.m * l.transpose();
        let b_rot = l * self.b;
        Self {
            m,
            b: b_rot - m * t * 2.0,
            c: self.c + t.dot(&(m * t)) - b_rot.dot(t),
        }
    }

    /// Returns the coefficients scaled so the dominant second-order (or, for
    /// planes, first-order) coefficient has magnitude one.
    #[must_use]
    pub fn normalized(&self) -> Option<[f64; 10]> {
        let k = self.coefficients();
        let max_abs = |s: &[f64]| s.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        let quad = max_abs(&k[..6]);
        let lin = max_abs(&k[6..9]);
        let scale = if quad > TOLERANCE {
            quad
        } else if lin > TOLERANCE {
            lin
        } else {
            return None;
        };
        Some(k.map(|x| x / scale))
    }

    /// Constant term of the form shifted to its centre,
    /// `c - b . M⁺ b / 4`. Spheres and cylinders give minus the squared
    /// radius.
    #[must_use]
    pub fn centered_constant(&self) -> f64 {
        match self.m.pseudo_inverse(TOLERANCE) {
            Ok(pinv) => self.c - 0.25 * self.b.dot(&(pinv * self.b)),
            Err(_) => self.c,
        }
    }

    /// Compares two forms geometrically.
    ///
    /// Returns [`Orientation::Same`] when the forms agree after
    /// normalisation, [`Orientation::Reversed`] when one is the negation of
    /// the other, and `None` otherwise.
    ///
    /// For second-order forms the centred constant is compared on a length
    /// scale (signed square root), so radii are held to `tol` rather than
    /// their squares.
    #[must_use]
    pub fn compare(&self, other: &QuadricForm, tol: f64) -> Option<Orientation> {
        let (a, b) = (self.normalized()?, other.normalized()?);
        let length = |k: &[f64; 10]| {
            if k[..6].iter().all(|x| x.abs() <= TOLERANCE) {
                return 0.0;
            }
            let c = Self::from_coefficients(k).centered_constant();
            c.signum() * c.abs().sqrt()
        };
        let (la, lb) = (length(&a), length(&b));
        let agree = |sign: f64| {
            a.iter().zip(&b).all(|(x, y)| (x - sign * y).abs() <= tol)
                && (la - sign * lb).abs() <= tol
        };
        if agree(1.0) {
            Some(Orientation::Same)
        } else if agree(-1.0) {
            Some(Orientation::Reversed)
        } else {
            None
        }
    }

    /// Returns the `gq` card for this form.
    #[must_use]
    pub fn card(&self) -> SurfaceCard {
        SurfaceCard::new("gq", self.coefficients().to_vec())
    }
}
