use crate::error::{GeometryError, Result};
use crate::math::{unit, Matrix3, Point3, Vector3, TOLERANCE};

/// A rigid motion `p -> L * p + t` where `L` is orthogonal.
///
/// `L` may be a proper rotation or, for mirrors, an improper one
/// (determinant -1). Surfaces are moved with [`Transform`] while a model is
/// being constructed; registered surfaces are never transformed in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    linear: Matrix3,
    translation: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// The identity motion.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            linear: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// A pure translation by `displacement`.
    #[must_use]
    pub fn translation(displacement: Vector3) -> Self {
        Self {
            linear: Matrix3::identity(),
            translation: displacement,
        }
    }

    /// A rotation by `angle` radians about the axis through `axis_origin`
    /// along `axis_direction`.
    ///
    /// # Errors
    ///
    /// Returns an error if the axis direction is zero-length.
    pub fn rotation(axis_origin: Point3, axis_direction: Vector3, angle: f64) -> Result<Self> {
        let axis = unit(&axis_direction).ok_or(GeometryError::ZeroVector)?;
        let rot = rotation_matrix(&axis, angle);
        Ok(Self {
            linear: rot,
            translation: axis_origin.coords - rot * axis_origin.coords,
        })
    }

    /// A reflection through the plane containing `plane_origin` with normal
    /// `plane_normal`.
    ///
    /// # Errors
    ///
    /// Returns an error if the normal is zero-length.
    pub fn mirror(plane_origin: Point3, plane_normal: Vector3) -> Result<Self> {
        let n = unit(&plane_normal).ok_or(GeometryError::ZeroVector)?;
        Ok(Self {
            linear: Matrix3::identity() - n * n.transpose() * 2.0,
            translation: n * (2.0 * n.dot(&plane_origin.coords)),
        })
    }

    /// Builds a transform from an explicit matrix and translation.
    ///
    /// # Errors
    ///
    /// Returns an error if `linear` is not orthogonal.
    pub fn from_parts(linear: Matrix3, translation: Vector3) -> Result<Self> {
        let defect = (linear.transpose() * linear - Matrix3::identity()).abs().max();
        if defect > 1e-9 {
            return Err(GeometryError::Degenerate(
                "transform matrix is not orthogonal".into(),
            )
            .into());
        }
        Ok(Self {
            linear,
            translation,
        })
    }

    /// Returns the motion that applies `self` first and `next` second.
    #[must_use]
    pub fn then(&self, next: &Transform) -> Self {
        Self {
            linear: next.linear * self.linear,
            translation: next.linear * self.translation + next.translation,
        }
    }

    /// Returns the inverse motion.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let lt = self.linear.transpose();
        Self {
            linear: lt,
            translation: -(lt * self.translation),
        }
    }

    /// Returns the orthogonal part.
    #[must_use]
    pub fn linear(&self) -> &Matrix3 {
        &self.linear
    }

    /// Returns the translation part.
    #[must_use]
    pub fn translation_part(&self) -> &Vector3 {
        &self.translation
    }

    /// Returns `true` if the motion reverses handedness.
    #[must_use]
    pub fn is_reflection(&self) -> bool {
        self.linear.determinant() < 0.0
    }

    /// Applies the motion to a point.
    #[must_use]
    pub fn apply_point(&self, point: &Point3) -> Point3 {
        Point3::from(self.linear * point.coords + self.translation)
    }

    /// Applies the orthogonal part to a direction.
    #[must_use]
    pub fn apply_vector(&self, v: &Vector3) -> Vector3 {
        self.linear * v
    }
}

/// Builds a rotation matrix around a unit axis by an angle (Rodrigues).
#[allow(clippy::many_single_char_names)]
fn rotation_matrix(axis: &Vector3, angle: f64) -> Matrix3 {
    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);

    #[allow(clippy::suspicious_operation_groupings)]
    let m = Matrix3::new(
        t * x * x + c,     t * x * y - s * z, t * x * z + s * y,
        t * x * y + s * z, t * y * y + c,     t * y * z - s * x,
        t * x * z - s * y, t * y * z + s * x, t * z * z + c,
    );
    debug_assert!((m.determinant() - 1.0).abs() < TOLERANCE.sqrt());
    m
}
