pub mod surface;
pub mod transform;

pub use surface::{
    Cone, Cylinder, ImplicitSurface, Orientation, Plane, Quadric, QuadricForm, Side, Sphere,
    Surface, SurfaceCard, Torus,
};
pub use transform::Transform;
