//! Vantage Math
//!
//! Small, dependency-light math primitives shared by the Vantage camera crates:
//!
//! - **Vectors**: `Vec2`, `Vec3`
//! - **Rotations**: `Quat` with slerp and look rotations
//! - **Transforms**: `Locator` (position + rotation)
//! - **Visibility**: `BoundingSphere`, `Frustum`
//! - **Easing**: sine/quadratic ease curves and range remapping
//! - **Ids**: `Sid` hashed string identifiers
//!
//! All vector types are `#[repr(C)]` and `bytemuck::Pod` so they can be
//! embedded in fixed-size parameter blobs.

pub mod bounds;
pub mod easing;
pub mod locator;
pub mod quat;
pub mod sid;
pub mod vec;

pub use bounds::{BoundingSphere, Frustum};
pub use locator::Locator;
pub use quat::Quat;
pub use sid::Sid;
pub use vec::{Vec2, Vec3};
