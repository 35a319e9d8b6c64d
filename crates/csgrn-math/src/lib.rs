#![warn(missing_docs)]

//! Math types for the csgrn scene compiler.
//!
//! Thin wrappers around nalgebra providing the single-precision transform
//! type shared by the scene parser, the CSG tree and the GPU records, plus
//! the fixed coordinate-system change between the scene language (Z up) and
//! the renderer (Y up).

use nalgebra::{Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f32>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// A 4x4 affine transformation matrix.
///
/// Matrices follow the column-vector convention: `a.then(&b)` is `a * b` and
/// applies `b` first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f32>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f32, dy: f32, dz: f32) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f32, sy: f32, sz: f32) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Uniform scale by `s` on every axis.
    pub fn uniform_scale(s: f32) -> Self {
        Self::scale(s, s, s)
    }

    /// Build a transform from 16 values listed row by row, the way a matrix
    /// literal is written in scene source.
    ///
    /// The values are assembled column-major (the internal storage order) and
    /// then transposed, so the result reads exactly like the literal.
    pub fn from_row_major(values: &[f32; 16]) -> Self {
        Self {
            matrix: Matrix4::from_column_slice(values).transpose(),
        }
    }

    /// The fixed change of basis from the Z-up authoring convention to the
    /// renderer's Y-up convention: a rotation of -90° about X.
    ///
    /// Maps `(x, y, z)` to `(x, z, -y)`. Entries are exact, so the inverse is
    /// the transpose.
    pub fn z_up_to_y_up() -> Self {
        Self {
            matrix: Matrix4::new(
                1.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, -1.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ),
        }
    }

    /// Re-express a transform authored in Z-up space in Y-up space:
    /// `C * self * C^-1`.
    pub fn to_y_up(&self) -> Self {
        let c = Self::z_up_to_y_up();
        c.then(self).then(&c.transpose())
    }

    /// Compose as `self * other`: `other` applies first.
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transposed copy.
    pub fn transpose(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Columns as plain arrays, the memory order GPU `mat4x4<f32>` expects.
    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        let mut cols = [[0.0; 4]; 4];
        for (c, col) in cols.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = self.matrix[(r, c)];
            }
        }
        cols
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(t.apply_point(&p), p);
    }

    #[test]
    fn test_translation() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let result = t.apply_point(&Point3::new(1.0, 2.0, 3.0));
        assert_eq!(result, Point3::new(11.0, 22.0, 33.0));
    }

    #[test]
    fn test_scale() {
        let t = Transform::scale(2.0, 3.0, 4.0);
        let result = t.apply_point(&Point3::new(1.0, 1.0, 1.0));
        assert_eq!(result, Point3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_compose_applies_right_operand_first() {
        let t = Transform::translation(1.0, 0.0, 0.0);
        let s = Transform::uniform_scale(2.0);
        // (s * t) p = s(t(p)): origin -> (1,0,0) -> (2,0,0)
        let result = s.then(&t).apply_point(&Point3::origin());
        assert_eq!(result, Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_from_row_major_reads_like_literal() {
        let t = Transform::from_row_major(&[
            1.0, 0.0, 0.0, 5.0, //
            0.0, 1.0, 0.0, 6.0, //
            0.0, 0.0, 1.0, 7.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        assert_eq!(t, Transform::translation(5.0, 6.0, 7.0));
    }

    #[test]
    fn test_z_up_to_y_up_matches_rotation() {
        let c = Transform::z_up_to_y_up();
        assert_relative_eq!(
            c.matrix,
            nalgebra::Rotation3::from_axis_angle(&Vec3::x_axis(), -FRAC_PI_2).to_homogeneous(),
            epsilon = 1e-6
        );
        let up = c.apply_vec(&Vec3::z());
        assert_eq!(up, Vec3::y());
    }

    #[test]
    fn test_to_y_up_conjugates_translation() {
        let t = Transform::translation(1.0, 2.0, 3.0).to_y_up();
        // Z-up offset (1, 2, 3) becomes Y-up offset (1, 3, -2)
        assert_eq!(t, Transform::translation(1.0, 3.0, -2.0));
    }

    #[test]
    fn test_to_y_up_is_conjugation_by_inverse() {
        let c = Transform::z_up_to_y_up().matrix;
        let c_inv = c.try_inverse().unwrap();
        let m = Transform::from_row_major(&[
            0.0, -2.0, 0.0, 1.0, //
            3.0, 0.0, 0.0, 2.0, //
            0.0, 0.0, 1.5, -4.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        assert_relative_eq!(m.to_y_up().matrix, c * m.matrix * c_inv, epsilon = 1e-6);
    }

    #[test]
    fn test_to_cols_array_is_column_major() {
        let cols = Transform::translation(4.0, 5.0, 6.0).to_cols_array();
        assert_eq!(cols[3], [4.0, 5.0, 6.0, 1.0]);
        assert_eq!(cols[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
