// Copyright 2020 @TwoCookingMice

use super::constants::{ Matrix4f, Vector3f };

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    matrix: Matrix4f,
    inv_matrix: Matrix4f
}

impl Default for Transform {
    fn default() -> Self {
        Self { matrix: Matrix4f::identity(),
               inv_matrix: Matrix4f::identity() }
    }
}

impl Transform {
    pub fn new(matrix: Matrix4f) -> Self {
        Self { matrix,
               inv_matrix: matrix.try_inverse().unwrap_or_else(Matrix4f::identity) }
    }

    /// Build a to-world transform placing a sensor at `origin` looking at
    /// `target`. Columns hold right, up, direction and origin.
    pub fn look_at(origin: Vector3f, target: Vector3f, up: Vector3f) -> Self {
        let dir = (target - origin).normalize();
        let right = up.cross(&dir).normalize();
        let new_up = dir.cross(&right);

        let mut matrix = Matrix4f::identity();
        for row in 0..3 {
            matrix[(row, 0)] = right[row];
            matrix[(row, 1)] = new_up[row];
            matrix[(row, 2)] = dir[row];
            matrix[(row, 3)] = origin[row];
        }

        Self::new(matrix)
    }

    pub fn matrix(&self) -> &Matrix4f {
        &self.matrix
    }

    pub fn apply_point(&self, p: Vector3f) -> Vector3f {
        let x = p[0] * self.matrix[(0, 0)] + p[1] * self.matrix[(0, 1)] +
            p[2] * self.matrix[(0, 2)] + self.matrix[(0, 3)];
        let y = p[0] * self.matrix[(1, 0)] + p[1] * self.matrix[(1, 1)] +
            p[2] * self.matrix[(1, 2)] + self.matrix[(1, 3)];
        let z = p[0] * self.matrix[(2, 0)] + p[1] * self.matrix[(2, 1)] +
            p[2] * self.matrix[(2, 2)] + self.matrix[(2, 3)];
        let w = p[0] * self.matrix[(3, 0)] + p[1] * self.matrix[(3, 1)] +
            p[2] * self.matrix[(3, 2)] + self.matrix[(3, 3)];

        Vector3f::new(x / w, y / w, z / w)
    }

    pub fn apply_vector(&self, v: Vector3f) -> Vector3f {
        let x = v[0] * self.matrix[(0, 0)] + v[1] * self.matrix[(0, 1)] + v[2] * self.matrix[(0, 2)];
        let y = v[0] * self.matrix[(1, 0)] + v[1] * self.matrix[(1, 1)] + v[2] * self.matrix[(1, 2)];
        let z = v[0] * self.matrix[(2, 0)] + v[1] * self.matrix[(2, 1)] + v[2] * self.matrix[(2, 2)];

        Vector3f::new(x, y, z)
    }

    pub fn inv_apply_point(&self, p: Vector3f) -> Vector3f {
        let x = p[0] * self.inv_matrix[(0, 0)] + p[1] * self.inv_matrix[(0, 1)] +
            p[2] * self.inv_matrix[(0, 2)] + self.inv_matrix[(0, 3)];
        let y = p[0] * self.inv_matrix[(1, 0)] + p[1] * self.inv_matrix[(1, 1)] +
            p[2] * self.inv_matrix[(1, 2)] + self.inv_matrix[(1, 3)];
        let z = p[0] * self.inv_matrix[(2, 0)] + p[1] * self.inv_matrix[(2, 1)] +
            p[2] * self.inv_matrix[(2, 2)] + self.inv_matrix[(2, 3)];
        let w = p[0] * self.inv_matrix[(3, 0)] + p[1] * self.inv_matrix[(3, 1)] +
            p[2] * self.inv_matrix[(3, 2)] + self.inv_matrix[(3, 3)];

        Vector3f::new(x / w, y / w, z / w)
    }

    pub fn origin(&self) -> Vector3f {
        Vector3f::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_at_columns() {
        let origin = Vector3f::new(1.0, 2.0, 3.0);
        let target = Vector3f::new(2.0, 2.0, 3.0);
        let up = Vector3f::new(0.0, 0.0, 1.0);
        let t = Transform::look_at(origin, target, up);

        let m = t.matrix();
        // direction column points at the target
        assert!((m[(0, 2)] - 1.0).abs() < 1e-6);
        assert!(m[(1, 2)].abs() < 1e-6);
        assert!(m[(2, 2)].abs() < 1e-6);
        // origin column holds the eye point
        assert_eq!(t.origin(), origin);
    }

    #[test]
    fn test_look_at_maps_local_forward() {
        let origin = Vector3f::new(0.0, 0.0, 5.0);
        let target = Vector3f::new(0.0, 4.0, 5.0);
        let up = Vector3f::new(0.0, 0.0, 1.0);
        let t = Transform::look_at(origin, target, up);

        // local +Z is the viewing direction
        let p = t.apply_point(Vector3f::new(0.0, 0.0, 2.0));
        assert!((p - Vector3f::new(0.0, 2.0, 5.0)).norm() < 1e-5);

        let back = t.inv_apply_point(p);
        assert!((back - Vector3f::new(0.0, 0.0, 2.0)).norm() < 1e-5);
    }
}
