// Copyright @yucwang 2026

use crate::math::constants::{ Float, Vector3f };
use crate::math::transform::Transform;
use crate::wire::stream::{ WireError, WireWriter };

/// Camera parameters exported to the debugging client. The orientation frame
/// is read off the sensor's to-world matrix: column 1 is up, column 2 the
/// viewing direction, column 3 the eye point.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraData {
    pub near_clip: Float,
    pub far_clip: Float,
    pub focus_dist: Float,
    pub fov: Float,
    pub origin: Vector3f,
    pub up: Vector3f,
    pub direction: Vector3f,
}

impl CameraData {
    pub fn from_transform(near_clip: Float,
                          far_clip: Float,
                          focus_dist: Float,
                          fov: Float,
                          to_world: &Transform) -> Self {
        let mat = to_world.matrix();
        let origin = Vector3f::new(mat[(0, 3)], mat[(1, 3)], mat[(2, 3)]);
        let up = Vector3f::new(mat[(0, 1)], mat[(1, 1)], mat[(2, 1)]);
        let direction = Vector3f::new(mat[(0, 2)], mat[(1, 2)], mat[(2, 2)]);

        Self { near_clip, far_clip, focus_dist, fov, origin, up, direction }
    }

    pub fn write(&self, stream: &mut WireWriter) -> Result<(), WireError> {
        stream.write_f32(self.near_clip)?;
        stream.write_f32(self.far_clip)?;
        stream.write_f32(self.focus_dist)?;
        stream.write_f32(self.fov)?;
        for v in [&self.origin, &self.up, &self.direction].iter() {
            stream.write_f32(v.x)?;
            stream.write_f32(v.y)?;
            stream.write_f32(v.z)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_extraction_from_look_at() {
        let origin = Vector3f::new(0.0, -4.0, 1.0);
        let target = Vector3f::new(0.0, 0.0, 1.0);
        let up = Vector3f::new(0.0, 0.0, 1.0);
        let to_world = Transform::look_at(origin, target, up);

        let camera = CameraData::from_transform(0.1, 100.0, 10.0, 40.0, &to_world);

        assert_eq!(camera.origin, origin);
        assert!((camera.direction - Vector3f::new(0.0, 1.0, 0.0)).norm() < 1e-6);
        assert!((camera.up - up).norm() < 1e-6);
        assert_eq!(camera.fov, 40.0);
    }

    #[test]
    fn test_write_layout() {
        let camera = CameraData {
            near_clip: 0.1,
            far_clip: 100.0,
            focus_dist: 10.0,
            fov: 35.0,
            origin: Vector3f::new(1.0, 2.0, 3.0),
            up: Vector3f::new(0.0, 0.0, 1.0),
            direction: Vector3f::new(0.0, 1.0, 0.0),
        };

        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            camera.write(&mut writer).unwrap();
        }

        // 4 scalars + 3 vectors of 3 floats
        assert_eq!(buffer.len(), 4 * (4 + 9));
    }
}
