// Copyright @yucwang 2026

use crate::math::constants::{ Float, Vector2f, Vector3f };
use crate::wire::stream::{ WireError, WireWriter };

/// Closed set of payloads a named aux value can carry to the client. The
/// wire tag is the component width, so the client decodes a uniform
/// layout without knowing the producing type. Colors always travel
/// 4-wide, never 3-wide.
#[derive(Debug, Clone, PartialEq)]
pub enum AuxValue {
    Vec2([Float; 2]),
    Vec3([Float; 3]),
    Color4([Float; 4]),
}

impl AuxValue {
    pub fn from_vec2(v: Vector2f) -> Self {
        AuxValue::Vec2([v.x, v.y])
    }

    pub fn from_vec3(v: Vector3f) -> Self {
        AuxValue::Vec3([v.x, v.y, v.z])
    }

    /// Normalize an RGB color to the 4-wide wire layout.
    pub fn from_color(c: Vector3f) -> Self {
        AuxValue::Color4([c.x, c.y, c.z, 0.0])
    }

    pub fn width(&self) -> u8 {
        match self {
            AuxValue::Vec2(_) => 2,
            AuxValue::Vec3(_) => 3,
            AuxValue::Color4(_) => 4,
        }
    }

    pub fn components(&self) -> &[Float] {
        match self {
            AuxValue::Vec2(v) => v,
            AuxValue::Vec3(v) => v,
            AuxValue::Color4(v) => v,
        }
    }

    /// Wire layout: component width as the type tag, then the components.
    pub fn write(&self, stream: &mut WireWriter) -> Result<(), WireError> {
        stream.write_i32(self.width() as i32)?;
        for component in self.components() {
            stream.write_f32(*component)?;
        }
        Ok(())
    }
}

/// One light-transport path captured for one pixel sample. Filled in by a
/// single worker thread while the path is traced, committed through the
/// bridge, then discarded.
#[derive(Debug, Clone, Default)]
pub struct PathSample {
    pub path_index: u32,
    pub origin: Option<Vector3f>,
    pub intersection_pos: Option<Vector3f>,
    pub nee_pos: Option<Vector3f>,
    pub nee_visible: bool,
    pub intersection_estimate: Option<Vector3f>,
    pub intersection_emission: Option<Vector3f>,
    pub final_estimate: Option<Vector3f>,
    pub intersection_data: Vec<(String, AuxValue)>,
    pub path_data: Vec<(String, AuxValue)>,
}

impl PathSample {
    pub fn new(path_index: u32) -> Self {
        Self { path_index, ..Default::default() }
    }

    pub fn write(&self, stream: &mut WireWriter) -> Result<(), WireError> {
        stream.write_u32(self.path_index)?;
        write_optional_vec3(stream, &self.origin)?;
        write_optional_vec3(stream, &self.intersection_pos)?;
        write_optional_vec3(stream, &self.nee_pos)?;
        stream.write_bool(self.nee_visible)?;
        write_optional_vec3(stream, &self.intersection_estimate)?;
        write_optional_vec3(stream, &self.intersection_emission)?;
        write_optional_vec3(stream, &self.final_estimate)?;

        for list in [&self.intersection_data, &self.path_data].iter() {
            stream.write_u32(list.len() as u32)?;
            for (name, value) in list.iter() {
                stream.write_string(name)?;
                value.write(stream)?;
            }
        }
        Ok(())
    }
}

fn write_optional_vec3(stream: &mut WireWriter, value: &Option<Vector3f>) -> Result<(), WireError> {
    match value {
        Some(v) => {
            stream.write_bool(true)?;
            stream.write_f32(v.x)?;
            stream.write_f32(v.y)?;
            stream.write_f32(v.z)?;
        }
        None => {
            stream.write_bool(false)?;
            stream.write_f32(0.0)?;
            stream.write_f32(0.0)?;
            stream.write_f32(0.0)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_four_wide() {
        let value = AuxValue::from_color(Vector3f::new(0.1, 0.2, 0.3));
        assert_eq!(value.width(), 4);
        assert_eq!(value.components(), &[0.1, 0.2, 0.3, 0.0]);
    }

    #[test]
    fn test_aux_value_wire_width() {
        for (value, floats) in [
            (AuxValue::from_vec2(Vector2f::new(1.0, 2.0)), 2usize),
            (AuxValue::from_vec3(Vector3f::new(1.0, 2.0, 3.0)), 3),
            (AuxValue::from_color(Vector3f::new(1.0, 2.0, 3.0)), 4),
        ].iter() {
            let mut buffer = Vec::new();
            {
                let mut writer = WireWriter::new(&mut buffer);
                value.write(&mut writer).unwrap();
            }
            assert_eq!(buffer.len(), 4 + floats * 4);
            assert_eq!(buffer[0], *floats as u8);
        }
    }

    #[test]
    fn test_path_sample_write_is_self_consistent() {
        let mut sample = PathSample::new(7);
        sample.origin = Some(Vector3f::new(0.0, 0.0, 1.0));
        sample.final_estimate = Some(Vector3f::new(0.5, 0.5, 0.5));
        sample.path_data.push(("pdf".to_string(), AuxValue::Vec2([0.5, 0.25])));

        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            sample.write(&mut writer).unwrap();
        }

        // index + 6 optional vectors + visibility + two list headers +
        // one entry (name + tagged payload)
        let expected = 4 + 6 * 13 + 1 + 2 * 4 + (4 + 3) + (4 + 8);
        assert_eq!(buffer.len(), expected);
    }
}
