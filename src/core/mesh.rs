// Copyright @yucwang 2026

use crate::math::constants::{ Vector3f, Vector3i };
use crate::wire::stream::{ WireError, WireWriter };

use log::warn;

/// What a surface does in the scene, as far as the client display cares.
/// Used to pick a representative diffuse/specular color pair for meshes
/// whose material cannot be evaluated directly.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceRole {
    Emitter,
    Sensor,
    MediumTransition,
    Bsdf { diffuse: Vector3f, specular: Vector3f },
    Unknown,
}

/// Static mesh geometry exported to the client for the 3D scene view.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vector3f>,
    pub triangles: Vec<Vector3i>,
    pub diffuse_color: Vector3f,
    pub specular_color: Vector3f,
}

impl MeshData {
    pub fn new(vertices: Vec<Vector3f>, triangles: Vec<Vector3i>, role: SurfaceRole) -> Self {
        let (diffuse_color, specular_color) = display_colors(&role);
        Self { vertices, triangles, diffuse_color, specular_color }
    }

    pub fn write(&self, stream: &mut WireWriter) -> Result<(), WireError> {
        stream.write_u32(self.vertices.len() as u32)?;
        for v in self.vertices.iter() {
            stream.write_f32(v.x)?;
            stream.write_f32(v.y)?;
            stream.write_f32(v.z)?;
        }

        stream.write_u32(self.triangles.len() as u32)?;
        for t in self.triangles.iter() {
            stream.write_i32(t.x)?;
            stream.write_i32(t.y)?;
            stream.write_i32(t.z)?;
        }

        for c in [&self.diffuse_color, &self.specular_color].iter() {
            stream.write_f32(c.x)?;
            stream.write_f32(c.y)?;
            stream.write_f32(c.z)?;
        }
        Ok(())
    }
}

fn display_colors(role: &SurfaceRole) -> (Vector3f, Vector3f) {
    match role {
        SurfaceRole::Emitter => (Vector3f::new(1.0, 1.0, 1.0), Vector3f::zeros()),
        SurfaceRole::Sensor => (Vector3f::new(1.0, 1.0, 1.0), Vector3f::zeros()),
        SurfaceRole::MediumTransition => (Vector3f::new(1.0, 1.0, 1.0), Vector3f::new(1.0, 1.0, 1.0)),
        SurfaceRole::Bsdf { diffuse, specular } => (*diffuse, *specular),
        SurfaceRole::Unknown => {
            warn!("mesh has no associated BSDF");
            (Vector3f::zeros(), Vector3f::zeros())
        }
    }
}
