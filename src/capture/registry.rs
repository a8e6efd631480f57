// Copyright @yucwang 2026

use crate::core::interface::{ ShapeDescriptor, ShapeId };

use std::collections::HashMap;

/// Maps opaque shape identities to dense mesh ids, in scene-list order.
/// Built once per scene load; immutable afterwards. Lookups against a
/// registry from a previous scene are a programming error upstream, not a
/// condition recovered from here.
pub struct ShapeRegistry {
    mesh_ids: HashMap<ShapeId, u32>,
    primitive_counts: Vec<u32>,
}

impl ShapeRegistry {
    pub fn build(shapes: &[ShapeDescriptor]) -> Self {
        let mut mesh_ids = HashMap::with_capacity(shapes.len());
        let mut primitive_counts = Vec::with_capacity(shapes.len());
        for (index, shape) in shapes.iter().enumerate() {
            mesh_ids.insert(shape.id, index as u32);
            primitive_counts.push(shape.primitive_count);
        }

        Self { mesh_ids, primitive_counts }
    }

    pub fn mesh_id(&self, shape: ShapeId) -> Option<u32> {
        self.mesh_ids.get(&shape).copied()
    }

    /// Triangle count of the mesh as snapshotted at scene load.
    pub fn primitive_count(&self, mesh_id: u32) -> Option<u32> {
        self.primitive_counts.get(mesh_id as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.primitive_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitive_counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: u64, primitive_count: u32) -> ShapeDescriptor {
        ShapeDescriptor { id: ShapeId(id), surface_area: 1.0, primitive_count }
    }

    #[test]
    fn test_dense_ids_in_list_order() {
        let shapes = vec![descriptor(0xA000, 12), descriptor(0xB000, 2), descriptor(0xC000, 96)];
        let registry = ShapeRegistry::build(&shapes);

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.mesh_id(ShapeId(0xA000)), Some(0));
        assert_eq!(registry.mesh_id(ShapeId(0xB000)), Some(1));
        assert_eq!(registry.mesh_id(ShapeId(0xC000)), Some(2));
        assert_eq!(registry.primitive_count(1), Some(2));
    }

    #[test]
    fn test_unknown_shape_lookup() {
        let registry = ShapeRegistry::build(&[descriptor(1, 4)]);
        assert_eq!(registry.mesh_id(ShapeId(2)), None);
        assert_eq!(registry.primitive_count(9), None);
    }
}
