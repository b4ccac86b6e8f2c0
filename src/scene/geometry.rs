//! Mesh geometry buffers and material groups.

use glam::{Vec2, Vec3};

use crate::error::SceneError;

/// A contiguous triangle index range of a mesh tagged with one material slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialGroup {
    /// First drawable index of the range
    pub start: usize,
    /// Number of drawable indices (a multiple of 3 for triangles)
    pub count: usize,
    /// Material slot this range is rendered with
    pub material_index: usize,
}

/// Geometry buffers for one mesh
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Optional triangle index buffer; absent means non-indexed drawing
    pub indices: Option<Vec<u32>>,
    /// Optional per-vertex UV attribute
    pub uvs: Option<Vec<Vec2>>,
    /// Per-material triangle ranges; empty means one implicit full range
    pub groups: Vec<MaterialGroup>,
}

impl Geometry {
    /// Number of drawable indices: index buffer length when indexed,
    /// vertex count otherwise.
    pub fn draw_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len(),
            None => self.positions.len(),
        }
    }

    /// Resolve drawable index `i` to a vertex index.
    pub fn vertex_index(&self, i: usize) -> usize {
        match &self.indices {
            Some(indices) => indices[i] as usize,
            None => i,
        }
    }

    /// Check that every group range lies within the drawable bounds and,
    /// when indexed, that every index resolves to a real vertex.
    pub fn validate(&self, mesh_name: &str) -> Result<(), SceneError> {
        let len = self.draw_count();
        for (gi, group) in self.groups.iter().enumerate() {
            let end = group.start + group.count;
            if end > len {
                return Err(SceneError::GroupOutOfBounds {
                    mesh: mesh_name.to_string(),
                    group: gi,
                    start: group.start,
                    end,
                    len,
                });
            }
        }

        if let Some(indices) = &self.indices {
            if let Some(&max) = indices.iter().max() {
                if max as usize >= self.positions.len() {
                    return Err(SceneError::ModelLoad(format!(
                        "mesh '{}' index {} out of range for {} vertices",
                        mesh_name,
                        max,
                        self.positions.len()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Axis-aligned bounding box of all vertices, or `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for &p in &self.positions[1..] {
            min = min.min(p);
            max = max.max(p);
        }
        Some((min, max))
    }
}
