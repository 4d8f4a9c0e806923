//! Backend-agnostic mesh data
//!
//! `Vertex` is a plain `#[repr(C)]` POD so it can be copied straight into a
//! GPU buffer; the Vulkan attribute layout lives in
//! `render::vulkan::vertex_layout`.

use bytemuck::{Pod, Zeroable};

use crate::assets::AssetError;

/// Interleaved vertex: position, color, normal, uv
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Vertex color (white when the source has none)
    pub color: [f32; 3],
    /// Object-space normal
    pub normal: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a white vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            color: [1.0, 1.0, 1.0],
            normal,
            uv,
        }
    }
}

/// Indexed triangle list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`; empty means non-indexed
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh from raw data
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Reject meshes whose indices point past the vertex list
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.vertices.is_empty() {
            return Err(AssetError::InvalidData("mesh has no vertices".to_string()));
        }
        if self.indices.len() % 3 != 0 {
            return Err(AssetError::InvalidData(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= self.vertices.len()) {
            return Err(AssetError::InvalidData(format!(
                "index {bad} out of range for {} vertices",
                self.vertices.len()
            )));
        }
        Ok(())
    }

    /// Whether the mesh is drawn with an index buffer
    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        Mesh::new(
            vec![
                Vertex::new([0.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0]),
                Vertex::new([1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [1.0, 0.0]),
                Vertex::new([0.0, 0.0, 1.0], [0.0, -1.0, 0.0], [0.0, 1.0]),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 11 * 4);
    }

    #[test]
    fn test_validate_accepts_triangle() {
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let mut mesh = triangle();
        mesh.indices[2] = 3;
        assert!(matches!(mesh.validate(), Err(AssetError::InvalidData(_))));
    }
}
