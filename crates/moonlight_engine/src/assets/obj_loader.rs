//! OBJ file loader for 3D models

use std::path::Path;
use std::sync::Arc;

use crate::assets::AssetError;
use crate::render::mesh::{Mesh, Vertex};

/// Loads Wavefront OBJ files into shared meshes
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file, merging every model it contains into one mesh
    ///
    /// Faces are triangulated and re-indexed so position, normal and uv share
    /// one index. Vertex colors are used when the file carries them.
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<Mesh>, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading OBJ from {}", path.display());

        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        };
        let (models, _materials) = tobj::load_obj(path, &options).map_err(|e| AssetError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut mesh = Mesh::default();
        for model in &models {
            Self::append_model(&mut mesh, &model.mesh)?;
        }
        mesh.validate()?;

        log::info!(
            "Loaded {} ({} vertices, {} indices)",
            path.display(),
            mesh.vertices.len(),
            mesh.indices.len()
        );
        Ok(Arc::new(mesh))
    }

    fn append_model(mesh: &mut Mesh, source: &tobj::Mesh) -> Result<(), AssetError> {
        let base = u32::try_from(mesh.vertices.len())
            .map_err(|_| AssetError::InvalidData("mesh exceeds u32 vertex count".to_string()))?;
        let vertex_count = source.positions.len() / 3;

        for i in 0..vertex_count {
            let position = [
                source.positions[3 * i],
                source.positions[3 * i + 1],
                source.positions[3 * i + 2],
            ];
            let color = source
                .vertex_color
                .get(3 * i..3 * i + 3)
                .map_or([1.0, 1.0, 1.0], |c| [c[0], c[1], c[2]]);
            let normal = source
                .normals
                .get(3 * i..3 * i + 3)
                .map_or([0.0, 0.0, 0.0], |n| [n[0], n[1], n[2]]);
            let uv = source
                .texcoords
                .get(2 * i..2 * i + 2)
                .map_or([0.0, 0.0], |t| [t[0], t[1]]);

            mesh.vertices.push(Vertex {
                position,
                color,
                normal,
                uv,
            });
        }

        mesh.indices.extend(source.indices.iter().map(|&i| base + i));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLORED_TRIANGLE: &str = "\
v 0.0 0.0 0.0 1.0 0.0 0.0
v 1.0 0.0 0.0 0.0 1.0 0.0
v 0.0 1.0 0.0 0.0 0.0 1.0
vn 0.0 0.0 -1.0
f 1//1 2//1 3//1
";

    #[test]
    fn test_load_colored_triangle() {
        let path = std::env::temp_dir().join(format!("moonlight_obj_{}.obj", std::process::id()));
        std::fs::write(&path, COLORED_TRIANGLE).expect("write obj");

        let mesh = ObjLoader::load(&path).expect("load obj");
        let _ = std::fs::remove_file(&path);

        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices.len(), 3);
        assert_eq!(mesh.vertices[0].color, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].normal, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let result = ObjLoader::load("does/not/exist.obj");
        match result {
            Err(AssetError::LoadFailed { path, .. }) => assert!(path.contains("exist.obj")),
            other => panic!("expected LoadFailed, got {other:?}"),
        }
    }
}
