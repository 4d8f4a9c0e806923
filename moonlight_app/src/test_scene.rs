//! Static models lit by a ring of colored point lights

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use moonlight_engine::assets::ObjLoader;
use moonlight_engine::foundation::math::Vec3;
use moonlight_engine::foundation::time::Time;
use moonlight_engine::render::vulkan::VulkanBackend;
use moonlight_engine::render::{FrameInfo, Mesh};
use moonlight_engine::scene::GameObjectManager;
use moonlight_engine::{AppError, Application, StartContext, UpdateContext};

use crate::systems::SceneRenderSystems;

const LIGHT_INTENSITY: f32 = 0.2;
const LIGHT_RADIUS: f32 = 0.1;

const LIGHT_COLORS: [[f32; 3]; 6] = [
    [1.0, 0.1, 0.1],
    [0.1, 0.1, 1.0],
    [0.1, 1.0, 0.1],
    [1.0, 1.0, 0.1],
    [0.1, 1.0, 1.0],
    [1.0, 1.0, 1.0],
];

struct Placement {
    model: &'static str,
    translation: [f32; 3],
    scale: [f32; 3],
}

const PLACEMENTS: [Placement; 4] = [
    Placement {
        model: "colored_cube.obj",
        translation: [-0.5, -0.5, 0.0],
        scale: [0.2, 0.2, 0.2],
    },
    Placement {
        model: "smooth_vase.obj",
        translation: [0.5, 0.0, 0.0],
        scale: [3.0, 2.5, 3.0],
    },
    Placement {
        model: "quad.obj",
        translation: [0.0, 0.0, 0.0],
        scale: [3.0, 1.0, 3.0],
    },
    Placement {
        model: "viking_room.obj",
        translation: [-5.0, 0.0, 0.0],
        scale: [1.0, 1.0, 1.0],
    },
];

/// Position of light `index` of `count`, rotated about the vertical axis
pub fn light_position(index: usize, count: usize) -> Vec3 {
    let angle = index as f32 * TAU / count as f32;
    let (sin, cos) = angle.sin_cos();
    let start = Vec3::new(-1.0, -1.0, -1.0);
    Vec3::new(start.x * cos - start.z * sin, start.y, start.x * sin + start.z * cos)
}

/// Spawn the light ring
pub fn populate_lights(objects: &mut GameObjectManager) {
    for (i, [r, g, b]) in LIGHT_COLORS.into_iter().enumerate() {
        let light = objects.make_point_light(LIGHT_INTENSITY, LIGHT_RADIUS, Vec3::new(r, g, b));
        light.name = format!("Light {i}");
        light.transform.translation = light_position(i, LIGHT_COLORS.len());
    }
}

/// Spawn one object per model that `load` yields; returns how many were placed
///
/// Models that fail to load are skipped with a warning.
pub fn populate_models<F>(objects: &mut GameObjectManager, models_dir: &Path, mut load: F) -> usize
where
    F: FnMut(&Path) -> Result<Arc<Mesh>, AppError>,
{
    let mut placed = 0;
    for placement in &PLACEMENTS {
        let path: PathBuf = models_dir.join(placement.model);
        let mesh = match load(&path) {
            Ok(mesh) => mesh,
            Err(e) => {
                log::warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };

        let object = objects.create_game_object();
        object.name = placement.model.trim_end_matches(".obj").to_string();
        object.mesh = Some(mesh);
        let [x, y, z] = placement.translation;
        object.transform.translation = Vec3::new(x, y, z);
        let [sx, sy, sz] = placement.scale;
        object.transform.scale = Vec3::new(sx, sy, sz);
        placed += 1;
    }
    placed
}

/// Test scene
pub struct TestScene {
    models_dir: PathBuf,
    systems: Option<SceneRenderSystems>,
}

impl TestScene {
    /// Create the scene, loading models from `models_dir`
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            systems: None,
        }
    }
}

impl Application<VulkanBackend> for TestScene {
    fn start(&mut self, ctx: &mut StartContext<'_, VulkanBackend>) -> Result<(), AppError> {
        self.systems = Some(SceneRenderSystems::new(ctx)?);

        let placed = populate_models(ctx.objects, &self.models_dir, |path| Ok(ObjLoader::load(path)?));
        populate_lights(ctx.objects);
        log::info!(
            "Test scene started with {placed}/{} models and {} lights",
            PLACEMENTS.len(),
            LIGHT_COLORS.len()
        );
        Ok(())
    }

    fn update(&mut self, _ctx: &mut UpdateContext<'_>, _time: &Time) -> Result<(), AppError> {
        Ok(())
    }

    fn render_systems(&mut self, frame: &mut FrameInfo<'_, VulkanBackend>) -> Result<(), AppError> {
        match self.systems.as_mut() {
            Some(systems) => systems.render(frame),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use moonlight_engine::render::Vertex;

    fn triangle() -> Arc<Mesh> {
        let vertex = |x: f32| Vertex::new([x, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]);
        Arc::new(Mesh::new(vec![vertex(0.0), vertex(1.0), vertex(2.0)], vec![0, 1, 2]))
    }

    #[test]
    fn test_light_ring_positions() {
        assert_relative_eq!(light_position(0, 6), Vec3::new(-1.0, -1.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(light_position(3, 6), Vec3::new(1.0, -1.0, 1.0), epsilon = 1e-5);

        for i in 0..6 {
            let p = light_position(i, 6);
            assert_relative_eq!(p.y, -1.0);
            assert_relative_eq!(p.x * p.x + p.z * p.z, 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_populate_lights() {
        let mut objects = GameObjectManager::new(2);
        populate_lights(&mut objects);

        assert_eq!(objects.len(), 6);
        for object in objects.iter() {
            let light = object.point_light.expect("light");
            assert_relative_eq!(light.light_intensity, LIGHT_INTENSITY);
            assert_relative_eq!(object.transform.scale.x, LIGHT_RADIUS);
        }
    }

    #[test]
    fn test_missing_models_are_skipped() {
        let mut objects = GameObjectManager::new(2);
        let mesh = triangle();
        let placed = populate_models(&mut objects, Path::new("models"), |path| {
            if path.ends_with("viking_room.obj") {
                Err(AppError::Custom("missing".to_string()))
            } else {
                Ok(Arc::clone(&mesh))
            }
        });

        assert_eq!(placed, 3);
        assert_eq!(objects.len(), 3);
        let vase = objects.iter().find(|o| o.name == "smooth_vase").expect("vase");
        assert_relative_eq!(vase.transform.scale, Vec3::new(3.0, 2.5, 3.0));
        assert!(objects.iter().all(|o| o.mesh.is_some()));
    }
}
