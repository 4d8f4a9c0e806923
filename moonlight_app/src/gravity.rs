//! Solar system under N-body gravity

use moonlight_engine::foundation::math::{Vec3, Vec4};
use moonlight_engine::foundation::time::Time;
use moonlight_engine::physics::{GravityConfig, GravityPhysicsSystem};
use moonlight_engine::render::vulkan::VulkanBackend;
use moonlight_engine::render::FrameInfo;
use moonlight_engine::scene::{GameObjectId, GameObjectManager};
use moonlight_engine::{AppError, Application, StartContext, UpdateContext};

use crate::systems::SceneRenderSystems;

/// Every body glows with the same intensity
const BODY_LIGHT_INTENSITY: f32 = 10.0;

struct Body {
    name: &'static str,
    distance: f32,
    orbital_speed: f32,
    mass: f32,
    scale: f32,
    color: [f32; 3],
}

const SUN: Body = Body {
    name: "Sun",
    distance: 0.0,
    orbital_speed: 0.0,
    mass: 333_000.0,
    scale: 0.2,
    color: [1.0, 1.0, 0.0],
};

const PLANETS: [Body; 4] = [
    Body {
        name: "Mercury",
        distance: 4.0,
        orbital_speed: 7.0,
        mass: 0.055,
        scale: 0.05,
        color: [0.7, 0.7, 0.7],
    },
    Body {
        name: "Venus",
        distance: 6.0,
        orbital_speed: 5.0,
        mass: 0.815,
        scale: 0.08,
        color: [0.8, 0.5, 0.1],
    },
    Body {
        name: "Earth",
        distance: 9.0,
        orbital_speed: 3.0,
        mass: 1.0,
        scale: 0.1,
        color: [0.0, 0.6, 1.0],
    },
    Body {
        name: "Mars",
        distance: 12.0,
        orbital_speed: 2.5,
        mass: 0.107,
        scale: 0.08,
        color: [1.0, 0.3, 0.0],
    },
];

/// Spawn the sun at the origin and the planets along +x, moving along +z
///
/// Returns the ids in spawn order, sun first.
pub fn populate(objects: &mut GameObjectManager) -> Vec<GameObjectId> {
    std::iter::once(&SUN)
        .chain(PLANETS.iter())
        .map(|body| {
            let [r, g, b] = body.color;
            let object = objects.make_point_light(BODY_LIGHT_INTENSITY, body.scale, Vec3::new(r, g, b));
            object.name = body.name.to_string();
            object.transform.scale = Vec3::new(body.scale, body.scale, body.scale);
            object.transform.translation = Vec3::new(body.distance, 0.0, 0.0);
            object.rigid_body.velocity = Vec3::new(0.0, 0.0, body.orbital_speed);
            object.rigid_body.mass = body.mass;
            object.id()
        })
        .collect()
}

/// Sun and four planets; every body is a point light
pub struct GravityScenario {
    physics: GravityPhysicsSystem,
    systems: Option<SceneRenderSystems>,
}

impl GravityScenario {
    /// Create the scenario with the given gravity tunables
    pub fn new(config: GravityConfig) -> Self {
        Self {
            physics: GravityPhysicsSystem::with_config(config),
            systems: None,
        }
    }

    fn step(&self, ctx: &mut UpdateContext<'_>, time: &Time) -> Result<(), AppError> {
        self.physics.update(ctx.objects, time)?;
        Ok(())
    }
}

impl Application<VulkanBackend> for GravityScenario {
    fn start(&mut self, ctx: &mut StartContext<'_, VulkanBackend>) -> Result<(), AppError> {
        self.systems = Some(SceneRenderSystems::new(ctx)?);
        ctx.ubo.set_ambient(Vec4::new(1.0, 1.0, 1.0, 0.02));

        let bodies = populate(ctx.objects);
        log::info!(
            "Gravity scenario started with {} bodies (G = {:e}, {} substeps)",
            bodies.len(),
            self.physics.strength(),
            self.physics.substeps()
        );
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>, time: &Time) -> Result<(), AppError> {
        self.step(ctx, time)
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
    use moonlight_engine::input::InputManager;
    use moonlight_engine::render::Camera;

    #[test]
    fn test_populate_spawns_lit_bodies() {
        let mut objects = GameObjectManager::new(2);
        let ids = populate(&mut objects);

        assert_eq!(ids.len(), 5);
        assert!(objects.iter().all(|object| object.is_point_light()));

        let sun = objects.get(ids[0]).expect("sun");
        assert_eq!(sun.name, "Sun");
        assert_relative_eq!(sun.rigid_body.mass, 333_000.0);
        assert_relative_eq!(sun.transform.scale, Vec3::new(0.2, 0.2, 0.2));

        let earth = objects.get(ids[3]).expect("earth");
        assert_relative_eq!(earth.transform.translation, Vec3::new(9.0, 0.0, 0.0));
        assert_relative_eq!(earth.rigid_body.velocity, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn test_update_moves_planets() {
        let mut objects = GameObjectManager::new(2);
        let ids = populate(&mut objects);
        let mut camera = Camera::new();
        let input = InputManager::new();
        let mut scenario = GravityScenario::new(GravityConfig {
            strength: 6.674e-18,
            substeps: 10,
        });

        let mut ctx = UpdateContext {
            objects: &mut objects,
            camera: &mut camera,
            input: &input,
        };
        scenario.update(&mut ctx, &Time::from_delta(0.5)).expect("update");

        let mercury = objects.get(ids[1]).expect("mercury");
        assert_relative_eq!(mercury.transform.translation.z, 3.5, epsilon = 1e-3);
        assert_relative_eq!(mercury.transform.translation.x, 4.0, epsilon = 1e-3);
    }

    #[test]
    fn test_invalid_mass_is_reported() {
        let mut objects = GameObjectManager::new(2);
        let ids = populate(&mut objects);
        objects.get_mut(ids[2]).expect("venus").rigid_body.mass = 0.0;
        let mut camera = Camera::new();
        let input = InputManager::new();
        let mut scenario = GravityScenario::new(GravityConfig::default());

        let mut ctx = UpdateContext {
            objects: &mut objects,
            camera: &mut camera,
            input: &input,
        };
        let result = scenario.update(&mut ctx, &Time::from_delta(0.016));
        assert!(matches!(result, Err(AppError::Physics(_))));
    }
}
