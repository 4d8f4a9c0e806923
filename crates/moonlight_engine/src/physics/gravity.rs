//! Newtonian N-body gravity
//!
//! Every unordered pair of objects attracts each other with
//! `G * m1 * m2 / d^2`. A step is split into `substeps` equal intervals;
//! within each interval all pair impulses are applied to velocities first,
//! then every position advances by `dt * velocity` (semi-implicit Euler).

use serde::{Deserialize, Serialize};

use super::{validate_bodies, PhysicsError, PhysicsResult};
use crate::foundation::math::Vec3;
use crate::foundation::time::Time;
use crate::scene::{GameObject, GameObjectManager};

/// Squared distance below which a pair exerts no force
const MIN_DISTANCE_SQUARED: f32 = 0.1;

/// Gravity tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityConfig {
    /// Gravitational constant in scene units
    pub strength: f32,
    /// Sub-intervals per frame
    pub substeps: u32,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            strength: 6.674e-4,
            substeps: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec3,
    velocity: Vec3,
    mass: f32,
}

/// All-pairs gravity integrator
#[derive(Debug, Clone)]
pub struct GravityPhysicsSystem {
    strength: f32,
    substeps: u32,
}

impl GravityPhysicsSystem {
    /// Create a system with gravitational constant `strength` and 100 substeps
    pub fn new(strength: f32) -> Self {
        Self::with_config(GravityConfig {
            strength,
            ..Default::default()
        })
    }

    /// Create a system from a full configuration
    pub fn with_config(config: GravityConfig) -> Self {
        Self {
            strength: config.strength,
            substeps: config.substeps,
        }
    }

    /// Gravitational constant
    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Configured substeps per frame
    pub fn substeps(&self) -> u32 {
        self.substeps
    }

    /// Advance the scene by the frame's scaled delta time using the
    /// configured substep count
    pub fn update(&self, objects: &mut GameObjectManager, time: &Time) -> PhysicsResult<()> {
        self.step(objects, time.delta_time(), self.substeps)
    }

    /// Advance the scene by `dt` seconds split into `substeps` intervals
    pub fn step(&self, objects: &mut GameObjectManager, dt: f32, substeps: u32) -> PhysicsResult<()> {
        if substeps == 0 {
            return Err(PhysicsError::InvalidSubsteps);
        }

        let ids = objects.ids();
        validate_bodies(objects, &ids)?;

        let mut bodies: Vec<Body> = ids
            .iter()
            .filter_map(|&id| objects.get(id))
            .map(|object| Body {
                position: object.transform.translation,
                velocity: object.rigid_body.velocity,
                mass: object.rigid_body.mass,
            })
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let step_dt = dt / substeps as f32;
        for _ in 0..substeps {
            self.step_bodies(&mut bodies, step_dt);
        }

        for (id, body) in ids.iter().zip(&bodies) {
            if let Some(object) = objects.get_mut(*id) {
                object.transform.translation = body.position;
                object.rigid_body.velocity = body.velocity;
            }
        }
        Ok(())
    }

    fn step_bodies(&self, bodies: &mut [Body], dt: f32) {
        for a in 0..bodies.len() {
            for b in (a + 1)..bodies.len() {
                let force = self.force_between(&bodies[a], &bodies[b]);
                bodies[a].velocity += dt * -force / bodies[a].mass;
                bodies[b].velocity += dt * force / bodies[b].mass;
            }
        }

        for body in bodies.iter_mut() {
            body.position += dt * body.velocity;
        }
    }

    /// Force along `from - to` that `to` feels toward `from`
    ///
    /// Zero when the squared separation is under 0.1.
    pub fn compute_force(&self, from: &GameObject, to: &GameObject) -> Vec3 {
        self.force_between(
            &Body {
                position: from.transform.translation,
                velocity: from.rigid_body.velocity,
                mass: from.rigid_body.mass,
            },
            &Body {
                position: to.transform.translation,
                velocity: to.rigid_body.velocity,
                mass: to.rigid_body.mass,
            },
        )
    }

    fn force_between(&self, from: &Body, to: &Body) -> Vec3 {
        let offset = from.position - to.position;
        let distance_squared = offset.dot(&offset);

        if distance_squared.abs() < MIN_DISTANCE_SQUARED {
            return Vec3::zeros();
        }

        let magnitude = self.strength * from.mass * to.mass / distance_squared;
        magnitude * offset / distance_squared.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::GameObjectId;
    use approx::assert_relative_eq;

    fn spawn(manager: &mut GameObjectManager, position: Vec3, velocity: Vec3, mass: f32) -> GameObjectId {
        let object = manager.create_game_object();
        object.transform.translation = position;
        object.rigid_body.velocity = velocity;
        object.rigid_body.mass = mass;
        object.id()
    }

    fn momentum(manager: &GameObjectManager) -> Vec3 {
        manager
            .iter()
            .map(|o| o.rigid_body.velocity * o.rigid_body.mass)
            .fold(Vec3::zeros(), |acc, p| acc + p)
    }

    fn velocity(manager: &GameObjectManager, id: GameObjectId) -> Vec3 {
        manager.get(id).expect("body exists").rigid_body.velocity
    }

    fn position(manager: &GameObjectManager, id: GameObjectId) -> Vec3 {
        manager.get(id).expect("body exists").transform.translation
    }

    #[test]
    fn test_two_body_attraction() {
        let mut manager = GameObjectManager::new(1);
        let a = spawn(&mut manager, Vec3::zeros(), Vec3::zeros(), 1.0);
        let b = spawn(&mut manager, Vec3::new(10.0, 0.0, 0.0), Vec3::zeros(), 100.0);

        let gravity = GravityPhysicsSystem::new(6.674e-4);
        gravity.update(&mut manager, &Time::from_delta(1.0 / 60.0)).expect("valid scene");

        let va = velocity(&manager, a);
        let vb = velocity(&manager, b);
        // a = G * m_b / r^2 = 6.674e-4
        assert_relative_eq!(va.x, 6.674e-4 / 60.0, max_relative = 1e-3);
        assert!(va.x > 0.0);
        assert!(vb.x < 0.0);
        assert_relative_eq!(va.x / -vb.x, 100.0, max_relative = 1e-3);
        assert_relative_eq!(va.y, 0.0);
        assert_relative_eq!(vb.z, 0.0);
    }

    #[test]
    fn test_momentum_is_conserved() {
        let mut manager = GameObjectManager::new(1);
        spawn(&mut manager, Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.5), 50.0);
        spawn(&mut manager, Vec3::new(4.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -2.0), 3.0);
        spawn(&mut manager, Vec3::new(-2.0, 3.0, 1.0), Vec3::new(1.0, 0.0, 0.0), 7.0);
        spawn(&mut manager, Vec3::new(1.0, -5.0, 2.0), Vec3::zeros(), 0.5);

        let before = momentum(&manager);
        let gravity = GravityPhysicsSystem::new(1.0);
        for _ in 0..30 {
            gravity.step(&mut manager, 1.0 / 60.0, 10).expect("valid scene");
        }
        let after = momentum(&manager);

        assert_relative_eq!(before, after, epsilon = 1e-3);
    }

    #[test]
    fn test_close_pair_exerts_no_force() {
        let mut manager = GameObjectManager::new(1);
        let a = spawn(&mut manager, Vec3::zeros(), Vec3::zeros(), 1.0);
        let b = spawn(&mut manager, Vec3::new(0.2, 0.0, 0.0), Vec3::zeros(), 1.0);

        let gravity = GravityPhysicsSystem::new(1.0);
        gravity.step(&mut manager, 0.1, 1).expect("valid scene");

        assert_relative_eq!(velocity(&manager, a), Vec3::zeros());
        assert_relative_eq!(velocity(&manager, b), Vec3::zeros());
    }

    #[test]
    fn test_coincident_bodies_stay_finite() {
        let mut manager = GameObjectManager::new(1);
        let a = spawn(&mut manager, Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), 5.0);
        let b = spawn(&mut manager, Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), 5.0);

        let gravity = GravityPhysicsSystem::new(1.0);
        gravity.step(&mut manager, 1.0, 4).expect("valid scene");

        for id in [a, b] {
            assert!(velocity(&manager, id).iter().all(|c| c.is_finite()));
            assert!(position(&manager, id).iter().all(|c| c.is_finite()));
        }
    }

    #[test]
    fn test_compute_force_direction() {
        let mut manager = GameObjectManager::new(1);
        let a = spawn(&mut manager, Vec3::zeros(), Vec3::zeros(), 2.0);
        let b = spawn(&mut manager, Vec3::new(0.0, 2.0, 0.0), Vec3::zeros(), 3.0);

        let gravity = GravityPhysicsSystem::new(0.5);
        let from = manager.get(a).expect("a");
        let to = manager.get(b).expect("b");
        let force = gravity.compute_force(from, to);

        // 0.5 * 2 * 3 / 4 along -y
        assert_relative_eq!(force, Vec3::new(0.0, -0.75, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_more_substeps_converge() {
        let run = |substeps: u32| {
            let mut manager = GameObjectManager::new(1);
            let a = spawn(&mut manager, Vec3::zeros(), Vec3::zeros(), 1.0);
            spawn(&mut manager, Vec3::new(10.0, 0.0, 0.0), Vec3::zeros(), 100.0);
            let gravity = GravityPhysicsSystem::new(6.674e-4);
            gravity.step(&mut manager, 1.0 / 60.0, substeps).expect("valid scene");
            position(&manager, a).x
        };

        let reference = run(4000);
        let errors: Vec<f32> = [1, 2, 4, 10, 25, 50, 100]
            .into_iter()
            .map(|substeps| (run(substeps) - reference).abs())
            .collect();

        for pair in errors.windows(2) {
            assert!(pair[1] < pair[0], "error did not shrink with more substeps: {errors:?}");
        }
        // First-order: 100x the substeps, roughly 1/100 the error
        assert!(errors[6] < errors[0] / 50.0, "{errors:?}");
    }

    #[test]
    fn test_invalid_mass_leaves_scene_untouched() {
        let mut manager = GameObjectManager::new(1);
        let a = spawn(&mut manager, Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 1.0);
        let bad = spawn(&mut manager, Vec3::new(5.0, 0.0, 0.0), Vec3::zeros(), 0.0);

        let gravity = GravityPhysicsSystem::new(1.0);
        let result = gravity.step(&mut manager, 1.0, 1);

        assert_eq!(result, Err(PhysicsError::InvalidMass { id: bad, mass: 0.0 }));
        assert_relative_eq!(position(&manager, a), Vec3::zeros());
        assert_relative_eq!(velocity(&manager, a), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_zero_substeps_rejected() {
        let mut manager = GameObjectManager::new(1);
        let gravity = GravityPhysicsSystem::new(1.0);
        assert_eq!(gravity.step(&mut manager, 1.0, 0), Err(PhysicsError::InvalidSubsteps));
    }
}
