//! Particle life
//!
//! Particles are grouped into types. Each type carries one attraction
//! coefficient per type (itself included); every frame each type is pushed
//! or pulled by every other type within a radius of attraction, with
//! viscous damping and an optional bounding box.
//!
//! Types reference their particles by [`GameObjectId`]. Changing the type
//! list or a type's particle count requires a [`ParticleLifeSystem::rebuild`],
//! which clears the whole entity store and recreates every particle.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{validate_bodies, PhysicsError, PhysicsResult};
use crate::foundation::math::Vec3;
use crate::foundation::time::Time;
use crate::render::mesh::Mesh;
use crate::scene::{GameObjectId, GameObjectManager};

/// Uniform scale given to every particle
const PARTICLE_SCALE: f32 = 0.01;

/// Largest random particle mass (exclusive)
const MAX_PARTICLE_MASS: f32 = 100.0;

/// Particle life tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleLifeConfig {
    /// Clamp particles into the bounding box after each pair pass
    pub is_bounded: bool,
    /// Fraction of velocity lost per step
    pub viscosity: f32,
    /// Interaction cut-off distance
    pub radius: f32,
    /// Minimum corner of the spawn and clamp box
    pub lower_bound: Vec3,
    /// Maximum corner of the spawn and clamp box
    pub upper_bound: Vec3,
    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for ParticleLifeConfig {
    fn default() -> Self {
        Self {
            is_bounded: true,
            viscosity: 0.1,
            radius: 0.5,
            lower_bound: Vec3::new(-1.0, -1.0, -1.0),
            upper_bound: Vec3::new(1.0, 1.0, 1.0),
            seed: None,
        }
    }
}

/// A group of particles sharing a color and attraction row
#[derive(Debug, Clone)]
pub struct ParticleType {
    id: usize,
    /// Display name
    pub name: String,
    /// Color applied to every particle of the type
    pub color: Vec3,
    /// Target particle count, applied on rebuild
    pub count: usize,
    particles: Vec<GameObjectId>,
    attraction: Vec<f32>,
}

impl ParticleType {
    /// Index of the type within its system
    pub fn id(&self) -> usize {
        self.id
    }

    /// Particles created for the type
    pub fn particles(&self) -> &[GameObjectId] {
        &self.particles
    }

    /// Attraction toward each type, indexed by type id
    pub fn attraction(&self) -> &[f32] {
        &self.attraction
    }
}

/// Particle life simulation
#[derive(Debug)]
pub struct ParticleLifeSystem {
    config: ParticleLifeConfig,
    types: Vec<ParticleType>,
    mesh: Option<Arc<Mesh>>,
    rng: StdRng,
}

impl ParticleLifeSystem {
    /// Create an empty system; particles share `mesh` when given
    pub fn new(config: ParticleLifeConfig, mesh: Option<Arc<Mesh>>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            types: Vec::new(),
            mesh,
            rng,
        }
    }

    /// Register a type; its particles appear on the next create or rebuild
    pub fn add_type(&mut self, name: impl Into<String>, color: Vec3, count: usize) -> usize {
        let id = self.types.len();
        self.types.push(ParticleType {
            id,
            name: name.into(),
            color,
            count,
            particles: Vec::new(),
            attraction: Vec::new(),
        });
        id
    }

    /// Registered types
    pub fn types(&self) -> &[ParticleType] {
        &self.types
    }

    /// Mutable access to a type's name, color and target count
    pub fn type_mut(&mut self, type_id: usize) -> Option<&mut ParticleType> {
        self.types.get_mut(type_id)
    }

    /// Current tunables
    pub fn settings(&self) -> &ParticleLifeConfig {
        &self.config
    }

    /// Live tunables (bounded, viscosity, radius)
    pub fn settings_mut(&mut self) -> &mut ParticleLifeConfig {
        &mut self.config
    }

    /// Set how strongly `from` reacts to `to`, clamped to [-1, 1]
    pub fn set_attraction(&mut self, from: usize, to: usize, value: f32) -> PhysicsResult<()> {
        let slot = self
            .types
            .get_mut(from)
            .and_then(|t| t.attraction.get_mut(to))
            .ok_or_else(|| PhysicsError::InvalidState {
                reason: format!("no attraction entry from type {from} to type {to}"),
            })?;
        *slot = value.clamp(-1.0, 1.0);
        Ok(())
    }

    /// Roll attractions and spawn every type's particles
    ///
    /// Types must be empty; use [`ParticleLifeSystem::rebuild`] to start over.
    pub fn create_particles(&mut self, objects: &mut GameObjectManager) -> PhysicsResult<()> {
        if let Some(populated) = self.types.iter().find(|t| !t.particles.is_empty() || !t.attraction.is_empty()) {
            return Err(PhysicsError::InvalidState {
                reason: format!("particle type '{}' is already populated", populated.name),
            });
        }

        let type_count = self.types.len();
        let (lower, upper) = (self.config.lower_bound, self.config.upper_bound);

        for particle_type in &mut self.types {
            particle_type.attraction = (0..type_count).map(|_| self.rng.gen_range(-1.0..1.0)).collect();

            for _ in 0..particle_type.count {
                let position = Vec3::new(
                    sample(&mut self.rng, lower.x, upper.x),
                    sample(&mut self.rng, lower.y, upper.y),
                    sample(&mut self.rng, lower.z, upper.z),
                );
                let mut mass = 0.0;
                while mass <= 0.0 {
                    mass = self.rng.gen_range(0.0..MAX_PARTICLE_MASS);
                }

                let object = objects.create_game_object();
                object.name = format!("{} particle", particle_type.name);
                object.color = particle_type.color;
                object.mesh = self.mesh.clone();
                object.transform.scale = Vec3::new(PARTICLE_SCALE, PARTICLE_SCALE, PARTICLE_SCALE);
                object.transform.translation = position;
                object.rigid_body.mass = mass;
                particle_type.particles.push(object.id());
            }
        }

        log::info!(
            "Created {} particles across {} types",
            self.types.iter().map(|t| t.particles.len()).sum::<usize>(),
            type_count
        );
        Ok(())
    }

    /// Clear the whole entity store and every type, then recreate
    pub fn rebuild(&mut self, objects: &mut GameObjectManager) -> PhysicsResult<()> {
        objects.clear();
        for particle_type in &mut self.types {
            particle_type.particles.clear();
            particle_type.attraction.clear();
        }
        self.create_particles(objects)
    }

    /// Apply edits made to one type through [`ParticleLifeSystem::type_mut`]
    ///
    /// Rebuilds everything when the type's particle count changed, then
    /// repaints the type's particles with its color.
    pub fn apply_type_edits(&mut self, objects: &mut GameObjectManager, type_id: usize) -> PhysicsResult<()> {
        let particle_type = self.types.get(type_id).ok_or_else(|| PhysicsError::InvalidState {
            reason: format!("no particle type {type_id}"),
        })?;

        if particle_type.particles.len() != particle_type.count {
            log::info!(
                "Particle type '{}' count changed {} -> {}, rebuilding",
                particle_type.name,
                particle_type.particles.len(),
                particle_type.count
            );
            self.rebuild(objects)?;
        }

        let particle_type = &self.types[type_id];
        for &id in &particle_type.particles {
            if let Some(object) = objects.get_mut(id) {
                object.color = particle_type.color;
            }
        }
        Ok(())
    }

    /// Advance every particle by the frame's scaled delta time
    pub fn update(&mut self, objects: &mut GameObjectManager, time: &Time) -> PhysicsResult<()> {
        self.step(objects, time.delta_time())
    }

    /// Advance every particle by `dt` seconds
    pub fn step(&mut self, objects: &mut GameObjectManager, dt: f32) -> PhysicsResult<()> {
        self.validate(objects)?;

        for type1 in 0..self.types.len() {
            for type2 in 0..self.types.len() {
                self.type_pair_step(objects, type1, type2, dt);
            }
        }
        Ok(())
    }

    fn validate(&self, objects: &GameObjectManager) -> PhysicsResult<()> {
        let type_count = self.types.len();
        for particle_type in &self.types {
            if particle_type.attraction.len() != type_count {
                return Err(PhysicsError::InvalidState {
                    reason: format!(
                        "particle type '{}' has {} attraction entries for {} types; rebuild required",
                        particle_type.name,
                        particle_type.attraction.len(),
                        type_count
                    ),
                });
            }
            validate_bodies(objects, &particle_type.particles)?;
        }
        Ok(())
    }

    fn type_pair_step(&self, objects: &mut GameObjectManager, type1: usize, type2: usize, dt: f32) {
        let first = &self.types[type1];
        let second = &self.types[type2];
        let g = first.attraction[type2] / -100.0;
        let radius_squared = self.config.radius * self.config.radius;

        for &p1 in &first.particles {
            let Some(particle) = objects.get(p1) else { continue };
            let (position, mass) = (particle.transform.translation, particle.rigid_body.mass);

            let mut total_force = Vec3::zeros();
            for &p2 in &second.particles {
                let Some(other) = objects.get(p2) else { continue };
                let other_position = other.transform.translation;
                if position == other_position {
                    continue;
                }

                let direction = position - other_position;
                let distance_squared = direction.dot(&direction);
                let force = if distance_squared < radius_squared {
                    1.0 / distance_squared.sqrt() * mass * other.rigid_body.mass
                } else {
                    0.0
                };
                total_force += direction * force;
            }

            if let Some(particle) = objects.get_mut(p1) {
                let body = &mut particle.rigid_body;
                body.velocity = dt * (body.velocity + total_force * g) * (1.0 - self.config.viscosity);
                particle.transform.translation += dt * body.velocity;
            }
        }

        if self.config.is_bounded {
            let (lower, upper) = (self.config.lower_bound, self.config.upper_bound);
            for &p1 in &first.particles {
                if let Some(particle) = objects.get_mut(p1) {
                    let t = &mut particle.transform.translation;
                    *t = t.sup(&lower).inf(&upper);
                }
            }
        }
    }
}

fn sample(rng: &mut StdRng, lower: f32, upper: f32) -> f32 {
    if lower < upper {
        rng.gen_range(lower..upper)
    } else {
        lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seeded(seed: u64) -> ParticleLifeSystem {
        let config = ParticleLifeConfig {
            seed: Some(seed),
            ..Default::default()
        };
        let mut system = ParticleLifeSystem::new(config, None);
        system.add_type("red", Vec3::new(1.0, 0.0, 0.0), 5);
        system.add_type("green", Vec3::new(0.0, 1.0, 0.0), 3);
        system.add_type("blue", Vec3::new(0.0, 0.0, 1.0), 4);
        system
    }

    #[test]
    fn test_create_particles_populates_types() {
        let mut objects = GameObjectManager::new(2);
        let mut system = seeded(7);
        system.create_particles(&mut objects).expect("fresh system");

        assert_eq!(objects.len(), 12);
        for particle_type in system.types() {
            assert_eq!(particle_type.particles().len(), particle_type.count);
            assert_eq!(particle_type.attraction().len(), 3);
            assert!(particle_type.attraction().iter().all(|a| (-1.0..1.0).contains(a)));
            for &id in particle_type.particles() {
                let object = objects.get(id).expect("particle exists");
                assert_relative_eq!(object.color, particle_type.color);
                assert_relative_eq!(object.transform.scale, Vec3::new(0.01, 0.01, 0.01));
                assert!(object.rigid_body.mass > 0.0 && object.rigid_body.mass < 100.0);
                assert!(object.transform.translation.iter().all(|c| (-1.0..=1.0).contains(c)));
            }
        }
    }

    #[test]
    fn test_create_twice_is_rejected() {
        let mut objects = GameObjectManager::new(1);
        let mut system = seeded(1);
        system.create_particles(&mut objects).expect("first create");
        assert!(matches!(
            system.create_particles(&mut objects),
            Err(PhysicsError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut objects = GameObjectManager::new(1);
        let mut system = seeded(3);
        system.create_particles(&mut objects).expect("create");

        system.type_mut(1).expect("green").count = 9;
        system.rebuild(&mut objects).expect("rebuild");
        system.rebuild(&mut objects).expect("rebuild again");

        assert_eq!(objects.len(), 5 + 9 + 4);
        for particle_type in system.types() {
            assert_eq!(particle_type.particles().len(), particle_type.count);
            assert_eq!(particle_type.attraction().len(), system.types().len());
            assert!(particle_type.particles().iter().all(|&id| objects.get(id).is_some()));
        }
    }

    #[test]
    fn test_apply_type_edits_recolors_without_rebuild() {
        let mut objects = GameObjectManager::new(1);
        let mut system = seeded(5);
        system.create_particles(&mut objects).expect("create");
        let before = system.types()[0].particles().to_vec();

        system.type_mut(0).expect("red").color = Vec3::new(0.5, 0.5, 0.5);
        system.apply_type_edits(&mut objects, 0).expect("apply");

        assert_eq!(system.types()[0].particles(), before.as_slice());
        for &id in &before {
            assert_relative_eq!(objects.get(id).expect("particle").color, Vec3::new(0.5, 0.5, 0.5));
        }
    }

    #[test]
    fn test_apply_type_edits_rebuilds_on_count_change() {
        let mut objects = GameObjectManager::new(1);
        let mut system = seeded(5);
        system.create_particles(&mut objects).expect("create");

        system.type_mut(2).expect("blue").count = 1;
        system.apply_type_edits(&mut objects, 2).expect("apply");

        assert_eq!(objects.len(), 5 + 3 + 1);
        assert_eq!(system.types()[2].particles().len(), 1);
    }

    #[test]
    fn test_type_added_after_creation_is_detected() {
        let mut objects = GameObjectManager::new(1);
        let mut system = seeded(9);
        system.create_particles(&mut objects).expect("create");
        system.add_type("white", Vec3::new(1.0, 1.0, 1.0), 2);

        let positions: Vec<_> = objects.iter().map(|o| o.transform.translation).collect();
        let result = system.step(&mut objects, 0.1);
        assert!(matches!(result, Err(PhysicsError::InvalidState { .. })));

        let after: Vec<_> = objects.iter().map(|o| o.transform.translation).collect();
        assert_eq!(positions, after);
    }

    #[test]
    fn test_step_keeps_particles_in_bounds() {
        let mut objects = GameObjectManager::new(1);
        let mut system = seeded(11);
        system.create_particles(&mut objects).expect("create");
        for from in 0..3 {
            for to in 0..3 {
                system.set_attraction(from, to, -1.0).expect("valid pair");
            }
        }

        for _ in 0..50 {
            system.step(&mut objects, 1.0 / 60.0).expect("valid state");
        }

        for object in objects.iter() {
            assert!(object.transform.translation.iter().all(|c| c.is_finite() && (-1.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn test_pair_velocity_matches_force_law() {
        let config = ParticleLifeConfig {
            seed: Some(2),
            is_bounded: false,
            viscosity: 0.0,
            ..Default::default()
        };
        let mut system = ParticleLifeSystem::new(config, None);
        system.add_type("solo", Vec3::new(1.0, 1.0, 1.0), 2);
        let mut objects = GameObjectManager::new(1);
        system.create_particles(&mut objects).expect("create");

        // Place the pair 0.2 apart on x with unit masses and full attraction.
        let ids = system.types()[0].particles().to_vec();
        for (i, &id) in ids.iter().enumerate() {
            let object = objects.get_mut(id).expect("particle");
            object.transform.translation = Vec3::new(if i == 0 { 0.0 } else { 0.2 }, 0.0, 0.0);
            object.rigid_body.mass = 1.0;
            object.rigid_body.velocity = Vec3::zeros();
        }
        system.set_attraction(0, 0, 1.0).expect("self pair");
        system.step(&mut objects, 1.0).expect("step");

        // g = -0.01, force on p0 = (-0.2) * (1 / 0.2) = -1 along x, so v = +0.01
        let first = objects.get(ids[0]).expect("first");
        assert_relative_eq!(first.rigid_body.velocity.x, 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_set_attraction_out_of_range() {
        let mut system = seeded(4);
        assert!(system.set_attraction(0, 1, 0.5).is_err());
    }
}
