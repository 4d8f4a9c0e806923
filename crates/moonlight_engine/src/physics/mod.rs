//! Physics module: N-body gravity and particle life
//!
//! Both systems are O(n^2) over the entity store and mutate velocities and
//! positions in place. Preconditions are checked before any object is
//! touched, so a failed `update` leaves the store exactly as it was.

pub mod gravity;
pub mod particle_life;

pub use gravity::{GravityConfig, GravityPhysicsSystem};
pub use particle_life::{ParticleLifeConfig, ParticleLifeSystem, ParticleType};

use crate::scene::{GameObjectId, GameObjectManager};

/// Physics errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A body whose mass is zero, negative or not finite
    #[error("Object {id} has invalid mass {mass}")]
    InvalidMass {
        /// Offending object
        id: GameObjectId,
        /// Its mass
        mass: f32,
    },

    /// System state that no longer matches the scene
    #[error("Invalid physics state: {reason}")]
    InvalidState {
        /// What went wrong
        reason: String,
    },

    /// A step split into zero substeps
    #[error("Substep count must be at least 1")]
    InvalidSubsteps,
}

/// Result type for physics operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// Ensure every listed object exists and has a usable mass
pub(crate) fn validate_bodies<'a>(
    objects: &GameObjectManager,
    ids: impl IntoIterator<Item = &'a GameObjectId>,
) -> PhysicsResult<()> {
    for &id in ids {
        let object = objects.get(id).ok_or_else(|| PhysicsError::InvalidState {
            reason: format!("object {id} is not in the scene"),
        })?;
        let mass = object.rigid_body.mass;
        if !mass.is_finite() || mass <= 0.0 {
            return Err(PhysicsError::InvalidMass { id, mass });
        }
    }
    Ok(())
}
