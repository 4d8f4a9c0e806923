//! Scene: game objects and the entity store
//!
//! ```text
//! Scenario (setup, physics)  ──mutates──▶  GameObjectManager
//!                                               │ update_buffer(frame_index)
//!                                               ▼
//!                                  per-frame ObjectBufferData snapshot
//!                                               │
//!                                               ▼
//!                                      render sub-systems (read only)
//! ```

mod game_object;
mod game_object_manager;

pub use game_object::{GameObject, GameObjectId, PointLightComponent, RigidBody, UiComponent};
pub use game_object_manager::{GameObjectManager, IdAllocator, ObjectBufferData};

/// Scene errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A frame index outside `0..frame_count`
    #[error("Frame index {index} out of range for {frame_count} frames in flight")]
    InvalidFrameIndex {
        /// Requested index
        index: usize,
        /// Number of frames in flight
        frame_count: usize,
    },
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;
