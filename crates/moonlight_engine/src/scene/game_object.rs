//! Game objects and their components
//!
//! A `GameObject` is a plain bundle of components. Identity is assigned by
//! the owning [`GameObjectManager`](super::GameObjectManager) and cannot
//! change after creation.

use std::fmt;
use std::sync::Arc;

use crate::assets::TextureData;
use crate::foundation::math::{Transform, Vec3};
use crate::render::mesh::Mesh;

/// Stable identifier of a game object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameObjectId(pub u32);

impl fmt::Display for GameObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Linear motion state used by the physics systems
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    /// Velocity in world units per second
    pub velocity: Vec3,
    /// Mass; physics requires it to be finite and greater than zero
    pub mass: f32,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::zeros(),
            mass: 1.0,
        }
    }
}

/// Marks a game object as a point light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightComponent {
    /// Light intensity, written to the color's w channel on the GPU
    pub light_intensity: f32,
}

impl Default for PointLightComponent {
    fn default() -> Self {
        Self { light_intensity: 1.0 }
    }
}

/// Inspector state attached to each object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiComponent {
    /// Whether the inspector should list this object's properties
    pub show_properties: bool,
}

/// An entity in the scene
#[derive(Debug, Clone)]
pub struct GameObject {
    id: GameObjectId,
    /// Display name
    pub name: String,
    /// Placement in the world
    pub transform: Transform,
    /// Motion state
    pub rigid_body: RigidBody,
    /// Display color
    pub color: Vec3,
    /// Present when the object emits light
    pub point_light: Option<PointLightComponent>,
    /// Inspector state
    pub ui: UiComponent,
    /// Shared geometry, drawn by the simple render system when present
    pub mesh: Option<Arc<Mesh>>,
    /// Shared decoded texture
    pub texture: Option<Arc<TextureData>>,
}

impl GameObject {
    pub(crate) fn new(id: GameObjectId) -> Self {
        Self {
            id,
            name: format!("GameObject{}", id.0),
            transform: Transform::default(),
            rigid_body: RigidBody::default(),
            color: Vec3::new(1.0, 1.0, 1.0),
            point_light: None,
            ui: UiComponent::default(),
            mesh: None,
            texture: None,
        }
    }

    /// Identity assigned at creation
    pub fn id(&self) -> GameObjectId {
        self.id
    }

    /// Builder-style name setter
    pub fn with_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Whether the object carries a point light component
    pub fn is_point_light(&self) -> bool {
        self.point_light.is_some()
    }
}
