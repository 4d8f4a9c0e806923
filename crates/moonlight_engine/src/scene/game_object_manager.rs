//! Entity store
//!
//! Owns every game object, hands out ids from its own allocator and keeps one
//! snapshot buffer per frame in flight. Systems hold [`GameObjectId`]s across
//! frames and resolve them through the store each time they need an object.

use std::collections::HashMap;

use super::game_object::{GameObject, GameObjectId, PointLightComponent};
use super::{SceneError, SceneResult};
use crate::foundation::math::{Mat3, Mat4, Vec3};

/// Monotonic id source
///
/// Ids only repeat once the 32-bit range is exhausted and the counter wraps
/// to 0; [`IdAllocator::allocate_unused`] skips any that are still live.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Allocator whose first id is 0
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Allocator whose first id is `first`
    pub fn starting_at(first: u32) -> Self {
        Self { next: first }
    }

    /// Take the next id
    pub fn allocate(&mut self) -> GameObjectId {
        let id = GameObjectId(self.next);
        self.next = match self.next.checked_add(1) {
            Some(next) => next,
            None => {
                log::warn!("Game object id space exhausted, wrapping to 0");
                0
            }
        };
        id
    }

    /// Take the next id for which `in_use` returns false
    pub fn allocate_unused(&mut self, mut in_use: impl FnMut(GameObjectId) -> bool) -> GameObjectId {
        loop {
            let id = self.allocate();
            if !in_use(id) {
                return id;
            }
            log::warn!("Skipping id {id}, still held by a live object");
        }
    }

    /// The id the next `allocate` call will return
    pub fn peek(&self) -> GameObjectId {
        GameObjectId(self.next)
    }
}

/// Per-frame copy of the data the render systems read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectBufferData {
    /// Source object
    pub id: GameObjectId,
    /// Model matrix at snapshot time
    pub model_matrix: Mat4,
    /// Normal matrix at snapshot time
    pub normal_matrix: Mat3,
    /// Display color at snapshot time
    pub color: Vec3,
}

/// Owner of all game objects in a scene
#[derive(Debug)]
pub struct GameObjectManager {
    objects: HashMap<GameObjectId, GameObject>,
    ids: IdAllocator,
    frame_buffers: Vec<Vec<ObjectBufferData>>,
}

impl GameObjectManager {
    /// Create an empty store with one snapshot buffer per frame in flight
    pub fn new(frames_in_flight: usize) -> Self {
        Self::with_allocator(frames_in_flight, IdAllocator::new())
    }

    /// Create an empty store drawing ids from `ids`
    pub fn with_allocator(frames_in_flight: usize, ids: IdAllocator) -> Self {
        Self {
            objects: HashMap::new(),
            ids,
            frame_buffers: vec![Vec::new(); frames_in_flight.max(1)],
        }
    }

    /// Create a default object and return exclusive access to it
    pub fn create_game_object(&mut self) -> &mut GameObject {
        let id = self.ids.allocate_unused(|id| self.objects.contains_key(&id));
        log::trace!("Created game object {id}");
        self.objects.entry(id).or_insert_with(|| GameObject::new(id))
    }

    /// Create an object carrying a point light component
    ///
    /// Only `scale.x` is set from `radius`; the billboard reads it as its
    /// size.
    pub fn make_point_light(&mut self, intensity: f32, radius: f32, color: Vec3) -> &mut GameObject {
        let object = self.create_game_object();
        object.color = color;
        object.transform.scale.x = radius;
        object.point_light = Some(PointLightComponent {
            light_intensity: intensity,
        });
        object
    }

    /// Point light with intensity 10, radius 0.1 and white color
    pub fn make_default_point_light(&mut self) -> &mut GameObject {
        self.make_point_light(10.0, 0.1, Vec3::new(1.0, 1.0, 1.0))
    }

    /// Look up an object
    pub fn get(&self, id: GameObjectId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    /// Look up an object mutably
    pub fn get_mut(&mut self, id: GameObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(&id)
    }

    /// Iterate all objects in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &GameObject> {
        self.objects.values()
    }

    /// Iterate all objects mutably in unspecified order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GameObject> {
        self.objects.values_mut()
    }

    /// Snapshot of current ids, sorted ascending
    pub fn ids(&self) -> Vec<GameObjectId> {
        let mut ids: Vec<_> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Remove every object; ids already handed out are not reused
    pub fn clear(&mut self) {
        log::debug!("Clearing {} game objects", self.objects.len());
        self.objects.clear();
        for buffer in &mut self.frame_buffers {
            buffer.clear();
        }
    }

    /// Number of snapshot buffers (frames in flight)
    pub fn frame_count(&self) -> usize {
        self.frame_buffers.len()
    }

    /// Copy every object's transform and color into the snapshot for
    /// `frame_index`, ordered by id
    pub fn update_buffer(&mut self, frame_index: usize) -> SceneResult<()> {
        let frame_count = self.frame_buffers.len();
        let buffer = self
            .frame_buffers
            .get_mut(frame_index)
            .ok_or(SceneError::InvalidFrameIndex {
                index: frame_index,
                frame_count,
            })?;

        buffer.clear();
        buffer.extend(self.objects.values().map(|object| ObjectBufferData {
            id: object.id(),
            model_matrix: object.transform.mat4(),
            normal_matrix: object.transform.normal_matrix(),
            color: object.color,
        }));
        buffer.sort_unstable_by_key(|entry| entry.id);
        Ok(())
    }

    /// Snapshot written by the last `update_buffer(frame_index)`
    pub fn frame_buffer(&self, frame_index: usize) -> SceneResult<&[ObjectBufferData]> {
        self.frame_buffers
            .get(frame_index)
            .map(Vec::as_slice)
            .ok_or(SceneError::InvalidFrameIndex {
                index: frame_index,
                frame_count: self.frame_buffers.len(),
            })
    }
}
