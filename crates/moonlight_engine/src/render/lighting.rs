//! Point light collection into the global uniform block

use super::frame_info::{GlobalUbo, PointLight, MAX_LIGHTS};
use crate::scene::GameObjectManager;

/// Copy every point light in the scene into `ubo`, ordered by id
///
/// Lights past [`MAX_LIGHTS`] are dropped with a warning. Returns the
/// number of lights written.
pub fn update_point_lights(objects: &GameObjectManager, ubo: &mut GlobalUbo) -> usize {
    let mut lights: Vec<_> = objects
        .iter()
        .filter_map(|object| object.point_light.map(|light| (object.id(), object, light)))
        .collect();
    lights.sort_unstable_by_key(|(id, _, _)| *id);

    if lights.len() > MAX_LIGHTS {
        log::warn!(
            "Scene has {} point lights, only the first {} are uploaded",
            lights.len(),
            MAX_LIGHTS
        );
    }

    let mut count = 0;
    for (slot, (_, object, light)) in ubo.point_lights.iter_mut().zip(lights.iter()) {
        let t = object.transform.translation;
        let c = object.color;
        *slot = PointLight {
            position: [t.x, t.y, t.z, 1.0],
            color: [c.x, c.y, c.z, light.light_intensity],
        };
        count += 1;
    }
    for slot in ubo.point_lights.iter_mut().skip(count) {
        *slot = PointLight::default();
    }

    ubo.num_lights = i32::try_from(count).unwrap_or(i32::MAX);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_lights_are_written_in_id_order() {
        let mut objects = GameObjectManager::new(1);
        objects.create_game_object();
        objects
            .make_point_light(0.2, 0.1, Vec3::new(1.0, 0.0, 0.0))
            .transform
            .translation = Vec3::new(1.0, 2.0, 3.0);
        objects.make_point_light(0.5, 0.1, Vec3::new(0.0, 0.0, 1.0));

        let mut ubo = GlobalUbo::default();
        assert_eq!(update_point_lights(&objects, &mut ubo), 2);
        assert_eq!(ubo.num_lights, 2);
        assert_eq!(ubo.point_lights[0].position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(ubo.point_lights[0].color, [1.0, 0.0, 0.0, 0.2]);
        assert_eq!(ubo.point_lights[1].color, [0.0, 0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_excess_lights_are_truncated() {
        let mut objects = GameObjectManager::new(1);
        for _ in 0..(MAX_LIGHTS + 3) {
            objects.make_default_point_light();
        }
        let mut ubo = GlobalUbo::default();
        assert_eq!(update_point_lights(&objects, &mut ubo), MAX_LIGHTS);
        assert_eq!(ubo.num_lights as usize, MAX_LIGHTS);
    }

    #[test]
    fn test_removed_lights_are_cleared() {
        let mut objects = GameObjectManager::new(1);
        objects.make_default_point_light();
        objects.make_default_point_light();
        let mut ubo = GlobalUbo::default();
        update_point_lights(&objects, &mut ubo);

        objects.clear();
        objects.make_default_point_light();
        update_point_lights(&objects, &mut ubo);
        assert_eq!(ubo.num_lights, 1);
        assert_eq!(ubo.point_lights[1], PointLight::default());
    }
}
