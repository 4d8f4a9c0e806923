//! Particle life: colored types attracting and repelling each other
//!
//! Hotkeys while running:
//!
//! | Key | Action |
//! |-----|--------|
//! | R | Reroll attractions and respawn every particle |
//! | V | Toggle the bounding box |
//! | Up / Down | Interaction radius |
//! | Left / Right | Viscosity |
//! | Space | Select the next type and log its attractions |
//! | T | Pick the next attraction target type |
//! | K / J | Raise / lower the selected type's attraction to the target |
//! | M / N | Add / remove particles of the selected type (respawns everything) |
//! | C | Give the selected type the next palette color |

use std::sync::Arc;

use moonlight_engine::assets::ObjLoader;
use moonlight_engine::foundation::math::{Vec3, Vec4};
use moonlight_engine::foundation::time::Time;
use moonlight_engine::input::{InputManager, KeyCode};
use moonlight_engine::physics::ParticleLifeSystem;
use moonlight_engine::render::vulkan::VulkanBackend;
use moonlight_engine::render::{FrameInfo, Mesh};
use moonlight_engine::scene::GameObjectManager;
use moonlight_engine::{AppError, Application, StartContext, UpdateContext};

use crate::config::ParticleLifeSettings;
use crate::systems::SceneRenderSystems;

const RADIUS_STEP: f32 = 0.05;
const RADIUS_RANGE: (f32, f32) = (0.0, 10.0);
const VISCOSITY_STEP: f32 = 0.01;
const VISCOSITY_RANGE: (f32, f32) = (0.1, 2.0);
const ATTRACTION_STEP: f32 = 0.1;
const COUNT_STEP: usize = 10;
const PALETTE: [[f32; 3]; 8] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, 0.5, 0.0],
];

/// Particle life scenario
pub struct ParticleLifeScenario {
    settings: ParticleLifeSettings,
    simulation: Option<ParticleLifeSystem>,
    selected: usize,
    target: usize,
    systems: Option<SceneRenderSystems>,
}

impl ParticleLifeScenario {
    /// Create the scenario; particles are spawned on start
    pub fn new(settings: ParticleLifeSettings) -> Self {
        Self {
            settings,
            simulation: None,
            selected: 0,
            target: 0,
            systems: None,
        }
    }

    /// Register the configured types and spawn their particles
    pub fn populate(&mut self, objects: &mut GameObjectManager, mesh: Option<Arc<Mesh>>) -> Result<(), AppError> {
        let mut simulation = ParticleLifeSystem::new(self.settings.simulation, mesh);
        for entry in &self.settings.types {
            simulation.add_type(entry.name.as_str(), entry.color, entry.count);
        }
        simulation.create_particles(objects)?;

        self.simulation = Some(simulation);
        self.selected = 0;
        self.target = 0;
        Ok(())
    }

    /// Running simulation, once populated
    pub fn simulation(&self) -> Option<&ParticleLifeSystem> {
        self.simulation.as_ref()
    }

    /// Type whose attractions Space last reported
    pub fn selected_type(&self) -> usize {
        self.selected
    }

    /// Type the attraction keys edit against
    pub fn target_type(&self) -> usize {
        self.target
    }

    /// Change a type's particle count and color
    ///
    /// A count change respawns the whole scene with fresh attractions.
    pub fn edit_type(
        &mut self,
        objects: &mut GameObjectManager,
        type_id: usize,
        count: usize,
        color: Vec3,
    ) -> Result<(), AppError> {
        let Some(simulation) = self.simulation.as_mut() else {
            return Err(AppError::Custom("particle life is not populated".to_string()));
        };
        let Some(particle_type) = simulation.type_mut(type_id) else {
            return Err(AppError::Custom(format!("no particle type {type_id}")));
        };
        particle_type.count = count;
        particle_type.color = color;
        simulation.apply_type_edits(objects, type_id)?;
        Ok(())
    }

    fn handle_keys(&mut self, objects: &mut GameObjectManager, input: &InputManager) -> Result<(), AppError> {
        let Some(simulation) = self.simulation.as_mut() else {
            return Ok(());
        };

        if input.just_pressed(KeyCode::R) {
            simulation.rebuild(objects)?;
            log::info!("Particle life rebuilt with {} objects", objects.len());
        }

        let settings = simulation.settings_mut();
        if input.just_pressed(KeyCode::V) {
            settings.is_bounded = !settings.is_bounded;
            log::info!("Bounded: {}", settings.is_bounded);
        }

        let radius_delta = key_axis(input, KeyCode::Up, KeyCode::Down) * RADIUS_STEP;
        if radius_delta != 0.0 {
            settings.radius = (settings.radius + radius_delta).clamp(RADIUS_RANGE.0, RADIUS_RANGE.1);
            log::info!("Radius: {:.2}", settings.radius);
        }

        let viscosity_delta = key_axis(input, KeyCode::Right, KeyCode::Left) * VISCOSITY_STEP;
        if viscosity_delta != 0.0 {
            settings.viscosity = (settings.viscosity + viscosity_delta).clamp(VISCOSITY_RANGE.0, VISCOSITY_RANGE.1);
            log::info!("Viscosity: {:.2}", settings.viscosity);
        }

        if input.just_pressed(KeyCode::Space) && !simulation.types().is_empty() {
            self.selected = (self.selected + 1) % simulation.types().len();
            let selected = &simulation.types()[self.selected];
            let row: Vec<String> = simulation
                .types()
                .iter()
                .zip(selected.attraction())
                .map(|(other, value)| format!("{} {value:+.2}", other.name))
                .collect();
            log::info!(
                "Type '{}': {} particles, attraction [{}]",
                selected.name,
                selected.particles().len(),
                row.join(", ")
            );
        }

        if input.just_pressed(KeyCode::T) && !simulation.types().is_empty() {
            self.target = (self.target + 1) % simulation.types().len();
            log::info!("Attraction target: '{}'", simulation.types()[self.target].name);
        }

        let attraction_delta = key_axis(input, KeyCode::K, KeyCode::J) * ATTRACTION_STEP;
        if attraction_delta != 0.0 {
            let current = simulation
                .types()
                .get(self.selected)
                .and_then(|selected| selected.attraction().get(self.target))
                .copied();
            if let Some(current) = current {
                simulation.set_attraction(self.selected, self.target, current + attraction_delta)?;
                let types = simulation.types();
                log::info!(
                    "Attraction '{}' -> '{}': {:+.2}",
                    types[self.selected].name,
                    types[self.target].name,
                    types[self.selected].attraction()[self.target]
                );
            }
        }

        let grow = input.just_pressed(KeyCode::M);
        let shrink = input.just_pressed(KeyCode::N);
        let recolor = input.just_pressed(KeyCode::C);
        let edit = match simulation.types().get(self.selected) {
            Some(selected) if grow || shrink || recolor => {
                let mut count = selected.count;
                if grow {
                    count += COUNT_STEP;
                }
                if shrink {
                    count = count.saturating_sub(COUNT_STEP);
                }
                let color = if recolor { next_color(selected.color) } else { selected.color };
                Some((count, color))
            }
            _ => None,
        };
        if let Some((count, color)) = edit {
            let type_id = self.selected;
            self.edit_type(objects, type_id, count, color)?;
            log::info!("Type {type_id}: {count} particles, color {:?}", color.as_slice());
        }
        Ok(())
    }
}

/// Palette entry after `color`, or the first one for colors off the palette
fn next_color(color: Vec3) -> Vec3 {
    let position = PALETTE
        .iter()
        .position(|&entry| (Vec3::from(entry) - color).norm() < 1e-4);
    let next = position.map_or(0, |index| (index + 1) % PALETTE.len());
    Vec3::from(PALETTE[next])
}

fn key_axis(input: &InputManager, positive: KeyCode, negative: KeyCode) -> f32 {
    let mut axis = 0.0;
    if input.just_pressed(positive) {
        axis += 1.0;
    }
    if input.just_pressed(negative) {
        axis -= 1.0;
    }
    axis
}

impl Application<VulkanBackend> for ParticleLifeScenario {
    fn start(&mut self, ctx: &mut StartContext<'_, VulkanBackend>) -> Result<(), AppError> {
        self.systems = Some(SceneRenderSystems::new(ctx)?);
        ctx.ubo.set_ambient(Vec4::new(1.0, 1.0, 1.0, 1.0));

        let mesh = match ObjLoader::load(&self.settings.model) {
            Ok(mesh) => Some(mesh),
            Err(e) => {
                log::warn!("Particles will not be drawn: {e}");
                None
            }
        };
        self.populate(ctx.objects, mesh)?;
        log::info!("Particle life started with {} particles", ctx.objects.len());
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>, time: &Time) -> Result<(), AppError> {
        self.handle_keys(ctx.objects, ctx.input)?;
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.update(ctx.objects, time)?;
        }
        Ok(())
    }

    fn render_systems(&mut self, frame: &mut FrameInfo<'_, VulkanBackend>) -> Result<(), AppError> {
        match self.systems.as_mut() {
            Some(systems) => systems.render(frame),
            None => Ok(()),
        }
    }
}
