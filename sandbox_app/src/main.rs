//! Sandbox demo for the scene engine
//!
//! Builds a small solar-system hierarchy of spinning cubes, streams a text
//! asset through the background loaders and renders a fixed number of frames
//! with the headless backend, logging per-frame statistics.
//!
//! Usage: `sandbox [config.toml|config.ron]` (see `sandbox.toml`)

use rand::prelude::*;
use scene_engine::core::config::AssetConfig;
use scene_engine::ecs::NamedSystem;
use scene_engine::foundation::logging;
use scene_engine::prelude::*;

const FRAME_LIMIT: u64 = 240;
const MOON_COUNT: usize = 4;

/// Rotation speed in radians per second
#[derive(Debug, Clone, Copy)]
struct Spin(f32);

impl Component for Spin {
    const NAME: &'static str = "Spin";
}

fn spin_system(world: &mut World, delta_time: f32) {
    let spinning: Vec<(Entity, f32)> = world.query::<Spin>().map(|(entity, spin)| (entity, spin.0)).collect();
    for (entity, speed) in spinning {
        if let Some(mut transform) = world.get_component_mut::<TransformComponent>(entity) {
            transform.rotate(Vec3::y(), speed * delta_time);
        }
    }
}

struct Sandbox {
    notes: Option<LoadHandle>,
    frames: u64,
}

impl Sandbox {
    fn spawn_body(
        engine: &mut Engine,
        name: &str,
        position: Vec3,
        scale: f32,
        color: [f32; 4],
        spin: f32,
    ) -> Result<Entity, AppError> {
        let entity = engine.create_entity(Some(name))?;
        let world = engine.world_mut();
        world.add_component(
            entity,
            TransformComponent::from_position(position).with_uniform_scale(scale),
        )?;
        world.add_component(entity, RenderableComponent::new("cube").with_color(color))?;
        world.add_component(entity, Spin(spin))?;
        Ok(entity)
    }
}

impl Application for Sandbox {
    fn on_start(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        engine.assets_mut().insert("cube", Mesh::cube());
        self.notes = Some(engine.assets_mut().request("notes.txt")?);

        let mut rng = thread_rng();
        let sun = Self::spawn_body(engine, "sun", Vec3::zeros(), 2.0, [1.0, 0.8, 0.2, 1.0], 0.3)?;
        let planet = Self::spawn_body(engine, "planet", Vec3::new(6.0, 0.0, 0.0), 0.5, [0.2, 0.4, 1.0, 1.0], 1.0)?;
        engine.attach(planet, Some(sun))?;

        for i in 0..MOON_COUNT {
            let offset = Vec3::new(rng.gen_range(1.5..3.0), rng.gen_range(-0.5..0.5), 0.0);
            let color = [rng.gen(), rng.gen(), rng.gen(), 1.0];
            let moon = Self::spawn_body(engine, &format!("moon-{i}"), offset, 0.3, color, rng.gen_range(0.5..3.0))?;
            engine.attach(moon, Some(planet))?;
        }

        engine.world_mut().add_system(NamedSystem::new("spin", spin_system));
        engine.camera_mut().set_position(Vec3::new(0.0, 8.0, 20.0));
        log::info!("Sandbox scene ready: {} entities", engine.world().entity_count());
        Ok(())
    }

    fn on_update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        self.frames += 1;

        if let Some(handle) = self.notes.take() {
            match handle.state() {
                LoadState::Pending => self.notes = Some(handle),
                LoadState::Resolved(data) => {
                    if let Some(text) = data.downcast::<String>() {
                        log::info!("Loaded {} ({} bytes)", handle.path(), text.len());
                    }
                }
                LoadState::Rejected(reason) => log::warn!("Could not load {}: {}", handle.path(), reason),
            }
        }

        if self.frames % 60 == 0 {
            log::info!(
                "frame {} | {:.1} fps | {} entities",
                self.frames,
                engine.timer().current_fps(),
                engine.world().entity_count()
            );
        }
        if self.frames >= FRAME_LIMIT {
            engine.request_quit();
        }
        Ok(())
    }

    fn on_stop(&mut self, engine: &mut Engine) {
        if let Some(backend) = engine.renderer().backend().as_any().downcast_ref::<HeadlessBackend>() {
            log::info!(
                "Rendered {} frames, {} meshes resident",
                backend.frames_rendered(),
                backend.live_mesh_count()
            );
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::new("Sandbox")
            .with_assets(AssetConfig::default().with_search_paths(["resources", "sandbox_app/resources"])),
    };
    logging::init_with_level(&config.log_level);

    let mut engine = Engine::headless(config)?;
    let mut app = Sandbox { notes: None, frames: 0 };
    engine.run(&mut app)?;
    engine.destroy()?;
    Ok(())
}
