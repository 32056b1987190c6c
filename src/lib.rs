pub mod admin;
pub mod combat;
pub mod config;
pub mod entities;
mod error;
pub mod scripting;
pub mod server;
pub mod stats;
pub mod telemetry;
pub mod world;

pub use error::Error;
pub use server::{spawn_world_loop, ServerControl};

use crate::combat::conditions::ConditionRegistry;
use crate::world::data::GameData;
use crate::world::state::World;
use crate::world::time::GameClock;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufReader};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub fn run(args: &[String]) -> Result<(), Error> {
    let config = config::AppConfig::from_args(args)?;
    let _log_guard = telemetry::logging::init(&config.root, &config.server)?;
    info!(
        root = %config.root.display(),
        config = %config.config_path.display(),
        "l2unity starting"
    );

    let conditions = ConditionRegistry::with_defaults();
    let data = GameData::load(&config.root, &conditions)?;
    let skill_count = data.skills.len();

    let tick_length = Duration::from_millis(config.server.tick_millis);
    let mut world = World::from_data(
        data,
        GameClock::new(tick_length),
        config.server.rules(),
        StdRng::from_entropy(),
    );
    let npcs = world.spawn_all();
    info!(
        spawns = world.spawn_count(),
        npcs,
        skills = skill_count,
        tick_ms = config.server.tick_millis,
        "world ready"
    );

    let world = Arc::new(Mutex::new(world));
    let control = Arc::new(ServerControl::new());
    let handle = spawn_world_loop(Arc::clone(&world), Arc::clone(&control), tick_length);
    admin::console::spawn_console(BufReader::new(io::stdin()), Arc::clone(&control), world);
    info!("type 'shutdown' to stop the server");
    if handle.join().is_err() {
        error!("world loop panicked");
        return Err(Error::WorldLoop);
    }
    info!(ticks = control.ticks(), "l2unity stopped");
    Ok(())
}
