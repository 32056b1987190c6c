use crate::admin::commands::{parse_admin_command, AdminCommand};
use crate::server::ServerControl;
use crate::world::state::World;
use parking_lot::Mutex;
use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Applies one console line. Returns `false` once the server should stop reading.
pub fn handle_console_line(line: &str, control: &ServerControl, world: &Mutex<World>) -> bool {
    match parse_admin_command(line) {
        None => true,
        Some(AdminCommand::Shutdown) => {
            info!("shutdown requested from console");
            control.request_shutdown();
            false
        }
        Some(AdminCommand::Status) => {
            let world = world.lock();
            info!(
                tick = world.now().0,
                npcs = world.npc_count(),
                creatures = world.creature_count(),
                pending_respawns = world.pending_respawn_count(),
                "server status"
            );
            true
        }
        Some(AdminCommand::Unknown(command)) => {
            warn!(%command, "unknown console command");
            true
        }
    }
}

/// Reads console commands until `shutdown` or end of input.
pub fn run_console<R: BufRead>(reader: R, control: &ServerControl, world: &Mutex<World>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "console read failed");
                return;
            }
        };
        if !control.is_running() || !handle_console_line(&line, control, world) {
            return;
        }
    }
}

pub fn spawn_console<R: BufRead + Send + 'static>(
    reader: R,
    control: Arc<ServerControl>,
    world: Arc<Mutex<World>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || run_console(reader, &control, &world))
}
