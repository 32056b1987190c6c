use crate::world::state::World;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Ticks slower than this many tick lengths are reported as lag.
const LAG_FACTOR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerSignal {
    Running = 0,
    Shutdown = 1,
}

#[derive(Debug)]
pub struct ServerControl {
    signal: AtomicU8,
    ticks: AtomicU64,
}

impl ServerControl {
    pub fn new() -> Self {
        Self {
            signal: AtomicU8::new(ServerSignal::Running as u8),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn request_shutdown(&self) {
        self.signal.store(ServerSignal::Shutdown as u8, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.signal.load(Ordering::SeqCst) == ServerSignal::Running as u8
    }

    /// Ticks the world loop has completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Default for ServerControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Steps the world once per `tick_length` until shutdown is requested.
pub fn spawn_world_loop(
    world: Arc<Mutex<World>>,
    control: Arc<ServerControl>,
    tick_length: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        info!(tick_ms = tick_length.as_millis() as u64, "world loop started");
        let mut next = Instant::now() + tick_length;
        while control.is_running() {
            let started = Instant::now();
            let report = world.lock().step();
            control.ticks.fetch_add(1, Ordering::SeqCst);
            if !report.respawned.is_empty() || report.expired_effects > 0 {
                debug!(
                    respawned = report.respawned.len(),
                    expired = report.expired_effects,
                    events = report.events.len(),
                    "world tick"
                );
            }
            let elapsed = started.elapsed();
            if elapsed > tick_length * LAG_FACTOR {
                warn!(elapsed_ms = elapsed.as_millis() as u64, "world tick lagging");
            }

            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
                next += tick_length;
            } else {
                next = now + tick_length;
            }
        }
        info!(ticks = control.ticks(), "world loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRules;
    use crate::world::time::GameClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn loop_advances_world_until_shutdown() {
        let tick = Duration::from_millis(1);
        let world = Arc::new(Mutex::new(World::new(
            GameClock::new(tick),
            GameRules::default(),
            StdRng::seed_from_u64(1),
        )));
        let control = Arc::new(ServerControl::new());
        let handle = spawn_world_loop(Arc::clone(&world), Arc::clone(&control), tick);

        let deadline = Instant::now() + Duration::from_secs(5);
        while control.ticks() < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        control.request_shutdown();
        handle.join().expect("join world loop");

        assert!(!control.is_running());
        let ticks = control.ticks();
        assert!(ticks >= 5);
        assert_eq!(world.lock().now().0, ticks);
    }
}
