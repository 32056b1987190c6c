use crate::config::GameRules;
use crate::entities::npc::{Npc, NpcTemplate};
use crate::world::id_factory::{IdFactory, ObjectId};
use crate::world::position::{Location, MAX_HEADING};
use crate::world::time::GameTick;
use rand::Rng;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Respawn delays are never shorter than this many seconds.
const MIN_RESPAWN_SECONDS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct SpawnId(pub u32);

impl fmt::Display for SpawnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("spawn {spawn} has no location for npc {npc_id}")]
    MissingLocation { spawn: SpawnId, npc_id: i32 },
    #[error("spawn {spawn} has a territory without rectangles")]
    EmptyTerritory { spawn: SpawnId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SpawnRect {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub z: i32,
}

impl SpawnRect {
    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Location {
        let (min_x, max_x) = ordered(self.min_x, self.max_x);
        let (min_y, max_y) = ordered(self.min_y, self.max_y);
        Location {
            x: rng.gen_range(min_x..=max_x),
            y: rng.gen_range(min_y..=max_y),
            z: self.z,
            heading: -1,
        }
    }
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Area an NPC may be placed in instead of a fixed point.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpawnTerritory {
    #[serde(default)]
    pub name: String,
    pub rects: Vec<SpawnRect>,
}

impl SpawnTerritory {
    pub fn get_spawn_location<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Location> {
        if self.rects.is_empty() {
            return None;
        }
        let rect = &self.rects[rng.gen_range(0..self.rects.len())];
        Some(rect.pick(rng))
    }
}

/// Everything a spawn needs from the world to create an NPC.
#[derive(Debug, Clone, Copy)]
pub struct SpawnContext<'a> {
    pub ids: &'a IdFactory,
    pub rules: GameRules,
    pub now: GameTick,
}

/// A dead NPC waiting to come back, produced by [`Spawn::decrease_count`].
#[derive(Debug, Clone)]
pub struct RespawnTask {
    pub spawn_id: SpawnId,
    pub npc: Npc,
    pub delay_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Spawn {
    id: SpawnId,
    pub name: Option<String>,
    template: Arc<NpcTemplate>,
    location: Location,
    maximum_count: i32,
    current_count: i32,
    scheduled_count: i32,
    pub location_id: i32,
    pub instance_id: i32,
    spawn_template: Option<SpawnTerritory>,
    respawn_min_delay: u64,
    respawn_max_delay: u64,
    do_respawn: bool,
    spawned_npcs: VecDeque<ObjectId>,
    random_walk: bool,
}

impl Spawn {
    pub fn new(id: SpawnId, template: Arc<NpcTemplate>) -> Self {
        Self {
            id,
            name: None,
            template,
            location: Location::default(),
            maximum_count: 0,
            current_count: 0,
            scheduled_count: 0,
            location_id: 0,
            instance_id: 0,
            spawn_template: None,
            respawn_min_delay: 0,
            respawn_max_delay: 0,
            do_respawn: false,
            spawned_npcs: VecDeque::new(),
            random_walk: false,
        }
    }

    pub fn id(&self) -> SpawnId {
        self.id
    }

    pub fn template(&self) -> &Arc<NpcTemplate> {
        &self.template
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    pub fn set_heading(&mut self, heading: i32) {
        self.location.heading = heading;
    }

    pub fn get_amount(&self) -> i32 {
        self.maximum_count
    }

    pub fn set_amount(&mut self, amount: i32) {
        self.maximum_count = amount;
    }

    pub fn current_count(&self) -> i32 {
        self.current_count
    }

    pub fn scheduled_count(&self) -> i32 {
        self.scheduled_count
    }

    pub fn spawn_template(&self) -> Option<&SpawnTerritory> {
        self.spawn_template.as_ref()
    }

    pub fn set_spawn_template(&mut self, territory: Option<SpawnTerritory>) {
        self.spawn_template = territory;
    }

    pub fn random_walking(&self) -> bool {
        self.random_walk
    }

    pub fn set_random_walking(&mut self, value: bool) {
        self.random_walk = value;
    }

    /// Sets the respawn window from a delay and a random spread, both in seconds.
    pub fn set_respawn_delay(&mut self, delay: i32, random_interval: i32) {
        if delay == 0 {
            self.respawn_min_delay = 0;
            self.respawn_max_delay = 0;
            return;
        }
        if delay < 0 {
            warn!(spawn = %self, delay, "respawn delay is negative");
        }
        if random_interval < 0 {
            warn!(spawn = %self, random_interval, "respawn random interval is negative");
        }
        let delay = i64::from(delay);
        let random_interval = i64::from(random_interval.max(0));
        self.respawn_min_delay = respawn_millis(delay - random_interval);
        self.respawn_max_delay = respawn_millis(delay + random_interval);
    }

    pub fn respawn_min_delay(&self) -> u64 {
        self.respawn_min_delay
    }

    pub fn respawn_max_delay(&self) -> u64 {
        self.respawn_max_delay
    }

    pub fn get_respawn_delay(&self) -> u64 {
        (self.respawn_min_delay + self.respawn_max_delay) / 2
    }

    pub fn has_respawn_random(&self) -> bool {
        self.respawn_min_delay != self.respawn_max_delay
    }

    pub fn start_respawn(&mut self) {
        self.do_respawn = true;
    }

    pub fn stop_respawn(&mut self) {
        self.do_respawn = false;
    }

    pub fn is_respawn_enabled(&self) -> bool {
        self.do_respawn
    }

    /// Fills the spawn up to its amount. Each created NPC is handed to `on_spawn`.
    /// Stops at the first failure and returns the live count.
    pub fn init<R: Rng + ?Sized>(
        &mut self,
        ctx: &SpawnContext<'_>,
        rng: &mut R,
        mut on_spawn: impl FnMut(Npc),
    ) -> i32 {
        while self.current_count < self.maximum_count {
            match self.do_spawn(false, ctx, rng) {
                Ok(Some(npc)) => on_spawn(npc),
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "npc not spawned, stopping spawn init");
                    break;
                }
            }
        }
        self.do_respawn = self.respawn_min_delay != 0;
        self.current_count
    }

    pub fn spawn_one<R: Rng + ?Sized>(
        &mut self,
        summon: bool,
        ctx: &SpawnContext<'_>,
        rng: &mut R,
    ) -> Result<Option<Npc>, SpawnError> {
        self.do_spawn(summon, ctx, rng)
    }

    /// Creates one NPC. Owner-bound templates only take a slot and yield `None`.
    pub fn do_spawn<R: Rng + ?Sized>(
        &mut self,
        summon: bool,
        ctx: &SpawnContext<'_>,
        rng: &mut R,
    ) -> Result<Option<Npc>, SpawnError> {
        if self.template.is_type_unspawnable() {
            self.current_count += 1;
            return Ok(None);
        }
        let mut npc = Npc::new(Arc::clone(&self.template), ctx.ids, ctx.rules);
        npc.show_summon_animation = summon;
        self.initialize_npc(&mut npc, rng)?;
        Ok(Some(npc))
    }

    fn initialize_npc<R: Rng + ?Sized>(
        &mut self,
        npc: &mut Npc,
        rng: &mut R,
    ) -> Result<(), SpawnError> {
        let location = match &self.spawn_template {
            Some(territory) => {
                let picked = territory
                    .get_spawn_location(rng)
                    .ok_or(SpawnError::EmptyTerritory { spawn: self.id })?;
                self.location = picked.with_heading(self.location.heading);
                self.location
            }
            None if self.location.is_unset() => {
                return Err(SpawnError::MissingLocation {
                    spawn: self.id,
                    npc_id: self.template.id,
                });
            }
            None => self.location,
        };
        let heading = if location.has_random_heading() {
            rng.gen_range(0..MAX_HEADING)
        } else {
            location.heading
        };

        npc.location = location.with_heading(heading);
        npc.spawn_id = Some(self.id);
        npc.instance_id = self.instance_id;
        npc.random_walking = self.random_walk;
        self.spawned_npcs.push_back(npc.object_id());
        self.current_count += 1;
        debug!(spawn = %self.id, npc = %npc.object_id(), location = %npc.location, "npc spawned");
        Ok(())
    }

    /// Forgets a dead NPC. Returns the respawn task to schedule, if any.
    pub fn decrease_count<R: Rng + ?Sized>(
        &mut self,
        npc: Npc,
        rng: &mut R,
    ) -> Option<RespawnTask> {
        if self.current_count <= 0 {
            return None;
        }
        self.current_count -= 1;
        self.forget(npc.object_id());

        if !self.do_respawn || self.scheduled_count + self.current_count >= self.maximum_count {
            return None;
        }
        self.scheduled_count += 1;
        let delay_ms = if self.has_respawn_random() {
            rng.gen_range(self.respawn_min_delay..=self.respawn_max_delay)
        } else {
            self.respawn_min_delay
        };
        Some(RespawnTask {
            spawn_id: self.id,
            npc,
            delay_ms,
        })
    }

    /// Brings a scheduled NPC back under a fresh object id.
    pub fn run_respawn_task<R: Rng + ?Sized>(
        &mut self,
        mut npc: Npc,
        ctx: &SpawnContext<'_>,
        rng: &mut R,
    ) -> Option<Npc> {
        self.scheduled_count = (self.scheduled_count - 1).max(0);
        if !self.do_respawn {
            return None;
        }
        npc.refresh_id(ctx.ids);
        npc.on_respawn(ctx.now);
        match self.initialize_npc(&mut npc, rng) {
            Ok(()) => Some(npc),
            Err(err) => {
                warn!(error = %err, "respawn failed");
                None
            }
        }
    }

    pub fn get_last_spawn(&self) -> Option<ObjectId> {
        self.spawned_npcs.back().copied()
    }

    /// Drops the newest NPC from this spawn without scheduling a respawn.
    pub fn delete_last_npc(&mut self) -> Option<ObjectId> {
        let object_id = self.spawned_npcs.pop_back()?;
        self.current_count = (self.current_count - 1).max(0);
        Some(object_id)
    }

    pub fn get_spawned_npcs(&self) -> &VecDeque<ObjectId> {
        &self.spawned_npcs
    }

    fn forget(&mut self, object_id: ObjectId) {
        if let Some(pos) = self.spawned_npcs.iter().position(|id| *id == object_id) {
            self.spawned_npcs.remove(pos);
        }
    }
}

fn respawn_millis(seconds: i64) -> u64 {
    (seconds.max(MIN_RESPAWN_SECONDS) as u64) * 1000
}

impl fmt::Display for Spawn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spawn {} x: {} y: {} z: {} heading: {}",
            self.id, self.location.x, self.location.y, self.location.z, self.location.heading
        )
    }
}
