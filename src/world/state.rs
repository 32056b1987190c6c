use crate::combat::effect_list::EffectListEvent;
use crate::config::GameRules;
use crate::entities::creature::{Creature, CreatureHandle};
use crate::entities::npc::{Npc, NpcTemplate};
use crate::world::cron::Cron;
use crate::world::data::{GameData, NpcTemplates};
use crate::world::id_factory::{IdFactory, ObjectId};
use crate::world::spawn::{RespawnTask, Spawn, SpawnContext, SpawnId};
use crate::world::time::{GameClock, GameTick};
use rand::rngs::StdRng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RespawnKey(u64);

/// What one world tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub expired_effects: usize,
    /// Effect list notifications drained from each creature, for delivery to clients.
    pub events: Vec<(ObjectId, EffectListEvent)>,
    pub respawned: Vec<ObjectId>,
}

#[derive(Debug)]
pub struct World {
    clock: GameClock,
    ids: IdFactory,
    rules: GameRules,
    npc_templates: NpcTemplates,
    spawns: BTreeMap<SpawnId, Spawn>,
    creatures: HashMap<ObjectId, CreatureHandle>,
    npcs: HashMap<ObjectId, Npc>,
    respawns: Cron<RespawnKey>,
    pending_respawns: HashMap<RespawnKey, RespawnTask>,
    next_respawn_key: u64,
    rng: StdRng,
}

impl World {
    pub fn new(clock: GameClock, rules: GameRules, rng: StdRng) -> Self {
        Self {
            clock,
            ids: IdFactory::new(),
            rules,
            npc_templates: HashMap::new(),
            spawns: BTreeMap::new(),
            creatures: HashMap::new(),
            npcs: HashMap::new(),
            respawns: Cron::new(),
            pending_respawns: HashMap::new(),
            next_respawn_key: 0,
            rng,
        }
    }

    pub fn from_data(data: GameData, clock: GameClock, rules: GameRules, rng: StdRng) -> Self {
        let mut world = Self::new(clock, rules, rng);
        world.npc_templates = data.npc_templates;
        for spawn in data.spawns {
            world.add_spawn(spawn);
        }
        world
    }

    pub fn now(&self) -> GameTick {
        self.clock.now()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn ids(&self) -> &IdFactory {
        &self.ids
    }

    pub fn rules(&self) -> GameRules {
        self.rules
    }

    pub fn npc_template(&self, id: i32) -> Option<&Arc<NpcTemplate>> {
        self.npc_templates.get(&id)
    }

    pub fn add_spawn(&mut self, spawn: Spawn) {
        if let Some(old) = self.spawns.insert(spawn.id(), spawn) {
            warn!(spawn = %old.id(), "spawn replaced");
        }
    }

    pub fn spawn(&self, id: SpawnId) -> Option<&Spawn> {
        self.spawns.get(&id)
    }

    pub fn spawn_mut(&mut self, id: SpawnId) -> Option<&mut Spawn> {
        self.spawns.get_mut(&id)
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.len()
    }

    /// Runs `init` on every spawn and returns the number of live NPCs.
    pub fn spawn_all(&mut self) -> usize {
        let ctx = SpawnContext {
            ids: &self.ids,
            rules: self.rules,
            now: self.clock.now(),
        };
        let mut created = Vec::new();
        for spawn in self.spawns.values_mut() {
            spawn.init(&ctx, &mut self.rng, |npc| created.push(npc));
        }
        let count = created.len();
        for npc in created {
            self.register_npc(npc);
        }
        info!(npcs = count, spawns = self.spawns.len(), "spawns initialized");
        count
    }

    pub fn add_creature(&mut self, creature: Creature) -> CreatureHandle {
        let object_id = creature.object_id;
        let handle = creature.handle();
        self.creatures.insert(object_id, Arc::clone(&handle));
        handle
    }

    pub fn get_creature(&self, object_id: ObjectId) -> Option<CreatureHandle> {
        self.creatures.get(&object_id).cloned()
    }

    pub fn get_npc(&self, object_id: ObjectId) -> Option<&Npc> {
        self.npcs.get(&object_id)
    }

    pub fn npc_count(&self) -> usize {
        self.npcs.len()
    }

    pub fn creature_count(&self) -> usize {
        self.creatures.len()
    }

    pub fn pending_respawn_count(&self) -> usize {
        self.respawns.len()
    }

    /// Kills an NPC, takes it out of the world and hands it back to its spawn.
    pub fn kill_npc(&mut self, object_id: ObjectId) -> bool {
        let Some(npc) = self.npcs.remove(&object_id) else {
            return false;
        };
        self.creatures.remove(&object_id);
        let now = self.clock.now();
        npc.creature().lock().kill(now);

        let Some(spawn_id) = npc.spawn_id else {
            return true;
        };
        let Some(spawn) = self.spawns.get_mut(&spawn_id) else {
            warn!(npc = %object_id, spawn = %spawn_id, "killed npc belongs to an unknown spawn");
            return true;
        };
        if let Some(task) = spawn.decrease_count(npc, &mut self.rng) {
            let delay = self
                .clock
                .ticks_from_duration_round_up(Duration::from_millis(task.delay_ms));
            let key = RespawnKey(self.next_respawn_key);
            self.next_respawn_key += 1;
            debug!(spawn = %spawn_id, delay_ms = task.delay_ms, "respawn scheduled");
            self.pending_respawns.insert(key, task);
            self.respawns.set(key, delay, now);
        }
        true
    }

    /// Removes the newest NPC of a spawn from the world.
    pub fn delete_last_npc(&mut self, spawn_id: SpawnId) -> Option<ObjectId> {
        let object_id = self.spawns.get_mut(&spawn_id)?.delete_last_npc()?;
        self.npcs.remove(&object_id);
        self.creatures.remove(&object_id);
        Some(object_id)
    }

    /// Advances the clock by one tick and runs it.
    pub fn step(&mut self) -> TickReport {
        let now = self.clock.advance(1);
        self.tick(now)
    }

    pub fn tick(&mut self, now: GameTick) -> TickReport {
        let mut report = TickReport::default();
        for (&object_id, handle) in &self.creatures {
            let mut creature = handle.lock();
            report.expired_effects += creature.expire_effects(now);
            let events = creature.drain_events();
            report.events.extend(events.into_iter().map(|event| (object_id, event)));
        }

        let mut respawned = Vec::new();
        while let Some(key) = self.respawns.pop_ready(now) {
            let Some(task) = self.pending_respawns.remove(&key) else {
                continue;
            };
            let Some(spawn) = self.spawns.get_mut(&task.spawn_id) else {
                warn!(spawn = %task.spawn_id, "respawn for unknown spawn dropped");
                continue;
            };
            let ctx = SpawnContext {
                ids: &self.ids,
                rules: self.rules,
                now,
            };
            if let Some(npc) = spawn.run_respawn_task(task.npc, &ctx, &mut self.rng) {
                respawned.push(npc);
            }
        }
        for npc in respawned {
            report.respawned.push(npc.object_id());
            self.register_npc(npc);
        }
        report
    }

    fn register_npc(&mut self, npc: Npc) {
        let object_id = npc.object_id();
        self.creatures.insert(object_id, Arc::clone(npc.creature()));
        self.npcs.insert(object_id, npc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::buff_info::BuffInfo;
    use crate::entities::creature::CreatureKind;
    use crate::entities::npc::NpcType;
    use crate::entities::skills::{Skill, SkillBuffType};
    use crate::world::position::Location;
    use rand::SeedableRng;

    fn world_with_spawn(amount: i32, delay: i32) -> World {
        let clock = GameClock::new(Duration::from_millis(100));
        let mut world = World::new(clock, GameRules::default(), StdRng::seed_from_u64(11));
        let template = Arc::new(NpcTemplate::new(20120, "Wolf", NpcType::Monster, 5));
        world.npc_templates.insert(template.id, Arc::clone(&template));
        let mut spawn = Spawn::new(SpawnId(1), template);
        spawn.set_location(Location::new(100, 200, -30).with_heading(-1));
        spawn.set_amount(amount);
        spawn.set_respawn_delay(delay, 0);
        world.add_spawn(spawn);
        world
    }

    #[test]
    fn spawn_all_registers_npcs() {
        let mut world = world_with_spawn(3, 30);
        assert_eq!(world.spawn_all(), 3);
        assert_eq!(world.npc_count(), 3);
        assert_eq!(world.creature_count(), 3);
        let spawn = world.spawn(SpawnId(1)).expect("spawn");
        for object_id in spawn.get_spawned_npcs() {
            assert!(world.get_creature(*object_id).is_some());
        }
    }

    #[test]
    fn killed_npc_respawns_after_delay() {
        let mut world = world_with_spawn(1, 10);
        world.spawn_all();
        let victim = world.spawn(SpawnId(1)).and_then(Spawn::get_last_spawn).expect("npc");

        assert!(world.kill_npc(victim));
        assert!(!world.kill_npc(victim));
        assert!(world.get_creature(victim).is_none());
        assert_eq!(world.pending_respawn_count(), 1);

        // 10 seconds at 100ms per tick.
        for _ in 0..99 {
            assert!(world.step().respawned.is_empty());
        }
        let report = world.step();
        assert_eq!(report.respawned.len(), 1);
        let revived = report.respawned[0];
        assert_ne!(revived, victim);
        let creature = world.get_creature(revived).expect("revived creature");
        assert!(!creature.lock().dead);
        assert_eq!(world.spawn(SpawnId(1)).expect("spawn").current_count(), 1);
    }

    #[test]
    fn no_respawn_without_delay() {
        let mut world = world_with_spawn(1, 0);
        world.spawn_all();
        let victim = world.spawn(SpawnId(1)).and_then(Spawn::get_last_spawn).expect("npc");
        assert!(world.kill_npc(victim));
        assert_eq!(world.pending_respawn_count(), 0);
        assert_eq!(world.spawn(SpawnId(1)).expect("spawn").current_count(), 0);
    }

    #[test]
    fn delete_last_npc_removes_from_world() {
        let mut world = world_with_spawn(2, 30);
        world.spawn_all();
        let last = world.delete_last_npc(SpawnId(1)).expect("deleted");
        assert!(world.get_npc(last).is_none());
        assert_eq!(world.npc_count(), 1);
        assert_eq!(world.pending_respawn_count(), 0);
        assert_eq!(world.delete_last_npc(SpawnId(9)), None);
    }

    #[test]
    fn tick_expires_effects_on_all_creatures() {
        let mut world = world_with_spawn(0, 0);
        let handle = world.add_creature(Creature::new(
            ObjectId(5),
            "Hero",
            CreatureKind::Player,
            40,
            GameRules::default(),
        ));
        let mut skill = Skill::new(1204, 2, "Wind Walk");
        skill.buff_type = SkillBuffType::Buff;
        skill.abnormal_time = 1;
        let info = BuffInfo::from_skill(Arc::new(skill), None, ObjectId(5), world.clock());
        handle.lock().add_effect(info, world.now()).expect("add");

        let mut expired = 0;
        let mut events = Vec::new();
        for _ in 0..10 {
            let report = world.step();
            expired += report.expired_effects;
            events.extend(report.events);
        }
        assert_eq!(expired, 1);
        assert!(!handle.lock().effects().is_affected_by_skill(1204));
        assert!(events.iter().any(|(owner, event)| *owner == ObjectId(5)
            && matches!(event, EffectListEvent::BuffEnded { skill_id: 1204, .. })));
        assert!(handle.lock().drain_events().is_empty());
    }
}
