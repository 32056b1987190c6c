use crate::config::GameRules;
use crate::entities::creature::{Creature, CreatureHandle, CreatureKind};
use crate::stats::DoubleStat;
use crate::world::id_factory::{IdFactory, ObjectId};
use crate::world::position::Location;
use crate::world::spawn::SpawnId;
use crate::world::time::GameTick;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum NpcType {
    #[default]
    Monster,
    Folk,
    Guard,
    RaidBoss,
    Pet,
    Decoy,
    Trap,
}

impl NpcType {
    /// Types that only exist bound to an owner and never spawn on their own.
    pub fn is_type_unspawnable(self) -> bool {
        matches!(self, NpcType::Pet | NpcType::Decoy | NpcType::Trap)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NpcTemplate {
    pub id: i32,
    pub name: String,
    #[serde(default, rename = "type")]
    pub npc_type: NpcType,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub dex: u32,
    #[serde(default)]
    pub base_stats: BTreeMap<DoubleStat, f64>,
    #[serde(default)]
    pub flying: bool,
}

fn default_level() -> u32 {
    1
}

impl NpcTemplate {
    pub fn new(id: i32, name: &str, npc_type: NpcType, level: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            npc_type,
            level,
            dex: 0,
            base_stats: BTreeMap::new(),
            flying: false,
        }
    }

    pub fn is_type_unspawnable(&self) -> bool {
        self.npc_type.is_type_unspawnable()
    }
}

/// A spawned (or spawnable) NPC. Its creature state is shared through the handle.
#[derive(Debug, Clone)]
pub struct Npc {
    object_id: ObjectId,
    creature: CreatureHandle,
    template: Arc<NpcTemplate>,
    pub spawn_id: Option<SpawnId>,
    pub instance_id: i32,
    pub location: Location,
    pub random_walking: bool,
    pub show_summon_animation: bool,
}

impl Npc {
    pub fn new(template: Arc<NpcTemplate>, ids: &IdFactory, rules: GameRules) -> Self {
        let object_id = ids.next();
        let mut creature = Creature::new(
            object_id,
            &template.name,
            CreatureKind::Npc,
            template.level,
            rules,
        );
        creature.dex = template.dex;
        creature.base_stats = template.base_stats.clone();
        creature.recalculate_stats();
        creature.restore_hp_mp();
        Self {
            object_id,
            creature: creature.handle(),
            template,
            spawn_id: None,
            instance_id: 0,
            location: Location::default(),
            random_walking: false,
            show_summon_animation: false,
        }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn creature(&self) -> &CreatureHandle {
        &self.creature
    }

    pub fn template(&self) -> &Arc<NpcTemplate> {
        &self.template
    }

    pub fn template_id(&self) -> i32 {
        self.template.id
    }

    pub fn is_flying(&self) -> bool {
        self.template.flying
    }

    pub fn is_dead(&self) -> bool {
        self.creature.lock().dead
    }

    /// Gives the NPC a fresh object id, as done before every respawn.
    pub fn refresh_id(&mut self, ids: &IdFactory) -> ObjectId {
        self.object_id = ids.next();
        self.creature.lock().object_id = self.object_id;
        self.object_id
    }

    pub fn on_respawn(&mut self, now: GameTick) {
        self.creature.lock().revive(now);
    }
}
