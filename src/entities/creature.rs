use crate::combat::conditions::{CategoryType, ConditionSubject};
use crate::combat::effect_list::{
    AddOutcome, EffectList, EffectListError, EffectListEvent, EffectOwner,
};
use crate::config::GameRules;
use crate::entities::buff_info::{BuffId, BuffInfo, EffectorInfo};
use crate::stats::{BooleanStat, CreatureStat, DoubleStat, Equipment, StatInputs};
use crate::world::id_factory::ObjectId;
use crate::world::time::GameTick;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub type CreatureHandle = Arc<Mutex<Creature>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureKind {
    Player,
    Npc,
    Summon,
}

#[derive(Debug, Clone)]
pub struct Creature {
    pub object_id: ObjectId,
    pub name: String,
    pub kind: CreatureKind,
    pub level: u32,
    pub dex: u32,
    pub base_stats: BTreeMap<DoubleStat, f64>,
    pub equipment: Equipment,
    pub dead: bool,
    pub online: bool,
    pub in_party: bool,
    pub gm: bool,
    pub can_give_damage: bool,
    pub attacker_object_id: Option<ObjectId>,
    pub categories: BTreeSet<CategoryType>,
    pub current_hp: f64,
    pub current_mp: f64,
    rules: GameRules,
    effects: EffectList,
    stat: CreatureStat,
    events: Vec<EffectListEvent>,
}

impl Creature {
    pub fn new(
        object_id: ObjectId,
        name: &str,
        kind: CreatureKind,
        level: u32,
        rules: GameRules,
    ) -> Self {
        let mut creature = Self {
            object_id,
            name: name.to_string(),
            kind,
            level,
            dex: 0,
            base_stats: BTreeMap::new(),
            equipment: Equipment::default(),
            dead: false,
            online: true,
            in_party: false,
            gm: false,
            can_give_damage: true,
            attacker_object_id: None,
            categories: BTreeSet::new(),
            current_hp: 0.0,
            current_mp: 0.0,
            rules,
            effects: EffectList::new(),
            stat: CreatureStat::new(),
            events: Vec::new(),
        };
        creature.recalculate_stats();
        creature
    }

    pub fn handle(self) -> CreatureHandle {
        Arc::new(Mutex::new(self))
    }

    pub fn is_player(&self) -> bool {
        self.kind == CreatureKind::Player
    }

    pub fn effects(&self) -> &EffectList {
        &self.effects
    }

    pub fn stat(&self) -> &CreatureStat {
        &self.stat
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn condition_subject(&self) -> ConditionSubject {
        ConditionSubject {
            level: self.level,
            is_player: self.is_player(),
            categories: self.categories.clone(),
        }
    }

    pub fn effector_info(&self) -> EffectorInfo {
        EffectorInfo {
            object_id: self.object_id,
            is_player: self.is_player(),
            is_gm: self.gm,
            can_give_damage: self.can_give_damage,
        }
    }

    pub fn effect_owner(&self, now: GameTick) -> EffectOwner {
        EffectOwner {
            object_id: self.object_id,
            is_player: self.is_player(),
            is_summon: self.kind == CreatureKind::Summon,
            in_party: self.in_party,
            is_dead: self.dead,
            is_online: self.online,
            debuff_blocked: self.stat.has(BooleanStat::BlockDebuff),
            buff_blocked: self.stat.has(BooleanStat::BlockBuff),
            face_off: self.stat.has(BooleanStat::FaceOff),
            attacker_object_id: self.attacker_object_id,
            max_buff_count: self.stat.get_max_buff_count(),
            max_triggered_buffs: self.rules.triggered_buffs_max_amount as usize,
            max_dances: self.rules.dances_max_amount as usize,
            max_debuffs: self.rules.debuffs_max_amount as usize,
            now,
        }
    }

    pub fn recalculate_stats(&mut self) {
        let subject = self.condition_subject();
        let inputs = StatInputs {
            subject: &subject,
            dex: self.dex,
            base_stats: &self.base_stats,
            equipment: &self.equipment,
        };
        self.stat.recalculate(&self.effects, &inputs, &self.rules);
    }

    pub fn restore_hp_mp(&mut self) {
        self.current_hp = self.stat.get_value(DoubleStat::MaxHp);
        self.current_mp = self.stat.get_value(DoubleStat::MaxMp);
    }

    pub fn add_effect(
        &mut self,
        info: BuffInfo,
        now: GameTick,
    ) -> Result<AddOutcome, EffectListError> {
        let owner = self.effect_owner(now);
        let outcome = self.effects.add(info, &owner);
        self.sync_effects();
        outcome
    }

    pub fn remove_effect(&mut self, id: BuffId, removed: bool, now: GameTick) -> bool {
        let owner = self.effect_owner(now);
        let found = self.effects.remove(id, removed, true, true, &owner);
        self.sync_effects();
        found
    }

    pub fn stop_effects_on_action(&mut self, now: GameTick) {
        let owner = self.effect_owner(now);
        self.effects.stop_effects_on_action(&owner);
        self.sync_effects();
    }

    pub fn stop_effects_on_damage(&mut self, now: GameTick) {
        let owner = self.effect_owner(now);
        self.effects.stop_effects_on_damage(&owner);
        self.sync_effects();
    }

    /// Runs `f` against the effect list with a fresh owner snapshot.
    pub fn with_effects<T>(
        &mut self,
        now: GameTick,
        f: impl FnOnce(&mut EffectList, &EffectOwner) -> T,
    ) -> T {
        let owner = self.effect_owner(now);
        let result = f(&mut self.effects, &owner);
        self.sync_effects();
        result
    }

    pub fn expire_effects(&mut self, now: GameTick) -> usize {
        let owner = self.effect_owner(now);
        let expired = self.effects.expire(now, &owner);
        self.sync_effects();
        expired
    }

    pub fn kill(&mut self, now: GameTick) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.current_hp = 0.0;
        let owner = self.effect_owner(now);
        self.effects
            .stop_all_effects_except_those_that_last_through_death(&owner);
        self.sync_effects();
    }

    /// Clears death state and refills HP and MP. Effects are stopped except
    /// necessary toggles and irreplaceable buffs.
    pub fn revive(&mut self, now: GameTick) {
        self.dead = false;
        self.attacker_object_id = None;
        let owner = self.effect_owner(now);
        self.effects.stop_all_effects(false, &owner);
        self.sync_effects();
        self.restore_hp_mp();
    }

    pub fn drain_events(&mut self) -> Vec<EffectListEvent> {
        std::mem::take(&mut self.events)
    }

    fn sync_effects(&mut self) {
        if self.effects.take_stats_request() {
            self.recalculate_stats();
        }
        self.events.extend(self.effects.drain_events());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::abnormal::AbnormalType;
    use crate::entities::skills::{Skill, SkillBuffType, SkillEffect};
    use crate::stats::{FuncTemplate, StatFunction};
    use crate::world::time::GameClock;
    use std::time::Duration;

    fn player() -> Creature {
        let mut creature =
            Creature::new(ObjectId(1), "Hero", CreatureKind::Player, 40, GameRules::default());
        creature.base_stats.insert(DoubleStat::MaxHp, 1000.0);
        creature.recalculate_stats();
        creature
    }

    fn skill_info(
        id: i32,
        buff_type: SkillBuffType,
        effects: Vec<SkillEffect>,
        effector: Option<EffectorInfo>,
    ) -> BuffInfo {
        let mut skill = Skill::new(id, 1, "test");
        skill.buff_type = buff_type;
        skill.abnormal_type = AbnormalType::None;
        skill.abnormal_time = 30;
        skill.effects = effects;
        let clock = GameClock::new(Duration::from_secs(1));
        BuffInfo::from_skill(Arc::new(skill), effector, ObjectId(1), &clock)
    }

    #[test]
    fn adding_a_buff_recalculates_stats() {
        let mut creature = player();
        assert_eq!(creature.stat().get_value(DoubleStat::MaxHp), 1000.0);
        let info = skill_info(
            1,
            SkillBuffType::Buff,
            vec![SkillEffect::Stat(FuncTemplate::simple(
                StatFunction::Mul,
                DoubleStat::MaxHp,
                1.5,
            ))],
            None,
        );
        let id = match creature.add_effect(info, GameTick(0)).expect("add") {
            AddOutcome::Added(id) => id,
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(creature.stat().get_value(DoubleStat::MaxHp), 1500.0);
        assert!(!creature.drain_events().is_empty());

        assert!(creature.remove_effect(id, true, GameTick(1)));
        assert_eq!(creature.stat().get_value(DoubleStat::MaxHp), 1000.0);
    }

    #[test]
    fn block_debuff_flag_feeds_owner_snapshot() {
        let mut creature = player();
        let block = vec![SkillEffect::Flag(BooleanStat::BlockDebuff)];
        let shield = skill_info(1, SkillBuffType::Buff, block, None);
        creature.add_effect(shield, GameTick(0)).expect("add");
        assert!(creature.effect_owner(GameTick(0)).debuff_blocked);

        let attacker =
            Creature::new(ObjectId(2), "Orc", CreatureKind::Npc, 20, GameRules::default());
        let effector = Some(attacker.effector_info());
        let poison = skill_info(2, SkillBuffType::Debuff, Vec::new(), effector);
        assert!(matches!(
            creature.add_effect(poison, GameTick(0)).expect("add"),
            AddOutcome::Rejected(_)
        ));
    }

    #[test]
    fn kill_keeps_only_lasting_effects_and_revive_clears() {
        let mut creature = player();
        let mut lasting = Skill::new(5, 1, "lasting");
        lasting.buff_type = SkillBuffType::Buff;
        lasting.stay_after_death = true;
        let clock = GameClock::default();
        creature
            .add_effect(
                BuffInfo::from_skill(Arc::new(lasting), None, ObjectId(1), &clock),
                GameTick(0),
            )
            .expect("add");
        creature
            .add_effect(skill_info(6, SkillBuffType::Buff, Vec::new(), None), GameTick(0))
            .expect("add");

        creature.kill(GameTick(1));
        assert!(creature.dead);
        assert!(creature.effects().is_affected_by_skill(5));
        assert!(!creature.effects().is_affected_by_skill(6));

        creature.revive(GameTick(2));
        assert!(!creature.dead);
        assert!(creature.effects().get_effects().is_empty());
        assert_eq!(creature.current_hp, 1000.0);
    }

    #[test]
    fn revive_keeps_irreplaceable_buffs() {
        let clock = GameClock::default();
        let mut creature = player();
        for (id, irreplaceable) in [(7, true), (8, false)] {
            let mut skill = Skill::new(id, 1, "blessing");
            skill.buff_type = SkillBuffType::Buff;
            skill.stay_after_death = true;
            skill.irreplaceable_buff = irreplaceable;
            let info = BuffInfo::from_skill(Arc::new(skill), None, ObjectId(1), &clock);
            creature.add_effect(info, GameTick(0)).expect("add");
        }

        creature.kill(GameTick(1));
        creature.revive(GameTick(2));
        assert!(creature.effects().is_affected_by_skill(7));
        assert!(!creature.effects().is_affected_by_skill(8));
    }

    #[test]
    fn dead_creature_takes_no_effects() {
        let mut creature = player();
        creature.kill(GameTick(0));
        let info = skill_info(1, SkillBuffType::Buff, Vec::new(), None);
        assert!(matches!(
            creature.add_effect(info, GameTick(0)).expect("add"),
            AddOutcome::Rejected(_)
        ));
    }

    #[test]
    fn effects_expire_through_creature() {
        let mut creature = player();
        creature
            .add_effect(skill_info(1, SkillBuffType::Buff, Vec::new(), None), GameTick(0))
            .expect("add");
        assert_eq!(creature.expire_effects(GameTick(29)), 0);
        assert_eq!(creature.expire_effects(GameTick(30)), 1);
        assert!(creature
            .drain_events()
            .iter()
            .any(|event| matches!(event, EffectListEvent::BuffEnded { skill_id: 1, .. })));
    }

    #[test]
    fn with_effects_runs_against_snapshot() {
        let mut creature = player();
        creature
            .add_effect(skill_info(1, SkillBuffType::Toggle, Vec::new(), None), GameTick(0))
            .expect("add");
        creature.with_effects(GameTick(0), |effects, owner| effects.stop_all_toggles(owner));
        assert_eq!(creature.effects().get_toggle_count(), 0);
    }
}
