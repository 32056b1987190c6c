use crate::config::GameRules;
use crate::entities::abnormal::{AbnormalType, AbnormalVisualEffect};
use crate::entities::buff_info::{BuffId, BuffInfo};
use crate::entities::skills::{Skill, SkillBuffType, SkillEffect};
use crate::world::id_factory::ObjectId;
use crate::world::time::GameTick;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EffectListError {
    #[error("passive skill {skill_id} cannot enter an effect list")]
    PassiveSkill { skill_id: i32 },
}

/// Snapshot of the creature owning an effect list, taken under its lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectOwner {
    pub object_id: ObjectId,
    pub is_player: bool,
    pub is_summon: bool,
    pub in_party: bool,
    pub is_dead: bool,
    pub is_online: bool,
    pub debuff_blocked: bool,
    pub buff_blocked: bool,
    pub face_off: bool,
    pub attacker_object_id: Option<ObjectId>,
    pub max_buff_count: usize,
    pub max_triggered_buffs: usize,
    pub max_dances: usize,
    pub max_debuffs: usize,
    pub now: GameTick,
}

impl EffectOwner {
    pub fn with_rules(object_id: ObjectId, rules: &GameRules) -> Self {
        Self {
            object_id,
            is_player: false,
            is_summon: false,
            in_party: false,
            is_dead: false,
            is_online: true,
            debuff_blocked: false,
            buff_blocked: false,
            face_off: false,
            attacker_object_id: None,
            max_buff_count: rules.buffs_max_amount as usize,
            max_triggered_buffs: rules.triggered_buffs_max_amount as usize,
            max_dances: rules.dances_max_amount as usize,
            max_debuffs: rules.debuffs_max_amount as usize,
            now: GameTick(0),
        }
    }
}

impl Default for EffectOwner {
    fn default() -> Self {
        Self::with_rules(ObjectId(0), &GameRules::default())
    }
}

/// One icon as shown on a buff bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectIcon {
    pub buff_id: BuffId,
    pub skill_id: i32,
    pub level: i32,
    pub sub_level: i32,
    pub remaining_ticks: Option<u64>,
}

impl EffectIcon {
    fn of(info: &BuffInfo, skill: &Skill, now: GameTick) -> Self {
        Self {
            buff_id: info.id(),
            skill_id: skill.id,
            level: skill.level,
            sub_level: skill.sub_level,
            remaining_ticks: info.remaining_ticks(now),
        }
    }
}

/// Client-facing notifications queued by the effect list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectListEvent {
    /// Healing potion slot of a player. `None` resets it.
    ShortBuff(Option<EffectIcon>),
    /// The owner's own buff bar.
    AbnormalStatus(Vec<EffectIcon>),
    /// Party members' (or a summon owner's) view of the owner.
    PartySpelled {
        object_id: ObjectId,
        icons: Vec<EffectIcon>,
    },
    /// Anyone targeting the owner.
    TargetAbnormalStatus {
        object_id: ObjectId,
        icons: Vec<EffectIcon>,
    },
    VisualEffects(BTreeSet<AbnormalVisualEffect>),
    /// A buff ran out on its own.
    BuffEnded { buff_id: BuffId, skill_id: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Dead,
    BlockedAbnormal,
    DebuffBlocked,
    FaceOff,
    BuffBlocked,
    Overridden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added(BuffId),
    AddedHidden(BuffId),
    OptionAdded(BuffId),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbnormalTimeMode {
    /// Shifts the remaining time by this many ticks.
    Diff(i64),
    /// Restarts matching debuffs at their full abnormal time.
    Debuff,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counters {
    buffs: usize,
    triggers: usize,
    dances: usize,
    toggles: usize,
    debuffs: usize,
    hidden: usize,
    removed_on_action: usize,
    removed_on_damage: usize,
}

impl Counters {
    fn track(&mut self, info: &BuffInfo, skill: &Skill, increase: bool) {
        fn step(counter: &mut usize, increase: bool) {
            if increase {
                *counter += 1;
            } else {
                *counter = counter.saturating_sub(1);
            }
        }

        if !info.is_in_use() {
            step(&mut self.hidden, increase);
        }
        if skill.removed_on_any_action_except_move {
            step(&mut self.removed_on_action, increase);
        }
        if skill.removed_on_damage {
            step(&mut self.removed_on_damage, increase);
        }
        match skill.buff_type {
            SkillBuffType::Trigger => step(&mut self.triggers, increase),
            SkillBuffType::Dance => step(&mut self.dances, increase),
            SkillBuffType::Toggle => step(&mut self.toggles, increase),
            SkillBuffType::Debuff => step(&mut self.debuffs, increase),
            SkillBuffType::Buff => step(&mut self.buffs, increase),
            SkillBuffType::None => {}
        }
    }
}

/// Every effect currently affecting one creature.
#[derive(Debug, Clone, Default)]
pub struct EffectList {
    actives: Vec<BuffInfo>,
    options: Vec<BuffInfo>,
    stacked_effects: BTreeSet<AbnormalType>,
    blocked_abnormal_types: BTreeSet<AbnormalType>,
    abnormal_visual_effects: BTreeSet<AbnormalVisualEffect>,
    short_buff: Option<BuffId>,
    counters: Counters,
    events: Vec<EffectListEvent>,
    stats_requested: bool,
}

impl EffectList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_options(&self) -> &[BuffInfo] {
        &self.options
    }

    /// Active effects, oldest first.
    pub fn get_effects(&self) -> &[BuffInfo] {
        &self.actives
    }

    pub fn get_buffs(&self) -> Vec<&BuffInfo> {
        self.actives
            .iter()
            .filter(|info| info.skill().map(|skill| skill.is_buff()).unwrap_or(false))
            .collect()
    }

    pub fn get_debuffs(&self) -> Vec<&BuffInfo> {
        self.actives
            .iter()
            .filter(|info| info.skill().map(|skill| skill.is_debuff()).unwrap_or(false))
            .collect()
    }

    pub fn get(&self, id: BuffId) -> Option<&BuffInfo> {
        self.actives
            .iter()
            .chain(self.options.iter())
            .find(|info| info.id() == id)
    }

    pub fn is_affected_by_skill(&self, skill_id: i32) -> bool {
        self.get_buff_info_by_skill_id(skill_id).is_some()
    }

    pub fn get_buff_info_by_skill_id(&self, skill_id: i32) -> Option<&BuffInfo> {
        self.actives
            .iter()
            .find(|info| info.skill_id() == Some(skill_id))
    }

    pub fn has_abnormal_type(&self, abnormal_type: AbnormalType) -> bool {
        self.stacked_effects.contains(&abnormal_type)
    }

    pub fn has_any_abnormal_type(&self, types: &[AbnormalType]) -> bool {
        types.iter().any(|ty| self.stacked_effects.contains(ty))
    }

    pub fn has_abnormal_type_matching<F>(&self, abnormal_type: AbnormalType, filter: F) -> bool
    where
        F: Fn(&BuffInfo) -> bool,
    {
        self.has_abnormal_type(abnormal_type)
            && self
                .actives
                .iter()
                .filter(|info| info.is_abnormal_type(abnormal_type))
                .any(|info| filter(info))
    }

    pub fn get_first_buff_info_by_abnormal_type(
        &self,
        abnormal_type: AbnormalType,
    ) -> Option<&BuffInfo> {
        if !self.has_abnormal_type(abnormal_type) {
            return None;
        }
        self.actives
            .iter()
            .find(|info| info.is_abnormal_type(abnormal_type))
    }

    pub fn add_blocked_abnormal_types<I>(&mut self, types: I)
    where
        I: IntoIterator<Item = AbnormalType>,
    {
        self.blocked_abnormal_types.extend(types);
    }

    /// Returns whether anything was unblocked.
    pub fn remove_blocked_abnormal_types<I>(&mut self, types: I) -> bool
    where
        I: IntoIterator<Item = AbnormalType>,
    {
        let mut changed = false;
        for ty in types {
            changed |= self.blocked_abnormal_types.remove(&ty);
        }
        changed
    }

    pub fn get_blocked_abnormal_types(&self) -> &BTreeSet<AbnormalType> {
        &self.blocked_abnormal_types
    }

    pub fn get_short_buff(&self) -> Option<BuffId> {
        self.short_buff
    }

    pub fn short_buff_status_update(&mut self, buff: Option<BuffId>, owner: &EffectOwner) {
        if !owner.is_player {
            return;
        }
        self.short_buff = buff;
        let icon = buff.and_then(|id| {
            let info = self.actives.iter().find(|info| info.id() == id)?;
            let skill = info.skill()?;
            Some(EffectIcon::of(info, skill, owner.now))
        });
        self.events.push(EffectListEvent::ShortBuff(icon));
    }

    /// Buffs not counting those hidden behind a herb or irreplaceable buff.
    pub fn get_buff_count(&self) -> usize {
        if self.actives.is_empty() {
            return 0;
        }
        self.counters.buffs.saturating_sub(self.counters.hidden)
    }

    pub fn get_dance_count(&self) -> usize {
        self.counters.dances
    }

    pub fn get_triggered_buff_count(&self) -> usize {
        self.counters.triggers
    }

    pub fn get_toggle_count(&self) -> usize {
        self.counters.toggles
    }

    pub fn get_debuff_count(&self) -> usize {
        self.counters.debuffs
    }

    pub fn get_hidden_buffs_count(&self) -> usize {
        self.counters.hidden
    }

    /// Continuous effects currently contributing to the owner's stats.
    pub fn applied_effects(&self) -> impl Iterator<Item = &SkillEffect> + '_ {
        self.actives
            .iter()
            .chain(self.options.iter())
            .filter(|info| info.is_in_use())
            .flat_map(|info| info.effects().iter())
    }

    pub fn drain_events(&mut self) -> Vec<EffectListEvent> {
        std::mem::take(&mut self.events)
    }

    /// True once after any change that requires the owner's stats to be rebuilt.
    pub fn take_stats_request(&mut self) -> bool {
        std::mem::replace(&mut self.stats_requested, false)
    }

    pub fn add(
        &mut self,
        info: BuffInfo,
        owner: &EffectOwner,
    ) -> Result<AddOutcome, EffectListError> {
        let outcome = match info.skill() {
            None => self.add_option(info),
            Some(skill) if skill.passive => {
                return Err(EffectListError::PassiveSkill { skill_id: skill.id });
            }
            Some(_) => self.add_active(info, owner),
        };
        self.update_effect_list(true, owner);
        Ok(outcome)
    }

    fn add_active(&mut self, mut info: BuffInfo, owner: &EffectOwner) -> AddOutcome {
        let Some(skill) = info.skill().cloned() else {
            return self.add_option(info);
        };

        if owner.is_dead {
            return AddOutcome::Rejected(RejectReason::Dead);
        }
        if self.blocked_abnormal_types.contains(&skill.abnormal_type) {
            return AddOutcome::Rejected(RejectReason::BlockedAbnormal);
        }

        if let Some(effector) = info.effector() {
            if skill.effect_point <= 0
                && skill.is_debuff()
                && (owner.debuff_blocked || (effector.is_gm && !effector.can_give_damage))
            {
                return AddOutcome::Rejected(RejectReason::DebuffBlocked);
            }
            if effector.is_player
                && owner.is_player
                && owner.face_off
                && owner.attacker_object_id != Some(effector.object_id)
            {
                return AddOutcome::Rejected(RejectReason::FaceOff);
            }
            if owner.buff_blocked && !skill.is_debuff() {
                return AddOutcome::Rejected(RejectReason::BuffBlocked);
            }
        }

        if self.has_abnormal_type(skill.abnormal_type) {
            let existing_ids: Vec<BuffId> = self.actives.iter().map(BuffInfo::id).collect();
            for existing_id in existing_ids {
                let Some(existing) = self.actives.iter().find(|b| b.id() == existing_id) else {
                    continue;
                };
                let Some(existing_skill) = existing.skill().cloned() else {
                    continue;
                };
                let same_group = if skill.abnormal_type.is_none() {
                    existing_skill.id == skill.id
                } else {
                    existing_skill.abnormal_type == skill.abnormal_type
                };
                if !same_group {
                    continue;
                }

                if !skill.subordination_abnormal_type.is_none()
                    && skill.subordination_abnormal_type
                        == existing_skill.subordination_abnormal_type
                {
                    let new_effector = info.effector_object_id();
                    let old_effector = existing.effector_object_id();
                    if new_effector == 0 || old_effector == 0 || new_effector != old_effector {
                        continue;
                    }
                }

                if skill.abnormal_level >= existing_skill.abnormal_level {
                    if (skill.abnormal_instant || existing_skill.irreplaceable_buff)
                        && skill.id != existing_skill.id
                    {
                        self.hide(existing_id);
                    } else {
                        self.remove(existing_id, true, false, false, owner);
                    }
                } else if skill.irreplaceable_buff {
                    info.set_in_use(false);
                } else {
                    debug!(
                        skill = %skill,
                        owner = %owner.object_id,
                        "abnormal overridden by stronger effect"
                    );
                    return AddOutcome::Rejected(RejectReason::Overridden);
                }
            }
        }

        self.counters.track(&info, &skill, true);

        if self.exceeded_limit(owner).is_some() && !skill.seven_signs {
            let existing_ids: Vec<BuffId> = self.actives.iter().map(BuffInfo::id).collect();
            for existing_id in existing_ids {
                let Some(existing) = self.actives.iter().find(|b| b.id() == existing_id) else {
                    continue;
                };
                let category = existing.skill().map(|s| s.buff_type).unwrap_or_default();
                if existing.is_in_use() && self.is_limit_exceeded(category, owner) {
                    debug!(
                        buff = %existing_id,
                        owner = %owner.object_id,
                        "evicting effect over category limit"
                    );
                    self.remove(existing_id, true, false, false, owner);
                }
                if self.exceeded_limit(owner).is_none() {
                    break;
                }
            }
        }

        let id = info.id();
        let in_use = info.is_in_use();
        self.start_effects(&info);
        self.actives.push(info);
        if in_use {
            AddOutcome::Added(id)
        } else {
            AddOutcome::AddedHidden(id)
        }
    }

    /// Replaces any earlier instance of the same option.
    pub fn add_option(&mut self, info: BuffInfo) -> AddOutcome {
        let Some(option_id) = info.option().map(|option| option.id) else {
            return AddOutcome::Rejected(RejectReason::Overridden);
        };
        let previous: Vec<BuffInfo> = {
            let (same, others): (Vec<_>, Vec<_>) = std::mem::take(&mut self.options)
                .into_iter()
                .partition(|b| b.option().map(|o| o.id) == Some(option_id));
            self.options = others;
            same
        };
        for mut old in previous {
            old.set_in_use(false);
            self.stop_effects_of(&old);
        }
        let id = info.id();
        self.start_effects(&info);
        self.options.push(info);
        AddOutcome::OptionAdded(id)
    }

    fn hide(&mut self, id: BuffId) {
        if let Some(existing) = self.actives.iter_mut().find(|b| b.id() == id) {
            if existing.is_in_use() {
                existing.set_in_use(false);
                self.counters.hidden += 1;
            }
        }
    }

    fn is_limit_exceeded(&self, category: SkillBuffType, owner: &EffectOwner) -> bool {
        match category {
            SkillBuffType::Trigger => self.get_triggered_buff_count() > owner.max_triggered_buffs,
            SkillBuffType::Dance => self.get_dance_count() > owner.max_dances,
            SkillBuffType::Debuff => self.get_debuff_count() > owner.max_debuffs,
            SkillBuffType::Buff => self.get_buff_count() > owner.max_buff_count,
            SkillBuffType::Toggle | SkillBuffType::None => false,
        }
    }

    fn exceeded_limit(&self, owner: &EffectOwner) -> Option<SkillBuffType> {
        [
            SkillBuffType::Trigger,
            SkillBuffType::Dance,
            SkillBuffType::Debuff,
            SkillBuffType::Buff,
        ]
        .into_iter()
        .find(|category| self.is_limit_exceeded(*category, owner))
    }

    fn start_effects(&mut self, info: &BuffInfo) {
        for effect in info.effects() {
            if let SkillEffect::BlockAbnormalSlot(types) = effect {
                self.blocked_abnormal_types.extend(types.iter().copied());
            }
        }
    }

    fn stop_effects_of(&mut self, info: &BuffInfo) {
        for effect in info.effects() {
            if let SkillEffect::BlockAbnormalSlot(types) = effect {
                self.remove_blocked_abnormal_types(types.iter().copied());
            }
        }
    }

    /// `removed` is false when the effect ended naturally.
    pub fn remove(
        &mut self,
        id: BuffId,
        removed: bool,
        update: bool,
        broadcast: bool,
        owner: &EffectOwner,
    ) -> bool {
        let found = if let Some(pos) = self.options.iter().position(|b| b.id() == id) {
            let info = self.options.remove(pos);
            self.remove_option(info);
            true
        } else if let Some(pos) = self.actives.iter().position(|b| b.id() == id) {
            let info = self.actives.remove(pos);
            self.remove_active(info, removed, owner);
            true
        } else {
            false
        };
        if found && update {
            self.update_effect_list(broadcast, owner);
        }
        found
    }

    fn remove_option(&mut self, info: BuffInfo) {
        self.stop_effects_of(&info);
        debug!(buff = %info.id(), "option removed");
    }

    fn remove_active(&mut self, info: BuffInfo, removed: bool, owner: &EffectOwner) {
        if self.short_buff == Some(info.id()) {
            self.short_buff_status_update(None, owner);
        }
        self.stop_effects_of(&info);
        if let Some(skill) = info.skill() {
            self.counters.track(&info, skill, false);
            if !removed {
                self.events.push(EffectListEvent::BuffEnded {
                    buff_id: info.id(),
                    skill_id: skill.id,
                });
            }
        }
        debug!(buff = %info.id(), removed, owner = %owner.object_id, "effect removed");
    }

    pub fn stop_effects<F>(&mut self, filter: F, update: bool, broadcast: bool, owner: &EffectOwner)
    where
        F: Fn(&BuffInfo) -> bool,
    {
        let ids: Vec<BuffId> = self
            .actives
            .iter()
            .filter(|info| filter(info))
            .map(BuffInfo::id)
            .collect();
        for id in ids {
            self.remove(id, true, false, false, owner);
        }
        if update {
            self.update_effect_list(broadcast, owner);
        }
    }

    pub fn stop_all_effects(&mut self, broadcast: bool, owner: &EffectOwner) {
        self.stop_effects(
            |info| skill_matches(info, |s| !s.necessary_toggle && !s.irreplaceable_buff),
            true,
            broadcast,
            owner,
        );
    }

    pub fn stop_all_effects_except_those_that_last_through_death(&mut self, owner: &EffectOwner) {
        self.stop_effects(
            |info| skill_matches(info, |s| !s.stay_after_death),
            true,
            true,
            owner,
        );
    }

    pub fn stop_all_toggles(&mut self, owner: &EffectOwner) {
        if self.get_toggle_count() > 0 {
            self.stop_effects(
                |info| {
                    skill_matches(info, |s| {
                        s.is_toggle() && !s.necessary_toggle && !s.irreplaceable_buff
                    })
                },
                true,
                true,
                owner,
            );
        }
    }

    pub fn stop_all_toggles_of_group(&mut self, group: i32, owner: &EffectOwner) {
        if self.get_toggle_count() > 0 {
            self.stop_effects(
                |info| skill_matches(info, |s| s.is_toggle() && s.toggle_group_id == group),
                true,
                true,
                owner,
            );
        }
    }

    pub fn stop_all_options(&mut self, update: bool, broadcast: bool, owner: &EffectOwner) {
        let ids: Vec<BuffId> = self.options.iter().map(BuffInfo::id).collect();
        for id in ids {
            self.remove(id, true, false, false, owner);
        }
        if update {
            self.update_effect_list(broadcast, owner);
        }
    }

    pub fn stop_skill_effects(&mut self, removed: bool, skill_id: i32, owner: &EffectOwner) {
        if let Some(id) = self.get_buff_info_by_skill_id(skill_id).map(BuffInfo::id) {
            self.remove(id, removed, true, true, owner);
        }
    }

    pub fn stop_skill_effects_for(&mut self, removed: bool, skill: &Skill, owner: &EffectOwner) {
        if self.has_abnormal_type(skill.abnormal_type) {
            self.stop_skill_effects(removed, skill.id, owner);
        }
    }

    pub fn stop_effects_of_type(
        &mut self,
        abnormal_type: AbnormalType,
        owner: &EffectOwner,
    ) -> bool {
        if !self.has_abnormal_type(abnormal_type) {
            return false;
        }
        self.stop_effects(|info| info.is_abnormal_type(abnormal_type), true, true, owner);
        true
    }

    pub fn stop_effects_of_types(&mut self, types: &[AbnormalType], owner: &EffectOwner) -> bool {
        if !self.has_any_abnormal_type(types) {
            return false;
        }
        self.stop_effects(
            |info| skill_matches(info, |s| types.contains(&s.abnormal_type)),
            true,
            true,
            owner,
        );
        true
    }

    pub fn stop_effects_on_action(&mut self, owner: &EffectOwner) {
        if self.counters.removed_on_action > 0 {
            self.stop_effects(
                |info| skill_matches(info, |s| s.removed_on_any_action_except_move),
                true,
                true,
                owner,
            );
        }
    }

    pub fn stop_effects_on_damage(&mut self, owner: &EffectOwner) {
        if self.counters.removed_on_damage > 0 {
            self.stop_effects(
                |info| skill_matches(info, |s| s.removed_on_damage),
                true,
                true,
                owner,
            );
        }
    }

    /// Ends every active effect whose time ran out. Returns how many ended.
    pub fn expire(&mut self, now: GameTick, owner: &EffectOwner) -> usize {
        let expired: Vec<BuffId> = self
            .actives
            .iter()
            .filter(|info| info.is_expired(now))
            .map(BuffInfo::id)
            .collect();
        for id in &expired {
            self.remove(*id, false, false, false, owner);
        }
        if !expired.is_empty() {
            self.update_effect_list(true, owner);
        }
        expired.len()
    }

    /// `slots` of `None` matches every abnormal type.
    pub fn change_abnormal_time(
        &mut self,
        slots: Option<&[AbnormalType]>,
        mode: AbnormalTimeMode,
        now: GameTick,
    ) -> usize {
        let matches_slot = |info: &BuffInfo| match slots {
            None => true,
            Some(slots) => info
                .skill()
                .map(|skill| slots.contains(&skill.abnormal_type))
                .unwrap_or(false),
        };

        let mut icons = Vec::new();
        for info in self.actives.iter_mut() {
            if !matches_slot(info) {
                continue;
            }
            let Some(skill) = info.skill().cloned() else {
                continue;
            };
            match mode {
                AbnormalTimeMode::Diff(delta) => {
                    let Some(remaining) = info.remaining_ticks(now) else {
                        continue;
                    };
                    let ticks = if delta >= 0 {
                        remaining.saturating_add(delta as u64)
                    } else {
                        remaining.saturating_sub(delta.unsigned_abs())
                    };
                    info.reset_abnormal_time(now, ticks);
                }
                AbnormalTimeMode::Debuff => {
                    if !skill.is_debuff() {
                        continue;
                    }
                    let Some(total) = info.abnormal_ticks() else {
                        continue;
                    };
                    info.reset_abnormal_time(now, total);
                }
            }
            icons.push(EffectIcon::of(info, &skill, now));
        }

        let changed = icons.len();
        self.events.push(EffectListEvent::AbnormalStatus(icons));
        changed
    }

    pub fn get_current_abnormal_visual_effects(&self) -> &BTreeSet<AbnormalVisualEffect> {
        &self.abnormal_visual_effects
    }

    pub fn has_abnormal_visual_effect(&self, ave: AbnormalVisualEffect) -> bool {
        self.abnormal_visual_effects.contains(&ave)
    }

    pub fn start_abnormal_visual_effect(&mut self, aves: &[AbnormalVisualEffect]) {
        self.abnormal_visual_effects.extend(aves.iter().copied());
        self.events
            .push(EffectListEvent::VisualEffects(self.abnormal_visual_effects.clone()));
    }

    pub fn stop_abnormal_visual_effect(&mut self, aves: &[AbnormalVisualEffect]) {
        for ave in aves {
            self.abnormal_visual_effects.remove(ave);
        }
        self.events
            .push(EffectListEvent::VisualEffects(self.abnormal_visual_effects.clone()));
    }

    pub fn update_effect_icons(&mut self, party_only: bool, owner: &EffectOwner) {
        let acting_player = owner.is_player || owner.is_summon;
        let own_bar = acting_player && owner.is_player && !party_only;
        let party_bar = acting_player && (owner.in_party || owner.is_summon);

        let mut potion = None;
        let mut own_icons = Vec::new();
        let mut party_icons = Vec::new();
        let mut target_icons = Vec::new();
        for info in self.actives.iter().filter(|info| info.is_in_use()) {
            let Some(skill) = info.skill() else {
                continue;
            };
            let icon = EffectIcon::of(info, skill, owner.now);
            if skill.healing_potion {
                if acting_player {
                    potion = Some(info.id());
                }
                continue;
            }
            if own_bar {
                own_icons.push(icon);
            }
            if party_bar && !skill.is_toggle() {
                party_icons.push(icon);
            }
            target_icons.push(icon);
        }

        if let Some(id) = potion {
            self.short_buff_status_update(Some(id), owner);
        }
        if own_bar {
            self.events.push(EffectListEvent::AbnormalStatus(own_icons));
        }
        if party_bar {
            self.events.push(EffectListEvent::PartySpelled {
                object_id: owner.object_id,
                icons: party_icons,
            });
        }
        self.events.push(EffectListEvent::TargetAbnormalStatus {
            object_id: owner.object_id,
            icons: target_icons,
        });
    }

    /// Rebuilds the abnormal and visual flags, unhides buffs whose blocker is
    /// gone and requests a stat rebuild.
    pub fn update_effect_list(&mut self, broadcast: bool, owner: &EffectOwner) {
        let mut abnormal_types = BTreeSet::new();
        let mut visual_effects = BTreeSet::new();
        let mut unhide: Vec<(BuffId, AbnormalType, i32)> = Vec::new();

        for info in &self.actives {
            let Some(skill) = info.skill() else {
                continue;
            };
            let ty = skill.abnormal_type;
            if self.counters.hidden > 0 && self.stacked_effects.contains(&ty) {
                if info.is_in_use() {
                    unhide.retain(|(_, hidden_ty, _)| *hidden_ty != ty);
                } else if !abnormal_types.contains(&ty) {
                    unhide.push((info.id(), ty, skill.abnormal_level));
                } else {
                    let before = unhide.len();
                    unhide.retain(|(_, hidden_ty, level)| {
                        !(*hidden_ty == ty && *level <= skill.abnormal_level)
                    });
                    if unhide.len() != before {
                        unhide.push((info.id(), ty, skill.abnormal_level));
                    }
                }
            }
            abnormal_types.insert(ty);
            visual_effects.extend(skill.abnormal_visual_effects.iter().copied());
        }

        self.stacked_effects = abnormal_types;

        for (id, _, _) in unhide {
            if let Some(info) = self.actives.iter_mut().find(|b| b.id() == id) {
                info.set_in_use(true);
                self.counters.hidden = self.counters.hidden.saturating_sub(1);
                debug!(buff = %id, owner = %owner.object_id, "hidden effect back in use");
            }
        }

        if !owner.is_player || owner.is_online {
            self.stats_requested = true;
        }

        if broadcast {
            if visual_effects != self.abnormal_visual_effects {
                self.abnormal_visual_effects = visual_effects;
                self.events
                    .push(EffectListEvent::VisualEffects(self.abnormal_visual_effects.clone()));
            }
            self.update_effect_icons(false, owner);
        }
    }
}

fn skill_matches(info: &BuffInfo, predicate: impl Fn(&Skill) -> bool) -> bool {
    info.skill().map(|skill| predicate(skill)).unwrap_or(false)
}
