use crate::entities::abnormal::{AbnormalType, AbnormalVisualEffect};
use crate::stats::{BooleanStat, FuncTemplate};
use serde::Deserialize;
use std::fmt;

/// Which effect-list category a skill's abnormal is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillBuffType {
    Buff,
    Debuff,
    Dance,
    Toggle,
    Trigger,
    #[default]
    None,
}

/// A continuous effect a skill keeps up while its buff is in use.
#[derive(Debug, Clone)]
pub enum SkillEffect {
    Stat(FuncTemplate),
    Flag(BooleanStat),
    BlockAbnormalSlot(Vec<AbnormalType>),
    /// Evasion against skills of one magic type. The newest value wins.
    AvoidSkill { magic_type: i32, amount: f64 },
}

#[derive(Debug, Clone)]
pub struct Skill {
    pub id: i32,
    pub level: i32,
    pub sub_level: i32,
    pub name: String,
    pub abnormal_type: AbnormalType,
    pub subordination_abnormal_type: AbnormalType,
    pub abnormal_level: i32,
    /// Seconds; zero or less never expires.
    pub abnormal_time: i32,
    pub buff_type: SkillBuffType,
    pub effect_point: i32,
    pub passive: bool,
    pub abnormal_instant: bool,
    pub irreplaceable_buff: bool,
    pub necessary_toggle: bool,
    pub toggle_group_id: i32,
    pub stay_after_death: bool,
    pub removed_on_any_action_except_move: bool,
    pub removed_on_damage: bool,
    pub seven_signs: bool,
    pub healing_potion: bool,
    pub abnormal_visual_effects: Vec<AbnormalVisualEffect>,
    pub effects: Vec<SkillEffect>,
}

impl Skill {
    pub fn new(id: i32, level: i32, name: &str) -> Self {
        Self {
            id,
            level,
            sub_level: 0,
            name: name.to_string(),
            abnormal_type: AbnormalType::None,
            subordination_abnormal_type: AbnormalType::None,
            abnormal_level: 0,
            abnormal_time: 0,
            buff_type: SkillBuffType::None,
            effect_point: 0,
            passive: false,
            abnormal_instant: false,
            irreplaceable_buff: false,
            necessary_toggle: false,
            toggle_group_id: -1,
            stay_after_death: false,
            removed_on_any_action_except_move: false,
            removed_on_damage: false,
            seven_signs: false,
            healing_potion: false,
            abnormal_visual_effects: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn is_debuff(&self) -> bool {
        self.buff_type == SkillBuffType::Debuff
    }

    pub fn is_toggle(&self) -> bool {
        self.buff_type == SkillBuffType::Toggle
    }

    pub fn is_dance(&self) -> bool {
        self.buff_type == SkillBuffType::Dance
    }

    pub fn is_trigger(&self) -> bool {
        self.buff_type == SkillBuffType::Trigger
    }

    pub fn is_buff(&self) -> bool {
        self.buff_type == SkillBuffType::Buff
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    /// Abnormal types this skill blocks while in use.
    pub fn blocked_abnormal_types(&self) -> impl Iterator<Item = AbnormalType> + '_ {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                SkillEffect::BlockAbnormalSlot(types) => Some(types.iter().copied()),
                _ => None,
            })
            .flatten()
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.id, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_skill_has_no_abnormal() {
        let skill = Skill::new(1204, 2, "Wind Walk");
        assert!(skill.abnormal_type.is_none());
        assert!(!skill.is_debuff());
        assert!(!skill.is_toggle());
        assert_eq!(skill.toggle_group_id, -1);
        assert_eq!(skill.to_string(), "Wind Walk (1204/2)");
    }

    #[test]
    fn buff_type_predicates() {
        let mut skill = Skill::new(1, 1, "test");
        skill.buff_type = SkillBuffType::Debuff;
        assert!(skill.is_debuff());
        skill.buff_type = SkillBuffType::Toggle;
        assert!(skill.is_toggle());
        skill.buff_type = SkillBuffType::Dance;
        assert!(skill.is_dance());
        assert!(!skill.is_buff());
    }

    #[test]
    fn blocked_types_come_from_every_block_effect() {
        let mut skill = Skill::new(1, 1, "block");
        skill.effects = vec![
            SkillEffect::BlockAbnormalSlot(vec![AbnormalType::Stun]),
            SkillEffect::Flag(BooleanStat::BlockDebuff),
            SkillEffect::BlockAbnormalSlot(vec![AbnormalType::Sleep, AbnormalType::Root]),
        ];
        let blocked: Vec<_> = skill.blocked_abnormal_types().collect();
        assert_eq!(
            blocked,
            vec![AbnormalType::Stun, AbnormalType::Sleep, AbnormalType::Root]
        );
    }

    #[test]
    fn buff_types_parse_lowercase() {
        let ty: SkillBuffType = serde_yaml::from_str("dance").expect("parse");
        assert_eq!(ty, SkillBuffType::Dance);
    }
}
