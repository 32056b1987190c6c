use crate::combat::conditions::ConditionSubject;
use crate::combat::effect_list::EffectList;
use crate::config::GameRules;
use crate::entities::skills::SkillEffect;
use crate::stats::{finalizer_for, BooleanStat, DoubleStat, FuncTemplate, StatContext};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct EnchantedPart {
    pub enchant_level: u32,
    #[serde(default)]
    pub blessed: bool,
}

/// The equipment pieces stat formulas look at.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Equipment {
    pub weapon: BTreeMap<DoubleStat, f64>,
    pub helm: Option<EnchantedPart>,
}

impl Equipment {
    pub fn weapon_bonus(&self, stat: DoubleStat) -> f64 {
        self.weapon.get(&stat).copied().unwrap_or(0.0)
    }
}

/// The creature attributes a recalculation reads.
#[derive(Debug, Clone, Copy)]
pub struct StatInputs<'a> {
    pub subject: &'a ConditionSubject,
    pub dex: u32,
    pub base_stats: &'a BTreeMap<DoubleStat, f64>,
    pub equipment: &'a Equipment,
}

/// Calculated stats of one creature. Values are rebuilt as a whole from the
/// creature's effects whenever they change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatureStat {
    values: BTreeMap<DoubleStat, f64>,
    flags: BTreeSet<BooleanStat>,
    skill_evasion: BTreeMap<i32, f64>,
    max_buff_count: usize,
}

impl CreatureStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recalculate(
        &mut self,
        effects: &EffectList,
        inputs: &StatInputs<'_>,
        rules: &GameRules,
    ) {
        let mut functions: Vec<FuncTemplate> = Vec::new();
        let mut flags = BTreeSet::new();
        let mut skill_evasion = BTreeMap::new();

        for effect in effects.applied_effects() {
            match effect {
                SkillEffect::Stat(func) => {
                    if func.meet_condition(inputs.subject) {
                        functions.push(func.clone());
                    }
                }
                SkillEffect::Flag(flag) => {
                    flags.insert(*flag);
                }
                SkillEffect::AvoidSkill { magic_type, amount } => {
                    skill_evasion.insert(*magic_type, *amount);
                }
                SkillEffect::BlockAbnormalSlot(_) => {}
            }
        }
        functions.sort_by_key(FuncTemplate::order);

        let ctx = StatContext {
            level: inputs.subject.level,
            dex: inputs.dex,
            is_player: inputs.subject.is_player,
            base_stats: inputs.base_stats,
            equipment: inputs.equipment,
            functions: &functions,
            max_evasion: rules.max_evasion,
        };
        let values = DoubleStat::ALL
            .iter()
            .map(|stat| (*stat, finalizer_for(*stat).calc(&ctx, *stat)))
            .collect::<BTreeMap<_, _>>();

        let buff_limit = values.get(&DoubleStat::BuffLimit).copied().unwrap_or(0.0);
        self.max_buff_count = rules.buffs_max_amount as usize + buff_limit.max(0.0) as usize;
        self.values = values;
        self.flags = flags;
        self.skill_evasion = skill_evasion;
    }

    pub fn get_value(&self, stat: DoubleStat) -> f64 {
        self.values.get(&stat).copied().unwrap_or(0.0)
    }

    pub fn has(&self, flag: BooleanStat) -> bool {
        self.flags.contains(&flag)
    }

    pub fn get_skill_evasion_type_value(&self, magic_type: i32) -> f64 {
        self.skill_evasion.get(&magic_type).copied().unwrap_or(0.0)
    }

    pub fn get_max_buff_count(&self) -> usize {
        self.max_buff_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::conditions::{Condition, PlayerLevelCondition};
    use crate::combat::effect_list::EffectOwner;
    use crate::entities::buff_info::BuffInfo;
    use crate::entities::options::Options;
    use crate::entities::skills::{Skill, SkillBuffType};
    use crate::stats::StatFunction;
    use crate::world::id_factory::ObjectId;
    use crate::world::time::{GameClock, GameTick};
    use std::sync::Arc;

    fn owner() -> EffectOwner {
        EffectOwner {
            object_id: ObjectId(1),
            is_player: true,
            max_buff_count: 20,
            ..EffectOwner::default()
        }
    }

    fn buff(id: i32, effects: Vec<SkillEffect>) -> BuffInfo {
        let mut skill = Skill::new(id, 1, &format!("buff {id}"));
        skill.buff_type = SkillBuffType::Buff;
        skill.abnormal_time = 60;
        skill.effects = effects;
        BuffInfo::from_skill(Arc::new(skill), None, ObjectId(1), &GameClock::default())
    }

    fn subject(level: u32) -> ConditionSubject {
        ConditionSubject {
            level,
            is_player: true,
            ..ConditionSubject::default()
        }
    }

    #[test]
    fn functions_apply_in_order_across_effects() {
        let mut effects = EffectList::new();
        let owner = owner();
        effects
            .add(
                buff(1, vec![SkillEffect::Stat(FuncTemplate::simple(
                    StatFunction::Add,
                    DoubleStat::PhysicalAttack,
                    50.0,
                ))]),
                &owner,
            )
            .expect("add");
        effects
            .add(
                buff(2, vec![SkillEffect::Stat(FuncTemplate::simple(
                    StatFunction::Mul,
                    DoubleStat::PhysicalAttack,
                    2.0,
                ))]),
                &owner,
            )
            .expect("add");

        let mut base = BTreeMap::new();
        base.insert(DoubleStat::PhysicalAttack, 100.0);
        let subject = subject(50);
        let equipment = Equipment::default();
        let inputs = StatInputs {
            subject: &subject,
            dex: 30,
            base_stats: &base,
            equipment: &equipment,
        };
        let mut stat = CreatureStat::new();
        stat.recalculate(&effects, &inputs, &GameRules::default());
        // Mul runs before Add regardless of application order.
        assert_eq!(stat.get_value(DoubleStat::PhysicalAttack), 250.0);
    }

    #[test]
    fn conditioned_functions_are_skipped() {
        let cond: Arc<dyn Condition> = Arc::new(PlayerLevelCondition::new(76, 100));
        let func =
            FuncTemplate::new(None, Some(cond), StatFunction::Add, -1, DoubleStat::MaxHp, 500.0);
        let mut effects = EffectList::new();
        effects
            .add(buff(1, vec![SkillEffect::Stat(func)]), &owner())
            .expect("add");

        let base = BTreeMap::new();
        let equipment = Equipment::default();
        let low = subject(40);
        let mut stat = CreatureStat::new();
        stat.recalculate(
            &effects,
            &StatInputs {
                subject: &low,
                dex: 30,
                base_stats: &base,
                equipment: &equipment,
            },
            &GameRules::default(),
        );
        assert_eq!(stat.get_value(DoubleStat::MaxHp), 0.0);

        let high = subject(80);
        stat.recalculate(
            &effects,
            &StatInputs {
                subject: &high,
                dex: 30,
                base_stats: &base,
                equipment: &equipment,
            },
            &GameRules::default(),
        );
        assert_eq!(stat.get_value(DoubleStat::MaxHp), 500.0);
    }

    #[test]
    fn flags_avoid_skill_and_buff_limit() {
        let mut effects = EffectList::new();
        let owner = owner();
        effects
            .add(
                buff(
                    1,
                    vec![
                        SkillEffect::Flag(BooleanStat::BlockDebuff),
                        SkillEffect::AvoidSkill {
                            magic_type: 1,
                            amount: 20.0,
                        },
                    ],
                ),
                &owner,
            )
            .expect("add");
        effects
            .add(
                buff(
                    2,
                    vec![
                        SkillEffect::AvoidSkill {
                            magic_type: 1,
                            amount: 35.0,
                        },
                        SkillEffect::Stat(FuncTemplate::simple(
                            StatFunction::Add,
                            DoubleStat::BuffLimit,
                            4.0,
                        )),
                    ],
                ),
                &owner,
            )
            .expect("add");
        let option = Options::new(900, vec![SkillEffect::Flag(BooleanStat::FaceOff)]);
        effects
            .add(
                BuffInfo::from_option(Arc::new(option), ObjectId(1), GameTick(0)),
                &owner,
            )
            .expect("add option");

        let base = BTreeMap::new();
        let equipment = Equipment::default();
        let subject = subject(50);
        let mut stat = CreatureStat::new();
        stat.recalculate(
            &effects,
            &StatInputs {
                subject: &subject,
                dex: 30,
                base_stats: &base,
                equipment: &equipment,
            },
            &GameRules::default(),
        );
        assert!(stat.has(BooleanStat::BlockDebuff));
        assert!(stat.has(BooleanStat::FaceOff));
        assert!(!stat.has(BooleanStat::BlockBuff));
        assert_eq!(stat.get_skill_evasion_type_value(1), 35.0);
        assert_eq!(stat.get_skill_evasion_type_value(2), 0.0);
        assert_eq!(stat.get_max_buff_count(), 24);
    }
}
