use crate::combat::conditions::{Condition, ConditionError, ConditionRegistry};
use crate::entities::abnormal::{AbnormalType, AbnormalVisualEffect};
use crate::entities::npc::NpcTemplate;
use crate::entities::skills::{Skill, SkillBuffType, SkillEffect};
use crate::scripting::stats_set::StatsSet;
use crate::stats::{BooleanStat, DoubleStat, FuncTemplate, StatFunction};
use crate::world::position::Location;
use crate::world::spawn::{Spawn, SpawnId, SpawnTerritory};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const NPCS_FILE: &str = "npcs.yaml";
pub const SKILLS_FILE: &str = "skills.yaml";
pub const SPAWNS_FILE: &str = "spawns.yaml";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{path}: spawn #{index} references unknown npc {npc_id}")]
    UnknownNpc { path: PathBuf, index: usize, npc_id: i32 },
    #[error("{path}: skill {skill_id}: unknown stat function '{name}'")]
    UnknownStatFunction { path: PathBuf, skill_id: i32, name: String },
    #[error("{path}: skill {skill_id}: {source}")]
    Condition {
        path: PathBuf,
        skill_id: i32,
        #[source]
        source: ConditionError,
    },
}

pub type NpcTemplates = HashMap<i32, Arc<NpcTemplate>>;
pub type SkillTable = BTreeMap<(i32, i32), Arc<Skill>>;

/// Everything loaded from a data root.
#[derive(Debug, Clone)]
pub struct GameData {
    pub npc_templates: NpcTemplates,
    pub skills: SkillTable,
    pub spawns: Vec<Spawn>,
}

impl GameData {
    pub fn load(root: &Path, conditions: &ConditionRegistry) -> Result<Self, DataError> {
        let npc_templates = load_npc_templates(&root.join(NPCS_FILE))?;
        let skills = load_skills(&root.join(SKILLS_FILE), conditions)?;
        let spawns = load_spawns(&root.join(SPAWNS_FILE), &npc_templates)?;
        info!(
            npcs = npc_templates.len(),
            skills = skills.len(),
            spawns = spawns.len(),
            "game data loaded"
        );
        Ok(Self {
            npc_templates,
            skills,
            spawns,
        })
    }
}

fn read_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T, DataError> {
    let content = fs::read_to_string(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&content).map_err(|source| DataError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_npc_templates(path: &Path) -> Result<NpcTemplates, DataError> {
    let records: Vec<NpcTemplate> = read_yaml(path)?;
    let mut templates = HashMap::with_capacity(records.len());
    for template in records {
        let id = template.id;
        if templates.insert(id, Arc::new(template)).is_some() {
            warn!(
                path = %path.display(),
                npc_id = id,
                "duplicate npc template, keeping the last one"
            );
        }
    }
    Ok(templates)
}

#[derive(Debug, Deserialize)]
struct SkillRecord {
    id: i32,
    #[serde(default = "first_level")]
    level: i32,
    #[serde(default)]
    sub_level: i32,
    name: String,
    #[serde(default)]
    abnormal_type: AbnormalType,
    #[serde(default)]
    subordination_abnormal_type: AbnormalType,
    #[serde(default)]
    abnormal_level: i32,
    #[serde(default)]
    abnormal_time: i32,
    #[serde(default)]
    buff_type: SkillBuffType,
    #[serde(default)]
    effect_point: i32,
    #[serde(default)]
    passive: bool,
    #[serde(default)]
    abnormal_instant: bool,
    #[serde(default)]
    irreplaceable_buff: bool,
    #[serde(default)]
    necessary_toggle: bool,
    #[serde(default = "no_toggle_group")]
    toggle_group_id: i32,
    #[serde(default)]
    stay_after_death: bool,
    #[serde(default)]
    removed_on_any_action_except_move: bool,
    #[serde(default)]
    removed_on_damage: bool,
    #[serde(default)]
    seven_signs: bool,
    #[serde(default)]
    healing_potion: bool,
    #[serde(default)]
    abnormal_visual_effects: Vec<AbnormalVisualEffect>,
    #[serde(default)]
    effects: Vec<EffectRecord>,
}

fn first_level() -> i32 {
    1
}

fn no_toggle_group() -> i32 {
    -1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EffectRecord {
    Stat(StatRecord),
    Flag(BooleanStat),
    BlockAbnormalSlot(Vec<AbnormalType>),
    AvoidSkill { magic_type: i32, amount: f64 },
}

#[derive(Debug, Deserialize)]
struct StatRecord {
    function: String,
    stat: DoubleStat,
    value: f64,
    #[serde(default = "default_order")]
    order: i32,
    #[serde(default)]
    attach_condition: Option<ConditionRecord>,
    #[serde(default)]
    apply_condition: Option<ConditionRecord>,
}

fn default_order() -> i32 {
    -1
}

#[derive(Debug, Deserialize)]
struct ConditionRecord {
    name: String,
    #[serde(default)]
    params: StatsSet,
}

type ConditionResult = Result<Option<Arc<dyn Condition>>, DataError>;

pub fn load_skills(path: &Path, conditions: &ConditionRegistry) -> Result<SkillTable, DataError> {
    let records: Vec<SkillRecord> = read_yaml(path)?;
    let mut skills = BTreeMap::new();
    for record in records {
        let skill = build_skill(path, record, conditions)?;
        let key = (skill.id, skill.level);
        if skills.insert(key, Arc::new(skill)).is_some() {
            warn!(
                path = %path.display(),
                skill_id = key.0,
                level = key.1,
                "duplicate skill, keeping the last one"
            );
        }
    }
    Ok(skills)
}

fn build_skill(
    path: &Path,
    record: SkillRecord,
    conditions: &ConditionRegistry,
) -> Result<Skill, DataError> {
    let skill_id = record.id;
    let effects = record
        .effects
        .into_iter()
        .map(|effect| build_effect(path, skill_id, effect, conditions))
        .collect::<Result<Vec<_>, _>>()?;

    let mut skill = Skill::new(record.id, record.level, &record.name);
    skill.sub_level = record.sub_level;
    skill.abnormal_type = record.abnormal_type;
    skill.subordination_abnormal_type = record.subordination_abnormal_type;
    skill.abnormal_level = record.abnormal_level;
    skill.abnormal_time = record.abnormal_time;
    skill.buff_type = record.buff_type;
    skill.effect_point = record.effect_point;
    skill.passive = record.passive;
    skill.abnormal_instant = record.abnormal_instant;
    skill.irreplaceable_buff = record.irreplaceable_buff;
    skill.necessary_toggle = record.necessary_toggle;
    skill.toggle_group_id = record.toggle_group_id;
    skill.stay_after_death = record.stay_after_death;
    skill.removed_on_any_action_except_move = record.removed_on_any_action_except_move;
    skill.removed_on_damage = record.removed_on_damage;
    skill.seven_signs = record.seven_signs;
    skill.healing_potion = record.healing_potion;
    skill.abnormal_visual_effects = record.abnormal_visual_effects;
    skill.effects = effects;
    Ok(skill)
}

fn build_effect(
    path: &Path,
    skill_id: i32,
    effect: EffectRecord,
    conditions: &ConditionRegistry,
) -> Result<SkillEffect, DataError> {
    Ok(match effect {
        EffectRecord::Stat(stat) => {
            let function = StatFunction::from_name(&stat.function).ok_or_else(|| {
                DataError::UnknownStatFunction {
                    path: path.to_path_buf(),
                    skill_id,
                    name: stat.function.clone(),
                }
            })?;
            let build = |record: Option<ConditionRecord>| -> ConditionResult {
                record
                    .map(|record| conditions.create(&record.name, &record.params))
                    .transpose()
                    .map_err(|source| DataError::Condition {
                        path: path.to_path_buf(),
                        skill_id,
                        source,
                    })
            };
            let attach = build(stat.attach_condition)?;
            let apply = build(stat.apply_condition)?;
            SkillEffect::Stat(FuncTemplate::new(
                attach, apply, function, stat.order, stat.stat, stat.value,
            ))
        }
        EffectRecord::Flag(flag) => SkillEffect::Flag(flag),
        EffectRecord::BlockAbnormalSlot(types) => SkillEffect::BlockAbnormalSlot(types),
        EffectRecord::AvoidSkill { magic_type, amount } => {
            SkillEffect::AvoidSkill { magic_type, amount }
        }
    })
}

#[derive(Debug, Deserialize)]
struct SpawnRecord {
    npc_id: i32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "single")]
    count: i32,
    #[serde(default)]
    respawn_delay: i32,
    #[serde(default)]
    respawn_random: i32,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    territory: Option<SpawnTerritory>,
    #[serde(default)]
    location_id: i32,
    #[serde(default)]
    instance_id: i32,
    #[serde(default)]
    random_walk: bool,
}

fn single() -> i32 {
    1
}

/// Spawn ids follow file order, starting at 1.
pub fn load_spawns(path: &Path, templates: &NpcTemplates) -> Result<Vec<Spawn>, DataError> {
    let records: Vec<SpawnRecord> = read_yaml(path)?;
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let template = templates.get(&record.npc_id).ok_or_else(|| DataError::UnknownNpc {
                path: path.to_path_buf(),
                index,
                npc_id: record.npc_id,
            })?;
            let mut spawn = Spawn::new(SpawnId(index as u32 + 1), Arc::clone(template));
            spawn.name = record.name;
            spawn.set_amount(record.count);
            spawn.set_respawn_delay(record.respawn_delay, record.respawn_random);
            if let Some(location) = record.location {
                spawn.set_location(location);
            } else {
                spawn.set_heading(-1);
            }
            spawn.set_spawn_template(record.territory);
            spawn.location_id = record.location_id;
            spawn.instance_id = record.instance_id;
            spawn.set_random_walking(record.random_walk);
            Ok(spawn)
        })
        .collect()
}
