use crate::scripting::stats_set::{ParamError, StatsSet};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryType {
    FighterGroup,
    MageGroup,
    WizardGroup,
    ClericGroup,
    AttackerGroup,
    TankerGroup,
    HealerGroup,
    EnchanterGroup,
    SummonerGroup,
    ArcherGroup,
    FirstClassGroup,
    SecondClassGroup,
    ThirdClassGroup,
    FourthClassGroup,
    AwakenGroup,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("unknown condition handler '{0}'")]
    UnknownHandler(String),
    #[error("condition '{name}': {source}")]
    Params {
        name: String,
        #[source]
        source: ParamError,
    },
}

/// What a condition is allowed to look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSubject {
    pub level: u32,
    pub is_player: bool,
    pub categories: BTreeSet<CategoryType>,
}

pub trait Condition: Send + Sync + fmt::Debug {
    fn test(&self, subject: &ConditionSubject) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLevelCondition {
    min_level: u32,
    max_level: u32,
}

impl PlayerLevelCondition {
    pub fn new(min_level: u32, max_level: u32) -> Self {
        Self {
            min_level,
            max_level,
        }
    }

    pub fn from_params(params: &StatsSet) -> Result<Self, ParamError> {
        let min_level = params.get_int("minLevel")?.max(0) as u32;
        let max_level = params.get_int("maxLevel")?.max(0) as u32;
        Ok(Self::new(min_level, max_level))
    }
}

impl Condition for PlayerLevelCondition {
    fn test(&self, subject: &ConditionSubject) -> bool {
        subject.is_player && subject.level >= self.min_level && subject.level < self.max_level
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTypeCondition {
    categories: Vec<CategoryType>,
}

impl CategoryTypeCondition {
    pub fn new(categories: Vec<CategoryType>) -> Self {
        Self { categories }
    }

    pub fn from_params(params: &StatsSet) -> Result<Self, ParamError> {
        Ok(Self::new(params.get_enum_list("category")?))
    }
}

impl Condition for CategoryTypeCondition {
    fn test(&self, subject: &ConditionSubject) -> bool {
        self.categories
            .iter()
            .any(|category| subject.categories.contains(category))
    }
}

type ConditionFactory = fn(&StatsSet) -> Result<Arc<dyn Condition>, ParamError>;

/// Builds conditions from their data-file name and parameters.
#[derive(Clone)]
pub struct ConditionRegistry {
    factories: HashMap<String, ConditionFactory>,
}

impl ConditionRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register("PlayerLevel", |params| {
            Ok(Arc::new(PlayerLevelCondition::from_params(params)?) as Arc<dyn Condition>)
        });
        registry.register("CategoryType", |params| {
            Ok(Arc::new(CategoryTypeCondition::from_params(params)?) as Arc<dyn Condition>)
        });
        registry
    }

    pub fn register(&mut self, name: &str, factory: ConditionFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn create(
        &self,
        name: &str,
        params: &StatsSet,
    ) -> Result<Arc<dyn Condition>, ConditionError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConditionError::UnknownHandler(name.to_string()))?;
        factory(params).map_err(|source| ConditionError::Params {
            name: name.to_string(),
            source,
        })
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ConditionRegistry").field("handlers", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(level: u32) -> ConditionSubject {
        ConditionSubject {
            level,
            is_player: true,
            categories: BTreeSet::new(),
        }
    }

    #[test]
    fn player_level_range_is_half_open() {
        let condition = PlayerLevelCondition::new(40, 76);
        assert!(!condition.test(&player(39)));
        assert!(condition.test(&player(40)));
        assert!(condition.test(&player(75)));
        assert!(!condition.test(&player(76)));
    }

    #[test]
    fn player_level_rejects_npcs() {
        let condition = PlayerLevelCondition::new(1, 100);
        let npc = ConditionSubject {
            level: 50,
            ..ConditionSubject::default()
        };
        assert!(!condition.test(&npc));
    }

    #[test]
    fn category_condition_matches_any_listed_category() {
        let condition =
            CategoryTypeCondition::new(vec![CategoryType::MageGroup, CategoryType::HealerGroup]);
        let mut subject = player(80);
        assert!(!condition.test(&subject));
        subject.categories.insert(CategoryType::HealerGroup);
        assert!(condition.test(&subject));
    }

    #[test]
    fn registry_builds_default_handlers() {
        let registry = ConditionRegistry::with_defaults();
        assert_eq!(registry.len(), 2);

        let params = StatsSet::new().with("minLevel", 20).with("maxLevel", 40);
        let condition = registry.create("PlayerLevel", &params).expect("condition");
        assert!(condition.test(&player(30)));

        let params = StatsSet::new().with("category", "FIGHTER_GROUP;ARCHER_GROUP");
        let condition = registry.create("CategoryType", &params).expect("condition");
        let mut subject = player(30);
        subject.categories.insert(CategoryType::ArcherGroup);
        assert!(condition.test(&subject));
    }

    #[test]
    fn registry_reports_unknown_and_bad_params() {
        let registry = ConditionRegistry::with_defaults();
        assert_eq!(
            registry.create("Weather", &StatsSet::new()).unwrap_err(),
            ConditionError::UnknownHandler("Weather".to_string())
        );
        let err = registry
            .create("PlayerLevel", &StatsSet::new().with("minLevel", 1))
            .unwrap_err();
        assert!(matches!(err, ConditionError::Params { .. }));
    }
}
