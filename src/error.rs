use crate::combat::conditions::ConditionError;
use crate::combat::effect_list::EffectListError;
use crate::config::ConfigError;
use crate::telemetry::logging::LogError;
use crate::world::data::DataError;
use crate::world::spawn::SpawnError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LogError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    EffectList(#[from] EffectListError),
    #[error(transparent)]
    Condition(#[from] ConditionError),
    #[error("world loop stopped unexpectedly")]
    WorldLoop,
}
