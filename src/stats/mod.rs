//! Stat calculation pipeline.
//!
//! A stat value is produced in three stages: a finalizer computes the base
//! (template value, weapon bonus and the stat's own formula), the ordered
//! chain of stat functions collected from active effects is folded over it,
//! and the result is clamped to the stat's bounds.

pub mod creature;
pub mod finalizers;
pub mod functions;

pub use creature::{CreatureStat, Equipment, EnchantedPart, StatInputs};
pub use finalizers::{
    finalizer_for, BaseStatFinalizer, PEvasionRateFinalizer, StatContext, StatFinalizer,
};
pub use functions::FuncTemplate;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DoubleStat {
    MaxHp,
    MaxMp,
    PhysicalAttack,
    MagicAttack,
    PhysicalDefence,
    MagicalDefence,
    PhysicalAttackSpeed,
    MagicAttackSpeed,
    AccuracyCombat,
    EvasionRate,
    CriticalRate,
    RunSpeed,
    WeightLimit,
    BuffLimit,
}

impl DoubleStat {
    pub const ALL: [DoubleStat; 14] = [
        DoubleStat::MaxHp,
        DoubleStat::MaxMp,
        DoubleStat::PhysicalAttack,
        DoubleStat::MagicAttack,
        DoubleStat::PhysicalDefence,
        DoubleStat::MagicalDefence,
        DoubleStat::PhysicalAttackSpeed,
        DoubleStat::MagicAttackSpeed,
        DoubleStat::AccuracyCombat,
        DoubleStat::EvasionRate,
        DoubleStat::CriticalRate,
        DoubleStat::RunSpeed,
        DoubleStat::WeightLimit,
        DoubleStat::BuffLimit,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BooleanStat {
    FaceOff,
    BlockBuff,
    BlockDebuff,
}

/// How a stat function combines its value with the running stat value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatFunction {
    Set,
    Mul,
    Div,
    Add,
    Sub,
}

impl StatFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "set" => Some(StatFunction::Set),
            "mul" => Some(StatFunction::Mul),
            "div" => Some(StatFunction::Div),
            "add" => Some(StatFunction::Add),
            "sub" => Some(StatFunction::Sub),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StatFunction::Set => "Set",
            StatFunction::Mul => "Mul",
            StatFunction::Div => "Div",
            StatFunction::Add => "Add",
            StatFunction::Sub => "Sub",
        }
    }

    /// Lower orders run first.
    pub fn default_order(self) -> i32 {
        match self {
            StatFunction::Set => 0,
            StatFunction::Mul | StatFunction::Div => 20,
            StatFunction::Add | StatFunction::Sub => 30,
        }
    }

    pub fn apply(self, current: f64, value: f64) -> f64 {
        match self {
            StatFunction::Set => value,
            StatFunction::Mul => current * value,
            StatFunction::Div => {
                if value == 0.0 {
                    current
                } else {
                    current / value
                }
            }
            StatFunction::Add => current + value,
            StatFunction::Sub => current - value,
        }
    }
}
