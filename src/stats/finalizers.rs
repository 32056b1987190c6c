use crate::stats::{DoubleStat, Equipment, FuncTemplate};
use std::collections::BTreeMap;

/// Everything a finalizer may read about the creature being calculated.
#[derive(Debug, Clone, Copy)]
pub struct StatContext<'a> {
    pub level: u32,
    pub dex: u32,
    pub is_player: bool,
    pub base_stats: &'a BTreeMap<DoubleStat, f64>,
    pub equipment: &'a Equipment,
    /// Condition-filtered functions of every stat, sorted by order.
    pub functions: &'a [FuncTemplate],
    pub max_evasion: f64,
}

pub trait StatFinalizer: Send + Sync {
    fn calc(&self, ctx: &StatContext<'_>, stat: DoubleStat) -> f64;

    fn calc_enchant_body_part_bonus(&self, _enchant_level: u32, _blessed: bool) -> f64 {
        0.0
    }

    fn calc_enchant_body_part(&self, ctx: &StatContext<'_>) -> f64 {
        if !ctx.is_player {
            return 0.0;
        }
        ctx.equipment
            .helm
            .map(|part| self.calc_enchant_body_part_bonus(part.enchant_level, part.blessed))
            .unwrap_or(0.0)
    }
}

pub fn calc_weapon_plus_base_value(ctx: &StatContext<'_>, stat: DoubleStat) -> f64 {
    let base = ctx.base_stats.get(&stat).copied().unwrap_or(0.0);
    base + ctx.equipment.weapon_bonus(stat)
}

/// Folds the function chain of `stat` over `base`.
pub fn default_value(ctx: &StatContext<'_>, stat: DoubleStat, base: f64) -> f64 {
    ctx.functions
        .iter()
        .filter(|func| func.stat() == stat)
        .fold(base, |value, func| func.apply(value))
}

pub fn validate_value(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BaseStatFinalizer;

impl StatFinalizer for BaseStatFinalizer {
    fn calc(&self, ctx: &StatContext<'_>, stat: DoubleStat) -> f64 {
        let base = calc_weapon_plus_base_value(ctx, stat);
        validate_value(default_value(ctx, stat, base), 0.0, f64::INFINITY)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PEvasionRateFinalizer;

impl StatFinalizer for PEvasionRateFinalizer {
    fn calc(&self, ctx: &StatContext<'_>, stat: DoubleStat) -> f64 {
        let mut base = calc_weapon_plus_base_value(ctx, stat);
        let level = ctx.level as f64;
        base += (ctx.dex as f64).sqrt() * 5.0 + level;

        if ctx.is_player {
            if ctx.level > 69 {
                base += level - 69.0;
            }
            if ctx.level > 77 {
                base += 1.0;
            }
            if ctx.level > 80 {
                base += 2.0;
            }
            if ctx.level > 87 {
                base += 2.0;
            }
            if ctx.level > 92 {
                base += 1.0;
            }
            if ctx.level > 97 {
                base += 1.0;
            }
            base += self.calc_enchant_body_part(ctx);
        } else if ctx.level > 69 {
            base += (level - 69.0) + 2.0;
        }

        validate_value(default_value(ctx, stat, base), f64::NEG_INFINITY, ctx.max_evasion)
    }

    fn calc_enchant_body_part_bonus(&self, enchant_level: u32, blessed: bool) -> f64 {
        let level = enchant_level as f64;
        let factor = if blessed { 0.3 } else { 0.2 };
        factor * (level - 3.0).max(0.0) + factor * (level - 6.0).max(0.0)
    }
}

static BASE: BaseStatFinalizer = BaseStatFinalizer;
static P_EVASION_RATE: PEvasionRateFinalizer = PEvasionRateFinalizer;

pub fn finalizer_for(stat: DoubleStat) -> &'static dyn StatFinalizer {
    match stat {
        DoubleStat::EvasionRate => &P_EVASION_RATE,
        _ => &BASE,
    }
}
