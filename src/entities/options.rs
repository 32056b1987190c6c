use crate::entities::skills::SkillEffect;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// An augmentation option. Its effects apply while the option is attached.
#[derive(Debug, Clone)]
pub struct Options {
    pub id: i32,
    pub effects: Vec<SkillEffect>,
}

impl Options {
    pub fn new(id: i32, effects: Vec<SkillEffect>) -> Self {
        Self { id, effects }
    }
}

/// Weighted pool of options. Chances are percentages and may sum below 100.
#[derive(Debug, Clone, Default)]
pub struct OptionDataGroup {
    options: Vec<(Arc<Options>, f64)>,
}

impl OptionDataGroup {
    pub fn new(options: Vec<(Arc<Options>, f64)>) -> Self {
        Self { options }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn get_random_effect<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Arc<Options>> {
        let roll = rng.gen::<f64>() * 100.0;
        let mut cumulative = 0.0;
        for (options, chance) in &self.options {
            cumulative += chance;
            if cumulative > roll {
                return Some(Arc::clone(options));
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariationWeaponType {
    Warrior,
    Mage,
}

/// Life stone variation: two option slots per weapon type.
#[derive(Debug, Clone)]
pub struct Variation {
    mineral_id: i32,
    effects: HashMap<VariationWeaponType, [Option<OptionDataGroup>; 2]>,
}

impl Variation {
    pub fn new(mineral_id: i32) -> Self {
        Self {
            mineral_id,
            effects: HashMap::new(),
        }
    }

    pub fn mineral_id(&self) -> i32 {
        self.mineral_id
    }

    /// `order` is 0 or 1; other values are ignored.
    pub fn set_effect_group(
        &mut self,
        weapon_type: VariationWeaponType,
        order: usize,
        group: OptionDataGroup,
    ) {
        if order > 1 {
            warn!(mineral = self.mineral_id, order, "variation order out of range");
            return;
        }
        let slots = self.effects.entry(weapon_type).or_insert([None, None]);
        slots[order] = Some(group);
    }

    pub fn get_random_effect<R: Rng + ?Sized>(
        &self,
        weapon_type: VariationWeaponType,
        order: usize,
        rng: &mut R,
    ) -> Option<Arc<Options>> {
        let group = self
            .effects
            .get(&weapon_type)
            .and_then(|slots| slots.get(order))
            .and_then(Option::as_ref);
        match group {
            Some(group) => group.get_random_effect(rng),
            None => {
                warn!(?weapon_type, order, mineral = self.mineral_id, "null variation effect");
                None
            }
        }
    }
}
