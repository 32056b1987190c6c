use serde::Deserialize;

/// Stacking group of a buff or debuff. Two effects of the same group never
/// coexist in use unless they stack through a subordination group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbnormalType {
    None,
    PaUp,
    PaDown,
    MaUp,
    MaDown,
    PdUp,
    PdDown,
    MdUp,
    MdDown,
    AvoidUp,
    AvoidDown,
    HitUp,
    CriticalProbUp,
    AttackTimeUp,
    AttackTimeDown,
    CastingTimeDown,
    SpeedUp,
    SpeedDown,
    MaxHpUp,
    MaxMpUp,
    BuffLimitUp,
    Berserker,
    Reflect,
    Poison,
    Bleeding,
    Stun,
    Sleep,
    Root,
    Silence,
    Paralyze,
    Fear,
    DanceOfWarrior,
    SongOfWind,
    ToggleStance,
    HerbAttack,
    HerbDefense,
    Seed,
    Transform,
    BlockBuffSlot,
    BlockDebuff,
    FaceOff,
    AllAttackUp,
    AllRegenUp,
    MultiBuff,
    MultiDebuff,
    HealPotion,
}

impl AbnormalType {
    pub fn is_none(self) -> bool {
        self == AbnormalType::None
    }
}

impl Default for AbnormalType {
    fn default() -> Self {
        AbnormalType::None
    }
}

/// Client-visible graphical effect carried by an abnormal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbnormalVisualEffect {
    DotBleeding,
    DotPoison,
    DotFire,
    Stun,
    Sleep,
    Root,
    Silence,
    Paralyze,
    Fear,
    FleshStone,
    BigHead,
    Stealth,
    UltimateDefence,
    Invincibility,
    VpUp,
    AvatarTransform,
    SeedTalisman,
    HerbGlow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abnormal_types_use_data_file_names() {
        let ty: AbnormalType = serde_yaml::from_str("PA_UP").expect("parse");
        assert_eq!(ty, AbnormalType::PaUp);
        let ty: AbnormalType = serde_yaml::from_str("NONE").expect("parse");
        assert!(ty.is_none());
        assert!(serde_yaml::from_str::<AbnormalType>("NOT_A_SLOT").is_err());
    }

    #[test]
    fn visual_effects_use_data_file_names() {
        let ave: AbnormalVisualEffect = serde_yaml::from_str("DOT_POISON").expect("parse");
        assert_eq!(ave, AbnormalVisualEffect::DotPoison);
    }
}
