use crate::entities::abnormal::AbnormalType;
use crate::entities::options::Options;
use crate::entities::skills::{Skill, SkillEffect};
use crate::world::id_factory::ObjectId;
use crate::world::time::{GameClock, GameTick};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_BUFF_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuffId(pub u64);

impl BuffId {
    pub fn next() -> Self {
        BuffId(NEXT_BUFF_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BuffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buff#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum BuffSource {
    Skill(Arc<Skill>),
    Option(Arc<Options>),
}

/// What the effect list needs to know about whoever applied an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectorInfo {
    pub object_id: ObjectId,
    pub is_player: bool,
    pub is_gm: bool,
    pub can_give_damage: bool,
}

/// One applied effect instance on one creature.
#[derive(Debug, Clone)]
pub struct BuffInfo {
    id: BuffId,
    source: BuffSource,
    effector: Option<EffectorInfo>,
    effected: ObjectId,
    in_use: bool,
    applied_at: GameTick,
    abnormal_ticks: Option<u64>,
    expires_at: Option<GameTick>,
}

impl BuffInfo {
    pub fn from_skill(
        skill: Arc<Skill>,
        effector: Option<EffectorInfo>,
        effected: ObjectId,
        clock: &GameClock,
    ) -> Self {
        let now = clock.now();
        let abnormal_ticks = clock.ticks_from_seconds(skill.abnormal_time);
        Self {
            id: BuffId::next(),
            source: BuffSource::Skill(skill),
            effector,
            effected,
            in_use: true,
            applied_at: now,
            abnormal_ticks,
            expires_at: abnormal_ticks.map(|ticks| now.after(ticks)),
        }
    }

    pub fn from_option(options: Arc<Options>, effected: ObjectId, now: GameTick) -> Self {
        Self {
            id: BuffId::next(),
            source: BuffSource::Option(options),
            effector: None,
            effected,
            in_use: true,
            applied_at: now,
            abnormal_ticks: None,
            expires_at: None,
        }
    }

    pub fn id(&self) -> BuffId {
        self.id
    }

    pub fn source(&self) -> &BuffSource {
        &self.source
    }

    pub fn skill(&self) -> Option<&Arc<Skill>> {
        match &self.source {
            BuffSource::Skill(skill) => Some(skill),
            BuffSource::Option(_) => None,
        }
    }

    pub fn option(&self) -> Option<&Arc<Options>> {
        match &self.source {
            BuffSource::Option(options) => Some(options),
            BuffSource::Skill(_) => None,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self.source, BuffSource::Option(_))
    }

    pub fn skill_id(&self) -> Option<i32> {
        self.skill().map(|skill| skill.id)
    }

    pub fn effects(&self) -> &[SkillEffect] {
        match &self.source {
            BuffSource::Skill(skill) => &skill.effects,
            BuffSource::Option(options) => &options.effects,
        }
    }

    pub fn effector(&self) -> Option<&EffectorInfo> {
        self.effector.as_ref()
    }

    /// Zero when nobody applied the effect.
    pub fn effector_object_id(&self) -> u32 {
        self.effector.map(|effector| effector.object_id.0).unwrap_or(0)
    }

    pub fn effected(&self) -> ObjectId {
        self.effected
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    pub fn set_in_use(&mut self, in_use: bool) {
        self.in_use = in_use;
    }

    pub fn applied_at(&self) -> GameTick {
        self.applied_at
    }

    pub fn expires_at(&self) -> Option<GameTick> {
        self.expires_at
    }

    pub fn abnormal_ticks(&self) -> Option<u64> {
        self.abnormal_ticks
    }

    pub fn is_abnormal_type(&self, abnormal_type: AbnormalType) -> bool {
        self.skill()
            .map(|skill| skill.abnormal_type == abnormal_type)
            .unwrap_or(false)
    }

    /// `None` for effects without expiry.
    pub fn remaining_ticks(&self, now: GameTick) -> Option<u64> {
        self.expires_at.map(|expires_at| now.ticks_until(expires_at))
    }

    pub fn is_expired(&self, now: GameTick) -> bool {
        self.expires_at
            .map(|expires_at| now >= expires_at)
            .unwrap_or(false)
    }

    /// Restarts the timer so that `ticks` remain from `now`.
    pub fn reset_abnormal_time(&mut self, now: GameTick, ticks: u64) {
        if self.expires_at.is_some() {
            self.expires_at = Some(now.after(ticks));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn skill(abnormal_time: i32) -> Arc<Skill> {
        let mut skill = Skill::new(1040, 3, "Shield");
        skill.abnormal_type = AbnormalType::PdUp;
        skill.abnormal_time = abnormal_time;
        Arc::new(skill)
    }

    #[test]
    fn skill_buff_expires_after_abnormal_time() {
        let mut clock = GameClock::new(Duration::from_millis(100));
        clock.advance(5);
        let info = BuffInfo::from_skill(skill(2), None, ObjectId(7), &clock);
        assert_eq!(info.applied_at(), GameTick(5));
        assert_eq!(info.expires_at(), Some(GameTick(25)));
        assert_eq!(info.remaining_ticks(GameTick(15)), Some(10));
        assert!(!info.is_expired(GameTick(24)));
        assert!(info.is_expired(GameTick(25)));
        assert!(info.is_abnormal_type(AbnormalType::PdUp));
        assert_eq!(info.skill_id(), Some(1040));
    }

    #[test]
    fn non_positive_time_never_expires() {
        let clock = GameClock::new(Duration::from_millis(100));
        let mut info = BuffInfo::from_skill(skill(-1), None, ObjectId(7), &clock);
        assert_eq!(info.remaining_ticks(GameTick(1_000)), None);
        assert!(!info.is_expired(GameTick(u64::MAX)));
        info.reset_abnormal_time(GameTick(10), 5);
        assert_eq!(info.expires_at(), None);
    }

    #[test]
    fn reset_restarts_timer() {
        let clock = GameClock::new(Duration::from_secs(1));
        let mut info = BuffInfo::from_skill(skill(10), None, ObjectId(7), &clock);
        info.reset_abnormal_time(GameTick(8), 10);
        assert_eq!(info.expires_at(), Some(GameTick(18)));
    }

    #[test]
    fn effector_id_defaults_to_zero() {
        let clock = GameClock::new(Duration::from_secs(1));
        let info = BuffInfo::from_skill(skill(10), None, ObjectId(7), &clock);
        assert_eq!(info.effector_object_id(), 0);
        let effector = EffectorInfo {
            object_id: ObjectId(99),
            is_player: true,
            is_gm: false,
            can_give_damage: true,
        };
        let info = BuffInfo::from_skill(skill(10), Some(effector), ObjectId(7), &clock);
        assert_eq!(info.effector_object_id(), 99);
    }

    #[test]
    fn options_have_no_abnormal() {
        let options = Arc::new(Options::new(3, Vec::new()));
        let info = BuffInfo::from_option(options, ObjectId(7), GameTick(0));
        assert!(info.is_option());
        assert!(!info.is_abnormal_type(AbnormalType::None));
        let option = Arc::new(Options::new(3, Vec::new()));
        let other = BuffInfo::from_option(option, ObjectId(7), GameTick(0));
        assert_ne!(info.id(), other.id());
    }
}
