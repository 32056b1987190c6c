use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameTick(pub u64);

impl GameTick {
    pub fn after(self, ticks: u64) -> Self {
        GameTick(self.0.saturating_add(ticks))
    }

    pub fn ticks_until(self, later: GameTick) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

#[derive(Debug, Clone)]
pub struct GameClock {
    tick_length: Duration,
    tick: GameTick,
}

impl GameClock {
    pub fn new(tick_length: Duration) -> Self {
        let tick_length = if tick_length.is_zero() {
            Duration::from_millis(1)
        } else {
            tick_length
        };
        Self {
            tick_length,
            tick: GameTick(0),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    pub fn now(&self) -> GameTick {
        self.tick
    }

    pub fn advance(&mut self, ticks: u64) -> GameTick {
        self.tick.0 = self.tick.0.saturating_add(ticks);
        self.tick
    }

    pub fn advance_duration(&mut self, duration: Duration) -> GameTick {
        let ticks = self.ticks_from_duration_round_up(duration);
        self.advance(ticks)
    }

    pub fn ticks_from_duration_round_up(&self, duration: Duration) -> u64 {
        if duration.is_zero() {
            return 0;
        }
        let tick_nanos = self.tick_length.as_nanos().max(1);
        let duration_nanos = duration.as_nanos();
        let ticks = (duration_nanos + tick_nanos - 1) / tick_nanos;
        ticks.min(u64::MAX as u128) as u64
    }

    /// Abnormal times are configured in whole seconds; non-positive means "no expiry".
    pub fn ticks_from_seconds(&self, seconds: i32) -> Option<u64> {
        if seconds <= 0 {
            return None;
        }
        Some(self.ticks_from_duration_round_up(Duration::from_secs(seconds as u64)))
    }

    pub fn duration_for_ticks(&self, ticks: u64) -> Duration {
        let nanos = self
            .tick_length
            .as_nanos()
            .saturating_mul(ticks as u128)
            .min(u64::MAX as u128) as u64;
        Duration::from_nanos(nanos)
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tick_length_is_clamped() {
        let clock = GameClock::new(Duration::ZERO);
        assert_eq!(clock.tick_length(), Duration::from_millis(1));
    }

    #[test]
    fn duration_rounds_up_to_whole_ticks() {
        let clock = GameClock::new(Duration::from_millis(100));
        assert_eq!(clock.ticks_from_duration_round_up(Duration::from_millis(250)), 3);
        assert_eq!(clock.ticks_from_duration_round_up(Duration::from_millis(200)), 2);
        assert_eq!(clock.ticks_from_duration_round_up(Duration::ZERO), 0);
    }

    #[test]
    fn seconds_convert_to_ticks() {
        let clock = GameClock::new(Duration::from_millis(100));
        assert_eq!(clock.ticks_from_seconds(3), Some(30));
        assert_eq!(clock.ticks_from_seconds(0), None);
        assert_eq!(clock.ticks_from_seconds(-5), None);
    }

    #[test]
    fn advance_moves_clock_forward() {
        let mut clock = GameClock::new(Duration::from_millis(50));
        clock.advance(4);
        assert_eq!(clock.now(), GameTick(4));
        clock.advance_duration(Duration::from_millis(120));
        assert_eq!(clock.now(), GameTick(7));
        assert_eq!(clock.duration_for_ticks(2), Duration::from_millis(100));
    }
}
