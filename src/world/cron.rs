use crate::world::time::GameTick;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

/// Cron entry for a timed task
#[derive(Clone, Copy, Debug)]
struct CronEntry<K> {
    key: K,
    due: GameTick,
    seq: u64,
}

/// Min-heap by due tick (earliest first), then insertion order
impl<K> Ord for CronEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so both comparisons are reversed
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<K> PartialOrd for CronEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> PartialEq for CronEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<K> Eq for CronEntry<K> {}

/// Timed task queue. Replaced or stopped entries stay in the heap and are
/// skipped when they reach the top.
#[derive(Debug)]
pub struct Cron<K> {
    heap: BinaryHeap<CronEntry<K>>,
    index: HashMap<K, (GameTick, u64)>,
    next_seq: u64,
}

impl<K: Copy + Eq + Hash> Default for Cron<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Hash> Cron<K> {
    pub fn new() -> Self {
        Cron {
            heap: BinaryHeap::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Schedules `key` to fire `delay` ticks after `now`, replacing any pending entry.
    pub fn set(&mut self, key: K, delay: u64, now: GameTick) {
        let due = now.after(delay);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.index.insert(key, (due, seq));
        self.heap.push(CronEntry { key, due, seq });
    }

    /// Check if any task is ready (but don't remove it)
    pub fn check(&mut self, now: GameTick) -> Option<K> {
        self.discard_stale();
        let entry = self.heap.peek()?;
        if entry.due <= now {
            Some(entry.key)
        } else {
            None
        }
    }

    /// Pop and return next ready task
    pub fn pop_ready(&mut self, now: GameTick) -> Option<K> {
        self.discard_stale();
        let entry = self.heap.peek()?;
        if entry.due > now {
            return None;
        }
        let entry = self.heap.pop()?;
        self.index.remove(&entry.key);
        Some(entry.key)
    }

    /// Cancel a pending task and return its remaining ticks
    pub fn stop(&mut self, key: K, now: GameTick) -> Option<u64> {
        let (due, _) = self.index.remove(&key)?;
        Some(remaining(due, now))
    }

    pub fn get_remaining(&self, key: K, now: GameTick) -> Option<u64> {
        let (due, _) = self.index.get(&key)?;
        Some(remaining(*due, now))
    }

    /// Reschedule an existing task (returns true if it was pending)
    pub fn change(&mut self, key: K, new_delay: u64, now: GameTick) -> bool {
        let existed = self.index.contains_key(&key);
        self.set(key, new_delay, now);
        existed
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn discard_stale(&mut self) {
        while let Some(entry) = self.heap.peek() {
            match self.index.get(&entry.key) {
                Some((_, seq)) if *seq == entry.seq => return,
                _ => {
                    self.heap.pop();
                }
            }
        }
    }
}

fn remaining(due: GameTick, now: GameTick) -> u64 {
    now.ticks_until(due).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cron_basic_operations() {
        let mut cron = Cron::new();
        let now = GameTick(1000);

        cron.set(1u32, 10, now); // Ready at 1010
        cron.set(2u32, 5, now); // Ready at 1005
        assert_eq!(cron.len(), 2);

        assert_eq!(cron.check(GameTick(1004)), None);
        assert_eq!(cron.check(GameTick(1005)), Some(2));

        assert_eq!(cron.pop_ready(GameTick(1005)), Some(2));
        assert_eq!(cron.len(), 1);

        assert_eq!(cron.pop_ready(GameTick(1009)), None);
        assert_eq!(cron.pop_ready(GameTick(1010)), Some(1));
        assert!(cron.is_empty());
    }

    #[test]
    fn cron_get_remaining() {
        let mut cron = Cron::new();
        cron.set(7u32, 10, GameTick(1000));

        assert_eq!(cron.get_remaining(7, GameTick(1005)), Some(5));
        assert_eq!(cron.get_remaining(7, GameTick(1010)), Some(1));
        assert_eq!(cron.get_remaining(7, GameTick(1015)), Some(1));
    }

    #[test]
    fn cron_stop_cancels_task() {
        let mut cron = Cron::new();
        let now = GameTick(1000);

        cron.set(1u32, 10, now);
        assert_eq!(cron.stop(1, now), Some(10));
        assert_eq!(cron.stop(1, now), None);
        assert_eq!(cron.pop_ready(GameTick(2000)), None);
    }

    #[test]
    fn cron_change_replaces_pending_entry() {
        let mut cron = Cron::new();
        let now = GameTick(1000);

        cron.set(1u32, 10, now);
        assert!(cron.change(1, 20, now));
        assert_eq!(cron.get_remaining(1, now), Some(20));

        // The stale 1010 entry must not fire.
        assert_eq!(cron.pop_ready(GameTick(1010)), None);
        assert_eq!(cron.pop_ready(GameTick(1020)), Some(1));
    }

    #[test]
    fn cron_same_due_tick_keeps_insertion_order() {
        let mut cron = Cron::new();
        let now = GameTick(1000);

        cron.set(3u32, 5, now);
        cron.set(1u32, 5, now);
        cron.set(2u32, 5, now);

        let mut ready = Vec::new();
        while let Some(key) = cron.pop_ready(GameTick(1005)) {
            ready.push(key);
        }
        assert_eq!(ready, vec![3, 1, 2]);
    }
}
