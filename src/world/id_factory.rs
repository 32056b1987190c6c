use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

pub const FIRST_OBJECT_ID: u32 = 0x1000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out world-unique object ids. Shared between the world and its spawns.
#[derive(Debug)]
pub struct IdFactory {
    next: AtomicU32,
}

impl IdFactory {
    pub fn new() -> Self {
        Self::starting_at(FIRST_OBJECT_ID)
    }

    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first.max(1)),
        }
    }

    pub fn next(&self) -> ObjectId {
        ObjectId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_are_unique_across_threads() {
        let ids = Arc::new(IdFactory::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("join") {
                assert!(seen.insert(id));
                assert!(id.0 >= FIRST_OBJECT_ID);
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn zero_is_never_handed_out() {
        let ids = IdFactory::starting_at(0);
        assert!(ids.next().is_assigned());
    }
}
