//! Identifier generation for timers started without an id

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces collision-resistant opaque identifiers
pub trait IdGenerator: Send + Sync + 'static {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs rendered as 32 lowercase hex characters
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Predictable `prefix-N` identifiers, handy in tests
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_are_unique_and_opaque() {
        let ids: HashSet<String> = (0..1000).map(|_| UuidGenerator.generate()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.len() == 32 && !id.trim().is_empty()));
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("pomo");
        assert_eq!(ids.generate(), "pomo-1");
        assert_eq!(ids.generate(), "pomo-2");
    }
}
