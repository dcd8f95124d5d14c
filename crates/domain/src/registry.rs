//! In-memory registry of the conversation IDs and workforce names recently
//! seen in published events, with lazy TTL eviction (spec.md §4.8).
//!
//! No background timer: every read sweeps expired entries first, which is
//! sufficient because reads are frequent (UI polling) and the working set
//! is small (spec.md §9's "avoid background threads").

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RegistryStats {
    pub conversation_ids_count: usize,
    pub workforce_names_count: usize,
}

struct Maps {
    conversation_ids: HashMap<String, Instant>,
    workforce_names: HashMap<String, Instant>,
}

/// Tracks `{value -> last-seen}` for the two recognized filter fields.
/// A single writer lock covers both maps — spec.md §5 calls this sufficient
/// given low contention.
pub struct FilterRegistry {
    ttl: Duration,
    maps: Mutex<Maps>,
}

impl FilterRegistry {
    pub fn new(ttl: Duration) -> Self {
        tracing::info!(ttl_hours = ttl.as_secs() / 3600, "FilterRegistry initialized");
        Self {
            ttl,
            maps: Mutex::new(Maps {
                conversation_ids: HashMap::new(),
                workforce_names: HashMap::new(),
            }),
        }
    }

    /// Records `conversation_id` and, when non-empty, `workforce_name` as
    /// seen now. Both empty-string and `None` count as "not present" for
    /// `workforce_name`.
    pub fn register(&self, conversation_id: &str, workforce_name: Option<&str>) {
        if conversation_id.is_empty() {
            return;
        }
        let now = Instant::now();
        let mut maps = self.maps.lock();

        if !maps.conversation_ids.contains_key(conversation_id) {
            tracing::debug!(conversation_id, "registered new conversation_id");
        }
        maps.conversation_ids.insert(conversation_id.to_string(), now);

        if let Some(workforce) = workforce_name.filter(|w| !w.is_empty()) {
            if !maps.workforce_names.contains_key(workforce) {
                tracing::debug!(workforce, "registered new workforce_name");
            }
            maps.workforce_names.insert(workforce.to_string(), now);
        }
    }

    fn evict_expired(&self, maps: &mut Maps) {
        let cutoff = Instant::now().checked_sub(self.ttl);
        let Some(cutoff) = cutoff else { return };

        let before_conv = maps.conversation_ids.len();
        maps.conversation_ids.retain(|_, seen| *seen > cutoff);
        let before_wf = maps.workforce_names.len();
        maps.workforce_names.retain(|_, seen| *seen > cutoff);

        let evicted_conv = before_conv - maps.conversation_ids.len();
        let evicted_wf = before_wf - maps.workforce_names.len();
        if evicted_conv > 0 || evicted_wf > 0 {
            tracing::debug!(
                evicted_conversation_ids = evicted_conv,
                evicted_workforce_names = evicted_wf,
                "evicted expired filter registry entries"
            );
        }
    }

    /// Sorted, deduplicated list of currently-unexpired conversation IDs.
    pub fn conversation_ids(&self) -> Vec<String> {
        let mut maps = self.maps.lock();
        self.evict_expired(&mut maps);
        let mut ids: Vec<String> = maps.conversation_ids.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Sorted, deduplicated list of currently-unexpired workforce names.
    pub fn workforce_names(&self) -> Vec<String> {
        let mut maps = self.maps.lock();
        self.evict_expired(&mut maps);
        let mut names: Vec<String> = maps.workforce_names.keys().cloned().collect();
        names.sort();
        names
    }

    /// Counts after eviction.
    pub fn stats(&self) -> RegistryStats {
        let mut maps = self.maps.lock();
        self.evict_expired(&mut maps);
        RegistryStats {
            conversation_ids_count: maps.conversation_ids.len(),
            workforce_names_count: maps.workforce_names.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_list_is_sorted_and_deduplicated() {
        let reg = FilterRegistry::new(Duration::from_secs(3600));
        reg.register("c2", None);
        reg.register("c1", None);
        reg.register("c2", None);
        assert_eq!(reg.conversation_ids(), vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn r3_re_registering_within_ttl_does_not_grow_the_list() {
        let reg = FilterRegistry::new(Duration::from_secs(3600));
        reg.register("c1", None);
        reg.register("c1", None);
        assert_eq!(reg.conversation_ids().len(), 1);
    }

    #[test]
    fn workforce_name_is_optional_and_independent() {
        let reg = FilterRegistry::new(Duration::from_secs(3600));
        reg.register("c1", Some("acme"));
        assert_eq!(reg.conversation_ids(), vec!["c1".to_string()]);
        assert_eq!(reg.workforce_names(), vec!["acme".to_string()]);
    }

    #[test]
    fn empty_workforce_name_is_not_registered() {
        let reg = FilterRegistry::new(Duration::from_secs(3600));
        reg.register("c1", Some(""));
        assert!(reg.workforce_names().is_empty());
    }

    #[test]
    fn p9_expired_entries_are_evicted_on_read() {
        let reg = FilterRegistry::new(Duration::from_millis(1));
        reg.register("c1", Some("acme"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(reg.conversation_ids().is_empty());
        assert!(reg.workforce_names().is_empty());
    }

    #[test]
    fn stats_reflects_counts_after_eviction() {
        let reg = FilterRegistry::new(Duration::from_secs(3600));
        reg.register("c1", Some("acme"));
        reg.register("c2", None);
        let stats = reg.stats();
        assert_eq!(stats.conversation_ids_count, 2);
        assert_eq!(stats.workforce_names_count, 1);
    }

    #[test]
    fn empty_conversation_id_is_ignored() {
        let reg = FilterRegistry::new(Duration::from_secs(3600));
        reg.register("", Some("acme"));
        assert!(reg.conversation_ids().is_empty());
    }
}
