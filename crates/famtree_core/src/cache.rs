//! Version-keyed memoization of the full person list.
//!
//! # Responsibility
//! - Avoid redundant store reads between writes.
//! - Invalidate on every successful write via a version counter bump.
//!
//! # Invariants
//! - A snapshot is served only while its version matches the counter.
//! - Invalidation never blocks on the snapshot lock.

use crate::model::person::Person;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

struct Snapshot {
    version: u64,
    persons: Vec<Person>,
}

/// Read-through cache for the person list.
///
/// Owned by the service; writes call [`FamilyCache::invalidate`] and the
/// next read repopulates lazily from the store.
pub struct FamilyCache {
    version: AtomicU64,
    snapshot: Mutex<Option<Snapshot>>,
}

impl FamilyCache {
    pub fn new() -> Self {
        Self {
            version: AtomicU64::new(0),
            snapshot: Mutex::new(None),
        }
    }

    /// Current version counter. Bumped once per write.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Marks every cached snapshot stale.
    pub fn invalidate(&self) {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("event=cache_invalidate module=cache status=ok version={version}");
    }

    /// Returns the cached person list, reloading through `reload` when the
    /// snapshot is missing or stale.
    pub fn get_or_reload<E>(
        &self,
        reload: impl FnOnce() -> Result<Vec<Person>, E>,
    ) -> Result<Vec<Person>, E> {
        let current = self.version.load(Ordering::SeqCst);
        {
            let guard = lock_snapshot(&self.snapshot);
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.version == current {
                    return Ok(snapshot.persons.clone());
                }
            }
        }

        let persons = reload()?;
        let mut guard = lock_snapshot(&self.snapshot);
        *guard = Some(Snapshot {
            version: current,
            persons: persons.clone(),
        });
        Ok(persons)
    }
}

impl Default for FamilyCache {
    fn default() -> Self {
        Self::new()
    }
}

// A poisoned lock only means a past panic mid-replace; the slot content is
// still a whole snapshot and safe to read or overwrite.
fn lock_snapshot(
    snapshot: &Mutex<Option<Snapshot>>,
) -> std::sync::MutexGuard<'_, Option<Snapshot>> {
    snapshot
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::FamilyCache;
    use crate::model::person::Person;
    use std::cell::Cell;

    fn person(id: &str) -> Person {
        Person {
            id: id.to_string(),
            name: format!("Person {id}"),
            generation: 1,
            parent_id: None,
            children: Vec::new(),
            birth_rank: None,
            created_at: 0,
        }
    }

    #[test]
    fn second_read_is_served_from_snapshot() {
        let cache = FamilyCache::new();
        let reloads = Cell::new(0u32);
        let reload = || -> Result<Vec<Person>, ()> {
            reloads.set(reloads.get() + 1);
            Ok(vec![person("a")])
        };

        cache.get_or_reload(reload).unwrap();
        let cached = cache
            .get_or_reload(|| -> Result<Vec<Person>, ()> {
                reloads.set(reloads.get() + 1);
                Ok(vec![person("b")])
            })
            .unwrap();

        assert_eq!(reloads.get(), 1);
        assert_eq!(cached[0].id, "a");
    }

    #[test]
    fn invalidate_forces_reload() {
        let cache = FamilyCache::new();
        cache
            .get_or_reload(|| -> Result<Vec<Person>, ()> { Ok(vec![person("a")]) })
            .unwrap();
        cache.invalidate();

        let fresh = cache
            .get_or_reload(|| -> Result<Vec<Person>, ()> { Ok(vec![person("b")]) })
            .unwrap();
        assert_eq!(fresh[0].id, "b");
        assert_eq!(cache.version(), 1);
    }

    #[test]
    fn failed_reload_leaves_cache_reusable() {
        let cache = FamilyCache::new();
        let err = cache
            .get_or_reload(|| -> Result<Vec<Person>, &'static str> { Err("store down") })
            .unwrap_err();
        assert_eq!(err, "store down");

        let recovered = cache
            .get_or_reload(|| -> Result<Vec<Person>, &'static str> { Ok(vec![person("a")]) })
            .unwrap();
        assert_eq!(recovered.len(), 1);
    }
}
