//! In-process cache backend used by tests and single-node wiring.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::backend::{CacheBackend, CacheError, SetMode};

#[derive(Debug)]
struct Slot<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Slot<T> {
    fn live(value: T, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// [`CacheBackend`] over two `DashMap` namespaces, one for strings and one
/// for lists, mirroring the type split of a networked cache. Expired slots
/// are dropped lazily on access.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    strings: DashMap<String, Slot<String>>,
    lists: DashMap<String, Slot<Vec<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining TTL for `key` in either namespace; `None` when the key is
    /// absent or carries no expiry. Inspection helper for diagnostics and
    /// tests.
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let deadline = self
            .strings
            .get(key)
            .and_then(|slot| slot.expires_at)
            .or_else(|| self.lists.get(key).and_then(|slot| slot.expires_at))?;
        deadline.checked_duration_since(Instant::now())
    }

    fn read_string(&self, key: &str) -> Option<String> {
        if let Some(slot) = self.strings.get(key) {
            if !slot.expired() {
                return Some(slot.value.clone());
            }
        } else {
            return None;
        }
        // Guard dropped above; purge the expired slot.
        self.strings.remove_if(key, |_, slot| slot.expired());
        None
    }

    fn read_list(&self, key: &str) -> Option<Vec<String>> {
        if let Some(slot) = self.lists.get(key) {
            if !slot.expired() {
                return Some(slot.value.clone());
            }
        } else {
            return None;
        }
        self.lists.remove_if(key, |_, slot| slot.expired());
        None
    }
}

/// Assign an expiry inside `map`; returns whether the key was found there.
fn assign_expiry<T>(
    map: &DashMap<String, Slot<T>>,
    key: &str,
    ttl: Duration,
    only_if_no_expiry: bool,
) -> bool {
    if let Some(mut slot) = map.get_mut(key) {
        if slot.expired() {
            // Treated as absent; the next read purges it.
            return true;
        }
        if !only_if_no_expiry || slot.expires_at.is_none() {
            slot.expires_at = Instant::now().checked_add(ttl);
        }
        return true;
    }
    false
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        Ok(keys.iter().map(|key| self.read_string(key)).collect())
    }

    async fn set_many(
        &self,
        entries: &[(String, String)],
        ttl: Option<Duration>,
        mode: SetMode,
    ) -> Result<(), CacheError> {
        for (key, value) in entries {
            match mode {
                SetMode::Overwrite => {
                    self.strings
                        .insert(key.clone(), Slot::live(value.clone(), ttl));
                }
                SetMode::IfAbsent => {
                    // An expired slot counts as absent.
                    self.strings.remove_if(key, |_, slot| slot.expired());
                    self.strings
                        .entry(key.clone())
                        .or_insert_with(|| Slot::live(value.clone(), ttl));
                }
            }
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<u64, CacheError> {
        let mut removed = 0;
        for key in keys {
            let live_string = self
                .strings
                .remove(key)
                .is_some_and(|(_, slot)| !slot.expired());
            let live_list = self
                .lists
                .remove(key)
                .is_some_and(|(_, slot)| !slot.expired());
            if live_string || live_list {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn expire_many(
        &self,
        keys: &[String],
        ttl: Duration,
        only_if_no_expiry: bool,
    ) -> Result<(), CacheError> {
        for key in keys {
            if assign_expiry(&self.strings, key, ttl, only_if_no_expiry) {
                continue;
            }
            assign_expiry(&self.lists, key, ttl, only_if_no_expiry);
        }
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.read_list(key).unwrap_or_default())
    }

    async fn list_push(&self, key: &str, values: &[String]) -> Result<(), CacheError> {
        if values.is_empty() {
            return Ok(());
        }
        self.lists.remove_if(key, |_, slot| slot.expired());
        self.lists
            .entry(key.to_string())
            .or_insert_with(|| Slot::live(Vec::new(), None))
            .value
            .extend(values.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn get_many_is_position_aligned() {
        let backend = MemoryBackend::new();
        backend
            .set_many(&entries(&[("a", "1"), ("c", "3")]), None, SetMode::Overwrite)
            .await
            .expect("set");

        let values = backend
            .get_many(&keys(&["a", "b", "c"]))
            .await
            .expect("get");
        assert_eq!(
            values,
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
    }

    #[tokio::test]
    async fn if_absent_preserves_existing_values() {
        let backend = MemoryBackend::new();
        backend
            .set_many(&entries(&[("k", "original")]), None, SetMode::Overwrite)
            .await
            .expect("set");
        backend
            .set_many(&entries(&[("k", "clobber")]), None, SetMode::IfAbsent)
            .await
            .expect("set");

        let values = backend.get_many(&keys(&["k"])).await.expect("get");
        assert_eq!(values, vec![Some("original".to_string())]);
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let backend = MemoryBackend::new();
        backend
            .set_many(
                &entries(&[("k", "v")]),
                Some(Duration::from_millis(5)),
                SetMode::Overwrite,
            )
            .await
            .expect("set");

        std::thread::sleep(Duration::from_millis(20));
        let values = backend.get_many(&keys(&["k"])).await.expect("get");
        assert_eq!(values, vec![None]);
    }

    #[tokio::test]
    async fn if_absent_overwrites_an_expired_slot() {
        let backend = MemoryBackend::new();
        backend
            .set_many(
                &entries(&[("k", "old")]),
                Some(Duration::from_millis(5)),
                SetMode::Overwrite,
            )
            .await
            .expect("set");
        std::thread::sleep(Duration::from_millis(20));

        backend
            .set_many(&entries(&[("k", "new")]), None, SetMode::IfAbsent)
            .await
            .expect("set");
        let values = backend.get_many(&keys(&["k"])).await.expect("get");
        assert_eq!(values, vec![Some("new".to_string())]);
    }

    #[tokio::test]
    async fn expire_many_honors_only_if_no_expiry() {
        let backend = MemoryBackend::new();
        backend
            .set_many(
                &entries(&[("guarded", "v")]),
                Some(Duration::from_secs(600)),
                SetMode::Overwrite,
            )
            .await
            .expect("set");
        backend
            .set_many(&entries(&[("bare", "v")]), None, SetMode::Overwrite)
            .await
            .expect("set");

        backend
            .expire_many(
                &keys(&["guarded", "bare"]),
                Duration::from_secs(30),
                true,
            )
            .await
            .expect("expire");

        let guarded = backend.remaining_ttl("guarded").expect("ttl");
        assert!(guarded > Duration::from_secs(500), "kept original expiry");
        let bare = backend.remaining_ttl("bare").expect("ttl");
        assert!(bare <= Duration::from_secs(30), "received the backfill ttl");
    }

    #[tokio::test]
    async fn expire_many_unconditional_overrides() {
        let backend = MemoryBackend::new();
        backend
            .set_many(
                &entries(&[("k", "v")]),
                Some(Duration::from_secs(600)),
                SetMode::Overwrite,
            )
            .await
            .expect("set");

        backend
            .expire_many(&keys(&["k"]), Duration::from_secs(30), false)
            .await
            .expect("expire");

        let ttl = backend.remaining_ttl("k").expect("ttl");
        assert!(ttl <= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn delete_many_counts_only_live_keys() {
        let backend = MemoryBackend::new();
        backend
            .set_many(&entries(&[("a", "1"), ("b", "2")]), None, SetMode::Overwrite)
            .await
            .expect("set");

        let removed = backend
            .delete_many(&keys(&["a", "b", "missing"]))
            .await
            .expect("delete");
        assert_eq!(removed, 2);

        let values = backend.get_many(&keys(&["a", "b"])).await.expect("get");
        assert_eq!(values, vec![None, None]);
    }

    #[tokio::test]
    async fn lists_keep_push_order_and_support_expiry() {
        let backend = MemoryBackend::new();
        backend
            .list_push("ids", &keys(&["one", "two"]))
            .await
            .expect("push");
        backend
            .list_push("ids", &keys(&["three"]))
            .await
            .expect("push");

        let range = backend.list_range("ids").await.expect("range");
        assert_eq!(range, keys(&["one", "two", "three"]));

        backend
            .expire_many(&keys(&["ids"]), Duration::from_millis(5), true)
            .await
            .expect("expire");
        std::thread::sleep(Duration::from_millis(20));
        let range = backend.list_range("ids").await.expect("range");
        assert!(range.is_empty());
    }

    #[tokio::test]
    async fn empty_list_push_does_not_create_the_key() {
        let backend = MemoryBackend::new();
        backend.list_push("ids", &[]).await.expect("push");
        assert!(backend.list_range("ids").await.expect("range").is_empty());
        assert!(backend.remaining_ttl("ids").is_none());
        assert_eq!(backend.delete_many(&keys(&["ids"])).await.expect("del"), 0);
    }
}
