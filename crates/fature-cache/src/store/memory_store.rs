//! In-process partition store.
//!
//! Used for local development and tests. Expiry follows the Tokio clock so
//! tests can pause and advance time.

use super::{expiry_secs, CacheStore, KeyTtl, ServerInfo};
use async_trait::async_trait;
use fature_core::{FatureError, FatureResult};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Minimum spacing between two sweeps of expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Stored,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn approx_bytes(&self, key: &str) -> usize {
        let value = match &self.value {
            Stored::Text(text) => text.len(),
            Stored::Set(members) => members.iter().map(String::len).sum(),
        };
        key.len() + value
    }
}

/// HashMap-backed store with Redis-like expiry and set semantics.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    commands: AtomicU64,
    /// Earliest instant of the next sweep; `None` until the first one.
    next_sweep: Mutex<Option<Instant>>,
}

fn wrong_type(key: &str) -> FatureError {
    FatureError::Cache(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value: '{}'",
        key
    ))
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| !e.is_expired(now)).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn count_command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops every expired entry, at most once per [`SWEEP_INTERVAL`].
    ///
    /// Keys that are never touched again would otherwise stay in the map
    /// after expiring. Callers hold the entries lock.
    fn sweep_if_due(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        let mut next_sweep = self.next_sweep.lock();
        if next_sweep.is_some_and(|at| now < at) {
            return;
        }
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        *next_sweep = Some(now + SWEEP_INTERVAL);

        let swept = before - entries.len();
        if swept > 0 {
            debug!(swept, remaining = entries.len(), "Swept expired cache entries");
        }
    }

    /// Runs `f` on the live entry map, dropping `key` first if it expired.
    fn with_live<R>(&self, key: &str, f: impl FnOnce(&mut HashMap<String, Entry>) -> R) -> R {
        self.count_command();
        let now = Instant::now();
        let mut entries = self.entries.lock();
        self.sweep_if_due(&mut entries, now);
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        f(&mut entries)
    }

    /// Entries physically held, expired or not.
    #[cfg(test)]
    fn held(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> FatureResult<Option<String>> {
        let found = self.with_live(key, |entries| match entries.get(key) {
            Some(Entry { value: Stored::Text(text), .. }) => Ok(Some(text.clone())),
            Some(Entry { value: Stored::Set(_), .. }) => Err(wrong_type(key)),
            None => Ok(None),
        })?;

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(found)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> FatureResult<()> {
        let expires_at = Instant::now() + Duration::from_secs(expiry_secs(ttl));
        self.with_live(key, |entries| {
            entries.insert(
                key.to_owned(),
                Entry {
                    value: Stored::Text(value.to_owned()),
                    expires_at: Some(expires_at),
                },
            );
        });
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> FatureResult<u64> {
        self.count_command();
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn scan_match(&self, pattern: &str) -> FatureResult<Vec<String>> {
        self.count_command();
        let now = Instant::now();
        let mut entries = self.entries.lock();
        self.sweep_if_due(&mut entries, now);
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn set_add(&self, key: &str, member: &str) -> FatureResult<bool> {
        self.with_live(key, |entries| {
            let entry = entries.entry(key.to_owned()).or_insert_with(|| Entry {
                value: Stored::Set(BTreeSet::new()),
                expires_at: None,
            });
            match &mut entry.value {
                Stored::Set(members) => Ok(members.insert(member.to_owned())),
                Stored::Text(_) => Err(wrong_type(key)),
            }
        })
    }

    async fn set_add_expire(&self, key: &str, member: &str, ttl: Duration) -> FatureResult<bool> {
        let expires_at = Instant::now() + Duration::from_secs(expiry_secs(ttl));
        self.with_live(key, |entries| {
            let entry = entries.entry(key.to_owned()).or_insert_with(|| Entry {
                value: Stored::Set(BTreeSet::new()),
                expires_at: None,
            });
            let added = match &mut entry.value {
                Stored::Set(members) => members.insert(member.to_owned()),
                Stored::Text(_) => return Err(wrong_type(key)),
            };
            entry.expires_at = Some(expires_at);
            Ok(added)
        })
    }

    async fn set_remove(&self, key: &str, member: &str) -> FatureResult<bool> {
        self.with_live(key, |entries| {
            let Some(entry) = entries.get_mut(key) else {
                return Ok(false);
            };
            let (removed, now_empty) = match &mut entry.value {
                Stored::Set(members) => (members.remove(member), members.is_empty()),
                Stored::Text(_) => return Err(wrong_type(key)),
            };
            // Redis drops a set once its last member is gone.
            if now_empty {
                entries.remove(key);
            }
            Ok(removed)
        })
    }

    async fn set_members(&self, key: &str) -> FatureResult<Vec<String>> {
        self.with_live(key, |entries| match entries.get(key) {
            Some(Entry { value: Stored::Set(members), .. }) => Ok(members.iter().cloned().collect()),
            Some(Entry { value: Stored::Text(_), .. }) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> FatureResult<bool> {
        let expires_at = Instant::now() + Duration::from_secs(expiry_secs(ttl));
        Ok(self.with_live(key, |entries| match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(expires_at);
                true
            }
            None => false,
        }))
    }

    async fn ttl(&self, key: &str) -> FatureResult<KeyTtl> {
        let now = Instant::now();
        Ok(self.with_live(key, |entries| match entries.get(key) {
            None => KeyTtl::Missing,
            Some(Entry { expires_at: None, .. }) => KeyTtl::Persistent,
            Some(Entry { expires_at: Some(at), .. }) => {
                // TTL reports whole seconds, rounded the way Redis does.
                let left = at.saturating_duration_since(now);
                let secs = (left.as_millis() + 500) / 1000;
                KeyTtl::Expires(Duration::from_secs(u64::try_from(secs).unwrap_or(u64::MAX)))
            }
        }))
    }

    async fn ping(&self) -> FatureResult<()> {
        self.count_command();
        Ok(())
    }

    async fn flush(&self) -> FatureResult<()> {
        self.count_command();
        self.entries.lock().clear();
        Ok(())
    }

    async fn info(&self) -> FatureResult<ServerInfo> {
        self.count_command();
        let now = Instant::now();
        let mut entries = self.entries.lock();
        self.sweep_if_due(&mut entries, now);
        let bytes: usize = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, entry)| entry.approx_bytes(key))
            .sum();
        drop(entries);

        Ok(ServerInfo {
            used_memory_human: Some(human_bytes(bytes)),
            connected_clients: None,
            total_commands_processed: Some(self.commands.load(Ordering::Relaxed)),
            keyspace_hits: self.hits.load(Ordering::Relaxed),
            keyspace_misses: self.misses.load(Ordering::Relaxed),
        })
    }
}

/// Formats a byte count the way `used_memory_human` does.
fn human_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["K", "M", "G", "T"];
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    if value < 1024.0 {
        return format!("{}B", bytes);
    }
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.2}{}", value, unit)
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[^a]`, `[a-z]` and `\`
/// escapes.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_at(&pattern, &text)
}

fn glob_at(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Backtrack point for the most recent `*`.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
                continue;
            }
            Some('?') => Some(1),
            Some('[') => match_class(&pattern[p..], text[t]),
            Some('\\') if p + 1 < pattern.len() => (pattern[p + 1] == text[t]).then_some(2),
            Some(&c) => (c == text[t]).then_some(1),
            None => None,
        };

        match step {
            Some(width) => {
                p += width;
                t += 1;
            }
            None => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Matches `c` against a `[...]` class at the start of `pattern`, returning
/// the class width in pattern chars when it matches.
fn match_class(pattern: &[char], c: char) -> Option<usize> {
    let mut i = 1;
    let negate = pattern.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        if pattern[i] == '\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (lo, hi) = if pattern[i] <= pattern[i + 2] {
                (pattern[i], pattern[i + 2])
            } else {
                (pattern[i + 2], pattern[i])
            };
            matched |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    // Unterminated class: Redis treats the end of pattern as closing it.
    let width = (i + 1).min(pattern.len());
    (matched != negate).then_some(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("affiliate:monthly:42:*", "affiliate:monthly:42:2025:6"));
        assert!(!glob_match("affiliate:monthly:42:*", "affiliate:monthly:420:2025:6"));
        assert!(glob_match("*", ""));
        assert!(glob_match("h?llo", "hello"));
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[^e]llo", "hello"));
        assert!(glob_match("h[a-c]llo", "hbllo"));
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
        assert!(glob_match("*:2025:*", "affiliate:monthly:7:2025:12"));
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512B");
        assert_eq!(human_bytes(2048), "2.00K");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00M");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryCacheStore::new();
        store.set_ex("k", "v", Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Expires(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_semantics() {
        let store = MemoryCacheStore::new();
        assert!(store.set_add("s", "a").await.unwrap());
        assert!(!store.set_add("s", "a").await.unwrap());
        assert!(store.set_add("s", "b").await.unwrap());
        assert_eq!(store.ttl("s").await.unwrap(), KeyTtl::Persistent);
        assert_eq!(store.set_members("s").await.unwrap(), vec!["a", "b"]);

        assert!(store.set_remove("s", "a").await.unwrap());
        assert!(!store.set_remove("s", "a").await.unwrap());
        assert!(store.set_remove("s", "b").await.unwrap());
        assert_eq!(store.ttl("s").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_reclaimed_without_being_touched() {
        let store = MemoryCacheStore::new();
        for i in 0..10_000 {
            store
                .set_ex(&format!("commission:calc:tx-{i}"), "{}", Duration::from_secs(1))
                .await
                .unwrap();
        }
        assert_eq!(store.held(), 10_000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        store.set_ex("dashboard:main", "{}", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.held(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_info_and_scan_also_sweep() {
        let store = MemoryCacheStore::new();
        store.set_ex("a", "1", Duration::from_secs(1)).await.unwrap();
        store.set_ex("b", "2", Duration::from_secs(1)).await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        store.info().await.unwrap();
        assert_eq!(store.held(), 0);

        store.set_ex("c", "3", Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(store.scan_match("*").await.unwrap().is_empty());
        assert_eq!(store.held(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_add_expire_sets_member_and_expiry_together() {
        let store = MemoryCacheStore::new();
        assert!(store.set_add_expire("s", "a", Duration::from_secs(60)).await.unwrap());
        assert!(!store.set_add_expire("s", "a", Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.ttl("s").await.unwrap(), KeyTtl::Expires(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.set_members("s").await.unwrap().is_empty());

        store.set_ex("k", "v", Duration::from_secs(60)).await.unwrap();
        assert!(matches!(
            store.set_add_expire("k", "m", Duration::from_secs(60)).await,
            Err(FatureError::Cache(_))
        ));
        // A rejected add leaves the existing entry untouched.
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = MemoryCacheStore::new();
        store.set_ex("k", "v", Duration::from_secs(60)).await.unwrap();
        assert!(matches!(store.set_add("k", "m").await, Err(FatureError::Cache(_))));
        store.set_add("s", "m").await.unwrap();
        assert!(matches!(store.get("s").await, Err(FatureError::Cache(_))));
    }

    #[tokio::test]
    async fn test_delete_counts_existing_keys() {
        let store = MemoryCacheStore::new();
        store.set_ex("a", "1", Duration::from_secs(60)).await.unwrap();
        store.set_ex("b", "2", Duration::from_secs(60)).await.unwrap();
        let removed = store
            .delete(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
    }

    #[tokio::test]
    async fn test_info_tracks_hits_and_misses() {
        let store = MemoryCacheStore::new();
        store.set_ex("k", "v", Duration::from_secs(60)).await.unwrap();
        store.get("k").await.unwrap();
        store.get("missing").await.unwrap();

        let info = store.info().await.unwrap();
        assert_eq!(info.keyspace_hits, 1);
        assert_eq!(info.keyspace_misses, 1);
        assert_eq!(info.connected_clients, None);
        assert_eq!(info.used_memory_human.as_deref(), Some("2B"));
    }
}
