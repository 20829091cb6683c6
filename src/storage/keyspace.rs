//! Sharded Keyspace Store
//!
//! The keyspace owns every [`Object`] in the server. It is created once at
//! startup, wrapped in an `Arc`, and shared by every connection task.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over independent `RwLock<HashMap>`
//!    shards, so commands on keys in different shards never block each other.
//! 2. **Per-key Exclusion**: Read-modify-write commands go through
//!    [`Keyspace::lock`], which holds the shard's write lock for the whole
//!    invocation. Two commands on the same key always serialize.
//! 3. **Lazy Expiry**: Every access checks the expiry of the touched key and
//!    purges it if needed. The background sweeper handles keys nobody reads.
//! 4. **No Type Checks Here**: The store hands out objects of any type. Type
//!    compatibility is enforced one layer up, by the command Type Guard.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Keyspace                             │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐            │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │            │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │            │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │            │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘            │
//! └─────────────────────────────────────────────────────────────┘
//!        ▲ view(): read lock            ▲ lock(): write lock
//!        │ (read-only commands)         │ (KeyGuard, one command)
//! ```
//!
//! No lock is ever held across an `.await`: commands run synchronously
//! inside the connection task and release the shard before any I/O.

use crate::storage::object::{Object, ValueKind};
use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 64;

type Entries = HashMap<Bytes, Object>;

/// A single shard containing a portion of the keyspace.
#[derive(Debug, Default)]
struct Shard {
    entries: RwLock<Entries>,
}

impl Shard {
    // A panic while holding a shard lock cannot leave a half-written object
    // behind (handlers validate before writing), so a poisoned lock is reused.
    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The process-wide mapping from key to [`Object`].
///
/// # Example
///
/// ```
/// use tallykv::storage::{Keyspace, Object, ValueKind, HashValue};
/// use bytes::Bytes;
///
/// let keyspace = Keyspace::new();
/// keyspace.set(Bytes::from("greeting"), Object::string("hello"));
/// assert!(keyspace.exists(b"greeting"));
///
/// // Read-modify-write under the key's exclusive lock
/// let key = Bytes::from("user:1");
/// let mut guard = keyspace.lock(&key);
/// let (object, created) = guard.get_or_create(ValueKind::Hash);
/// assert!(created);
/// object
///     .payload_mut::<HashValue>()
///     .unwrap()
///     .insert(Bytes::from("name"), Bytes::from("Ada"));
/// drop(guard);
///
/// assert_eq!(keyspace.get(b"user:1").unwrap().kind(), ValueKind::Hash);
/// ```
pub struct Keyspace {
    shards: Vec<Shard>,

    /// Number of keys currently stored (approximate under concurrency)
    key_count: AtomicU64,

    /// Lookups that found a live key
    hits: AtomicU64,

    /// Lookups that found nothing
    misses: AtomicU64,

    /// Keys removed because their TTL passed
    expired_count: AtomicU64,
}

impl std::fmt::Debug for Keyspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyspace")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyspace {
    /// Creates a keyspace with [`DEFAULT_SHARDS`] shards.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates a keyspace with the given number of shards (at least one).
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1)).map(|_| Shard::default()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Removes `key` from an already locked shard if it has expired.
    fn purge_if_expired(&self, entries: &mut Entries, key: &[u8]) -> bool {
        if entries.get(key).is_some_and(Object::is_expired) {
            entries.remove(key);
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Acquires exclusive access to `key` for one command invocation.
    ///
    /// An expired object at `key` is purged before the guard is returned, so
    /// the guard only ever sees live objects. The shard stays write-locked
    /// until the guard is dropped.
    pub fn lock(&self, key: &Bytes) -> KeyGuard<'_> {
        let mut entries = self.shard(key).write();
        self.purge_if_expired(&mut entries, key);

        KeyGuard {
            keyspace: self,
            key: key.clone(),
            entries,
        }
    }

    /// Runs a read-only closure against the live object at `key`.
    ///
    /// Takes the shard's read lock on the fast path. If the object turns out
    /// to be expired, the write lock is taken to purge it and the closure
    /// observes `None`.
    pub fn view<R>(&self, key: &[u8], f: impl FnOnce(Option<&Object>) -> R) -> R {
        let shard = self.shard(key);

        {
            let entries = shard.read();
            match entries.get(key) {
                Some(object) if !object.is_expired() => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return f(Some(object));
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return f(None);
                }
                Some(_) => {}
            }
        }

        let mut entries = shard.write();
        self.purge_if_expired(&mut entries, key);

        // Another writer may have replaced the key between the two locks
        let object = entries.get(key);
        if object.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        f(object)
    }

    /// Returns a snapshot of the live object at `key`.
    pub fn get(&self, key: &[u8]) -> Option<Object> {
        self.view(key, |object| object.cloned())
    }

    /// Returns the type of the live object at `key`.
    pub fn kind_of(&self, key: &[u8]) -> Option<ValueKind> {
        self.view(key, |object| object.map(Object::kind))
    }

    /// Checks if a live object exists at `key`.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.view(key, |object| object.is_some())
    }

    /// Stores `object` at `key`, replacing whatever was there.
    ///
    /// Returns `true` if the key did not exist before.
    pub fn set(&self, key: Bytes, object: Object) -> bool {
        self.lock(&key).set(object).is_none()
    }

    /// Deletes `key`. Returns `true` if a live object was removed.
    pub fn delete(&self, key: &[u8]) -> bool {
        let mut entries = self.shard(key).write();
        if self.purge_if_expired(&mut entries, key) {
            return false;
        }
        if entries.remove(key).is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Returns all live keys matching a glob pattern.
    ///
    /// Supported syntax: `*`, `?`, `[abc]`, `[a-z]`, `[^abc]` and `\x` escapes.
    ///
    /// **Warning**: This scans every shard and can be slow on large keyspaces.
    pub fn keys(&self, pattern: &[u8]) -> Vec<Bytes> {
        let now = Instant::now();
        let mut result = Vec::new();

        for shard in &self.shards {
            let entries = shard.read();
            result.extend(
                entries
                    .iter()
                    .filter(|(key, object)| {
                        !object.is_expired_at(now) && glob_match(pattern, key)
                    })
                    .map(|(key, _)| key.clone()),
            );
        }

        result
    }

    /// Removes every key. Returns the number of keys removed.
    pub fn flush(&self) -> u64 {
        let mut removed = 0u64;
        for shard in &self.shards {
            let mut entries = shard.write();
            removed += entries.len() as u64;
            entries.clear();
        }
        self.key_count.fetch_sub(removed, Ordering::Relaxed);
        removed
    }

    /// Approximate number of keys, including expired keys not yet purged.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns true if the keyspace holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Purges every expired object in one shard.
    ///
    /// Used by the background sweeper, which walks the shards round-robin.
    pub fn purge_expired_in_shard(&self, index: usize) -> ShardSweep {
        let Some(shard) = self.shards.get(index) else {
            return ShardSweep::default();
        };

        let now = Instant::now();
        let mut entries = shard.write();
        let scanned = entries.len();
        entries.retain(|_, object| !object.is_expired_at(now));
        let expired = scanned - entries.len();

        if expired > 0 {
            self.key_count.fetch_sub(expired as u64, Ordering::Relaxed);
            self.expired_count
                .fetch_add(expired as u64, Ordering::Relaxed);
        }

        ShardSweep { scanned, expired }
    }

    /// Returns keyspace counters.
    pub fn stats(&self) -> KeyspaceStats {
        KeyspaceStats {
            keys: self.key_count.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Walks every shard to estimate memory usage (approximate).
    pub fn memory_info(&self) -> MemoryInfo {
        let now = Instant::now();
        let mut info = MemoryInfo::default();

        for shard in &self.shards {
            let entries = shard.read();
            for (key, object) in entries.iter().filter(|(_, o)| !o.is_expired_at(now)) {
                info.keys += 1;
                if object.expires_at().is_some() {
                    info.volatile_keys += 1;
                }
                // 64 bytes of per-entry overhead is an estimate
                info.used_memory += key.len() + object.approx_size() + 64;
            }
        }

        info
    }
}

/// Exclusive, invocation-scoped access to one key.
///
/// Obtained from [`Keyspace::lock`]. Holds the key's shard write lock until
/// dropped, so every read and write made through one guard is atomic with
/// respect to all other commands on that key. Handlers must not keep a guard
/// beyond a single command.
pub struct KeyGuard<'a> {
    keyspace: &'a Keyspace,
    key: Bytes,
    entries: RwLockWriteGuard<'a, Entries>,
}

impl<'a> KeyGuard<'a> {
    /// The key this guard protects.
    pub fn key(&self) -> &Bytes {
        &self.key
    }

    /// The live object at the key, if any.
    pub fn get(&self) -> Option<&Object> {
        self.entries.get(&self.key)
    }

    /// Mutable access to the live object at the key, if any.
    pub fn get_mut(&mut self) -> Option<&mut Object> {
        self.entries.get_mut(&self.key)
    }

    /// Returns the object at the key, inserting an empty object of `kind`
    /// when the key is absent. The boolean is `true` if it was created.
    ///
    /// An existing object is returned as-is, whatever its type.
    pub fn get_or_create(&mut self, kind: ValueKind) -> (&mut Object, bool) {
        let mut created = false;
        let object = self
            .entries
            .entry(self.key.clone())
            .or_insert_with(|| {
                created = true;
                Object::empty(kind)
            });

        if created {
            self.keyspace.key_count.fetch_add(1, Ordering::Relaxed);
        }

        (object, created)
    }

    /// Replaces the object at the key. Returns the previous object.
    pub fn set(&mut self, object: Object) -> Option<Object> {
        let previous = self.entries.insert(self.key.clone(), object);
        if previous.is_none() {
            self.keyspace.key_count.fetch_add(1, Ordering::Relaxed);
        }
        previous
    }

    /// Removes the object at the key and returns it.
    pub fn delete(&mut self) -> Option<Object> {
        let removed = self.entries.remove(&self.key);
        if removed.is_some() {
            self.keyspace.key_count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Deletes the key if it now holds an empty hash, list or set.
    pub fn remove_if_empty(&mut self) -> bool {
        if self.get().is_some_and(Object::is_empty_collection) {
            self.delete();
            true
        } else {
            false
        }
    }
}

/// Result of sweeping one shard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShardSweep {
    /// Keys examined
    pub scanned: usize,
    /// Keys removed because they had expired
    pub expired: usize,
}

/// Keyspace counters.
#[derive(Debug, Clone, Copy)]
pub struct KeyspaceStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Lookups that found a live key
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Total expired keys removed
    pub expired: u64,
}

/// Memory usage information.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryInfo {
    /// Number of live keys
    pub keys: usize,
    /// Live keys carrying a TTL
    pub volatile_keys: usize,
    /// Approximate memory used in bytes
    pub used_memory: usize,
}

/// Glob-style matching over raw bytes.
///
/// Iterative with single-star backtracking, so patterns with many `*` stay
/// linear-ish instead of exploding recursively.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    // (pattern index after the last '*', text index it is currently absorbing up to)
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            match pattern[p] {
                b'*' => {
                    p += 1;
                    backtrack = Some((p, t));
                    continue;
                }
                b'?' => {
                    p += 1;
                    t += 1;
                    continue;
                }
                b'[' => match match_class(pattern, p, text[t]) {
                    Some((true, next)) => {
                        p = next;
                        t += 1;
                        continue;
                    }
                    Some((false, _)) => {}
                    // Unterminated class: treat '[' literally
                    None if text[t] == b'[' => {
                        p += 1;
                        t += 1;
                        continue;
                    }
                    None => {}
                },
                b'\\' if p + 1 < pattern.len() => {
                    if pattern[p + 1] == text[t] {
                        p += 2;
                        t += 1;
                        continue;
                    }
                }
                c => {
                    if c == text[t] {
                        p += 1;
                        t += 1;
                        continue;
                    }
                }
            }
        }

        match backtrack {
            Some((star_p, star_t)) => {
                p = star_p;
                t = star_t + 1;
                backtrack = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    while pattern.get(p) == Some(&b'*') {
        p += 1;
    }
    p == pattern.len()
}

/// Matches `ch` against the class starting at `pattern[start] == b'['`.
///
/// Returns whether it matched and the index just past the closing `]`, or
/// `None` if the class is never closed.
fn match_class(pattern: &[u8], start: usize, ch: u8) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = matches!(pattern.get(i), Some(b'^') | Some(b'!'));
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() {
        let c = pattern[i];
        if c == b']' {
            return Some((matched != negate, i + 1));
        }

        if c == b'\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == ch;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let (lo, hi) = if c <= pattern[i + 2] {
                (c, pattern[i + 2])
            } else {
                (pattern[i + 2], c)
            };
            matched |= (lo..=hi).contains(&ch);
            i += 3;
        } else {
            matched |= c == ch;
            i += 1;
        }
    }

    None
}
