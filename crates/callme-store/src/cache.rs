//! [`QueryCache`]: a keyed cache of query results with snapshot transactions.
//!
//! Every write to a key stamps it with a fresh version. A [`Transaction`]
//! remembers, per key, the value and version it found (the snapshot) and the
//! version its own optimistic write produced. Settling a transaction only
//! touches keys still carrying that version, so a mutation never overwrites
//! state written after it began. Rolling back restores the snapshot *and* its
//! version, which lets an older transaction on the same key roll back in turn.
//!
//! The cache knows nothing about tokio; the store decides what to spawn.

use std::{
  collections::HashMap,
  hash::Hash,
  time::{Duration, Instant},
};

#[derive(Debug, Clone)]
struct Entry<V> {
  value:      V,
  version:    u64,
  /// `None` once invalidated.
  fetched_at: Option<Instant>,
  /// Transactions that have applied to this key and not yet settled.
  in_flight:  usize,
}

/// How usable a cached value is right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
  Missing,
  Stale,
  Fresh,
}

/// Identifies one fetch of one key. Only the latest ticket may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// What a fetch result did when handed back to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  Stored,
  /// A newer fetch of the same key was started, or a mutation cancelled it.
  Superseded,
  /// A mutation is in flight on the key; the result is dropped and the key
  /// stays stale until that mutation settles.
  Deferred,
}

/// Per-key results of settling a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement<K> {
  /// Keys this transaction wrote (commit) or restored (rollback).
  pub applied:    Vec<K>,
  /// Keys written by someone else since this transaction applied; left as is.
  pub superseded: Vec<K>,
}

struct Write<K, V> {
  key:             K,
  before:          V,
  before_version:  u64,
  applied_version: u64,
}

/// An applied-but-unsettled optimistic mutation.
///
/// Must be passed to [`QueryCache::commit`] or [`QueryCache::rollback`];
/// dropping it leaves its keys counted as in flight.
#[must_use = "a transaction must be committed or rolled back"]
pub struct Transaction<K, V> {
  writes: Vec<Write<K, V>>,
}

impl<K, V> Transaction<K, V> {
  pub fn keys(&self) -> impl Iterator<Item = &K> { self.writes.iter().map(|w| &w.key) }

  pub fn is_empty(&self) -> bool { self.writes.is_empty() }
}

/// A cache of query results keyed by `K`.
pub struct QueryCache<K, V> {
  entries:      HashMap<K, Entry<V>>,
  /// Latest outstanding fetch per key.
  fetches:      HashMap<K, u64>,
  next_version: u64,
  next_ticket:  u64,
}

impl<K, V> Default for QueryCache<K, V> {
  fn default() -> Self {
    Self {
      entries:      HashMap::new(),
      fetches:      HashMap::new(),
      next_version: 1,
      next_ticket:  1,
    }
  }
}

impl<K, V> QueryCache<K, V>
where
  K: Eq + Hash + Clone,
  V: Clone,
{
  pub fn new() -> Self { Self::default() }

  fn bump(&mut self) -> u64 {
    let v = self.next_version;
    self.next_version += 1;
    v
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn get(&self, key: &K) -> Option<&V> { self.entries.get(key).map(|e| &e.value) }

  pub fn contains(&self, key: &K) -> bool { self.entries.contains_key(key) }

  pub fn keys(&self) -> impl Iterator<Item = &K> { self.entries.keys() }

  /// Current version of `key`, for callers that want to detect changes.
  pub fn version(&self, key: &K) -> Option<u64> { self.entries.get(key).map(|e| e.version) }

  pub fn in_flight(&self, key: &K) -> usize {
    self.entries.get(key).map_or(0, |e| e.in_flight)
  }

  pub fn freshness(&self, key: &K, stale_time: Duration, now: Instant) -> Freshness {
    match self.entries.get(key) {
      None => Freshness::Missing,
      Some(Entry {
        fetched_at: Some(at),
        ..
      }) if now.saturating_duration_since(*at) < stale_time => Freshness::Fresh,
      Some(_) => Freshness::Stale,
    }
  }

  // ── Plain writes ──────────────────────────────────────────────────────────

  /// Store `value` as freshly fetched, outside of any transaction.
  pub fn insert(&mut self, key: K, value: V, now: Instant) {
    let version = self.bump();
    let in_flight = self.in_flight(&key);
    self.entries.insert(key, Entry {
      value,
      version,
      fetched_at: Some(now),
      in_flight,
    });
  }

  pub fn remove(&mut self, key: &K) -> Option<V> {
    self.fetches.remove(key);
    self.entries.remove(key).map(|e| e.value)
  }

  /// Edit `key` in place, keeping its version.
  ///
  /// For changes that belong to no transaction and must not take a key away
  /// from the one that owns it. Returns `false` if `key` is not cached.
  pub fn patch(&mut self, key: &K, f: impl FnOnce(&mut V)) -> bool {
    match self.entries.get_mut(key) {
      Some(entry) => {
        f(&mut entry.value);
        true
      }
      None => false,
    }
  }

  /// Whether any transaction is still unsettled.
  pub fn has_pending(&self) -> bool { self.entries.values().any(|e| e.in_flight > 0) }

  /// Mark every key matching `pred` as stale.
  ///
  /// Returns the matched keys that are safe to refetch now, i.e. those with
  /// no transaction in flight.
  pub fn invalidate(&mut self, mut pred: impl FnMut(&K) -> bool) -> Vec<K> {
    let mut ready = Vec::new();
    for (key, entry) in self.entries.iter_mut().filter(|(k, _)| pred(k)) {
      entry.fetched_at = None;
      if entry.in_flight == 0 {
        ready.push(key.clone());
      }
    }
    ready
  }

  // ── Fetch coordination ────────────────────────────────────────────────────

  /// Start a fetch of `key`, superseding any fetch already outstanding.
  pub fn begin_fetch(&mut self, key: K) -> FetchTicket {
    let ticket = self.next_ticket;
    self.next_ticket += 1;
    self.fetches.insert(key, ticket);
    FetchTicket(ticket)
  }

  pub fn is_fetching(&self, key: &K) -> bool { self.fetches.contains_key(key) }

  /// Forget the outstanding fetch of `key` so its result will be discarded.
  pub fn cancel_fetch(&mut self, key: &K) -> bool { self.fetches.remove(key).is_some() }

  /// Forget a failed fetch, if it is still the latest one.
  pub fn abandon_fetch(&mut self, key: &K, ticket: FetchTicket) {
    if self.fetches.get(key) == Some(&ticket.0) {
      self.fetches.remove(key);
    }
  }

  /// Hand back the result of a fetch.
  pub fn finish_fetch(
    &mut self,
    key: K,
    ticket: FetchTicket,
    value: V,
    now: Instant,
  ) -> FetchOutcome {
    if self.fetches.get(&key) != Some(&ticket.0) {
      return FetchOutcome::Superseded;
    }
    self.fetches.remove(&key);
    if self.in_flight(&key) > 0 {
      return FetchOutcome::Deferred;
    }
    self.insert(key, value, now);
    FetchOutcome::Stored
  }

  // ── Transactions ──────────────────────────────────────────────────────────

  /// Snapshot each cached key in `keys`, then apply `apply` to it.
  ///
  /// Keys with no cached value are skipped. Outstanding fetches of the
  /// touched keys are cancelled so an older response cannot land on top of
  /// the optimistic value.
  pub fn begin(
    &mut self,
    keys: impl IntoIterator<Item = K>,
    mut apply: impl FnMut(&K, &mut V),
  ) -> Transaction<K, V> {
    let mut writes = Vec::new();
    for key in keys {
      if !self.entries.contains_key(&key) {
        continue;
      }
      self.fetches.remove(&key);
      let version = self.bump();
      let Some(entry) = self.entries.get_mut(&key) else {
        continue;
      };
      let before = entry.value.clone();
      let before_version = entry.version;
      apply(&key, &mut entry.value);
      entry.version = version;
      entry.in_flight += 1;
      writes.push(Write {
        key,
        before,
        before_version,
        applied_version: version,
      });
    }
    Transaction { writes }
  }

  /// Settle `tx` successfully, passing each key it still owns to `write`.
  pub fn commit(
    &mut self,
    tx: Transaction<K, V>,
    mut write: impl FnMut(&K, &mut V),
  ) -> Settlement<K> {
    let mut settlement = Settlement {
      applied:    Vec::new(),
      superseded: Vec::new(),
    };
    for w in tx.writes {
      let version = self.bump();
      let Some(entry) = self.entries.get_mut(&w.key) else {
        continue;
      };
      entry.in_flight = entry.in_flight.saturating_sub(1);
      if entry.version == w.applied_version {
        write(&w.key, &mut entry.value);
        entry.version = version;
        settlement.applied.push(w.key);
      } else {
        settlement.superseded.push(w.key);
      }
    }
    settlement
  }

  /// Settle `tx` as failed: restore each key it still owns to its snapshot.
  pub fn rollback(&mut self, tx: Transaction<K, V>) -> Settlement<K> {
    let mut settlement = Settlement {
      applied:    Vec::new(),
      superseded: Vec::new(),
    };
    for w in tx.writes {
      let Some(entry) = self.entries.get_mut(&w.key) else {
        continue;
      };
      entry.in_flight = entry.in_flight.saturating_sub(1);
      if entry.version == w.applied_version {
        entry.value = w.before;
        entry.version = w.before_version;
        settlement.applied.push(w.key);
      } else {
        settlement.superseded.push(w.key);
      }
    }
    settlement
  }
}
