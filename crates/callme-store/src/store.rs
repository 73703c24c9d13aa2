//! [`ReminderStore`]: optimistic create/update/delete over a [`ReminderApi`].

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
  time::{Duration, Instant},
};

use chrono::Utc;
use tokio::{sync::watch, task::AbortHandle};
use uuid::Uuid;

use callme_core::{
  RemoteError,
  api::ReminderApi,
  filter::{self, ListFilter, RETRY_DELAY_MINUTES},
  input::{NewReminder, ReminderPatch},
  reminder::{Reminder, ReminderId},
};

use crate::{
  Error, Result,
  cache::{FetchTicket, Freshness, QueryCache, Transaction},
};

// ─── Keys and values ─────────────────────────────────────────────────────────

/// Identity of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
  List(ListFilter),
  Detail(Uuid),
}

impl QueryKey {
  pub fn is_list(&self) -> bool { matches!(self, Self::List(_)) }
}

/// The cached result of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Cached {
  List(Vec<Reminder>),
  Detail(Reminder),
}

impl Cached {
  pub fn as_list(&self) -> Option<&[Reminder]> {
    match self {
      Self::List(list) => Some(list),
      Self::Detail(_) => None,
    }
  }

  pub fn as_detail(&self) -> Option<&Reminder> {
    match self {
      Self::Detail(r) => Some(r),
      Self::List(_) => None,
    }
  }

  fn find(&self, id: ReminderId) -> Option<&Reminder> {
    match self {
      Self::List(list) => list.iter().find(|r| r.id == id),
      Self::Detail(r) => (r.id == id).then_some(r),
    }
  }

  fn find_mut(&mut self, id: ReminderId) -> Option<&mut Reminder> {
    match self {
      Self::List(list) => list.iter_mut().find(|r| r.id == id),
      Self::Detail(r) => (r.id == id).then_some(r),
    }
  }
}

/// Replace the record `id` in a cached value with the server's version of it.
///
/// A list entry whose new state no longer matches the list's filter is
/// dropped instead; the follow-up refetch brings it into the lists it now
/// belongs to.
fn write_back(key: &QueryKey, value: &mut Cached, id: ReminderId, saved: &Reminder) {
  match (key, value) {
    (QueryKey::List(filter), Cached::List(list)) => {
      let Some(pos) = list.iter().position(|r| r.id == id) else {
        return;
      };
      if filter.matches(saved) {
        list[pos] = saved.clone();
      } else {
        list.remove(pos);
      }
    }
    (QueryKey::Detail(_), Cached::Detail(detail)) => *detail = saved.clone(),
    _ => {}
  }
}

/// Settle the provisional record `temp_id` in a list: swap in the server's
/// record, or drop it when the create failed or the record is already there.
fn resolve(key: &QueryKey, value: &mut Cached, temp_id: ReminderId, outcome: Option<&Reminder>) {
  let (QueryKey::List(filter), Cached::List(list)) = (key, value) else {
    return;
  };
  let Some(pos) = list.iter().position(|r| r.id == temp_id) else {
    return;
  };
  match outcome {
    Some(saved) if filter.matches(saved) && !list.iter().any(|r| r.id == saved.id) => {
      list[pos] = saved.clone();
    }
    _ => {
      list.remove(pos);
    }
  }
}

async fn load<A: ReminderApi>(api: &A, key: QueryKey) -> callme_core::Result<Cached> {
  match key {
    QueryKey::List(filter) => api.list(filter).await.map(Cached::List),
    QueryKey::Detail(id) => api.get(id).await.map(Cached::Detail),
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
  /// How long a fetched query is served without a background refetch.
  pub stale_time: Duration,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      stale_time: Duration::from_secs(30),
    }
  }
}

struct State {
  cache:    QueryCache<QueryKey, Cached>,
  /// Background fetch per key; replaced (and aborted) by a newer one.
  tasks:    HashMap<QueryKey, (FetchTicket, AbortHandle)>,
  /// Creates that have settled while other mutations were still in flight.
  /// Those mutations' snapshots may hold the provisional record.
  resolved: HashMap<ReminderId, Option<Reminder>>,
}

impl State {
  /// Record how the create of `temp_id` ended and apply it to `keys`, the
  /// lists the create no longer owns.
  fn resolve_create(&mut self, keys: &[QueryKey], temp_id: ReminderId, outcome: Option<&Reminder>) {
    for key in keys {
      self.cache.patch(key, |v| resolve(key, v, temp_id, outcome));
    }
    self.resolved.insert(temp_id, outcome.cloned());
    self.prune_resolved();
  }

  /// Re-settle provisional records that a rollback restored from its snapshot.
  fn reapply_resolved(&mut self, keys: &[QueryKey]) {
    for (temp_id, outcome) in &self.resolved {
      for key in keys {
        self.cache.patch(key, |v| resolve(key, v, *temp_id, outcome.as_ref()));
      }
    }
    self.prune_resolved();
  }

  fn prune_resolved(&mut self) {
    if !self.cache.has_pending() {
      self.resolved.clear();
    }
  }

  /// Drop `key` and stop any background fetch of it.
  fn forget(&mut self, key: &QueryKey) {
    self.cache.remove(key);
    if let Some((_, handle)) = self.tasks.remove(key) {
      handle.abort();
    }
  }
}

struct Inner<A> {
  api:     A,
  config:  StoreConfig,
  state:   Mutex<State>,
  /// Bumped after every cache write.
  changes: watch::Sender<u64>,
}

/// Client-side cache of reminder queries with optimistic mutations.
///
/// Cloning is cheap; clones share one cache. Every method that touches the
/// cache does so under a single lock and publishes one change notification,
/// so a subscriber never observes a half-applied mutation.
pub struct ReminderStore<A> {
  inner: Arc<Inner<A>>,
}

impl<A> Clone for ReminderStore<A> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<A: ReminderApi + 'static> ReminderStore<A> {
  pub fn new(api: A, config: StoreConfig) -> Self {
    let (changes, _) = watch::channel(0);
    Self {
      inner: Arc::new(Inner {
        api,
        config,
        state: Mutex::new(State {
          cache:    QueryCache::new(),
          tasks:    HashMap::new(),
          resolved: HashMap::new(),
        }),
        changes,
      }),
    }
  }

  pub fn api(&self) -> &A { &self.inner.api }

  /// A receiver that is marked changed whenever the cache is written.
  pub fn subscribe(&self) -> watch::Receiver<u64> { self.inner.changes.subscribe() }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Run `f` under the lock, then notify subscribers.
  fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
    let out = f(&mut self.lock());
    self.inner.changes.send_modify(|n| *n = n.wrapping_add(1));
    out
  }

  // ── Cache reads ───────────────────────────────────────────────────────────

  /// The cached list for `filter`, without fetching.
  pub fn cached_list(&self, filter: ListFilter) -> Option<Vec<Reminder>> {
    let state = self.lock();
    state
      .cache
      .get(&QueryKey::List(filter))
      .and_then(Cached::as_list)
      .map(<[Reminder]>::to_vec)
  }

  /// The cached detail record for `id`, without fetching.
  pub fn cached(&self, id: Uuid) -> Option<Reminder> {
    let state = self.lock();
    state
      .cache
      .get(&QueryKey::Detail(id))
      .and_then(Cached::as_detail)
      .cloned()
  }

  /// Any cached copy of `id`, preferring the detail record over list entries.
  pub fn find(&self, id: ReminderId) -> Option<Reminder> {
    let state = self.lock();
    if let Some(r) = id
      .remote()
      .and_then(|uuid| state.cache.get(&QueryKey::Detail(uuid)))
      .and_then(|v| v.find(id))
    {
      return Some(r.clone());
    }
    state
      .cache
      .keys()
      .filter(|k| k.is_list())
      .find_map(|k| state.cache.get(k).and_then(|v| v.find(id)))
      .cloned()
  }

  pub fn freshness(&self, key: QueryKey) -> Freshness {
    self
      .lock()
      .cache
      .freshness(&key, self.inner.config.stale_time, Instant::now())
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  /// Reminders matching `filter`.
  ///
  /// A previously fetched filter is answered from the cache straight away;
  /// if it is stale a refetch runs in the background. Only a filter never
  /// seen before waits for the network.
  pub async fn list(&self, filter: ListFilter) -> Result<Vec<Reminder>> {
    match self.query(QueryKey::List(filter)).await? {
      Cached::List(list) => Ok(list),
      Cached::Detail(r) => Ok(vec![r]),
    }
  }

  /// A single reminder with its call attempts. Same caching as [`list`].
  ///
  /// [`list`]: Self::list
  pub async fn get(&self, id: Uuid) -> Result<Reminder> {
    match self.query(QueryKey::Detail(id)).await? {
      Cached::Detail(r) => Ok(r),
      Cached::List(_) => Err(Error::Remote(RemoteError::Server {
        status:  500,
        message: "unexpected list response".to_string(),
      })),
    }
  }

  async fn query(&self, key: QueryKey) -> Result<Cached> {
    let (freshness, cached) = {
      let state = self.lock();
      (
        state
          .cache
          .freshness(&key, self.inner.config.stale_time, Instant::now()),
        state.cache.get(&key).cloned(),
      )
    };
    match (freshness, cached) {
      (Freshness::Fresh, Some(value)) => Ok(value),
      (Freshness::Stale, Some(value)) => {
        self.spawn_refresh(key);
        Ok(value)
      }
      _ => self.fetch(key).await,
    }
  }

  /// Fetch `key` and wait for the result.
  async fn fetch(&self, key: QueryKey) -> Result<Cached> {
    let ticket = self.lock().cache.begin_fetch(key);
    tracing::debug!(?key, "fetching");
    match load(&self.inner.api, key).await {
      Ok(value) => Ok(self.with_state(|s| {
        s.cache
          .finish_fetch(key, ticket, value.clone(), Instant::now());
        // A mutation may have landed meanwhile; prefer the cache's view.
        s.cache.get(&key).cloned().unwrap_or(value)
      })),
      Err(err) => {
        self.with_state(|s| {
          s.cache.abandon_fetch(&key, ticket);
          if matches!(key, QueryKey::Detail(_)) && err.status() == Some(404) {
            s.cache.remove(&key);
          }
        });
        Err(err.into())
      }
    }
  }

  /// Start fetching `key` in the background if it is not fresh.
  pub fn prefetch(&self, key: QueryKey) {
    if self.freshness(key) != Freshness::Fresh {
      self.spawn_refresh(key);
    }
  }

  /// Mark every cached query stale and refetch them.
  pub fn refresh_all(&self) {
    let ready = self.with_state(|s| s.cache.invalidate(|_| true));
    for key in ready {
      self.spawn_refresh(key);
    }
  }

  fn spawn_refresh(&self, key: QueryKey) {
    let mut state = self.lock();
    if state.cache.in_flight(&key) > 0 {
      // The mutation's settlement refetches it.
      return;
    }
    let ticket = state.cache.begin_fetch(key);
    let store = self.clone();
    let handle = tokio::spawn(async move {
      let result = load(&store.inner.api, key).await;
      store.with_state(|s| {
        if s.tasks.get(&key).is_some_and(|(t, _)| *t == ticket) {
          s.tasks.remove(&key);
        }
        match result {
          Ok(value) => {
            let outcome = s.cache.finish_fetch(key, ticket, value, Instant::now());
            tracing::debug!(?key, ?outcome, "refetched");
          }
          Err(err) => {
            s.cache.abandon_fetch(&key, ticket);
            if matches!(key, QueryKey::Detail(_)) && err.status() == Some(404) {
              s.cache.remove(&key);
            }
            tracing::warn!(?key, %err, "background refetch failed");
          }
        }
      });
    });
    if let Some((_, previous)) = state.tasks.insert(key, (ticket, handle.abort_handle())) {
      previous.abort();
    }
  }

  /// Invalidate every list, plus `detail` if given, and refetch what can be.
  fn settle(&self, detail: Option<Uuid>) {
    let ready = self.with_state(|s| {
      s.cache
        .invalidate(|k| k.is_list() || detail.is_some_and(|id| *k == QueryKey::Detail(id)))
    });
    tracing::debug!(refetching = ready.len(), "settled");
    for key in ready {
      self.spawn_refresh(key);
    }
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Create a reminder.
  ///
  /// A provisional copy (temporary id, status `scheduled`) is put at the head
  /// of every cached list it matches before the request is sent, and replaced
  /// by the server's record once it returns.
  pub async fn create(&self, input: NewReminder) -> Result<Reminder> {
    input.validate(Utc::now())?;

    let provisional = Reminder::provisional(&input, Utc::now());
    let temp_id = provisional.id;
    let tx = self.with_state(|s| {
      let keys: Vec<_> = list_keys(&s.cache)
        .filter(|k| matches!(k, QueryKey::List(f) if f.matches(&provisional)))
        .collect();
      s.cache.begin(keys, |_, value| {
        if let Cached::List(list) = value {
          list.insert(0, provisional.clone());
        }
      })
    });
    tracing::debug!(id = %temp_id, lists = tx.keys().count(), "optimistic create");

    let result = self.inner.api.create(&input).await;
    self.with_state(|s| match &result {
      Ok(saved) => {
        let settled = s
          .cache
          .commit(tx, |key, value| write_back(key, value, temp_id, saved));
        s.resolve_create(&settled.superseded, temp_id, Some(saved));
        if let Some(id) = saved.id.remote() {
          s.cache
            .insert(QueryKey::Detail(id), Cached::Detail(saved.clone()), Instant::now());
        }
      }
      Err(err) => {
        let settled = s.cache.rollback(tx);
        s.reapply_resolved(&settled.applied);
        s.resolve_create(&settled.superseded, temp_id, None);
        tracing::warn!(id = %temp_id, %err, restored = settled.applied.len(), "create rolled back");
      }
    });
    self.settle(None);
    Ok(result?)
  }

  /// Apply `patch` to reminder `id`.
  ///
  /// The detail record and every list entry for `id` show the merged fields
  /// (and a fresh `updated_at`) until the server answers.
  pub async fn update(&self, id: ReminderId, patch: ReminderPatch) -> Result<Reminder> {
    let Some(uuid) = id.remote() else {
      return Err(Error::Provisional(id));
    };
    patch.validate(Utc::now())?;

    let now = Utc::now();
    let tx = self.with_state(|s| {
      let keys = containing(&s.cache, id).chain([QueryKey::Detail(uuid)]);
      let keys: Vec<_> = keys.collect();
      s.cache.begin(keys, |_, value| {
        if let Some(r) = value.find_mut(id) {
          patch.apply_to(r, now);
        }
      })
    });
    tracing::debug!(%id, keys = tx.keys().count(), "optimistic update");

    let result = self.inner.api.update(uuid, &patch).await;
    self.settle_mutation(tx, id, &result, "update");
    self.settle(Some(uuid));
    Ok(result?)
  }

  /// Delete reminder `id`, removing it from every cached list immediately.
  pub async fn delete(&self, id: ReminderId) -> Result<()> {
    let Some(uuid) = id.remote() else {
      return Err(Error::Provisional(id));
    };

    let tx = self.with_state(|s| {
      let keys: Vec<_> = containing(&s.cache, id).collect();
      s.cache.begin(keys, |_, value| {
        if let Cached::List(list) = value {
          list.retain(|r| r.id != id);
        }
      })
    });
    tracing::debug!(%id, lists = tx.keys().count(), "optimistic delete");

    let result = self.inner.api.delete(uuid).await;
    self.with_state(|s| match &result {
      Ok(()) => {
        let _ = s.cache.commit(tx, |_, _| {});
        s.prune_resolved();
        s.forget(&QueryKey::Detail(uuid));
      }
      Err(err) => {
        let settled = s.cache.rollback(tx);
        s.reapply_resolved(&settled.applied);
        tracing::warn!(%id, %err, restored = settled.applied.len(), "delete rolled back");
      }
    });
    self.settle(None);
    Ok(result?)
  }

  /// Reschedule a failed reminder a few minutes from now.
  pub async fn retry(&self, id: ReminderId) -> Result<Reminder> {
    let at = filter::reschedule_time(Utc::now(), RETRY_DELAY_MINUTES);
    self.update(id, ReminderPatch::reschedule(at)).await
  }

  fn settle_mutation(
    &self,
    tx: Transaction<QueryKey, Cached>,
    id: ReminderId,
    result: &callme_core::Result<Reminder>,
    op: &'static str,
  ) {
    self.with_state(|s| match result {
      Ok(saved) => {
        let settled = s
          .cache
          .commit(tx, |key, value| write_back(key, value, id, saved));
        s.prune_resolved();
        if !settled.superseded.is_empty() {
          tracing::debug!(%id, op, superseded = settled.superseded.len(), "newer writes kept");
        }
      }
      Err(err) => {
        let settled = s.cache.rollback(tx);
        s.reapply_resolved(&settled.applied);
        tracing::warn!(
          %id,
          op,
          %err,
          restored = settled.applied.len(),
          superseded = settled.superseded.len(),
          "rolled back"
        );
      }
    });
  }
}

#[cfg(test)]
impl<A: ReminderApi + 'static> ReminderStore<A> {
  /// Background fetches still tracked.
  pub(crate) fn background_tasks(&self) -> usize { self.lock().tasks.len() }
}

fn list_keys(cache: &QueryCache<QueryKey, Cached>) -> impl Iterator<Item = QueryKey> + '_ {
  cache.keys().filter(|k| k.is_list()).copied()
}

/// Cached lists that currently hold `id`.
fn containing(
  cache: &QueryCache<QueryKey, Cached>,
  id: ReminderId,
) -> impl Iterator<Item = QueryKey> + '_ {
  list_keys(cache).filter(move |k| cache.get(k).is_some_and(|v| v.find(id).is_some()))
}
