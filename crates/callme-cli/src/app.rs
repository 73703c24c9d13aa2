//! Application state machine and event dispatcher.
//!
//! The app never owns reminder data: every frame reads the store's cache.
//! Mutations are spawned onto the runtime and report back through an
//! [`Outcome`] channel drained by the event loop.

use std::future::Future;

use callme_core::{
  api::ReminderApi,
  filter::{self, ListFilter, SortOrder, StatusCounts},
  reminder::{Reminder, ReminderId, ReminderStatus},
};
use callme_store::{QueryKey, ReminderStore};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use crate::form::{ReminderForm, Submission};

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// Focus on the reminder list.
  List,
  /// Focus on the detail pane of the selected reminder.
  Detail,
  /// The create/edit popup.
  Form,
}

/// Result of a background action, reported to the status bar.
#[derive(Debug)]
pub enum Outcome {
  Done(String),
  /// The server accepted a new reminder.
  Created(Reminder),
  Failed {
    action: &'static str,
    error:  callme_store::Error,
  },
}

/// Status tabs, in display order.
pub const TABS: [Option<ReminderStatus>; 4] = [
  None,
  Some(ReminderStatus::Scheduled),
  Some(ReminderStatus::Completed),
  Some(ReminderStatus::Failed),
];

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<A> {
  pub screen: Screen,

  /// Index into [`TABS`].
  pub tab: usize,

  /// Search text applied on top of the tab's list.
  pub search: String,

  /// Whether the user is typing a search query.
  pub search_active: bool,

  pub sort: SortOrder,

  /// Cursor position within the visible list.
  pub list_cursor: usize,

  /// Scroll offset within the detail pane.
  pub detail_scroll: usize,

  pub selected: Option<ReminderId>,

  pub form: Option<ReminderForm>,

  /// Reminder awaiting a `y` to confirm deletion.
  pub pending_delete: Option<ReminderId>,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  /// Timezone pre-filled in new reminders.
  pub default_timezone: String,

  pub store: ReminderStore<A>,

  outcomes_tx: mpsc::UnboundedSender<Outcome>,
  outcomes_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl<A: ReminderApi + 'static> App<A> {
  pub fn new(store: ReminderStore<A>, default_timezone: String) -> Self {
    let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
    Self {
      screen: Screen::List,
      tab: 0,
      search: String::new(),
      search_active: false,
      sort: SortOrder::default(),
      list_cursor: 0,
      detail_scroll: 0,
      selected: None,
      form: None,
      pending_delete: None,
      status_msg: String::new(),
      default_timezone,
      store,
      outcomes_tx,
      outcomes_rx,
    }
  }

  // ── Data ──────────────────────────────────────────────────────────────────

  /// Fetch the unfiltered list, which also feeds the tab counts.
  pub async fn load(&mut self) {
    self.status_msg = "Loading reminders…".into();
    match self.store.list(ListFilter::ALL).await {
      Ok(_) => self.status_msg.clear(),
      Err(e) => self.status_msg = format!("Error: {}", e.user_message()),
    }
  }

  pub fn filter(&self) -> ListFilter {
    ListFilter {
      status: TABS[self.tab],
    }
  }

  /// The current tab's cached list, searched and sorted.
  pub fn visible(&self) -> Vec<Reminder> {
    let mut list: Vec<_> = self
      .store
      .cached_list(self.filter())
      .unwrap_or_default()
      .into_iter()
      .filter(|r| filter::matches_search(r, &self.search))
      .collect();
    filter::sort_by_schedule(&mut list, self.sort);
    list
  }

  /// Whether the current tab has been loaded at least once.
  pub fn loaded(&self) -> bool { self.store.cached_list(self.filter()).is_some() }

  pub fn counts(&self) -> StatusCounts {
    StatusCounts::tally(&self.store.cached_list(ListFilter::ALL).unwrap_or_default())
  }

  pub fn cursor_reminder(&self) -> Option<Reminder> {
    self.visible().into_iter().nth(self.list_cursor)
  }

  /// The selected reminder, with call attempts once the detail has loaded.
  pub fn selected_reminder(&self) -> Option<Reminder> {
    self.selected.and_then(|id| self.store.find(id))
  }

  /// Apply finished background actions. Returns whether anything arrived.
  pub fn drain_outcomes(&mut self) -> bool {
    let mut any = false;
    while let Ok(outcome) = self.outcomes_rx.try_recv() {
      any = true;
      self.status_msg = match outcome {
        Outcome::Done(msg) => msg,
        Outcome::Created(saved) => {
          // An open provisional copy is replaced by the saved record.
          if self
            .selected
            .is_some_and(|id| id.is_provisional() && self.store.find(id).is_none())
          {
            self.selected = Some(saved.id);
          }
          format!("Reminder \"{}\" scheduled", saved.title)
        }
        Outcome::Failed { action, error } => {
          format!("Failed to {action}: {}", error.user_message())
        }
      };
    }
    let len = self.visible().len();
    if self.list_cursor >= len {
      self.list_cursor = len.saturating_sub(1);
    }
    any
  }

  fn spawn<T, F, D>(&self, action: &'static str, fut: F, done: D)
  where
    T: Send + 'static,
    F: Future<Output = callme_store::Result<T>> + Send + 'static,
    D: FnOnce(T) -> Outcome + Send + 'static,
  {
    let tx = self.outcomes_tx.clone();
    tokio::spawn(async move {
      let outcome = match fut.await {
        Ok(value) => done(value),
        Err(error) => Outcome::Failed { action, error },
      };
      // The receiver only goes away on shutdown.
      let _ = tx.send(outcome);
    });
  }

  // ── Actions ───────────────────────────────────────────────────────────────

  fn switch_tab(&mut self, tab: usize) {
    self.tab = tab % TABS.len();
    self.list_cursor = 0;
    self.store.prefetch(QueryKey::List(self.filter()));
  }

  fn open_detail(&mut self, id: ReminderId) {
    self.selected = Some(id);
    self.detail_scroll = 0;
    self.screen = Screen::Detail;
    if let Some(uuid) = id.remote() {
      self.store.prefetch(QueryKey::Detail(uuid));
    }
  }

  fn open_form(&mut self, form: ReminderForm) {
    self.form = Some(form);
    self.screen = Screen::Form;
  }

  fn close_form(&mut self) {
    self.form = None;
    self.screen = if self.selected.is_some() {
      Screen::Detail
    } else {
      Screen::List
    };
  }

  /// The reminder an action applies to: the open one, else the cursor's.
  fn target(&self) -> Option<Reminder> {
    match self.screen {
      Screen::Detail => self.selected_reminder(),
      _ => self.cursor_reminder(),
    }
  }

  fn submit_form(&mut self) {
    let Some(form) = self.form.as_mut() else {
      return;
    };
    match form.submit(Utc::now()) {
      Some(Submission::Create(input)) => {
        let store = self.store.clone();
        self.spawn(
          "create reminder",
          async move { store.create(input).await },
          Outcome::Created,
        );
        self.close_form();
      }
      Some(Submission::Update(id, patch)) => {
        let store = self.store.clone();
        self.spawn(
          "update reminder",
          async move { store.update(id, patch).await },
          |r: Reminder| Outcome::Done(format!("Reminder \"{}\" updated", r.title)),
        );
        self.close_form();
      }
      None if form.has_errors() => self.status_msg = "Please fix the highlighted fields".into(),
      None => {
        self.status_msg = "Nothing to save".into();
        self.close_form();
      }
    }
  }

  fn request_delete(&mut self) {
    if let Some(r) = self.target() {
      self.status_msg = format!("Delete \"{}\"? y to confirm", r.title);
      self.pending_delete = Some(r.id);
    }
  }

  fn confirm_delete(&mut self, id: ReminderId) {
    let store = self.store.clone();
    self.spawn("delete reminder", async move { store.delete(id).await }, |(): ()| {
      Outcome::Done("Reminder deleted".to_string())
    });
    if self.selected == Some(id) {
      self.selected = None;
      self.screen = Screen::List;
    }
    self.status_msg.clear();
  }

  fn retry(&mut self) {
    let Some(r) = self.target() else {
      return;
    };
    if !r.is_retryable() {
      self.status_msg = "Only failed reminders can be retried".into();
      return;
    }
    let store = self.store.clone();
    let id = r.id;
    self.spawn("retry reminder", async move { store.retry(id).await }, |r: Reminder| {
      Outcome::Done(format!("Retrying \"{}\" in 5 minutes", r.title))
    });
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return false;
    }

    if let Some(id) = self.pending_delete.take() {
      if key.code == KeyCode::Char('y') {
        self.confirm_delete(id);
      } else {
        self.status_msg.clear();
      }
      return true;
    }

    if self.search_active {
      self.handle_search_key(key);
      return true;
    }

    match self.screen {
      Screen::List => self.handle_list_key(key),
      Screen::Detail => self.handle_detail_key(key),
      Screen::Form => {
        self.handle_form_key(key);
        true
      }
    }
  }

  fn handle_search_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.search_active = false;
        self.search.clear();
      }
      KeyCode::Enter => self.search_active = false,
      KeyCode::Backspace => {
        self.search.pop();
      }
      KeyCode::Char(c) => self.search.push(c),
      _ => {}
    }
    self.list_cursor = 0;
  }

  /// Keys shared by the list and detail screens.
  fn handle_action_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('n') => {
        let form = ReminderForm::new(&self.default_timezone);
        self.open_form(form);
      }
      KeyCode::Char('e') => match self.target() {
        Some(r) if r.id.is_provisional() => {
          self.status_msg = "Still saving, try again in a moment".into();
        }
        Some(r) => self.open_form(ReminderForm::edit(&r)),
        None => {}
      },
      KeyCode::Char('d') => self.request_delete(),
      KeyCode::Char('r') => self.retry(),
      KeyCode::Char('R') => {
        self.store.refresh_all();
        self.status_msg = "Refreshing…".into();
      }
      _ => return false,
    }
    true
  }

  fn handle_list_key(&mut self, key: KeyEvent) -> bool {
    if self.handle_action_key(key) {
      return true;
    }
    match key.code {
      KeyCode::Char('q') => return false,

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        if self.list_cursor + 1 < self.visible().len() {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if let Some(r) = self.cursor_reminder() {
          self.open_detail(r.id);
        }
      }

      KeyCode::Char('/') => {
        self.search_active = true;
        self.search.clear();
        self.list_cursor = 0;
      }

      // Tabs
      KeyCode::Tab => self.switch_tab(self.tab + 1),
      KeyCode::BackTab => self.switch_tab(self.tab + TABS.len() - 1),
      KeyCode::Char(c @ '1'..='4') => self.switch_tab(c as usize - '1' as usize),

      KeyCode::Char('s') => self.sort = self.sort.toggled(),

      _ => {}
    }
    true
  }

  fn handle_detail_key(&mut self, key: KeyEvent) -> bool {
    if self.handle_action_key(key) {
      return true;
    }
    match key.code {
      KeyCode::Char('q') => return false,

      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        self.screen = Screen::List;
        self.selected = None;
      }

      KeyCode::Down | KeyCode::Char('j') => self.detail_scroll += 1,
      KeyCode::Up | KeyCode::Char('k') => {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
      }

      _ => {}
    }
    true
  }

  fn handle_form_key(&mut self, key: KeyEvent) {
    let now = Utc::now();
    let Some(form) = self.form.as_mut() else {
      self.close_form();
      return;
    };
    match key.code {
      KeyCode::Esc => self.close_form(),
      KeyCode::Enter => self.submit_form(),
      KeyCode::Tab | KeyCode::Down => form.next_field(now),
      KeyCode::BackTab | KeyCode::Up => form.prev_field(now),
      KeyCode::Backspace => form.backspace(now),
      KeyCode::Char(c) => form.input(c, now),
      _ => {}
    }
  }
}
