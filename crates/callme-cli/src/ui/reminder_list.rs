//! Reminder list pane: left panel.

use callme_core::api::ReminderApi;
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use super::{format_in_zone, status_color};
use crate::app::App;

/// Render the current tab's reminders into `area`.
pub fn draw<A: ReminderApi + 'static>(f: &mut Frame, area: Rect, app: &App<A>) {
  let visible = app.visible();
  let label = app.filter().status.map_or("All", |s| s.label());

  let title = if app.search_active || !app.search.is_empty() {
    format!(" {label} ({} matching) ", visible.len())
  } else {
    format!(" {label} ({}) ", visible.len())
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let mut inner_area = block.inner(area);
  f.render_widget(block, area);

  if (app.search_active || !app.search.is_empty()) && inner_area.height > 2 {
    let search_area = Rect {
      y: inner_area.y + inner_area.height.saturating_sub(1),
      height: 1,
      ..inner_area
    };
    inner_area.height = inner_area.height.saturating_sub(1);

    let text = if app.search_active {
      format!("/{}_", app.search)
    } else {
      format!("/{}", app.search)
    };
    f.render_widget(
      Paragraph::new(text).style(Style::default().fg(Color::Yellow)),
      search_area,
    );
  }

  if visible.is_empty() {
    let hint = if !app.loaded() {
      "Loading…"
    } else if app.search.is_empty() {
      "No reminders here. Press n to create one."
    } else {
      "No reminders match the search."
    };
    f.render_widget(
      Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
      inner_area,
    );
    return;
  }

  let items: Vec<ListItem> = visible
    .iter()
    .map(|r| {
      let mut spans = vec![
        Span::styled(
          format!("{:<10}", r.status.label()),
          Style::default().fg(status_color(r.status)),
        ),
        Span::styled(
          format!("{}  ", format_in_zone(r.scheduled_for, &r.timezone)),
          Style::default().fg(Color::Gray),
        ),
        Span::raw(r.title.clone()),
      ];
      if r.id.is_provisional() {
        spans.push(Span::styled(
          "  saving…",
          Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::ITALIC),
        ));
      }
      ListItem::new(Line::from(spans))
    })
    .collect();

  let mut state = ListState::default();
  state.select(Some(app.list_cursor.min(visible.len() - 1)));

  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner_area,
    &mut state,
  );
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use callme_core::{
    filter::ListFilter,
    input::NewReminder,
    reminder::{Reminder, ReminderId},
  };
  use callme_store::{ReminderStore, StoreConfig};
  use chrono::{TimeDelta, Utc};
  use ratatui::{Terminal, backend::TestBackend};
  use uuid::Uuid;

  use super::*;
  use crate::testing::FakeApi;

  async fn app_with_one() -> App<Arc<FakeApi>> {
    let input = NewReminder {
      title:         "Dentist".into(),
      message:       "Confirm the cleaning appointment".into(),
      phone_number:  "+15551234567".into(),
      scheduled_for: Utc::now() + TimeDelta::days(2),
      timezone:      "UTC".into(),
    };
    let mut r = Reminder::provisional(&input, Utc::now());
    r.id = ReminderId::Remote(Uuid::new_v4());
    let api = Arc::new(FakeApi::with(vec![r]));
    let store = ReminderStore::new(api, StoreConfig::default());
    store.list(ListFilter::ALL).await.unwrap();
    App::new(store, "UTC".into())
  }

  fn render(app: &App<Arc<FakeApi>>, height: u16) -> String {
    let mut terminal = Terminal::new(TestBackend::new(60, height)).unwrap();
    terminal.draw(|f| draw(f, f.area(), app)).unwrap();
    terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect()
  }

  #[tokio::test]
  async fn search_line_yields_to_the_list_when_space_is_short() {
    let mut app = app_with_one().await;
    app.search_active = true;

    let cramped = render(&app, 3);
    assert!(cramped.contains("Dentist"));
    assert!(!cramped.contains("/_"));

    let roomy = render(&app, 6);
    assert!(roomy.contains("Dentist"));
    assert!(roomy.contains("/_"));
  }
}
