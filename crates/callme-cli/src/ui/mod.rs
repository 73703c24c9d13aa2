//! TUI rendering: header tabs, list and detail panes, form popup, status bar.

pub mod reminder_detail;
pub mod reminder_form;
pub mod reminder_list;

use callme_core::{api::ReminderApi, reminder::ReminderStatus, validate};
use chrono::{DateTime, Local, Utc};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, Screen, TABS};

// ─── Shared helpers ───────────────────────────────────────────────────────────

pub fn status_color(status: ReminderStatus) -> Color {
  match status {
    ReminderStatus::Scheduled => Color::Blue,
    ReminderStatus::Completed => Color::Green,
    ReminderStatus::Failed => Color::Red,
  }
}

/// `at` as wall-clock time in the IANA zone `tz`, falling back to UTC.
pub fn format_in_zone(at: DateTime<Utc>, tz: &str) -> String {
  match validate::validate_timezone(tz) {
    Ok(zone) => at.with_timezone(&zone).format("%Y-%m-%d %H:%M %Z").to_string(),
    Err(_) => at.format("%Y-%m-%d %H:%M UTC").to_string(),
  }
}

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<A: ReminderApi + 'static>(f: &mut Frame, app: &App<A>) {
  let area = f.area();

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);

  if let Some(form) = &app.form {
    reminder_form::draw(f, area, form);
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header<A: ReminderApi + 'static>(f: &mut Frame, area: Rect, app: &App<A>) {
  let counts = app.counts();

  let mut spans = vec![Span::styled(
    " callme ",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  )];
  for (i, tab) in TABS.iter().enumerate() {
    let label = tab.map_or("All", |s| s.label());
    let text = format!(" {}:{label} ({}) ", i + 1, counts.get(*tab));
    let style = if i == app.tab {
      Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(Color::Gray)
    };
    spans.push(Span::styled(text, style));
  }

  let left_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
  let date = Local::now().format("%Y-%m-%d %H:%M").to_string();
  let pad = (area.width as usize)
    .saturating_sub(left_width)
    .saturating_sub(date.len() + 1);
  spans.push(Span::raw(" ".repeat(pad)));
  spans.push(Span::styled(
    format!("{date} "),
    Style::default().fg(Color::Gray),
  ));

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body<A: ReminderApi + 'static>(f: &mut Frame, area: Rect, app: &App<A>) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
    .split(area);

  reminder_list::draw(f, cols[0], app);

  match app.selected_reminder() {
    Some(reminder) => reminder_detail::draw(f, cols[1], app, &reminder),
    None => draw_empty_detail(f, cols[1]),
  }
}

fn draw_empty_detail(f: &mut Frame, area: Rect) {
  let block = Block::default()
    .title(" Detail ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(
    Paragraph::new("Select a reminder and press Enter, or n to create one.")
      .style(Style::default().fg(Color::DarkGray)),
    inner,
  );
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<A: ReminderApi + 'static>(f: &mut Frame, area: Rect, app: &App<A>) {
  let (mode_label, hints) = match app.screen {
    Screen::List if app.search_active => ("SEARCH", "Type to filter  Esc clear  Enter done"),
    Screen::List => (
      "LIST",
      "jk move  Enter open  / search  Tab status  s sort  n new  e edit  d delete  r retry  \
       R refresh  q quit",
    ),
    Screen::Detail => (
      "DETAIL",
      "jk scroll  Esc back  e edit  d delete  r retry  R refresh  q quit",
    ),
    Screen::Form => ("FORM", "Tab next  Shift-Tab prev  Enter save  Esc cancel"),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let sort_span = Span::styled(
    format!(" {} ", app.sort.label()),
    Style::default().fg(Color::Black).bg(Color::Gray),
  );
  let hint_span = Span::styled(format!("  {status}"), Style::default().fg(Color::Gray));

  f.render_widget(
    Paragraph::new(Line::from(vec![mode_span, sort_span, hint_span]))
      .style(Style::default().bg(Color::Black)),
    area,
  );
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn formats_in_the_reminders_zone() {
    let at = Utc.with_ymd_and_hms(2026, 10, 20, 13, 30, 0).unwrap();
    assert_eq!(format_in_zone(at, "America/New_York"), "2026-10-20 09:30 EDT");
    assert_eq!(format_in_zone(at, "Nowhere/Special"), "2026-10-20 13:30 UTC");
  }
}
