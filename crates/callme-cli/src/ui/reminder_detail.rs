//! Reminder detail pane: right panel.

use callme_core::{
  api::ReminderApi,
  call_attempt::{CallAttempt, CallAttemptStatus},
  reminder::{Reminder, ReminderStatus},
};
use chrono::{DateTime, TimeDelta, Utc};
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use super::{format_in_zone, status_color};
use crate::app::{App, Screen};

/// "in 5 minutes", "3 hours ago", "now".
pub fn relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let delta = at - now;
  let abs = delta.abs();
  if abs < TimeDelta::minutes(1) {
    return "now".to_string();
  }
  let (n, unit) = if abs < TimeDelta::hours(1) {
    (abs.num_minutes(), "minute")
  } else if abs < TimeDelta::days(1) {
    (abs.num_hours(), "hour")
  } else {
    (abs.num_days(), "day")
  };
  let plural = if n == 1 { "" } else { "s" };
  if delta > TimeDelta::zero() {
    format!("in {n} {unit}{plural}")
  } else {
    format!("{n} {unit}{plural} ago")
  }
}

fn attempt_color(status: CallAttemptStatus) -> Color {
  if status.is_failure() {
    Color::Red
  } else if status.is_terminal() {
    Color::Green
  } else {
    Color::Yellow
  }
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
  Line::from(vec![
    Span::styled(
      format!("{label:<14}"),
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    ),
    Span::raw(value),
  ])
}

fn attempt_line(attempt: &CallAttempt, tz: &str) -> Line<'static> {
  let mut spans = vec![
    Span::raw(format!("  #{:<3}", attempt.attempt_number)),
    Span::styled(
      format!("{:<11}", attempt.status.label()),
      Style::default().fg(attempt_color(attempt.status)),
    ),
    Span::styled(
      format_in_zone(attempt.initiated_at, tz),
      Style::default().fg(Color::Gray),
    ),
  ];
  if let Some(d) = attempt.duration() {
    spans.push(Span::raw(format!("  {}m {:02}s", d.num_minutes(), d.num_seconds() % 60)));
  }
  if let Some(reason) = &attempt.failure_reason {
    spans.push(Span::styled(
      format!("  {reason}"),
      Style::default().fg(Color::Red),
    ));
  }
  Line::from(spans)
}

/// Render `reminder` into `area`.
pub fn draw<A: ReminderApi + 'static>(
  f: &mut Frame,
  area: Rect,
  app: &App<A>,
  reminder: &Reminder,
) {
  let border = if app.screen == Screen::Detail {
    Color::Cyan
  } else {
    Color::DarkGray
  };
  let block = Block::default()
    .title(format!(" {} ", reminder.title))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));

  let now = Utc::now();
  let mut lines = vec![
    Line::from(vec![
      Span::styled(
        format!(" {} ", reminder.status.label()),
        Style::default()
          .fg(Color::Black)
          .bg(status_color(reminder.status)),
      ),
      Span::raw(if reminder.id.is_provisional() {
        "  saving…"
      } else {
        ""
      }),
    ]),
    Line::from(""),
    field(
      "Scheduled",
      format!(
        "{} ({})",
        format_in_zone(reminder.scheduled_for, &reminder.timezone),
        relative(reminder.scheduled_for, now)
      ),
    ),
    field("Timezone", reminder.timezone.clone()),
    field("Phone", reminder.phone_number.clone()),
    field("Created", relative(reminder.created_at, now)),
    field("Updated", relative(reminder.updated_at, now)),
  ];
  if let Some(at) = reminder.completed_at {
    lines.push(field("Completed", format_in_zone(at, &reminder.timezone)));
  }
  if reminder.retry_count > 0 {
    lines.push(field("Retries", reminder.retry_count.to_string()));
  }
  if let Some(reason) = &reminder.failure_reason {
    lines.push(Line::from(vec![
      Span::styled(
        format!("{:<14}", "Failure"),
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
      ),
      Span::styled(reason.clone(), Style::default().fg(Color::Red)),
    ]));
  }
  if reminder.status == ReminderStatus::Failed {
    lines.push(Line::from(Span::styled(
      "Press r to retry in 5 minutes.",
      Style::default().fg(Color::DarkGray),
    )));
  }

  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    "Message",
    Style::default()
      .fg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  )));
  lines.push(Line::from(reminder.message.clone()));

  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    format!("Call attempts ({})", reminder.attempt_count()),
    Style::default()
      .fg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  )));
  if reminder.call_attempts.is_empty() {
    lines.push(Line::from(Span::styled(
      "  none yet",
      Style::default().fg(Color::DarkGray),
    )));
  }
  for attempt in &reminder.call_attempts {
    lines.push(attempt_line(attempt, &reminder.timezone));
  }

  let scroll = app.detail_scroll.min(lines.len().saturating_sub(1)) as u16;
  f.render_widget(
    Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false })
      .scroll((scroll, 0)),
    area,
  );
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn relative_times() {
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    assert_eq!(relative(now + TimeDelta::seconds(20), now), "now");
    assert_eq!(relative(now + TimeDelta::minutes(5), now), "in 5 minutes");
    assert_eq!(relative(now - TimeDelta::hours(3), now), "3 hours ago");
    assert_eq!(relative(now + TimeDelta::days(1), now), "in 1 day");
    assert_eq!(relative(now - TimeDelta::minutes(1), now), "1 minute ago");
  }
}
