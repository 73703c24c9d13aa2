//! Create/edit popup.

use callme_core::validate::Field;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::form::{FIELDS, ReminderForm};

fn label(field: Field) -> &'static str {
  match field {
    Field::Title => "Title",
    Field::PhoneNumber => "Phone",
    Field::Date => "Date",
    Field::Time => "Time",
    Field::Timezone => "Timezone",
    Field::Message => "Message",
  }
}

fn placeholder(field: Field) -> &'static str {
  match field {
    Field::Title => "Call Mom",
    Field::PhoneNumber => "+15551234567",
    Field::Date => "YYYY-MM-DD",
    Field::Time => "HH:MM",
    Field::Timezone => "America/New_York",
    Field::Message => "What should the call say?",
  }
}

/// A rectangle of `width` x `height` centred in `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}

pub fn draw(f: &mut Frame, area: Rect, form: &ReminderForm) {
  let popup = centered(area, 72, 22);
  let title = if form.is_editing() {
    " Edit reminder "
  } else {
    " New reminder "
  };
  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(popup);
  f.render_widget(Clear, popup);
  f.render_widget(block, popup);

  // Two rows per field (input, error) plus the message body's extra room.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints(
      FIELDS
        .iter()
        .map(|field| match field {
          Field::Message => Constraint::Min(3),
          _ => Constraint::Length(2),
        })
        .collect::<Vec<_>>(),
    )
    .split(inner);

  for (i, (&field, &row)) in FIELDS.iter().zip(rows.iter()).enumerate() {
    let focused = i == form.focus;
    let value = form.value(field);

    let label_style = if focused {
      Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(Color::Gray)
    };
    let value_span = if value.is_empty() && !focused {
      Span::styled(placeholder(field), Style::default().fg(Color::DarkGray))
    } else if focused {
      Span::styled(format!("{value}_"), Style::default().fg(Color::White))
    } else {
      Span::raw(value.to_string())
    };

    let mut lines = vec![Line::from(vec![
      Span::styled(format!("{:<10}", label(field)), label_style),
      value_span,
    ])];
    if let Some(error) = form.error(field) {
      lines.push(Line::from(Span::styled(
        format!("{:<10}{error}", ""),
        Style::default().fg(Color::Red),
      )));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), row);
  }
}
