use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// What the header shows besides the shortcuts
pub struct HeaderContext<'a> {
  pub title: &'a str,
  /// Context of the current view, e.g. the movie whose comments are open
  pub scope: Option<&'a str>,
  pub loading: bool,
  /// Advances the spinner
  pub frame_count: u64,
}

/// Draw the header bar with title, view scope, activity and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  ctx: &HeaderContext<'_>,
  shortcuts: &[ShortcutInfo],
) {
  let separator = Style::default().fg(Color::DarkGray);
  let mut spans = vec![
    Span::styled(" marquee ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", separator),
    Span::styled(format!(" {} ", ctx.title), Style::default().fg(Color::White)),
  ];

  if let Some(scope) = ctx.scope {
    spans.push(Span::styled("│", separator));
    spans.push(Span::styled(
      format!(" {} ", scope),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }

  spans.push(Span::styled("│", separator));
  spans.push(activity_span(ctx.loading, ctx.frame_count));
  spans.push(Span::raw("  "));

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}   ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn activity_span(loading: bool, frame_count: u64) -> Span<'static> {
  if loading {
    let glyph = SPINNER[(frame_count % SPINNER.len() as u64) as usize];
    Span::styled(
      format!(" {} loading ", glyph),
      Style::default().fg(Color::Yellow),
    )
  } else {
    Span::styled(" idle ", Style::default().fg(Color::DarkGray))
  }
}
