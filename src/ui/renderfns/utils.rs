use chrono::{DateTime, Utc};
use marquee::api::types::UserStatus;
use ratatui::prelude::Color;

/// Truncate to at most `max_len` chars, ending with "..." if cut.
/// Newlines are flattened so list rows stay on one line.
pub fn truncate(s: &str, max_len: usize) -> String {
  let flat: String = s
    .chars()
    .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
    .collect();
  if flat.chars().count() <= max_len {
    flat
  } else {
    let kept: String = flat.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

pub fn status_color(status: UserStatus) -> Color {
  match status {
    UserStatus::Active => Color::Green,
    UserStatus::Blocked => Color::Red,
  }
}

/// Compact local timestamp for list rows
pub fn format_time(at: Option<DateTime<Utc>>) -> String {
  at.map(|at| at.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|| "-".to_string())
}

/// `★★★☆☆` style rating out of 5; ratings out of 10 are halved
pub fn stars(rating: Option<u8>) -> String {
  let Some(rating) = rating else {
    return "-".to_string();
  };
  let filled = if rating > 5 { rating.div_ceil(2) } else { rating }.min(5) as usize;
  format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("hello", 5), "hello");
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("line\nbreak", 20), "line break");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("ééééééé", 6), "ééé...");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color(UserStatus::Active), Color::Green);
    assert_eq!(status_color(UserStatus::Blocked), Color::Red);
  }

  #[test]
  fn test_format_time() {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
    assert_eq!(format_time(Some(at)), "2024-03-09 14:05");
    assert_eq!(format_time(None), "-");
  }

  #[test]
  fn test_stars() {
    assert_eq!(stars(Some(3)), "★★★☆☆");
    assert_eq!(stars(Some(9)), "★★★★★");
    assert_eq!(stars(Some(0)), "☆☆☆☆☆");
    assert_eq!(stars(None), "-");
  }
}
