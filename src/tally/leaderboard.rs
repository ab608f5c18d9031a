//! Leaderboard text rendering.

use chrono::{DateTime, FixedOffset};

use super::UserTally;

/// Header and footer wording of a leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Requested on demand with `/top`.
    Current,
    /// Posted every hour inside the active window.
    Hourly,
    /// Posted once at the end of the day, right before the reset.
    Final,
}

impl Framing {
    fn header(self, n: usize) -> String {
        match self {
            Self::Current => format!("📊 今日活跃排行榜 Top {n}"),
            Self::Hourly => format!("⏰ 整点活跃排行榜 Top {n}"),
            Self::Final => format!("🏆 今日最终活跃排行榜 Top {n}"),
        }
    }
}

/// Renders ranked tallies as a numbered list.
///
/// Returns `None` for an empty list; callers skip the broadcast then.
#[must_use]
pub fn render(entries: &[UserTally], framing: Framing, now: DateTime<FixedOffset>) -> Option<String> {
    if entries.is_empty() {
        return None;
    }

    let mut lines = vec![framing.header(entries.len()), String::new()];
    lines.extend(
        entries
            .iter()
            .enumerate()
            .map(|(rank, entry)| format!("{}. {}", rank + 1, ranked_line(entry))),
    );
    lines.push(String::new());
    lines.push(format!(
        "统计时间 {} ({})",
        now.format("%Y-%m-%d %H:%M"),
        utc_label(now.offset())
    ));
    if framing == Framing::Final {
        lines.push("计数已清零，明天继续加油！".to_owned());
    }

    Some(lines.join("\n"))
}

/// Name, optional handle and count of one entry.
fn ranked_line(entry: &UserTally) -> String {
    match entry.username.as_deref().filter(|u| !u.is_empty()) {
        Some(username) => format!("{} @{username} {}条", display_name(entry), entry.count),
        None => format!("{} {}条", display_name(entry), entry.count),
    }
}

fn display_name(entry: &UserTally) -> String {
    let name = entry.display_name.trim();
    if name.is_empty() {
        format!("用户{}", entry.user_id)
    } else {
        name.to_owned()
    }
}

/// Formats an offset as `UTC+8`, `UTC-3:30` or `UTC`.
fn utc_label(offset: &FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    if secs == 0 {
        return "UTC".to_owned();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.unsigned_abs();
    let (hours, minutes) = (secs / 3600, (secs % 3600) / 60);
    if minutes == 0 {
        format!("UTC{sign}{hours}")
    } else {
        format!("UTC{sign}{hours}:{minutes:02}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn tally(user_id: u64, name: &str, username: Option<&str>, count: u64) -> UserTally {
        UserTally {
            user_id,
            display_name: name.to_owned(),
            username: username.map(str::to_owned),
            count,
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_empty_renders_nothing() {
        assert!(render(&[], Framing::Hourly, at(12, 0)).is_none());
    }

    #[test]
    fn test_numbered_lines() {
        let entries = [
            tally(1, "Alice", Some("alice"), 5),
            tally(2, "Bob", None, 3),
        ];
        let text = render(&entries, Framing::Hourly, at(12, 0)).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "⏰ 整点活跃排行榜 Top 2");
        assert_eq!(lines[2], "1. Alice @alice 5条");
        assert_eq!(lines[3], "2. Bob 3条");
        assert_eq!(lines[5], "统计时间 2024-05-01 12:00 (UTC+8)");
        assert!(!text.contains("清零"));
    }

    #[test]
    fn test_final_framing_mentions_reset() {
        let entries = [tally(1, "Alice", Some("alice"), 5)];
        let text = render(&entries, Framing::Final, at(23, 59)).unwrap();
        assert!(text.starts_with("🏆 今日最终活跃排行榜 Top 1"));
        assert!(text.ends_with("计数已清零，明天继续加油！"));
    }

    #[test]
    fn test_full_final_board() {
        let entries = [
            tally(1, "Alice", Some("alice"), 5),
            tally(2, "Bob", Some(""), 2),
        ];
        let text = render(&entries, Framing::Final, at(23, 59)).unwrap();
        assert_eq!(
            text,
            "🏆 今日最终活跃排行榜 Top 2\n\n\
             1. Alice @alice 5条\n\
             2. Bob 2条\n\n\
             统计时间 2024-05-01 23:59 (UTC+8)\n\
             计数已清零，明天继续加油！"
        );
    }

    #[test]
    fn test_blank_name_falls_back_to_id() {
        let entries = [tally(77, "  ", None, 1)];
        let text = render(&entries, Framing::Current, at(9, 5)).unwrap();
        assert!(text.contains("1. 用户77 1条"));
    }

    #[test]
    fn test_utc_label() {
        assert_eq!(utc_label(&FixedOffset::east_opt(0).unwrap()), "UTC");
        assert_eq!(utc_label(&FixedOffset::east_opt(8 * 3600).unwrap()), "UTC+8");
        assert_eq!(utc_label(&FixedOffset::west_opt(3 * 3600 + 1800).unwrap()), "UTC-3:30");
    }
}
