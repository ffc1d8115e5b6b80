use std::sync::OnceLock;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use regex::Regex;

pub(crate) fn epoch_now() -> i64 {
    Utc::now().timestamp()
}

pub(crate) fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn format_epoch(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// The part of a chat id before the server suffix, e.g. "15551234567" from
/// "15551234567@s.whatsapp.net".
pub(crate) fn local_part(id: &str) -> &str {
    id.split('@').next().unwrap_or(id)
}

pub(crate) fn mention_tag(id: &str) -> String {
    format!("@{}", local_part(id))
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(https?://|www\.)\S+").expect("link regex"))
}

pub(crate) fn contains_link(text: &str) -> bool {
    link_regex().is_match(text)
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

pub(crate) fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (num_str, suffix) = if s.ends_with(|c: char| c.is_ascii_alphabetic()) {
        let split = s.len() - 1;
        (&s[..split], &s[split..])
    } else {
        (s, "")
    };
    let num: u64 = num_str.parse().ok()?;
    if num == 0 {
        return None;
    }
    let secs = match suffix {
        "s" => num,
        "m" => num * 60,
        "h" => num * 3600,
        "d" => num * 86400,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

pub(crate) fn format_duration_human(secs: u64) -> String {
    if secs < 60 {
        format!("{secs} seconds")
    } else if secs < 3600 {
        format!("{} minutes", secs / 60)
    } else if secs < 86400 {
        format!("{} hours", secs / 3600)
    } else {
        format!("{} days", secs / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_part() {
        assert_eq!(local_part("15551234567@s.whatsapp.net"), "15551234567");
        assert_eq!(local_part("no-suffix"), "no-suffix");
    }

    #[test]
    fn test_mention_tag() {
        assert_eq!(mention_tag("1555@s.whatsapp.net"), "@1555");
    }

    #[test]
    fn test_contains_link() {
        assert!(contains_link("check https://example.com out"));
        assert!(contains_link("HTTPS://EXAMPLE.COM"));
        assert!(contains_link("go to www.example.com now"));
        assert!(!contains_link("no links here"));
        assert!(!contains_link("http is a protocol"));
    }

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("hello world", 5), "hello...");
    }

    #[test]
    fn test_truncate_char_boundary() {
        // multi-byte char straddling the cut must not panic
        let s = "héllo wörld";
        let t = truncate(s, 2);
        assert!(t.ends_with("..."));
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1d"), Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_parse_duration_rejects() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("0m"), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("10x"), None);
        assert_eq!(parse_duration("10"), None);
    }

    #[test]
    fn test_format_duration_human() {
        assert_eq!(format_duration_human(45), "45 seconds");
        assert_eq!(format_duration_human(300), "5 minutes");
        assert_eq!(format_duration_human(7200), "2 hours");
        assert_eq!(format_duration_human(172800), "2 days");
    }

    #[test]
    fn test_format_epoch() {
        assert_eq!(format_epoch(0), "1970-01-01 00:00 UTC");
    }
}
