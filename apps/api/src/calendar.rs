//! iCalendar export of the obligations extracted from a document.

use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

use crate::analysis::models::Obligation;
use crate::errors::AppError;

const PRODID: &str = "-//Vidhik//Obligations Export//EN";
const MAX_LINE_OCTETS: usize = 75;

/// Resolves an obligation's timing to a calendar day.
///
/// Exact `YYYY-MM-DD` dates are used as-is, "within N days" is counted from
/// `today`, and anything else lands on `today`.
pub fn resolve_date(raw: &str, today: NaiveDate) -> NaiveDate {
    let raw = raw.trim();
    if raw.len() == 10 {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return date;
        }
    }
    within_days(raw)
        .and_then(|days| today.checked_add_days(Days::new(days)))
        .unwrap_or(today)
}

fn within_days(raw: &str) -> Option<u64> {
    let lower = raw.to_lowercase();
    let mut rest = lower.as_str();
    while let Some(pos) = rest.find("within ") {
        let after = &rest[pos + "within ".len()..];
        let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() && after[digits.len()..].starts_with(" days") {
            return digits.parse().ok();
        }
        rest = after;
    }
    None
}

/// Renders one all-day VEVENT per obligation.
pub fn render_obligations(
    document_name: &str,
    obligations: &[Obligation],
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    if obligations.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No obligations with specific dates were found to export.".to_string(),
        ));
    }

    let today = now.date_naive();
    let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
    ];

    for obligation in obligations {
        let start = resolve_date(&obligation.date, today);
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}@vidhik", Uuid::new_v4()));
        lines.push(format!("DTSTAMP:{stamp}"));
        lines.push(format!("DTSTART;VALUE=DATE:{}", start.format("%Y%m%d")));
        lines.push("DURATION:PT1H".to_string());
        lines.push(format!("SUMMARY:{}", escape_text(&obligation.description)));
        lines.push(format!(
            "DESCRIPTION:{}",
            escape_text(&format!("From document: {document_name}"))
        ));
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    Ok(out)
}

pub fn export_file_name(document_stem: &str) -> String {
    format!("{document_stem}-obligations.ics")
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Folds a content line at 75 octets without splitting UTF-8 sequences.
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for c in line.chars() {
        // Continuation lines start with a space, which counts toward the limit.
        if width + c.len_utf8() > MAX_LINE_OCTETS {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += c.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    fn obligation(description: &str, date: &str) -> Obligation {
        Obligation {
            description: description.to_string(),
            date: date.to_string(),
        }
    }

    #[test]
    fn exact_dates_are_kept() {
        assert_eq!(
            resolve_date("2025-03-01", today()),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn relative_days_count_from_today() {
        assert_eq!(
            resolve_date("Within 30 days of signing", today()),
            NaiveDate::from_ymd_opt(2025, 2, 9).unwrap()
        );
        assert_eq!(
            resolve_date("payable WITHIN 5 DAYS", today()),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
    }

    #[test]
    fn unparseable_timing_falls_back_to_today() {
        assert_eq!(resolve_date("Every month", today()), today());
        assert_eq!(resolve_date("2025-02-30", today()), today());
        assert_eq!(resolve_date("within a week", today()), today());
    }

    #[test]
    fn renders_one_event_per_obligation() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 9, 30, 0).unwrap();
        let ics = render_obligations(
            "lease.pdf",
            &[
                obligation("Pay deposit", "2025-03-01"),
                obligation("Return keys", "Within 2 days of termination"),
            ],
            now,
        )
        .unwrap();

        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
        assert!(ics.contains("DTSTART;VALUE=DATE:20250301\r\n"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20250112\r\n"));
        assert!(ics.contains("SUMMARY:Pay deposit\r\n"));
        assert!(ics.contains("DESCRIPTION:From document: lease.pdf\r\n"));
        assert!(ics.contains("DTSTAMP:20250110T093000Z\r\n"));
    }

    #[test]
    fn empty_obligations_cannot_be_exported() {
        let err = render_obligations("lease.pdf", &[], Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(
            escape_text("Pay rent; utilities, and fees\\extras\nmonthly"),
            "Pay rent\\; utilities\\, and fees\\\\extras\\nmonthly"
        );
    }

    #[test]
    fn long_lines_fold_within_limit() {
        let line = format!("SUMMARY:{}", "पट्टा".repeat(40));
        let folded = fold_line(&line);
        for part in folded.split("\r\n") {
            assert!(part.len() <= MAX_LINE_OCTETS, "{} octets", part.len());
        }
        assert_eq!(folded.replace("\r\n ", ""), line);
    }

    #[test]
    fn export_name_uses_stem() {
        assert_eq!(export_file_name("lease"), "lease-obligations.ics");
    }
}
