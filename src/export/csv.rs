//! Delimited text export
//!
//! `Time,Emotion` header, one `\n`-terminated row per observation in ledger
//! order. Labels are open-set, so fields are quoted when they carry a
//! delimiter, quote or line break.

use std::fmt::Write;

use super::row_time;
use crate::state::Observation;

/// Header line, without terminator
pub const CSV_HEADER: &str = "Time,Emotion";

/// Serialize observations as CSV text
///
/// A pattern chrono cannot render for a naive time falls back to `%H:%M:%S`.
pub fn to_csv(observations: &[Observation], time_format: &str) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + observations.len() * 18);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for obs in observations {
        let time = row_time(&obs.timestamp, time_format);
        // Writing to a String cannot fail
        let _ = writeln!(out, "{},{}", escape_field(&time), escape_field(obs.label.as_str()));
    }
    out
}

fn escape_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        std::borrow::Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        std::borrow::Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .unwrap()
    }

    #[test]
    fn test_csv_rows_in_ledger_order() {
        let rows = vec![
            Observation::new(at(10, 0, 0), "neutral"),
            Observation::new(at(10, 0, 3), "happy"),
        ];
        assert_eq!(
            to_csv(&rows, "%H:%M:%S"),
            "Time,Emotion\n10:00:00,neutral\n10:00:03,happy\n"
        );
    }

    #[test]
    fn test_empty_csv_is_header_only() {
        assert_eq!(to_csv(&[], "%H:%M:%S"), "Time,Emotion\n");
    }

    #[test]
    fn test_odd_labels_are_quoted() {
        let rows = vec![
            Observation::new(at(9, 30, 0), "happy, mostly"),
            Observation::new(at(9, 30, 1), "so \"sad\""),
        ];
        assert_eq!(
            to_csv(&rows, "%H:%M:%S"),
            "Time,Emotion\n09:30:00,\"happy, mostly\"\n09:30:01,\"so \"\"sad\"\"\"\n"
        );
    }

    #[test]
    fn test_custom_time_format() {
        let rows = vec![Observation::new(at(23, 59, 59), "fear")];
        assert_eq!(
            to_csv(&rows, "%Y-%m-%dT%H:%M:%S"),
            "Time,Emotion\n2024-05-01T23:59:59,fear\n"
        );
    }
}
