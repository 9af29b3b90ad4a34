// fraglog - core/report.rs
//
// JSON reports over digested matches.
// Core layer: writes to any Write trait object.
//
// Two documents, both arrays in match order with one single-key object per
// match keyed `game_<N>` (1-based):
//   1. the full match record (total_kills, players, kills, kills_by_means);
//   2. only kills_by_means.

use crate::core::model::MatchRecord;
use crate::util::constants;
use crate::util::error::ReportError;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::Write;

/// Deaths-by-cause view of a match, as emitted in the second document.
#[derive(Debug, Serialize)]
pub struct MeansSummary<'a> {
    pub kills_by_means: &'a BTreeMap<String, u64>,
}

/// Report key for the match at 0-based position `position`.
pub fn game_key(position: usize) -> String {
    format!("{}{}", constants::GAME_KEY_PREFIX, position + 1)
}

fn keyed<'a, T, F>(records: &'a [MatchRecord], view: F) -> Vec<BTreeMap<String, T>>
where
    F: Fn(&'a MatchRecord) -> T,
{
    records
        .iter()
        .enumerate()
        .map(|(i, record)| BTreeMap::from([(game_key(i), view(record))]))
        .collect()
}

/// Write the per-match report (document 1).
pub fn write_matches_report<W: Write>(
    records: &[MatchRecord],
    writer: W,
) -> Result<(), ReportError> {
    write_pretty(&keyed(records, |r| r), writer)
}

/// Write the deaths-by-cause report (document 2).
pub fn write_means_report<W: Write>(
    records: &[MatchRecord],
    writer: W,
) -> Result<(), ReportError> {
    let summaries = keyed(records, |r| MeansSummary {
        kills_by_means: r.kills_by_means(),
    });
    write_pretty(&summaries, writer)
}

/// Write both documents, each preceded by a header line stamped with
/// `generated_at`.
pub fn write_full_report<W, Tz>(
    records: &[MatchRecord],
    generated_at: &DateTime<Tz>,
    mut writer: W,
) -> Result<(), ReportError>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let stamp = generated_at.format(constants::REPORT_DATE_FORMAT);

    writeln!(writer, "Matches Report - {stamp}").map_err(ReportError::Io)?;
    write_matches_report(records, &mut writer)?;

    writeln!(writer, "Deaths by Death cause - {stamp}").map_err(ReportError::Io)?;
    write_means_report(records, &mut writer)?;

    writer.flush().map_err(ReportError::Io)
}

/// Serialise `value` with 4-space indentation followed by a newline.
fn write_pretty<T: Serialize, W: Write>(value: &T, mut writer: W) -> Result<(), ReportError> {
    {
        let formatter = PrettyFormatter::with_indent(constants::REPORT_INDENT);
        let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
        value.serialize(&mut ser).map_err(ReportError::Json)?;
    }
    writer.write_all(b"\n").map_err(ReportError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::WORLD;
    use crate::core::model::Termination;
    use chrono::Utc;

    fn sample_records() -> Vec<MatchRecord> {
        let mut first = MatchRecord::new();
        first.start();
        first.register_player("Isgalamido");
        first.end(Termination::EndOfInput);

        let mut second = MatchRecord::new();
        second.start();
        second.register_player("Zeh");
        second.register_player("Mal");
        second.record_kill("Zeh", "Mal", "MOD_ROCKET");
        second.record_kill(WORLD, "Zeh", "MOD_FALLING");
        second.end(Termination::Shutdown);

        vec![first, second]
    }

    fn to_string(f: impl FnOnce(&mut Vec<u8>) -> Result<(), ReportError>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_game_keys_are_one_based() {
        assert_eq!(game_key(0), "game_1");
        assert_eq!(game_key(9), "game_10");
    }

    #[test]
    fn test_matches_report_shape() {
        let records = sample_records();
        let out = to_string(|buf| write_matches_report(&records, buf));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        let games = value.as_array().unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0]["game_1"]["players"], serde_json::json!(["Isgalamido"]));
        assert_eq!(games[0]["game_1"]["kills"]["Isgalamido"], 0);
        assert_eq!(games[1]["game_2"]["total_kills"], 2);
        assert_eq!(games[1]["game_2"]["kills"]["Zeh"], 0);
        assert_eq!(games[1]["game_2"]["kills"]["Mal"], 0);
        assert_eq!(games[1]["game_2"]["kills_by_means"]["MOD_FALLING"], 1);
    }

    #[test]
    fn test_reports_use_four_space_indent() {
        let records = sample_records();
        let out = to_string(|buf| write_matches_report(&records, buf));
        assert!(out.starts_with("[\n    {\n        \"game_1\": {\n"), "{out}");
        assert!(out.ends_with("]\n"));
    }

    #[test]
    fn test_means_report_only_has_kills_by_means() {
        let records = sample_records();
        let out = to_string(|buf| write_means_report(&records, buf));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        let second = value[1]["game_2"].as_object().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second["kills_by_means"]["MOD_ROCKET"], 1);
        assert_eq!(value[0]["game_1"]["kills_by_means"], serde_json::json!({}));
    }

    #[test]
    fn test_empty_report_is_empty_array() {
        let out = to_string(|buf| write_means_report(&[], buf));
        assert_eq!(out, "[]\n");
    }

    #[test]
    fn test_full_report_headers() {
        let records = sample_records();
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        let out = to_string(|buf| write_full_report(&records, &at, buf));

        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("Matches Report - 09/03/2024 07:05"));
        assert!(out.contains("\nDeaths by Death cause - 09/03/2024 07:05\n"));
    }
}
