//! Wide Parquet inputs: identity columns plus one column per stat named
//! `{domain}_{stat}` (`batting_hits`, `pitching_inningspitched`, ...).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use tracing::{info, warn};

use crate::records::{DomainStats, GameRecord, PlayerGameRecord, StatDomain};

pub fn split_stat_column(name: &str) -> Option<(StatDomain, String)> {
    let (prefix, stat) = name.split_once('_')?;
    let domain = StatDomain::from_prefix(prefix)?;
    if stat.is_empty() {
        return None;
    }
    Some((domain, stat.to_ascii_lowercase()))
}

fn field_num(field: &Field) -> Option<f64> {
    let value = match field {
        Field::Byte(v) => Some(f64::from(*v)),
        Field::Short(v) => Some(f64::from(*v)),
        Field::Int(v) => Some(f64::from(*v)),
        Field::Long(v) => Some(*v as f64),
        Field::UByte(v) => Some(f64::from(*v)),
        Field::UShort(v) => Some(f64::from(*v)),
        Field::UInt(v) => Some(f64::from(*v)),
        Field::ULong(v) => Some(*v as f64),
        Field::Float(v) => Some(f64::from(*v)),
        Field::Double(v) => Some(*v),
        Field::Str(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn field_u64(field: &Field) -> Option<u64> {
    match field {
        Field::Str(s) => s.trim().parse::<u64>().ok(),
        other => {
            let v = field_num(other)?;
            (v >= 0.0 && v.fract() == 0.0).then_some(v as u64)
        }
    }
}

fn field_bool(field: &Field) -> Option<bool> {
    match field {
        Field::Bool(b) => Some(*b),
        Field::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "home" | "w" => Some(true),
            "false" | "f" | "0" | "away" | "l" => Some(false),
            _ => None,
        },
        other => field_num(other).map(|v| v != 0.0),
    }
}

fn field_date(field: &Field) -> Option<NaiveDate> {
    match field {
        Field::Date(days) => NaiveDate::from_ymd_opt(1970, 1, 1)?
            .checked_add_signed(chrono::Duration::days(i64::from(*days))),
        Field::Str(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
        }
        Field::TimestampMillis(ms) => {
            chrono::DateTime::from_timestamp_millis(*ms).map(|t| t.date_naive())
        }
        Field::TimestampMicros(us) => {
            chrono::DateTime::from_timestamp_micros(*us).map(|t| t.date_naive())
        }
        _ => None,
    }
}

/// Identity fields by name plus the parsed stat columns of one row.
struct WideRow<'a> {
    fields: Vec<(&'a String, &'a Field)>,
}

impl<'a> WideRow<'a> {
    fn new(row: &'a Row) -> Self {
        Self {
            fields: row.get_column_iter().collect(),
        }
    }

    fn get(&self, name: &str) -> Option<&'a Field> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }

    fn stats(&self) -> DomainStats {
        let mut stats = DomainStats::default();
        for (name, field) in &self.fields {
            if let Some((domain, stat)) = split_stat_column(name)
                && let Some(value) = field_num(field)
            {
                stats.set(domain, &stat, value);
            }
        }
        stats
    }
}

fn open_rows(path: &Path) -> Result<SerializedFileReader<fs::File>> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    SerializedFileReader::new(file).with_context(|| format!("open parquet reader {}", path.display()))
}

pub fn read_team_games(path: &Path) -> Result<Vec<GameRecord>> {
    let reader = open_rows(path)?;
    let iter = reader.get_row_iter(None).context("iterate team game rows")?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for row in iter {
        let row = row.context("decode team game row")?;
        let wide = WideRow::new(&row);
        let parsed = (|| {
            Some(GameRecord {
                game_id: field_u64(wide.get("game_id")?)?,
                date: field_date(wide.get("date")?)?,
                team_id: u32::try_from(field_u64(wide.get("team_id")?)?).ok()?,
                opponent_id: u32::try_from(field_u64(wide.get("opponent_id")?)?).ok()?,
                home: field_bool(wide.get("home")?)?,
                win: field_bool(wide.get("win")?)?,
                stats: wide.stats(),
            })
        })();
        match parsed {
            Some(game) => out.push(game),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "team game rows missing identity columns");
    }
    info!(path = %path.display(), rows = out.len(), "read team games");
    Ok(out)
}

pub fn read_player_games(path: &Path) -> Result<Vec<PlayerGameRecord>> {
    let reader = open_rows(path)?;
    let iter = reader.get_row_iter(None).context("iterate player game rows")?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for row in iter {
        let row = row.context("decode player game row")?;
        let wide = WideRow::new(&row);
        let parsed = (|| {
            Some(PlayerGameRecord {
                player_id: u32::try_from(field_u64(wide.get("player_id")?)?).ok()?,
                game_id: field_u64(wide.get("game_id")?)?,
                team_id: u32::try_from(field_u64(wide.get("team_id")?)?).ok()?,
                date: field_date(wide.get("date")?)?,
                position: match wide.get("position") {
                    Some(Field::Str(s)) => s.trim().to_string(),
                    _ => String::new(),
                },
                batting_order: wide
                    .get("batting_order")
                    .and_then(field_u64)
                    .and_then(|v| u32::try_from(v).ok()),
                stats: wide.stats(),
            })
        })();
        match parsed {
            Some(record) => out.push(record),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "player game rows missing identity columns");
    }
    info!(path = %path.display(), rows = out.len(), "read player games");
    Ok(out)
}
