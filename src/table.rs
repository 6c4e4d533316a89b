use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::records::{GameId, GameRecord, PlayerGameRecord, PlayerId, TeamId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamGameKey {
    pub team_id: TeamId,
    pub game_id: GameId,
    pub date: NaiveDate,
    pub opponent_id: TeamId,
    pub home: bool,
    /// Outcome label; `None` for games not yet played.
    pub win: Option<bool>,
}

impl From<&GameRecord> for TeamGameKey {
    fn from(game: &GameRecord) -> Self {
        Self {
            team_id: game.team_id,
            game_id: game.game_id,
            date: game.date,
            opponent_id: game.opponent_id,
            home: game.home,
            win: Some(game.win),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerGameKey {
    pub player_id: PlayerId,
    pub game_id: GameId,
    pub team_id: TeamId,
    pub date: NaiveDate,
}

impl From<&PlayerGameRecord> for PlayerGameKey {
    fn from(record: &PlayerGameRecord) -> Self {
        Self {
            player_id: record.player_id,
            game_id: record.game_id,
            team_id: record.team_id,
            date: record.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow<K> {
    pub key: K,
    pub values: Vec<Option<f64>>,
}

/// Named columns plus fixed-width rows; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable<K> {
    columns: Vec<String>,
    rows: Vec<FeatureRow<K>>,
}

impl<K> FeatureTable<K> {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<FeatureRow<K>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.values.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn push(&mut self, key: K, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(FeatureRow { key, values });
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureRow<K>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`; `None` for missing values and unknown
    /// columns alike.
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.values.get(idx).copied().flatten()
    }

    pub fn find(&self, pred: impl Fn(&K) -> bool) -> Option<&FeatureRow<K>> {
        self.rows.iter().find(|r| pred(&r.key))
    }

    pub fn sort_by_key<T: Ord>(&mut self, f: impl Fn(&K) -> T) {
        self.rows.sort_by_key(|r| f(&r.key));
    }
}
