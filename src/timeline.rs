use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::Display;
use std::hash::Hash;

use chrono::NaiveDate;

use crate::error::{FeatureError, Result};
use crate::records::{GameId, GameRecord, PlayerGameRecord, PlayerId, TeamId};

pub trait TimelineRecord: Clone + PartialEq {
    type Key: Copy + Eq + Ord + Hash + Display + Send + Sync;

    fn entity(&self) -> Self::Key;
    fn game_id(&self) -> GameId;
    fn date(&self) -> NaiveDate;
}

impl TimelineRecord for GameRecord {
    type Key = TeamId;

    fn entity(&self) -> TeamId {
        self.team_id
    }

    fn game_id(&self) -> GameId {
        self.game_id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl TimelineRecord for PlayerGameRecord {
    type Key = PlayerId;

    fn entity(&self) -> PlayerId {
        self.player_id
    }

    fn game_id(&self) -> GameId {
        self.game_id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Records of one entity in causal order: `(date, game_id)` ascending.
#[derive(Debug, Clone)]
pub struct EntityTimeline<R: TimelineRecord> {
    entity: R::Key,
    records: Vec<R>,
}

impl<R: TimelineRecord> EntityTimeline<R> {
    pub fn entity(&self) -> R::Key {
        self.entity
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn position_of(&self, game_id: GameId) -> Option<usize> {
        self.records.iter().position(|r| r.game_id() == game_id)
    }

    /// Number of records strictly before `(date, game_id)`.
    pub fn count_before(&self, date: NaiveDate, game_id: GameId) -> usize {
        self.records
            .partition_point(|r| (r.date(), r.game_id()) < (date, game_id))
    }
}

pub fn build_timelines<R, I>(records: I) -> Result<Vec<EntityTimeline<R>>>
where
    R: TimelineRecord,
    I: IntoIterator<Item = R>,
{
    let mut grouped: BTreeMap<R::Key, BTreeMap<GameId, R>> = BTreeMap::new();
    for record in records {
        let by_game = grouped.entry(record.entity()).or_default();
        match by_game.entry(record.game_id()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(existing) => {
                if *existing.get() != record {
                    return Err(FeatureError::OrderingAmbiguity {
                        entity: record.entity().to_string(),
                        game_id: record.game_id(),
                    });
                }
            }
        }
    }

    Ok(grouped
        .into_iter()
        .map(|(entity, by_game)| {
            let mut records = by_game.into_values().collect::<Vec<_>>();
            records.sort_by_key(|r| (r.date(), r.game_id()));
            EntityTimeline { entity, records }
        })
        .collect())
}
