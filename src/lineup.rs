use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FeatureError, Result};
use crate::pipeline::{FeatureModel, ReconcileFailure};
use crate::profile::{profile_columns, profile_row};
use crate::records::{GameId, PlayerId, TeamId};
use crate::roster::{FieldPosition, LINEUP_SIZE, RosterSlot};
use crate::table::{FeatureRow, FeatureTable, TeamGameKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupEntry {
    pub player_id: PlayerId,
    /// Defensive position abbreviation; `DH` has no fielding slot.
    pub position: String,
}

/// Announced lineup for a game that has not been played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupCard {
    pub game_id: GameId,
    pub date: NaiveDate,
    pub team_id: TeamId,
    pub opponent_id: TeamId,
    pub home: bool,
    pub starting_pitcher: PlayerId,
    /// Batting order, leadoff first.
    pub batters: Vec<LineupEntry>,
}

impl LineupCard {
    pub fn key(&self) -> TeamGameKey {
        TeamGameKey {
            team_id: self.team_id,
            game_id: self.game_id,
            date: self.date,
            opponent_id: self.opponent_id,
            home: self.home,
            win: None,
        }
    }

    /// Slots in profile order. The starting pitcher covers `fielder_p` unless
    /// a batter is listed at `P`.
    pub fn slots(&self) -> Result<Vec<(RosterSlot, PlayerId)>> {
        if self.batters.len() < LINEUP_SIZE {
            return Err(FeatureError::IncompleteLineup {
                team_id: self.team_id,
                game_id: self.game_id,
                missing: (self.batters.len() + 1..=LINEUP_SIZE).map(|n| n as u8).collect(),
            });
        }

        let fielder = |pos: FieldPosition| {
            self.batters
                .iter()
                .find(|e| FieldPosition::parse(&e.position) == Some(pos))
                .map(|e| e.player_id)
                .or_else(|| (pos == FieldPosition::Pitcher).then_some(self.starting_pitcher))
        };
        let missing = FieldPosition::ALL
            .into_iter()
            .filter(|pos| fielder(*pos).is_none())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(FeatureError::IncompleteFielding {
                team_id: self.team_id,
                game_id: self.game_id,
                missing,
            });
        }

        Ok(RosterSlot::all()
            .into_iter()
            .filter_map(|slot| {
                let player = match slot {
                    RosterSlot::StartingPitcher => Some(self.starting_pitcher),
                    RosterSlot::Batter(n) => self.batters.get(usize::from(n) - 1).map(|e| e.player_id),
                    RosterSlot::Fielder(pos) => fielder(pos),
                };
                player.map(|p| (slot, p))
            })
            .collect())
    }
}

pub fn load_cards(path: &Path) -> anyhow::Result<Vec<LineupCard>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read lineup cards {}", path.display()))?;
    serde_json::from_str::<Vec<LineupCard>>(&raw)
        .with_context(|| format!("parse lineup cards {}", path.display()))
}

/// Profiles for announced lineups, projected from everything recorded
/// before each card's game.
pub fn assemble_upcoming(
    cards: &[LineupCard],
    model: &FeatureModel,
) -> (FeatureTable<TeamGameKey>, Vec<ReconcileFailure>) {
    let team_columns = model.teams.columns();
    let mut table = FeatureTable::new(profile_columns(&team_columns, &model.players));
    let mut failures = Vec::new();
    let mut cache = model.snapshot_cache();

    let mut rows = Vec::new();
    for card in cards {
        let slots = match card.slots() {
            Ok(slots) => slots,
            Err(error) => {
                warn!(team_id = card.team_id, game_id = card.game_id, %error, "unusable lineup card");
                failures.push(ReconcileFailure {
                    team_id: card.team_id,
                    game_id: card.game_id,
                    date: card.date,
                    error,
                });
                continue;
            }
        };
        let team_values = match model.team_track(card.team_id) {
            Some(track) => {
                let position = track.count_before(card.date, card.game_id);
                model.teams.row(track, position, card.date)
            }
            None => {
                warn!(team_id = card.team_id, "no recorded games for team");
                vec![None; team_columns.len()]
            }
        };
        rows.push(FeatureRow {
            key: card.key(),
            values: profile_row(&team_values, &slots, card.date, card.game_id, &mut cache),
        });
    }
    rows.sort_by_key(|r| (r.key.date, r.key.game_id, r.key.team_id));
    for row in rows {
        table.push(row.key, row.values);
    }
    (table, failures)
}
