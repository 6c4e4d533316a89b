use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::aggregate::PlayerFeatureSet;
use crate::error::FeatureError;
use crate::pipeline::ReconcileFailure;
use crate::records::{GameId, PlayerId, TeamId};
use crate::roster::{RosterAssignment, RosterSlot};
use crate::snapshot::SnapshotCache;
use crate::table::{FeatureRow, FeatureTable, TeamGameKey};

/// Team columns followed by `{slot}_{column}` for every roster slot.
pub fn profile_columns(team_columns: &[String], players: &PlayerFeatureSet) -> Vec<String> {
    let mut out = team_columns.to_vec();
    for slot in RosterSlot::all() {
        let label = slot.label();
        out.extend(
            players
                .domain_columns(slot.domain())
                .into_iter()
                .map(|c| format!("{label}_{c}")),
        );
    }
    out
}

pub fn profile_row(
    team_values: &[Option<f64>],
    slots: &[(RosterSlot, PlayerId)],
    date: NaiveDate,
    game_id: GameId,
    cache: &mut SnapshotCache<'_>,
) -> Vec<Option<f64>> {
    let mut out = team_values.to_vec();
    for (slot, player_id) in slots {
        out.extend(cache.snapshot(*player_id, slot.domain(), date, game_id));
    }
    out
}

/// Profiles for every roster with a team row. Rosters without one are
/// returned as failures.
pub fn assemble_profiles(
    teams: &FeatureTable<TeamGameKey>,
    rosters: &[RosterAssignment],
    players: &PlayerFeatureSet,
    cache: &mut SnapshotCache<'_>,
) -> (FeatureTable<TeamGameKey>, Vec<ReconcileFailure>) {
    let team_rows: HashMap<(TeamId, GameId), usize> = teams
        .rows()
        .iter()
        .enumerate()
        .map(|(i, r)| ((r.key.team_id, r.key.game_id), i))
        .collect();

    let mut rows = Vec::with_capacity(rosters.len());
    let mut failures = Vec::new();
    for roster in rosters {
        let Some(&idx) = team_rows.get(&(roster.team_id, roster.game_id)) else {
            warn!(
                team_id = roster.team_id,
                game_id = roster.game_id,
                "roster has no team game record; skipping profile"
            );
            failures.push(ReconcileFailure {
                team_id: roster.team_id,
                game_id: roster.game_id,
                date: roster.date,
                error: FeatureError::MissingTeamGame {
                    team_id: roster.team_id,
                    game_id: roster.game_id,
                },
            });
            continue;
        };
        let team_row = &teams.rows()[idx];
        rows.push(FeatureRow {
            key: team_row.key,
            values: profile_row(
                &team_row.values,
                &roster.slots(),
                roster.date,
                roster.game_id,
                cache,
            ),
        });
    }
    rows.sort_by_key(|r| (r.key.date, r.key.game_id, r.key.team_id));

    let (hits, misses) = cache.stats();
    debug!(profiles = rows.len(), hits, misses, "assembled profiles");
    (
        FeatureTable::with_rows(profile_columns(teams.columns(), players), rows),
        failures,
    )
}
