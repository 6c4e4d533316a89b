use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::aggregate::{PlayerFeatureSet, PlayerTrack, TeamFeatureSet, TeamTrack};
use crate::config::FeatureConfig;
use crate::error::{FeatureError, Result};
use crate::profile::assemble_profiles;
use crate::records::{GameId, GameRecord, PlayerGameRecord, TeamId, validate_game_pairs};
use crate::roster::{RosterAssignment, reconcile_all};
use crate::snapshot::SnapshotCache;
use crate::table::{FeatureTable, PlayerGameKey, TeamGameKey};
use crate::timeline::build_timelines;

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileFailure {
    pub team_id: TeamId,
    pub game_id: GameId,
    pub date: NaiveDate,
    pub error: FeatureError,
}

/// Built feature sets and per-entity tracks, kept so that unplayed games can
/// be projected after the run.
#[derive(Debug, Clone)]
pub struct FeatureModel {
    pub teams: TeamFeatureSet,
    pub team_tracks: Vec<TeamTrack>,
    pub players: PlayerFeatureSet,
    pub player_tracks: Vec<PlayerTrack>,
}

impl FeatureModel {
    pub fn team_track(&self, team_id: TeamId) -> Option<&TeamTrack> {
        self.team_tracks.iter().find(|t| t.team_id() == team_id)
    }

    pub fn snapshot_cache(&self) -> SnapshotCache<'_> {
        SnapshotCache::new(&self.players, &self.player_tracks)
    }
}

#[derive(Debug, Clone)]
pub struct FeatureRun {
    pub teams: FeatureTable<TeamGameKey>,
    pub players: FeatureTable<PlayerGameKey>,
    pub rosters: Vec<RosterAssignment>,
    pub profiles: FeatureTable<TeamGameKey>,
    pub failures: Vec<ReconcileFailure>,
    /// Set when some window or the streak shift lets a game see itself.
    pub non_causal: bool,
    pub model: FeatureModel,
}

pub fn run_features(
    games: Vec<GameRecord>,
    players: Vec<PlayerGameRecord>,
    config: &FeatureConfig,
) -> Result<FeatureRun> {
    let started = Instant::now();
    config.validate()?;
    let non_causal = !config.is_causal();
    if non_causal {
        warn!("running with non-causal windows; features include same-game statistics");
    }

    let games = games
        .into_iter()
        .map(|g| GameRecord {
            stats: g.stats.with_true_innings(),
            ..g
        })
        .collect::<Vec<_>>();
    let players = players
        .into_iter()
        .map(|p| PlayerGameRecord {
            stats: p.stats.with_true_innings(),
            ..p
        })
        .collect::<Vec<_>>();

    let team_timelines = build_timelines(games)?;
    let deduplicated = team_timelines
        .iter()
        .flat_map(|tl| tl.records().iter().cloned())
        .collect::<Vec<_>>();
    validate_game_pairs(&deduplicated)?;
    let player_timelines = build_timelines(players.iter().cloned())?;
    info!(
        teams = team_timelines.len(),
        players = player_timelines.len(),
        windows = config.windows.len(),
        "built timelines"
    );

    let team_features = TeamFeatureSet::new(config, &team_timelines);
    let player_features = PlayerFeatureSet::new(config, &player_timelines);
    let ((teams, team_tracks), (player_table, player_tracks)) = rayon::join(
        || team_features.build(&team_timelines),
        || player_features.build(&player_timelines),
    );
    info!(
        team_rows = teams.len(),
        team_columns = teams.columns().len(),
        player_rows = player_table.len(),
        player_columns = player_table.columns().len(),
        "aggregated features"
    );

    let mut rosters = Vec::new();
    let mut failures = Vec::new();
    for outcome in reconcile_all(&deduplicated, &players) {
        match outcome.result {
            Ok(roster) => rosters.push(roster),
            Err(error) => {
                warn!(
                    team_id = outcome.team_id,
                    game_id = outcome.game_id,
                    kind = error.kind(),
                    %error,
                    "roster reconciliation failed"
                );
                failures.push(ReconcileFailure {
                    team_id: outcome.team_id,
                    game_id: outcome.game_id,
                    date: outcome.date,
                    error,
                });
            }
        }
    }

    let model = FeatureModel {
        teams: team_features,
        team_tracks,
        players: player_features,
        player_tracks,
    };
    let (profiles, unmatched) = {
        let mut cache = model.snapshot_cache();
        assemble_profiles(&teams, &rosters, &model.players, &mut cache)
    };
    failures.extend(unmatched);
    failures.sort_by_key(|f| (f.date, f.game_id, f.team_id));
    info!(
        rosters = rosters.len(),
        failures = failures.len(),
        profiles = profiles.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "feature run complete"
    );

    Ok(FeatureRun {
        teams,
        players: player_table,
        rosters,
        profiles,
        failures,
        non_causal,
        model,
    })
}
