//! Per-entity feature tracks: windowed aggregates and reconstructed ratios
//! for teams (plus streaks and form) and for players (per stat domain).
//!
//! A track is built once from a timeline and evaluated at any position in
//! `0..=len`; evaluating at `len` projects the next, unplayed game.

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::config::FeatureConfig;
use crate::ratios::{RatioSet, TEAM_RATIOS, player_ratios};
use crate::records::{GameId, GameRecord, PlayerGameRecord, PlayerId, StatDomain, StatLine, TeamId};
use crate::streak::{STREAK_COLUMNS, StreakTrack};
use crate::table::{FeatureRow, FeatureTable, PlayerGameKey, TeamGameKey};
use crate::team_form::FormTrack;
use crate::timeline::EntityTimeline;
use crate::window::{AggregateSeries, StatCatalog, WindowSpec};

fn window_columns(catalog: &StatCatalog, ratios: &RatioSet, specs: &[WindowSpec]) -> Vec<String> {
    specs
        .iter()
        .flat_map(|spec| {
            let label = spec.label();
            catalog
                .names()
                .iter()
                .map(move |stat| format!("{stat}_{label}"))
                .chain(ratios.columns(spec))
        })
        .collect()
}

fn window_values(
    catalog: &StatCatalog,
    ratios: &RatioSet,
    series: &AggregateSeries,
    specs: &[WindowSpec],
    position: usize,
) -> Vec<Option<f64>> {
    let mut out = Vec::new();
    for spec in specs {
        let sums = series.window_sums(position, spec);
        match &sums {
            Some(sums) => out.extend(sums.iter().map(|s| s.value(spec.method))),
            None => out.extend(std::iter::repeat_n(None, catalog.len())),
        }
        out.extend(ratios.evaluate(catalog, sums.as_deref()));
    }
    out
}

fn count_before(keys: &[(NaiveDate, GameId)], date: NaiveDate, game_id: GameId) -> usize {
    keys.partition_point(|k| *k < (date, game_id))
}

#[derive(Debug, Clone)]
pub struct TeamTrack {
    team_id: TeamId,
    keys: Vec<(NaiveDate, GameId)>,
    series: AggregateSeries,
    streaks: StreakTrack,
    form: FormTrack,
}

impl TeamTrack {
    pub fn team_id(&self) -> TeamId {
        self.team_id
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Games of this team strictly before `(date, game_id)`.
    pub fn count_before(&self, date: NaiveDate, game_id: GameId) -> usize {
        count_before(&self.keys, date, game_id)
    }
}

#[derive(Debug, Clone)]
pub struct TeamFeatureSet {
    catalog: StatCatalog,
    ratios: RatioSet,
    specs: Vec<WindowSpec>,
    shift: usize,
    regular_season_games: usize,
}

impl TeamFeatureSet {
    pub fn new(config: &FeatureConfig, timelines: &[EntityTimeline<GameRecord>]) -> Self {
        let lines = timelines
            .iter()
            .flat_map(|tl| tl.records().iter().map(|g| g.stats.flatten()))
            .collect::<Vec<_>>();
        Self {
            catalog: StatCatalog::from_lines(&lines),
            ratios: RatioSet::new(TEAM_RATIOS),
            specs: config.windows.clone(),
            shift: config.shift,
            regular_season_games: config.regular_season_games,
        }
    }

    pub fn catalog(&self) -> &StatCatalog {
        &self.catalog
    }

    pub fn columns(&self) -> Vec<String> {
        let mut out = window_columns(&self.catalog, &self.ratios, &self.specs);
        out.extend(STREAK_COLUMNS.iter().map(|c| c.to_string()));
        out.extend(FormTrack::columns(&self.specs));
        out
    }

    pub fn track(&self, timeline: &EntityTimeline<GameRecord>) -> TeamTrack {
        let games = timeline.records();
        let lines = games.iter().map(|g| g.stats.flatten()).collect::<Vec<_>>();
        let line_refs = lines.iter().collect::<Vec<&StatLine>>();
        let wins = games.iter().map(|g| g.win).collect::<Vec<_>>();
        let home = games.iter().map(|g| g.home).collect::<Vec<_>>();
        TeamTrack {
            team_id: timeline.entity(),
            keys: games.iter().map(|g| (g.date, g.game_id)).collect(),
            series: AggregateSeries::from_lines(&self.catalog, &line_refs, &self.specs),
            streaks: StreakTrack::new(&wins, &home),
            form: FormTrack::new(games, &self.specs, self.shift, self.regular_season_games),
        }
    }

    /// Feature values for the game at `position` of the track, played on
    /// `date`.
    pub fn row(&self, track: &TeamTrack, position: usize, date: NaiveDate) -> Vec<Option<f64>> {
        let mut out = window_values(&self.catalog, &self.ratios, &track.series, &self.specs, position);
        out.extend(track.streaks.at(position, self.shift).to_vec());
        out.extend(track.form.row(position, date));
        out
    }

    /// One row per team-game ordered by `(date, game_id, team_id)`, plus the
    /// tracks for later projection.
    pub fn build(
        &self,
        timelines: &[EntityTimeline<GameRecord>],
    ) -> (FeatureTable<TeamGameKey>, Vec<TeamTrack>) {
        let per_team = timelines
            .par_iter()
            .map(|timeline| {
                let track = self.track(timeline);
                let rows = timeline
                    .records()
                    .iter()
                    .enumerate()
                    .map(|(i, game)| FeatureRow {
                        key: TeamGameKey::from(game),
                        values: self.row(&track, i, game.date),
                    })
                    .collect::<Vec<_>>();
                (track, rows)
            })
            .collect::<Vec<_>>();

        let mut tracks = Vec::with_capacity(per_team.len());
        let mut rows = Vec::new();
        for (track, team_rows) in per_team {
            tracks.push(track);
            rows.extend(team_rows);
        }
        rows.sort_by_key(|r| (r.key.date, r.key.game_id, r.key.team_id));
        (FeatureTable::with_rows(self.columns(), rows), tracks)
    }
}

#[derive(Debug, Clone)]
struct DomainTrack {
    keys: Vec<(NaiveDate, GameId)>,
    series: AggregateSeries,
}

/// Per-domain tracks of one player; each domain only sees the games where
/// that domain was recorded.
#[derive(Debug, Clone)]
pub struct PlayerTrack {
    player_id: PlayerId,
    domains: [DomainTrack; 3],
}

impl PlayerTrack {
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn domain_len(&self, domain: StatDomain) -> usize {
        self.domains[domain as usize].keys.len()
    }

    /// Domain games strictly before `(date, game_id)`.
    pub fn count_before(&self, domain: StatDomain, date: NaiveDate, game_id: GameId) -> usize {
        count_before(&self.domains[domain as usize].keys, date, game_id)
    }
}

#[derive(Debug, Clone)]
pub struct PlayerFeatureSet {
    catalogs: [StatCatalog; 3],
    specs: Vec<WindowSpec>,
}

impl PlayerFeatureSet {
    pub fn new(config: &FeatureConfig, timelines: &[EntityTimeline<PlayerGameRecord>]) -> Self {
        let catalogs = StatDomain::ALL.map(|domain| {
            StatCatalog::from_lines(
                timelines
                    .iter()
                    .flat_map(|tl| tl.records())
                    .filter_map(|r| r.stats.get(domain)),
            )
        });
        Self {
            catalogs,
            specs: config.windows.clone(),
        }
    }

    pub fn catalog(&self, domain: StatDomain) -> &StatCatalog {
        &self.catalogs[domain as usize]
    }

    /// Columns of one domain without the domain prefix.
    pub fn domain_columns(&self, domain: StatDomain) -> Vec<String> {
        window_columns(
            self.catalog(domain),
            &RatioSet::new(player_ratios(domain)),
            &self.specs,
        )
    }

    pub fn columns(&self) -> Vec<String> {
        StatDomain::ALL
            .iter()
            .flat_map(|domain| {
                self.domain_columns(*domain)
                    .into_iter()
                    .map(move |c| format!("{}_{c}", domain.prefix()))
            })
            .collect()
    }

    pub fn track(&self, timeline: &EntityTimeline<PlayerGameRecord>) -> PlayerTrack {
        let domains = StatDomain::ALL.map(|domain| {
            let present = timeline
                .records()
                .iter()
                .filter_map(|r| r.stats.get(domain).map(|line| (r, line)))
                .collect::<Vec<_>>();
            let lines = present.iter().map(|(_, line)| *line).collect::<Vec<_>>();
            DomainTrack {
                keys: present.iter().map(|(r, _)| (r.date, r.game_id)).collect(),
                series: AggregateSeries::from_lines(self.catalog(domain), &lines, &self.specs),
            }
        });
        PlayerTrack {
            player_id: timeline.entity(),
            domains,
        }
    }

    /// Unprefixed domain values at `position` of the domain subsequence.
    pub fn domain_row(&self, track: &PlayerTrack, domain: StatDomain, position: usize) -> Vec<Option<f64>> {
        window_values(
            self.catalog(domain),
            &RatioSet::new(player_ratios(domain)),
            &track.domains[domain as usize].series,
            &self.specs,
            position,
        )
    }

    pub fn domain_width(&self, domain: StatDomain) -> usize {
        let ratios = player_ratios(domain).len();
        self.specs.len() * (self.catalog(domain).len() + ratios)
    }

    fn record_row(&self, track: &PlayerTrack, record: &PlayerGameRecord) -> Vec<Option<f64>> {
        let mut out = Vec::new();
        for domain in StatDomain::ALL {
            if record.stats.has(domain) {
                let position = track.count_before(domain, record.date, record.game_id);
                out.extend(self.domain_row(track, domain, position));
            } else {
                out.extend(std::iter::repeat_n(None, self.domain_width(domain)));
            }
        }
        out
    }

    /// One row per player-game ordered by `(date, game_id, player_id)`.
    pub fn build(
        &self,
        timelines: &[EntityTimeline<PlayerGameRecord>],
    ) -> (FeatureTable<PlayerGameKey>, Vec<PlayerTrack>) {
        let per_player = timelines
            .par_iter()
            .map(|timeline| {
                let track = self.track(timeline);
                let rows = timeline
                    .records()
                    .iter()
                    .map(|record| FeatureRow {
                        key: PlayerGameKey::from(record),
                        values: self.record_row(&track, record),
                    })
                    .collect::<Vec<_>>();
                (track, rows)
            })
            .collect::<Vec<_>>();

        let mut tracks = Vec::with_capacity(per_player.len());
        let mut rows = Vec::new();
        for (track, player_rows) in per_player {
            tracks.push(track);
            rows.extend(player_rows);
        }
        rows.sort_by_key(|r| (r.key.date, r.key.game_id, r.key.player_id));
        (FeatureTable::with_rows(self.columns(), rows), tracks)
    }
}
