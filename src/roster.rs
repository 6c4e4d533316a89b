use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FeatureError, Result};
use crate::records::{GameId, GameRecord, PlayerGameRecord, PlayerId, StatDomain, TeamId};

pub const LINEUP_SIZE: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldPosition {
    #[serde(rename = "P")]
    Pitcher,
    #[serde(rename = "C")]
    Catcher,
    #[serde(rename = "1B")]
    FirstBase,
    #[serde(rename = "2B")]
    SecondBase,
    #[serde(rename = "3B")]
    ThirdBase,
    #[serde(rename = "SS")]
    Shortstop,
    #[serde(rename = "LF")]
    LeftField,
    #[serde(rename = "CF")]
    CenterField,
    #[serde(rename = "RF")]
    RightField,
}

impl FieldPosition {
    pub const ALL: [FieldPosition; LINEUP_SIZE] = [
        FieldPosition::Pitcher,
        FieldPosition::Catcher,
        FieldPosition::FirstBase,
        FieldPosition::SecondBase,
        FieldPosition::ThirdBase,
        FieldPosition::Shortstop,
        FieldPosition::LeftField,
        FieldPosition::CenterField,
        FieldPosition::RightField,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            FieldPosition::Pitcher => "P",
            FieldPosition::Catcher => "C",
            FieldPosition::FirstBase => "1B",
            FieldPosition::SecondBase => "2B",
            FieldPosition::ThirdBase => "3B",
            FieldPosition::Shortstop => "SS",
            FieldPosition::LeftField => "LF",
            FieldPosition::CenterField => "CF",
            FieldPosition::RightField => "RF",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.abbreviation().eq_ignore_ascii_case(raw))
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for FieldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RosterSlot {
    StartingPitcher,
    /// Batting order slot, 1 through 9.
    Batter(u8),
    Fielder(FieldPosition),
}

impl RosterSlot {
    /// Every slot in profile column order.
    pub fn all() -> Vec<RosterSlot> {
        let mut out = vec![RosterSlot::StartingPitcher];
        out.extend((1..=LINEUP_SIZE as u8).map(RosterSlot::Batter));
        out.extend(FieldPosition::ALL.into_iter().map(RosterSlot::Fielder));
        out
    }

    pub fn label(&self) -> String {
        match self {
            RosterSlot::StartingPitcher => "sp".to_string(),
            RosterSlot::Batter(n) => format!("batter_{n}"),
            RosterSlot::Fielder(pos) => format!("fielder_{}", pos.abbreviation().to_lowercase()),
        }
    }

    /// The stat domain whose snapshot fills this slot.
    pub fn domain(&self) -> StatDomain {
        match self {
            RosterSlot::StartingPitcher => StatDomain::Pitching,
            RosterSlot::Batter(_) => StatDomain::Batting,
            RosterSlot::Fielder(_) => StatDomain::Fielding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterAssignment {
    pub team_id: TeamId,
    pub game_id: GameId,
    pub date: NaiveDate,
    pub starting_pitcher: PlayerId,
    pub batters: [PlayerId; LINEUP_SIZE],
    /// Indexed by `FieldPosition::ALL` order.
    pub fielders: [PlayerId; LINEUP_SIZE],
}

impl RosterAssignment {
    /// `None` for a batting slot outside `1..=9`.
    pub fn player_for(&self, slot: RosterSlot) -> Option<PlayerId> {
        match slot {
            RosterSlot::StartingPitcher => Some(self.starting_pitcher),
            RosterSlot::Batter(n) => usize::from(n)
                .checked_sub(1)
                .and_then(|idx| self.batters.get(idx))
                .copied(),
            RosterSlot::Fielder(pos) => Some(self.fielders[pos.index()]),
        }
    }

    pub fn slots(&self) -> Vec<(RosterSlot, PlayerId)> {
        RosterSlot::all()
            .into_iter()
            .filter_map(|slot| Some((slot, self.player_for(slot)?)))
            .collect()
    }
}

fn batting_slot(order: Option<u32>, rank: u32) -> Option<usize> {
    let order = order?;
    let slot = order / 100;
    if order % 100 == rank && (1..=LINEUP_SIZE as u32).contains(&slot) {
        Some(slot as usize)
    } else {
        None
    }
}

/// Resolves the fixed roster of one team-game. Records must all belong to
/// `(team_id, game_id)`; they are considered in ascending player id order.
/// Identical repeats of a player's record collapse; differing ones are an
/// `OrderingAmbiguity`.
pub fn reconcile(
    team_id: TeamId,
    game_id: GameId,
    date: NaiveDate,
    players: &[&PlayerGameRecord],
) -> Result<RosterAssignment> {
    let mut players = players.to_vec();
    players.sort_by_key(|p| p.player_id);
    if let Some(pair) = players
        .windows(2)
        .find(|w| w[0].player_id == w[1].player_id && w[0] != w[1])
    {
        return Err(FeatureError::OrderingAmbiguity {
            entity: pair[0].player_id.to_string(),
            game_id,
        });
    }
    players.dedup_by_key(|p| p.player_id);

    let starters = players
        .iter()
        .filter(|p| p.stats.has(StatDomain::Pitching) && p.started(StatDomain::Pitching))
        .map(|p| p.player_id)
        .collect::<Vec<_>>();
    let &[starting_pitcher] = starters.as_slice() else {
        return Err(FeatureError::AmbiguousStarter {
            team_id,
            game_id,
            found: starters.len(),
        });
    };

    let mut batters: [Option<PlayerId>; LINEUP_SIZE] = [None; LINEUP_SIZE];
    for p in &players {
        let Some(slot) = batting_slot(p.batting_order, 0) else {
            continue;
        };
        match batters[slot - 1] {
            None => batters[slot - 1] = Some(p.player_id),
            Some(kept) => warn!(
                team_id,
                game_id,
                slot,
                kept,
                dropped = p.player_id,
                "two starters claim one batting slot"
            ),
        }
    }

    let mut assigned = batters.iter().flatten().copied().collect::<BTreeSet<_>>();
    // Every slot takes its own substitute before any fallback runs.
    for slot in 1..=LINEUP_SIZE {
        if batters[slot - 1].is_some() {
            continue;
        }
        if let Some(sub) = players
            .iter()
            .find(|p| batting_slot(p.batting_order, 1) == Some(slot) && !assigned.contains(&p.player_id))
        {
            batters[slot - 1] = Some(sub.player_id);
            assigned.insert(sub.player_id);
        }
    }

    // Most at-bats first; the stable sort keeps ascending ids on ties.
    let mut bench = players
        .iter()
        .filter(|p| p.stats.has(StatDomain::Batting) && !assigned.contains(&p.player_id))
        .collect::<Vec<_>>();
    bench.sort_by(|a, b| b.at_bats().total_cmp(&a.at_bats()));
    let mut bench = bench.into_iter();
    let mut missing = Vec::new();
    for slot in 1..=LINEUP_SIZE {
        if batters[slot - 1].is_some() {
            continue;
        }
        match bench.next() {
            Some(p) => batters[slot - 1] = Some(p.player_id),
            None => missing.push(slot as u8),
        }
    }
    if !missing.is_empty() {
        return Err(FeatureError::IncompleteLineup {
            team_id,
            game_id,
            missing,
        });
    }

    let mut fielders: [Option<PlayerId>; LINEUP_SIZE] = [None; LINEUP_SIZE];
    for p in &players {
        if !(p.stats.has(StatDomain::Fielding) && p.started(StatDomain::Fielding)) {
            continue;
        }
        let Some(pos) = FieldPosition::parse(&p.position) else {
            continue;
        };
        match fielders[pos.index()] {
            None => fielders[pos.index()] = Some(p.player_id),
            Some(kept) => warn!(
                team_id,
                game_id,
                position = %pos,
                kept,
                dropped = p.player_id,
                "two starters claim one fielding position"
            ),
        }
    }
    let missing = FieldPosition::ALL
        .into_iter()
        .filter(|pos| fielders[pos.index()].is_none())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(FeatureError::IncompleteFielding {
            team_id,
            game_id,
            missing,
        });
    }

    Ok(RosterAssignment {
        team_id,
        game_id,
        date,
        starting_pitcher,
        batters: batters.map(|b| b.unwrap_or_default()),
        fielders: fielders.map(|f| f.unwrap_or_default()),
    })
}

/// Outcome of reconciling one team-game.
#[derive(Debug, Clone)]
pub struct TeamGameRoster {
    pub team_id: TeamId,
    pub game_id: GameId,
    pub date: NaiveDate,
    pub result: Result<RosterAssignment>,
}

/// Reconciles every team-game of `games`, plus any team-game that only
/// appears in `players`, ordered by `(date, game_id, team_id)`. A team-game
/// without player records fails with `AmbiguousStarter { found: 0 }`.
pub fn reconcile_all(games: &[GameRecord], players: &[PlayerGameRecord]) -> Vec<TeamGameRoster> {
    let mut groups: BTreeMap<(NaiveDate, GameId, TeamId), Vec<&PlayerGameRecord>> = games
        .iter()
        .map(|g| ((g.date, g.game_id, g.team_id), Vec::new()))
        .collect();
    for p in players {
        groups.entry((p.date, p.game_id, p.team_id)).or_default().push(p);
    }
    let groups = groups.into_iter().collect::<Vec<_>>();
    groups
        .par_iter()
        .map(|((date, game_id, team_id), records)| TeamGameRoster {
            team_id: *team_id,
            game_id: *game_id,
            date: *date,
            result: reconcile(*team_id, *game_id, *date, records),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::DomainStats;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn player(id: PlayerId, order: Option<u32>, position: &str, at_bats: f64) -> PlayerGameRecord {
        let mut stats = DomainStats::default();
        stats.set(StatDomain::Batting, "atbats", at_bats);
        stats.set(StatDomain::Fielding, "gamesstarted", 1.0);
        if position == "P" {
            stats.set(StatDomain::Pitching, "gamesstarted", 1.0);
        }
        PlayerGameRecord {
            player_id: id,
            game_id: 7,
            team_id: 1,
            date: date(),
            position: position.to_string(),
            batting_order: order,
            stats,
        }
    }

    fn full_lineup() -> Vec<PlayerGameRecord> {
        let positions = ["C", "1B", "2B", "3B", "SS", "LF", "CF", "RF", "P"];
        positions
            .iter()
            .enumerate()
            .map(|(i, pos)| player(10 + i as u32, Some(100 * (i as u32 + 1)), pos, 4.0))
            .collect()
    }

    fn run(records: &[PlayerGameRecord]) -> Result<RosterAssignment> {
        let refs = records.iter().collect::<Vec<_>>();
        reconcile(1, 7, date(), &refs)
    }

    #[test]
    fn positions_parse_and_label() {
        assert_eq!(FieldPosition::parse("ss"), Some(FieldPosition::Shortstop));
        assert_eq!(FieldPosition::parse("DH"), None);
        assert_eq!(RosterSlot::Fielder(FieldPosition::FirstBase).label(), "fielder_1b");
        assert_eq!(RosterSlot::all().len(), 19);
    }

    #[test]
    fn complete_lineup_resolves_directly() {
        let roster = run(&full_lineup()).unwrap();
        assert_eq!(roster.starting_pitcher, 18);
        assert_eq!(roster.batters, [10, 11, 12, 13, 14, 15, 16, 17, 18]);
        assert_eq!(roster.player_for(RosterSlot::Fielder(FieldPosition::Pitcher)), Some(18));
        assert_eq!(roster.player_for(RosterSlot::Fielder(FieldPosition::Catcher)), Some(10));
        assert_eq!(roster.player_for(RosterSlot::Batter(10)), None);
        assert_eq!(roster.player_for(RosterSlot::Batter(0)), None);
    }

    #[test]
    fn substitute_preferred_over_fallback() {
        let mut records = full_lineup();
        records[2].batting_order = Some(250);
        records.push(player(40, Some(301), "PH", 1.0));
        records.push(player(41, None, "PH", 5.0));
        let roster = run(&records).unwrap();
        assert_eq!(roster.batters[2], 40);
    }

    #[test]
    fn fallback_picks_most_at_bats_then_lowest_id() {
        let mut records = full_lineup();
        records[4].batting_order = None;
        records.push(player(30, None, "PH", 3.0));
        records.push(player(29, None, "PH", 3.0));
        let roster = run(&records).unwrap();
        // player 14 lost its order but still has 4 at-bats
        assert_eq!(roster.batters[4], 14);

        records[4].stats.batting = None;
        let roster = run(&records).unwrap();
        assert_eq!(roster.batters[4], 29);
    }

    #[test]
    fn missing_starter_and_positions_are_reported() {
        let mut records = full_lineup();
        records[8].stats.pitching = None;
        assert_eq!(
            run(&records),
            Err(FeatureError::AmbiguousStarter {
                team_id: 1,
                game_id: 7,
                found: 0
            })
        );

        let mut records = full_lineup();
        records[1].position = "DH".to_string();
        assert_eq!(
            run(&records),
            Err(FeatureError::IncompleteFielding {
                team_id: 1,
                game_id: 7,
                missing: vec![FieldPosition::FirstBase]
            })
        );
    }

    #[test]
    fn running_out_of_batters_is_incomplete() {
        let mut records = full_lineup();
        records.retain(|p| p.player_id != 12);
        records.push({
            let mut fielder = player(50, None, "2B", 0.0);
            fielder.stats.batting = None;
            fielder
        });
        assert_eq!(
            run(&records),
            Err(FeatureError::IncompleteLineup {
                team_id: 1,
                game_id: 7,
                missing: vec![3]
            })
        );
    }

    fn benched(mut records: Vec<PlayerGameRecord>, ids: &[PlayerId]) -> Vec<PlayerGameRecord> {
        for r in records.iter_mut().filter(|r| ids.contains(&r.player_id)) {
            r.batting_order = None;
            r.stats.batting = None;
        }
        records
    }

    #[test]
    fn substitutes_are_placed_before_any_fallback() {
        let mut records = benched(full_lineup(), &[11, 14]);
        records.push(player(500, Some(501), "PH", 5.0));
        records.push(player(600, None, "PH", 1.0));
        let roster = run(&records).unwrap();
        assert_eq!(roster.batters[4], 500);
        assert_eq!(roster.batters[1], 600);
    }

    #[test]
    fn fallback_fills_open_slots_in_order_with_ties_by_id() {
        let mut records = benched(full_lineup(), &[11, 14]);
        for id in [32, 30, 33, 31] {
            records.push(player(id, None, "PH", if id == 33 { 1.0 } else { 2.0 }));
        }
        let roster = run(&records).unwrap();
        assert_eq!(roster.batters[1], 30);
        assert_eq!(roster.batters[4], 31);

        records.reverse();
        assert_eq!(run(&records).unwrap(), roster);
    }

    #[test]
    fn repeated_player_records_collapse_or_conflict() {
        let mut records = full_lineup();
        records.push(records[3].clone());
        assert!(run(&records).is_ok());

        let mut twin = records[3].clone();
        twin.stats.set(StatDomain::Batting, "atbats", 1.0);
        records.push(twin);
        assert_eq!(
            run(&records),
            Err(FeatureError::OrderingAmbiguity {
                entity: "13".to_string(),
                game_id: 7
            })
        );
    }
}
