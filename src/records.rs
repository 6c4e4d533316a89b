use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};
use crate::ratios::convert_innings_pitched;

pub type GameId = u64;
pub type TeamId = u32;
pub type PlayerId = u32;

/// Raw counting statistics for one domain, keyed by lowercase stat name.
pub type StatLine = BTreeMap<String, f64>;

pub const INNINGS_PITCHED: &str = "inningspitched";
pub const GAMES_STARTED: &str = "gamesstarted";
pub const AT_BATS: &str = "atbats";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatDomain {
    Batting,
    Pitching,
    Fielding,
}

impl StatDomain {
    pub const ALL: [StatDomain; 3] = [StatDomain::Batting, StatDomain::Pitching, StatDomain::Fielding];

    pub fn prefix(&self) -> &'static str {
        match self {
            StatDomain::Batting => "batting",
            StatDomain::Pitching => "pitching",
            StatDomain::Fielding => "fielding",
        }
    }

    pub fn from_prefix(raw: &str) -> Option<Self> {
        match raw {
            "batting" => Some(StatDomain::Batting),
            "pitching" => Some(StatDomain::Pitching),
            "fielding" => Some(StatDomain::Fielding),
            _ => None,
        }
    }
}

impl fmt::Display for StatDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batting: Option<StatLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitching: Option<StatLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fielding: Option<StatLine>,
}

impl DomainStats {
    pub fn get(&self, domain: StatDomain) -> Option<&StatLine> {
        match domain {
            StatDomain::Batting => self.batting.as_ref(),
            StatDomain::Pitching => self.pitching.as_ref(),
            StatDomain::Fielding => self.fielding.as_ref(),
        }
    }

    pub fn get_mut(&mut self, domain: StatDomain) -> &mut Option<StatLine> {
        match domain {
            StatDomain::Batting => &mut self.batting,
            StatDomain::Pitching => &mut self.pitching,
            StatDomain::Fielding => &mut self.fielding,
        }
    }

    pub fn has(&self, domain: StatDomain) -> bool {
        self.get(domain).is_some()
    }

    pub fn value(&self, domain: StatDomain, stat: &str) -> Option<f64> {
        self.get(domain)?.get(stat).copied()
    }

    pub fn set(&mut self, domain: StatDomain, stat: &str, value: f64) {
        self.get_mut(domain)
            .get_or_insert_with(StatLine::new)
            .insert(stat.to_string(), value);
    }

    /// Flattened `{domain}_{stat}` view used for team timelines.
    pub fn flatten(&self) -> StatLine {
        let mut out = StatLine::new();
        for domain in StatDomain::ALL {
            if let Some(line) = self.get(domain) {
                for (stat, value) in line {
                    out.insert(format!("{}_{stat}", domain.prefix()), *value);
                }
            }
        }
        out
    }

    /// Replaces the outs-encoded innings (`6.2`) with true fractional innings.
    /// Must be applied exactly once per record.
    pub fn with_true_innings(mut self) -> Self {
        if let Some(line) = self.pitching.as_mut()
            && let Some(ip) = line.get_mut(INNINGS_PITCHED)
        {
            *ip = convert_innings_pitched(*ip);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: GameId,
    pub date: NaiveDate,
    pub team_id: TeamId,
    pub opponent_id: TeamId,
    pub home: bool,
    pub win: bool,
    #[serde(default)]
    pub stats: DomainStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameRecord {
    pub player_id: PlayerId,
    pub game_id: GameId,
    pub team_id: TeamId,
    pub date: NaiveDate,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub batting_order: Option<u32>,
    #[serde(default)]
    pub stats: DomainStats,
}

impl PlayerGameRecord {
    pub fn started(&self, domain: StatDomain) -> bool {
        self.stats
            .value(domain, GAMES_STARTED)
            .is_some_and(|v| (v - 1.0).abs() < f64::EPSILON)
    }

    pub fn at_bats(&self) -> f64 {
        self.stats
            .value(StatDomain::Batting, AT_BATS)
            .unwrap_or(0.0)
    }
}

/// Checks that every game has exactly two sides with mirrored teams and
/// complementary home/win flags.
pub fn validate_game_pairs(games: &[GameRecord]) -> Result<()> {
    let mut by_game: HashMap<GameId, Vec<&GameRecord>> = HashMap::new();
    for game in games {
        by_game.entry(game.game_id).or_default().push(game);
    }

    let mut ids = by_game.keys().copied().collect::<Vec<_>>();
    ids.sort_unstable();
    for game_id in ids {
        let sides = &by_game[&game_id];
        let malformed = |reason: String| FeatureError::MalformedGame { game_id, reason };
        if sides.len() != 2 {
            return Err(malformed(format!("expected 2 team records, found {}", sides.len())));
        }
        let (a, b) = (sides[0], sides[1]);
        if a.team_id != b.opponent_id || b.team_id != a.opponent_id {
            return Err(malformed(format!(
                "teams {} and {} do not name each other as opponents",
                a.team_id, b.team_id
            )));
        }
        if a.home == b.home {
            return Err(malformed("both sides share the same home flag".to_string()));
        }
        if a.win == b.win {
            return Err(malformed("both sides share the same win flag".to_string()));
        }
        if a.date != b.date {
            return Err(malformed(format!("sides disagree on date ({} vs {})", a.date, b.date)));
        }
    }
    Ok(())
}
