#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use diamond_features::records::{
    DomainStats, GameId, GameRecord, PlayerGameRecord, PlayerId, StatDomain, TeamId,
};

pub const POSITIONS: [&str; 9] = ["C", "1B", "2B", "3B", "SS", "LF", "CF", "RF", "DH"];

pub fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + Duration::days(offset)
}

pub fn team_stats(rng: &mut StdRng) -> DomainStats {
    let mut stats = DomainStats::default();
    let at_bats = rng.gen_range(28..40) as f64;
    let hits = rng.gen_range(4..14) as f64;
    for (stat, value) in [
        ("atbats", at_bats),
        ("hits", hits),
        ("totalbases", hits + rng.gen_range(0..8) as f64),
        ("baseonballs", rng.gen_range(0..7) as f64),
        ("hitbypitch", rng.gen_range(0..2) as f64),
        ("sacflies", rng.gen_range(0..2) as f64),
        ("homeruns", rng.gen_range(0..3) as f64),
        ("stolenbases", rng.gen_range(0..3) as f64),
        ("caughtstealing", rng.gen_range(0..2) as f64),
    ] {
        stats.set(StatDomain::Batting, stat, value);
    }
    for (stat, value) in [
        ("inningspitched", if rng.gen_bool(0.8) { 9.0 } else { 8.2 }),
        ("earnedruns", rng.gen_range(0..8) as f64),
        ("hits", rng.gen_range(4..14) as f64),
        ("baseonballs", rng.gen_range(0..6) as f64),
        ("strikes", rng.gen_range(60..110) as f64),
        ("pitchesthrown", rng.gen_range(120..170) as f64),
        ("groundouts", rng.gen_range(4..14) as f64),
        ("airouts", rng.gen_range(4..14) as f64),
    ] {
        stats.set(StatDomain::Pitching, stat, value);
    }
    for (stat, value) in [
        ("putouts", 27.0),
        ("assists", rng.gen_range(5..15) as f64),
        ("errors", rng.gen_range(0..3) as f64),
        ("caughtstealing", rng.gen_range(0..2) as f64),
        ("stolenbases", rng.gen_range(0..3) as f64),
    ] {
        stats.set(StatDomain::Fielding, stat, value);
    }
    stats
}

pub fn batter_id(team: TeamId, slot: u32) -> PlayerId {
    team * 100 + slot
}

pub fn pitcher_id(team: TeamId, rotation: u32) -> PlayerId {
    team * 100 + 50 + rotation
}

/// Starting lineup (DH rule) plus the starting pitcher for one team-game.
pub fn lineup(
    rng: &mut StdRng,
    team: TeamId,
    game_id: GameId,
    date: NaiveDate,
    rotation: u32,
) -> Vec<PlayerGameRecord> {
    let mut out = Vec::new();
    for (i, position) in POSITIONS.iter().enumerate() {
        let slot = i as u32 + 1;
        let mut stats = DomainStats::default();
        let at_bats = rng.gen_range(2..6) as f64;
        stats.set(StatDomain::Batting, "atbats", at_bats);
        stats.set(StatDomain::Batting, "hits", rng.gen_range(0..3) as f64);
        stats.set(StatDomain::Batting, "baseonballs", rng.gen_range(0..2) as f64);
        stats.set(StatDomain::Batting, "totalbases", rng.gen_range(0..5) as f64);
        if *position != "DH" {
            stats.set(StatDomain::Fielding, "gamesstarted", 1.0);
            stats.set(StatDomain::Fielding, "putouts", rng.gen_range(0..6) as f64);
            stats.set(StatDomain::Fielding, "assists", rng.gen_range(0..4) as f64);
            stats.set(StatDomain::Fielding, "errors", rng.gen_range(0..2) as f64);
        }
        out.push(PlayerGameRecord {
            player_id: batter_id(team, slot),
            game_id,
            team_id: team,
            date,
            position: position.to_string(),
            batting_order: Some(100 * slot),
            stats,
        });
    }

    let mut stats = DomainStats::default();
    stats.set(StatDomain::Pitching, "gamesstarted", 1.0);
    stats.set(StatDomain::Pitching, "inningspitched", rng.gen_range(4..8) as f64 + 0.1);
    stats.set(StatDomain::Pitching, "earnedruns", rng.gen_range(0..6) as f64);
    stats.set(StatDomain::Pitching, "hits", rng.gen_range(2..10) as f64);
    stats.set(StatDomain::Pitching, "baseonballs", rng.gen_range(0..5) as f64);
    stats.set(StatDomain::Pitching, "strikes", rng.gen_range(40..70) as f64);
    stats.set(StatDomain::Pitching, "pitchesthrown", rng.gen_range(70..110) as f64);
    stats.set(StatDomain::Fielding, "gamesstarted", 1.0);
    stats.set(StatDomain::Fielding, "putouts", rng.gen_range(0..3) as f64);
    out.push(PlayerGameRecord {
        player_id: pitcher_id(team, rotation),
        game_id,
        team_id: team,
        date,
        position: "P".to_string(),
        batting_order: None,
        stats,
    });
    out
}

/// Seeded synthetic season: every day all teams are paired at random.
pub fn season(seed: u64, teams: u32, days: u32) -> (Vec<GameRecord>, Vec<PlayerGameRecord>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut games = Vec::new();
    let mut players = Vec::new();
    let mut ids = (1..=teams).collect::<Vec<_>>();
    for d in 0..days {
        ids.shuffle(&mut rng);
        for (k, pair) in ids.chunks_exact(2).enumerate() {
            let game_id = u64::from(d) * 100 + k as u64 + 1;
            let date = day(i64::from(d));
            let home_wins = rng.gen_bool(0.5);
            for (team, opponent, home) in [(pair[0], pair[1], true), (pair[1], pair[0], false)] {
                games.push(GameRecord {
                    game_id,
                    date,
                    team_id: team,
                    opponent_id: opponent,
                    home,
                    win: home == home_wins,
                    stats: team_stats(&mut rng),
                });
                players.extend(lineup(&mut rng, team, game_id, date, d % 5));
            }
        }
    }
    (games, players)
}
