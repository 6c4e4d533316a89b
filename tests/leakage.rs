mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use chrono::NaiveDate;

use diamond_features::config::FeatureConfig;
use diamond_features::records::{GameId, GameRecord, PlayerGameRecord, TeamId};
use diamond_features::table::{FeatureTable, TeamGameKey};
use diamond_features::{FeatureRun, run_features};
use diamond_features::window::{AggregateSeries, WindowMethod, WindowSpec};

fn random_rows(rng: &mut StdRng, len: usize) -> Vec<Vec<Option<f64>>> {
    (0..len)
        .map(|_| {
            (0..3)
                .map(|_| rng.gen_bool(0.85).then(|| rng.gen_range(0.0..10.0)))
                .collect()
        })
        .collect()
}

#[test]
fn window_values_ignore_everything_from_the_cutoff_on() {
    let mut rng = StdRng::seed_from_u64(7);
    let specs = [
        WindowSpec::new(3, 1, WindowMethod::Sum),
        WindowSpec::new(5, 2, WindowMethod::Mean),
        WindowSpec::new(4, 1, WindowMethod::DecayedMean),
    ];
    for _ in 0..200 {
        let len = rng.gen_range(1..40);
        let rows = random_rows(&mut rng, len);
        let base = AggregateSeries::new(3, &rows, &specs);
        for spec in &specs {
            let i = rng.gen_range(0..=len);
            let mut mutated = rows.clone();
            let cutoff = (i + 1).saturating_sub(spec.shift);
            for row in mutated.iter_mut().skip(cutoff) {
                *row = random_rows(&mut rng, 1).remove(0);
            }
            mutated.truncate(rng.gen_range(cutoff..=len));
            let changed = AggregateSeries::new(3, &mutated, &specs);
            assert_eq!(base.values(i, spec), changed.values(i, spec), "{spec} at {i}");
        }
    }
}

fn rewrite_from(
    games: &mut [GameRecord],
    players: &mut [PlayerGameRecord],
    cutoff: NaiveDate,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    for game in games.iter_mut().filter(|g| g.date >= cutoff) {
        game.stats = common::team_stats(&mut rng);
        game.win = !game.win;
    }
    for player in players.iter_mut().filter(|p| p.date >= cutoff) {
        for line in [
            player.stats.batting.as_mut(),
            player.stats.pitching.as_mut(),
            player.stats.fielding.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            for (stat, value) in line.iter_mut() {
                if stat != "gamesstarted" {
                    *value = rng.gen_range(0..9) as f64;
                }
            }
        }
    }
}

fn team_rows_until(
    table: &FeatureTable<TeamGameKey>,
    cutoff: NaiveDate,
) -> Vec<(TeamId, GameId, Vec<Option<f64>>)> {
    table
        .rows()
        .iter()
        .filter(|r| r.key.date <= cutoff)
        .map(|r| (r.key.team_id, r.key.game_id, r.values.clone()))
        .collect()
}

#[test]
fn rows_up_to_the_cutoff_date_are_unchanged_by_later_games() {
    let (games, players) = common::season(21, 8, 40);
    let config = FeatureConfig {
        windows: vec![
            WindowSpec::new(10, 1, WindowMethod::Sum),
            WindowSpec::new(5, 1, WindowMethod::Mean),
            WindowSpec::new(3, 1, WindowMethod::DecayedMean),
        ],
        ..FeatureConfig::default()
    };
    let cutoff = common::day(25);
    let base = run_features(games.clone(), players.clone(), &config).unwrap();

    let (mut games_b, mut players_b) = (games, players);
    rewrite_from(&mut games_b, &mut players_b, cutoff, 99);
    let changed = run_features(games_b, players_b, &config).unwrap();

    assert_eq!(base.teams.columns(), changed.teams.columns());
    let base_rows = team_rows_until(&base.teams, cutoff);
    assert_eq!(base_rows.len(), 8 / 2 * 2 * 26);
    assert_eq!(base_rows, team_rows_until(&changed.teams, cutoff));
    assert_eq!(
        team_rows_until(&base.profiles, cutoff),
        team_rows_until(&changed.profiles, cutoff)
    );

    let later = |run: &FeatureRun| {
        run.teams
            .rows()
            .iter()
            .filter(|r| r.key.date == common::day(26))
            .map(|r| r.values.clone())
            .collect::<Vec<_>>()
    };
    assert_ne!(later(&base), later(&changed));
}

#[test]
fn player_rows_only_use_earlier_games() {
    let (games, players) = common::season(5, 4, 20);
    let cutoff = common::day(12);
    let config = FeatureConfig::default();
    let base = run_features(games.clone(), players.clone(), &config).unwrap();
    let (mut games_b, mut players_b) = (games, players);
    rewrite_from(&mut games_b, &mut players_b, cutoff, 4);
    let changed = run_features(games_b, players_b, &config).unwrap();

    let early = |run: &FeatureRun| {
        run.players
            .rows()
            .iter()
            .filter(|r| r.key.date <= cutoff)
            .map(|r| (r.key.player_id, r.key.game_id, r.values.clone()))
            .collect::<Vec<_>>()
    };
    assert!(!early(&base).is_empty());
    assert_eq!(early(&base), early(&changed));
}
