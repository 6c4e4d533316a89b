mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use diamond_features::error::FeatureError;
use diamond_features::records::{PlayerGameRecord, StatDomain};
use diamond_features::roster::{FieldPosition, RosterSlot, reconcile, reconcile_all};

use common::{batter_id, day, lineup, pitcher_id};

fn one_game(seed: u64) -> Vec<PlayerGameRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    lineup(&mut rng, 3, 40, day(0), 2)
}

fn refs(players: &[PlayerGameRecord]) -> Vec<&PlayerGameRecord> {
    players.iter().collect()
}

#[test]
fn reconciling_twice_gives_the_same_roster() {
    let players = one_game(1);
    let first = reconcile(3, 40, day(0), &refs(&players)).unwrap();
    let second = reconcile(3, 40, day(0), &refs(&players)).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.starting_pitcher, pitcher_id(3, 2));
    assert_eq!(first.player_for(RosterSlot::Batter(4)), Some(batter_id(3, 4)));
    // DH lineup: the starter covers the mound
    assert_eq!(
        first.player_for(RosterSlot::Fielder(FieldPosition::Pitcher)),
        Some(pitcher_id(3, 2))
    );
    assert_eq!(first.slots().len(), 19);
}

#[test]
fn fallback_ignores_input_order() {
    let mut players = one_game(2);
    // the DH leaves without a recorded substitute
    players.retain(|p| p.player_id != batter_id(3, 9));
    for (id, at_bats) in [(990, 2.0), (991, 4.0), (992, 4.0)] {
        let mut bench = players[0].clone();
        bench.player_id = id;
        bench.batting_order = None;
        bench.position = "PH".to_string();
        bench.stats = Default::default();
        bench.stats.set(StatDomain::Batting, "atbats", at_bats);
        players.push(bench);
    }

    let expected = reconcile(3, 40, day(0), &refs(&players)).unwrap();
    assert_eq!(expected.player_for(RosterSlot::Batter(9)), Some(991));

    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..10 {
        players.shuffle(&mut rng);
        let got = reconcile(3, 40, day(0), &refs(&players)).unwrap();
        assert_eq!(got, expected);
    }
}

#[test]
fn substitute_takes_the_vacated_slot() {
    let mut players = one_game(3);
    let mut sub = players[2].clone();
    sub.player_id = 777;
    sub.batting_order = Some(301);
    sub.stats.set(StatDomain::Batting, "atbats", 1.0);
    players.retain(|p| p.player_id != batter_id(3, 3));
    players.push(sub);

    let roster = reconcile(3, 40, day(0), &refs(&players)).unwrap();
    assert_eq!(roster.player_for(RosterSlot::Batter(3)), Some(777));
}

#[test]
fn duplicate_slot_claims_keep_the_lowest_id() {
    let mut players = one_game(4);
    let mut twin = players[0].clone();
    twin.player_id = 5;
    players.push(twin);

    let roster = reconcile(3, 40, day(0), &refs(&players)).unwrap();
    assert_eq!(roster.player_for(RosterSlot::Batter(1)), Some(5));
    assert_eq!(roster.player_for(RosterSlot::Fielder(FieldPosition::Catcher)), Some(5));
}

#[test]
fn two_starters_are_reported() {
    let mut players = one_game(5);
    let mut extra = players.last().unwrap().clone();
    extra.player_id = 999;
    players.push(extra);

    let err = reconcile(3, 40, day(0), &refs(&players)).unwrap_err();
    assert!(matches!(err, FeatureError::AmbiguousStarter { found: 2, .. }));
    assert!(!err.is_fatal());
}

#[test]
fn season_reconciles_every_team_game_in_order() {
    let (games, players) = common::season(17, 6, 12);
    let rosters = reconcile_all(&games, &players);
    assert_eq!(rosters.len(), 6 * 12);
    assert!(rosters.iter().all(|r| r.result.is_ok()));
    let keys = rosters
        .iter()
        .map(|r| (r.date, r.game_id, r.team_id))
        .collect::<Vec<_>>();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));

    let mut shuffled = players.clone();
    shuffled.shuffle(&mut StdRng::seed_from_u64(1));
    let again = reconcile_all(&games, &shuffled);
    let results = |rs: &[diamond_features::roster::TeamGameRoster]| {
        rs.iter().map(|r| r.result.clone().ok()).collect::<Vec<_>>()
    };
    assert_eq!(results(&rosters), results(&again));
}

#[test]
fn later_slot_keeps_its_own_substitute() {
    let mut players = one_game(6);
    // starters 2 and 5 keep their positions but lose their batting lines
    for slot in [2, 5] {
        let starter = players
            .iter_mut()
            .find(|p| p.player_id == batter_id(3, slot))
            .unwrap();
        starter.batting_order = None;
        starter.stats.batting = None;
    }
    let mut pinch = players[0].clone();
    pinch.player_id = 500;
    pinch.batting_order = Some(501);
    pinch.position = "PH".to_string();
    pinch.stats = Default::default();
    pinch.stats.set(StatDomain::Batting, "atbats", 5.0);
    let mut bench = pinch.clone();
    bench.player_id = 600;
    bench.batting_order = None;
    bench.stats.set(StatDomain::Batting, "atbats", 1.0);
    players.extend([pinch, bench]);

    let roster = reconcile(3, 40, day(0), &refs(&players)).unwrap();
    assert_eq!(roster.player_for(RosterSlot::Batter(5)), Some(500));
    assert_eq!(roster.player_for(RosterSlot::Batter(2)), Some(600));
}

#[test]
fn two_open_slots_fall_back_by_at_bats_then_id() {
    let mut players = one_game(7);
    for slot in [3, 7] {
        let starter = players
            .iter_mut()
            .find(|p| p.player_id == batter_id(3, slot))
            .unwrap();
        starter.batting_order = None;
        starter.stats.batting = None;
    }
    for (id, at_bats) in [(905, 3.0), (903, 3.0), (901, 1.0), (904, 3.0)] {
        let mut bench = players[0].clone();
        bench.player_id = id;
        bench.batting_order = None;
        bench.position = "PH".to_string();
        bench.stats = Default::default();
        bench.stats.set(StatDomain::Batting, "atbats", at_bats);
        players.push(bench);
    }

    let expected = reconcile(3, 40, day(0), &refs(&players)).unwrap();
    assert_eq!(expected.player_for(RosterSlot::Batter(3)), Some(903));
    assert_eq!(expected.player_for(RosterSlot::Batter(7)), Some(904));

    let mut rng = StdRng::seed_from_u64(12);
    for _ in 0..10 {
        players.shuffle(&mut rng);
        assert_eq!(reconcile(3, 40, day(0), &refs(&players)).unwrap(), expected);
    }
}

#[test]
fn team_game_without_player_records_is_reported() {
    let (games, mut players) = common::season(9, 4, 3);
    let dropped = (games[0].game_id, games[0].team_id);
    players.retain(|p| (p.game_id, p.team_id) != dropped);

    let rosters = reconcile_all(&games, &players);
    assert_eq!(rosters.len(), games.len());
    let missing = rosters
        .iter()
        .find(|r| (r.game_id, r.team_id) == dropped)
        .unwrap();
    assert!(matches!(
        missing.result,
        Err(FeatureError::AmbiguousStarter { found: 0, .. })
    ));
}
