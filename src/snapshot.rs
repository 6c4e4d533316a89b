use std::collections::HashMap;

use chrono::NaiveDate;

use crate::aggregate::{PlayerFeatureSet, PlayerTrack};
use crate::records::{GameId, PlayerId, StatDomain};

/// Player domain snapshots for one assembly pass. A snapshot is the domain
/// aggregate after every domain game strictly before the requested game;
/// entries are computed on first request and reused afterwards.
pub struct SnapshotCache<'a> {
    features: &'a PlayerFeatureSet,
    tracks: HashMap<PlayerId, &'a PlayerTrack>,
    entries: HashMap<(PlayerId, StatDomain, usize), Vec<Option<f64>>>,
    hits: usize,
    misses: usize,
}

impl<'a> SnapshotCache<'a> {
    pub fn new(features: &'a PlayerFeatureSet, tracks: &'a [PlayerTrack]) -> Self {
        Self {
            features,
            tracks: tracks.iter().map(|t| (t.player_id(), t)).collect(),
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn snapshot(
        &mut self,
        player_id: PlayerId,
        domain: StatDomain,
        date: NaiveDate,
        game_id: GameId,
    ) -> Vec<Option<f64>> {
        let Some(track) = self.tracks.get(&player_id).copied() else {
            return vec![None; self.features.domain_width(domain)];
        };
        let position = track.count_before(domain, date, game_id);
        let key = (player_id, domain, position);
        if let Some(values) = self.entries.get(&key) {
            self.hits += 1;
            return values.clone();
        }
        self.misses += 1;
        let values = self.features.domain_row(track, domain, position);
        self.entries.insert(key, values.clone());
        values
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` so far.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeatureConfig;
    use crate::records::{DomainStats, PlayerGameRecord};
    use crate::timeline::build_timelines;
    use crate::window::{WindowMethod, WindowSpec};

    fn record(game_id: GameId, day: u32, strikes: f64) -> PlayerGameRecord {
        let mut stats = DomainStats::default();
        stats.set(StatDomain::Pitching, "strikes", strikes);
        PlayerGameRecord {
            player_id: 77,
            game_id,
            team_id: 1,
            date: NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
            position: "P".to_string(),
            batting_order: None,
            stats,
        }
    }

    #[test]
    fn snapshots_reflect_only_earlier_games_and_are_reused() {
        let timelines = build_timelines(vec![record(1, 1, 50.0), record(2, 6, 60.0)]).unwrap();
        let config = FeatureConfig {
            windows: vec![WindowSpec::new(5, 1, WindowMethod::Sum)],
            ..FeatureConfig::default()
        };
        let set = PlayerFeatureSet::new(&config, &timelines);
        let (_, tracks) = set.build(&timelines);
        let mut cache = SnapshotCache::new(&set, &tracks);
        let day = |d| NaiveDate::from_ymd_opt(2024, 7, d).unwrap();

        assert_eq!(cache.snapshot(77, StatDomain::Pitching, day(1), 1)[0], None);
        assert_eq!(cache.snapshot(77, StatDomain::Pitching, day(3), 9)[0], Some(50.0));
        assert_eq!(cache.snapshot(77, StatDomain::Pitching, day(6), 2)[0], Some(50.0));
        assert_eq!(cache.snapshot(77, StatDomain::Pitching, day(9), 3)[0], Some(110.0));
        assert_eq!(cache.stats(), (1, 3));

        let unknown = cache.snapshot(1234, StatDomain::Pitching, day(9), 3);
        assert!(unknown.iter().all(Option::is_none));
        assert_eq!(unknown.len(), set.domain_width(StatDomain::Pitching));
    }
}
