use chrono::{Datelike, NaiveDate};

use crate::records::GameRecord;
use crate::window::{AggregateSeries, WindowMethod, WindowSpec};

/// Form columns: schedule context plus windowed winning percentages with
/// home/away splits for every configured window.
#[derive(Debug, Clone)]
pub struct FormTrack {
    dates: Vec<NaiveDate>,
    // Running count of home games up to and including each position.
    home_counts: Vec<usize>,
    away_counts: Vec<usize>,
    all: AggregateSeries,
    home: AggregateSeries,
    away: AggregateSeries,
    specs: Vec<WindowSpec>,
    shift: usize,
    regular_season_games: usize,
}

fn win_spec(spec: &WindowSpec) -> WindowSpec {
    let method = match spec.method {
        WindowMethod::DecayedMean => WindowMethod::DecayedMean,
        WindowMethod::Sum | WindowMethod::Mean => WindowMethod::Mean,
    };
    WindowSpec::new(spec.width, spec.shift, method)
}

fn win_rows<'a>(games: impl Iterator<Item = &'a GameRecord>) -> Vec<Vec<Option<f64>>> {
    games
        .map(|g| vec![Some(if g.win { 1.0 } else { 0.0 })])
        .collect()
}

fn running_counts(games: &[GameRecord], home: bool) -> Vec<usize> {
    games
        .iter()
        .scan(0usize, |count, g| {
            if g.home == home {
                *count += 1;
            }
            Some(*count)
        })
        .collect()
}

impl FormTrack {
    pub fn columns(specs: &[WindowSpec]) -> Vec<String> {
        let mut out = vec![
            "game_count".to_string(),
            "days_rest".to_string(),
            "postseason".to_string(),
        ];
        for spec in specs {
            let label = spec.label();
            out.push(format!("winning_percentage_{label}"));
            out.push(format!("home_winning_percentage_{label}"));
            out.push(format!("away_winning_percentage_{label}"));
        }
        out
    }

    pub fn new(
        games: &[GameRecord],
        specs: &[WindowSpec],
        shift: usize,
        regular_season_games: usize,
    ) -> Self {
        let win_specs = specs.iter().map(win_spec).collect::<Vec<_>>();
        let split_specs = win_specs
            .iter()
            .map(|s| WindowSpec::new(s.width, 0, s.method))
            .collect::<Vec<_>>();
        Self {
            dates: games.iter().map(|g| g.date).collect(),
            home_counts: running_counts(games, true),
            away_counts: running_counts(games, false),
            all: AggregateSeries::new(1, &win_rows(games.iter()), &win_specs),
            home: AggregateSeries::new(1, &win_rows(games.iter().filter(|g| g.home)), &split_specs),
            away: AggregateSeries::new(1, &win_rows(games.iter().filter(|g| !g.home)), &split_specs),
            specs: specs.to_vec(),
            shift,
            regular_season_games,
        }
    }

    /// Form row for the game at `position` played on `date`. `position` may
    /// be one past the end for an unplayed game.
    pub fn row(&self, position: usize, date: NaiveDate) -> Vec<Option<f64>> {
        let len = self.dates.len();
        let season_start = self.dates.partition_point(|d| d.year() < date.year());
        let visible_end = if position >= self.shift {
            (position - self.shift + 1).min(len)
        } else {
            0
        };
        let game_count = visible_end.saturating_sub(season_start);
        let season_games_before = position.min(len).saturating_sub(season_start);
        let days_rest = position
            .checked_sub(1)
            .and_then(|prev| self.dates.get(prev))
            .map(|prev| (date - *prev).num_days() as f64);
        let postseason = if season_games_before >= self.regular_season_games {
            1.0
        } else {
            0.0
        };

        let mut out = vec![Some(game_count as f64), days_rest, Some(postseason)];
        for spec in &self.specs {
            let overall = win_spec(spec);
            out.push(self.all.values(position, &overall)[0]);
            out.push(self.split_value(&self.home, &self.home_counts, position, spec));
            out.push(self.split_value(&self.away, &self.away_counts, position, spec));
        }
        out
    }

    fn split_value(
        &self,
        series: &AggregateSeries,
        counts: &[usize],
        position: usize,
        spec: &WindowSpec,
    ) -> Option<f64> {
        if counts.is_empty() || position < spec.shift {
            return None;
        }
        let last_visible = (position - spec.shift).min(counts.len() - 1);
        let seen = counts[last_visible];
        if seen == 0 {
            return None;
        }
        let inner = win_spec(spec);
        let inner = WindowSpec::new(inner.width, 0, inner.method);
        series.values(seen - 1, &inner)[0]
    }
}
