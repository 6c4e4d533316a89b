//! Signed win/loss streaks: positive for consecutive wins, negative for
//! consecutive losses.

pub const STREAK_COLUMNS: [&str; 3] = ["streak", "home_streak", "away_streak"];

pub fn next_streak(state: i32, win: bool) -> i32 {
    match (state < 1, win) {
        (true, true) => 1,
        (true, false) => state - 1,
        (false, true) => state + 1,
        (false, false) => -1,
    }
}

/// Post-game streak after each game, starting from zero.
pub fn raw_streaks(wins: &[bool]) -> Vec<i32> {
    wins.iter()
        .scan(0, |state, &win| {
            *state = next_streak(*state, win);
            Some(*state)
        })
        .collect()
}

/// Value visible before game `i`: the post-game state at `i - shift`, or the
/// initial state when no such game exists yet. `position` may be one past
/// the end for an unplayed game.
pub fn shifted_at(raw: &[i32], position: usize, shift: usize) -> i32 {
    if raw.is_empty() || position < shift {
        return 0;
    }
    raw[(position - shift).min(raw.len() - 1)]
}

/// Streak over the games where `include` holds, carried forward across the
/// games where it doesn't. Positions before the first included game stay 0.
pub fn filtered_raw_streaks(wins: &[bool], include: &[bool]) -> Vec<i32> {
    wins.iter()
        .zip(include)
        .scan(0, |state, (&win, &included)| {
            if included {
                *state = next_streak(*state, win);
            }
            Some(*state)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakFeatures {
    pub overall: i32,
    pub home: i32,
    pub away: i32,
}

impl StreakFeatures {
    pub fn to_vec(&self) -> Vec<Option<f64>> {
        vec![
            Some(self.overall as f64),
            Some(self.home as f64),
            Some(self.away as f64),
        ]
    }
}

/// Precomputed raw streaks for one team timeline.
#[derive(Debug, Clone)]
pub struct StreakTrack {
    overall: Vec<i32>,
    home: Vec<i32>,
    away: Vec<i32>,
}

impl StreakTrack {
    pub fn new(wins: &[bool], home_flags: &[bool]) -> Self {
        let away_flags = home_flags.iter().map(|h| !h).collect::<Vec<_>>();
        Self {
            overall: raw_streaks(wins),
            home: filtered_raw_streaks(wins, home_flags),
            away: filtered_raw_streaks(wins, &away_flags),
        }
    }

    pub fn at(&self, position: usize, shift: usize) -> StreakFeatures {
        StreakFeatures {
            overall: shifted_at(&self.overall, position, shift),
            home: shifted_at(&self.home, position, shift),
            away: shifted_at(&self.away, position, shift),
        }
    }
}
