use thiserror::Error;

use crate::records::{GameId, TeamId};
use crate::roster::FieldPosition;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("conflicting records for entity {entity} in game {game_id}")]
    OrderingAmbiguity { entity: String, game_id: GameId },

    #[error("malformed game {game_id}: {reason}")]
    MalformedGame { game_id: GameId, reason: String },

    #[error("ratio {ratio} has a zero denominator over the window")]
    UndefinedRatio { ratio: String },

    #[error("team {team_id} game {game_id}: expected one starting pitcher, found {found}")]
    AmbiguousStarter {
        team_id: TeamId,
        game_id: GameId,
        found: usize,
    },

    #[error("team {team_id} game {game_id}: unresolved batting order slots {missing:?}")]
    IncompleteLineup {
        team_id: TeamId,
        game_id: GameId,
        missing: Vec<u8>,
    },

    #[error("team {team_id} game {game_id}: unresolved fielding positions {missing:?}")]
    IncompleteFielding {
        team_id: TeamId,
        game_id: GameId,
        missing: Vec<FieldPosition>,
    },

    #[error("team {team_id} game {game_id}: players recorded but no team game record")]
    MissingTeamGame { team_id: TeamId, game_id: GameId },

    #[error("invalid feature config: {0}")]
    Config(String),
}

impl FeatureError {
    /// Fatal errors mean the input is structurally broken and abort the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FeatureError::OrderingAmbiguity { .. }
                | FeatureError::MalformedGame { .. }
                | FeatureError::Config(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FeatureError::OrderingAmbiguity { .. } => "ordering_ambiguity",
            FeatureError::MalformedGame { .. } => "malformed_game",
            FeatureError::UndefinedRatio { .. } => "undefined_ratio",
            FeatureError::AmbiguousStarter { .. } => "ambiguous_starter",
            FeatureError::IncompleteLineup { .. } => "incomplete_lineup",
            FeatureError::IncompleteFielding { .. } => "incomplete_fielding",
            FeatureError::MissingTeamGame { .. } => "missing_team_game",
            FeatureError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, FeatureError>;
