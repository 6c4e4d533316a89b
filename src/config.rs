use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::window::{WindowMethod, WindowSpec};

pub const DEFAULT_SPAN: usize = 50;
pub const DEFAULT_SPAN_FACTORS: [usize; 3] = [1, 2, 10];
pub const DEFAULT_REGULAR_SEASON_GAMES: usize = 162;

fn default_shift() -> usize {
    1
}

fn default_regular_season_games() -> usize {
    DEFAULT_REGULAR_SEASON_GAMES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub windows: Vec<WindowSpec>,
    /// Shift applied to streaks and the game counter.
    #[serde(default = "default_shift")]
    pub shift: usize,
    #[serde(default)]
    pub allow_non_causal: bool,
    #[serde(default = "default_regular_season_games")]
    pub regular_season_games: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            windows: DEFAULT_SPAN_FACTORS
                .iter()
                .map(|factor| WindowSpec::new(DEFAULT_SPAN / factor, 1, WindowMethod::Mean))
                .collect(),
            shift: default_shift(),
            allow_non_causal: false,
            regular_season_games: DEFAULT_REGULAR_SEASON_GAMES,
        }
    }
}

impl FeatureConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read feature config {}", path.display()))?;
        let config = serde_json::from_str::<FeatureConfig>(&raw)
            .with_context(|| format!("parse feature config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("serialize feature config")?;
        fs::write(path, raw).with_context(|| format!("write feature config {}", path.display()))?;
        Ok(())
    }

    /// Applies `FEATURE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> crate::error::Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(raw) = lookup("FEATURE_WINDOWS") {
            self.windows = parse_windows(&raw)?;
        }
        if let Some(raw) = lookup("FEATURE_SHIFT") {
            self.shift = raw
                .trim()
                .parse()
                .map_err(|_| FeatureError::Config(format!("FEATURE_SHIFT={raw} is not a count")))?;
        }
        if let Some(raw) = lookup("FEATURE_ALLOW_NON_CAUSAL") {
            self.allow_non_causal = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
        if let Some(raw) = lookup("FEATURE_REGULAR_SEASON_GAMES") {
            self.regular_season_games = raw.trim().parse().map_err(|_| {
                FeatureError::Config(format!("FEATURE_REGULAR_SEASON_GAMES={raw} is not a count"))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.windows.is_empty() {
            return Err(FeatureError::Config("no windows configured".to_string()));
        }
        let mut labels = HashSet::new();
        for spec in &self.windows {
            if spec.width == 0 {
                return Err(FeatureError::Config(format!("window {spec} has zero width")));
            }
            if !labels.insert(spec.label()) {
                return Err(FeatureError::Config(format!("window {spec} is configured twice")));
            }
            if !spec.is_causal() && !self.allow_non_causal {
                return Err(FeatureError::Config(format!(
                    "window {spec} has shift 0 and would leak the current game"
                )));
            }
        }
        if self.shift == 0 && !self.allow_non_causal {
            return Err(FeatureError::Config(
                "streak shift 0 would leak the current game".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_causal(&self) -> bool {
        self.shift >= 1 && self.windows.iter().all(WindowSpec::is_causal)
    }
}

/// Parses `method:width:shift` entries separated by commas.
pub fn parse_windows(raw: &str) -> crate::error::Result<Vec<WindowSpec>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let bad = || FeatureError::Config(format!("bad window entry `{part}`"));
            let mut fields = part.split(':');
            let method = fields.next().and_then(WindowMethod::parse).ok_or_else(bad)?;
            let width = fields
                .next()
                .and_then(|w| w.trim().parse::<usize>().ok())
                .ok_or_else(bad)?;
            let shift = match fields.next() {
                Some(s) => s.trim().parse::<usize>().map_err(|_| bad())?,
                None => 1,
            };
            if fields.next().is_some() {
                return Err(bad());
            }
            Ok(WindowSpec::new(width, shift, method))
        })
        .collect()
}
