use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use diamond_features::lineup::{assemble_upcoming, load_cards};
use diamond_features::{FeatureConfig, run_features, store};

#[derive(Parser)]
#[command(name = "lineup_profiles")]
#[command(about = "Profile announced lineups for upcoming games")]
struct Cli {
    /// SQLite database with the season's game logs
    #[arg(long)]
    db: PathBuf,

    /// Lineup card JSON for the games to profile
    #[arg(long)]
    cards: PathBuf,

    /// Feature config JSON (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write profiles here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<()> {
    diamond_features::init_runtime();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FeatureConfig::load(path)?,
        None => FeatureConfig::default(),
    }
    .with_env_overrides()?;

    let conn = store::open_db(&cli.db)?;
    let games = store::load_team_games(&conn)?;
    let players = store::load_player_games(&conn)?;
    if games.is_empty() {
        return Err(anyhow!("no team games in {}", cli.db.display()));
    }
    let cards = load_cards(&cli.cards)?;

    let run = run_features(games, players, &config).context("feature run failed")?;
    let (profiles, failures) = assemble_upcoming(&cards, &run.model);

    let json = serde_json::to_string_pretty(&profiles).context("encode upcoming profiles")?;
    match &cli.out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
            println!("Upcoming profiles: {} -> {}", profiles.len(), path.display());
        }
        None => println!("{json}"),
    }
    for failure in &failures {
        eprintln!(
            "team {} game {}: {}",
            failure.team_id, failure.game_id, failure.error
        );
    }
    Ok(())
}
