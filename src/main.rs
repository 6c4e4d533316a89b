use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;

use diamond_features::{FeatureConfig, export, parquet_input, run_features, store};

#[derive(Parser)]
#[command(name = "diamond_features")]
#[command(about = "Build leak-free team, player and roster features from game logs")]
struct Cli {
    /// SQLite database holding raw game logs; feature outputs are written back
    #[arg(long)]
    db: Option<PathBuf>,

    /// Wide team-game Parquet file (imported into --db when both are given)
    #[arg(long, requires = "players_parquet")]
    games_parquet: Option<PathBuf>,

    /// Wide player-game Parquet file
    #[arg(long, requires = "games_parquet")]
    players_parquet: Option<PathBuf>,

    /// Feature config JSON (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the resolved config to this path and continue
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// XLSX workbook for team features, rosters and profiles
    #[arg(long)]
    xlsx: Option<PathBuf>,
}

fn main() -> Result<()> {
    diamond_features::init_runtime();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FeatureConfig::load(path)?,
        None => FeatureConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(path) = &cli.save_config {
        config.save(path)?;
        info!(path = %path.display(), "saved feature config");
    }

    let mut conn = cli.db.as_deref().map(store::open_db).transpose()?;
    let (games, players) = match (&cli.games_parquet, &cli.players_parquet) {
        (Some(games_path), Some(players_path)) => {
            let games = parquet_input::read_team_games(games_path)?;
            let players = parquet_input::read_player_games(players_path)?;
            if let Some(conn) = conn.as_mut() {
                let team_rows = store::upsert_team_games(conn, &games)?;
                let player_rows = store::upsert_player_games(conn, &players)?;
                info!(team_rows, player_rows, "imported parquet inputs");
            }
            (games, players)
        }
        _ => {
            let conn = conn
                .as_ref()
                .ok_or_else(|| anyhow!("pass --db or --games-parquet/--players-parquet"))?;
            (store::load_team_games(conn)?, store::load_player_games(conn)?)
        }
    };
    if games.is_empty() {
        return Err(anyhow!("no team games to process"));
    }

    let run = run_features(games, players, &config).context("feature run failed")?;

    println!("Feature run complete");
    println!(
        "Team rows: {} x {} columns",
        run.teams.len(),
        run.teams.columns().len()
    );
    println!(
        "Player rows: {} x {} columns",
        run.players.len(),
        run.players.columns().len()
    );
    println!("Rosters: {} ({} failed)", run.rosters.len(), run.failures.len());
    println!(
        "Profiles: {} x {} columns",
        run.profiles.len(),
        run.profiles.columns().len()
    );
    if run.non_causal {
        println!("WARNING: non-causal windows enabled; do not use these features for training");
    }

    if let Some(conn) = conn.as_mut() {
        let summary = store::write_run(conn, &run, &config)?;
        println!("DB run id: {}", summary.run_id);
    }
    if let Some(path) = &cli.xlsx {
        let report = export::export_run(&run, path)?;
        println!(
            "Workbook: {} ({} profiles, {} failures)",
            path.display(),
            report.profiles,
            report.failures
        );
    }
    Ok(())
}
