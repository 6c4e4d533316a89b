use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, Transaction, params};

use crate::config::FeatureConfig;
use crate::pipeline::FeatureRun;
use crate::records::{DomainStats, GameRecord, PlayerGameRecord};
use crate::table::{FeatureTable, PlayerGameKey, TeamGameKey};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub db_path: Option<PathBuf>,
    pub team_rows: usize,
    pub player_rows: usize,
    pub rosters: usize,
    pub profiles: usize,
    pub failures: usize,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS team_games (
            game_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            opponent_id INTEGER NOT NULL,
            home INTEGER NOT NULL,
            win INTEGER NOT NULL,
            stats_json TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (game_id, team_id)
        );
        CREATE INDEX IF NOT EXISTS idx_team_games_date ON team_games(date);

        CREATE TABLE IF NOT EXISTS player_games (
            game_id INTEGER NOT NULL,
            player_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            position TEXT NOT NULL,
            batting_order INTEGER NULL,
            stats_json TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (game_id, player_id)
        );
        CREATE INDEX IF NOT EXISTS idx_player_games_date ON player_games(date);
        CREATE INDEX IF NOT EXISTS idx_player_games_team ON player_games(team_id, game_id);

        CREATE TABLE IF NOT EXISTS team_features (
            run_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            game_id INTEGER NOT NULL,
            feature TEXT NOT NULL,
            value REAL NULL
        );
        CREATE TABLE IF NOT EXISTS player_features (
            run_id INTEGER NOT NULL,
            player_id INTEGER NOT NULL,
            game_id INTEGER NOT NULL,
            feature TEXT NOT NULL,
            value REAL NULL
        );
        CREATE TABLE IF NOT EXISTS profiles (
            run_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            game_id INTEGER NOT NULL,
            feature TEXT NOT NULL,
            value REAL NULL
        );
        CREATE TABLE IF NOT EXISTS rosters (
            run_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            game_id INTEGER NOT NULL,
            slot TEXT NOT NULL,
            player_id INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS reconcile_failures (
            run_id INTEGER NOT NULL,
            team_id INTEGER NOT NULL,
            game_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            kind TEXT NOT NULL,
            message TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS feature_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            config_json TEXT NOT NULL,
            non_causal INTEGER NOT NULL,
            team_rows INTEGER NOT NULL,
            player_rows INTEGER NOT NULL,
            rosters INTEGER NOT NULL,
            profiles INTEGER NOT NULL,
            failures INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn upsert_team_games(conn: &mut Connection, games: &[GameRecord]) -> Result<usize> {
    let tx = conn.transaction().context("begin team game transaction")?;
    for game in games {
        upsert_team_game(&tx, game)?;
    }
    tx.commit().context("commit team game transaction")?;
    Ok(games.len())
}

fn upsert_team_game(tx: &Transaction<'_>, g: &GameRecord) -> Result<()> {
    let stats_json = serde_json::to_string(&g.stats).context("encode team stats")?;
    tx.execute(
        r#"
        INSERT INTO team_games (
            game_id, team_id, date, opponent_id, home, win, stats_json, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(game_id, team_id) DO UPDATE SET
            date = excluded.date,
            opponent_id = excluded.opponent_id,
            home = excluded.home,
            win = excluded.win,
            stats_json = excluded.stats_json,
            updated_at = excluded.updated_at
        "#,
        params![
            g.game_id as i64,
            g.team_id as i64,
            g.date.format(DATE_FORMAT).to_string(),
            g.opponent_id as i64,
            bool_to_i64(g.home),
            bool_to_i64(g.win),
            stats_json,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| format!("upsert team game {} team {}", g.game_id, g.team_id))?;
    Ok(())
}

pub fn upsert_player_games(conn: &mut Connection, players: &[PlayerGameRecord]) -> Result<usize> {
    let tx = conn.transaction().context("begin player game transaction")?;
    for p in players {
        let stats_json = serde_json::to_string(&p.stats).context("encode player stats")?;
        tx.execute(
            r#"
            INSERT INTO player_games (
                game_id, player_id, team_id, date, position, batting_order, stats_json, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(game_id, player_id) DO UPDATE SET
                team_id = excluded.team_id,
                date = excluded.date,
                position = excluded.position,
                batting_order = excluded.batting_order,
                stats_json = excluded.stats_json,
                updated_at = excluded.updated_at
            "#,
            params![
                p.game_id as i64,
                p.player_id as i64,
                p.team_id as i64,
                p.date.format(DATE_FORMAT).to_string(),
                p.position,
                p.batting_order.map(i64::from),
                stats_json,
                Utc::now().to_rfc3339(),
            ],
        )
        .with_context(|| format!("upsert player {} game {}", p.player_id, p.game_id))?;
    }
    tx.commit().context("commit player game transaction")?;
    Ok(players.len())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).with_context(|| format!("bad date {raw}"))
}

fn parse_stats(raw: &str) -> Result<DomainStats> {
    serde_json::from_str::<DomainStats>(raw).context("decode stats json")
}

pub fn load_team_games(conn: &Connection) -> Result<Vec<GameRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT game_id, team_id, date, opponent_id, home, win, stats_json
            FROM team_games
            ORDER BY date ASC, game_id ASC, team_id ASC
            "#,
        )
        .context("prepare load team games query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, u64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, i64>(4)? != 0,
                row.get::<_, i64>(5)? != 0,
                row.get::<_, String>(6)?,
            ))
        })
        .context("query load team games")?;

    let mut out = Vec::new();
    for row in rows {
        let (game_id, team_id, date, opponent_id, home, win, stats) =
            row.context("decode team game row")?;
        out.push(GameRecord {
            game_id,
            date: parse_date(&date)?,
            team_id,
            opponent_id,
            home,
            win,
            stats: parse_stats(&stats).with_context(|| format!("team {team_id} game {game_id}"))?,
        });
    }
    Ok(out)
}

pub fn load_player_games(conn: &Connection) -> Result<Vec<PlayerGameRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT player_id, game_id, team_id, date, position, batting_order, stats_json
            FROM player_games
            ORDER BY date ASC, game_id ASC, player_id ASC
            "#,
        )
        .context("prepare load player games query")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<u32>>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .context("query load player games")?;

    let mut out = Vec::new();
    for row in rows {
        let (player_id, game_id, team_id, date, position, batting_order, stats) =
            row.context("decode player game row")?;
        out.push(PlayerGameRecord {
            player_id,
            game_id,
            team_id,
            date: parse_date(&date)?,
            position,
            batting_order,
            stats: parse_stats(&stats)
                .with_context(|| format!("player {player_id} game {game_id}"))?,
        });
    }
    Ok(out)
}

/// Replaces the output tables with the contents of `run` and records the run
/// in `feature_runs`.
pub fn write_run(conn: &mut Connection, run: &FeatureRun, config: &FeatureConfig) -> Result<RunSummary> {
    let started_at = Utc::now().to_rfc3339();
    let config_json = serde_json::to_string(config).context("encode feature config")?;
    conn.execute(
        "INSERT INTO feature_runs(started_at, finished_at, config_json, non_causal, team_rows, player_rows, rosters, profiles, failures)
         VALUES (?1, NULL, ?2, ?3, 0, 0, 0, 0, 0)",
        params![started_at, config_json, bool_to_i64(run.non_causal)],
    )
    .context("insert feature run")?;
    let run_id = conn.last_insert_rowid();

    let tx = conn.transaction().context("begin feature output transaction")?;
    tx.execute_batch(
        "DELETE FROM team_features; DELETE FROM player_features; DELETE FROM profiles;
         DELETE FROM rosters; DELETE FROM reconcile_failures;",
    )
    .context("clear previous feature outputs")?;
    write_team_table(&tx, "team_features", run_id, &run.teams)?;
    write_team_table(&tx, "profiles", run_id, &run.profiles)?;
    write_player_table(&tx, run_id, &run.players)?;

    for roster in &run.rosters {
        for (slot, player_id) in roster.slots() {
            tx.execute(
                "INSERT INTO rosters(run_id, team_id, game_id, slot, player_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    run_id,
                    roster.team_id as i64,
                    roster.game_id as i64,
                    slot.label(),
                    player_id as i64
                ],
            )
            .context("insert roster slot")?;
        }
    }
    for failure in &run.failures {
        tx.execute(
            "INSERT INTO reconcile_failures(run_id, team_id, game_id, date, kind, message) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run_id,
                failure.team_id as i64,
                failure.game_id as i64,
                failure.date.format(DATE_FORMAT).to_string(),
                failure.error.kind(),
                failure.error.to_string()
            ],
        )
        .context("insert reconcile failure")?;
    }
    tx.commit().context("commit feature output transaction")?;

    let summary = RunSummary {
        run_id,
        db_path: conn.path().map(PathBuf::from),
        team_rows: run.teams.len(),
        player_rows: run.players.len(),
        rosters: run.rosters.len(),
        profiles: run.profiles.len(),
        failures: run.failures.len(),
    };
    conn.execute(
        "UPDATE feature_runs
         SET finished_at = ?1, team_rows = ?2, player_rows = ?3, rosters = ?4, profiles = ?5, failures = ?6
         WHERE run_id = ?7",
        params![
            Utc::now().to_rfc3339(),
            summary.team_rows as i64,
            summary.player_rows as i64,
            summary.rosters as i64,
            summary.profiles as i64,
            summary.failures as i64,
            run_id
        ],
    )
    .context("update feature run")?;
    Ok(summary)
}

fn write_team_table(
    tx: &Transaction<'_>,
    table_name: &str,
    run_id: i64,
    table: &FeatureTable<TeamGameKey>,
) -> Result<()> {
    if !matches!(table_name, "team_features" | "profiles") {
        return Err(anyhow!("unknown team output table {table_name}"));
    }
    let mut stmt = tx
        .prepare(&format!(
            "INSERT INTO {table_name}(run_id, team_id, game_id, feature, value) VALUES (?1, ?2, ?3, ?4, ?5)"
        ))
        .with_context(|| format!("prepare insert into {table_name}"))?;
    for row in table.rows() {
        for (feature, value) in table.columns().iter().zip(&row.values) {
            stmt.execute(params![
                run_id,
                row.key.team_id as i64,
                row.key.game_id as i64,
                feature,
                value
            ])
            .with_context(|| format!("insert into {table_name}"))?;
        }
    }
    Ok(())
}

fn write_player_table(tx: &Transaction<'_>, run_id: i64, table: &FeatureTable<PlayerGameKey>) -> Result<()> {
    let mut stmt = tx
        .prepare(
            "INSERT INTO player_features(run_id, player_id, game_id, feature, value) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .context("prepare insert into player_features")?;
    for row in table.rows() {
        for (feature, value) in table.columns().iter().zip(&row.values) {
            stmt.execute(params![
                run_id,
                row.key.player_id as i64,
                row.key.game_id as i64,
                feature,
                value
            ])
            .context("insert into player_features")?;
        }
    }
    Ok(())
}

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}
