use std::path::Path;

use anyhow::{Context, Result, anyhow};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::pipeline::FeatureRun;
use crate::table::{FeatureTable, TeamGameKey};

const MAX_XLSX_COLUMNS: usize = 16_384;

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub teams: usize,
    pub rosters: usize,
    pub profiles: usize,
    pub failures: usize,
}

enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

const KEY_HEADERS: [&str; 6] = ["team_id", "game_id", "date", "opponent_id", "home", "win"];

fn key_cells(key: &TeamGameKey) -> Vec<Cell> {
    vec![
        Cell::Number(f64::from(key.team_id)),
        Cell::Number(key.game_id as f64),
        Cell::Text(key.date.to_string()),
        Cell::Number(f64::from(key.opponent_id)),
        Cell::Number(if key.home { 1.0 } else { 0.0 }),
        key.win.map(|w| if w { 1.0 } else { 0.0 }).into(),
    ]
}

fn table_rows(table: &FeatureTable<TeamGameKey>) -> Vec<Vec<Cell>> {
    let header = KEY_HEADERS
        .iter()
        .map(|h| h.to_string())
        .chain(table.columns().iter().cloned())
        .map(Cell::Text)
        .collect::<Vec<_>>();
    let mut rows = vec![header];
    for row in table.rows() {
        let mut cells = key_cells(&row.key);
        cells.extend(row.values.iter().map(|v| Cell::from(*v)));
        rows.push(cells);
    }
    rows
}

fn roster_rows(run: &FeatureRun) -> Vec<Vec<Cell>> {
    let mut rows = vec![
        ["team_id", "game_id", "date", "slot", "player_id"]
            .iter()
            .map(|h| Cell::Text(h.to_string()))
            .collect::<Vec<_>>(),
    ];
    for roster in &run.rosters {
        for (slot, player_id) in roster.slots() {
            rows.push(vec![
                Cell::Number(f64::from(roster.team_id)),
                Cell::Number(roster.game_id as f64),
                Cell::Text(roster.date.to_string()),
                Cell::Text(slot.label()),
                Cell::Number(f64::from(player_id)),
            ]);
        }
    }
    rows
}

fn failure_rows(run: &FeatureRun) -> Vec<Vec<Cell>> {
    let mut rows = vec![
        ["team_id", "game_id", "date", "kind", "message"]
            .iter()
            .map(|h| Cell::Text(h.to_string()))
            .collect::<Vec<_>>(),
    ];
    for failure in &run.failures {
        rows.push(vec![
            Cell::Number(f64::from(failure.team_id)),
            Cell::Number(failure.game_id as f64),
            Cell::Text(failure.date.to_string()),
            Cell::Text(failure.error.kind().to_string()),
            Cell::Text(failure.error.to_string()),
        ]);
    }
    rows
}

pub fn export_run(run: &FeatureRun, path: &Path) -> Result<ExportReport> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("TeamFeatures")?;
        write_rows(sheet, &table_rows(&run.teams))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Rosters")?;
        write_rows(sheet, &roster_rows(run))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Profiles")?;
        write_rows(sheet, &table_rows(&run.profiles))?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Failures")?;
        write_rows(sheet, &failure_rows(run))?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        teams: run.teams.len(),
        rosters: run.rosters.len(),
        profiles: run.profiles.len(),
        failures: run.failures.len(),
    })
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    if let Some(width) = rows.iter().map(Vec::len).max()
        && width > MAX_XLSX_COLUMNS
    {
        return Err(anyhow!("{width} columns exceed the xlsx sheet limit"));
    }
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            let written = match cell {
                Cell::Text(value) => worksheet.write_string(r, c, value).map(|_| ()),
                Cell::Number(value) => worksheet.write_number(r, c, *value).map(|_| ()),
                Cell::Empty => Ok(()),
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
