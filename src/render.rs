use serde_json::Value;

use crate::rounding::{format_number, round2};
use crate::state::{LeagueResult, TeamRecord};

/// Columns that exist before any result arrives: the logo, the raw identity
/// fields and the rounded stats.
pub const STATIC_HEADERS: [&str; 10] = [
    "Logo", "Team", "Owner", "W", "L", "T", "Avg", "PF", "PA", "xW",
];
pub const IDENTITY_CELLS: usize = 5;
pub const ROUNDED_CELLS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoState {
    Pending,
    Loaded,
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogoCell {
    pub src: String,
    pub state: LogoState,
}

impl LogoCell {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            state: LogoState::Pending,
        }
    }

    pub fn mark_loaded(&mut self) {
        if self.state == LogoState::Pending {
            self.state = LogoState::Loaded;
        }
    }

    /// Swaps in the default image. Happens at most once per cell; a failing
    /// default is left as is.
    pub fn fall_back(&mut self, default_logo: &str) -> bool {
        if self.state == LogoState::Fallback {
            return false;
        }
        self.src = default_logo.to_string();
        self.state = LogoState::Fallback;
        true
    }

    pub fn label(&self) -> &'static str {
        match self.state {
            LogoState::Pending => "…",
            LogoState::Loaded => "●",
            LogoState::Fallback => "○",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Blank,
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(value) => format_number(*value),
            CellValue::Blank => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub logo: LogoCell,
    pub cells: Vec<CellValue>,
}

impl TableRow {
    pub fn column_count(&self) -> usize {
        1 + self.cells.len()
    }

    pub fn display_cells(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.column_count());
        out.push(self.logo.label().to_string());
        out.extend(self.cells.iter().map(CellValue::display));
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    pub visible: bool,
}

impl ResultsTable {
    pub fn with_identity_headers() -> Self {
        Self {
            headers: STATIC_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            visible: false,
        }
    }

    pub fn seed_columns(&self) -> usize {
        self.headers.len().saturating_sub(STATIC_HEADERS.len())
    }

    pub fn pending_logos(&self) -> Vec<(usize, String)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.logo.state == LogoState::Pending)
            .map(|(idx, row)| (idx, row.logo.src.clone()))
            .collect()
    }

    /// Indices of the columns shown when the seed columns are scrolled by
    /// `seed_offset`. Static columns are always kept.
    pub fn visible_columns(&self, seed_offset: usize) -> Vec<usize> {
        let fixed = STATIC_HEADERS.len().min(self.headers.len());
        let start = fixed + seed_offset.min(self.seed_columns());
        (0..fixed).chain(start..self.headers.len()).collect()
    }

    pub fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (idx, cell) in row.display_cells().iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(idx) {
                    Some(w) => *w = (*w).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }

    /// Plain text grid, used when printing instead of drawing the TUI.
    pub fn to_text(&self) -> String {
        let widths = self.column_widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(pad_line(&self.headers, &widths));
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &self.rows {
            lines.push(pad_line(&row.display_cells(), &widths));
        }
        lines.join("\n")
    }
}

fn pad_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let width = widths.get(idx).copied().unwrap_or(0);
            format!("{cell:<width$}")
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Fills `table` from a finished result and points `subtitle` at the league.
///
/// Seed headers and rows are appended, so a second call duplicates them.
pub fn render_result(result: &LeagueResult, table: &mut ResultsTable, subtitle: &mut Vec<String>) {
    subtitle.clear();
    subtitle.push(result.league_info.name.clone());

    let seeds = result.team_data.len();
    table
        .headers
        .extend((0..seeds).map(|seed| format!("Seed {seed}")));

    let rows: Vec<TableRow> = result
        .team_data
        .iter()
        .map(|team| build_row(team, seeds))
        .collect();
    table.rows.extend(rows);
    table.visible = true;
}

fn build_row(team: &TeamRecord, seeds: usize) -> TableRow {
    let mut cells = Vec::with_capacity(IDENTITY_CELLS + ROUNDED_CELLS + seeds);
    for raw in [&team.name, &team.owner, &team.wins, &team.losses, &team.ties] {
        cells.push(raw_cell(raw));
    }
    for stat in [
        team.average,
        team.points_for,
        team.points_against,
        team.expected_wins,
    ] {
        cells.push(rounded_cell(stat));
    }
    for seed in 0..seeds {
        cells.push(rounded_cell(team.odds_for_seed(seed)));
    }
    TableRow {
        logo: LogoCell::new(team.logo.clone()),
        cells,
    }
}

fn raw_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Blank,
        Value::String(text) => CellValue::Text(text.clone()),
        Value::Number(n) => n
            .as_f64()
            .map_or_else(|| CellValue::Text(n.to_string()), CellValue::Number),
        other => CellValue::Text(other.to_string()),
    }
}

fn rounded_cell(value: Option<f64>) -> CellValue {
    match value {
        Some(v) => CellValue::Number(round2(v)),
        None => CellValue::Blank,
    }
}
