use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::context::PageContext;
use crate::render::{self, ResultsTable};

pub const DEFAULT_LOGO: &str = "/static/img/default_logo.png";

/// Raw body of `GET /job_status/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    #[serde(default = "default_valid_job", deserialize_with = "null_as_valid")]
    pub valid_job: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub result: Option<LeagueResult>,
}

fn default_valid_job() -> bool {
    true
}

fn null_as_valid<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(de)?.unwrap_or_else(default_valid_job))
}

// `#[serde(default)]` only covers a missing key; this also takes `null`.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

impl JobStatusResponse {
    pub fn into_state(self) -> JobState {
        match self.result {
            Some(result) => JobState::Succeeded(result),
            None if !self.valid_job => JobState::Failed(self.status),
            None => JobState::Running(self.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Running(String),
    Succeeded(LeagueResult),
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueResult {
    pub league_info: LeagueInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub team_data: Vec<TeamRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    #[serde(default)]
    pub name: Value,
    #[serde(default)]
    pub owner: Value,
    #[serde(default)]
    pub wins: Value,
    #[serde(default)]
    pub losses: Value,
    #[serde(default)]
    pub ties: Value,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub points_for: Option<f64>,
    #[serde(default)]
    pub points_against: Option<f64>,
    #[serde(default)]
    pub expected_wins: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logo: String,
    // Keyed by seed index as a string ("0".."N-1").
    #[serde(default, deserialize_with = "odds_without_nulls")]
    pub odds: HashMap<String, f64>,
}

fn odds_without_nulls<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<HashMap<String, f64>, D::Error> {
    let raw = Option::<HashMap<String, Option<f64>>>::deserialize(de)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(seed, odds)| odds.map(|odds| (seed, odds)))
        .collect())
}

impl TeamRecord {
    pub fn odds_for_seed(&self, seed: usize) -> Option<f64> {
        self.odds.get(&seed.to_string()).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Polling,
    Done,
    Failed,
    Errored,
}

#[derive(Debug, Clone)]
pub struct ExportState {
    pub message: String,
    pub last_updated: Option<Instant>,
}

impl Default for ExportState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportState {
    pub fn new() -> Self {
        Self {
            message: String::new(),
            last_updated: None,
        }
    }

    pub fn clear_if_done_for(&mut self, now: Instant, keep_secs: u64) {
        let Some(last) = self.last_updated else {
            return;
        };
        if now.duration_since(last).as_secs() >= keep_secs {
            *self = Self::new();
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub job_id: String,
    pub subtitle: Vec<String>,
    pub status_text: Option<String>,
    pub loading: bool,
    pub phase: JobPhase,
    pub table: ResultsTable,
    pub league_name: Option<String>,
    pub render_count: usize,
    pub default_logo: String,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    pub row_scroll: usize,
    pub seed_offset: usize,
    pub export: ExportState,
}

impl AppState {
    pub fn new(job_id: impl Into<String>, default_logo: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            subtitle: Vec::new(),
            status_text: None,
            loading: true,
            phase: JobPhase::Polling,
            table: ResultsTable::with_identity_headers(),
            league_name: None,
            render_count: 0,
            default_logo: default_logo.into(),
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
            row_scroll: 0,
            seed_offset: 0,
            export: ExportState::new(),
        }
    }

    /// Seeds the page from the inline context. A context that already carries
    /// a result is rendered on the spot and never polls.
    pub fn from_context(context: &PageContext, default_logo: &str) -> Self {
        let mut state = Self::new(context.job_id.clone(), default_logo);
        state.set_status_line(&context.status);
        state.status_text = Some(context.status.clone());
        if let Some(result) = &context.result {
            state.render(result);
        }
        state
    }

    pub fn needs_polling(&self) -> bool {
        self.phase == JobPhase::Polling
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn maybe_clear_export(&mut self, now: Instant) {
        self.export.clear_if_done_for(now, 8);
    }

    pub fn scroll_rows_down(&mut self) {
        let max = self.table.rows.len().saturating_sub(1);
        self.row_scroll = (self.row_scroll + 1).min(max);
    }

    pub fn scroll_rows_up(&mut self) {
        self.row_scroll = self.row_scroll.saturating_sub(1);
    }

    pub fn shift_seeds_right(&mut self) {
        let max = self.table.seed_columns().saturating_sub(1);
        self.seed_offset = (self.seed_offset + 1).min(max);
    }

    pub fn shift_seeds_left(&mut self) {
        self.seed_offset = self.seed_offset.saturating_sub(1);
    }

    fn set_status_line(&mut self, status: &str) {
        self.subtitle = vec![format!("Status: {status}")];
    }

    fn render(&mut self, result: &LeagueResult) {
        self.loading = false;
        self.phase = JobPhase::Done;
        self.league_name = Some(result.league_info.name.clone());
        self.render_count += 1;
        render::render_result(result, &mut self.table, &mut self.subtitle);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    Status(String),
    Render(LeagueResult),
    Invalid(String),
    PollError(String),
    LogoLoaded { row: usize },
    LogoFailed { row: usize },
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Status(status) => {
            state.set_status_line(&status);
            state.status_text = Some(status);
        }
        Delta::Render(result) => {
            state.push_log(format!(
                "[INFO] Results ready: {} ({} teams)",
                result.league_info.name,
                result.team_data.len()
            ));
            state.render(&result);
        }
        Delta::Invalid(status) => {
            state.loading = false;
            state.phase = JobPhase::Failed;
            state.set_status_line(&status);
            state.push_log(format!("[WARN] Job {} is not valid: {status}", state.job_id));
            state.status_text = Some(status);
        }
        Delta::PollError(message) => {
            state.loading = false;
            state.phase = JobPhase::Errored;
            state
                .subtitle
                .push(format!("Status updates stopped: {message}"));
            state.push_log(format!("[WARN] Status request failed: {message}"));
        }
        Delta::LogoLoaded { row } => {
            if let Some(row) = state.table.rows.get_mut(row) {
                row.logo.mark_loaded();
            }
        }
        Delta::LogoFailed { row } => {
            let default_logo = state.default_logo.clone();
            if let Some(row) = state.table.rows.get_mut(row) {
                row.logo.fall_back(&default_logo);
            }
        }
    }
}
