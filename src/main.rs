use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use tracing::info;
use tracing_subscriber::EnvFilter;

use playodds_terminal::config::{AppConfig, Cli};
use playodds_terminal::context::PageContext;
use playodds_terminal::export::{default_export_path, export_table_xlsx};
use playodds_terminal::http_client;
use playodds_terminal::logos::{HttpLogoLoader, settle_logos, spawn_logo_probes};
use playodds_terminal::poller::{PollerHandle, spawn_status_poller};
use playodds_terminal::render::LogoState;
use playodds_terminal::state::{AppState, Delta, JobPhase, apply_delta};
use playodds_terminal::status_fetch::HttpStatusSource;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

struct App {
    state: AppState,
    config: AppConfig,
    should_quit: bool,
    delta_tx: mpsc::Sender<Delta>,
    logos_requested: bool,
    spinner: usize,
}

impl App {
    fn new(state: AppState, config: AppConfig, delta_tx: mpsc::Sender<Delta>) -> Self {
        Self {
            state,
            config,
            should_quit: false,
            delta_tx,
            logos_requested: false,
            spinner: 0,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.scroll_rows_down(),
            KeyCode::Char('k') | KeyCode::Up => self.state.scroll_rows_up(),
            KeyCode::Char('l') | KeyCode::Right => self.state.shift_seeds_right(),
            KeyCode::Char('h') | KeyCode::Left => self.state.shift_seeds_left(),
            KeyCode::Char('e') | KeyCode::Char('E') => self.export(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn export(&mut self) {
        if !self.state.table.visible {
            self.state.push_log("[INFO] Nothing to export yet");
            return;
        }
        let path = default_export_path(&self.config.export_dir, &self.state.job_id);
        match export_table_xlsx(&path, &self.state.table, self.state.league_name.as_deref()) {
            Ok(report) => {
                let msg = format!(
                    "Exported {} rows x {} columns to {}",
                    report.rows,
                    report.columns,
                    report.path.display()
                );
                info!(path = %report.path.display(), rows = report.rows, "table exported");
                self.state.push_log(format!("[INFO] {msg}"));
                self.state.export.message = msg;
            }
            Err(err) => {
                self.state.push_log(format!("[WARN] Export failed: {err:#}"));
                self.state.export.message = "Export failed".to_string();
            }
        }
        self.state.export.last_updated = Some(Instant::now());
    }

    fn maybe_probe_logos(&mut self) {
        if self.logos_requested || !self.state.table.visible {
            return;
        }
        self.logos_requested = true;
        let pending = self.state.table.pending_logos();
        if pending.is_empty() {
            return;
        }
        spawn_logo_probes(
            HttpLogoLoader::new(self.config.base_url.clone()),
            pending,
            self.delta_tx.clone(),
        );
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    config.apply_cli(&cli);
    init_tracing(&config, cli.once)?;
    http_client::configure_timeout(config.http_timeout_secs);

    let context = PageContext::resolve(&cli)?;
    let state = AppState::from_context(&context, &config.default_logo);
    info!(
        job_id = %context.job_id,
        base_url = %config.base_url,
        inline_result = context.result.is_some(),
        "starting"
    );

    let (tx, rx) = mpsc::channel();
    let poller = state.needs_polling().then(|| {
        spawn_status_poller(
            HttpStatusSource::new(config.base_url.clone()),
            context.job_id.clone(),
            config.poll_interval,
            tx.clone(),
        )
    });

    if cli.once {
        return run_once(&config, state, rx, tx, poller);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(state, config, tx);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // A request may still be in flight; the thread ends with the process.
    if let Some(poller) = &poller {
        poller.cancel();
    }

    res?;
    Ok(())
}

fn init_tracing(config: &AppConfig, once: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("playodds_terminal=info"));

    if let Some(path) = &config.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if once {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

/// Waits for a terminal state without a UI and prints the table.
fn run_once(
    config: &AppConfig,
    mut state: AppState,
    rx: mpsc::Receiver<Delta>,
    tx: mpsc::Sender<Delta>,
    poller: Option<PollerHandle>,
) -> Result<()> {
    drop(tx);
    while state.phase == JobPhase::Polling {
        let Ok(delta) = rx.recv() else {
            break;
        };
        if let Delta::Status(status) = &delta {
            eprintln!("Status: {status}");
        }
        apply_delta(&mut state, delta);
    }
    if let Some(poller) = poller {
        poller.cancel();
    }

    match state.phase {
        JobPhase::Done => {
            settle_logos(HttpLogoLoader::new(config.base_url.clone()), &mut state);
            println!("{}", state.subtitle.join("\n"));
            println!("{}", state.table.to_text());
            Ok(())
        }
        JobPhase::Failed => bail!(
            "job {} is not valid: {}",
            state.job_id,
            state.status_text.unwrap_or_default()
        ),
        JobPhase::Errored | JobPhase::Polling => {
            bail!("job {}: {}", state.job_id, state.subtitle.join(" / "))
        }
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }
        app.maybe_probe_logos();
        app.state.maybe_clear_export(Instant::now());

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            app.spinner = app.spinner.wrapping_add(1);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let header_height = 2 + app.state.subtitle.len().max(1) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header_height),
            Constraint::Min(3),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    if app.state.table.visible {
        render_results(frame, chunks[1], &app.state);
    } else {
        render_waiting(frame, chunks[1], &app.state);
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let spinner = if app.state.loading {
        format!(" {}", SPINNER[app.spinner % SPINNER.len()])
    } else {
        String::new()
    };
    let mut lines = vec![format!("PLAYODDS | Job {}{spinner}", app.state.job_id)];
    if app.state.subtitle.is_empty() {
        lines.push(String::new());
    } else {
        lines.extend(app.state.subtitle.iter().cloned());
    }
    lines.join("\n")
}

fn footer_text(state: &AppState) -> String {
    let keys = if state.table.visible {
        "j/k/↑/↓ Rows | h/l/←/→ Seeds | e Export | ? Help | q Quit"
    } else {
        "? Help | q Quit"
    };
    if state.export.message.is_empty() {
        keys.to_string()
    } else {
        format!("{keys} | {}", state.export.message)
    }
}

fn render_waiting(frame: &mut Frame, area: Rect, state: &AppState) {
    let (text, color) = match state.phase {
        JobPhase::Polling => ("Waiting for results...", Color::DarkGray),
        JobPhase::Failed => ("This job cannot be shown.", Color::Yellow),
        JobPhase::Errored => ("Lost contact with the backend.", Color::Red),
        JobPhase::Done => ("No teams in this result.", Color::DarkGray),
    };
    let paragraph = Paragraph::new(text).style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, area: Rect, state: &AppState) {
    let table = &state.table;
    let columns = table.visible_columns(state.seed_offset);
    let widths = table.column_widths();
    let constraints: Vec<Constraint> = columns
        .iter()
        .map(|&idx| Constraint::Length(widths.get(idx).copied().unwrap_or(4) as u16))
        .collect();

    let header = Row::new(
        columns
            .iter()
            .map(|&idx| Cell::from(table.headers[idx].clone())),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = table.rows.iter().map(|row| {
        let cells = row.display_cells();
        let logo_style = match row.logo.state {
            LogoState::Pending => Style::default().fg(Color::DarkGray),
            LogoState::Loaded => Style::default().fg(Color::Green),
            LogoState::Fallback => Style::default().fg(Color::Yellow),
        };
        Row::new(columns.iter().map(|&idx| {
            let text = cells.get(idx).cloned().unwrap_or_default();
            if idx == 0 {
                Cell::from(text).style(logo_style)
            } else {
                Cell::from(text)
            }
        }))
    });

    let title = match state.league_name.as_deref() {
        Some(name) if !name.is_empty() => format!("Standings - {name}"),
        _ => "Standings".to_string(),
    };
    let widget = Table::new(rows, constraints)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));

    let mut table_state = TableState::default().with_offset(state.row_scroll);
    frame.render_stateful_widget(widget, area, &mut table_state);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No messages yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "PLAYODDS Terminal - Help",
        "",
        "  j/k or ↑/↓   Scroll teams",
        "  h/l or ←/→   Scroll seed columns",
        "  e            Export table to .xlsx",
        "  ?            Toggle help",
        "  q / Esc      Quit",
        "",
        "Logo column:",
        "  …  loading   ●  loaded   ○  default image",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
