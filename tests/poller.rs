use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use playodds_terminal::poller::{PollOutcome, spawn_status_poller};
use playodds_terminal::state::{
    AppState, Delta, JobPhase, JobStatusResponse, LeagueInfo, LeagueResult, apply_delta,
};
use playodds_terminal::status_fetch::{FetchError, StatusSource};

const FAST: Duration = Duration::from_millis(1);

/// Replays a fixed script; once it runs dry every call reports "running".
struct ScriptedSource {
    script: Mutex<VecDeque<Result<JobStatusResponse, FetchError>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<JobStatusResponse, FetchError>>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            script: Mutex::new(script.into()),
            calls: Arc::clone(&calls),
        };
        (source, calls)
    }
}

impl StatusSource for ScriptedSource {
    fn fetch_status(&self, _job_id: &str) -> Result<JobStatusResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(running("still going")))
    }
}

fn running(status: &str) -> JobStatusResponse {
    JobStatusResponse {
        valid_job: true,
        status: status.to_string(),
        result: None,
    }
}

fn invalid(status: &str) -> JobStatusResponse {
    JobStatusResponse {
        valid_job: false,
        status: status.to_string(),
        result: None,
    }
}

fn finished() -> JobStatusResponse {
    JobStatusResponse {
        valid_job: true,
        status: "finished".to_string(),
        result: Some(LeagueResult {
            league_info: LeagueInfo {
                name: "League".to_string(),
                extra: Default::default(),
            },
            team_data: Vec::new(),
        }),
    }
}

#[test]
fn result_stops_polling_after_one_render() {
    let (source, calls) = ScriptedSource::new(vec![
        Ok(running("queued")),
        Ok(running("simulating")),
        Ok(finished()),
    ]);
    let (tx, rx) = mpsc::channel();
    let handle = spawn_status_poller(source, "job-1".to_string(), FAST, tx);
    let summary = handle.join().expect("poller thread");

    assert_eq!(summary.outcome, PollOutcome::Finished);
    assert_eq!(summary.requests, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let deltas: Vec<Delta> = rx.try_iter().collect();
    assert_eq!(deltas.len(), 3);
    assert_eq!(deltas[0], Delta::Status("queued".to_string()));
    assert_eq!(deltas[1], Delta::Status("simulating".to_string()));
    let renders = deltas
        .iter()
        .filter(|d| matches!(d, Delta::Render(_)))
        .count();
    assert_eq!(renders, 1);
}

#[test]
fn invalid_job_stops_with_its_status() {
    let (source, calls) = ScriptedSource::new(vec![
        Ok(running("queued")),
        Ok(invalid("Job expired")),
    ]);
    let (tx, rx) = mpsc::channel();
    let summary = spawn_status_poller(source, "job-2".to_string(), FAST, tx)
        .join()
        .expect("poller thread");

    assert_eq!(summary.outcome, PollOutcome::Invalid);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let mut state = AppState::new("job-2", "/default.png");
    for delta in rx.try_iter() {
        apply_delta(&mut state, delta);
    }
    assert_eq!(state.phase, JobPhase::Failed);
    assert_eq!(state.status_text.as_deref(), Some("Job expired"));
    assert!(!state.loading);
    assert_eq!(state.render_count, 0);
}

#[test]
fn result_takes_precedence_over_invalid_flag() {
    let mut resp = finished();
    resp.valid_job = false;
    let (source, _) = ScriptedSource::new(vec![Ok(resp)]);
    let (tx, _rx) = mpsc::channel();
    let summary = spawn_status_poller(source, "job-3".to_string(), FAST, tx)
        .join()
        .expect("poller thread");
    assert_eq!(summary.outcome, PollOutcome::Finished);
}

#[test]
fn request_failure_is_reported_and_ends_polling() {
    let (source, calls) = ScriptedSource::new(vec![
        Ok(running("queued")),
        Err(FetchError::EmptyBody),
    ]);
    let (tx, rx) = mpsc::channel();
    let summary = spawn_status_poller(source, "job-4".to_string(), FAST, tx)
        .join()
        .expect("poller thread");

    assert_eq!(summary.outcome, PollOutcome::Errored);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let last = rx.try_iter().last().expect("at least one delta");
    assert_eq!(last, Delta::PollError("empty job status body".to_string()));
}

#[test]
fn first_request_is_immediate_and_next_waits_for_interval() {
    let (source, calls) = ScriptedSource::new(Vec::new());
    let (tx, rx) = mpsc::channel();
    let handle = spawn_status_poller(source, "job-5".to_string(), Duration::from_secs(30), tx);

    let first = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("first status without delay");
    assert_eq!(first, Delta::Status("still going".to_string()));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    handle.cancel();
    let summary = handle.join().expect("poller thread");
    assert_eq!(summary.outcome, PollOutcome::Cancelled);
    assert_eq!(summary.requests, 1);
}

#[test]
fn poller_stops_when_ui_goes_away() {
    let (source, _) = ScriptedSource::new(Vec::new());
    let (tx, rx) = mpsc::channel();
    drop(rx);
    let summary = spawn_status_poller(source, "job-6".to_string(), FAST, tx)
        .join()
        .expect("poller thread");
    assert_eq!(summary.outcome, PollOutcome::Disconnected);
    assert_eq!(summary.requests, 1);
}
