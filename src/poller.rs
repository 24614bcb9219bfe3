use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::state::{Delta, JobState};
use crate::status_fetch::StatusSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Continue,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Finished,
    Invalid,
    Errored,
    Cancelled,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub outcome: PollOutcome,
    pub requests: usize,
}

pub fn poll_step(state: &JobState) -> PollStep {
    if state.is_terminal() {
        PollStep::Stop
    } else {
        PollStep::Continue
    }
}

pub fn delta_for(state: JobState) -> Delta {
    match state {
        JobState::Running(status) => Delta::Status(status),
        JobState::Succeeded(result) => Delta::Render(result),
        JobState::Failed(status) => Delta::Invalid(status),
    }
}

/// Owns the polling thread. Dropping the handle also cancels polling at the
/// next wait.
pub struct PollerHandle {
    cancel_tx: Sender<()>,
    thread: JoinHandle<PollSummary>,
}

impl PollerHandle {
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(());
    }

    pub fn join(self) -> thread::Result<PollSummary> {
        let Self { cancel_tx, thread } = self;
        let summary = thread.join();
        drop(cancel_tx);
        summary
    }
}

/// Starts polling `job_id` right away. Each tick waits for the previous
/// response to be handled, so at most one request is in flight.
pub fn spawn_status_poller<S: StatusSource>(
    source: S,
    job_id: String,
    interval: Duration,
    tx: Sender<Delta>,
) -> PollerHandle {
    let (cancel_tx, cancel_rx) = mpsc::channel();
    let thread = thread::spawn(move || run_poller(source, &job_id, interval, &tx, &cancel_rx));
    PollerHandle { cancel_tx, thread }
}

fn run_poller<S: StatusSource>(
    source: S,
    job_id: &str,
    interval: Duration,
    tx: &Sender<Delta>,
    cancel_rx: &Receiver<()>,
) -> PollSummary {
    let mut requests = 0usize;
    loop {
        requests += 1;
        debug!(job_id, tick = requests, "fetching job status");

        let state = match source.fetch_status(job_id) {
            Ok(resp) => resp.into_state(),
            Err(err) => {
                warn!(job_id, error = %err, "job status request failed, polling stopped");
                let _ = tx.send(Delta::PollError(err.to_string()));
                return PollSummary {
                    outcome: PollOutcome::Errored,
                    requests,
                };
            }
        };

        let step = poll_step(&state);
        let terminal = match &state {
            JobState::Running(status) => {
                debug!(job_id, status = %status, "job still running");
                None
            }
            JobState::Succeeded(result) => {
                info!(job_id, teams = result.team_data.len(), "job finished");
                Some(PollOutcome::Finished)
            }
            JobState::Failed(status) => {
                info!(job_id, status = %status, "job is not valid");
                Some(PollOutcome::Invalid)
            }
        };

        if tx.send(delta_for(state)).is_err() {
            return PollSummary {
                outcome: PollOutcome::Disconnected,
                requests,
            };
        }
        if let (PollStep::Stop, Some(outcome)) = (step, terminal) {
            return PollSummary { outcome, requests };
        }

        match cancel_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!(job_id, "polling cancelled");
                return PollSummary {
                    outcome: PollOutcome::Cancelled,
                    requests,
                };
            }
        }
    }
}
