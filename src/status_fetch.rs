use reqwest::Url;
use reqwest::header::ACCEPT;
use thiserror::Error;

use crate::http_client::http_client;
use crate::state::JobStatusResponse;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http client unavailable: {0}")]
    Client(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("empty job status body")]
    EmptyBody,
    #[error("invalid job status json: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Where job status comes from. The poller only sees this trait.
pub trait StatusSource: Send + 'static {
    fn fetch_status(&self, job_id: &str) -> Result<JobStatusResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    base_url: String,
}

impl HttpStatusSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl StatusSource for HttpStatusSource {
    fn fetch_status(&self, job_id: &str) -> Result<JobStatusResponse, FetchError> {
        let client = http_client().map_err(|err| FetchError::Client(format!("{err:#}")))?;
        let url = job_status_url(&self.base_url, job_id)?;

        let resp = client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        parse_job_status_json(&body)
    }
}

/// `{base}/job_status/{job_id}`, with the id encoded as a single path segment.
pub fn job_status_url(base_url: &str, job_id: &str) -> Result<Url, FetchError> {
    let mut url =
        Url::parse(base_url.trim()).map_err(|err| FetchError::InvalidUrl(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(format!("{base_url} cannot be a base")))?
        .pop_if_empty()
        .push("job_status")
        .push(job_id);
    Ok(url)
}

pub fn parse_job_status_json(raw: &str) -> Result<JobStatusResponse, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(FetchError::EmptyBody);
    }
    Ok(serde_json::from_str(trimmed)?)
}

#[cfg(test)]
mod tests {
    use super::{FetchError, job_status_url, parse_job_status_json};
    use crate::state::JobState;

    #[test]
    fn url_joins_without_double_slash() {
        let url = job_status_url("http://localhost:8000/", "abc").expect("valid");
        assert_eq!(url.as_str(), "http://localhost:8000/job_status/abc");
        let url = job_status_url("http://localhost:8000/app", "abc").expect("valid");
        assert_eq!(url.as_str(), "http://localhost:8000/app/job_status/abc");
    }

    #[test]
    fn url_encodes_job_id_segment() {
        let url = job_status_url("http://localhost", "a/b c").expect("valid");
        assert_eq!(url.as_str(), "http://localhost/job_status/a%2Fb%20c");
    }

    #[test]
    fn url_rejects_garbage_base() {
        assert!(matches!(
            job_status_url("not a url", "x"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn null_body_is_not_running() {
        assert!(matches!(parse_job_status_json("null"), Err(FetchError::EmptyBody)));
        assert!(matches!(parse_job_status_json("  "), Err(FetchError::EmptyBody)));
        assert!(matches!(parse_job_status_json("<html>"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn result_wins_over_invalid_flag() {
        let raw = r#"{"valid_job": false, "status": "x",
            "result": {"league_info": {"name": "L"}, "team_data": []}}"#;
        let state = parse_job_status_json(raw).expect("parses").into_state();
        assert!(matches!(state, JobState::Succeeded(_)));
    }

    #[test]
    fn missing_flags_mean_running() {
        let state = parse_job_status_json(r#"{"status": "queued"}"#)
            .expect("parses")
            .into_state();
        assert_eq!(state, JobState::Running("queued".to_string()));
    }
}
