use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::config::Cli;
use crate::state::LeagueResult;

/// What the host hands over at startup: the job to follow plus whatever the
/// backend already knew about it when the page was served.
#[derive(Debug, Clone, Deserialize)]
pub struct PageContext {
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: Option<LeagueResult>,
}

impl PageContext {
    pub fn for_job(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: "Submitted".to_string(),
            result: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading context {}", path.display()))?;
        parse_page_context(&raw)
    }

    pub fn resolve(cli: &Cli) -> Result<Self> {
        let mut context = match (&cli.context, &cli.job_id) {
            (Some(path), _) => Self::load(path)?,
            (None, Some(job_id)) => Self::for_job(job_id.clone()),
            (None, None) => bail!("a job id or --context file is required"),
        };
        if let Some(job_id) = &cli.job_id {
            context.job_id = job_id.clone();
        }
        if context.job_id.trim().is_empty() {
            bail!("job id is empty");
        }
        Ok(context)
    }
}

pub fn parse_page_context(raw: &str) -> Result<PageContext> {
    serde_json::from_str(raw.trim()).context("invalid page context json")
}

#[cfg(test)]
mod tests {
    use super::{PageContext, parse_page_context};
    use crate::config::Cli;

    #[test]
    fn bare_job_id_starts_without_result() {
        let cli = Cli {
            job_id: Some("abc".to_string()),
            ..Cli::default()
        };
        let ctx = PageContext::resolve(&cli).expect("resolves");
        assert_eq!(ctx.job_id, "abc");
        assert_eq!(ctx.status, "Submitted");
        assert!(ctx.result.is_none());
    }

    #[test]
    fn missing_job_id_is_an_error() {
        assert!(PageContext::resolve(&Cli::default()).is_err());
    }

    #[test]
    fn status_defaults_to_empty() {
        let ctx = parse_page_context(r#"{"job_id":"x"}"#).expect("parses");
        assert_eq!(ctx.status, "");
        assert!(ctx.result.is_none());
    }
}
