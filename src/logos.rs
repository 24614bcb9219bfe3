use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, bail};
use reqwest::Url;
use tracing::debug;

use crate::http_client::http_client;
use crate::state::{AppState, Delta, apply_delta};

pub trait LogoLoader: Send + Sync + 'static {
    fn load(&self, src: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpLogoLoader {
    base_url: String,
}

impl HttpLogoLoader {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl LogoLoader for HttpLogoLoader {
    fn load(&self, src: &str) -> Result<()> {
        let url = resolve_logo_url(&self.base_url, src)?;
        let client = http_client()?;
        let resp = client.get(url).send().context("logo request failed")?;
        if !resp.status().is_success() {
            bail!("http {}", resp.status());
        }
        Ok(())
    }
}

/// Relative sources resolve against the backend, like an `<img src>` would.
pub fn resolve_logo_url(base_url: &str, src: &str) -> Result<Url> {
    let src = src.trim();
    if src.is_empty() {
        bail!("empty logo url");
    }
    let base = Url::parse(base_url.trim()).context("invalid base url")?;
    base.join(src)
        .with_context(|| format!("invalid logo url {src}"))
}

/// Probes each row's logo once, each on its own thread, so a slow image does
/// not hold back the others. The default image is never probed, so a broken
/// default does not loop.
pub fn spawn_logo_probes<L: LogoLoader>(
    loader: L,
    logos: Vec<(usize, String)>,
    tx: Sender<Delta>,
) -> Vec<JoinHandle<()>> {
    let loader = Arc::new(loader);
    logos
        .into_iter()
        .map(|(row, src)| {
            let loader = Arc::clone(&loader);
            let tx = tx.clone();
            thread::spawn(move || {
                let delta = match loader.load(&src) {
                    Ok(()) => Delta::LogoLoaded { row },
                    Err(err) => {
                        debug!(row, src = %src, error = %err, "logo unavailable, using default");
                        Delta::LogoFailed { row }
                    }
                };
                let _ = tx.send(delta);
            })
        })
        .collect()
}

/// Probes every pending logo and applies the outcomes before returning.
/// Used when the table is printed once instead of drawn.
pub fn settle_logos<L: LogoLoader>(loader: L, state: &mut AppState) {
    let pending = state.table.pending_logos();
    if pending.is_empty() {
        return;
    }
    let (tx, rx) = mpsc::channel();
    spawn_logo_probes(loader, pending, tx);
    for delta in rx {
        apply_delta(state, delta);
    }
}
