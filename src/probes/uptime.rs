use crate::config::ConfigError;
use crate::probes::Observation;
use crate::runner::{Probe, ProbeError};
use reqwest::Client;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Responded { status: u16, elapsed: Duration },
    NoResponse { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Up { status: u16 },
    Down { status: u16 },
    NoResponse,
}

pub fn classify(outcome: &ProbeOutcome) -> AppStatus {
    match outcome {
        ProbeOutcome::Responded { status, .. } if (200..=299).contains(status) => {
            AppStatus::Up { status: *status }
        }
        ProbeOutcome::Responded { status, .. } => AppStatus::Down { status: *status },
        ProbeOutcome::NoResponse { .. } => AppStatus::NoResponse,
    }
}

pub fn status_line(url: &str, status: AppStatus) -> Observation {
    match status {
        AppStatus::Up { status } => {
            Observation::info(format!("Application {url} is UP (HTTP {status})"))
        }
        AppStatus::Down { status } => {
            Observation::warning(format!("Application {url} is DOWN (HTTP {status})"))
        }
        AppStatus::NoResponse => {
            Observation::warning(format!("Application {url} is DOWN (No response)"))
        }
    }
}

/// Reads the target list: one URL per line, blank lines and `#` comments
/// skipped.
pub fn load_targets(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_targets(&text))
}

pub fn parse_targets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[allow(async_fn_in_trait)]
pub trait HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

pub struct ReqwestProber {
    client: Client,
    timeout: Duration,
}

impl ReqwestProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent("vigild/0.1.0").build()?;
        Ok(Self { client, timeout })
    }
}

impl HttpProber for ReqwestProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();
        match self.client.get(url).timeout(self.timeout).send().await {
            Ok(response) => ProbeOutcome::Responded {
                status: response.status().as_u16(),
                elapsed: start.elapsed(),
            },
            Err(err) => ProbeOutcome::NoResponse {
                reason: err.to_string(),
            },
        }
    }
}

pub struct UptimeProbe<P> {
    prober: P,
    targets: Vec<String>,
}

impl<P: HttpProber> UptimeProbe<P> {
    pub fn new(prober: P, targets: Vec<String>) -> Self {
        Self { prober, targets }
    }

    async fn check_all(&self) -> Vec<Observation> {
        let mut out = Vec::with_capacity(self.targets.len());
        for url in &self.targets {
            let outcome = self.prober.probe(url).await;
            match &outcome {
                ProbeOutcome::Responded { status, elapsed } => {
                    debug!(
                        url = %url,
                        status = *status as u64,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "request completed"
                    );
                }
                ProbeOutcome::NoResponse { reason } => {
                    debug!(url = %url, reason = %reason, "request failed");
                }
            }
            out.push(status_line(url, classify(&outcome)));
        }
        out
    }
}

impl<P: HttpProber> Probe for UptimeProbe<P> {
    async fn tick(&mut self) -> Result<(), ProbeError> {
        for observation in self.check_all().await {
            observation.emit();
        }
        Ok(())
    }
}
