use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// One monitoring target: a single `tick` samples, evaluates and logs.
#[allow(async_fn_in_trait)]
pub trait Probe {
    async fn tick(&mut self) -> Result<(), ProbeError>;
}

/// Drives `probe` once per `interval` until Ctrl+C arrives. A failed tick is
/// logged and the next tick runs as scheduled; only the interrupt stops the
/// loop.
pub async fn run<P: Probe>(interval: Duration, mut probe: P) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(err) = result {
                    error!("Failed to listen for the interrupt signal: {err}");
                }
                info!("Monitoring stopped by user.");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = probe.tick().await {
                    error!("Check cycle failed: {err}");
                }
            }
        }
    }
}
