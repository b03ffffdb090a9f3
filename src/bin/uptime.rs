use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{error, info, warn};
use vigild::config::{LogConfig, UptimeConfig};
use vigild::logging;
use vigild::probes::uptime::{load_targets, ReqwestProber, UptimeProbe};
use vigild::runner;

#[derive(Parser, Debug)]
#[command(name = "vigil-uptime")]
#[command(version)]
#[command(about = "HTTP application uptime monitor")]
struct Cli {
    /// File listing one URL per line; `#` starts a comment.
    #[arg(long, default_value = "targets.txt")]
    config: PathBuf,
    /// Seconds between check cycles.
    #[arg(long, default_value_t = 60)]
    interval: u64,
    /// Seconds before an unanswered request counts as no response.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
    /// Log file path.
    #[arg(long, default_value = "uptime_monitor.log")]
    logfile: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let cfg = UptimeConfig {
        targets_file: cli.config,
        interval: Duration::from_secs(cli.interval),
        timeout: Duration::from_secs(cli.timeout),
        log: LogConfig::new(cli.logfile),
    };
    if let Err(err) = cfg.validate() {
        eprintln!("{err}");
        process::exit(1);
    }

    if let Err(err) = logging::init(&cfg.log) {
        eprintln!("failed to open log file {}: {err}", cfg.log.path.display());
        process::exit(1);
    }

    let targets = match load_targets(&cfg.targets_file) {
        Ok(targets) => targets,
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    };

    info!("Starting application uptime monitor. Press Ctrl+C to stop.");
    if targets.is_empty() {
        warn!(
            "No URLs configured in {}; nothing to check.",
            cfg.targets_file.display()
        );
    }

    let prober = match ReqwestProber::new(cfg.timeout) {
        Ok(prober) => prober,
        Err(err) => {
            error!("failed to build the HTTP client: {err}");
            process::exit(1);
        }
    };
    runner::run(cfg.interval, UptimeProbe::new(prober, targets)).await;
}
