use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::info;
use vigild::config::{parse_disk_paths, HealthConfig, LogConfig, Thresholds};
use vigild::logging;
use vigild::probes::health::{HealthProbe, SysinfoSource};
use vigild::runner;

#[derive(Parser, Debug)]
#[command(name = "vigil-health")]
#[command(version)]
#[command(about = "Continuous system health monitor")]
struct Cli {
    /// Seconds between check cycles.
    #[arg(long, default_value_t = 60)]
    interval: u64,
    /// Seconds between the two CPU usage samples within a cycle.
    #[arg(long, default_value_t = 0.5)]
    sample_interval: f64,
    /// CPU usage percent above which a warning is raised.
    #[arg(long, default_value_t = 80.0)]
    cpu_threshold: f64,
    /// Memory usage percent above which a warning is raised.
    #[arg(long, default_value_t = 80.0)]
    memory_threshold: f64,
    /// Disk usage percent above which a warning is raised.
    #[arg(long, default_value_t = 90.0)]
    disk_threshold: f64,
    /// Per-process CPU percent above which a process is reported.
    #[arg(long, default_value_t = 20.0)]
    process_cpu_threshold: f64,
    /// Total process count above which a warning is raised.
    #[arg(long, default_value_t = 500)]
    process_count_threshold: usize,
    /// Comma-separated mount points to watch.
    #[arg(long, default_value = "/")]
    disk_paths: String,
    /// Log file path.
    #[arg(long, default_value = "health_monitor.log")]
    log_file: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let sample_interval = match Duration::try_from_secs_f64(cli.sample_interval) {
        Ok(value) => value,
        Err(_) => {
            eprintln!("invalid configuration: sample-interval must be a positive number of seconds");
            process::exit(1);
        }
    };

    let cfg = HealthConfig {
        interval: Duration::from_secs(cli.interval),
        sample_interval,
        thresholds: Thresholds {
            cpu: cli.cpu_threshold,
            memory: cli.memory_threshold,
            disk: cli.disk_threshold,
            process_cpu: cli.process_cpu_threshold,
            process_count: cli.process_count_threshold,
        },
        disk_paths: parse_disk_paths(&cli.disk_paths),
        log: LogConfig::new(cli.log_file),
    };
    if let Err(err) = cfg.validate() {
        eprintln!("{err}");
        process::exit(1);
    }

    if let Err(err) = logging::init(&cfg.log) {
        eprintln!("failed to open log file {}: {err}", cfg.log.path.display());
        process::exit(1);
    }

    info!("Starting system health monitor. Press Ctrl+C to stop.");

    let source = SysinfoSource::new(cfg.sample_interval);
    let probe = HealthProbe::new(source, cfg.disk_paths.clone(), cfg.thresholds.clone());
    runner::run(cfg.interval, probe).await;
}
