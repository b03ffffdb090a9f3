use crate::config::Thresholds;
use crate::probes::{Observation, Severity};
use crate::runner::{Probe, ProbeError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{CpuExt, DiskExt, PidExt, ProcessExt, System, SystemExt};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no mounted filesystem contains {}", .0.display())]
    Unmounted(PathBuf),
}

#[derive(Debug)]
pub struct MetricsSample {
    pub cpu_percent: Result<f64, MetricsError>,
    pub memory_percent: Result<f64, MetricsError>,
    pub disks: Vec<DiskSample>,
    pub process_count: Result<usize, MetricsError>,
    pub processes: Vec<ProcessSample>,
}

#[derive(Debug)]
pub struct DiskSample {
    pub path: PathBuf,
    pub used_percent: Result<f64, MetricsError>,
}

#[derive(Debug, Clone)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

#[allow(async_fn_in_trait)]
pub trait MetricsSource {
    async fn sample(&mut self, disk_paths: &[PathBuf]) -> MetricsSample;
}

pub struct SysinfoSource {
    system: System,
    sample_interval: Duration,
}

impl SysinfoSource {
    pub fn new(sample_interval: Duration) -> Self {
        Self {
            system: System::new_all(),
            sample_interval,
        }
    }

    fn disk_used_percent(&self, path: &Path) -> Result<f64, MetricsError> {
        let resolved = path.canonicalize()?;
        let disk = self
            .system
            .disks()
            .iter()
            .filter(|d| resolved.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .ok_or_else(|| MetricsError::Unmounted(path.to_path_buf()))?;

        let total = disk.total_space();
        if total == 0 {
            return Ok(0.0);
        }
        let used = total.saturating_sub(disk.available_space());
        Ok((used as f64 / total as f64) * 100.0)
    }
}

impl MetricsSource for SysinfoSource {
    async fn sample(&mut self, disk_paths: &[PathBuf]) -> MetricsSample {
        // CPU counters are deltas since the previous refresh, so prime them,
        // wait out the sampling window, then read.
        self.system.refresh_cpu();
        self.system.refresh_processes();
        tokio::time::sleep(self.sample_interval).await;
        self.system.refresh_cpu();
        self.system.refresh_processes();
        self.system.refresh_memory();
        self.system.refresh_disks_list();
        self.system.refresh_disks();

        let cpus = self.system.cpus();
        let cpu_percent = if cpus.is_empty() {
            Ok(0.0)
        } else {
            let sum: f32 = cpus.iter().map(|c| c.cpu_usage()).sum();
            Ok((sum / cpus.len() as f32) as f64)
        };

        let total_memory = self.system.total_memory();
        let memory_percent = if total_memory > 0 {
            Ok((self.system.used_memory() as f64 / total_memory as f64) * 100.0)
        } else {
            Ok(0.0)
        };

        let disks = disk_paths
            .iter()
            .map(|path| DiskSample {
                path: path.clone(),
                used_percent: self.disk_used_percent(path),
            })
            .collect();

        let processes = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessSample {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                cpu_percent: process.cpu_usage() as f64,
                memory_percent: if total_memory > 0 {
                    (process.memory() as f64 / total_memory as f64) * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        MetricsSample {
            cpu_percent,
            memory_percent,
            disks,
            process_count: Ok(self.system.processes().len()),
            processes,
        }
    }
}

pub fn evaluate(sample: &MetricsSample, thresholds: &Thresholds) -> Vec<Observation> {
    let mut out = Vec::new();

    match &sample.cpu_percent {
        Ok(value) if *value > thresholds.cpu => out.push(Observation::warning(format!(
            "High CPU usage: {value:.1}% (Threshold: {}%)",
            thresholds.cpu
        ))),
        Ok(value) => out.push(Observation::info(format!("CPU usage: {value:.1}%"))),
        Err(err) => out.push(Observation::error(format!("Failed to read CPU usage: {err}"))),
    }

    match &sample.memory_percent {
        Ok(value) if *value > thresholds.memory => out.push(Observation::warning(format!(
            "High memory usage: {value:.1}% (Threshold: {}%)",
            thresholds.memory
        ))),
        Ok(value) => out.push(Observation::info(format!("Memory usage: {value:.1}%"))),
        Err(err) => out.push(Observation::error(format!(
            "Failed to read memory usage: {err}"
        ))),
    }

    for disk in &sample.disks {
        let path = disk.path.display();
        match &disk.used_percent {
            Ok(value) if *value > thresholds.disk => out.push(Observation::warning(format!(
                "High disk usage on {path}: {value:.1}% (Threshold: {}%)",
                thresholds.disk
            ))),
            Ok(value) => out.push(Observation::info(format!(
                "Disk usage on {path}: {value:.1}%"
            ))),
            Err(err) => out.push(Observation::error(format!(
                "Error checking disk {path}: {err}"
            ))),
        }
    }

    match &sample.process_count {
        Ok(count) if *count > thresholds.process_count => {
            out.push(Observation::warning(format!(
                "High number of processes: {count} (Threshold: {})",
                thresholds.process_count
            )))
        }
        Ok(count) => out.push(Observation::info(format!("Total processes: {count}"))),
        Err(err) => out.push(Observation::error(format!(
            "Failed to count processes: {err}"
        ))),
    }

    let mut hot: Vec<&ProcessSample> = sample
        .processes
        .iter()
        .filter(|p| p.cpu_percent > thresholds.process_cpu)
        .collect();
    hot.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));

    if hot.is_empty() {
        out.push(Observation::info("No high CPU processes detected"));
    } else {
        out.push(Observation::warning("High CPU processes detected:"));
        for process in hot {
            out.push(Observation::warning(format!(
                " -PID: {}, Name: {}, CPU%: {:.1}%, MEM: {:.1}%",
                process.pid, process.name, process.cpu_percent, process.memory_percent
            )));
        }
    }

    out
}

pub struct HealthProbe<M> {
    source: M,
    disk_paths: Vec<PathBuf>,
    thresholds: Thresholds,
}

impl<M: MetricsSource> HealthProbe<M> {
    pub fn new(source: M, disk_paths: Vec<PathBuf>, thresholds: Thresholds) -> Self {
        Self {
            source,
            disk_paths,
            thresholds,
        }
    }
}

impl<M: MetricsSource> Probe for HealthProbe<M> {
    async fn tick(&mut self) -> Result<(), ProbeError> {
        info!("-----New health check cycle-----");

        let sample = self.source.sample(&self.disk_paths).await;
        let observations = evaluate(&sample, &self.thresholds);

        let mut alerts = false;
        for observation in &observations {
            observation.emit();
            if observation.severity == Severity::Warning {
                alerts = true;
            }
        }

        if alerts {
            warn!("One or more alerts raised this cycle.");
        } else {
            info!("All checks OK this cycle.");
        }
        info!("---- Cycle completed ----");

        Ok(())
    }
}
