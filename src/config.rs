use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_LOG_BACKUP_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub interval: Duration,
    pub sample_interval: Duration,
    pub thresholds: Thresholds,
    pub disk_paths: Vec<PathBuf>,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct UptimeConfig {
    pub targets_file: PathBuf,
    pub interval: Duration,
    pub timeout: Duration,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct Thresholds {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
    pub process_cpu: f64,
    pub process_count: usize,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub path: PathBuf,
    pub max_bytes: u64,
    pub backup_count: usize,
}

impl LogConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_LOG_MAX_BYTES,
            backup_count: DEFAULT_LOG_BACKUP_COUNT,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl HealthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval < Duration::from_secs(1) {
            return Err(ConfigError::Validation(
                "interval must be at least 1 second".to_string(),
            ));
        }
        if self.sample_interval.is_zero() {
            return Err(ConfigError::Validation(
                "sample-interval must be greater than zero".to_string(),
            ));
        }
        validate_percent("cpu-threshold", self.thresholds.cpu)?;
        validate_percent("memory-threshold", self.thresholds.memory)?;
        validate_percent("disk-threshold", self.thresholds.disk)?;
        validate_percent("process-cpu-threshold", self.thresholds.process_cpu)?;
        if self.disk_paths.is_empty() {
            return Err(ConfigError::Validation(
                "at least one disk path is required".to_string(),
            ));
        }
        self.log.validate()?;
        Ok(())
    }
}

impl UptimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval < Duration::from_secs(1) {
            return Err(ConfigError::Validation(
                "interval must be at least 1 second".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "timeout must be greater than zero".to_string(),
            ));
        }
        self.log.validate()?;
        Ok(())
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "log rotation size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_percent(flag: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{flag} must be within 0..100"
        )));
    }
    Ok(())
}

pub fn parse_disk_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_health_config() -> HealthConfig {
        HealthConfig {
            interval: Duration::from_secs(60),
            sample_interval: Duration::from_millis(500),
            thresholds: Thresholds {
                cpu: 80.0,
                memory: 80.0,
                disk: 90.0,
                process_cpu: 20.0,
                process_count: 500,
            },
            disk_paths: vec![PathBuf::from("/")],
            log: LogConfig::new("health_monitor.log"),
        }
    }

    fn valid_uptime_config() -> UptimeConfig {
        UptimeConfig {
            targets_file: PathBuf::from("targets.txt"),
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
            log: LogConfig::new("uptime_monitor.log"),
        }
    }

    #[test]
    fn health_defaults_pass_validation() {
        valid_health_config().validate().expect("default config");
    }

    #[test]
    fn rejects_sub_second_interval() {
        let mut cfg = valid_health_config();
        cfg.interval = Duration::from_millis(300);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_threshold_above_hundred() {
        let mut cfg = valid_health_config();
        cfg.thresholds.disk = 120.0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("disk-threshold"));
    }

    #[test]
    fn rejects_negative_threshold() {
        let mut cfg = valid_health_config();
        cfg.thresholds.cpu = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_disk_paths() {
        let mut cfg = valid_health_config();
        cfg.disk_paths.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_rotation_limit() {
        let mut cfg = valid_health_config();
        cfg.log.max_bytes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn uptime_defaults_pass_validation() {
        valid_uptime_config().validate().expect("default config");
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut cfg = valid_uptime_config();
        cfg.timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn splits_disk_paths_on_commas() {
        let paths = parse_disk_paths("/, /home ,/var/log");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/"),
                PathBuf::from("/home"),
                PathBuf::from("/var/log"),
            ]
        );
    }

    #[test]
    fn ignores_empty_disk_path_entries() {
        assert_eq!(parse_disk_paths(",, /data ,"), vec![PathBuf::from("/data")]);
    }
}
