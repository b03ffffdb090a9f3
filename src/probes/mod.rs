pub mod health;
pub mod uptime;

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One evaluated reading, ready to become a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub severity: Severity,
    pub message: String,
}

impl Observation {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn emit(&self) {
        match self.severity {
            Severity::Info => info!("{}", self.message),
            Severity::Warning => warn!("{}", self.message),
            Severity::Error => error!("{}", self.message),
        }
    }
}
