use super::types::{
    Config, DispatcherConfig, LifetimeConfig, ReportConfig, ServerConfig, WorkersConfig,
};
use super::ConfigError;

use crate::registry::MilestoneKind;

/// Validation contract implemented by every configuration section.
///
/// The orchestrator runs each registered section once at startup,
/// sequentially, and refuses to serve on the first failure.
pub trait ValidateSection {
    fn section(&self) -> &'static str;
    fn validate(&self) -> Result<(), ConfigError>;
}

fn invalid(section: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        section,
        reason: reason.into(),
    }
}

impl ValidateSection for ServerConfig {
    fn section(&self) -> &'static str {
        "server"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(invalid(self.section(), "port cannot be 0"));
        }
        Ok(())
    }
}

impl ValidateSection for LifetimeConfig {
    fn section(&self) -> &'static str {
        "lifetime"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_update_dwell_secs == 0 {
            return Err(invalid(self.section(), "max_update_dwell_secs cannot be 0"));
        }
        if self.max_run_secs == 0 {
            return Err(invalid(self.section(), "max_run_secs cannot be 0"));
        }
        if self.max_update_dwell_secs > self.max_run_secs {
            return Err(invalid(
                self.section(),
                format!(
                    "max_update_dwell_secs ({}) cannot exceed max_run_secs ({})",
                    self.max_update_dwell_secs, self.max_run_secs
                ),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(invalid(self.section(), "poll_interval_secs cannot be 0"));
        }
        Ok(())
    }
}

impl ValidateSection for DispatcherConfig {
    fn section(&self) -> &'static str {
        "dispatcher"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_depth == 0 {
            return Err(invalid(self.section(), "queue_depth cannot be 0"));
        }
        Ok(())
    }
}

impl ValidateSection for ReportConfig {
    fn section(&self) -> &'static str {
        "report"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(invalid(self.section(), "path cannot be empty"));
        }
        Ok(())
    }
}

impl ValidateSection for WorkersConfig {
    fn section(&self) -> &'static str {
        "workers"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for kind in MilestoneKind::ALL {
            if let Some(worker) = self.command_for(kind) {
                if worker.command.trim().is_empty() {
                    return Err(invalid(
                        self.section(),
                        format!("{} command cannot be empty", kind),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Validate every section, first failure wins.
///
/// The section list is declared statically; adding a config section means
/// adding it here.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let sections: [&dyn ValidateSection; 5] = [
        &config.server,
        &config.lifetime,
        &config.dispatcher,
        &config.report,
        &config.workers,
    ];

    for section in sections {
        section.validate()?;
    }

    Ok(())
}
