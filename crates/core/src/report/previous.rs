//! Access to the previous run's report.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

/// Loads the prior run's report file so workers can pick up where the
/// last run left off (e.g. outstanding items recorded in their payload).
///
/// Tolerant by design: a missing or corrupt file yields nothing rather
/// than an error, since a first run has no report to read.
#[derive(Debug, Default)]
pub struct PreviousReportProvider {
    report: Option<Value>,
}

impl PreviousReportProvider {
    pub fn load(path: &Path) -> Self {
        let report = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Previous report at {:?} is not valid JSON: {}", path, e);
                    None
                }
            },
            Err(_) => {
                debug!("No previous report at {:?}", path);
                None
            }
        };
        Self { report }
    }

    pub fn report(&self) -> Option<&Value> {
        self.report.as_ref()
    }

    pub fn into_report(self) -> Option<Value> {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_yields_none() {
        let provider = PreviousReportProvider::load(Path::new("/nonexistent/report.json"));
        assert!(provider.report().is_none());
    }

    #[test]
    fn test_corrupt_file_yields_none() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let provider = PreviousReportProvider::load(file.path());
        assert!(provider.report().is_none());
    }

    #[test]
    fn test_valid_report_loads() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pipeline_report": {{"status": "Last Run 2024-01-01T00:00:00Z"}}}}"#
        )
        .unwrap();
        let provider = PreviousReportProvider::load(file.path());
        let report = provider.report().unwrap();
        assert_eq!(
            report["pipeline_report"]["status"],
            "Last Run 2024-01-01T00:00:00Z"
        );
    }
}
