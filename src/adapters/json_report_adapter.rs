//! JSON report adapter implementing ReportPort.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::comparison::RunComparison;
use crate::domain::error::SignalTraderError;
use crate::domain::report::BacktestReport;
use crate::ports::report_port::ReportPort;

/// Writes pretty-printed JSON. Parent directories are created as needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        JsonReportAdapter
    }

    fn write_json<T: Serialize>(&self, value: &T, output_path: &str) -> Result<(), SignalTraderError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        tracing::info!(path = output_path, "Report written");
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, report: &BacktestReport, output_path: &str) -> Result<(), SignalTraderError> {
        self.write_json(report, output_path)
    }

    fn write_comparison(
        &self,
        comparison: &RunComparison,
        output_path: &str,
    ) -> Result<(), SignalTraderError> {
        self.write_json(comparison, output_path)
    }
}
