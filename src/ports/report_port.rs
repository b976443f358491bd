//! Report output port trait.

use crate::domain::comparison::RunComparison;
use crate::domain::error::SignalTraderError;
use crate::domain::report::BacktestReport;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, report: &BacktestReport, output_path: &str) -> Result<(), SignalTraderError>;

    fn write_comparison(
        &self,
        comparison: &RunComparison,
        output_path: &str,
    ) -> Result<(), SignalTraderError>;
}
