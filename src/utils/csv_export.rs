use std::error::Error;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::core::search::StepRecord;
use crate::models::outcome::SearchOutcome;
use crate::utils::logging::{self, FileIOType, OperationCategory};

/// Writes the batch report and per-substation step traces into a
/// timestamped directory under the configured output root.
pub struct ReportExporter {
    output_dir: PathBuf,
    timestamp: String,
    verbose_logging: bool,
}

impl ReportExporter {
    pub fn new(output_dir: impl AsRef<Path>, verbose_logging: bool) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let full_path = Path::new(output_dir.as_ref()).join(&timestamp);
        std::fs::create_dir_all(&full_path)?;

        Ok(Self {
            output_dir: full_path,
            timestamp,
            verbose_logging,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export the batch report table, one row per substation in supply order.
    pub fn export_capacity_report(
        &self,
        outcomes: &[SearchOutcome],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let _timing = logging::start_timing(
            "export_capacity_report",
            OperationCategory::FileIO { subcategory: FileIOType::ResultsSave },
        );

        let report_path = self.output_dir.join("capacity_report.csv");
        let mut report_file = File::create(&report_path)?;

        writeln!(report_file, "Capacity Report")?;
        writeln!(report_file, "Timestamp,{}", self.timestamp)?;
        writeln!(report_file)?;
        writeln!(
            report_file,
            "Substation,Maximum Power (MW),Critical Line,Maximum Loading (%),Status"
        )?;

        for outcome in outcomes {
            let power = outcome
                .max_power_mw()
                .map(|p| format!("{:.0}", p))
                .unwrap_or_default();
            let line = outcome.critical_line().unwrap_or("");
            let loading = outcome
                .max_loading_pct()
                .map(|l| format!("{:.2}", l))
                .unwrap_or_default();
            writeln!(
                report_file,
                "{},{},{},{},{}",
                outcome.substation,
                power,
                line,
                loading,
                outcome.status_label()
            )?;
        }

        if self.verbose_logging {
            println!(
                "Exported capacity report for {} substations to: {}",
                outcomes.len(),
                report_path.display()
            );
        }

        Ok(())
    }

    /// Export the iteration-by-iteration trace of one substation's search.
    pub fn export_step_trace(
        &self,
        substation: &str,
        steps: &[StepRecord],
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        if steps.is_empty() {
            return Ok(());
        }

        let _timing = logging::start_timing(
            "export_step_trace",
            OperationCategory::FileIO { subcategory: FileIOType::ResultsSave },
        );

        // Substation names can carry spaces and slashes; keep the file name tame.
        let safe_name: String = substation
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let trace_path = self.output_dir.join(format!("step_trace_{}.csv", safe_name));
        let mut trace_file = File::create(&trace_path)?;

        writeln!(
            trace_file,
            "Iteration,Power (MW),Max Loading (%),Critical Line,Backoff Retry"
        )?;
        for record in steps {
            writeln!(
                trace_file,
                "{},{:.0},{:.2},{},{}",
                record.iteration,
                record.power_mw,
                record.max_loading_pct,
                record.critical_line,
                record.backoff
            )?;
        }

        if self.verbose_logging {
            println!(
                "Exported {} search steps for '{}' to: {}",
                steps.len(),
                substation,
                trace_path.display()
            );
        }

        Ok(())
    }
}
