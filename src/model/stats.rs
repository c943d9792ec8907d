//! Run-level processing statistics

use serde::Serialize;

/// Counters accumulated by the run driver
///
/// `total_units == successful + failed` holds at all times; `errors` carries
/// one human-readable description per failed unit (plus run-degraded
/// conditions such as a failed category generation).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub total_units: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ProcessingStats {
    pub fn add_success(&mut self) {
        self.total_units += 1;
        self.successful += 1;
    }

    pub fn add_failure(&mut self, message: impl Into<String>) {
        self.total_units += 1;
        self.failed += 1;
        self.errors.push(message.into());
    }

    /// Record a run-degraded condition that is not tied to one unit
    pub fn add_degraded(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Human-readable run summary with an error preview
    pub fn summary(&self) -> String {
        if self.total_units == 0 {
            return "No units processed".to_string();
        }

        let error_rate = self.failed as f64 / self.total_units as f64 * 100.0;
        let mut summary = format!(
            "Processing complete:\n\
             - Total: {} units\n\
             - Successful: {}\n\
             - Failed: {}\n\
             - Error rate: {:.1}%\n",
            self.total_units, self.successful, self.failed, error_rate
        );

        if !self.errors.is_empty() {
            summary.push_str(&format!("\nErrors ({}):\n", self.errors.len()));
            for error in self.errors.iter().take(5) {
                summary.push_str(&format!("  - {}\n", error));
            }
            if self.errors.len() > 5 {
                summary.push_str(&format!(
                    "  ... and {} more errors\n",
                    self.errors.len() - 5
                ));
            }
        }

        summary
    }
}
