//! Transform reporting.

use std::time::Duration;

/// Report from one `tf` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformReport {
    /// Stage key the transform was requested from (None = full chain)
    pub from_key: Option<String>,

    /// Chain index recomputation actually started at
    pub start_index: usize,

    /// Number of stages that ran
    pub stages_run: usize,

    /// Rows entering the first stage that ran
    pub rows_in: usize,

    /// Rows in the published table
    pub rows_out: usize,

    pub duration: Duration,

    /// Revision of the table after this transform
    pub revision: u64,
}

impl TransformReport {
    /// Format as a concise one-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} stages from #{} in {}us, {} -> {} rows, rev={}",
            self.stages_run,
            self.start_index,
            self.duration.as_micros(),
            self.rows_in,
            self.rows_out,
            self.revision,
        )
    }

    /// Format as a one-line log entry.
    ///
    /// Format: `[tf/tfSort]    42us  2 stages  25 -> 10 rows  rev=3`
    pub fn log_line(&self) -> String {
        format!(
            "[tf/{}] {:>5}us  {} stages  {} -> {} rows  rev={}",
            self.from_key.as_deref().unwrap_or("full"),
            self.duration.as_micros(),
            self.stages_run,
            self.rows_in,
            self.rows_out,
            self.revision,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line() {
        let report = TransformReport {
            from_key: Some("tfSort".into()),
            start_index: 1,
            stages_run: 2,
            rows_in: 25,
            rows_out: 10,
            duration: Duration::from_micros(42),
            revision: 3,
        };
        assert_eq!(report.log_line(), "[tf/tfSort]    42us  2 stages  25 -> 10 rows  rev=3");
        assert_eq!(report.summary(), "2 stages from #1 in 42us, 25 -> 10 rows, rev=3");
    }

    #[test]
    fn test_full_chain_label() {
        let report = TransformReport::default();
        assert!(report.log_line().starts_with("[tf/full]"));
    }
}
