//! Core logging types: step entries, status, and the [`Log`] trait.

/// Outcome of one provider step, kept for the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEntry {
    /// Section key of the provider.
    pub name: String,
    /// Final status of the step.
    pub status: StepStatus,
    /// Optional detail (failure reason, number of actions).
    pub message: Option<String>,
}

/// Status of a provider step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Every action of the provider succeeded.
    Ok,
    /// The configuration has no section for this provider.
    NotApplicable,
    /// An action failed and the pipeline halted here.
    Failed,
    /// Skipped because an earlier provider failed.
    NotRun,
}

/// Abstraction over logging backends.
///
/// Providers log through this trait so tests can capture output without a
/// global subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (suppressed on console unless verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Record a provider outcome for the summary.
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>);
}
