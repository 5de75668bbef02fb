use analysis_core::{InvestmentStrategy, ProgressReporter, TaskStatus};

/// Discards every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _task: InvestmentStrategy, _status: TaskStatus, _message: &str) {}
}
