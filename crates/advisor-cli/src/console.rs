use analysis_core::{InvestmentStrategy, ProgressReporter, TaskStatus};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Progress lines on stderr so stdout stays clean JSON.
#[derive(Default)]
pub struct ConsoleReporter {
    last_status: Mutex<BTreeMap<&'static str, TaskStatus>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks whose latest update was an error
    pub fn failed_tasks(&self) -> Vec<&'static str> {
        match self.last_status.lock() {
            Ok(statuses) => statuses
                .iter()
                .filter(|(_, status)| **status == TaskStatus::Error)
                .map(|(task, _)| *task)
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

pub fn format_line(task: InvestmentStrategy, status: TaskStatus, message: &str) -> String {
    format!(
        "{} {} ({}) {}",
        status.icon(),
        task.localized(),
        task.english(),
        message
    )
}

impl ProgressReporter for ConsoleReporter {
    fn report(&self, task: InvestmentStrategy, status: TaskStatus, message: &str) {
        if let Ok(mut statuses) = self.last_status.lock() {
            statuses.insert(task.key(), status);
        }
        eprintln!("{}", format_line(task, status, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let line = format_line(InvestmentStrategy::BenGraham, TaskStatus::Done, "bullish");
        assert_eq!(line, "✓ 本·格雷厄姆策略 (Ben Graham) bullish");
    }

    #[test]
    fn test_failed_tasks_track_latest_status() {
        let reporter = ConsoleReporter::new();
        reporter.report(InvestmentStrategy::PrepareData, TaskStatus::Error, "boom");
        reporter.report(InvestmentStrategy::RiskManagement, TaskStatus::Error, "no prices");
        reporter.report(InvestmentStrategy::PrepareData, TaskStatus::Done, "retry ok");
        assert_eq!(reporter.failed_tasks(), vec!["risk_management"]);
    }
}
