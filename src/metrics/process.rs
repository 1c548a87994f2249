//! Process table snapshots.

use crate::metrics::collector::SampleCollector;
use crate::metrics::data::{Domain, ProcessRecord};
use crate::metrics::traits::ProcessProvider;
use crate::metrics::view::DashboardView;
use tracing::debug;

/// Holds the most recent full process listing.
///
/// Every successful tick replaces the whole list; there is no merge with the
/// previous one. A failed enumeration keeps the last list.
pub struct ProcessSnapshotter {
    provider: Box<dyn ProcessProvider>,
    processes: Vec<ProcessRecord>,
    taken_at: Option<f64>,
}

impl ProcessSnapshotter {
    pub fn new(provider: Box<dyn ProcessProvider>) -> Self {
        Self {
            provider,
            processes: Vec::new(),
            taken_at: None,
        }
    }

    pub fn processes(&self) -> &[ProcessRecord] {
        &self.processes
    }

    /// Elapsed time of the current listing, `None` before the first one.
    pub fn taken_at(&self) -> Option<f64> {
        self.taken_at
    }
}

impl SampleCollector for ProcessSnapshotter {
    fn domain(&self) -> Domain {
        Domain::Processes
    }

    fn tick(&mut self, now: f64) {
        match self.provider.processes() {
            Ok(processes) => {
                self.processes = processes;
                self.taken_at = Some(now);
            }
            Err(err) => debug!("Keeping previous process list: {}", err),
        }
    }

    fn publish(&self, view: &mut DashboardView) {
        view.processes = Some(self.processes.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, TelemetryError};
    use std::collections::VecDeque;

    fn record(pid: u32) -> ProcessRecord {
        ProcessRecord {
            pid,
            name: format!("proc-{}", pid),
            cpu_percent: 0.5,
            memory_percent: 1.0,
            threads: Some(1),
        }
    }

    struct ScriptedTable(VecDeque<Result<Vec<ProcessRecord>>>);

    impl ProcessProvider for ScriptedTable {
        fn processes(&mut self) -> Result<Vec<ProcessRecord>> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(TelemetryError::provider_error("script exhausted")))
        }
    }

    #[test]
    fn test_snapshot_is_replaced_not_merged() {
        let script = VecDeque::from(vec![
            Ok((1..=5).map(record).collect()),
            Ok(vec![record(1), record(3), record(5)]),
        ]);
        let mut snapshotter = ProcessSnapshotter::new(Box::new(ScriptedTable(script)));

        snapshotter.tick(0.0);
        assert_eq!(snapshotter.processes().len(), 5);

        snapshotter.tick(3.0);
        let pids: Vec<u32> = snapshotter.processes().iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 3, 5]);
        assert_eq!(snapshotter.taken_at(), Some(3.0));
    }

    #[test]
    fn test_failed_enumeration_keeps_previous_list() {
        let script = VecDeque::from(vec![
            Ok(vec![record(7)]),
            Err(TelemetryError::provider_error("enumeration failed")),
        ]);
        let mut snapshotter = ProcessSnapshotter::new(Box::new(ScriptedTable(script)));
        snapshotter.tick(0.0);
        snapshotter.tick(3.0);

        assert_eq!(snapshotter.processes(), &[record(7)]);
        assert_eq!(snapshotter.taken_at(), Some(0.0));
    }
}
