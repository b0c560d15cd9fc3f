//! Progress monitor: drives running workers to completion
//!
//! Workers report when their analyzer's stdout closes; exit status is polled
//! with `try_wait` on every wake. The loop wakes on each worker event and at
//! least once per check interval, so a failed analyzer is noticed within one
//! interval even if its pipes stay open.

use std::collections::BTreeMap;
use std::time::Duration;

use crossbeam_channel::{never, select, Receiver};
use log::{debug, warn};

use crate::error::{BatchError, Result};

use super::types::{OutputChunk, WorkerEvent};
use super::worker::Worker;

pub(crate) struct ProgressMonitor {
    check_interval: Duration,
}

impl ProgressMonitor {
    pub fn new(check_interval: Duration) -> Self {
        Self { check_interval }
    }

    /// Block until every worker has finished, or abort all of them on the
    /// first failure. Chunks are returned in completion order.
    pub fn run(
        &self,
        workers: Vec<Worker>,
        events: Receiver<WorkerEvent>,
    ) -> Result<Vec<OutputChunk>> {
        let mut running: BTreeMap<usize, Worker> =
            workers.into_iter().map(|w| (w.worker_id, w)).collect();
        let mut chunks = Vec::with_capacity(running.len());
        let mut events = events;

        while !running.is_empty() {
            let mut events_closed = false;
            let step = select! {
                recv(events) -> msg => match msg {
                    Ok(event) => Self::handle_event(&mut running, event),
                    Err(_) => {
                        events_closed = true;
                        Ok(())
                    }
                },
                default(self.check_interval) => Ok(()),
            };
            if events_closed {
                // Only exit statuses remain; wake on the interval alone
                events = never();
            }

            let step = step.and_then(|_| Self::poll_running(&mut running));
            if let Err(mut err) = step {
                for worker in running.values_mut() {
                    worker.abort();
                }
                // Stderr is read only after every analyzer is stopped
                if let BatchError::WorkerFailure {
                    worker_id, stderr, ..
                } = &mut err
                {
                    if let Some(worker) = running.get(&*worker_id) {
                        *stderr = worker.take_stderr(self.check_interval);
                    }
                }
                warn!(
                    "batch aborted, stopped {} worker(s): {}",
                    running.len(),
                    err
                );
                return Err(err);
            }

            let finished: Vec<usize> = running
                .iter()
                .filter(|(_, w)| w.is_finished())
                .map(|(id, _)| *id)
                .collect();
            for worker_id in finished {
                if let Some(worker) = running.remove(&worker_id) {
                    chunks.push(worker.into_chunk());
                }
            }
            debug!("{} worker(s) still running", running.len());
        }

        Ok(chunks)
    }

    fn handle_event(running: &mut BTreeMap<usize, Worker>, event: WorkerEvent) -> Result<()> {
        match event {
            WorkerEvent::OutputClosed { worker_id, output } => match running.get_mut(&worker_id) {
                Some(worker) => worker.set_output(output),
                None => Ok(()),
            },
        }
    }

    fn poll_running(running: &mut BTreeMap<usize, Worker>) -> Result<()> {
        for worker in running.values_mut() {
            worker.poll_exit()?;
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::parallel::types::{build_records, WorkerTask};
    use crossbeam_channel::unbounded;

    fn spawn(worker_id: usize, script: &str, tx: &crossbeam_channel::Sender<WorkerEvent>) -> Worker {
        let task = WorkerTask {
            worker_id,
            records: build_records(&["x"], None::<&[String]>).unwrap(),
        };
        let args = vec!["-c".to_string(), script.to_string()];
        Worker::spawn(task, "sh", &args, tx.clone()).unwrap()
    }

    #[test]
    fn test_monitor_collects_all_workers() {
        let (tx, rx) = unbounded();
        let workers = vec![spawn(0, "cat", &tx), spawn(1, "sleep 0.1; cat", &tx)];
        drop(tx);

        let monitor = ProgressMonitor::new(Duration::from_millis(20));
        let mut chunks = monitor.run(workers, rx).unwrap();
        chunks.sort_by_key(|c| c.worker_id);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.bytes == b"x\n"));
    }

    #[test]
    fn test_monitor_aborts_on_first_failure() {
        let (tx, rx) = unbounded();
        let workers = vec![spawn(0, "cat >/dev/null; exit 2", &tx), spawn(1, "sleep 30", &tx)];
        drop(tx);

        let monitor = ProgressMonitor::new(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let err = monitor.run(workers, rx).unwrap_err();
        assert!(matches!(err, BatchError::WorkerFailure { worker_id: 0, .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_failure_with_stderr_held_open_does_not_stall() {
        let (tx, rx) = unbounded();
        // The background sleep inherits stderr and outlives the analyzer
        let script = "cat >/dev/null; echo oops >&2; sleep 5 </dev/null >/dev/null & exit 2";
        let workers = vec![spawn(0, script, &tx), spawn(1, "sleep 30", &tx)];
        drop(tx);

        let monitor = ProgressMonitor::new(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let err = monitor.run(workers, rx).unwrap_err();
        assert!(matches!(err, BatchError::WorkerFailure { worker_id: 0, .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_failure_carries_stderr() {
        let (tx, rx) = unbounded();
        let workers = vec![spawn(0, "cat >/dev/null; echo 'no dictionary' >&2; exit 4", &tx)];
        drop(tx);

        let monitor = ProgressMonitor::new(Duration::from_millis(200));
        match monitor.run(workers, rx) {
            Err(BatchError::WorkerFailure { stderr, .. }) => {
                assert!(stderr.contains("no dictionary"))
            }
            other => panic!("expected worker failure, got {:?}", other.map(|c| c.len())),
        }
    }
}
