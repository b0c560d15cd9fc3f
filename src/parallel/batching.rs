//! Splitter: partitions globally ordered records into per-worker task lists

use std::ops::Range;

use crate::config::PartitionStrategy;

use super::types::{InputRecord, WorkerTask};

/// Split `0..len` into `parts` contiguous ranges whose sizes differ by at
/// most one. The first `len % parts` ranges take the extra item.
pub(crate) fn contiguous_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let base = len / parts;
    let remainder = len % parts;

    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for idx in 0..parts {
        let size = base + usize::from(idx < remainder);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Partition `records` into exactly `num_workers` task lists.
///
/// Every record lands in exactly one task and keeps its relative order
/// inside that task. Tasks may be empty when there are fewer records than
/// workers.
pub fn split_records(
    records: Vec<InputRecord>,
    num_workers: usize,
    strategy: PartitionStrategy,
) -> Vec<WorkerTask> {
    let num_workers = num_workers.max(1);
    let mut tasks: Vec<WorkerTask> = (0..num_workers)
        .map(|worker_id| WorkerTask {
            worker_id,
            records: Vec::new(),
        })
        .collect();

    match strategy {
        PartitionStrategy::Contiguous => {
            let ranges = contiguous_ranges(records.len(), num_workers);
            let mut remaining = records.into_iter();
            for (task, range) in tasks.iter_mut().zip(ranges) {
                task.records.extend(remaining.by_ref().take(range.len()));
            }
        }
        PartitionStrategy::RoundRobin => {
            for (idx, record) in records.into_iter().enumerate() {
                tasks[idx % num_workers].records.push(record);
            }
        }
    }

    tasks
}
