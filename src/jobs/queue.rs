//! Named dispatch queues (`default`, `gpu`) with depth/throughput
//! counters.
//!
//! Grounded on `performance::queues::QueueRegistry` — same shape
//! (atomic depth/enqueued/dequeued counters behind a
//! `parking_lot::RwLock<HashMap<name, _>>`, a `snapshot()` for
//! observability) adapted to the two fixed queue names this fabric
//! uses instead of an open-ended signal-pipeline queue set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use serde::Serialize;

use crate::jobs::record::JobKind;

/// The two fixed queue names the job fabric routes work to.
pub const QUEUE_DEFAULT: &str = "default";
pub const QUEUE_GPU: &str = "gpu";

/// A unit of dispatched work: the job id plus enough of the payload
/// for a worker to start processing without a second store round
/// trip.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: String,
    pub kind: JobKind,
}

struct QueueChannel {
    sender: Sender<QueuedJob>,
    receiver: Receiver<QueuedJob>,
    depth: AtomicUsize,
    total_enqueued: AtomicU64,
    total_dequeued: AtomicU64,
}

impl QueueChannel {
    fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            depth: AtomicUsize::new(0),
            total_enqueued: AtomicU64::new(0),
            total_dequeued: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub name: String,
    pub depth: usize,
    pub total_enqueued: u64,
    pub total_dequeued: u64,
}

/// Registry of the fabric's named queues. Created once at process
/// start and shared by dispatchers and workers.
pub struct QueueRegistry {
    queues: RwLock<HashMap<String, QueueChannel>>,
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueRegistry {
    pub fn new() -> Self {
        let mut queues = HashMap::new();
        queues.insert(QUEUE_DEFAULT.to_string(), QueueChannel::new());
        queues.insert(QUEUE_GPU.to_string(), QueueChannel::new());
        Self {
            queues: RwLock::new(queues),
        }
    }

    pub fn enqueue(&self, name: &str, job: QueuedJob) {
        let queues = self.queues.read();
        if let Some(q) = queues.get(name) {
            q.sender.send(job).ok();
            let depth = q.depth.fetch_add(1, Ordering::Relaxed) + 1;
            q.total_enqueued.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("pitchsense_queue_enqueued_total", "queue" => name.to_string()).increment(1);
            metrics::gauge!("pitchsense_queue_depth", "queue" => name.to_string()).set(depth as f64);
        }
    }

    /// Non-blocking pop; `None` if the named queue is empty or
    /// unknown.
    pub fn try_dequeue(&self, name: &str) -> Option<QueuedJob> {
        let queues = self.queues.read();
        let q = queues.get(name)?;
        let job = q.receiver.try_recv().ok()?;
        let depth = q.depth.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        q.total_dequeued.fetch_add(1, Ordering::Relaxed);
        metrics::gauge!("pitchsense_queue_depth", "queue" => name.to_string()).set(depth as f64);
        Some(job)
    }

    pub fn snapshot(&self) -> Vec<QueueSnapshot> {
        self.queues
            .read()
            .iter()
            .map(|(name, q)| QueueSnapshot {
                name: name.clone(),
                depth: q.depth.load(Ordering::Relaxed),
                total_enqueued: q.total_enqueued.load(Ordering::Relaxed),
                total_dequeued: q.total_dequeued.load(Ordering::Relaxed),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_dequeue_round_trip() {
        let reg = QueueRegistry::new();
        reg.enqueue(QUEUE_DEFAULT, QueuedJob { job_id: "j1".into(), kind: JobKind::Ingestion });
        let popped = reg.try_dequeue(QUEUE_DEFAULT).unwrap();
        assert_eq!(popped.job_id, "j1");
        assert!(reg.try_dequeue(QUEUE_DEFAULT).is_none());
    }

    #[test]
    fn video_processing_routes_to_gpu_queue() {
        assert_eq!(JobKind::VideoProcessing.queue_name(), QUEUE_GPU);
        let reg = QueueRegistry::new();
        reg.enqueue(QUEUE_GPU, QueuedJob { job_id: "v1".into(), kind: JobKind::VideoProcessing });
        assert!(reg.try_dequeue(QUEUE_DEFAULT).is_none());
        assert_eq!(reg.try_dequeue(QUEUE_GPU).unwrap().job_id, "v1");
    }

    #[test]
    fn snapshot_reports_depth() {
        let reg = QueueRegistry::new();
        reg.enqueue(QUEUE_DEFAULT, QueuedJob { job_id: "j1".into(), kind: JobKind::Metrics });
        reg.enqueue(QUEUE_DEFAULT, QueuedJob { job_id: "j2".into(), kind: JobKind::Metrics });
        let snap = reg.snapshot();
        let default_q = snap.iter().find(|s| s.name == QUEUE_DEFAULT).unwrap();
        assert_eq!(default_q.depth, 2);
        assert_eq!(default_q.total_enqueued, 2);
    }
}
