use crate::shared_data::{Approach, QueueSnapshot};

/// Read side of the vehicle simulation, as seen by the controller.
///
/// Counts are signed so that a misbehaving source can be detected; a
/// negative reading is treated as zero for that decision.
pub trait RoadQueue: Send + Sync {
    fn queue_length(&self, approach: Approach) -> i64;
}

/// A fixed snapshot works as its own queue source.
impl RoadQueue for QueueSnapshot {
    fn queue_length(&self, approach: Approach) -> i64 {
        i64::from(self.get(approach))
    }
}

/// Reads each approach once. Approaches are read independently; no
/// cross-approach consistency is needed.
pub fn sample_queues(queues: &dyn RoadQueue) -> QueueSnapshot {
    let mut snapshot = QueueSnapshot::default();
    for approach in Approach::ALL {
        let raw = queues.queue_length(approach);
        let count = if raw < 0 {
            log::warn!(
                "Ignoring negative queue length {} on {}; using 0 for this cycle",
                raw,
                approach
            );
            0
        } else {
            u32::try_from(raw).unwrap_or(u32::MAX)
        };
        snapshot.set(approach, count);
    }
    log::debug!("Sampled queues: {:?}", snapshot);
    snapshot
}
