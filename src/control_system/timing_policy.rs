use crate::control_system::config::SignalTimings;
use crate::shared_data::{EmergencyRequest, QueueSnapshot, RoadPair};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one scheduling decision: which pair goes green and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub pair: RoadPair,
    pub duration_ms: u64,
    /// The emergency request this decision served, if any.
    pub emergency: Option<EmergencyRequest>,
}

impl Decision {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Adaptive green-phase policy. Holds only configuration, so `decide` is a
/// pure function of its arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingPolicy {
    base_green_ms: u64,
    vehicle_bonus_ms: u64,
    emergency_factor: f64,
    max_green_ms: Option<u64>,
}

impl TimingPolicy {
    pub fn new(timings: &SignalTimings) -> Self {
        Self {
            base_green_ms: timings.base_green_ms,
            vehicle_bonus_ms: timings.vehicle_bonus_ms,
            emergency_factor: timings.emergency_factor,
            max_green_ms: timings.max_green_ms,
        }
    }

    /// `BASE_GREEN + max(nsCount, ewCount) * VEHICLE_BONUS`, optionally capped.
    pub fn baseline_duration_ms(&self, queues: &QueueSnapshot) -> u64 {
        let busiest = queues
            .pair_total(RoadPair::NS)
            .max(queues.pair_total(RoadPair::EW));
        let duration = self
            .base_green_ms
            .saturating_add(busiest.saturating_mul(self.vehicle_bonus_ms));
        match self.max_green_ms {
            Some(cap) => duration.min(cap),
            None => duration,
        }
    }

    pub fn decide(&self, queues: &QueueSnapshot, emergency: Option<EmergencyRequest>) -> Decision {
        let ns_count = queues.pair_total(RoadPair::NS);
        let ew_count = queues.pair_total(RoadPair::EW);
        // Ties go to NS.
        let baseline_pair = if ns_count >= ew_count {
            RoadPair::NS
        } else {
            RoadPair::EW
        };
        let baseline = self.baseline_duration_ms(queues);

        match emergency {
            Some(request) => Decision {
                pair: request.pair(),
                duration_ms: (baseline as f64 * self.emergency_factor).round() as u64,
                emergency: Some(request),
            },
            None => Decision {
                pair: baseline_pair,
                duration_ms: baseline,
                emergency: None,
            },
        }
    }
}
