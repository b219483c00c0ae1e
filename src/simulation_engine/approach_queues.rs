use crate::control_system::road_queue::RoadQueue;
use crate::shared_data::{Approach, QueueSnapshot};
use crate::simulation_engine::vehicles::{Vehicle, VehicleType};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Lanes {
    waiting: [VecDeque<Vehicle>; 4],
}

fn slot(approach: Approach) -> usize {
    match approach {
        Approach::North => 0,
        Approach::East => 1,
        Approach::South => 2,
        Approach::West => 3,
    }
}

/// Vehicles waiting at each approach. Owned by the vehicle simulation;
/// the controller only reads lengths through [`RoadQueue`].
#[derive(Debug, Clone, Default)]
pub struct ApproachQueues {
    lanes: Arc<Mutex<Lanes>>,
    next_id: Arc<AtomicU64>,
}

impl ApproachQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Lanes> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a vehicle to the back of `approach` and returns it.
    pub fn add_vehicle(&self, approach: Approach, vehicle_type: VehicleType) -> Vehicle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let vehicle = Vehicle::new(id, vehicle_type, Instant::now());
        self.lock().waiting[slot(approach)].push_back(vehicle.clone());
        vehicle
    }

    /// Removes the vehicle at the front of `approach`, if any.
    pub fn depart(&self, approach: Approach) -> Option<Vehicle> {
        self.lock().waiting[slot(approach)].pop_front()
    }

    pub fn len(&self, approach: Approach) -> usize {
        self.lock().waiting[slot(approach)].len()
    }

    /// Removes the front vehicle of `approach` only if it is an emergency
    /// vehicle. Those do not wait for green.
    pub fn depart_emergency(&self, approach: Approach) -> Option<Vehicle> {
        let mut lanes = self.lock();
        let lane = &mut lanes.waiting[slot(approach)];
        if lane.front().is_some_and(Vehicle::is_emergency) {
            lane.pop_front()
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let lanes = self.lock();
        let mut snapshot = QueueSnapshot::default();
        for approach in Approach::ALL {
            let count = lanes.waiting[slot(approach)].len();
            snapshot.set(approach, u32::try_from(count).unwrap_or(u32::MAX));
        }
        snapshot
    }
}

impl RoadQueue for ApproachQueues {
    fn queue_length(&self, approach: Approach) -> i64 {
        i64::try_from(self.len(approach)).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicles_leave_in_arrival_order() {
        let queues = ApproachQueues::new();
        let first = queues.add_vehicle(Approach::North, VehicleType::Car);
        let second = queues.add_vehicle(Approach::North, VehicleType::Bus);
        queues.add_vehicle(Approach::West, VehicleType::Truck);

        assert_eq!(queues.queue_length(Approach::North), 2);
        assert_eq!(queues.depart(Approach::North).map(|v| v.id), Some(first.id));
        assert_eq!(queues.depart(Approach::North).map(|v| v.id), Some(second.id));
        assert!(queues.depart(Approach::North).is_none());
        assert_eq!(queues.snapshot(), QueueSnapshot::new(0, 0, 0, 1));
    }

    #[test]
    fn clones_share_the_same_lanes() {
        let queues = ApproachQueues::new();
        let reader = queues.clone();
        queues.add_vehicle(Approach::East, VehicleType::EmergencyVan);
        assert_eq!(reader.len(Approach::East), 1);
        assert_eq!(reader.snapshot(), QueueSnapshot::new(0, 1, 0, 0));
    }

    #[test]
    fn only_a_leading_emergency_vehicle_jumps_the_light() {
        let queues = ApproachQueues::new();
        queues.add_vehicle(Approach::South, VehicleType::Car);
        let van = queues.add_vehicle(Approach::South, VehicleType::EmergencyVan);

        assert!(queues.depart_emergency(Approach::South).is_none());
        assert_eq!(queues.len(Approach::South), 2);

        queues.depart(Approach::South);
        assert_eq!(
            queues.depart_emergency(Approach::South).map(|v| v.id),
            Some(van.id)
        );
        assert!(queues.depart_emergency(Approach::South).is_none());
    }
}
