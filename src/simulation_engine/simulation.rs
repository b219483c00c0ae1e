// simulation.rs
use crate::control_system::traffic_light_controller::ControllerHandle;
use crate::global_variables::{SIM_ARRIVAL_PROBABILITY, SIM_INITIAL_VEHICLES};
use crate::shared_data::Approach;
use crate::simulation_engine::approach_queues::ApproachQueues;
use crate::simulation_engine::vehicles::VehicleType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

/// Running totals of the demo simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimulationStats {
    pub arrived: u64,
    pub departed: u64,
    pub emergency_requests: u64,
    pub total_wait_ms: u64,
}

impl SimulationStats {
    pub fn average_wait_ms(&self) -> f64 {
        if self.departed == 0 {
            0.0
        } else {
            self.total_wait_ms as f64 / self.departed as f64
        }
    }
}

/// Vehicle arrivals and departures around the controlled intersection.
///
/// Each tick a vehicle may arrive at every approach, and one vehicle leaves
/// every approach whose light is green. An emergency van arriving on red
/// files an emergency request for its approach.
pub struct TrafficSimulation {
    queues: ApproachQueues,
    controller: ControllerHandle,
    rng: StdRng,
    arrival_probability: f64,
    stats: Arc<Mutex<SimulationStats>>,
}

impl TrafficSimulation {
    pub fn new(queues: ApproachQueues, controller: ControllerHandle, seed: u64) -> Self {
        Self {
            queues,
            controller,
            rng: StdRng::seed_from_u64(seed),
            arrival_probability: SIM_ARRIVAL_PROBABILITY,
            stats: Arc::new(Mutex::new(SimulationStats::default())),
        }
    }

    pub fn with_arrival_probability(mut self, probability: f64) -> Self {
        self.arrival_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn stats_handle(&self) -> Arc<Mutex<SimulationStats>> {
        Arc::clone(&self.stats)
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Puts a few cars on every approach so the first decision has something to weigh.
    pub fn seed_initial_vehicles(&mut self) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        for approach in Approach::ALL {
            let count = self.rng.random_range(SIM_INITIAL_VEHICLES);
            for _ in 0..count {
                self.queues.add_vehicle(approach, VehicleType::Car);
                stats.arrived += 1;
            }
        }
        log::info!("Seeded initial queues: {:?}", self.queues.snapshot());
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);

        for approach in Approach::ALL {
            if self.rng.random_bool(self.arrival_probability) {
                let vehicle_type = VehicleType::from_roll(self.rng.random_range(0.0..1.0));
                let vehicle = self.queues.add_vehicle(approach, vehicle_type);
                stats.arrived += 1;
                log::debug!(
                    "Vehicle {:?} {} arrived at {}",
                    vehicle.vehicle_type,
                    vehicle.id,
                    approach
                );
                if vehicle.is_emergency() && !self.controller.signals().is_green(approach) {
                    stats.emergency_requests += 1;
                    self.controller.request_emergency(approach);
                }
            }

            let departed = if self.controller.signals().is_green(approach) {
                self.queues.depart(approach)
            } else {
                self.queues.depart_emergency(approach)
            };
            if let Some(vehicle) = departed {
                let waited = now.saturating_duration_since(vehicle.arrived_at);
                stats.departed += 1;
                stats.total_wait_ms += waited.as_millis() as u64;
                log::debug!(
                    "Vehicle {:?} {} left {} after {}ms",
                    vehicle.vehicle_type,
                    vehicle.id,
                    approach,
                    waited.as_millis()
                );
            }
        }
    }

    /// Ticks every `period` until the task is dropped.
    pub async fn run(mut self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_system::config::ControllerConfig;
    use crate::control_system::traffic_light_controller::Controller;

    fn setup(seed: u64) -> (Controller, ApproachQueues, TrafficSimulation) {
        let queues = ApproachQueues::new();
        let controller =
            Controller::new(&ControllerConfig::default(), Arc::new(queues.clone())).unwrap();
        let simulation = TrafficSimulation::new(queues.clone(), controller.handle(), seed);
        (controller, queues, simulation)
    }

    #[test]
    fn initial_seeding_puts_one_to_three_cars_everywhere() {
        let (_controller, queues, mut simulation) = setup(42);
        simulation.seed_initial_vehicles();
        for approach in Approach::ALL {
            let waiting = queues.len(approach);
            assert!((1..=3).contains(&waiting), "{} had {}", approach, waiting);
        }
        let total: usize = Approach::ALL.iter().map(|&a| queues.len(a)).sum();
        assert_eq!(simulation.stats().arrived, total as u64);
    }

    #[test]
    fn nothing_departs_on_red() {
        let (_controller, queues, simulation) = setup(1);
        let mut simulation = simulation.with_arrival_probability(0.0);
        queues.add_vehicle(Approach::North, VehicleType::Car);
        for _ in 0..10 {
            simulation.tick();
        }
        assert_eq!(queues.len(Approach::North), 1);
        assert_eq!(simulation.stats().departed, 0);
    }

    #[test]
    fn emergency_vehicle_at_the_front_leaves_on_red() {
        let (_controller, queues, simulation) = setup(1);
        let mut simulation = simulation.with_arrival_probability(0.0);
        queues.add_vehicle(Approach::West, VehicleType::EmergencyVan);
        queues.add_vehicle(Approach::West, VehicleType::Car);

        simulation.tick();
        assert_eq!(queues.len(Approach::West), 1);
        assert_eq!(simulation.stats().departed, 1);

        simulation.tick();
        assert_eq!(queues.len(Approach::West), 1);
        assert_eq!(simulation.stats().departed, 1);
    }

    #[test]
    fn green_approaches_drain_one_per_tick() {
        let (mut controller, queues, simulation) = setup(1);
        let mut simulation = simulation.with_arrival_probability(0.0);
        for _ in 0..3 {
            queues.add_vehicle(Approach::North, VehicleType::Car);
        }
        queues.add_vehicle(Approach::East, VehicleType::Car);
        controller.advance(Instant::now());

        simulation.tick();
        assert_eq!(queues.len(Approach::North), 2);
        assert_eq!(queues.len(Approach::East), 1);
        simulation.tick();
        simulation.tick();
        simulation.tick();
        assert_eq!(queues.len(Approach::North), 0);
        assert_eq!(simulation.stats().departed, 3);
    }

    #[test]
    fn same_seed_same_traffic() {
        let (_c1, q1, mut s1) = setup(9);
        let (_c2, q2, mut s2) = setup(9);
        s1.seed_initial_vehicles();
        s2.seed_initial_vehicles();
        for _ in 0..50 {
            s1.tick();
            s2.tick();
        }
        assert_eq!(q1.snapshot(), q2.snapshot());
    }
}
