// simulation_engine/mod.rs
pub mod approach_queues;
pub mod simulation;
pub mod vehicles;

pub use approach_queues::ApproachQueues;
pub use simulation::{SimulationStats, TrafficSimulation};
