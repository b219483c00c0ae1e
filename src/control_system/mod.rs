// control_system/mod.rs
pub mod config;
pub mod inputs;
pub mod road_queue;
pub mod scheduler;
pub mod signals;
pub mod timing_policy;
pub mod traffic_light_controller;

pub use config::{ConfigError, ControllerConfig, SignalTimings};
pub use road_queue::RoadQueue;
pub use scheduler::Scheduler;
pub use timing_policy::{Decision, TimingPolicy};
pub use traffic_light_controller::{Controller, ControllerHandle, Phase, StatusReport};
