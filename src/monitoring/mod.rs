// monitoring/mod.rs
pub mod traffic_monitoring_system;

pub use traffic_monitoring_system::{
    apply_command, parse_command, run_cli, run_status_display, Command, DisplayFrame,
};
