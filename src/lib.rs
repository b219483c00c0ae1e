//! Adaptive traffic-light controller for a single four-way intersection.
//!
//! The controller cycles right-of-way between the north/south and
//! east/west road pairs, sizes each green phase from the waiting queues,
//! and lets an emergency request or a manual override steer the next cycle.

pub mod control_system;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;
