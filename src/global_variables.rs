// Default signal timings (milliseconds)
pub const BASE_GREEN_MS: i64 = 10_000;
pub const VEHICLE_BONUS_MS: i64 = 2_000;
pub const YELLOW_MS: i64 = 3_000;
pub const ALL_RED_MS: i64 = 1_000;
pub const OVERRIDE_POLL_MS: i64 = 1_000;

// Multiplier applied to the green phase granted to an emergency request
pub const EMERGENCY_FACTOR: f64 = 1.5;

// Demo vehicle simulation
pub const SIM_TICK_MS: u64 = 500;
pub const SIM_ARRIVAL_PROBABILITY: f64 = 0.15;
pub const SIM_INITIAL_VEHICLES: std::ops::RangeInclusive<i64> = 1..=3;

// Status display refresh
pub const DISPLAY_REFRESH_MS: u64 = 1_000;
