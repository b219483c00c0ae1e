use serde::Serialize;
use tokio::time::Instant;

/// Different types of vehicles in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleType {
    Car,
    Bus,
    Truck,
    EmergencyVan,
}

impl VehicleType {
    /// Draws a type using the fleet mix: half cars, then trucks, buses and a rare emergency van.
    pub fn from_roll(roll: f64) -> Self {
        if roll < 0.50 {
            VehicleType::Car
        } else if roll < 0.81 {
            VehicleType::Truck
        } else if roll < 0.99 {
            VehicleType::Bus
        } else {
            VehicleType::EmergencyVan
        }
    }
}

/// A vehicle waiting at one approach of the intersection.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: u64,
    pub vehicle_type: VehicleType,
    pub arrived_at: Instant,
}

impl Vehicle {
    pub fn new(id: u64, vehicle_type: VehicleType, arrived_at: Instant) -> Self {
        Self {
            id,
            vehicle_type,
            arrived_at,
        }
    }

    pub fn is_emergency(&self) -> bool {
        self.vehicle_type == VehicleType::EmergencyVan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_mix_boundaries() {
        assert_eq!(VehicleType::from_roll(0.0), VehicleType::Car);
        assert_eq!(VehicleType::from_roll(0.5), VehicleType::Truck);
        assert_eq!(VehicleType::from_roll(0.81), VehicleType::Bus);
        assert_eq!(VehicleType::from_roll(0.995), VehicleType::EmergencyVan);
    }
}
