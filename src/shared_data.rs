// src/shared_data.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four compass directions feeding into the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approach {
    North,
    East,
    South,
    West,
}

impl Approach {
    /// Compass order; also the tie-break order wherever approaches are ranked.
    pub const ALL: [Approach; 4] = [
        Approach::North,
        Approach::East,
        Approach::South,
        Approach::West,
    ];

    /// The road pair this approach belongs to. Membership never changes.
    pub fn pair(self) -> RoadPair {
        match self {
            Approach::North | Approach::South => RoadPair::NS,
            Approach::East | Approach::West => RoadPair::EW,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Approach::North => "north",
            Approach::East => "east",
            Approach::South => "south",
            Approach::West => "west",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string does not name one of the four approaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownApproach(pub String);

impl fmt::Display for UnknownApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown approach '{}'", self.0)
    }
}

impl std::error::Error for UnknownApproach {}

impl FromStr for Approach {
    type Err = UnknownApproach;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Approach::North),
            "east" | "e" => Ok(Approach::East),
            "south" | "s" => Ok(Approach::South),
            "west" | "w" => Ok(Approach::West),
            _ => Err(UnknownApproach(s.to_string())),
        }
    }
}

/// A fixed grouping of two opposite approaches that always share signal color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadPair {
    NS,
    EW,
}

impl RoadPair {
    pub const ALL: [RoadPair; 2] = [RoadPair::NS, RoadPair::EW];

    pub fn members(self) -> [Approach; 2] {
        match self {
            RoadPair::NS => [Approach::North, Approach::South],
            RoadPair::EW => [Approach::East, Approach::West],
        }
    }

    pub fn other(self) -> RoadPair {
        match self {
            RoadPair::NS => RoadPair::EW,
            RoadPair::EW => RoadPair::NS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RoadPair::NS => "NS",
            RoadPair::EW => "EW",
        }
    }

    /// Upper-case member names as shown on the status line, e.g. `NORTH/SOUTH`.
    pub fn display_name(self) -> &'static str {
        match self {
            RoadPair::NS => "NORTH/SOUTH",
            RoadPair::EW => "EAST/WEST",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RoadPair::NS => 0,
            RoadPair::EW => 1,
        }
    }
}

impl fmt::Display for RoadPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The possible states for a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightColor {
    Red,
    Yellow,
    Green,
}

impl LightColor {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            LightColor::Red => 0,
            LightColor::Yellow => 1,
            LightColor::Green => 2,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            2 => LightColor::Green,
            1 => LightColor::Yellow,
            _ => LightColor::Red,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LightColor::Red => "RED",
            LightColor::Yellow => "YELLOW",
            LightColor::Green => "GREEN",
        }
    }
}

/// Vehicle counts per approach, sampled once per scheduling decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub north: u32,
    pub east: u32,
    pub south: u32,
    pub west: u32,
}

impl QueueSnapshot {
    pub fn new(north: u32, east: u32, south: u32, west: u32) -> Self {
        Self {
            north,
            east,
            south,
            west,
        }
    }

    pub fn get(&self, approach: Approach) -> u32 {
        match approach {
            Approach::North => self.north,
            Approach::East => self.east,
            Approach::South => self.south,
            Approach::West => self.west,
        }
    }

    pub fn set(&mut self, approach: Approach, count: u32) {
        match approach {
            Approach::North => self.north = count,
            Approach::East => self.east = count,
            Approach::South => self.south = count,
            Approach::West => self.west = count,
        }
    }

    /// Sum of both member approaches of `pair`.
    pub fn pair_total(&self, pair: RoadPair) -> u64 {
        pair.members()
            .iter()
            .map(|&approach| u64::from(self.get(approach)))
            .sum()
    }

    /// The approach holding the most vehicles. Ties go to the earlier
    /// approach in compass order.
    pub fn busiest(&self) -> Approach {
        let mut best = Approach::North;
        for approach in Approach::ALL {
            if self.get(approach) > self.get(best) {
                best = approach;
            }
        }
        best
    }
}

/// One-shot request for a preemptive green on the pair containing `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub target: Approach,
}

impl EmergencyRequest {
    pub fn new(target: Approach) -> Self {
        Self { target }
    }

    pub fn pair(&self) -> RoadPair {
        self.target.pair()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_approach_belongs_to_exactly_one_pair() {
        for approach in Approach::ALL {
            let owners: Vec<RoadPair> = RoadPair::ALL
                .iter()
                .copied()
                .filter(|pair| pair.members().contains(&approach))
                .collect();
            assert_eq!(owners, vec![approach.pair()]);
        }
    }

    #[test]
    fn parses_approach_names_case_insensitively() {
        assert_eq!("East".parse::<Approach>(), Ok(Approach::East));
        assert_eq!(" w ".parse::<Approach>(), Ok(Approach::West));
        assert!("up".parse::<Approach>().is_err());
    }

    #[test]
    fn busiest_prefers_compass_order_on_ties() {
        let queues = QueueSnapshot::new(1, 4, 2, 4);
        assert_eq!(queues.busiest(), Approach::East);
        assert_eq!(QueueSnapshot::default().busiest(), Approach::North);
    }

    #[test]
    fn pair_totals_sum_members() {
        let queues = QueueSnapshot::new(2, 0, 1, 5);
        assert_eq!(queues.pair_total(RoadPair::NS), 3);
        assert_eq!(queues.pair_total(RoadPair::EW), 5);
    }
}
