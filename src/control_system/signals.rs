//! Signal colors shared between the controller and its observers.
//!
//! Color is stored once per road pair, so the two approaches of a pair can
//! never be observed with different colors. Only [`SignalState`] can write;
//! it is owned by the controller and is not `Clone`. Everyone else gets a
//! [`SignalBoard`].

use crate::shared_data::{Approach, LightColor, RoadPair};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

type PairColors = [AtomicU8; 2];

fn all_red() -> Arc<PairColors> {
    Arc::new([
        AtomicU8::new(LightColor::Red.to_u8()),
        AtomicU8::new(LightColor::Red.to_u8()),
    ])
}

fn load(colors: &PairColors, pair: RoadPair) -> LightColor {
    LightColor::from_u8(colors[pair.index()].load(Ordering::Acquire))
}

/// Single writer of the signal colors.
#[derive(Debug)]
pub struct SignalState {
    colors: Arc<PairColors>,
}

impl SignalState {
    /// All approaches start red.
    pub fn new() -> Self {
        Self { colors: all_red() }
    }

    pub fn board(&self) -> SignalBoard {
        SignalBoard {
            colors: Arc::clone(&self.colors),
        }
    }

    pub fn color_of(&self, approach: Approach) -> LightColor {
        load(&self.colors, approach.pair())
    }

    pub fn pair_color(&self, pair: RoadPair) -> LightColor {
        load(&self.colors, pair)
    }

    /// Sets both approaches of `pair` to `color`. Turning a pair green first
    /// forces the opposing pair red.
    pub(crate) fn set_pair(&mut self, pair: RoadPair, color: LightColor) {
        if color == LightColor::Green {
            let other = pair.other();
            if self.pair_color(other) != LightColor::Red {
                log::warn!(
                    "Pair {} was {:?} while {} turned green; forcing it red",
                    other,
                    self.pair_color(other),
                    pair
                );
                self.colors[other.index()].store(LightColor::Red.to_u8(), Ordering::Release);
            }
        }
        self.colors[pair.index()].store(color.to_u8(), Ordering::Release);
    }
}

impl Default for SignalState {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the signals for renderers and vehicle logic.
#[derive(Debug, Clone)]
pub struct SignalBoard {
    colors: Arc<PairColors>,
}

impl SignalBoard {
    pub fn color_of(&self, approach: Approach) -> LightColor {
        load(&self.colors, approach.pair())
    }

    pub fn pair_color(&self, pair: RoadPair) -> LightColor {
        load(&self.colors, pair)
    }

    pub fn is_green(&self, approach: Approach) -> bool {
        self.color_of(approach) == LightColor::Green
    }

    /// Colors of all four approaches in compass order.
    pub fn snapshot(&self) -> [(Approach, LightColor); 4] {
        Approach::ALL.map(|approach| (approach, self.color_of(approach)))
    }
}
