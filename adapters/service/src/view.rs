//! Read models returned to callers.

use std::time::Duration;

use dungeon_core::{GridCoord, GridDimensions, HeroId, Monster, SessionSnapshot, Tile};
use serde::Serialize;

/// Everything a client needs to draw a session for one hero.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionView {
    /// Session record.
    pub session: SessionSnapshot,
    /// Every tile of the session.
    pub tiles: Vec<Tile>,
    /// Every monster of the session.
    pub monsters: Vec<Monster>,
    /// Hero the view was built for.
    pub hero: HeroId,
    /// Cell the hero stands on, if seated.
    pub hero_position: Option<GridCoord>,
    /// Time left before the session's budget runs out.
    pub time_remaining: Duration,
}

impl SessionView {
    /// Declared grid dimensions and tile size of the map.
    #[must_use]
    pub const fn grid(&self) -> GridDimensions {
        self.session.grid
    }
}

/// Tiles on either side of an accepted move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    /// Tile the hero left.
    pub origin: Tile,
    /// Tile the hero entered.
    pub destination: Tile,
}
