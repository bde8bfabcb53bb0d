#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Hero placement system choosing where a hero enters a session.

use dungeon_core::{Command, GridCoord, HeroId, SessionId, Tile, TileId, TileView};
use serde::{Deserialize, Serialize};

/// Coordinate used when no free ground tile exists.
pub const DEFAULT_FALLBACK: GridCoord = GridCoord::new(4, 4);

/// Rectangle anchored at the origin that is searched before the rest of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRegion {
    /// Largest column inside the region, inclusive.
    pub max_x: u32,
    /// Largest row inside the region, inclusive.
    pub max_y: u32,
}

impl SpawnRegion {
    /// Reports whether the coordinate lies inside the region.
    #[must_use]
    pub const fn contains(&self, coord: GridCoord) -> bool {
        coord.x() <= self.max_x && coord.y() <= self.max_y
    }
}

/// Configuration parameters required to construct the placement system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    spawn_region: Option<SpawnRegion>,
    fallback: GridCoord,
}

impl Config {
    /// Creates a configuration with an optional preferred region and the fallback cell.
    #[must_use]
    pub const fn new(spawn_region: Option<SpawnRegion>, fallback: GridCoord) -> Self {
        Self {
            spawn_region,
            fallback,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, DEFAULT_FALLBACK)
    }
}

/// Where a hero should be seated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpawnDecision {
    /// The hero already stands on the tile; nothing changes.
    AlreadyPlaced(TileId),
    /// The hero should be bound to the free ground tile.
    Bind(TileId),
    /// No free ground exists; a marker tile is created at the coordinate.
    Fallback(GridCoord),
}

/// Pure system that seats heroes on free ground.
#[derive(Debug)]
pub struct Placement {
    config: Config,
}

impl Placement {
    /// Creates a new placement system using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Chooses the first free ground tile in row-major order.
    ///
    /// The configured spawn region is searched first, then the whole map.
    #[must_use]
    pub fn select(&self, tiles: TileView<'_>, hero: &HeroId) -> SpawnDecision {
        if let Some(tile) = tiles.hero_tile(hero) {
            return SpawnDecision::AlreadyPlaced(tile.id.clone());
        }

        let preferred = self
            .config
            .spawn_region
            .and_then(|region| first_free(tiles, |tile| region.contains(tile.coord)));
        match preferred.or_else(|| first_free(tiles, |_| true)) {
            Some(tile) => SpawnDecision::Bind(tile.id.clone()),
            None => SpawnDecision::Fallback(self.config.fallback),
        }
    }

    /// Emits the command seating the hero, or nothing when already seated.
    pub fn handle(
        &self,
        session: &SessionId,
        tiles: TileView<'_>,
        hero: &HeroId,
        out: &mut Vec<Command>,
    ) -> SpawnDecision {
        let decision = self.select(tiles, hero);
        match &decision {
            SpawnDecision::AlreadyPlaced(_) => {}
            SpawnDecision::Bind(tile) => out.push(Command::BindHero {
                session: session.clone(),
                hero: hero.clone(),
                tile: tile.clone(),
            }),
            SpawnDecision::Fallback(coord) => out.push(Command::PlaceHeroMarker {
                session: session.clone(),
                hero: hero.clone(),
                coord: *coord,
            }),
        }
        decision
    }
}

fn first_free<'a>(tiles: TileView<'a>, filter: impl Fn(&Tile) -> bool) -> Option<&'a Tile> {
    tiles
        .free_ground()
        .filter(|tile| filter(tile))
        .min_by_key(|tile| tile.coord.row_major_key())
}

#[cfg(test)]
mod tests {
    use dungeon_core::TileKind;

    use super::*;

    fn ground(id: &str, x: u32, y: u32) -> Tile {
        Tile {
            id: TileId::new(id),
            session: SessionId::new("s"),
            kind: TileKind::Ground,
            coord: GridCoord::new(x, y),
            gid: 0,
            width: 32,
            height: 32,
            object: None,
            hero: None,
            monster: None,
        }
    }

    #[test]
    fn picks_row_major_first_regardless_of_insertion_order() {
        let tiles = vec![ground("b", 0, 1), ground("a", 1, 0)];
        let placement = Placement::new(Config::default());

        assert_eq!(
            placement.select(TileView::new(&tiles), &HeroId::new("h")),
            SpawnDecision::Bind(TileId::new("a"))
        );
    }

    #[test]
    fn region_is_preferred_when_it_has_room() {
        let tiles = vec![ground("a", 5, 0), ground("c", 1, 1)];
        let hero = HeroId::new("h");
        let anywhere = Placement::new(Config::default());
        let region = SpawnRegion { max_x: 1, max_y: 1 };
        let inside = Placement::new(Config::new(Some(region), DEFAULT_FALLBACK));

        assert_eq!(
            anywhere.select(TileView::new(&tiles), &hero),
            SpawnDecision::Bind(TileId::new("a"))
        );
        assert_eq!(
            inside.select(TileView::new(&tiles), &hero),
            SpawnDecision::Bind(TileId::new("c"))
        );
    }
}
