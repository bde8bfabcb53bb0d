#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Movement system validating single-step hero moves.

use dungeon_core::{
    Command, EngineError, GridCoord, HeroId, SessionId, TileId, TileKind, TileView,
};

/// Validated move between two tiles of one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovePlan {
    /// Tile the hero currently stands on.
    pub from: TileId,
    /// Ground tile receiving the hero.
    pub to: TileId,
    /// Requested coordinate.
    pub target: GridCoord,
}

impl MovePlan {
    /// Command performing the move.
    #[must_use]
    pub fn command(&self, session: &SessionId, hero: &HeroId) -> Command {
        Command::MoveHero {
            session: session.clone(),
            hero: hero.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            target: self.target,
        }
    }
}

/// Pure system that turns move requests into world commands.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Validates a move of `hero` towards `target`.
    ///
    /// Checks run in a fixed order: the hero must be seated, the target must be
    /// one step away (diagonals included), a walkable tile must exist there and
    /// nothing on that cell may block or carry an occupant.
    pub fn plan(
        &self,
        tiles: TileView<'_>,
        hero: &HeroId,
        target: GridCoord,
    ) -> Result<MovePlan, EngineError> {
        let origin = tiles
            .hero_tile(hero)
            .ok_or_else(|| EngineError::HeroNotPlaced(hero.clone()))?;

        if origin.coord.chebyshev_distance(target) != 1 {
            return Err(EngineError::InvalidMoveDistance);
        }

        let mut candidates = tiles.non_decor_at(target).peekable();
        if candidates.peek().is_none() {
            return Err(EngineError::TileNotFound(target));
        }
        if tiles.non_decor_at(target).any(|tile| tile.blocks_movement()) {
            return Err(EngineError::TileBusy);
        }

        let destination = candidates
            .find(|tile| tile.kind == TileKind::Ground)
            .ok_or(EngineError::TileNotFound(target))?;

        Ok(MovePlan {
            from: origin.id.clone(),
            to: destination.id.clone(),
            target,
        })
    }

    /// Validates the move and emits the command performing it.
    pub fn handle(
        &self,
        session: &SessionId,
        tiles: TileView<'_>,
        hero: &HeroId,
        target: GridCoord,
        out: &mut Vec<Command>,
    ) -> Result<MovePlan, EngineError> {
        let plan = self.plan(tiles, hero, target)?;
        out.push(plan.command(session, hero));
        Ok(plan)
    }
}
