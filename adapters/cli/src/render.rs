//! Plain-text rendering of a session view.

use std::fmt::Write as _;

use dungeon_core::{Tile, TileKind};
use dungeon_service::SessionView;

/// Draws the grid row by row followed by a short legend.
///
/// Decor never takes part in play and is left out. When several tiles share a
/// cell the most relevant one wins: heroes over monsters over obstacles over
/// bare ground.
pub(crate) fn view(view: &SessionView) -> String {
    let grid = view.grid();
    let width = usize::try_from(grid.width).unwrap_or(0);
    let height = usize::try_from(grid.height).unwrap_or(0);
    let mut cells = vec![vec![(0_u8, ' '); width]; height];

    for tile in view.tiles.iter().filter(|tile| tile.kind != TileKind::Decor) {
        let (Ok(x), Ok(y)) = (
            usize::try_from(tile.coord.x()),
            usize::try_from(tile.coord.y()),
        ) else {
            continue;
        };
        let Some(cell) = cells.get_mut(y).and_then(|row| row.get_mut(x)) else {
            continue;
        };
        let drawn = glyph(tile, view);
        if drawn.0 >= cell.0 {
            *cell = drawn;
        }
    }

    let mut out = String::new();
    let position = view
        .hero_position
        .map_or_else(|| "unseated".to_owned(), |coord| format!("at {coord}"));
    let _ = writeln!(
        out,
        "    {} [{}] {}, {:?}, {}s left, {} {position}",
        view.session.id,
        view.session.status,
        view.session.dungeon,
        view.session.difficulty,
        view.time_remaining.as_secs(),
        view.hero,
    );
    for row in cells {
        let line: String = row.into_iter().map(|(_, glyph)| glyph).collect();
        let _ = writeln!(out, "    {}", line.trim_end());
    }
    let _ = writeln!(out, "    {} monsters", view.monsters.len());
    out
}

fn glyph(tile: &Tile, view: &SessionView) -> (u8, char) {
    match (&tile.hero, &tile.monster) {
        (Some(hero), _) if *hero == view.hero => (4, '@'),
        (Some(_), _) => (3, 'h'),
        (None, Some(_)) => (2, 'M'),
        (None, None) => match tile.kind {
            TileKind::Wall => (1, '#'),
            TileKind::Object => (1, 'o'),
            TileKind::Ground | TileKind::Hero | TileKind::Decor => (0, '.'),
        },
    }
}
