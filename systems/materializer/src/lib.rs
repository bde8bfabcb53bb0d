#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system converting a static map definition into the tiles of a session.
//!
//! The produced [`TilePlan`] lists wall and object tiles first so that every
//! ground tile can name the blocking tile resting on the same cell before the
//! world allocates identifiers.

use std::collections::BTreeMap;

use dungeon_catalog::{DenseLayer, Layer, MapDefinition, ObjectLayer};
use dungeon_core::{GridCoord, GroundSeed, TileKind, TilePlan, TileSeed};

/// Expands the map's layers into tile seeds.
///
/// Layers whose name does not map onto a tile kind are ignored, as are object
/// shapes without a graphic and objects positioned outside the grid.
#[must_use]
pub fn materialize(map: &MapDefinition) -> TilePlan {
    let mut plan = TilePlan::default();
    let mut ground = Vec::new();

    for layer in map.layers() {
        let Some(kind) = TileKind::from_layer_name(layer.name()) else {
            continue;
        };
        let seeds = match layer {
            Layer::Dense(dense) => dense_seeds(map, dense, kind),
            Layer::Objects(objects) => object_seeds(map, objects, kind),
        };
        match kind {
            TileKind::Ground => ground.extend(seeds),
            TileKind::Decor => plan.decor.extend(seeds),
            TileKind::Wall | TileKind::Object => plan.blocking.extend(seeds),
            TileKind::Hero => {}
        }
    }

    let mut covering = BTreeMap::new();
    for (index, seed) in plan.blocking.iter().enumerate() {
        let _ = covering.entry(seed.coord.row_major_key()).or_insert(index);
    }

    plan.ground = ground
        .into_iter()
        .map(|seed| GroundSeed {
            covered_by: covering.get(&seed.coord.row_major_key()).copied(),
            seed,
        })
        .collect();

    plan
}

fn dense_seeds(map: &MapDefinition, layer: &DenseLayer, kind: TileKind) -> Vec<TileSeed> {
    let width = map.width().max(1);
    layer
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, value)| **value != 0)
        .filter_map(|(index, value)| {
            let index = u32::try_from(index).ok()?;
            Some(seed(
                map,
                kind,
                GridCoord::new(index % width, index / width),
                *value,
            ))
        })
        .collect()
}

fn object_seeds(map: &MapDefinition, layer: &ObjectLayer, kind: TileKind) -> Vec<TileSeed> {
    let dimensions = map.dimensions();
    layer
        .objects()
        .iter()
        .filter(|object| object.gid != 0)
        .map(|object| {
            let coord = GridCoord::new(
                object.x / map.tile_width(),
                object.y / map.tile_height(),
            );
            (coord, object.gid)
        })
        .filter(|(coord, _)| dimensions.contains(*coord))
        .map(|(coord, gid)| seed(map, kind, coord, gid))
        .collect()
}

fn seed(map: &MapDefinition, kind: TileKind, coord: GridCoord, value: u32) -> TileSeed {
    TileSeed {
        kind,
        coord,
        gid: value - 1,
        width: map.tile_width(),
        height: map.tile_height(),
    }
}
