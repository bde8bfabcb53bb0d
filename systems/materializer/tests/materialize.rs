use dungeon_catalog::{DenseLayer, Layer, MapCatalog, MapDefinition, BUILTIN_MAP_ID};
use dungeon_core::{
    Command, Difficulty, DungeonId, Event, GridCoord, HeroId, MapId, SessionId, TileKind,
    Timestamp,
};
use dungeon_system_materializer::materialize;
use dungeon_world::{self as world, query, World};
use std::time::Duration;

fn open_session(world: &mut World, map: &MapDefinition) -> SessionId {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::OpenSession {
            dungeon: DungeonId::new("any"),
            map: map.id().clone(),
            owner: HeroId::new("owner"),
            difficulty: Difficulty::Easy,
            duration: Duration::from_secs(60),
            grid: map.dimensions(),
            created_at: Timestamp::from_millis(0),
        },
        &mut events,
    );
    match events.as_slice() {
        [Event::SessionOpened { session, .. }] => session.clone(),
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn full_ground_layer_yields_one_tile_per_cell() {
    let map = MapDefinition::new(
        MapId::new("field"),
        10,
        10,
        32,
        32,
        vec![Layer::Dense(DenseLayer::new("ground", vec![1; 100]))],
    )
    .expect("valid map");

    let plan = materialize(&map);

    assert_eq!(plan.ground.len(), 100);
    assert!(plan.blocking.is_empty());
    assert!(plan.decor.is_empty());
    assert_eq!(plan.ground[0].seed.coord, GridCoord::new(0, 0));
    assert_eq!(plan.ground[99].seed.coord, GridCoord::new(9, 9));
    assert!(plan.ground.iter().all(|ground| ground.seed.gid == 0));
    assert!(plan.ground.iter().all(|ground| ground.covered_by.is_none()));
}

#[test]
fn bundled_map_links_covered_ground_to_blocking_tiles() {
    let catalog = MapCatalog::builtin().expect("builtin catalog");
    let map = catalog
        .load_map(&MapId::new(BUILTIN_MAP_ID))
        .expect("bundled map");

    let plan = materialize(map);
    assert_eq!(plan.ground.len(), 100);
    assert_eq!(plan.blocking.len(), 38);
    assert_eq!(plan.decor.len(), 3);

    let mut world = World::new();
    let session = open_session(&mut world, map);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::MaterializeTiles {
            session: session.clone(),
            plan,
        },
        &mut events,
    );
    assert_eq!(
        events,
        vec![Event::TilesMaterialized {
            session: session.clone(),
            count: 141
        }]
    );

    let tiles = query::tile_view(&world, &session).expect("session");
    let chest = tiles
        .iter()
        .find(|tile| tile.kind == TileKind::Object && tile.coord == GridCoord::new(6, 2))
        .expect("chest tile");
    let under_chest = tiles
        .iter()
        .find(|tile| tile.kind == TileKind::Ground && tile.coord == GridCoord::new(6, 2))
        .expect("ground under chest");
    assert_eq!(under_chest.object.as_ref(), Some(&chest.id));

    let covered = tiles
        .iter()
        .filter(|tile| tile.kind == TileKind::Ground && tile.object.is_some())
        .count();
    assert_eq!(covered, 38);
    assert_eq!(tiles.free_ground().count(), 62);
}
