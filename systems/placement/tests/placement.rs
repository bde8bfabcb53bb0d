use std::time::Duration;

use dungeon_catalog::{DenseLayer, Layer, MapCatalog, MapDefinition, BUILTIN_MAP_ID};
use dungeon_core::{
    Command, Difficulty, DungeonId, Event, GridCoord, HeroId, MapId, SessionId, TileKind,
    Timestamp,
};
use dungeon_system_materializer::materialize;
use dungeon_system_placement::{Config, Placement, SpawnDecision};
use dungeon_world::{self as world, query, World};

const OWNER: &str = "owner";

fn materialized(map: &MapDefinition) -> (World, SessionId) {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::OpenSession {
            dungeon: DungeonId::new("any"),
            map: map.id().clone(),
            owner: HeroId::new(OWNER),
            difficulty: Difficulty::Easy,
            duration: Duration::from_secs(60),
            grid: map.dimensions(),
            created_at: Timestamp::from_millis(0),
        },
        &mut events,
    );
    let session = match events.as_slice() {
        [Event::SessionOpened { session, .. }] => session.clone(),
        other => panic!("unexpected events: {other:?}"),
    };
    world::apply(
        &mut world,
        Command::MaterializeTiles {
            session: session.clone(),
            plan: materialize(map),
        },
        &mut events,
    );
    (world, session)
}

fn seat(world: &mut World, session: &SessionId, hero: &HeroId) -> SpawnDecision {
    let placement = Placement::new(Config::default());
    let mut commands = Vec::new();
    let decision = placement.handle(
        session,
        query::tile_view(world, session).expect("session"),
        hero,
        &mut commands,
    );
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, Event::CommandRejected { .. })),
        "placement rejected: {events:?}"
    );
    decision
}

#[test]
fn owner_lands_on_first_free_ground_and_stays_there() {
    let map = MapCatalog::builtin()
        .expect("builtin catalog")
        .load_map(&MapId::new(BUILTIN_MAP_ID))
        .expect("bundled map")
        .clone();
    let (mut world, session) = materialized(&map);
    let hero = HeroId::new(OWNER);

    let first = seat(&mut world, &session, &hero);
    assert!(matches!(first, SpawnDecision::Bind(_)));
    assert_eq!(
        query::hero_position(&world, &session, &hero),
        Some(GridCoord::new(1, 1))
    );

    let tiles_before = query::tile_view(&world, &session).map(|view| view.len());
    let second = seat(&mut world, &session, &hero);
    assert!(matches!(second, SpawnDecision::AlreadyPlaced(_)));
    assert_eq!(
        query::tile_view(&world, &session).map(|view| view.len()),
        tiles_before
    );
}

#[test]
fn fully_blocked_map_creates_marker_tile_at_fallback() {
    let map = MapDefinition::new(
        MapId::new("vault"),
        2,
        2,
        16,
        16,
        vec![
            Layer::Dense(DenseLayer::new("ground", vec![1; 4])),
            Layer::Dense(DenseLayer::new("wall", vec![2; 4])),
        ],
    )
    .expect("valid map");
    let (mut world, session) = materialized(&map);
    let hero = HeroId::new(OWNER);

    let decision = seat(&mut world, &session, &hero);

    assert_eq!(decision, SpawnDecision::Fallback(GridCoord::new(4, 4)));
    let tiles = query::tile_view(&world, &session).expect("session");
    let marker = tiles.hero_tile(&hero).expect("marker tile");
    assert_eq!(marker.kind, TileKind::Hero);
    assert_eq!(marker.coord, GridCoord::new(4, 4));
    assert_eq!((marker.width, marker.height), (16, 16));
}
