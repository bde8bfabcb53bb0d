use std::{collections::BTreeSet, time::Duration};

use dungeon_catalog::{
    DenseLayer, Layer, MapCatalog, MapDefinition, Modifier, MonsterRegistry, MonsterTemplate,
    BUILTIN_MAP_ID,
};
use dungeon_core::{
    Command, Difficulty, DungeonId, EngineError, Event, HeroId, MapId, Rarity, SessionId,
    TileKind, Timestamp,
};
use dungeon_system_materializer::materialize;
use dungeon_system_spawning::{Config, Spawning};
use dungeon_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn seeded_world(map: &MapDefinition) -> (World, SessionId) {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::OpenSession {
            dungeon: DungeonId::new("any"),
            map: map.id().clone(),
            owner: HeroId::new("owner"),
            difficulty: Difficulty::Hard,
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

fn bundled_map() -> MapDefinition {
    MapCatalog::builtin()
        .expect("builtin catalog")
        .load_map(&MapId::new(BUILTIN_MAP_ID))
        .expect("bundled map")
        .clone()
}

fn spawn(
    world: &mut World,
    session: &SessionId,
    registry: &MonsterRegistry,
    seed: u64,
) -> Result<Vec<Event>, EngineError> {
    let spawning = Spawning::new(Config::default());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut commands = Vec::new();
    spawning.handle(
        session,
        query::tile_view(world, session).expect("session"),
        registry,
        Difficulty::Hard,
        &mut rng,
        &mut commands,
    )?;

    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    Ok(events)
}

#[test]
fn ten_monsters_land_on_distinct_free_ground() {
    let map = bundled_map();
    let (mut world, session) = seeded_world(&map);

    let events = spawn(&mut world, &session, &MonsterRegistry::builtin(), 11).expect("spawn");
    assert!(matches!(
        events.as_slice(),
        [Event::MonstersSpawned { monsters, .. }] if monsters.len() == 10
    ));

    let tiles = query::tile_view(&world, &session).expect("session");
    let monsters = query::monsters(&world, &session).expect("session");
    assert_eq!(monsters.len(), 10);

    let distinct: BTreeSet<_> = monsters.iter().map(|monster| &monster.tile).collect();
    assert_eq!(distinct.len(), 10, "no two monsters share a tile");

    for monster in monsters {
        let tile = tiles.get(&monster.tile).expect("bound tile");
        assert_eq!(tile.kind, TileKind::Ground);
        assert_eq!(tile.object, None);
        assert_eq!(tile.monster.as_ref(), Some(&monster.id));
        assert_eq!(monster.rarity, Rarity::Rare);
    }
}

#[test]
fn stats_scale_with_template_attributes() {
    let map = bundled_map();
    let (mut world, session) = seeded_world(&map);
    let registry = MonsterRegistry::new(vec![MonsterTemplate {
        id: "imp".to_owned(),
        name: "Imp".to_owned(),
        modifier: Modifier {
            constitution: 5,
            intelligence: 2,
            ..Modifier::default()
        },
    }])
    .expect("registry");

    let _ = spawn(&mut world, &session, &registry, 3).expect("spawn");

    let monsters = query::monsters(&world, &session).expect("session");
    assert!(monsters
        .iter()
        .all(|monster| monster.health == 50 && monster.mana == 20 && monster.name == "Imp"));
}

#[test]
fn seeded_runs_are_reproducible() {
    let map = bundled_map();
    let placements = |seed| {
        let (mut world, session) = seeded_world(&map);
        let _ = spawn(&mut world, &session, &MonsterRegistry::builtin(), seed).expect("spawn");
        query::monsters(&world, &session)
            .expect("session")
            .iter()
            .map(|monster| (monster.template.clone(), monster.tile.clone()))
            .collect::<Vec<_>>()
    };

    assert_eq!(placements(42), placements(42));
}

#[test]
fn scarce_ground_caps_the_monster_count() {
    let map = MapDefinition::new(
        MapId::new("closet"),
        3,
        1,
        16,
        16,
        vec![Layer::Dense(DenseLayer::new("ground", vec![1, 1, 1]))],
    )
    .expect("valid map");
    let (mut world, session) = seeded_world(&map);

    let _ = spawn(&mut world, &session, &MonsterRegistry::builtin(), 5).expect("spawn");

    assert_eq!(query::monsters(&world, &session).map(<[_]>::len), Some(3));
}

#[test]
fn no_free_ground_is_reported() {
    let map = MapDefinition::new(
        MapId::new("solid"),
        2,
        1,
        16,
        16,
        vec![
            Layer::Dense(DenseLayer::new("ground", vec![1, 1])),
            Layer::Dense(DenseLayer::new("wall", vec![5, 5])),
        ],
    )
    .expect("valid map");
    let (mut world, session) = seeded_world(&map);

    let result = spawn(&mut world, &session, &MonsterRegistry::builtin(), 5);

    assert!(matches!(result, Err(EngineError::NoFreeTiles)));
    assert_eq!(query::monsters(&world, &session).map(<[_]>::len), Some(0));
}
