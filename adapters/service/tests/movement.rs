mod common;

use common::{empty_harness, errors_sent_to, hero, join, open, Harness};
use dungeon_broadcast::{Channel, Outbound};
use dungeon_core::{EngineError, ErrorKind, GridCoord, SessionId};
use dungeon_world::query;

/// Alice owns the session at (1,1); Bob joined and sits next to her at (2,1).
fn party_of_two() -> (Harness, SessionId) {
    let mut harness = empty_harness();
    let session = open(&mut harness, "alice");
    join(&mut harness, &session, "alice", "bob");
    let tile = harness
        .service
        .place_hero(&session, &hero("bob"))
        .expect("bob seated");
    assert_eq!(tile.coord, GridCoord::new(2, 1));
    (harness, session)
}

#[test]
fn a_step_moves_the_hero_and_is_broadcast() {
    let (mut harness, session) = party_of_two();
    let _ = harness.recorder.take();

    let outcome = harness
        .service
        .move_hero(&session, &hero("alice"), GridCoord::new(2, 2))
        .expect("diagonal step");

    assert_eq!(outcome.origin.coord, GridCoord::new(1, 1));
    assert_eq!(outcome.origin.hero, None);
    assert_eq!(outcome.destination.coord, GridCoord::new(2, 2));
    assert_eq!(outcome.destination.hero, Some(hero("alice")));
    assert_eq!(
        query::hero_position(harness.service.world(), &session, &hero("alice")),
        Some(GridCoord::new(2, 2))
    );
    assert_eq!(
        harness.recorder.sent_to(&Channel::Session(session)),
        vec![Outbound::HeroMoved {
            hero: hero("alice"),
            origin: outcome.origin,
            destination: outcome.destination,
        }]
    );
}

#[test]
fn walls_and_covered_ground_are_busy() {
    let (mut harness, session) = party_of_two();

    for target in [GridCoord::new(1, 0), GridCoord::new(0, 0), GridCoord::new(0, 2)] {
        let error = harness
            .service
            .move_hero(&session, &hero("alice"), target)
            .expect_err("blocked");
        assert_eq!(error, EngineError::TileBusy, "moving to {target}");
    }
    assert_eq!(
        query::hero_position(harness.service.world(), &session, &hero("alice")),
        Some(GridCoord::new(1, 1))
    );
}

#[test]
fn heroes_cannot_share_a_tile() {
    let (mut harness, session) = party_of_two();
    let before = query::tile_view(harness.service.world(), &session)
        .expect("session")
        .iter()
        .cloned()
        .collect::<Vec<_>>();

    let error = harness
        .service
        .move_hero(&session, &hero("alice"), GridCoord::new(2, 1))
        .expect_err("bob is there");

    assert_eq!(error, EngineError::TileBusy);
    assert_eq!(error.kind(), ErrorKind::InvalidMove);
    let after = query::tile_view(harness.service.world(), &session)
        .expect("session")
        .iter()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(before, after);
    assert_eq!(
        errors_sent_to(&harness.recorder, "alice"),
        vec!["Tile is busy. You cannot move in this direction.".to_owned()]
    );
}

#[test]
fn only_adjacent_cells_are_reachable() {
    let (mut harness, session) = party_of_two();

    for target in [GridCoord::new(3, 3), GridCoord::new(1, 1), GridCoord::new(1, 3)] {
        let error = harness
            .service
            .move_hero(&session, &hero("alice"), target)
            .expect_err("not adjacent");
        assert_eq!(error, EngineError::InvalidMoveDistance, "moving to {target}");
    }
}

#[test]
fn distance_is_checked_before_the_grid() {
    let (mut harness, session) = party_of_two();

    let error = harness
        .service
        .move_hero(&session, &hero("alice"), GridCoord::new(40, 40))
        .expect_err("off the map");

    assert_eq!(error, EngineError::InvalidMoveDistance);
    let notice = harness
        .recorder
        .sent_to(&Channel::Hero(hero("alice")))
        .into_iter()
        .find_map(|message| match message {
            Outbound::System(notice) => Some(notice),
            _ => None,
        })
        .expect("error notice");
    assert_eq!(
        notice.payload,
        Some(serde_json::json!({ "target": { "x": 40, "y": 40 } }))
    );
}

#[test]
fn unseated_members_and_strangers_cannot_move() {
    let mut harness = empty_harness();
    let session = open(&mut harness, "alice");
    join(&mut harness, &session, "alice", "bob");

    let error = harness
        .service
        .move_hero(&session, &hero("bob"), GridCoord::new(2, 1))
        .expect_err("bob has no tile");
    assert_eq!(error, EngineError::HeroNotPlaced(hero("bob")));

    let error = harness
        .service
        .move_hero(&session, &hero("mallory"), GridCoord::new(2, 1))
        .expect_err("mallory is not in the party");
    assert_eq!(error, EngineError::NotPartyMember(hero("mallory")));
}

#[test]
fn walking_back_and_forth_restores_the_board() {
    let (mut harness, session) = party_of_two();
    let before = query::tile_view(harness.service.world(), &session)
        .expect("session")
        .iter()
        .cloned()
        .collect::<Vec<_>>();

    for target in [GridCoord::new(1, 2), GridCoord::new(2, 3), GridCoord::new(1, 2)] {
        let _ = harness
            .service
            .move_hero(&session, &hero("alice"), target)
            .expect("step");
    }
    let _ = harness
        .service
        .move_hero(&session, &hero("alice"), GridCoord::new(1, 1))
        .expect("home");

    let after = query::tile_view(harness.service.world(), &session)
        .expect("session")
        .iter()
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(before, after);
}
