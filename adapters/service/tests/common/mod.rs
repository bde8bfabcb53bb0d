#![allow(dead_code)]

use std::sync::Arc;

use dungeon_broadcast::{Channel, MessageKind, Outbound, Recorder};
use dungeon_catalog::BUILTIN_MAP_ID;
use dungeon_core::{Difficulty, DungeonId, HeroId, SessionId, Timestamp};
use dungeon_service::{
    Catalogs, DungeonService, InviteOutcome, InviteReply, ManualClock, ServiceConfig,
};

pub type TestService = DungeonService<Arc<Recorder>, Arc<ManualClock>>;

pub struct Harness {
    pub service: TestService,
    pub recorder: Arc<Recorder>,
    pub clock: Arc<ManualClock>,
}

pub fn config() -> ServiceConfig {
    ServiceConfig {
        rng_seed: Some(0x5eed),
        ..ServiceConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(builtin(), &config())
}

/// Builtin catalogs with no monsters, so seating is fully predictable.
pub fn empty_harness() -> Harness {
    let config = ServiceConfig {
        monster_count: 0,
        ..config()
    };
    harness_with(builtin(), &config)
}

pub fn builtin() -> Catalogs {
    Catalogs::builtin().expect("builtin catalogs")
}

pub fn harness_with(catalogs: Catalogs, config: &ServiceConfig) -> Harness {
    let recorder = Arc::new(Recorder::new());
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000)));
    let service = DungeonService::new(config, catalogs, Arc::clone(&recorder), Arc::clone(&clock));
    Harness {
        service,
        recorder,
        clock,
    }
}

pub fn hero(name: &str) -> HeroId {
    HeroId::new(name)
}

pub fn test_dungeon() -> DungeonId {
    DungeonId::new(BUILTIN_MAP_ID)
}

pub fn open(harness: &mut Harness, owner: &str) -> SessionId {
    harness
        .service
        .create_session(&hero(owner), &test_dungeon(), Difficulty::Normal)
        .expect("session created")
        .session
        .id
}

/// Invites `target`, answers on their behalf and settles without waiting.
pub fn join(harness: &mut Harness, session: &SessionId, owner: &str, target: &str) {
    let mut ticket = harness
        .service
        .open_invite(session, &hero(owner), &hero(target))
        .expect("invite opened");
    harness
        .service
        .respond_invite(&hero(target), InviteReply::Accept)
        .expect("invite answered");
    let settled = ticket.try_settle().expect("answer delivered");
    let outcome = harness
        .service
        .conclude_invite(settled)
        .expect("invite settled");
    assert_eq!(outcome, InviteOutcome::Accepted);
}

pub fn errors_sent_to(recorder: &Recorder, name: &str) -> Vec<String> {
    recorder
        .sent_to(&Channel::Hero(hero(name)))
        .into_iter()
        .filter_map(|message| match message {
            Outbound::System(notice) if notice.kind == MessageKind::Error => Some(notice.text),
            _ => None,
        })
        .collect()
}
