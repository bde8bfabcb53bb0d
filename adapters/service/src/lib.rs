#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Caller-facing operations of the dungeon engine.
//!
//! [`DungeonService`] owns the authoritative world together with the static
//! catalogs and drives the pure systems: each operation reads views, asks a
//! system for commands, applies them to the world and publishes the outcome
//! through the injected [`Broadcast`] capability. All mutation goes through
//! `&mut self`, so hosts that serve several connections share the service
//! behind a [`tokio::sync::Mutex`] and every session change is serialized.
//!
//! Rejections are returned to the caller and also published as an error
//! [`SystemMessage`] on the acting hero's channel.

use std::{collections::HashMap, time::Duration};

use dungeon_broadcast::{Broadcast, MessageKind, Outbound, SystemMessage};
use dungeon_catalog::{
    CatalogError, DungeonEntry, DungeonRegistry, MapCatalog, MonsterRegistry,
};
use dungeon_core::{
    Command, Difficulty, DungeonId, EngineError, Event, GridCoord, HeroId, MapId, PartyView,
    SessionId, SessionSnapshot, SessionStatus, Tile, TileView, Timestamp,
};
use dungeon_system_lifecycle::{check_active, check_can_open, check_member, plan_build, plan_end};
use dungeon_system_materializer::materialize;
use dungeon_system_movement::Movement;
use dungeon_system_party::{await_reply, Party};
use dungeon_system_placement::Placement;
use dungeon_system_spawning::{check_room, Spawning};
use dungeon_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};

pub mod clock;
pub mod config;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ServiceConfig};
pub use dungeon_system_lifecycle::EndPlan;
pub use dungeon_system_party::{InviteOutcome, InviteReply};
pub use view::{MoveOutcome, SessionView};

/// Static data the service reads from.
#[derive(Clone, Debug)]
pub struct Catalogs {
    /// Map definitions keyed by identifier.
    pub maps: MapCatalog,
    /// Dungeons heroes may open sessions for.
    pub dungeons: DungeonRegistry,
    /// Templates sampled when seeding monsters.
    pub monsters: MonsterRegistry,
}

impl Catalogs {
    /// Catalogs bundled with the engine.
    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self {
            maps: MapCatalog::builtin()?,
            dungeons: DungeonRegistry::builtin(),
            monsters: MonsterRegistry::builtin(),
        })
    }
}

#[derive(Debug)]
struct PendingInvite {
    id: u64,
    session: SessionId,
    from: HeroId,
    sent_at: Timestamp,
    window: Duration,
    responder: Option<oneshot::Sender<InviteReply>>,
    reply: Option<InviteReply>,
}

impl PendingInvite {
    fn expired(&self, now: Timestamp) -> bool {
        now.saturating_since(self.sent_at) >= self.window
    }

    /// Still waiting for the invitee, with the ticket alive and the window open.
    fn awaits_reply(&self, now: Timestamp) -> bool {
        !self.expired(now)
            && self
                .responder
                .as_ref()
                .is_some_and(|responder| !responder.is_closed())
    }

    /// Nobody can settle this invite any more.
    fn stale(&self, now: Timestamp) -> bool {
        self.expired(now)
            || match &self.responder {
                Some(responder) => responder.is_closed(),
                None => self.reply.is_none(),
            }
    }
}

/// Handle on an invitation waiting for the invitee.
#[derive(Debug)]
pub struct InviteTicket {
    id: u64,
    session: SessionId,
    owner: HeroId,
    target: HeroId,
    reply: oneshot::Receiver<InviteReply>,
    window: Duration,
}

impl InviteTicket {
    /// Time the invitee has to answer.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Waits for the answer, at most for the invite window.
    pub async fn wait(self) -> SettledInvite {
        let outcome = await_reply(self.reply, self.window).await;
        SettledInvite {
            id: self.id,
            session: self.session,
            owner: self.owner,
            target: self.target,
            outcome,
        }
    }

    /// Settles the ticket without waiting when the invitee already answered.
    pub fn try_settle(&mut self) -> Option<SettledInvite> {
        let outcome = match self.reply.try_recv() {
            Ok(InviteReply::Accept) => InviteOutcome::Accepted,
            Ok(InviteReply::Decline) | Err(oneshot::error::TryRecvError::Closed) => {
                InviteOutcome::Declined
            }
            Err(oneshot::error::TryRecvError::Empty) => return None,
        };
        Some(SettledInvite {
            id: self.id,
            session: self.session.clone(),
            owner: self.owner.clone(),
            target: self.target.clone(),
            outcome,
        })
    }
}

/// Result of waiting on an [`InviteTicket`], handed to
/// [`DungeonService::conclude_invite`].
///
/// Only a ticket can produce one, so acceptance always stems from the
/// invitee's own reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettledInvite {
    id: u64,
    session: SessionId,
    owner: HeroId,
    target: HeroId,
    outcome: InviteOutcome,
}

impl SettledInvite {
    /// How the wait ended.
    #[must_use]
    pub const fn outcome(&self) -> InviteOutcome {
        self.outcome
    }

    /// Session the invite was sent for.
    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    /// Invited hero.
    #[must_use]
    pub const fn target(&self) -> &HeroId {
        &self.target
    }
}

/// Orchestrates sessions, tiles, parties and movement.
#[derive(Debug)]
pub struct DungeonService<B, C = SystemClock> {
    world: World,
    catalogs: Catalogs,
    spawning: Spawning,
    placement: Placement,
    movement: Movement,
    party: Party,
    rng: ChaCha8Rng,
    pending: HashMap<HeroId, PendingInvite>,
    next_invite: u64,
    broadcast: B,
    clock: C,
}

impl<B: Broadcast, C: Clock> DungeonService<B, C> {
    /// Creates a service with an empty world.
    pub fn new(config: &ServiceConfig, catalogs: Catalogs, broadcast: B, clock: C) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            world: World::new(),
            catalogs,
            spawning: Spawning::new(config.spawning()),
            placement: Placement::new(config.placement()),
            movement: Movement,
            party: Party::new(config.party()),
            rng,
            pending: HashMap::new(),
            next_invite: 0,
            broadcast,
            clock,
        }
    }

    /// Broadcast capability messages are published through.
    #[must_use]
    pub fn broadcast(&self) -> &B {
        &self.broadcast
    }

    /// Read access to the authoritative world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Dungeons heroes may open sessions for.
    #[must_use]
    pub fn dungeons(&self) -> &[DungeonEntry] {
        self.catalogs.dungeons.list()
    }

    /// Opens a session for `owner`, builds its map and seats the owner.
    ///
    /// If the map cannot be built the new session is abandoned and torn down
    /// before the error is returned, so the owner is free to retry.
    pub fn create_session(
        &mut self,
        owner: &HeroId,
        dungeon: &DungeonId,
        difficulty: Difficulty,
    ) -> Result<SessionView, EngineError> {
        let result = self.open_session(owner, dungeon, difficulty);
        self.report(owner, result)
    }

    /// Materializes tiles and monsters once, then moves the session to `in-progress`.
    ///
    /// Calling it again on a built session changes nothing. A map without free
    /// ground is refused before any tile is written.
    pub fn build_map(&mut self, session: &SessionId, map: &MapId) -> Result<(), EngineError> {
        let snapshot = self.snapshot(session)?;
        let plan = plan_build(&snapshot, self.tiles(session)?)?;

        if plan.needs_seeding() {
            let definition = self.catalogs.maps.load_map(map).map_err(catalog_error)?;
            let tile_plan = materialize(definition);
            check_room(&tile_plan)?;
            let _ = self.execute(vec![Command::MaterializeTiles {
                session: session.clone(),
                plan: tile_plan,
            }])?;

            let mut commands = Vec::new();
            let tiles = query::tile_view(&self.world, session)
                .ok_or_else(|| EngineError::SessionNotFound(session.clone()))?;
            self.spawning.handle(
                session,
                tiles,
                &self.catalogs.monsters,
                snapshot.difficulty,
                &mut self.rng,
                &mut commands,
            )?;
            let events = self.execute(commands)?;
            let monsters = events
                .iter()
                .map(|event| match event {
                    Event::MonstersSpawned { monsters, .. } => monsters.len(),
                    _ => 0,
                })
                .sum::<usize>();
            info!(session = %session, map = %map, monsters, "map built");
        }

        if let Some(command) = plan.start_command(session, self.now()) {
            let _ = self.execute(vec![command])?;
            info!(session = %session, "session started");
        }
        Ok(())
    }

    /// Seats a party member on free ground; seating a seated hero is a no-op.
    pub fn place_hero(&mut self, session: &SessionId, hero: &HeroId) -> Result<Tile, EngineError> {
        let result = self
            .check_playable(session, hero)
            .and_then(|()| self.seat(session, hero));
        self.report(hero, result)
    }

    /// Reconnect path: builds the map if needed, seats the hero and returns the view.
    pub fn enter_session(
        &mut self,
        session: &SessionId,
        hero: &HeroId,
    ) -> Result<SessionView, EngineError> {
        let result = self.enter(session, hero);
        self.report(hero, result)
    }

    /// Moves a hero one step, diagonals included.
    pub fn move_hero(
        &mut self,
        session: &SessionId,
        hero: &HeroId,
        target: GridCoord,
    ) -> Result<MoveOutcome, EngineError> {
        let result = self.walk(session, hero, target);
        self.report_with(hero, result, Some(json!({ "target": target })))
    }

    /// Validates an invitation and delivers it to the target's channel.
    ///
    /// The returned ticket resolves once the target answers or the window
    /// elapses; hand what it settles to [`Self::conclude_invite`].
    pub fn open_invite(
        &mut self,
        session: &SessionId,
        owner: &HeroId,
        target: &HeroId,
    ) -> Result<InviteTicket, EngineError> {
        let result = self.issue_invite(session, owner, target);
        self.report(owner, result)
    }

    /// Delivers the answer of an invited hero.
    ///
    /// Only the first answer given inside the window counts.
    pub fn respond_invite(&mut self, hero: &HeroId, reply: InviteReply) -> Result<(), EngineError> {
        let result = self.answer(hero, reply);
        self.report(hero, result)
    }

    /// Settles an invitation once its ticket resolved.
    ///
    /// The invite must still be pending. Acceptance is validated again, since
    /// the party or the invitee may have changed while the invite was open.
    pub fn conclude_invite(&mut self, settled: SettledInvite) -> Result<InviteOutcome, EngineError> {
        let owner = settled.owner.clone();
        let result = self.settle(settled);
        self.report(&owner, result)
    }

    /// Removes a member from the party; only the owner may do so.
    pub fn kick(
        &mut self,
        session: &SessionId,
        owner: &HeroId,
        target: &HeroId,
    ) -> Result<(), EngineError> {
        let result = self.remove_member(session, owner, target);
        self.report(owner, result)
    }

    /// Ends the session for everyone when called by the owner, or leaves it otherwise.
    pub fn end_session(
        &mut self,
        session: &SessionId,
        hero: &HeroId,
        status: SessionStatus,
    ) -> Result<EndPlan, EngineError> {
        let result = self.finish(session, hero, status);
        self.report(hero, result)
    }

    /// Full tile set plus the hero's position, grid and remaining time.
    pub fn session_view(&self, session: &SessionId, hero: &HeroId) -> Result<SessionView, EngineError> {
        let result = self.build_view(session, hero);
        self.report(hero, result)
    }

    /// Party of the session, owner first.
    pub fn party_members(&self, session: &SessionId) -> Result<Vec<HeroId>, EngineError> {
        let party = self.party_view(session)?;
        let owner = party.owner();
        let mut members = vec![owner.clone()];
        members.extend(party.members().filter(|member| *member != owner).cloned());
        Ok(members)
    }

    fn open_session(
        &mut self,
        owner: &HeroId,
        dungeon: &DungeonId,
        difficulty: Difficulty,
    ) -> Result<SessionView, EngineError> {
        let entry = self.catalogs.dungeons.get(dungeon).map_err(catalog_error)?;
        let (map, duration) = (entry.map.clone(), entry.duration());
        let grid = self
            .catalogs
            .maps
            .load_map(&map)
            .map_err(catalog_error)?
            .dimensions();
        check_can_open(owner, query::engagement(&self.world, owner))?;

        let created_at = self.now();
        let events = self.execute(vec![Command::OpenSession {
            dungeon: dungeon.clone(),
            map: map.clone(),
            owner: owner.clone(),
            difficulty,
            duration,
            grid,
            created_at,
        }])?;
        let session = events
            .into_iter()
            .find_map(|event| match event {
                Event::SessionOpened { session, .. } => Some(session),
                _ => None,
            })
            .ok_or_else(|| EngineError::Internal("session was not opened".to_owned()))?;
        info!(session = %session, owner = %owner, dungeon = %dungeon, ?difficulty, "session created");

        let prepared = self
            .build_map(&session, &map)
            .and_then(|()| self.seat(&session, owner));
        if let Err(error) = prepared {
            warn!(session = %session, %error, "session setup failed, abandoning");
            let at = self.now();
            let _ = self.execute(vec![
                Command::SetSessionStatus {
                    session: session.clone(),
                    status: SessionStatus::Abandoned,
                    at,
                },
                Command::TearDownSession { session },
            ]);
            return Err(error);
        }

        self.build_view(&session, owner)
    }

    fn enter(&mut self, session: &SessionId, hero: &HeroId) -> Result<SessionView, EngineError> {
        self.check_playable(session, hero)?;
        let map = self.snapshot(session)?.map;
        self.build_map(session, &map)?;
        let _ = self.seat(session, hero)?;
        self.build_view(session, hero)
    }

    fn seat(&mut self, session: &SessionId, hero: &HeroId) -> Result<Tile, EngineError> {
        let mut commands = Vec::new();
        let decision = self
            .placement
            .handle(session, self.tiles(session)?, hero, &mut commands);
        let placed = !commands.is_empty();
        let _ = self.execute(commands)?;

        let tile = self
            .tiles(session)?
            .hero_tile(hero)
            .cloned()
            .ok_or_else(|| EngineError::Internal(format!("hero {hero} was not seated")))?;
        if placed {
            debug!(session = %session, hero = %hero, ?decision, coord = %tile.coord, "hero seated");
            self.broadcast.publish_to_session(
                session,
                Outbound::TileDelta {
                    tiles: vec![tile.clone()],
                },
            );
        }
        Ok(tile)
    }

    fn walk(
        &mut self,
        session: &SessionId,
        hero: &HeroId,
        target: GridCoord,
    ) -> Result<MoveOutcome, EngineError> {
        self.check_playable(session, hero)?;
        let mut commands = Vec::new();
        let _ = self
            .movement
            .handle(session, self.tiles(session)?, hero, target, &mut commands)?;
        let events = self.execute(commands)?;

        let outcome = events
            .into_iter()
            .find_map(|event| match event {
                Event::HeroMoved {
                    origin,
                    destination,
                    ..
                } => Some(MoveOutcome {
                    origin,
                    destination,
                }),
                _ => None,
            })
            .ok_or_else(|| EngineError::Internal("move was not applied".to_owned()))?;
        debug!(
            session = %session,
            hero = %hero,
            from = %outcome.origin.coord,
            to = %outcome.destination.coord,
            "hero moved"
        );
        self.broadcast.publish_to_session(
            session,
            Outbound::HeroMoved {
                hero: hero.clone(),
                origin: outcome.origin.clone(),
                destination: outcome.destination.clone(),
            },
        );
        Ok(outcome)
    }

    fn issue_invite(
        &mut self,
        session: &SessionId,
        owner: &HeroId,
        target: &HeroId,
    ) -> Result<InviteTicket, EngineError> {
        check_active(&self.snapshot(session)?)?;
        self.party.check_invite(
            self.party_view(session)?,
            owner,
            target,
            query::engagement(&self.world, target),
        )?;
        let now = self.now();
        self.pending.retain(|hero, pending| {
            let stale = pending.stale(now);
            if stale {
                debug!(hero = %hero, session = %pending.session, "dropping stale invite");
            }
            !stale
        });
        if self.pending.contains_key(target) {
            return Err(EngineError::InvitePending(target.clone()));
        }

        let (responder, reply) = oneshot::channel();
        let window = self.party.config().invite_window();
        let id = self.next_invite;
        self.next_invite += 1;
        let _ = self.pending.insert(
            target.clone(),
            PendingInvite {
                id,
                session: session.clone(),
                from: owner.clone(),
                sent_at: now,
                window,
                responder: Some(responder),
                reply: None,
            },
        );
        self.broadcast.publish_to_hero(
            target,
            Outbound::PartyInvite {
                session: session.clone(),
                from: owner.clone(),
                expires_in_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
            },
        );
        info!(session = %session, owner = %owner, target = %target, "invite sent");
        Ok(InviteTicket {
            id,
            session: session.clone(),
            owner: owner.clone(),
            target: target.clone(),
            reply,
            window,
        })
    }

    fn answer(&mut self, hero: &HeroId, reply: InviteReply) -> Result<(), EngineError> {
        let now = self.now();
        let not_found = || EngineError::InviteNotFound(hero.clone());
        let pending = self
            .pending
            .get_mut(hero)
            .filter(|pending| pending.awaits_reply(now))
            .ok_or_else(not_found)?;
        let responder = pending.responder.take().ok_or_else(not_found)?;
        responder.send(reply).map_err(|_| not_found())?;
        pending.reply = Some(reply);
        debug!(
            hero = %hero,
            from = %pending.from,
            session = %pending.session,
            ?reply,
            "invite answered"
        );
        Ok(())
    }

    fn settle(&mut self, settled: SettledInvite) -> Result<InviteOutcome, EngineError> {
        let SettledInvite {
            id,
            session,
            owner,
            target,
            outcome,
        } = settled;
        let pending = match self.pending.remove(&target) {
            Some(pending) if pending.id == id => pending,
            other => {
                if let Some(pending) = other {
                    let _ = self.pending.insert(target.clone(), pending);
                }
                return Err(EngineError::InviteNotFound(target));
            }
        };
        let outcome = match pending.reply {
            Some(InviteReply::Accept) => InviteOutcome::Accepted,
            Some(InviteReply::Decline) => InviteOutcome::Declined,
            None => outcome,
        };

        let text = match outcome {
            InviteOutcome::Accepted => {
                self.admit(&session, &owner, &target)?;
                return Ok(outcome);
            }
            InviteOutcome::Declined => format!("{target} declined the invite."),
            InviteOutcome::TimedOut => format!("{target} did not answer the invite in time."),
        };
        info!(session = %session, target = %target, ?outcome, "invite closed");
        self.broadcast.publish_to_hero(
            &owner,
            Outbound::System(SystemMessage::new(MessageKind::Info, text, self.now())),
        );
        Ok(outcome)
    }

    fn admit(&mut self, session: &SessionId, owner: &HeroId, target: &HeroId) -> Result<(), EngineError> {
        check_active(&self.snapshot(session)?)?;
        self.party.check_invite(
            self.party_view(session)?,
            owner,
            target,
            query::engagement(&self.world, target),
        )?;

        let mut commands = Vec::new();
        self.party.admit(session, target, &mut commands);
        let _ = self.execute(commands)?;

        info!(session = %session, hero = %target, "hero joined party");
        self.broadcast.publish_to_hero(
            target,
            Outbound::PartyRefresh {
                session: session.clone(),
            },
        );
        self.notify(session, MessageKind::Success, format!("{target} joined the party."));
        Ok(())
    }

    fn remove_member(
        &mut self,
        session: &SessionId,
        owner: &HeroId,
        target: &HeroId,
    ) -> Result<(), EngineError> {
        self.party
            .check_kick(self.party_view(session)?, owner, target)?;
        let mut commands = Vec::new();
        self.party.kick(session, target, &mut commands);
        let events = self.execute(commands)?;

        info!(session = %session, hero = %target, "hero kicked");
        self.publish_vacated(session, events);
        self.notify(
            session,
            MessageKind::Info,
            format!("{target} was removed from the party."),
        );
        self.broadcast.publish_to_hero(
            target,
            Outbound::PartyKicked {
                session: session.clone(),
            },
        );
        Ok(())
    }

    fn finish(
        &mut self,
        session: &SessionId,
        hero: &HeroId,
        status: SessionStatus,
    ) -> Result<EndPlan, EngineError> {
        let snapshot = self.snapshot(session)?;
        let plan = plan_end(&snapshot, self.party_view(session)?, hero, status)?;
        let mut commands = Vec::new();
        plan.commands(session, hero, self.now(), &mut commands);
        let events = self.execute(commands)?;

        match plan {
            EndPlan::TearDown(status) => {
                self.pending.retain(|_, pending| &pending.session != session);
                info!(session = %session, %status, "session ended");
                self.broadcast.publish_to_session(
                    session,
                    Outbound::SessionEnded {
                        session: session.clone(),
                        status,
                    },
                );
                self.broadcast.close_session(session);
            }
            EndPlan::Leave => {
                info!(session = %session, hero = %hero, "hero left session");
                self.publish_vacated(session, events);
                self.notify(session, MessageKind::Info, format!("{hero} left the party."));
            }
        }
        Ok(plan)
    }

    fn build_view(&self, session: &SessionId, hero: &HeroId) -> Result<SessionView, EngineError> {
        let snapshot = self.snapshot(session)?;
        check_member(self.party_view(session)?, hero)?;
        let tiles = self.tiles(session)?;

        let time_remaining = if snapshot.status.is_terminal() {
            Duration::ZERO
        } else {
            snapshot.time_remaining(self.now())
        };
        let hero_position = tiles.hero_tile(hero).map(|tile| tile.coord);
        let monsters = query::monsters(&self.world, session)
            .unwrap_or_default()
            .to_vec();
        Ok(SessionView {
            session: snapshot,
            tiles: tiles.iter().cloned().collect(),
            monsters,
            hero: hero.clone(),
            hero_position,
            time_remaining,
        })
    }

    fn check_playable(&self, session: &SessionId, hero: &HeroId) -> Result<(), EngineError> {
        check_active(&self.snapshot(session)?)?;
        check_member(self.party_view(session)?, hero)
    }

    fn publish_vacated(&self, session: &SessionId, events: Vec<Event>) {
        let tiles: Vec<Tile> = events
            .into_iter()
            .filter_map(|event| match event {
                Event::HeroReleased { vacated, .. } => vacated,
                _ => None,
            })
            .collect();
        if !tiles.is_empty() {
            self.broadcast
                .publish_to_session(session, Outbound::TileDelta { tiles });
        }
    }

    fn notify(&self, session: &SessionId, kind: MessageKind, text: String) {
        self.broadcast.publish_to_session(
            session,
            Outbound::System(SystemMessage::new(kind, text, self.now())),
        );
    }

    fn report<T>(&self, hero: &HeroId, result: Result<T, EngineError>) -> Result<T, EngineError> {
        self.report_with(hero, result, None)
    }

    fn report_with<T>(
        &self,
        hero: &HeroId,
        result: Result<T, EngineError>,
        payload: Option<Value>,
    ) -> Result<T, EngineError> {
        if let Err(error) = &result {
            warn!(hero = %hero, kind = ?error.kind(), %error, "request rejected");
            let notice = SystemMessage::new(MessageKind::Error, error.user_message(), self.now());
            let notice = match payload {
                Some(payload) => notice.with_payload(payload),
                None => notice,
            };
            self.broadcast
                .publish_to_hero(hero, Outbound::System(notice));
        }
        result
    }

    fn execute(&mut self, commands: Vec<Command>) -> Result<Vec<Event>, EngineError> {
        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
            if let Some(Event::CommandRejected { reason }) = events.last() {
                warn!(%reason, "store refused command");
                return Err(EngineError::from(reason.clone()));
            }
        }
        Ok(events)
    }

    fn snapshot(&self, session: &SessionId) -> Result<SessionSnapshot, EngineError> {
        query::session(&self.world, session)
            .cloned()
            .ok_or_else(|| EngineError::SessionNotFound(session.clone()))
    }

    fn tiles(&self, session: &SessionId) -> Result<TileView<'_>, EngineError> {
        query::tile_view(&self.world, session)
            .ok_or_else(|| EngineError::SessionNotFound(session.clone()))
    }

    fn party_view(&self, session: &SessionId) -> Result<PartyView<'_>, EngineError> {
        query::party_view(&self.world, session)
            .ok_or_else(|| EngineError::SessionNotFound(session.clone()))
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }
}

/// Runs a complete invitation without holding the service lock while waiting.
pub async fn invite<B: Broadcast, C: Clock>(
    service: &Mutex<DungeonService<B, C>>,
    session: &SessionId,
    owner: &HeroId,
    target: &HeroId,
) -> Result<InviteOutcome, EngineError> {
    let ticket = service.lock().await.open_invite(session, owner, target)?;
    let settled = ticket.wait().await;
    service.lock().await.conclude_invite(settled)
}

fn catalog_error(error: CatalogError) -> EngineError {
    match error {
        CatalogError::MapNotFound(map) => EngineError::MapNotFound(map),
        CatalogError::DungeonNotFound(dungeon) => EngineError::DungeonNotFound(dungeon),
        other => EngineError::Internal(other.to_string()),
    }
}
