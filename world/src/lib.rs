#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session store for the dungeon engine.
//!
//! The world owns every session together with its tiles, monsters and party
//! memberships. It mutates only through [`apply`], which either performs the
//! whole command or emits [`Event::CommandRejected`] without writing anything.
//! Because `apply` takes the world exclusively, paired writes such as a hero
//! move are never observable half-done.

use std::collections::BTreeMap;

use dungeon_core::{
    Command, Event, GridCoord, HeroId, Monster, MonsterId, MonsterSpawn, Rejection, SessionId,
    SessionSnapshot, SessionStatus, Tile, TileId, TileKind, TilePlan, TileSeed,
};

/// Represents the authoritative store of dungeon sessions.
#[derive(Debug, Default)]
pub struct World {
    next_id: u64,
    sessions: BTreeMap<SessionId, SessionRecord>,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, prefix: &str) -> String {
        self.next_id = self.next_id.saturating_add(1);
        format!("{prefix}-{:06x}", self.next_id)
    }
}

#[derive(Debug)]
struct SessionRecord {
    snapshot: SessionSnapshot,
    tiles: Vec<Tile>,
    monsters: Vec<Monster>,
    members: Vec<HeroId>,
}

impl SessionRecord {
    fn is_member(&self, hero: &HeroId) -> bool {
        self.members.contains(hero)
    }

    fn tile_index(&self, id: &TileId) -> Option<usize> {
        self.tiles.iter().position(|tile| &tile.id == id)
    }

    fn hero_tile_index(&self, hero: &HeroId) -> Option<usize> {
        self.tiles
            .iter()
            .position(|tile| tile.hero.as_ref() == Some(hero))
    }

    fn cell_blocked(&self, coord: GridCoord) -> bool {
        self.tiles
            .iter()
            .any(|tile| tile.coord == coord && tile.kind != TileKind::Decor && tile.blocks_movement())
    }

    fn vacate(&mut self, hero: &HeroId) -> Option<Tile> {
        let index = self.hero_tile_index(hero)?;
        if self.tiles[index].kind == TileKind::Hero {
            let mut marker = self.tiles.remove(index);
            marker.hero = None;
            return Some(marker);
        }
        self.tiles[index].hero = None;
        Some(self.tiles[index].clone())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::OpenSession {
            dungeon,
            map,
            owner,
            difficulty,
            duration,
            grid,
            created_at,
        } => {
            let id = SessionId::new(world.allocate("session"));
            let snapshot = SessionSnapshot {
                id: id.clone(),
                dungeon,
                map,
                owner: owner.clone(),
                difficulty,
                duration,
                status: SessionStatus::Created,
                created_at,
                ended_at: None,
                grid,
            };
            let record = SessionRecord {
                snapshot,
                tiles: Vec::new(),
                monsters: Vec::new(),
                members: vec![owner.clone()],
            };
            let _ = world.sessions.insert(id.clone(), record);
            out_events.push(Event::SessionOpened { session: id, owner });
        }
        Command::SetSessionStatus {
            session,
            status,
            at,
        } => {
            let Some(record) = world.sessions.get_mut(&session) else {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            };
            let from = record.snapshot.status;
            if !from.can_transition_to(status) {
                reject(
                    out_events,
                    Rejection::InvalidTransition { from, to: status },
                );
                return;
            }
            record.snapshot.status = status;
            if status.is_terminal() {
                record.snapshot.ended_at = Some(at);
            }
            out_events.push(Event::SessionStatusChanged {
                session,
                from,
                to: status,
            });
        }
        Command::MaterializeTiles { session, plan } => {
            if !world.sessions.contains_key(&session) {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            }
            let already_materialized = world
                .sessions
                .get(&session)
                .is_some_and(|record| !record.tiles.is_empty());
            if already_materialized {
                reject(out_events, Rejection::AlreadyMaterialized(session));
                return;
            }

            let tiles = build_tiles(world, &session, plan);
            let count = tiles.len();
            if let Some(record) = world.sessions.get_mut(&session) {
                record.tiles = tiles;
            }
            out_events.push(Event::TilesMaterialized { session, count });
        }
        Command::SpawnMonsters { session, monsters } => {
            let Some(record) = world.sessions.get(&session) else {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            };
            if let Err(reason) = validate_spawns(record, &monsters) {
                reject(out_events, reason);
                return;
            }

            let ids: Vec<MonsterId> = monsters
                .iter()
                .map(|_| MonsterId::new(world.allocate("monster")))
                .collect();
            let Some(record) = world.sessions.get_mut(&session) else {
                return;
            };
            for (id, spawn) in ids.iter().zip(monsters) {
                if let Some(index) = record.tile_index(&spawn.tile) {
                    record.tiles[index].monster = Some(id.clone());
                }
                record.monsters.push(Monster {
                    id: id.clone(),
                    template: spawn.template,
                    name: spawn.name,
                    health: spawn.health,
                    mana: spawn.mana,
                    rarity: spawn.rarity,
                    tile: spawn.tile,
                });
            }
            out_events.push(Event::MonstersSpawned {
                session,
                monsters: ids,
            });
        }
        Command::BindHero {
            session,
            hero,
            tile,
        } => {
            let Some(record) = world.sessions.get_mut(&session) else {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            };
            if let Err(reason) = check_can_seat(record, &hero) {
                reject(out_events, reason);
                return;
            }
            let Some(index) = record.tile_index(&tile) else {
                reject(out_events, Rejection::UnknownTile(tile));
                return;
            };
            if !record.tiles[index].is_free_ground() {
                reject(out_events, Rejection::TileBusy(tile));
                return;
            }
            record.tiles[index].hero = Some(hero.clone());
            let placed = record.tiles[index].clone();
            out_events.push(Event::HeroPlaced {
                session,
                hero,
                tile: placed,
            });
        }
        Command::PlaceHeroMarker {
            session,
            hero,
            coord,
        } => {
            let Some(record) = world.sessions.get(&session) else {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            };
            if let Err(reason) = check_can_seat(record, &hero) {
                reject(out_events, reason);
                return;
            }
            let grid = record.snapshot.grid;
            let id = TileId::new(world.allocate("tile"));
            let marker = Tile {
                id,
                session: session.clone(),
                kind: TileKind::Hero,
                coord,
                gid: 0,
                width: grid.tile_width,
                height: grid.tile_height,
                object: None,
                hero: Some(hero.clone()),
                monster: None,
            };
            if let Some(record) = world.sessions.get_mut(&session) {
                record.tiles.push(marker.clone());
            }
            out_events.push(Event::HeroPlaced {
                session,
                hero,
                tile: marker,
            });
        }
        Command::MoveHero {
            session,
            hero,
            from,
            to,
            target,
        } => {
            let Some(record) = world.sessions.get_mut(&session) else {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            };
            if !record.is_member(&hero) {
                reject(out_events, Rejection::NotMember(hero));
                return;
            }
            let Some(from_index) = record.tile_index(&from) else {
                reject(out_events, Rejection::UnknownTile(from));
                return;
            };
            if record.tiles[from_index].hero.as_ref() != Some(&hero) {
                reject(out_events, Rejection::NotOnTile { hero, tile: from });
                return;
            }
            let Some(to_index) = record.tile_index(&to) else {
                reject(out_events, Rejection::UnknownTile(to));
                return;
            };
            if record.tiles[to_index].blocks_movement() || record.cell_blocked(target) {
                reject(out_events, Rejection::TileBusy(to));
                return;
            }

            record.tiles[from_index].hero = None;
            record.tiles[to_index].hero = Some(hero.clone());
            record.tiles[to_index].coord = target;
            let origin = record.tiles[from_index].clone();
            let destination = record.tiles[to_index].clone();
            if origin.kind == TileKind::Hero {
                let _ = record.tiles.remove(from_index);
            }
            out_events.push(Event::HeroMoved {
                session,
                hero,
                origin,
                destination,
            });
        }
        Command::AdmitMember { session, hero } => {
            let Some(record) = world.sessions.get_mut(&session) else {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            };
            if record.is_member(&hero) {
                reject(out_events, Rejection::AlreadyMember(hero));
                return;
            }
            record.members.push(hero.clone());
            out_events.push(Event::MemberAdmitted { session, hero });
        }
        Command::ReleaseHero { session, hero } => {
            let Some(record) = world.sessions.get_mut(&session) else {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            };
            if !record.is_member(&hero) {
                reject(out_events, Rejection::NotMember(hero));
                return;
            }
            let vacated = record.vacate(&hero);
            record.members.retain(|member| member != &hero);
            out_events.push(Event::HeroReleased {
                session,
                hero,
                vacated,
            });
        }
        Command::TearDownSession { session } => {
            let Some(record) = world.sessions.get_mut(&session) else {
                reject(out_events, Rejection::UnknownSession(session));
                return;
            };
            let tiles_removed = record.tiles.len();
            let monsters_removed = record.monsters.len();
            let members_removed = record.members.len();
            record.tiles.clear();
            record.monsters.clear();
            record.members.clear();
            out_events.push(Event::SessionTornDown {
                session,
                tiles_removed,
                monsters_removed,
                members_removed,
            });
        }
    }
}

fn reject(out_events: &mut Vec<Event>, reason: Rejection) {
    out_events.push(Event::CommandRejected { reason });
}

fn check_can_seat(record: &SessionRecord, hero: &HeroId) -> Result<(), Rejection> {
    if !record.is_member(hero) {
        return Err(Rejection::NotMember(hero.clone()));
    }
    if let Some(index) = record.hero_tile_index(hero) {
        return Err(Rejection::TileBusy(record.tiles[index].id.clone()));
    }
    Ok(())
}

fn validate_spawns(record: &SessionRecord, monsters: &[MonsterSpawn]) -> Result<(), Rejection> {
    for (position, spawn) in monsters.iter().enumerate() {
        let Some(index) = record.tile_index(&spawn.tile) else {
            return Err(Rejection::UnknownTile(spawn.tile.clone()));
        };
        let shared = monsters[..position]
            .iter()
            .any(|earlier| earlier.tile == spawn.tile);
        if shared || !record.tiles[index].is_free_ground() {
            return Err(Rejection::TileBusy(spawn.tile.clone()));
        }
    }
    Ok(())
}

fn build_tiles(world: &mut World, session: &SessionId, plan: TilePlan) -> Vec<Tile> {
    let mut tiles = Vec::with_capacity(plan.len());

    let mut blocking_ids = Vec::with_capacity(plan.blocking.len());
    for seed in plan.blocking {
        let tile = seed_tile(world, session, seed, None);
        blocking_ids.push(tile.id.clone());
        tiles.push(tile);
    }

    for ground in plan.ground {
        let object = ground
            .covered_by
            .and_then(|index| blocking_ids.get(index).cloned());
        tiles.push(seed_tile(world, session, ground.seed, object));
    }

    for seed in plan.decor {
        tiles.push(seed_tile(world, session, seed, None));
    }

    tiles
}

fn seed_tile(world: &mut World, session: &SessionId, seed: TileSeed, object: Option<TileId>) -> Tile {
    Tile {
        id: TileId::new(world.allocate("tile")),
        session: session.clone(),
        kind: seed.kind,
        coord: seed.coord,
        gid: seed.gid,
        width: seed.width,
        height: seed.height,
        object,
        hero: None,
        monster: None,
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use dungeon_core::{
        GridCoord, HeroId, Monster, PartyView, SessionId, SessionSnapshot, TileView,
    };

    use super::World;

    /// Looks up a session.
    #[must_use]
    pub fn session<'a>(world: &'a World, id: &SessionId) -> Option<&'a SessionSnapshot> {
        world.sessions.get(id).map(|record| &record.snapshot)
    }

    /// Iterator over every session in identifier order.
    pub fn sessions(world: &World) -> impl Iterator<Item = &SessionSnapshot> {
        world.sessions.values().map(|record| &record.snapshot)
    }

    /// Captures a read-only view of a session's tiles.
    #[must_use]
    pub fn tile_view<'a>(world: &'a World, id: &SessionId) -> Option<TileView<'a>> {
        world
            .sessions
            .get(id)
            .map(|record| TileView::new(&record.tiles))
    }

    /// Captures a read-only view of a session's party.
    #[must_use]
    pub fn party_view<'a>(world: &'a World, id: &SessionId) -> Option<PartyView<'a>> {
        world
            .sessions
            .get(id)
            .map(|record| PartyView::new(&record.snapshot.owner, &record.members))
    }

    /// Monsters living in a session.
    #[must_use]
    pub fn monsters<'a>(world: &'a World, id: &SessionId) -> Option<&'a [Monster]> {
        world
            .sessions
            .get(id)
            .map(|record| record.monsters.as_slice())
    }

    /// Coordinate of the tile carrying the hero within the session.
    #[must_use]
    pub fn hero_position(world: &World, session: &SessionId, hero: &HeroId) -> Option<GridCoord> {
        tile_view(world, session)?
            .hero_tile(hero)
            .map(|tile| tile.coord)
    }

    /// Active session the hero owns or belongs to, if any.
    #[must_use]
    pub fn engagement<'a>(world: &'a World, hero: &HeroId) -> Option<&'a SessionId> {
        world
            .sessions
            .values()
            .filter(|record| record.snapshot.status.is_active())
            .find(|record| &record.snapshot.owner == hero || record.is_member(hero))
            .map(|record| &record.snapshot.id)
    }
}
