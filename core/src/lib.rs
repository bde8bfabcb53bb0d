#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the dungeon session engine.
//!
//! This crate defines the message surface that connects the service, the
//! authoritative world, and pure systems. The service submits [`Command`]
//! values describing desired store mutations, the world executes those
//! commands via its `apply` entry point, and then reports [`Event`] values
//! describing what changed. Systems read immutable [`TileView`] and
//! [`PartyView`] snapshots and answer with new commands or an
//! [`EngineError`] explaining why the request cannot proceed.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of heroes a party may hold, owner included.
pub const DEFAULT_PARTY_CAPACITY: usize = 3;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps the provided opaque identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id! {
    /// Opaque identifier of a dungeon session.
    SessionId
}

string_id! {
    /// Opaque identifier of a hero.
    HeroId
}

string_id! {
    /// Opaque identifier of a tile within a session.
    TileId
}

string_id! {
    /// Opaque identifier of a monster within a session.
    MonsterId
}

string_id! {
    /// Opaque identifier of a dungeon entry in the catalog.
    DungeonId
}

string_id! {
    /// Opaque identifier of a static map definition.
    MapId
}

/// Location of a single grid cell expressed as column (`x`) and row (`y`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    x: u32,
    y: u32,
}

impl GridCoord {
    /// Creates a new grid coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Chebyshev distance between two coordinates.
    ///
    /// Diagonal neighbours are one step apart, matching the single-step bound
    /// enforced on hero movement.
    #[must_use]
    pub fn chebyshev_distance(self, other: GridCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Orders coordinates row-major, the order tiles appear in dense layers.
    #[must_use]
    pub fn row_major_key(self) -> (u32, u32) {
        (self.y, self.x)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid dimensions and tile size captured from a map when a session opens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    /// Number of columns in the grid.
    pub width: u32,
    /// Number of rows in the grid.
    pub height: u32,
    /// Width of a single tile in pixels.
    pub tile_width: u32,
    /// Height of a single tile in pixels.
    pub tile_height: u32,
}

impl GridDimensions {
    /// Reports whether the coordinate lies within the grid.
    #[must_use]
    pub const fn contains(&self, coord: GridCoord) -> bool {
        coord.x < self.width && coord.y < self.height
    }
}

/// Logical type of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    /// Walkable floor; the only kind heroes and monsters are placed on.
    Ground,
    /// Solid wall.
    Wall,
    /// Cosmetic overlay that never takes part in movement.
    Decor,
    /// Placed object such as a chest or a pillar.
    Object,
    /// Marker tile created when a hero could not be seated on free ground.
    Hero,
}

impl TileKind {
    /// Maps a dense layer name onto the tile kind it produces.
    #[must_use]
    pub fn from_layer_name(name: &str) -> Option<Self> {
        match name {
            "ground" => Some(Self::Ground),
            "wall" => Some(Self::Wall),
            "decor" => Some(Self::Decor),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Wall and object tiles block movement by themselves.
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::Wall | Self::Object)
    }

    /// Lowercase label used in logs and rendered views.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::Wall => "wall",
            Self::Decor => "decor",
            Self::Object => "object",
            Self::Hero => "hero",
        }
    }
}

/// Persisted state of one grid cell within a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Identifier allocated by the world.
    pub id: TileId,
    /// Session that owns the tile.
    pub session: SessionId,
    /// Logical type of the tile.
    pub kind: TileKind,
    /// Grid coordinate of the tile.
    pub coord: GridCoord,
    /// Zero-based graphic identifier within the map's tileset.
    pub gid: u32,
    /// Tile width in pixels.
    pub width: u32,
    /// Tile height in pixels.
    pub height: u32,
    /// Blocking tile resting on top of this one.
    pub object: Option<TileId>,
    /// Hero standing on the tile.
    pub hero: Option<HeroId>,
    /// Monster standing on the tile.
    pub monster: Option<MonsterId>,
}

impl Tile {
    /// Reports whether any occupant is bound to the tile.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.object.is_some() || self.hero.is_some() || self.monster.is_some()
    }

    /// Reports whether the tile prevents a hero from stepping onto its cell.
    #[must_use]
    pub fn blocks_movement(&self) -> bool {
        self.kind.is_blocking() || self.is_occupied()
    }

    /// Reports whether the tile is ground carrying no occupant at all.
    #[must_use]
    pub fn is_free_ground(&self) -> bool {
        self.kind == TileKind::Ground && !self.is_occupied()
    }
}

/// Tile description produced before the world allocates an identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSeed {
    /// Logical type of the tile.
    pub kind: TileKind,
    /// Grid coordinate of the tile.
    pub coord: GridCoord,
    /// Zero-based graphic identifier.
    pub gid: u32,
    /// Tile width in pixels.
    pub width: u32,
    /// Tile height in pixels.
    pub height: u32,
}

/// Ground tile seed that may rest underneath a blocking seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundSeed {
    /// Ground tile description.
    pub seed: TileSeed,
    /// Index into [`TilePlan::blocking`] of the wall or object sharing the cell.
    pub covered_by: Option<usize>,
}

/// Complete set of tiles materialized for a session, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePlan {
    /// Wall and object tiles, inserted first.
    pub blocking: Vec<TileSeed>,
    /// Ground tiles, linked to the blocking tiles covering them.
    pub ground: Vec<GroundSeed>,
    /// Decor overlays.
    pub decor: Vec<TileSeed>,
}

impl TilePlan {
    /// Total number of tiles described by the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocking.len() + self.ground.len() + self.decor.len()
    }

    /// Reports whether the plan describes no tiles at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of ground cells no wall or object rests on.
    #[must_use]
    pub fn open_ground(&self) -> usize {
        self.ground
            .iter()
            .filter(|ground| ground.covered_by.is_none())
            .count()
    }
}

/// Session difficulty chosen when the session opens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Common monsters.
    #[default]
    Easy,
    /// Magic monsters.
    Normal,
    /// Rare monsters.
    Hard,
}

impl Difficulty {
    /// Rarity tier assigned to monsters spawned at this difficulty.
    #[must_use]
    pub const fn rarity(self) -> Rarity {
        match self {
            Self::Easy => Rarity::Common,
            Self::Normal => Rarity::Magic,
            Self::Hard => Rarity::Rare,
        }
    }
}

/// Rarity tier of a spawned monster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    /// Baseline monsters.
    Common,
    /// Enhanced monsters.
    Magic,
    /// Elite monsters.
    Rare,
}

/// Lifecycle status of a dungeon session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    /// Recorded but not yet materialized.
    Created,
    /// Materialized and playable.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
    /// Left by its owner before finishing.
    Abandoned,
}

impl SessionStatus {
    /// Terminal states never transition again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Abandoned)
    }

    /// Sessions that still bind their owner and members.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Reports whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: SessionStatus) -> bool {
        match self {
            Self::Created => !matches!(next, Self::Created),
            Self::InProgress => next.is_terminal(),
            Self::Completed | Self::Failed | Self::Abandoned => false,
        }
    }

    /// Kebab-case label used on the wire and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, saturating at zero.
    #[must_use]
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Monster description produced by the spawning system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterSpawn {
    /// Template the monster was instantiated from.
    pub template: String,
    /// Display name copied from the template.
    pub name: String,
    /// Hit points.
    pub health: u32,
    /// Mana points.
    pub mana: u32,
    /// Rarity tier derived from the session difficulty.
    pub rarity: Rarity,
    /// Ground tile the monster is bound to.
    pub tile: TileId,
}

/// Monster living inside a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    /// Identifier allocated by the world.
    pub id: MonsterId,
    /// Template the monster was instantiated from.
    pub template: String,
    /// Display name.
    pub name: String,
    /// Hit points.
    pub health: u32,
    /// Mana points.
    pub mana: u32,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Ground tile the monster is bound to.
    pub tile: TileId,
}

/// Read-only description of a dungeon session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Identifier allocated by the world.
    pub id: SessionId,
    /// Dungeon entry the session was opened for.
    pub dungeon: DungeonId,
    /// Map materialized for the session.
    pub map: MapId,
    /// Hero that opened the session.
    pub owner: HeroId,
    /// Selected difficulty.
    pub difficulty: Difficulty,
    /// Time budget of the session.
    pub duration: Duration,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Moment the session was opened.
    pub created_at: Timestamp,
    /// Moment the session reached a terminal status.
    pub ended_at: Option<Timestamp>,
    /// Grid snapshot taken from the map.
    pub grid: GridDimensions,
}

impl SessionSnapshot {
    /// Time left before the session's budget runs out.
    #[must_use]
    pub fn time_remaining(&self, now: Timestamp) -> Duration {
        self.duration
            .saturating_sub(now.saturating_since(self.created_at))
    }
}

/// Commands that express all permissible store mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Records a new session in the `created` status with its owner as member.
    OpenSession {
        /// Dungeon entry being played.
        dungeon: DungeonId,
        /// Map backing the dungeon.
        map: MapId,
        /// Hero opening the session.
        owner: HeroId,
        /// Selected difficulty.
        difficulty: Difficulty,
        /// Time budget of the session.
        duration: Duration,
        /// Grid snapshot taken from the map.
        grid: GridDimensions,
        /// Moment the session opens.
        created_at: Timestamp,
    },
    /// Moves a session to a new lifecycle status.
    SetSessionStatus {
        /// Session to update.
        session: SessionId,
        /// Requested status.
        status: SessionStatus,
        /// Moment of the transition.
        at: Timestamp,
    },
    /// Inserts a materialized tile plan into a session that has no tiles yet.
    MaterializeTiles {
        /// Session receiving the tiles.
        session: SessionId,
        /// Tiles to insert.
        plan: TilePlan,
    },
    /// Creates monsters and binds each to its ground tile.
    SpawnMonsters {
        /// Session receiving the monsters.
        session: SessionId,
        /// Monsters to create.
        monsters: Vec<MonsterSpawn>,
    },
    /// Seats a hero on an existing free ground tile.
    BindHero {
        /// Session the hero plays in.
        session: SessionId,
        /// Hero being seated.
        hero: HeroId,
        /// Free ground tile chosen for the hero.
        tile: TileId,
    },
    /// Creates a hero marker tile at a fallback coordinate.
    PlaceHeroMarker {
        /// Session the hero plays in.
        session: SessionId,
        /// Hero being seated.
        hero: HeroId,
        /// Coordinate of the marker tile.
        coord: GridCoord,
    },
    /// Swaps hero occupancy between two tiles as one indivisible step.
    MoveHero {
        /// Session the hero plays in.
        session: SessionId,
        /// Hero moving.
        hero: HeroId,
        /// Tile the hero currently occupies.
        from: TileId,
        /// Tile the hero moves onto.
        to: TileId,
        /// Coordinate requested by the hero.
        target: GridCoord,
    },
    /// Adds a hero to a session's party.
    AdmitMember {
        /// Session whose party grows.
        session: SessionId,
        /// Hero joining.
        hero: HeroId,
    },
    /// Clears a hero's occupancy and removes the hero from the party.
    ReleaseHero {
        /// Session the hero leaves.
        session: SessionId,
        /// Hero leaving.
        hero: HeroId,
    },
    /// Deletes every tile, monster and membership of a session.
    TearDownSession {
        /// Session being torn down.
        session: SessionId,
    },
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a session was recorded.
    SessionOpened {
        /// Identifier allocated to the session.
        session: SessionId,
        /// Hero owning the session.
        owner: HeroId,
    },
    /// Confirms a lifecycle transition.
    SessionStatusChanged {
        /// Session that transitioned.
        session: SessionId,
        /// Previous status.
        from: SessionStatus,
        /// New status.
        to: SessionStatus,
    },
    /// Confirms that a tile plan was inserted.
    TilesMaterialized {
        /// Session that received the tiles.
        session: SessionId,
        /// Number of tiles inserted.
        count: usize,
    },
    /// Confirms that monsters were created and bound to tiles.
    MonstersSpawned {
        /// Session that received the monsters.
        session: SessionId,
        /// Identifiers allocated to the monsters.
        monsters: Vec<MonsterId>,
    },
    /// Confirms that a hero was seated.
    HeroPlaced {
        /// Session the hero plays in.
        session: SessionId,
        /// Hero seated.
        hero: HeroId,
        /// Tile now carrying the hero.
        tile: Tile,
    },
    /// Confirms an applied move; both tiles changed together.
    HeroMoved {
        /// Session the hero plays in.
        session: SessionId,
        /// Hero that moved.
        hero: HeroId,
        /// Origin tile after the hero left it.
        origin: Tile,
        /// Destination tile now carrying the hero.
        destination: Tile,
    },
    /// Confirms that a hero joined a party.
    MemberAdmitted {
        /// Session whose party grew.
        session: SessionId,
        /// Hero that joined.
        hero: HeroId,
    },
    /// Confirms that a hero left a party.
    HeroReleased {
        /// Session the hero left.
        session: SessionId,
        /// Hero that left.
        hero: HeroId,
        /// Tile the hero vacated, if the hero had been seated.
        vacated: Option<Tile>,
    },
    /// Confirms that a session's contents were deleted.
    SessionTornDown {
        /// Session torn down.
        session: SessionId,
        /// Number of tiles removed.
        tiles_removed: usize,
        /// Number of monsters removed.
        monsters_removed: usize,
        /// Number of memberships removed.
        members_removed: usize,
    },
    /// Reports that a command was refused without any write.
    CommandRejected {
        /// Specific reason the command failed.
        reason: Rejection,
    },
}

/// Reasons the world refuses a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// No session with the provided identifier exists.
    UnknownSession(SessionId),
    /// No tile with the provided identifier exists in the session.
    UnknownTile(TileId),
    /// The hero is not a member of the session's party.
    NotMember(HeroId),
    /// The hero already belongs to the session's party.
    AlreadyMember(HeroId),
    /// The session already holds tiles.
    AlreadyMaterialized(SessionId),
    /// The destination tile carries an occupant or blocks movement.
    TileBusy(TileId),
    /// The hero does not stand on the origin tile of a move.
    NotOnTile {
        /// Hero that tried to move.
        hero: HeroId,
        /// Tile named as the origin.
        tile: TileId,
    },
    /// The requested lifecycle transition is illegal.
    InvalidTransition {
        /// Current status.
        from: SessionStatus,
        /// Requested status.
        to: SessionStatus,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSession(session) => write!(f, "unknown session {session}"),
            Self::UnknownTile(tile) => write!(f, "unknown tile {tile}"),
            Self::NotMember(hero) => write!(f, "hero {hero} is not a party member"),
            Self::AlreadyMember(hero) => write!(f, "hero {hero} is already a party member"),
            Self::AlreadyMaterialized(session) => {
                write!(f, "session {session} is already materialized")
            }
            Self::TileBusy(tile) => write!(f, "tile {tile} is busy"),
            Self::NotOnTile { hero, tile } => write!(f, "hero {hero} does not stand on {tile}"),
            Self::InvalidTransition { from, to } => write!(f, "cannot move from {from} to {to}"),
        }
    }
}

/// Broad category of an [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown session, hero, map, tile or invite.
    NotFound,
    /// Duplicate session, full party, hero engaged elsewhere.
    Conflict,
    /// Actor lacks the right to perform the action.
    Forbidden,
    /// Movement request violates adjacency or occupancy rules.
    InvalidMove,
    /// Store failure.
    Internal,
}

/// Errors returned by engine operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// No session with the identifier exists.
    #[error("dungeon session {0} not found")]
    SessionNotFound(SessionId),
    /// No dungeon with the identifier exists.
    #[error("dungeon {0} not found")]
    DungeonNotFound(DungeonId),
    /// No map with the identifier exists.
    #[error("map {0} not found")]
    MapNotFound(MapId),
    /// No walkable tile exists at the requested coordinate.
    #[error("there is no tile at {0}")]
    TileNotFound(GridCoord),
    /// The hero has not been seated in the session.
    #[error("hero {0} has no tile in this session")]
    HeroNotPlaced(HeroId),
    /// The hero is not part of the session's party.
    #[error("hero {0} is not a member of this party")]
    NotPartyMember(HeroId),
    /// The hero named as a kick target is not in the party.
    #[error("hero {0} is not in the party")]
    MemberNotFound(HeroId),
    /// No invite is waiting for the hero.
    #[error("no pending invite for hero {0}")]
    InviteNotFound(HeroId),
    /// The hero already owns or belongs to an active session.
    #[error("A dungeon session is already in progress for hero {hero} ({session}).")]
    AlreadyInSession {
        /// Hero that is engaged.
        hero: HeroId,
        /// Session the hero is engaged in.
        session: SessionId,
    },
    /// The party has no room left.
    #[error("the party is full ({capacity} heroes)")]
    PartyFull {
        /// Configured capacity.
        capacity: usize,
    },
    /// The hero already belongs to this party.
    #[error("hero {0} is already in the party")]
    AlreadyPartyMember(HeroId),
    /// An invite for the hero is still awaiting a reply.
    #[error("an invite for hero {0} is already pending")]
    InvitePending(HeroId),
    /// The requested lifecycle transition is illegal.
    #[error("session cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: SessionStatus,
        /// Requested status.
        to: SessionStatus,
    },
    /// The session reached a terminal status.
    #[error("dungeon session {0} has already ended")]
    SessionEnded(SessionId),
    /// Monster placement found no free ground tile.
    #[error("no free ground tiles are left in the session")]
    NoFreeTiles,
    /// Only the owner may perform the action.
    #[error("only the party leader can do that")]
    NotSessionOwner,
    /// Heroes cannot invite themselves.
    #[error("You cannot add yourself to the dungeon party.")]
    SelfInvite,
    /// The owner cannot be kicked.
    #[error("The party leader cannot be removed from the group.")]
    CannotKickLeader,
    /// The destination carries an occupant.
    #[error("Tile is busy. You cannot move in this direction.")]
    TileBusy,
    /// The destination is not adjacent to the hero.
    #[error("Invalid move distance. You can only move to an adjacent tile.")]
    InvalidMoveDistance,
    /// The store refused a write the engine expected to succeed.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_)
            | Self::DungeonNotFound(_)
            | Self::MapNotFound(_)
            | Self::TileNotFound(_)
            | Self::HeroNotPlaced(_)
            | Self::MemberNotFound(_)
            | Self::InviteNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyInSession { .. }
            | Self::PartyFull { .. }
            | Self::AlreadyPartyMember(_)
            | Self::InvitePending(_)
            | Self::InvalidTransition { .. }
            | Self::SessionEnded(_)
            | Self::NoFreeTiles => ErrorKind::Conflict,
            Self::NotPartyMember(_)
            | Self::NotSessionOwner
            | Self::SelfInvite
            | Self::CannotKickLeader => ErrorKind::Forbidden,
            Self::TileBusy | Self::InvalidMoveDistance => ErrorKind::InvalidMove,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable reason safe to show to players.
    ///
    /// Internal details never leave the engine.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Internal(_) => "Something went wrong. Please try again.".to_owned(),
            other => other.to_string(),
        }
    }
}

impl From<Rejection> for EngineError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::UnknownSession(session) => Self::SessionNotFound(session),
            Rejection::NotMember(hero) => Self::NotPartyMember(hero),
            Rejection::AlreadyMember(hero) => Self::AlreadyPartyMember(hero),
            Rejection::TileBusy(_) => Self::TileBusy,
            Rejection::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Read-only view over the tiles of one session.
#[derive(Clone, Copy, Debug)]
pub struct TileView<'a> {
    tiles: &'a [Tile],
}

impl<'a> TileView<'a> {
    /// Captures a view backed by the provided tiles.
    #[must_use]
    pub fn new(tiles: &'a [Tile]) -> Self {
        Self { tiles }
    }

    /// Iterator over every tile in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Tile> + 'a {
        self.tiles.iter()
    }

    /// Number of tiles in the session.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the session holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Looks up a tile by identifier.
    #[must_use]
    pub fn get(&self, id: &TileId) -> Option<&'a Tile> {
        self.tiles.iter().find(|tile| &tile.id == id)
    }

    /// Tile currently carrying the hero, if any.
    #[must_use]
    pub fn hero_tile(&self, hero: &HeroId) -> Option<&'a Tile> {
        self.tiles
            .iter()
            .find(|tile| tile.hero.as_ref() == Some(hero))
    }

    /// Tiles at the coordinate that take part in movement.
    pub fn non_decor_at(&self, coord: GridCoord) -> impl Iterator<Item = &'a Tile> + 'a {
        self.tiles
            .iter()
            .filter(move |tile| tile.coord == coord && tile.kind != TileKind::Decor)
    }

    /// Ground tiles with no occupant, in insertion order.
    pub fn free_ground(&self) -> impl Iterator<Item = &'a Tile> + 'a {
        self.tiles.iter().filter(|tile| tile.is_free_ground())
    }
}

/// Read-only view over the party of one session.
#[derive(Clone, Copy, Debug)]
pub struct PartyView<'a> {
    owner: &'a HeroId,
    members: &'a [HeroId],
}

impl<'a> PartyView<'a> {
    /// Captures a view over the owner and the recorded members.
    #[must_use]
    pub fn new(owner: &'a HeroId, members: &'a [HeroId]) -> Self {
        Self { owner, members }
    }

    /// Hero owning the session.
    #[must_use]
    pub fn owner(&self) -> &'a HeroId {
        self.owner
    }

    /// Reports whether the hero owns the session.
    #[must_use]
    pub fn is_owner(&self, hero: &HeroId) -> bool {
        self.owner == hero
    }

    /// Reports whether the hero belongs to the party. The owner always does.
    #[must_use]
    pub fn contains(&self, hero: &HeroId) -> bool {
        self.is_owner(hero) || self.members.contains(hero)
    }

    /// Number of heroes in the party, owner included.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.members.contains(self.owner) {
            self.members.len()
        } else {
            self.members.len() + 1
        }
    }

    /// Parties always contain their owner.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterator over the recorded members.
    pub fn members(&self) -> impl Iterator<Item = &'a HeroId> + 'a {
        self.members.iter()
    }
}
