#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Static data consumed by the dungeon session engine.
//!
//! The catalog owns three read-only registries: tile maps keyed by
//! [`MapId`](dungeon_core::MapId), dungeon entries that pair a map with a time
//! budget, and the monster templates sampled when a session is seeded. Every
//! lookup borrows immutably, so a loaded catalog may be shared freely between
//! request handlers.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use dungeon_core::{DungeonId, MapId};
use thiserror::Error;
use tracing::{debug, info};

pub mod dungeons;
pub mod map;
pub mod monsters;

pub use dungeons::{DungeonEntry, DungeonRegistry};
pub use map::{DenseLayer, Layer, MapDefinition, ObjectLayer, PlacedObject};
pub use monsters::{Modifier, MonsterRegistry, MonsterTemplate};

const BUILTIN_TEST_MAP: &str = include_str!("../assets/test-dungeon.json");

/// Identifier of the map bundled with the crate.
pub const BUILTIN_MAP_ID: &str = "test";

/// Errors raised while loading or querying static data.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No map with the identifier was loaded.
    #[error("map {0} not found")]
    MapNotFound(MapId),
    /// No dungeon with the identifier was loaded.
    #[error("dungeon {0} not found")]
    DungeonNotFound(DungeonId),
    /// A file could not be read.
    #[error("could not read {path}")]
    Io {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A JSON document could not be parsed.
    #[error("could not parse {what}")]
    Parse {
        /// Document being parsed.
        what: String,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// A TOML document could not be parsed.
    #[error("could not parse dungeon registry")]
    Toml(#[from] toml::de::Error),
    /// A dense layer does not hold one cell per grid position.
    #[error("layer {layer} of map {map} holds {actual} cells, expected {expected}")]
    LayerSize {
        /// Map being validated.
        map: MapId,
        /// Offending layer.
        layer: String,
        /// Width times height.
        expected: usize,
        /// Cells present in the layer.
        actual: usize,
    },
    /// A map declares a zero tile width or height.
    #[error("map {map} declares a zero tile size")]
    ZeroTileSize {
        /// Map being validated.
        map: MapId,
    },
    /// The monster registry holds no templates.
    #[error("monster registry is empty")]
    NoTemplates,
}

/// Read-only registry of map definitions.
#[derive(Clone, Debug, Default)]
pub struct MapCatalog {
    maps: BTreeMap<MapId, MapDefinition>,
}

impl MapCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the bundled `test` map.
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        catalog.insert(MapDefinition::from_tiled_json(
            MapId::new(BUILTIN_MAP_ID),
            BUILTIN_TEST_MAP,
        )?);
        Ok(catalog)
    }

    /// Loads every `*.json` file in the directory, keyed by file stem.
    pub fn from_dir(dir: &Path) -> Result<Self, CatalogError> {
        let entries = fs::read_dir(dir).map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut catalog = Self::new();
        for entry in entries {
            let path = entry
                .map_err(|source| CatalogError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let contents = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let map = MapDefinition::from_tiled_json(MapId::new(stem), &contents)?;
            debug!(map = %map.id(), width = map.width(), height = map.height(), "loaded map");
            catalog.insert(map);
        }

        info!(dir = %dir.display(), maps = catalog.maps.len(), "loaded map catalog");
        Ok(catalog)
    }

    /// Adds or replaces a map.
    pub fn insert(&mut self, map: MapDefinition) {
        let _ = self.maps.insert(map.id().clone(), map);
    }

    /// Looks up a map definition.
    pub fn load_map(&self, id: &MapId) -> Result<&MapDefinition, CatalogError> {
        self.maps
            .get(id)
            .ok_or_else(|| CatalogError::MapNotFound(id.clone()))
    }

    /// Identifiers of every loaded map.
    pub fn ids(&self) -> impl Iterator<Item = &MapId> {
        self.maps.keys()
    }
}
