//! Tunables of the dungeon service, loaded from TOML.

use std::time::Duration;

use dungeon_core::{GridCoord, DEFAULT_PARTY_CAPACITY};
use dungeon_system_placement::{SpawnRegion, DEFAULT_FALLBACK};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or has unknown keys.
    #[error("invalid service configuration")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range.
    #[error("invalid service configuration: {0}")]
    Invalid(&'static str),
}

/// Service configuration; every key is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Maximum party size, owner included.
    pub party_capacity: usize,
    /// Monsters sampled per session.
    pub monster_count: usize,
    /// Health granted per constitution point.
    pub health_per_constitution: u32,
    /// Mana granted per intelligence point.
    pub mana_per_intelligence: u32,
    /// Seconds an invitee has to answer.
    pub invite_window_secs: u64,
    /// Region searched first when seating heroes.
    pub spawn_region: Option<SpawnRegion>,
    /// Cell of the marker tile created when no free ground is left.
    pub fallback_spawn: GridCoord,
    /// Seed of the monster sampler; drawn from the OS when absent.
    pub rng_seed: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            party_capacity: DEFAULT_PARTY_CAPACITY,
            monster_count: 10,
            health_per_constitution: 10,
            mana_per_intelligence: 10,
            invite_window_secs: 30,
            spawn_region: None,
            fallback_spawn: DEFAULT_FALLBACK,
            rng_seed: None,
        }
    }
}

impl ServiceConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        if config.party_capacity == 0 {
            return Err(ConfigError::Invalid("party_capacity must be at least 1"));
        }
        Ok(config)
    }

    /// Time an invitee has to answer.
    #[must_use]
    pub const fn invite_window(&self) -> Duration {
        Duration::from_secs(self.invite_window_secs)
    }

    pub(crate) fn spawning(&self) -> dungeon_system_spawning::Config {
        dungeon_system_spawning::Config::new(
            self.monster_count,
            self.health_per_constitution,
            self.mana_per_intelligence,
        )
    }

    pub(crate) fn placement(&self) -> dungeon_system_placement::Config {
        dungeon_system_placement::Config::new(self.spawn_region, self.fallback_spawn)
    }

    pub(crate) fn party(&self) -> dungeon_system_party::Config {
        dungeon_system_party::Config::new(self.party_capacity, self.invite_window())
    }
}
