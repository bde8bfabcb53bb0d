//! Dungeon entries that pair a map with a time budget.

use std::time::Duration;

use dungeon_core::{DungeonId, MapId};
use serde::Deserialize;

use crate::{CatalogError, BUILTIN_MAP_ID};

/// Dungeon a hero may open a session for.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DungeonEntry {
    /// Identifier referenced by session requests.
    pub id: DungeonId,
    /// Display name.
    pub name: String,
    /// Map materialized for sessions of this dungeon.
    pub map: MapId,
    /// Time budget of a session, in minutes.
    pub duration_minutes: u32,
}

impl DungeonEntry {
    /// Time budget of a session.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_minutes) * 60)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default, rename = "dungeon")]
    dungeons: Vec<DungeonEntry>,
}

/// Read-only list of dungeon entries.
#[derive(Clone, Debug, Default)]
pub struct DungeonRegistry {
    entries: Vec<DungeonEntry>,
}

impl DungeonRegistry {
    /// Creates a registry from explicit entries.
    #[must_use]
    pub fn new(entries: Vec<DungeonEntry>) -> Self {
        Self { entries }
    }

    /// Registry holding a single dungeon backed by the bundled map.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![DungeonEntry {
            id: DungeonId::new(BUILTIN_MAP_ID),
            name: "Test Crypt".to_owned(),
            map: MapId::new(BUILTIN_MAP_ID),
            duration_minutes: 30,
        }])
    }

    /// Parses `[[dungeon]]` tables from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let document: RegistryDocument = toml::from_str(contents)?;
        Ok(Self::new(document.dungeons))
    }

    /// Every entry in declaration order.
    #[must_use]
    pub fn list(&self) -> &[DungeonEntry] {
        &self.entries
    }

    /// Looks up a dungeon entry.
    pub fn get(&self, id: &DungeonId) -> Result<&DungeonEntry, CatalogError> {
        self.entries
            .iter()
            .find(|entry| &entry.id == id)
            .ok_or_else(|| CatalogError::DungeonNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dungeon_tables() {
        let registry = DungeonRegistry::from_toml_str(
            r#"
            [[dungeon]]
            id = "lair"
            name = "Lair of Darkness"
            map = "lair-of-darkness"
            duration_minutes = 45
            "#,
        )
        .expect("registry parses");

        let entry = registry.get(&DungeonId::new("lair")).expect("entry present");
        assert_eq!(entry.map.as_str(), "lair-of-darkness");
        assert_eq!(entry.duration(), Duration::from_secs(45 * 60));
    }

    #[test]
    fn unknown_dungeon_is_not_found() {
        let registry = DungeonRegistry::builtin();
        assert!(matches!(
            registry.get(&DungeonId::new("missing")),
            Err(CatalogError::DungeonNotFound(_))
        ));
    }
}
