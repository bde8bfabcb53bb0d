//! Monster templates sampled when a session is seeded.

use serde::Deserialize;

use crate::CatalogError;

/// Attribute block shared by monster templates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Modifier {
    /// Physical power.
    pub strength: u32,
    /// Agility.
    pub dexterity: u32,
    /// Scales mana.
    pub intelligence: u32,
    /// Scales health.
    pub constitution: u32,
    /// Fortune.
    pub luck: u32,
}

/// Blueprint a monster is instantiated from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MonsterTemplate {
    /// Stable identifier of the template.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Attributes used to derive health and mana.
    pub modifier: Modifier,
}

/// Immutable table of monster templates.
#[derive(Clone, Debug)]
pub struct MonsterRegistry {
    templates: Vec<MonsterTemplate>,
}

impl MonsterRegistry {
    /// Creates a registry; an empty table cannot seed sessions and is rejected.
    pub fn new(templates: Vec<MonsterTemplate>) -> Result<Self, CatalogError> {
        if templates.is_empty() {
            return Err(CatalogError::NoTemplates);
        }
        Ok(Self { templates })
    }

    /// Parses a JSON array of templates.
    pub fn from_json_str(contents: &str) -> Result<Self, CatalogError> {
        let templates: Vec<MonsterTemplate> =
            serde_json::from_str(contents).map_err(|source| CatalogError::Parse {
                what: "monster registry".to_owned(),
                source,
            })?;
        Self::new(templates)
    }

    /// The undead table bundled with the crate.
    #[must_use]
    pub fn builtin() -> Self {
        let undead = [
            ("skeleton", "Skeleton", [6, 8, 2, 5, 1]),
            ("zombie", "Zombie", [9, 3, 1, 9, 1]),
            ("ghoul", "Ghoul", [8, 7, 2, 7, 2]),
            ("bone-archer", "Bone Archer", [5, 10, 3, 4, 3]),
            ("wraith", "Wraith", [4, 9, 8, 5, 4]),
            ("lich", "Lich", [3, 5, 12, 6, 5]),
        ];
        let templates = undead
            .into_iter()
            .map(
                |(id, name, [strength, dexterity, intelligence, constitution, luck])| {
                    MonsterTemplate {
                        id: id.to_owned(),
                        name: name.to_owned(),
                        modifier: Modifier {
                            strength,
                            dexterity,
                            intelligence,
                            constitution,
                            luck,
                        },
                    }
                },
            )
            .collect();
        Self { templates }
    }

    /// Every template in declaration order.
    #[must_use]
    pub fn templates(&self) -> &[MonsterTemplate] {
        &self.templates
    }
}
