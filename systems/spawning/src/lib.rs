#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Monster placement system that seeds a freshly materialized session.

use dungeon_catalog::{MonsterRegistry, MonsterTemplate};
use dungeon_core::{
    Command, Difficulty, EngineError, MonsterSpawn, SessionId, TilePlan, TileView,
};
use rand::{
    seq::{index, SliceRandom},
    Rng,
};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    count: usize,
    health_per_constitution: u32,
    mana_per_intelligence: u32,
}

impl Config {
    /// Creates a configuration from the monster count and stat multipliers.
    #[must_use]
    pub const fn new(count: usize, health_per_constitution: u32, mana_per_intelligence: u32) -> Self {
        Self {
            count,
            health_per_constitution,
            mana_per_intelligence,
        }
    }

    /// Number of templates sampled per session.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(10, 10, 10)
    }
}

/// Pure system that turns sampled templates into a spawn command.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Samples monsters onto free ground tiles and emits a single spawn command.
    ///
    /// Tiles are drawn without replacement, so when the session has fewer free
    /// tiles than sampled templates the surplus templates are dropped.
    pub fn handle<R: Rng + ?Sized>(
        &self,
        session: &SessionId,
        tiles: TileView<'_>,
        registry: &MonsterRegistry,
        difficulty: Difficulty,
        rng: &mut R,
        out: &mut Vec<Command>,
    ) -> Result<(), EngineError> {
        let free: Vec<_> = tiles.free_ground().collect();
        if free.is_empty() {
            return Err(EngineError::NoFreeTiles);
        }

        let templates = sample_templates(registry, self.config.count, rng);
        let amount = templates.len().min(free.len());
        let picks = index::sample(rng, free.len(), amount);

        let monsters = templates
            .into_iter()
            .zip(picks)
            .map(|(template, pick)| MonsterSpawn {
                template: template.id.clone(),
                name: template.name.clone(),
                health: self
                    .config
                    .health_per_constitution
                    .saturating_mul(template.modifier.constitution),
                mana: self
                    .config
                    .mana_per_intelligence
                    .saturating_mul(template.modifier.intelligence),
                rarity: difficulty.rarity(),
                tile: free[pick].id.clone(),
            })
            .collect();

        out.push(Command::SpawnMonsters {
            session: session.clone(),
            monsters,
        });
        Ok(())
    }
}

/// Refuses a tile plan that would leave no free ground to seed.
pub fn check_room(plan: &TilePlan) -> Result<(), EngineError> {
    if plan.open_ground() == 0 {
        return Err(EngineError::NoFreeTiles);
    }
    Ok(())
}

/// Draws `count` templates uniformly at random, with replacement.
pub fn sample_templates<'a, R: Rng + ?Sized>(
    registry: &'a MonsterRegistry,
    count: usize,
    rng: &mut R,
) -> Vec<&'a MonsterTemplate> {
    let templates = registry.templates();
    (0..count)
        .filter_map(|_| templates.choose(rng))
        .collect()
}
