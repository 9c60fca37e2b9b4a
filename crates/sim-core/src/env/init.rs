//! Map initializers.
//!
//! A [`MapInitializer`] populates a freshly constructed world: terrain,
//! elevation, biome, and the initial entities. Procedural generation proper
//! lives outside the core; what ships here is the seam plus two small
//! deterministic initializers used by tests and the scripted-AI demo setup.

use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::state::{EntityKind, Position, Terrain, UnitClass, World};

/// Populates terrain, elevation, biome, and initial entities of a world.
///
/// Implementations must be deterministic: the same initializer must produce
/// the same world every time it runs against the same `(config, seed)`,
/// because `World::reset` replays it.
pub trait MapInitializer {
    fn populate(&self, world: &mut World) -> Result<(), ConfigError>;
}

/// Adapter turning a closure into an initializer. The test suites use this
/// to lay out exact scenarios tile by tile.
pub struct FnInitializer<F>(pub F)
where
    F: Fn(&mut World) -> Result<(), ConfigError>;

impl<F> MapInitializer for FnInitializer<F>
where
    F: Fn(&mut World) -> Result<(), ConfigError>,
{
    fn populate(&self, world: &mut World) -> Result<(), ConfigError> {
        (self.0)(world)
    }
}

/// Minimal symmetric skirmish layout: one town center and a handful of
/// villagers per team in opposite corners, a tree line and gold near each
/// base, and a relic at the map center.
///
/// This is not a terrain generator; it exists so episodes can run without
/// an external one.
pub struct SkirmishMap {
    pub villagers_per_team: u16,
}

impl Default for SkirmishMap {
    fn default() -> Self {
        Self {
            villagers_per_team: 3,
        }
    }
}

impl SkirmishMap {
    fn base_anchor(world: &World, team: u8) -> Position {
        let width = world.grid_view().width() as i32;
        let height = world.grid_view().height() as i32;
        let margin = SimConfig::OBS_RADIUS + 2;
        match team % 4 {
            0 => Position::new(margin, margin),
            1 => Position::new(width - 1 - margin, height - 1 - margin),
            2 => Position::new(width - 1 - margin, margin),
            _ => Position::new(margin, height - 1 - margin),
        }
    }
}

impl MapInitializer for SkirmishMap {
    fn populate(&self, world: &mut World) -> Result<(), ConfigError> {
        let teams = world.config().map.teams;
        let per_team = self.villagers_per_team.min(world.config().map.agents_per_team);

        for team in 0..teams {
            let anchor = Self::base_anchor(world, team);
            world.spawn_building(EntityKind::TownCenter, team, anchor, true)?;

            for i in 0..per_team {
                let offset = i as i32 + 1;
                let position = Position::new(anchor.x + offset, anchor.y + 1);
                world.spawn_agent(team, UnitClass::Villager, position)?;
            }

            // A short tree line and one gold mine behind the base.
            for i in 0..4 {
                world.spawn_resource(
                    EntityKind::Tree,
                    Position::new(anchor.x + i, anchor.y - 2),
                )?;
            }
            world.spawn_resource(EntityKind::GoldMine, Position::new(anchor.x - 2, anchor.y))?;
        }

        let center = Position::new(
            world.grid_view().width() as i32 / 2,
            world.grid_view().height() as i32 / 2,
        );
        world.spawn_drop(EntityKind::Relic, center, 0)?;

        // A patch of mud south of center keeps terrain speeds exercised.
        for dx in -2..=2 {
            for dy in 1..=2 {
                world.set_terrain(center.offset(dx, dy), Terrain::Mud);
            }
        }
        Ok(())
    }
}
