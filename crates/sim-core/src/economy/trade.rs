//! Trade cog routes between docks.

use crate::config::SimConfig;
use crate::state::{Direction, EntityId, EntityKind, Resource, UnitClass, World};

/// Scans every trade cog for dock arrivals. Run once per tick in the
/// building autonomic phase.
///
/// A cog adjacent to a friendly dock that is not its current home completes
/// a trade leg: the team earns gold proportional to the Manhattan distance
/// between the two docks, and the cog's home flips to the dock it just
/// reached. Standing still next to the new home dock does not re-trigger;
/// only reaching a different dock pays again.
pub(crate) fn settle_trade_routes(world: &mut World) {
    for agent in 0..world.agent_count() as u16 {
        let Some(entity) = world.agent_entity(agent) else {
            continue;
        };
        if entity.unit_class() != Some(UnitClass::TradeCog) || entity.pos.is_off_grid() {
            continue;
        }
        let Some(team) = world.effective_team_of(entity) else {
            continue;
        };
        let cog = entity.id;
        let position = entity.pos;
        let home = entity.unit().and_then(|u| u.trade_home_dock);

        let Some(dock) = adjacent_friendly_dock(world, team, position, home) else {
            continue;
        };

        match home.and_then(|id| world.arena.alive(id)) {
            Some(home_dock) => {
                let distance = home_dock.pos.manhattan(
                    world.arena.alive(dock).map(|e| e.pos).unwrap_or(position),
                );
                let gold = (distance / SimConfig::TRADE_DISTANCE_DIVISOR
                    * SimConfig::TRADE_GOLD_PER_DISTANCE)
                    .max(1);
                world.teams[team as usize].credit(Resource::Gold, gold);
                let reward = world.config.rewards.dropoff * gold as f32;
                world.agents.add_reward(agent, reward);
            }
            // First dock contact just establishes the route.
            None => {}
        }

        if let Some(unit) = world.arena.get_mut(cog).and_then(|e| e.unit_mut()) {
            unit.trade_home_dock = Some(dock);
        }
    }
}

/// A friendly dock within one tile, excluding the cog's current home dock.
fn adjacent_friendly_dock(
    world: &World,
    team: u8,
    position: crate::state::Position,
    home: Option<EntityId>,
) -> Option<EntityId> {
    let mut candidates: Vec<EntityId> = Vec::new();
    for direction in Direction::ALL {
        let tile = position.step(direction);
        if let Some(id) = world.grid.background(tile) {
            if let Some(entity) = world.arena.alive(id) {
                if entity.kind == EntityKind::Dock && entity.team == Some(team) {
                    candidates.push(id);
                }
            }
        }
    }
    candidates
        .into_iter()
        .filter(|&id| Some(id) != home)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::FnInitializer;
    use crate::state::{Position, Terrain};

    #[test]
    fn dock_arrival_pays_and_flips_home() {
        let mut config = SimConfig::default();
        config.map.width = 64;
        config.map.height = 64;
        let mut world = World::new(config, 42, &FnInitializer(|_: &mut World| Ok(()))).unwrap();

        for x in 28..=52 {
            world.set_terrain(Position::new(x, 50), Terrain::Water);
        }
        let dock_a = world
            .spawn_building(EntityKind::Dock, 0, Position::new(30, 50), true)
            .unwrap();
        let dock_b = world
            .spawn_building(EntityKind::Dock, 0, Position::new(50, 50), true)
            .unwrap();
        let cog = world
            .spawn_agent(0, UnitClass::TradeCog, Position::new(31, 50))
            .unwrap();
        world
            .entity_mut(cog)
            .unwrap()
            .unit_mut()
            .unwrap()
            .trade_home_dock = Some(dock_a);

        // Sitting next to the home dock pays nothing.
        settle_trade_routes(&mut world);
        assert_eq!(world.team(0).stockpile(Resource::Gold), 0);

        // Teleport the cog next to the far dock and settle.
        world.relocate(cog, Position::new(49, 50)).unwrap();
        settle_trade_routes(&mut world);

        let expected = (20 / SimConfig::TRADE_DISTANCE_DIVISOR
            * SimConfig::TRADE_GOLD_PER_DISTANCE)
            .max(1);
        assert_eq!(world.team(0).stockpile(Resource::Gold), expected);
        assert_eq!(
            world
                .entity(cog)
                .unwrap()
                .unit()
                .unwrap()
                .trade_home_dock,
            Some(dock_b)
        );

        // Waiting at the new home dock does not pay again.
        settle_trade_routes(&mut world);
        assert_eq!(world.team(0).stockpile(Resource::Gold), expected);
    }
}
