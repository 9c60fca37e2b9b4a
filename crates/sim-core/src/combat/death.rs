//! Death handling: corpses, drops, garrison ejection, termination.

use crate::config::SimConfig;
use crate::state::{CarryItem, EntityId, EntityKind, Position, World};

/// Applies `damage` to `target`, crediting shaping rewards to the attacking
/// agent, and runs death handling when hp reaches zero.
pub(crate) fn apply_damage(
    world: &mut World,
    target: EntityId,
    damage: u16,
    attacker_agent: Option<u16>,
) {
    let Some(entity) = world.arena.alive_mut(target) else {
        return;
    };
    entity.hp = entity.hp.saturating_sub(damage);
    let dead = entity.hp == 0;
    let position = entity.pos;
    if !position.is_off_grid() {
        world.mark_tile_dirty(position);
    }

    if let Some(agent) = attacker_agent {
        let reward = world.config.rewards.damage * damage as f32;
        world.agents.add_reward(agent, reward);
        if dead {
            let kill = world.config.rewards.kill;
            world.agents.add_reward(agent, kill);
        }
    }

    if dead {
        handle_death(world, target);
    }
}

/// Full death protocol for any entity kind.
///
/// Order matters: the grid slot is cleared first so corpse and drop
/// placement (and garrison ejection) can reuse the tile.
pub(crate) fn handle_death(world: &mut World, id: EntityId) {
    let Some(entity) = world.arena.alive(id) else {
        return;
    };
    let kind = entity.kind;
    let position = entity.pos;
    let agent_id = entity.agent_id();
    let was_unit_or_animal = kind == EntityKind::Agent || kind.is_animal();
    let carried: Vec<(CarryItem, u16)> = entity
        .unit()
        .map(|u| u.inventory.iter().collect())
        .unwrap_or_default();
    let garrisoned: Vec<EntityId> = entity
        .building()
        .map(|b| b.garrisoned_units.iter().copied().collect())
        .unwrap_or_default();
    let stored_relics = entity.building().map(|b| b.garrisoned_relics).unwrap_or(0);

    world.destroy_entity(id);

    if let Some(agent) = agent_id {
        world.agents.set_terminated(agent, true);
        world.agents.mark_dirty(agent);
        world.ai.lifecycle.mark_inactive(agent);
    }

    if position.is_off_grid() {
        return;
    }

    if was_unit_or_animal {
        world.grid.set_death_tint(position, SimConfig::DEATH_TINT_DURATION);
        if world.grid.background(position).is_none() {
            let _ = world.spawn_drop(EntityKind::Corpse, position, SimConfig::CORPSE_MEAT);
        }
        // Held relics and lanterns survive their carrier.
        for (item, count) in carried {
            let drop_kind = match item {
                CarryItem::Relic => EntityKind::Relic,
                CarryItem::Lantern => EntityKind::Lantern,
                _ => continue,
            };
            for _ in 0..count {
                if let Some(tile) = adjacent_background_tile(world, position) {
                    let _ = world.spawn_drop(drop_kind, tile, 0);
                }
            }
        }
    }

    // Destroyed monasteries spill their relics back onto the map.
    for _ in 0..stored_relics {
        if let Some(tile) = adjacent_background_tile(world, position) {
            let _ = world.spawn_drop(EntityKind::Relic, tile, 0);
        }
    }

    // Eject garrisoned units around the ruin; terminate those with no room.
    for occupant in garrisoned {
        let Some(unit_entity) = world.arena.alive(occupant) else {
            continue;
        };
        let occupant_agent = unit_entity.agent_id();
        let landing = free_primary_tile_around(world, position);
        match landing {
            Some(tile) => {
                if let Some(unit) = world.arena.get_mut(occupant).and_then(|e| e.unit_mut()) {
                    unit.garrisoned = false;
                }
                world
                    .place_on_grid(occupant, tile)
                    .expect("ejection tile was checked free");
                if let Some(agent) = occupant_agent {
                    world.agents.mark_dirty(agent);
                }
            }
            None => {
                if let Some(agent) = occupant_agent {
                    world.agents.set_terminated(agent, true);
                    world.ai.lifecycle.mark_inactive(agent);
                }
                if let Some(e) = world.arena.get_mut(occupant) {
                    e.alive = false;
                    e.pos = Position::OFF_GRID;
                }
            }
        }
    }
}

/// The ruin's own tile first, then its neighbors.
fn free_primary_tile_around(world: &World, position: Position) -> Option<Position> {
    if world.grid.contains(position) && world.grid.primary(position).is_none() {
        return Some(position);
    }
    world.adjacent_free_tile(position)
}

/// Free background slot adjacent to `position` (for relic/lantern drops).
fn adjacent_background_tile(world: &World, position: Position) -> Option<Position> {
    crate::state::Direction::ALL
        .iter()
        .map(|&d| position.step(d))
        .find(|&p| world.grid.contains(p) && world.grid.background(p).is_none())
}
