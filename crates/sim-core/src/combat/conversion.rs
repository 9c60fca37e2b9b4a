//! Monk conversion.

use crate::config::SimConfig;
use crate::state::{Direction, EntityId, EntityKind, World};
use crate::tables;

/// Attack verb dispatched by a monk: attempt to convert the first enemy
/// agent along `direction` within monk range.
///
/// Fails silently (no faith spent) when no target is found, faith is short,
/// or the monk's team is at its population cap. On success the target's
/// effective team flips to the monk's; converting a unit back to its default
/// team clears the override instead of stacking a second one.
pub(crate) fn attempt_convert(world: &mut World, monk: EntityId, direction: Direction) {
    let Some(monk_entity) = world.arena.alive(monk) else {
        return;
    };
    let Some(monk_team) = world.effective_team_of(monk_entity) else {
        return;
    };
    let Some(monk_unit) = monk_entity.unit() else {
        return;
    };
    if monk_unit.faith < SimConfig::MONK_CONVERSION_FAITH_COST {
        return;
    }
    let origin = monk_entity.pos;
    let range = tables::unit_stats(crate::state::UnitClass::Monk).range;

    let Some(target) = first_enemy_agent_along(world, monk_team, origin, direction, range) else {
        return;
    };

    // Conversion adds a body to the monk's team; it must fit under the cap.
    if world.compute_pop_count(monk_team) >= world.compute_pop_cap(monk_team) {
        return;
    }

    let altar = world
        .nearest_of_kind(EntityKind::Altar, Some(monk_team), origin)
        .and_then(|id| world.arena.alive(id))
        .map(|e| e.pos);

    let old_team = world
        .arena
        .alive(target)
        .and_then(|e| world.effective_team_of(e));

    let agents_per_team = world.config.map.agents_per_team;
    let target_entity = world.arena.get_mut(target).unwrap();
    let target_position = target_entity.pos;
    if let Some(unit) = target_entity.unit_mut() {
        let default_team = (unit.agent_id / agents_per_team) as u8;
        unit.team_override = if default_team == monk_team {
            // Double conversion returns the unit to its default team.
            None
        } else {
            Some(monk_team)
        };
        unit.home_altar = altar;
        unit.frozen = SimConfig::CONVERSION_FREEZE;
    }

    world.index.reassign_team(target, old_team, Some(monk_team));
    world.mark_tile_dirty(target_position);
    if let Some(agent) = world.arena.get(target).and_then(|e| e.agent_id()) {
        world.agents.mark_dirty(agent);
    }

    if let Some(unit) = world.arena.get_mut(monk).and_then(|e| e.unit_mut()) {
        unit.faith -= SimConfig::MONK_CONVERSION_FAITH_COST;
    }
}

fn first_enemy_agent_along(
    world: &World,
    team: u8,
    origin: crate::state::Position,
    direction: Direction,
    range: i32,
) -> Option<EntityId> {
    let (dx, dy) = direction.delta();
    for step in 1..=range {
        let position = origin.offset(dx * step, dy * step);
        if !world.grid.contains(position) {
            return None;
        }
        if let Some(id) = world.grid.primary(position) {
            let entity = world.arena.alive(id)?;
            if entity.kind != EntityKind::Agent {
                return None;
            }
            let target_team = world.effective_team_of(entity)?;
            if world.are_allied(team, target_team) {
                return None;
            }
            return Some(id);
        }
    }
    None
}
