//! Production queues.
//!
//! Queue entries debit the team stockpile at enqueue time; only the head
//! entry makes training progress. A finished head waits until a friendly
//! villager's Use converts that villager into the produced unit.

use crate::ai::Command;
use crate::state::{Cost, EntityId, QueueEntry, UnitClass, World};
use crate::tables;

/// Enqueues `class` at its table cost.
pub(crate) fn try_enqueue(world: &mut World, building: EntityId, class: UnitClass) {
    let allowed = world
        .arena
        .alive(building)
        .map(|e| tables::trainable_classes(e.kind).contains(&class))
        .unwrap_or(false);
    if !allowed {
        return;
    }
    try_enqueue_with_cost(world, building, class, tables::unit_stats(class).cost);
}

/// Enqueues `class` at an explicit cost (castle unique units price their
/// own training).
pub(crate) fn try_enqueue_with_cost(
    world: &mut World,
    building: EntityId,
    class: UnitClass,
    cost: Cost,
) {
    let Some(entity) = world.arena.alive(building) else {
        return;
    };
    let Some(team) = entity.team else {
        return;
    };
    let Some(data) = entity.building() else {
        return;
    };
    if data.production.is_full() {
        return;
    }
    if !world.teams[team as usize].debit(cost) {
        return;
    }
    let entry = QueueEntry {
        class,
        remaining_steps: tables::unit_stats(class).train_steps,
        cost,
    };
    if let Some(data) = world.arena.get_mut(building).and_then(|e| e.building_mut()) {
        data.production.push(entry);
    }
}

/// Cancels the most recent order (LIFO) and refunds its full cost; the
/// head refunds whole even when partially trained.
pub(crate) fn cancel_tail(world: &mut World, building: EntityId) {
    let Some(entity) = world.arena.alive(building) else {
        return;
    };
    let Some(team) = entity.team else {
        return;
    };
    let entry = world
        .arena
        .get_mut(building)
        .and_then(|e| e.building_mut())
        .and_then(|b| b.production.pop());
    if let Some(entry) = entry {
        world.teams[team as usize].refund(entry.cost);
    }
}

/// One tick of training progress for every queue head. Building autonomic
/// phase.
pub(crate) fn tick_production(world: &mut World) {
    let buildings: Vec<EntityId> = world
        .arena
        .iter_alive()
        .filter(|e| e.kind.is_training_building() || e.kind == crate::state::EntityKind::Castle)
        .map(|e| e.id)
        .collect();
    for id in buildings {
        if let Some(data) = world.arena.get_mut(id).and_then(|e| e.building_mut()) {
            if let Some(head) = data.production.first_mut() {
                head.remaining_steps = head.remaining_steps.saturating_sub(1);
            }
        }
    }
}

/// Use on a building whose head order is done: the visiting villager takes
/// on the produced class, and the rally point (when set) becomes a deferred
/// move command for it.
///
/// Returns true when a conversion happened.
pub(crate) fn try_complete(world: &mut World, villager: EntityId, building: EntityId) -> bool {
    let Some(villager_entity) = world.arena.alive(villager) else {
        return false;
    };
    if villager_entity.unit_class() != Some(UnitClass::Villager) {
        return false;
    }
    let Some(team) = world.effective_team_of(villager_entity) else {
        return false;
    };
    let Some(building_entity) = world.arena.alive(building) else {
        return false;
    };
    if building_entity.team != Some(team) {
        return false;
    }
    let Some(data) = building_entity.building() else {
        return false;
    };
    let ready = data
        .production
        .first()
        .is_some_and(|head| head.remaining_steps == 0);
    if !ready {
        return false;
    }
    let rally = data.rally_point;

    let entry = world
        .arena
        .get_mut(building)
        .and_then(|e| e.building_mut())
        .map(|b| b.production.remove(0));
    let Some(entry) = entry else {
        return false;
    };

    world.apply_unit_class(villager, entry.class);
    if let (Some(rally), Some(agent)) = (
        rally,
        world.arena.get(villager).and_then(|e| e.agent_id()),
    ) {
        world.ai.push_command(agent, Command::MoveTo(rally));
    }
    true
}
