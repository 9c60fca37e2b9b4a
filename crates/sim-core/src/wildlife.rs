//! Wildlife behavior: herds, packs, and lone wanderers.
//!
//! Runs as its own pipeline phase after agent actions. Cows herd around
//! their lowest-id herdmate, wolves pack around their leader, bears wander.
//! Predators strike adjacent agents with their kind's damage. Struck herd
//! animals scatter for a while before regrouping.

use crate::combat;
use crate::state::{Direction, EntityId, EntityKind, Terrain, World};

pub(crate) fn wildlife_phase(world: &mut World) {
    let mut animals: Vec<EntityId> = [EntityKind::Cow, EntityKind::Wolf, EntityKind::Bear]
        .iter()
        .flat_map(|&kind| world.index.of_kind(kind).iter().copied())
        .collect();
    // Index order follows insertion; sorting pins the phase to id order so
    // replays do not depend on removal history.
    animals.sort_unstable();

    for id in animals {
        let Some(entity) = world.arena.alive(id) else {
            continue;
        };
        if entity.pos.is_off_grid() {
            continue;
        }
        let kind = entity.kind;

        // Predators bite first and stay put.
        if matches!(kind, EntityKind::Wolf | EntityKind::Bear)
            && entity.cooldown == 0
            && predator_strike(world, id)
        {
            continue;
        }

        let Some(entity) = world.arena.alive(id) else {
            continue;
        };
        let position = entity.pos;
        let scattered = entity
            .animal()
            .map(|a| a.scattered_steps > 0)
            .unwrap_or(false);

        if scattered {
            wander(world, id);
            continue;
        }

        match kind {
            EntityKind::Cow | EntityKind::Wolf => {
                let Some(leader) = group_leader(world, id, kind) else {
                    wander(world, id);
                    continue;
                };
                if leader == id {
                    // Leaders drift occasionally; one draw per leader turn.
                    if world.rng.next_bounded(4) == 0 {
                        wander(world, id);
                    }
                } else if let Some(leader_pos) =
                    world.arena.alive(leader).map(|e| e.pos)
                {
                    if position.chebyshev(leader_pos)
                        > crate::config::SimConfig::HERD_RADIUS as u32
                    {
                        if let Some(direction) = Direction::toward(position, leader_pos) {
                            try_animal_step(world, id, direction);
                        }
                    } else {
                        wander(world, id);
                    }
                }
            }
            EntityKind::Bear => wander(world, id),
            _ => {}
        }
    }
}

/// Bites the first adjacent agent, in direction order. Returns true when an
/// attack happened.
fn predator_strike(world: &mut World, predator: EntityId) -> bool {
    let Some(entity) = world.arena.alive(predator) else {
        return false;
    };
    let origin = entity.pos;
    for direction in Direction::ALL {
        let position = origin.step(direction);
        let Some(target) = world.grid.primary(position) else {
            continue;
        };
        let Some(target_entity) = world.arena.alive(target) else {
            continue;
        };
        if !target_entity.is_agent() {
            continue;
        }
        let predator_entity = world.arena.alive(predator).unwrap();
        let damage = combat::damage::compute_damage(world, predator_entity, target_entity);
        world.arena.get_mut(predator).unwrap().cooldown =
            crate::config::SimConfig::ATTACK_COOLDOWN;
        world.arena.get_mut(predator).unwrap().orientation = direction;
        combat::apply_damage(world, target, damage, None);
        return true;
    }
    false
}

/// The flagged pack leader when one is alive, else the lowest-id herdmate.
fn group_leader(world: &World, member: EntityId, kind: EntityKind) -> Option<EntityId> {
    let herd = world.arena.alive(member)?.animal()?.herd_id;
    let mut herdmates = world.index.of_kind(kind).iter().copied().filter(|&id| {
        world
            .arena
            .alive(id)
            .and_then(|e| e.animal())
            .is_some_and(|a| a.herd_id == herd)
    });
    let fallback = herdmates.clone().min();
    herdmates
        .find(|&id| {
            world
                .arena
                .alive(id)
                .and_then(|e| e.animal())
                .is_some_and(|a| a.is_pack_leader)
        })
        .or(fallback)
}

/// One RNG draw, one cardinal step attempt.
fn wander(world: &mut World, id: EntityId) {
    let direction = Direction::CARDINAL[world.rng.next_bounded(4) as usize];
    try_animal_step(world, id, direction);
}

fn try_animal_step(world: &mut World, id: EntityId, direction: Direction) {
    let Some(entity) = world.arena.alive(id) else {
        return;
    };
    let from = entity.pos;
    let to = from.step(direction);
    if !world.grid.contains(to) {
        return;
    }
    let terrain = world.grid.terrain(to);
    if terrain.is_water() || terrain == Terrain::Empty {
        return;
    }
    if world.grid.elevation(to) > world.grid.elevation(from)
        && world.grid.terrain(from).ramp_direction() != Some(direction)
    {
        return;
    }
    if world.grid.primary(to).is_some() {
        return;
    }
    world.arena.get_mut(id).unwrap().orientation = direction;
    world.relocate(id, to).expect("animal step onto free tile");
}

/// Decrements scatter counters; runs in the decay phase.
pub(crate) fn decay_scatter(world: &mut World) {
    let animals: Vec<EntityId> = [EntityKind::Cow, EntityKind::Wolf, EntityKind::Bear]
        .iter()
        .flat_map(|&kind| world.index.of_kind(kind).iter().copied())
        .collect();
    for id in animals {
        if let Some(animal) = world.arena.get_mut(id).and_then(|e| e.animal_mut()) {
            animal.scattered_steps = animal.scattered_steps.saturating_sub(1);
        }
    }
}
