//! Per-agent action dispatch.
//!
//! Dispatch is keyed on (verb, entity at the target tile, actor state). Use
//! is the workhorse verb: its meaning depends entirely on what sits on the
//! targeted tile, with a fixed precedence so a single Use byte always
//! resolves deterministically.

use crate::action::{
    Action, USE_ARG_PACK, USE_ARG_TOWN_BELL, USE_ARG_UNGARRISON_ALL, Verb,
};
use crate::state::{
    CarryItem, Direction, EntityId, EntityKind, UnitClass, World,
};
use crate::{combat, economy, movement, production};

pub(crate) fn dispatch_action(world: &mut World, agent: u16, action: Action) {
    let Some(id) = world.agent_entity_id(agent) else {
        return;
    };
    if world.arena.alive(id).is_none() {
        return;
    }

    match action.verb {
        Verb::Noop => {}
        Verb::Move => {
            if let Some(direction) = action.direction() {
                movement::attempt_move(world, id, direction);
            }
        }
        Verb::Attack => {
            if let Some(direction) = action.direction() {
                combat::attempt_attack(world, id, direction);
            }
        }
        Verb::Use => use_action(world, id, action.arg),
        Verb::Give => {
            if let Some(direction) = action.direction() {
                give_action(world, id, direction);
            }
        }
        Verb::Build => production::build::attempt_build(world, id, action.arg),
    }
}

fn use_action(world: &mut World, id: EntityId, arg: u8) {
    match arg {
        USE_ARG_PACK => toggle_pack(world, id),
        USE_ARG_UNGARRISON_ALL => ungarrison_request(world, id),
        USE_ARG_TOWN_BELL => town_bell_request(world, id),
        _ => {
            if let Some(direction) = Direction::from_repr(arg) {
                directional_use(world, id, direction);
            }
        }
    }
}

/// Trebuchets toggle between travel and firing configurations.
fn toggle_pack(world: &mut World, id: EntityId) {
    let Some(entity) = world.arena.alive_mut(id) else {
        return;
    };
    let position = entity.pos;
    let mut toggled = false;
    if let Some(unit) = entity.unit_mut() {
        if unit.class == UnitClass::Trebuchet && unit.frozen == 0 {
            unit.packed = !unit.packed;
            toggled = true;
        }
    }
    if toggled {
        world.mark_tile_dirty(position);
    }
}

/// Arg 9: a garrisoned agent empties the building holding it; an agent in
/// the field empties the friendly building it faces.
fn ungarrison_request(world: &mut World, id: EntityId) {
    let Some(entity) = world.arena.alive(id) else {
        return;
    };
    if entity.is_garrisoned() {
        let host = world
            .arena
            .iter_alive()
            .find(|e| {
                e.building()
                    .is_some_and(|b| b.garrisoned_units.contains(&id))
            })
            .map(|e| e.id);
        if let Some(host) = host {
            production::garrison::ungarrison_all(world, host);
        }
        return;
    }
    let team = world.effective_team_of(entity);
    let facing = entity.pos.step(entity.orientation);
    if let Some(building) = world.grid.primary(facing) {
        let friendly = world
            .arena
            .alive(building)
            .is_some_and(|e| e.kind.is_garrisonable() && e.team == team);
        if friendly {
            production::garrison::ungarrison_all(world, building);
        }
    }
}

/// Arg 10: an agent standing next to a friendly town center rings the bell.
fn town_bell_request(world: &mut World, id: EntityId) {
    let Some(entity) = world.arena.alive(id) else {
        return;
    };
    let Some(team) = world.effective_team_of(entity) else {
        return;
    };
    let position = entity.pos;
    let near_tc = world
        .index
        .of_kind(EntityKind::TownCenter)
        .iter()
        .filter_map(|&tc| world.arena.alive(tc))
        .any(|e| e.team == Some(team) && position.chebyshev(e.pos) <= 1);
    if near_tc {
        production::garrison::town_bell(world, team);
    }
}

fn directional_use(world: &mut World, id: EntityId, direction: Direction) {
    let Some(entity) = world.arena.alive(id) else {
        return;
    };
    if entity.is_garrisoned() || entity.unit().is_some_and(|u| u.frozen > 0) {
        return;
    }
    let target_tile = entity.pos.step(direction);
    world.arena.get_mut(id).unwrap().orientation = direction;

    // Blocking occupant first, then the background layer.
    if let Some(target) = world.grid.primary(target_tile) {
        use_on_entity(world, id, target);
        return;
    }
    if let Some(target) = world.grid.background(target_tile) {
        use_on_entity(world, id, target);
    }
}

fn use_on_entity(world: &mut World, actor: EntityId, target: EntityId) {
    let Some(target_entity) = world.arena.alive(target) else {
        return;
    };
    let kind = target_entity.kind;

    if kind.is_resource_node() {
        economy::gather::attempt_gather(world, actor, target);
        return;
    }
    match kind {
        EntityKind::Corpse => economy::gather::attempt_carve(world, actor, target),
        EntityKind::Relic => pick_up(world, actor, target, CarryItem::Relic),
        EntityKind::Lantern => pick_up(world, actor, target, CarryItem::Lantern),
        _ if kind.is_building() => use_on_building(world, actor, target),
        _ => {}
    }
}

fn pick_up(world: &mut World, actor: EntityId, drop: EntityId, item: CarryItem) {
    if world.arena.alive(actor).and_then(|e| e.unit()).is_none() {
        return;
    }
    world.destroy_entity(drop);
    if let Some(unit) = world.arena.get_mut(actor).and_then(|e| e.unit_mut()) {
        unit.inventory.add(item, 1);
    }
}

/// The Use-on-building precedence ladder. Each rung either consumes the
/// action or declines to the next; the order is part of the observable
/// contract.
fn use_on_building(world: &mut World, actor: EntityId, building: EntityId) {
    let Some(actor_entity) = world.arena.alive(actor) else {
        return;
    };
    let Some(team) = world.effective_team_of(actor_entity) else {
        return;
    };
    let is_villager = actor_entity.unit_class() == Some(UnitClass::Villager);
    let Some(building_entity) = world.arena.alive(building) else {
        return;
    };
    // Another team's building rejects everything.
    if building_entity.team != Some(team) {
        return;
    }
    let kind = building_entity.kind;
    let damaged = building_entity.hp < building_entity.max_hp;

    // 1. A finished training order converts the visiting villager.
    if production::queue::try_complete(world, actor, building) {
        return;
    }
    // 2. A carried relic goes into monastery storage.
    if production::garrison::deposit_relic(world, actor, building) {
        return;
    }
    // 3. Unload into a matching dropoff.
    if economy::gather::attempt_dropoff(world, actor, building) {
        return;
    }
    // 4. Villagers advance construction and repairs.
    if damaged && is_villager {
        construct(world, building);
        return;
    }
    // 5+. Building-specific behavior.
    match kind {
        EntityKind::Market => economy::market::attempt_trade(world, actor, building),
        EntityKind::Castle => {
            if is_villager {
                economy::tech::try_research_castle_tech(world, actor, building);
            } else {
                production::garrison::attempt_garrison(world, actor, building);
            }
        }
        EntityKind::University => economy::tech::try_research_university(world, actor, building),
        EntityKind::Blacksmith => economy::tech::try_research_blacksmith(world, actor, building),
        EntityKind::Mill => {
            if !(is_villager && queue_reseed(world, team, building)) {
                economy::tech::try_research_economy(world, actor, building);
            }
        }
        EntityKind::Barracks | EntityKind::Stable | EntityKind::ArcheryRange => {
            training_or_upgrade(world, actor, building, is_villager)
        }
        EntityKind::LumberCamp | EntityKind::MiningCamp => {
            // Unloaded visit to a dropoff researches its economy line.
            economy::tech::try_research_economy(world, actor, building);
        }
        EntityKind::TownCenter => {
            if !economy::tech::try_research_economy(world, actor, building) {
                maybe_garrison_or_train(world, actor, building);
            }
        }
        EntityKind::Monastery => {
            if is_villager {
                training_fallback(world, building);
            } else {
                production::garrison::attempt_garrison(world, actor, building);
            }
        }
        EntityKind::Dock => training_fallback(world, building),
        _ if kind.is_garrisonable() => {
            production::garrison::attempt_garrison(world, actor, building)
        }
        _ => {}
    }
}

/// One villager-tick of construction progress.
fn construct(world: &mut World, building: EntityId) {
    let Some(entity) = world.arena.alive_mut(building) else {
        return;
    };
    entity.hp = entity
        .hp
        .saturating_add(crate::config::SimConfig::BUILD_HP_PER_USE)
        .min(entity.max_hp);
    let position = entity.pos;
    world.mark_tile_dirty(position);
}

/// Mills sell prepaid farm reseeds when the team can afford one.
fn queue_reseed(world: &mut World, team: u8, mill: EntityId) -> bool {
    const RESEED_COST: crate::state::Cost = crate::state::Cost::new(0, 1, 0, 0);
    // Research takes precedence until the farm line is exhausted.
    let line_complete = world
        .team(team)
        .next_economy_tech(crate::state::ECONOMY_LINES[3])
        .is_none();
    if !line_complete {
        return false;
    }
    if !world.teams[team as usize].debit(RESEED_COST) {
        return false;
    }
    if let Some(building) = world.arena.get_mut(mill).and_then(|e| e.building_mut()) {
        building.queued_farm_reseeds = building.queued_farm_reseeds.saturating_add(1);
    }
    true
}

/// Military buildings: research the line upgrade while tiers remain, then
/// fall back to enqueuing the base class.
fn training_or_upgrade(world: &mut World, actor: EntityId, building: EntityId, is_villager: bool) {
    if is_villager {
        let line = world
            .arena
            .alive(building)
            .and_then(|e| crate::tables::upgrade_line_for(e.kind));
        if let Some(line) = line {
            let team = world.arena.alive(building).and_then(|e| e.team);
            if let Some(team) = team {
                if world.team(team).unit_upgrades[line] < 2 {
                    economy::tech::try_research_unit_upgrade(world, actor, building);
                    return;
                }
            }
        }
    }
    training_fallback(world, building);
}

/// Enqueue the building's first trainable class.
fn training_fallback(world: &mut World, building: EntityId) {
    let class = world
        .arena
        .alive(building)
        .and_then(|e| crate::tables::trainable_classes(e.kind).first().copied());
    if let Some(class) = class {
        production::queue::try_enqueue(world, building, class);
    }
}

/// Town centers garrison non-villagers and train villagers otherwise.
fn maybe_garrison_or_train(world: &mut World, actor: EntityId, building: EntityId) {
    let is_villager = world
        .arena
        .alive(actor)
        .is_some_and(|e| e.unit_class() == Some(UnitClass::Villager));
    if is_villager {
        training_fallback(world, building);
    } else {
        production::garrison::attempt_garrison(world, actor, building);
    }
}

/// Give: hand the whole inventory to an adjacent allied agent.
fn give_action(world: &mut World, id: EntityId, direction: Direction) {
    let Some(giver) = world.arena.alive(id) else {
        return;
    };
    let Some(team) = world.effective_team_of(giver) else {
        return;
    };
    if giver.unit().is_some_and(|u| u.frozen > 0) || giver.is_garrisoned() {
        return;
    }
    let target_tile = giver.pos.step(direction);
    let Some(receiver) = world.grid.primary(target_tile) else {
        return;
    };
    let receiver_ok = world.arena.alive(receiver).is_some_and(|e| {
        e.is_agent()
            && world
                .effective_team_of(e)
                .is_some_and(|t| world.are_allied(team, t))
    });
    if !receiver_ok {
        return;
    }

    world.arena.get_mut(id).unwrap().orientation = direction;
    let items: Vec<(CarryItem, u16)> = world
        .arena
        .alive(id)
        .and_then(|e| e.unit())
        .map(|u| u.inventory.iter().collect())
        .unwrap_or_default();
    for (item, count) in items {
        if let Some(unit) = world.arena.get_mut(id).and_then(|e| e.unit_mut()) {
            unit.inventory.take(item, count);
        }
        if let Some(unit) = world.arena.get_mut(receiver).and_then(|e| e.unit_mut()) {
            unit.inventory.add(item, count);
        }
    }
    world.mark_tile_dirty(target_tile);
}
