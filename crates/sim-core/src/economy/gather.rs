//! Gathering and dropoff.

use crate::state::{
    CarryItem, EconomyTechs, EntityId, EntityKind, Resource, UnitClass, World,
};
use crate::tables;

/// Gather yield for one Use on a node, before cap clamping: one unit plus
/// the cumulative tech bonuses for the node's resource line.
fn gather_yield(world: &World, team: u8, node_kind: EntityKind) -> u16 {
    let techs = world.team(team).economy;
    let bonus = match node_kind {
        EntityKind::Tree => {
            techs.contains(EconomyTechs::DOUBLE_BIT_AXE) as u16
                + techs.contains(EconomyTechs::BOW_SAW) as u16
                + techs.contains(EconomyTechs::TWO_MAN_SAW) as u16
        }
        EntityKind::GoldMine => {
            techs.contains(EconomyTechs::GOLD_MINING) as u16
                + techs.contains(EconomyTechs::GOLD_SHAFT_MINING) as u16
        }
        EntityKind::StoneMine => {
            techs.contains(EconomyTechs::STONE_MINING) as u16
                + techs.contains(EconomyTechs::STONE_SHAFT_MINING) as u16
        }
        EntityKind::WheatField => {
            techs.contains(EconomyTechs::HORSE_COLLAR) as u16
                + techs.contains(EconomyTechs::HEAVY_PLOW) as u16
                + techs.contains(EconomyTechs::CROP_ROTATION) as u16
        }
        _ => 0,
    };
    1 + bonus
}

/// Use on a resource node: move up to one action's yield from the node into
/// the gatherer's inventory, bounded by the carry capacity.
pub(crate) fn attempt_gather(world: &mut World, gatherer: EntityId, node: EntityId) {
    let Some(gatherer_entity) = world.arena.alive(gatherer) else {
        return;
    };
    let Some(team) = world.effective_team_of(gatherer_entity) else {
        return;
    };
    let Some(unit) = gatherer_entity.unit() else {
        return;
    };
    let Some(node_entity) = world.arena.alive(node) else {
        return;
    };
    let node_kind = node_entity.kind;
    let Some(item) = tables::resource_node_item(node_kind) else {
        return;
    };
    // Villagers work the land; boats work the fisheries.
    let allowed = match node_kind {
        EntityKind::Fish => unit.class == UnitClass::Boat || unit.class == UnitClass::Villager,
        _ => unit.class == UnitClass::Villager,
    };
    if !allowed {
        return;
    }

    let capacity = world.team(team).carry_capacity();
    let carried = unit.inventory.count(item);
    if carried >= capacity {
        return;
    }
    let space = capacity - carried;
    let remaining = node_entity.resource().map(|r| r.remaining).unwrap_or(0);
    let amount = gather_yield(world, team, node_kind)
        .min(space)
        .min(remaining);
    if amount == 0 {
        return;
    }

    if let Some(resource) = world.arena.get_mut(node).and_then(|e| e.resource_mut()) {
        resource.remaining -= amount;
    }
    let depleted = world
        .arena
        .get(node)
        .and_then(|e| e.resource())
        .is_some_and(|r| r.remaining == 0);

    if let Some(unit) = world.arena.get_mut(gatherer).and_then(|e| e.unit_mut()) {
        unit.inventory.add(item, amount);
        let agent = unit.agent_id;
        let reward = world.config.rewards.gather * amount as f32;
        world.agents.add_reward(agent, reward);
    }

    if depleted {
        deplete_node(world, node, node_kind, team);
    }
}

/// Exhausted wheat fields consume a prepaid reseed from the nearest friendly
/// mill instead of vanishing; every other node is removed.
fn deplete_node(world: &mut World, node: EntityId, kind: EntityKind, team: u8) {
    if kind == EntityKind::WheatField {
        let position = world.arena.get(node).map(|e| e.pos).unwrap_or_default();
        let mill = world
            .nearest_of_kind(EntityKind::Mill, Some(team), position)
            .filter(|&id| {
                world
                    .arena
                    .alive(id)
                    .and_then(|e| e.building())
                    .is_some_and(|b| b.queued_farm_reseeds > 0)
            });
        if let Some(mill) = mill {
            if let Some(building) = world.arena.get_mut(mill).and_then(|e| e.building_mut()) {
                building.queued_farm_reseeds -= 1;
            }
            if let Some(resource) = world.arena.get_mut(node).and_then(|e| e.resource_mut()) {
                resource.remaining = tables::resource_node_amount(EntityKind::WheatField);
            }
            return;
        }
    }
    world.destroy_entity(node);
}

/// Use on a corpse: carve one unit of meat.
pub(crate) fn attempt_carve(world: &mut World, gatherer: EntityId, corpse: EntityId) {
    let Some(gatherer_entity) = world.arena.alive(gatherer) else {
        return;
    };
    let Some(team) = world.effective_team_of(gatherer_entity) else {
        return;
    };
    if gatherer_entity.unit_class() != Some(UnitClass::Villager) {
        return;
    }
    let capacity = world.team(team).carry_capacity();
    let carried = gatherer_entity
        .unit()
        .map(|u| u.inventory.count(CarryItem::Meat))
        .unwrap_or(0);
    if carried >= capacity {
        return;
    }
    let meat = world
        .arena
        .alive(corpse)
        .and_then(|e| e.drop_data())
        .map(|d| d.meat)
        .unwrap_or(0);
    if meat == 0 {
        world.destroy_entity(corpse);
        return;
    }
    if let crate::state::EntityData::Drop(drop) = &mut world.arena.get_mut(corpse).unwrap().data {
        drop.meat -= 1;
    }
    if let Some(unit) = world.arena.get_mut(gatherer).and_then(|e| e.unit_mut()) {
        unit.inventory.add(CarryItem::Meat, 1);
        let agent = unit.agent_id;
        let reward = world.config.rewards.gather;
        world.agents.add_reward(agent, reward);
    }
    let now_empty = world
        .arena
        .get(corpse)
        .and_then(|e| e.drop_data())
        .is_some_and(|d| d.meat == 0);
    if now_empty {
        world.destroy_entity(corpse);
    }
}

/// Use on a dropoff building: transfer every accepted item into the team
/// stockpile. Returns true when anything moved (the Use dispatcher falls
/// through to research on an unloaded visit).
pub(crate) fn attempt_dropoff(world: &mut World, carrier: EntityId, building: EntityId) -> bool {
    let Some(carrier_entity) = world.arena.alive(carrier) else {
        return false;
    };
    let Some(team) = world.effective_team_of(carrier_entity) else {
        return false;
    };
    let Some(building_entity) = world.arena.alive(building) else {
        return false;
    };
    if building_entity.team != Some(team) {
        return false;
    }
    let kind = building_entity.kind;
    let Some(unit) = carrier_entity.unit() else {
        return false;
    };

    let transfers: Vec<(CarryItem, Resource, u16)> = unit
        .inventory
        .iter()
        .filter_map(|(item, count)| {
            tables::dropoff_accepts(kind, item).map(|resource| (item, resource, count))
        })
        .collect();
    if transfers.is_empty() {
        return false;
    }

    let agent = unit.agent_id;
    let mut total = 0u32;
    for &(item, resource, count) in &transfers {
        if let Some(unit) = world.arena.get_mut(carrier).and_then(|e| e.unit_mut()) {
            let taken = unit.inventory.take(item, count);
            world.teams[team as usize].credit(resource, taken as u32);
            total += taken as u32;
        }
        let _ = item;
    }
    let reward = world.config.rewards.dropoff * total as f32;
    world.agents.add_reward(agent, reward);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::FnInitializer;
    use crate::state::Position;

    fn world_with(f: impl Fn(&mut World) -> Result<(), crate::error::ConfigError>) -> World {
        World::new(SimConfig::default(), 42, &FnInitializer(f)).unwrap()
    }

    #[test]
    fn gather_fills_inventory_and_drains_node() {
        let mut world = world_with(|_| Ok(()));
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let tree = world
            .spawn_resource(EntityKind::Tree, Position::new(11, 10))
            .unwrap();

        attempt_gather(&mut world, villager, tree);
        let unit = world.entity(villager).unwrap().unit().unwrap();
        assert_eq!(unit.inventory.count(CarryItem::Wood), 1);
        assert_eq!(world.entity(tree).unwrap().resource().unwrap().remaining, 74);
    }

    #[test]
    fn gather_respects_carry_capacity() {
        let mut world = world_with(|_| Ok(()));
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let tree = world
            .spawn_resource(EntityKind::Tree, Position::new(11, 10))
            .unwrap();

        for _ in 0..SimConfig::BASE_CARRY + 5 {
            attempt_gather(&mut world, villager, tree);
        }
        let unit = world.entity(villager).unwrap().unit().unwrap();
        assert_eq!(unit.inventory.count(CarryItem::Wood), SimConfig::BASE_CARRY);
    }

    #[test]
    fn dropoff_moves_wood_to_stockpile() {
        let mut world = world_with(|_| Ok(()));
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let camp = world
            .spawn_building(EntityKind::LumberCamp, 0, Position::new(11, 10), true)
            .unwrap();
        world
            .entity_mut(villager)
            .unwrap()
            .unit_mut()
            .unwrap()
            .inventory
            .add(CarryItem::Wood, 7);

        assert!(attempt_dropoff(&mut world, villager, camp));
        assert_eq!(world.team(0).stockpile(Resource::Wood), 7);
        assert!(
            world
                .entity(villager)
                .unwrap()
                .unit()
                .unwrap()
                .inventory
                .is_empty()
        );
        // Second visit has nothing to unload.
        assert!(!attempt_dropoff(&mut world, villager, camp));
    }

    #[test]
    fn lumber_camp_rejects_gold() {
        let mut world = world_with(|_| Ok(()));
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let camp = world
            .spawn_building(EntityKind::LumberCamp, 0, Position::new(11, 10), true)
            .unwrap();
        world
            .entity_mut(villager)
            .unwrap()
            .unit_mut()
            .unwrap()
            .inventory
            .add(CarryItem::Gold, 4);

        assert!(!attempt_dropoff(&mut world, villager, camp));
        assert_eq!(world.team(0).stockpile(Resource::Gold), 0);
    }

    #[test]
    fn mill_converts_wheat_to_food() {
        let mut world = world_with(|_| Ok(()));
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let mill = world
            .spawn_building(EntityKind::Mill, 0, Position::new(11, 10), true)
            .unwrap();
        world
            .entity_mut(villager)
            .unwrap()
            .unit_mut()
            .unwrap()
            .inventory
            .add(CarryItem::Wheat, 5);

        assert!(attempt_dropoff(&mut world, villager, mill));
        assert_eq!(world.team(0).stockpile(Resource::Food), 5);
    }

    #[test]
    fn wood_techs_raise_yield() {
        let mut world = world_with(|_| Ok(()));
        world.team_mut(0).economy |= EconomyTechs::DOUBLE_BIT_AXE | EconomyTechs::BOW_SAW;
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let tree = world
            .spawn_resource(EntityKind::Tree, Position::new(11, 10))
            .unwrap();

        attempt_gather(&mut world, villager, tree);
        let unit = world.entity(villager).unwrap().unit().unwrap();
        assert_eq!(unit.inventory.count(CarryItem::Wood), 3);
    }
}
