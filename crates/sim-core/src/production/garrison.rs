//! Garrisoning, ejection, and the town bell.

use crate::state::{CarryItem, EntityId, EntityKind, Position, UnitClass, World};
use crate::tables;

/// Use on a friendly garrisonable building: the unit leaves the grid and
/// occupies a garrison slot. Fails silently at capacity.
pub(crate) fn attempt_garrison(world: &mut World, unit: EntityId, building: EntityId) {
    let Some(unit_entity) = world.arena.alive(unit) else {
        return;
    };
    if !unit_entity.is_agent() || unit_entity.is_garrisoned() {
        return;
    }
    let Some(team) = world.effective_team_of(unit_entity) else {
        return;
    };
    let Some(building_entity) = world.arena.alive(building) else {
        return;
    };
    if !building_entity.kind.is_garrisonable() || building_entity.team != Some(team) {
        return;
    }
    let capacity = tables::building_stats(building_entity.kind).garrison_capacity as usize;
    let occupied = building_entity
        .building()
        .map(|b| b.garrisoned_units.len())
        .unwrap_or(0);
    if occupied >= capacity {
        return;
    }

    let agent = unit_entity.agent_id();
    world
        .lift_from_grid(unit)
        .expect("garrisoning unit was on the grid");
    if let Some(data) = world.arena.get_mut(unit).and_then(|e| e.unit_mut()) {
        data.garrisoned = true;
    }
    if let Some(data) = world.arena.get_mut(building).and_then(|e| e.building_mut()) {
        data.garrisoned_units.push(unit);
    }
    if let Some(agent) = agent {
        world.agents.mark_dirty(agent);
    }
}

/// Ejects every garrisoned unit onto free tiles around the building. Units
/// stay garrisoned when the surroundings are packed.
pub(crate) fn ungarrison_all(world: &mut World, building: EntityId) {
    let Some(entity) = world.arena.alive(building) else {
        return;
    };
    let anchor = entity.pos;
    let occupants: Vec<EntityId> = entity
        .building()
        .map(|b| b.garrisoned_units.iter().copied().collect())
        .unwrap_or_default();

    for occupant in occupants {
        let Some(tile) = world.adjacent_free_tile(anchor) else {
            break;
        };
        if let Some(data) = world.arena.get_mut(building).and_then(|e| e.building_mut()) {
            if let Some(slot) = data.garrisoned_units.iter().position(|&id| id == occupant) {
                data.garrisoned_units.remove(slot);
            } else {
                continue;
            }
        }
        if let Some(unit) = world.arena.get_mut(occupant).and_then(|e| e.unit_mut()) {
            unit.garrisoned = false;
        }
        world
            .place_on_grid(occupant, tile)
            .expect("ejection tile was checked free");
        if let Some(agent) = world.arena.get(occupant).and_then(|e| e.agent_id()) {
            world.agents.mark_dirty(agent);
        }
    }
}

/// Town bell: every villager of `team` takes cover in the nearest friendly
/// town center with a free slot.
pub(crate) fn town_bell(world: &mut World, team: u8) {
    let villagers: Vec<EntityId> = (0..world.agent_count() as u16)
        .filter_map(|agent| world.agent_entity(agent))
        .filter(|e| e.unit_class() == Some(UnitClass::Villager) && !e.is_garrisoned())
        .filter(|e| world.effective_team_of(e) == Some(team))
        .map(|e| e.id)
        .collect();

    for villager in villagers {
        let Some(position) = world.arena.alive(villager).map(|e| e.pos) else {
            continue;
        };
        let Some(tc) = nearest_town_center_with_room(world, team, position) else {
            return;
        };
        attempt_garrison(world, villager, tc);
    }
}

fn nearest_town_center_with_room(
    world: &World,
    team: u8,
    from: Position,
) -> Option<EntityId> {
    let capacity = tables::building_stats(EntityKind::TownCenter).garrison_capacity as usize;
    world
        .index
        .of_kind(EntityKind::TownCenter)
        .iter()
        .filter_map(|&id| world.arena.alive(id))
        .filter(|e| e.team == Some(team))
        .filter(|e| {
            e.building()
                .map(|b| b.garrisoned_units.len() < capacity)
                .unwrap_or(false)
        })
        .min_by_key(|e| (from.manhattan(e.pos), e.id))
        .map(|e| e.id)
}

/// Use on a friendly monastery while carrying a relic: the relic goes into
/// storage and counts toward the relic victory.
pub(crate) fn deposit_relic(world: &mut World, monk: EntityId, monastery: EntityId) -> bool {
    let Some(monk_entity) = world.arena.alive(monk) else {
        return false;
    };
    let Some(team) = world.effective_team_of(monk_entity) else {
        return false;
    };
    let carrying = monk_entity
        .unit()
        .map(|u| u.inventory.count(CarryItem::Relic))
        .unwrap_or(0);
    if carrying == 0 {
        return false;
    }
    let Some(monastery_entity) = world.arena.alive(monastery) else {
        return false;
    };
    if monastery_entity.kind != EntityKind::Monastery || monastery_entity.team != Some(team) {
        return false;
    }

    if let Some(unit) = world.arena.get_mut(monk).and_then(|e| e.unit_mut()) {
        unit.inventory.take(CarryItem::Relic, 1);
    }
    if let Some(data) = world.arena.get_mut(monastery).and_then(|e| e.building_mut()) {
        data.garrisoned_relics += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::FnInitializer;

    fn setup() -> World {
        World::new(
            SimConfig::default(),
            42,
            &FnInitializer(|_: &mut World| Ok(())),
        )
        .unwrap()
    }

    #[test]
    fn garrison_lifts_unit_off_grid() {
        let mut world = setup();
        let unit = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let tower = world
            .spawn_building(EntityKind::GuardTower, 0, Position::new(11, 10), true)
            .unwrap();

        attempt_garrison(&mut world, unit, tower);

        let entity = world.entity(unit).unwrap();
        assert!(entity.is_garrisoned());
        assert_eq!(entity.pos, Position::OFF_GRID);
        assert!(world.grid_view().primary(Position::new(10, 10)).is_none());
        assert_eq!(
            world
                .entity(tower)
                .unwrap()
                .building()
                .unwrap()
                .garrisoned_units
                .len(),
            1
        );
    }

    #[test]
    fn garrison_respects_capacity() {
        let mut world = setup();
        let house = world
            .spawn_building(EntityKind::House, 0, Position::new(30, 30), true)
            .unwrap();
        let capacity = tables::building_stats(EntityKind::House).garrison_capacity as usize;
        for i in 0..capacity + 1 {
            let unit = world
                .spawn_agent(0, UnitClass::Villager, Position::new(10 + i as i32 * 2, 10))
                .unwrap();
            attempt_garrison(&mut world, unit, house);
        }
        assert_eq!(
            world
                .entity(house)
                .unwrap()
                .building()
                .unwrap()
                .garrisoned_units
                .len(),
            capacity
        );
    }

    #[test]
    fn ungarrison_places_units_around_building() {
        let mut world = setup();
        let unit = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let tc = world
            .spawn_building(EntityKind::TownCenter, 0, Position::new(12, 10), true)
            .unwrap();
        attempt_garrison(&mut world, unit, tc);

        ungarrison_all(&mut world, tc);
        let entity = world.entity(unit).unwrap();
        assert!(!entity.is_garrisoned());
        assert_eq!(entity.pos.chebyshev(Position::new(12, 10)), 1);
    }

    #[test]
    fn enemy_building_refuses_garrison() {
        let mut world = setup();
        let unit = world
            .spawn_agent(1, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let tower = world
            .spawn_building(EntityKind::GuardTower, 0, Position::new(11, 10), true)
            .unwrap();
        attempt_garrison(&mut world, unit, tower);
        assert!(!world.entity(unit).unwrap().is_garrisoned());
        let _ = tower;
    }

    #[test]
    fn relic_deposit_moves_relic_into_storage() {
        let mut world = setup();
        let monk = world
            .spawn_agent(0, UnitClass::Monk, Position::new(10, 10))
            .unwrap();
        let monastery = world
            .spawn_building(EntityKind::Monastery, 0, Position::new(11, 10), true)
            .unwrap();
        world
            .entity_mut(monk)
            .unwrap()
            .unit_mut()
            .unwrap()
            .inventory
            .add(CarryItem::Relic, 1);

        assert!(deposit_relic(&mut world, monk, monastery));
        assert_eq!(
            world
                .entity(monastery)
                .unwrap()
                .building()
                .unwrap()
                .garrisoned_relics,
            1
        );
        assert!(!deposit_relic(&mut world, monk, monastery));
    }
}
