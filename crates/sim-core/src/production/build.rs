//! Building placement.

use crate::state::{Direction, EntityId, EntityKind, Position, Terrain, UnitClass, World};
use crate::tables;

/// Entry point for the Build verb. `index` addresses the fixed placeable
/// table; the destination is the first legal tile in the search order
/// {orientation, N, E, S, W, NW, NE, SW, SE} around the builder.
pub(crate) fn attempt_build(world: &mut World, builder: EntityId, index: u8) {
    let Some(kind) = tables::BUILD_INDEX.get(index as usize).copied() else {
        return;
    };
    let Some(builder_entity) = world.arena.alive(builder) else {
        return;
    };
    if builder_entity.unit_class() != Some(UnitClass::Villager) {
        return;
    }
    let Some(team) = world.effective_team_of(builder_entity) else {
        return;
    };
    let origin = builder_entity.pos;
    let orientation = builder_entity.orientation;

    let Some(site) = find_site(world, kind, origin, orientation) else {
        return;
    };
    if !world.teams[team as usize].debit(tables::building_stats(kind).cost) {
        return;
    }

    world
        .spawn_building(kind, team, site, false)
        .expect("site was checked free");

    if matches!(
        kind,
        EntityKind::Mill | EntityKind::LumberCamp | EntityKind::MiningCamp
    ) {
        pave_road_to_town_center(world, team, site);
    }
}

/// Search order fixed by the tie-break contract: the builder's facing tile
/// first, then cardinals, then diagonals.
fn find_site(
    world: &World,
    kind: EntityKind,
    origin: Position,
    orientation: Direction,
) -> Option<Position> {
    const SEARCH: [Direction; 8] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
        Direction::SouthWest,
        Direction::SouthEast,
    ];
    std::iter::once(orientation)
        .chain(SEARCH.iter().copied())
        .map(|direction| origin.step(direction))
        .find(|&site| site_legal(world, kind, site))
}

fn site_legal(world: &World, kind: EntityKind, site: Position) -> bool {
    if !world.grid.contains(site) {
        return false;
    }
    let terrain = world.grid.terrain(site);
    let wants_water = tables::WATER_BUILDINGS.contains(&kind);
    if wants_water {
        if !terrain.is_water() {
            return false;
        }
    } else if terrain.is_water() || terrain == Terrain::Empty {
        return false;
    }
    if kind.is_blocking() {
        world.grid.primary(site).is_none()
    } else {
        world.grid.background(site).is_none()
    }
}

/// Economy camps pave a road back to the nearest friendly town center: the
/// horizontal leg first, then the vertical leg, endpoints excluded.
fn pave_road_to_town_center(world: &mut World, team: u8, from: Position) {
    let Some(tc) = world.nearest_of_kind(EntityKind::TownCenter, Some(team), from) else {
        return;
    };
    let Some(to) = world.arena.alive(tc).map(|e| e.pos) else {
        return;
    };
    let mut cursor = from;
    let mut path = Vec::new();
    while cursor.x != to.x {
        cursor.x += (to.x - cursor.x).signum();
        path.push(cursor);
    }
    while cursor.y != to.y {
        cursor.y += (to.y - cursor.y).signum();
        path.push(cursor);
    }
    for tile in path {
        if tile == to || tile == from {
            continue;
        }
        if !world.grid.terrain(tile).is_water() {
            world.set_terrain(tile, Terrain::Road);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::FnInitializer;
    use crate::state::Resource;

    fn setup() -> (World, EntityId) {
        let mut world = World::new(
            SimConfig::default(),
            42,
            &FnInitializer(|_: &mut World| Ok(())),
        )
        .unwrap();
        let builder = world
            .spawn_agent(0, UnitClass::Villager, Position::new(20, 20))
            .unwrap();
        (world, builder)
    }

    fn build_arg(kind: EntityKind) -> u8 {
        tables::BUILD_INDEX.iter().position(|&k| k == kind).unwrap() as u8
    }

    #[test]
    fn house_lands_on_facing_tile() {
        let (mut world, builder) = setup();
        world.team_mut(0).credit(Resource::Wood, 10);
        world.entity_mut(builder).unwrap().orientation = Direction::East;

        attempt_build(&mut world, builder, build_arg(EntityKind::House));

        let site = Position::new(21, 20);
        let id = world.grid_view().primary(site).unwrap();
        let house = world.entity(id).unwrap();
        assert_eq!(house.kind, EntityKind::House);
        // Construction sites start at 1 hp.
        assert_eq!(house.hp, 1);
        assert_eq!(house.team, Some(0));
    }

    #[test]
    fn blocked_facing_tile_degrades_to_north() {
        let (mut world, builder) = setup();
        world.team_mut(0).credit(Resource::Wood, 10);
        world.entity_mut(builder).unwrap().orientation = Direction::East;
        world
            .spawn_resource(EntityKind::Tree, Position::new(21, 20))
            .unwrap();

        attempt_build(&mut world, builder, build_arg(EntityKind::House));

        let fallback = Position::new(20, 19);
        let id = world.grid_view().primary(fallback).unwrap();
        assert_eq!(world.entity(id).unwrap().kind, EntityKind::House);
    }

    #[test]
    fn build_fails_without_wood() {
        let (mut world, builder) = setup();
        attempt_build(&mut world, builder, build_arg(EntityKind::House));
        assert!(world.grid_view().primary(Position::new(20, 19)).is_none());
    }

    #[test]
    fn dock_requires_water_house_rejects_it() {
        let (mut world, builder) = setup();
        world.team_mut(0).credit(Resource::Wood, 20);
        world.set_terrain(Position::new(21, 20), Terrain::Water);
        world.entity_mut(builder).unwrap().orientation = Direction::East;

        attempt_build(&mut world, builder, build_arg(EntityKind::Dock));
        let dock = world.grid_view().background(Position::new(21, 20));
        assert!(dock.is_some());

        // The house skips the water tile and degrades to the next slot.
        attempt_build(&mut world, builder, build_arg(EntityKind::House));
        assert!(world.grid_view().primary(Position::new(21, 20)).is_none());
        assert!(world.grid_view().primary(Position::new(20, 19)).is_some());
    }

    #[test]
    fn lumber_camp_paves_road_to_town_center() {
        let (mut world, builder) = setup();
        world
            .spawn_building(EntityKind::TownCenter, 0, Position::new(26, 20), true)
            .unwrap();
        world.team_mut(0).credit(Resource::Wood, 10);
        world.entity_mut(builder).unwrap().orientation = Direction::West;

        attempt_build(&mut world, builder, build_arg(EntityKind::LumberCamp));

        // Camp at (19,20); road runs toward the town center at (26,20).
        assert_eq!(world.grid_view().terrain(Position::new(22, 20)), Terrain::Road);
        assert_eq!(world.grid_view().terrain(Position::new(25, 20)), Terrain::Road);
        // Endpoints keep their terrain.
        assert_ne!(world.grid_view().terrain(Position::new(19, 20)), Terrain::Road);
    }
}
