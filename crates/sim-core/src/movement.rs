//! Per-agent movement: step legality, swaps, and terrain speed debt.
//!
//! A Move action is a single attempted step in one of eight directions, but
//! only cardinal steps can succeed: the elevation legality check rejects
//! every diagonal. Cavalry and water classes chain a second step on clear
//! ground; roads refund the debt accumulator and grant non-cavalry classes a
//! bonus step.

use crate::config::SimConfig;
use crate::state::{Direction, EntityId, EntityKind, Position, Terrain, UnitClass, World};
use crate::tables;

/// Outcome of one attempted step; distinguishes "tile changed" from "action
/// consumed by debt or rules".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepOutcome {
    Moved,
    Swapped,
    Rejected,
    /// Debt crossed the threshold: the step is spent but nothing moved.
    Slowed,
}

/// Entry point for the Move verb.
pub(crate) fn attempt_move(world: &mut World, id: EntityId, direction: Direction) {
    let Some(entity) = world.arena.alive(id) else {
        return;
    };
    let Some(unit) = entity.unit() else {
        return;
    };
    if unit.garrisoned || unit.frozen > 0 {
        return;
    }
    // Trebuchets travel packed and fight unpacked.
    if unit.class == UnitClass::Trebuchet && !unit.packed {
        return;
    }
    let class = unit.class;

    // Facing updates even when the step is rejected.
    world.arena.get_mut(id).unwrap().orientation = direction;

    if !direction.is_cardinal() {
        return;
    }

    let outcome = step_once(world, id, class, direction);
    if outcome != StepOutcome::Moved {
        return;
    }

    // Double-step rules evaluated on the tile just entered.
    let position = world.arena.get(id).map(|e| e.pos).unwrap_or_default();
    let terrain = world.grid.terrain(position);
    let chain = if terrain == Terrain::Road && !class.is_cavalry() {
        true
    } else {
        (class.is_cavalry() || class.is_water()) && terrain.speed_tenths() == 10
    };
    if chain {
        let _ = step_once(world, id, class, direction);
    }
}

fn step_once(
    world: &mut World,
    id: EntityId,
    class: UnitClass,
    direction: Direction,
) -> StepOutcome {
    let Some(entity) = world.arena.alive(id) else {
        return StepOutcome::Rejected;
    };
    let from = entity.pos;
    let to = from.step(direction);

    if !world.grid.contains(to) {
        return StepOutcome::Rejected;
    }
    let terrain = world.grid.terrain(to);
    if !tables::can_traverse(class, terrain) {
        // Land units may still enter water by embarking at a dock tile.
        if !(terrain.is_water() && dock_at(world, to)) {
            return StepOutcome::Rejected;
        }
    }
    if !elevation_permits(world, from, to, direction) {
        return StepOutcome::Rejected;
    }

    match world.grid.primary(to) {
        None => {
            if pay_speed_debt(world, id, terrain) {
                return StepOutcome::Slowed;
            }
            let agent = world.arena.get(id).and_then(|e| e.agent_id());
            world
                .relocate(id, to)
                .expect("occupancy desync during move");
            if let Some(agent) = agent {
                world.agents.mark_dirty(agent);
            }
            StepOutcome::Moved
        }
        Some(occupant_id) => try_swap(world, id, occupant_id, terrain),
    }
}

/// Same-team, non-frozen agents exchange positions; everything else blocks.
fn try_swap(
    world: &mut World,
    mover: EntityId,
    occupant: EntityId,
    terrain: Terrain,
) -> StepOutcome {
    let Some(occupant_entity) = world.arena.alive(occupant) else {
        return StepOutcome::Rejected;
    };
    if !occupant_entity.is_agent() {
        return StepOutcome::Rejected;
    }
    let Some(occupant_unit) = occupant_entity.unit() else {
        return StepOutcome::Rejected;
    };
    if occupant_unit.frozen > 0 {
        return StepOutcome::Rejected;
    }
    let mover_team = world
        .arena
        .alive(mover)
        .and_then(|e| world.effective_team_of(e));
    let occupant_team = world.effective_team_of(occupant_entity);
    if mover_team.is_none() || mover_team != occupant_team {
        return StepOutcome::Rejected;
    }
    // The swap destination must carry the occupant too.
    let occupant_class = occupant_unit.class;
    let mover_pos = world.arena.get(mover).map(|e| e.pos).unwrap_or_default();
    if !tables::can_traverse(occupant_class, world.grid.terrain(mover_pos)) {
        return StepOutcome::Rejected;
    }
    if pay_speed_debt(world, mover, terrain) {
        return StepOutcome::Slowed;
    }

    let occupant_pos = world.arena.get(occupant).map(|e| e.pos).unwrap_or_default();
    world.grid.set_primary(mover_pos, Some(occupant));
    world.grid.set_primary(occupant_pos, Some(mover));
    world.arena.get_mut(mover).unwrap().pos = occupant_pos;
    world.arena.get_mut(occupant).unwrap().pos = mover_pos;
    world.mark_tile_dirty(mover_pos);
    world.mark_tile_dirty(occupant_pos);
    for id in [mover, occupant] {
        if let Some(agent) = world.arena.get(id).and_then(|e| e.agent_id()) {
            world.agents.mark_dirty(agent);
        }
    }
    StepOutcome::Swapped
}

/// Uphill steps need a correctly-oriented ramp on the source tile.
fn elevation_permits(world: &World, from: Position, to: Position, direction: Direction) -> bool {
    let delta = world.grid.elevation(to) - world.grid.elevation(from);
    if delta <= 0 {
        return true;
    }
    if delta > 1 {
        return false;
    }
    world.grid.terrain(from).ramp_direction() == Some(direction)
}

/// Accumulates terrain debt for a step onto `terrain`. Returns true when
/// the debt crossed the threshold and the step must be skipped. Roads clear
/// the accumulator outright.
fn pay_speed_debt(world: &mut World, id: EntityId, terrain: Terrain) -> bool {
    let Some(unit) = world.arena.get_mut(id).and_then(|e| e.unit_mut()) else {
        return false;
    };
    if terrain == Terrain::Road {
        unit.speed_debt = 0;
        return false;
    }
    unit.speed_debt += SimConfig::SPEED_DEBT_SCALE - terrain.speed_tenths();
    if unit.speed_debt >= SimConfig::SPEED_DEBT_THRESHOLD {
        unit.speed_debt -= SimConfig::SPEED_DEBT_THRESHOLD;
        return true;
    }
    false
}

/// True when the tile hosts an alive dock on its background layer.
fn dock_at(world: &World, position: Position) -> bool {
    world
        .grid
        .background(position)
        .and_then(|id| world.arena.alive(id))
        .is_some_and(|e| e.kind == EntityKind::Dock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::FnInitializer;
    use crate::state::World;

    fn empty_world() -> World {
        World::new(
            SimConfig::default(),
            42,
            &FnInitializer(|_: &mut World| Ok(())),
        )
        .unwrap()
    }

    #[test]
    fn cardinal_step_moves_agent() {
        let mut world = empty_world();
        let id = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        attempt_move(&mut world, id, Direction::East);
        assert_eq!(world.entity(id).unwrap().pos, Position::new(11, 10));
        assert_eq!(world.grid_view().primary(Position::new(10, 10)), None);
    }

    #[test]
    fn diagonal_step_always_rejected() {
        let mut world = empty_world();
        let id = world
            .spawn_agent(0, UnitClass::Knight, Position::new(10, 10))
            .unwrap();
        attempt_move(&mut world, id, Direction::SouthEast);
        assert_eq!(world.entity(id).unwrap().pos, Position::new(10, 10));
        // Facing still turned toward the attempt.
        assert_eq!(world.entity(id).unwrap().orientation, Direction::SouthEast);
    }

    #[test]
    fn enemies_block_allies_swap() {
        let mut world = empty_world();
        let a = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let b = world
            .spawn_agent(0, UnitClass::Archer, Position::new(11, 10))
            .unwrap();
        attempt_move(&mut world, a, Direction::East);
        assert_eq!(world.entity(a).unwrap().pos, Position::new(11, 10));
        assert_eq!(world.entity(b).unwrap().pos, Position::new(10, 10));

        let enemy = world
            .spawn_agent(1, UnitClass::Villager, Position::new(12, 10))
            .unwrap();
        attempt_move(&mut world, a, Direction::East);
        assert_eq!(world.entity(a).unwrap().pos, Position::new(11, 10));
        assert_eq!(world.entity(enemy).unwrap().pos, Position::new(12, 10));
    }

    #[test]
    fn mud_slows_by_debt() {
        let mut world = empty_world();
        for x in 0..40 {
            world.set_terrain(Position::new(x, 20), Terrain::Mud);
        }
        let id = world
            .spawn_agent(0, UnitClass::Villager, Position::new(0, 20))
            .unwrap();
        let mut advanced = 0;
        for _ in 0..10 {
            let before = world.entity(id).unwrap().pos;
            attempt_move(&mut world, id, Direction::East);
            if world.entity(id).unwrap().pos != before {
                advanced += 1;
            }
        }
        // Mud speed 0.7: three of ten steps are spent on debt.
        assert_eq!(advanced, 7);
    }

    #[test]
    fn road_grants_double_step_to_infantry() {
        let mut world = empty_world();
        for x in 0..40 {
            world.set_terrain(Position::new(x, 20), Terrain::Road);
        }
        let id = world
            .spawn_agent(0, UnitClass::Villager, Position::new(0, 20))
            .unwrap();
        attempt_move(&mut world, id, Direction::East);
        assert_eq!(world.entity(id).unwrap().pos, Position::new(2, 20));
    }

    #[test]
    fn cavalry_chains_on_clear_ground() {
        let mut world = empty_world();
        let id = world
            .spawn_agent(0, UnitClass::Knight, Position::new(5, 5))
            .unwrap();
        attempt_move(&mut world, id, Direction::South);
        assert_eq!(world.entity(id).unwrap().pos, Position::new(5, 7));
    }

    #[test]
    fn uphill_requires_oriented_ramp() {
        let mut world = empty_world();
        world.set_elevation(Position::new(11, 10), 1);
        let id = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();

        attempt_move(&mut world, id, Direction::East);
        assert_eq!(world.entity(id).unwrap().pos, Position::new(10, 10));

        world.set_terrain(Position::new(10, 10), Terrain::RampUpE);
        attempt_move(&mut world, id, Direction::East);
        assert_eq!(world.entity(id).unwrap().pos, Position::new(11, 10));
    }

    #[test]
    fn ships_cannot_leave_water() {
        let mut world = empty_world();
        world.set_terrain(Position::new(20, 20), Terrain::Water);
        let id = world
            .spawn_agent(0, UnitClass::Galley, Position::new(20, 20))
            .unwrap();
        attempt_move(&mut world, id, Direction::East);
        assert_eq!(world.entity(id).unwrap().pos, Position::new(20, 20));
    }
}
