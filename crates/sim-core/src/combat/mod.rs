//! Attack resolution: melee and ranged strikes, siege AoE, tower volleys.

pub(crate) mod conversion;
pub(crate) mod damage;
pub(crate) mod death;

pub(crate) use death::{apply_damage, handle_death};

use crate::config::SimConfig;
use crate::state::{
    CombatCategory, Direction, EntityId, EntityKind, Position, Stance, UnitClass, UniversityTechs,
    World,
};
use crate::tables;

/// Entry point for the Attack verb.
pub(crate) fn attempt_attack(world: &mut World, id: EntityId, direction: Direction) {
    let Some(entity) = world.arena.alive(id) else {
        return;
    };
    let Some(unit) = entity.unit() else {
        return;
    };
    if unit.garrisoned || unit.frozen > 0 || entity.cooldown > 0 {
        return;
    }
    if unit.stance == Stance::NoAttack {
        return;
    }
    // Trebuchets fight unpacked.
    if unit.class == UnitClass::Trebuchet && unit.packed {
        return;
    }
    let class = unit.class;

    world.arena.get_mut(id).unwrap().orientation = direction;

    match class {
        UnitClass::Monk => {
            conversion::attempt_convert(world, id, direction);
        }
        UnitClass::Mangonel => {
            area_attack(world, id, direction);
        }
        _ => {
            single_target_attack(world, id, class, direction);
        }
    }
}

fn attack_range(world: &World, attacker: EntityId, class: UnitClass) -> i32 {
    let stats = tables::unit_stats(class);
    let mut range = stats.range;
    // Ballistics extends every archer-line shot by one tile.
    if class.category() == CombatCategory::Archer {
        if let Some(team) = world
            .arena
            .alive(attacker)
            .and_then(|e| world.effective_team_of(e))
        {
            if world.team(team).university.contains(UniversityTechs::BALLISTICS) {
                range += 1;
            }
        }
    }
    range
}

fn single_target_attack(world: &mut World, id: EntityId, class: UnitClass, direction: Direction) {
    let stats = tables::unit_stats(class);
    let range = attack_range(world, id, class);
    let origin = world.arena.get(id).map(|e| e.pos).unwrap_or_default();

    let Some((target, distance)) = first_target_along(world, origin, direction, range) else {
        return;
    };
    if distance < stats.min_range {
        return;
    }
    let attacker_entity = world.arena.get(id).unwrap();
    let target_entity = world.arena.get(target).unwrap();

    // Friendly fire is rejected; neutral wildlife and resources are fair
    // game for hunting and clearing.
    if let (Some(a), Some(b)) = (
        world.effective_team_of(attacker_entity),
        world.effective_team_of(target_entity),
    ) {
        if world.are_allied(a, b) {
            return;
        }
    }

    let damage = damage::compute_damage(world, attacker_entity, target_entity);
    let attacker_agent = attacker_entity.agent_id();
    world.arena.get_mut(id).unwrap().cooldown = SimConfig::ATTACK_COOLDOWN;
    scatter_if_animal(world, target);
    apply_damage(world, target, damage, attacker_agent);
}

/// Mangonel shot: a forward line of tiles plus one-tile side prongs at the
/// first ring. Everything standing in the pattern is struck, friend or foe.
fn area_attack(world: &mut World, id: EntityId, direction: Direction) {
    let Some(entity) = world.arena.alive(id) else {
        return;
    };
    let origin = entity.pos;
    let attacker_agent = entity.agent_id();
    let (dx, dy) = direction.delta();

    let mut pattern = Vec::with_capacity(SimConfig::AOE_LENGTH as usize + 2);
    for step in 1..=SimConfig::AOE_LENGTH {
        pattern.push(origin.offset(dx * step, dy * step));
    }
    // Side prongs: perpendicular neighbors of the first ring tile.
    let first = origin.offset(dx, dy);
    pattern.push(first.offset(dy, dx));
    pattern.push(first.offset(-dy, -dx));

    let targets: Vec<EntityId> = pattern
        .iter()
        .filter_map(|&position| world.grid.primary(position))
        .filter(|&target| target != id)
        .collect();
    if targets.is_empty() {
        return;
    }

    world.arena.get_mut(id).unwrap().cooldown = SimConfig::ATTACK_COOLDOWN;
    for target in targets {
        let (Some(attacker_entity), Some(target_entity)) =
            (world.arena.alive(id), world.arena.alive(target))
        else {
            continue;
        };
        let damage = damage::compute_damage(world, attacker_entity, target_entity);
        scatter_if_animal(world, target);
        apply_damage(world, target, damage, attacker_agent);
    }
}

/// First entity along the ray, checking the blocking layer first and the
/// background layer (doors, docks) second.
fn first_target_along(
    world: &World,
    origin: Position,
    direction: Direction,
    range: i32,
) -> Option<(EntityId, i32)> {
    let (dx, dy) = direction.delta();
    for step in 1..=range {
        let position = origin.offset(dx * step, dy * step);
        if !world.grid.contains(position) {
            return None;
        }
        if let Some(id) = world.grid.primary(position) {
            if world.arena.alive(id).is_some() {
                return Some((id, step));
            }
        }
        if let Some(id) = world.grid.background(position) {
            if world
                .arena
                .alive(id)
                .is_some_and(|e| e.kind.is_building())
            {
                return Some((id, step));
            }
        }
    }
    None
}

/// Struck herd animals flee for a while.
fn scatter_if_animal(world: &mut World, target: EntityId) {
    if let Some(animal) = world.arena.get_mut(target).and_then(|e| e.animal_mut()) {
        animal.scattered_steps = SimConfig::SCATTER_DURATION;
    }
}

/// Autonomic tower fire, run during the building phase for keeps and guard
/// towers. One base arrow per volley plus one per garrisoned unit; every
/// arrow independently deals tower damage to the chosen target.
pub(crate) fn tower_volley(world: &mut World, tower: EntityId) {
    let Some(entity) = world.arena.alive(tower) else {
        return;
    };
    if !matches!(entity.kind, EntityKind::GuardTower | EntityKind::Castle) {
        return;
    }
    let Some(team) = entity.team else {
        return;
    };
    let Some(building) = entity.building() else {
        return;
    };
    if building.fire_cooldown > 0 {
        return;
    }
    let origin = entity.pos;
    let range = tables::building_stats(entity.kind).range;
    let techs = world.team(team).university;
    let min_range = if techs.contains(UniversityTechs::MURDER_HOLES) {
        1
    } else {
        SimConfig::TOWER_DEAD_ZONE
    };
    let garrison_count = building.garrisoned_units.len() as u16;

    let target = nearest_enemy_agent(world, team, origin, min_range, range);
    let Some(target) = target else {
        return;
    };

    let mut base_bonus = 0u16;
    if techs.contains(UniversityTechs::ARROWSLITS) {
        base_bonus += 1;
    }

    let arrows = 1 + SimConfig::GARRISON_ARROW_BONUS * garrison_count;
    for _ in 0..arrows {
        let (Some(tower_entity), Some(target_entity)) =
            (world.arena.alive(tower), world.arena.alive(target))
        else {
            break;
        };
        let damage = damage::tower_arrow_damage(world, tower_entity, target_entity) + base_bonus;
        apply_damage(world, target, damage, None);
    }

    if let Some(building) = world.arena.get_mut(tower).and_then(|e| e.building_mut()) {
        building.fire_cooldown = SimConfig::TOWER_FIRE_INTERVAL;
    }
}

fn nearest_enemy_agent(
    world: &World,
    team: u8,
    origin: Position,
    min_range: i32,
    range: i32,
) -> Option<EntityId> {
    (0..world.agent_count() as u16)
        .filter_map(|agent| world.agent_entity(agent))
        .filter(|e| !e.pos.is_off_grid())
        .filter(|e| {
            world
                .effective_team_of(e)
                .is_some_and(|t| !world.are_allied(team, t))
        })
        .map(|e| (e.id, origin.chebyshev(e.pos) as i32))
        .filter(|&(_, d)| d >= min_range && d <= range)
        .min_by_key(|&(id, d)| (d, id))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::FnInitializer;
    use crate::state::{BlacksmithLine, Position};

    fn setup() -> World {
        World::new(
            SimConfig::default(),
            42,
            &FnInitializer(|_: &mut World| Ok(())),
        )
        .unwrap()
    }

    #[test]
    fn blacksmith_line_raises_melee_damage() {
        let mut world = setup();
        let attacker = world
            .spawn_agent(0, UnitClass::ManAtArms, Position::new(10, 10))
            .unwrap();
        let victim = world
            .spawn_agent(1, UnitClass::Villager, Position::new(11, 10))
            .unwrap();
        let hp = world.entity(victim).unwrap().hp;
        attempt_attack(&mut world, attacker, Direction::East);
        assert_eq!(world.entity(victim).unwrap().hp, hp - 6);

        // Blast Furnace: total +4 on the melee line.
        world.team_mut(0).blacksmith[BlacksmithLine::MeleeAttack as usize] = 3;
        world.entity_mut(attacker).unwrap().cooldown = 0;
        let hp = world.entity(victim).unwrap().hp;
        attempt_attack(&mut world, attacker, Direction::East);
        assert_eq!(world.entity(victim).unwrap().hp, hp - 10);
    }

    #[test]
    fn armor_line_reduces_but_never_zeroes_damage() {
        let mut world = setup();
        let attacker = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let victim = world
            .spawn_agent(1, UnitClass::Villager, Position::new(11, 10))
            .unwrap();
        world.team_mut(1).blacksmith[BlacksmithLine::InfantryArmor as usize] = 3;
        let hp = world.entity(victim).unwrap().hp;
        // Villager attack 3 against armor 3 still lands the minimum 1.
        attempt_attack(&mut world, attacker, Direction::East);
        assert_eq!(world.entity(victim).unwrap().hp, hp - 1);
    }

    #[test]
    fn man_at_arms_aura_halves_incoming_damage() {
        let mut world = setup();
        let attacker = world
            .spawn_agent(0, UnitClass::Champion, Position::new(10, 10))
            .unwrap();
        let victim = world
            .spawn_agent(1, UnitClass::Villager, Position::new(11, 10))
            .unwrap();
        world
            .spawn_agent(1, UnitClass::ManAtArms, Position::new(12, 10))
            .unwrap();
        let hp = world.entity(victim).unwrap().hp;
        // Champion 13 halves to (13 + 1) / 2 = 7 before armor.
        attempt_attack(&mut world, attacker, Direction::East);
        assert_eq!(world.entity(victim).unwrap().hp, hp - 7);
    }

    #[test]
    fn no_attack_stance_refuses_the_verb() {
        let mut world = setup();
        let attacker = world
            .spawn_agent(0, UnitClass::Knight, Position::new(10, 10))
            .unwrap();
        let victim = world
            .spawn_agent(1, UnitClass::Villager, Position::new(11, 10))
            .unwrap();
        world
            .entity_mut(attacker)
            .unwrap()
            .unit_mut()
            .unwrap()
            .stance = crate::state::Stance::NoAttack;
        let hp = world.entity(victim).unwrap().hp;
        attempt_attack(&mut world, attacker, Direction::East);
        assert_eq!(world.entity(victim).unwrap().hp, hp);
    }

    #[test]
    fn tower_dead_zone_needs_murder_holes() {
        let mut world = setup();
        let tower = world
            .spawn_building(EntityKind::GuardTower, 0, Position::new(10, 10), true)
            .unwrap();
        let intruder = world
            .spawn_agent(1, UnitClass::Villager, Position::new(11, 10))
            .unwrap();
        let hp = world.entity(intruder).unwrap().hp;

        tower_volley(&mut world, tower);
        assert_eq!(world.entity(intruder).unwrap().hp, hp);

        world.team_mut(0).university |= UniversityTechs::MURDER_HOLES;
        tower_volley(&mut world, tower);
        assert!(world.entity(intruder).unwrap().hp < hp);
    }

    #[test]
    fn garrison_raises_arrow_count() {
        let mut world = setup();
        let tower = world
            .spawn_building(EntityKind::GuardTower, 0, Position::new(10, 10), true)
            .unwrap();
        let archer = world
            .spawn_agent(0, UnitClass::Archer, Position::new(11, 10))
            .unwrap();
        crate::production::garrison::attempt_garrison(&mut world, archer, tower);
        let target = world
            .spawn_agent(1, UnitClass::Knight, Position::new(13, 10))
            .unwrap();
        let hp = world.entity(target).unwrap().hp;

        tower_volley(&mut world, tower);
        // One base arrow plus one garrison arrow, 5 damage each.
        assert_eq!(world.entity(target).unwrap().hp, hp - 10);
    }

    #[test]
    fn mangonel_line_hits_multiple_tiles() {
        let mut world = setup();
        let mangonel = world
            .spawn_agent(0, UnitClass::Mangonel, Position::new(10, 10))
            .unwrap();
        let near = world
            .spawn_agent(1, UnitClass::Villager, Position::new(11, 10))
            .unwrap();
        let far = world
            .spawn_agent(1, UnitClass::Villager, Position::new(13, 10))
            .unwrap();
        let prong = world
            .spawn_agent(1, UnitClass::Villager, Position::new(11, 11))
            .unwrap();
        let near_hp = world.entity(near).unwrap().hp;
        let far_hp = world.entity(far).unwrap().hp;
        let prong_hp = world.entity(prong).unwrap().hp;

        attempt_attack(&mut world, mangonel, Direction::East);
        assert!(world.entity(near).unwrap().hp < near_hp);
        assert!(world.entity(far).unwrap().hp < far_hp);
        assert!(world.entity(prong).unwrap().hp < prong_hp);
    }

    #[test]
    fn conversion_spends_faith_and_flips_team() {
        let mut world = setup();
        world
            .spawn_building(EntityKind::House, 0, Position::new(30, 30), true)
            .unwrap();
        let monk = world
            .spawn_agent(0, UnitClass::Monk, Position::new(10, 10))
            .unwrap();
        let target = world
            .spawn_agent(1, UnitClass::Knight, Position::new(12, 10))
            .unwrap();

        attempt_attack(&mut world, monk, Direction::East);
        let unit = world.entity(target).unwrap().unit().unwrap();
        assert_eq!(unit.team_override, Some(0));
        assert_eq!(unit.frozen, SimConfig::CONVERSION_FREEZE);
        assert_eq!(
            world.entity(monk).unwrap().unit().unwrap().faith,
            SimConfig::MONK_MAX_FAITH - SimConfig::MONK_CONVERSION_FAITH_COST
        );

        // Converting back clears the override instead of stacking one.
        let enemy_monk = world
            .spawn_agent(1, UnitClass::Monk, Position::new(14, 10))
            .unwrap();
        world
            .entity_mut(target)
            .unwrap()
            .unit_mut()
            .unwrap()
            .frozen = 0;
        world
            .spawn_building(EntityKind::House, 1, Position::new(40, 40), true)
            .unwrap();
        attempt_attack(&mut world, enemy_monk, Direction::West);
        assert_eq!(
            world.entity(target).unwrap().unit().unwrap().team_override,
            None
        );
    }
}
