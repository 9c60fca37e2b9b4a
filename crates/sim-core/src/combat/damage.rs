//! Damage calculation.

use crate::config::SimConfig;
use crate::state::{CombatCategory, Entity, EntityKind, UnitClass, World};

/// Calculate damage from an attack.
///
/// # Formula
///
/// ```text
/// raw = base_attack + team_attack_bonus
/// siege vs structure: raw = base_attack * SIEGE_STRUCTURE_MULTIPLIER
///                     then +20% with (d*6+2)/5 rounding if Siege Engineers
/// aura: (raw + 1) / 2 when the defender stands next to an allied Man-at-Arms
/// final = max(1, raw - armor_vs_category - tech_armor)
/// ```
///
/// The minimum of 1 means no defender can be fully armored.
pub(crate) fn compute_damage(world: &World, attacker: &Entity, defender: &Entity) -> u16 {
    let attacker_team = world.effective_team_of(attacker);
    let defender_team = world.effective_team_of(defender);
    let attacker_class = attacker.unit_class();
    let defender_is_structure = defender.kind.is_building();

    let mut raw: u32;
    if attacker_class.is_some_and(UnitClass::is_siege) && defender_is_structure {
        // The multiplier applies before the Siege Engineers bonus and only
        // against structures; siege shots at units stay unmultiplied.
        raw = attacker.attack as u32 * SimConfig::SIEGE_STRUCTURE_MULTIPLIER as u32;
        if let Some(team) = attacker_team {
            if world
                .team(team)
                .university
                .contains(crate::state::UniversityTechs::SIEGE_ENGINEERS)
            {
                raw = (raw * 6 + 2) / 5;
            }
        }
    } else {
        raw = attacker.attack as u32 + team_attack_bonus(world, attacker) as u32;
    }

    if !defender_is_structure && protected_by_aura(world, defender) {
        raw = (raw + 1) / 2;
    }

    let mut armor: u32 = 0;
    if defender_is_structure {
        if let Some(team) = defender_team {
            armor += world.team(team).structure_armor() as u32;
        }
    } else if let Some(unit) = defender.unit() {
        if let Some(team) = defender_team {
            armor += world.team(team).armor_vs(unit.class.category()) as u32;
        }
        armor = (armor as i32 + unit.bonus_armor as i32).max(0) as u32;
    }

    raw.saturating_sub(armor).max(1) as u16
}

/// Blacksmith attack line for the attacker's category. Buildings and
/// animals have no team lines; towers add their bonuses elsewhere.
fn team_attack_bonus(world: &World, attacker: &Entity) -> u16 {
    let Some(team) = world.effective_team_of(attacker) else {
        return 0;
    };
    let Some(class) = attacker.unit_class() else {
        return 0;
    };
    let team = world.team(team);
    match class.category() {
        CombatCategory::Infantry | CombatCategory::Cavalry => team.melee_attack_bonus(),
        CombatCategory::Archer => team.archer_attack_bonus(),
        _ => 0,
    }
}

/// The Man-at-Arms protective aura halves incoming damage for adjacent
/// allied infantry before armor applies.
fn protected_by_aura(world: &World, defender: &Entity) -> bool {
    let Some(unit) = defender.unit() else {
        return false;
    };
    if unit.class.category() != CombatCategory::Infantry || defender.pos.is_off_grid() {
        return false;
    }
    let Some(team) = world.effective_team_of(defender) else {
        return false;
    };
    crate::state::Direction::ALL.iter().any(|&direction| {
        let position = defender.pos.step(direction);
        world
            .grid
            .primary(position)
            .and_then(|id| world.arena.alive(id))
            .is_some_and(|neighbor| {
                neighbor.id != defender.id
                    && neighbor.unit_class() == Some(UnitClass::ManAtArms)
                    && world.effective_team_of(neighbor) == Some(team)
            })
    })
}

/// Tower arrow damage against one target, including Heated Shot.
pub(crate) fn tower_arrow_damage(world: &World, tower: &Entity, target: &Entity) -> u16 {
    let mut base = tower.attack;
    if let Some(team) = tower.team {
        let techs = world.team(team).university;
        if techs.contains(crate::state::UniversityTechs::HEATED_SHOT)
            && target.unit_class().is_some_and(UnitClass::is_water)
        {
            base += SimConfig::HEATED_SHOT_WATER_BONUS;
        }
    }
    let mut armor = 0u16;
    if target.kind == EntityKind::Agent {
        if let (Some(unit), Some(team)) = (target.unit(), world.effective_team_of(target)) {
            armor = world.team(team).armor_vs(unit.class.category());
            armor = (armor as i32 + unit.bonus_armor as i32).max(0) as u16;
        }
    }
    base.saturating_sub(armor).max(1)
}
