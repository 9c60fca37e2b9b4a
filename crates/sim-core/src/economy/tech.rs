//! Research: castle age-ups, university, blacksmith, economy techs, and
//! unit upgrade chains.
//!
//! Only villagers research. Every research call is a Use fall-through: the
//! dispatcher routes a villager's Use on a tech building here once dropoff
//! and construction have declined the action.

use strum::IntoEnumIterator;

use crate::config::SimConfig;
use crate::state::{
    BLACKSMITH_MAX_LEVEL, BlacksmithLine, ECONOMY_LINES, EntityId, EntityKind, UnitClass,
    UniversityTechs, World,
};
use crate::tables;

/// Research order for university techs when a Use does not name one.
const UNIVERSITY_ORDER: [UniversityTechs; 7] = [
    UniversityTechs::BALLISTICS,
    UniversityTechs::MURDER_HOLES,
    UniversityTechs::MASONRY,
    UniversityTechs::ARCHITECTURE,
    UniversityTechs::HEATED_SHOT,
    UniversityTechs::ARROWSLITS,
    UniversityTechs::SIEGE_ENGINEERS,
];

fn is_researching_villager(world: &World, researcher: EntityId, team: u8) -> bool {
    world.arena.alive(researcher).is_some_and(|entity| {
        entity.unit_class() == Some(UnitClass::Villager)
            && world.effective_team_of(entity) == Some(team)
    })
}

/// Castle tech research. The castle pair (castle age, imperial age) is
/// ordered per team; this always fills the earliest unresearched slot, so
/// imperial cannot be reached without castle first. While the castle's
/// research cooldown runs, Use falls through to training the civ's unique
/// unit instead.
pub(crate) fn try_research_castle_tech(world: &mut World, researcher: EntityId, castle: EntityId) {
    let Some(castle_entity) = world.arena.alive(castle) else {
        return;
    };
    if castle_entity.kind != EntityKind::Castle {
        return;
    }
    let Some(team) = castle_entity.team else {
        return;
    };
    if !is_researching_villager(world, researcher, team) {
        return;
    }
    let on_cooldown = castle_entity
        .building()
        .is_some_and(|b| b.research_cooldown > 0);
    if on_cooldown {
        train_unique_unit(world, castle, team);
        return;
    }
    if world.teams[team as usize].imperial_age {
        // Both ages researched; the castle keeps training its unique unit.
        train_unique_unit(world, castle, team);
        return;
    }
    if !world.teams[team as usize].debit(tables::CASTLE_TECH_COST) {
        return;
    }

    let civ = tables::civ_for_team(team);
    let team_state = &mut world.teams[team as usize];
    let bonus = if !team_state.castle_age {
        team_state.castle_age = true;
        civ.castle_bonus
    } else {
        team_state.imperial_age = true;
        civ.imperial_bonus
    };
    team_state
        .modifiers
        .add(bonus.category, bonus.attack, bonus.hp, bonus.armor);

    if let Some(building) = world.arena.get_mut(castle).and_then(|e| e.building_mut()) {
        building.research_cooldown = SimConfig::CASTLE_TECH_COOLDOWN;
    }
}

/// Enqueues the civ unique unit at the castle (cooldown fall-through).
fn train_unique_unit(world: &mut World, castle: EntityId, team: u8) {
    let class = tables::civ_for_team(team).unique_unit;
    crate::production::queue::try_enqueue_with_cost(world, castle, class, tables::UNIQUE_UNIT_COST);
}

/// University research: first unresearched tech in the fixed order.
pub(crate) fn try_research_university(world: &mut World, researcher: EntityId, university: EntityId) {
    let Some(entity) = world.arena.alive(university) else {
        return;
    };
    if entity.kind != EntityKind::University {
        return;
    }
    let Some(team) = entity.team else {
        return;
    };
    if !is_researching_villager(world, researcher, team) {
        return;
    }
    let researched = world.teams[team as usize].university;
    let Some(next) = UNIVERSITY_ORDER
        .iter()
        .copied()
        .find(|tech| !researched.contains(*tech))
    else {
        return;
    };
    if !world.teams[team as usize].debit(tables::UNIVERSITY_TECH_COST) {
        return;
    }
    world.teams[team as usize].university |= next;
}

/// Blacksmith research: advances the first line (in declaration order) that
/// has a level left, one level per Use. Level order within a line is the
/// prerequisite chain.
pub(crate) fn try_research_blacksmith(world: &mut World, researcher: EntityId, smith: EntityId) {
    let Some(entity) = world.arena.alive(smith) else {
        return;
    };
    if entity.kind != EntityKind::Blacksmith {
        return;
    }
    let Some(team) = entity.team else {
        return;
    };
    if !is_researching_villager(world, researcher, team) {
        return;
    }
    let Some(line) = BlacksmithLine::iter()
        .find(|&line| world.teams[team as usize].blacksmith_level(line) < BLACKSMITH_MAX_LEVEL)
    else {
        return;
    };
    let level = world.teams[team as usize].blacksmith_level(line);
    if !world.teams[team as usize].debit(tables::blacksmith_cost(level)) {
        return;
    }
    world.teams[team as usize].blacksmith[line as usize] = level + 1;
}

/// Economy research at a dropoff building. Each building owns the lines it
/// gathers for; the first line with an unresearched tier wins. Returns true
/// when a tech was researched.
pub(crate) fn try_research_economy(
    world: &mut World,
    researcher: EntityId,
    building: EntityId,
) -> bool {
    let Some(entity) = world.arena.alive(building) else {
        return false;
    };
    let Some(team) = entity.team else {
        return false;
    };
    if !is_researching_villager(world, researcher, team) {
        return false;
    }
    let lines: &[usize] = match entity.kind {
        EntityKind::LumberCamp => &[0],
        EntityKind::MiningCamp => &[1, 2],
        EntityKind::Mill => &[3],
        EntityKind::TownCenter => &[4],
        _ => return false,
    };
    let team_state = &world.teams[team as usize];
    let Some(next) = lines
        .iter()
        .find_map(|&line| team_state.next_economy_tech(ECONOMY_LINES[line]))
    else {
        return false;
    };
    if !world.teams[team as usize].debit(tables::ECONOMY_TECH_COST) {
        return false;
    }
    world.teams[team as usize].economy |= next;
    true
}

/// Unit-upgrade research at a military training building. Researching a
/// tier immediately promotes every fielded unit of the base class on the
/// researching team, preserving hp ratios; enemies are untouched.
pub(crate) fn try_research_unit_upgrade(world: &mut World, researcher: EntityId, building: EntityId) {
    let Some(entity) = world.arena.alive(building) else {
        return;
    };
    let Some(line) = tables::upgrade_line_for(entity.kind) else {
        return;
    };
    let Some(team) = entity.team else {
        return;
    };
    if !is_researching_villager(world, researcher, team) {
        return;
    }
    let level = world.teams[team as usize].unit_upgrades[line];
    if level >= 2 {
        return;
    }
    if !world.teams[team as usize].debit(tables::UNIT_UPGRADE_COST) {
        return;
    }
    world.teams[team as usize].unit_upgrades[line] = level + 1;

    let base = tables::UPGRADE_LINES[line][level as usize];
    let promoted = tables::UPGRADE_LINES[line][level as usize + 1];
    let to_promote: Vec<EntityId> = (0..world.agent_count() as u16)
        .filter_map(|agent| world.agent_entity(agent))
        .filter(|e| e.unit_class() == Some(base))
        .filter(|e| world.effective_team_of(e) == Some(team))
        .map(|e| e.id)
        .collect();
    for id in to_promote {
        world.promote_unit(id, promoted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::FnInitializer;
    use crate::state::{Position, Resource};

    fn setup() -> World {
        World::new(
            SimConfig::default(),
            42,
            &FnInitializer(|_: &mut World| Ok(())),
        )
        .unwrap()
    }

    #[test]
    fn castle_pair_is_ordered() {
        let mut world = setup();
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let castle = world
            .spawn_building(EntityKind::Castle, 0, Position::new(11, 10), true)
            .unwrap();
        world.team_mut(0).credit(Resource::Food, 20);
        world.team_mut(0).credit(Resource::Gold, 20);

        try_research_castle_tech(&mut world, villager, castle);
        assert!(world.team(0).castle_age);
        assert!(!world.team(0).imperial_age);

        // Cooldown active: the second call trains instead of researching.
        try_research_castle_tech(&mut world, villager, castle);
        assert!(!world.team(0).imperial_age);

        world
            .entity_mut(castle)
            .unwrap()
            .building_mut()
            .unwrap()
            .research_cooldown = 0;
        try_research_castle_tech(&mut world, villager, castle);
        assert!(world.team(0).imperial_age);
    }

    #[test]
    fn unique_unit_queued_while_cooling_down() {
        let mut world = setup();
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let castle = world
            .spawn_building(EntityKind::Castle, 0, Position::new(11, 10), true)
            .unwrap();
        world.team_mut(0).credit(Resource::Food, 20);
        world.team_mut(0).credit(Resource::Gold, 20);

        try_research_castle_tech(&mut world, villager, castle);
        try_research_castle_tech(&mut world, villager, castle);

        let queue = &world.entity(castle).unwrap().building().unwrap().production;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].class, tables::civ_for_team(0).unique_unit);
    }

    #[test]
    fn upgrade_promotes_existing_units_with_hp_ratio() {
        let mut world = setup();
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let barracks = world
            .spawn_building(EntityKind::Barracks, 0, Position::new(11, 10), true)
            .unwrap();
        let soldier = world
            .spawn_agent(0, UnitClass::ManAtArms, Position::new(12, 10))
            .unwrap();
        let enemy = world
            .spawn_agent(1, UnitClass::ManAtArms, Position::new(20, 20))
            .unwrap();

        // Half hp before the upgrade.
        {
            let entity = world.entity_mut(soldier).unwrap();
            entity.hp = entity.max_hp / 2;
        }
        world.team_mut(0).credit(Resource::Food, 10);
        world.team_mut(0).credit(Resource::Gold, 10);
        try_research_unit_upgrade(&mut world, villager, barracks);

        let promoted = world.entity(soldier).unwrap();
        assert_eq!(promoted.unit_class(), Some(UnitClass::LongSwordsman));
        // Ratio preserved: 50% of the new maximum, rounded up.
        assert_eq!(promoted.hp as u32, (promoted.max_hp as u32 + 1) / 2);

        // Enemy units of the same class are unaffected.
        assert_eq!(
            world.entity(enemy).unwrap().unit_class(),
            Some(UnitClass::ManAtArms)
        );
    }

    #[test]
    fn age_bonus_applies_only_to_new_units() {
        let mut world = setup();
        let villager = world
            .spawn_agent(0, UnitClass::Villager, Position::new(10, 10))
            .unwrap();
        let castle = world
            .spawn_building(EntityKind::Castle, 0, Position::new(11, 10), true)
            .unwrap();
        // Team 0 is Britons: castle age gives +1 archer attack.
        let veteran = world
            .spawn_agent(0, UnitClass::Archer, Position::new(12, 10))
            .unwrap();
        let veteran_attack = world.entity(veteran).unwrap().attack;

        world.team_mut(0).credit(Resource::Food, 10);
        world.team_mut(0).credit(Resource::Gold, 10);
        try_research_castle_tech(&mut world, villager, castle);

        let recruit = world
            .spawn_agent(0, UnitClass::Archer, Position::new(13, 10))
            .unwrap();
        assert_eq!(world.entity(veteran).unwrap().attack, veteran_attack);
        assert_eq!(world.entity(recruit).unwrap().attack, veteran_attack + 1);
    }
}
