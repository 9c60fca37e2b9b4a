//! Static balance tables.
//!
//! All unit, building, and technology numbers live here as const data keyed
//! by the enums in [`crate::state`]. The step pipeline never hard-codes a
//! stat; changing balance means changing this file only.

use crate::state::{CarryItem, CombatCategory, Cost, EntityKind, Resource, Terrain, UnitClass};

/// Combat and training profile of a unit class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitStats {
    pub hp: u16,
    pub attack: u16,
    pub range: i32,
    pub min_range: i32,
    pub train_steps: u16,
    pub cost: Cost,
}

pub fn unit_stats(class: UnitClass) -> UnitStats {
    use UnitClass::*;
    let (hp, attack, range, min_range, train_steps, cost) = match class {
        Villager => (25, 3, 1, 0, 15, Cost::new(2, 0, 0, 0)),
        ManAtArms => (45, 6, 1, 0, 20, Cost::new(3, 0, 1, 0)),
        LongSwordsman => (60, 9, 1, 0, 20, Cost::new(3, 0, 1, 0)),
        Champion => (70, 13, 1, 0, 20, Cost::new(3, 0, 1, 0)),
        Archer => (30, 4, 4, 0, 20, Cost::new(1, 2, 0, 0)),
        Crossbowman => (35, 5, 5, 0, 20, Cost::new(1, 2, 0, 0)),
        Arbalester => (40, 6, 5, 0, 20, Cost::new(1, 2, 0, 0)),
        Scout => (45, 3, 2, 0, 18, Cost::new(4, 0, 0, 0)),
        LightCavalry => (60, 7, 1, 0, 25, Cost::new(4, 0, 0, 0)),
        Hussar => (75, 9, 1, 0, 25, Cost::new(4, 0, 0, 0)),
        Knight => (100, 10, 1, 0, 30, Cost::new(6, 0, 4, 0)),
        Monk => (30, 0, 4, 0, 30, Cost::new(0, 0, 5, 0)),
        BatteringRam => (175, 2, 2, 0, 40, Cost::new(0, 4, 2, 0)),
        Mangonel => (50, 12, 5, 2, 40, Cost::new(0, 6, 3, 0)),
        Trebuchet => (80, 20, 6, 3, 50, Cost::new(0, 8, 4, 0)),
        Boat => (50, 0, 0, 0, 25, Cost::new(0, 4, 0, 0)),
        TradeCog => (80, 0, 0, 0, 30, Cost::new(0, 4, 2, 0)),
        Galley => (120, 6, 5, 0, 35, Cost::new(0, 6, 1, 0)),
        FireShip => (100, 2, 1, 0, 35, Cost::new(0, 6, 1, 0)),
        TransportShip => (100, 0, 0, 0, 30, Cost::new(0, 5, 0, 0)),
        Samurai => (60, 9, 1, 0, 25, Cost::new(4, 0, 2, 0)),
        Longbowman => (35, 6, 6, 0, 25, Cost::new(4, 0, 2, 0)),
        Cataphract => (110, 9, 1, 0, 25, Cost::new(4, 0, 2, 0)),
        TeutonicKnight => (80, 14, 1, 0, 25, Cost::new(4, 0, 2, 0)),
    };
    UnitStats {
        hp,
        attack,
        range,
        min_range,
        train_steps,
        cost,
    }
}

/// Static profile of a building kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildingStats {
    pub hp: u16,
    /// Base arrow damage for kinds that fire autonomously; 0 otherwise.
    pub attack: u16,
    pub range: i32,
    pub garrison_capacity: u8,
    pub pop_bonus: u16,
    pub cost: Cost,
}

pub fn building_stats(kind: EntityKind) -> BuildingStats {
    use EntityKind::*;
    let (hp, attack, range, garrison, pop, cost) = match kind {
        TownCenter => (600, 0, 6, 10, 5, Cost::new(0, 10, 0, 2)),
        House => (200, 0, 0, 3, 5, Cost::new(0, 2, 0, 0)),
        Barracks => (300, 0, 0, 0, 0, Cost::new(0, 4, 0, 0)),
        ArcheryRange => (300, 0, 0, 0, 0, Cost::new(0, 4, 0, 0)),
        Stable => (300, 0, 0, 0, 0, Cost::new(0, 4, 0, 0)),
        Monastery => (300, 0, 0, 8, 0, Cost::new(0, 5, 2, 0)),
        Market => (350, 0, 0, 0, 0, Cost::new(0, 5, 0, 0)),
        Mill => (250, 0, 0, 0, 0, Cost::new(0, 3, 0, 0)),
        LumberCamp => (250, 0, 0, 0, 0, Cost::new(0, 3, 0, 0)),
        MiningCamp => (250, 0, 0, 0, 0, Cost::new(0, 3, 0, 0)),
        University => (400, 0, 0, 0, 0, Cost::new(0, 6, 0, 2)),
        Blacksmith => (300, 0, 0, 0, 0, Cost::new(0, 5, 0, 0)),
        Castle => (1000, 11, 7, 15, 10, Cost::new(0, 0, 0, 10)),
        GuardTower => (500, 5, 6, 5, 0, Cost::new(0, 2, 0, 3)),
        Wonder => (800, 0, 0, 0, 0, Cost::new(0, 10, 10, 10)),
        Wall => (400, 0, 0, 0, 0, Cost::new(0, 0, 0, 1)),
        Door => (300, 0, 0, 0, 0, Cost::new(0, 2, 0, 0)),
        Altar => (250, 0, 0, 0, 0, Cost::new(0, 0, 0, 4)),
        Dock => (300, 0, 0, 0, 0, Cost::new(0, 5, 0, 0)),
        _ => (0, 0, 0, 0, 0, Cost::FREE),
    };
    BuildingStats {
        hp,
        attack,
        range,
        garrison_capacity: garrison,
        pop_bonus: pop,
        cost,
    }
}

/// Fixed table mapping Build-verb arguments to placeable kinds. The index
/// is part of the external action contract.
pub const BUILD_INDEX: [EntityKind; 19] = [
    EntityKind::TownCenter,
    EntityKind::House,
    EntityKind::Barracks,
    EntityKind::ArcheryRange,
    EntityKind::Stable,
    EntityKind::Monastery,
    EntityKind::Market,
    EntityKind::Mill,
    EntityKind::LumberCamp,
    EntityKind::MiningCamp,
    EntityKind::University,
    EntityKind::Blacksmith,
    EntityKind::Castle,
    EntityKind::GuardTower,
    EntityKind::Wonder,
    EntityKind::Wall,
    EntityKind::Door,
    EntityKind::Altar,
    EntityKind::Dock,
];

/// Kinds that must (rather than must not) sit on water.
pub const WATER_BUILDINGS: [EntityKind; 1] = [EntityKind::Dock];

/// Classes a training building can produce.
pub fn trainable_classes(kind: EntityKind) -> &'static [UnitClass] {
    use UnitClass::*;
    match kind {
        EntityKind::TownCenter => &[Villager],
        EntityKind::Barracks => &[ManAtArms, BatteringRam, Mangonel, Trebuchet],
        EntityKind::ArcheryRange => &[Archer],
        EntityKind::Stable => &[Scout, Knight],
        EntityKind::Monastery => &[Monk],
        EntityKind::Dock => &[Boat, TradeCog, Galley, FireShip, TransportShip],
        // Castle trains the civ unique unit through the research fall-through.
        _ => &[],
    }
}

/// Unit-upgrade lines `[base, tier 1, tier 2]` researched at the indexed
/// building line (0 = barracks, 1 = stable, 2 = archery range).
pub const UPGRADE_LINES: [[UnitClass; 3]; 3] = [
    [
        UnitClass::ManAtArms,
        UnitClass::LongSwordsman,
        UnitClass::Champion,
    ],
    [UnitClass::Scout, UnitClass::LightCavalry, UnitClass::Hussar],
    [
        UnitClass::Archer,
        UnitClass::Crossbowman,
        UnitClass::Arbalester,
    ],
];

pub fn upgrade_line_for(kind: EntityKind) -> Option<usize> {
    match kind {
        EntityKind::Barracks => Some(0),
        EntityKind::Stable => Some(1),
        EntityKind::ArcheryRange => Some(2),
        _ => None,
    }
}

// ===== technology costs =====

pub const UNIVERSITY_TECH_COST: Cost = Cost::new(3, 0, 2, 0);
pub const CASTLE_TECH_COST: Cost = Cost::new(5, 0, 3, 0);
pub const UNIQUE_UNIT_COST: Cost = Cost::new(4, 0, 2, 0);
pub const ECONOMY_TECH_COST: Cost = Cost::new(3, 0, 1, 0);
pub const UNIT_UPGRADE_COST: Cost = Cost::new(4, 0, 3, 0);

pub fn blacksmith_cost(level: u8) -> Cost {
    // Each level of any line costs a little more than the previous.
    Cost::new(2 + level as u16, 0, 1 + level as u16, 0)
}

// ===== civilizations =====

/// Age-up bonus granted by one castle tech.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgeBonus {
    pub category: CombatCategory,
    pub attack: i16,
    pub hp: i16,
    pub armor: i16,
}

/// Civilization profile. Each team is assigned one by `team % CIVS.len()`;
/// the castle/imperial pair is the team's ordered castle-tech pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Civ {
    pub name: &'static str,
    pub unique_unit: UnitClass,
    pub castle_bonus: AgeBonus,
    pub imperial_bonus: AgeBonus,
}

pub const CIVS: [Civ; 4] = [
    Civ {
        name: "Britons",
        unique_unit: UnitClass::Longbowman,
        // Yeomen: archers hit harder.
        castle_bonus: AgeBonus {
            category: CombatCategory::Archer,
            attack: 1,
            hp: 0,
            armor: 0,
        },
        imperial_bonus: AgeBonus {
            category: CombatCategory::Archer,
            attack: 1,
            hp: 5,
            armor: 0,
        },
    },
    Civ {
        name: "Teutons",
        unique_unit: UnitClass::TeutonicKnight,
        castle_bonus: AgeBonus {
            category: CombatCategory::Infantry,
            attack: 0,
            hp: 0,
            armor: 1,
        },
        imperial_bonus: AgeBonus {
            category: CombatCategory::Infantry,
            attack: 1,
            hp: 10,
            armor: 1,
        },
    },
    Civ {
        name: "Japanese",
        unique_unit: UnitClass::Samurai,
        castle_bonus: AgeBonus {
            category: CombatCategory::Infantry,
            attack: 1,
            hp: 0,
            armor: 0,
        },
        imperial_bonus: AgeBonus {
            category: CombatCategory::Infantry,
            attack: 2,
            hp: 0,
            armor: 0,
        },
    },
    Civ {
        name: "Byzantines",
        unique_unit: UnitClass::Cataphract,
        castle_bonus: AgeBonus {
            category: CombatCategory::Cavalry,
            attack: 0,
            hp: 10,
            armor: 0,
        },
        imperial_bonus: AgeBonus {
            category: CombatCategory::Cavalry,
            attack: 1,
            hp: 10,
            armor: 1,
        },
    },
];

pub fn civ_for_team(team: u8) -> &'static Civ {
    &CIVS[team as usize % CIVS.len()]
}

// ===== resources =====

/// Initial stock of a resource node kind.
pub fn resource_node_amount(kind: EntityKind) -> u16 {
    match kind {
        EntityKind::Tree => 75,
        EntityKind::GoldMine => 100,
        EntityKind::StoneMine => 100,
        EntityKind::WheatField => 40,
        EntityKind::Fish => 60,
        _ => 0,
    }
}

/// Item a node yields per gather action, before tech bonuses.
pub fn resource_node_item(kind: EntityKind) -> Option<CarryItem> {
    match kind {
        EntityKind::Tree => Some(CarryItem::Wood),
        EntityKind::GoldMine => Some(CarryItem::Gold),
        EntityKind::StoneMine => Some(CarryItem::Stone),
        EntityKind::WheatField => Some(CarryItem::Wheat),
        EntityKind::Fish => Some(CarryItem::Food),
        _ => None,
    }
}

/// Dropoff mapping: which carried items a building accepts, and the
/// stockpile resource each becomes.
pub fn dropoff_accepts(kind: EntityKind, item: CarryItem) -> Option<Resource> {
    match (kind, item) {
        (EntityKind::TownCenter, CarryItem::Wood) => Some(Resource::Wood),
        (EntityKind::TownCenter, CarryItem::Food | CarryItem::Meat | CarryItem::Bread) => {
            Some(Resource::Food)
        }
        (EntityKind::TownCenter, CarryItem::Gold) => Some(Resource::Gold),
        (EntityKind::TownCenter, CarryItem::Stone) => Some(Resource::Stone),
        (EntityKind::LumberCamp, CarryItem::Wood) => Some(Resource::Wood),
        (EntityKind::MiningCamp, CarryItem::Gold) => Some(Resource::Gold),
        (EntityKind::MiningCamp, CarryItem::Stone) => Some(Resource::Stone),
        (EntityKind::Mill, CarryItem::Wheat | CarryItem::Meat | CarryItem::Bread) => {
            Some(Resource::Food)
        }
        _ => None,
    }
}

// ===== terrain permissions =====

/// Whether a unit class may stand on the given terrain.
pub fn can_traverse(class: UnitClass, terrain: Terrain) -> bool {
    // Trade cogs traverse anything; they beach at docks.
    if class == UnitClass::TradeCog {
        return terrain != Terrain::Empty;
    }
    if class.is_water() {
        return terrain.is_water();
    }
    match terrain {
        Terrain::Empty => false,
        Terrain::Water => false,
        Terrain::ShallowWater => true,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_index_spans_arg_space() {
        assert!(BUILD_INDEX.len() <= crate::config::SimConfig::ARG_COUNT as usize);
        // Every placeable kind really is a building.
        for kind in BUILD_INDEX {
            assert!(kind.is_building());
        }
    }

    #[test]
    fn siege_ram_damage_matches_scenario_constant() {
        // The wall-vs-ram end-to-end scenario assumes a base of 2.
        assert_eq!(unit_stats(UnitClass::BatteringRam).attack, 2);
    }

    #[test]
    fn ships_stay_on_water() {
        assert!(can_traverse(UnitClass::Galley, Terrain::Water));
        assert!(!can_traverse(UnitClass::Galley, Terrain::Grass));
        assert!(!can_traverse(UnitClass::Villager, Terrain::Water));
        assert!(can_traverse(UnitClass::Villager, Terrain::ShallowWater));
        assert!(can_traverse(UnitClass::TradeCog, Terrain::Grass));
    }

    #[test]
    fn upgrade_lines_start_from_trainable_bases() {
        assert_eq!(UPGRADE_LINES[0][0], UnitClass::ManAtArms);
        assert_eq!(UPGRADE_LINES[1][0], UnitClass::Scout);
        assert_eq!(UPGRADE_LINES[2][0], UnitClass::Archer);
    }

    #[test]
    fn every_team_gets_a_civ() {
        for team in 0..8 {
            let civ = civ_for_team(team);
            assert!(!civ.name.is_empty());
        }
        assert_eq!(civ_for_team(0).name, civ_for_team(4).name);
    }
}
