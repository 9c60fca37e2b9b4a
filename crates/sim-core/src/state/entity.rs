//! The tagged entity record and its kind-specific payloads.
//!
//! Everything that occupies a tile (agents, buildings, walls, resource
//! nodes, wildlife, corpses, drops) is one [`Entity`] in the arena. Fields
//! common to most kinds (position, hp, team) live on the base record; data
//! only some kinds carry is split into an [`EntityData`] payload so a tree
//! does not pay for a production queue.

use arrayvec::ArrayVec;

use super::common::{Direction, EntityId, Position};
use super::team::Cost;
use crate::config::SimConfig;

/// Fine-grained entity kind. The discriminant indexes the entity one-hot
/// observation layers, so the order is part of the external contract.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumCount, strum::EnumIter, strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum EntityKind {
    Agent = 0,
    TownCenter,
    House,
    Barracks,
    ArcheryRange,
    Stable,
    Monastery,
    Market,
    Mill,
    LumberCamp,
    MiningCamp,
    University,
    Blacksmith,
    Castle,
    GuardTower,
    Wonder,
    Wall,
    Door,
    Altar,
    Dock,
    Tree,
    GoldMine,
    StoneMine,
    WheatField,
    Fish,
    Cow,
    Wolf,
    Bear,
    Corpse,
    Relic,
    Lantern,
}

impl EntityKind {
    /// Kinds that live on the `primary` grid layer and block movement.
    pub fn is_blocking(self) -> bool {
        !matches!(
            self,
            EntityKind::Corpse
                | EntityKind::Relic
                | EntityKind::Lantern
                | EntityKind::WheatField
                | EntityKind::Fish
                | EntityKind::Door
                | EntityKind::Dock
        )
    }

    pub fn is_building(self) -> bool {
        matches!(
            self,
            EntityKind::TownCenter
                | EntityKind::House
                | EntityKind::Barracks
                | EntityKind::ArcheryRange
                | EntityKind::Stable
                | EntityKind::Monastery
                | EntityKind::Market
                | EntityKind::Mill
                | EntityKind::LumberCamp
                | EntityKind::MiningCamp
                | EntityKind::University
                | EntityKind::Blacksmith
                | EntityKind::Castle
                | EntityKind::GuardTower
                | EntityKind::Wonder
                | EntityKind::Wall
                | EntityKind::Door
                | EntityKind::Altar
                | EntityKind::Dock
        )
    }

    pub fn is_resource_node(self) -> bool {
        matches!(
            self,
            EntityKind::Tree
                | EntityKind::GoldMine
                | EntityKind::StoneMine
                | EntityKind::WheatField
                | EntityKind::Fish
        )
    }

    pub fn is_animal(self) -> bool {
        matches!(self, EntityKind::Cow | EntityKind::Wolf | EntityKind::Bear)
    }

    /// Kinds that can hold garrisoned units.
    pub fn is_garrisonable(self) -> bool {
        matches!(
            self,
            EntityKind::TownCenter
                | EntityKind::GuardTower
                | EntityKind::House
                | EntityKind::Castle
                | EntityKind::Monastery
        )
    }

    /// Kinds whose production queue can train units.
    pub fn is_training_building(self) -> bool {
        matches!(
            self,
            EntityKind::TownCenter
                | EntityKind::Barracks
                | EntityKind::ArcheryRange
                | EntityKind::Stable
                | EntityKind::Monastery
                | EntityKind::Castle
                | EntityKind::Dock
        )
    }
}

/// Unit classes an agent can take. The discriminant feeds the unit-class
/// observation layer (`class + 1`).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumCount, strum::EnumIter, strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum UnitClass {
    Villager = 0,
    ManAtArms,
    LongSwordsman,
    Champion,
    Archer,
    Crossbowman,
    Arbalester,
    Scout,
    LightCavalry,
    Hussar,
    Knight,
    Monk,
    BatteringRam,
    Mangonel,
    Trebuchet,
    Boat,
    TradeCog,
    Galley,
    FireShip,
    TransportShip,
    Samurai,
    Longbowman,
    Cataphract,
    TeutonicKnight,
}

/// Armor/bonus category used by the damage formula and blacksmith lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatCategory {
    Infantry,
    Archer,
    Cavalry,
    Siege,
    Water,
    Clergy,
}

impl UnitClass {
    pub fn category(self) -> CombatCategory {
        match self {
            UnitClass::Villager
            | UnitClass::ManAtArms
            | UnitClass::LongSwordsman
            | UnitClass::Champion
            | UnitClass::Samurai
            | UnitClass::TeutonicKnight => CombatCategory::Infantry,
            UnitClass::Archer
            | UnitClass::Crossbowman
            | UnitClass::Arbalester
            | UnitClass::Longbowman => CombatCategory::Archer,
            UnitClass::Scout
            | UnitClass::LightCavalry
            | UnitClass::Hussar
            | UnitClass::Knight
            | UnitClass::Cataphract => CombatCategory::Cavalry,
            UnitClass::BatteringRam | UnitClass::Mangonel | UnitClass::Trebuchet => {
                CombatCategory::Siege
            }
            UnitClass::Boat
            | UnitClass::TradeCog
            | UnitClass::Galley
            | UnitClass::FireShip
            | UnitClass::TransportShip => CombatCategory::Water,
            UnitClass::Monk => CombatCategory::Clergy,
        }
    }

    #[inline]
    pub fn is_siege(self) -> bool {
        self.category() == CombatCategory::Siege
    }

    #[inline]
    pub fn is_cavalry(self) -> bool {
        self.category() == CombatCategory::Cavalry
    }

    #[inline]
    pub fn is_water(self) -> bool {
        self.category() == CombatCategory::Water
    }
}

/// Combat stance for agents. Feeds the stance observation layer
/// (`stance + 1`) and the auto-engagement rules of deferred commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Stance {
    NoAttack = 0,
    #[default]
    Defensive,
    Aggressive,
}

/// Items an agent (or corpse) can carry.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumCount, strum::EnumIter, strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CarryItem {
    Wood = 0,
    Food,
    Gold,
    Stone,
    Wheat,
    Meat,
    Bread,
    Relic,
    Lantern,
}

/// Integer item counts carried by one entity. Counts never go negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Inventory {
    counts: [u16; <CarryItem as strum::EnumCount>::COUNT],
}

impl Inventory {
    pub fn count(&self, item: CarryItem) -> u16 {
        self.counts[item as usize]
    }

    pub fn add(&mut self, item: CarryItem, amount: u16) {
        let slot = &mut self.counts[item as usize];
        *slot = slot.saturating_add(amount);
    }

    /// Removes up to `amount`, returning how much was actually removed.
    pub fn take(&mut self, item: CarryItem, amount: u16) -> u16 {
        let slot = &mut self.counts[item as usize];
        let taken = (*slot).min(amount);
        *slot -= taken;
        taken
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CarryItem, u16)> + '_ {
        <CarryItem as strum::IntoEnumIterator>::iter()
            .zip(self.counts.iter().copied())
            .filter(|&(_, count)| count > 0)
    }
}

/// One pending training order. The cost was debited from the team stockpile
/// at enqueue time and is restored verbatim on cancel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueEntry {
    pub class: UnitClass,
    pub remaining_steps: u16,
    pub cost: Cost,
}

pub type ProductionQueue = ArrayVec<QueueEntry, { SimConfig::MAX_QUEUE }>;
pub type GarrisonSlots = ArrayVec<EntityId, { SimConfig::MAX_GARRISON }>;

/// Agent-only payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitData {
    /// Stable index into the per-agent parallel arrays.
    pub agent_id: u16,
    pub class: UnitClass,
    pub stance: Stance,
    pub inventory: Inventory,
    /// Conversion override; effective team falls back to
    /// `agent_id / agents_per_team` when unset.
    pub team_override: Option<u8>,
    pub faith: u16,
    /// Ticks this unit is unable to act or be swapped.
    pub frozen: u16,
    /// Trebuchets must be packed to move and unpacked to fire.
    pub packed: bool,
    pub home_altar: Option<Position>,
    /// Terrain slowdown accumulator, tenths.
    pub speed_debt: u16,
    /// Armor baked in at creation from team modifiers.
    pub bonus_armor: i16,
    /// Trade cogs: the dock the current leg departs from.
    pub trade_home_dock: Option<EntityId>,
    pub garrisoned: bool,
}

impl UnitData {
    pub fn new(agent_id: u16, class: UnitClass) -> Self {
        Self {
            agent_id,
            class,
            stance: Stance::default(),
            inventory: Inventory::default(),
            team_override: None,
            faith: if class == UnitClass::Monk {
                SimConfig::MONK_MAX_FAITH
            } else {
                0
            },
            frozen: 0,
            packed: class == UnitClass::Trebuchet,
            home_altar: None,
            speed_debt: 0,
            bonus_armor: 0,
            trade_home_dock: None,
            garrisoned: false,
        }
    }
}

/// Building-only payload.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildingData {
    pub production: ProductionQueue,
    pub rally_point: Option<Position>,
    pub garrisoned_units: GarrisonSlots,
    /// Relics stored by a monastery; drives the relic victory countdown.
    pub garrisoned_relics: u8,
    /// Prepaid farm reseeds queued at a mill.
    pub queued_farm_reseeds: u8,
    /// Ticks until a tower may fire its next volley.
    pub fire_cooldown: u16,
    pub market_cooldown: u16,
    /// Castle research lockout; Use falls through to unique-unit training
    /// while nonzero.
    pub research_cooldown: u16,
}

/// Wildlife payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimalData {
    pub herd_id: u8,
    pub is_pack_leader: bool,
    /// Ticks left fleeing after being struck.
    pub scattered_steps: u16,
}

/// Resource node payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceData {
    /// Units left before the node is exhausted and removed.
    pub remaining: u16,
}

/// Background drop payload (corpses carry meat, relic/lantern drops none).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DropData {
    pub meat: u16,
}

/// Kind-specific payload; exactly one variant per entity, matched to `kind`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityData {
    Unit(UnitData),
    Building(BuildingData),
    Animal(AnimalData),
    Resource(ResourceData),
    Drop(DropData),
}

/// One arena slot. Destroyed entities stay in the arena with `alive = false`
/// so mid-step iteration never reorders; the grid slot is cleared instead.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// `OFF_GRID` while garrisoned or dead.
    pub pos: Position,
    pub orientation: Direction,
    /// Owning team for buildings and units; `None` for neutral entities.
    pub team: Option<u8>,
    pub hp: u16,
    pub max_hp: u16,
    pub attack: u16,
    /// Ticks until this entity may attack again.
    pub cooldown: u16,
    pub alive: bool,
    pub data: EntityData,
}

impl Entity {
    pub fn unit(&self) -> Option<&UnitData> {
        match &self.data {
            EntityData::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn unit_mut(&mut self) -> Option<&mut UnitData> {
        match &mut self.data {
            EntityData::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn building(&self) -> Option<&BuildingData> {
        match &self.data {
            EntityData::Building(building) => Some(building),
            _ => None,
        }
    }

    pub fn building_mut(&mut self) -> Option<&mut BuildingData> {
        match &mut self.data {
            EntityData::Building(building) => Some(building),
            _ => None,
        }
    }

    pub fn animal(&self) -> Option<&AnimalData> {
        match &self.data {
            EntityData::Animal(animal) => Some(animal),
            _ => None,
        }
    }

    pub fn animal_mut(&mut self) -> Option<&mut AnimalData> {
        match &mut self.data {
            EntityData::Animal(animal) => Some(animal),
            _ => None,
        }
    }

    pub fn resource(&self) -> Option<&ResourceData> {
        match &self.data {
            EntityData::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn resource_mut(&mut self) -> Option<&mut ResourceData> {
        match &mut self.data {
            EntityData::Resource(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn drop_data(&self) -> Option<&DropData> {
        match &self.data {
            EntityData::Drop(drop) => Some(drop),
            _ => None,
        }
    }

    #[inline]
    pub fn is_agent(&self) -> bool {
        self.kind == EntityKind::Agent
    }

    pub fn unit_class(&self) -> Option<UnitClass> {
        self.unit().map(|u| u.class)
    }

    pub fn agent_id(&self) -> Option<u16> {
        self.unit().map(|u| u.agent_id)
    }

    pub fn is_garrisoned(&self) -> bool {
        self.unit().is_some_and(|u| u.garrisoned)
    }

    /// Effective team: conversion override, else the owning team, else the
    /// team derived from the agent slot (filled in by the arena on spawn).
    pub fn effective_team(&self, agents_per_team: u16) -> Option<u8> {
        if let Some(unit) = self.unit() {
            if let Some(team) = unit.team_override {
                return Some(team);
            }
            if self.is_agent() {
                return Some((unit.agent_id / agents_per_team) as u8);
            }
        }
        self.team
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_take_clamps() {
        let mut inventory = Inventory::default();
        inventory.add(CarryItem::Wood, 3);
        assert_eq!(inventory.take(CarryItem::Wood, 10), 3);
        assert_eq!(inventory.count(CarryItem::Wood), 0);
        assert!(inventory.is_empty());
    }

    #[test]
    fn background_kinds_do_not_block() {
        assert!(!EntityKind::Corpse.is_blocking());
        assert!(!EntityKind::WheatField.is_blocking());
        assert!(!EntityKind::Dock.is_blocking());
        assert!(EntityKind::Tree.is_blocking());
        assert!(EntityKind::Wall.is_blocking());
    }

    #[test]
    fn monks_spawn_with_full_faith() {
        let monk = UnitData::new(0, UnitClass::Monk);
        assert_eq!(monk.faith, SimConfig::MONK_MAX_FAITH);
        let villager = UnitData::new(1, UnitClass::Villager);
        assert_eq!(villager.faith, 0);
    }

    #[test]
    fn trebuchets_spawn_packed() {
        assert!(UnitData::new(0, UnitClass::Trebuchet).packed);
        assert!(!UnitData::new(0, UnitClass::Mangonel).packed);
    }
}
