//! Per-team state: stockpile, market prices, technology, alliances.

use strum::EnumCount;

use super::entity::CombatCategory;
use crate::config::SimConfig;

/// Stockpiled resources. Carried items that are not stockpiled (wheat, meat,
/// relics…) convert to these at dropoff.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::EnumCount, strum::EnumIter, strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Resource {
    Food = 0,
    Wood,
    Gold,
    Stone,
}

/// A resource price in food/wood/gold/stone. Debited atomically: either the
/// whole cost is paid or nothing is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cost {
    pub food: u16,
    pub wood: u16,
    pub gold: u16,
    pub stone: u16,
}

impl Cost {
    pub const FREE: Self = Self {
        food: 0,
        wood: 0,
        gold: 0,
        stone: 0,
    };

    pub const fn new(food: u16, wood: u16, gold: u16, stone: u16) -> Self {
        Self {
            food,
            wood,
            gold,
            stone,
        }
    }

    pub fn amount(&self, resource: Resource) -> u16 {
        match resource {
            Resource::Food => self.food,
            Resource::Wood => self.wood,
            Resource::Gold => self.gold,
            Resource::Stone => self.stone,
        }
    }
}

bitflags::bitflags! {
    /// University research flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct UniversityTechs: u16 {
        const BALLISTICS      = 1 << 0;
        const MURDER_HOLES    = 1 << 1;
        const MASONRY         = 1 << 2;
        const ARCHITECTURE    = 1 << 3;
        const HEATED_SHOT     = 1 << 4;
        const ARROWSLITS      = 1 << 5;
        const SIEGE_ENGINEERS = 1 << 6;
    }
}

bitflags::bitflags! {
    /// Economy research flags. Tier order within a line is enforced by
    /// [`TeamState::next_economy_tech`], not by the representation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct EconomyTechs: u16 {
        const DOUBLE_BIT_AXE    = 1 << 0;
        const BOW_SAW           = 1 << 1;
        const TWO_MAN_SAW       = 1 << 2;
        const GOLD_MINING       = 1 << 3;
        const GOLD_SHAFT_MINING = 1 << 4;
        const STONE_MINING      = 1 << 5;
        const STONE_SHAFT_MINING = 1 << 6;
        const HORSE_COLLAR      = 1 << 7;
        const HEAVY_PLOW        = 1 << 8;
        const CROP_ROTATION     = 1 << 9;
        const WHEELBARROW       = 1 << 10;
        const HAND_CART         = 1 << 11;
    }
}

/// Economy tech lines in research order (tier 1 unlocks tier 2 …).
pub const ECONOMY_LINES: [&[EconomyTechs]; 5] = [
    &[
        EconomyTechs::DOUBLE_BIT_AXE,
        EconomyTechs::BOW_SAW,
        EconomyTechs::TWO_MAN_SAW,
    ],
    &[EconomyTechs::GOLD_MINING, EconomyTechs::GOLD_SHAFT_MINING],
    &[EconomyTechs::STONE_MINING, EconomyTechs::STONE_SHAFT_MINING],
    &[
        EconomyTechs::HORSE_COLLAR,
        EconomyTechs::HEAVY_PLOW,
        EconomyTechs::CROP_ROTATION,
    ],
    &[EconomyTechs::WHEELBARROW, EconomyTechs::HAND_CART],
];

/// Blacksmith upgrade lines, each 0..=3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumCount, strum::EnumIter, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BlacksmithLine {
    MeleeAttack = 0,
    ArcherAttack,
    InfantryArmor,
    ArcherArmor,
    CavalryArmor,
}

pub const BLACKSMITH_MAX_LEVEL: u8 = 3;

/// Attack bonus at each melee line level (Forging, Iron Casting, Blast
/// Furnace).
const MELEE_ATTACK_BONUS: [u16; 4] = [0, 1, 2, 4];
/// Attack bonus at each archer line level (Fletching, Bodkin, Bracer).
const ARCHER_ATTACK_BONUS: [u16; 4] = [0, 1, 2, 3];
/// Armor at each armor line level.
const ARMOR_BONUS: [u16; 4] = [0, 1, 2, 3];

/// Per-category stat bonuses accumulated from age-up civ bonuses. Snapshots
/// of these are baked into units at creation time; already-fielded units
/// keep their pre-research stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeamModifiers {
    pub attack: [i16; 6],
    pub hp: [i16; 6],
    pub armor: [i16; 6],
}

impl TeamModifiers {
    #[inline]
    fn slot(category: CombatCategory) -> usize {
        match category {
            CombatCategory::Infantry => 0,
            CombatCategory::Archer => 1,
            CombatCategory::Cavalry => 2,
            CombatCategory::Siege => 3,
            CombatCategory::Water => 4,
            CombatCategory::Clergy => 5,
        }
    }

    pub fn attack_for(&self, category: CombatCategory) -> i16 {
        self.attack[Self::slot(category)]
    }

    pub fn hp_for(&self, category: CombatCategory) -> i16 {
        self.hp[Self::slot(category)]
    }

    pub fn armor_for(&self, category: CombatCategory) -> i16 {
        self.armor[Self::slot(category)]
    }

    pub fn add(&mut self, category: CombatCategory, attack: i16, hp: i16, armor: i16) {
        let slot = Self::slot(category);
        self.attack[slot] += attack;
        self.hp[slot] += hp;
        self.armor[slot] += armor;
    }
}

/// Everything one team owns besides its entities.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeamState {
    stockpile: [u32; Resource::COUNT],
    /// Current market price per resource, clamped to
    /// `[MIN_PRICE, MAX_PRICE]`. Prices are per-team and independent.
    prices: [u16; Resource::COUNT],
    pub castle_age: bool,
    pub imperial_age: bool,
    pub university: UniversityTechs,
    pub economy: EconomyTechs,
    /// Level 0..=3 per [`BlacksmithLine`].
    pub blacksmith: [u8; BlacksmithLine::COUNT],
    /// Level 0..=2 per unit-upgrade line (barracks, stable, archery range).
    pub unit_upgrades: [u8; 3],
    pub modifiers: TeamModifiers,
    /// Bitmask of allied teams; always includes self.
    pub alliances: u8,
    /// Step the team's current Wonder was completed, or -1.
    pub wonder_built_step: i64,
    /// Step the team started holding every relic, or -1.
    pub relic_hold_start: i64,
}

impl TeamState {
    pub fn new(team: u8) -> Self {
        Self {
            stockpile: [0; Resource::COUNT],
            prices: [SimConfig::BASE_PRICE; Resource::COUNT],
            castle_age: false,
            imperial_age: false,
            university: UniversityTechs::empty(),
            economy: EconomyTechs::empty(),
            blacksmith: [0; BlacksmithLine::COUNT],
            unit_upgrades: [0; 3],
            modifiers: TeamModifiers::default(),
            alliances: 1 << team,
            wonder_built_step: -1,
            relic_hold_start: -1,
        }
    }

    // ===== stockpile =====

    pub fn stockpile(&self, resource: Resource) -> u32 {
        self.stockpile[resource as usize]
    }

    pub fn credit(&mut self, resource: Resource, amount: u32) {
        let slot = &mut self.stockpile[resource as usize];
        *slot = slot.saturating_add(amount);
    }

    pub fn can_afford(&self, cost: Cost) -> bool {
        self.stockpile[Resource::Food as usize] >= cost.food as u32
            && self.stockpile[Resource::Wood as usize] >= cost.wood as u32
            && self.stockpile[Resource::Gold as usize] >= cost.gold as u32
            && self.stockpile[Resource::Stone as usize] >= cost.stone as u32
    }

    /// Atomically debits `cost`. Returns false (and changes nothing) when
    /// the stockpile cannot cover it.
    pub fn debit(&mut self, cost: Cost) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.stockpile[Resource::Food as usize] -= cost.food as u32;
        self.stockpile[Resource::Wood as usize] -= cost.wood as u32;
        self.stockpile[Resource::Gold as usize] -= cost.gold as u32;
        self.stockpile[Resource::Stone as usize] -= cost.stone as u32;
        true
    }

    pub fn refund(&mut self, cost: Cost) {
        self.credit(Resource::Food, cost.food as u32);
        self.credit(Resource::Wood, cost.wood as u32);
        self.credit(Resource::Gold, cost.gold as u32);
        self.credit(Resource::Stone, cost.stone as u32);
    }

    // ===== market =====

    pub fn price(&self, resource: Resource) -> u16 {
        self.prices[resource as usize]
    }

    pub fn shift_price(&mut self, resource: Resource, delta: i16) {
        let slot = &mut self.prices[resource as usize];
        *slot = (*slot as i32 + delta as i32)
            .clamp(SimConfig::MIN_PRICE as i32, SimConfig::MAX_PRICE as i32) as u16;
    }

    /// Moves every price one step toward the base price. Called every
    /// `PRICE_DECAY_INTERVAL` ticks.
    pub fn decay_prices(&mut self) {
        for price in &mut self.prices {
            match (*price).cmp(&SimConfig::BASE_PRICE) {
                std::cmp::Ordering::Less => *price += 1,
                std::cmp::Ordering::Greater => *price -= 1,
                std::cmp::Ordering::Equal => {}
            }
        }
    }

    // ===== tech queries =====

    /// 0 = Dark, 1 = Castle, 2 = Imperial.
    pub fn age(&self) -> u8 {
        self.castle_age as u8 + self.imperial_age as u8
    }

    pub fn blacksmith_level(&self, line: BlacksmithLine) -> u8 {
        self.blacksmith[line as usize]
    }

    pub fn melee_attack_bonus(&self) -> u16 {
        MELEE_ATTACK_BONUS[self.blacksmith_level(BlacksmithLine::MeleeAttack) as usize]
    }

    pub fn archer_attack_bonus(&self) -> u16 {
        ARCHER_ATTACK_BONUS[self.blacksmith_level(BlacksmithLine::ArcherAttack) as usize]
    }

    /// Blacksmith armor for the defender's category. Categories without an
    /// armor line (siege, ships, clergy) get none.
    pub fn armor_vs(&self, category: CombatCategory) -> u16 {
        let line = match category {
            CombatCategory::Infantry => BlacksmithLine::InfantryArmor,
            CombatCategory::Archer => BlacksmithLine::ArcherArmor,
            CombatCategory::Cavalry => BlacksmithLine::CavalryArmor,
            _ => return 0,
        };
        ARMOR_BONUS[self.blacksmith_level(line) as usize]
    }

    /// Structure damage reduction from Masonry and Architecture.
    pub fn structure_armor(&self) -> u16 {
        self.university.contains(UniversityTechs::MASONRY) as u16
            + self.university.contains(UniversityTechs::ARCHITECTURE) as u16
    }

    /// Building max-hp multiplier applied at placement, in percent.
    pub fn masonry_multiplier_percent(&self) -> u16 {
        100 + 10 * self.structure_armor()
    }

    pub fn carry_capacity(&self) -> u16 {
        let mut capacity = SimConfig::BASE_CARRY;
        if self.economy.contains(EconomyTechs::WHEELBARROW) {
            capacity += SimConfig::WHEELBARROW_BONUS;
        }
        if self.economy.contains(EconomyTechs::HAND_CART) {
            capacity += SimConfig::HAND_CART_BONUS;
        }
        capacity
    }

    /// First unresearched tech of `line`, respecting tier order.
    pub fn next_economy_tech(&self, line: &[EconomyTechs]) -> Option<EconomyTechs> {
        line.iter().copied().find(|tech| !self.economy.contains(*tech))
    }

    pub fn is_allied_with(&self, other: u8) -> bool {
        self.alliances & (1 << other) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_is_atomic() {
        let mut team = TeamState::new(0);
        team.credit(Resource::Food, 3);
        team.credit(Resource::Gold, 1);

        let cost = Cost::new(2, 0, 2, 0);
        assert!(!team.debit(cost));
        // Nothing was taken on the failed debit.
        assert_eq!(team.stockpile(Resource::Food), 3);
        assert_eq!(team.stockpile(Resource::Gold), 1);

        team.credit(Resource::Gold, 1);
        assert!(team.debit(cost));
        assert_eq!(team.stockpile(Resource::Food), 1);
        assert_eq!(team.stockpile(Resource::Gold), 0);
    }

    #[test]
    fn price_clamped_to_band() {
        let mut team = TeamState::new(0);
        for _ in 0..100 {
            team.shift_price(Resource::Wood, -(SimConfig::PRICE_DECREASE as i16));
        }
        assert_eq!(team.price(Resource::Wood), SimConfig::MIN_PRICE);
        for _ in 0..100 {
            team.shift_price(Resource::Wood, SimConfig::PRICE_INCREASE as i16);
        }
        assert_eq!(team.price(Resource::Wood), SimConfig::MAX_PRICE);
    }

    #[test]
    fn price_decays_toward_base() {
        let mut team = TeamState::new(0);
        team.shift_price(Resource::Food, 15);
        team.decay_prices();
        assert_eq!(team.price(Resource::Food), SimConfig::BASE_PRICE + 14);
        team.shift_price(Resource::Food, -30);
        let below = team.price(Resource::Food);
        team.decay_prices();
        assert_eq!(team.price(Resource::Food), below + 1);
    }

    #[test]
    fn blacksmith_bonuses_are_cumulative_totals() {
        let mut team = TeamState::new(0);
        assert_eq!(team.melee_attack_bonus(), 0);
        team.blacksmith[BlacksmithLine::MeleeAttack as usize] = 3;
        assert_eq!(team.melee_attack_bonus(), 4);
        team.blacksmith[BlacksmithLine::ArcherAttack as usize] = 2;
        assert_eq!(team.archer_attack_bonus(), 2);
    }

    #[test]
    fn economy_lines_enforce_tier_order() {
        let mut team = TeamState::new(0);
        let wood = ECONOMY_LINES[0];
        assert_eq!(team.next_economy_tech(wood), Some(EconomyTechs::DOUBLE_BIT_AXE));
        team.economy |= EconomyTechs::DOUBLE_BIT_AXE;
        assert_eq!(team.next_economy_tech(wood), Some(EconomyTechs::BOW_SAW));
        team.economy |= EconomyTechs::BOW_SAW | EconomyTechs::TWO_MAN_SAW;
        assert_eq!(team.next_economy_tech(wood), None);
    }

    #[test]
    fn teams_start_allied_with_self() {
        let team = TeamState::new(3);
        assert!(team.is_allied_with(3));
        assert!(!team.is_allied_with(0));
    }
}
