//! Simulation configuration and tunable balance parameters.

use crate::error::ConfigError;

/// Victory conditions selectable per episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VictoryCondition {
    /// Episodes end only by `max_steps`.
    None,
    /// All non-allied teams have no alive agents.
    #[default]
    Conquest,
    /// A Wonder has stood for [`SimConfig::WONDER_VICTORY_COUNTDOWN`] ticks.
    Wonder,
    /// A team's monasteries hold every relic on the map for
    /// [`SimConfig::RELIC_VICTORY_COUNTDOWN`] ticks.
    Relic,
    /// First of Conquest/Wonder/Relic to trigger.
    All,
}

/// Scripted-opponent strength. Controls how often the AI controller
/// re-evaluates an agent's role tree; stronger settings re-decide more often.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Brutal,
}

impl Difficulty {
    /// Ticks between role re-evaluations; the active option is repeated in
    /// between.
    pub fn decision_interval(self) -> u16 {
        match self {
            Difficulty::Easy => 8,
            Difficulty::Normal => 4,
            Difficulty::Hard => 2,
            Difficulty::Brutal => 1,
        }
    }
}

/// Scalar reward shaping applied while a step executes.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardConfig {
    /// Awarded to every alive agent of a winning team.
    pub victory: f32,
    /// Awarded to the attacker when its target dies.
    pub kill: f32,
    /// Per point of damage dealt.
    pub damage: f32,
    /// Per resource unit transferred into the team stockpile.
    pub dropoff: f32,
    /// Per resource unit gathered into an agent inventory.
    pub gather: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            victory: 10.0,
            kill: 0.5,
            damage: 0.01,
            dropoff: 0.1,
            gather: 0.02,
        }
    }
}

/// Map and population dimensions fixed for the lifetime of a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapDimensions {
    pub width: u32,
    pub height: u32,
    pub teams: u8,
    pub agents_per_team: u16,
}

impl MapDimensions {
    pub const fn new(width: u32, height: u32, teams: u8, agents_per_team: u16) -> Self {
        Self {
            width,
            height,
            teams,
            agents_per_team,
        }
    }

    /// Total agent slot count (`teams * agents_per_team`).
    pub fn agent_count(&self) -> usize {
        self.teams as usize * self.agents_per_team as usize
    }
}

/// Episode configuration. Validated once at [`crate::World::new`]; immutable
/// afterwards so `reset` reproduces the exact same episode.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    pub max_steps: u64,
    pub victory_condition: VictoryCondition,
    /// Bitmask of teams driven by the scripted controller instead of the
    /// external action buffer.
    pub ai_controlled_teams: u8,
    /// One entry per team; missing entries fall back to `Normal`.
    pub difficulty: [Difficulty; SimConfig::MAX_TEAMS],
    pub rewards: RewardConfig,
    pub map: MapDimensions,
}

impl SimConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum number of teams an episode can host (alliance masks are `u8`).
    pub const MAX_TEAMS: usize = 8;
    /// Entity arena capacity: agents, buildings, resource nodes, wildlife,
    /// corpses and drops over a whole episode.
    pub const MAX_ENTITIES: usize = 16384;
    /// Production queue depth per training building.
    pub const MAX_QUEUE: usize = 5;
    /// Garrison slots per building (capacity per kind is lower, see tables).
    pub const MAX_GARRISON: usize = 15;
    /// Deferred commands buffered per agent between ticks.
    pub const MAX_PENDING_COMMANDS: usize = 4;

    // ===== observation geometry =====
    /// Egocentric window radius; the window is `2 * R + 1` tiles square.
    pub const OBS_RADIUS: i32 = 5;
    pub const OBS_WINDOW: usize = (2 * Self::OBS_RADIUS as usize) + 1;

    // ===== action encoding =====
    /// Arguments per verb; one byte must fit `VERB_COUNT * ARG_COUNT`.
    pub const ARG_COUNT: u8 = 20;
    pub const VERB_COUNT: u8 = 9;

    // ===== movement =====
    /// Terrain speeds are expressed in tenths; a move adds
    /// `SPEED_DEBT_SCALE - speed_tenths` to the debt accumulator.
    pub const SPEED_DEBT_SCALE: u16 = 10;
    pub const SPEED_DEBT_THRESHOLD: u16 = 10;

    // ===== combat =====
    pub const SIEGE_STRUCTURE_MULTIPLIER: u16 = 3;
    pub const AOE_LENGTH: i32 = 3;
    pub const TOWER_FIRE_INTERVAL: u16 = 3;
    /// Extra arrows per garrisoned unit.
    pub const GARRISON_ARROW_BONUS: u16 = 1;
    pub const TOWER_DEAD_ZONE: i32 = 2;
    pub const HEATED_SHOT_WATER_BONUS: u16 = 2;
    pub const MONK_MAX_FAITH: u16 = 100;
    pub const MONK_CONVERSION_FAITH_COST: u16 = 100;
    pub const MONK_FAITH_RECHARGE_RATE: u16 = 2;
    /// Freshly converted units cannot act or be swapped for this many ticks.
    pub const CONVERSION_FREEZE: u16 = 5;
    pub const DEATH_TINT_DURATION: u16 = 8;
    /// Meat left on a corpse when it is first dropped.
    pub const CORPSE_MEAT: u16 = 9;
    pub const ATTACK_COOLDOWN: u16 = 2;

    // ===== economy =====
    pub const BASE_CARRY: u16 = 10;
    pub const WHEELBARROW_BONUS: u16 = 3;
    pub const HAND_CART_BONUS: u16 = 5;
    pub const BASE_PRICE: u16 = 100;
    pub const MIN_PRICE: u16 = 20;
    pub const MAX_PRICE: u16 = 200;
    pub const PRICE_INCREASE: u16 = 5;
    pub const PRICE_DECREASE: u16 = 5;
    pub const PRICE_DECAY_INTERVAL: u64 = 50;
    pub const MARKET_COOLDOWN: u16 = 10;
    /// Wood sells for `wood * price / SELL_DENOM` gold.
    pub const SELL_DENOM: u16 = 150;
    /// Gold buys `gold * BUY_NUM / price` food.
    pub const BUY_NUM: u16 = 75;
    pub const TRADE_DISTANCE_DIVISOR: u32 = 4;
    pub const TRADE_GOLD_PER_DISTANCE: u32 = 2;

    // ===== production & buildings =====
    /// Construction progress per villager Use.
    pub const BUILD_HP_PER_USE: u16 = 5;
    pub const CASTLE_TECH_COOLDOWN: u16 = 25;
    pub const POP_PER_HOUSE: u16 = 5;
    pub const POP_PER_TOWN_CENTER: u16 = 5;
    pub const POP_PER_CASTLE: u16 = 10;

    /// Ticks between monastery gold payouts (one gold per stored relic).
    pub const RELIC_GOLD_INTERVAL: u64 = 10;

    // ===== victory =====
    pub const WONDER_VICTORY_COUNTDOWN: u64 = 100;
    pub const RELIC_VICTORY_COUNTDOWN: u64 = 100;

    // ===== wildlife =====
    /// A struck herd animal flees for this many ticks.
    pub const SCATTER_DURATION: u16 = 10;
    /// Herd members close up on their leader beyond this distance.
    pub const HERD_RADIUS: i32 = 2;

    /// Validates cross-field consistency. Called by `World::new`; a failure
    /// here is a caller bug, not a runtime event.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.map.teams == 0 || self.map.teams as usize > Self::MAX_TEAMS {
            return Err(ConfigError::TeamCount {
                teams: self.map.teams,
            });
        }
        if self.map.agents_per_team == 0 {
            return Err(ConfigError::NoAgents);
        }
        let window = Self::OBS_WINDOW as u32;
        if self.map.width < window || self.map.height < window {
            return Err(ConfigError::MapTooSmall {
                width: self.map.width,
                height: self.map.height,
                minimum: window,
            });
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroMaxSteps);
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_steps: 2000,
            victory_condition: VictoryCondition::Conquest,
            ai_controlled_teams: 0,
            difficulty: [Difficulty::Normal; Self::MAX_TEAMS],
            rewards: RewardConfig::default(),
            map: MapDimensions::new(64, 64, 2, 8),
        }
    }
}
