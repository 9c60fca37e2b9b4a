//! Deterministic tile-based RTS simulation core for reinforcement learning.
//!
//! `tilewar-core` defines the canonical rules (world state, the per-tick
//! step pipeline, combat, economy, production, the scripted controller, and
//! the observation encoder) behind a single mutation entry point,
//! [`World::step`]. Each tick consumes one encoded action byte per agent
//! and yields per-agent observation tensors, rewards, and episode flags.
//! For identical `(config, seed, action sequence)` inputs every
//! intermediate state is bit-identical.

pub mod action;
pub mod ai;
pub mod combat;
pub mod config;
pub mod economy;
pub mod env;
pub mod error;
pub mod movement;
pub mod obs;
pub mod production;
pub mod state;
pub mod step;
pub mod tables;
pub mod victory;
pub mod wildlife;

pub use action::{Action, USE_ARG_PACK, USE_ARG_TOWN_BELL, USE_ARG_UNGARRISON_ALL, Verb};
pub use ai::{AgentLifecycle, AiController, CachePhase, CacheWrapper, Command, PerAgentCache, PerTeamCache, RoleKind};
pub use config::{Difficulty, MapDimensions, RewardConfig, SimConfig, VictoryCondition};
pub use env::{FnInitializer, MapInitializer, Pcg32, SkirmishMap, mix_seed};
pub use error::{ConfigError, StateError};
pub use obs::OBS_LAYERS;
pub use state::{
    AgentArrays, Arena, BlacksmithLine, CarryItem, CombatCategory, Cost, Direction, EconomyTechs,
    Entity, EntityData, EntityId, EntityKind, Grid, Inventory, OBS_SIZE, Position, QueueEntry,
    Resource, SpatialIndex, Stance, TeamState, Terrain, Tick, UnitClass, UniversityTechs, World,
};
pub use tables::{BUILD_INDEX, BuildingStats, Civ, UnitStats, building_stats, unit_stats};
