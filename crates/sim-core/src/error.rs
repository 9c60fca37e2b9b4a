//! Top-level error taxonomy.
//!
//! Per-action rejections are deliberately *not* represented here: an illegal
//! move or an unaffordable purchase is an expected RL event and degrades to a
//! silent no-op inside the step pipeline. Only construction-time
//! configuration problems and genuine state corruption surface as errors.

use crate::state::{EntityId, Position};

/// Build-time configuration errors detected at `World::new`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("team count {teams} outside 1..=8")]
    TeamCount { teams: u8 },

    #[error("agents_per_team must be nonzero")]
    NoAgents,

    #[error("map {width}x{height} smaller than the {minimum}-tile observation window")]
    MapTooSmall {
        width: u32,
        height: u32,
        minimum: u32,
    },

    #[error("max_steps must be nonzero")]
    ZeroMaxSteps,

    #[error("initializer spawned more than {max} agents for team {team}")]
    TooManyAgents { team: u8, max: u16 },

    #[error("spawn position {position:?} outside the map")]
    SpawnOutOfBounds { position: Position },

    #[error("spawn position {position:?} already occupied")]
    SpawnOccupied { position: Position },

    #[error("entity arena exhausted during initialization")]
    WorldFull,
}

/// Invariant violations. These indicate a code bug, never a legal action;
/// callers are expected to treat them as fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("entity arena is full")]
    ArenaFull,

    #[error("entity {0:?} not found")]
    EntityNotFound(EntityId),

    #[error("occupancy desync for entity {entity:?} at {position:?}")]
    OccupancyDesync {
        entity: EntityId,
        position: Position,
    },
}
