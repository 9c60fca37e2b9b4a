//! Authoritative world state.
//!
//! This module owns the data structures that describe the grid, entities,
//! teams, and per-agent RL arrays. External callers mutate the world
//! exclusively through [`World::step`]; the spawn API below exists for map
//! initializers and the phases themselves.

pub mod agents;
pub mod arena;
pub mod common;
pub mod entity;
pub mod grid;
pub mod team;

pub use agents::{AgentArrays, OBS_SIZE};
pub use arena::{Arena, SpatialIndex};
pub use common::{Direction, EntityId, Position, Tick};
pub use entity::{
    AnimalData, BuildingData, CarryItem, CombatCategory, DropData, Entity, EntityData, EntityKind,
    GarrisonSlots, Inventory, ProductionQueue, QueueEntry, ResourceData, Stance, UnitClass,
    UnitData,
};
pub use grid::{Grid, Terrain};
pub use team::{
    BLACKSMITH_MAX_LEVEL, BlacksmithLine, Cost, ECONOMY_LINES, EconomyTechs, Resource, TeamState,
    TeamModifiers, UniversityTechs,
};

use crate::ai::AiController;
use crate::config::SimConfig;
use crate::env::{MapInitializer, Pcg32, mix_seed};
use crate::error::{ConfigError, StateError};
use crate::tables;

/// Per-tick scratch buffers. Cleared in phase 1 of every step; values must
/// never be read across ticks.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepScratch {
    /// Tiles whose contents changed this tick; intersected with agent
    /// windows to decide which observations to rebuild.
    pub dirty_tiles: Vec<Position>,
    /// Population cap per team, recomputed in phase 2.
    pub pop_cap: Vec<u16>,
    /// Alive agent count per team, recomputed in phase 2.
    pub pop_count: Vec<u16>,
    /// Damaged friendly buildings per team, recomputed in phase 2.
    pub damaged_buildings: Vec<Vec<EntityId>>,
}

impl StepScratch {
    fn new(teams: u8) -> Self {
        Self {
            dirty_tiles: Vec::new(),
            pop_cap: vec![0; teams as usize],
            pop_count: vec![0; teams as usize],
            damaged_buildings: vec![Vec::new(); teams as usize],
        }
    }
}

/// The single aggregate. Its lifetime equals one episode: created by an
/// initializer, mutated only by the step pipeline, rebuilt on reset.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct World {
    pub(crate) config: SimConfig,
    seed: u64,
    pub(crate) grid: Grid,
    pub(crate) arena: Arena,
    pub(crate) index: SpatialIndex,
    pub(crate) teams: Vec<TeamState>,
    pub(crate) agents: AgentArrays,
    /// Agent slot -> arena entity, filled in spawn order per team.
    pub(crate) agent_entities: Vec<Option<EntityId>>,
    /// Next free agent slot within each team.
    agent_spawn_cursor: Vec<u16>,
    /// Persistent permutation re-shuffled each tick; agents act in this
    /// order so no agent id has structural priority.
    pub(crate) agent_order: Vec<u16>,
    pub(crate) rng: Pcg32,
    pub(crate) current_step: Tick,
    pub(crate) should_reset: bool,
    pub(crate) victory_winners: u8,
    pub(crate) victory_winner: Option<u8>,
    pub(crate) ai: AiController,
    pub(crate) scratch: StepScratch,
    /// Relics on the map at episode start; the relic victory target.
    pub(crate) total_relics: u16,
}

impl World {
    /// Builds a world from a validated config and a map initializer.
    pub fn new(
        config: SimConfig,
        seed: u64,
        initializer: &dyn MapInitializer,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let agent_count = config.map.agent_count();
        let teams = config.map.teams;
        let mut world = Self {
            grid: Grid::new(config.map.width, config.map.height),
            arena: Arena::new(),
            index: SpatialIndex::new(teams),
            teams: (0..teams).map(TeamState::new).collect(),
            agents: AgentArrays::new(agent_count),
            agent_entities: vec![None; agent_count],
            agent_spawn_cursor: vec![0; teams as usize],
            agent_order: (0..agent_count as u16).collect(),
            rng: Pcg32::seed_from(mix_seed(seed, 0)),
            current_step: 0,
            should_reset: false,
            victory_winners: 0,
            victory_winner: None,
            ai: AiController::new(agent_count),
            scratch: StepScratch::new(teams),
            total_relics: 0,
            config,
            seed,
        };

        initializer.populate(&mut world)?;
        world.total_relics = world.count_relics();
        world.rebuild_all_observations();
        Ok(world)
    }

    /// Reinitializes from the same `(config, seed)`. The resulting state is
    /// bit-identical to the one `new` produced.
    pub fn reset(&mut self, initializer: &dyn MapInitializer) -> Result<(), ConfigError> {
        *self = Self::new(self.config.clone(), self.seed, initializer)?;
        Ok(())
    }

    // ===== read-only accessors (RL surface) =====

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn agent_count(&self) -> usize {
        self.agents.agent_count()
    }

    pub fn current_step(&self) -> Tick {
        self.current_step
    }

    pub fn should_reset(&self) -> bool {
        self.should_reset
    }

    /// Lowest-numbered winning team once victory has triggered.
    pub fn victory_winner(&self) -> Option<u8> {
        self.victory_winner
    }

    /// Bitmask of winning teams.
    pub fn victory_winners(&self) -> u8 {
        self.victory_winners
    }

    pub fn observation(&self, agent: u16) -> &[u8] {
        self.agents.observation(agent)
    }

    pub fn terminated(&self, agent: u16) -> f32 {
        self.agents.terminated(agent)
    }

    pub fn truncated(&self, agent: u16) -> f32 {
        self.agents.truncated(agent)
    }

    pub fn reward(&self, agent: u16) -> f32 {
        self.agents.reward(agent)
    }

    pub fn grid_view(&self) -> &Grid {
        &self.grid
    }

    pub fn team(&self, team: u8) -> &TeamState {
        &self.teams[team as usize]
    }

    pub fn team_mut(&mut self, team: u8) -> &mut TeamState {
        &mut self.teams[team as usize]
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.arena.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.arena.get_mut(id)
    }

    pub fn agent_entity(&self, agent: u16) -> Option<&Entity> {
        let id = self.agent_entities.get(agent as usize).copied().flatten()?;
        self.arena.alive(id)
    }

    pub fn agent_entity_id(&self, agent: u16) -> Option<EntityId> {
        self.agent_entities.get(agent as usize).copied().flatten()
    }

    // ===== team relations =====

    pub(crate) fn effective_team_of(&self, entity: &Entity) -> Option<u8> {
        entity.effective_team(self.config.map.agents_per_team)
    }

    pub(crate) fn are_allied(&self, a: u8, b: u8) -> bool {
        self.teams[a as usize].is_allied_with(b)
    }

    /// Home team an agent slot belongs to (ignores conversion overrides).
    pub(crate) fn slot_team(&self, agent: u16) -> u8 {
        (agent / self.config.map.agents_per_team) as u8
    }

    // ===== terrain authoring (initializers and auto-roads) =====

    pub fn set_terrain(&mut self, position: Position, terrain: Terrain) {
        if self.grid.contains(position) {
            self.grid.set_terrain(position, terrain);
            self.mark_tile_dirty(position);
        }
    }

    pub fn set_elevation(&mut self, position: Position, elevation: i8) {
        if self.grid.contains(position) {
            self.grid.set_elevation(position, elevation);
            self.mark_tile_dirty(position);
        }
    }

    pub fn set_biome(&mut self, position: Position, biome: u8) {
        if self.grid.contains(position) {
            self.grid.set_biome(position, biome);
        }
    }

    // ===== spawning =====

    /// Spawns an agent of `class` for `team` into the team's next free agent
    /// slot.
    pub fn spawn_agent(
        &mut self,
        team: u8,
        class: UnitClass,
        position: Position,
    ) -> Result<EntityId, ConfigError> {
        let per_team = self.config.map.agents_per_team;
        if self.agent_spawn_cursor[team as usize] >= per_team {
            return Err(ConfigError::TooManyAgents {
                team,
                max: per_team,
            });
        }
        self.check_spawn_tile(position, true)?;
        let agent_id = team as u16 * per_team + self.agent_spawn_cursor[team as usize];
        self.agent_spawn_cursor[team as usize] += 1;

        let stats = tables::unit_stats(class);
        let modifiers = self.teams[team as usize].modifiers;
        let category = class.category();
        let hp = (stats.hp as i32 + modifiers.hp_for(category) as i32).max(1) as u16;
        let attack = (stats.attack as i32 + modifiers.attack_for(category) as i32).max(0) as u16;

        let mut unit = UnitData::new(agent_id, class);
        unit.bonus_armor = modifiers.armor_for(category);

        let entity = Entity {
            id: EntityId(0),
            kind: EntityKind::Agent,
            pos: position,
            orientation: Direction::South,
            team: Some(team),
            hp,
            max_hp: hp,
            attack,
            cooldown: 0,
            alive: true,
            data: EntityData::Unit(unit),
        };
        let id = self.insert_entity(entity)?;
        self.agent_entities[agent_id as usize] = Some(id);
        self.agents.set_terminated(agent_id, false);
        self.agents.mark_dirty(agent_id);
        Ok(id)
    }

    /// Spawns a building. `completed` controls whether it starts at full hp
    /// (initializer) or at 1 hp (construction site).
    pub fn spawn_building(
        &mut self,
        kind: EntityKind,
        team: u8,
        position: Position,
        completed: bool,
    ) -> Result<EntityId, ConfigError> {
        debug_assert!(kind.is_building(), "spawn_building on {kind:?}");
        self.check_spawn_tile(position, kind.is_blocking())?;
        let stats = tables::building_stats(kind);
        let max_hp =
            stats.hp as u32 * self.teams[team as usize].masonry_multiplier_percent() as u32 / 100;
        let max_hp = max_hp as u16;
        let entity = Entity {
            id: EntityId(0),
            kind,
            pos: position,
            orientation: Direction::South,
            team: Some(team),
            hp: if completed { max_hp } else { 1 },
            max_hp,
            attack: stats.attack,
            cooldown: 0,
            alive: true,
            data: EntityData::Building(BuildingData::default()),
        };
        self.insert_entity(entity)
    }

    /// Spawns a resource node with its table-defined initial stock.
    pub fn spawn_resource(
        &mut self,
        kind: EntityKind,
        position: Position,
    ) -> Result<EntityId, ConfigError> {
        debug_assert!(kind.is_resource_node(), "spawn_resource on {kind:?}");
        self.check_spawn_tile(position, kind.is_blocking())?;
        let entity = Entity {
            id: EntityId(0),
            kind,
            pos: position,
            orientation: Direction::South,
            team: None,
            hp: 1,
            max_hp: 1,
            attack: 0,
            cooldown: 0,
            alive: true,
            data: EntityData::Resource(ResourceData {
                remaining: tables::resource_node_amount(kind),
            }),
        };
        self.insert_entity(entity)
    }

    /// Spawns a wild animal. Wolves with `pack_leader` head their pack.
    pub fn spawn_animal(
        &mut self,
        kind: EntityKind,
        position: Position,
        herd_id: u8,
        pack_leader: bool,
    ) -> Result<EntityId, ConfigError> {
        debug_assert!(kind.is_animal(), "spawn_animal on {kind:?}");
        self.check_spawn_tile(position, true)?;
        let (hp, attack) = match kind {
            EntityKind::Cow => (40, 0),
            EntityKind::Wolf => (25, 4),
            EntityKind::Bear => (60, 8),
            _ => (1, 0),
        };
        let entity = Entity {
            id: EntityId(0),
            kind,
            pos: position,
            orientation: Direction::South,
            team: None,
            hp,
            max_hp: hp,
            attack,
            cooldown: 0,
            alive: true,
            data: EntityData::Animal(AnimalData {
                herd_id,
                is_pack_leader: pack_leader,
                scattered_steps: 0,
            }),
        };
        self.insert_entity(entity)
    }

    /// Spawns a background drop (corpse, relic, lantern).
    pub fn spawn_drop(
        &mut self,
        kind: EntityKind,
        position: Position,
        meat: u16,
    ) -> Result<EntityId, ConfigError> {
        debug_assert!(
            matches!(
                kind,
                EntityKind::Corpse | EntityKind::Relic | EntityKind::Lantern
            ),
            "spawn_drop on {kind:?}"
        );
        self.check_spawn_tile(position, false)?;
        let entity = Entity {
            id: EntityId(0),
            kind,
            pos: position,
            orientation: Direction::South,
            team: None,
            hp: 1,
            max_hp: 1,
            attack: 0,
            cooldown: 0,
            alive: true,
            data: EntityData::Drop(DropData { meat }),
        };
        self.insert_entity(entity)
    }

    fn check_spawn_tile(&self, position: Position, blocking: bool) -> Result<(), ConfigError> {
        if !self.grid.contains(position) {
            return Err(ConfigError::SpawnOutOfBounds { position });
        }
        let occupied = if blocking {
            self.grid.primary(position).is_some()
        } else {
            self.grid.background(position).is_some()
        };
        if occupied {
            return Err(ConfigError::SpawnOccupied { position });
        }
        Ok(())
    }

    fn insert_entity(&mut self, entity: Entity) -> Result<EntityId, ConfigError> {
        let kind = entity.kind;
        let team = entity.team;
        let position = entity.pos;
        let id = self.arena.alloc(entity).map_err(|_| ConfigError::WorldFull)?;
        if kind.is_blocking() {
            self.grid.set_primary(position, Some(id));
        } else {
            self.grid.set_background(position, Some(id));
        }
        self.index.insert(id, kind, team);
        self.mark_tile_dirty(position);
        Ok(id)
    }

    // ===== grid synchronization =====

    pub(crate) fn mark_tile_dirty(&mut self, position: Position) {
        if self.grid.contains(position) {
            self.scratch.dirty_tiles.push(position);
        }
    }

    /// Removes an entity from the grid without killing it (garrison entry).
    pub(crate) fn lift_from_grid(&mut self, id: EntityId) -> Result<(), StateError> {
        let entity = self.arena.get(id).ok_or(StateError::EntityNotFound(id))?;
        let position = entity.pos;
        let blocking = entity.kind.is_blocking();
        if position.is_off_grid() {
            return Ok(());
        }
        if blocking {
            if self.grid.primary(position) != Some(id) {
                return Err(StateError::OccupancyDesync {
                    entity: id,
                    position,
                });
            }
            self.grid.set_primary(position, None);
        } else {
            if self.grid.background(position) != Some(id) {
                return Err(StateError::OccupancyDesync {
                    entity: id,
                    position,
                });
            }
            self.grid.set_background(position, None);
        }
        self.arena.get_mut(id).unwrap().pos = Position::OFF_GRID;
        self.mark_tile_dirty(position);
        Ok(())
    }

    /// Places a lifted entity back on the grid at `position`.
    pub(crate) fn place_on_grid(
        &mut self,
        id: EntityId,
        position: Position,
    ) -> Result<(), StateError> {
        let entity = self.arena.get(id).ok_or(StateError::EntityNotFound(id))?;
        let blocking = entity.kind.is_blocking();
        debug_assert!(entity.pos.is_off_grid(), "place_on_grid of placed entity");
        if blocking {
            debug_assert!(self.grid.primary(position).is_none());
            self.grid.set_primary(position, Some(id));
        } else {
            debug_assert!(self.grid.background(position).is_none());
            self.grid.set_background(position, Some(id));
        }
        self.arena.get_mut(id).unwrap().pos = position;
        self.mark_tile_dirty(position);
        Ok(())
    }

    /// Moves an entity between two grid tiles, keeping occupancy in sync.
    pub(crate) fn relocate(&mut self, id: EntityId, to: Position) -> Result<(), StateError> {
        self.lift_from_grid(id)?;
        self.place_on_grid(id, to)
    }

    /// Low-level destruction: clears the grid slot, drops the entity from
    /// the index, and marks it dead. Death side effects (corpse, drops,
    /// garrison ejection) are the combat module's concern.
    pub(crate) fn destroy_entity(&mut self, id: EntityId) {
        let Some(entity) = self.arena.get(id) else {
            return;
        };
        if !entity.alive {
            return;
        }
        let kind = entity.kind;
        let team = entity.team;
        let position = entity.pos;
        if !position.is_off_grid() {
            if kind.is_blocking() {
                if self.grid.primary(position) == Some(id) {
                    self.grid.set_primary(position, None);
                }
            } else if self.grid.background(position) == Some(id) {
                self.grid.set_background(position, None);
            }
            self.mark_tile_dirty(position);
        }
        self.index.remove(id, kind, team);
        let entity = self.arena.get_mut(id).unwrap();
        entity.alive = false;
        entity.pos = Position::OFF_GRID;
    }

    // ===== queries shared by phases and the AI =====

    /// First free tile adjacent to `position` in build search order.
    pub(crate) fn adjacent_free_tile(&self, position: Position) -> Option<Position> {
        Direction::ALL
            .iter()
            .map(|&d| position.step(d))
            .find(|&p| self.grid.contains(p) && self.grid.primary(p).is_none())
    }

    /// Nearest alive entity of `kind` owned by `team`, by Manhattan distance.
    pub(crate) fn nearest_of_kind(
        &self,
        kind: EntityKind,
        team: Option<u8>,
        from: Position,
    ) -> Option<EntityId> {
        self.index
            .of_kind(kind)
            .iter()
            .filter_map(|&id| self.arena.alive(id))
            .filter(|e| team.is_none() || e.team == team)
            .filter(|e| !e.pos.is_off_grid())
            .min_by_key(|e| (from.manhattan(e.pos), e.id))
            .map(|e| e.id)
    }

    /// Population cap for `team` from standing buildings.
    pub(crate) fn compute_pop_cap(&self, team: u8) -> u16 {
        self.index
            .of_team(team)
            .iter()
            .filter_map(|&id| self.arena.alive(id))
            .filter(|e| e.kind.is_building())
            .map(|e| tables::building_stats(e.kind).pop_bonus)
            .sum()
    }

    /// Alive agents whose effective team is `team` (converted units count
    /// toward their new team).
    pub(crate) fn compute_pop_count(&self, team: u8) -> u16 {
        (0..self.agent_count() as u16)
            .filter(|&agent| {
                self.agent_entity(agent)
                    .and_then(|e| self.effective_team_of(e))
                    == Some(team)
            })
            .count() as u16
    }

    fn count_relics(&self) -> u16 {
        let loose = self.index.of_kind(EntityKind::Relic).len() as u16;
        let carried: u16 = self
            .arena
            .iter_alive()
            .filter_map(|e| e.unit())
            .map(|u| u.inventory.count(CarryItem::Relic))
            .sum();
        let garrisoned: u16 = self
            .index
            .of_kind(EntityKind::Monastery)
            .iter()
            .filter_map(|&id| self.arena.alive(id))
            .filter_map(|e| e.building())
            .map(|b| b.garrisoned_relics as u16)
            .sum();
        loose + carried + garrisoned
    }

    /// Applies a new unit class to an agent entity, resetting hp and attack
    /// from the tables plus the owning team's current modifiers.
    pub(crate) fn apply_unit_class(&mut self, id: EntityId, class: UnitClass) {
        let Some(entity) = self.arena.alive(id) else {
            return;
        };
        let Some(team) = self.effective_team_of(entity) else {
            return;
        };
        let stats = tables::unit_stats(class);
        let modifiers = self.teams[team as usize].modifiers;
        let category = class.category();
        let hp = (stats.hp as i32 + modifiers.hp_for(category) as i32).max(1) as u16;
        let attack = (stats.attack as i32 + modifiers.attack_for(category) as i32).max(0) as u16;
        let bonus_armor = modifiers.armor_for(category);
        let position = self.arena.get(id).map(|e| e.pos);

        let entity = self.arena.get_mut(id).unwrap();
        entity.hp = hp;
        entity.max_hp = hp;
        entity.attack = attack;
        if let Some(unit) = entity.unit_mut() {
            unit.class = class;
            unit.bonus_armor = bonus_armor;
            unit.packed = class == UnitClass::Trebuchet;
            unit.faith = if class == UnitClass::Monk {
                SimConfig::MONK_MAX_FAITH
            } else {
                0
            };
        }
        if let Some(position) = position {
            if !position.is_off_grid() {
                self.mark_tile_dirty(position);
            }
        }
    }

    /// Promotes an existing unit along an upgrade line, preserving its hp
    /// ratio.
    pub(crate) fn promote_unit(&mut self, id: EntityId, class: UnitClass) {
        let Some(entity) = self.arena.alive(id) else {
            return;
        };
        let (old_hp, old_max) = (entity.hp as u32, entity.max_hp.max(1) as u32);
        self.apply_unit_class(id, class);
        let entity = self.arena.get_mut(id).unwrap();
        let new_max = entity.max_hp as u32;
        entity.hp = ((old_hp * new_max).div_ceil(old_max)).min(new_max) as u16;
    }

    // ===== determinism =====

    /// Computes a deterministic SHA-256 hash of the simulation state.
    ///
    /// Used by the test suites as a replay commitment: identical
    /// `(initial world, seed, action sequence)` inputs must produce
    /// identical roots at every tick boundary.
    #[cfg(feature = "serde")]
    pub fn state_root(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(self.current_step.to_le_bytes());
        if let Ok(bytes) = bincode::serialize(&self.grid) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = bincode::serialize(&self.arena) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = bincode::serialize(&self.teams) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = bincode::serialize(&self.agents) {
            hasher.update(&bytes);
        }
        hasher.finalize().into()
    }
}
