//! Scripted AI controller.
//!
//! One controller instance lives inside each world; no module-level state,
//! so independent worlds can coexist on different threads. Every tick the
//! step pipeline asks it to fill the action buffer for agents on
//! AI-controlled teams; user-issued commands buffered between ticks take
//! precedence over the role trees.

pub(crate) mod behaviors;
pub(crate) mod cache;

pub use cache::{AgentLifecycle, CachePhase, CacheWrapper, PerAgentCache, PerTeamCache};

use arrayvec::ArrayVec;
use option_tree::{Role, Tier};

use crate::action::Action;
use crate::config::SimConfig;
use crate::state::{Direction, EntityId, Position, Stance, UnitClass, World};
use behaviors::DecisionCtx;

/// Commands a user or script can issue to an agent between ticks. Buffered
/// in the deferred queue and applied atomically at the start of the next
/// step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    Stop,
    HoldPosition,
    Scout,
    MoveTo(Position),
    AttackMove(Position),
    Patrol(Position, Position),
    Follow(u16),
    Guard(u16),
    SetStance(Stance),
}

/// Coarse role an agent plays in the role catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoleKind {
    #[default]
    Gatherer,
    Builder,
    Fighter,
    /// Obeys queued commands only; the role tree never runs.
    Scripted,
}

/// Per-agent controller state.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct AgentAi {
    pub role: RoleKind,
    /// Active user command; obeyed before the role tree.
    pub command: Option<Command>,
    /// Deferred commands drained at tick start.
    pub pending: ArrayVec<Command, { SimConfig::MAX_PENDING_COMMANDS }>,
    /// Last decided action, repeated until the decision interval elapses.
    pub last_action: Action,
    pub option_ticks: u16,
    /// Patrol bookkeeping: true while heading to the second anchor.
    pub patrol_to_second: bool,
}

/// Proximity caches shared by all behaviors, generation-reset once per tick.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub(crate) struct AiCaches {
    pub closest_wood: PerAgentCache<Option<Position>>,
    pub closest_food: PerAgentCache<Option<Position>>,
    pub closest_gold: PerAgentCache<Option<Position>>,
    pub closest_stone: PerAgentCache<Option<Position>>,
}

impl AiCaches {
    fn new(agents: usize) -> Self {
        Self {
            closest_wood: PerAgentCache::new(agents),
            closest_food: PerAgentCache::new(agents),
            closest_gold: PerAgentCache::new(agents),
            closest_stone: PerAgentCache::new(agents),
        }
    }

    fn begin_step(&mut self) {
        self.closest_wood.begin_step();
        self.closest_food.begin_step();
        self.closest_gold.begin_step();
        self.closest_stone.begin_step();
    }
}

/// The global controller owned by a world.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AiController {
    pub(crate) per_agent: Vec<AgentAi>,
    pub(crate) lifecycle: AgentLifecycle,
    pub(crate) caches: AiCaches,
}

impl AiController {
    pub(crate) fn new(agents: usize) -> Self {
        Self {
            per_agent: (0..agents).map(|_| AgentAi::default()).collect(),
            lifecycle: AgentLifecycle::new(agents),
            caches: AiCaches::new(agents),
        }
    }

    /// Buffers a command for the next tick. Silently dropped when the
    /// agent's queue is full.
    pub(crate) fn push_command(&mut self, agent: u16, command: Command) {
        if let Some(state) = self.per_agent.get_mut(agent as usize) {
            let _ = state.pending.try_push(command);
        }
    }

    /// Phase 3: apply every buffered command atomically. Stance changes
    /// mutate the entity; everything else replaces the active command.
    pub(crate) fn drain_pending(&mut self, world: &mut World) {
        for agent in 0..self.per_agent.len() as u16 {
            let pending: Vec<Command> = self.per_agent[agent as usize].pending.drain(..).collect();
            for command in pending {
                match command {
                    Command::SetStance(stance) => {
                        if let Some(id) = world.agent_entity_id(agent) {
                            if let Some(unit) =
                                world.entity_mut(id).and_then(|e| e.unit_mut())
                            {
                                unit.stance = stance;
                            }
                        }
                    }
                    Command::Stop => {
                        let state = &mut self.per_agent[agent as usize];
                        state.command = None;
                        state.patrol_to_second = false;
                    }
                    other => {
                        self.per_agent[agent as usize].command = Some(other);
                    }
                }
            }
        }
    }

    /// Phase 4.5: fill the action buffer for AI-controlled teams. RL-driven
    /// slots keep their caller-provided bytes.
    pub(crate) fn decide_all(&mut self, world: &mut World, actions: &mut [u8]) {
        self.caches.begin_step();
        let mut rng = world.rng;
        for agent in 0..self.per_agent.len() as u16 {
            if world.agents.is_terminated(agent) {
                continue;
            }
            // Converted agents follow their new team's controller.
            let team = world
                .agent_entity(agent)
                .and_then(|e| world.effective_team_of(e))
                .unwrap_or_else(|| world.slot_team(agent));
            if world.config.ai_controlled_teams & (1 << team) == 0 {
                continue;
            }
            let difficulty = world.config.difficulty[team as usize];
            let action = self.decide(world, agent, difficulty.decision_interval(), &mut rng);
            actions[agent as usize] = action.encode();
        }
        world.rng = rng;
    }

    fn decide(
        &mut self,
        world: &World,
        agent: u16,
        decision_interval: u16,
        rng: &mut crate::env::Pcg32,
    ) -> Action {
        let Some(entity) = world.agent_entity(agent) else {
            return Action::NOOP;
        };
        if entity.is_garrisoned() {
            return Action::NOOP;
        }
        let Some(class) = entity.unit_class() else {
            return Action::NOOP;
        };
        let Some(team) = world.effective_team_of(entity) else {
            return Action::NOOP;
        };
        let entity_id = entity.id;
        let position = entity.pos;

        self.lifecycle.mark_active(agent, world.current_step());

        // User commands outrank the role tree.
        if let Some(command) = self.per_agent[agent as usize].command {
            return self.obey(world, agent, entity_id, position, class, command);
        }

        let state = &mut self.per_agent[agent as usize];
        if state.option_ticks > 0 {
            state.option_ticks -= 1;
            return state.last_action;
        }
        state.role = role_for(class, agent);
        let role_kind = state.role;

        let action = if role_kind == RoleKind::Scripted {
            Action::NOOP
        } else {
            let mut ctx = DecisionCtx {
                world,
                agent,
                entity: entity_id,
                position,
                team,
                class,
                caches: &mut self.caches,
            };
            let role = build_role(role_kind);
            let mut roll = |n: u32| rng.next_bounded(n);
            role.decide(&mut ctx, &mut roll).unwrap_or(Action::NOOP)
        };

        let state = &mut self.per_agent[agent as usize];
        state.last_action = action;
        state.option_ticks = decision_interval.saturating_sub(1);
        action
    }

    /// Executes the active user command for one tick.
    fn obey(
        &mut self,
        world: &World,
        agent: u16,
        entity: EntityId,
        position: Position,
        class: UnitClass,
        command: Command,
    ) -> Action {
        let state = &mut self.per_agent[agent as usize];
        match command {
            Command::Stop | Command::SetStance(_) => Action::NOOP,
            Command::HoldPosition => behaviors::enemy_in_attack_range(world, entity)
                .map(Action::attack)
                .unwrap_or(Action::NOOP),
            Command::MoveTo(target) => {
                if position.chebyshev(target) <= 1 {
                    state.command = None;
                    Action::NOOP
                } else {
                    Direction::toward(position, target)
                        .map(Action::move_to)
                        .unwrap_or(Action::NOOP)
                }
            }
            Command::AttackMove(target) => {
                if class != UnitClass::Villager {
                    if let Some(direction) = behaviors::enemy_in_attack_range(world, entity) {
                        return Action::attack(direction);
                    }
                }
                if position.chebyshev(target) <= 1 {
                    state.command = None;
                    Action::NOOP
                } else {
                    Direction::toward(position, target)
                        .map(Action::move_to)
                        .unwrap_or(Action::NOOP)
                }
            }
            Command::Patrol(first, second) => {
                if let Some(direction) = behaviors::enemy_in_attack_range(world, entity) {
                    if class != UnitClass::Villager {
                        return Action::attack(direction);
                    }
                }
                let target = if state.patrol_to_second { second } else { first };
                if position.chebyshev(target) <= 1 {
                    state.patrol_to_second = !state.patrol_to_second;
                    Action::NOOP
                } else {
                    Direction::toward(position, target)
                        .map(Action::move_to)
                        .unwrap_or(Action::NOOP)
                }
            }
            Command::Follow(other) | Command::Guard(other) => {
                let keep_distance = if matches!(command, Command::Guard(_)) { 2 } else { 1 };
                if matches!(command, Command::Guard(_)) {
                    if let Some(direction) = behaviors::enemy_in_attack_range(world, entity) {
                        return Action::attack(direction);
                    }
                }
                let Some(target) = world.agent_entity(other).map(|e| e.pos) else {
                    state.command = None;
                    return Action::NOOP;
                };
                if position.chebyshev(target) <= keep_distance {
                    Action::NOOP
                } else {
                    Direction::toward(position, target)
                        .map(Action::move_to)
                        .unwrap_or(Action::NOOP)
                }
            }
            Command::Scout => {
                // Spiral outward by turning every few ticks.
                let spin = (agent as u64 + world.current_step() / 4) % 4;
                Action::move_to(Direction::CARDINAL[spin as usize])
            }
        }
    }
}

/// Role assignment: villagers split between gathering and building, armed
/// classes fight.
fn role_for(class: UnitClass, agent: u16) -> RoleKind {
    match class {
        UnitClass::Villager => {
            if agent % 3 == 2 {
                RoleKind::Builder
            } else {
                RoleKind::Gatherer
            }
        }
        UnitClass::Boat | UnitClass::TradeCog | UnitClass::TransportShip => RoleKind::Scripted,
        _ => RoleKind::Fighter,
    }
}

/// Builds the tier stack for a role. Proposers are stateless, so the tree
/// is cheap to assemble per decision.
fn build_role<'a>(kind: RoleKind) -> Role<DecisionCtx<'a>, Action> {
    use behaviors::*;
    match kind {
        RoleKind::Gatherer => Role::new(vec![
            Tier::fixed(vec![Box::new(DepositLoad)]),
            Tier::shuffle(vec![
                Box::new(GATHER_FOOD),
                Box::new(GATHER_WOOD),
                Box::new(GATHER_GOLD),
                Box::new(GATHER_STONE),
            ]),
            Tier::fixed(vec![Box::new(Explore)]),
        ]),
        RoleKind::Builder => Role::new(vec![
            Tier::fixed(vec![
                Box::new(RepairAdjacent),
                Box::new(BuildHouse),
                Box::new(SeekDamagedBuilding),
            ]),
            Tier::fixed(vec![Box::new(DepositLoad)]),
            Tier::shuffle(vec![Box::new(GATHER_WOOD), Box::new(GATHER_STONE)]),
            Tier::fixed(vec![Box::new(Explore)]),
        ]),
        RoleKind::Fighter => Role::new(vec![
            Tier::shuffle(vec![Box::new(EngageInRange), Box::new(AdvanceOnEnemy)]),
            Tier::fixed(vec![Box::new(Explore)]),
        ]),
        RoleKind::Scripted => Role::new(vec![Tier::fixed(vec![Box::new(Never)])]),
    }
}

/// Placeholder option for scripted agents; always declines.
struct Never;

impl<'a> option_tree::Proposer<DecisionCtx<'a>, Action> for Never {
    fn propose(&self, _ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        None
    }
}

/// Stale-state sweep: agents idle for a long time lose their per-agent
/// decision state. Run during the decay phase.
pub(crate) fn cleanup_stale_agents(world: &mut World) {
    const STALE_THRESHOLD: u64 = 256;
    let step = world.current_step;
    let stale = world.ai.lifecycle.detect_stale(step, STALE_THRESHOLD);
    for agent in stale {
        world.ai.lifecycle.mark_inactive(agent);
    }
    for agent in world.ai.lifecycle.process_cleanup() {
        if let Some(state) = world.ai.per_agent.get_mut(agent as usize) {
            *state = AgentAi::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn villagers_split_roles_by_slot() {
        assert_eq!(role_for(UnitClass::Villager, 0), RoleKind::Gatherer);
        assert_eq!(role_for(UnitClass::Villager, 2), RoleKind::Builder);
        assert_eq!(role_for(UnitClass::Knight, 0), RoleKind::Fighter);
        assert_eq!(role_for(UnitClass::TradeCog, 1), RoleKind::Scripted);
    }

    #[test]
    fn pending_commands_are_bounded() {
        let mut controller = AiController::new(2);
        for _ in 0..SimConfig::MAX_PENDING_COMMANDS + 3 {
            controller.push_command(0, Command::Stop);
        }
        assert_eq!(
            controller.per_agent[0].pending.len(),
            SimConfig::MAX_PENDING_COMMANDS
        );
    }
}
