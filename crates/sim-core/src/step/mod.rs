//! The per-tick step pipeline.
//!
//! [`World::step`] is the only mutation entry point. The phase order below
//! is the contract; reordering phases changes observable behavior:
//!
//!  1. clear per-tick scratch
//!  2. recompute per-team population caps, counts, damaged-building lists
//!  3. drain deferred commands buffered since the previous tick
//!  4. re-shuffle the persistent agent order, then let the scripted
//!     controller fill AI-controlled action slots
//!  5. dispatch one action per agent in shuffled order; effects are visible
//!     to later agents in the same tick
//!  6. building autonomics: production ticks, tower volleys, monastery
//!     relic gold, trade settlements, building cooldowns
//!  7. wildlife
//!  8. decay: price regression, unit cooldowns, frozen, faith, scatter,
//!     death tint, stale AI state
//!  9. victory and termination
//! 10. observation rebuild for dirty agents
//! 11. advance the step counter

pub(crate) mod dispatch;

use crate::action::Action;
use crate::ai::Command;
use crate::config::SimConfig;
use crate::state::{EntityId, EntityKind, Resource, World};
use crate::{combat, economy, production, victory, wildlife};

impl World {
    /// Advances the world by exactly one tick.
    ///
    /// `actions` carries one encoded byte per agent slot; the caller pads
    /// dead or missing agents with Noop. Slots belonging to AI-controlled
    /// teams are overwritten by the scripted controller.
    ///
    /// # Panics
    ///
    /// Panics if `actions.len()` differs from [`World::agent_count`]; a
    /// malformed buffer is an integration bug, not a game event.
    pub fn step(&mut self, actions: &[u8]) {
        assert_eq!(
            actions.len(),
            self.agent_count(),
            "action buffer must carry one byte per agent slot"
        );

        // Phase 1: per-tick scratch.
        self.agents.clear_rewards();
        self.scratch.dirty_tiles.clear();

        // Phase 2: per-team aggregates.
        for team in 0..self.teams.len() as u8 {
            let cap = self.compute_pop_cap(team);
            let count = self.compute_pop_count(team);
            let damaged: Vec<EntityId> = self
                .index
                .of_team(team)
                .iter()
                .filter_map(|&id| self.arena.alive(id))
                .filter(|e| e.kind.is_building() && e.hp < e.max_hp)
                .map(|e| e.id)
                .collect();
            let scratch = &mut self.scratch;
            scratch.pop_cap[team as usize] = cap;
            scratch.pop_count[team as usize] = count;
            scratch.damaged_buildings[team as usize] = damaged;
        }

        // Phases 3-4: deferred commands, then the shuffled agent order and
        // AI decisions. The controller is taken out of the world so it can
        // borrow the world freely.
        let mut ai = std::mem::take(&mut self.ai);
        ai.drain_pending(self);

        let mut order = std::mem::take(&mut self.agent_order);
        self.rng.shuffle(&mut order);
        self.agent_order = order;

        let mut buffer: Vec<u8> = actions.to_vec();
        ai.decide_all(self, &mut buffer);
        self.ai = ai;

        // Phase 5: agent actions in shuffled order.
        let order = self.agent_order.clone();
        for &agent in &order {
            if self.agents.is_terminated(agent) {
                continue;
            }
            let action = Action::decode(buffer[agent as usize]);
            dispatch::dispatch_action(self, agent, action);
        }

        // Phase 6: building autonomics.
        self.building_phase();

        // Phase 7: wildlife.
        wildlife::wildlife_phase(self);

        // Phase 8: decay.
        self.decay_phase();

        // Phase 9: victory & termination.
        victory::check_victory(self);

        // Phase 10: observations.
        self.ensure_observations();

        // Phase 11: tick the clock.
        self.current_step += 1;
    }

    /// Buffers a user command; applied atomically at the start of the next
    /// step (phase 3).
    pub fn issue_command(&mut self, agent: u16, command: Command) {
        self.ai.push_command(agent, command);
    }

    fn building_phase(&mut self) {
        production::queue::tick_production(self);

        // Tower volleys in id order.
        let mut towers: Vec<EntityId> = self
            .index
            .of_kind(EntityKind::GuardTower)
            .iter()
            .chain(self.index.of_kind(EntityKind::Castle).iter())
            .copied()
            .collect();
        towers.sort_unstable();
        for tower in towers {
            combat::tower_volley(self, tower);
        }

        // Monastery gold from stored relics.
        if self
            .current_step
            .is_multiple_of(SimConfig::RELIC_GOLD_INTERVAL)
        {
            let payouts: Vec<(u8, u32)> = self
                .index
                .of_kind(EntityKind::Monastery)
                .iter()
                .filter_map(|&id| self.arena.alive(id))
                .filter_map(|e| {
                    let relics = e.building()?.garrisoned_relics;
                    (relics > 0).then(|| (e.team, relics as u32))
                })
                .filter_map(|(team, relics)| team.map(|t| (t, relics)))
                .collect();
            for (team, relics) in payouts {
                self.teams[team as usize].credit(Resource::Gold, relics);
            }
        }

        economy::trade::settle_trade_routes(self);

        // Building cooldowns tick down here, after any new volley set them.
        for entity in self.arena.slots_mut() {
            if !entity.alive {
                continue;
            }
            if let Some(building) = entity.building_mut() {
                building.fire_cooldown = building.fire_cooldown.saturating_sub(1);
                building.market_cooldown = building.market_cooldown.saturating_sub(1);
                building.research_cooldown = building.research_cooldown.saturating_sub(1);
            }
        }
    }

    fn decay_phase(&mut self) {
        // Market prices drift toward base on a slow clock.
        if self
            .current_step
            .is_multiple_of(SimConfig::PRICE_DECAY_INTERVAL)
        {
            for team in &mut self.teams {
                team.decay_prices();
            }
        }

        for entity in self.arena.slots_mut() {
            if !entity.alive {
                continue;
            }
            entity.cooldown = entity.cooldown.saturating_sub(1);
            if let Some(unit) = entity.unit_mut() {
                unit.frozen = unit.frozen.saturating_sub(1);
                if unit.class == crate::state::UnitClass::Monk {
                    unit.faith = (unit.faith + SimConfig::MONK_FAITH_RECHARGE_RATE)
                        .min(SimConfig::MONK_MAX_FAITH);
                }
            }
        }

        wildlife::decay_scatter(self);
        self.grid.decay_death_tint();
        crate::ai::cleanup_stale_agents(self);
    }
}
