//! Victory conditions and episode termination.

use crate::config::{SimConfig, VictoryCondition};
use crate::state::{EntityKind, World};

/// Phase 9: maintain countdown bookkeeping, then evaluate the configured
/// victory condition and `max_steps` truncation.
pub(crate) fn check_victory(world: &mut World) {
    if world.should_reset {
        return;
    }

    update_wonder_tracking(world);
    update_relic_tracking(world);

    let condition = world.config.victory_condition;
    let mut winners: u8 = 0;

    if matches!(condition, VictoryCondition::Conquest | VictoryCondition::All) {
        winners |= conquest_winners(world);
    }
    if matches!(condition, VictoryCondition::Wonder | VictoryCondition::All) {
        winners |= countdown_winners(world, |team| team.wonder_built_step, SimConfig::WONDER_VICTORY_COUNTDOWN);
    }
    if matches!(condition, VictoryCondition::Relic | VictoryCondition::All) {
        winners |= countdown_winners(world, |team| team.relic_hold_start, SimConfig::RELIC_VICTORY_COUNTDOWN);
    }

    if winners != 0 {
        declare_victory(world, winners);
        return;
    }

    // Timeout truncates everyone without declaring a winner.
    if world.current_step + 1 >= world.config.max_steps {
        world.should_reset = true;
        for agent in 0..world.agent_count() as u16 {
            if !world.agents.is_terminated(agent) {
                world.agents.set_truncated(agent, true);
            }
        }
        tracing::debug!(step = world.current_step, "episode truncated at max_steps");
    }
}

/// A standing wonder starts (or continues) its countdown; losing it resets
/// the clock, and any future construction starts over.
fn update_wonder_tracking(world: &mut World) {
    let step = world.current_step as i64;
    for team in 0..world.teams.len() as u8 {
        let has_wonder = world
            .index
            .of_kind(EntityKind::Wonder)
            .iter()
            .filter_map(|&id| world.arena.alive(id))
            .any(|e| e.team == Some(team));
        let state = &mut world.teams[team as usize];
        if has_wonder {
            if state.wonder_built_step < 0 {
                state.wonder_built_step = step;
            }
        } else {
            state.wonder_built_step = -1;
        }
    }
}

/// A team holds the relic countdown while its monasteries jointly store
/// every relic on the map.
fn update_relic_tracking(world: &mut World) {
    let total = world.total_relics;
    let step = world.current_step as i64;
    for team in 0..world.teams.len() as u8 {
        let held: u16 = world
            .index
            .of_kind(EntityKind::Monastery)
            .iter()
            .filter_map(|&id| world.arena.alive(id))
            .filter(|e| e.team == Some(team))
            .filter_map(|e| e.building())
            .map(|b| b.garrisoned_relics as u16)
            .sum();
        let state = &mut world.teams[team as usize];
        if total > 0 && held >= total {
            if state.relic_hold_start < 0 {
                state.relic_hold_start = step;
            }
        } else {
            state.relic_hold_start = -1;
        }
    }
}

/// Conquest: the surviving teams win when every remaining pair is allied.
fn conquest_winners(world: &World) -> u8 {
    let mut alive_mask: u8 = 0;
    for agent in 0..world.agent_count() as u16 {
        if let Some(team) = world
            .agent_entity(agent)
            .and_then(|e| world.effective_team_of(e))
        {
            alive_mask |= 1 << team;
        }
    }
    if alive_mask == 0 {
        return 0;
    }
    let teams: Vec<u8> = (0..world.teams.len() as u8)
        .filter(|&t| alive_mask & (1 << t) != 0)
        .collect();
    let all_allied = teams
        .iter()
        .all(|&a| teams.iter().all(|&b| world.are_allied(a, b)));
    if all_allied { alive_mask } else { 0 }
}

fn countdown_winners(
    world: &World,
    start: impl Fn(&crate::state::TeamState) -> i64,
    countdown: u64,
) -> u8 {
    let step = world.current_step as i64;
    let mut winners = 0u8;
    for team in 0..world.teams.len() as u8 {
        let begun = start(&world.teams[team as usize]);
        if begun >= 0 && step - begun >= countdown as i64 {
            winners |= world.teams[team as usize].alliances;
        }
    }
    winners
}

/// Sets the episode flags and pays the victory reward to every alive agent
/// on a winning team. Winners are truncated, not terminated.
fn declare_victory(world: &mut World, winners: u8) {
    world.victory_winners = winners;
    world.victory_winner = (0..world.teams.len() as u8).find(|&t| winners & (1 << t) != 0);
    world.should_reset = true;

    for agent in 0..world.agent_count() as u16 {
        let Some(team) = world
            .agent_entity(agent)
            .and_then(|e| world.effective_team_of(e))
        else {
            continue;
        };
        if winners & (1 << team) != 0 {
            let reward = world.config.rewards.victory;
            world.agents.add_reward(agent, reward);
            world.agents.set_truncated(agent, true);
        }
    }
    tracing::debug!(
        winners,
        winner = world.victory_winner,
        step = world.current_step,
        "victory declared"
    );
}
