//! Replay determinism: identical inputs produce bit-identical trajectories.

use tilewar_core::{Action, Direction, SimConfig, SkirmishMap, World};

fn scripted_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.ai_controlled_teams = 0b10;
    config
}

/// A fixed pseudo-action script for the RL-driven team: enough verb variety
/// to touch movement, gathering, and combat dispatch.
fn scripted_action(agent: u16, step: u64) -> Action {
    match (agent as u64 + step) % 5 {
        0 => Action::move_to(Direction::East),
        1 => Action::move_to(Direction::South),
        2 => Action::use_dir(Direction::North),
        3 => Action::attack(Direction::West),
        _ => Action::NOOP,
    }
}

#[test]
fn identical_runs_are_bit_identical() {
    let initializer = SkirmishMap::default();
    let mut a = World::new(scripted_config(), 1234, &initializer).unwrap();
    let mut b = World::new(scripted_config(), 1234, &initializer).unwrap();

    for step in 0..120u64 {
        let actions: Vec<u8> = (0..a.agent_count() as u16)
            .map(|agent| scripted_action(agent, step).encode())
            .collect();
        a.step(&actions);
        b.step(&actions);

        for agent in 0..a.agent_count() as u16 {
            assert_eq!(
                a.observation(agent),
                b.observation(agent),
                "observation divergence at step {step}, agent {agent}"
            );
            assert_eq!(a.reward(agent), b.reward(agent));
            assert_eq!(a.terminated(agent), b.terminated(agent));
            assert_eq!(a.truncated(agent), b.truncated(agent));
        }
    }
}

#[test]
fn different_seeds_diverge() {
    let initializer = SkirmishMap::default();
    let mut a = World::new(scripted_config(), 1, &initializer).unwrap();
    let mut b = World::new(scripted_config(), 2, &initializer).unwrap();

    let actions = vec![Action::NOOP.encode(); a.agent_count()];
    let mut diverged = false;
    for _ in 0..60 {
        a.step(&actions);
        b.step(&actions);
        if (0..a.agent_count() as u16)
            .any(|agent| a.observation(agent) != b.observation(agent))
        {
            diverged = true;
            break;
        }
    }
    // The AI team's shuffled decisions depend on the seed.
    assert!(diverged, "seeds 1 and 2 produced identical trajectories");
}

#[cfg(feature = "serde")]
#[test]
fn state_roots_match_along_the_trajectory() {
    let initializer = SkirmishMap::default();
    let mut a = World::new(scripted_config(), 99, &initializer).unwrap();
    let mut b = World::new(scripted_config(), 99, &initializer).unwrap();
    assert_eq!(hex::encode(a.state_root()), hex::encode(b.state_root()));

    for step in 0..60u64 {
        let actions: Vec<u8> = (0..a.agent_count() as u16)
            .map(|agent| scripted_action(agent, step).encode())
            .collect();
        a.step(&actions);
        b.step(&actions);
        assert_eq!(
            hex::encode(a.state_root()),
            hex::encode(b.state_root()),
            "state root divergence at step {step}"
        );
    }
}
