//! Egocentric observation encoder.
//!
//! Each agent sees a fixed `[LAYERS][11][11]` byte tensor centered on
//! itself: one binary layer per terrain class, one per entity kind, then
//! small-integer attribute layers. Tiles outside the map are all-zero, and
//! dead or garrisoned agents read an all-zero tensor.
//!
//! Rebuilds are incremental: a step phase that touches a tile records it in
//! the dirty-tile scratch, and `ensure_observations` re-encodes only agents
//! whose flag is set or whose window intersects a dirty tile.

use strum::EnumCount;

use crate::config::SimConfig;
use crate::state::{EntityKind, Position, Terrain, World};

/// Layer index right after the terrain one-hot block.
pub const ENTITY_LAYER_BASE: usize = Terrain::COUNT;
/// Scalar attribute layers after the entity one-hot block.
pub const TEAM_LAYER: usize = ENTITY_LAYER_BASE + EntityKind::COUNT;
pub const ORIENTATION_LAYER: usize = TEAM_LAYER + 1;
pub const UNIT_CLASS_LAYER: usize = TEAM_LAYER + 2;
pub const STANCE_LAYER: usize = TEAM_LAYER + 3;
pub const BUILDING_HP_LAYER: usize = TEAM_LAYER + 4;
pub const GARRISON_COUNT_LAYER: usize = TEAM_LAYER + 5;
pub const MONK_FAITH_LAYER: usize = TEAM_LAYER + 6;
/// Total layer count of the observation tensor.
pub const OBS_LAYERS: usize = TEAM_LAYER + 7;

const W: usize = SimConfig::OBS_WINDOW;

/// Flat tensor offset for `[layer][wx][wy]`.
#[inline]
pub fn obs_offset(layer: usize, wx: usize, wy: usize) -> usize {
    layer * W * W + wx * W + wy
}

impl World {
    /// Phase 10: propagate dirty tiles into agent windows, then rebuild
    /// every flagged agent.
    pub(crate) fn ensure_observations(&mut self) {
        let radius = SimConfig::OBS_RADIUS;
        let mut dirty = std::mem::take(&mut self.scratch.dirty_tiles);
        dirty.sort_unstable();
        dirty.dedup();

        for agent in 0..self.agent_count() as u16 {
            if self.agents.is_dirty(agent) {
                continue;
            }
            let Some(center) = self.agent_entity(agent).map(|e| e.pos) else {
                continue;
            };
            if center.is_off_grid() {
                continue;
            }
            let touched = dirty.iter().any(|&tile| {
                (tile.x - center.x).abs() <= radius && (tile.y - center.y).abs() <= radius
            });
            if touched {
                self.agents.mark_dirty(agent);
            }
        }
        self.scratch.dirty_tiles = dirty;

        for agent in 0..self.agent_count() as u16 {
            if self.agents.is_dirty(agent) {
                self.rebuild_observation(agent);
                self.agents.clear_dirty(agent);
            }
        }
    }

    /// Initial full rebuild; `World::new` runs this once.
    pub(crate) fn rebuild_all_observations(&mut self) {
        for agent in 0..self.agent_count() as u16 {
            self.agents.mark_dirty(agent);
            self.rebuild_observation(agent);
            self.agents.clear_dirty(agent);
        }
    }

    fn rebuild_observation(&mut self, agent: u16) {
        // Field-disjoint borrows: the grid/arena are read while the agent
        // tensor is written.
        let center = self
            .agent_entities
            .get(agent as usize)
            .copied()
            .flatten()
            .and_then(|id| self.arena.alive(id))
            .map(|e| e.pos);

        let grid = &self.grid;
        let arena = &self.arena;
        let agents_per_team = self.config.map.agents_per_team;
        let tensor = self.agents.observation_mut(agent);
        tensor.fill(0);

        let Some(center) = center else {
            return; // dead agents observe zeros
        };
        if center.is_off_grid() {
            return; // garrisoned agents observe zeros
        }

        let radius = SimConfig::OBS_RADIUS;
        for wx in 0..W {
            for wy in 0..W {
                let tile = Position::new(
                    center.x + wx as i32 - radius,
                    center.y + wy as i32 - radius,
                );
                if !grid.contains(tile) {
                    continue;
                }

                let terrain = grid.terrain(tile) as usize;
                tensor[obs_offset(terrain, wx, wy)] = 1;

                for id in [grid.primary(tile), grid.background(tile)]
                    .into_iter()
                    .flatten()
                {
                    let Some(entity) = arena.get(id).filter(|e| e.alive) else {
                        continue;
                    };
                    tensor[obs_offset(ENTITY_LAYER_BASE + entity.kind as usize, wx, wy)] = 1;

                    if let Some(team) = entity.effective_team(agents_per_team) {
                        tensor[obs_offset(TEAM_LAYER, wx, wy)] = team + 1;
                    }
                    if let Some(unit) = entity.unit() {
                        tensor[obs_offset(ORIENTATION_LAYER, wx, wy)] =
                            entity.orientation as u8 + 1;
                        tensor[obs_offset(UNIT_CLASS_LAYER, wx, wy)] = unit.class as u8 + 1;
                        tensor[obs_offset(STANCE_LAYER, wx, wy)] = unit.stance as u8 + 1;
                        if unit.faith > 0 {
                            let faith = (unit.faith as u32 * 255
                                / SimConfig::MONK_MAX_FAITH as u32)
                                .min(255) as u8;
                            tensor[obs_offset(MONK_FAITH_LAYER, wx, wy)] = faith;
                        }
                    }
                    if entity.kind.is_building() {
                        let hp = (entity.hp as u32 * 255 / entity.max_hp.max(1) as u32)
                            .min(255) as u8;
                        tensor[obs_offset(BUILDING_HP_LAYER, wx, wy)] = hp;
                        if let Some(building) = entity.building() {
                            tensor[obs_offset(GARRISON_COUNT_LAYER, wx, wy)] =
                                building.garrisoned_units.len().min(255) as u8;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::FnInitializer;
    use crate::state::UnitClass;

    fn setup() -> World {
        World::new(
            SimConfig::default(),
            42,
            &FnInitializer(|_: &mut World| Ok(())),
        )
        .unwrap()
    }

    #[test]
    fn layer_geometry_is_consistent() {
        assert_eq!(
            crate::state::OBS_SIZE,
            OBS_LAYERS * SimConfig::OBS_WINDOW * SimConfig::OBS_WINDOW
        );
    }

    #[test]
    fn agent_sees_itself_at_center() {
        let mut world = setup();
        world
            .spawn_agent(0, UnitClass::Monk, Position::new(20, 20))
            .unwrap();
        world.ensure_observations();

        let obs = world.observation(0);
        let center = SimConfig::OBS_RADIUS as usize;
        assert_eq!(
            obs[obs_offset(ENTITY_LAYER_BASE + EntityKind::Agent as usize, center, center)],
            1
        );
        assert_eq!(obs[obs_offset(TEAM_LAYER, center, center)], 1);
        assert_eq!(
            obs[obs_offset(UNIT_CLASS_LAYER, center, center)],
            UnitClass::Monk as u8 + 1
        );
        // Full faith reads 255.
        assert_eq!(obs[obs_offset(MONK_FAITH_LAYER, center, center)], 255);
    }

    #[test]
    fn terrain_one_hot_is_exclusive_in_bounds() {
        let mut world = setup();
        world
            .spawn_agent(0, UnitClass::Villager, Position::new(20, 20))
            .unwrap();
        world.set_terrain(Position::new(21, 20), Terrain::Mud);
        world.ensure_observations();

        let obs = world.observation(0);
        let center = SimConfig::OBS_RADIUS as usize;
        let set_layers: Vec<usize> = (0..Terrain::COUNT)
            .filter(|&layer| obs[obs_offset(layer, center + 1, center)] == 1)
            .collect();
        assert_eq!(set_layers, vec![Terrain::Mud as usize]);
    }

    #[test]
    fn off_map_tiles_are_zero() {
        let mut world = setup();
        // Near the corner so most of the window hangs off the map.
        world
            .spawn_agent(0, UnitClass::Villager, Position::new(0, 0))
            .unwrap();
        world.ensure_observations();

        let obs = world.observation(0);
        for layer in 0..OBS_LAYERS {
            assert_eq!(obs[obs_offset(layer, 0, 0)], 0);
        }
    }

    #[test]
    fn dead_agents_observe_zeros() {
        let mut world = setup();
        let id = world
            .spawn_agent(0, UnitClass::Villager, Position::new(20, 20))
            .unwrap();
        world.ensure_observations();
        assert!(world.observation(0).iter().any(|&b| b != 0));

        crate::combat::handle_death(&mut world, id);
        world.ensure_observations();
        assert!(world.observation(0).iter().all(|&b| b == 0));
    }

    #[test]
    fn clean_agents_skip_rebuild_until_window_touched() {
        let mut world = setup();
        world
            .spawn_agent(0, UnitClass::Villager, Position::new(20, 20))
            .unwrap();
        world.ensure_observations();
        assert!(!world.agents.is_dirty(0));
        world.scratch.dirty_tiles.clear();

        // A change far outside the window leaves the agent clean.
        world.set_terrain(Position::new(50, 50), Terrain::Snow);
        let radius = SimConfig::OBS_RADIUS;
        let center = Position::new(20, 20);
        let touched = world
            .scratch
            .dirty_tiles
            .iter()
            .any(|t| (t.x - center.x).abs() <= radius && (t.y - center.y).abs() <= radius);
        assert!(!touched);
    }
}
