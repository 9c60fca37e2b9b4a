//! Atomic option proposers for the scripted controller.
//!
//! Each behavior inspects the world through a [`DecisionCtx`] and either
//! proposes one encoded action or declines. The tier stacks that arrange
//! them into roles live in the parent module.

use option_tree::Proposer;

use super::AiCaches;
use crate::action::Action;
use crate::state::{
    CarryItem, Direction, EntityId, EntityKind, Position, Resource, UnitClass, World,
};
use crate::tables;

/// Mutable decision scratch handed to proposers.
pub(crate) struct DecisionCtx<'a> {
    pub world: &'a World,
    pub agent: u16,
    pub entity: EntityId,
    pub position: Position,
    pub team: u8,
    pub class: UnitClass,
    pub caches: &'a mut AiCaches,
}

// ===== shared queries =====

/// Nearest alive node of any listed kind, by Manhattan distance.
pub(crate) fn nearest_node(
    world: &World,
    kinds: &[EntityKind],
    from: Position,
) -> Option<Position> {
    kinds
        .iter()
        .flat_map(|&kind| world.index.of_kind(kind).iter().copied())
        .filter_map(|id| world.arena.alive(id))
        .filter(|e| !e.pos.is_off_grid())
        .min_by_key(|e| (from.manhattan(e.pos), e.id))
        .map(|e| e.pos)
}

/// First direction whose ray hits an enemy within the unit's attack range.
pub(crate) fn enemy_in_attack_range(world: &World, shooter: EntityId) -> Option<Direction> {
    let entity = world.arena.alive(shooter)?;
    let team = world.effective_team_of(entity)?;
    let range = entity
        .unit_class()
        .map(|c| tables::unit_stats(c).range)
        .unwrap_or(1);
    let origin = entity.pos;
    for direction in Direction::ALL {
        let (dx, dy) = direction.delta();
        for step in 1..=range {
            let tile = origin.offset(dx * step, dy * step);
            let Some(id) = world.grid.primary(tile) else {
                continue;
            };
            let Some(target) = world.arena.alive(id) else {
                break;
            };
            match world.effective_team_of(target) {
                Some(other) if !world.are_allied(team, other) => return Some(direction),
                Some(_) => break,
                // Neutral blockers end the ray without offering a target.
                None => break,
            }
        }
    }
    None
}

/// Direction of an adjacent entity satisfying `pred`.
pub(crate) fn adjacent_matching(
    world: &World,
    from: Position,
    pred: impl Fn(&crate::state::Entity) -> bool,
) -> Option<Direction> {
    Direction::ALL.into_iter().find(|&direction| {
        let tile = from.step(direction);
        [world.grid.primary(tile), world.grid.background(tile)]
            .into_iter()
            .flatten()
            .filter_map(|id| world.arena.alive(id))
            .any(&pred)
    })
}

/// Nearest enemy agent or building position.
pub(crate) fn nearest_enemy_position(world: &World, team: u8, from: Position) -> Option<Position> {
    world
        .arena
        .iter_alive()
        .filter(|e| !e.pos.is_off_grid())
        .filter(|e| {
            world
                .effective_team_of(e)
                .is_some_and(|t| !world.are_allied(team, t))
        })
        .min_by_key(|e| (from.manhattan(e.pos), e.id))
        .map(|e| e.pos)
}

fn total_carried(world: &World, entity: EntityId) -> u16 {
    world
        .arena
        .alive(entity)
        .and_then(|e| e.unit())
        .map(|u| u.inventory.iter().map(|(_, count)| count).sum())
        .unwrap_or(0)
}

// ===== gatherer options =====

/// Walk a full load back to a matching dropoff and unload it.
pub(crate) struct DepositLoad;

impl<'a> Proposer<DecisionCtx<'a>, Action> for DepositLoad {
    fn propose(&self, ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        let capacity = ctx.world.team(ctx.team).carry_capacity();
        if total_carried(ctx.world, ctx.entity) < capacity {
            return None;
        }
        let carried: Vec<CarryItem> = ctx
            .world
            .arena
            .alive(ctx.entity)?
            .unit()?
            .inventory
            .iter()
            .map(|(item, _)| item)
            .collect();
        let accepts = |e: &crate::state::Entity| {
            e.team == Some(ctx.team)
                && carried
                    .iter()
                    .any(|&item| tables::dropoff_accepts(e.kind, item).is_some())
        };
        if let Some(direction) = adjacent_matching(ctx.world, ctx.position, &accepts) {
            return Some(Action::use_dir(direction));
        }
        let target = ctx
            .world
            .index
            .of_team(ctx.team)
            .iter()
            .filter_map(|&id| ctx.world.arena.alive(id))
            .filter(|e| accepts(e))
            .min_by_key(|e| (ctx.position.manhattan(e.pos), e.id))
            .map(|e| e.pos)?;
        Direction::toward(ctx.position, target).map(Action::move_to)
    }
}

/// Gather one resource line: use the node when adjacent, walk to it
/// otherwise. Fitness scales with the team's stockpile deficit.
pub(crate) struct GatherLine {
    pub kinds: &'static [EntityKind],
    pub resource: Resource,
}

pub(crate) const GATHER_WOOD: GatherLine = GatherLine {
    kinds: &[EntityKind::Tree],
    resource: Resource::Wood,
};
pub(crate) const GATHER_FOOD: GatherLine = GatherLine {
    kinds: &[EntityKind::WheatField, EntityKind::Corpse, EntityKind::Fish],
    resource: Resource::Food,
};
pub(crate) const GATHER_GOLD: GatherLine = GatherLine {
    kinds: &[EntityKind::GoldMine],
    resource: Resource::Gold,
};
pub(crate) const GATHER_STONE: GatherLine = GatherLine {
    kinds: &[EntityKind::StoneMine],
    resource: Resource::Stone,
};

impl GatherLine {
    fn cached_target(&self, ctx: &mut DecisionCtx<'_>) -> Option<Position> {
        let world = ctx.world;
        let position = ctx.position;
        let kinds = self.kinds;
        let cache = match self.resource {
            Resource::Wood => &mut ctx.caches.closest_wood,
            Resource::Food => &mut ctx.caches.closest_food,
            Resource::Gold => &mut ctx.caches.closest_gold,
            Resource::Stone => &mut ctx.caches.closest_stone,
        };
        *cache.get(ctx.agent, || nearest_node(world, kinds, position))
    }
}

impl<'a> Proposer<DecisionCtx<'a>, Action> for GatherLine {
    fn propose(&self, ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        let target = self.cached_target(ctx)?;
        if ctx.position.chebyshev(target) <= 1 {
            return Direction::toward(ctx.position, target)
                .or(Some(Direction::North))
                .map(Action::use_dir);
        }
        Direction::toward(ctx.position, target).map(Action::move_to)
    }

    fn fitness(&self, ctx: &DecisionCtx<'a>) -> u32 {
        let stock = ctx.world.team(ctx.team).stockpile(self.resource);
        50u32.saturating_sub(stock) + 1
    }
}

// ===== builder options =====

/// Put up a house when the team is within two pops of its cap.
pub(crate) struct BuildHouse;

impl<'a> Proposer<DecisionCtx<'a>, Action> for BuildHouse {
    fn propose(&self, ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        let team = ctx.team;
        let cap = ctx
            .world
            .scratch
            .pop_cap
            .get(team as usize)
            .copied()
            .unwrap_or(0);
        let count = ctx
            .world
            .scratch
            .pop_count
            .get(team as usize)
            .copied()
            .unwrap_or(0);
        if count + 2 < cap {
            return None;
        }
        let cost = tables::building_stats(EntityKind::House).cost;
        if !ctx.world.team(team).can_afford(cost) {
            return None;
        }
        let index = tables::BUILD_INDEX
            .iter()
            .position(|&k| k == EntityKind::House)? as u8;
        Some(Action::build(index))
    }
}

/// Keep working on (or repairing) an adjacent friendly construction site.
pub(crate) struct RepairAdjacent;

impl<'a> Proposer<DecisionCtx<'a>, Action> for RepairAdjacent {
    fn propose(&self, ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        let team = ctx.team;
        adjacent_matching(ctx.world, ctx.position, |e| {
            e.kind.is_building() && e.team == Some(team) && e.hp < e.max_hp
        })
        .map(Action::use_dir)
    }
}

/// Walk to the team's most damaged building (phase-2 scratch list).
pub(crate) struct SeekDamagedBuilding;

impl<'a> Proposer<DecisionCtx<'a>, Action> for SeekDamagedBuilding {
    fn propose(&self, ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        let damaged = ctx.world.scratch.damaged_buildings.get(ctx.team as usize)?;
        let target = damaged
            .iter()
            .filter_map(|&id| ctx.world.arena.alive(id))
            .min_by_key(|e| (ctx.position.manhattan(e.pos), e.id))
            .map(|e| e.pos)?;
        Direction::toward(ctx.position, target).map(Action::move_to)
    }
}

// ===== fighter options =====

/// Fire on the first enemy already in range.
pub(crate) struct EngageInRange;

impl<'a> Proposer<DecisionCtx<'a>, Action> for EngageInRange {
    fn propose(&self, ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        if ctx.class == UnitClass::Villager {
            return None;
        }
        enemy_in_attack_range(ctx.world, ctx.entity).map(Action::attack)
    }

    fn fitness(&self, _ctx: &DecisionCtx<'a>) -> u32 {
        8
    }
}

/// Close the distance to the nearest enemy.
pub(crate) struct AdvanceOnEnemy;

impl<'a> Proposer<DecisionCtx<'a>, Action> for AdvanceOnEnemy {
    fn propose(&self, ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        let target = nearest_enemy_position(ctx.world, ctx.team, ctx.position)?;
        Direction::toward(ctx.position, target).map(Action::move_to)
    }

    fn fitness(&self, _ctx: &DecisionCtx<'a>) -> u32 {
        4
    }
}

/// Deterministic drift for agents with nothing better to do: heading is a
/// function of agent id and tick, so exploration needs no RNG draw.
pub(crate) struct Explore;

impl<'a> Proposer<DecisionCtx<'a>, Action> for Explore {
    fn propose(&self, ctx: &mut DecisionCtx<'a>) -> Option<Action> {
        let spin = (ctx.agent as u64 + ctx.world.current_step() / 8) % 4;
        Some(Action::move_to(Direction::CARDINAL[spin as usize]))
    }

    fn fitness(&self, _ctx: &DecisionCtx<'a>) -> u32 {
        1
    }
}
