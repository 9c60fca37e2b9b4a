//! Entity arena and spatial index.
//!
//! Entities live in a flat pool addressed by [`EntityId`]; the grid and all
//! caches store ids, never references, which keeps the world cheaply
//! cloneable and avoids ownership cycles between buildings, garrisoned
//! units, and tiles. Destroyed entities are marked dead in place, and slots are
//! never reused within an episode, so iteration order is stable across a
//! whole step.

use strum::EnumCount;

use super::common::EntityId;
use super::entity::{Entity, EntityKind};
use crate::config::SimConfig;
use crate::error::StateError;

/// Per-kind and per-team id lists kept in sync with the arena, so proximity
/// queries never scan the full pool.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialIndex {
    by_kind: Vec<Vec<EntityId>>,
    by_team: Vec<Vec<EntityId>>,
}

impl SpatialIndex {
    pub fn new(teams: u8) -> Self {
        Self {
            by_kind: vec![Vec::new(); EntityKind::COUNT],
            by_team: vec![Vec::new(); teams as usize],
        }
    }

    pub fn insert(&mut self, id: EntityId, kind: EntityKind, team: Option<u8>) {
        self.by_kind[kind as usize].push(id);
        if let Some(team) = team {
            self.by_team[team as usize].push(id);
        }
    }

    pub fn remove(&mut self, id: EntityId, kind: EntityKind, team: Option<u8>) {
        if let Some(pos) = self.by_kind[kind as usize].iter().position(|&e| e == id) {
            self.by_kind[kind as usize].swap_remove(pos);
        }
        if let Some(team) = team {
            if let Some(pos) = self.by_team[team as usize].iter().position(|&e| e == id) {
                self.by_team[team as usize].swap_remove(pos);
            }
        }
    }

    /// Moves `id` between team lists after a conversion.
    pub fn reassign_team(&mut self, id: EntityId, from: Option<u8>, to: Option<u8>) {
        if from == to {
            return;
        }
        if let Some(from) = from {
            if let Some(pos) = self.by_team[from as usize].iter().position(|&e| e == id) {
                self.by_team[from as usize].swap_remove(pos);
            }
        }
        if let Some(to) = to {
            self.by_team[to as usize].push(id);
        }
    }

    pub fn of_kind(&self, kind: EntityKind) -> &[EntityId] {
        &self.by_kind[kind as usize]
    }

    pub fn of_team(&self, team: u8) -> &[EntityId] {
        &self.by_team[team as usize]
    }
}

/// Flat entity pool with monotonic id allocation.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Arena {
    slots: Vec<Entity>,
}

impl Arena {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Allocates a slot for `entity`, patching its `id` to the new handle.
    pub fn alloc(&mut self, mut entity: Entity) -> Result<EntityId, StateError> {
        if self.slots.len() >= SimConfig::MAX_ENTITIES {
            return Err(StateError::ArenaFull);
        }
        let id = EntityId(self.slots.len() as u32);
        entity.id = id;
        self.slots.push(entity);
        Ok(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id.index())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(id.index())
    }

    /// Alive entity or `None`; most phase code wants this form.
    pub fn alive(&self, id: EntityId) -> Option<&Entity> {
        self.get(id).filter(|e| e.alive)
    }

    pub fn alive_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.get_mut(id).filter(|e| e.alive)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter()
    }

    pub fn iter_alive(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter(|e| e.alive)
    }

    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots.iter_mut()
    }

    /// Disjoint mutable access to two entities, e.g. attacker and defender.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`; the caller must never alias.
    pub fn pair_mut(&mut self, a: EntityId, b: EntityId) -> (&mut Entity, &mut Entity) {
        assert_ne!(a, b, "pair_mut requires distinct entities");
        let (low, high) = if a.index() < b.index() { (a, b) } else { (b, a) };
        let (left, right) = self.slots.split_at_mut(high.index());
        let low_ref = &mut left[low.index()];
        let high_ref = &mut right[0];
        if a.index() < b.index() {
            (low_ref, high_ref)
        } else {
            (high_ref, low_ref)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::entity::{DropData, EntityData};
    use crate::state::{Direction, Position};

    fn blank(kind: EntityKind) -> Entity {
        Entity {
            id: EntityId(0),
            kind,
            pos: Position::OFF_GRID,
            orientation: Direction::North,
            team: None,
            hp: 1,
            max_hp: 1,
            attack: 0,
            cooldown: 0,
            alive: true,
            data: EntityData::Drop(DropData::default()),
        }
    }

    #[test]
    fn alloc_assigns_sequential_ids() {
        let mut arena = Arena::new();
        let a = arena.alloc(blank(EntityKind::Relic)).unwrap();
        let b = arena.alloc(blank(EntityKind::Relic)).unwrap();
        assert_eq!(a, EntityId(0));
        assert_eq!(b, EntityId(1));
        assert_eq!(arena.get(b).unwrap().id, b);
    }

    #[test]
    fn dead_entities_filtered_by_alive() {
        let mut arena = Arena::new();
        let id = arena.alloc(blank(EntityKind::Relic)).unwrap();
        arena.get_mut(id).unwrap().alive = false;
        assert!(arena.get(id).is_some());
        assert!(arena.alive(id).is_none());
    }

    #[test]
    fn pair_mut_returns_in_argument_order() {
        let mut arena = Arena::new();
        let a = arena.alloc(blank(EntityKind::Relic)).unwrap();
        let b = arena.alloc(blank(EntityKind::Lantern)).unwrap();
        let (eb, ea) = arena.pair_mut(b, a);
        assert_eq!(eb.kind, EntityKind::Lantern);
        assert_eq!(ea.kind, EntityKind::Relic);
    }

    #[test]
    fn index_tracks_kind_and_team() {
        let mut index = SpatialIndex::new(2);
        index.insert(EntityId(3), EntityKind::Tree, None);
        index.insert(EntityId(4), EntityKind::Agent, Some(1));
        assert_eq!(index.of_kind(EntityKind::Tree), &[EntityId(3)]);
        assert_eq!(index.of_team(1), &[EntityId(4)]);

        index.reassign_team(EntityId(4), Some(1), Some(0));
        assert!(index.of_team(1).is_empty());
        assert_eq!(index.of_team(0), &[EntityId(4)]);

        index.remove(EntityId(4), EntityKind::Agent, Some(0));
        assert!(index.of_team(0).is_empty());
    }
}
