//! Fixed-size grid layers.
//!
//! The grid stores entity *ids*, never references; the arena owns the
//! entities. Layers are flat row-major vectors sized once at world creation.

use strum::EnumCount;

use super::common::{Direction, EntityId, Position};

/// Terrain classes. The discriminant indexes the terrain one-hot observation
/// layers, so the order is part of the external contract.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::EnumCount, strum::EnumIter,
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Terrain {
    #[default]
    Empty = 0,
    Grass,
    Sand,
    Snow,
    Mud,
    Dune,
    Water,
    ShallowWater,
    Road,
    Stubble,
    Fertile,
    RampUpN,
    RampUpS,
    RampUpW,
    RampUpE,
    RampDownN,
    RampDownS,
    RampDownW,
    RampDownE,
}

impl Terrain {
    pub fn is_water(self) -> bool {
        matches!(self, Terrain::Water | Terrain::ShallowWater)
    }

    /// Movement speed in tenths for land classes; 10 = full speed.
    pub fn speed_tenths(self) -> u16 {
        match self {
            Terrain::Mud => 7,
            Terrain::Snow => 8,
            Terrain::Sand | Terrain::Dune => 9,
            Terrain::ShallowWater => 8,
            _ => 10,
        }
    }

    /// A ramp tile permits an uphill step in exactly one direction.
    pub fn ramp_direction(self) -> Option<Direction> {
        match self {
            Terrain::RampUpN | Terrain::RampDownN => Some(Direction::North),
            Terrain::RampUpS | Terrain::RampDownS => Some(Direction::South),
            Terrain::RampUpW | Terrain::RampDownW => Some(Direction::West),
            Terrain::RampUpE | Terrain::RampDownE => Some(Direction::East),
            _ => None,
        }
    }
}

/// All per-tile layers of one world.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    width: u32,
    height: u32,
    /// Blocking foreground occupant per tile.
    primary: Vec<Option<EntityId>>,
    /// Non-blocking tile entity per tile (corpse, relic, farm field, dock…).
    background: Vec<Option<EntityId>>,
    terrain: Vec<Terrain>,
    /// Small signed height level (0, 1, 2).
    elevation: Vec<i8>,
    /// Categorical display label; carried for observation stability.
    biome: Vec<u8>,
    /// Remaining ticks of death tint per tile.
    death_tint: Vec<u16>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            primary: vec![None; len],
            background: vec![None; len],
            terrain: vec![Terrain::Grass; len],
            elevation: vec![0; len],
            biome: vec![0; len],
            death_tint: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && position.x < self.width as i32
            && position.y < self.height as i32
    }

    #[inline]
    fn index(&self, position: Position) -> usize {
        debug_assert!(self.contains(position), "grid access at {position:?}");
        position.y as usize * self.width as usize + position.x as usize
    }

    pub fn primary(&self, position: Position) -> Option<EntityId> {
        self.contains(position)
            .then(|| self.primary[self.index(position)])
            .flatten()
    }

    pub fn set_primary(&mut self, position: Position, entity: Option<EntityId>) {
        let index = self.index(position);
        self.primary[index] = entity;
    }

    pub fn background(&self, position: Position) -> Option<EntityId> {
        self.contains(position)
            .then(|| self.background[self.index(position)])
            .flatten()
    }

    pub fn set_background(&mut self, position: Position, entity: Option<EntityId>) {
        let index = self.index(position);
        self.background[index] = entity;
    }

    pub fn terrain(&self, position: Position) -> Terrain {
        if self.contains(position) {
            self.terrain[self.index(position)]
        } else {
            Terrain::Empty
        }
    }

    pub fn set_terrain(&mut self, position: Position, terrain: Terrain) {
        let index = self.index(position);
        self.terrain[index] = terrain;
    }

    pub fn elevation(&self, position: Position) -> i8 {
        if self.contains(position) {
            self.elevation[self.index(position)]
        } else {
            0
        }
    }

    pub fn set_elevation(&mut self, position: Position, elevation: i8) {
        let index = self.index(position);
        self.elevation[index] = elevation;
    }

    pub fn biome(&self, position: Position) -> u8 {
        if self.contains(position) {
            self.biome[self.index(position)]
        } else {
            0
        }
    }

    pub fn set_biome(&mut self, position: Position, biome: u8) {
        let index = self.index(position);
        self.biome[index] = biome;
    }

    pub fn death_tint(&self, position: Position) -> u16 {
        if self.contains(position) {
            self.death_tint[self.index(position)]
        } else {
            0
        }
    }

    pub fn set_death_tint(&mut self, position: Position, ticks: u16) {
        let index = self.index(position);
        self.death_tint[index] = ticks;
    }

    /// Decrements every active death-tint counter. Called once per tick.
    pub fn decay_death_tint(&mut self) {
        for tint in &mut self.death_tint {
            *tint = tint.saturating_sub(1);
        }
    }

    /// Number of terrain one-hot observation layers.
    pub const TERRAIN_LAYERS: usize = Terrain::COUNT;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_reads_are_inert() {
        let grid = Grid::new(4, 4);
        let outside = Position::new(-1, 2);
        assert!(!grid.contains(outside));
        assert_eq!(grid.primary(outside), None);
        assert_eq!(grid.terrain(outside), Terrain::Empty);
        assert_eq!(grid.elevation(outside), 0);
    }

    #[test]
    fn primary_roundtrip() {
        let mut grid = Grid::new(4, 4);
        let position = Position::new(2, 1);
        grid.set_primary(position, Some(EntityId(7)));
        assert_eq!(grid.primary(position), Some(EntityId(7)));
        grid.set_primary(position, None);
        assert_eq!(grid.primary(position), None);
    }

    #[test]
    fn ramp_orientation() {
        assert_eq!(Terrain::RampUpE.ramp_direction(), Some(Direction::East));
        assert_eq!(Terrain::Grass.ramp_direction(), None);
    }

    #[test]
    fn slow_terrain_speeds() {
        assert_eq!(Terrain::Mud.speed_tenths(), 7);
        assert_eq!(Terrain::Snow.speed_tenths(), 8);
        assert_eq!(Terrain::Sand.speed_tenths(), 9);
        assert_eq!(Terrain::Grass.speed_tenths(), 10);
    }
}
