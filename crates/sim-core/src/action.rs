//! Action byte codec.
//!
//! One byte per agent per tick: `verb * ARG_COUNT + arg`. The numeric verb
//! set is fixed by the observation design and leaves gaps; undefined verbs
//! decode to `Noop` so a malformed byte degrades to a rejected action
//! instead of an error. All encode/decode logic lives here, so dispatchers
//! only ever see the decoded form.

use crate::config::SimConfig;
use crate::state::Direction;

/// Action verbs with their wire discriminants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Verb {
    #[default]
    Noop = 0,
    Move = 1,
    Attack = 2,
    Use = 3,
    Give = 5,
    Build = 8,
}

impl Verb {
    fn from_wire(value: u8) -> Self {
        match value {
            1 => Verb::Move,
            2 => Verb::Attack,
            3 => Verb::Use,
            5 => Verb::Give,
            8 => Verb::Build,
            _ => Verb::Noop,
        }
    }
}

/// Sentinel Use arguments beyond the eight directions.
pub const USE_ARG_PACK: u8 = 8;
pub const USE_ARG_UNGARRISON_ALL: u8 = 9;
pub const USE_ARG_TOWN_BELL: u8 = 10;

/// A decoded action. `arg` semantics depend on the verb: a direction for
/// Move/Attack/Give, a direction or sentinel for Use, a build-table index
/// for Build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    pub verb: Verb,
    pub arg: u8,
}

impl Action {
    pub const NOOP: Self = Self {
        verb: Verb::Noop,
        arg: 0,
    };

    pub fn new(verb: Verb, arg: u8) -> Self {
        debug_assert!(arg < SimConfig::ARG_COUNT);
        Self { verb, arg }
    }

    pub fn decode(byte: u8) -> Self {
        let verb = Verb::from_wire(byte / SimConfig::ARG_COUNT);
        let arg = byte % SimConfig::ARG_COUNT;
        Self { verb, arg }
    }

    pub fn encode(self) -> u8 {
        self.verb as u8 * SimConfig::ARG_COUNT + self.arg
    }

    pub fn move_to(direction: Direction) -> Self {
        Self::new(Verb::Move, direction as u8)
    }

    pub fn attack(direction: Direction) -> Self {
        Self::new(Verb::Attack, direction as u8)
    }

    pub fn use_dir(direction: Direction) -> Self {
        Self::new(Verb::Use, direction as u8)
    }

    pub fn give(direction: Direction) -> Self {
        Self::new(Verb::Give, direction as u8)
    }

    pub fn build(index: u8) -> Self {
        Self::new(Verb::Build, index)
    }

    /// Direction payload for verbs that carry one.
    pub fn direction(self) -> Option<Direction> {
        Direction::from_repr(self.arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_defined_verbs() {
        for verb in [Verb::Noop, Verb::Move, Verb::Attack, Verb::Use, Verb::Give, Verb::Build] {
            for arg in 0..SimConfig::ARG_COUNT {
                let action = Action::new(verb, arg);
                assert_eq!(Action::decode(action.encode()), action);
            }
        }
    }

    #[test]
    fn undefined_verbs_decode_to_noop() {
        // Verb slots 4, 6, 7 are reserved.
        for verb in [4u8, 6, 7] {
            let byte = verb * SimConfig::ARG_COUNT + 3;
            assert_eq!(Action::decode(byte).verb, Verb::Noop);
        }
    }

    #[test]
    fn direction_payload() {
        assert_eq!(
            Action::move_to(Direction::SouthEast).direction(),
            Some(Direction::SouthEast)
        );
        // Sentinel Use args carry no direction.
        assert_eq!(Action::new(Verb::Use, USE_ARG_TOWN_BELL).direction(), None);
    }
}
