//! Injected environment: map initialization and deterministic RNG.
//!
//! Terrain generation is an external collaborator; the core only defines
//! the [`MapInitializer`] seam it is injected through.

pub mod init;
pub mod rng;

pub use init::{FnInitializer, MapInitializer, SkirmishMap};
pub use rng::{Pcg32, mix_seed};
