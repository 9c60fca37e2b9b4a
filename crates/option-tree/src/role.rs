//! Role nodes: ordered stacks of tiers.

use crate::tier::Tier;

/// An ordered stack of [`Tier`]s evaluated top-down.
///
/// # Semantics
///
/// A `Role` asks each tier in declaration order:
/// - If a tier yields an action, the role **stops immediately** and returns it
/// - If a tier declines, the role **continues** to the next tier
/// - If every tier declines, the role declines and the host falls back to
///   its idle action
pub struct Role<C, A> {
    tiers: Vec<Tier<C, A>>,
}

impl<C, A> Role<C, A> {
    /// Creates a new role with the given tiers.
    ///
    /// # Panics
    ///
    /// Panics if `tiers` is empty. A role with no tiers is meaningless and
    /// likely indicates a programming error.
    pub fn new(tiers: Vec<Tier<C, A>>) -> Self {
        assert!(!tiers.is_empty(), "Role must have at least one tier");
        Self { tiers }
    }

    /// Evaluates tiers in order until one yields an action.
    ///
    /// `roll` is consulted only by shuffle tiers that are actually reached,
    /// so the number of RNG draws per decision is deterministic for a given
    /// context.
    pub fn decide(&self, ctx: &mut C, roll: &mut dyn FnMut(u32) -> u32) -> Option<A> {
        self.tiers.iter().find_map(|tier| tier.select(ctx, roll))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposer::Proposer;

    struct Ctx;

    struct Decline;
    impl Proposer<Ctx, &'static str> for Decline {
        fn propose(&self, _ctx: &mut Ctx) -> Option<&'static str> {
            None
        }
    }

    struct Emit(&'static str);
    impl Proposer<Ctx, &'static str> for Emit {
        fn propose(&self, _ctx: &mut Ctx) -> Option<&'static str> {
            Some(self.0)
        }
    }

    fn no_roll(_n: u32) -> u32 {
        0
    }

    #[test]
    fn falls_through_declining_tiers() {
        let role = Role::new(vec![
            Tier::fixed(vec![Box::new(Decline) as Box<dyn Proposer<Ctx, &'static str>>]),
            Tier::fixed(vec![Box::new(Emit("gather")) as Box<dyn Proposer<Ctx, &'static str>>]),
        ]);

        assert_eq!(role.decide(&mut Ctx, &mut no_roll), Some("gather"));
    }

    #[test]
    fn declines_when_every_tier_declines() {
        let role = Role::new(vec![
            Tier::fixed(vec![Box::new(Decline) as Box<dyn Proposer<Ctx, &'static str>>]),
            Tier::fixed(vec![Box::new(Decline) as Box<dyn Proposer<Ctx, &'static str>>]),
        ]);

        assert_eq!(role.decide(&mut Ctx, &mut no_roll), None);
    }
}
