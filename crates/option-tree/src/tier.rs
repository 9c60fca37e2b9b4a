//! Tier nodes grouping options under one selection mode.
//!
//! A tier is an ordered collection of [`Proposer`]s plus the rule for picking
//! among them. Tiers are the middle layer of a [`crate::Role`]: the role
//! decides which tier gets to act, the tier decides which option inside it.

use crate::pick::weighted_pick;
use crate::proposer::Proposer;

/// How a tier chooses among its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// First option (in declaration order) that proposes an action wins.
    ///
    /// Analogous to a short-circuited logical OR over the options.
    Fixed,

    /// One option is drawn by fitness-weighted lottery, then asked to
    /// propose. If the drawn option declines, the tier declines; the draw
    /// is not repeated, so a tick consumes exactly one roll per shuffle
    /// tier reached.
    Shuffle,
}

/// An ordered group of options evaluated under a [`SelectionMode`].
pub struct Tier<C, A> {
    mode: SelectionMode,
    options: Vec<Box<dyn Proposer<C, A>>>,
}

impl<C, A> Tier<C, A> {
    /// Creates a new tier with the given options.
    ///
    /// # Panics
    ///
    /// Panics if `options` is empty. A tier with no options is meaningless
    /// and likely indicates a programming error.
    pub fn new(mode: SelectionMode, options: Vec<Box<dyn Proposer<C, A>>>) -> Self {
        assert!(!options.is_empty(), "Tier must have at least one option");
        Self { mode, options }
    }

    /// Shorthand for a [`SelectionMode::Fixed`] tier.
    pub fn fixed(options: Vec<Box<dyn Proposer<C, A>>>) -> Self {
        Self::new(SelectionMode::Fixed, options)
    }

    /// Shorthand for a [`SelectionMode::Shuffle`] tier.
    pub fn shuffle(options: Vec<Box<dyn Proposer<C, A>>>) -> Self {
        Self::new(SelectionMode::Shuffle, options)
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Evaluates the tier against the context.
    ///
    /// `roll` must return a uniform value in `[0, n)` for the given `n`; it
    /// is consulted only by shuffle tiers, at most once per call.
    pub fn select(&self, ctx: &mut C, roll: &mut dyn FnMut(u32) -> u32) -> Option<A> {
        match self.mode {
            SelectionMode::Fixed => self
                .options
                .iter()
                .find_map(|option| option.propose(ctx)),
            SelectionMode::Shuffle => {
                let weights: Vec<u32> = self
                    .options
                    .iter()
                    .map(|option| option.fitness(ctx))
                    .collect();
                let index = weighted_pick(&weights, roll);
                self.options[index].propose(ctx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        asked: u32,
    }

    struct Decline;
    impl Proposer<Counter, u8> for Decline {
        fn propose(&self, ctx: &mut Counter) -> Option<u8> {
            ctx.asked += 1;
            None
        }
    }

    struct Emit(u8, u32);
    impl Proposer<Counter, u8> for Emit {
        fn propose(&self, ctx: &mut Counter) -> Option<u8> {
            ctx.asked += 1;
            Some(self.0)
        }

        fn fitness(&self, _ctx: &Counter) -> u32 {
            self.1
        }
    }

    fn no_roll(_n: u32) -> u32 {
        panic!("fixed tier must not roll")
    }

    #[test]
    fn fixed_returns_first_eligible() {
        let tier = Tier::fixed(vec![
            Box::new(Decline) as Box<dyn Proposer<Counter, u8>>,
            Box::new(Emit(7, 1)),
            Box::new(Emit(9, 1)),
        ]);

        let mut ctx = Counter { asked: 0 };
        assert_eq!(tier.select(&mut ctx, &mut no_roll), Some(7));
        // Third option never evaluated
        assert_eq!(ctx.asked, 2);
    }

    #[test]
    fn fixed_declines_when_all_decline() {
        let tier = Tier::fixed(vec![
            Box::new(Decline) as Box<dyn Proposer<Counter, u8>>,
            Box::new(Decline),
        ]);

        let mut ctx = Counter { asked: 0 };
        assert_eq!(tier.select(&mut ctx, &mut no_roll), None);
    }

    #[test]
    fn shuffle_draws_by_weight() {
        let tier = Tier::shuffle(vec![
            Box::new(Emit(1, 2)) as Box<dyn Proposer<Counter, u8>>,
            Box::new(Emit(2, 6)),
        ]);

        // Sample 5 lands in the second bucket [2..8).
        let mut ctx = Counter { asked: 0 };
        let mut roll = |_n: u32| 5;
        assert_eq!(tier.select(&mut ctx, &mut roll), Some(2));
        assert_eq!(ctx.asked, 1);
    }

    #[test]
    fn shuffle_declines_without_redraw() {
        let tier = Tier::shuffle(vec![
            Box::new(Decline) as Box<dyn Proposer<Counter, u8>>,
            Box::new(Emit(2, 1)),
        ]);

        // Sample 0 lands on the declining option; the tier must not retry.
        let mut ctx = Counter { asked: 0 };
        let mut roll = |_n: u32| 0;
        assert_eq!(tier.select(&mut ctx, &mut roll), None);
        assert_eq!(ctx.asked, 1);
    }
}
