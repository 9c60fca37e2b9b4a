//! Core proposer trait.
//!
//! This module defines the [`Proposer`] trait, the fundamental abstraction
//! for all option nodes. The trait is generic over a context type `C` and an
//! action type `A`, so nodes can inspect simulation state and emit whatever
//! action encoding the host uses.

/// An option node that may propose an action for the given context.
pub trait Proposer<C, A>: Send + Sync {
    /// Evaluate this option against the given context.
    ///
    /// # Returns
    ///
    /// - `Some(action)` if the option is eligible and proposes an action
    /// - `None` if the option declines (not eligible this tick)
    fn propose(&self, ctx: &mut C) -> Option<A>;

    /// Relative fitness of this option in the current context.
    ///
    /// Only consulted by shuffle tiers. Fixed tiers ignore fitness and rely
    /// purely on ordering. The value is clamped from below by
    /// [`crate::MIN_WEIGHT`] so a momentarily-unfit option can still be drawn.
    fn fitness(&self, _ctx: &C) -> u32 {
        1
    }
}

/// Blanket implementation for boxed proposers.
///
/// This allows `Box<dyn Proposer<C, A>>` to also implement `Proposer<C, A>`,
/// enabling dynamic dispatch and heterogeneous collections of nodes.
impl<C, A> Proposer<C, A> for Box<dyn Proposer<C, A>> {
    #[inline]
    fn propose(&self, ctx: &mut C) -> Option<A> {
        (**self).propose(ctx)
    }

    #[inline]
    fn fitness(&self, ctx: &C) -> u32 {
        (**self).fitness(ctx)
    }
}
