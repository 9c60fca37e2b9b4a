//! Weighted selection over option fitness values.

/// Floor applied to every weight before the cumulative sum is built.
///
/// Guarantees that an option whose fitness collapses to zero keeps a small
/// chance of being drawn, which prevents shuffle tiers from degenerating into
/// fixed tiers when one option dominates.
pub const MIN_WEIGHT: u32 = 1;

/// Picks an index from `weights` using a cumulative-weight binary search.
///
/// # Semantics
///
/// Each weight is clamped to at least [`MIN_WEIGHT`], a running prefix sum is
/// built, and `roll`, a caller-supplied uniform sampler, is asked for a
/// value in `[0, total)`. The returned index is the first prefix strictly
/// greater than the sampled value.
///
/// When every weight is zero the clamp makes the pick uniform, matching the
/// all-zero-weights contract.
///
/// # Panics
///
/// Panics if `weights` is empty. A pick over no options is meaningless and
/// likely indicates a programming error.
pub fn weighted_pick(weights: &[u32], roll: &mut dyn FnMut(u32) -> u32) -> usize {
    assert!(!weights.is_empty(), "weighted_pick over empty weights");

    let mut cumulative = Vec::with_capacity(weights.len());
    let mut total: u32 = 0;
    for &w in weights {
        total = total.saturating_add(w.max(MIN_WEIGHT));
        cumulative.push(total);
    }

    let sample = roll(total);

    // First prefix strictly greater than the sample.
    match cumulative.binary_search(&sample) {
        // Exact hit on a prefix boundary belongs to the next bucket.
        Ok(index) => index + 1,
        Err(index) => index,
    }
    .min(weights.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_roll(value: u32) -> impl FnMut(u32) -> u32 {
        move |total| value.min(total.saturating_sub(1))
    }

    #[test]
    fn pick_lands_in_correct_bucket() {
        // Buckets: [0..3) -> 0, [3..4) -> 1, [4..9) -> 2
        let weights = [3, 1, 5];

        let mut roll = fixed_roll(0);
        assert_eq!(weighted_pick(&weights, &mut roll), 0);

        let mut roll = fixed_roll(2);
        assert_eq!(weighted_pick(&weights, &mut roll), 0);

        let mut roll = fixed_roll(3);
        assert_eq!(weighted_pick(&weights, &mut roll), 1);

        let mut roll = fixed_roll(4);
        assert_eq!(weighted_pick(&weights, &mut roll), 2);

        let mut roll = fixed_roll(8);
        assert_eq!(weighted_pick(&weights, &mut roll), 2);
    }

    #[test]
    fn zero_weights_pick_uniformly() {
        let weights = [0, 0, 0, 0];

        // With the MIN_WEIGHT clamp, total is 4 and each bucket has width 1.
        for target in 0..4 {
            let mut roll = fixed_roll(target as u32);
            assert_eq!(weighted_pick(&weights, &mut roll), target);
        }
    }

    #[test]
    fn single_option_always_wins() {
        let weights = [7];
        let mut roll = fixed_roll(6);
        assert_eq!(weighted_pick(&weights, &mut roll), 0);
    }

    #[test]
    #[should_panic(expected = "empty weights")]
    fn empty_weights_panic() {
        let mut roll = fixed_roll(0);
        weighted_pick(&[], &mut roll);
    }
}
