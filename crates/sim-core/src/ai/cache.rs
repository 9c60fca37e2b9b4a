//! Generation-tagged per-tick caches and agent lifecycle tracking.
//!
//! The controller recomputes proximity targets at most once per tick per
//! agent. Instead of zeroing arrays every tick, each wrapper carries a
//! generation counter: bumping it invalidates every entry in O(1), and an
//! entry is fresh only while its recorded generation matches.

/// Lifecycle of a cache wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CachePhase {
    #[default]
    Unallocated,
    Allocated,
    Active,
    Cleaned,
}

/// Single-value cache.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheWrapper<T> {
    phase: CachePhase,
    value: Option<T>,
    valid_gen: u64,
}

impl<T> CacheWrapper<T> {
    pub fn new() -> Self {
        Self {
            phase: CachePhase::Allocated,
            value: None,
            valid_gen: 0,
        }
    }

    /// Returns the cached value when it is fresh for `generation`, running
    /// `compute` and storing the result otherwise.
    pub fn get(&mut self, generation: u64, compute: impl FnOnce() -> T) -> &T {
        if self.valid_gen != generation || self.value.is_none() {
            self.value = Some(compute());
            self.valid_gen = generation;
            self.phase = CachePhase::Active;
        }
        self.value.as_ref().expect("value stored above")
    }

    pub fn phase(&self) -> CachePhase {
        self.phase
    }

    /// Drops the value and parks the wrapper.
    pub fn clean(&mut self) {
        self.value = None;
        self.phase = CachePhase::Cleaned;
    }
}

/// Per-agent cache with O(1) whole-tick invalidation.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerAgentCache<T> {
    phase: CachePhase,
    entries: Vec<Option<T>>,
    entry_gen: Vec<u64>,
    generation: u64,
}

impl<T: Clone> PerAgentCache<T> {
    pub fn new(agents: usize) -> Self {
        Self {
            phase: CachePhase::Allocated,
            entries: vec![None; agents],
            entry_gen: vec![0; agents],
            generation: 1,
        }
    }

    /// Invalidates every entry without touching the arrays.
    pub fn begin_step(&mut self) {
        self.generation += 1;
        self.phase = CachePhase::Active;
    }

    pub fn get(&mut self, agent: u16, compute: impl FnOnce() -> T) -> &T {
        let index = agent as usize;
        if self.entry_gen[index] != self.generation || self.entries[index].is_none() {
            self.entries[index] = Some(compute());
            self.entry_gen[index] = self.generation;
        }
        self.entries[index].as_ref().expect("entry stored above")
    }

    /// Fresh value without computing.
    pub fn peek(&self, agent: u16) -> Option<&T> {
        let index = agent as usize;
        (self.entry_gen[index] == self.generation)
            .then(|| self.entries[index].as_ref())
            .flatten()
    }
}

/// Per-team cache; identical mechanics, team-indexed.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerTeamCache<T> {
    entries: Vec<Option<T>>,
    entry_gen: Vec<u64>,
    generation: u64,
}

impl<T: Clone> PerTeamCache<T> {
    pub fn new(teams: usize) -> Self {
        Self {
            entries: vec![None; teams],
            entry_gen: vec![0; teams],
            generation: 1,
        }
    }

    pub fn begin_step(&mut self) {
        self.generation += 1;
    }

    pub fn get(&mut self, team: u8, compute: impl FnOnce() -> T) -> &T {
        let index = team as usize;
        if self.entry_gen[index] != self.generation || self.entries[index].is_none() {
            self.entries[index] = Some(compute());
            self.entry_gen[index] = self.generation;
        }
        self.entries[index].as_ref().expect("entry stored above")
    }
}

/// Tracks which agents the controller has touched recently so per-agent
/// decision state can be reclaimed after long inactivity.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentLifecycle {
    active: Vec<bool>,
    last_active_step: Vec<u64>,
    cleanup_needed: Vec<bool>,
}

impl AgentLifecycle {
    pub fn new(agents: usize) -> Self {
        Self {
            active: vec![false; agents],
            last_active_step: vec![0; agents],
            cleanup_needed: vec![false; agents],
        }
    }

    pub fn mark_active(&mut self, agent: u16, step: u64) {
        self.active[agent as usize] = true;
        self.last_active_step[agent as usize] = step;
    }

    /// Flags cleanup only on the active -> inactive edge; repeated calls on
    /// an already-inactive agent are no-ops.
    pub fn mark_inactive(&mut self, agent: u16) {
        let index = agent as usize;
        if self.active[index] {
            self.active[index] = false;
            self.cleanup_needed[index] = true;
        }
    }

    pub fn is_active(&self, agent: u16) -> bool {
        self.active[agent as usize]
    }

    /// Agents whose last activity is strictly older than `threshold` steps.
    pub fn detect_stale(&self, step: u64, threshold: u64) -> Vec<u16> {
        self.active
            .iter()
            .enumerate()
            .filter(|&(index, &active)| {
                active && step.saturating_sub(self.last_active_step[index]) > threshold
            })
            .map(|(index, _)| index as u16)
            .collect()
    }

    /// Reports every agent flagged for cleanup and clears the flags.
    pub fn process_cleanup(&mut self) -> Vec<u16> {
        let flagged: Vec<u16> = self
            .cleanup_needed
            .iter()
            .enumerate()
            .filter(|&(_, &needed)| needed)
            .map(|(index, _)| index as u16)
            .collect();
        for &agent in &flagged {
            self.cleanup_needed[agent as usize] = false;
        }
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_wrapper_hits_within_generation() {
        let mut cache = CacheWrapper::new();
        let mut computes = 0;
        let value = *cache.get(1, || {
            computes += 1;
            42
        });
        assert_eq!(value, 42);
        let value = *cache.get(1, || {
            computes += 1;
            99
        });
        assert_eq!(value, 42);
        assert_eq!(computes, 1);

        let value = *cache.get(2, || {
            computes += 1;
            99
        });
        assert_eq!(value, 99);
        assert_eq!(computes, 2);
        assert_eq!(cache.phase(), CachePhase::Active);
    }

    #[test]
    fn per_agent_cache_resets_in_constant_time() {
        let mut cache = PerAgentCache::new(4);
        cache.begin_step();
        assert_eq!(*cache.get(2, || 7), 7);
        assert_eq!(cache.peek(2), Some(&7));
        assert_eq!(cache.peek(1), None);

        cache.begin_step();
        // Stale entry is invisible after the generation bump.
        assert_eq!(cache.peek(2), None);
        assert_eq!(*cache.get(2, || 8), 8);
    }

    #[test]
    fn lifecycle_flags_only_on_edge() {
        let mut lifecycle = AgentLifecycle::new(3);
        lifecycle.mark_active(1, 10);
        lifecycle.mark_inactive(1);
        lifecycle.mark_inactive(1);
        lifecycle.mark_inactive(2);

        // Agent 2 was never active, so no cleanup was flagged for it.
        assert_eq!(lifecycle.process_cleanup(), vec![1]);
        assert!(lifecycle.process_cleanup().is_empty());
    }

    #[test]
    fn stale_detection_is_strict() {
        let mut lifecycle = AgentLifecycle::new(2);
        lifecycle.mark_active(0, 100);
        lifecycle.mark_active(1, 90);

        assert_eq!(lifecycle.detect_stale(110, 10), vec![1]);
        assert!(lifecycle.detect_stale(110, 20).is_empty());
    }
}
