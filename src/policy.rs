//! Page replacement strategies.
//!
//! A strategy is picked once per job and owns that job's bookkeeping. All
//! counters are per job; no state is shared between address spaces.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::memory::PhysicalMemory;

/// Which replacement strategy a job uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Fifo,
    /// Evicts the frame with the *highest* access counter. This is the
    /// reverse of textbook LRU and is kept on purpose.
    Lru,
    /// No bookkeeping: every fault takes a fresh frame from the allocator.
    Direct,
}

impl PolicyKind {
    /// `FIFO` and `LRU` (any case) select those strategies; any other name
    /// falls back to `Direct`.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("FIFO") {
            PolicyKind::Fifo
        } else if name.eq_ignore_ascii_case("LRU") {
            PolicyKind::Lru
        } else {
            PolicyKind::Direct
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Fifo => "FIFO",
            PolicyKind::Lru => "LRU",
            PolicyKind::Direct => "direct",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub enum ReplacementPolicy {
    /// Frame slots in load order. An evicted slot goes back to the tail, so
    /// faults cycle round-robin through the job's original frames.
    Fifo { queue: VecDeque<usize> },
    Lru {
        last_access: HashMap<usize, u64>,
        clock: u64,
        /// Used only when no frame has a counter yet.
        load_order: VecDeque<usize>,
    },
    Direct,
}

impl ReplacementPolicy {
    pub fn new(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Fifo => ReplacementPolicy::Fifo { queue: VecDeque::new() },
            PolicyKind::Lru => ReplacementPolicy::Lru {
                last_access: HashMap::new(),
                clock: 0,
                load_order: VecDeque::new(),
            },
            PolicyKind::Direct => ReplacementPolicy::Direct,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            ReplacementPolicy::Fifo { .. } => PolicyKind::Fifo,
            ReplacementPolicy::Lru { .. } => PolicyKind::Lru,
            ReplacementPolicy::Direct => PolicyKind::Direct,
        }
    }

    /// A data frame was filled during the allocation phase.
    pub fn record_load(&mut self, frame: usize) {
        match self {
            ReplacementPolicy::Fifo { queue } => queue.push_back(frame),
            ReplacementPolicy::Lru { load_order, .. } => load_order.push_back(frame),
            ReplacementPolicy::Direct => {}
        }
    }

    /// An access found its page resident in `frame`.
    pub fn record_hit(&mut self, frame: usize) {
        if let ReplacementPolicy::Lru { last_access, clock, .. } = self {
            *clock += 1;
            last_access.insert(frame, *clock);
        }
    }

    /// Pick the frame that will receive the faulting page.
    ///
    /// For `Direct` this is a freshly allocated frame; `None` then means the
    /// shared pool is exhausted. For the other strategies `None` means the
    /// job has no resident frames at all.
    pub fn select_victim(&mut self, memory: &PhysicalMemory) -> Option<usize> {
        match self {
            ReplacementPolicy::Fifo { queue } => {
                let frame = queue.pop_front()?;
                queue.push_back(frame);
                Some(frame)
            }
            ReplacementPolicy::Lru { last_access, load_order, .. } => {
                let newest = last_access
                    .iter()
                    .max_by_key(|&(&frame, &time)| (time, std::cmp::Reverse(frame)))
                    .map(|(&frame, _)| frame);
                match newest {
                    Some(frame) => {
                        last_access.remove(&frame);
                        Some(frame)
                    }
                    None => {
                        let frame = load_order.pop_front()?;
                        load_order.push_back(frame);
                        Some(frame)
                    }
                }
            }
            ReplacementPolicy::Direct => memory.allocate_frame(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_names() {
        assert_eq!(PolicyKind::from_name("FIFO"), PolicyKind::Fifo);
        assert_eq!(PolicyKind::from_name("fifo"), PolicyKind::Fifo);
        assert_eq!(PolicyKind::from_name(" LRU\n"), PolicyKind::Lru);
        assert_eq!(PolicyKind::from_name("OPT"), PolicyKind::Direct);
        assert_eq!(PolicyKind::from_name(""), PolicyKind::Direct);
    }

    #[test]
    fn test_fifo_cycles_through_loaded_frames() {
        let memory = PhysicalMemory::new(8, 256);
        let mut policy = ReplacementPolicy::new(PolicyKind::Fifo);
        for frame in [4, 2, 6] {
            policy.record_load(frame);
        }
        // Hits leave the order alone.
        policy.record_hit(6);
        policy.record_hit(4);

        let victims: Vec<usize> = (0..4).filter_map(|_| policy.select_victim(&memory)).collect();
        assert_eq!(victims, vec![4, 2, 6, 4]);
    }

    #[test]
    fn test_lru_evicts_highest_counter() {
        let memory = PhysicalMemory::new(8, 256);
        let (a, b, c) = (1, 2, 3);
        let mut policy = ReplacementPolicy::new(PolicyKind::Lru);
        for frame in [a, b, c] {
            policy.record_load(frame);
        }

        // Leaves counters at A:5, B:7, C:3.
        for frame in [a, a, c, b, a, b, b] {
            policy.record_hit(frame);
        }
        if let ReplacementPolicy::Lru { last_access, .. } = &policy {
            assert_eq!(last_access[&a], 5);
            assert_eq!(last_access[&b], 7);
            assert_eq!(last_access[&c], 3);
        }

        assert_eq!(policy.select_victim(&memory), Some(b));
        // B left the bookkeeping, so A is next.
        assert_eq!(policy.select_victim(&memory), Some(a));
        assert_eq!(policy.select_victim(&memory), Some(c));
    }

    #[test]
    fn test_lru_falls_back_to_load_order_without_hits() {
        let memory = PhysicalMemory::new(8, 256);
        let mut policy = ReplacementPolicy::new(PolicyKind::Lru);
        policy.record_load(5);
        policy.record_load(7);

        assert_eq!(policy.select_victim(&memory), Some(5));
        assert_eq!(policy.select_victim(&memory), Some(7));
        assert_eq!(policy.select_victim(&memory), Some(5));
    }

    #[test]
    fn test_lru_clock_is_per_policy() {
        let mut first = ReplacementPolicy::new(PolicyKind::Lru);
        let mut second = ReplacementPolicy::new(PolicyKind::Lru);
        first.record_hit(0);
        first.record_hit(0);
        second.record_hit(0);

        if let ReplacementPolicy::Lru { clock, .. } = &second {
            assert_eq!(*clock, 1);
        }
    }

    #[test]
    fn test_direct_allocates_until_exhausted() {
        let memory = PhysicalMemory::new(2, 256);
        let mut policy = ReplacementPolicy::new(PolicyKind::Direct);
        policy.record_load(0);

        assert_eq!(policy.select_victim(&memory), Some(0));
        assert_eq!(policy.select_victim(&memory), Some(1));
        assert_eq!(policy.select_victim(&memory), None);
        assert_eq!(memory.free_count(), 0);
    }

    #[test]
    fn test_empty_fifo_has_no_victim() {
        let memory = PhysicalMemory::new(2, 256);
        let mut policy = ReplacementPolicy::new(PolicyKind::Fifo);
        assert_eq!(policy.select_victim(&memory), None);
        assert_eq!(policy.kind(), PolicyKind::Fifo);
    }
}
