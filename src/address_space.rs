//! One job's view of memory: page table, access trace and replacement
//! bookkeeping, backed by the job's own store and the shared frame pool.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::backing_store::BackingStore;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::event::Event;
use crate::memory::{FrameContent, PhysicalMemory};
use crate::policy::{PolicyKind, ReplacementPolicy};
use crate::trace::generate_trace;
use crate::translation::VirtualAddress;

/// Result of one translated access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessOutcome {
    pub address: VirtualAddress,
    pub frame: usize,
    /// Informational only; nothing reads memory through it.
    pub physical_address: usize,
    pub fault: bool,
    /// Previous occupant of the frame when the access faulted.
    pub replaced: Option<FrameContent>,
}

pub struct AddressSpace {
    job_id: usize,
    memory: Arc<PhysicalMemory>,
    store: BackingStore,
    page_table_frame: Option<usize>,
    page_table: Vec<Option<usize>>,
    trace: Vec<usize>,
    faults: usize,
    policy: ReplacementPolicy,
    data_page_budget: usize,
    released: bool,
}

impl AddressSpace {
    /// Build a job's address space with a freshly generated trace. No frames
    /// are taken until [`allocate`](Self::allocate).
    pub fn new(job_id: usize, memory: Arc<PhysicalMemory>, kind: PolicyKind, config: &SimConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(job_id as u64)),
            None => StdRng::from_entropy(),
        };
        let trace = generate_trace(
            &mut rng,
            config.access_count,
            memory.page_size(),
            config.locality_window,
        );
        Self::with_trace(job_id, memory, kind, config, trace)
    }

    /// Build an address space that replays `trace` instead of a random one.
    pub fn with_trace(
        job_id: usize,
        memory: Arc<PhysicalMemory>,
        kind: PolicyKind,
        config: &SimConfig,
        trace: Vec<usize>,
    ) -> Self {
        AddressSpace {
            job_id,
            store: BackingStore::new(&config.store_dir, job_id, config.virtual_pages),
            page_table_frame: None,
            page_table: vec![None; config.virtual_pages],
            trace,
            faults: 0,
            policy: ReplacementPolicy::new(kind),
            data_page_budget: config.data_page_budget,
            released: false,
            memory,
        }
    }

    pub fn job_id(&self) -> usize {
        self.job_id
    }

    pub fn trace(&self) -> &[usize] {
        &self.trace
    }

    pub fn policy(&self) -> PolicyKind {
        self.policy.kind()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn fault_count(&self) -> usize {
        self.faults
    }

    /// Faults per trace entry, in `[0, 1]`.
    pub fn fault_rate(&self) -> f64 {
        if self.trace.is_empty() {
            0.0
        } else {
            self.faults as f64 / self.trace.len() as f64
        }
    }

    pub fn frame_of(&self, page: usize) -> Option<usize> {
        self.page_table.get(page).copied().flatten()
    }

    /// `(page, frame)` for every mapped data page.
    pub fn mapped_frames(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.page_table
            .iter()
            .enumerate()
            .filter_map(|(page, entry)| entry.map(|frame| (page, frame)))
    }

    pub fn page_table_frame(&self) -> Option<usize> {
        self.page_table_frame
    }

    /// Frames currently held, page-table frame included.
    pub fn resident_frame_count(&self) -> usize {
        usize::from(self.page_table_frame.is_some()) + self.mapped_frames().count()
    }

    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BackingStore {
        &mut self.store
    }

    /// Block until the pool can cover the budget plus the page-table frame,
    /// then load the first `budget` pages.
    ///
    /// The free count seen after waking may already be stale. Frames are
    /// claimed one at a time and, if the pool runs dry partway, everything
    /// claimed in that round goes back before waiting again.
    ///
    /// Does nothing once the space has been released.
    pub fn allocate(&mut self) {
        if self.released || self.page_table_frame.is_some() {
            return;
        }
        let needed = self.data_page_budget + 1;

        let frames = loop {
            let free = self.memory.free_count();
            if free < needed {
                Event::WaitingForMemory { job_id: self.job_id, needed, free }.emit();
                self.memory.wait_for_free(needed);
            }
            if let Some(frames) = self.claim_frames(needed) {
                break frames;
            }
        };

        let (&table_frame, data_frames) = match frames.split_first() {
            Some(split) => split,
            None => return,
        };
        self.page_table_frame = Some(table_frame);
        for (page, &frame) in data_frames.iter().enumerate() {
            if let Some(content) = self.store.read_page(page) {
                self.memory.write(frame, FrameContent::Page(content));
            }
            self.page_table[page] = Some(frame);
            self.policy.record_load(frame);
        }
        self.memory
            .write(table_frame, FrameContent::PageTable { job_id: self.job_id });

        Event::Allocated { job_id: self.job_id, frames: frames.len() }.emit();
    }

    fn claim_frames(&self, needed: usize) -> Option<Vec<usize>> {
        let mut frames = Vec::with_capacity(needed);
        for _ in 0..needed {
            match self.memory.allocate_frame() {
                Some(frame) => frames.push(frame),
                None => {
                    for frame in frames {
                        self.memory.free_frame(frame);
                    }
                    return None;
                }
            }
        }
        Some(frames)
    }

    /// Translate one logical address, faulting its page in if needed.
    pub fn access(&mut self, address: usize) -> Result<AccessOutcome, SimError> {
        if self.released {
            return Err(SimError::SpaceReleased { job_id: self.job_id });
        }
        let page_size = self.memory.page_size();
        let va = VirtualAddress::from_raw(address, page_size);
        let entry = *self
            .page_table
            .get(va.page)
            .ok_or(SimError::AddressOutOfRange { job_id: self.job_id, address })?;

        let (frame, replaced) = match entry {
            Some(frame) => {
                self.policy.record_hit(frame);
                (frame, None)
            }
            None => {
                self.faults += 1;
                Event::PageFault { job_id: self.job_id, address }.emit();
                let (frame, old) = self.replace(va.page)?;
                (frame, Some(old))
            }
        };

        let physical_address = va.physical_address(frame, page_size);
        Event::Access {
            job_id: self.job_id,
            address,
            content: self.memory.read(frame),
            physical_address,
        }
        .emit();

        Ok(AccessOutcome {
            address: va,
            frame,
            physical_address,
            fault: replaced.is_some(),
            replaced,
        })
    }

    /// Load `page` into the frame the policy hands back, unmapping whichever
    /// of our pages lived there.
    fn replace(&mut self, page: usize) -> Result<(usize, FrameContent), SimError> {
        let job_id = self.job_id;
        let frame = self.policy.select_victim(&self.memory).ok_or(match self.policy.kind() {
            PolicyKind::Direct => SimError::OutOfFrames { job_id, page },
            _ => SimError::NoVictimFrame { job_id, page },
        })?;

        let old = self.memory.read(frame);
        let dispossessed = match old.page() {
            Some(id) if id.job_id == job_id && self.frame_of(id.page) == Some(frame) => Some(id.page),
            _ => self.page_table.iter().position(|entry| *entry == Some(frame)),
        };
        if let Some(old_page) = dispossessed {
            self.page_table[old_page] = None;
        }

        if let Some(content) = self.store.read_page(page) {
            self.memory.write(frame, FrameContent::Page(content));
            Event::PageReplaced { frame, old, new: content }.emit();
        }
        self.page_table[page] = Some(frame);
        Ok((frame, old))
    }

    /// Return every held frame to the pool and forget the replacement
    /// bookkeeping. Returns how many were freed; later calls free nothing.
    ///
    /// A released space is inert: `allocate` is a no-op and every access
    /// fails with [`SimError::SpaceReleased`].
    pub fn release(&mut self) -> usize {
        self.released = true;
        self.policy = ReplacementPolicy::new(self.policy.kind());
        let mut freed = 0;
        if let Some(frame) = self.page_table_frame.take() {
            self.memory.free_frame(frame);
            freed += 1;
        }
        for entry in self.page_table.iter_mut() {
            if let Some(frame) = entry.take() {
                self.memory.free_frame(frame);
                freed += 1;
            }
        }
        freed
    }
}

impl Drop for AddressSpace {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::memory::PageId;

    const P: usize = 256;

    fn test_config(dir: &TempDir, frames: usize, budget: usize) -> SimConfig {
        SimConfig {
            physical_frames: frames,
            data_page_budget: budget,
            virtual_pages: 16,
            locality_window: 9,
            access_count: 64,
            max_access_delay: Duration::ZERO,
            store_dir: dir.path().to_path_buf(),
            seed: Some(42),
            ..SimConfig::default()
        }
    }

    fn memory_for(config: &SimConfig) -> Arc<PhysicalMemory> {
        Arc::new(PhysicalMemory::new(config.physical_frames, config.page_size))
    }

    fn assert_consistent(space: &AddressSpace, memory: &PhysicalMemory) {
        for (page, frame) in space.mapped_frames() {
            assert_eq!(
                memory.read(frame),
                FrameContent::Page(PageId::new(space.job_id(), page)),
                "frame {} out of sync with page {}",
                frame,
                page
            );
            assert!(memory.is_allocated(frame));
        }
    }

    #[test]
    fn test_allocation_loads_budget_pages() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 8, 3);
        let memory = memory_for(&config);
        let mut space = AddressSpace::new(5, Arc::clone(&memory), PolicyKind::Fifo, &config);

        assert_eq!(space.resident_frame_count(), 0);
        space.allocate();

        assert_eq!(space.resident_frame_count(), 4);
        assert_eq!(memory.free_count(), 4);
        let table = space.page_table_frame().unwrap();
        assert_eq!(memory.read(table), FrameContent::PageTable { job_id: 5 });
        assert_eq!(space.mapped_frames().map(|(page, _)| page).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(space.policy(), PolicyKind::Fifo);
        assert_consistent(&space, &memory);
    }

    #[test]
    fn test_claim_frames_rolls_back_partial_set() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 4, 2);
        let memory = memory_for(&config);
        let held = [memory.allocate_frame().unwrap(), memory.allocate_frame().unwrap()];
        let space = AddressSpace::with_trace(0, Arc::clone(&memory), PolicyKind::Fifo, &config, vec![]);

        assert_eq!(space.claim_frames(3), None);
        assert_eq!(memory.free_count(), 2);
        for frame in (0..4).filter(|frame| !held.contains(frame)) {
            assert!(!memory.is_allocated(frame));
            assert_eq!(memory.read(frame), FrameContent::Invalid);
        }
        assert_eq!(space.resident_frame_count(), 0);
    }

    #[test]
    fn test_fifo_scenario_two_frame_budget() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 3, 2);
        let memory = memory_for(&config);
        let trace = vec![1, P + 2, 2 * P + 3, 4];
        let mut space =
            AddressSpace::with_trace(0, Arc::clone(&memory), PolicyKind::Fifo, &config, trace.clone());
        space.allocate();
        let page0_frame = space.frame_of(0).unwrap();
        let page1_frame = space.frame_of(1).unwrap();

        let outcomes: Vec<AccessOutcome> = trace.iter().map(|&a| space.access(a).unwrap()).collect();

        assert_eq!(outcomes.iter().map(|o| o.fault).collect::<Vec<_>>(), vec![false, false, true, true]);
        assert_eq!(outcomes[2].frame, page0_frame);
        assert_eq!(outcomes[2].replaced, Some(FrameContent::Page(PageId::new(0, 0))));
        assert_eq!(outcomes[3].frame, page1_frame);
        assert_eq!(outcomes[3].replaced, Some(FrameContent::Page(PageId::new(0, 1))));

        assert_eq!(space.fault_count(), 2);
        assert_eq!(space.fault_rate(), 0.5);
        assert_eq!(space.frame_of(1), None);
        assert_eq!(space.frame_of(2), Some(page0_frame));
        assert_eq!(space.frame_of(0), Some(page1_frame));
        assert_eq!(outcomes[3].physical_address, page1_frame * P + 4);
        assert_consistent(&space, &memory);
    }

    #[test]
    fn test_hits_do_not_move_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 8, 3);
        let memory = memory_for(&config);
        let mut space =
            AddressSpace::with_trace(1, Arc::clone(&memory), PolicyKind::Lru, &config, vec![]);
        space.allocate();
        let before: Vec<_> = space.mapped_frames().collect();

        for address in [0, P, 2 * P + 9, 5] {
            let outcome = space.access(address).unwrap();
            assert!(!outcome.fault);
            assert_eq!(outcome.replaced, None);
        }
        assert_eq!(space.mapped_frames().collect::<Vec<_>>(), before);
        assert_eq!(space.fault_count(), 0);
        assert_eq!(space.fault_rate(), 0.0);
    }

    #[test]
    fn test_lru_evicts_most_recent_hit() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 8, 3);
        let memory = memory_for(&config);
        let mut space =
            AddressSpace::with_trace(2, Arc::clone(&memory), PolicyKind::Lru, &config, vec![]);
        space.allocate();
        let page1_frame = space.frame_of(1).unwrap();

        space.access(0).unwrap();
        space.access(2 * P).unwrap();
        space.access(P).unwrap();
        let outcome = space.access(7 * P).unwrap();

        assert!(outcome.fault);
        assert_eq!(outcome.frame, page1_frame);
        assert_eq!(space.frame_of(1), None);
        assert_eq!(space.frame_of(7), Some(page1_frame));
        assert_consistent(&space, &memory);
    }

    #[test]
    fn test_resident_frames_stay_within_budget() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimConfig { locality_window: 16, access_count: 300, ..test_config(&dir, 16, 4) };
        let memory = memory_for(&config);

        for kind in [PolicyKind::Fifo, PolicyKind::Lru] {
            let mut space = AddressSpace::new(3, Arc::clone(&memory), kind, &config);
            space.allocate();
            let trace = space.trace().to_vec();
            for address in trace {
                space.access(address).unwrap();
                assert!(space.resident_frame_count() <= config.frames_per_job());
                assert_consistent(&space, &memory);
            }
            assert!(space.fault_count() <= space.trace().len());
            assert_eq!(space.release(), config.frames_per_job());
            assert_eq!(memory.free_count(), 16);
        }
    }

    #[test]
    fn test_two_jobs_never_share_a_frame() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimConfig { locality_window: 12, access_count: 150, ..test_config(&dir, 10, 3) };
        let memory = memory_for(&config);
        let mut first = AddressSpace::new(0, Arc::clone(&memory), PolicyKind::Fifo, &config);
        let mut second = AddressSpace::new(1, Arc::clone(&memory), PolicyKind::Lru, &config);
        first.allocate();
        second.allocate();

        let traces = (first.trace().to_vec(), second.trace().to_vec());
        for (a, b) in traces.0.into_iter().zip(traces.1) {
            first.access(a).unwrap();
            second.access(b).unwrap();

            let mut seen = HashSet::new();
            for space in [&first, &second] {
                assert!(seen.insert(space.page_table_frame().unwrap()));
                for (_, frame) in space.mapped_frames() {
                    assert!(seen.insert(frame), "frame {} mapped twice", frame);
                }
                assert_consistent(space, &memory);
            }
        }
    }

    #[test]
    fn test_direct_policy_reports_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 4, 2);
        let memory = memory_for(&config);
        let mut space =
            AddressSpace::with_trace(9, Arc::clone(&memory), PolicyKind::Direct, &config, vec![]);
        space.allocate();

        let outcome = space.access(2 * P).unwrap();
        assert!(outcome.fault);
        assert_eq!(outcome.replaced, Some(FrameContent::Invalid));
        assert!(space.frame_of(0).is_some());
        assert_eq!(memory.free_count(), 0);

        let err = space.access(3 * P).unwrap_err();
        assert_eq!(err, SimError::OutOfFrames { job_id: 9, page: 3 });
        assert_eq!(space.fault_count(), 2);
        assert_eq!(space.frame_of(3), None);
        assert_consistent(&space, &memory);

        assert_eq!(space.release(), 4);
        assert_eq!(memory.free_count(), 4);
    }

    #[test]
    fn test_address_outside_space_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 8, 2);
        let memory = memory_for(&config);
        let mut space = AddressSpace::with_trace(4, memory, PolicyKind::Fifo, &config, vec![]);
        space.allocate();

        let err = space.access(16 * P).unwrap_err();
        assert_eq!(err, SimError::AddressOutOfRange { job_id: 4, address: 16 * P });
        assert_eq!(space.fault_count(), 0);
    }

    #[test]
    fn test_drop_releases_frames() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 8, 3);
        let memory = memory_for(&config);
        {
            let mut space = AddressSpace::new(6, Arc::clone(&memory), PolicyKind::Fifo, &config);
            space.allocate();
            assert_eq!(memory.free_count(), 4);
        }
        assert_eq!(memory.free_count(), 8);
        assert!((0..8).all(|frame| memory.read(frame) == FrameContent::Invalid));
    }

    #[test]
    fn test_faults_load_from_backing_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 8, 2);
        let memory = memory_for(&config);
        let mut space =
            AddressSpace::with_trace(3, Arc::clone(&memory), PolicyKind::Fifo, &config, vec![]);
        space.store_mut().write_page(5, PageId::new(30, 50));
        space.allocate();

        let outcome = space.access(5 * P + 1).unwrap();
        assert_eq!(memory.read(outcome.frame), FrameContent::Page(PageId::new(30, 50)));
        assert_eq!(space.frame_of(5), Some(outcome.frame));
        assert!(space.store().path().ends_with("file_3.txt"));
    }

    #[test]
    fn test_release_makes_space_inert() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 8, 2);
        let memory = memory_for(&config);

        for kind in [PolicyKind::Fifo, PolicyKind::Lru, PolicyKind::Direct] {
            let mut first = AddressSpace::with_trace(0, Arc::clone(&memory), kind, &config, vec![]);
            first.allocate();
            first.access(0).unwrap();
            assert_eq!(first.release(), 3);
            assert!(first.is_released());
            assert_eq!(first.policy(), kind);

            let mut second = AddressSpace::with_trace(1, Arc::clone(&memory), kind, &config, vec![]);
            second.allocate();
            let owned: Vec<_> = second.mapped_frames().collect();

            first.allocate();
            assert_eq!(first.resident_frame_count(), 0);
            assert_eq!(first.access(5 * P), Err(SimError::SpaceReleased { job_id: 0 }));
            assert_eq!(first.access(0), Err(SimError::SpaceReleased { job_id: 0 }));
            assert_eq!(first.fault_count(), 0);
            assert_eq!(first.release(), 0);

            assert_eq!(second.mapped_frames().collect::<Vec<_>>(), owned);
            assert_consistent(&second, &memory);
            assert_eq!(memory.free_count(), 5);

            second.release();
            assert_eq!(memory.free_count(), 8);
        }
    }

    #[test]
    fn test_waiting_job_proceeds_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 6, 3);
        let memory = memory_for(&config);
        let mut holder = AddressSpace::new(0, Arc::clone(&memory), PolicyKind::Fifo, &config);
        holder.allocate();
        assert_eq!(memory.free_count(), 2);

        let waiter = {
            let memory = Arc::clone(&memory);
            let config = config.clone();
            std::thread::spawn(move || {
                let mut space = AddressSpace::new(1, memory, PolicyKind::Fifo, &config);
                space.allocate();
                space.resident_frame_count()
            })
        };

        std::thread::sleep(Duration::from_millis(30));
        holder.release();
        assert_eq!(waiter.join().unwrap(), 4);
    }
}
