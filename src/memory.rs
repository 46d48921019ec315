use std::fmt;

use parking_lot::{Condvar, Mutex};

use crate::constants::PAGE_TABLE_MARKER;

/// Identity of one virtual page: the owning job and the page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub job_id: usize,
    pub page: usize,
}

impl PageId {
    pub fn new(job_id: usize, page: usize) -> Self {
        PageId { job_id, page }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.job_id, self.page)
    }
}

/// What a physical frame currently holds.
///
/// Frames carry occupancy metadata only, never raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameContent {
    /// Free frame, or a read outside the frame range.
    #[default]
    Invalid,
    /// The frame holds a job's page table.
    PageTable { job_id: usize },
    /// The frame holds a resident data page.
    Page(PageId),
}

impl FrameContent {
    /// The data page held here, if any.
    pub fn page(&self) -> Option<PageId> {
        match self {
            FrameContent::Page(id) => Some(*id),
            _ => None,
        }
    }

    pub fn job_id(&self) -> Option<usize> {
        match self {
            FrameContent::Invalid => None,
            FrameContent::PageTable { job_id } => Some(*job_id),
            FrameContent::Page(id) => Some(id.job_id),
        }
    }
}

impl fmt::Display for FrameContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameContent::Invalid => write!(f, "<-1, -1>"),
            FrameContent::PageTable { job_id } => write!(f, "<{}, {}>", job_id, PAGE_TABLE_MARKER),
            FrameContent::Page(id) => id.fmt(f),
        }
    }
}

struct Bitmap {
    bits: Vec<bool>,
    free: usize,
}

/// Tracks which frames are in use.
///
/// Every operation takes the same lock, so callers never see a bitmap whose
/// free count disagrees with its bits.
pub struct FrameAllocator {
    state: Mutex<Bitmap>,
    released: Condvar,
}

impl FrameAllocator {
    pub fn new(total_frames: usize) -> Self {
        FrameAllocator {
            state: Mutex::new(Bitmap {
                bits: vec![false; total_frames],
                free: total_frames,
            }),
            released: Condvar::new(),
        }
    }

    pub fn total_frames(&self) -> usize {
        self.state.lock().bits.len()
    }

    /// Claim the lowest free frame, or `None` when every frame is used.
    pub fn allocate(&self) -> Option<usize> {
        let mut state = self.state.lock();
        if state.free == 0 {
            return None;
        }
        let frame = state.bits.iter().position(|used| !used)?;
        state.bits[frame] = true;
        state.free -= 1;
        Some(frame)
    }

    /// Release a frame. Returns `false` for free or out-of-range frames,
    /// which are otherwise ignored.
    pub fn free(&self, frame: usize) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        match state.bits.get_mut(frame) {
            Some(bit) if *bit => {
                *bit = false;
                state.free += 1;
                self.released.notify_all();
                true
            }
            _ => false,
        }
    }

    pub fn free_count(&self) -> usize {
        self.state.lock().free
    }

    pub fn is_allocated(&self, frame: usize) -> bool {
        self.state.lock().bits.get(frame).copied().unwrap_or(false)
    }

    /// Block until at least `needed` frames are free.
    ///
    /// Waiters are not queued: whichever thread wakes first and allocates
    /// wins, so a job can starve indefinitely under contention. The count can
    /// also be stale by the time the caller allocates.
    pub fn wait_for_free(&self, needed: usize) {
        let mut state = self.state.lock();
        while state.free < needed {
            self.released.wait(&mut state);
        }
    }
}

/// The shared pool of physical frames.
pub struct PhysicalMemory {
    slots: Mutex<Vec<FrameContent>>,
    allocator: FrameAllocator,
    page_size: usize,
}

impl PhysicalMemory {
    /// Create a memory of `frames` empty frames of `page_size` bytes each
    pub fn new(frames: usize, page_size: usize) -> Self {
        PhysicalMemory {
            slots: Mutex::new(vec![FrameContent::Invalid; frames]),
            allocator: FrameAllocator::new(frames),
            page_size,
        }
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.allocator.total_frames()
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Starting address of a frame
    #[inline]
    pub fn frame_to_address(&self, frame: usize) -> usize {
        frame * self.page_size
    }

    /// Read a frame's content; out-of-range frames read as `Invalid`.
    pub fn read(&self, frame: usize) -> FrameContent {
        self.slots.lock().get(frame).copied().unwrap_or(FrameContent::Invalid)
    }

    /// Write a frame's content; out-of-range writes are dropped.
    pub fn write(&self, frame: usize, content: FrameContent) {
        if let Some(slot) = self.slots.lock().get_mut(frame) {
            *slot = content;
        }
    }

    pub fn allocate_frame(&self) -> Option<usize> {
        self.allocator.allocate()
    }

    /// Return a frame to the pool, clearing its content first so a free
    /// frame never carries an occupant.
    pub fn free_frame(&self, frame: usize) {
        if self.allocator.is_allocated(frame) {
            self.write(frame, FrameContent::Invalid);
            self.allocator.free(frame);
        }
    }

    pub fn free_count(&self) -> usize {
        self.allocator.free_count()
    }

    pub fn is_allocated(&self, frame: usize) -> bool {
        self.allocator.is_allocated(frame)
    }

    pub fn wait_for_free(&self, needed: usize) {
        self.allocator.wait_for_free(needed);
    }
}
