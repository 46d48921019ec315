/// Size of the simulated physical memory in bytes (2^14).
pub const MEMORY_SIZE: usize = 1 << 14;
pub const PAGE_SIZE: usize = 256;
pub const PHYSICAL_FRAMES: usize = MEMORY_SIZE / PAGE_SIZE;

/// Virtual pages in every job's backing store.
pub const VIRTUAL_PAGES: usize = 1 << 8;

/// Data pages a job keeps resident; one extra frame holds its page table.
pub const DATA_PAGE_BUDGET: usize = 9;

pub const JOB_COUNT: usize = 12;
pub const ACCESS_COUNT: usize = 200;
pub const MAX_ACCESS_DELAY_MS: u64 = 100;

/// Number of low pages the locality distribution draws from.
pub const LOCALITY_WINDOW: usize = 9;

pub const STORE_FILE_PREFIX: &str = "file_";
pub const STORE_FILE_SUFFIX: &str = ".txt";

/// Page component stored in a page-table metadata frame.
pub const PAGE_TABLE_MARKER: i64 = -1;
