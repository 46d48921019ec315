use std::path::PathBuf;
use std::time::Duration;

use crate::constants::*;
use crate::error::SimError;

/// Tunables for one simulation session.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub page_size: usize,
    pub physical_frames: usize,
    pub virtual_pages: usize,
    /// Data pages each job keeps resident (excluding its page-table frame).
    pub data_page_budget: usize,
    pub job_count: usize,
    pub access_count: usize,
    /// Upper bound (exclusive) of the random pause after every access.
    pub max_access_delay: Duration,
    pub locality_window: usize,
    /// Directory holding the per-job backing files.
    pub store_dir: PathBuf,
    /// Fixed seed for trace generation; job `i` uses `seed + i`.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            page_size: PAGE_SIZE,
            physical_frames: PHYSICAL_FRAMES,
            virtual_pages: VIRTUAL_PAGES,
            data_page_budget: DATA_PAGE_BUDGET,
            job_count: JOB_COUNT,
            access_count: ACCESS_COUNT,
            max_access_delay: Duration::from_millis(MAX_ACCESS_DELAY_MS),
            locality_window: LOCALITY_WINDOW,
            store_dir: PathBuf::from("."),
            seed: None,
        }
    }
}

impl SimConfig {
    /// Frames a job holds while active: its data budget plus the page table.
    #[inline]
    pub fn frames_per_job(&self) -> usize {
        self.data_page_budget + 1
    }

    pub fn memory_size(&self) -> usize {
        self.physical_frames * self.page_size
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let fail = |reason: String| Err(SimError::InvalidConfig(reason));

        if self.page_size == 0 {
            return fail("page size must be positive".to_string());
        }
        if self.data_page_budget == 0 {
            return fail("data page budget must be at least 1".to_string());
        }
        if self.frames_per_job() > self.physical_frames {
            return fail(format!(
                "a job needs {} frames but memory only has {}",
                self.frames_per_job(),
                self.physical_frames
            ));
        }
        if self.data_page_budget > self.virtual_pages {
            return fail(format!(
                "data page budget {} exceeds {} virtual pages",
                self.data_page_budget, self.virtual_pages
            ));
        }
        if self.locality_window == 0 || self.locality_window > self.virtual_pages {
            return fail(format!(
                "locality window must be within 1..={}, got {}",
                self.virtual_pages, self.locality_window
            ));
        }
        if self.job_count == 0 {
            return fail("at least one job is required".to_string());
        }
        Ok(())
    }
}
