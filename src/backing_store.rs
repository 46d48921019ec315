//! Per-job disk-resident page storage.
//!
//! The in-memory copy is authoritative; the file is rewritten in full after
//! every write and any I/O failure is only logged.

use std::path::{Path, PathBuf};

use log::debug;

use crate::constants::{STORE_FILE_PREFIX, STORE_FILE_SUFFIX};
use crate::io;
use crate::memory::PageId;

pub struct BackingStore {
    job_id: usize,
    path: PathBuf,
    pages: Vec<PageId>,
}

impl BackingStore {
    /// Create the store for `job_id` with `virtual_pages` slots seeded as
    /// `(job_id, i)`, and persist it immediately.
    pub fn new<P: AsRef<Path>>(dir: P, job_id: usize, virtual_pages: usize) -> Self {
        let store = BackingStore {
            job_id,
            path: dir.as_ref().join(Self::file_name(job_id)),
            pages: (0..virtual_pages).map(|page| PageId::new(job_id, page)).collect(),
        };
        store.persist();
        store
    }

    pub fn file_name(job_id: usize) -> String {
        format!("{}{}{}", STORE_FILE_PREFIX, job_id, STORE_FILE_SUFFIX)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn job_id(&self) -> usize {
        self.job_id
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// `None` for pages outside the store.
    pub fn read_page(&self, page: usize) -> Option<PageId> {
        self.pages.get(page).copied()
    }

    /// Replace a page's content and rewrite the file. Out-of-range pages are
    /// ignored.
    pub fn write_page(&mut self, page: usize, content: PageId) {
        if let Some(slot) = self.pages.get_mut(page) {
            *slot = content;
            self.persist();
        }
    }

    /// Re-read the file over the in-memory pages. A missing or malformed
    /// file leaves them as they are.
    pub fn reload(&mut self) {
        match io::read_pages(&self.path, self.pages.len()) {
            Ok(pages) => self.pages = pages,
            Err(e) => debug!("job {}: keeping in-memory pages: {}", self.job_id, e),
        }
    }

    fn persist(&self) {
        if let Err(e) = io::write_pages(&self.path, &self.pages) {
            debug!("job {}: {}: {}", self.job_id, self.path.display(), e);
        }
    }
}
