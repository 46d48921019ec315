use std::fmt;

use log::{debug, info, warn};

use crate::error::SimError;
use crate::memory::{FrameContent, PageId};

/// Something worth narrating while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    WaitingForMemory { job_id: usize, needed: usize, free: usize },
    Allocated { job_id: usize, frames: usize },
    PageFault { job_id: usize, address: usize },
    PageReplaced { frame: usize, old: FrameContent, new: PageId },
    Access { job_id: usize, address: usize, content: FrameContent, physical_address: usize },
    AccessFailed { job_id: usize, address: usize, error: SimError },
    FaultRate { job_id: usize, rate: f64 },
    Released { job_id: usize, frames: usize },
}

impl Event {
    /// Log the event. Per-access chatter goes to `debug`.
    pub fn emit(&self) {
        match self {
            Event::PageFault { .. } | Event::PageReplaced { .. } | Event::Access { .. } => {
                debug!("{}", self)
            }
            Event::AccessFailed { .. } => warn!("{}", self),
            _ => info!("{}", self),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::WaitingForMemory { job_id, needed, free } => write!(
                f,
                "Job {} is waiting for memory ({} frames needed, {} free)",
                job_id, needed, free
            ),
            Event::Allocated { job_id, frames } => {
                write!(f, "Job {} has been allocated {} frames", job_id, frames)
            }
            Event::PageFault { job_id, address } => {
                write!(f, "Page fault when job {} accesses address {}", job_id, address)
            }
            Event::PageReplaced { frame, old, new } => {
                write!(f, "Page {} in frame {} is replaced by page {}", old, frame, new)
            }
            Event::Access { job_id, address, content, physical_address } => write!(
                f,
                "Job {} accesses address {}, page {}, at physical address {}",
                job_id, address, content, physical_address
            ),
            Event::AccessFailed { job_id, address, error } => {
                write!(f, "Job {} failed to access address {}: {}", job_id, address, error)
            }
            Event::FaultRate { job_id, rate } => {
                write!(f, "The page fault rate of job {} is {:.4}", job_id, rate)
            }
            Event::Released { job_id, frames } => {
                write!(f, "Job {} has freed {} frames", job_id, frames)
            }
        }
    }
}
