use std::sync::Arc;
use std::thread;

use log::{error, info};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::job::{Job, JobReport};
use crate::memory::PhysicalMemory;
use crate::policy::PolicyKind;

/// Owns the shared frame pool for a session and launches jobs against it.
pub struct VmManager {
    memory: Arc<PhysicalMemory>,
    config: Arc<SimConfig>,
}

impl VmManager {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(VmManager {
            memory: Arc::new(PhysicalMemory::new(config.physical_frames, config.page_size)),
            config: Arc::new(config),
        })
    }

    pub fn memory(&self) -> &Arc<PhysicalMemory> {
        &self.memory
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Start every job on its own thread and wait for all of them.
    ///
    /// Reports come back in job-id order. A job whose thread panicked is
    /// logged and left out.
    pub fn run(&self, policy: PolicyKind) -> Vec<JobReport> {
        info!(
            "Running {} jobs with {} replacement over {} frames",
            self.config.job_count, policy, self.config.physical_frames
        );

        let mut handles = Vec::with_capacity(self.config.job_count);
        for id in 0..self.config.job_count {
            let job = Job::new(id, Arc::clone(&self.memory), policy, Arc::clone(&self.config));
            match thread::Builder::new().name(format!("job-{}", id)).spawn(move || job.run()) {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => error!("Failed to start job {}: {}", id, e),
            }
        }

        handles
            .into_iter()
            .filter_map(|(id, handle)| match handle.join() {
                Ok(report) => Some(report),
                Err(_) => {
                    error!("Job {} panicked", id);
                    None
                }
            })
            .collect()
    }
}

/// Mean fault rate across reports, 0 when there are none.
pub fn mean_fault_rate(reports: &[JobReport]) -> f64 {
    if reports.is_empty() {
        return 0.0;
    }
    reports.iter().map(JobReport::fault_rate).sum::<f64>() / reports.len() as f64
}
