use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::address_space::AddressSpace;
use crate::config::SimConfig;
use crate::event::Event;
use crate::memory::PhysicalMemory;
use crate::policy::PolicyKind;

/// What a finished job reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: usize,
    pub policy: PolicyKind,
    pub accesses: usize,
    pub faults: usize,
    /// Accesses that faulted and could not be served.
    pub failed_accesses: usize,
}

impl JobReport {
    pub fn fault_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.faults as f64 / self.accesses as f64
        }
    }
}

/// One job: build its address space, replay the trace, report, release.
pub struct Job {
    id: usize,
    memory: Arc<PhysicalMemory>,
    policy: PolicyKind,
    config: Arc<SimConfig>,
}

impl Job {
    pub fn new(id: usize, memory: Arc<PhysicalMemory>, policy: PolicyKind, config: Arc<SimConfig>) -> Self {
        Job { id, memory, policy, config }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn run(self) -> JobReport {
        let mut space = AddressSpace::new(self.id, Arc::clone(&self.memory), self.policy, &self.config);
        self.execute(&mut space)
    }

    /// Run the job over an already built address space.
    pub fn execute(&self, space: &mut AddressSpace) -> JobReport {
        space.allocate();
        let failed_accesses = self.replay(space);

        let report = JobReport {
            job_id: self.id,
            policy: self.policy,
            accesses: space.trace().len(),
            faults: space.fault_count(),
            failed_accesses,
        };
        Event::FaultRate { job_id: self.id, rate: report.fault_rate() }.emit();

        let frames = space.release();
        Event::Released { job_id: self.id, frames }.emit();
        report
    }

    /// Replay the trace in order. Failed accesses are logged and skipped.
    fn replay(&self, space: &mut AddressSpace) -> usize {
        let mut failed = 0;
        for index in 0..space.trace().len() {
            let address = space.trace()[index];
            if let Err(error) = space.access(address) {
                failed += 1;
                Event::AccessFailed { job_id: self.id, address, error }.emit();
            }
            self.pause();
        }
        failed
    }

    fn pause(&self) {
        let max = self.config.max_access_delay;
        if max.is_zero() {
            return;
        }
        thread::sleep(rand::thread_rng().gen_range(Duration::ZERO..max));
    }
}
