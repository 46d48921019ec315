//! Paging simulator - Main Entry Point
//!
//! Runs a batch of concurrent jobs over a small shared pool of physical
//! frames and reports each job's page fault rate.
//!
//! Usage: paging-sim [OPTIONS]
//!
//! Without `--policy` the replacement strategy is read from stdin.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use paging_sim::constants::*;
use paging_sim::vm_manager::mean_fault_rate;
use paging_sim::{PolicyKind, SimConfig, VmManager};

/// Command-line configuration
#[derive(Parser, Debug)]
#[clap(version, about = "Demand-paging simulator with FIFO and LRU replacement", long_about = None)]
struct Cli {
    /// Replacement policy: FIFO, LRU, or anything else for direct allocation
    #[clap(short, long)]
    policy: Option<String>,

    /// Number of concurrently running jobs
    #[clap(long, default_value_t = JOB_COUNT)]
    jobs: usize,

    /// Accesses per job
    #[clap(long, default_value_t = ACCESS_COUNT)]
    accesses: usize,

    /// Resident data pages per job
    #[clap(long, default_value_t = DATA_PAGE_BUDGET)]
    budget: usize,

    /// Physical frames in the shared pool
    #[clap(long, default_value_t = PHYSICAL_FRAMES)]
    frames: usize,

    #[clap(long, default_value_t = PAGE_SIZE)]
    page_size: usize,

    /// Virtual pages per job
    #[clap(long, default_value_t = VIRTUAL_PAGES)]
    virtual_pages: usize,

    /// Pages the access trace draws from
    #[clap(long, default_value_t = LOCALITY_WINDOW)]
    locality_window: usize,

    /// Upper bound of the random pause after each access
    #[clap(long, default_value_t = MAX_ACCESS_DELAY_MS)]
    max_delay_ms: u64,

    /// Directory for the per-job backing files
    #[clap(long, default_value = ".")]
    store_dir: PathBuf,

    /// Seed for reproducible traces
    #[clap(long)]
    seed: Option<u64>,

    /// Print every fault, replacement and access
    #[clap(short, long)]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> SimConfig {
        SimConfig {
            page_size: self.page_size,
            physical_frames: self.frames,
            virtual_pages: self.virtual_pages,
            data_page_budget: self.budget,
            job_count: self.jobs,
            access_count: self.accesses,
            max_access_delay: Duration::from_millis(self.max_delay_ms),
            locality_window: self.locality_window,
            store_dir: self.store_dir.clone(),
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let policy = match &cli.policy {
        Some(name) => PolicyKind::from_name(name),
        None => prompt_policy()?,
    };

    let manager = VmManager::new(cli.to_config()).context("cannot start simulation")?;
    let reports = manager.run(policy);

    println!("{:>5} {:>9} {:>7} {:>7} {:>10}", "job", "accesses", "faults", "failed", "fault rate");
    for report in &reports {
        println!(
            "{:>5} {:>9} {:>7} {:>7} {:>10.4}",
            report.job_id,
            report.accesses,
            report.faults,
            report.failed_accesses,
            report.fault_rate()
        );
    }
    println!("Mean fault rate ({}): {:.4}", policy, mean_fault_rate(&reports));

    Ok(())
}

fn prompt_policy() -> Result<PolicyKind> {
    print!("Replacement policy (FIFO or LRU): ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read policy name")?;
    Ok(PolicyKind::from_name(&line))
}
