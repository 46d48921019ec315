pub mod address_space;
pub mod backing_store;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod io;
pub mod job;
pub mod memory;
pub mod policy;
pub mod trace;
pub mod translation;
pub mod vm_manager;

// Re-export commonly used items for convenience
pub use address_space::{AccessOutcome, AddressSpace};
pub use config::SimConfig;
pub use error::SimError;
pub use job::{Job, JobReport};
pub use memory::{FrameAllocator, FrameContent, PageId, PhysicalMemory};
pub use policy::{PolicyKind, ReplacementPolicy};
pub use translation::VirtualAddress;
pub use vm_manager::VmManager;
