use std::fmt;

/// Errors raised by the simulator.
///
/// Bounds violations and persistence failures never show up here: those
/// degrade locally (sentinel reads, ignored writes, swallowed I/O errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// The configuration cannot describe a runnable simulation.
    InvalidConfig(String),
    /// A fault needed a fresh frame and the allocator had none left.
    OutOfFrames { job_id: usize, page: usize },
    /// The replacement policy had no resident frame to hand back.
    NoVictimFrame { job_id: usize, page: usize },
    /// The address lies beyond the job's virtual pages.
    AddressOutOfRange { job_id: usize, address: usize },
    /// The job already gave its frames back.
    SpaceReleased { job_id: usize },
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            SimError::OutOfFrames { job_id, page } => write!(
                f,
                "job {} ran out of physical frames loading page {}",
                job_id, page
            ),
            SimError::NoVictimFrame { job_id, page } => write!(
                f,
                "job {} has no victim frame to replace for page {}",
                job_id, page
            ),
            SimError::AddressOutOfRange { job_id, address } => write!(
                f,
                "job {} accessed address {} outside its address space",
                job_id, address
            ),
            SimError::SpaceReleased { job_id } => {
                write!(f, "job {} accessed memory after releasing it", job_id)
            }
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_job_and_page() {
        let msg = SimError::OutOfFrames { job_id: 3, page: 17 }.to_string();
        assert!(msg.contains("job 3"));
        assert!(msg.contains("page 17"));
    }

    #[test]
    fn test_released_message_names_job() {
        let msg = SimError::SpaceReleased { job_id: 4 }.to_string();
        assert_eq!(msg, "job 4 accessed memory after releasing it");
    }

    #[test]
    fn test_invalid_config_message() {
        let msg = SimError::InvalidConfig("page size must be positive".into()).to_string();
        assert_eq!(msg, "invalid configuration: page size must be positive");
    }
}
