pub mod conflict;
pub mod locks;
pub mod scheduling;

pub use conflict::ConflictDetector;
pub use scheduling::{SchedulingPolicy, SchedulingService};
