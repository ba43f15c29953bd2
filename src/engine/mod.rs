//! Generation job lifecycle engine.
//!
//! One generic engine serves every [`JobKind`](crate::models::job::JobKind);
//! kinds differ only by route segment and [`CompletionRule`](crate::models::job::CompletionRule).

pub mod error;
pub mod latch;
pub mod launcher;
pub mod poller;
pub mod resume;
pub mod session;
pub mod store;

pub use error::{PollError, ResumptionError, TrackerError};
pub use latch::{GuardLatch, LatchGuard};
pub use launcher::JobLauncher;
pub use poller::{JobPoller, PollSettings};
pub use resume::ResumptionScanner;
pub use session::{GenerationTracker, KindSession};
pub use store::{JobLifecycleStore, LifecycleState};
