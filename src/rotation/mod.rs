pub mod backup;
pub mod matcher;
pub mod policy;
pub mod reporter;
pub mod retention;
pub mod rollover;
pub mod scheduler;
pub mod timestamp;

pub use policy::{RollingPolicy, RotateOptions, RotationPolicy, RotationTarget, Trigger};
pub use reporter::{LogReporter, MemoryReporter, Report, Reporter};
pub use retention::Stage;
pub use scheduler::{log_rotate, Rotator, SchedulerRegistry};
