//! Business logic services.

pub mod housekeeper;
pub mod logging;
pub mod pipeline;
pub mod rate_limiter;
pub mod stage;

pub use housekeeper::{Housekeeper, HousekeeperConfig, SweepReport};
pub use logging::PipelineLogger;
pub use pipeline::{PipelineDeps, TryOnPipeline};
pub use rate_limiter::SlidingWindowLimiter;
pub use stage::{PipelineError, PipelineErrorKind, PipelineStage};
