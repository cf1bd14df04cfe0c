//! Media generation pipeline: asset storage, input staging, encoding jobs and
//! the worker pool that runs them.

pub mod assets;
pub mod job;
pub mod pool;
pub mod resolver;

pub use assets::{AssetStore, PendingInput};
pub use job::{EncodingJob, JobRuntime, JobState};
pub use pool::{JobHandle, JobPool};
pub use resolver::{ImageSource, InputResolver};
