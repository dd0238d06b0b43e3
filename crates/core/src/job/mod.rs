//! Jobs: the unit of submitted work and its durable record.

mod input;
mod sqlite_store;
mod store;
mod types;

pub use input::{
    is_plain_name, placeholders, render_placeholders, FileSet, InputLocation, JobInput,
    ValidationError, SINGLE_INPUT_KEY, SINGLE_OUTPUT_KEY,
};
pub use sqlite_store::SqliteJobStore;
pub use store::{CasOutcome, CreateJobRequest, JobFilter, JobStore, JobStoreError, JobUpdate};
pub use types::{FailureCause, Job, JobResult, JobState, OutputRef, StoredObject};
