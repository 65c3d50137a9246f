//! Business logic services.

pub mod jobs;

pub use jobs::{CreatedJob, JobService, JobUpload, UploadedFile};
