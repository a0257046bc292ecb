//! Cardgen client library
//!
//! Daily quota tracking, quota-gated submission with retries, and the image
//! preparation around it. The `cardgen` binary is a thin front end over
//! these modules.

pub mod config;
pub mod download;
pub mod endpoint;
pub mod preprocess;
pub mod quota;
pub mod storage;
pub mod submission;

pub use endpoint::{EndpointError, GenerationEndpoint, HttpGenerationEndpoint};
pub use quota::{Clock, FixedClock, LocalClock, QuotaRecord, QuotaTracker};
pub use storage::{FileStorage, MemoryStorage, QuotaStorage, StorageError};
pub use submission::{
    GeneratedCard, RetryPolicy, Sleeper, SubmissionController, SubmissionError,
    SubmissionOutcome, SubmissionRequest, TokioSleeper,
};
