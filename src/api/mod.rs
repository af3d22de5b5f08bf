pub mod client;
pub mod error;
pub mod types;

pub use client::{HumanizeApi, HumanizeClient};
pub use error::ApiError;
pub use types::{
    DocumentRequest, DocumentResponse, HumanizationRequest, JobHandle, JobStatus, Purpose,
    Readability, Strength, SubmitRequest, SubmitResponse,
};
