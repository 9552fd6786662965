//! Domain layer - request model, validation and transient staging.

pub mod request;
pub mod result;
pub mod transient;

pub use request::{validate, RawUpload, StagedUpload, TransformParams, TransformRequest};
pub use result::TransformResult;
pub use transient::TransientFile;
