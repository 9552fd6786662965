//! HTTP inbound adapter: routes, multipart intake and error envelopes.

pub mod error;
pub mod routes;
pub mod upload;

pub use routes::{router, AppState};
pub use upload::UploadLimits;
