//! Stretch Relay - video transformation relay service
//!
//! Hexagonal Architecture:
//! - domain/: Request validation, results and staged files
//! - ports/: Provider and object store traits
//! - adapters/: Cloudinary, local ffmpeg, storage backends and the HTTP surface
//! - application/: The relay pipeline and its retry policy
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use application::RelayService;
pub use config::RelayConfig;
pub use error::RelayError;
