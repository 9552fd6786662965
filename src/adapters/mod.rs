//! Adapters - Concrete implementations of ports.

pub mod cloudinary;
pub mod http;
pub mod local;
pub mod supabase;

use crate::config::{ProviderKind, RelayConfig, StorageBackend};
use crate::ports::provider::{ProviderError, TransformProvider};
use crate::ports::storage::{ObjectStore, StorageError};
use tracing::{info, warn};

/// Provider chosen at startup.
pub type DynProvider = Box<dyn TransformProvider>;

/// Build the provider selected by `TRANSFORM_PROVIDER`.
pub fn build_provider(config: &RelayConfig) -> Result<DynProvider, ProviderError> {
    match config.provider {
        ProviderKind::Cloudinary => {
            if !config.cloudinary.is_configured() {
                warn!("Cloudinary credentials missing; stretch requests will fail");
            }
            info!(cloud = %config.cloudinary.cloud_name, "using cloudinary provider");
            Ok(Box::new(cloudinary::CloudinaryProvider::new(
                config.cloudinary.clone(),
            )?))
        }
        ProviderKind::Ffmpeg => {
            let store = build_store(config)?;
            info!(ffmpeg = %config.local.ffmpeg_bin, "using local ffmpeg provider");
            Ok(Box::new(local::LocalTranscodeProvider::new(
                local::FfmpegExecutor::new(config.local.ffmpeg_bin.clone()),
                store,
                config.staging_dir.clone(),
            )))
        }
    }
}

fn build_store(config: &RelayConfig) -> Result<Box<dyn ObjectStore>, StorageError> {
    let storage = &config.storage;
    Ok(match storage.backend {
        StorageBackend::Fs => Box::new(local::FsObjectStore::new(
            storage.output_dir.clone(),
            storage.public_base_url.clone(),
        )),
        StorageBackend::Supabase => Box::new(supabase::SupabaseStore::new(
            &storage.supabase_url,
            &storage.supabase_service_key,
            &storage.supabase_bucket,
        )?),
    })
}
