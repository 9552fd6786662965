//! Configuration loaded from the environment (and `.env` when present).

use crate::application::retry::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default ceiling for a single video upload: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Which transformation provider handles stretch jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Cloudinary,
    /// A local `ffmpeg` executable, publishing to the configured object store.
    Ffmpeg,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloudinary" => Ok(ProviderKind::Cloudinary),
            "ffmpeg" | "local" => Ok(ProviderKind::Ffmpeg),
            other => Err(format!("unknown transform provider '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Fs,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fs" | "local" => Ok(StorageBackend::Fs),
            "supabase" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Credentials and routing for the Cloudinary upload API.
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// API origin, overridable for tests.
    pub api_base: String,
    /// Folder the transformed assets are filed under.
    pub folder: String,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            api_base: String::from("https://api.cloudinary.com"),
            folder: String::from("video-stretch"),
        }
    }
}

impl CloudinaryConfig {
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct LocalTranscodeConfig {
    pub ffmpeg_bin: String,
}

impl Default for LocalTranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: String::from("ffmpeg"),
        }
    }
}

/// Where the local provider publishes its renders.
#[derive(Clone, Debug, Default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend.
    pub output_dir: PathBuf,
    /// Public prefix for filesystem objects; when unset, `file://` URLs are returned.
    pub public_base_url: Option<String>,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub supabase_bucket: String,
}

/// Configuration for the relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// `production` hides error details from responses
    pub environment: String,
    /// Directory uploads are staged in while a request is in flight
    pub staging_dir: PathBuf,
    pub max_upload_bytes: u64,
    /// Allowed CORS origin; any origin is mirrored when unset
    pub frontend_url: Option<String>,
    pub provider: ProviderKind,
    pub cloudinary: CloudinaryConfig,
    pub local: LocalTranscodeConfig,
    pub storage: StorageConfig,
    pub retry: RetryPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: String::from("127.0.0.1"),
            port: String::from("3000"),
            environment: String::from("development"),
            staging_dir: env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            frontend_url: None,
            provider: ProviderKind::default(),
            cloudinary: CloudinaryConfig::default(),
            local: LocalTranscodeConfig::default(),
            storage: StorageConfig {
                output_dir: PathBuf::from("./output"),
                supabase_bucket: String::from("processed-videos"),
                ..StorageConfig::default()
            },
            retry: RetryPolicy::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let addr = var("ADDR").unwrap_or(defaults.addr);
        let port = var("PORT").unwrap_or(defaults.port);

        let retry = RetryPolicy {
            max_retries: parse_var(var("PROVIDER_MAX_RETRIES")).unwrap_or(defaults.retry.max_retries),
            attempt_timeout: parse_var(var("PROVIDER_TIMEOUT_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry.attempt_timeout),
            initial_backoff: parse_var(var("PROVIDER_BACKOFF_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.initial_backoff),
            ..defaults.retry
        };

        Self {
            environment: var("APP_ENV").unwrap_or(defaults.environment),
            staging_dir: var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            max_upload_bytes: parse_var(var("MAX_UPLOAD_BYTES")).unwrap_or(defaults.max_upload_bytes),
            frontend_url: var("FRONTEND_URL"),
            provider: parse_var(var("TRANSFORM_PROVIDER")).unwrap_or(defaults.provider),
            cloudinary: CloudinaryConfig {
                cloud_name: var("CLOUDINARY_CLOUD_NAME").unwrap_or_default(),
                api_key: var("CLOUDINARY_API_KEY").unwrap_or_default(),
                api_secret: var("CLOUDINARY_API_SECRET").unwrap_or_default(),
                api_base: var("CLOUDINARY_API_BASE").unwrap_or(defaults.cloudinary.api_base),
                folder: var("CLOUDINARY_FOLDER").unwrap_or(defaults.cloudinary.folder),
            },
            local: LocalTranscodeConfig {
                ffmpeg_bin: var("FFMPEG_BIN").unwrap_or(defaults.local.ffmpeg_bin),
            },
            storage: StorageConfig {
                backend: parse_var(var("STORAGE_BACKEND")).unwrap_or(defaults.storage.backend),
                output_dir: var("OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.output_dir),
                public_base_url: var("PUBLIC_BASE_URL"),
                supabase_url: var("SUPABASE_URL").unwrap_or_default(),
                supabase_service_key: var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),
                supabase_bucket: var("SUPABASE_BUCKET").unwrap_or(defaults.storage.supabase_bucket),
            },
            retry,
            addr,
            port,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn parse_var<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_lookup(lookup(&[]));

        assert_eq!(config.addr, "127.0.0.1");
        assert_eq!(config.port, "3000");
        assert_eq!(config.environment, "development");
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.provider, ProviderKind::Cloudinary);
        assert_eq!(config.cloudinary.folder, "video-stretch");
        assert!(!config.cloudinary.is_configured());
        assert_eq!(config.storage.supabase_bucket, "processed-videos");
        assert_eq!(config.storage.public_base_url, None);
        assert_eq!(config.retry.max_retries, 2);
        assert!(!config.is_production());
    }

    #[test]
    fn test_overrides() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("APP_ENV", "production"),
            ("MAX_UPLOAD_BYTES", "2048"),
            ("TRANSFORM_PROVIDER", "ffmpeg"),
            ("STORAGE_BACKEND", "supabase"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
            ("PROVIDER_TIMEOUT_SECS", "30"),
            ("PROVIDER_MAX_RETRIES", "0"),
            ("FRONTEND_URL", "https://app.example"),
            ("PUBLIC_BASE_URL", "https://relay.example/media"),
        ]));

        assert_eq!(config.port, "8080");
        assert!(config.is_production());
        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(config.provider, ProviderKind::Ffmpeg);
        assert_eq!(config.storage.backend, StorageBackend::Supabase);
        assert!(config.cloudinary.is_configured());
        assert_eq!(config.retry.attempt_timeout, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.frontend_url.as_deref(), Some("https://app.example"));
        assert_eq!(
            config.storage.public_base_url.as_deref(),
            Some("https://relay.example/media")
        );
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("MAX_UPLOAD_BYTES", "lots"),
            ("TRANSFORM_PROVIDER", "magic"),
            ("ADDR", "   "),
        ]));

        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.provider, ProviderKind::Cloudinary);
        assert_eq!(config.addr, "127.0.0.1");
    }
}
