use super::request::ExportFormat;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of a successful `POST /api/stretch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub url: String,
    pub name: String,
    pub factor: f64,
    pub original_name: String,
    pub processed_at: String,
}

/// Fresh output name; never reused, even for identical requests.
pub fn generated_name(format: ExportFormat) -> String {
    format!("stretched-{}.{}", Uuid::new_v4(), format.extension())
}

/// Current UTC time as `2024-05-01T12:00:00.000Z`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
