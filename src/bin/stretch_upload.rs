//! Upload a video to a running relay and print the stretched result.

use clap::Parser;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

#[derive(Parser)]
#[command(name = "stretch-upload")]
#[command(about = "Send a video to the stretch relay")]
#[command(version)]
struct Args {
    /// Video file to upload
    file: PathBuf,

    /// Vertical stretch factor (0.1 to 5.0)
    #[arg(long)]
    factor: Option<f64>,

    /// Output container (mp4, mov, webm)
    #[arg(long)]
    format: Option<String>,

    /// Start of the stretch axis as JSON, e.g. '{"x":0.5,"y":0}'
    #[arg(long)]
    axis_start: Option<String>,

    /// End of the stretch axis as JSON
    #[arg(long)]
    axis_end: Option<String>,

    /// Relay API base URL
    #[arg(long, default_value = "http://localhost:3000/api")]
    url: String,

    /// Session token sent as a bearer credential
    #[arg(long)]
    token: Option<String>,
}

/// Media type for the upload, from the file extension.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

fn endpoint(base: &str) -> String {
    format!("{}/stretch", base.trim_end_matches('/'))
}

async fn build_form(args: &Args) -> Result<Form, Box<dyn std::error::Error>> {
    let file = tokio::fs::File::open(&args.file).await?;
    let len = file.metadata().await?.len();
    let file_name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("video")
        .to_string();

    let video = Part::stream_with_length(reqwest::Body::wrap_stream(ReaderStream::new(file)), len)
        .file_name(file_name)
        .mime_str(guess_content_type(&args.file))?;

    let mut form = Form::new().part("video", video);
    if let Some(factor) = args.factor {
        form = form.text("factor", factor.to_string());
    }
    if let Some(format) = &args.format {
        form = form.text("exportFormat", format.clone());
    }
    if let Some(axis) = &args.axis_start {
        form = form.text("axisStart", axis.clone());
    }
    if let Some(axis) = &args.axis_end {
        form = form.text("axisEnd", axis.clone());
    }
    Ok(form)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let form = build_form(&args).await?;
    let mut request = reqwest::Client::new()
        .post(endpoint(&args.url))
        .multipart(form);
    if let Some(token) = &args.token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED {
        eprintln!("Session expired. Please sign in again and retry with a fresh --token.");
        std::process::exit(1);
    }
    if !status.is_success() {
        eprintln!(
            "Upload failed ({}): {}",
            status,
            body.get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
