//! Local adapters: filesystem object store and the ffmpeg provider.

pub mod fs;
pub mod transcode;

pub use fs::FsObjectStore;
pub use transcode::{FfmpegExecutor, LocalTranscodeProvider, TranscodeExecutor};
