use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::config::DownloaderConfig;

/// Extensions sent to the chat as audio; everything else goes out as video.
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "m4a", "webm", "aac", "ogg"];

/// How a downloaded file is delivered to the chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// A single downloaded item
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub title: String,
    pub path: PathBuf,
}

impl MediaInfo {
    /// Lower-cased file extension without the dot, empty if the file has none.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default()
    }

    pub fn kind(&self) -> MediaKind {
        if AUDIO_EXTENSIONS.contains(&self.extension().as_str()) {
            MediaKind::Audio
        } else {
            MediaKind::Video
        }
    }
}

/// Resolves a query or URL to a media file and downloads it into `output_dir`.
///
/// Implementations block the calling thread for the whole download, so async
/// callers must run them on the blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    fn extract(&self, query: &str, output_dir: &Path) -> Result<MediaInfo>;
}

/// Extractor backed by the `yt-dlp` executable
pub struct YtDlp {
    binary: String,
    format: String,
    output_template: String,
}

impl YtDlp {
    pub fn new(config: &DownloaderConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            format: config.format.clone(),
            output_template: config.output_template.clone(),
        }
    }

    fn command_args(&self, query: &str, output_dir: &Path) -> Vec<String> {
        vec![
            "--format".to_string(),
            self.format.clone(),
            "--output".to_string(),
            output_dir
                .join(&self.output_template)
                .to_string_lossy()
                .into_owned(),
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            // Download for real but still print the info record
            "--no-simulate".to_string(),
            "--dump-single-json".to_string(),
            "--".to_string(),
            query.to_string(),
        ]
    }

    /// Version string reported by the binary, used as an availability probe.
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute {}", self.binary))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} --version exited with {}",
                self.binary,
                output.status
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Extractor for YtDlp {
    fn extract(&self, query: &str, output_dir: &Path) -> Result<MediaInfo> {
        let args = self.command_args(query, output_dir);
        info!("Running {} for query: {}", self.binary, query);
        debug!("{} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            );
        }

        let info: InfoRecord = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Failed to parse {} output", self.binary))?;

        info.into_media(output_dir)
    }
}

/// The subset of yt-dlp's info JSON needed to locate the downloaded file
#[derive(Debug, Deserialize)]
struct InfoRecord {
    title: Option<String>,
    ext: Option<String>,
    filename: Option<PathBuf>,
    #[serde(rename = "_filename")]
    legacy_filename: Option<PathBuf>,
    #[serde(default)]
    requested_downloads: Vec<RequestedDownload>,
    entries: Option<Vec<InfoRecord>>,
}

#[derive(Debug, Deserialize)]
struct RequestedDownload {
    filepath: Option<PathBuf>,
}

impl InfoRecord {
    /// Collapse a search result or playlist to its first entry and resolve
    /// where the file landed.
    fn into_media(self, output_dir: &Path) -> Result<MediaInfo> {
        if let Some(entries) = self.entries {
            let first = entries
                .into_iter()
                .next()
                .context("Extractor returned no results")?;
            return first.into_media(output_dir);
        }

        let title = self
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Unknown Title".to_string());

        let path = self
            .requested_downloads
            .into_iter()
            .find_map(|d| d.filepath)
            .or(self.filename)
            .or(self.legacy_filename)
            .unwrap_or_else(|| {
                let ext = self.ext.as_deref().unwrap_or("unknown");
                output_dir.join(format!("{}.{}", title, ext))
            });

        Ok(MediaInfo { title, path })
    }
}
