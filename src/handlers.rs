use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::types::ChatAction;
use tracing::{debug, error, info, warn};

use crate::extractor::{Extractor, MediaInfo, MediaKind};
use crate::platform::{ChatPlatform, Invocation};

pub const GREETING: &str =
    "Hello! I'm Lightning, your music bot. Use /play <song name or URL> to play a song.";
pub const USAGE_HINT: &str = "Please provide a song name or URL after /play.";
pub const PROCESSING: &str = "Processing your request, please wait...";
pub const GENERIC_ERROR: &str = "An error occurred while processing your request.";

/// How a `/play` invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// No query given, only the usage hint was sent
    MissingQuery,
    Delivered(MediaKind),
    Failed,
}

/// Join argument tokens into the extractor query. Anything that is not a URL
/// becomes a search.
pub fn build_query(tokens: &[&str], search_prefix: &str) -> String {
    let joined = tokens.join(" ");
    if joined.starts_with("http") {
        joined
    } else {
        format!("{}{}", search_prefix, joined)
    }
}

/// Handle `/start`
pub async fn start(platform: &dyn ChatPlatform, invocation: &Invocation) -> Result<()> {
    platform
        .reply(invocation.chat_id, invocation.message_id, GREETING)
        .await?;
    Ok(())
}

/// Handle `/play <query>`: download the first match and send it back.
///
/// Errors are only returned for the usage hint and the status message. Once
/// the status message exists every failure is logged and turned into
/// [`GENERIC_ERROR`], and the status message is deleted on both paths.
pub async fn play(
    platform: &dyn ChatPlatform,
    extractor: Arc<dyn Extractor>,
    search_prefix: &str,
    invocation: &Invocation,
) -> Result<PlayOutcome> {
    let chat_id = invocation.chat_id;
    let tokens = invocation.tokens();

    if tokens.is_empty() {
        platform
            .reply(chat_id, invocation.message_id, USAGE_HINT)
            .await?;
        return Ok(PlayOutcome::MissingQuery);
    }

    let query = build_query(&tokens, search_prefix);
    info!(
        "Play request from user {:?} in chat {}: {}",
        invocation.user_id, chat_id.0, query
    );

    let status = platform
        .reply(chat_id, invocation.message_id, PROCESSING)
        .await?;

    if let Err(e) = platform.send_action(chat_id, ChatAction::UploadVoice).await {
        warn!("Failed to send chat action: {:#}", e);
    }

    let result = acquire_and_send(platform, extractor, &query, invocation).await;

    let (outcome, reply_result) = match result {
        Ok(kind) => (PlayOutcome::Delivered(kind), Ok(())),
        Err(e) => {
            error!("Error in play command: {:#}", e);
            let reply = platform
                .reply(chat_id, invocation.message_id, GENERIC_ERROR)
                .await
                .map(|_| ());
            (PlayOutcome::Failed, reply)
        }
    };

    if let Err(e) = platform.delete_message(chat_id, status).await {
        error!("Failed to delete status message: {:#}", e);
    }

    reply_result?;
    Ok(outcome)
}

/// Download into a fresh temporary directory and upload the result. The
/// directory and everything in it is removed when this returns.
async fn acquire_and_send(
    platform: &dyn ChatPlatform,
    extractor: Arc<dyn Extractor>,
    query: &str,
    invocation: &Invocation,
) -> Result<MediaKind> {
    let workdir = tempfile::Builder::new()
        .prefix("lightning-")
        .tempdir()
        .context("Failed to create download directory")?;

    let media = {
        let query = query.to_string();
        let dir = workdir.path().to_path_buf();
        tokio::task::spawn_blocking(move || extractor.extract(&query, &dir))
            .await
            .context("Extractor task failed")??
    };

    debug!("Downloaded '{}' to {}", media.title, media.path.display());
    send_media(platform, invocation, &media).await
}

async fn send_media(
    platform: &dyn ChatPlatform,
    invocation: &Invocation,
    media: &MediaInfo,
) -> Result<MediaKind> {
    let chat_id = invocation.chat_id;
    let kind = media.kind();

    match kind {
        MediaKind::Audio => {
            platform
                .reply(
                    chat_id,
                    invocation.message_id,
                    &format!("Sending audio: {}", media.title),
                )
                .await?;
            platform
                .send_audio(chat_id, &media.path, &media.title)
                .await?;
        }
        MediaKind::Video => {
            platform
                .reply(
                    chat_id,
                    invocation.message_id,
                    &format!("Sending video: {}", media.title),
                )
                .await?;
            platform
                .send_video(chat_id, &media.path, &media.title)
                .await?;
        }
    }

    Ok(kind)
}
