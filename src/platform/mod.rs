pub mod telegram;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::types::{ChatAction, ChatId, MessageId};

/// A command received from a chat, with its arguments already split off
#[derive(Debug, Clone)]
pub struct Invocation {
    pub chat_id: ChatId,
    /// The message carrying the command, replies are threaded under it
    pub message_id: MessageId,
    pub user_id: Option<u64>,
    /// Everything after the command token
    pub args: String,
}

impl Invocation {
    /// Whitespace-separated argument tokens
    pub fn tokens(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }
}

/// Outbound chat operations the command handlers rely on.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Reply to `to`, returning the id of the sent message.
    async fn reply(&self, chat_id: ChatId, to: MessageId, text: &str) -> Result<MessageId>;

    /// Show a presence indicator such as "sending audio".
    async fn send_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    async fn send_audio(&self, chat_id: ChatId, path: &Path, title: &str) -> Result<()>;

    async fn send_video(&self, chat_id: ChatId, path: &Path, caption: &str) -> Result<()>;
}
