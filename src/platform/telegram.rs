use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, InputFile, MessageId, ReplyParameters};

use crate::platform::{ChatPlatform, Invocation};

/// [`ChatPlatform`] over the Telegram Bot API
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Build an invocation from a command message and its parsed argument text.
pub fn invocation_from_message(msg: &Message, args: String) -> Invocation {
    Invocation {
        chat_id: msg.chat.id,
        message_id: msg.id,
        user_id: msg.from.as_ref().map(|user| user.id.0),
        args,
    }
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn reply(&self, chat_id: ChatId, to: MessageId, text: &str) -> Result<MessageId> {
        let sent = self
            .bot
            .send_message(chat_id, text)
            .reply_parameters(ReplyParameters::new(to))
            .await
            .context("Failed to send reply")?;
        Ok(sent.id)
    }

    async fn send_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        self.bot
            .send_chat_action(chat_id, action)
            .await
            .context("Failed to send chat action")?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.bot
            .delete_message(chat_id, message_id)
            .await
            .with_context(|| format!("Failed to delete message {}", message_id.0))?;
        Ok(())
    }

    async fn send_audio(&self, chat_id: ChatId, path: &Path, title: &str) -> Result<()> {
        self.bot
            .send_audio(chat_id, InputFile::file(path.to_path_buf()))
            .title(title)
            .await
            .with_context(|| format!("Failed to upload audio {}", path.display()))?;
        Ok(())
    }

    async fn send_video(&self, chat_id: ChatId, path: &Path, caption: &str) -> Result<()> {
        self.bot
            .send_video(chat_id, InputFile::file(path.to_path_buf()))
            .caption(caption)
            .await
            .with_context(|| format!("Failed to upload video {}", path.display()))?;
        Ok(())
    }
}
