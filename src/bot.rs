use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::Me;
use teloxide::utils::command::{BotCommands, ParseError};
use tracing::{info, warn};

use crate::config::Config;
use crate::extractor::Extractor;
use crate::handlers::{self, PlayOutcome};
use crate::platform::telegram::{invocation_from_message, TelegramPlatform};

/// Commands understood by the bot
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Lightning commands:")]
pub enum Command {
    #[command(description = "show the greeting")]
    Start,
    #[command(description = "play a song by name or URL", parse_with = raw_args)]
    Play(String),
}

/// Hand the argument text over untouched, including when it is empty, so the
/// play handler can answer with its usage hint.
fn raw_args(input: String) -> Result<(String,), ParseError> {
    Ok((input,))
}

/// Parse a command message. Telegram clients may put a newline or tab right
/// after the command token, while `BotCommands` only splits on a space, so
/// the first whitespace run is collapsed before parsing.
pub fn parse_command(text: &str, bot_name: &str) -> Option<Command> {
    let text = text.trim_start();
    let normalized = match text.split_once(char::is_whitespace) {
        Some((token, rest)) if !rest.trim().is_empty() => {
            format!("{} {}", token, rest.trim_start())
        }
        Some((token, _)) => token.to_string(),
        None => text.to_string(),
    };
    Command::parse(&normalized, bot_name).ok()
}

/// Shared application state
pub struct AppState {
    config: Config,
    extractor: Arc<dyn Extractor>,
}

impl AppState {
    pub fn new(config: Config, extractor: Arc<dyn Extractor>) -> Self {
        Self { config, extractor }
    }
}

/// Start the Telegram bot and poll until shut down
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bot = Bot::new(&state.config.telegram.bot_token);

    info!("Starting Telegram bot...");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let gate = state.clone();
    let handler = Update::filter_message()
        .filter(move |msg: Message| {
            gate.config
                .is_user_allowed(msg.from.as_ref().map(|user| user.id.0))
        })
        .filter_map(|msg: Message, me: Me| parse_command(msg.text()?, me.username()))
        .endpoint(handle_command);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("bot"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: Arc<AppState>) -> Result<()> {
    let platform = TelegramPlatform::new(bot);

    match cmd {
        Command::Start => {
            info!("Start from chat {}", msg.chat.id.0);
            let invocation = invocation_from_message(&msg, String::new());
            handlers::start(&platform, &invocation).await?;
        }
        Command::Play(args) => {
            let invocation = invocation_from_message(&msg, args);
            let outcome = handlers::play(
                &platform,
                state.extractor.clone(),
                &state.config.downloader.search_prefix,
                &invocation,
            )
            .await?;

            match outcome {
                PlayOutcome::Delivered(kind) => {
                    info!("Delivered {:?} to chat {}", kind, invocation.chat_id.0)
                }
                PlayOutcome::Failed => {
                    warn!("Play request failed in chat {}", invocation.chat_id.0)
                }
                PlayOutcome::MissingQuery => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_play_with_query() {
        let cmd = Command::parse("/play never gonna give you up", "lightning_bot").unwrap();
        assert_eq!(cmd, Command::Play("never gonna give you up".to_string()));
    }

    #[test]
    fn parses_play_addressed_to_bot() {
        let cmd = Command::parse("/play@lightning_bot https://example.com/video", "lightning_bot")
            .unwrap();
        assert_eq!(cmd, Command::Play("https://example.com/video".to_string()));
    }

    #[test]
    fn parses_play_without_arguments() {
        let cmd = Command::parse("/play", "lightning_bot").unwrap();
        assert_eq!(cmd, Command::Play(String::new()));
    }

    #[test]
    fn parses_play_after_newline_or_tab() {
        assert_eq!(
            parse_command("/play\nnever gonna", "lightning_bot"),
            Some(Command::Play("never gonna".to_string()))
        );
        assert_eq!(
            parse_command("/play\tnever gonna", "lightning_bot"),
            Some(Command::Play("never gonna".to_string()))
        );
        assert_eq!(
            parse_command("/play@lightning_bot\n\n https://example.com/video", "lightning_bot"),
            Some(Command::Play("https://example.com/video".to_string()))
        );
    }

    #[test]
    fn parse_command_keeps_usage_path_and_rejects_unknown() {
        assert_eq!(
            parse_command("/play\n", "lightning_bot"),
            Some(Command::Play(String::new()))
        );
        assert_eq!(
            parse_command("/start", "lightning_bot"),
            Some(Command::Start)
        );
        assert_eq!(
            parse_command("/play never gonna give you up", "lightning_bot"),
            Some(Command::Play("never gonna give you up".to_string()))
        );
        assert_eq!(parse_command("/stop\nnow", "lightning_bot"), None);
        assert_eq!(parse_command("hello there", "lightning_bot"), None);
    }

    #[test]
    fn parses_start_and_rejects_unknown() {
        assert_eq!(
            Command::parse("/start", "lightning_bot").unwrap(),
            Command::Start
        );
        assert!(Command::parse("/stop", "lightning_bot").is_err());
    }

    #[test]
    fn command_menu_lists_both_commands() {
        let names: Vec<String> = Command::bot_commands()
            .into_iter()
            .map(|c| c.command.trim_start_matches('/').to_string())
            .collect();
        assert_eq!(names, vec!["start".to_string(), "play".to_string()]);
    }
}
