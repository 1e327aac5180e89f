use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ReplyParameters};
use tracing::{info, warn};

use crate::router::{InboundMessage, Messenger, Reply, Router};

/// Telegram rejects messages above 4096 characters; stay below it in bytes.
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's message size limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Sends replies through the Bot API.
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn reply(&self, to: &InboundMessage, reply: Reply) -> Result<()> {
        let quoted = if reply.quote { to.message_id } else { None };
        for chunk in split_message(&reply.text, MAX_MESSAGE_LEN) {
            let mut request = self.bot.send_message(ChatId(to.chat_id), chunk);
            if let Some(id) = quoted {
                request = request.reply_parameters(ReplyParameters::new(MessageId(id)));
            }
            request.await?;
        }
        Ok(())
    }
}

/// Look up the bot's own username so `/command@other_bot` is not answered.
pub async fn bot_username(bot: &Bot) -> Option<String> {
    match bot.get_me().await {
        Ok(me) => me.user.username.clone(),
        Err(e) => {
            warn!("Could not fetch bot info: {}", e);
            None
        }
    }
}

/// Run the Telegram long-polling loop until interrupted.
pub async fn run(router: Arc<Router>, bot: Bot) -> Result<()> {
    info!("Starting Telegram platform...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, router: Arc<Router>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    info!("Telegram message in chat {}: {}", msg.chat.id.0, text);

    let inbound = InboundMessage {
        chat_id: msg.chat.id.0,
        message_id: Some(msg.id.0),
        text,
    };

    router.handle(&inbound, &TelegramMessenger::new(bot)).await;

    Ok(())
}
