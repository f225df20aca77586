//! Telegram adapter (teloxide + axum).
//!
//! `TelegramTransport` implements the `postbot-core` `ChatTransport` port over
//! the Bot API; `router` receives webhook updates over HTTP.

use async_trait::async_trait;
use teloxide::{net::Download, prelude::*};
use tracing::info;

pub mod router;

use postbot_core::{
    config::Config,
    domain::{ChatId, FilePath},
    errors::Error,
    messaging::port::ChatTransport,
    Result,
};

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut bot = Bot::new(cfg.telegram_bot_token.clone());
        if let Some(api) = &cfg.telegram_api_url {
            let url = reqwest::Url::parse(api)
                .map_err(|e| Error::Config(format!("invalid TELEGRAM_API_URL {api:?}: {e}")))?;
            bot = bot.set_api_url(url);
        }
        Ok(Self::new(bot))
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .disable_web_page_preview(true)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<FilePath> {
        let file = self
            .bot
            .get_file(file_id.to_string())
            .await
            .map_err(Self::map_err)?;
        Ok(FilePath(file.path))
    }

    async fn download(&self, path: &FilePath) -> Result<Vec<u8>> {
        let mut buf: Vec<u8> = Vec::new();
        self.bot
            .download_file(&path.0, &mut buf)
            .await
            .map_err(|e| Error::External(format!("telegram download error: {e}")))?;
        Ok(buf)
    }
}

/// Point the bot's webhook at `url`, optionally with a secret token that
/// Telegram echoes back in every delivery.
pub async fn register_webhook(bot: &Bot, url: &str, secret: Option<&str>) -> Result<()> {
    let url = reqwest::Url::parse(url)
        .map_err(|e| Error::Config(format!("invalid TELEGRAM_WEBHOOK_URL {url:?}: {e}")))?;

    let mut req = bot.set_webhook(url.clone());
    if let Some(secret) = secret {
        req = req.secret_token(secret.to_string());
    }
    req.await
        .map_err(|e| Error::External(format!("telegram setWebhook error: {e}")))?;

    info!(%url, "telegram webhook registered");
    Ok(())
}
