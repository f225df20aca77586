use std::sync::Arc;

use tracing::info;

use postbot_core::{config::Config, webhook::WebhookHandler};
use postbot_github::GitHubClient;
use postbot_telegram::{
    register_webhook,
    router::{self, AppState},
    TelegramTransport,
};

#[tokio::main]
async fn main() -> Result<(), postbot_core::Error> {
    postbot_core::logging::init("postbot")?;

    let cfg = Arc::new(Config::load()?);
    info!(repo = %cfg.github_repo, base = %cfg.github_base_branch, "starting postbot");

    let chat = TelegramTransport::from_config(&cfg)?;
    let repo = GitHubClient::from_config(&cfg)?;

    if let Some(url) = &cfg.telegram_webhook_url {
        register_webhook(&chat.bot(), url, cfg.telegram_webhook_secret.as_deref()).await?;
    }

    let handler = Arc::new(WebhookHandler::new(
        cfg.clone(),
        Arc::new(chat),
        Arc::new(repo),
    ));

    router::serve(AppState { cfg, handler })
        .await
        .map_err(|e| postbot_core::Error::External(format!("webhook server failed: {e}")))?;

    Ok(())
}
