//! Webhook pipeline: one inbound update in, at most one chat reply out.
//!
//! `handle` never fails. Unauthorized senders are dropped without a reply;
//! everything else ends in exactly one reply describing the outcome.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    domain::ChatId,
    errors::Error,
    hosting::RepoHost,
    messaging::{
        port::ChatTransport,
        types::{Document, Message, Update},
    },
    package::{detect_command, merge_sources, ContentPackage},
    publish::{Publication, Publisher},
    rejection::Rejection,
};

pub const REQUIRED_EXTENSION: &str = ".txt";

pub const USAGE: &str = "Send the post as a .txt document with the caption\n\
/pr filename=<name>.mdx\n\
(or put that command on the first line of the file).\n\n\
The file must contain both locale sections:\n\
---ES_START---\n---MDX_START---\nlocale: es\nslug: <slug>\n...\n---MDX_END---\n---ES_END---\n\
---EN_START---\n---MDX_START---\nlocale: en\nslug: <slug>\n...\n---MDX_END---\n---EN_END---";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    NoMessage,
    NoSender,
    Unauthorized,
    NotACommand,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Usage,
    Rejected(Rejection),
    Published(Publication),
    Failed(String),
}

impl Outcome {
    /// Chat reply for this outcome; `None` means stay silent.
    pub fn reply_text(&self) -> Option<String> {
        match self {
            Outcome::Ignored(_) => None,
            Outcome::Usage => Some(USAGE.to_string()),
            Outcome::Rejected(r) => Some(format!("❌ {r}")),
            Outcome::Published(p) => Some(format!(
                "✅ Pull request opened: {}",
                p.pull_request.url
            )),
            Outcome::Failed(msg) => Some(format!("⚠️ Error: {msg}")),
        }
    }
}

/// Internal short-circuit type: validation rejections and upstream errors
/// travel the same `?` path but produce different replies.
enum Failure {
    Rejected(Rejection),
    Upstream(Error),
}

impl From<Rejection> for Failure {
    fn from(r: Rejection) -> Self {
        Failure::Rejected(r)
    }
}

impl From<Error> for Failure {
    fn from(e: Error) -> Self {
        Failure::Upstream(e)
    }
}

pub struct WebhookHandler {
    cfg: Arc<Config>,
    chat: Arc<dyn ChatTransport>,
    repo: Arc<dyn RepoHost>,
}

impl WebhookHandler {
    pub fn new(cfg: Arc<Config>, chat: Arc<dyn ChatTransport>, repo: Arc<dyn RepoHost>) -> Self {
        Self { cfg, chat, repo }
    }

    pub async fn handle(&self, update: &Update) -> Outcome {
        let Some(message) = update.message.as_ref() else {
            debug!(update_id = ?update.update_id, "update without message");
            return Outcome::Ignored(IgnoreReason::NoMessage);
        };
        let Some(sender) = update.sender() else {
            return Outcome::Ignored(IgnoreReason::NoSender);
        };
        if sender != self.cfg.telegram_allowed_chat_id {
            warn!(chat_id = %sender, "dropping update from unauthorized chat");
            return Outcome::Ignored(IgnoreReason::Unauthorized);
        }

        let outcome = self.process(message).await;
        match &outcome {
            Outcome::Rejected(r) => info!(chat_id = %sender, rejection = ?r, "submission rejected"),
            Outcome::Failed(msg) => error!(chat_id = %sender, error = %msg, "publication failed"),
            Outcome::Published(p) => {
                info!(chat_id = %sender, branch = %p.branch, url = %p.pull_request.url, "published")
            }
            _ => {}
        }

        if let Some(text) = outcome.reply_text() {
            self.reply(sender, &text).await;
        }
        outcome
    }

    async fn process(&self, message: &Message) -> Outcome {
        let Some(doc) = message.document.as_ref() else {
            let text = message.body().unwrap_or_default();
            if detect_command(text) || is_help(text) {
                return Outcome::Usage;
            }
            debug!("ignoring plain text message");
            return Outcome::Ignored(IgnoreReason::NotACommand);
        };

        match self.submit(doc, message.caption.as_deref()).await {
            Ok(publication) => Outcome::Published(publication),
            Err(Failure::Rejected(r)) => Outcome::Rejected(r),
            Err(Failure::Upstream(e)) => Outcome::Failed(e.to_string()),
        }
    }

    async fn submit(
        &self,
        doc: &Document,
        caption: Option<&str>,
    ) -> Result<Publication, Failure> {
        check_document(doc, self.cfg.max_document_bytes)?;

        let path = self.chat.get_file(&doc.file_id).await?;
        let bytes = self.chat.download(&path).await?;
        let size = bytes.len() as u64;
        if size > self.cfg.max_document_bytes {
            return Err(Rejection::FileTooLarge {
                size,
                limit: self.cfg.max_document_bytes,
            }
            .into());
        }
        let body = String::from_utf8(bytes).map_err(|_| Rejection::NotUtf8)?;
        debug!(bytes = size, "document downloaded");

        let merged = merge_sources(caption, Some(&body)).ok_or(Rejection::MissingCommand)?;
        let pkg = ContentPackage::parse(&merged)?;
        info!(slug = %pkg.slug, filename = %pkg.filename, "submission validated");

        let publisher = Publisher::new(
            self.repo.as_ref(),
            &self.cfg.github_base_branch,
            &self.cfg.content_root,
        );
        Ok(publisher.publish(&pkg).await?)
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.chat.send_message(chat_id, text).await {
            error!(%chat_id, error = %e, "failed to send reply");
        }
    }
}

/// Declared-metadata gate, applied before anything is downloaded.
pub fn check_document(doc: &Document, max_bytes: u64) -> Result<(), Rejection> {
    let file_name = doc.file_name.clone().unwrap_or_default();
    if !file_name.to_lowercase().ends_with(REQUIRED_EXTENSION) {
        return Err(Rejection::UnsupportedFileType { file_name });
    }
    if let Some(size) = doc.file_size {
        if size > max_bytes {
            return Err(Rejection::FileTooLarge {
                size,
                limit: max_bytes,
            });
        }
    }
    Ok(())
}

fn is_help(text: &str) -> bool {
    let first = text.split_whitespace().next().unwrap_or_default();
    let cmd = first.split('@').next().unwrap_or_default();
    matches!(cmd, "/start" | "/help")
}
