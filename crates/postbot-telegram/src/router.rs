use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use postbot_core::{config::Config, messaging::types::Update, webhook::WebhookHandler};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub handler: Arc<WebhookHandler>,
}

#[derive(Serialize)]
pub struct Ack {
    ok: bool,
}

fn ack() -> Json<Ack> {
    Json(Ack { ok: true })
}

/// Webhook route plus a health check.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&state.cfg.webhook_path, post(receive_update))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Ack> {
    ack()
}

/// Always answers `200 {"ok":true}`: Telegram redelivers anything else.
///
/// The body is parsed once here and the typed update is handed to the
/// pipeline, which owns every reply.
async fn receive_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Ack> {
    if let Some(secret) = state.cfg.telegram_webhook_secret.as_deref() {
        let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(secret) {
            warn!("webhook call with missing or wrong secret token");
            return ack();
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "unparsable webhook body");
            return ack();
        }
    };

    let outcome = state.handler.handle(&update).await;
    debug!(?outcome, "update handled");
    ack()
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.cfg.bind_address.clone();
    let path = state.cfg.webhook_path.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, %path, "webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use postbot_core::{
        domain::{ChatId, CommitSha, FilePath},
        hosting::{NewPullRequest, PullRequest, PutFile, RepoHost},
        messaging::port::ChatTransport,
        Result,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, s: impl Into<String>) {
            self.calls.lock().unwrap().push(s.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for Recorder {
        async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
            self.push(format!("send {chat_id} {text}"));
            Ok(())
        }

        async fn get_file(&self, file_id: &str) -> Result<FilePath> {
            self.push(format!("get_file {file_id}"));
            Ok(FilePath(file_id.to_string()))
        }

        async fn download(&self, path: &FilePath) -> Result<Vec<u8>> {
            self.push(format!("download {}", path.0));
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl RepoHost for Recorder {
        async fn get_ref(&self, branch: &str) -> Result<CommitSha> {
            self.push(format!("get_ref {branch}"));
            Ok(CommitSha("sha".to_string()))
        }

        async fn create_ref(&self, branch: &str, _sha: &CommitSha) -> Result<()> {
            self.push(format!("create_ref {branch}"));
            Ok(())
        }

        async fn put_file(&self, file: PutFile) -> Result<()> {
            self.push(format!("put_file {}", file.path));
            Ok(())
        }

        async fn create_pull_request(&self, pr: NewPullRequest) -> Result<PullRequest> {
            self.push(format!("create_pr {}", pr.head));
            Ok(PullRequest {
                number: 1,
                url: "https://github.com/o/r/pull/1".to_string(),
            })
        }
    }

    fn state(secret: Option<&str>, rec: Arc<Recorder>) -> AppState {
        let mut vars: HashMap<&str, &str> = HashMap::from([
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_ALLOWED_CHAT_ID", "42"),
            ("GITHUB_TOKEN", "ghp_x"),
            ("GITHUB_REPO", "o/r"),
        ]);
        if let Some(s) = secret {
            vars.insert("TELEGRAM_WEBHOOK_SECRET", s);
        }
        let cfg = Arc::new(Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap());
        let handler = Arc::new(WebhookHandler::new(cfg.clone(), rec.clone(), rec));
        AppState { cfg, handler }
    }

    fn post_update(body: &str, secret: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri("/api/telegram/webhook")
            .header("content-type", "application/json");
        if let Some(s) = secret {
            req = req.header(SECRET_HEADER, s);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn assert_ack(resp: axum::response::Response) {
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v, serde_json::json!({ "ok": true }));
    }

    #[tokio::test]
    async fn invalid_json_is_acknowledged() {
        let rec = Arc::new(Recorder::default());
        let app = router(state(None, rec.clone()));

        let resp = app.oneshot(post_update("{not json", None)).await.unwrap();
        assert_ack(resp).await;
        assert!(rec.calls().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_sender_is_acknowledged_silently() {
        let rec = Arc::new(Recorder::default());
        let app = router(state(None, rec.clone()));

        let body = r#"{"update_id":1,"message":{"chat":{"id":7},"text":"/pr filename=x.mdx"}}"#;
        let resp = app.oneshot(post_update(body, None)).await.unwrap();
        assert_ack(resp).await;
        assert!(rec.calls().is_empty());
    }

    #[tokio::test]
    async fn authorized_command_gets_usage_reply() {
        let rec = Arc::new(Recorder::default());
        let app = router(state(None, rec.clone()));

        let body = r#"{"update_id":1,"message":{"chat":{"id":42},"text":"/pr filename=x.mdx"}}"#;
        let resp = app.oneshot(post_update(body, None)).await.unwrap();
        assert_ack(resp).await;

        let calls = rec.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("send 42 Send the post as a .txt document"));
    }

    #[tokio::test]
    async fn wrong_secret_is_dropped() {
        let rec = Arc::new(Recorder::default());
        let app = router(state(Some("s3cret"), rec.clone()));

        let body = r#"{"message":{"chat":{"id":42},"text":"/help"}}"#;
        let resp = app
            .clone()
            .oneshot(post_update(body, Some("nope")))
            .await
            .unwrap();
        assert_ack(resp).await;
        let resp = app.clone().oneshot(post_update(body, None)).await.unwrap();
        assert_ack(resp).await;
        assert!(rec.calls().is_empty());

        let resp = app.oneshot(post_update(body, Some("s3cret"))).await.unwrap();
        assert_ack(resp).await;
        assert_eq!(rec.calls().len(), 1);
    }

    #[tokio::test]
    async fn health_check_answers_ok() {
        let rec = Arc::new(Recorder::default());
        let app = router(state(None, rec));
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        assert_ack(app.oneshot(req).await.unwrap()).await;
    }
}
