/// Core error type.
///
/// Adapter crates map their transport errors into this type so the webhook
/// pipeline can turn any upstream failure into a single chat reply.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    /// Upstream answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Http {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The resource being created already exists (e.g. a branch name).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
