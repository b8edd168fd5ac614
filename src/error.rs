use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

/// Failures talking to the external book store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No response was received at all.
    #[error("book store unreachable: {0}")]
    Unreachable(String),

    #[error("request to book store failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The store answered, but not with success.
    #[error("book store responded with {status}: {}", message.as_deref().unwrap_or("no message"))]
    Application {
        status: u16,
        message: Option<String>,
    },

    #[error("failed to parse book store response: {0}")]
    Parse(String),

    #[error("invalid book store URL: {0}")]
    InvalidUrl(String),
}

impl StoreError {
    /// Text shown to the user in a banner. Server-provided messages are
    /// shown verbatim; everything else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            StoreError::Unreachable(_) => NETWORK_ERROR_MESSAGE.to_string(),
            StoreError::Request(e) if e.is_connect() || e.is_timeout() => {
                NETWORK_ERROR_MESSAGE.to_string()
            }
            StoreError::Application {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures before the front end starts serving.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
