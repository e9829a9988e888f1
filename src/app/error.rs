use thiserror::Error;

/// Error taxonomy for the session.
///
/// External-call failures are classified at the component boundary that
/// made the call; the Reconciler only ever sees these variants, never raw
/// transport errors. `AuthFailure` is fatal to the session (forces
/// re-login); `Unavailable` is retryable and leaves the last-known-good
/// view displayed.
#[derive(Error, Debug)]
pub enum TributaryError {
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed push payload: {0}")]
    MalformedPayload(String),

    #[error("push transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TributaryError>;
