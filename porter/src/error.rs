use thiserror::Error;

#[derive(Debug, Error)]
pub enum PorterError {
    /// Connection, timeout, body read or server-side failure. Worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// The remote answered with something that cannot be what was asked for.
    /// Never retried.
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("overlay error: {0}")]
    Overlay(#[from] dirchain_overlay::OverlayError),
}

impl PorterError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<dirchain_ledger::CodecError> for PorterError {
    fn from(e: dirchain_ledger::CodecError) -> Self {
        Self::Malformed(e.to_string())
    }
}
