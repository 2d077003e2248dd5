use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer cannot be a canonical encoding: a fixed-size field is cut
    /// short, a count disagrees with the remaining bytes, a tag is unknown,
    /// or bytes are left over.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("invalid length for {field}: expected {expected}, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl CodecError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEncoding(msg.into())
    }
}
