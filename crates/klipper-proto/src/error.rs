//! Error types for the klipper-proto crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Failed to encode a frame.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failed to decode a frame.
    #[error("decoding error: {0}")]
    Decoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtoError::Decoding("expected value at line 1 column 1".to_string());
        assert_eq!(
            err.to_string(),
            "decoding error: expected value at line 1 column 1"
        );

        let err = ProtoError::Encoding("key must be a string".to_string());
        assert_eq!(err.to_string(), "encoding error: key must be a string");
    }
}
