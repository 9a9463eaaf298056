#![forbid(unsafe_code)]
//! Error types for pars.
//!
//! Defines `ParsError` and a `Result<T>` alias used throughout the
//! workspace. Data-plane outcomes (size/hash mismatches, per-block
//! verdicts) are never errors; they are reported through the validation
//! result instead.

use pars_types::ParseError;
use thiserror::Error;

/// Unified error type for all pars operations.
#[derive(Debug, Error)]
pub enum ParsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {field} ({reason})")]
    InvalidArgument {
        field: &'static str,
        reason: &'static str,
    },

    #[error("parity {which} magic missing")]
    MagicMissing { which: &'static str },

    #[error("parity header truncated: need {needed} bytes, got {actual}")]
    HeaderTruncated { needed: u64, actual: u64 },

    #[error("parity file size inconsistent: header implies {expected} bytes, file has {actual}")]
    SizeInconsistent { expected: u64, actual: u64 },

    #[error("invalid parity file: {0}")]
    Format(String),
}

impl From<ParseError> for ParsError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InsufficientData { needed, actual, .. } => Self::HeaderTruncated {
                needed: needed as u64,
                actual: actual as u64,
            },
            // Slice-level parsing only ever checks the start magic; the end
            // magic is verified explicitly by the reader.
            ParseError::InvalidMagic { .. } => Self::MagicMissing { which: "start" },
            other => Self::Format(other.to_string()),
        }
    }
}

/// Result alias using `ParsError`.
pub type Result<T> = std::result::Result<T, ParsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ParsError = io.into();
        assert!(matches!(err, ParsError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn insufficient_data_becomes_truncated() {
        let err: ParsError = ParseError::InsufficientData {
            needed: 62,
            offset: 0,
            actual: 10,
        }
        .into();
        assert!(matches!(
            err,
            ParsError::HeaderTruncated {
                needed: 62,
                actual: 10
            }
        ));
    }

    #[test]
    fn display_is_stable() {
        let err = ParsError::SizeInconsistent {
            expected: 100,
            actual: 90,
        };
        assert_eq!(
            err.to_string(),
            "parity file size inconsistent: header implies 100 bytes, file has 90"
        );
    }
}
