//! Crate-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout meshkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the loader/transcoder core can produce.
///
/// Messages are kept intentionally terse; callers that need richer context
/// should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// A mutator was called before a file or write target was attached.
    NotReady,
    /// The operation would mutate loader state while an iterator is active.
    Locked,
    /// An underlying I/O operation failed.
    Io(io::Error),
    /// A structural or numeric violation of a format's contract.
    Malformed(&'static str),
    /// A declared format feature this parser does not implement.
    Unsupported(&'static str),
    /// A texture payload was rejected by a validator callback.
    InvalidTexture,
    /// `next()` was called after the iterator was already exhausted.
    NotAvailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotReady => write!(f, "loader has no file or target attached"),
            Error::Locked => write!(f, "loader is locked by an active iterator"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Malformed(s) => write!(f, "malformed input: {s}"),
            Error::Unsupported(s) => write!(f, "unsupported: {s}"),
            Error::InvalidTexture => write!(f, "texture rejected by validator"),
            Error::NotAvailable => write!(f, "no more chunks available"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_round_trips_as_source() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn display_is_non_empty_for_every_variant() {
        let variants = [
            Error::NotReady,
            Error::Locked,
            Error::Malformed("bad face"),
            Error::Unsupported("3ds"),
            Error::InvalidTexture,
            Error::NotAvailable,
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }
}
