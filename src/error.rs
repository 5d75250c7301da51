//! The typed error taxonomy surfaced by the document engine.
//!
//! Every entry point in [`crate::commands`] returns `Result<(), DocError>`. The wire layer
//! (`crate::wire`) maps these onto the protocol's integer codes, kept alive here purely for
//! documentation and wire compatibility.

use thiserror::Error;

/// `success = 0` is the absence of an error, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DocError {
    /// A position, offset, or range failed the resolver or a semantic precondition
    /// (`start > end`, heading level out of `[1, 6]`, empty text, ...).
    #[error("invalid position")]
    InvalidPosition,

    /// The command's claimed version no longer matches the document's current version.
    #[error("outdated version")]
    OutdatedVersion,

    /// Reserved wire code, never constructed by this implementation. Kept so the integer
    /// mapping in [`DocError::wire_code`] stays stable for older clients.
    #[error("delete position")]
    DeletePosition,
}

impl DocError {
    /// The integer code used on the wire. `success` is `0` and isn't represented by this type.
    #[must_use]
    pub const fn wire_code(self) -> i32 {
        match self {
            Self::InvalidPosition => -1,
            Self::DeletePosition => -2,
            Self::OutdatedVersion => -3,
        }
    }

    /// A short, human-readable reason used in `Reject <reason>` session replies.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::InvalidPosition => "INVALID_POSITION",
            Self::DeletePosition => "DELETE_POSITION",
            Self::OutdatedVersion => "OUTDATED_VERSION",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_codes_match_protocol() {
        assert_eq!(DocError::InvalidPosition.wire_code(), -1);
        assert_eq!(DocError::DeletePosition.wire_code(), -2);
        assert_eq!(DocError::OutdatedVersion.wire_code(), -3);
    }
}
