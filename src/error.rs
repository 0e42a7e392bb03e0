//! A single error family for the crate. Every fallible operation in
//! `jose_kit` returns [`Error`]; each variant carries a [`Location`]
//! naming the module and line the failure was raised from, so callers
//! can log precisely without having to pattern-match on message text.

use std::fmt;

/// Source-location tag attached to an [`Error`]. Intended for logging,
/// never for control flow — match on the `Error` variant instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub module: &'static str,
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.line)
    }
}

/// Builds a [`Location`] pointing at the call site.
macro_rules! here {
    () => {
        $crate::error::Location {
            module: module_path!(),
            line: line!(),
        }
    };
}
pub(crate) use here;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed JSON at {loc}: {reason}")]
    MalformedJson { reason: String, loc: Location },

    #[error("JSON limit violation at {loc}: {limit} exceeded ({detail})")]
    JsonLimitViolation {
        limit: &'static str,
        detail: String,
        loc: Location,
    },

    #[error("top-level JSON value is not an object ({loc})")]
    NotJsonObject { loc: Location },

    #[error("incompatible JSON type at {loc}: expected {expected}, found {found}")]
    JsonIncompatibleType {
        expected: &'static str,
        found: &'static str,
        loc: Location,
    },

    #[error("bad cast at {loc}: value is not a {expected}")]
    JsonBadCast { expected: &'static str, loc: Location },

    #[error("null value supplied where a value was required ({loc})")]
    JsonNullValue { loc: Location },

    #[error("index {index} out of bounds ({loc})")]
    JsonIndexOutOfBounds { index: i64, loc: Location },

    #[error("member {name:?} already exists ({loc})")]
    JsonUniqueConstraintViolation { name: String, loc: Location },

    #[error("permission violation at {loc}: {reason}")]
    JsonPermViolation { reason: &'static str, loc: Location },

    #[error("no member named {name:?} ({loc})")]
    JsonNoSuchName { name: String, loc: Location },

    #[error("invalid JWK: {reason} ({loc})")]
    JwkError { reason: String, loc: Location },

    #[error("JWA error: {reason} ({loc})")]
    JwaError { reason: String, loc: Location },

    #[error("JWS error: {reason} ({loc})")]
    JwsError { reason: String, loc: Location },

    #[error("JWT error: {reason} ({loc})")]
    JwtError { reason: String, loc: Location },

    #[error("OpenSSL error at {loc}: {source}")]
    OpenSsl {
        #[source]
        source: openssl::error::ErrorStack,
        loc: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<openssl::error::ErrorStack> for Error {
    fn from(source: openssl::error::ErrorStack) -> Self {
        Error::OpenSsl {
            source,
            loc: here!(),
        }
    }
}
