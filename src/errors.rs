use core::fmt;

/// Errors that can occur during the protocol
///
/// Every failure is fatal to the session that raised it: the session moves
/// to its failed state and all further operations on it are rejected.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A caller-supplied value is syntactically or semantically out of range
    InvalidArgument(&'static str),
    /// An operation was invoked outside the one session state that permits it
    InvalidState(&'static str),
    /// A cryptographic check failed
    Verification(&'static str),
    /// An invariant was violated inside this library, this should never occur
    Internal(&'static str),
}

impl Error {
    /// The message carried by this error
    pub fn message(&self) -> &'static str {
        match self {
            Error::InvalidArgument(msg)
            | Error::InvalidState(msg)
            | Error::Verification(msg)
            | Error::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Error {}

/// Result type
pub type Result<T> = core::result::Result<T, Error>;
