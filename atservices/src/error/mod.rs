mod cme_error;
mod cms_error;

pub use cme_error::CmeError;
pub use cms_error::CmsError;

/// Errors returned by the AT client and server
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Generic failure, or a missing precondition
    #[error("fault")]
    Fault,
    /// Unknown handle, or no registered command matched
    #[error("not found")]
    NotFound,
    /// Timed out while waiting for a final response
    #[error("timed out waiting for a final response")]
    Timeout,
    /// A string does not fit its bounded buffer
    #[error("buffer overflow")]
    Overflow,
    /// The command or device is already in use
    #[error("busy")]
    Busy,
    /// An index or argument is out of range
    #[error("bad parameter")]
    BadParameter,
    /// The device was stopped before the command completed
    #[error("command cancelled")]
    Cancelled,
    /// Serial write error
    #[error("serial write error")]
    Write,
    /// The device could not be opened
    #[error("could not open device")]
    Open,
}

/// What to do when a public API is handed a handle that no longer refers to
/// a live object.
///
/// Defaults to [`KillPolicy::Warn`] in tests and debug builds, and to
/// [`KillPolicy::Panic`] otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KillPolicy {
    /// Log the misuse and return [`Error::NotFound`].
    Warn,
    /// Panic, taking the caller down.
    Panic,
}

impl Default for KillPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl KillPolicy {
    pub const DEFAULT: Self = if cfg!(any(test, debug_assertions)) {
        Self::Warn
    } else {
        Self::Panic
    };

    pub(crate) fn stale<T>(self, what: &'static str) -> Result<T, Error> {
        match self {
            Self::Warn => {
                error!("Invalid {} reference", what);
                Err(Error::NotFound)
            }
            Self::Panic => panic!("Invalid {} reference", what),
        }
    }
}
