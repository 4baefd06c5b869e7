use crate::KillPolicy;

/// How `ERROR` final responses are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCodes {
    /// Always `ERROR`.
    #[default]
    Disabled,
    /// The pattern followed by the numeric code, e.g. `+CME ERROR: 3`.
    Extended,
    /// The pattern followed by the error message, e.g.
    /// `+CME ERROR: Operation not allowed`.
    Verbose,
}

/// Configuration of the AT server.
///
/// ```
/// use atservices::server::{Config, ErrorCodes};
///
/// let config = Config::new().echo(true).error_codes(ErrorCodes::Extended);
/// ```
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Config {
    pub(crate) echo: bool,
    pub(crate) error_codes: ErrorCodes,
    pub(crate) kill_policy: KillPolicy,
    pub(crate) read_chunk: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            echo: false,
            error_codes: ErrorCodes::Disabled,
            kill_policy: KillPolicy::DEFAULT,
            read_chunk: 64,
        }
    }

    /// Echo state of newly opened devices.
    #[must_use]
    pub const fn echo(mut self, on: bool) -> Self {
        self.echo = on;
        self
    }

    /// Initial error code mode. Can be changed later with
    /// [`AtServer::set_error_codes`](super::AtServer::set_error_codes).
    #[must_use]
    pub const fn error_codes(mut self, mode: ErrorCodes) -> Self {
        self.error_codes = mode;
        self
    }

    #[must_use]
    pub const fn kill_policy(mut self, policy: KillPolicy) -> Self {
        self.kill_policy = policy;
        self
    }

    #[must_use]
    pub const fn read_chunk(mut self, bytes: usize) -> Self {
        self.read_chunk = bytes;
        self
    }
}
