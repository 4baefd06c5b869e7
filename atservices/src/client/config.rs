use crate::{KillPolicy, DEFAULT_TIMEOUT_MS};

/// Configuration of the AT client.
///
/// ```
/// use atservices::client::Config;
/// use atservices::KillPolicy;
///
/// let config = Config::new()
///     .default_timeout(5_000)
///     .kill_policy(KillPolicy::Panic);
/// ```
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Config {
    pub(crate) default_timeout: u32,
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
            default_timeout: DEFAULT_TIMEOUT_MS,
            kill_policy: KillPolicy::DEFAULT,
            read_chunk: 64,
        }
    }

    /// Timeout of commands that do not set their own, in milliseconds.
    #[must_use]
    pub const fn default_timeout(mut self, ms: u32) -> Self {
        self.default_timeout = ms;
        self
    }

    #[must_use]
    pub const fn kill_policy(mut self, policy: KillPolicy) -> Self {
        self.kill_policy = policy;
        self
    }

    /// Maximum number of bytes requested from the device per read.
    #[must_use]
    pub const fn read_chunk(mut self, bytes: usize) -> Self {
        self.read_chunk = bytes;
        self
    }
}
