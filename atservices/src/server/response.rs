use heapless::String;

use super::config::ErrorCodes;
use crate::handle::Arena;
use crate::helpers::{bounded, push_truncated};
use crate::{CmeError, CmsError, Error, ErrorCodeRef, RESPONSE_MAX_LEN};

/// Response text written to a device.
pub type Response = String<RESPONSE_MAX_LEN>;

/// Pattern of mobile equipment errors, see [`CmeError`].
pub const CME_ERROR: &str = "+CME ERROR: ";

/// Pattern of message service errors, see [`CmsError`].
pub const CMS_ERROR: &str = "+CMS ERROR: ";

/// Codes below this are standard 3GPP codes; user defined codes start here.
pub const USER_ERROR_CODE_START: u32 = 512;

/// Final result code of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FinalResponse {
    Ok,
    NoCarrier,
    NoDialtone,
    Busy,
    Error,
}

impl FinalResponse {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoCarrier => "NO CARRIER",
            Self::NoDialtone => "NO DIALTONE",
            Self::Busy => "BUSY",
            Self::Error => "ERROR",
        }
    }
}

/// Final response of a command line, built up while its sub-commands are
/// answered and written once the line is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FinalResult {
    pub kind: FinalResponse,
    pub pattern: Response,
    pub code: u32,
}

impl Default for FinalResult {
    fn default() -> Self {
        Self {
            kind: FinalResponse::Ok,
            pattern: Response::new(),
            code: 0,
        }
    }
}

impl FinalResult {
    /// Result of a line that could not be parsed.
    pub fn not_allowed() -> Self {
        let mut pattern = Response::new();
        push_truncated(&mut pattern, CME_ERROR);
        Self {
            kind: FinalResponse::Error,
            pattern,
            code: CmeError::NotAllowed as u32,
        }
    }

    /// Update with the answer to one sub-command. Without a pattern, the one
    /// given by an earlier sub-command of the same line is kept.
    pub fn update(&mut self, kind: FinalResponse, pattern: Option<&Response>, code: u32) {
        self.kind = kind;
        self.code = code;
        if let Some(pattern) = pattern {
            self.pattern = pattern.clone();
        }
    }
}

pub(crate) struct UserError {
    pub code: u32,
    pub pattern: Response,
    pub verbose: Response,
}

/// User defined error codes, used by the verbose error mode.
#[derive(Default)]
pub(crate) struct ErrorTable {
    codes: Arena<UserError>,
}

impl ErrorTable {
    pub fn create(&mut self, code: u32, pattern: &str) -> Result<ErrorCodeRef, Error> {
        if code < USER_ERROR_CODE_START {
            error!("Error code {} is reserved", code);
            return Err(Error::Fault);
        }
        if self.find(code, pattern).is_some() {
            error!("Error code {} already exists", code);
            return Err(Error::Fault);
        }
        Ok(ErrorCodeRef(self.codes.insert(UserError {
            code,
            pattern: bounded(pattern)?,
            verbose: Response::new(),
        })))
    }

    /// Returns `None` for a stale reference.
    pub fn delete(&mut self, error: ErrorCodeRef) -> Option<()> {
        self.codes.remove(error.0).map(drop)
    }

    /// Returns `None` for a stale reference.
    pub fn set_verbose(&mut self, error: ErrorCodeRef, message: &str) -> Option<Result<(), Error>> {
        let entry = self.codes.get_mut(error.0)?;
        Some(bounded(message).map(|message| entry.verbose = message))
    }

    fn find(&self, code: u32, pattern: &str) -> Option<&UserError> {
        self.codes
            .iter()
            .map(|(_, entry)| entry)
            .find(|entry| entry.code == code && entry.pattern.as_str() == pattern)
    }

    /// Message of a standard or user defined error code.
    fn message(&self, code: u32, pattern: &str) -> Option<&str> {
        if code < USER_ERROR_CODE_START {
            let code = code as u16;
            return match pattern {
                CME_ERROR => CmeError::from_code(code).map(|e| e.message()),
                CMS_ERROR => CmsError::from_code(code).map(|e| e.message()),
                _ => None,
            };
        }
        self.find(code, pattern)
            .map(|entry| entry.verbose.as_str())
            .filter(|verbose| !verbose.is_empty())
    }

    /// Text of a final response in the given error code mode.
    pub fn format(&self, result: &FinalResult, mode: ErrorCodes) -> Response {
        let mut out = Response::new();
        if result.kind != FinalResponse::Error {
            let text = if result.pattern.is_empty() {
                result.kind.as_str()
            } else {
                result.pattern.as_str()
            };
            push_truncated(&mut out, text);
            return out;
        }

        if mode == ErrorCodes::Disabled || result.pattern.is_empty() {
            push_truncated(&mut out, FinalResponse::Error.as_str());
            return out;
        }

        push_truncated(&mut out, &result.pattern);
        match mode {
            ErrorCodes::Verbose => match self.message(result.code, &result.pattern) {
                Some(message) => push_truncated(&mut out, message),
                None => push_truncated(&mut out, &result.code.to_string()),
            },
            _ => push_truncated(&mut out, &result.code.to_string()),
        }
        out
    }
}
