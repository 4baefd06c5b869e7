//! AT command client and server engines for serial based modems.
//!
//! The crate contains the two halves of an AT command link:
//!
//! - [`AtClient`] sends AT commands to a modem, matches the response lines
//!   against the patterns the caller expects, and delivers unsolicited result
//!   codes to registered handlers.
//! - [`AtServer`] reads AT command lines from a device, parses them into one
//!   or more sub-commands, dispatches them to registered handlers and writes
//!   the intermediate, final and unsolicited responses back.
//!
//! Both engines talk to their devices through the [`embedded_io`] `Read` and
//! `Write` traits. Every opened device is served by its own worker thread;
//! the public handles ([`AtClient`], [`AtServer`]) are cheap to clone and can
//! be used from any thread.
//!
//! [`AtClient`]: client/struct.AtClient.html
//! [`AtServer`]: server/struct.AtServer.html
//!
//! # Examples
//!
//! ### Sending a command:
//! ```no_run
//! use atservices::client::{AtClient, Config};
//! use atservices::device::SerialOpener;
//!
//! let client = AtClient::new(SerialOpener::new(115_200), Config::default());
//! let device = client.start("/dev/ttyUSB0").unwrap();
//!
//! let cmd = client
//!     .set_command_and_send(device, "AT+CGMI", "", "OK|ERROR|+CME ERROR:", 0)
//!     .unwrap();
//! println!("{}", cmd.final_response().unwrap());
//! ```
//!
//! ### Serving a command:
//! ```no_run
//! use atservices::server::{AtServer, Config, FinalResponse};
//!
//! let server = AtServer::new(Config::default());
//! let cgmi = server.create("AT+CGMI").unwrap();
//!
//! let responder = server.clone();
//! server
//!     .add_command_handler(cgmi, move |cmd, _kind, _params| {
//!         responder.send_intermediate_response(cmd, "Acme").ok();
//!         responder
//!             .send_final_response(cmd, FinalResponse::Ok, None, 0)
//!             .ok();
//!     })
//!     .unwrap();
//! ```
//!
//! # Optional Cargo Features
//!
//! - **`log`** *(enabled by default)* - Logs through the [`log`] facade,
//!   including incoming and outgoing bytes on the `TRACE` level.
//! - **`defmt`** *(disabled by default)* - Logs through [`defmt`] instead.
//!
//! [`log`]: https://crates.io/crates/log
//! [`defmt`]: https://crates.io/crates/defmt

#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod error;
mod handle;
pub mod helpers;

pub mod client;
pub mod device;
pub mod server;

#[cfg(test)]
mod mock;

pub use error::{CmeError, CmsError, Error, KillPolicy};
pub use handle::{CommandRef, DeviceRef, ErrorCodeRef, UnsolicitedRef};

/// Size of the receive buffer of every device, in bytes.
pub const RX_BUFFER_LEN: usize = 1024;

/// Maximum length of an AT command line.
pub const COMMAND_MAX_LEN: usize = 512;

/// Maximum length of a response line or response pattern.
pub const RESPONSE_MAX_LEN: usize = 352;

/// Maximum length of an accumulated unsolicited response.
pub const UNSOLICITED_MAX_LEN: usize = 256;

/// Maximum length of a single parsed command parameter.
pub const PARAMETER_MAX_LEN: usize = 64;

/// Maximum length of the text payload sent after a `>` prompt.
pub const TEXT_MAX_LEN: usize = 4096;

/// Default client command timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u32 = 30_000;
