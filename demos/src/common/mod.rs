//! A tiny modem, served by an [`AtServer`], shared by the demos.

use std::os::unix::net::UnixStream;

use atservices::device::Opener;
use atservices::server::{AtServer, CommandType, ErrorCodes, FinalResponse, CME_ERROR};
use atservices::{CmeError, Error};
use embedded_io_adapters::std::FromStd;

/// Hands out the two halves of one end of a socket pair, whatever the path.
pub struct PairOpener {
    stream: UnixStream,
}

impl PairOpener {
    pub fn new(stream: UnixStream) -> Self {
        Self { stream }
    }
}

impl Opener for PairOpener {
    type Reader = FromStd<UnixStream>;
    type Writer = FromStd<UnixStream>;

    fn open(&self, path: &str) -> Result<(Self::Reader, Self::Writer), Error> {
        log::info!("Opening {} on a socket pair", path);
        let reader = self.stream.try_clone().map_err(|_| Error::Open)?;
        let writer = self.stream.try_clone().map_err(|_| Error::Open)?;
        Ok((FromStd::new(reader), FromStd::new(writer)))
    }
}

/// Register the commands of the demo modem:
///
/// - `AT+CGMI`, the manufacturer.
/// - `AT+CSQ`, the signal quality.
/// - `AT+CMEE=<n>`, the error code mode.
/// - `ATE<n>`, echo on or off.
/// - `AT+CFUN=<n>`, which only accepts 0 and 1 and fails with a user
///   defined error code otherwise.
pub fn register(server: &AtServer) -> Result<(), Error> {
    let s = server.clone();
    let cgmi = server.create("AT+CGMI")?;
    server.add_command_handler(cgmi, move |cmd, kind, _| {
        if kind == CommandType::Act {
            s.send_intermediate_response(cmd, "Acme Modems").ok();
            s.send_final_response(cmd, FinalResponse::Ok, None, 0).ok();
        } else {
            s.send_final_response(cmd, FinalResponse::Error, None, 0).ok();
        }
    })?;

    let s = server.clone();
    let csq = server.create("AT+CSQ")?;
    server.add_command_handler(csq, move |cmd, kind, _| {
        let text = match kind {
            CommandType::Test => "+CSQ: (0-31,99),(0-7,99)",
            _ => "+CSQ: 20,99",
        };
        s.send_intermediate_response(cmd, text).ok();
        s.send_final_response(cmd, FinalResponse::Ok, None, 0).ok();
    })?;

    let s = server.clone();
    let cmee = server.create("AT+CMEE")?;
    server.add_command_handler(cmee, move |cmd, kind, params| {
        if kind == CommandType::Test {
            s.send_intermediate_response(cmd, "+CMEE: (0-2)").ok();
            s.send_final_response(cmd, FinalResponse::Ok, None, 0).ok();
            return;
        }
        let mode = match s.parameter(cmd, 0) {
            Ok(p) if params == 1 && p.as_str() == "0" => ErrorCodes::Disabled,
            Ok(p) if params == 1 && p.as_str() == "1" => ErrorCodes::Extended,
            Ok(p) if params == 1 && p.as_str() == "2" => ErrorCodes::Verbose,
            _ => {
                s.send_final_response(
                    cmd,
                    FinalResponse::Error,
                    Some(CME_ERROR),
                    CmeError::InvalidIndex as u32,
                )
                .ok();
                return;
            }
        };
        s.set_error_codes(mode);
        s.send_final_response(cmd, FinalResponse::Ok, None, 0).ok();
    })?;

    let s = server.clone();
    let echo = server.create("ATE")?;
    server.add_command_handler(echo, move |cmd, _, _| {
        let on = s.parameter(cmd, 0).map(|p| p.as_str() != "0").unwrap_or(false);
        let res = s.device(cmd).and_then(|device| {
            if on {
                s.enable_echo(device)
            } else {
                s.disable_echo(device)
            }
        });
        let kind = if res.is_ok() {
            FinalResponse::Ok
        } else {
            FinalResponse::Error
        };
        s.send_final_response(cmd, kind, None, 0).ok();
    })?;

    const CFUN_ERROR: &str = "+CFUN ERROR: ";
    const CFUN_BAD_LEVEL: u32 = 600;
    let bad_level = server.create_error_code(CFUN_BAD_LEVEL, CFUN_ERROR)?;
    server.set_verbose_error_code(bad_level, "Unsupported functionality level")?;

    let s = server.clone();
    let cfun = server.create("AT+CFUN")?;
    server.add_command_handler(cfun, move |cmd, kind, _| {
        let level = s.parameter(cmd, 0);
        match (kind, level) {
            (CommandType::Para, Ok(level)) if matches!(level.as_str(), "0" | "1") => {
                s.send_final_response(cmd, FinalResponse::Ok, None, 0).ok();
            }
            _ => {
                s.send_final_response(
                    cmd,
                    FinalResponse::Error,
                    Some(CFUN_ERROR),
                    CFUN_BAD_LEVEL,
                )
                .ok();
            }
        }
    })?;

    Ok(())
}
