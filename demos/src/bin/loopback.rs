//! Runs a client and a server against each other over a socket pair.
//!
//! ```text
//! RUST_LOG=debug cargo run --bin loopback
//! ```

use std::os::unix::net::UnixStream;
use std::process::exit;
use std::time::Duration;

use crossbeam_channel::unbounded;

use atservices::client::{AtClient, Config as ClientConfig};
use atservices::server::{AtServer, Config as ServerConfig, Scope};
use atservices::Error;
use atservices_demos::common::{self, PairOpener};
use embedded_io_adapters::std::FromStd;

const INTERMEDIATES: &str = "+|Acme";
const FINALS: &str = "OK|ERROR|+CME ERROR:|+CFUN ERROR:";

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        exit(1);
    }
}

fn run() -> Result<(), Error> {
    let (modem_end, host_end) = UnixStream::pair().map_err(|_| Error::Open)?;

    let server = AtServer::new(ServerConfig::default());
    common::register(&server)?;
    let reader = modem_end.try_clone().map_err(|_| Error::Open)?;
    let modem = server.open(FromStd::new(reader), FromStd::new(modem_end))?;

    let client = AtClient::new(
        PairOpener::new(host_end),
        ClientConfig::default().default_timeout(2_000),
    );
    let host = client.start("loopback")?;

    let (urcs, urc_rx) = unbounded();
    let creg = client.add_unsolicited_response_handler(
        "+CREG:",
        host,
        move |line| {
            urcs.send(line.to_string()).ok();
        },
        1,
    )?;

    for line in [
        "AT+CGMI",
        "AT+CSQ;+CSQ=?",
        "AT+CMEE=1",
        "AT+CFUN=7",
        "AT+CMEE=2;+CFUN=7",
        "AT+CMEE=2;+NOPE",
        "ATE0;+CFUN=1",
    ] {
        let mut cmd = client.set_command_and_send(host, line, INTERMEDIATES, FINALS, 0)?;
        log::info!("{} -> {}", line, cmd.final_response()?);
        let mut text = cmd.first_intermediate_response().map(str::to_string);
        while let Ok(line) = text {
            log::info!("    {}", line);
            text = cmd.next_intermediate_response().map(str::to_string);
        }
    }

    server.send_unsolicited_response("+CREG: 1", Scope::Device(modem))?;
    match urc_rx.recv_timeout(Duration::from_secs(2)) {
        Ok(line) => log::info!("Unsolicited: {}", line),
        Err(_) => log::warn!("No unsolicited response received"),
    }

    client.remove_unsolicited_response_handler(creg)?;
    client.stop(host)?;
    server.close(modem)?;
    Ok(())
}
