//! Queries a modem on a serial port.
//!
//! ```text
//! RUST_LOG=info cargo run --bin serial-client -- /dev/ttyUSB0 [baud]
//! ```
//!
//! The port is opened 8N1 at 115200 baud unless told otherwise.

use std::process::exit;

use atservices::client::{AtClient, Config};
use atservices::device::SerialOpener;
use atservices::Error;

const QUERIES: [&str; 4] = ["AT+CGMI", "AT+CGMM", "AT+CGMR", "AT+CSQ"];

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: serial-client <device> [baud]");
        exit(2);
    };
    let baud_rate = match args.next().map(|b| b.parse::<u32>()) {
        None => 115_200,
        Some(Ok(baud)) => baud,
        Some(Err(_)) => {
            eprintln!("invalid baud rate");
            exit(2);
        }
    };

    if let Err(e) = run(&path, baud_rate) {
        log::error!("{}: {}", path, e);
        exit(1);
    }
}

fn run(path: &str, baud_rate: u32) -> Result<(), Error> {
    let client = AtClient::new(
        SerialOpener::new(baud_rate),
        Config::default().default_timeout(5_000),
    );
    let device = client.start(path)?;

    let ring = client.add_unsolicited_response_handler(
        "RING",
        device,
        |_| log::info!("Incoming call"),
        1,
    )?;

    for query in QUERIES {
        match client.set_command_and_send(device, query, "", "OK|ERROR|+CME ERROR:", 0) {
            Ok(mut cmd) => {
                if let Ok(text) = cmd.first_intermediate_response() {
                    log::info!("{}: {}", query, text);
                }
                log::info!("{}: {}", query, cmd.final_response()?);
            }
            Err(Error::Timeout) => log::warn!("{}: no answer", query),
            Err(e) => return Err(e),
        }
    }

    client.remove_unsolicited_response_handler(ring)?;
    client.stop(device)
}
