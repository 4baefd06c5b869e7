//! Device I/O.
//!
//! Both engines reach their devices through [`embedded_io::Read`] and
//! [`embedded_io::Write`]. Every opened device gets a reader thread that
//! blocks in `read` and forwards each chunk to the device worker.

use std::thread;
use std::time::Duration;

use embedded_io::{Error as _, ErrorKind, Read, Write};
use embedded_io_adapters::std::FromStd;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::helpers::LossyStr;
use crate::Error;

/// Opens the device behind a path, returning its read and write halves.
pub trait Opener: Send + Sync + 'static {
    type Reader: Read + Send + 'static;
    type Writer: Write + Send + 'static;

    fn open(&self, path: &str) -> Result<(Self::Reader, Self::Writer), Error>;
}

/// Opens serial ports, 8N1 without flow control.
///
/// ```no_run
/// use std::time::Duration;
/// use atservices::device::SerialOpener;
///
/// let opener = SerialOpener::new(9_600).timeout(Duration::from_millis(50));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialOpener {
    baud_rate: u32,
    timeout: Duration,
}

impl Default for SerialOpener {
    fn default() -> Self {
        Self::new(115_200)
    }
}

impl SerialOpener {
    #[must_use]
    pub const fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            timeout: Duration::from_millis(100),
        }
    }

    /// Read timeout of the port. A read that times out lets the reader
    /// thread check whether its device is still served.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Opener for SerialOpener {
    type Reader = FromStd<Box<dyn SerialPort>>;
    type Writer = FromStd<Box<dyn SerialPort>>;

    fn open(&self, path: &str) -> Result<(Self::Reader, Self::Writer), Error> {
        let port = serialport::new(path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .flow_control(FlowControl::None)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(self.timeout)
            .open()
            .map_err(|e| {
                error!("Failed to open {}: {}", path, e.description.as_str());
                Error::Open
            })?;
        let reader = port.try_clone().map_err(|e| {
            error!("Failed to clone {}: {}", path, e.description.as_str());
            Error::Open
        })?;
        Ok((FromStd::new(reader), FromStd::new(port)))
    }
}

/// Write every buffer in `parts` and flush the device.
pub(crate) fn write_frame<W: Write>(writer: &mut W, parts: &[&[u8]]) -> Result<(), Error> {
    for part in parts {
        write_all(writer, part)?;
    }
    writer.flush().map_err(|e| {
        error!("Got serial flush error {:?}", e.kind());
        Error::Write
    })
}

pub(crate) fn write_all<W: Write>(writer: &mut W, mut buf: &[u8]) -> Result<(), Error> {
    trace!("Tx {:?}", LossyStr(buf));
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => {
                error!("Device accepted no bytes");
                return Err(Error::Write);
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                error!("Got serial write error {:?}", e.kind());
                return Err(Error::Write);
            }
        }
    }
    Ok(())
}

/// Spawn a detached thread reading `reader` in chunks of `chunk` bytes.
///
/// Every chunk is handed to `forward` as `Some(bytes)`, and a read that timed
/// out as `Some` of nothing; end of file and read errors are reported once
/// as `None`. The thread exits once `forward` returns `false`, which happens
/// when the device worker has gone.
pub(crate) fn spawn_reader<R, F>(
    name: String,
    mut reader: R,
    chunk: usize,
    mut forward: F,
) -> Result<(), Error>
where
    R: Read + Send + 'static,
    F: FnMut(Option<Vec<u8>>) -> bool + Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            let mut buf = vec![0; chunk.max(1)];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!("Device reached end of file");
                        forward(None);
                        break;
                    }
                    Ok(n) => {
                        trace!("Rx {:?}", LossyStr(&buf[..n]));
                        if !forward(Some(buf[..n].to_vec())) {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) if e.kind() == ErrorKind::TimedOut => {
                        if !forward(Some(Vec::new())) {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Got serial read error {:?}", e.kind());
                        forward(None);
                        break;
                    }
                }
            }
        })
        .map(drop)
        .map_err(|_| Error::Fault)
}
