//! In-memory devices for tests.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use embedded_io::{ErrorKind, ErrorType};
use parking_lot::Mutex;

use crate::device::Opener;
use crate::Error;

const WAIT: Duration = Duration::from_secs(5);

/// Write half. Every flush publishes the bytes written since the previous
/// flush.
pub struct TxMock {
    buf: Vec<u8>,
    publisher: Sender<Vec<u8>>,
}

impl ErrorType for TxMock {
    type Error = ErrorKind;
}

impl embedded_io::Write for TxMock {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if !self.buf.is_empty() {
            self.publisher
                .send(core::mem::take(&mut self.buf))
                .map_err(|_| ErrorKind::BrokenPipe)?;
        }
        Ok(())
    }
}

/// Read half. Blocks until the test feeds it, and reports end of file once
/// the feeding side is dropped.
pub struct RxMock {
    feed: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl ErrorType for RxMock {
    type Error = ErrorKind;
}

impl embedded_io::Read for RxMock {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        while self.pending.is_empty() {
            match self.feed.recv() {
                Ok(data) => self.pending = data,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// The far end of a mock device, driven by the test.
pub struct Peer {
    feed: Sender<Vec<u8>>,
    written: Receiver<Vec<u8>>,
}

impl Peer {
    /// Make `data` available to the device reader.
    pub fn send(&self, data: &[u8]) {
        self.feed.send(data.to_vec()).unwrap();
    }

    /// The next flushed write of the device.
    pub fn recv(&self) -> Vec<u8> {
        self.written
            .recv_timeout(WAIT)
            .expect("device did not write in time")
    }

    /// Flushed writes are concatenated until `expected` bytes arrived.
    pub fn expect(&self, expected: &[u8]) {
        let mut got = Vec::new();
        while got.len() < expected.len() {
            got.extend(self.recv());
        }
        assert_eq!(
            String::from_utf8_lossy(&got),
            String::from_utf8_lossy(expected)
        );
    }

    /// Assert that nothing is written within `wait`.
    pub fn expect_silence(&self, wait: Duration) {
        if let Ok(data) = self.written.recv_timeout(wait) {
            panic!("unexpected write {:?}", String::from_utf8_lossy(&data));
        }
    }
}

pub fn device() -> (RxMock, TxMock, Peer) {
    let (feed, feed_rx) = unbounded();
    let (publisher, written) = unbounded();
    (
        RxMock {
            feed: feed_rx,
            pending: Vec::new(),
        },
        TxMock {
            buf: Vec::new(),
            publisher,
        },
        Peer { feed, written },
    )
}

/// Hands out mock devices by path. Each path can be opened once.
#[derive(Default)]
pub struct MockOpener {
    devices: Mutex<HashMap<String, (RxMock, TxMock)>>,
}

impl MockOpener {
    pub fn add(&self, path: &str) -> Peer {
        let (rx, tx, peer) = device();
        self.devices.lock().insert(path.to_string(), (rx, tx));
        peer
    }
}

impl Opener for MockOpener {
    type Reader = RxMock;
    type Writer = TxMock;

    fn open(&self, path: &str) -> Result<(RxMock, TxMock), Error> {
        self.devices.lock().remove(path).ok_or(Error::Open)
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
