use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use embedded_io::Write;

use super::rx_parser::{RxEvent, RxParser};
use super::state::{ClientState, Completion, Pending};
use super::urc::Subscription;
use crate::device::{spawn_reader, Opener};
use crate::Error;

/// Everything a client device worker reacts to.
pub(crate) enum Event {
    /// Bytes received from the device.
    Rx(Vec<u8>),
    /// The device reader hit end of file or a read error.
    Closed,
    Send(Pending),
    AddUnsolicited(u32, Subscription),
    RemoveUnsolicited(u32),
    Stop,
}

/// Open `path` on a new worker thread and start serving it.
///
/// Returns once the device is open and its reader is running, or with the
/// error that prevented it.
pub(crate) fn spawn_worker<O: Opener>(
    opener: Arc<O>,
    path: &str,
    name: String,
    read_chunk: usize,
) -> Result<(Sender<Event>, JoinHandle<()>), Error> {
    let (events, rx) = unbounded();
    let (ready_tx, ready) = bounded(1);
    let reader_events = events.clone();
    let path = path.to_string();

    let worker = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let (reader, writer) = match opener.open(&path) {
                Ok(halves) => halves,
                Err(e) => {
                    ready_tx.send(Err(e)).ok();
                    return;
                }
            };

            let forward = move |data: Option<Vec<u8>>| {
                reader_events
                    .send(data.map_or(Event::Closed, Event::Rx))
                    .is_ok()
            };
            if let Err(e) = spawn_reader(format!("{}-rx", name), reader, read_chunk, forward) {
                ready_tx.send(Err(e)).ok();
                return;
            }

            info!("Started {} on {}", name.as_str(), path.as_str());
            ready_tx.send(Ok(())).ok();
            Worker::new(name, writer).run(rx);
        })
        .map_err(|_| Error::Fault)?;

    match ready.recv() {
        Ok(Ok(())) => Ok((events, worker)),
        Ok(Err(e)) => {
            worker.join().ok();
            Err(e)
        }
        Err(_) => {
            worker.join().ok();
            Err(Error::Fault)
        }
    }
}

struct Worker<W> {
    name: String,
    parser: RxParser,
    state: ClientState<W>,
}

impl<W: Write> Worker<W> {
    fn new(name: String, writer: W) -> Self {
        Self {
            name,
            parser: RxParser::new(),
            state: ClientState::new(writer),
        }
    }

    fn run(mut self, events: Receiver<Event>) {
        loop {
            let event = match self.state.deadline() {
                Some(deadline) => match events.recv_deadline(deadline) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => {
                        self.state.on_timeout();
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match events.recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };

            match event {
                Event::Rx(data) => self.ingest(&data),
                Event::Closed => {
                    warn!("{}: device closed", self.name.as_str());
                }
                Event::Send(pending) => self.state.submit(pending),
                Event::AddUnsolicited(id, subscription) => {
                    self.state.unsolicited.add(id, subscription);
                }
                Event::RemoveUnsolicited(id) => {
                    if !self.state.unsolicited.remove(id) {
                        warn!("{}: no unsolicited handler {}", self.name.as_str(), id);
                    }
                }
                Event::Stop => break,
            }
        }

        self.state.cancel_all();
        for event in events.try_iter() {
            if let Event::Send(pending) = event {
                pending
                    .done
                    .send(Completion {
                        result: Err(Error::Cancelled),
                        responses: Vec::new(),
                    })
                    .ok();
            }
        }
        info!("{} stopped", self.name.as_str());
    }

    fn ingest(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let n = self.parser.write(data);
            data = &data[n..];

            let state = &mut self.state;
            self.parser.digest(|event| match event {
                RxEvent::Line(line) => state.on_line(line),
                RxEvent::Prompt => state.on_prompt(),
            });

            if n == 0 {
                self.parser.discard();
            }
        }
    }
}
