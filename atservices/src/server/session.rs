use std::collections::VecDeque;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use embedded_io::Write;
use parking_lot::Mutex;

use super::config::ErrorCodes;
use super::framer::{Frame, Framer};
use super::parser::SubCommands;
use super::registry::Registry;
use super::response::{ErrorTable, FinalResponse, FinalResult, Response};
use crate::device::write_frame;
use crate::helpers::LossyStr;
use crate::{CommandRef, DeviceRef};

/// State shared by a server and its device workers.
#[derive(Default)]
pub(crate) struct Shared {
    pub registry: Mutex<Registry>,
    pub errors: Mutex<ErrorTable>,
    pub error_codes: Mutex<ErrorCodes>,
}

/// Everything a server device worker reacts to.
pub(crate) enum Event {
    /// Bytes received from the device.
    Rx(Vec<u8>),
    /// The device reader hit end of file or a read error.
    Closed,
    Intermediate(CommandRef, Response),
    Final(CommandRef, FinalResponse, Option<Response>, u32),
    Unsolicited(Response),
    Echo(bool),
    Stop,
}

/// Serves one device: frames and parses the received command lines,
/// dispatches them to the command handlers and writes the responses.
pub(crate) struct Worker<W> {
    framer: Framer,
    session: Session<W>,
}

impl<W: Write> Worker<W> {
    pub fn new(
        name: String,
        device: DeviceRef,
        writer: W,
        shared: Arc<Shared>,
        echo: bool,
    ) -> Self {
        Self {
            framer: Framer::new(),
            session: Session {
                name,
                device,
                writer,
                shared,
                echo,
                processing: false,
                commands: SubCommands::empty(),
                current: None,
                final_result: FinalResult::default(),
                deferred: VecDeque::new(),
            },
        }
    }

    pub fn run(mut self, events: Receiver<Event>) {
        for event in events.iter() {
            match event {
                Event::Rx(data) => {
                    if self.session.echo && !data.is_empty() {
                        self.session.write_raw(&data);
                    }
                    let session = &mut self.session;
                    self.framer.feed(&data, |frame| session.on_frame(frame));
                }
                Event::Closed => {
                    warn!("{}: device closed", self.session.name.as_str());
                }
                Event::Intermediate(cmd, text) => self.session.on_intermediate(cmd, &text),
                Event::Final(cmd, kind, pattern, code) => {
                    self.session.on_final(cmd, kind, pattern.as_ref(), code);
                }
                Event::Unsolicited(text) => self.session.on_unsolicited(text),
                Event::Echo(on) => {
                    debug!("{}: echo {}", self.session.name.as_str(), on);
                    self.session.echo = on;
                }
                Event::Stop => break,
            }
        }

        self.session.abandon();
        info!("{} stopped", self.session.name.as_str());
    }
}

struct Session<W> {
    name: String,
    device: DeviceRef,
    writer: W,
    shared: Arc<Shared>,
    echo: bool,
    /// A command line is being answered.
    processing: bool,
    commands: SubCommands,
    /// Sub-command whose handler has been called and not answered yet.
    current: Option<CommandRef>,
    final_result: FinalResult,
    /// Unsolicited responses held back until the line is answered.
    deferred: VecDeque<Response>,
}

impl<W: Write> Session<W> {
    fn write_raw(&mut self, data: &[u8]) {
        if let Err(e) = write_frame(&mut self.writer, &[data]) {
            error!("{}: echo failed: {:?}", self.name.as_str(), e);
        }
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = write_frame(&mut self.writer, &[b"\r\n", text.as_bytes(), b"\r\n"]) {
            error!(
                "{}: failed to send {:?}: {:?}",
                self.name.as_str(),
                LossyStr(text.as_bytes()),
                e
            );
        }
    }

    fn on_frame(&mut self, frame: Frame<'_>) {
        match frame {
            Frame::Overflow => self.write(FinalResponse::Error.as_str()),
            Frame::Line(_) if self.processing => {
                warn!("{}: command in progress, line dropped", self.name.as_str());
                self.write(FinalResponse::Error.as_str());
            }
            Frame::Line(line) => {
                self.processing = true;
                self.final_result = FinalResult::default();
                self.commands = SubCommands::new(line);
                self.dispatch_next();
            }
        }
    }

    /// Parse the next sub-command of the line and call its handler, or write
    /// the final response when there is nothing left to do.
    fn dispatch_next(&mut self) {
        let next = self
            .commands
            .next(&mut self.shared.registry.lock(), self.device);
        let cmd = match next {
            None => return self.finish(),
            Some(Err(_)) => {
                self.final_result = FinalResult::not_allowed();
                return self.finish();
            }
            Some(Ok(cmd)) => cmd,
        };

        let dispatch = self
            .shared
            .registry
            .lock()
            .get(cmd)
            .map(|entry| (entry.handler.clone(), entry.kind, entry.params.len()));
        match dispatch {
            Some((Some(handler), kind, count)) => {
                debug!(
                    "{}: dispatching {:?} with {} parameters",
                    self.name.as_str(),
                    kind,
                    count
                );
                self.current = Some(cmd);
                handler(cmd, kind, count);
            }
            _ => {
                warn!("{}: command has no handler", self.name.as_str());
                self.shared.registry.lock().release(cmd);
                self.final_result = FinalResult {
                    kind: FinalResponse::Error,
                    ..FinalResult::default()
                };
                self.finish();
            }
        }
    }

    fn on_intermediate(&mut self, cmd: CommandRef, text: &str) {
        if self.current != Some(cmd) {
            error!("{}: command not processing anymore", self.name.as_str());
            return;
        }
        self.write(text);
    }

    fn on_final(
        &mut self,
        cmd: CommandRef,
        kind: FinalResponse,
        pattern: Option<&Response>,
        code: u32,
    ) {
        if self.current != Some(cmd) {
            error!("{}: command not processing anymore", self.name.as_str());
            return;
        }
        self.current = None;
        self.final_result.update(kind, pattern, code);
        if kind == FinalResponse::Error {
            self.finish();
        } else {
            self.dispatch_next();
        }
    }

    fn on_unsolicited(&mut self, text: Response) {
        if self.processing {
            self.deferred.push_back(text);
        } else {
            self.write(&text);
        }
    }

    /// Write the final response of the line, then the unsolicited responses
    /// held back while it was processed.
    fn finish(&mut self) {
        let text = {
            let mode = *self.shared.error_codes.lock();
            self.shared.errors.lock().format(&self.final_result, mode)
        };
        debug!("{}: final response {:?}", self.name.as_str(), text.as_str());
        self.write(&text);

        self.processing = false;
        self.current = None;
        self.commands = SubCommands::empty();
        self.final_result = FinalResult::default();
        while let Some(text) = self.deferred.pop_front() {
            self.write(&text);
        }
    }

    /// Release the command in progress and drop what was held back.
    fn abandon(&mut self) {
        if let Some(cmd) = self.current.take() {
            self.shared.registry.lock().release(cmd);
        }
        self.deferred.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::handle::Arena;
    use crate::server::{CommandHandler, CommandType, CME_ERROR};

    struct Fixture {
        worker: Worker<Vec<u8>>,
        shared: Arc<Shared>,
    }

    impl Fixture {
        fn new() -> Self {
            let shared = Arc::new(Shared::default());
            let mut devices = Arena::new();
            let device = DeviceRef(devices.insert(()));
            Self {
                worker: Worker::new("test".into(), device, Vec::new(), shared.clone(), false),
                shared,
            }
        }

        fn subscribe(&self, name: &str) -> CommandRef {
            let cmd = self.shared.registry.lock().create(name).unwrap();
            let handler: CommandHandler = Arc::new(|_, _, _| {});
            self.shared.registry.lock().get_mut(cmd).unwrap().handler = Some(handler);
            cmd
        }

        fn rx(&mut self, data: &[u8]) {
            let session = &mut self.worker.session;
            self.worker.framer.feed(data, |frame| session.on_frame(frame));
        }

        fn answer(&mut self, cmd: CommandRef, kind: FinalResponse) {
            self.shared.registry.lock().release(cmd);
            self.worker.session.on_final(cmd, kind, None, 0);
        }

        fn take_output(&mut self) -> String {
            let out = core::mem::take(&mut self.worker.session.writer);
            String::from_utf8(out).unwrap()
        }
    }

    #[test]
    fn chained_line_answers_once() {
        let mut fx = Fixture::new();
        let cmd1 = fx.subscribe("AT+CMD1");
        let cmd2 = fx.subscribe("AT+CMD2");

        fx.rx(b"AT+CMD1=1;+CMD2=2\r");
        assert_eq!(fx.worker.session.current, Some(cmd1));
        fx.answer(cmd1, FinalResponse::Ok);
        assert_eq!(fx.worker.session.current, Some(cmd2));
        assert_eq!(
            fx.shared.registry.lock().get(cmd2).unwrap().kind,
            CommandType::Para
        );
        assert_eq!(fx.take_output(), "");

        fx.answer(cmd2, FinalResponse::Ok);
        assert_eq!(fx.take_output(), "\r\nOK\r\n");
        assert!(!fx.worker.session.processing);
    }

    #[test]
    fn error_final_abandons_line() {
        let mut fx = Fixture::new();
        let cmd1 = fx.subscribe("AT+CMD1");
        fx.subscribe("AT+CMD2");

        fx.rx(b"AT+CMD1;+CMD2\r");
        fx.answer(cmd1, FinalResponse::Error);
        assert_eq!(fx.take_output(), "\r\nERROR\r\n");
        assert_eq!(fx.worker.session.current, None);
        assert!(!fx.worker.session.processing);
    }

    #[test]
    fn unsolicited_held_back_while_processing() {
        let mut fx = Fixture::new();
        let cmd = fx.subscribe("AT+CMD");
        let urc = |s: &str| Response::try_from(s).unwrap();

        fx.rx(b"AT+CMD\r");
        fx.worker.session.on_unsolicited(urc("+URC: 1"));
        fx.worker.session.on_intermediate(cmd, "+CMD: 0");
        fx.worker.session.on_unsolicited(urc("+URC: 2"));
        fx.answer(cmd, FinalResponse::Ok);
        assert_eq!(
            fx.take_output(),
            "\r\n+CMD: 0\r\n\r\nOK\r\n\r\n+URC: 1\r\n\r\n+URC: 2\r\n"
        );

        fx.worker.session.on_unsolicited(urc("+URC: 3"));
        assert_eq!(fx.take_output(), "\r\n+URC: 3\r\n");
    }

    #[test]
    fn second_line_rejected_while_processing() {
        let mut fx = Fixture::new();
        let cmd = fx.subscribe("AT+CMD");

        fx.rx(b"AT+CMD\rAT+CMD\r");
        assert_eq!(fx.take_output(), "\r\nERROR\r\n");
        assert_eq!(fx.worker.session.current, Some(cmd));
        fx.answer(cmd, FinalResponse::Ok);
        assert_eq!(fx.take_output(), "\r\nOK\r\n");
    }

    #[test]
    fn parse_error_reports_not_allowed() {
        let mut fx = Fixture::new();
        *fx.shared.error_codes.lock() = ErrorCodes::Extended;

        fx.rx(b"AT+NOPE\r");
        assert_eq!(fx.take_output(), format!("\r\n{}3\r\n", CME_ERROR));

        let cmd = fx.shared.registry.lock().create("AT+BARE").unwrap();
        fx.rx(b"AT+BARE\r");
        assert_eq!(fx.take_output(), "\r\nERROR\r\n");
        assert!(!fx.shared.registry.lock().get(cmd).unwrap().processing);
    }

    #[test]
    fn stale_answers_ignored() {
        let mut fx = Fixture::new();
        let cmd = fx.subscribe("AT+CMD");
        fx.worker.session.on_intermediate(cmd, "+CMD: 1");
        fx.worker.session.on_final(cmd, FinalResponse::Ok, None, 0);
        assert_eq!(fx.take_output(), "");
    }

    #[test]
    fn abandon_releases_command() {
        let mut fx = Fixture::new();
        let cmd = fx.subscribe("AT+CMD");
        fx.rx(b"AT+CMD\r");
        fx.worker.session.on_unsolicited(Response::try_from("+URC").unwrap());
        fx.worker.session.abandon();
        assert!(!fx.shared.registry.lock().get(cmd).unwrap().processing);
        assert!(fx.worker.session.deferred.is_empty());
    }
}
