use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use embedded_io::Write;
use heapless::String;

use super::command::Line;
use super::urc::UnsolicitedRegistry;
use crate::device::write_frame;
use crate::helpers::{bounded, LossyStr};
use crate::{Error, COMMAND_MAX_LEN, RESPONSE_MAX_LEN};

/// Ctrl-Z, terminates a text payload.
const SUB: u8 = 0x1A;

/// A command accepted by a device worker, waiting for its turn or in flight.
pub(crate) struct Pending {
    pub command: String<COMMAND_MAX_LEN>,
    pub intermediate: Vec<Line>,
    pub finals: Vec<Line>,
    pub text: Vec<u8>,
    pub timeout: u32,
    pub responses: Vec<Line>,
    pub done: Sender<Completion>,
}

pub(crate) struct Completion {
    pub result: Result<(), Error>,
    pub responses: Vec<Line>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Waiting,
    Sending,
}

/// Client side command state machine of one device.
///
/// Commands are sent one at a time, in submission order. While a command is
/// in flight, received lines are matched against its final patterns first
/// and its intermediate patterns second. Lines matching neither are offered
/// to the unsolicited response handlers.
pub(crate) struct ClientState<W> {
    writer: W,
    state: State,
    queue: VecDeque<Pending>,
    deadline: Option<Instant>,
    pub unsolicited: UnsolicitedRegistry,
}

impl<W: Write> ClientState<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            state: State::Waiting,
            queue: VecDeque::new(),
            deadline: None,
            unsolicited: UnsolicitedRegistry::default(),
        }
    }

    /// When the command in flight times out, if it has a timeout.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn submit(&mut self, pending: Pending) {
        self.queue.push_back(pending);
        if self.state == State::Waiting {
            self.send_next();
        }
    }

    fn send_next(&mut self) {
        while let Some(head) = self.queue.front() {
            debug!("Sending command: {:?}", head.command.as_str());
            self.deadline = (head.timeout > 0)
                .then(|| Instant::now() + Duration::from_millis(u64::from(head.timeout)));

            let res = write_frame(&mut self.writer, &[head.command.as_bytes(), b"\r"]);
            match res {
                Ok(()) => {
                    self.state = State::Sending;
                    return;
                }
                Err(e) => self.complete(Err(e)),
            }
        }
    }

    /// Pop the command in flight and hand its outcome to the sender.
    fn complete(&mut self, result: Result<(), Error>) {
        self.deadline = None;
        self.state = State::Waiting;
        if let Some(pending) = self.queue.pop_front() {
            debug!(
                "Command {:?} completed: {:?}",
                pending.command.as_str(),
                result
            );
            // The sender is gone if its client was dropped mid-command.
            pending
                .done
                .send(Completion {
                    result,
                    responses: pending.responses,
                })
                .ok();
        }
    }

    pub fn on_prompt(&mut self) {
        if self.state != State::Sending {
            return;
        }
        if let Some(head) = self.queue.front() {
            debug!("Prompt, sending {} bytes of text", head.text.len());
            if let Err(e) = write_frame(&mut self.writer, &[head.text.as_slice(), &[SUB]]) {
                error!("Failed to send text payload: {:?}", e);
            }
        }
    }

    pub fn on_line(&mut self, raw: &[u8]) {
        let line = std::string::String::from_utf8_lossy(raw);
        match self.state {
            State::Waiting => self.unsolicited.process(&line),
            State::Sending => {
                if self.check_response(&line, true) {
                    self.complete(Ok(()));
                    self.send_next();
                } else if !self.check_response(&line, false) {
                    self.unsolicited.process(&line);
                }
            }
        }
    }

    pub fn on_timeout(&mut self) {
        if let Some(head) = self.queue.front() {
            error!("Command {:?} timed out", head.command.as_str());
        }
        self.complete(Err(Error::Timeout));
        self.send_next();
    }

    /// Complete everything still queued with [`Error::Cancelled`].
    pub fn cancel_all(&mut self) {
        while !self.queue.is_empty() {
            self.complete(Err(Error::Cancelled));
        }
    }

    /// Match `line` against the final or intermediate patterns of the command
    /// in flight, capturing it on a match.
    fn check_response(&mut self, line: &str, is_final: bool) -> bool {
        let Some(head) = self.queue.front_mut() else {
            return false;
        };
        if line.is_empty() {
            return false;
        }
        if !head.command.is_empty() && line.starts_with(head.command.as_str()) {
            trace!("Skipping echo {:?}", line);
            return false;
        }

        let patterns = if is_final {
            &head.finals
        } else {
            &head.intermediate
        };
        if !patterns.iter().any(|p| line.starts_with(p.as_str())) {
            return false;
        }

        match bounded::<RESPONSE_MAX_LEN>(line) {
            Ok(captured) => {
                debug!(
                    "{} response {:?}",
                    if is_final { "Final" } else { "Intermediate" },
                    LossyStr(line.as_bytes())
                );
                head.responses.push(captured);
                true
            }
            Err(_) => {
                error!("Response too long ({} bytes), ignored", line.len());
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crossbeam_channel::{bounded, Receiver};

    use super::*;
    use crate::client::urc::Subscription;

    fn pending(
        command: &str,
        intermediate: &[&str],
        finals: &[&str],
        timeout: u32,
    ) -> (Pending, Receiver<Completion>) {
        let (done, rx) = bounded(1);
        let p = Pending {
            command: String::try_from(command).unwrap(),
            intermediate: intermediate
                .iter()
                .map(|s| Line::try_from(*s).unwrap())
                .collect(),
            finals: finals.iter().map(|s| Line::try_from(*s).unwrap()).collect(),
            text: b"hello".to_vec(),
            timeout,
            responses: Vec::new(),
            done,
        };
        (p, rx)
    }

    fn responses(c: &Completion) -> Vec<&str> {
        c.responses.iter().map(|l| l.as_str()).collect()
    }

    #[test]
    fn commands_drain_in_order() {
        let mut sm = ClientState::new(Vec::<u8>::new());
        let (a, a_rx) = pending("AT+A", &[""], &["OK"], 0);
        let (b, b_rx) = pending("AT+B", &[""], &["OK"], 0);
        let (c, c_rx) = pending("AT+C", &[""], &["OK"], 0);
        sm.submit(a);
        sm.submit(b);
        sm.submit(c);
        assert_eq!(sm.writer, b"AT+A\r");

        sm.on_line(b"OK");
        assert_eq!(sm.writer, b"AT+A\rAT+B\r");
        sm.on_line(b"OK");
        sm.on_line(b"OK");
        assert_eq!(sm.writer, b"AT+A\rAT+B\rAT+C\r");

        for rx in [a_rx, b_rx, c_rx] {
            assert_eq!(rx.try_recv().unwrap().result, Ok(()));
            assert!(rx.try_recv().is_err());
        }
        assert_eq!(sm.state, State::Waiting);
    }

    #[test]
    fn final_patterns_take_precedence() {
        let mut sm = ClientState::new(Vec::<u8>::new());
        let (p, rx) = pending("AT+CSQ", &[""], &["OK", "ERROR"], 0);
        sm.submit(p);

        sm.on_line(b"+CSQ: 20,99");
        sm.on_line(b"");
        sm.on_line(b"OK");
        let done = rx.try_recv().unwrap();
        assert_eq!(done.result, Ok(()));
        assert_eq!(responses(&done), vec!["+CSQ: 20,99", "OK"]);
    }

    #[test]
    fn intermediate_filter_and_echo() {
        let mut sm = ClientState::new(Vec::<u8>::new());
        let (p, rx) = pending("AT+CGDCONT?", &["+CGDCONT:"], &["OK"], 0);
        sm.submit(p);

        sm.on_line(b"AT+CGDCONT?\r");
        sm.on_line(b"+CGDCONT: 1,\"IP\",\"internet\"");
        sm.on_line(b"+CREG: 1");
        sm.on_line(b"OK");
        let done = rx.try_recv().unwrap();
        assert_eq!(
            responses(&done),
            vec!["+CGDCONT: 1,\"IP\",\"internet\"", "OK"]
        );
    }

    #[test]
    fn timeout_completes_once() {
        let mut sm = ClientState::new(Vec::<u8>::new());
        let (a, a_rx) = pending("AT+A", &[""], &["OK"], 100);
        let (b, b_rx) = pending("AT+B", &[""], &["OK"], 0);
        sm.submit(a);
        sm.submit(b);
        assert!(sm.deadline().is_some());

        sm.on_timeout();
        assert_eq!(a_rx.try_recv().unwrap().result, Err(Error::Timeout));
        assert_eq!(sm.writer, b"AT+A\rAT+B\r");
        assert!(sm.deadline().is_none());

        // The late answer to AT+A completes AT+B, the stray one nothing.
        sm.on_line(b"OK");
        sm.on_line(b"OK");
        assert!(a_rx.try_recv().is_err());
        assert_eq!(b_rx.try_recv().unwrap().result, Ok(()));
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn prompt_sends_text() {
        let mut sm = ClientState::new(Vec::<u8>::new());
        let (p, rx) = pending("AT+CMGS=5", &["+CMGS:"], &["OK"], 0);
        sm.on_prompt();
        assert!(sm.writer.is_empty());

        sm.submit(p);
        sm.on_prompt();
        assert_eq!(sm.writer, b"AT+CMGS=5\rhello\x1a");
        sm.on_line(b"+CMGS: 4");
        sm.on_line(b"OK");
        assert_eq!(responses(&rx.try_recv().unwrap()), vec!["+CMGS: 4", "OK"]);
    }

    #[test]
    fn unsolicited_during_command() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut sm = ClientState::new(Vec::<u8>::new());
        sm.unsolicited.add(
            0,
            Subscription::new(
                Line::try_from("+CREG:").unwrap(),
                1,
                Box::new(move |s| sink.lock().push(s.to_string())),
            ),
        );

        sm.on_line(b"+CREG: 2");
        let (p, _rx) = pending("AT+COPS?", &["+COPS:"], &["OK"], 0);
        sm.submit(p);
        sm.on_line(b"+CREG: 1");
        sm.on_line(b"OK");
        assert_eq!(*seen.lock(), vec!["+CREG: 2", "+CREG: 1"]);
    }

    #[test]
    fn intermediate_response_is_not_unsolicited() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut sm = ClientState::new(Vec::<u8>::new());
        sm.unsolicited.add(
            0,
            Subscription::new(
                Line::try_from("+CREG:").unwrap(),
                1,
                Box::new(move |s| sink.lock().push(s.to_string())),
            ),
        );

        let (p, rx) = pending("AT+CREG?", &["+CREG:"], &["OK"], 0);
        sm.submit(p);
        sm.on_line(b"+CREG: 0,1");
        sm.on_line(b"OK");
        assert_eq!(responses(&rx.try_recv().unwrap()), vec!["+CREG: 0,1", "OK"]);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn oversize_line_is_no_match() {
        let mut sm = ClientState::new(Vec::<u8>::new());
        let (p, rx) = pending("AT", &[""], &["OK"], 0);
        sm.submit(p);

        let mut long = b"OK".to_vec();
        long.resize(RESPONSE_MAX_LEN + 1, b'!');
        sm.on_line(&long);
        assert!(rx.try_recv().is_err());
        sm.on_line(b"OK");
        assert_eq!(responses(&rx.try_recv().unwrap()), vec!["OK"]);
    }

    #[test]
    fn cancel_completes_everything() {
        let mut sm = ClientState::new(Vec::<u8>::new());
        let (a, a_rx) = pending("AT+A", &[""], &["OK"], 0);
        let (b, b_rx) = pending("AT+B", &[""], &["OK"], 0);
        sm.submit(a);
        sm.submit(b);
        sm.cancel_all();
        assert_eq!(a_rx.try_recv().unwrap().result, Err(Error::Cancelled));
        assert_eq!(b_rx.try_recv().unwrap().result, Err(Error::Cancelled));
        assert_eq!(sm.writer, b"AT+A\r");
    }
}
