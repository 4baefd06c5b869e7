use heapless::Vec;

use crate::helpers::LossyStr;
use crate::RX_BUFFER_LEN;

/// Something the modem sent, as seen by the client state machine.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RxEvent<'a> {
    /// A complete line, without its surrounding `\r\n`.
    Line(&'a [u8]),
    /// The `>` prompt asking for a text payload.
    Prompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    /// Nothing received yet.
    Starting,
    /// Skipping garbage until the first line delimiter.
    Initializing,
    /// Between lines. `line_start` points right after the last `\r\n`.
    Processing,
}

enum Token {
    Crlf { line_end: usize },
    Prompt,
    Char,
}

/// Splits the client receive stream into `\r\n` delimited lines.
pub(crate) struct RxParser {
    buf: Vec<u8, RX_BUFFER_LEN>,
    /// Next byte to examine.
    idx: usize,
    line_start: usize,
    state: State,
}

impl RxParser {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            idx: 0,
            line_start: 0,
            state: State::Starting,
        }
    }

    /// Append received bytes, returning how many fit in the buffer.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.buf.capacity() - self.buf.len());
        // Cannot fail, `n` fits the remaining capacity.
        self.buf.extend_from_slice(&data[..n]).ok();
        n
    }

    /// Drop everything buffered. Used when a line outgrows the buffer.
    pub fn discard(&mut self) {
        warn!(
            "Rx buffer overflow, dropping {:?}",
            LossyStr(&self.buf[self.line_start.min(self.buf.len())..])
        );
        self.buf.clear();
        self.idx = 0;
        self.line_start = 0;
        if self.state == State::Processing {
            // Keep the delimiter in front of the next line.
            self.buf.extend_from_slice(b"\r\n").ok();
            self.idx = 2;
            self.line_start = 2;
        }
    }

    /// Run all buffered bytes through the parser, calling `on_event` for every
    /// line and prompt found.
    pub fn digest<F: FnMut(RxEvent<'_>)>(&mut self, mut on_event: F) {
        while let Some(token) = self.next_token() {
            match (self.state, token) {
                (State::Starting | State::Initializing, Token::Crlf { .. }) => {
                    self.line_start = self.idx;
                    self.state = State::Processing;
                }
                (State::Starting, Token::Char) => self.state = State::Initializing,
                (State::Processing, Token::Crlf { line_end }) => {
                    let line = &self.buf[self.line_start..line_end];
                    trace!("Line {:?}", LossyStr(line));
                    on_event(RxEvent::Line(line));
                    self.line_start = self.idx;
                }
                (State::Processing, Token::Prompt) => on_event(RxEvent::Prompt),
                _ => {}
            }
        }

        self.compact();
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            let c = *self.buf.get(self.idx)?;
            match c {
                b'\r' => match self.buf.get(self.idx + 1) {
                    // Wait for the byte deciding what this is.
                    None => return None,
                    Some(b'\n') => {
                        let line_end = self.idx;
                        self.idx += 2;
                        return Some(Token::Crlf { line_end });
                    }
                    Some(_) => self.idx += 1,
                },
                b'\n' => self.idx += 1,
                b'>' => {
                    self.idx += 1;
                    return Some(Token::Prompt);
                }
                _ => {
                    self.idx += 1;
                    return Some(Token::Char);
                }
            }
        }
    }

    /// Move the unterminated tail, with the delimiter in front of it, to the
    /// head of the buffer. Only done between lines, so nothing still referenced
    /// is moved.
    fn compact(&mut self) {
        if self.state != State::Processing || self.line_start < 2 {
            return;
        }
        let from = self.line_start - 2;
        if from == 0 {
            return;
        }
        let len = self.buf.len();
        self.buf.copy_within(from..len, 0);
        self.buf.truncate(len - from);
        self.idx -= from;
        self.line_start = 2;
    }
}
