use heapless::Vec;

use crate::helpers::LossyStr;
use crate::COMMAND_MAX_LEN;

const CR: u8 = 0x0D;
const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;

/// Length of the `AT` prefix.
const PREFIX_LEN: usize = 2;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Frame<'a> {
    /// A complete command line, `AT` prefix included, CR excluded.
    Line(&'a [u8]),
    /// The line in progress did not fit and was dropped.
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    SearchA,
    SearchT,
    SearchCr,
    /// Skipping the rest of an overflowed line.
    Discard,
}

/// Cuts the byte stream of a device into command lines.
pub(crate) struct Framer {
    state: State,
    buf: Vec<u8, COMMAND_MAX_LEN>,
}

impl Framer {
    pub const fn new() -> Self {
        Self {
            state: State::SearchA,
            buf: Vec::new(),
        }
    }

    pub fn feed(&mut self, data: &[u8], mut on_frame: impl FnMut(Frame<'_>)) {
        for &byte in data {
            match self.state {
                State::SearchA => {
                    if byte.eq_ignore_ascii_case(&b'a') {
                        self.buf.clear();
                        // Cannot fail, the buffer was just cleared.
                        self.buf.push(byte).ok();
                        self.state = State::SearchT;
                    }
                }
                State::SearchT => match byte {
                    b'T' | b't' => {
                        self.buf.push(byte).ok();
                        self.state = State::SearchCr;
                    }
                    b'A' | b'a' => {}
                    _ => self.state = State::SearchA,
                },
                State::SearchCr => match byte {
                    CR => {
                        debug!("Command line {:?}", LossyStr(&self.buf));
                        on_frame(Frame::Line(&self.buf));
                        self.state = State::SearchA;
                    }
                    BACKSPACE | DELETE => {
                        if self.buf.len() > PREFIX_LEN {
                            self.buf.pop();
                        }
                    }
                    _ => {
                        if self.buf.push(byte).is_err() {
                            warn!("Command line exceeds {} bytes", COMMAND_MAX_LEN);
                            on_frame(Frame::Overflow);
                            self.state = State::Discard;
                        }
                    }
                },
                State::Discard => {
                    if byte == CR {
                        self.state = State::SearchA;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Owned {
        Line(std::vec::Vec<u8>),
        Overflow,
    }

    fn feed(framer: &mut Framer, data: &[u8]) -> std::vec::Vec<Owned> {
        let mut frames = std::vec::Vec::new();
        framer.feed(data, |frame| {
            frames.push(match frame {
                Frame::Line(line) => Owned::Line(line.to_vec()),
                Frame::Overflow => Owned::Overflow,
            })
        });
        frames
    }

    #[test]
    fn finds_prefix() {
        let mut framer = Framer::new();
        assert_eq!(
            feed(&mut framer, b"\r\nxxaAt+cgmi\r"),
            vec![Owned::Line(b"at+cgmi".to_vec())]
        );
        assert_eq!(feed(&mut framer, b"ax\rAT"), vec![]);
        assert_eq!(
            feed(&mut framer, b"E1\r"),
            vec![Owned::Line(b"ATE1".to_vec())]
        );
    }

    #[test]
    fn backspace_keeps_prefix() {
        let mut framer = Framer::new();
        assert_eq!(
            feed(&mut framer, b"AT+CSQ\x7f\x7fGMI\r"),
            vec![Owned::Line(b"AT+CGMI".to_vec())]
        );
        assert_eq!(
            feed(&mut framer, b"ATZ\x08\x08\x08\x7fI\r"),
            vec![Owned::Line(b"ATI".to_vec())]
        );
    }

    #[test]
    fn overflow_drops_line() {
        let mut framer = Framer::new();
        let mut line = b"AT+".to_vec();
        line.resize(COMMAND_MAX_LEN + 10, b'1');
        line.push(CR);
        assert_eq!(feed(&mut framer, &line), vec![Owned::Overflow]);

        assert_eq!(
            feed(&mut framer, b"AT\r"),
            vec![Owned::Line(b"AT".to_vec())]
        );
    }
}
