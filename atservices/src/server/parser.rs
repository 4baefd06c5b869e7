//! Command line parser.
//!
//! A line such as `AT+CMD1=1;+CMD2=?;E0V1` holds several sub-commands. The
//! text after `AT` is first cut on the `;` that are not quoted; each piece
//! is then parsed on its own, with an `AT` prefix put back in front, by a
//! state machine indexed by the class of the previous and the current
//! character. Basic commands (`ATE0V1`) do not need a `;` between them: the
//! parse of the first one stops where its parameter ends and hands the rest
//! back as the next sub-command.

use std::collections::VecDeque;

use nom::branch::alt;
use nom::bytes::complete::{is_not, take_till};
use nom::character::complete::char;
use nom::combinator::{opt, recognize};
use nom::multi::many0_count;
use nom::sequence::{pair, tuple};
use nom::IResult;

use super::registry::{CommandType, Parameter, Registry};
use crate::helpers::LossyStr;
use crate::{CommandRef, DeviceRef, Error, PARAMETER_MAX_LEN};

const PREFIX: &[u8] = b"AT";

/// Raw bytes of a parameter, checked for UTF-8 once complete.
type ParamBytes = heapless::Vec<u8, PARAMETER_MAX_LEN>;

/// Characters of a dial string, besides digits.
const DIAL_CHARS: &[u8] = b"*#+,!@;IiGg";
const DIAL_CHARS_UPPER: &[u8] = b"ABCDTPW";

/// Class of a character, given its position and what came before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Token {
    CmdName,
    Equal,
    QuestionMark,
    Comma,
    Semicolon,
    Basic,
    BasicParam,
    BasicEnd,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Action {
    Continue,
    Equal,
    TypeRead,
    TypeTest,
    Param,
    Semicolon,
    Basic,
    BasicParam,
    BasicEnd,
    LastChar,
    Nothing,
    Error,
}

use Action as A;

/// Transitions, indexed by `[previous][current]` token.
#[rustfmt::skip]
const TRANSITIONS: [[Action; 9]; 9] = [
    // CmdName      Equal         QuestionMark  Comma     Semicolon     Basic     BasicParam     BasicEnd     Last
    [A::Continue, A::Equal,     A::TypeRead, A::Error, A::Semicolon, A::Basic, A::Error,      A::Error,    A::LastChar], // CmdName
    [A::Error,    A::Error,     A::TypeTest, A::Param, A::Error,     A::Error, A::Error,      A::Error,    A::Nothing],  // Equal
    [A::Error,    A::Error,     A::Error,    A::Error, A::Semicolon, A::Error, A::Error,      A::Error,    A::Error],    // QuestionMark
    [A::Error,    A::Error,     A::Error,    A::Param, A::Semicolon, A::Error, A::Error,      A::Error,    A::Nothing],  // Comma
    [A::Continue, A::Semicolon, A::Error,    A::Error, A::Error,     A::Error, A::Error,      A::Error,    A::Nothing],  // Semicolon
    [A::Continue, A::Error,     A::TypeRead, A::Error, A::Semicolon, A::Error, A::BasicParam, A::BasicEnd, A::Nothing],  // Basic
    [A::Error,    A::Error,     A::TypeRead, A::Error, A::Semicolon, A::Error, A::BasicParam, A::BasicEnd, A::Error],    // BasicParam
    [A::Error,    A::Error,     A::Error,    A::Error, A::Error,     A::Error, A::Error,      A::Error,    A::Nothing],  // BasicEnd
    [A::Continue, A::Error,     A::Error,    A::Error, A::Error,     A::Error, A::Error,      A::Error,    A::Nothing],  // Last
];

fn quoted(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(tuple((char('"'), take_till(|c: u8| c == b'"'), opt(char('"')))))(input)
}

/// One `;` terminated piece of a command line, `;` included. Quoted text is
/// skipped over, so a `;` in a string does not end the piece.
fn segment(input: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(pair(
        many0_count(alt((quoted, is_not(&b"\";"[..])))),
        opt(char(';')),
    ))(input)
}

/// Cut the text following `AT` into sub-commands.
fn split(mut body: &[u8]) -> VecDeque<Vec<u8>> {
    let mut subs = VecDeque::new();
    while !body.is_empty() {
        match segment(body) {
            Ok((rest, seg)) if !seg.is_empty() => {
                subs.push_back([PREFIX, seg].concat());
                body = rest;
            }
            _ => break,
        }
    }
    if subs.is_empty() {
        subs.push_back(PREFIX.to_vec());
    }
    subs
}

/// Sub-commands of a line, parsed and resolved one at a time.
pub(crate) struct SubCommands {
    pending: VecDeque<Vec<u8>>,
    prev: Token,
}

impl SubCommands {
    pub fn empty() -> Self {
        Self {
            pending: VecDeque::new(),
            prev: Token::CmdName,
        }
    }

    /// `line` is a framed command line, starting with `AT` in any case.
    pub fn new(line: &[u8]) -> Self {
        Self {
            pending: split(line.get(PREFIX.len()..).unwrap_or_default()),
            prev: Token::CmdName,
        }
    }

    /// Parse the next sub-command and mark the command it names as
    /// processing on `device`.
    ///
    /// Returns `None` once the line is done. After an error the rest of the
    /// line is dropped.
    pub fn next(
        &mut self,
        registry: &mut Registry,
        device: DeviceRef,
    ) -> Option<Result<CommandRef, Error>> {
        let text = self.pending.pop_front()?;
        let mut parser = Parser::new(text, self.prev, registry, device);
        let res = parser.run();
        self.prev = parser.prev;

        let cmd = parser.cmd;
        let tail = parser.tail.take();
        match res.and_then(|()| cmd.ok_or(Error::NotFound)) {
            Ok(cmd) => {
                if let Some(tail) = tail {
                    self.pending.push_front([PREFIX, tail.as_slice()].concat());
                }
                Some(Ok(cmd))
            }
            Err(e) => {
                if let Some(cmd) = cmd {
                    registry.release(cmd);
                }
                self.pending.clear();
                Some(Err(e))
            }
        }
    }
}

struct Parser<'r> {
    text: Vec<u8>,
    pos: usize,
    cur: Token,
    prev: Token,
    cmd: Option<CommandRef>,
    /// Start of the next basic command, when this one ended early.
    tail: Option<Vec<u8>>,
    registry: &'r mut Registry,
    device: DeviceRef,
}

impl<'r> Parser<'r> {
    fn new(text: Vec<u8>, prev: Token, registry: &'r mut Registry, device: DeviceRef) -> Self {
        Self {
            text,
            pos: 0,
            cur: Token::CmdName,
            prev,
            cmd: None,
            tail: None,
            registry,
            device,
        }
    }

    fn run(&mut self) -> Result<(), Error> {
        trace!("Parsing {:?}", LossyStr(&self.text));
        while !matches!(self.cur, Token::Semicolon | Token::Last) {
            self.cur = self.classify(self.text[self.pos]);
            let action = TRANSITIONS[self.prev as usize][self.cur as usize];
            trace!("{:?} -> {:?}: {:?}", self.prev, self.cur, action);

            if let Err(e) = self.act(action) {
                error!(
                    "Parse error in {:?}, {:?} -> {:?}",
                    LossyStr(&self.text),
                    self.prev,
                    self.cur
                );
                return Err(e);
            }

            self.prev = self.cur;
            self.pos += 1;
            if self.pos >= self.text.len() {
                self.cur = Token::Last;
            }
        }
        Ok(())
    }

    fn classify(&self, c: u8) -> Token {
        match c {
            b'=' => return Token::Equal,
            b'?' => return Token::QuestionMark,
            b',' => return Token::Comma,
            b';' => return Token::Semicolon,
            _ => {}
        }

        if self.cur >= Token::Basic {
            if self.is_dial() {
                return match self.cur {
                    Token::Basic => Token::BasicParam,
                    Token::BasicParam => Token::BasicEnd,
                    other => other,
                };
            }
            return if c.is_ascii_digit() || c == b'"' {
                Token::BasicParam
            } else {
                Token::BasicEnd
            };
        }

        if self.pos == PREFIX.len() && (c.is_ascii_alphabetic() || c == b'&' || c == b'\\') {
            Token::Basic
        } else if self.kind() == Some(CommandType::Para) {
            Token::Comma
        } else if self.pos == self.text.len() - 1 {
            Token::Last
        } else {
            Token::CmdName
        }
    }

    fn act(&mut self, action: Action) -> Result<(), Error> {
        match action {
            A::Continue => {
                self.text[self.pos].make_ascii_uppercase();
                Ok(())
            }
            A::Equal => self.resolve(self.pos, CommandType::Para),
            A::TypeRead => self.type_read(),
            A::TypeTest => match self.cmd {
                Some(_) => self.set_kind(CommandType::Test),
                None => Err(Error::Fault),
            },
            A::Param => self.param(),
            A::Semicolon | A::LastChar => {
                let end = if action == A::LastChar {
                    self.pos + 1
                } else {
                    self.pos
                };
                self.resolve(end, CommandType::Act)
            }
            A::Basic => self.basic(),
            A::BasicParam => {
                if self.is_dial() {
                    self.dial_param()
                } else {
                    self.basic_param()
                }
            }
            A::BasicEnd => {
                self.basic_end(self.pos);
                Ok(())
            }
            A::Nothing => Ok(()),
            A::Error => Err(Error::Fault),
        }
    }

    fn kind(&self) -> Option<CommandType> {
        self.cmd
            .and_then(|cmd| self.registry.get(cmd))
            .map(|entry| entry.kind)
    }

    fn is_dial(&self) -> bool {
        self.cmd
            .and_then(|cmd| self.registry.get(cmd))
            .map_or(false, |entry| entry.dial)
    }

    fn is_basic(&self) -> bool {
        self.cmd
            .and_then(|cmd| self.registry.get(cmd))
            .map_or(false, |entry| entry.basic)
    }

    fn set_kind(&mut self, kind: CommandType) -> Result<(), Error> {
        let cmd = self.cmd.ok_or(Error::Fault)?;
        let entry = self.registry.get_mut(cmd).ok_or(Error::NotFound)?;
        entry.kind = kind;
        Ok(())
    }

    fn push_param(&mut self, bytes: ParamBytes) -> Result<(), Error> {
        let param = Parameter::from_utf8(bytes).map_err(|_| {
            error!("Parameter is not valid UTF-8");
            Error::Fault
        })?;
        let cmd = self.cmd.ok_or(Error::Fault)?;
        let entry = self.registry.get_mut(cmd).ok_or(Error::NotFound)?;
        trace!("Parameter {:?}", param.as_str());
        entry.params.push(param);
        Ok(())
    }

    fn param_count(&self) -> usize {
        self.cmd
            .and_then(|cmd| self.registry.get(cmd))
            .map_or(0, |entry| entry.params.len())
    }

    /// Look up the command named by `text[..end]`, unless one is already
    /// resolved, and set its type.
    fn resolve(&mut self, end: usize, kind: CommandType) -> Result<(), Error> {
        if self.cmd.is_some() {
            return Ok(());
        }
        let name = self.text[..end].to_ascii_uppercase();
        let cmd = self.registry.acquire(&name, self.device)?;
        self.cmd = Some(cmd);
        self.set_kind(kind)
    }

    fn type_read(&mut self) -> Result<(), Error> {
        let was_resolved = self.cmd.is_some();
        self.resolve(self.pos, CommandType::Read)?;
        if was_resolved {
            self.set_kind(CommandType::Read)?;
        }

        let next = self.pos + 1;
        if self.is_basic() && next < self.text.len() && self.text[next] != b';' {
            self.basic_end(next);
        }
        Ok(())
    }

    /// The longest subscribed name made of the characters from here up to
    /// the first digit, quote or `;`.
    fn basic(&mut self) -> Result<(), Error> {
        let mut end = self.pos;
        while end < self.text.len() && !matches!(self.text[end], b'0'..=b'9' | b'"' | b';') {
            self.text[end].make_ascii_uppercase();
            end += 1;
        }

        while end > PREFIX.len() {
            if self.registry.contains(&self.text[..end]) {
                let cmd = self.registry.acquire(&self.text[..end], self.device)?;
                self.cmd = Some(cmd);
                let entry = self.registry.get_mut(cmd).ok_or(Error::NotFound)?;
                entry.kind = CommandType::Act;
                entry.basic = true;
                self.pos = end - 1;
                return Ok(());
            }
            end -= 1;
        }
        debug!("No basic command in {:?}", LossyStr(&self.text));
        Err(Error::NotFound)
    }

    /// Digits or a quoted string following a basic command.
    fn basic_param(&mut self) -> Result<(), Error> {
        let mut param = ParamBytes::new();
        let mut quoted = false;
        while self.pos < self.text.len() {
            let c = self.text[self.pos];
            if c == b'"' {
                quoted = !quoted;
            } else if quoted || c.is_ascii_digit() {
                param.push(c).map_err(|_| Error::Overflow)?;
            } else if c == b'=' {
                break;
            } else {
                self.pos -= 1;
                break;
            }
            self.pos += 1;
        }
        self.push_param(param)
    }

    /// The dial string of `ATD`, up to the end of the sub-command.
    fn dial_param(&mut self) -> Result<(), Error> {
        let mut param = ParamBytes::new();
        let phonebook = self.text[self.pos] == b'>';
        let mut quoted = false;

        while self.pos < self.text.len() {
            let c = self.text[self.pos];
            let keep = if phonebook {
                if c == b'"' {
                    quoted = !quoted;
                    Some(c)
                } else if quoted || c == b'i' || c == b'g' {
                    Some(c)
                } else {
                    Some(c.to_ascii_uppercase())
                }
            } else if c.is_ascii_digit() || DIAL_CHARS.contains(&c) {
                Some(c)
            } else if DIAL_CHARS_UPPER.contains(&c.to_ascii_uppercase()) {
                Some(c.to_ascii_uppercase())
            } else {
                None
            };
            if let Some(c) = keep {
                param.push(c).map_err(|_| Error::Overflow)?;
            }

            if c == b';' && !quoted {
                // The dial string ends the sub-command.
                self.cur = Token::Last;
                return self.push_param(param);
            }
            self.pos += 1;
        }

        if param.is_empty() {
            error!("Empty dial string");
            return Err(Error::Fault);
        }
        self.push_param(param)
    }

    /// One comma separated parameter of an extended command.
    fn param(&mut self) -> Result<(), Error> {
        if self.param_count() > 0 {
            // Skip the comma.
            self.pos += 1;
        }

        let mut param = ParamBytes::new();
        if self.pos >= self.text.len() || matches!(self.text[self.pos], b',' | b';') {
            self.pos -= 1;
            return self.push_param(param);
        }

        let mut quoted = false;
        loop {
            if param.len() >= PARAMETER_MAX_LEN {
                error!("Parameter exceeds {} bytes", PARAMETER_MAX_LEN);
                return Err(Error::Overflow);
            }

            let c = self.text[self.pos];
            if c == b'"' {
                quoted = !quoted;
            } else if quoted {
                param.push(c).map_err(|_| Error::Overflow)?;
            } else {
                let c = c.to_ascii_uppercase();
                if !is_param_char(c) {
                    error!("Invalid parameter character {:?}", c as char);
                    return Err(Error::Fault);
                }
                param.push(c).map_err(|_| Error::Overflow)?;
            }

            self.pos += 1;
            if self.pos >= self.text.len() {
                break;
            }
            if !quoted && matches!(self.text[self.pos], b',' | b';') {
                self.pos -= 1;
                break;
            }
        }
        self.push_param(param)
    }

    /// End this basic command before `at`, leaving the rest of the text as
    /// the next sub-command.
    fn basic_end(&mut self, at: usize) {
        self.tail = Some(self.text[at..].to_vec());
        self.cur = Token::Last;
    }
}

fn is_param_char(c: u8) -> bool {
    matches!(c, b'0'..=b'9' | b'A'..=b'F' | b'H' | b'+' | b'-' | b'*' | b'#')
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::handle::Arena;

    fn setup(names: &[&str]) -> (Registry, DeviceRef) {
        let mut registry = Registry::default();
        for name in names {
            registry.create(name).unwrap();
        }
        let mut devices = Arena::new();
        (registry, DeviceRef(devices.insert(())))
    }

    /// Parse a whole line, answering every sub-command right away. Returns
    /// name, type and parameters of each.
    fn parse(
        registry: &mut Registry,
        device: DeviceRef,
        line: &[u8],
    ) -> Result<Vec<(String, CommandType, Vec<String>)>, Error> {
        let mut subs = SubCommands::new(line);
        let mut out = Vec::new();
        while let Some(res) = subs.next(registry, device) {
            let cmd = res?;
            let entry = registry.get(cmd).unwrap();
            out.push((
                entry.name.to_string(),
                entry.kind,
                entry.params.iter().map(|p| p.to_string()).collect(),
            ));
            registry.release(cmd);
        }
        Ok(out)
    }

    fn sub(name: &str, kind: CommandType, params: &[&str]) -> (String, CommandType, Vec<String>) {
        (
            name.to_string(),
            kind,
            params.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[test]
    fn split_on_unquoted_semicolons() {
        let subs: Vec<_> = split(b"+CMD1=\"a;b\";+CMD2;E1").into_iter().collect();
        assert_eq!(
            subs,
            vec![
                b"AT+CMD1=\"a;b\";".to_vec(),
                b"AT+CMD2;".to_vec(),
                b"ATE1".to_vec()
            ]
        );
        assert_eq!(split(b""), VecDeque::from(vec![b"AT".to_vec()]));
        assert_eq!(split(b";"), VecDeque::from(vec![b"AT;".to_vec()]));
    }

    #[test]
    fn extended_command_types() {
        let (mut registry, dev) = setup(&["AT+CGMI", "AT+CPIN", "AT+CMGS"]);
        assert_eq!(
            parse(&mut registry, dev, b"at+cgmi"),
            Ok(vec![sub("AT+CGMI", CommandType::Act, &[])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"AT+CPIN?"),
            Ok(vec![sub("AT+CPIN", CommandType::Read, &[])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"AT+CPIN=?"),
            Ok(vec![sub("AT+CPIN", CommandType::Test, &[])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"AT+CMGS=\"+4512345678\",145"),
            Ok(vec![sub("AT+CMGS", CommandType::Para, &["+4512345678", "145"])])
        );
    }

    #[test]
    fn parameters() {
        let (mut registry, dev) = setup(&["AT+CMD"]);
        assert_eq!(
            parse(&mut registry, dev, b"AT+CMD=,1"),
            Ok(vec![sub("AT+CMD", CommandType::Para, &["", "1"])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"AT+CMD=1,"),
            Ok(vec![sub("AT+CMD", CommandType::Para, &["1", ""])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"AT+CMD=ab,\"Mixed Case\",-1"),
            Ok(vec![sub("AT+CMD", CommandType::Para, &["AB", "Mixed Case", "-1"])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"AT+CMD=\"a,b\""),
            Ok(vec![sub("AT+CMD", CommandType::Para, &["a,b"])])
        );
        assert_eq!(parse(&mut registry, dev, b"AT+CMD=xyz"), Err(Error::Fault));

        let long = format!("AT+CMD={}", "1".repeat(PARAMETER_MAX_LEN + 1));
        assert_eq!(
            parse(&mut registry, dev, long.as_bytes()),
            Err(Error::Overflow)
        );
        let cmd = registry.create("AT+CMD").unwrap();
        assert!(!registry.get(cmd).unwrap().processing);
    }

    #[test]
    fn quoted_text_kept_verbatim() {
        let (mut registry, dev) = setup(&["AT+CMD", "ATD"]);
        assert_eq!(
            parse(&mut registry, dev, "AT+CMD=\"é\",\"Søren ☎\"".as_bytes()),
            Ok(vec![sub("AT+CMD", CommandType::Para, &["é", "Søren ☎"])])
        );
        assert_eq!(
            parse(&mut registry, dev, "ATD>\"Zoë\";".as_bytes()),
            Ok(vec![sub("ATD", CommandType::Act, &[">\"Zoë\";"])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"AT+CMD=\"\xc3\""),
            Err(Error::Fault)
        );
    }

    #[test]
    fn semicolon_chaining() {
        let (mut registry, dev) = setup(&["AT+CMD1", "AT+CMD2"]);
        assert_eq!(
            parse(&mut registry, dev, b"AT+CMD1=1;+CMD2=2"),
            Ok(vec![
                sub("AT+CMD1", CommandType::Para, &["1"]),
                sub("AT+CMD2", CommandType::Para, &["2"]),
            ])
        );
        assert_eq!(
            parse(&mut registry, dev, b"AT+CMD1;+CMD2?;"),
            Ok(vec![
                sub("AT+CMD1", CommandType::Act, &[]),
                sub("AT+CMD2", CommandType::Read, &[]),
            ])
        );
    }

    #[test]
    fn error_aborts_line() {
        let (mut registry, dev) = setup(&["AT+CMD1", "AT+CMD2"]);
        let mut subs = SubCommands::new(b"AT+CMD1=zz;+CMD2");
        assert_eq!(subs.next(&mut registry, dev), Some(Err(Error::Fault)));
        assert_eq!(subs.next(&mut registry, dev), None);

        let cmd1 = registry.acquire(b"AT+CMD1", dev);
        assert!(cmd1.is_ok());
    }

    #[test]
    fn busy_command_is_left_alone() {
        let (mut registry, dev) = setup(&["AT+CMD"]);
        let cmd = registry.acquire(b"AT+CMD", dev).unwrap();
        registry.get_mut(cmd).unwrap().params.push(Parameter::new());

        let mut subs = SubCommands::new(b"AT+CMD=1");
        assert_eq!(subs.next(&mut registry, dev), Some(Err(Error::Busy)));
        let entry = registry.get(cmd).unwrap();
        assert!(entry.processing);
        assert_eq!(entry.params.len(), 1);
    }

    #[test]
    fn basic_longest_prefix() {
        let (mut registry, dev) = setup(&["ATE", "AT&F", "ATS", "ATV"]);
        assert_eq!(
            parse(&mut registry, dev, b"ATE1"),
            Ok(vec![sub("ATE", CommandType::Act, &["1"])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"at&f"),
            Ok(vec![sub("AT&F", CommandType::Act, &[])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"ATE0V1"),
            Ok(vec![
                sub("ATE", CommandType::Act, &["0"]),
                sub("ATV", CommandType::Act, &["1"]),
            ])
        );
        assert_eq!(
            parse(&mut registry, dev, b"ATS0=5"),
            Ok(vec![sub("ATS", CommandType::Act, &["0", "5"])])
        );
        assert_eq!(
            parse(&mut registry, dev, b"ATE?V"),
            Ok(vec![
                sub("ATE", CommandType::Read, &[]),
                sub("ATV", CommandType::Act, &[]),
            ])
        );
        assert_eq!(parse(&mut registry, dev, b"ATZ"), Err(Error::NotFound));
    }

    #[test]
    fn dial_strings() {
        let (mut registry, dev) = setup(&["ATD", "AT+CMD"]);
        assert_eq!(
            parse(&mut registry, dev, b"atdt+45 1234-5678;+CMD"),
            Ok(vec![
                sub("ATD", CommandType::Act, &["T+4512345678;"]),
                sub("AT+CMD", CommandType::Act, &[]),
            ])
        );
        assert_eq!(
            parse(&mut registry, dev, b"ATD>\"Jo\"i"),
            Ok(vec![sub("ATD", CommandType::Act, &[">\"Jo\"i"])])
        );
        assert_eq!(parse(&mut registry, dev, b"ATD"), Ok(vec![sub("ATD", CommandType::Act, &[])]));
        assert_eq!(parse(&mut registry, dev, b"ATDxyz"), Err(Error::Fault));
    }

    #[test]
    fn unknown_command() {
        let (mut registry, dev) = setup(&[]);
        assert_eq!(parse(&mut registry, dev, b"AT"), Err(Error::NotFound));
        assert_eq!(parse(&mut registry, dev, b"AT+FOO=1"), Err(Error::NotFound));
    }
}
