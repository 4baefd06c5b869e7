use heapless::String;

use crate::helpers::bounded;
use crate::{DeviceRef, Error, COMMAND_MAX_LEN, RESPONSE_MAX_LEN, TEXT_MAX_LEN};

/// A response pattern, or a captured response line.
pub type Line = String<RESPONSE_MAX_LEN>;

/// An AT command to send with [`AtClient::send`].
///
/// A command names the device it goes to, the text to send, and the
/// patterns that classify the lines coming back: a line starting with one of
/// the final patterns ends the command, a line starting with one of the
/// intermediate patterns is captured. After sending, the captured lines are
/// available through [`first_intermediate_response`],
/// [`next_intermediate_response`] and [`final_response`].
///
/// [`AtClient::send`]: struct.AtClient.html#method.send
/// [`first_intermediate_response`]: #method.first_intermediate_response
/// [`next_intermediate_response`]: #method.next_intermediate_response
/// [`final_response`]: #method.final_response
#[derive(Debug, Clone, Default)]
pub struct Command {
    pub(crate) device: Option<DeviceRef>,
    pub(crate) command: String<COMMAND_MAX_LEN>,
    pub(crate) intermediate: Vec<Line>,
    pub(crate) finals: Vec<Line>,
    pub(crate) text: Vec<u8>,
    pub(crate) timeout: Option<u32>,
    pub(crate) result: Option<Result<(), Error>>,
    pub(crate) responses: Vec<Line>,
    cursor: usize,
}

/// Split a `|` separated pattern list, skipping empty entries.
fn patterns(list: &str) -> Result<Vec<Line>, Error> {
    list.split('|')
        .filter(|p| !p.is_empty())
        .map(bounded::<RESPONSE_MAX_LEN>)
        .collect()
}

impl Command {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_device(&mut self, device: DeviceRef) {
        self.device = Some(device);
    }

    /// Set the command text, e.g. `AT+CGMI`. The terminating `\r` is added on
    /// send.
    pub fn set_command(&mut self, command: &str) -> Result<(), Error> {
        self.command = bounded(command)?;
        Ok(())
    }

    /// Set the `|` separated intermediate patterns. An empty string captures
    /// every line.
    pub fn set_intermediate_response(&mut self, list: &str) -> Result<(), Error> {
        self.intermediate = if list.is_empty() {
            vec![Line::new()]
        } else {
            patterns(list)?
        };
        Ok(())
    }

    /// Set the `|` separated final patterns, e.g. `OK|ERROR|+CME ERROR:`.
    pub fn set_final_response(&mut self, list: &str) -> Result<(), Error> {
        self.finals = patterns(list)?;
        Ok(())
    }

    /// Set the payload sent when the modem answers with a `>` prompt.
    pub fn set_text(&mut self, text: &[u8]) -> Result<(), Error> {
        if text.len() > TEXT_MAX_LEN {
            error!("Text payload too long: {}", text.len());
            return Err(Error::Fault);
        }
        self.text.clear();
        self.text.extend_from_slice(text);
        Ok(())
    }

    /// Set the timeout in milliseconds. `0` disables the timeout.
    pub fn set_timeout(&mut self, ms: u32) {
        self.timeout = Some(ms);
    }

    /// Outcome of the last send, `None` if the command was never sent.
    pub fn result(&self) -> Option<Result<(), Error>> {
        self.result
    }

    /// The first captured intermediate line.
    ///
    /// Fails with [`Error::Fault`] unless at least one intermediate and the
    /// final line were captured.
    pub fn first_intermediate_response(&mut self) -> Result<&str, Error> {
        if self.responses.len() < 2 {
            return Err(Error::Fault);
        }
        self.cursor = 0;
        Ok(self.responses[0].as_str())
    }

    /// The captured intermediate line after the one returned last.
    pub fn next_intermediate_response(&mut self) -> Result<&str, Error> {
        if self.cursor + 2 >= self.responses.len() {
            return Err(Error::NotFound);
        }
        self.cursor += 1;
        Ok(self.responses[self.cursor].as_str())
    }

    /// The line that completed the command.
    pub fn final_response(&self) -> Result<&str, Error> {
        self.responses
            .last()
            .map(|l| l.as_str())
            .ok_or(Error::Fault)
    }

    pub(crate) fn reset_responses(&mut self) {
        self.responses.clear();
        self.result = None;
        self.cursor = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(s: &str) -> Line {
        Line::try_from(s).unwrap()
    }

    #[test]
    fn pattern_lists() {
        let mut cmd = Command::new();
        cmd.set_final_response("OK|ERROR||+CME ERROR:").unwrap();
        assert_eq!(cmd.finals, vec![line("OK"), line("ERROR"), line("+CME ERROR:")]);

        cmd.set_intermediate_response("").unwrap();
        assert_eq!(cmd.intermediate, vec![line("")]);

        cmd.set_intermediate_response("+CSQ:|+CESQ:").unwrap();
        assert_eq!(cmd.intermediate, vec![line("+CSQ:"), line("+CESQ:")]);

        let long = "x".repeat(RESPONSE_MAX_LEN + 1);
        assert_eq!(cmd.set_final_response(&long), Err(Error::Overflow));
    }

    #[test]
    fn bounds() {
        let mut cmd = Command::new();
        assert_eq!(
            cmd.set_command(&"A".repeat(COMMAND_MAX_LEN + 1)),
            Err(Error::Overflow)
        );
        assert_eq!(cmd.set_text(&[0; TEXT_MAX_LEN + 1]), Err(Error::Fault));
        assert_eq!(cmd.set_text(&[0; TEXT_MAX_LEN]), Ok(()));
    }

    #[test]
    fn response_iteration() {
        let mut cmd = Command::new();
        cmd.responses = vec![line("+CGDCONT: 1"), line("+CGDCONT: 2"), line("OK")];

        assert_eq!(cmd.first_intermediate_response(), Ok("+CGDCONT: 1"));
        assert_eq!(cmd.next_intermediate_response(), Ok("+CGDCONT: 2"));
        assert_eq!(cmd.next_intermediate_response(), Err(Error::NotFound));
        assert_eq!(cmd.final_response(), Ok("OK"));
    }

    #[test]
    fn only_final_captured() {
        let mut cmd = Command::new();
        assert_eq!(cmd.final_response(), Err(Error::Fault));

        cmd.responses = vec![line("OK")];
        assert_eq!(cmd.first_intermediate_response(), Err(Error::Fault));
        assert_eq!(cmd.next_intermediate_response(), Err(Error::NotFound));
        assert_eq!(cmd.final_response(), Ok("OK"));
    }
}
