use heapless::String;

use crate::Error;

/// Wrapper that logs a byte buffer as a string when it is valid UTF-8, and as
/// a list of bytes otherwise.
pub struct LossyStr<'a>(pub &'a [u8]);

impl<'a> core::fmt::Debug for LossyStr<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match core::str::from_utf8(self.0) {
            Ok(s) => write!(f, "{:?}", s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

#[cfg(feature = "defmt")]
impl<'a> defmt::Format for LossyStr<'a> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=[u8]:a}", self.0)
    }
}

/// Copy `s` into a bounded string, failing with [`Error::Overflow`] if it
/// does not fit.
pub fn bounded<const N: usize>(s: &str) -> Result<String<N>, Error> {
    String::try_from(s).map_err(|_| Error::Overflow)
}

/// Append as much of `s` as fits into `buf`, never splitting a character.
pub(crate) fn push_truncated<const N: usize>(buf: &mut String<N>, s: &str) {
    let room = N - buf.len();
    let mut end = s.len().min(room);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    // Cannot fail, `end` is within the remaining capacity.
    buf.push_str(&s[..end]).ok();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lossy_str() {
        assert_eq!(format!("{:?}", LossyStr(b"OK\r\n")), "\"OK\\r\\n\"");
        assert_eq!(format!("{:?}", LossyStr(&[0xff, 0x41])), "[255, 65]");
    }

    #[test]
    fn bounded_overflow() {
        assert_eq!(bounded::<4>("ATE1"), Ok(String::try_from("ATE1").unwrap()));
        assert_eq!(bounded::<4>("ATE10"), Err(Error::Overflow));
    }

    #[test]
    fn truncate_on_char_boundary() {
        let mut buf: String<6> = String::try_from("+U").unwrap();
        push_truncated(&mut buf, "RC: 1");
        assert_eq!(buf.as_str(), "+URC: ");

        let mut buf: String<4> = String::try_from("ab").unwrap();
        push_truncated(&mut buf, "cé");
        assert_eq!(buf.as_str(), "abc");
    }
}
