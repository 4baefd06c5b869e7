/// Message service failures (`+CMS ERROR: <n>`), as defined in 3GPP TS 27.005
/// section 3.2.5.
///
/// Codes 0 to 255 are network and TP-FCS causes (3GPP TS 24.011 and 23.040)
/// and have no fixed text here.
macro_rules! cms_errors {
    ($($name:ident = $code:literal => $msg:literal,)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u16)]
        pub enum CmsError {
            $(
                #[doc = $msg]
                $name = $code,
            )+
        }

        impl CmsError {
            pub const fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$name),)+
                    _ => None,
                }
            }

            pub const fn message(&self) -> &'static str {
                match self {
                    $(Self::$name => $msg,)+
                }
            }
        }
    };
}

cms_errors! {
    MeFailure = 300 => "ME failure",
    SmsServiceReserved = 301 => "SMS service reserved",
    NotAllowed = 302 => "Operation not allowed",
    NotSupported = 303 => "Operation not supported",
    InvalidPduParameter = 304 => "Invalid PDU mode parameter",
    InvalidTextParameter = 305 => "Invalid text mode parameter",
    SimNotInserted = 310 => "SIM not inserted",
    SimPin = 311 => "SIM PIN required",
    PhSimPin = 312 => "PH-SIM PIN required",
    SimFailure = 313 => "SIM failure",
    SimBusy = 314 => "SIM busy",
    SimWrong = 315 => "SIM wrong",
    SimPuk = 316 => "SIM PUK required",
    SimPin2 = 317 => "SIM PIN2 required",
    SimPuk2 = 318 => "SIM PUK2 required",
    MemoryFailure = 320 => "Memory failure",
    InvalidIndex = 321 => "Invalid index",
    MemoryFull = 322 => "Memory full",
    SmscAddressUnknown = 330 => "SMSC address unknown",
    NoNetwork = 331 => "No network",
    NetworkTimeout = 332 => "Network timeout",
    NoCnmaAckExpected = 340 => "No CNMA acknowledgement expected",
    Unknown = 500 => "Unknown error",
}

impl core::fmt::Display for CmsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}
