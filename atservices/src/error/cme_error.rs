/// Mobile termination errors (`+CME ERROR: <n>`), as defined in 3GPP TS 27.007
/// section 9.2.
///
/// Only the general and GPRS related codes up to 118 are listed; the server
/// uses them to expand `+CME ERROR` codes in verbose mode.
macro_rules! cme_errors {
    ($($name:ident = $code:literal => $msg:literal,)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[repr(u16)]
        pub enum CmeError {
            $(
                #[doc = $msg]
                $name = $code,
            )+
        }

        impl CmeError {
            /// Look up a standard error by its numeric code.
            pub const fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$name),)+
                    _ => None,
                }
            }

            /// The verbose message of this error.
            pub const fn message(&self) -> &'static str {
                match self {
                    $(Self::$name => $msg,)+
                }
            }
        }
    };
}

cme_errors! {
    PhoneFailure = 0 => "Phone failure",
    NoConnection = 1 => "No connection to phone",
    LinkReserved = 2 => "Phone-adaptor link reserved",
    NotAllowed = 3 => "Operation not allowed",
    NotSupported = 4 => "Operation not supported",
    PhSimPin = 5 => "PH-SIM PIN required",
    PhFsimPin = 6 => "PH-FSIM PIN required",
    PhFsimPuk = 7 => "PH-FSIM PUK required",
    SimNotInserted = 10 => "SIM not inserted",
    SimPin = 11 => "SIM PIN required",
    SimPuk = 12 => "SIM PUK required",
    SimFailure = 13 => "SIM failure",
    SimBusy = 14 => "SIM busy",
    SimWrong = 15 => "SIM wrong",
    IncorrectPassword = 16 => "Incorrect password",
    SimPin2 = 17 => "SIM PIN2 required",
    SimPuk2 = 18 => "SIM PUK2 required",
    MemoryFull = 20 => "Memory full",
    InvalidIndex = 21 => "Invalid index",
    NotFound = 22 => "Not found",
    MemoryFailure = 23 => "Memory failure",
    TextTooLong = 24 => "Text string too long",
    InvalidChars = 25 => "Invalid characters in text string",
    DialStringTooLong = 26 => "Dial string too long",
    DialStringInvalid = 27 => "Invalid characters in dial string",
    NoNetwork = 30 => "No network service",
    NetworkTimeout = 31 => "Network timeout",
    NetworkNotAllowed = 32 => "Network not allowed - emergency calls only",
    NetworkPin = 40 => "Network personalization PIN required",
    NetworkPuk = 41 => "Network personalization PUK required",
    NetworkSubsetPin = 42 => "Network subset personalization PIN required",
    NetworkSubsetPuk = 43 => "Network subset personalization PUK required",
    ServicePin = 44 => "Service provider personalization PIN required",
    ServicePuk = 45 => "Service provider personalization PUK required",
    CorpPin = 46 => "Corporate personalization PIN required",
    CorpPuk = 47 => "Corporate personalization PUK required",
    HiddenKeyRequired = 48 => "Hidden key required",
    EapMethodNotSupported = 49 => "EAP method not supported",
    IncorrectParameters = 50 => "Incorrect parameters",
    CommandDisabled = 51 => "Command disabled",
    CommandAborted = 52 => "Command aborted",
    NotAttachedRestricted = 53 => "Not attached, restricted",
    NotAllowedEmergencyOnly = 54 => "Not allowed, emergency only",
    NotAllowedRestricted = 55 => "Not allowed, restricted",
    FixedDialNumberOnly = 56 => "Fixed dial number only",
    TemporarilyOutOfService = 57 => "Temporarily out of service",
    LanguageOrAlphabetNotSupported = 58 => "Language or alphabet not supported",
    UnexpectedDataValue = 59 => "Unexpected data value",
    SystemFailure = 60 => "System failure",
    DataMissing = 61 => "Data missing",
    CallBarred = 62 => "Call barred",
    MessageWaitingIndicationSubscriptionFailure = 63 => "Message waiting indication subscription failure",
    Unknown = 100 => "Unknown error",
    ImsiUnknownInHss = 102 => "IMSI unknown in HLR/HSS",
    IllegalUe = 103 => "Illegal MS/UE",
    ImsiUnknownInVlr = 104 => "IMSI unknown in VLR",
    ImeiNotAccepted = 105 => "IMEI not accepted",
    IllegalMe = 106 => "Illegal ME",
    PsServicesNotAllowed = 107 => "PS services not allowed",
    PsAndNonPsServicesNotAllowed = 108 => "PS and non-PS services not allowed",
    UeIdentityNotDerivedFromNetwork = 109 => "UE identity not derived from network",
    ImplicitlyDetached = 110 => "Implicitly detached",
    PlmnNotAllowed = 111 => "PLMN not allowed",
    AreaNotAllowed = 112 => "Location/tracking area not allowed",
    RoamingNotAllowedInArea = 113 => "Roaming not allowed in this location/tracking area",
    PsServicesNotAllowedInPlmn = 114 => "PS services not allowed in PLMN",
    NoCellsInArea = 115 => "No cells in location/tracking area",
    MscTemporarilyNotReachable = 116 => "MSC temporarily not reachable",
    NetworkFailureAttach = 117 => "Network failure (attach)",
    CsDomainUnavailable = 118 => "CS domain unavailable",
}

impl core::fmt::Display for CmeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}
