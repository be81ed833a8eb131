use std::fmt;

/// Process exit code for every fatal failure.
pub const FATAL_EXIT_CODE: u8 = 2;

/// Every failure the run can hit, classified by where it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing credentials or required input files.
    Configuration,
    /// Could not establish an authenticated session.
    Login,
    /// Account name to user id lookup failed.
    Resolution,
    /// Listing the current stories of one account failed.
    Fetch,
    /// Downloading one story failed.
    Download,
    /// The mail transport rejected or failed a notification.
    Notify,
    /// The final state document could not be written.
    StatePersist,
}

/// What the run does when an error of a given kind occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Stop the run without saving state; exit with [`FATAL_EXIT_CODE`].
    Abort,
    /// Leave this account untouched for the run and move to the next one.
    SkipAccount,
    /// Keep going with the remaining items of the current account.
    ContinueBatch,
    /// Log and carry on; nothing else depends on the outcome.
    LogOnly,
}

impl ErrorKind {
    /// Resolution failures abort the run; fetch failures only skip the account.
    pub const fn policy(self) -> Policy {
        match self {
            ErrorKind::Configuration
            | ErrorKind::Login
            | ErrorKind::Resolution
            | ErrorKind::StatePersist => Policy::Abort,
            ErrorKind::Fetch => Policy::SkipAccount,
            ErrorKind::Download => Policy::ContinueBatch,
            ErrorKind::Notify => Policy::LogOnly,
        }
    }

    pub const fn is_fatal(self) -> bool {
        matches!(self.policy(), Policy::Abort)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration error"),
            ErrorKind::Login => write!(f, "login error"),
            ErrorKind::Resolution => write!(f, "resolution error"),
            ErrorKind::Fetch => write!(f, "fetch error"),
            ErrorKind::Download => write!(f, "download error"),
            ErrorKind::Notify => write!(f, "notify error"),
            ErrorKind::StatePersist => write!(f, "state persist error"),
        }
    }
}
