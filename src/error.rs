//! The error taxonomy shared by every stage of the update pipeline.
//!
//! Every fallible operation in this crate returns an [`Error`], whose
//! [`ErrorKind`] tells the caller how to react: some kinds are locally
//! recovered by the caller (`Range`, `Busy`), others must be surfaced to an
//! operator or mapped onto a DNS response.

use std::fmt;

use domain::base::iana::Rcode;

//----------- ErrorKind ---------------------------------------------------------

/// A coarse classification of what went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A programmer-facing contract violation.
    Inval,

    /// An allocation failure.
    Nomem,

    /// The requested serial history is not present in the journal, or the
    /// two sides being compared are already in sync.
    ///
    /// Locally recovered: callers treat this as "nothing to do", or fall
    /// back to AXFR when loading changesets across a wrap.
    Range,

    /// The journal is full, or a transfer is already pending for this zone.
    ///
    /// Locally recovered: journal fullness triggers an immediate
    /// journal-to-zonefile sync; a pending transfer is skipped.
    Busy,

    /// An ACL denied the operation. Mapped to `REFUSED`.
    Eacces,

    /// The zone file was malformed, or its origin did not match the
    /// configured zone name. The zone is retained in its old state.
    ZoneInval,

    /// The zone's contents are gone (EXPIRE fired). Mapped to `SERVFAIL`.
    Expired,

    /// TSIG verification failed.
    Tsig(TsigFailure),

    /// The wire packet was malformed. Mapped to `FORMERR`.
    Malf,

    /// An invariant was violated; this should never happen in a correct
    /// implementation. Mapped to `SERVFAIL` and logged at error level.
    Internal,
}

/// The specific way a TSIG check failed (RFC 8945 §5.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TsigFailure {
    /// The key named in the query is unknown, or the ACL entry names no
    /// key while the query carried one (or vice versa).
    BadKey,

    /// The MAC did not verify.
    BadSig,

    /// The signing time fell outside the key's fudge window.
    BadTime,
}

impl TsigFailure {
    /// The numeric TSIG extended RCODE for this failure (RFC 8945 §5.2).
    pub const fn code(self) -> u16 {
        match self {
            Self::BadSig => 16,
            Self::BadKey => 17,
            Self::BadTime => 18,
        }
    }
}

impl fmt::Display for TsigFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BadKey => "BADKEY",
            Self::BadSig => "BADSIG",
            Self::BadTime => "BADTIME",
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inval => f.write_str("invalid argument"),
            Self::Nomem => f.write_str("allocation failure"),
            Self::Range => f.write_str("requested range is not available"),
            Self::Busy => f.write_str("resource is busy"),
            Self::Eacces => f.write_str("access denied"),
            Self::ZoneInval => f.write_str("zone data is malformed"),
            Self::Expired => f.write_str("zone contents have expired"),
            Self::Tsig(t) => write!(f, "TSIG failure: {t}"),
            Self::Malf => f.write_str("malformed wire packet"),
            Self::Internal => f.write_str("internal invariant violated"),
        }
    }
}

//----------- Error ---------------------------------------------------------

/// An error produced by this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    /// Construct a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether this error is locally recoverable by the caller without
    /// surfacing it to an operator.
    pub const fn is_benign(&self) -> bool {
        matches!(self.kind, ErrorKind::Range | ErrorKind::Busy)
    }

    /// Shorthand for [`ErrorKind::Inval`].
    pub fn inval(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Inval, message)
    }

    /// Shorthand for [`ErrorKind::Range`].
    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Range, message)
    }

    /// Shorthand for [`ErrorKind::Busy`].
    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Busy, message)
    }

    /// Shorthand for [`ErrorKind::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Map this error to the DNS RCODE an external responder should use.
    ///
    /// This does not by itself produce a TSIG-RCODE; see
    /// [`TsigFailure::code`] and the gate in [`crate::tsig_gate`] for that.
    pub fn to_rcode(&self) -> Rcode {
        match self.kind {
            ErrorKind::Eacces => Rcode::REFUSED,
            ErrorKind::Malf => Rcode::FORMERR,
            ErrorKind::Expired => Rcode::SERVFAIL,
            ErrorKind::Internal => Rcode::SERVFAIL,
            ErrorKind::Tsig(TsigFailure::BadKey | TsigFailure::BadSig | TsigFailure::BadTime) => {
                Rcode::NOTAUTH
            }
            ErrorKind::Inval => Rcode::FORMERR,
            ErrorKind::Range | ErrorKind::Busy | ErrorKind::ZoneInval => Rcode::SERVFAIL,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_errors_are_range_and_busy_only() {
        assert!(Error::range("no history").is_benign());
        assert!(Error::busy("journal full").is_benign());
        assert!(!Error::inval("bad arg").is_benign());
        assert!(!Error::internal("oops").is_benign());
    }

    #[test]
    fn tsig_failure_codes_match_rfc8945() {
        assert_eq!(TsigFailure::BadSig.code(), 16);
        assert_eq!(TsigFailure::BadKey.code(), 17);
        assert_eq!(TsigFailure::BadTime.code(), 18);
    }

    #[test]
    fn eacces_maps_to_refused() {
        let err = Error::new(ErrorKind::Eacces, "no matching ACL entry");
        assert_eq!(err.to_rcode(), Rcode::REFUSED);
    }
}
