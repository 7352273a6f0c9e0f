//! The TSIG & ACL gate: the single checkpoint every inbound NOTIFY,
//! AXFR/IXFR request, and DDNS/UPDATE request passes through before
//! reaching the rest of the core.
//!
//! The actual MAC verification is delegated to a [`TsigVerifier`]
//! implementation backed by `domain`'s `tsig` feature in production; this
//! module only owns the *policy* — which key, if any, an ACL entry
//! requires, and how a verification outcome maps onto [`crate::error`]'s
//! RCODE/TSIG-RCODE taxonomy.

use std::net::IpAddr;

use crate::acl::Acl;
use crate::error::{Error, ErrorKind, Result, TsigFailure};

/// The result of checking a message's TSIG record against the key it
/// claims to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TsigOutcome {
    /// No TSIG record was present on the message.
    Absent,
    /// The TSIG record's MAC verified and its timestamp was in range.
    Verified,
    /// The MAC did not verify.
    BadSig,
    /// The signing time fell outside the key's fudge window.
    BadTime,
}

/// Verifies a message's TSIG record against a named key.
///
/// Implementations wrap `domain::tsig`'s keystore and message signer;
/// this crate depends only on the outcome, never on the wire format or
/// MAC algorithm directly.
pub trait TsigVerifier: Send + Sync {
    /// Does this verifier know a key by this name at all?
    fn has_key(&self, key_name: &str) -> bool;

    /// Verify `message` was signed by `key_name`. Only called once
    /// [`TsigVerifier::has_key`] has confirmed the key exists.
    fn verify(&self, key_name: &str, message: &[u8]) -> TsigOutcome;
}

/// The outcome of passing a request through the gate: who is allowed to
/// proceed, and under what key (if any).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admitted {
    pub key_name: Option<String>,
}

/// Check `source`/`raw_message` against `acl`, using `verifier` for any
/// ACL entry that names a TSIG key.
///
/// `key_name`, if present, is the key name the message's own TSIG record
/// claims (`None` if the message carried no TSIG record at all).
///
/// Sequencing follows the matched entry's own key requirement, not just
/// what the message happens to present:
///
/// 1. No ACL entry's address range covers `source`: [`ErrorKind::Eacces`],
///    regardless of TSIG.
/// 2. The matched entry requires no key (`key_name: None`) and the
///    message is unsigned: admitted, unauthenticated.
/// 3. The matched entry requires a key but the message is unsigned, or
///    the matched entry requires no key but the message *is* signed, or
///    the message's key name does not equal the one the entry requires:
///    [`ErrorKind::Tsig`]`(`[`TsigFailure::BadKey`]`)`. A no-key entry
///    does not get to skip verification just because the request brought
///    its own signature — the entry's lack of a key requirement is not
///    itself a grant of trust in whatever key the client chooses to
///    present.
/// 4. The matched entry's key matches the message's claimed key name:
///    verified via `verifier`, mapping `BadSig`/`BadTime` onto the
///    matching [`ErrorKind::Tsig`] variant.
pub fn admit(
    acl: &Acl,
    verifier: &dyn TsigVerifier,
    source: IpAddr,
    key_name: Option<&str>,
    raw_message: &[u8],
) -> Result<Admitted> {
    let expected_key = acl.required_key(source)?;

    let required_key = match (expected_key, key_name) {
        (None, None) => return Ok(Admitted { key_name: None }),
        (None, Some(_)) => {
            return Err(Error::new(
                ErrorKind::Tsig(TsigFailure::BadKey),
                "ACL entry requires no key, but the request was signed",
            ));
        }
        (Some(expected), None) => {
            return Err(Error::new(
                ErrorKind::Tsig(TsigFailure::BadKey),
                format!("ACL entry requires key {expected}, but the request was unsigned"),
            ));
        }
        (Some(expected), Some(presented)) if expected != presented => {
            return Err(Error::new(
                ErrorKind::Tsig(TsigFailure::BadKey),
                format!("ACL entry requires key {expected}, but {presented} was presented"),
            ));
        }
        (Some(expected), Some(_)) => expected,
    };

    if !verifier.has_key(required_key) {
        return Err(Error::new(
            ErrorKind::Tsig(TsigFailure::BadKey),
            format!("key {required_key} is unknown"),
        ));
    }

    match verifier.verify(required_key, raw_message) {
        TsigOutcome::Verified | TsigOutcome::Absent => Ok(Admitted {
            key_name: Some(required_key.to_owned()),
        }),
        TsigOutcome::BadSig => Err(Error::new(
            ErrorKind::Tsig(TsigFailure::BadSig),
            format!("MAC did not verify for key {required_key}"),
        )),
        TsigOutcome::BadTime => Err(Error::new(
            ErrorKind::Tsig(TsigFailure::BadTime),
            format!("signing time out of range for key {required_key}"),
        )),
    }
}
