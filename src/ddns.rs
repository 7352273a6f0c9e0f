//! The DDNS/UPDATE handler: turns an RFC 2136 update's prerequisite
//! and update sections into a [`Changeset`], after the caller has already
//! passed the request through [`crate::tsig_gate`].
//!
//! This module only implements the *semantics* of applying prerequisites
//! and updates to a [`ZoneContents`] snapshot; the wire parsing of the
//! UPDATE message itself is a transport concern left to the caller, same
//! as the rest of this core's Non-goals around wire protocol handling.

use bytes::Bytes;

use crate::changeset::{Changeset, ChangesetOrigin};
use crate::contents::ZoneContents;
use crate::error::{Error, ErrorKind, Result};
use crate::rrset::{RegularRecord, StoredName};

/// Validate an UPDATE message's Zone Section (RFC 2136 §2.3): it must
/// carry exactly one record, of type SOA, whose owner is the zone's
/// apex. Anything else is a malformed request.
///
/// `soa_count` and `soa_owner` summarize what the caller already parsed
/// out of the wire message's Zone Section; this function does not parse
/// wire format itself (out of scope for this core, as with the rest of
/// [`crate::ddns`]).
pub fn check_zone_section(
    apex: &StoredName,
    soa_count: usize,
    soa_owner: Option<&StoredName>,
) -> Result<()> {
    if soa_count != 1 {
        return Err(Error::new(
            ErrorKind::Malf,
            format!("UPDATE Zone Section must carry exactly one record, found {soa_count}"),
        ));
    }
    if soa_owner != Some(apex) {
        return Err(Error::new(
            ErrorKind::Malf,
            "UPDATE Zone Section's owner is not the zone apex",
        ));
    }
    Ok(())
}

/// Whether an UPDATE request for a zone with a configured primary should
/// be forwarded upstream rather than applied locally.
///
/// A secondary zone (`has_master`) never applies DDNS updates itself: it
/// relays the request to its primary and returns whatever response comes
/// back, the same way a secondary relays NOTIFY-triggered transfers
/// instead of generating its own changesets.
pub fn should_forward(has_master: bool) -> bool {
    has_master
}

/// An UPDATE request queued for forwarding to the zone's primary.
#[derive(Clone, Debug)]
pub struct ForwardedUpdate {
    /// The original client's raw message, forwarded byte-for-byte.
    pub original_message: Bytes,
    /// The transaction ID from the original message, carried here for
    /// the caller's convenience even though it is already encoded at a
    /// fixed offset within `original_message`.
    pub transaction_id: u16,
}

/// Build a [`ForwardedUpdate`] that preserves the original transaction
/// ID by forwarding `message` unchanged: the ID lives at a fixed 2-byte
/// offset in the DNS message header (RFC 1035 §4.1.1), so relaying the
/// original bytes verbatim relays the ID automatically, with no need to
/// re-encode the message.
pub fn forward_update(message: Bytes, transaction_id: u16) -> ForwardedUpdate {
    ForwardedUpdate {
        original_message: message,
        transaction_id,
    }
}

/// One prerequisite from an UPDATE message's prerequisite section
/// (RFC 2136 §2.4).
#[derive(Clone, Debug)]
pub enum Prerequisite {
    /// RRset must exist (value-independent): at least one record with
    /// this owner/type must be present.
    RrsetExists(crate::rrset::StoredName, domain::base::Rtype),
    /// RRset must not exist: no record with this owner/type may be
    /// present.
    RrsetDoesNotExist(crate::rrset::StoredName, domain::base::Rtype),
    /// This exact record must be present.
    RecordExists(RegularRecord),
}

/// One update from an UPDATE message's update section (RFC 2136 §2.5).
#[derive(Clone, Debug)]
pub enum Update {
    /// Add this record (if not already present).
    Add(RegularRecord),
    /// Delete this exact record.
    DeleteRecord(RegularRecord),
    /// Delete every record with this owner/type.
    DeleteRrset(crate::rrset::StoredName, domain::base::Rtype),
    /// Delete every record at this owner, of any type.
    DeleteName(crate::rrset::StoredName),
}

/// Check every prerequisite against `contents`, short-circuiting on the
/// first failure with [`ErrorKind::ZoneInval`] (callers map this to
/// `NXRRSET`/`YXRRSET`/`NXDOMAIN` as appropriate for their transport;
/// this core does not encode wire RCODEs for prerequisite failures
/// beyond its own taxonomy).
pub fn check_prerequisites(contents: &ZoneContents, prereqs: &[Prerequisite]) -> Result<()> {
    for prereq in prereqs {
        let satisfied = match prereq {
            Prerequisite::RrsetExists(name, rtype) => contents
                .records()
                .any(|r| &r.owner == name && r.rtype == *rtype),
            Prerequisite::RrsetDoesNotExist(name, rtype) => !contents
                .records()
                .any(|r| &r.owner == name && r.rtype == *rtype),
            Prerequisite::RecordExists(record) => contents.records().any(|r| r == record),
        };
        if !satisfied {
            return Err(Error::new(
                ErrorKind::ZoneInval,
                "UPDATE prerequisite not satisfied",
            ));
        }
    }
    Ok(())
}

/// Build a [`Changeset`] from a validated update section, bumping the
/// SOA serial by one (RFC 2136 §3.6's "serial number... must be
/// incremented" guidance, which this crate treats as the default
/// policy — an operator wanting RFC 1982 wraparound-safe jumps can
/// construct the SOA-to itself and call [`crate::contents::ZoneContents::apply`]
/// directly instead of going through this helper).
///
/// Prerequisites must already have been checked with
/// [`check_prerequisites`]; this function does not re-check them.
pub fn build_changeset(contents: &ZoneContents, updates: &[Update]) -> Result<Changeset> {
    let mut records: Vec<RegularRecord> = contents.records().cloned().collect();

    for update in updates {
        match update {
            Update::Add(record) => {
                if !records.iter().any(|r| r == record) {
                    records.push(record.clone());
                }
            }
            Update::DeleteRecord(record) => {
                records.retain(|r| r != record);
            }
            Update::DeleteRrset(name, rtype) => {
                records.retain(|r| !(&r.owner == name && r.rtype == *rtype));
            }
            Update::DeleteName(name) => {
                records.retain(|r| &r.owner != name);
            }
        }
    }

    let mut soa_to = contents.soa().clone();
    soa_to.rdata.serial = soa_to.rdata.serial + 1;

    let new_contents = ZoneContents::new(soa_to, records);
    Ok(contents.diff(&new_contents, ChangesetOrigin::Ddns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use bytes::Bytes;
    use domain::base::Class;
    use domain::base::{Rtype, Serial, Ttl};

    use crate::rrset::{SoaFields, SoaRecord, StoredName};

    fn soa(serial: u32) -> SoaRecord {
        SoaRecord {
            owner: StoredName::from_str("example.com.").unwrap(),
            class: Class::IN,
            ttl: Ttl::from_secs(3600),
            rdata: SoaFields {
                mname: StoredName::from_str("ns1.example.com.").unwrap(),
                rname: StoredName::from_str("hostmaster.example.com.").unwrap(),
                serial: Serial::from(serial),
                refresh: 7200,
                retry: 3600,
                expire: 1209600,
                minimum: 3600,
            },
        }
    }

    fn a_record(name: &str, octets: [u8; 4]) -> RegularRecord {
        RegularRecord {
            owner: StoredName::from_str(name).unwrap(),
            rtype: Rtype::A,
            class: Class::IN,
            ttl: Ttl::from_secs(300),
            rdata: Bytes::copy_from_slice(&octets),
        }
    }

    #[test]
    fn prerequisite_rrset_exists_fails_on_empty_zone() {
        let contents = ZoneContents::new(soa(1), vec![]);
        let prereqs = vec![Prerequisite::RrsetExists(
            StoredName::from_str("www.example.com.").unwrap(),
            Rtype::A,
        )];
        let err = check_prerequisites(&contents, &prereqs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ZoneInval);
    }

    #[test]
    fn prerequisite_rrset_does_not_exist_passes_on_empty_zone() {
        let contents = ZoneContents::new(soa(1), vec![]);
        let prereqs = vec![Prerequisite::RrsetDoesNotExist(
            StoredName::from_str("www.example.com.").unwrap(),
            Rtype::A,
        )];
        assert!(check_prerequisites(&contents, &prereqs).is_ok());
    }

    #[test]
    fn build_changeset_adds_record_and_bumps_serial() {
        let contents = ZoneContents::new(soa(1), vec![]);
        let updates = vec![Update::Add(a_record("www.example.com.", [192, 0, 2, 1]))];
        let cs = build_changeset(&contents, &updates).unwrap();
        assert_eq!(cs.serial_from(), Serial::from(1));
        assert_eq!(cs.serial_to(), Serial::from(2));
        assert_eq!(cs.added.len(), 1);
    }

    #[test]
    fn build_changeset_deletes_name() {
        let contents = ZoneContents::new(
            soa(1),
            vec![
                a_record("www.example.com.", [192, 0, 2, 1]),
                a_record("mail.example.com.", [192, 0, 2, 2]),
            ],
        );
        let updates = vec![Update::DeleteName(
            StoredName::from_str("www.example.com.").unwrap(),
        )];
        let cs = build_changeset(&contents, &updates).unwrap();
        assert_eq!(cs.removed.len(), 1);
        assert_eq!(cs.added.len(), 0);
    }

    #[test]
    fn check_zone_section_accepts_exactly_one_soa_at_apex() {
        let apex = StoredName::from_str("example.com.").unwrap();
        assert!(check_zone_section(&apex, 1, Some(&apex)).is_ok());
    }

    #[test]
    fn check_zone_section_rejects_wrong_count_as_formerr() {
        let apex = StoredName::from_str("example.com.").unwrap();
        let err = check_zone_section(&apex, 0, Some(&apex)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malf);
        let err = check_zone_section(&apex, 2, Some(&apex)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malf);
    }

    #[test]
    fn check_zone_section_rejects_wrong_owner_as_formerr() {
        let apex = StoredName::from_str("example.com.").unwrap();
        let other = StoredName::from_str("www.example.com.").unwrap();
        let err = check_zone_section(&apex, 1, Some(&other)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malf);
        let err = check_zone_section(&apex, 1, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malf);
    }

    #[test]
    fn should_forward_reflects_has_master() {
        assert!(should_forward(true));
        assert!(!should_forward(false));
    }

    #[test]
    fn forward_update_preserves_the_transaction_id() {
        let message = Bytes::copy_from_slice(&[0xab, 0xcd, 0, 0, 0, 0]);
        let forwarded = forward_update(message.clone(), 0xabcd);
        assert_eq!(forwarded.transaction_id, 0xabcd);
        assert_eq!(forwarded.original_message, message);
    }
}
