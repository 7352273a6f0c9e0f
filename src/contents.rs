//! Immutable zone contents: the snapshot a [`crate::zonedb::ZoneDb`]
//! entry points readers at, and the thing [`Changeset`]s are diffed
//! against or forwarded across.
//!
//! `cascade` keeps this type (`zone::contents::ZoneContents`) out of the
//! retrieved pack, but every call site that uses it — `loader/mod.rs`,
//! `loader/server.rs`, `zone/storage.rs` — agrees on its shape: an
//! immutable, cheaply `Clone`-able (it wraps its record set in an `Arc`)
//! value holding one SOA and a record multiset, with a `diff` that
//! produces a [`Changeset`] and a `forward`/`apply` that consumes one.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::changeset::{Changeset, ChangesetOrigin};
use crate::error::{Error, ErrorKind, Result};
use crate::rrset::{RegularRecord, SoaRecord};

/// An immutable snapshot of one zone's records at a single serial.
///
/// Cloning is O(1): the record set is held behind an `Arc` and only
/// copied-on-write by [`ZoneContents::apply`], the same sharing
/// discipline `cascade`'s RCU-style reads depend on.
#[derive(Clone, Debug)]
pub struct ZoneContents {
    soa: SoaRecord,
    records: Arc<BTreeSet<RegularRecord>>,
}

impl ZoneContents {
    /// Build a zone's initial contents, e.g. from a freshly loaded
    /// zonefile or a full AXFR.
    pub fn new(soa: SoaRecord, records: impl IntoIterator<Item = RegularRecord>) -> Self {
        Self {
            soa,
            records: Arc::new(records.into_iter().collect()),
        }
    }

    pub fn soa(&self) -> &SoaRecord {
        &self.soa
    }

    pub fn records(&self) -> impl Iterator<Item = &RegularRecord> {
        self.records.iter()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Diff `self` (the old contents) against `new` (the new contents),
    /// producing a single synthetic changeset tagged with `origin`.
    ///
    /// This is how a fresh AXFR that replaces a zone with no prior
    /// journal history still produces a changeset to append to the
    /// journal, mirroring the historical `zones_create_changeset`.
    pub fn diff(&self, new: &ZoneContents, origin: ChangesetOrigin) -> Changeset {
        let removed: Vec<_> = self.records.difference(&new.records).cloned().collect();
        let added: Vec<_> = new.records.difference(&self.records).cloned().collect();
        Changeset::new(origin, self.soa.clone(), new.soa.clone(), removed, added)
    }

    /// Apply `changeset` to `self`, returning the resulting contents
    /// without mutating `self`.
    ///
    /// Fails with [`ErrorKind::Inval`] if `changeset.serial_from()` does
    /// not match this snapshot's current serial, and with
    /// [`ErrorKind::ZoneInval`] if the changeset removes a record this
    /// snapshot does not have (a corrupt or mis-ordered changeset chain).
    pub fn apply(&self, changeset: &Changeset) -> Result<ZoneContents> {
        if changeset.serial_from() != self.soa.serial() {
            return Err(Error::new(
                ErrorKind::Inval,
                format!(
                    "changeset serial_from {} does not match current serial {}",
                    changeset.serial_from(),
                    self.soa.serial()
                ),
            ));
        }

        let mut records = (*self.records).clone();
        for rec in &changeset.removed {
            if !records.remove(rec) {
                return Err(Error::new(
                    ErrorKind::ZoneInval,
                    format!("changeset removes record not present in zone: {rec}"),
                ));
            }
        }
        for rec in &changeset.added {
            records.insert(rec.clone());
        }

        Ok(ZoneContents {
            soa: changeset.soa_to.clone(),
            records: Arc::new(records),
        })
    }
}
