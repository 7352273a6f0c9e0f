//! The name-indexed zone directory.
//!
//! Grounded on `cascade::center::Center`, which holds its zone set behind
//! an `ArcSwap` so that readers (the query path) never block behind a
//! writer (zone add/remove/reload): every mutation builds a new
//! `foldhash`-backed map and swaps the whole thing in atomically.

use std::sync::Arc;

use arc_swap::ArcSwap;
use foldhash::HashMap;

use crate::contents::ZoneContents;
use crate::error::{Error, ErrorKind, Result};
use crate::rrset::StoredName;
use crate::zone_entry::ZoneEntry;

/// The name-indexed directory of every zone this core serves.
///
/// Reads (`get`) never take a lock: they load the current `Arc` snapshot
/// of the map and look inside it. Writes (`insert`/`remove`) take an
/// internal mutex only to serialize with each other, build the next map
/// from the previous one, and swap it in.
pub struct ZoneDb {
    snapshot: ArcSwap<HashMap<StoredName, Arc<ZoneEntry>>>,
    write_lock: std::sync::Mutex<()>,
    /// A sorted index of every served name, rebuilt wholesale by
    /// [`ZoneDb::build_index`] rather than kept in sync on every
    /// `insert`/`remove`: successor lookups are rare (zone-transfer
    /// enumeration, bulk reloads) compared to `get`, so paying a sort on
    /// demand is cheaper than re-sorting a `Vec` on every single mutation.
    index: ArcSwap<Vec<StoredName>>,
}

impl ZoneDb {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::default()),
            write_lock: std::sync::Mutex::new(()),
            index: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Look up a zone by name. Lock-free.
    pub fn get(&self, name: &StoredName) -> Option<Arc<ZoneEntry>> {
        self.snapshot.load().get(name).cloned()
    }

    /// The number of zones currently served.
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace a zone's entry.
    pub fn insert(&self, name: StoredName, entry: Arc<ZoneEntry>) {
        let _guard = self.write_lock.lock().unwrap();
        let mut next = (**self.snapshot.load()).clone();
        next.insert(name, entry);
        self.snapshot.store(Arc::new(next));
    }

    /// Remove a zone, returning its entry if it was present.
    pub fn remove(&self, name: &StoredName) -> Option<Arc<ZoneEntry>> {
        let _guard = self.write_lock.lock().unwrap();
        let mut next = (**self.snapshot.load()).clone();
        let removed = next.remove(name);
        self.snapshot.store(Arc::new(next));
        removed
    }

    /// Look up a zone, returning [`ErrorKind::Inval`] if it is not
    /// served. A convenience for call sites that treat an unknown zone
    /// as a hard error rather than a branch.
    pub fn require(&self, name: &StoredName) -> Result<Arc<ZoneEntry>> {
        self.get(name)
            .ok_or_else(|| Error::new(ErrorKind::Inval, format!("zone {name} is not served")))
    }

    /// Every zone name currently served, in directory iteration order
    /// (unordered).
    pub fn names(&self) -> Vec<StoredName> {
        self.snapshot.load().keys().cloned().collect()
    }

    /// Detach `name`'s contents for deferred destruction, while leaving
    /// the zone itself registered: its ACLs, journal, and config stay in
    /// the directory and `get`/`require` keep finding it, but the entry
    /// is marked expired so [`ZoneEntry::contents_checked`] refuses to
    /// serve the detached snapshot.
    ///
    /// Distinct from [`ZoneDb::remove`], which deletes the zone from the
    /// directory outright: `expire` is what EXPIRE firing does (the zone
    /// configuration and transfer history remain valid, only the data is
    /// stale), whereas `remove` is an operator deleting the zone
    /// entirely. Returns `None` if `name` is not served, or if it was
    /// already expired.
    pub fn expire(&self, name: &StoredName) -> Option<ZoneContents> {
        let entry = self.get(name)?;
        if entry.is_expired() {
            return None;
        }
        let old = (*entry.contents()).clone();
        entry.mark_expired();
        Some(old)
    }

    /// Rebuild the sorted name index used by [`ZoneDb::successor`] from
    /// the current snapshot. Call after a bulk load or reload; individual
    /// `insert`/`remove` calls do not keep the index up to date on their
    /// own.
    pub fn build_index(&self) {
        let mut names: Vec<StoredName> = self.snapshot.load().keys().cloned().collect();
        names.sort();
        self.index.store(Arc::new(names));
    }

    /// The lexicographically smallest served name strictly greater than
    /// `name`, per the index built by [`ZoneDb::build_index`]. `None` if
    /// `name` is the last entry, or if the index is empty or stale enough
    /// that no such name is found.
    pub fn successor(&self, name: &StoredName) -> Option<StoredName> {
        let index = self.index.load();
        let pos = match index.binary_search(name) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        index.get(pos).cloned()
    }
}

impl Default for ZoneDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use domain::base::Class;
    use domain::base::{Serial, Ttl};

    use crate::acl::Acl;
    use crate::contents::ZoneContents;
    use crate::rrset::{SoaFields, SoaRecord};
    use crate::zone_entry::ZoneEntry;

    fn entry(dir: &tempfile::TempDir, name: &str, serial: u32) -> Arc<ZoneEntry> {
        let owner = StoredName::from_str(name).unwrap();
        let soa = SoaRecord {
            owner: owner.clone(),
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
        };
        let journal_path = camino::Utf8Path::from_path(dir.path())
            .unwrap()
            .join(format!("{name}.jnl"));
        Arc::new(
            ZoneEntry::new(
                owner,
                ZoneContents::new(soa, vec![]),
                Acl::empty(),
                Acl::empty(),
                Acl::empty(),
                &journal_path,
            )
            .unwrap(),
        )
    }

    #[test]
    fn insert_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db = ZoneDb::new();
        let name = StoredName::from_str("example.com.").unwrap();
        db.insert(name.clone(), entry(&dir, "example.com.", 1));
        assert!(db.get(&name).is_some());
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn remove_clears_the_zone() {
        let dir = tempfile::tempdir().unwrap();
        let db = ZoneDb::new();
        let name = StoredName::from_str("example.com.").unwrap();
        db.insert(name.clone(), entry(&dir, "example.com.", 1));
        assert!(db.remove(&name).is_some());
        assert!(db.get(&name).is_none());
    }

    #[test]
    fn require_reports_unknown_zone() {
        let db = ZoneDb::new();
        let name = StoredName::from_str("unserved.example.com.").unwrap();
        let err = db.require(&name).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Inval);
    }

    #[test]
    fn expire_detaches_contents_but_keeps_the_entry_registered() {
        let dir = tempfile::tempdir().unwrap();
        let db = ZoneDb::new();
        let name = StoredName::from_str("example.com.").unwrap();
        db.insert(name.clone(), entry(&dir, "example.com.", 1));

        let detached = db.expire(&name).unwrap();
        assert_eq!(detached.soa().serial(), Serial::from(1));
        assert!(db.get(&name).is_some());
        assert!(db.get(&name).unwrap().is_expired());
        assert!(db.expire(&name).is_none());
    }

    #[test]
    fn expire_reports_none_for_an_unserved_zone() {
        let db = ZoneDb::new();
        let name = StoredName::from_str("unserved.example.com.").unwrap();
        assert!(db.expire(&name).is_none());
    }

    #[test]
    fn build_index_enables_successor_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let db = ZoneDb::new();
        db.insert(
            StoredName::from_str("a.example.com.").unwrap(),
            entry(&dir, "a.example.com.", 1),
        );
        db.insert(
            StoredName::from_str("c.example.com.").unwrap(),
            entry(&dir, "c.example.com.", 1),
        );
        db.insert(
            StoredName::from_str("b.example.com.").unwrap(),
            entry(&dir, "b.example.com.", 1),
        );
        db.build_index();

        let after_a = db
            .successor(&StoredName::from_str("a.example.com.").unwrap())
            .unwrap();
        assert_eq!(after_a, StoredName::from_str("b.example.com.").unwrap());

        let after_c = db.successor(&StoredName::from_str("c.example.com.").unwrap());
        assert!(after_c.is_none());
    }
}
