//! Journal-to-zonefile sync: periodically (or on journal eviction
//! pressure) flushing a zone's current contents out to a zonefile on
//! disk, so a restart can reload from the zonefile plus a much shorter
//! journal tail instead of replaying from scratch.
//!
//! The write itself follows `cascade::util::write_file`'s atomic-write
//! discipline: write into a fresh temporary file in the zonefile's own
//! directory, then persist (rename) it over the target, so a reader
//! never observes a partially written zonefile.

use camino::Utf8Path;
use tracing::{info, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::zone_entry::ZoneEntry;

/// Render `entry`'s current contents as a zonefile and atomically write
/// it to `path`, then mark the journal as fully synced.
///
/// This is the only place the journal's `DIRTY` bits are cleared and its
/// oldest entries evicted: a sync is what makes older journal
/// entries redundant for crash recovery.
///
/// If `entry`'s zonefile serial already matches its current contents'
/// serial, the file is left untouched entirely and [`ErrorKind::Range`]
/// is returned: there is nothing new to flush, and rewriting an
/// unchanged zonefile would only cost an I/O round trip and bump its
/// mtime for no reason.
pub fn sync_to_zonefile(entry: &ZoneEntry, path: &Utf8Path) -> Result<()> {
    let current_serial = entry.contents().soa().serial();
    if entry.zonefile_serial() == Some(current_serial) {
        return Err(Error::range(format!(
            "zonefile for {} is already at serial {current_serial}",
            entry.name()
        )));
    }

    let rendered = render_zonefile(entry);

    let dir = path.parent().ok_or_else(|| {
        Error::new(
            ErrorKind::Inval,
            format!("zonefile path {path} has no parent directory"),
        )
    })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".zonecore-sync-")
        .tempfile_in(dir)
        .map_err(|e| Error::new(ErrorKind::Nomem, format!("creating temp file: {e}")))?;

    use std::io::Write as _;
    tmp.write_all(rendered.as_bytes())
        .map_err(|e| Error::new(ErrorKind::Nomem, format!("writing temp file: {e}")))?;
    tmp.flush()
        .map_err(|e| Error::new(ErrorKind::Nomem, format!("flushing temp file: {e}")))?;

    tmp.persist(path).map_err(|e| {
        Error::new(
            ErrorKind::Nomem,
            format!("persisting zonefile to {path}: {e}"),
        )
    })?;

    entry.journal().mark_synced()?;
    entry.set_zonefile_serial(current_serial);
    info!(zone = %entry.name(), path = %path, "synced zone contents to zonefile");
    Ok(())
}

/// As [`sync_to_zonefile`], but also evicts journal entries the sync has
/// just made redundant — the path taken when the journal reported
/// [`ErrorKind::Busy`] and needs room.
pub fn sync_and_evict(entry: &ZoneEntry, path: &Utf8Path) -> Result<()> {
    sync_to_zonefile(entry, path)?;
    entry.journal().evict_synced()?;
    Ok(())
}

fn render_zonefile(entry: &ZoneEntry) -> String {
    let contents = entry.contents();
    let soa = contents.soa();
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} SOA {} {} (\n\t{}\n\t{}\n\t{}\n\t{}\n\t{} )\n",
        soa.owner,
        soa.class,
        soa.rdata.mname,
        soa.rdata.rname,
        soa.rdata.serial,
        soa.rdata.refresh,
        soa.rdata.retry,
        soa.rdata.expire,
        soa.rdata.minimum,
    ));
    let mut records: Vec<_> = contents.records().collect();
    records.sort();
    for record in records {
        out.push_str(&format!(
            "{} {} {} {} \\# {} {}\n",
            record.owner,
            record.ttl.as_secs(),
            record.class,
            record.rtype,
            record.rdata.len(),
            hex_encode(&record.rdata),
        ));
    }
    out
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// A warning-only variant used by the timer loop when a sync fails but
/// the zone otherwise keeps serving from memory: losing the on-disk
/// zonefile copy does not make the in-memory zone unsafe to serve, only
/// slower to recover after a crash.
///
/// [`ErrorKind::Range`] (the zonefile is already at the current serial)
/// is the expected outcome of most timer ticks and is not logged at all.
pub fn sync_best_effort(entry: &ZoneEntry, path: &Utf8Path) {
    if let Err(e) = sync_to_zonefile(entry, path) {
        if e.kind() == ErrorKind::Range {
            return;
        }
        warn!(zone = %entry.name(), error = %e, "zonefile sync failed, will retry on next timer tick");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use domain::base::Class;
    use domain::base::{Serial, Ttl};

    use crate::acl::Acl;
    use crate::changeset::{Changeset, ChangesetOrigin};
    use crate::contents::ZoneContents;
    use crate::rrset::{SoaFields, SoaRecord, StoredName};
    use crate::zone_entry::ZoneEntry;

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

    fn make_entry(dir: &tempfile::TempDir, serial: u32) -> std::sync::Arc<ZoneEntry> {
        let name = StoredName::from_str("example.com.").unwrap();
        let journal_path = Utf8Path::from_path(dir.path()).unwrap().join("example.com.jnl");
        std::sync::Arc::new(
            ZoneEntry::new(
                name,
                ZoneContents::new(soa(serial), vec![]),
                Acl::empty(),
                Acl::empty(),
                Acl::empty(),
                &journal_path,
            )
            .unwrap(),
        )
    }

    #[test]
    fn sync_writes_zonefile_and_clears_dirty_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("example.com.zone");
        let entry = make_entry(&dir, 1);

        let cs = Changeset::new(ChangesetOrigin::Ixfr, soa(1), soa(2), vec![], vec![]);
        crate::pipeline::apply(&entry, cs).unwrap();

        sync_to_zonefile(&entry, &path).unwrap();
        assert!(path.exists());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("SOA"));
        assert_eq!(entry.zonefile_serial(), Some(Serial::from(2)));
    }

    #[test]
    fn sync_at_unchanged_serial_is_a_range_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("example.com.zone");
        let entry = make_entry(&dir, 1);

        sync_to_zonefile(&entry, &path).unwrap();
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();

        let err = sync_to_zonefile(&entry, &path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert!(!path.exists());
    }
}
