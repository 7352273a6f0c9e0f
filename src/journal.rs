//! The write-ahead journal: an append-only, bounded-size, file-backed log
//! of changesets, indexed by the serial range each entry covers.
//!
//! Modeled on the historical journal (`journal_open`/`journal_trans_begin`/
//! `journal_fetch`/`journal_map`/`journal_unmap`): a fixed-layout node
//! table keyed by `(serial_to, serial_from)` packed into one 64-bit
//! integer so that a lookup for "the changeset whose `serial_from` is X"
//! is a single range query, plus flags per node (`VALID`, `DIRTY`,
//! `TRANS`) and a single in-flight transaction at a time (the journal is
//! single-writer, guarded by the zone's own update-pipeline mutex
//! upstream).
//!
//! On-disk layout, all integers little-endian:
//!
//! ```text
//! [ header: 16 bytes ]
//! [ descriptor: 16 bytes ][ payload: descriptor.len bytes ]
//! [ descriptor: 16 bytes ][ payload: descriptor.len bytes ]
//! ...
//! ```
//!
//! The header is `b"ZCJ1"` (magic), a version byte, the [`OpenFlags`] the
//! journal was last opened with, two reserved padding bytes, and eight
//! reserved bytes. Each descriptor is the node's packed
//! [`JournalKey`] (8 bytes), its [`NodeFlags`] byte, three padding bytes,
//! and a `u32` payload length. Records are appended at the end of the
//! file; a commit flips the descriptor's flags byte in place rather than
//! rewriting the record, and [`Journal::evict_synced`] is the only
//! operation that rewrites the file wholesale, compacting it down to the
//! nodes worth keeping.
//!
//! Plain synchronous `std::fs` I/O is used rather than an async API or a
//! memory map: the journal is single-writer per zone (guarded by
//! [`crate::zone_entry::ZoneEntry`]'s own mutex), so there is never
//! contention to avoid blocking on, the same reasoning that keeps
//! [`crate::sync`]'s zonefile writes synchronous.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use bytes::{Bytes, BytesMut};
use camino::{Utf8Path, Utf8PathBuf};
use domain::base::Serial;

use crate::changeset::Changeset;
use crate::error::{Error, ErrorKind, Result};

const MAGIC: [u8; 4] = *b"ZCJ1";
const VERSION: u8 = 1;
const HEADER_LEN: u64 = 16;
const DESC_LEN: u64 = 16;

/// Per-node flags, named after the historical journal's own flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeFlags(u8);

impl NodeFlags {
    /// The node holds a fully written, readable changeset.
    const VALID: NodeFlags = NodeFlags(0b001);
    /// The node has been written since the last zonefile sync.
    const DIRTY: NodeFlags = NodeFlags(0b010);
    /// The node belongs to the transaction currently in progress and is
    /// not yet visible to readers.
    const TRANS: NodeFlags = NodeFlags(0b100);

    const fn contains(self, other: NodeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    fn remove(&mut self, other: NodeFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for NodeFlags {
    type Output = NodeFlags;

    fn bitor(self, rhs: NodeFlags) -> NodeFlags {
        NodeFlags(self.0 | rhs.0)
    }
}

/// Flags a journal is opened with, per the historical `journal_open`'s
/// own flag argument.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenFlags(u8);

impl OpenFlags {
    pub const NONE: OpenFlags = OpenFlags(0);
    /// Do not eagerly read payloads off disk at open time; load each
    /// changeset's bytes lazily, on the first [`Journal::fetch`] that
    /// needs it. Appropriate for a journal that is opened far more often
    /// than it is read end-to-end (e.g. at startup, before most zones
    /// ever serve an IXFR).
    pub const LAZY: OpenFlags = OpenFlags(0b01);

    const fn contains(self, other: OpenFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for OpenFlags {
    type Output = OpenFlags;

    fn bitor(self, rhs: OpenFlags) -> OpenFlags {
        OpenFlags(self.0 | rhs.0)
    }
}

/// The packed key a journal node is stored under: `(serial_to << 32) |
/// serial_from`, taken verbatim from the historical implementation so
/// that ordering by key is also ordering by `serial_to`, then
/// `serial_from` — exactly the order `journal_walk` needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct JournalKey(u64);

impl JournalKey {
    pub fn new(serial_from: Serial, serial_to: Serial) -> Self {
        let from: u32 = serial_from.into();
        let to: u32 = serial_to.into();
        Self(((to as u64) << 32) | from as u64)
    }

    pub fn serial_from(self) -> Serial {
        Serial::from(self.0 as u32)
    }

    pub fn serial_to(self) -> Serial {
        Serial::from((self.0 >> 32) as u32)
    }
}

struct Node {
    flags: NodeFlags,
    /// Byte offset of this node's 16-byte descriptor within the journal
    /// file (not the payload — the descriptor precedes it).
    file_offset: u64,
    payload_len: u32,
    /// Cached payload bytes. Always populated once read at least once;
    /// populated eagerly at open unless [`OpenFlags::LAZY`] was given.
    bytes: Option<Bytes>,
}

/// A bounded-size, transactional, file-backed log of changesets for one
/// zone.
///
/// `fslimit` bounds the total bytes of changeset payloads retained; once
/// exceeded, [`Journal::append`] returns [`ErrorKind::Busy`] rather than
/// growing further, matching the historical journal's own backpressure
/// (the caller is expected to fire an immediate zonefile sync and then
/// call [`Journal::evict_synced`]).
pub struct Journal {
    path: Utf8PathBuf,
    file: File,
    fslimit: usize,
    used: usize,
    nodes: BTreeMap<JournalKey, Node>,
    trans: Option<Transaction>,
    lazy: bool,
}

/// An in-progress append: its record has already been written to disk
/// (flagged `TRANS`, invisible to readers) so that [`Journal::trans_commit`]
/// only has to flip one flags byte in place.
struct Transaction {
    key: JournalKey,
    /// The file length before this transaction's record was written, so
    /// [`Journal::trans_rollback`] can truncate the record clean away.
    pre_trans_len: u64,
}

fn io_err(e: std::io::Error) -> Error {
    Error::new(ErrorKind::Nomem, format!("journal I/O error: {e}"))
}

fn write_header(file: &mut File, flags: OpenFlags) -> Result<()> {
    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    let mut buf = [0u8; HEADER_LEN as usize];
    buf[0..4].copy_from_slice(&MAGIC);
    buf[4] = VERSION;
    buf[5] = flags.0;
    file.write_all(&buf).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(())
}

fn read_header(file: &mut File) -> Result<()> {
    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    let mut buf = [0u8; HEADER_LEN as usize];
    file.read_exact(&mut buf).map_err(io_err)?;
    if buf[0..4] != MAGIC {
        return Err(Error::new(ErrorKind::Malf, "journal file has invalid magic"));
    }
    if buf[4] != VERSION {
        return Err(Error::new(
            ErrorKind::Malf,
            format!("unsupported journal version {}", buf[4]),
        ));
    }
    Ok(())
}

/// Append a record (descriptor + payload) at the current end of `file`,
/// returning the descriptor's offset.
fn write_record(file: &mut File, key: JournalKey, flags: NodeFlags, payload: &[u8]) -> Result<u64> {
    let offset = file.seek(SeekFrom::End(0)).map_err(io_err)?;
    let mut desc = [0u8; DESC_LEN as usize];
    desc[0..8].copy_from_slice(&key.0.to_le_bytes());
    desc[8] = flags.0;
    desc[12..16].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    file.write_all(&desc).map_err(io_err)?;
    file.write_all(payload).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(offset)
}

impl Journal {
    /// Open (creating if absent) the journal file at `path`, bounded to
    /// `fslimit` bytes of payload.
    ///
    /// A file that already exists is scanned from its header forward: a
    /// trailing record still flagged `TRANS` (and not `VALID`) means the
    /// process crashed between [`Journal::trans_begin`] and
    /// [`Journal::trans_commit`], and is discarded by truncating the file
    /// back to that record's offset. A `TRANS`-flagged record anywhere
    /// else in the file is a corrupt journal, since this journal only
    /// ever holds one transaction open at a time.
    pub fn open(path: &Utf8Path, fslimit: usize, flags: OpenFlags) -> Result<Self> {
        let lazy = flags.contains(OpenFlags::LAZY);
        let existed = path.exists();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|e| Error::new(ErrorKind::Nomem, format!("opening journal file {path}: {e}")))?;

        let mut nodes = BTreeMap::new();
        let mut used = 0usize;

        let existing_len = file.metadata().map(|m| m.len()).unwrap_or(0);
        if existed && existing_len >= HEADER_LEN {
            read_header(&mut file)?;
            let len = existing_len;
            let mut pos = HEADER_LEN;
            loop {
                if pos >= len {
                    break;
                }
                if pos + DESC_LEN > len {
                    return Err(Error::new(
                        ErrorKind::Malf,
                        format!("truncated journal descriptor in {path}"),
                    ));
                }
                file.seek(SeekFrom::Start(pos)).map_err(io_err)?;
                let mut desc = [0u8; DESC_LEN as usize];
                file.read_exact(&mut desc).map_err(io_err)?;
                let key_raw = u64::from_le_bytes(desc[0..8].try_into().unwrap());
                let node_flags = NodeFlags(desc[8]);
                let rec_len = u32::from_le_bytes(desc[12..16].try_into().unwrap()) as u64;
                let payload_start = pos + DESC_LEN;

                if payload_start + rec_len > len {
                    // Trailing write cut off mid-record by a crash.
                    file.set_len(pos).map_err(io_err)?;
                    break;
                }
                let is_last = payload_start + rec_len == len;

                if node_flags.contains(NodeFlags::TRANS) && !node_flags.contains(NodeFlags::VALID) {
                    if is_last {
                        file.set_len(pos).map_err(io_err)?;
                        break;
                    }
                    return Err(Error::new(
                        ErrorKind::Malf,
                        format!("uncommitted journal transaction not at end of {path}"),
                    ));
                }

                let key = JournalKey(key_raw);
                let bytes = if lazy {
                    None
                } else {
                    file.seek(SeekFrom::Start(payload_start)).map_err(io_err)?;
                    let mut payload = vec![0u8; rec_len as usize];
                    file.read_exact(&mut payload).map_err(io_err)?;
                    Some(Bytes::from(payload))
                };
                if node_flags.contains(NodeFlags::VALID) {
                    used += rec_len as usize;
                }
                nodes.insert(
                    key,
                    Node {
                        flags: node_flags,
                        file_offset: pos,
                        payload_len: rec_len as u32,
                        bytes,
                    },
                );
                pos = payload_start + rec_len;
            }
        } else {
            write_header(&mut file, flags)?;
        }

        file.seek(SeekFrom::End(0)).map_err(io_err)?;

        Ok(Self {
            path: path.to_owned(),
            file,
            fslimit,
            used,
            nodes,
            trans: None,
            lazy,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bytes_used(&self) -> usize {
        self.used
    }

    /// Begin a transaction appending `changeset`. Only one transaction
    /// may be open at a time. The record is written to disk immediately,
    /// flagged `TRANS` (invisible to [`Journal::fetch`]/[`Journal::walk`]
    /// until committed), so a crash before commit leaves a discardable
    /// trailing record rather than a lost write.
    pub fn trans_begin(&mut self, changeset: &Changeset) -> Result<()> {
        if self.trans.is_some() {
            return Err(Error::new(
                ErrorKind::Busy,
                "a journal transaction is already open",
            ));
        }

        let size = changeset.binary_size();
        if self.used + size > self.fslimit {
            return Err(Error::busy(
                "journal is full; caller should sync and evict before retrying",
            ));
        }

        let mut buf = BytesMut::new();
        changeset.compose(&mut buf);
        let payload = buf.freeze();
        let key = JournalKey::new(changeset.serial_from(), changeset.serial_to());

        let pre_trans_len = self.file.seek(SeekFrom::End(0)).map_err(io_err)?;
        let offset = write_record(&mut self.file, key, NodeFlags::TRANS, &payload)?;

        self.nodes.insert(
            key,
            Node {
                flags: NodeFlags::TRANS,
                file_offset: offset,
                payload_len: payload.len() as u32,
                bytes: Some(payload),
            },
        );
        self.trans = Some(Transaction { key, pre_trans_len });
        Ok(())
    }

    /// Commit the open transaction, making its changeset visible by
    /// flipping its descriptor's flags byte in place.
    pub fn trans_commit(&mut self) -> Result<()> {
        let trans = self
            .trans
            .take()
            .ok_or_else(|| Error::inval("no journal transaction is open"))?;
        let node = self
            .nodes
            .get_mut(&trans.key)
            .ok_or_else(|| Error::internal("transaction node vanished before commit"))?;

        let new_flags = NodeFlags::VALID | NodeFlags::DIRTY;
        self.file
            .seek(SeekFrom::Start(node.file_offset + 8))
            .map_err(io_err)?;
        self.file.write_all(&[new_flags.0]).map_err(io_err)?;
        self.file.flush().map_err(io_err)?;
        self.file.seek(SeekFrom::End(0)).map_err(io_err)?;

        self.used += node.payload_len as usize;
        node.flags = new_flags;
        Ok(())
    }

    /// Abort the open transaction, discarding its changeset entirely by
    /// truncating the file back to its pre-transaction length.
    pub fn trans_rollback(&mut self) -> Result<()> {
        let trans = self
            .trans
            .take()
            .ok_or_else(|| Error::inval("no journal transaction is open"))?;
        self.nodes.remove(&trans.key);
        self.file.set_len(trans.pre_trans_len).map_err(io_err)?;
        self.file.seek(SeekFrom::End(0)).map_err(io_err)?;
        Ok(())
    }

    /// Append and immediately commit `changeset` in one step — the common
    /// case for IXFR/DDNS application, where the caller has no further
    /// writes to batch into the same transaction.
    pub fn append(&mut self, changeset: &Changeset) -> Result<()> {
        self.trans_begin(changeset)?;
        self.trans_commit()
    }

    fn load_payload(&mut self, key: JournalKey) -> Result<Bytes> {
        let node = self.nodes.get(&key).expect("key just looked up by caller");
        if let Some(bytes) = &node.bytes {
            return Ok(bytes.clone());
        }
        let offset = node.file_offset + DESC_LEN;
        let len = node.payload_len as usize;
        self.file.seek(SeekFrom::Start(offset)).map_err(io_err)?;
        let mut payload = vec![0u8; len];
        self.file.read_exact(&mut payload).map_err(io_err)?;
        self.file.seek(SeekFrom::End(0)).map_err(io_err)?;
        let bytes = Bytes::from(payload);
        if let Some(node) = self.nodes.get_mut(&key) {
            node.bytes = Some(bytes.clone());
        }
        Ok(bytes)
    }

    /// Fetch the changeset whose `serial_from` matches `from`, if any.
    pub fn fetch(&mut self, from: Serial) -> Result<Option<Changeset>> {
        let found = self
            .nodes
            .iter()
            .find(|(key, node)| node.flags.contains(NodeFlags::VALID) && key.serial_from() == from)
            .map(|(key, _)| *key);
        let Some(key) = found else {
            return Ok(None);
        };
        let mut bytes = self.load_payload(key)?;
        Ok(Some(Changeset::parse(&mut bytes)?))
    }

    /// Walk every valid changeset from `from` to `to` inclusive, in serial
    /// order, returning [`ErrorKind::Range`] if any link in the chain is
    /// missing (the caller should fall back to AXFR in that case).
    pub fn walk(&mut self, from: Serial, to: Serial) -> Result<Vec<Changeset>> {
        let mut out = Vec::new();
        let mut cursor = from;
        let node_count = self.nodes.len();
        while cursor != to {
            let Some(cs) = self.fetch(cursor)? else {
                return Err(Error::range(format!(
                    "no journal entry continues history from serial {cursor}"
                )));
            };
            cursor = cs.serial_to();
            out.push(cs);
            if out.len() > node_count {
                return Err(Error::internal("journal walk did not converge"));
            }
        }
        Ok(out)
    }

    /// Drop nodes already reflected in a zonefile sync (their `DIRTY` bit
    /// is cleared by [`Journal::mark_synced`] beforehand), reclaiming
    /// space for new appends by rewriting the file to hold only the
    /// nodes worth keeping. Mirrors the historical journal's behavior of
    /// trimming its oldest entries once a sync has made them redundant
    /// for crash recovery.
    pub fn evict_synced(&mut self) -> Result<()> {
        let keep_keys: Vec<JournalKey> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.flags.contains(NodeFlags::DIRTY))
            .map(|(key, _)| *key)
            .collect();

        let mut kept = Vec::with_capacity(keep_keys.len());
        for key in keep_keys {
            let flags = self.nodes[&key].flags;
            let payload = self.load_payload(key)?;
            kept.push((key, flags, payload));
        }

        self.file.set_len(0).map_err(io_err)?;
        write_header(&mut self.file, if self.lazy { OpenFlags::LAZY } else { OpenFlags::NONE })?;

        let mut nodes = BTreeMap::new();
        let mut used = 0usize;
        for (key, flags, payload) in kept {
            let offset = write_record(&mut self.file, key, flags, &payload)?;
            used += payload.len();
            nodes.insert(
                key,
                Node {
                    flags,
                    file_offset: offset,
                    payload_len: payload.len() as u32,
                    bytes: if self.lazy { None } else { Some(payload) },
                },
            );
        }

        self.nodes = nodes;
        self.used = used;
        Ok(())
    }

    /// Clear the `DIRTY` bit on every node, marking the journal as fully
    /// reflected in the on-disk zonefile as of this call.
    pub fn mark_synced(&mut self) -> Result<()> {
        let keys: Vec<JournalKey> = self.nodes.keys().copied().collect();
        for key in keys {
            let node = self.nodes.get_mut(&key).expect("key just collected above");
            if !node.flags.contains(NodeFlags::DIRTY) {
                continue;
            }
            node.flags.remove(NodeFlags::DIRTY);
            let flags_byte = node.flags.0;
            self.file
                .seek(SeekFrom::Start(node.file_offset + 8))
                .map_err(io_err)?;
            self.file.write_all(&[flags_byte]).map_err(io_err)?;
        }
        self.file.flush().map_err(io_err)?;
        self.file.seek(SeekFrom::End(0)).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use domain::base::Class;
    use domain::base::Ttl;

    use crate::changeset::ChangesetOrigin;
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

    fn cs(from: u32, to: u32) -> Changeset {
        Changeset::new(ChangesetOrigin::Ixfr, soa(from), soa(to), vec![], vec![])
    }

    fn journal_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(dir.path()).unwrap().join("zone.jnl")
    }

    #[test]
    fn append_then_fetch_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = Journal::open(&journal_path(&dir), 1 << 20, OpenFlags::NONE).unwrap();
        j.append(&cs(1, 2)).unwrap();
        let fetched = j.fetch(Serial::from(1)).unwrap().unwrap();
        assert_eq!(fetched.serial_to(), Serial::from(2));
    }

    #[test]
    fn rollback_discards_uncommitted_changeset() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = Journal::open(&journal_path(&dir), 1 << 20, OpenFlags::NONE).unwrap();
        j.trans_begin(&cs(1, 2)).unwrap();
        j.trans_rollback().unwrap();
        assert!(j.fetch(Serial::from(1)).unwrap().is_none());
        assert!(j.is_empty());
    }

    #[test]
    fn walk_chains_contiguous_changesets() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = Journal::open(&journal_path(&dir), 1 << 20, OpenFlags::NONE).unwrap();
        j.append(&cs(1, 2)).unwrap();
        j.append(&cs(2, 3)).unwrap();
        j.append(&cs(3, 4)).unwrap();
        let chain = j.walk(Serial::from(1), Serial::from(4)).unwrap();
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn walk_reports_range_error_on_gap() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = Journal::open(&journal_path(&dir), 1 << 20, OpenFlags::NONE).unwrap();
        j.append(&cs(1, 2)).unwrap();
        j.append(&cs(3, 4)).unwrap();
        let err = j.walk(Serial::from(1), Serial::from(4)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn append_past_fslimit_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let small = cs(1, 2).binary_size() - 1;
        let mut j = Journal::open(&journal_path(&dir), small, OpenFlags::NONE).unwrap();
        let err = j.append(&cs(1, 2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
    }

    #[test]
    fn evict_synced_drops_clean_nodes_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = Journal::open(&journal_path(&dir), 1 << 20, OpenFlags::NONE).unwrap();
        j.append(&cs(1, 2)).unwrap();
        j.mark_synced().unwrap();
        j.append(&cs(2, 3)).unwrap();
        j.evict_synced().unwrap();
        assert!(j.fetch(Serial::from(1)).unwrap().is_none());
        assert!(j.fetch(Serial::from(2)).unwrap().is_some());
    }

    #[test]
    fn journal_key_orders_by_serial_to_then_from() {
        let a = JournalKey::new(Serial::from(1), Serial::from(5));
        let b = JournalKey::new(Serial::from(2), Serial::from(5));
        let c = JournalKey::new(Serial::from(1), Serial::from(6));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn journal_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = journal_path(&dir);
        {
            let mut j = Journal::open(&path, 1 << 20, OpenFlags::NONE).unwrap();
            j.append(&cs(1, 2)).unwrap();
            j.append(&cs(2, 3)).unwrap();
        }
        let mut reopened = Journal::open(&path, 1 << 20, OpenFlags::NONE).unwrap();
        let chain = reopened.walk(Serial::from(1), Serial::from(3)).unwrap();
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn reopen_discards_an_uncommitted_trailing_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = journal_path(&dir);
        {
            let mut j = Journal::open(&path, 1 << 20, OpenFlags::NONE).unwrap();
            j.append(&cs(1, 2)).unwrap();
            // Simulate a crash between trans_begin and trans_commit: the
            // record is on disk, flagged TRANS, but never flipped.
            j.trans_begin(&cs(2, 3)).unwrap();
        }
        let mut reopened = Journal::open(&path, 1 << 20, OpenFlags::NONE).unwrap();
        assert!(reopened.fetch(Serial::from(2)).unwrap().is_none());
        let chain = reopened.walk(Serial::from(1), Serial::from(2)).unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn lazy_open_loads_payloads_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let path = journal_path(&dir);
        {
            let mut j = Journal::open(&path, 1 << 20, OpenFlags::NONE).unwrap();
            j.append(&cs(1, 2)).unwrap();
        }
        let mut lazy = Journal::open(&path, 1 << 20, OpenFlags::LAZY).unwrap();
        let fetched = lazy.fetch(Serial::from(1)).unwrap().unwrap();
        assert_eq!(fetched.serial_to(), Serial::from(2));
    }
}
