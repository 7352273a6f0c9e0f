//! The changeset model: the unit of work that moves a zone
//! from one SOA serial to the next.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use domain::base::Serial;

use crate::error::{Error, ErrorKind, Result};
use crate::rrset::{RegularRecord, SoaRecord};

/// Where a changeset came from. Carried alongside the changeset itself so
/// the pipeline can apply origin-specific policy: DDNS changesets go
/// through the TSIG/ACL gate; IXFR changesets do not; DNSSEC changesets
/// are appended to the journal but never trigger a NOTIFY).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangesetOrigin {
    /// Received over IXFR/AXFR-as-diff from a master.
    Ixfr,
    /// Produced by a validated DDNS/UPDATE request.
    Ddns,
    /// Produced by in-band DNSSEC signing of another changeset.
    Dnssec,
}

/// A single, self-contained delta between two zone serials.
///
/// `removed` and `added` are sorted (see [`RegularRecord`]'s `Ord`) so
/// that [`Changeset::merge`] and serialization are deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Changeset {
    pub origin: ChangesetOrigin,
    pub soa_from: SoaRecord,
    pub soa_to: SoaRecord,
    pub removed: Vec<RegularRecord>,
    pub added: Vec<RegularRecord>,
}

impl Changeset {
    /// Build a changeset, sorting `removed`/`added` into canonical order.
    pub fn new(
        origin: ChangesetOrigin,
        soa_from: SoaRecord,
        soa_to: SoaRecord,
        mut removed: Vec<RegularRecord>,
        mut added: Vec<RegularRecord>,
    ) -> Self {
        removed.sort();
        added.sort();
        Self {
            origin,
            soa_from,
            soa_to,
            removed,
            added,
        }
    }

    pub fn serial_from(&self) -> Serial {
        self.soa_from.serial()
    }

    pub fn serial_to(&self) -> Serial {
        self.soa_to.serial()
    }

    /// Whether this changeset is a genuine no-op: same serial on both
    /// sides and no record deltas.
    pub fn is_empty(&self) -> bool {
        self.serial_from() == self.serial_to() && self.removed.is_empty() && self.added.is_empty()
    }

    /// The exact number of bytes [`Changeset::compose`] will write.
    ///
    /// Precomputed up front (mirroring `zones_changeset_binary_size` in
    /// the historical implementation) so [`crate::journal::Journal::append`]
    /// can reserve its buffer once instead of reallocating mid-write.
    pub fn binary_size(&self) -> usize {
        const HEADER: usize = 1 /* origin tag */ + 4 /* removed count */ + 4 /* added count */;
        let soa_from_len = soa_size(&self.soa_from);
        let soa_to_len = soa_size(&self.soa_to);
        let records_len: usize = self
            .removed
            .iter()
            .map(record_size)
            .chain(self.added.iter().map(record_size))
            .sum();
        HEADER + soa_from_len + soa_to_len + records_len
    }

    /// Serialize this changeset using the crate's stable on-disk encoding,
    /// reserving `binary_size()` bytes in `buf` up front.
    pub fn compose(&self, buf: &mut BytesMut) {
        buf.reserve(self.binary_size());
        buf.put_u8(origin_tag(self.origin));
        self.soa_from.compose(buf);
        self.soa_to.compose(buf);
        buf.put_u32(self.removed.len() as u32);
        for rec in &self.removed {
            rec.compose(buf);
        }
        buf.put_u32(self.added.len() as u32);
        for rec in &self.added {
            rec.compose(buf);
        }
    }

    /// Parse a changeset written by [`Changeset::compose`].
    pub fn parse(buf: &mut Bytes) -> Result<Self> {
        if buf.remaining() < 1 {
            return Err(Error::new(ErrorKind::Malf, "empty changeset buffer"));
        }
        let origin = origin_from_tag(buf.get_u8())?;
        let soa_from = SoaRecord::parse(buf)?;
        let soa_to = SoaRecord::parse(buf)?;
        let removed = parse_records(buf)?;
        let added = parse_records(buf)?;
        Ok(Self {
            origin,
            soa_from,
            soa_to,
            removed,
            added,
        })
    }

    /// Merge `self` (the earlier changeset) with `next` (its immediate
    /// successor) into one changeset spanning both.
    ///
    /// Requires `self.serial_to() == next.serial_from()`, the serial
    /// chain's contiguity invariant; anything else is an [`ErrorKind::Inval`].
    ///
    /// `removed` and `added` are concatenated, not deduplicated: a record
    /// that round-trips (removed by `self`, re-added by `next`, or vice
    /// versa) appears on both sides of the merged changeset exactly as it
    /// would if the two changesets had been journaled and replayed
    /// separately. Resolves SOA-to ownership the way the
    /// historical `zones_merge_and_store_changesets` did: the merged
    /// changeset always takes ownership of `next`'s `soa_to`, discarding
    /// `self`'s `soa_to` and `next`'s `soa_from` (they describe the same
    /// serial and carry no further information once merged).
    pub fn merge(self, next: Changeset) -> Result<Changeset> {
        if self.serial_to() != next.serial_from() {
            return Err(Error::new(
                ErrorKind::Inval,
                format!(
                    "cannot merge non-contiguous changesets: {} -> {} then {} -> {}",
                    self.serial_from(),
                    self.serial_to(),
                    next.serial_from(),
                    next.serial_to()
                ),
            ));
        }

        let origin = if self.origin == next.origin {
            self.origin
        } else {
            // A mixed-origin merge (e.g. an IXFR diff followed by the
            // DNSSEC re-sign it provoked) is recorded under the later
            // changeset's origin, since that is the one that determines
            // whether the merged result re-triggers signing.
            next.origin
        };

        let mut removed = self.removed;
        removed.extend(next.removed);
        let mut added = self.added;
        added.extend(next.added);

        Ok(Changeset::new(
            origin,
            self.soa_from,
            next.soa_to,
            removed,
            added,
        ))
    }
}

fn soa_size(soa: &SoaRecord) -> usize {
    let mut buf = BytesMut::new();
    soa.compose(&mut buf);
    buf.len()
}

fn record_size(rec: &RegularRecord) -> usize {
    let mut buf = BytesMut::new();
    rec.compose(&mut buf);
    buf.len()
}

fn parse_records(buf: &mut Bytes) -> Result<Vec<RegularRecord>> {
    if buf.remaining() < 4 {
        return Err(Error::new(ErrorKind::Malf, "truncated record count"));
    }
    let count = buf.get_u32() as usize;
    let mut records = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        records.push(RegularRecord::parse(buf)?);
    }
    Ok(records)
}

fn origin_tag(origin: ChangesetOrigin) -> u8 {
    match origin {
        ChangesetOrigin::Ixfr => 0,
        ChangesetOrigin::Ddns => 1,
        ChangesetOrigin::Dnssec => 2,
    }
}

fn origin_from_tag(tag: u8) -> Result<ChangesetOrigin> {
    match tag {
        0 => Ok(ChangesetOrigin::Ixfr),
        1 => Ok(ChangesetOrigin::Ddns),
        2 => Ok(ChangesetOrigin::Dnssec),
        other => Err(Error::new(
            ErrorKind::Malf,
            format!("unknown changeset origin tag {other}"),
        )),
    }
}
