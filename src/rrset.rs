//! The opaque record value this core operates on.
//!
//! Everything above the journal and the changeset diff deals in whole
//! RRsets identified by `(owner, type, class)`; this module defines that
//! value and a stable byte encoding for it, used by [`crate::changeset`]'s
//! serialization and by [`crate::journal`]'s on-disk node format.
//!
//! The SOA record gets its own type, [`SoaRecord`], because every changeset
//! carries exactly one SOA-from and one SOA-to, and because the serial
//! living inside it drives the whole of [`crate::timers`] and
//! [`crate::zonedb`]. Everything else is a [`RegularRecord`] with its
//! RDATA kept as an opaque, already-encoded blob: this crate never
//! interprets RDATA beyond the SOA fields, matching the core's stated
//! Non-goal of recursive/semantic record processing.

use std::cmp::Ordering;
use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use domain::base::Class;
use domain::base::{Name, Rtype, Serial, ToName, Ttl};

use crate::error::{Error, Result};

/// An owned, lowercase-insensitive-comparison-free domain name, backed by
/// [`Bytes`] the way `cascade` stores every owner name it touches.
pub type StoredName = Name<Bytes>;

//----------- SoaFields ------------------------------------------------------

/// The seven fields of an SOA RDATA (RFC 1035 §3.3.13), decoded out of
/// their wire form so the timer and transfer logic can read them without
/// re-parsing RDATA bytes on every tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoaFields {
    pub mname: StoredName,
    pub rname: StoredName,
    pub serial: Serial,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

impl SoaFields {
    fn compose(&self, buf: &mut BytesMut) {
        put_name(buf, &self.mname);
        put_name(buf, &self.rname);
        buf.put_u32(self.serial.into());
        buf.put_u32(self.refresh);
        buf.put_u32(self.retry);
        buf.put_u32(self.expire);
        buf.put_u32(self.minimum);
    }

    fn parse(buf: &mut Bytes) -> Result<Self> {
        let mname = get_name(buf)?;
        let rname = get_name(buf)?;
        let serial = Serial::from(get_u32(buf)?);
        let refresh = get_u32(buf)?;
        let retry = get_u32(buf)?;
        let expire = get_u32(buf)?;
        let minimum = get_u32(buf)?;
        Ok(Self {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        })
    }
}

//----------- SoaRecord -------------------------------------------------------

/// An SOA resource record: the owner, class, TTL, and the fields above.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoaRecord {
    pub owner: StoredName,
    pub class: Class,
    pub ttl: Ttl,
    pub rdata: SoaFields,
}

impl SoaRecord {
    /// The serial this SOA carries.
    pub fn serial(&self) -> Serial {
        self.rdata.serial
    }

    /// Serialize into `buf` using this crate's stable on-disk encoding.
    pub fn compose(&self, buf: &mut BytesMut) {
        put_name(buf, &self.owner);
        buf.put_u16(u16::from(self.class.to_int()));
        buf.put_u32(self.ttl.as_secs());
        self.rdata.compose(buf);
    }

    /// Parse a value written by [`SoaRecord::compose`].
    pub fn parse(buf: &mut Bytes) -> Result<Self> {
        let owner = get_name(buf)?;
        let class = Class::from_int(get_u16(buf)?);
        let ttl = Ttl::from_secs(get_u32(buf)?);
        let rdata = SoaFields::parse(buf)?;
        Ok(Self {
            owner,
            class,
            ttl,
            rdata,
        })
    }
}

impl fmt::Display for SoaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} SOA {} {} ({})",
            self.owner, self.rdata.mname, self.rdata.rname, self.rdata.serial
        )
    }
}

//----------- RegularRecord ---------------------------------------------------

/// Any resource record other than SOA, with its RDATA kept opaque.
///
/// Ordering is by `(owner, rtype, class, rdata)`; TTL is deliberately
/// excluded from identity so that a TTL-only change of an otherwise
/// identical record is still recognized as the same record by
/// [`crate::contents::ZoneContents::diff`] (the newer TTL simply replaces
/// the older one without the record appearing in both `removed` and
/// `added` under a different sort key).
#[derive(Clone, Debug)]
pub struct RegularRecord {
    pub owner: StoredName,
    pub rtype: Rtype,
    pub class: Class,
    pub ttl: Ttl,
    pub rdata: Bytes,
}

impl RegularRecord {
    /// The key used to test whether two records describe "the same data"
    /// irrespective of TTL.
    fn identity_key(&self) -> (&StoredName, Rtype, Class, &Bytes) {
        (&self.owner, self.rtype, self.class, &self.rdata)
    }

    pub fn compose(&self, buf: &mut BytesMut) {
        put_name(buf, &self.owner);
        buf.put_u16(self.rtype.to_int());
        buf.put_u16(u16::from(self.class.to_int()));
        buf.put_u32(self.ttl.as_secs());
        buf.put_u16(self.rdata.len() as u16);
        buf.put_slice(&self.rdata);
    }

    pub fn parse(buf: &mut Bytes) -> Result<Self> {
        let owner = get_name(buf)?;
        let rtype = Rtype::from(get_u16(buf)?);
        let class = Class::from_int(get_u16(buf)?);
        let ttl = Ttl::from_secs(get_u32(buf)?);
        let rdlen = get_u16(buf)? as usize;
        if buf.remaining() < rdlen {
            return Err(Error::new(
                crate::error::ErrorKind::Malf,
                "truncated RDATA in record encoding",
            ));
        }
        let rdata = buf.copy_to_bytes(rdlen);
        Ok(Self {
            owner,
            rtype,
            class,
            ttl,
            rdata,
        })
    }
}

impl PartialEq for RegularRecord {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
    }
}

impl Eq for RegularRecord {}

impl PartialOrd for RegularRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegularRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.owner
            .cmp(&other.owner)
            .then_with(|| self.rtype.to_int().cmp(&other.rtype.to_int()))
            .then_with(|| self.class.to_int().cmp(&other.class.to_int()))
            .then_with(|| self.rdata.cmp(&other.rdata))
    }
}

impl fmt::Display for RegularRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({} bytes rdata)",
            self.owner,
            self.rtype,
            self.class,
            self.rdata.len()
        )
    }
}

//----------- wire helpers ----------------------------------------------------

fn put_name(buf: &mut BytesMut, name: &StoredName) {
    let wire = name.to_bytes();
    buf.put_u16(wire.len() as u16);
    buf.put_slice(&wire);
}

fn get_name(buf: &mut Bytes) -> Result<StoredName> {
    let len = get_u16(buf)? as usize;
    if buf.remaining() < len {
        return Err(Error::new(
            crate::error::ErrorKind::Malf,
            "truncated name in record encoding",
        ));
    }
    let raw = buf.copy_to_bytes(len);
    StoredName::from_octets(raw)
        .map_err(|e| Error::new(crate::error::ErrorKind::Malf, format!("invalid name: {e}")))
}

fn get_u16(buf: &mut Bytes) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(Error::new(
            crate::error::ErrorKind::Malf,
            "truncated u16 in record encoding",
        ));
    }
    Ok(buf.get_u16())
}

fn get_u32(buf: &mut Bytes) -> Result<u32> {
    if buf.remaining() < 4 {
        return Err(Error::new(
            crate::error::ErrorKind::Malf,
            "truncated u32 in record encoding",
        ));
    }
    Ok(buf.get_u32())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn example_soa(serial: u32) -> SoaRecord {
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

    #[test]
    fn soa_round_trips_through_compose_parse() {
        let soa = example_soa(42);
        let mut buf = BytesMut::new();
        soa.compose(&mut buf);
        let mut bytes = buf.freeze();
        let parsed = SoaRecord::parse(&mut bytes).unwrap();
        assert_eq!(soa, parsed);
        assert!(bytes.is_empty());
    }

    #[test]
    fn regular_record_round_trips() {
        let rec = RegularRecord {
            owner: StoredName::from_str("www.example.com.").unwrap(),
            rtype: Rtype::A,
            class: Class::IN,
            ttl: Ttl::from_secs(300),
            rdata: Bytes::from_static(&[192, 0, 2, 1]),
        };
        let mut buf = BytesMut::new();
        rec.compose(&mut buf);
        let mut bytes = buf.freeze();
        let parsed = RegularRecord::parse(&mut bytes).unwrap();
        assert_eq!(rec, parsed);
    }

    #[test]
    fn regular_record_identity_ignores_ttl() {
        let mut a = RegularRecord {
            owner: StoredName::from_str("www.example.com.").unwrap(),
            rtype: Rtype::A,
            class: Class::IN,
            ttl: Ttl::from_secs(300),
            rdata: Bytes::from_static(&[192, 0, 2, 1]),
        };
        let mut b = a.clone();
        b.ttl = Ttl::from_secs(60);
        assert_eq!(a, b);
        a.rdata = Bytes::from_static(&[192, 0, 2, 2]);
        assert_ne!(a, b);
    }

    #[test]
    fn truncated_record_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u16(3);
        buf.put_slice(b"ww");
        let mut bytes = buf.freeze();
        let err = RegularRecord::parse(&mut bytes).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Malf);
    }
}
