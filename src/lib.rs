//! Zone lifecycle and update core for an authoritative DNS server.
//!
//! This crate owns the state a secondary or primary authoritative server
//! keeps about each zone it serves between wire-protocol events: its
//! current contents, the write-ahead journal of changes behind those
//! contents, the REFRESH/RETRY/EXPIRE timers that decide when to pull a
//! fresh copy from a primary, and the single update pipeline every
//! changeset — whether from IXFR, DDNS, or in-band DNSSEC re-signing —
//! passes through to become the zone's new contents.
//!
//! It deliberately does not parse or serve DNS wire protocol itself: see
//! [`contracts`] for the traits it expects an embedding server to
//! implement (a scheduler, a worker pool, a transfer executor, a TSIG
//! verifier).

pub mod acl;
pub mod changeset;
pub mod config;
pub mod contents;
pub mod contracts;
pub mod ddns;
pub mod error;
pub mod journal;
pub mod metrics;
pub mod pipeline;
pub mod rrset;
pub mod sync;
pub mod timers;
pub mod transfer;
pub mod tsig_gate;
pub mod zone_entry;
pub mod zonedb;

pub use error::{Error, ErrorKind, Result, TsigFailure};
pub use zonedb::ZoneDb;
pub use zone_entry::{ZoneConfig, ZoneEntry};
