//! Per-zone state : everything the core tracks for one zone
//! between the config that defines it and the contents it currently
//! serves.
//!
//! The transfer state machine uses the "take-and-poison" pattern from
//! `cascade::zonedata::storage::ZoneDataStorage::take`: a transition
//! takes the current state out of its `Mutex` by value (leaving a
//! `Poisoned` placeholder so a panic mid-transition is visible rather
//! than silently reverting), computes the next state, and writes it
//! back. This lets transitions consume owned data (e.g. a completed
//! transfer's new contents) without fighting the borrow checker over a
//! `&mut` through the mutex guard.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::{ArcSwap, Guard};
use camino::Utf8Path;
use domain::base::Serial;

use crate::acl::Acl;
use crate::contents::ZoneContents;
use crate::contracts::TimerHandle;
use crate::error::{Error, ErrorKind, Result};
use crate::journal::{Journal, OpenFlags};
use crate::rrset::StoredName;

/// Default journal size bound if a zone's config does not override it
/// (matches the 4 MiB default the historical journal used per zone).
pub const DEFAULT_JOURNAL_FSLIMIT: usize = 4 * 1024 * 1024;

/// The transfer state machine for one zone.
///
/// `Sched` and `Pending` are deliberately distinct: a REFRESH timer
/// firing only ever *schedules* a transfer attempt (`arm_refresh`), and a
/// zone stays `Sched` until the scheduled task actually begins running
/// and claims `Pending` via `try_begin_transfer`. Collapsing the two
/// would make it impossible to tell "a timer is armed, nothing is
/// running yet" from "a transfer task is actively in flight", which
/// `cascade`'s own loader tracks separately so that a NOTIFY arriving
/// while a timer is merely armed can still cause an immediate transfer
/// instead of waiting out the timer.
#[derive(Debug, Default)]
pub enum TransferState {
    /// No transfer is running, pending, or scheduled.
    #[default]
    Idle,
    /// A REFRESH timer is armed; no transfer task has started yet.
    Sched,
    /// A transfer task has been enqueued and has not yet completed.
    Pending,
    /// Placeholder written while a transition is being computed; a value
    /// observed in this state outside of [`ZoneEntry::take_transfer_state`]
    /// indicates a transition panicked before writing its result back.
    Poisoned,
}

/// Per-zone configuration that does not change with transfers.
#[derive(Clone, Debug)]
pub struct ZoneConfig {
    /// Addresses (and TSIG keys) allowed to request AXFR/IXFR of this
    /// zone.
    pub provide_xfr_to: Acl,
    /// Addresses (and TSIG keys) allowed to send NOTIFY for this zone.
    pub allow_notify_from: Acl,
    /// Addresses (and TSIG keys) allowed to submit DDNS/UPDATE for this
    /// zone.
    pub allow_update_from: Acl,
    /// Addresses (and the TSIG key) this zone's configured primary is
    /// expected to transfer from and to send NOTIFY replies/responses
    /// under, for a secondary zone. Distinct from `provide_xfr_to`
    /// (which governs who may pull *from* this zone) and from
    /// `allow_notify_from` (which is address/key only, no implied peer
    /// identity): `xfr_in` names the one peer this zone itself transfers
    /// *from*.
    pub xfr_in: Acl,
    /// The primary this zone transfers from, if it is a secondary.
    pub primary: Option<SocketAddr>,
    /// Secondaries to NOTIFY after a successful local update.
    pub notify_to: Vec<SocketAddr>,
    /// Bound on journal size in bytes.
    pub journal_fslimit: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            provide_xfr_to: Acl::empty(),
            allow_notify_from: Acl::empty(),
            allow_update_from: Acl::empty(),
            xfr_in: Acl::empty(),
            primary: None,
            notify_to: Vec::new(),
            journal_fslimit: DEFAULT_JOURNAL_FSLIMIT,
        }
    }
}

type TimerSlot = Mutex<Option<Box<dyn TimerHandle>>>;

/// The four timers a zone may have outstanding at once. Kept as separate
/// slots (rather than one handle) since REFRESH, EXPIRE, the
/// journal-to-zonefile sync, and DNSSEC re-signing all run on
/// independent schedules and must be cancelable independently, e.g. a
/// successful transfer cancels and rearms EXPIRE without touching the
/// journal-sync timer.
#[derive(Default)]
struct TimerHandles {
    refresh: TimerSlot,
    expire: TimerSlot,
    journal_sync: TimerSlot,
    dnssec_resign: TimerSlot,
}

impl TimerHandles {
    /// Replace whatever is in `slot`, canceling it first. Re-arming an
    /// already-armed timer is how every timer in this module is kept
    /// idempotent: the caller never needs to check whether one is
    /// already running before arming a new one.
    fn arm(slot: &TimerSlot, handle: Box<dyn TimerHandle>) {
        let mut guard = slot.lock().unwrap();
        if let Some(old) = guard.take() {
            old.cancel();
        }
        *guard = Some(handle);
    }

    fn cancel(slot: &TimerSlot) {
        if let Some(old) = slot.lock().unwrap().take() {
            old.cancel();
        }
    }

    fn cancel_all(&self) {
        Self::cancel(&self.refresh);
        Self::cancel(&self.expire);
        Self::cancel(&self.journal_sync);
        Self::cancel(&self.dnssec_resign);
    }
}

/// Everything the core tracks for one zone.
pub struct ZoneEntry {
    name: StoredName,
    contents: ArcSwap<ZoneContents>,
    journal: Mutex<Journal>,
    transfer_state: Mutex<TransferState>,
    config: ZoneConfig,
    /// The serial last written to this zone's zonefile, or `None` if it
    /// has never been synced. Compared against the current contents'
    /// serial before [`crate::sync::sync_to_zonefile`] rewrites the file.
    zonefile_serial: Mutex<Option<Serial>>,
    timers: TimerHandles,
    /// Set once EXPIRE fires with no successful transfer since. The zone
    /// remains registered (its ACLs, journal, and config survive) but its
    /// contents are no longer servable; see [`ZoneEntry::contents_checked`].
    expired: AtomicBool,
}

impl ZoneEntry {
    pub fn new(
        name: StoredName,
        contents: ZoneContents,
        provide_xfr_to: Acl,
        allow_notify_from: Acl,
        allow_update_from: Acl,
        journal_path: &Utf8Path,
    ) -> Result<Self> {
        Self::with_config(
            name,
            contents,
            ZoneConfig {
                provide_xfr_to,
                allow_notify_from,
                allow_update_from,
                ..ZoneConfig::default()
            },
            journal_path,
        )
    }

    pub fn with_config(
        name: StoredName,
        contents: ZoneContents,
        config: ZoneConfig,
        journal_path: &Utf8Path,
    ) -> Result<Self> {
        let journal = Journal::open(journal_path, config.journal_fslimit, OpenFlags::NONE)?;
        Ok(Self {
            name,
            contents: ArcSwap::from_pointee(contents),
            journal: Mutex::new(journal),
            transfer_state: Mutex::new(TransferState::Idle),
            config,
            zonefile_serial: Mutex::new(None),
            timers: TimerHandles::default(),
            expired: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &StoredName {
        &self.name
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Load the current contents snapshot. Lock-free.
    ///
    /// This never fails, even once [`ZoneEntry::mark_expired`] has been
    /// called: the snapshot a reader already holds (or the one left
    /// behind by [`crate::zonedb::ZoneDb::expire`]) is still a
    /// structurally valid [`ZoneContents`], just stale. Callers that must
    /// refuse to serve expired contents should use
    /// [`ZoneEntry::contents_checked`] instead.
    pub fn contents(&self) -> Guard<Arc<ZoneContents>> {
        self.contents.load()
    }

    /// As [`ZoneEntry::contents`], but [`ErrorKind::Expired`] once
    /// [`ZoneEntry::mark_expired`] has been called and no successful
    /// swap has happened since.
    pub fn contents_checked(&self) -> Result<Guard<Arc<ZoneContents>>> {
        if self.is_expired() {
            return Err(Error::new(
                ErrorKind::Expired,
                format!("zone {} has expired", self.name),
            ));
        }
        Ok(self.contents())
    }

    /// Atomically replace the contents snapshot (readers holding the
    /// previous `Guard` keep reading the old snapshot until they drop
    /// it; nothing blocks). Clears the expired flag: a fresh snapshot is
    /// definitionally not expired, whether it arrived via a transfer, a
    /// DDNS update, or an operator reload.
    pub fn swap_contents(&self, new_contents: ZoneContents) {
        self.contents.store(Arc::new(new_contents));
        self.expired.store(false, Ordering::Release);
    }

    /// Mark this zone's contents expired (EXPIRE fired with no
    /// successful transfer since). Idempotent.
    pub fn mark_expired(&self) {
        self.expired.store(true, Ordering::Release);
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    pub fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap()
    }

    /// The serial last written to this zone's zonefile, if it has ever
    /// been synced.
    pub fn zonefile_serial(&self) -> Option<Serial> {
        *self.zonefile_serial.lock().unwrap()
    }

    pub fn set_zonefile_serial(&self, serial: Serial) {
        *self.zonefile_serial.lock().unwrap() = Some(serial);
    }

    /// Arm the REFRESH timer: `Idle` -> `Sched`. A no-op if a REFRESH is
    /// already scheduled or a transfer is already running, since at most
    /// one of either is ever outstanding per zone.
    pub fn arm_refresh(&self) {
        self.take_transfer_state(|state| match state {
            TransferState::Idle => (TransferState::Sched, ()),
            other @ (TransferState::Sched | TransferState::Pending | TransferState::Poisoned) => {
                (other, ())
            }
        });
    }

    /// Attempt to move the transfer state machine to `Pending` (a
    /// transfer task has been enqueued and not yet completed), from
    /// either `Idle` or `Sched`. Returns `false` (and leaves the state
    /// untouched) if a transfer is already `Pending`, implementing the
    /// "at most one transfer in flight per zone" invariant.
    pub fn try_begin_transfer(&self) -> bool {
        self.take_transfer_state(|state| match state {
            TransferState::Idle | TransferState::Sched => (TransferState::Pending, true),
            other @ (TransferState::Pending | TransferState::Poisoned) => (other, false),
        })
    }

    /// Return the transfer state machine to `Idle` once a transfer
    /// (successful or not) completes.
    pub fn end_transfer(&self) {
        self.take_transfer_state(|_| (TransferState::Idle, ()));
    }

    pub fn is_transfer_in_flight(&self) -> bool {
        matches!(*self.transfer_state.lock().unwrap(), TransferState::Pending)
    }

    pub fn is_refresh_scheduled(&self) -> bool {
        matches!(
            *self.transfer_state.lock().unwrap(),
            TransferState::Sched | TransferState::Pending
        )
    }

    fn take_transfer_state<T>(&self, f: impl FnOnce(TransferState) -> (TransferState, T)) -> T {
        let mut guard = self.transfer_state.lock().unwrap();
        let current = std::mem::replace(&mut *guard, TransferState::Poisoned);
        let (next, result) = f(current);
        *guard = next;
        result
    }

    pub fn arm_refresh_timer(&self, handle: Box<dyn TimerHandle>) {
        TimerHandles::arm(&self.timers.refresh, handle);
    }

    pub fn arm_expire_timer(&self, handle: Box<dyn TimerHandle>) {
        TimerHandles::arm(&self.timers.expire, handle);
    }

    pub fn arm_journal_sync_timer(&self, handle: Box<dyn TimerHandle>) {
        TimerHandles::arm(&self.timers.journal_sync, handle);
    }

    pub fn arm_dnssec_resign_timer(&self, handle: Box<dyn TimerHandle>) {
        TimerHandles::arm(&self.timers.dnssec_resign, handle);
    }

    /// Cancel every outstanding timer for this zone, e.g. before removing
    /// it from the directory.
    pub fn cancel_all_timers(&self) {
        self.timers.cancel_all();
    }
}
