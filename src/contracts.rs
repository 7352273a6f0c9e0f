//! Traits for the collaborators this core depends on but does not itself
//! implement: a scheduler for timers, a worker pool for
//! transfer/signing tasks, a transfer executor that speaks the AXFR/IXFR
//! wire protocol, and a clock. Production wires in real implementations;
//! tests wire in fakes.
//!
//! Keeping these as traits (rather than concrete types) is the same
//! seam `cascade::manager` puts between its `Center` and the network
//! stack: the core decides *when* and *what*, an external component
//! decides *how*.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use domain::base::Serial;

use crate::error::Result;
use crate::rrset::StoredName;

/// A monotonic clock, abstracted so timer tests can control time directly
/// instead of sleeping in real time.
pub trait Clock: Send + Sync {
    /// Seconds since an arbitrary, fixed epoch for this clock instance.
    fn now_secs(&self) -> u64;
}

/// The real-time, OS-backed clock used in production.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// A boxed future, the same shape `cascade`'s task-spawning helpers use
/// for trait-object callbacks.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Schedules delayed, cancellable work, standing in for the external
/// event-loop component: the core only decides what to run and when; an
/// external scheduler owns the event loop.
pub trait Scheduler: Send + Sync {
    /// A handle that cancels its associated timer when dropped, or when
    /// explicitly told to via [`TimerHandle::cancel`].
    type Handle: TimerHandle;

    /// Run `task` once, after `delay`.
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> Self::Handle;
}

/// A handle to a scheduled timer.
pub trait TimerHandle: Send {
    /// Cancel the timer if it has not already fired.
    fn cancel(&self);
}

/// Runs CPU- or I/O-bound work off the calling context, standing in for
/// the external worker pool.
pub trait WorkerPool: Send + Sync {
    /// Run `task` on the pool, returning its result.
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Outcome of a transfer attempt, reported back to the timer and
/// pipeline layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The primary had no newer data; the zone is unchanged.
    UpToDate,
    /// New data was retrieved and should be handed to the pipeline.
    Updated,
    /// The transfer could not complete (network error, refused, etc).
    Failed,
}

/// The wire operation a [`TransferTask`] performs. `Forward` and
/// `Notify` are not strictly "transfers" in the AXFR/IXFR sense, but
/// share the same dispatch shape (one outbound query, one outcome) and
/// so ride the same executor and `via_addr`/`tsig_key_ref` plumbing
/// instead of a parallel trait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferOp {
    /// A bare SOA query, used to check whether a refresh is even needed
    /// before paying for a full IXFR.
    Soa,
    /// AXFR: a full zone transfer.
    Ain,
    /// IXFR: an incremental zone transfer.
    Iin,
    /// Forward a DDNS/UPDATE request upstream to the zone's primary.
    Forward,
    /// Send a NOTIFY to a configured secondary.
    Notify,
}

/// Which transport to use for the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

/// Everything a [`TransferExecutor`] needs to carry out one wire
/// exchange.
#[derive(Clone, Debug)]
pub struct TransferTask {
    pub zone_name: StoredName,
    pub op: TransferOp,
    pub transport: Transport,
    /// The remote to contact: the zone's configured primary for
    /// `Soa`/`Ain`/`Iin`/`Forward`, or a configured secondary for
    /// `Notify`.
    pub remote: SocketAddr,
    /// The zone's current serial, used by `Soa`/`Ain`/`Iin` to ask "is
    /// there anything newer than this". Unused by `Forward`/`Notify`.
    pub since: Serial,
    /// The local address to originate the exchange from, if the
    /// embedding server binds per-zone source addresses (e.g. to match
    /// the address a TSIG key is scoped to).
    pub via_addr: Option<SocketAddr>,
    /// The TSIG key to sign this exchange with, if any.
    pub tsig_key_ref: Option<String>,
    /// For `Forward`: the original client's raw UPDATE message, carried
    /// verbatim (transaction ID included) so the response can be relayed
    /// back unchanged.
    pub forwarded_query: Option<Bytes>,
}

/// Performs the AXFR/IXFR wire exchange with a remote master, standing in
/// for the external transfer executor. This crate only decides
/// *when* to call this and what to do with the result.
pub trait TransferExecutor: Send + Sync {
    /// Carry out `task` and report its outcome.
    fn transfer(&self, task: TransferTask) -> BoxFuture<'static, Result<TransferOutcome>>;
}
