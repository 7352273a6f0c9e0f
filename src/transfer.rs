//! Transfer orchestration: deciding when to pull from a
//! primary, handing the work to a [`TransferExecutor`], and deciding who
//! to NOTIFY after a local change.
//!
//! The "at most one transfer in flight per zone" invariant lives on
//! [`ZoneEntry`] itself ([`ZoneEntry::try_begin_transfer`]); this module
//! is the glue that calls it, calls the executor, and feeds the result
//! back into the pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use domain::base::Serial;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::contracts::{
    BoxFuture, Scheduler, TransferExecutor, TransferOp, TransferOutcome, TransferTask, Transport,
};
use crate::error::{Error, ErrorKind, Result};
use crate::rrset::StoredName;
use crate::zone_entry::ZoneEntry;

/// Attempt a transfer for `entry`, if one is not already in flight.
///
/// Returns `Ok(None)` without contacting `executor` at all if a transfer
/// is already running, coalescing the request into the one in flight. Always releases the
/// in-flight marker before returning, including on error.
pub async fn maybe_transfer(
    entry: &Arc<ZoneEntry>,
    executor: &dyn TransferExecutor,
) -> Result<Option<TransferOutcome>> {
    let Some(primary) = entry.config().primary else {
        return Err(Error::new(
            ErrorKind::Inval,
            format!("zone {} has no configured primary", entry.name()),
        ));
    };

    if !entry.try_begin_transfer() {
        debug!(zone = %entry.name(), "transfer already in flight, skipping");
        return Ok(None);
    }

    let since = entry.contents().soa().serial();
    let result = run_transfer(entry.name().clone(), primary, since, executor).await;
    entry.end_transfer();

    match &result {
        Ok(TransferOutcome::Updated) => info!(zone = %entry.name(), "transfer retrieved new data"),
        Ok(TransferOutcome::UpToDate) => debug!(zone = %entry.name(), "transfer found no new data"),
        Ok(TransferOutcome::Failed) | Err(_) => {
            warn!(zone = %entry.name(), "transfer attempt failed")
        }
    }

    result.map(Some)
}

async fn run_transfer(
    name: StoredName,
    primary: SocketAddr,
    since: Serial,
    executor: &dyn TransferExecutor,
) -> Result<TransferOutcome> {
    executor
        .transfer(TransferTask {
            zone_name: name,
            op: TransferOp::Iin,
            transport: Transport::Tcp,
            remote: primary,
            since,
            via_addr: None,
            tsig_key_ref: None,
            forwarded_query: None,
        })
        .await
}

/// Which secondaries should be notified after applying a local update,
/// per the zone's `notify_to` configuration.
pub fn notify_targets(entry: &ZoneEntry) -> &[SocketAddr] {
    &entry.config().notify_to
}

/// Arm a freshly loaded secondary zone's first transfer attempt, spread
/// out by [`crate::timers::bootstrap_delay`] so a fleet restart does not
/// open every transfer at once.
///
/// Moves `entry`'s transfer state from `Idle` to `Sched`
/// ([`ZoneEntry::arm_refresh`]) immediately, then schedules
/// [`maybe_transfer`] to run once the jittered delay elapses.
pub fn schedule_bootstrap<S: Scheduler>(
    entry: Arc<ZoneEntry>,
    executor: Arc<dyn TransferExecutor>,
    scheduler: &S,
    rng: &mut impl Rng,
) -> S::Handle {
    let delay = crate::timers::bootstrap_delay(rng);
    entry.arm_refresh();

    let task: BoxFuture<'static, ()> = Box::pin(async move {
        if let Err(e) = maybe_transfer(&entry, executor.as_ref()).await {
            warn!(zone = %entry.name(), error = %e, "bootstrap transfer failed");
        }
    });
    scheduler.schedule(delay, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use domain::base::Class;
    use domain::base::Ttl;

    use crate::contents::ZoneContents;
    use crate::contracts::TimerHandle;
    use crate::rrset::{SoaFields, SoaRecord, StoredName};
    use crate::zone_entry::ZoneConfig;

    struct FixedExecutor(TransferOutcome);

    impl TransferExecutor for FixedExecutor {
        fn transfer(&self, _task: TransferTask) -> BoxFuture<'static, Result<TransferOutcome>> {
            let outcome = self.0;
            Box::pin(async move { Ok(outcome) })
        }
    }

    fn make_entry(dir: &tempfile::TempDir, primary: Option<SocketAddr>) -> Arc<ZoneEntry> {
        let name = StoredName::from_str("example.com.").unwrap();
        let soa = SoaRecord {
            owner: name.clone(),
            class: Class::IN,
            ttl: Ttl::from_secs(3600),
            rdata: SoaFields {
                mname: StoredName::from_str("ns1.example.com.").unwrap(),
                rname: StoredName::from_str("hostmaster.example.com.").unwrap(),
                serial: domain::base::Serial::from(1),
                refresh: 7200,
                retry: 3600,
                expire: 1209600,
                minimum: 3600,
            },
        };
        let journal_path = camino::Utf8Path::from_path(dir.path())
            .unwrap()
            .join("example.com.jnl");
        Arc::new(
            ZoneEntry::with_config(
                name,
                ZoneContents::new(soa, vec![]),
                ZoneConfig {
                    primary,
                    ..ZoneConfig::default()
                },
                &journal_path,
            )
            .unwrap(),
        )
    }

    struct NoopHandle;

    impl TimerHandle for NoopHandle {
        fn cancel(&self) {}
    }

    /// A scheduler that ignores the delay and spawns the task on the
    /// current tokio runtime immediately, for tests that only care that
    /// the task eventually runs.
    struct ImmediateScheduler;

    impl Scheduler for ImmediateScheduler {
        type Handle = NoopHandle;

        fn schedule(&self, _delay: std::time::Duration, task: BoxFuture<'static, ()>) -> NoopHandle {
            tokio::spawn(task);
            NoopHandle
        }
    }

    #[tokio::test]
    async fn transfer_without_primary_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let entry = make_entry(&dir, None);
        let executor = FixedExecutor(TransferOutcome::Updated);
        let err = maybe_transfer(&entry, &executor).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Inval);
    }

    #[tokio::test]
    async fn concurrent_transfer_is_coalesced() {
        let dir = tempfile::tempdir().unwrap();
        let entry = make_entry(&dir, Some("192.0.2.1:53".parse().unwrap()));
        assert!(entry.try_begin_transfer());
        let executor = FixedExecutor(TransferOutcome::Updated);
        let result = maybe_transfer(&entry, &executor).await.unwrap();
        assert!(result.is_none());
        entry.end_transfer();
    }

    #[tokio::test]
    async fn successful_transfer_releases_in_flight_marker() {
        let dir = tempfile::tempdir().unwrap();
        let entry = make_entry(&dir, Some("192.0.2.1:53".parse().unwrap()));
        let executor = FixedExecutor(TransferOutcome::Updated);
        let result = maybe_transfer(&entry, &executor).await.unwrap();
        assert_eq!(result, Some(TransferOutcome::Updated));
        assert!(!entry.is_transfer_in_flight());
    }

    #[tokio::test]
    async fn schedule_bootstrap_arms_refresh_and_eventually_transfers() {
        let dir = tempfile::tempdir().unwrap();
        let entry = make_entry(&dir, Some("192.0.2.1:53".parse().unwrap()));
        let executor: Arc<dyn TransferExecutor> = Arc::new(FixedExecutor(TransferOutcome::Updated));
        let scheduler = ImmediateScheduler;
        let mut rng = rand::thread_rng();

        schedule_bootstrap(entry.clone(), executor, &scheduler, &mut rng);
        assert!(entry.is_refresh_scheduled());

        // Let the immediately-spawned task run.
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!entry.is_transfer_in_flight());
    }
}
