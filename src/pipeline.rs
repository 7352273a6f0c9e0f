//! The update pipeline: the single path every changeset — DDNS,
//! IXFR, or DNSSEC re-signing — takes to become a zone's new contents.
//!
//! Sequence, matching the historical `xfrin_apply_changesets` /
//! `xfrin_switch_zone` / `xfrin_cleanup_successful_update` /
//! `xfrin_rollback_update`:
//!
//! 1. Apply the changeset to the current [`ZoneContents`] snapshot
//!    in-memory (never mutating the live snapshot directly).
//! 2. Append the changeset to the journal inside a transaction.
//! 3. Commit the journal transaction.
//! 4. Swap the new contents in as the zone's live snapshot.
//!
//! The journal commit (step 3) must
//! happen *before* the snapshot swap (step 4): a crash between them
//! loses nothing (the journal is replayed on restart), whereas a crash
//! the other way around would serve contents the journal cannot
//! reconstruct. If the swap itself fails — which in this design it
//! cannot, since [`crate::zonedb::ZoneDb`]'s swap is infallible — that
//! would be a fatal, unrecoverable error rather than something to roll
//! back from, since the journal has already committed.

use std::sync::Arc;

use tracing::{error, info};

use crate::changeset::Changeset;
use crate::error::Result;
use crate::zone_entry::ZoneEntry;

/// Apply `changeset` to `entry`, running it through the full pipeline.
///
/// On success, `entry`'s live contents reflect the changeset and its
/// journal has a durable record of it. On failure, `entry` is left
/// exactly as it was: the in-memory apply step never touches the live
/// snapshot, and a failed journal transaction is rolled back before this
/// function returns.
pub fn apply(entry: &Arc<ZoneEntry>, changeset: Changeset) -> Result<()> {
    let current = entry.contents();
    let next = match current.apply(&changeset) {
        Ok(next) => next,
        Err(e) => {
            info!(zone = %entry.name(), error = %e, "changeset rejected before journal append");
            return Err(e);
        }
    };
    drop(current);

    let mut journal = entry.journal();
    if let Err(e) = journal.trans_begin(&changeset) {
        return Err(e);
    }
    if let Err(e) = journal.trans_commit() {
        // The transaction could not be committed; roll it back so the
        // journal is left exactly as it was before this call.
        if let Err(rollback_err) = journal.trans_rollback() {
            error!(
                zone = %entry.name(),
                error = %rollback_err,
                "failed to roll back journal transaction after a failed commit",
            );
        }
        return Err(e);
    }
    drop(journal);

    // The journal has committed durably; the swap below cannot
    // meaningfully fail (it is a single atomic pointer store), so there
    // is nothing left to roll back from this point on.
    entry.swap_contents(next);
    info!(
        zone = %entry.name(),
        serial_from = %changeset.serial_from(),
        serial_to = %changeset.serial_to(),
        "applied changeset",
    );
    Ok(())
}

/// Apply a chain of changesets in order, stopping at the first failure.
///
/// Used when [`crate::journal::Journal::walk`] or an IXFR response
/// yields more than one changeset to bring a zone up to date.
pub fn apply_chain(entry: &Arc<ZoneEntry>, changesets: Vec<Changeset>) -> Result<()> {
    for changeset in changesets {
        apply(entry, changeset)?;
    }
    Ok(())
}

/// Apply the "effective" changeset for one update cycle: `primary` (e.g.
/// a DDNS update already validated against prerequisites) merged with
/// `secondary` (e.g. the DNSSEC re-sign it immediately provokes), as a
/// single [`apply`] call — one journal transaction, one contents apply,
/// one atomic swap, one commit.
///
/// This matters beyond bookkeeping: without it, a crash between the two
/// separate `apply` calls a naive implementation would otherwise make
/// could leave the zone served with DDNS-updated but not yet
/// DNSSEC-signed contents, a state no external observer should ever be
/// able to witness. Merging first and applying once makes that window
/// impossible rather than merely short.
///
/// If only one of `primary`/`secondary` is `Some`, that changeset alone
/// is applied. If neither is, this is a no-op.
pub fn apply_effective(
    entry: &Arc<ZoneEntry>,
    primary: Option<Changeset>,
    secondary: Option<Changeset>,
) -> Result<()> {
    let effective = match (primary, secondary) {
        (Some(p), Some(s)) => Some(p.merge(s)?),
        (Some(p), None) => Some(p),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    };
    match effective {
        Some(changeset) => apply(entry, changeset),
        None => Ok(()),
    }
}
