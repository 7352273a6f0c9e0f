//! REFRESH/RETRY/EXPIRE timer bindings: this module only computes
//! *when*; [`crate::contracts::Scheduler`] owns the actual event loop.
//!
//! Jitter follows `cascade::loader::zone`'s `RefreshTimerState`: every
//! computed delay is perturbed by up to [`crate::config::JITTER_PCT`]
//! percent so that a fleet of secondaries with identical SOA timers
//! does not refresh in lockstep.

use std::time::Duration;

use rand::Rng;

use crate::config::JITTER_PCT;
use crate::rrset::SoaRecord;

/// What the timer layer should do next for a zone, computed from its
/// current SOA and how long ago the zone's contents were last confirmed
/// fresh (via a successful transfer, or the zone's own load time).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerAction {
    /// Contents are still within REFRESH; wait `Duration` and check again.
    WaitForRefresh(Duration),
    /// REFRESH has elapsed since the last successful check; attempt a
    /// transfer now.
    Refresh,
    /// The most recent transfer attempt failed; wait `Duration` (the
    /// jittered RETRY interval) before trying again.
    WaitForRetry(Duration),
    /// EXPIRE has elapsed since the last successful check with no
    /// successful transfer since: the zone's contents must be taken
    /// offline.
    Expired,
}

/// Shrink `base` by a factor of `(100 - rand[0, JITTER_PCT]) / 100`, using
/// `rng`.
///
/// The factor is always `<= 1`: jitter only ever pulls a REFRESH/RETRY
/// interval earlier, never later, so a fleet of secondaries spreads its
/// refresh attempts out instead of occasionally synchronizing on an
/// unlucky draw that lengthens one of them past its peers.
pub fn jittered(base: Duration, rng: &mut impl Rng) -> Duration {
    if base.is_zero() {
        return base;
    }
    let drop_pct = rng.gen_range(0..=JITTER_PCT) as u64;
    let millis = (base.as_millis() as u64 * (100 - drop_pct)) / 100;
    Duration::from_millis(millis)
}

/// Decide the next timer action for a secondary zone, given its current
/// SOA, how many seconds have passed since the last successful check,
/// and whether the most recent transfer attempt (if any, since the last
/// success) failed.
pub fn next_action(
    soa: &SoaRecord,
    secs_since_last_success: u64,
    last_attempt_failed: bool,
    rng: &mut impl Rng,
) -> TimerAction {
    let refresh = soa.rdata.refresh as u64;
    let retry = soa.rdata.retry as u64;
    let expire = soa.rdata.expire as u64;

    if secs_since_last_success >= expire {
        return TimerAction::Expired;
    }

    if last_attempt_failed {
        return TimerAction::WaitForRetry(jittered(Duration::from_secs(retry), rng));
    }

    if secs_since_last_success >= refresh {
        return TimerAction::Refresh;
    }

    let remaining = refresh - secs_since_last_success;
    TimerAction::WaitForRefresh(jittered(Duration::from_secs(remaining), rng))
}

/// The delay before a freshly loaded secondary zone's first transfer
/// attempt, spread out across a fleet restart.
pub fn bootstrap_delay(rng: &mut impl Rng) -> Duration {
    jittered(
        Duration::from_millis(crate::config::BOOTSTRAP_DELAY_MS),
        rng,
    )
}
