//! Simulation-horizon derivation.
//!
//! The natural horizon of a periodic task set is the least common multiple of
//! its periods. Aperiodic arrivals can land past that point, so the horizon is
//! extended by whole hyperperiod multiples until every aperiodic task has room
//! to arrive, execute, and drain through background service. Both the LCM fold
//! and the extension are capped at [`SAFETY_LIMIT`]; a capped run proceeds
//! truncated.

use crate::task::Task;
use std::sync::Arc;
use tracing::warn;

/// Hard cap on the simulation horizon, in ticks.
pub const SAFETY_LIMIT: u64 = 10_000;

/// Trailing room granted to aperiodic work beyond its release and wcet.
pub const BUFFER: u64 = 200;

pub(crate) fn gcd(a: u64, b: u64) -> u64 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

pub(crate) fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b)) * b
}

/// Compute the simulation horizon for a task set.
///
/// Folds the LCM over the periodic periods, capping as soon as it overruns
/// [`SAFETY_LIMIT`]. If any aperiodic task needs more room than that, the
/// horizon grows by whole multiples of its pre-extension value until
/// `release + wcet + BUFFER` fits for every aperiodic task, re-capping at the
/// limit. The extension can overshoot the exact need by up to one multiple;
/// that slack is harmless.
pub fn horizon(periodic: &[Arc<Task>], aperiodic: &[Arc<Task>]) -> u64 {
    let mut h: u64 = 1;
    for task in periodic {
        if task.period > 0 {
            h = lcm(h, task.period);
            if h > SAFETY_LIMIT {
                warn!(limit = SAFETY_LIMIT, "hyperperiod exceeds safety limit, truncating run");
                h = SAFETY_LIMIT;
                break;
            }
        }
    }

    let needed = aperiodic
        .iter()
        .map(|task| task.release + task.wcet + BUFFER)
        .max()
        .unwrap_or(0);
    if h < needed {
        let step = h;
        let mut extended = h;
        while extended < needed && extended < SAFETY_LIMIT {
            extended += step;
        }
        h = extended;
    }

    if h > SAFETY_LIMIT {
        warn!(limit = SAFETY_LIMIT, "extended horizon exceeds safety limit, truncating run");
        h = SAFETY_LIMIT;
    }
    h
}
