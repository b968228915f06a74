//! Cycle resolution: which model run and lead time represent a valid time.
//!
//! Candidates are tried freshest first, stepping back one hour at a time.
//! The first run whose required lead time fits the forecast horizon wins.
//! When nothing fits, the resolver returns a fixed fallback instead of
//! failing, so callers always get something to fetch.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::time::{LeadTime, ModelRun};

/// Hours subtracted from the target to build the fallback run.
pub const FALLBACK_OFFSET_HOURS: i64 = 2;

/// Lookback and horizon limits for cycle resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CyclePolicy {
    /// Furthest candidate, in hours before the target.
    pub max_lookback_hours: u32,
    /// Longest lead time the model publishes.
    pub max_horizon_hours: u32,
}

impl Default for CyclePolicy {
    fn default() -> Self {
        Self {
            max_lookback_hours: 5,
            max_horizon_hours: 18,
        }
    }
}

/// Outcome of cycle resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub model_run: ModelRun,
    pub lead_time: LeadTime,
    /// True when no candidate satisfied the horizon and the fallback was used.
    pub fallback: bool,
}

/// Resolve a target valid time to a (run, lead time) pair.
pub fn resolve_cycle(target: DateTime<Utc>, policy: &CyclePolicy) -> Resolution {
    for hours_back in 1..=policy.max_lookback_hours as i64 {
        let run = ModelRun::new(target - Duration::hours(hours_back));
        let lead_hours = (target - run.issuance()).num_hours();

        if (0..=policy.max_horizon_hours as i64).contains(&lead_hours) {
            debug!(
                target = %target,
                model_run = %run,
                lead_time = lead_hours,
                "Resolved cycle"
            );
            return Resolution {
                model_run: run,
                lead_time: LeadTime::new(lead_hours as u32),
                fallback: false,
            };
        }
    }

    let run = ModelRun::new(target - Duration::hours(FALLBACK_OFFSET_HOURS));
    debug!(target = %target, model_run = %run, "No candidate within horizon, using fallback");
    Resolution {
        model_run: run,
        lead_time: LeadTime::new(0),
        fallback: true,
    }
}
