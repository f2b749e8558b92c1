//! Admission control: sliding-window quotas checked before any stateful work.
//!
//! Counters are process-local and reset on restart. They are a throttle, not
//! the source of truth for the one-vote rule (that is `has_voted` in the
//! credential store). A multi-instance deployment would implement
//! [`AdmissionControl`] over a shared counter store instead.

use std::{
  collections::VecDeque,
  fmt,
  time::{Duration, Instant},
};

use dashmap::DashMap;
use strum::Display;

// ─── Quotas ──────────────────────────────────────────────────────────────────

/// A route subject to admission control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Route {
  /// Keyed by origin address.
  Register,
  /// Keyed by origin address.
  Login,
  /// Keyed by voter id.
  Vote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
  pub limit:  u32,
  pub window: Duration,
}

impl Quota {
  pub const fn per_hour(limit: u32) -> Self {
    Self { limit, window: Duration::from_secs(60 * 60) }
  }

  pub const fn per_day(limit: u32) -> Self {
    Self { limit, window: Duration::from_secs(24 * 60 * 60) }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct Quotas {
  pub register: Quota,
  pub login:    Quota,
  pub vote:     Quota,
}

impl Default for Quotas {
  fn default() -> Self {
    Self {
      register: Quota::per_hour(5),
      login:    Quota::per_hour(10),
      vote:     Quota::per_day(5),
    }
  }
}

impl Quotas {
  pub fn for_route(&self, route: Route) -> Quota {
    match route {
      Route::Register => self.register,
      Route::Login => self.login,
      Route::Vote => self.vote,
    }
  }
}

// ─── Rejection ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RateLimited {
  pub route:       Route,
  pub quota:       Quota,
  /// Time until the oldest counted attempt leaves the window.
  pub retry_after: Duration,
}

impl fmt::Display for RateLimited {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "rate limit exceeded for {}: {} per {}",
      self.route,
      self.quota.limit,
      describe(self.quota.window)
    )
  }
}

impl std::error::Error for RateLimited {}

impl RateLimited {
  /// e.g. `"Try again in 42 minutes"`.
  pub fn retry_hint(&self) -> String { format!("Try again in {}", describe(self.retry_after)) }

  /// `retry_after` in whole seconds, rounded up and never zero.
  pub fn retry_after_secs(&self) -> u64 { ceil_secs(self.retry_after) }
}

fn ceil_secs(d: Duration) -> u64 { (d.as_secs() + u64::from(d.subsec_nanos() > 0)).max(1) }

/// Render a duration coarsely, rounding up to the unit shown.
fn describe(d: Duration) -> String {
  let secs = ceil_secs(d);
  let (n, unit) = match secs {
    0..60 => (secs, "second"),
    60..3600 => (secs.div_ceil(60), "minute"),
    _ => (secs.div_ceil(3600), "hour"),
  };
  if n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Check-and-increment admission counters.
pub trait AdmissionControl: Send + Sync {
  /// Count one attempt for `(route, key)`, or reject it without counting if
  /// the quota is already used up.
  fn check_and_increment(&self, route: Route, key: &str) -> Result<(), RateLimited>;
}

// ─── In-memory implementation ────────────────────────────────────────────────

/// Sliding-window counters in a concurrent map.
///
/// Each key holds the instants of its admitted attempts still inside the
/// window; the shard lock held by `DashMap::entry` makes check-and-increment
/// atomic per key.
pub struct MemoryAdmission {
  quotas:  Quotas,
  windows: DashMap<(Route, String), VecDeque<Instant>>,
}

impl MemoryAdmission {
  pub fn new(quotas: Quotas) -> Self { Self { quotas, windows: DashMap::new() } }

  pub fn quotas(&self) -> &Quotas { &self.quotas }

  pub fn check_and_increment_at(
    &self,
    route: Route,
    key: &str,
    now: Instant,
  ) -> Result<(), RateLimited> {
    let quota = self.quotas.for_route(route);
    let mut hits = self.windows.entry((route, key.to_owned())).or_default();

    while hits
      .front()
      .is_some_and(|t| now.duration_since(*t) >= quota.window)
    {
      hits.pop_front();
    }

    if hits.len() >= quota.limit as usize {
      let retry_after = hits
        .front()
        .map_or(quota.window, |t| quota.window.saturating_sub(now.duration_since(*t)));
      return Err(RateLimited { route, quota, retry_after });
    }

    hits.push_back(now);
    Ok(())
  }

  /// Drop every key whose attempts have all left their window.
  pub fn evict_expired(&self, now: Instant) {
    self.windows.retain(|(route, _), hits| {
      let window = self.quotas.for_route(*route).window;
      hits.back().is_some_and(|t| now.duration_since(*t) < window)
    });
  }

  /// Number of keys currently holding counters.
  pub fn tracked_keys(&self) -> usize { self.windows.len() }
}

impl Default for MemoryAdmission {
  fn default() -> Self { Self::new(Quotas::default()) }
}

impl AdmissionControl for MemoryAdmission {
  fn check_and_increment(&self, route: Route, key: &str) -> Result<(), RateLimited> {
    let result = self.check_and_increment_at(route, key, Instant::now());
    if let Err(e) = &result {
      tracing::info!(%route, key, retry_after_s = e.retry_after.as_secs(), "admission rejected");
    }
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const HOUR: Duration = Duration::from_secs(3600);

  fn admission() -> MemoryAdmission { MemoryAdmission::default() }

  #[test]
  fn nth_plus_one_registration_is_rejected() {
    let a   = admission();
    let now = Instant::now();
    for i in 0..5 {
      assert!(a.check_and_increment_at(Route::Register, "10.0.0.1", now).is_ok(), "attempt {i}");
    }
    let err = a.check_and_increment_at(Route::Register, "10.0.0.1", now).unwrap_err();
    assert_eq!(err.route, Route::Register);
    assert_eq!(err.retry_after, HOUR);
    assert_eq!(err.retry_hint(), "Try again in 1 hour");
  }

  #[test]
  fn quotas_are_per_key_and_per_route() {
    let a   = admission();
    let now = Instant::now();
    for _ in 0..5 {
      a.check_and_increment_at(Route::Register, "10.0.0.1", now).unwrap();
    }
    assert!(a.check_and_increment_at(Route::Register, "10.0.0.2", now).is_ok());
    assert!(a.check_and_increment_at(Route::Login, "10.0.0.1", now).is_ok());
  }

  #[test]
  fn window_slides() {
    let a  = admission();
    let t0 = Instant::now();
    for i in 0..10 {
      a.check_and_increment_at(Route::Login, "ip", t0 + Duration::from_secs(i * 60)).unwrap();
    }

    let later = t0 + Duration::from_secs(30 * 60);
    let err   = a.check_and_increment_at(Route::Login, "ip", later).unwrap_err();
    assert_eq!(err.retry_after, Duration::from_secs(30 * 60));
    assert_eq!(err.retry_hint(), "Try again in 30 minutes");

    // The first attempt leaves the window exactly one hour after it was made.
    assert!(a.check_and_increment_at(Route::Login, "ip", t0 + HOUR).is_ok());
    assert!(a.check_and_increment_at(Route::Login, "ip", t0 + HOUR).is_err());
  }

  #[test]
  fn rejected_attempts_are_not_counted() {
    let a  = MemoryAdmission::new(Quotas { vote: Quota::per_day(1), ..Quotas::default() });
    let t0 = Instant::now();
    a.check_and_increment_at(Route::Vote, "7", t0).unwrap();
    for _ in 0..3 {
      assert!(a.check_and_increment_at(Route::Vote, "7", t0).is_err());
    }
    let day = Duration::from_secs(24 * 3600);
    assert!(a.check_and_increment_at(Route::Vote, "7", t0 + day).is_ok());
  }

  #[test]
  fn eviction_drops_idle_keys_only() {
    let a  = admission();
    let t0 = Instant::now();
    a.check_and_increment_at(Route::Register, "old", t0).unwrap();
    a.check_and_increment_at(Route::Register, "fresh", t0 + HOUR).unwrap();
    assert_eq!(a.tracked_keys(), 2);

    a.evict_expired(t0 + HOUR + Duration::from_secs(1));
    assert_eq!(a.tracked_keys(), 1);
  }

  #[test]
  fn retry_seconds_round_up_like_the_hint() {
    let limited = |retry_after| RateLimited {
      route:       Route::Login,
      quota:       Quota::per_hour(10),
      retry_after,
    };
    let r = limited(Duration::from_millis(1500));
    assert_eq!(r.retry_after_secs(), 2);
    assert_eq!(r.retry_hint(), "Try again in 2 seconds");
    assert_eq!(limited(Duration::from_millis(300)).retry_after_secs(), 1);
    assert_eq!(limited(Duration::from_secs(120)).retry_after_secs(), 120);
  }

  #[test]
  fn durations_are_described_coarsely() {
    assert_eq!(describe(Duration::from_secs(1)), "1 second");
    assert_eq!(describe(Duration::from_millis(1500)), "2 seconds");
    assert_eq!(describe(Duration::from_secs(61)), "2 minutes");
    assert_eq!(describe(Duration::from_secs(24 * 3600)), "24 hours");
  }

  #[test]
  fn error_message_names_route_and_quota() {
    let a   = admission();
    let now = Instant::now();
    for _ in 0..5 {
      a.check_and_increment_at(Route::Register, "x", now).unwrap();
    }
    let err = a.check_and_increment_at(Route::Register, "x", now).unwrap_err();
    assert_eq!(err.to_string(), "rate limit exceeded for register: 5 per 1 hour");
  }
}
