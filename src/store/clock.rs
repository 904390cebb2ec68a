//! Injectable time source for the cache store.

use chrono::{DateTime, Utc};

/// Time source used for staleness and expiry arithmetic.
///
/// The store takes this as a trait object so tests can drive time by hand
/// instead of sleeping.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Manually advanced clock for tests.
#[cfg(test)]
pub struct ManualClock {
  now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self {
      now: std::sync::Mutex::new(start),
    }
  }

  pub fn advance(&self, by: chrono::Duration) {
    let mut now = self.now.lock().unwrap();
    *now += by;
  }
}

#[cfg(test)]
impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}
