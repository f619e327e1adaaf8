use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::PairKey;

/// Last successful alert time per (target, process) pair.
///
/// Only delivered alerts are recorded, so a failed notification never eats
/// into the cooldown window.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_alert: HashMap<PairKey, DateTime<Utc>>,
}

impl CooldownTracker {
    /// True when the pair never alerted or its last alert is at least
    /// `cooldown` old.
    pub fn should_alert(&self, key: &PairKey, now: DateTime<Utc>, cooldown: Duration) -> bool {
        self.remaining(key, now, cooldown).is_none()
    }

    /// Time left before the pair may alert again, `None` if it may alert now
    pub fn remaining(&self, key: &PairKey, now: DateTime<Utc>, cooldown: Duration) -> Option<Duration> {
        let last = self.last_alert.get(key)?;
        let elapsed = now.signed_duration_since(*last).to_std().unwrap_or(Duration::ZERO);
        cooldown.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    pub fn record_alert(&mut self, key: &PairKey, now: DateTime<Utc>) {
        self.last_alert.insert(key.clone(), now);
    }

    pub fn last_alert(&self, key: &PairKey) -> Option<DateTime<Utc>> {
        self.last_alert.get(key).copied()
    }
}
