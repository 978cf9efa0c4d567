// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Source of the current time.
///
/// Every age computation in the monitor ("completed more than N minutes
/// ago", "started before the timeout threshold") goes through this trait so
/// the reconcilers can be driven with a fixed clock in tests.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;

	/// The instant `age` before [`Clock::now`]. Ages too large to subtract
	/// saturate to the earliest representable instant, so an oversized
	/// configured duration means "everything qualifies" instead of a panic.
	fn before(&self, age: Duration) -> DateTime<Utc> {
		ChronoDuration::from_std(age)
			.ok()
			.and_then(|age| self.now().checked_sub_signed(age))
			.unwrap_or(DateTime::<Utc>::MIN_UTC)
	}
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// A clock that returns preset instants, for use in tests.
#[derive(Debug)]
pub struct FixedClock {
	now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
	pub fn new(now: DateTime<Utc>) -> Self {
		Self { now: Mutex::new(now) }
	}

	/// Move the clock to a new instant.
	pub fn set(&self, now: DateTime<Utc>) {
		*self.now.lock().unwrap() = now;
	}

	/// Advance the clock by the given amount.
	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().unwrap();
		*now = *now + ChronoDuration::from_std(by).unwrap_or(ChronoDuration::MAX);
	}
}

impl Clock for FixedClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().unwrap()
	}
}
