//! Built-in tools: mock weather and wall clock
//!
//! Both tools take their notion of "now" from an injectable `Clock`, and the
//! weather tool draws from its own seedable RNG, so outputs are reproducible
//! in tests.

mod clock;
mod weather;

pub use clock::ClockTool;
pub use weather::WeatherTool;

use chrono::{DateTime, FixedOffset, Local, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Convert to the configured local offset, or the host's local zone
fn localize(now: DateTime<Utc>, offset: Option<FixedOffset>) -> DateTime<FixedOffset> {
    match offset {
        Some(offset) => now.with_timezone(&offset),
        None => now.with_timezone(&Local).fixed_offset(),
    }
}
