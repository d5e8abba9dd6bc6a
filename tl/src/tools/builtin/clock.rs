//! get_current_time tool - current time in an optional IANA timezone

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Clock, SystemClock};
use crate::tools::{Tool, ToolError};

/// RFC 1123 layout with a zone abbreviation, e.g. `Wed, 15 Jan 2025 12:00:00 PST`
const RFC1123: &str = "%a, %d %b %Y %H:%M:%S %Z";

/// What "local time" means for the tool
#[derive(Debug, Clone, Copy)]
enum LocalZone {
    Host,
    Offset(FixedOffset),
    Named(Tz),
}

/// Reports the current time; an unknown or empty timezone falls back to local time
pub struct ClockTool {
    clock: Arc<dyn Clock>,
    local: LocalZone,
}

impl ClockTool {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            local: LocalZone::Host,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use this offset as "local time" instead of the host zone
    pub fn with_local_offset(mut self, offset: FixedOffset) -> Self {
        self.local = LocalZone::Offset(offset);
        self
    }

    /// Use this zone as "local time" instead of the host zone
    pub fn with_local_zone(mut self, zone: Tz) -> Self {
        self.local = LocalZone::Named(zone);
        self
    }

    /// Render `now` in local time
    ///
    /// The host zone is looked up by IANA name so the human-readable form
    /// carries an abbreviation such as `CET`; a bare offset is the fallback.
    fn render_local(&self, now: DateTime<Utc>) -> (String, String) {
        match self.local {
            LocalZone::Offset(offset) => render(now.with_timezone(&offset)),
            LocalZone::Named(zone) => render(now.with_timezone(&zone)),
            LocalZone::Host => match host_zone() {
                Some(zone) => render(now.with_timezone(&zone)),
                None => render(now.with_timezone(&Local)),
            },
        }
    }
}

/// IANA zone of the host, if it can be determined and is known to chrono-tz
fn host_zone() -> Option<Tz> {
    let name = iana_time_zone::get_timezone().ok()?;
    match name.parse::<Tz>() {
        Ok(zone) => Some(zone),
        Err(_) => {
            debug!(%name, "host_zone: unrecognized host timezone");
            None
        }
    }
}

impl Default for ClockTool {
    fn default() -> Self {
        Self::new()
    }
}

fn render<Z: TimeZone>(now: DateTime<Z>) -> (String, String)
where
    Z::Offset: std::fmt::Display,
{
    (
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
        now.format(RFC1123).to_string(),
    )
}

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current time. Optionally specify an IANA timezone like America/Los_Angeles."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "description": "Optional IANA timezone. Defaults to local time."
                }
            }
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let timezone = args["timezone"].as_str().unwrap_or_default().to_string();
        let now = self.clock.now();

        let (timestamp, human_time) = match timezone.trim() {
            "" => self.render_local(now),
            name => match name.parse::<Tz>() {
                Ok(tz) => render(now.with_timezone(&tz)),
                Err(_) => {
                    warn!(%timezone, "ClockTool::call: unknown timezone, using local time");
                    self.render_local(now)
                }
            },
        };
        debug!(%timezone, %timestamp, "ClockTool::call: resolved time");

        Ok(serde_json::json!({
            "timezone": timezone,
            "timestamp": timestamp,
            "human_time": human_time,
        }))
    }
}
