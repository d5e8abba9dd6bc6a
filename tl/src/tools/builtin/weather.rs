//! get_weather tool - mock weather report for a city

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{FixedOffset, SecondsFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::debug;

use super::{Clock, SystemClock, localize};
use crate::tools::{Tool, ToolError};

const CONDITIONS: [&str; 4] = ["rain", "sunny", "cloudy", "windy"];

/// Returns a randomized weather report; no network access
pub struct WeatherTool {
    rng: Mutex<StdRng>,
    clock: Arc<dyn Clock>,
    local_offset: Option<FixedOffset>,
}

impl WeatherTool {
    /// Create with an OS-seeded RNG
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Create with a fixed seed for reproducible reports
    pub fn seeded(seed: u64) -> Self {
        debug!(seed, "WeatherTool::seeded: called");
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            clock: Arc::new(SystemClock),
            local_offset: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Render `updated_at` at this offset instead of the host zone
    pub fn with_local_offset(mut self, offset: FixedOffset) -> Self {
        self.local_offset = Some(offset);
        self
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather for a city."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "City name, e.g. Seattle"
                }
            },
            "required": ["city"]
        })
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let city = match args["city"].as_str().map(str::trim) {
            Some(city) if !city.is_empty() => city.to_string(),
            _ => {
                debug!("WeatherTool::call: no usable city, defaulting to unknown");
                "unknown".to_string()
            }
        };

        let (temp_c, condition, umbrella) = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| ToolError::Execution("weather generator unavailable".to_string()))?;
            let temp_c: i64 = rng.random_range(5..=29);
            let condition = CONDITIONS[rng.random_range(0..CONDITIONS.len())];
            let umbrella = rng.random_bool(0.5);
            (temp_c, condition, umbrella)
        };

        let updated_at = localize(self.clock.now(), self.local_offset).to_rfc3339_opts(SecondsFormat::Secs, true);
        debug!(%city, temp_c, %condition, "WeatherTool::call: generated report");

        Ok(serde_json::json!({
            "city": city,
            "temp_c": temp_c,
            "condition": condition,
            "umbrella": umbrella,
            "updated_at": updated_at,
        }))
    }
}
