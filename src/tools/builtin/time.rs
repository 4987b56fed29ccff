//! Clock tool.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::tools::tool::{Tool, ToolError, optional_str};

#[derive(Debug, Serialize)]
struct ClockReading {
    date: String,
    time: String,
    day_of_week: String,
    timezone: String,
    timestamp: f64,
    iso_format: String,
}

/// Describe `now` as pretty JSON.
///
/// `timezone` is echoed back as a label only. The reading is always taken
/// in the host's local time.
fn describe(now: DateTime<Local>, timezone: &str) -> Result<String, ToolError> {
    let reading = ClockReading {
        date: now.format("%Y-%m-%d").to_string(),
        time: now.format("%H:%M:%S").to_string(),
        day_of_week: now.format("%A").to_string(),
        timezone: timezone.to_string(),
        timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
        iso_format: now.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    };
    serde_json::to_string_pretty(&reading).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

/// Tool returning the current date and time.
pub struct TimeTool;

#[async_trait]
impl Tool for TimeTool {
    fn name(&self) -> &str {
        "get_current_datetime"
    }

    fn description(&self) -> &str {
        "Returns the current date and time information."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "timezone": {
                    "type": "string",
                    "description": "Timezone name (default is UTC)"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError> {
        let timezone = optional_str(&params, "timezone", "UTC");
        describe(Local::now(), timezone)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_describe_fixed_instant() {
        let now = Local.with_ymd_and_hms(2024, 3, 15, 9, 5, 7).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&describe(now, "America/New_York").unwrap()).unwrap();

        assert_eq!(json["date"], "2024-03-15");
        assert_eq!(json["time"], "09:05:07");
        assert_eq!(json["day_of_week"], "Friday");
        assert_eq!(json["iso_format"], "2024-03-15T09:05:07.000000");
        assert_eq!(json["timestamp"].as_f64().unwrap(), now.timestamp() as f64);
    }

    #[tokio::test]
    async fn test_timezone_label_is_echoed() {
        let out = TimeTool
            .execute(serde_json::json!({"timezone": "Asia/Tokyo"}))
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["timezone"], "Asia/Tokyo");

        let out = TimeTool.execute(serde_json::json!({})).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["timezone"], "UTC");
    }
}
