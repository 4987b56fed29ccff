//! Mock weather lookup tool.
//!
//! Serves canned observations for a handful of cities. There is no live
//! weather integration behind this.

use async_trait::async_trait;
use serde::Serialize;

use crate::tools::tool::{Tool, ToolError, optional_str, require_str};

struct Observation {
    temp_c: i32,
    condition: &'static str,
    humidity: u32,
    wind_kph: u32,
}

const CITIES: &[(&str, Observation)] = &[
    (
        "san francisco",
        Observation {
            temp_c: 18,
            condition: "Partly Cloudy",
            humidity: 65,
            wind_kph: 15,
        },
    ),
    (
        "london",
        Observation {
            temp_c: 12,
            condition: "Rainy",
            humidity: 80,
            wind_kph: 20,
        },
    ),
    (
        "new york",
        Observation {
            temp_c: 8,
            condition: "Cold and Clear",
            humidity: 45,
            wind_kph: 10,
        },
    ),
    (
        "tokyo",
        Observation {
            temp_c: 15,
            condition: "Sunny",
            humidity: 55,
            wind_kph: 8,
        },
    ),
    (
        "mumbai",
        Observation {
            temp_c: 30,
            condition: "Hot and Humid",
            humidity: 75,
            wind_kph: 12,
        },
    ),
];

static FALLBACK: Observation = Observation {
    temp_c: 20,
    condition: "Unknown",
    humidity: 50,
    wind_kph: 10,
};

#[derive(Debug, Serialize)]
struct WeatherReport {
    location: String,
    temperature: String,
    condition: String,
    humidity: String,
    wind_speed: String,
}

fn lookup(location: &str) -> &'static Observation {
    let lowered = location.to_lowercase();
    let key = lowered.split(',').next().unwrap_or_default().trim();
    CITIES
        .iter()
        .find(|(city, _)| *city == key)
        .map(|(_, obs)| obs)
        .unwrap_or(&FALLBACK)
}

fn render_temperature(temp_c: i32, unit: &str) -> String {
    let label = unit
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_else(|| "C".to_string());

    if unit.eq_ignore_ascii_case("fahrenheit") {
        let f = (temp_c as f64 * 9.0 / 5.0) + 32.0;
        // Converted values are floats and always show a decimal place.
        if f.fract() == 0.0 {
            format!("{:.1}°{}", f, label)
        } else {
            format!("{}°{}", f, label)
        }
    } else {
        format!("{}°{}", temp_c, label)
    }
}

/// Build the weather report for `location` as pretty JSON.
pub fn weather_report(location: &str, unit: &str) -> Result<String, ToolError> {
    let obs = lookup(location);
    let report = WeatherReport {
        location: location.to_string(),
        temperature: render_temperature(obs.temp_c, unit),
        condition: obs.condition.to_string(),
        humidity: format!("{}%", obs.humidity),
        wind_speed: format!("{} km/h", obs.wind_kph),
    };
    serde_json::to_string_pretty(&report).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}

/// Weather tool backed by mock data.
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Gets weather information for a specified location (mock data)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name (e.g., \"San Francisco\", \"London\")"
                },
                "unit": {
                    "type": "string",
                    "enum": ["celsius", "fahrenheit"],
                    "description": "Temperature unit (default: celsius)"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<String, ToolError> {
        let location = require_str(&params, "location")?;
        let unit = optional_str(&params, "unit", "celsius");
        weather_report(location, unit)
    }
}
