//! Weather tool: current conditions from wttr.in (no API key required).

use async_trait::async_trait;
use freeagent_core::error::ToolError;
use freeagent_core::tool::{ParamKind, ParameterSchema, Tool, ToolArguments};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://wttr.in";
const USER_AGENT: &str = "freeagent/0.1";

pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new() -> Self {
        // A builder failure here only drops the custom timeout and user agent
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Point at a different wttr.in-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url_for(&self, location: &str) -> Result<reqwest::Url, ToolError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ToolError::execution(self.name(), format!("bad base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ToolError::execution(self.name(), "base URL cannot take a path"))?
            .pop_if_empty()
            .push(location);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

/// The subset of a wttr.in `j1` report handed to the model.
#[derive(Debug, PartialEq, Serialize)]
pub struct WeatherReport {
    pub location: String,
    pub condition: String,
    pub temp_c: i64,
    pub feels_like_c: i64,
    pub humidity: i64,
    pub wind_kph: i64,
}

/// Extract a report from wttr.in `format=j1` JSON.
///
/// wttr.in encodes numbers as strings; missing fields default to zero.
pub fn parse_report(requested: &str, data: &Value) -> Result<WeatherReport, String> {
    let current = data
        .get("current_condition")
        .and_then(|c| c.get(0))
        .ok_or("response has no current_condition")?;

    let number = |key: &str| -> i64 {
        current
            .get(key)
            .and_then(|v| v.as_str().and_then(|s| s.parse().ok()).or_else(|| v.as_i64()))
            .unwrap_or(0)
    };

    let location = data
        .pointer("/nearest_area/0/areaName/0/value")
        .and_then(Value::as_str)
        .unwrap_or(requested)
        .to_string();

    let condition = current
        .pointer("/weatherDesc/0/value")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(WeatherReport {
        location,
        condition,
        temp_c: number("temp_C"),
        feels_like_c: number("FeelsLikeC"),
        humidity: number("humidity"),
        wind_kph: number("windspeedKmph"),
    })
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Look up current weather conditions for a location. Returns condition, temperature, feels-like, humidity, and wind speed."
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().required(
            "location",
            ParamKind::String,
            "City name or place to look up (e.g. 'Lisbon')",
        )
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<String, ToolError> {
        let location = arguments.str("location")?.trim();
        if location.is_empty() {
            return Err(ToolError::invalid(self.name(), "location", "must not be empty"));
        }

        let response = self
            .client
            .get(self.url_for(location)?)
            .send()
            .await
            .map_err(|e| ToolError::execution(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution(
                self.name(),
                format!("weather service returned {status}"),
            ));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ToolError::execution(self.name(), format!("unreadable response: {e}")))?;

        let report =
            parse_report(location, &data).map_err(|e| ToolError::execution(self.name(), e))?;
        serde_json::to_string_pretty(&report).map_err(|e| ToolError::execution(self.name(), e))
    }
}
