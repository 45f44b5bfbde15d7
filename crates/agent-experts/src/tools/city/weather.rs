use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CityParameters;
use crate::outcome::ToolOutcome;
use crate::tools::{ToolContext, endpoint, format_number, round_to};

/// Current weather of a city.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeatherReport {
    /// One-sentence summary.
    pub report: String,
    /// Temperature, one decimal place.
    pub temperature_celsius: f64,
    /// Temperature converted from the rounded Celsius value.
    pub temperature_fahrenheit: f64,
    /// Conditions, e.g. "clear sky".
    pub description: String,
    /// Relative humidity in percent.
    pub humidity: u32,
    /// Apparent temperature in Celsius.
    pub feels_like: f64,
}

#[derive(Deserialize)]
struct CurrentWeather {
    weather: Vec<Condition>,
    main: Readings,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

#[derive(Deserialize)]
struct Readings {
    temp: f64,
    feels_like: f64,
    humidity: u32,
}

#[derive(Deserialize)]
struct UpstreamError {
    message: Option<String>,
}

/// Fetches the current weather of `city` from OpenWeatherMap.
pub async fn get_weather(
    ctx: &ToolContext,
    city: &str,
) -> ToolOutcome<WeatherReport> {
    let upstreams = ctx.upstreams();
    let Some(api_key) = upstreams.openweather_api_key.as_deref() else {
        return ToolOutcome::error(
            "Weather API key not configured. Please set OPENWEATHER_API_KEY.",
        );
    };

    let url = endpoint(&upstreams.openweather_base_url, "data/2.5/weather");
    let resp = match ctx
        .client()
        .get(url)
        .query(&[("q", city), ("appid", api_key), ("units", "metric")])
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(err) => {
            return ToolOutcome::error(format!(
                "Failed to retrieve weather data: {err}"
            ));
        }
    };

    let status = resp.status();
    if let Some(err) = resp.error_for_status_ref().err() {
        let body = resp.text().await.unwrap_or_default();
        return ToolOutcome::error(upstream_error_message(
            status,
            &err.to_string(),
            &body,
        ));
    }

    match resp.json::<CurrentWeather>().await {
        Ok(data) => build_report(city, data),
        Err(err) => {
            ToolOutcome::error(format!("Failed to retrieve weather data: {err}"))
        }
    }
}

fn build_report(city: &str, data: CurrentWeather) -> ToolOutcome<WeatherReport> {
    let Some(condition) = data.weather.into_iter().next() else {
        return ToolOutcome::error(format!(
            "Weather data for '{city}' has no conditions."
        ));
    };
    let celsius = round_to(data.main.temp, 1);
    let fahrenheit = round_to(celsius * 9.0 / 5.0 + 32.0, 1);
    let feels_like = round_to(data.main.feels_like, 1);
    let humidity = data.main.humidity;

    let report = format!(
        "The current weather in {city} is {} with a temperature of {}°C ({}°F). \
         It feels like {}°C. Humidity is {humidity}%.",
        condition.description,
        format_number(celsius),
        format_number(fahrenheit),
        format_number(feels_like),
    );
    ToolOutcome::Success(WeatherReport {
        report,
        temperature_celsius: celsius,
        temperature_fahrenheit: fahrenheit,
        description: condition.description,
        humidity,
        feels_like,
    })
}

fn upstream_error_message(status: StatusCode, err: &str, body: &str) -> String {
    let code = status.as_u16();
    let details = serde_json::from_str::<UpstreamError>(body)
        .ok()
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty());
    match details {
        Some(message) => {
            format!("OpenWeatherMap API Error: {message} (Status: {code})")
        }
        None => format!("Failed to retrieve weather data: {err} (Status: {code})"),
    }
}

/// A tool for current weather conditions.
pub struct WeatherTool {
    ctx: ToolContext,
    parameter_schema: Value,
}

impl WeatherTool {
    /// Creates a new weather tool.
    #[inline]
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            parameter_schema: parameter_schema::<CityParameters>(),
        }
    }
}

impl Tool for WeatherTool {
    type Input = CityParameters;

    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Retrieves the current weather report for a specified city: conditions, \
         temperature in Celsius and Fahrenheit, apparent temperature and humidity."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: CityParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let ctx = self.ctx.clone();
        async move { get_weather(&ctx, &input.city).await.into_tool_result() }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Upstreams;

    fn context(server: &MockServer, api_key: Option<&str>) -> ToolContext {
        ToolContext::new(Upstreams {
            openweather_api_key: api_key.map(ToOwned::to_owned),
            openweather_base_url: server.uri(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_weather_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "owm-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "weather": [{ "description": "clear sky" }],
                    "main": { "temp": 18.46, "feels_like": 17.96, "humidity": 65 }
                }),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = get_weather(&context(&server, Some("owm-key")), "London")
            .await;
        let report = outcome.success().unwrap();
        assert_eq!(report.temperature_celsius, 18.5);
        assert_eq!(report.temperature_fahrenheit, 65.3);
        assert_eq!(report.feels_like, 18.0);
        assert_eq!(report.humidity, 65);
        assert_eq!(
            report.report,
            "The current weather in London is clear sky with a temperature of \
             18.5°C (65.3°F). It feels like 18.0°C. Humidity is 65%."
        );
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let server = MockServer::start().await;
        let outcome = get_weather(&context(&server, None), "London").await;
        assert_eq!(
            outcome.error_message(),
            Some("Weather API key not configured. Please set OPENWEATHER_API_KEY.")
        );
    }

    #[tokio::test]
    async fn test_upstream_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                serde_json::json!({ "cod": "404", "message": "city not found" }),
            ))
            .mount(&server)
            .await;

        let outcome =
            get_weather(&context(&server, Some("owm-key")), "Nowhere").await;
        assert_eq!(
            outcome.error_message(),
            Some("OpenWeatherMap API Error: city not found (Status: 404)")
        );
    }

    #[test]
    fn test_upstream_error_without_message() {
        let message = upstream_error_message(
            StatusCode::BAD_GATEWAY,
            "HTTP status server error (502 Bad Gateway)",
            "<html>oops</html>",
        );
        assert_eq!(
            message,
            "Failed to retrieve weather data: HTTP status server error \
             (502 Bad Gateway) (Status: 502)"
        );
    }
}
