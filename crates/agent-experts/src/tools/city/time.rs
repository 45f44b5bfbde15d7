use std::future::ready;

use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use chrono::{DateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CityParameters;
use super::timezones::resolve_timezone;
use crate::outcome::ToolOutcome;
use crate::tools::title_case;

const REPORT_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Local time of a city.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentTime {
    /// One-sentence summary.
    pub report: String,
    /// IANA timezone name.
    pub timezone: String,
    /// RFC 3339 timestamp with the local offset.
    pub datetime: String,
}

/// A time expressed in two cities.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeConversion {
    /// Two lines, one per city.
    pub report: String,
    /// RFC 3339 timestamp in the source timezone.
    pub source_time: String,
    /// RFC 3339 timestamp in the destination timezone.
    pub destination_time: String,
    /// IANA timezone of the source city.
    pub source_timezone: String,
    /// IANA timezone of the destination city.
    pub destination_timezone: String,
}

fn city_tz(city: &str) -> Option<(&'static str, Tz)> {
    let name = resolve_timezone(city)?;
    let tz = name.parse::<Tz>().ok()?;
    Some((name, tz))
}

fn iso(dt: &DateTime<Tz>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Returns the current local time of `city`.
pub fn get_current_time(city: &str) -> ToolOutcome<CurrentTime> {
    current_time_at(city, Utc::now())
}

fn current_time_at(city: &str, now: DateTime<Utc>) -> ToolOutcome<CurrentTime> {
    let Some((tz_name, tz)) = city_tz(city) else {
        return ToolOutcome::error(format!(
            "Timezone not found for city '{city}'. Please use a major city name."
        ));
    };
    let local = now.with_timezone(&tz);
    ToolOutcome::Success(CurrentTime {
        report: format!(
            "The current time in {} is {}",
            title_case(city),
            local.format(REPORT_FORMAT)
        ),
        timezone: tz_name.to_owned(),
        datetime: iso(&local),
    })
}

/// Converts a time of day in `source_city` to `destination_city`.
///
/// `time` is `HH:MM` (24-hour) on today's date in the source city. Without
/// it, the current time is converted.
pub fn convert_time_between_cities(
    source_city: &str,
    destination_city: &str,
    time: Option<&str>,
) -> ToolOutcome<TimeConversion> {
    convert_time_at(source_city, destination_city, time, Utc::now())
}

fn convert_time_at(
    source_city: &str,
    destination_city: &str,
    time: Option<&str>,
    now: DateTime<Utc>,
) -> ToolOutcome<TimeConversion> {
    let Some((source_tz_name, source_tz)) = city_tz(source_city) else {
        return ToolOutcome::error(format!(
            "Could not determine timezone for source city '{source_city}'."
        ));
    };
    let Some((dest_tz_name, dest_tz)) = city_tz(destination_city) else {
        return ToolOutcome::error(format!(
            "Could not determine timezone for destination city '{destination_city}'."
        ));
    };

    let source_now = now.with_timezone(&source_tz);
    let source_time = match time.map(str::trim).filter(|t| !t.is_empty()) {
        None => source_now,
        Some(text) => {
            let Ok(time_of_day) = NaiveTime::parse_from_str(text, "%H:%M")
            else {
                return ToolOutcome::error(format!(
                    "Invalid time format '{text}'. Please use HH:MM (24-hour)."
                ));
            };
            let date = source_now.date_naive();
            let local = date.and_time(time_of_day);
            // Ambiguous local times (clocks going back) take the earlier
            // instant. Skipped ones (clocks going forward) don't exist.
            let Some(dt) = source_tz.from_local_datetime(&local).earliest()
            else {
                return ToolOutcome::error(format!(
                    "The time {text} does not exist in {source_tz_name} on {date}."
                ));
            };
            dt
        }
    };
    let dest_time = source_time.with_timezone(&dest_tz);

    let report = format!(
        "Time in {source_city} ({source_tz_name}): {}\nTime in {destination_city} ({dest_tz_name}): {}",
        source_time.format(REPORT_FORMAT),
        dest_time.format(REPORT_FORMAT),
    );
    ToolOutcome::Success(TimeConversion {
        report,
        source_time: iso(&source_time),
        destination_time: iso(&dest_time),
        source_timezone: source_tz_name.to_owned(),
        destination_timezone: dest_tz_name.to_owned(),
    })
}

/// A tool for the current local time of a city.
pub struct CurrentTimeTool {
    parameter_schema: Value,
}

impl CurrentTimeTool {
    /// Creates a new current time tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: parameter_schema::<CityParameters>(),
        }
    }
}

impl Default for CurrentTimeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CurrentTimeTool {
    type Input = CityParameters;

    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Returns the current local time in a major city."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: CityParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(get_current_time(&input.city).into_tool_result())
    }
}

/// Parameters of [`ConvertTimeTool`].
#[derive(Deserialize, JsonSchema)]
pub struct ConvertTimeParameters {
    #[schemars(description = "City the time is given in.")]
    source_city: String,
    #[schemars(description = "City to convert the time to.")]
    destination_city: String,
    #[schemars(
        description = "Time of day in the source city as HH:MM (24-hour). Omit to convert the current time."
    )]
    time: Option<String>,
}

/// A tool converting a time of day between two cities.
pub struct ConvertTimeTool {
    parameter_schema: Value,
}

impl ConvertTimeTool {
    /// Creates a new time conversion tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: parameter_schema::<ConvertTimeParameters>(),
        }
    }
}

impl Default for ConvertTimeTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ConvertTimeTool {
    type Input = ConvertTimeParameters;

    fn name(&self) -> &str {
        "convert_time_between_cities"
    }

    fn description(&self) -> &str {
        "Converts a time of day (HH:MM, 24-hour) from one city to another. \
         Without a time, converts the current time."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: ConvertTimeParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let outcome = convert_time_between_cities(
            &input.source_city,
            &input.destination_city,
            input.time.as_deref(),
        );
        ready(outcome.into_tool_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_current_time() {
        let outcome = current_time_at("tokyo", fixed_now());
        let time = outcome.success().unwrap();
        assert_eq!(time.timezone, "Asia/Tokyo");
        assert_eq!(time.report, "The current time in Tokyo is 2024-01-15 21:00:00 JST");
        assert_eq!(time.datetime, "2024-01-15T21:00:00+09:00");
    }

    #[test]
    fn test_current_time_unknown_city() {
        let outcome = current_time_at("Atlantis", fixed_now());
        assert_eq!(
            outcome.error_message(),
            Some("Timezone not found for city 'Atlantis'. Please use a major city name.")
        );
    }

    #[test]
    fn test_convert_given_time() {
        let outcome =
            convert_time_at("New York", "London", Some("09:30"), fixed_now());
        let conversion = outcome.success().unwrap();
        assert_eq!(conversion.source_timezone, "America/New_York");
        assert_eq!(conversion.destination_timezone, "Europe/London");
        assert_eq!(conversion.source_time, "2024-01-15T09:30:00-05:00");
        assert_eq!(conversion.destination_time, "2024-01-15T14:30:00+00:00");
        assert_eq!(
            conversion.report,
            "Time in New York (America/New_York): 2024-01-15 09:30:00 EST\n\
             Time in London (Europe/London): 2024-01-15 14:30:00 GMT"
        );
    }

    #[test]
    fn test_convert_current_time() {
        let outcome = convert_time_at("london", "tokyo", None, fixed_now());
        let conversion = outcome.success().unwrap();
        assert_eq!(conversion.source_time, "2024-01-15T12:00:00+00:00");
        assert_eq!(conversion.destination_time, "2024-01-15T21:00:00+09:00");
    }

    #[test]
    fn test_convert_errors() {
        let now = fixed_now();
        assert_eq!(
            convert_time_at("Atlantis", "London", None, now).error_message(),
            Some("Could not determine timezone for source city 'Atlantis'.")
        );
        assert_eq!(
            convert_time_at("London", "Atlantis", None, now).error_message(),
            Some("Could not determine timezone for destination city 'Atlantis'.")
        );
        assert!(
            convert_time_at("London", "Paris", Some("25:99"), now).is_error()
        );
    }

    #[test]
    fn test_convert_nonexistent_local_time() {
        // Clocks in New York jumped from 02:00 to 03:00 on 2024-03-10.
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let outcome = convert_time_at("New York", "London", Some("02:30"), now);
        assert_eq!(
            outcome.error_message(),
            Some("The time 02:30 does not exist in America/New_York on 2024-03-10.")
        );
    }
}
