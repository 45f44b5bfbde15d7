use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CityParameters;
use crate::outcome::ToolOutcome;
use crate::tools::{ToolContext, endpoint};

const USER_AGENT: &str = "agent-dev-project";

/// Geographic position of a city.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Coordinates {
    /// The city as requested.
    pub city: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Full address of the match.
    pub address: String,
}

#[derive(Deserialize)]
struct Place {
    lat: String,
    lon: String,
    display_name: String,
}

/// Geocodes `city` with Nominatim (OpenStreetMap).
pub async fn get_coordinates(
    ctx: &ToolContext,
    city: &str,
) -> ToolOutcome<Coordinates> {
    match search(ctx, city).await {
        Ok(Some(coordinates)) => ToolOutcome::Success(coordinates),
        Ok(None) => ToolOutcome::error(format!(
            "Could not find coordinates for city '{city}'."
        )),
        Err(err) => ToolOutcome::error(format!(
            "An error occurred while retrieving coordinates for {city}: {err}"
        )),
    }
}

async fn search(
    ctx: &ToolContext,
    city: &str,
) -> Result<Option<Coordinates>, String> {
    let url = endpoint(&ctx.upstreams().nominatim_base_url, "search");
    let places: Vec<Place> = ctx
        .client()
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .query(&[("q", city), ("format", "json"), ("limit", "1")])
        .send()
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(|err| err.to_string())?
        .json()
        .await
        .map_err(|err| err.to_string())?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let latitude = place
        .lat
        .parse()
        .map_err(|_| format!("invalid latitude {:?}", place.lat))?;
    let longitude = place
        .lon
        .parse()
        .map_err(|_| format!("invalid longitude {:?}", place.lon))?;
    Ok(Some(Coordinates {
        city: city.to_owned(),
        latitude,
        longitude,
        address: place.display_name,
    }))
}

/// A tool geocoding a city.
pub struct CoordinatesTool {
    ctx: ToolContext,
    parameter_schema: Value,
}

impl CoordinatesTool {
    /// Creates a new coordinates tool.
    #[inline]
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            parameter_schema: parameter_schema::<CityParameters>(),
        }
    }
}

impl Tool for CoordinatesTool {
    type Input = CityParameters;

    fn name(&self) -> &str {
        "get_coordinates"
    }

    fn description(&self) -> &str {
        "Returns the latitude, longitude and full address of a city."
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
        async move { get_coordinates(&ctx, &input.city).await.into_tool_result() }
    }
}
