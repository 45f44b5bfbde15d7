//! Weather, local time, coordinates and population of cities.

mod location;
mod population;
mod time;
mod timezones;
mod weather;

use schemars::JsonSchema;
use serde::Deserialize;

pub use location::{Coordinates, CoordinatesTool, get_coordinates};
pub use population::{Population, PopulationTool, get_city_population};
pub use time::{
    ConvertTimeTool, CurrentTime, CurrentTimeTool, TimeConversion,
    convert_time_between_cities, get_current_time,
};
pub use timezones::resolve_timezone;
pub use weather::{WeatherReport, WeatherTool, get_weather};

/// Parameters of the tools that take a single city.
#[derive(Deserialize, JsonSchema)]
pub struct CityParameters {
    #[schemars(description = "Name of the city, e.g. \"London\".")]
    city: String,
}
