//! Direct access to the tools, for the endpoints that bypass the agents.
//!
//! Each method logs the call, runs the tool and logs error outcomes. The
//! outcome is returned as is.

use crate::outcome::ToolOutcome;
use crate::tools::ToolContext;
use crate::tools::city::{
    Coordinates, CurrentTime, Population, TimeConversion, WeatherReport,
    convert_time_between_cities, get_city_population, get_coordinates,
    get_current_time, get_weather,
};
use crate::tools::crypto::{
    CryptoPrice, PriceChangeSummary, TrendPrediction,
    get_crypto_price, get_crypto_price_change_summary,
    predict_crypto_price_trend,
};
use crate::tools::law::{
    JurisdictionInfo, LegalDefinition, RecentCases, StatuteInfo,
    get_jurisdiction_info, get_legal_definition, get_recent_cases,
    get_statute_info,
};

fn log_failure<T>(operation: &str, subject: &str, outcome: &ToolOutcome<T>) {
    if let Some(message) = outcome.error_message() {
        warn!("{operation} failed for {subject}: {message}");
    }
}

/// Weather, time, coordinates and population of cities.
#[derive(Clone, Debug)]
pub struct CityInfoService {
    ctx: ToolContext,
}

impl CityInfoService {
    /// Creates a service running the tools with `ctx`.
    #[inline]
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    /// Current weather of a city.
    pub async fn get_weather(&self, city: &str) -> ToolOutcome<WeatherReport> {
        info!("getting weather for city: {city}");
        let outcome = get_weather(&self.ctx, city).await;
        log_failure("weather lookup", city, &outcome);
        outcome
    }

    /// Current local time of a city.
    pub fn get_current_time(&self, city: &str) -> ToolOutcome<CurrentTime> {
        info!("getting current time for city: {city}");
        let outcome = get_current_time(city);
        log_failure("time lookup", city, &outcome);
        outcome
    }

    /// Population of a city.
    pub async fn get_population(&self, city: &str) -> ToolOutcome<Population> {
        info!("getting population for city: {city}");
        let outcome = get_city_population(&self.ctx, city).await;
        log_failure("population lookup", city, &outcome);
        outcome
    }

    /// Coordinates of a city.
    pub async fn get_coordinates(&self, city: &str) -> ToolOutcome<Coordinates> {
        info!("getting coordinates for city: {city}");
        let outcome = get_coordinates(&self.ctx, city).await;
        log_failure("coordinates lookup", city, &outcome);
        outcome
    }

    /// Converts `time` (`HH:MM`) from `from_city` to `to_city`.
    pub fn convert_time(
        &self,
        from_city: &str,
        to_city: &str,
        time: &str,
    ) -> ToolOutcome<TimeConversion> {
        info!("converting time from {from_city} to {to_city}");
        let outcome = convert_time_between_cities(from_city, to_city, Some(time));
        log_failure("time conversion", &format!("{from_city} -> {to_city}"), &outcome);
        outcome
    }
}

/// Cryptocurrency prices, changes and trends.
#[derive(Clone, Debug)]
pub struct CryptoService {
    ctx: ToolContext,
}

impl CryptoService {
    /// Creates a service running the tools with `ctx`.
    #[inline]
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    /// Current USD price of a coin.
    pub async fn get_price(&self, crypto: &str) -> ToolOutcome<CryptoPrice> {
        info!("getting price for cryptocurrency: {crypto}");
        let outcome = get_crypto_price(&self.ctx, crypto).await;
        log_failure("price lookup", crypto, &outcome);
        outcome
    }

    /// How the price of a coin changed over the last `days`.
    pub async fn get_price_change_summary(
        &self,
        crypto: &str,
        days: i64,
    ) -> ToolOutcome<PriceChangeSummary> {
        info!("getting price change summary for cryptocurrency: {crypto}, days: {days}");
        let outcome =
            get_crypto_price_change_summary(&self.ctx, crypto, days).await;
        log_failure("price change summary", crypto, &outcome);
        outcome
    }

    /// Predicted 24-hour trend of a coin.
    pub async fn predict_trend(
        &self,
        crypto: &str,
    ) -> ToolOutcome<TrendPrediction> {
        info!("predicting price trend for cryptocurrency: {crypto}");
        let outcome = predict_crypto_price_trend(&self.ctx, crypto).await;
        log_failure("trend prediction", crypto, &outcome);
        outcome
    }
}

/// Legal reference lookups.
#[derive(Clone, Copy, Debug, Default)]
pub struct LawService;

impl LawService {
    /// Court system of a jurisdiction.
    pub fn get_jurisdiction_info(
        &self,
        jurisdiction: &str,
    ) -> ToolOutcome<JurisdictionInfo> {
        info!("getting jurisdiction info for: {jurisdiction}");
        let outcome = get_jurisdiction_info(jurisdiction);
        log_failure("jurisdiction lookup", jurisdiction, &outcome);
        outcome
    }

    /// A statute matching `query`.
    pub fn get_statute_info(&self, query: &str) -> ToolOutcome<StatuteInfo> {
        info!("getting statute info for: {query}");
        let outcome = get_statute_info(query);
        log_failure("statute lookup", query, &outcome);
        outcome
    }

    /// Recent cases of an area of law.
    pub fn get_recent_cases(&self, law_area: &str) -> ToolOutcome<RecentCases> {
        info!("getting recent cases for law area: {law_area}");
        let outcome = get_recent_cases(law_area);
        log_failure("recent cases lookup", law_area, &outcome);
        outcome
    }

    /// Definition of a legal term.
    pub fn get_legal_definition(
        &self,
        term: &str,
    ) -> ToolOutcome<LegalDefinition> {
        info!("getting legal definition for: {term}");
        let outcome = get_legal_definition(term);
        log_failure("definition lookup", term, &outcome);
        outcome
    }
}
