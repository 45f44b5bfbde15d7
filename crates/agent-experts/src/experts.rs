//! The three expert agents and their tools.

use agent_experts_core::{Agent, AgentBuilder};

use crate::tools::ToolContext;
use crate::tools::city::{
    ConvertTimeTool, CoordinatesTool, CurrentTimeTool, PopulationTool,
    WeatherTool,
};
use crate::tools::crypto::{CryptoPriceTool, PriceChangeTool, TrendTool};
use crate::tools::law::{
    CasesTool, DefinitionTool, JurisdictionTool, StatuteTool,
};

/// Name of the city information expert.
pub const CITY_INFO_AGENT_NAME: &str = "city_info_expert_agent";
/// Name of the cryptocurrency expert.
pub const CRYPTO_AGENT_NAME: &str = "crypto_agent";
/// Name of the legal expert.
pub const LAW_AGENT_NAME: &str = "law_expert_agent";

/// Builds the expert answering questions about weather, local time, time
/// conversion, coordinates and population of cities.
pub fn city_info_expert(builder: AgentBuilder, ctx: &ToolContext) -> Agent {
    builder
        .with_name(CITY_INFO_AGENT_NAME)
        .with_description(
            "Agent to answer questions about the time and weather in a city, \
             convert time between different regions, get geographical \
             coordinates, and retrieve city population data.",
        )
        .with_instruction(
            "You are a helpful agent who can answer user questions about the \
             time and weather in a city, convert time between different \
             regions, get geographical coordinates, and retrieve city \
             population data. Use the appropriate tool for each request: \
             get_weather for weather information, get_current_time for \
             current time in a city, convert_time_between_cities to convert \
             time between two different cities, get_coordinates to get \
             latitude and longitude for a city, and get_city_population to \
             get population information for a city.",
        )
        .with_tool(WeatherTool::new(ctx.clone()))
        .with_tool(CurrentTimeTool::new())
        .with_tool(ConvertTimeTool::new())
        .with_tool(CoordinatesTool::new(ctx.clone()))
        .with_tool(PopulationTool::new(ctx.clone()))
        .build()
}

/// Builds the expert answering questions about cryptocurrency prices,
/// price changes and trends.
pub fn crypto_expert(builder: AgentBuilder, ctx: &ToolContext) -> Agent {
    builder
        .with_name(CRYPTO_AGENT_NAME)
        .with_description(
            "Agent to answer questions about cryptocurrency prices, price \
             change summaries, and price trend predictions.",
        )
        .with_instruction(
            "You are a helpful agent who can answer user questions about \
             cryptocurrency prices, price change summaries, and price trend \
             predictions. Use the get_crypto_price tool to get the current \
             price of a cryptocurrency in USD. Use the \
             get_crypto_price_change_summary tool to get a summary of price \
             changes over a specified period. Use the \
             predict_crypto_price_trend tool to predict whether a \
             cryptocurrency's price will go up or down in the next 24 hours. \
             The get_crypto_price tool accepts cryptocurrency names or \
             symbols like 'bitcoin', 'btc', 'ethereum', 'eth', etc. The \
             get_crypto_price_change_summary tool accepts cryptocurrency \
             names along with the number of days to look back (default 7). \
             The predict_crypto_price_trend tool analyzes recent price data \
             and technical indicators to provide a trend prediction with \
             confidence level.",
        )
        .with_tool(CryptoPriceTool::new(ctx.clone()))
        .with_tool(PriceChangeTool::new(ctx.clone()))
        .with_tool(TrendTool::new(ctx.clone()))
        .build()
}

/// Builds the expert answering questions about jurisdictions, statutes,
/// recent cases and legal terms.
pub fn law_expert(builder: AgentBuilder) -> Agent {
    builder
        .with_name(LAW_AGENT_NAME)
        .with_description(
            "Agent to answer questions about legal jurisdictions, statutes, \
             recent cases, and legal definitions.",
        )
        .with_instruction(
            "You are a helpful legal expert agent who can answer user \
             questions about legal topics. Use the appropriate tool for each \
             request: get_jurisdiction_info to determine legal jurisdictions \
             and court systems, get_statute_info to provide information about \
             specific laws and statutes, get_recent_cases to provide \
             information about recent significant legal cases in various \
             areas of law, and get_legal_definition to provide definitions \
             of legal terms and concepts. Always emphasize that you are \
             providing general legal information, not specific legal advice, \
             and recommend that users consult with qualified legal \
             professionals for their specific situations.",
        )
        .with_tool(JurisdictionTool::new())
        .with_tool(StatuteTool::new())
        .with_tool(CasesTool::new())
        .with_tool(DefinitionTool::new())
        .build()
}

#[cfg(test)]
mod tests {
    use agent_experts_test_model::ScriptedModelProvider;

    use super::*;
    use crate::config::Upstreams;

    fn builder() -> AgentBuilder {
        AgentBuilder::with_model_provider(ScriptedModelProvider::default())
    }

    #[test]
    fn test_city_info_expert() {
        let ctx = ToolContext::new(Upstreams::default());
        let agent = city_info_expert(builder(), &ctx);
        assert_eq!(agent.name(), "city_info_expert_agent");
        assert_eq!(
            agent.tool_names(),
            [
                "convert_time_between_cities",
                "get_city_population",
                "get_coordinates",
                "get_current_time",
                "get_weather",
            ]
        );
    }

    #[test]
    fn test_crypto_expert() {
        let ctx = ToolContext::new(Upstreams::default());
        let agent = crypto_expert(builder(), &ctx);
        assert_eq!(agent.name(), "crypto_agent");
        assert_eq!(
            agent.tool_names(),
            [
                "get_crypto_price",
                "get_crypto_price_change_summary",
                "predict_crypto_price_trend",
            ]
        );
    }

    #[test]
    fn test_law_expert() {
        let agent = law_expert(builder());
        assert_eq!(agent.name(), "law_expert_agent");
        assert!(agent.instruction().contains("not specific legal advice"));
        assert_eq!(
            agent.tool_names(),
            [
                "get_jurisdiction_info",
                "get_legal_definition",
                "get_recent_cases",
                "get_statute_info",
            ]
        );
    }
}
