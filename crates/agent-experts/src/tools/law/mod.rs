//! Legal reference tools over built-in tables: jurisdictions, statutes,
//! recent cases and legal definitions.
//!
//! These tools give general legal information, not legal advice.

mod cases;
mod definition;
mod jurisdiction;
mod statute;

pub use cases::{CaseSummary, CasesTool, RecentCases, get_recent_cases};
pub use definition::{
    DefinitionEntry, DefinitionTool, LegalDefinition, get_legal_definition,
};
pub use jurisdiction::{
    JurisdictionInfo, JurisdictionTool, get_jurisdiction_info,
};
pub use statute::{StatuteInfo, StatuteTool, get_statute_info};

/// Lowercases and trims a lookup query.
fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}
