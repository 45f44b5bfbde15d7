use std::future::ready;

use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::outcome::ToolOutcome;
use crate::tools::title_case;

struct Jurisdiction {
    key: &'static str,
    name: &'static str,
    level: &'static str,
    court_types: &'static [&'static str],
    coverage: &'static str,
    highest_court: &'static str,
}

const JURISDICTIONS: &[Jurisdiction] = &[
    Jurisdiction {
        key: "federal",
        name: "Federal Courts (United States)",
        level: "Federal",
        court_types: &[
            "Supreme Court",
            "Circuit Courts of Appeal",
            "District Courts",
        ],
        coverage: "Matters involving federal law, constitutional issues, \
                   interstate commerce",
        highest_court: "Supreme Court of the United States",
    },
    Jurisdiction {
        key: "california",
        name: "California State Courts",
        level: "State",
        court_types: &["Supreme Court", "Courts of Appeal", "Superior Courts"],
        coverage: "State law matters within California",
        highest_court: "California Supreme Court",
    },
    Jurisdiction {
        key: "new york",
        name: "New York State Courts",
        level: "State",
        court_types: &[
            "Court of Appeals",
            "Appellate Division",
            "Supreme Court",
            "County Courts",
        ],
        coverage: "State law matters within New York",
        highest_court: "Court of Appeals of New York",
    },
    Jurisdiction {
        key: "texas",
        name: "Texas State Courts",
        level: "State",
        court_types: &[
            "Supreme Court",
            "Court of Criminal Appeals",
            "Courts of Appeals",
            "District Courts",
        ],
        coverage: "State law matters within Texas",
        highest_court: "Texas Supreme Court",
    },
];

/// Court system of a jurisdiction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JurisdictionInfo {
    /// Display name.
    pub jurisdiction: String,
    /// `"Federal"`, `"State"` or `"Unknown"`.
    pub level: String,
    /// Courts of the jurisdiction, highest first.
    pub court_types: Vec<String>,
    /// Matters the courts handle.
    pub coverage: String,
    /// Court of last resort.
    pub highest_court: String,
    /// One-paragraph summary.
    pub description: String,
}

/// Drops case, spaces and dashes so that "New-York" finds "new york".
fn lookup_key(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

fn find(jurisdiction: &str) -> Option<&'static Jurisdiction> {
    let query = lookup_key(jurisdiction);
    JURISDICTIONS.iter().find(|entry| {
        let key = lookup_key(entry.key);
        query.contains(&key) || key.contains(&query)
    })
}

/// Describes the court system of a jurisdiction.
///
/// Jurisdictions outside the table get a generic description.
pub fn get_jurisdiction_info(
    jurisdiction: &str,
) -> ToolOutcome<JurisdictionInfo> {
    let jurisdiction = jurisdiction.trim();
    if jurisdiction.is_empty() {
        return ToolOutcome::error("Jurisdiction cannot be empty");
    }

    let (name, level, court_types, coverage, highest_court) =
        match find(jurisdiction) {
            Some(entry) => (
                entry.name.to_owned(),
                entry.level.to_owned(),
                entry.court_types.iter().map(|&t| t.to_owned()).collect(),
                entry.coverage.to_owned(),
                entry.highest_court.to_owned(),
            ),
            None => {
                let title = title_case(jurisdiction);
                (
                    format!("{title} Jurisdiction"),
                    "Unknown".to_owned(),
                    vec!["Unknown Court Types".to_owned()],
                    format!("Legal matters within {jurisdiction} jurisdiction"),
                    format!("{title} Supreme Court"),
                )
            }
        };

    let description = format!(
        "Information about the {name} legal system, which is a {} \
         jurisdiction handling {}. The highest court in this jurisdiction \
         is the {highest_court}.",
        level.to_lowercase(),
        coverage.to_lowercase(),
    );
    ToolOutcome::Success(JurisdictionInfo {
        jurisdiction: name,
        level,
        court_types,
        coverage,
        highest_court,
        description,
    })
}

/// Parameters of [`JurisdictionTool`].
#[derive(Deserialize, JsonSchema)]
pub struct JurisdictionParameters {
    #[schemars(
        description = "Jurisdiction to look up, e.g. \"federal\", \"California\" or \"New York\"."
    )]
    jurisdiction: String,
}

/// A tool describing legal jurisdictions and their court systems.
pub struct JurisdictionTool {
    parameter_schema: Value,
}

impl JurisdictionTool {
    /// Creates a new jurisdiction tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: parameter_schema::<JurisdictionParameters>(),
        }
    }
}

impl Default for JurisdictionTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for JurisdictionTool {
    type Input = JurisdictionParameters;

    fn name(&self) -> &str {
        "get_jurisdiction_info"
    }

    fn description(&self) -> &str {
        "Returns the level, court types, coverage and highest court of a \
         legal jurisdiction."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: JurisdictionParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(get_jurisdiction_info(&input.jurisdiction).into_tool_result())
    }
}
