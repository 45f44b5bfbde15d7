use std::future::ready;

use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalize;
use crate::outcome::ToolOutcome;

struct Statute {
    key: &'static str,
    name: &'static str,
    official_name: &'static str,
    jurisdiction: &'static str,
    enacted: &'static str,
    effective_date: Option<&'static str>,
    purpose: &'static str,
    key_provisions: &'static [&'static str],
    description: &'static str,
}

const STATUTES: &[Statute] = &[
    Statute {
        key: "us_constitution",
        name: "United States Constitution",
        official_name: "Constitution of the United States",
        jurisdiction: "Federal",
        enacted: "1787",
        effective_date: None,
        purpose: "To establish the federal government and protect the \
                  fundamental rights of citizens",
        key_provisions: &[
            "First Amendment: Freedom of speech, religion, and press",
            "Fourth Amendment: Protection against unreasonable searches",
            "Fifth Amendment: Right against self-incrimination",
            "Fourteenth Amendment: Equal protection under the law",
        ],
        description: "The supreme law of the United States, establishing the \
                      structure of the federal government and fundamental \
                      rights of citizens.",
    },
    Statute {
        key: "cpra",
        name: "California Consumer Privacy Act",
        official_name: "California Consumer Privacy Act (CCPA)",
        jurisdiction: "California",
        enacted: "2018",
        effective_date: Some("2020-01-01"),
        purpose: "To enhance privacy rights and consumer protection for \
                  residents of California",
        key_provisions: &[
            "Right to know what personal information is collected",
            "Right to delete personal information",
            "Right to opt-out of sale of personal information",
            "Right to non-discrimination for exercising privacy rights",
        ],
        description: "A comprehensive privacy law that grants California \
                      residents significant control over their personal \
                      information.",
    },
    Statute {
        key: "gdpr",
        name: "GDPR",
        official_name: "General Data Protection Regulation (EU)",
        jurisdiction: "European Union",
        enacted: "2016",
        effective_date: Some("2018-05-25"),
        purpose: "To protect the privacy and personal data of EU citizens",
        key_provisions: &[
            "Right to access personal data",
            "Right to be forgotten",
            "Data portability",
            "Consent requirements for data processing",
        ],
        description: "Regulation on data protection and privacy in the \
                      European Union and European Economic Area.",
    },
    Statute {
        key: "hipaa",
        name: "HIPAA",
        official_name: "Health Insurance Portability and Accountability Act",
        jurisdiction: "Federal",
        enacted: "1996",
        effective_date: None,
        purpose: "To protect health information privacy and security",
        key_provisions: &[
            "Privacy Rule: Protects individually identifiable health information",
            "Security Rule: Sets standards for electronic protected health information",
            "Breach Notification Rule: Requires notification of breaches",
        ],
        description: "Federal law that provides data privacy and security \
                      provisions for safeguarding medical information.",
    },
    Statute {
        key: "sox",
        name: "SOX",
        official_name: "Sarbanes-Oxley Act",
        jurisdiction: "Federal",
        enacted: "2002",
        effective_date: None,
        purpose: "To protect investors from fraudulent accounting practices",
        key_provisions: &[
            "Corporate responsibility for financial reports",
            "Enhanced criminal penalties",
            "Accountability of corporate executives",
            "Protection for whistleblowers",
        ],
        description: "Federal law that established sweeping auditing and \
                      financial regulations for public companies.",
    },
];

/// What a statute is about.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatuteInfo {
    /// Common name.
    pub statute_name: String,
    /// Full title.
    pub official_name: String,
    /// Where it applies.
    pub jurisdiction: String,
    /// Year of enactment.
    pub enacted: String,
    /// Date it took effect, when it differs from the enactment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    /// Why it was enacted.
    pub purpose: String,
    /// Main provisions.
    pub key_provisions: Vec<String>,
    /// One-paragraph summary.
    pub description: String,
}

impl From<&Statute> for StatuteInfo {
    fn from(statute: &Statute) -> Self {
        Self {
            statute_name: statute.name.to_owned(),
            official_name: statute.official_name.to_owned(),
            jurisdiction: statute.jurisdiction.to_owned(),
            enacted: statute.enacted.to_owned(),
            effective_date: statute.effective_date.map(str::to_owned),
            purpose: statute.purpose.to_owned(),
            key_provisions: statute
                .key_provisions
                .iter()
                .map(|&p| p.to_owned())
                .collect(),
            description: statute.description.to_owned(),
        }
    }
}

fn find(query: &str) -> Option<&'static Statute> {
    let query = normalize(query);
    let matches = |text: &str| text.to_lowercase().contains(&query);
    STATUTES.iter().find(|statute| {
        matches(statute.key)
            || matches(statute.name)
            || matches(statute.official_name)
            || statute.key_provisions.iter().any(|p| matches(*p))
    })
}

/// Looks up a statute by name, abbreviation or the content of one of its
/// provisions.
///
/// Statutes outside the table get a generic answer.
pub fn get_statute_info(statute_query: &str) -> ToolOutcome<StatuteInfo> {
    let query = statute_query.trim();
    if query.is_empty() {
        return ToolOutcome::error("Statute query cannot be empty");
    }

    let info = match find(query) {
        Some(statute) => StatuteInfo::from(statute),
        None => StatuteInfo {
            statute_name: query.to_owned(),
            official_name: query.to_owned(),
            jurisdiction: "Unknown".to_owned(),
            enacted: "Unknown".to_owned(),
            effective_date: None,
            purpose: format!("Information about {query}"),
            key_provisions: vec![format!(
                "Details about {query} may not be readily available in the \
                 current database"
            )],
            description: format!(
                "Information about {query} statute. More detailed information \
                 may require consultation with legal resources."
            ),
        },
    };
    ToolOutcome::Success(info)
}

/// Parameters of [`StatuteTool`].
#[derive(Deserialize, JsonSchema)]
pub struct StatuteParameters {
    #[schemars(
        description = "Name, abbreviation or subject of the statute, e.g. \"GDPR\" or \"HIPAA\"."
    )]
    statute_query: String,
}

/// A tool describing statutes and regulations.
pub struct StatuteTool {
    parameter_schema: Value,
}

impl StatuteTool {
    /// Creates a new statute tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: parameter_schema::<StatuteParameters>(),
        }
    }
}

impl Default for StatuteTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for StatuteTool {
    type Input = StatuteParameters;

    fn name(&self) -> &str {
        "get_statute_info"
    }

    fn description(&self) -> &str {
        "Returns the official name, jurisdiction, enactment, purpose and key \
         provisions of a law or statute."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: StatuteParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(get_statute_info(&input.statute_query).into_tool_result())
    }
}
