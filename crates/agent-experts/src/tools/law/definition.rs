use std::future::ready;

use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::normalize;
use crate::outcome::ToolOutcome;

const DEFAULT_CONTEXT: &str = "General legal concept";

struct Entry {
    term: &'static str,
    definition: &'static str,
    context: Option<&'static str>,
    types: &'static [&'static str],
    importance: Option<&'static str>,
    standards: &'static [&'static str],
    meaning: Option<&'static str>,
    components: &'static [&'static str],
    purpose: Option<&'static str>,
    constitutional_basis: Option<&'static str>,
    consequences: Option<&'static str>,
    examples: &'static [&'static str],
}

const BLANK: Entry = Entry {
    term: "",
    definition: "",
    context: None,
    types: &[],
    importance: None,
    standards: &[],
    meaning: None,
    components: &[],
    purpose: None,
    constitutional_basis: None,
    consequences: None,
    examples: &[],
};

const DEFINITIONS: &[(&str, Entry)] = &[
    (
        "due process",
        Entry {
            term: "Due Process",
            definition:
                "The constitutional guarantee that an individual will be given \
                 notice and an opportunity to be heard before being deprived \
                 of life, liberty, or property by the government.",
            context: Some("Fifth and Fourteenth Amendments to the U.S. Constitution"),
            types: &["Procedural Due Process", "Substantive Due Process"],
            ..BLANK
        },
    ),
    (
        "stare decisis",
        Entry {
            term: "Stare Decisis",
            definition:
                "The doctrine that courts should follow precedents established \
                 by previous decisions when ruling on similar cases.",
            context: Some("Legal precedent and case law interpretation"),
            importance: Some(
                "Promotes consistency and predictability in the judicial system",
            ),
            ..BLANK
        },
    ),
    (
        "burden of proof",
        Entry {
            term: "Burden of Proof",
            definition:
                "The obligation to present evidence supporting one's \
                 assertions in a legal proceeding. In criminal cases, the \
                 burden is on the prosecution to prove guilt beyond a \
                 reasonable doubt. In civil cases, the burden is usually on \
                 the plaintiff to prove their case by a preponderance of \
                 evidence.",
            context: Some("Both criminal and civil law"),
            standards: &[
                "Beyond a reasonable doubt",
                "Preponderance of evidence",
                "Clear and convincing evidence",
            ],
            ..BLANK
        },
    ),
    (
        "habeas corpus",
        Entry {
            term: "Habeas Corpus",
            definition:
                "A legal action through which a person can seek relief from \
                 unlawful detention. The right to habeas corpus protects \
                 individuals from being held in custody unlawfully.",
            context: Some("Constitutional protection against unlawful imprisonment"),
            meaning: Some("Literally means 'you shall have the body' in Latin"),
            ..BLANK
        },
    ),
    (
        "fiduciary duty",
        Entry {
            term: "Fiduciary Duty",
            definition:
                "A legal obligation to act in the best interests of another \
                 party. Fiduciary relationships exist when one party is \
                 expected to act in the other's best interests, such as \
                 between attorneys and clients, or corporate directors and \
                 shareholders.",
            context: Some("Corporate law, trusts, and professional responsibilities"),
            components: &["Duty of care", "Duty of loyalty", "Duty of good faith"],
            ..BLANK
        },
    ),
    (
        "double jeopardy",
        Entry {
            term: "Double Jeopardy",
            definition:
                "The constitutional protection preventing someone from being \
                 tried twice for the same offense. This protection is \
                 provided by the Fifth Amendment to the U.S. Constitution.",
            context: Some("Criminal law"),
            purpose: Some(
                "Protects individuals from the government's power to bring \
                 successive prosecutions for the same conduct",
            ),
            ..BLANK
        },
    ),
    (
        "ex post facto",
        Entry {
            term: "Ex Post Facto",
            definition:
                "A law that retroactively changes the legal consequences of \
                 actions that were committed before the law was enacted. The \
                 U.S. Constitution prohibits ex post facto criminal laws.",
            context: Some("Criminal law"),
            constitutional_basis: Some(
                "Article I, Sections 9 and 10 of the U.S. Constitution",
            ),
            ..BLANK
        },
    ),
    (
        "subpoena",
        Entry {
            term: "Subpoena",
            definition:
                "A writ requiring a person to appear in court at a specified \
                 time and place to give testimony or produce documents.",
            types: &[
                "Subpoena ad testificandum (to testify)",
                "Subpoena duces tecum (to produce documents)",
            ],
            consequences: Some(
                "Failure to comply can result in contempt of court charges",
            ),
            ..BLANK
        },
    ),
    (
        "voir dire",
        Entry {
            term: "Voir Dire",
            definition:
                "The process of questioning potential jurors to determine \
                 their suitability for jury service.",
            context: Some("Jury selection process"),
            purpose: Some(
                "To ensure an impartial jury by identifying potential biases",
            ),
            ..BLANK
        },
    ),
    (
        "tort",
        Entry {
            term: "Tort",
            definition:
                "A wrongful act (other than breach of contract) that results \
                 in harm or injury to another and leads to civil liability.",
            types: &["Intentional torts", "Negligence", "Strict liability"],
            examples: &["Assault", "Battery", "Defamation", "Negligence"],
            ..BLANK
        },
    ),
];

/// A glossary entry. Only the term and the definition are always present.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DefinitionEntry {
    /// The term, capitalized.
    pub term: String,
    /// What it means.
    pub definition: String,
    /// Where the term is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Variants of the concept.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    /// Why it matters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    /// Standards of proof.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub standards: Vec<String>,
    /// Literal meaning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    /// Parts of the concept.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
    /// What it is for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Constitutional source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constitutional_basis: Option<String>,
    /// Consequences of ignoring it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consequences: Option<String>,
    /// Typical instances.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Caveat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl From<&Entry> for DefinitionEntry {
    fn from(entry: &Entry) -> Self {
        let text = |t: Option<&str>| t.map(str::to_owned);
        let list = |l: &[&str]| -> Vec<String> {
            l.iter().map(|&t| t.to_owned()).collect()
        };
        Self {
            term: entry.term.to_owned(),
            definition: entry.definition.to_owned(),
            context: text(entry.context),
            types: list(entry.types),
            importance: text(entry.importance),
            standards: list(entry.standards),
            meaning: text(entry.meaning),
            components: list(entry.components),
            purpose: text(entry.purpose),
            constitutional_basis: text(entry.constitutional_basis),
            consequences: text(entry.consequences),
            examples: list(entry.examples),
            note: None,
        }
    }
}

/// Definition of a legal term.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LegalDefinition {
    /// The term, capitalized.
    pub term: String,
    /// What it means.
    pub definition: String,
    /// Where the term is used.
    pub context: String,
    /// The whole glossary entry.
    pub details: DefinitionEntry,
}

fn find(term: &str) -> Option<&'static Entry> {
    let query = normalize(term);
    let by_key = DEFINITIONS
        .iter()
        .find(|(key, _)| key.contains(&query) || query.contains(key));
    let by_text = || {
        DEFINITIONS.iter().find(|(_, entry)| {
            entry.definition.to_lowercase().contains(&query)
                || entry
                    .components
                    .iter()
                    .any(|c| c.to_lowercase().contains(&query))
                || entry
                    .context
                    .is_some_and(|c| c.to_lowercase().contains(&query))
        })
    };
    by_key.or_else(by_text).map(|(_, entry)| entry)
}

/// Defines a legal term, matching the glossary by term first and by the
/// text of the entries second.
///
/// Terms outside the glossary get a generic answer.
pub fn get_legal_definition(term: &str) -> ToolOutcome<LegalDefinition> {
    let term = term.trim();
    if term.is_empty() {
        return ToolOutcome::error("Term cannot be empty");
    }

    let details = match find(term) {
        Some(entry) => DefinitionEntry::from(entry),
        None => DefinitionEntry {
            term: term.to_owned(),
            definition: format!(
                "The legal definition of '{term}' may require consultation \
                 with legal dictionaries or professional legal resources."
            ),
            context: Some("General legal terminology".to_owned()),
            note: Some(
                "This is a general reference. For legal advice, consult with \
                 a qualified attorney."
                    .to_owned(),
            ),
            ..Default::default()
        },
    };

    ToolOutcome::Success(LegalDefinition {
        term: details.term.clone(),
        definition: details.definition.clone(),
        context: details
            .context
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTEXT.to_owned()),
        details,
    })
}

/// Parameters of [`DefinitionTool`].
#[derive(Deserialize, JsonSchema)]
pub struct DefinitionParameters {
    #[schemars(description = "Legal term to define, e.g. \"habeas corpus\".")]
    term: String,
}

/// A tool defining legal terms.
pub struct DefinitionTool {
    parameter_schema: Value,
}

impl DefinitionTool {
    /// Creates a new legal definition tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: parameter_schema::<DefinitionParameters>(),
        }
    }
}

impl Default for DefinitionTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DefinitionTool {
    type Input = DefinitionParameters;

    fn name(&self) -> &str {
        "get_legal_definition"
    }

    fn description(&self) -> &str {
        "Returns the definition of a legal term or concept, with its context \
         and related details."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: DefinitionParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(get_legal_definition(&input.term).into_tool_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_by_term() {
        let outcome = get_legal_definition("Habeas Corpus");
        let def = outcome.success().unwrap();
        assert_eq!(def.term, "Habeas Corpus");
        assert_eq!(
            def.context,
            "Constitutional protection against unlawful imprisonment"
        );
        assert_eq!(
            def.details.meaning.as_deref(),
            Some("Literally means 'you shall have the body' in Latin")
        );

        let outcome = get_legal_definition("what is a tort claim");
        assert_eq!(outcome.success().unwrap().term, "Tort");
    }

    #[test]
    fn test_match_by_text() {
        let outcome = get_legal_definition("duty of loyalty");
        assert_eq!(outcome.success().unwrap().term, "Fiduciary Duty");
        let outcome = get_legal_definition("jury selection");
        assert_eq!(outcome.success().unwrap().term, "Voir Dire");
        let outcome = get_legal_definition("precedents");
        assert_eq!(outcome.success().unwrap().term, "Stare Decisis");
    }

    #[test]
    fn test_default_context() {
        let outcome = get_legal_definition("subpoena");
        let def = outcome.success().unwrap();
        assert_eq!(def.context, "General legal concept");
        assert_eq!(def.details.types.len(), 2);
    }

    #[test]
    fn test_unknown_term() {
        let outcome = get_legal_definition("estoppel");
        let def = outcome.success().unwrap();
        assert_eq!(def.term, "estoppel");
        assert_eq!(def.context, "General legal terminology");
        assert!(def.details.note.is_some());
    }

    #[test]
    fn test_details_shape() {
        let value = serde_json::to_value(get_legal_definition("burden of proof"))
            .unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["details"]["term"], "Burden of Proof");
        assert_eq!(value["details"]["standards"].as_array().unwrap().len(), 3);
        assert!(value["details"].get("examples").is_none());
        assert!(value["details"].get("note").is_none());
    }

    #[test]
    fn test_empty_term() {
        assert!(get_legal_definition("").is_error());
    }
}
