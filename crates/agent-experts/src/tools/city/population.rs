use std::sync::LazyLock;

use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use regex::Regex;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CityParameters;
use crate::outcome::ToolOutcome;
use crate::tools::{ToolContext, endpoint};

const USER_AGENT: &str = "agent-dev-project/1.0";
const SUMMARY_CHARS: usize = 200;

/// Tried in order, the first match wins. Group 1 is the figure.
static POPULATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const NUMBER: &str = r"([0-9,]+(?:\.[0-9]+)?(?:\s+million|\s+thousand)?)";
    [
        format!(r"(?i)population\s+(?:of)?\s*(?:is|was|around|approximately)?\s*{NUMBER}"),
        format!(r"(?i)pop\.\s*{NUMBER}"),
        format!(r"(?i){NUMBER}\s+inhabitants"),
        format!(r"(?i)approximately\s+{NUMBER}\s+people"),
        format!(r"(?i){NUMBER}\s+people"),
        format!(r"(?i){NUMBER}\s+residents"),
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static HEADING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(={2,})\s*(.*?)\s*={2,}$").ok());

/// Population figure of a city, as stated on Wikipedia.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Population {
    /// The city as requested.
    pub city: String,
    /// The figure with thousands separators removed, e.g. "8804190" or
    /// "9 million".
    pub population: String,
    /// The start of the text the figure was found in.
    pub summary_text: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    query: Option<QueryPages>,
}

#[derive(Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
}

/// A plain-text article split into its lead and top-level sections.
#[derive(Debug, Default, PartialEq)]
struct Article {
    summary: String,
    /// Each section's text, followed by its subsections' text.
    sections: Vec<String>,
}

impl Article {
    fn parse(extract: &str) -> Self {
        let mut article = Article::default();
        // Paragraphs of the current section, `None` while in the lead.
        let mut current: Option<Vec<String>> = None;
        let mut lead = vec![];

        for line in extract.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let level = HEADING
                .as_ref()
                .and_then(|re| re.captures(line))
                .map(|caps| caps[1].len());
            match level {
                Some(2) => {
                    if let Some(section) = current.take() {
                        article.sections.push(section.join(" "));
                    }
                    current = Some(vec![]);
                }
                // Subsection headings only separate text.
                Some(_) => {}
                None => match &mut current {
                    Some(section) => section.push(line.to_owned()),
                    None => lead.push(line),
                },
            }
        }
        if let Some(section) = current {
            article.sections.push(section.join(" "));
        }
        article.summary = lead.join("\n");
        article
    }
}

fn search_population(text: &str) -> Option<String> {
    POPULATION_PATTERNS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().replace(',', ""))
    })
}

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(SUMMARY_CHARS).collect();
    out.push_str("...");
    out
}

fn find_population(city: &str, article: &Article) -> Option<Population> {
    let texts = std::iter::once(&article.summary).chain(&article.sections);
    for text in texts {
        if let Some(population) = search_population(text) {
            return Some(Population {
                city: city.to_owned(),
                population,
                summary_text: excerpt(text),
            });
        }
    }
    None
}

async fn fetch_extract(
    ctx: &ToolContext,
    city: &str,
) -> Result<Option<String>, reqwest::Error> {
    let url = endpoint(&ctx.upstreams().wikipedia_base_url, "w/api.php");
    let resp: QueryResponse = ctx
        .client()
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .query(&[
            ("action", "query"),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("format", "json"),
            ("formatversion", "2"),
            ("titles", city),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let page = resp
        .query
        .and_then(|q| q.pages.into_iter().next())
        .filter(|page| !page.missing);
    Ok(page.map(|page| page.extract.unwrap_or_default()))
}

/// Looks up the population of `city` in its English Wikipedia article.
///
/// The lead is searched first, then each top-level section together with
/// its subsections.
pub async fn get_city_population(
    ctx: &ToolContext,
    city: &str,
) -> ToolOutcome<Population> {
    let extract = match fetch_extract(ctx, city).await {
        Ok(Some(extract)) => extract,
        Ok(None) => {
            return ToolOutcome::error(format!(
                "Wikipedia page for '{city}' not found."
            ));
        }
        Err(err) => {
            return ToolOutcome::error(format!(
                "Failed to retrieve Wikipedia data for '{city}': {err}"
            ));
        }
    };

    let article = Article::parse(&extract);
    match find_population(city, &article) {
        Some(population) => ToolOutcome::Success(population),
        None => ToolOutcome::error(format!(
            "Population information not found for '{city}' on Wikipedia."
        )),
    }
}

/// A tool looking up city populations on Wikipedia.
pub struct PopulationTool {
    ctx: ToolContext,
    parameter_schema: Value,
}

impl PopulationTool {
    /// Creates a new population tool.
    #[inline]
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            parameter_schema: parameter_schema::<CityParameters>(),
        }
    }
}

impl Tool for PopulationTool {
    type Input = CityParameters;

    fn name(&self) -> &str {
        "get_city_population"
    }

    fn description(&self) -> &str {
        "Looks up the population of a city from its Wikipedia article."
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
        async move {
            get_city_population(&ctx, &input.city)
                .await
                .into_tool_result()
        }
    }
}
