//! Search agent: knowledge-base retrieval and grounding.
//!
//! The knowledge base is an external ranked-search service: a query goes in,
//! ranked passages with citation ids come out. Two tools are registered:
//! `search` feeds passages back into the model's context, `report_grounding`
//! surfaces the cited sources to the human channel (where the relay redacts
//! the raw ids before anything is read aloud).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::RegistryError;
use crate::core::tools::{
    ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolOutcome, ToolRegistry,
};

/// How many passages a search returns to the model.
const SEARCH_TOP: usize = 5;

/// How much of a passage is quoted back when reporting grounding.
const EXCERPT_CHARS: usize = 200;

/// Knowledge-base backend configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Base URL of the search service
    pub endpoint: String,
    /// Optional API key sent as an `api-key` header
    pub api_key: Option<String>,
}

/// One ranked passage from the search service.
#[derive(Debug, Clone, Deserialize)]
struct Passage {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Passage>,
}

#[derive(Clone)]
struct SearchClient {
    http: reqwest::Client,
    config: SearchConfig,
}

impl SearchClient {
    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path);
        let mut builder = self.http.post(url);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    /// Ranked search: query in, passages out.
    async fn search(&self, query: &str) -> Result<Vec<Passage>, ToolError> {
        let response: SearchResponse = self
            .request("search")
            .json(&json!({ "query": query, "top": SEARCH_TOP }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.results)
    }

    /// Resolve citation ids back to their passages.
    async fn lookup(&self, ids: &[String]) -> Result<Vec<Passage>, ToolError> {
        let response: SearchResponse = self
            .request("lookup")
            .json(&json!({ "ids": ids }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.results)
    }
}

struct Search {
    client: SearchClient,
}

#[async_trait]
impl ToolHandler for Search {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let Ok(query) = args.require_text("query") else {
            return Ok(ToolOutcome::to_server(
                "A search query is required. Please retry.",
            ));
        };

        tracing::debug!(query = %query, "searching knowledge base");
        let passages = self.client.search(&query).await?;
        if passages.is_empty() {
            return Ok(ToolOutcome::to_server("No results found."));
        }

        let listing = passages
            .iter()
            .map(|p| format!("[{}]: {}", p.id, p.content))
            .collect::<Vec<_>>()
            .join("\n-----\n");
        Ok(ToolOutcome::to_server(listing))
    }
}

struct ReportGrounding {
    client: SearchClient,
}

#[async_trait]
impl ToolHandler for ReportGrounding {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutcome, ToolError> {
        let Ok(Some(sources)) = args.text_list("sources") else {
            return Ok(ToolOutcome::to_server(
                "A list of source ids is required. Please retry.",
            ));
        };
        // Ids never contain spaces; drop anything that pretends otherwise
        let sources: Vec<String> = sources
            .into_iter()
            .filter(|s| !s.is_empty() && !s.contains(char::is_whitespace))
            .collect();
        if sources.is_empty() {
            return Ok(ToolOutcome::to_server("No valid source ids provided."));
        }

        tracing::debug!(count = sources.len(), "reporting grounding sources");
        let passages = self.client.lookup(&sources).await?;

        let sources: Vec<Value> = passages
            .iter()
            .map(|p| {
                let excerpt: String = p.content.chars().take(EXCERPT_CHARS).collect();
                json!({
                    "chunk_id": p.id,
                    "title": p.title,
                    "excerpt": excerpt,
                })
            })
            .collect();
        let payload = json!({ "sources": sources }).to_string();
        Ok(ToolOutcome::to_client(payload))
    }
}

fn search_schema() -> Value {
    json!({
        "type": "function",
        "name": "search",
        "description": "Search the knowledge base. The knowledge base is in English, \
            translate to and from English if needed. Results are formatted as a source \
            name first in square brackets, followed by the text content, with a ----- \
            line between each result.",
        "parameters": {
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }
    })
}

fn report_grounding_schema() -> Value {
    json!({
        "type": "function",
        "name": "report_grounding",
        "description": "Report use of a source from the knowledge base as part of an \
            answer. Sources appear in square brackets before each knowledge base \
            passage. Always use this tool to cite sources when responding with \
            information from the knowledge base.",
        "parameters": {
            "type": "object",
            "properties": {
                "sources": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of source ids from the last search actually used in the answer"
                }
            },
            "required": ["sources"],
            "additionalProperties": false
        }
    })
}

/// Register the search tools against the configured knowledge base.
pub fn attach(
    registry: &mut ToolRegistry,
    http: reqwest::Client,
    config: SearchConfig,
) -> Result<(), RegistryError> {
    let client = SearchClient { http, config };
    registry.register(ToolDescriptor::new(
        "search",
        search_schema(),
        Arc::new(Search {
            client: client.clone(),
        }),
    ))?;
    registry.register(ToolDescriptor::new(
        "report_grounding",
        report_grounding_schema(),
        Arc::new(ReportGrounding { client }),
    ))?;
    Ok(())
}
