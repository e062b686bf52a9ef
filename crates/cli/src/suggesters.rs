use anyhow::{Context, Result};
use async_trait::async_trait;
use compass_enhancer::{GraphSummary, RelationshipSuggester, SuggestedRelationship};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Either a bare array or `{"suggestions": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionPayload {
    Bare(Vec<SuggestedRelationship>),
    Wrapped { suggestions: Vec<SuggestedRelationship> },
}

fn parse_suggestions(bytes: &[u8]) -> Result<Vec<SuggestedRelationship>> {
    let payload: SuggestionPayload =
        serde_json::from_slice(bytes).context("suggestions must be a JSON array or {\"suggestions\": [...]}")?;
    Ok(match payload {
        SuggestionPayload::Bare(items) | SuggestionPayload::Wrapped { suggestions: items } => items,
    })
}

/// Replays suggestions recorded in a JSON file.
pub struct FileSuggester {
    path: PathBuf,
}

impl FileSuggester {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RelationshipSuggester for FileSuggester {
    async fn suggest(&self, _summary: &GraphSummary) -> Result<Vec<SuggestedRelationship>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read suggestions {}", self.path.display()))?;
        parse_suggestions(&bytes)
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// POSTs the graph summary as JSON and reads suggestions from the response.
pub struct HttpSuggester {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSuggester {
    pub fn new(endpoint: String, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl RelationshipSuggester for HttpSuggester {
    async fn suggest(&self, summary: &GraphSummary) -> Result<Vec<SuggestedRelationship>> {
        let body = serde_json::to_vec(summary)?;
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.endpoint))?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        parse_suggestions(&bytes)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_bare_and_wrapped_payloads() {
        let bare = br#"[{"source_id":"a","target_id":"b","relation_type":"supports"}]"#;
        let wrapped = br#"{"suggestions":[{"source_id":"a","target_id":"b","relation_type":"supports","strength":40}]}"#;
        assert_eq!(parse_suggestions(bare).unwrap().len(), 1);
        assert_eq!(parse_suggestions(wrapped).unwrap()[0].strength, 40.0);
        assert!(parse_suggestions(b"{\"nope\":1}").is_err());
    }

    #[tokio::test]
    async fn file_suggester_reports_missing_files() {
        let suggester = FileSuggester::new(PathBuf::from("/definitely/not/here.json"));
        let err = suggester
            .suggest(&GraphSummary {
                nodes: Vec::new(),
                edges: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read suggestions"));
    }
}
