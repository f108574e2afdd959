//! Web search against the DuckDuckGo Instant Answers API (no key required).

use std::time::Duration;

use anyhow::{Result, anyhow};

pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<String> {
        let response = self
            .client
            .get("https://api.duckduckgo.com/")
            .timeout(Duration::from_secs(10))
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("search backend error ({status})"));
        }
        let body: serde_json::Value = response.json().await?;

        let mut lines: Vec<String> = Vec::new();
        if let Some(abstract_text) = body.get("AbstractText").and_then(|t| t.as_str()) {
            if !abstract_text.is_empty() {
                lines.push(abstract_text.to_string());
            }
        }
        if let Some(topics) = body.get("RelatedTopics").and_then(|t| t.as_array()) {
            for topic in topics {
                if lines.len() >= max_results {
                    break;
                }
                if let Some(text) = topic.get("Text").and_then(|t| t.as_str()) {
                    lines.push(format!("- {text}"));
                }
            }
        }

        if lines.is_empty() {
            Ok(format!("No results found for '{query}'."))
        } else {
            lines.truncate(max_results);
            Ok(lines.join("\n"))
        }
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}
