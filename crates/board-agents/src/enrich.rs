//! HTTP enrichment: website text, instant-answer search, image description.
//!
//! Every method returns readable text. Failures are reported inline so the
//! moderator can summarize them like any other material.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use deliberation::text::truncate_chars;
use deliberation::Enricher;
use scraper::{Html, Node};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{BoardConfig, VisionConfig};

/// Characters of page text kept after stripping markup.
pub const PAGE_TEXT_CHARS: usize = 4000;

/// Related topics listed after the abstract.
const SEARCH_RESULTS: usize = 3;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const IMAGE_PROMPT: &str = "Analyze this image in detail in the context of a business meeting. \
     What do you see? (Office layout, product, chart, etc.)";

/// Elements whose text never reaches the moderator.
const NON_CONTENT: [&str; 6] = ["script", "style", "nav", "footer", "header", "noscript"];

fn is_non_content(node: &Node) -> bool {
    match node {
        Node::Element(el) => NON_CONTENT.contains(&el.name()),
        _ => false,
    }
}

/// Visible page text, one phrase per line.
///
/// Entities are decoded by the parser; comments and non-content elements
/// are dropped, and runs of two spaces split a line into phrases.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) if !node.ancestors().any(|a| is_non_content(a.value())) => Some(&**text),
            _ => None,
        })
        .flat_map(str::lines)
        .flat_map(|line| line.trim().split("  "))
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bare domains get an `https://` scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InstantAnswer {
    #[serde(rename = "Heading")]
    heading: String,
    #[serde(rename = "AbstractText")]
    abstract_text: String,
    #[serde(rename = "Answer")]
    answer: String,
    #[serde(rename = "RelatedTopics")]
    related_topics: Vec<RelatedTopic>,
}

/// Either a topic with text or a named group of nested topics.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: String,
    #[serde(rename = "Topics")]
    topics: Vec<RelatedTopic>,
}

impl RelatedTopic {
    fn texts<'a>(&'a self, out: &mut Vec<&'a str>) {
        if !self.text.trim().is_empty() {
            out.push(self.text.trim());
        }
        for topic in &self.topics {
            topic.texts(out);
        }
    }
}

fn format_instant_answer(answer: &InstantAnswer) -> String {
    let mut lines = Vec::new();
    if !answer.abstract_text.trim().is_empty() {
        let heading = if answer.heading.trim().is_empty() {
            "Summary"
        } else {
            answer.heading.trim()
        };
        lines.push(format!("- {}: {}", heading, answer.abstract_text.trim()));
    }
    if !answer.answer.trim().is_empty() {
        lines.push(format!("- Answer: {}", answer.answer.trim()));
    }

    let mut related = Vec::new();
    for topic in &answer.related_topics {
        topic.texts(&mut related);
    }
    for text in related.into_iter().take(SEARCH_RESULTS) {
        lines.push(format!("- {}", text));
    }

    if lines.is_empty() {
        "No current information found online.".to_string()
    } else {
        format!("CURRENT WEB RESULTS:\n{}", lines.join("\n"))
    }
}

fn vision_content(body: &serde_json::Value) -> Option<String> {
    body.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// Enricher over plain HTTP.
pub struct HttpEnricher {
    http: reqwest::Client,
    search_url: String,
    vision: VisionConfig,
}

impl HttpEnricher {
    pub fn new(http: reqwest::Client, search_url: impl Into<String>, vision: VisionConfig) -> Self {
        Self {
            http,
            search_url: search_url.into(),
            vision,
        }
    }

    pub fn from_config(config: &BoardConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("Failed to build HTTP client for enrichment")?;
        Ok(Self::new(http, config.search_url.clone(), config.vision.clone()))
    }

    async fn get_text(&self, url: &str) -> Result<String, reqwest::Error> {
        self.http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    async fn search(&self, query: &str) -> Result<InstantAnswer, reqwest::Error> {
        self.http
            .get(&self.search_url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<InstantAnswer>()
            .await
    }

    async fn vision_request(&self, api_key: &str, image_base64: &str) -> Result<serde_json::Value, reqwest::Error> {
        let url = format!("{}/chat/completions", self.vision.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.vision.model,
            "max_tokens": self.vision.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": IMAGE_PROMPT },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{}", image_base64) }
                    }
                ]
            }]
        });

        self.http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl Enricher for HttpEnricher {
    async fn describe_image(&self, image_base64: &str) -> String {
        let Some(api_key) = self.vision.api_key() else {
            warn!("vision API key missing, skipping image analysis");
            return "Could not analyze image: no API key configured".to_string();
        };
        match self.vision_request(&api_key, image_base64).await {
            Ok(body) => vision_content(&body)
                .unwrap_or_else(|| "Could not analyze image: empty response".to_string()),
            Err(e) => {
                warn!(error = %e, "image analysis failed");
                format!("Could not analyze image: {}", e)
            }
        }
    }

    async fn fetch_website(&self, url: &str) -> String {
        let url = normalize_url(url);
        match self.get_text(&url).await {
            Ok(html) => {
                let text = html_to_text(&html);
                debug!(url = %url, chars = text.len(), "website fetched");
                truncate_chars(&text, PAGE_TEXT_CHARS).to_string()
            }
            Err(e) => {
                warn!(url = %url, error = %e, "website fetch failed");
                format!("Could not read website: {}", e)
            }
        }
    }

    async fn web_search(&self, query: &str) -> String {
        match self.search(query).await {
            Ok(answer) => format_instant_answer(&answer),
            Err(e) => {
                warn!(query = %query, error = %e, "web search failed");
                format!("Web search failed: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_drops_non_content() {
        let html = r#"<html><head><style>body { color: red; }</style>
            <script type="text/javascript">var x = "<b>";</script></head>
            <body><header>Menu  Login</header>
            <h1>Acme   Logistics</h1><p>Warehousing &amp; freight since 1998.</p>
            <!-- tracking pixel --><footer>© Acme</footer></body></html>"#;
        assert_eq!(
            html_to_text(html),
            "Acme\nLogistics\nWarehousing & freight since 1998."
        );
    }

    #[test]
    fn test_html_to_text_decodes_entities() {
        let html = "<p>Caf&eacute; d&rsquo;Acme &#8217;98 &lt;est.&gt;</p>\
                    <a title=\"<b>not text</b>\" href=\"/\">Contact&nbsp;us</a>";
        assert_eq!(html_to_text(html), "Café d’Acme ’98 <est.>\nContact\u{a0}us");
    }

    #[test]
    fn test_html_to_text_malformed_markup() {
        let text = html_to_text("<div><p>Unclosed paragraph<b>Bold text</div><nav>Home");
        assert_eq!(text, "Unclosed paragraph\nBold text");
    }

    #[test]
    fn test_page_text_cut() {
        let html = format!("<p>{}</p>", "é".repeat(PAGE_TEXT_CHARS + 10));
        let text = html_to_text(&html);
        assert_eq!(truncate_chars(&text, PAGE_TEXT_CHARS).chars().count(), PAGE_TEXT_CHARS);
    }

    #[test]
    fn test_html_to_text_splits_double_spaces() {
        assert_eq!(html_to_text("<p>Fast  delivery   Low prices</p>"), "Fast\ndelivery\nLow prices");
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("acme.example"), "https://acme.example");
        assert_eq!(normalize_url(" http://acme.example "), "http://acme.example");
    }

    #[test]
    fn test_format_instant_answer() {
        let answer: InstantAnswer = serde_json::from_value(json!({
            "Heading": "Warehouse",
            "AbstractText": "A warehouse is a building for storing goods.",
            "RelatedTopics": [
                { "Text": "Distribution center - a warehouse for redistribution" },
                { "Name": "Types", "Topics": [
                    { "Text": "Cold storage" },
                    { "Text": "Bonded warehouse" },
                    { "Text": "Fulfillment center" }
                ]}
            ]
        }))
        .unwrap();
        let text = format_instant_answer(&answer);
        assert!(text.starts_with("CURRENT WEB RESULTS:\n- Warehouse: A warehouse"));
        assert!(text.contains("- Cold storage"));
        assert!(text.contains("- Bonded warehouse"));
        assert!(!text.contains("Fulfillment center"));
    }

    #[test]
    fn test_format_empty_answer() {
        assert_eq!(
            format_instant_answer(&InstantAnswer::default()),
            "No current information found online."
        );
    }

    #[test]
    fn test_vision_content() {
        let body = json!({ "choices": [{ "message": { "content": " An office floor plan. " } }] });
        assert_eq!(vision_content(&body).as_deref(), Some("An office floor plan."));
        assert_eq!(vision_content(&json!({ "choices": [] })), None);
    }

    #[tokio::test]
    async fn test_unreachable_site_is_readable_text() {
        let vision = VisionConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            model: "vision".to_string(),
            api_key_env: None,
            max_tokens: 300,
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let enricher = HttpEnricher::new(http, "http://127.0.0.1:9/", vision);

        assert!(enricher
            .fetch_website("http://127.0.0.1:9")
            .await
            .starts_with("Could not read website:"));
        assert!(enricher.web_search("warehouse").await.starts_with("Web search failed:"));
        assert_eq!(
            enricher.describe_image("aGVsbG8=").await,
            "Could not analyze image: no API key configured"
        );
    }
}
