//! Pre-debate enrichment seam.
//!
//! Implementations fetch raw material (image descriptions, website text,
//! search results). Failures come back as readable text, never as errors;
//! the engine only summarizes whatever it is handed.

use async_trait::async_trait;

use crate::agent::ChatMessage;
use crate::context::CompanyProfile;
use crate::text::truncate_chars;

/// Characters of raw website text sent for summarization.
pub const WEBSITE_INPUT_CHARS: usize = 2500;

/// Characters of raw search results sent for summarization.
pub const SEARCH_INPUT_CHARS: usize = 2000;

#[async_trait]
pub trait Enricher: Send + Sync {
    /// Describe a base64-encoded image in business terms.
    async fn describe_image(&self, image_base64: &str) -> String;

    /// Plain text of a web page.
    async fn fetch_website(&self, url: &str) -> String;

    /// Raw search results for a query.
    async fn web_search(&self, query: &str) -> String;

    /// Whether this enricher does anything at all.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Enricher that never runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

#[async_trait]
impl Enricher for NoopEnricher {
    async fn describe_image(&self, _image_base64: &str) -> String {
        String::new()
    }

    async fn fetch_website(&self, _url: &str) -> String {
        String::new()
    }

    async fn web_search(&self, _query: &str) -> String {
        String::new()
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

pub fn website_summary_prompt(raw: &str) -> String {
    format!(
        "Analyze this website and give a SHORT summary (max 5 bullet points).\n\n\
         RAW TEXT:\n{}\n\n\
         FORMAT (simple bullets, no markdown):\n\
         • Company: [name - industry]\n\
         • Business: [what they do in 1 sentence]\n\
         • Products: [top 3-5 products]\n\
         • Values: [key message/slogan]\n\
         • Target: [who they serve]\n\n\
         Keep it short and clean.",
        truncate_chars(raw, WEBSITE_INPUT_CHARS)
    )
}

/// Messages asking a debater to turn the topic into one search query.
pub fn search_query_messages(topic: &str, company: &CompanyProfile, date: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You are a search engine expert. TODAY'S DATE: {}. Analyze the discussion topic and \
             write the best web search query to find current concrete data (costs, statistics, \
             news, trends).\n\nRULES:\n1. Write only the query, nothing else.\n\
             2. Search in the language of the topic and include the year.",
            date
        )),
        ChatMessage::user(format!("Topic: {}\nCompany: {}", topic, company.headline())),
    ]
}

/// Strip quotes and whitespace a model wraps around a query.
pub fn clean_search_query(raw: &str) -> String {
    raw.replace('"', "").trim().to_string()
}

pub fn search_summary_prompt(topic: &str, raw: &str) -> String {
    format!(
        "Give a SHORT market research summary about: {}\n\n\
         SEARCH RESULTS:\n{}\n\n\
         FORMAT (max 4 bullet points, no markdown, each point short):\n\
         • Trends: [1-2 key trends]\n\
         • Stats: [any numbers found, or \"No data\"]\n\
         • News: [1-2 recent headlines if any]\n\
         • Recommendation: [1 sentence advice]\n\n\
         Filter out irrelevant info. If nothing useful was found, say \"No significant data found.\" \
         Stay under 100 words.",
        topic,
        truncate_chars(raw, SEARCH_INPUT_CHARS)
    )
}
