//! Website insights: fetch the landing page, reduce it to text, and ask the
//! chat model for a structured read on the business.
//!
//! Unusable model output degrades to [`WebsiteInsights::fallback`] as an
//! [`InsightsOutcome::Fallback`]. Transport failures of the model call are
//! returned as errors so the pipeline can retry them. The page fetch itself
//! is best effort: when it fails the model only sees the URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use prospector_shared::{
    HardwareOpportunities, InsightsOutcome, LlmConfig, ProspectorError, Result, SizeIndicator,
    WebsiteInsights,
};

use crate::InsightsProvider;
use crate::http::{build_client, send};
use crate::llm::{ChatClient, extract_json};

const PAGE_PROVIDER: &str = "website";

/// Elements whose text never reaches the model.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "svg", "template", "nav", "footer"];

const MAX_REPLY_TOKENS: u32 = 800;

const SYSTEM_PROMPT: &str = "You are a B2B sales analyst for a computer hardware reseller. \
Give concise, actionable insights for sales outreach. Reply with valid JSON only.";

// ---------------------------------------------------------------------------
// Page text
// ---------------------------------------------------------------------------

/// Visible text of an HTML document with whitespace collapsed, truncated to
/// `max_chars` characters (plus `...` when cut).
pub fn page_text(html: &str, max_chars: usize) -> String {
    let doc = Html::parse_document(html);

    let mut text = String::new();
    for node in doc.root_element().descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        for word in fragment.split_whitespace() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);
        }
    }

    truncate_chars(&text, max_chars)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn with_scheme(website: &str) -> String {
    let website = website.trim();
    if website.starts_with("http://") || website.starts_with("https://") {
        website.to_string()
    } else {
        format!("https://{website}")
    }
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawInsights {
    #[serde(default)]
    business_summary: String,
    #[serde(default, alias = "size_indicator")]
    company_size_indicator: String,
    #[serde(default)]
    key_insights: Vec<String>,
    #[serde(default)]
    hardware_opportunity: HardwareOpportunities,
    #[serde(default)]
    decision_maker_hint: String,
    #[serde(default)]
    personalization_hook: String,
}

/// Validate a model reply into insights.
pub fn parse_insights(reply: &str) -> Result<WebsiteInsights> {
    let json = extract_json(reply)
        .ok_or_else(|| ProspectorError::parse("insights reply contains no JSON object"))?;

    let raw: RawInsights = serde_json::from_str(json)
        .map_err(|e| ProspectorError::parse(format!("insights reply does not match schema: {e}")))?;

    let business_summary = raw.business_summary.trim().to_string();
    if business_summary.is_empty() {
        return Err(ProspectorError::parse("insights reply has an empty business_summary"));
    }

    let key_insights = raw
        .key_insights
        .into_iter()
        .map(|insight| insight.trim().to_string())
        .filter(|insight| !insight.is_empty())
        .take(WebsiteInsights::MAX_KEY_INSIGHTS)
        .collect();

    Ok(WebsiteInsights {
        business_summary,
        size_indicator: SizeIndicator::from_label(&raw.company_size_indicator),
        key_insights,
        hardware_opportunity: raw.hardware_opportunity,
        decision_maker_hint: raw.decision_maker_hint.trim().to_string(),
        personalization_hook: raw.personalization_hook.trim().to_string(),
    })
}

fn user_prompt(url: &str, content: &str) -> String {
    let content = if content.is_empty() {
        "(page content unavailable; infer what you can from the domain)"
    } else {
        content
    };

    format!(
        r#"Analyze this company website for B2B hardware sales opportunities.

Website: {url}
Content: {content}

Return exactly this JSON shape:
{{
  "business_summary": "one sentence on what the company does",
  "company_size_indicator": "small | medium | large",
  "key_insights": ["2-3 specific insights useful for a personalized hardware pitch: growth signals, tech challenges, office setup, team size"],
  "hardware_opportunity": {{
    "workstations": true,
    "servers": false,
    "networking": false,
    "storage": false,
    "peripherals": false
  }},
  "decision_maker_hint": "who likely makes IT purchasing decisions (IT Manager, CTO, Operations, ...)",
  "personalization_hook": "one specific detail for a personalized opener"
}}

Return only the JSON object."#
    )
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Insights collaborator backed by a chat model.
pub struct LlmInsights {
    chat: ChatClient,
    page_client: Client,
    temperature: f32,
    max_page_chars: usize,
}

impl LlmInsights {
    pub fn new(chat: ChatClient, config: &LlmConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            chat,
            page_client: build_client(PAGE_PROVIDER, timeout)?,
            temperature: config.insights_temperature,
            max_page_chars: config.max_page_chars,
        })
    }

    async fn fetch_page_text(&self, url: &str) -> Result<String> {
        let response = send(PAGE_PROVIDER, self.page_client.get(url)).await?;
        let html = response.text().await.map_err(|e| {
            ProspectorError::network(PAGE_PROVIDER, format!("failed to read page: {e}"))
        })?;
        Ok(page_text(&html, self.max_page_chars))
    }
}

#[async_trait]
impl InsightsProvider for LlmInsights {
    #[instrument(skip_all, fields(website = %website))]
    async fn analyze(&self, website: &str) -> Result<InsightsOutcome> {
        let url = with_scheme(website);

        let content = match self.fetch_page_text(&url).await {
            Ok(text) => {
                debug!(chars = text.chars().count(), "page text extracted");
                text
            }
            Err(e) => {
                warn!(error = %e, "page fetch failed, analyzing from URL only");
                String::new()
            }
        };

        let reply = self
            .chat
            .complete(
                SYSTEM_PROMPT,
                &user_prompt(&url, &content),
                self.temperature,
                MAX_REPLY_TOKENS,
            )
            .await;

        match reply.and_then(|reply| parse_insights(&reply)) {
            Ok(insights) => Ok(InsightsOutcome::Parsed(insights)),
            Err(e @ ProspectorError::Parse { .. }) => {
                warn!(error = %e, "unusable insights reply, using fallback");
                Ok(InsightsOutcome::Fallback {
                    insights: WebsiteInsights::fallback(),
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}
