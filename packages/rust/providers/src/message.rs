//! Outreach drafting with a chat model, plus the template used when the
//! model's reply cannot be used.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{instrument, warn};

use prospector_shared::{
    HardwareOpportunities, LlmConfig, MessageOutcome, OutreachConfig, OutreachMessage,
    ProspectorError, Result,
};

use crate::llm::{ChatClient, extract_json};
use crate::{MessageRequest, MessageWriter, Recipient};

const MAX_REPLY_TOKENS: u32 = 700;

const SYSTEM_PROMPT: &str = "You are a B2B sales copywriter for a computer hardware reseller. \
Write personalized, professional outreach emails that build relationships. \
Reply with valid JSON only.";

/// Email sections requested from the model, in body order.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default, alias = "subject")]
    subject_line: String,
    #[serde(default)]
    greeting: String,
    #[serde(default)]
    opening: String,
    #[serde(default)]
    value_proposition: String,
    #[serde(default)]
    specific_offer: String,
    #[serde(default)]
    call_to_action: String,
    #[serde(default)]
    closing: String,
}

impl RawMessage {
    fn paragraphs(&self) -> [&str; 6] {
        [
            self.greeting.as_str(),
            self.opening.as_str(),
            self.value_proposition.as_str(),
            self.specific_offer.as_str(),
            self.call_to_action.as_str(),
            self.closing.as_str(),
        ]
    }
}

/// Readable list of hardware needs for prompts and templates.
pub fn hardware_summary(hardware: &HardwareOpportunities) -> String {
    let needs: Vec<&str> = [
        (hardware.workstations, "desktop computers/workstations"),
        (hardware.servers, "servers"),
        (hardware.networking, "networking equipment"),
        (hardware.storage, "storage solutions"),
        (hardware.peripherals, "peripherals"),
    ]
    .into_iter()
    .filter_map(|(flag, label)| flag.then_some(label))
    .collect();

    if needs.is_empty() {
        "general IT hardware needs".to_string()
    } else {
        needs.join(", ")
    }
}

fn signature(sender: &OutreachConfig) -> String {
    let mut lines = vec!["Best regards,".to_string()];
    lines.extend(
        [
            &sender.sender_name,
            &sender.sender_title,
            &sender.sender_company,
            &sender.sender_contact,
        ]
        .into_iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(String::from),
    );
    lines.join("\n")
}

/// Join non-empty paragraphs and the signature with blank lines.
fn compose_body<'a>(paragraphs: impl IntoIterator<Item = &'a str>, sender: &OutreachConfig) -> String {
    let mut blocks: Vec<String> = paragraphs
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect();
    blocks.push(signature(sender));
    blocks.join("\n\n")
}

/// Who the greeting names: a contact's first name, their role, or the hint.
fn addressee(recipient: Recipient<'_>) -> Option<String> {
    match recipient {
        Recipient::Contact(contact) => contact
            .name
            .split_whitespace()
            .next()
            .map(String::from)
            .or_else(|| contact.role.clone())
            .filter(|s| !s.trim().is_empty()),
        Recipient::RoleHint(hint) => {
            let hint = hint.trim();
            (!hint.is_empty()).then(|| hint.to_string())
        }
    }
}

/// Template message used when generation output is unusable.
pub fn fallback_message(request: &MessageRequest<'_>, sender: &OutreachConfig) -> OutreachMessage {
    let company = request.company;
    let name = company.name.as_str();
    let industry = company.industry.as_deref().unwrap_or("your industry");
    let greeting = format!(
        "Hello {},",
        addressee(request.recipient).unwrap_or_else(|| "there".into())
    );
    let opening = format!("I came across {name} and was impressed by your work in {industry}.");
    let offer = format!(
        "We help businesses like yours with {} at competitive prices.",
        hardware_summary(&request.insights.hardware_opportunity)
    );

    let body = compose_body(
        [
            greeting.as_str(),
            opening.as_str(),
            "As a growing business, reliable IT infrastructure is crucial for your continued success.",
            offer.as_str(),
            "Would you be open to a brief 15-minute call to discuss your current IT needs?",
            "I'd love to learn more about your business and see how we can support your technology requirements.",
        ],
        sender,
    );

    OutreachMessage {
        subject: format!("Hardware Solutions for {name}"),
        body,
        generated_at: Utc::now(),
    }
}

/// Validate a model reply into a message.
fn parse_message(reply: &str, sender: &OutreachConfig) -> Result<OutreachMessage> {
    let json = extract_json(reply)
        .ok_or_else(|| ProspectorError::parse("message reply contains no JSON object"))?;

    let raw: RawMessage = serde_json::from_str(json)
        .map_err(|e| ProspectorError::parse(format!("message reply does not match schema: {e}")))?;

    let subject = raw.subject_line.trim();
    if subject.is_empty() {
        return Err(ProspectorError::parse("message reply has an empty subject_line"));
    }
    if raw.paragraphs()[1..].iter().all(|p| p.trim().is_empty()) {
        return Err(ProspectorError::parse("message reply has no body text"));
    }

    Ok(OutreachMessage {
        subject: subject.to_string(),
        body: compose_body(raw.paragraphs(), sender),
        generated_at: Utc::now(),
    })
}

fn user_prompt(request: &MessageRequest<'_>) -> String {
    let company = request.company;
    let insights = request.insights;
    let unknown = "unknown";

    let recipient = match request.recipient {
        Recipient::Contact(contact) => contact
            .decision_maker_label()
            .unwrap_or_else(|| contact.email.clone()),
        Recipient::RoleHint(hint) => format!("not yet identified; likely role: {hint}"),
    };

    format!(
        r#"Write a personalized B2B outreach email from a computer hardware reseller.

COMPANY:
- Name: {name}
- Industry: {industry}
- Size: {employees} employees ({size})
- Website: {website}
- Location: {location}

INSIGHTS:
- What they do: {summary}
- Key insights: {key_insights}
- Recipient: {recipient}
- Personalization hook: {hook}
- Hardware opportunities: {hardware}

Return this JSON shape:
{{
  "subject_line": "subject that references their business (max 60 chars)",
  "greeting": "personalized greeting for the recipient",
  "opening": "opening that shows you researched them",
  "value_proposition": "how hardware solutions address their situation",
  "specific_offer": "concrete hardware solutions for their needs",
  "call_to_action": "low-pressure next step (consultation, demo, quote)",
  "closing": "professional closing line"
}}

Keep it under 200 words, specific to this business, friendly and not pushy.
Do not include a signature. Return only the JSON object."#,
        name = company.name,
        industry = company.industry.as_deref().unwrap_or(unknown),
        employees = company
            .employee_count
            .map_or_else(|| unknown.to_string(), |n| n.to_string()),
        size = insights.size_indicator.as_str(),
        website = company.website.as_deref().unwrap_or(unknown),
        location = company.location.as_deref().unwrap_or(unknown),
        summary = insights.business_summary,
        key_insights = insights.key_insights.join("; "),
        hook = insights.personalization_hook,
        hardware = hardware_summary(&insights.hardware_opportunity),
    )
}

/// Message collaborator backed by a chat model.
pub struct LlmMessageWriter {
    chat: ChatClient,
    temperature: f32,
    sender: OutreachConfig,
}

impl LlmMessageWriter {
    pub fn new(chat: ChatClient, llm: &LlmConfig, sender: OutreachConfig) -> Self {
        Self {
            chat,
            temperature: llm.message_temperature,
            sender,
        }
    }
}

#[async_trait]
impl MessageWriter for LlmMessageWriter {
    #[instrument(skip_all, fields(company = %request.company.name))]
    async fn write_message(&self, request: &MessageRequest<'_>) -> Result<MessageOutcome> {
        let reply = self
            .chat
            .complete(
                SYSTEM_PROMPT,
                &user_prompt(request),
                self.temperature,
                MAX_REPLY_TOKENS,
            )
            .await;

        match reply.and_then(|reply| parse_message(&reply, &self.sender)) {
            Ok(message) => Ok(MessageOutcome::Generated(message)),
            Err(e @ ProspectorError::Parse { .. }) => {
                warn!(error = %e, "unusable message reply, using template");
                Ok(MessageOutcome::Fallback {
                    message: fallback_message(request, &self.sender),
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use prospector_shared::{CompanyCandidate, ContactRecord, ContactSource, WebsiteInsights};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn company() -> CompanyCandidate {
        CompanyCandidate {
            name: "Acme Systems".into(),
            website: Some("https://acme.in".into()),
            employee_count: Some(320),
            industry: Some("industrial automation".into()),
            location: Some("Pune, India".into()),
        }
    }

    fn contact() -> ContactRecord {
        ContactRecord {
            email: "asha@acme.in".into(),
            name: "Asha Rao".into(),
            role: Some("CTO".into()),
            confidence: 94,
            verification: None,
            source: ContactSource::ContactLookup,
        }
    }

    fn sender() -> OutreachConfig {
        OutreachConfig {
            sender_name: "Jay".into(),
            sender_title: "Account Manager".into(),
            sender_company: "NewTech".into(),
            sender_contact: String::new(),
        }
    }

    fn writer(server: &MockServer) -> LlmMessageWriter {
        let config = LlmConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        let chat = ChatClient::new(&config, "sk-test", Duration::from_secs(5)).unwrap();
        LlmMessageWriter::new(chat, &config, sender())
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn hardware_summary_lists_needs() {
        let hw = HardwareOpportunities {
            servers: true,
            storage: true,
            ..Default::default()
        };
        assert_eq!(hardware_summary(&hw), "servers, storage solutions");
        assert_eq!(
            hardware_summary(&HardwareOpportunities::default()),
            "general IT hardware needs"
        );
    }

    #[test]
    fn fallback_addresses_role_hint() {
        let company = company();
        let insights = WebsiteInsights::fallback();
        let request = MessageRequest {
            company: &company,
            insights: &insights,
            recipient: Recipient::RoleHint("IT Manager"),
        };

        let message = fallback_message(&request, &sender());
        assert_eq!(message.subject, "Hardware Solutions for Acme Systems");
        assert!(message.body.starts_with("Hello IT Manager,"));
        assert!(message.body.contains("your work in industrial automation"));
        assert!(message.body.ends_with("Best regards,\nJay\nAccount Manager\nNewTech"));
    }

    #[test]
    fn fallback_without_any_name_says_there() {
        let company = company();
        let insights = WebsiteInsights::fallback();
        let request = MessageRequest {
            company: &company,
            insights: &insights,
            recipient: Recipient::RoleHint("  "),
        };
        assert!(fallback_message(&request, &sender()).body.starts_with("Hello there,"));
    }

    #[test]
    fn parse_requires_subject_and_body() {
        let sender = sender();
        assert!(parse_message(r#"{"subject_line": "", "opening": "x"}"#, &sender).is_err());
        assert!(parse_message(r#"{"subject_line": "Hi", "greeting": "Hello"}"#, &sender).is_err());

        let message = parse_message(
            r#"{"subject_line": " Hi ", "greeting": "Hello Asha,", "opening": "Congrats.", "closing": ""}"#,
            &sender,
        )
        .unwrap();
        assert_eq!(message.subject, "Hi");
        assert!(message.body.starts_with("Hello Asha,\n\nCongrats.\n\nBest regards,"));
    }

    #[tokio::test]
    async fn write_message_generates_from_reply() {
        let server = MockServer::start().await;

        let reply = r#"```json
{
  "subject_line": "Scaling Acme's Pune office",
  "greeting": "Hi Asha,",
  "opening": "Congratulations on the new Pune office.",
  "value_proposition": "Fast provisioning keeps new hires productive.",
  "specific_offer": "Pre-imaged workstations and rack servers.",
  "call_to_action": "Open to a quick call next week?",
  "closing": "Thanks for your time."
}
```"#;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Asha Rao (CTO)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(reply)))
            .expect(1)
            .mount(&server)
            .await;

        let company = company();
        let contact = contact();
        let insights = WebsiteInsights::fallback();
        let request = MessageRequest {
            company: &company,
            insights: &insights,
            recipient: Recipient::Contact(&contact),
        };

        let outcome = writer(&server).write_message(&request).await.unwrap();
        assert!(!outcome.is_fallback());
        let message = outcome.into_message();
        assert_eq!(message.subject, "Scaling Acme's Pune office");
        assert!(message.body.contains("Pre-imaged workstations"));
        assert!(message.body.ends_with("NewTech"));
    }

    #[tokio::test]
    async fn garbage_reply_uses_template() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("{oops")))
            .mount(&server)
            .await;

        let company = company();
        let contact = contact();
        let insights = WebsiteInsights::fallback();
        let request = MessageRequest {
            company: &company,
            insights: &insights,
            recipient: Recipient::Contact(&contact),
        };

        let outcome = writer(&server).write_message(&request).await.unwrap();
        assert!(outcome.is_fallback());
        let message = outcome.into_message();
        assert_eq!(message.subject, "Hardware Solutions for Acme Systems");
        assert!(message.body.starts_with("Hello Asha,"));
    }

    #[tokio::test]
    async fn empty_reply_uses_template() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("   ")))
            .mount(&server)
            .await;

        let company = company();
        let insights = WebsiteInsights::fallback();
        let request = MessageRequest {
            company: &company,
            insights: &insights,
            recipient: Recipient::RoleHint("IT Manager"),
        };

        let outcome = writer(&server).write_message(&request).await.unwrap();
        assert!(outcome.is_fallback());
        assert!(outcome.into_message().body.starts_with("Hello IT Manager,"));
    }

    #[tokio::test]
    async fn model_outage_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let company = company();
        let insights = WebsiteInsights::fallback();
        let request = MessageRequest {
            company: &company,
            insights: &insights,
            recipient: Recipient::RoleHint("IT Manager"),
        };

        let err = writer(&server).write_message(&request).await.unwrap_err();
        assert!(err.is_transient());
    }
}
