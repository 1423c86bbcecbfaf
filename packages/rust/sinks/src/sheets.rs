//! Spreadsheet sink: posts flattened lead rows to a webhook (e.g. a Google
//! Apps Script deployment) as `{"action": "addLeads", "data": [...]}`.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use prospector_shared::{LeadRecord, ProspectorError, Result, USER_AGENT};

/// One spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub company_name: String,
    pub website: String,
    pub employee_count: Option<u32>,
    pub industry: String,
    pub location: String,
    pub business_summary: String,
    /// Comma-joined category names, e.g. `Workstations, Servers`.
    pub hardware_opportunities: String,
    pub decision_maker_hint: String,
    pub contact_emails: String,
    /// Comma-joined `Name (Role)` labels.
    pub decision_makers: String,
    pub message_subject: String,
    pub message_body: String,
    pub generated_at: String,
}

impl From<&LeadRecord> for SheetRow {
    fn from(lead: &LeadRecord) -> Self {
        let company = &lead.company;
        let insights = &lead.insights;

        Self {
            company_name: company.name.clone(),
            website: company.website.clone().unwrap_or_default(),
            employee_count: company.employee_count,
            industry: company.industry.clone().unwrap_or_default(),
            location: company.location.clone().unwrap_or_default(),
            business_summary: insights.business_summary.clone(),
            hardware_opportunities: insights.hardware_opportunity.labels().join(", "),
            decision_maker_hint: insights.decision_maker_hint.clone(),
            contact_emails: lead
                .contacts
                .iter()
                .map(|c| c.email.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            decision_makers: lead
                .contacts
                .iter()
                .filter_map(|c| c.decision_maker_label())
                .collect::<Vec<_>>()
                .join(", "),
            message_subject: lead.message.subject.clone(),
            message_body: lead.message.body.clone(),
            generated_at: lead.generated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AddLeads<'a> {
    action: &'static str,
    data: &'a [SheetRow],
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Webhook client for the spreadsheet sink.
pub struct SheetsSink {
    client: Client,
    endpoint: String,
}

impl SheetsSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProspectorError::Sink(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Append `leads` to the sheet in a single request. Returns rows sent.
    #[instrument(skip_all, fields(leads = leads.len()))]
    pub async fn push(&self, leads: &[LeadRecord]) -> Result<usize> {
        if leads.is_empty() {
            info!("no leads to send to spreadsheet");
            return Ok(0);
        }

        let rows: Vec<SheetRow> = leads.iter().map(SheetRow::from).collect();
        let payload = AddLeads {
            action: "addLeads",
            data: &rows,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProspectorError::Sink(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProspectorError::Sink(format!("failed to read reply: {e}")))?;

        if status != reqwest::StatusCode::OK {
            return Err(ProspectorError::Sink(format!(
                "spreadsheet endpoint returned HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let reply: WebhookReply = serde_json::from_str(&body).map_err(|e| {
            ProspectorError::Sink(format!("spreadsheet reply is not JSON: {e}"))
        })?;
        if !reply.success {
            return Err(ProspectorError::Sink(format!(
                "spreadsheet endpoint rejected leads: {}",
                reply.message.as_deref().unwrap_or("unknown error")
            )));
        }

        info!(rows = rows.len(), "leads added to spreadsheet");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use prospector_shared::{
        CompanyCandidate, ContactRecord, ContactSource, DegradedFlags, HardwareOpportunities,
        OutreachMessage, WebsiteInsights,
    };
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn contact(email: &str, name: &str, role: Option<&str>) -> ContactRecord {
        ContactRecord {
            email: email.into(),
            name: name.into(),
            role: role.map(String::from),
            confidence: 90,
            verification: None,
            source: ContactSource::ContactLookup,
        }
    }

    fn lead() -> LeadRecord {
        LeadRecord {
            company: CompanyCandidate {
                name: "Acme Systems".into(),
                website: Some("https://acme.in".into()),
                employee_count: Some(320),
                industry: Some("industrial automation".into()),
                location: Some("Pune, India".into()),
            },
            insights: WebsiteInsights {
                hardware_opportunity: HardwareOpportunities {
                    workstations: true,
                    networking: true,
                    ..Default::default()
                },
                ..WebsiteInsights::fallback()
            },
            contacts: vec![
                contact("asha@acme.in", "Asha Rao", Some("CTO")),
                contact("ops@acme.in", "", Some("Operations")),
                contact("info@acme.in", "", None),
            ],
            message: OutreachMessage {
                subject: "Hardware for Acme".into(),
                body: "Hello Asha,".into(),
                generated_at: Utc::now(),
            },
            generated_at: Utc::now(),
            degraded: DegradedFlags::default(),
        }
    }

    fn sink(server: &MockServer) -> SheetsSink {
        SheetsSink::new(format!("{}/exec", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn row_flattens_lead() {
        let row = SheetRow::from(&lead());
        assert_eq!(row.company_name, "Acme Systems");
        assert_eq!(row.hardware_opportunities, "Workstations, Networking");
        assert_eq!(row.contact_emails, "asha@acme.in, ops@acme.in, info@acme.in");
        assert_eq!(row.decision_makers, "Asha Rao (CTO), Operations");
        assert_eq!(row.message_subject, "Hardware for Acme");
    }

    #[tokio::test]
    async fn push_posts_add_leads() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/exec"))
            .and(header("user-agent", USER_AGENT))
            .and(body_partial_json(serde_json::json!({
                "action": "addLeads",
                "data": [{ "company_name": "Acme Systems", "employee_count": 320 }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "Added 1 leads"
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(sink(&server).push(&[lead()]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_reply_is_sink_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "message": "sheet not found"
            })))
            .mount(&server)
            .await;

        let err = sink(&server).push(&[lead()]).await.unwrap_err();
        assert!(matches!(err, ProspectorError::Sink(_)));
        assert!(err.to_string().contains("sheet not found"));
    }

    #[tokio::test]
    async fn non_200_is_sink_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("script error"))
            .mount(&server)
            .await;

        let err = sink(&server).push(&[lead()]).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert_eq!(sink(&server).push(&[]).await.unwrap(), 0);
    }
}
