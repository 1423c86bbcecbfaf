//! Decision-maker lookup via a Hunter-style domain search API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use prospector_shared::{ContactRecord, ContactSource, HunterConfig, ProspectorError, Result};

use crate::ContactFinder;
use crate::http::{build_client, read_json, send};

const PROVIDER: &str = "hunter";

#[derive(Debug, Deserialize)]
struct DomainSearchResponse {
    #[serde(default)]
    data: Option<DomainData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct DomainData {
    #[serde(default)]
    emails: Vec<EmailEntry>,
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    confidence: Option<u32>,
    #[serde(default)]
    verification: Option<Verification>,
}

#[derive(Debug, Deserialize)]
struct Verification {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl EmailEntry {
    fn into_contact(self) -> Option<ContactRecord> {
        let email = self.value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;

        let name = [self.first_name, self.last_name]
            .into_iter()
            .flatten()
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Some(ContactRecord {
            email,
            name,
            role: self
                .position
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            confidence: self.confidence.unwrap_or(0).min(100) as u8,
            verification: self.verification.and_then(|v| v.status),
            source: ContactSource::ContactLookup,
        })
    }
}

/// Domain search client.
pub struct HunterContacts {
    client: Client,
    base_url: String,
    api_key: String,
    limit: u32,
}

impl HunterContacts {
    pub fn new(config: &HunterConfig, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            limit: config.limit.max(1),
        })
    }
}

#[async_trait]
impl ContactFinder for HunterContacts {
    #[instrument(skip_all, fields(%domain))]
    async fn find_contacts(&self, domain: &str) -> Result<Vec<ContactRecord>> {
        let limit = self.limit.to_string();
        let request = self
            .client
            .get(format!("{}/domain-search", self.base_url))
            .query(&[
                ("domain", domain),
                ("api_key", self.api_key.as_str()),
                ("limit", limit.as_str()),
            ]);

        let response = send(PROVIDER, request).await?;
        let parsed: DomainSearchResponse = read_json(PROVIDER, response).await?;

        if let Some(error) = parsed.errors.into_iter().next() {
            return Err(ProspectorError::parse(format!(
                "{PROVIDER}: {}: {}",
                error.id.as_deref().unwrap_or("error"),
                error.details.as_deref().unwrap_or("unspecified")
            )));
        }

        let contacts: Vec<ContactRecord> = parsed
            .data
            .unwrap_or_default()
            .emails
            .into_iter()
            .filter_map(EmailEntry::into_contact)
            .collect();

        debug!(count = contacts.len(), "contacts found");
        Ok(contacts)
    }
}
