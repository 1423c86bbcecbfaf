//! Company discovery via an Apollo-style organization search API.
//!
//! `POST {base}/organizations/search` with the API key in `x-api-key`.
//! Results are paged; the adapter keeps requesting pages until the caller's
//! limit is met, the provider reports no more pages, or [`MAX_PAGES`] is hit.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use prospector_shared::{ApolloConfig, CompanyCandidate, ProspectorError, Result, SearchCriteria};

use crate::CompanyDiscovery;
use crate::http::{build_client, read_json, send};

const PROVIDER: &str = "apollo";

/// Hard ceiling on pages fetched per discovery call.
const MAX_PAGES: u32 = 10;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    organization_num_employees_ranges: Vec<String>,
    q_organization_keyword_tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    organization_locations: Option<Vec<&'a str>>,
    page: u32,
    per_page: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organizations: Option<Vec<Organization>>,
    #[serde(default)]
    pagination: Option<Pagination>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Organization {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    website_url: Option<String>,
    #[serde(default)]
    estimated_num_employees: Option<u64>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    total_pages: Option<u32>,
}

impl Organization {
    /// Convert to a candidate; `None` when the record has no usable name.
    fn into_candidate(self) -> Option<CompanyCandidate> {
        let name = self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;

        let location = [self.city, self.state, self.country]
            .into_iter()
            .flatten()
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Some(CompanyCandidate {
            name,
            website: non_blank(self.website_url),
            employee_count: self
                .estimated_num_employees
                .and_then(|n| u32::try_from(n).ok()),
            industry: non_blank(self.industry),
            location: (!location.is_empty()).then_some(location),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Organization search client.
pub struct ApolloDiscovery {
    client: Client,
    base_url: String,
    api_key: String,
    per_page: u32,
}

impl ApolloDiscovery {
    pub fn new(config: &ApolloConfig, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(PROVIDER, timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            per_page: config.per_page.max(1),
        })
    }

    async fn fetch_page(&self, criteria: &SearchCriteria, page: u32) -> Result<SearchResponse> {
        let body = SearchRequest {
            organization_num_employees_ranges: vec![format!(
                "{},{}",
                criteria.size.min, criteria.size.max
            )],
            q_organization_keyword_tags: &criteria.keywords,
            organization_locations: criteria.location.as_deref().map(|l| vec![l]),
            page,
            per_page: self.per_page,
        };

        debug!(page, per_page = self.per_page, "requesting organization page");

        let request = self
            .client
            .post(format!("{}/organizations/search", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&body);

        let response = send(PROVIDER, request).await?;
        read_json(PROVIDER, response).await
    }
}

#[async_trait]
impl CompanyDiscovery for ApolloDiscovery {
    #[instrument(skip_all, fields(size = %criteria.size, limit = limit))]
    async fn discover(
        &self,
        criteria: &SearchCriteria,
        limit: usize,
    ) -> Result<Vec<CompanyCandidate>> {
        let mut candidates = Vec::new();
        // Duplicates stay in the result; the limit counts distinct companies.
        let mut unique = HashSet::new();
        let mut page = 1;

        loop {
            let response = self.fetch_page(criteria, page).await?;

            let organizations = response.organizations.ok_or_else(|| {
                ProspectorError::parse(format!(
                    "{PROVIDER}: {}",
                    response
                        .error
                        .as_deref()
                        .unwrap_or("response has no 'organizations' field")
                ))
            })?;

            let received = organizations.len();
            for org in organizations {
                match org.into_candidate() {
                    Some(candidate) => {
                        unique.insert(candidate.identity_key());
                        candidates.push(candidate);
                    }
                    None => warn!(page, "skipping organization without a name"),
                }
            }

            let total_pages = response
                .pagination
                .and_then(|p| p.total_pages)
                .unwrap_or(page);

            if received == 0
                || unique.len() >= limit
                || page >= total_pages
                || page >= MAX_PAGES
            {
                break;
            }
            page += 1;
        }

        info!(
            found = candidates.len(),
            unique = unique.len(),
            pages = page,
            "organization search complete"
        );
        Ok(candidates)
    }
}
