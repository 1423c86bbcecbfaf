//! External data provider adapters for Prospector.
//!
//! Each collaborator is a stateless request/response adapter behind a trait,
//! so the enrichment pipeline can be driven by real HTTP providers or by
//! in-memory fakes:
//! - [`CompanyDiscovery`]: company search ([`ApolloDiscovery`])
//! - [`InsightsProvider`]: website analysis ([`LlmInsights`])
//! - [`ContactFinder`]: decision-maker lookup ([`HunterContacts`])
//! - [`MessageWriter`]: outreach drafting ([`LlmMessageWriter`])
//!
//! Adapters translate provider JSON into the canonical model in
//! `prospector-shared` and map provider failures into
//! [`ProspectorError`](prospector_shared::ProspectorError).
//! They never retry; the pipeline's retry policy wraps every call.

pub mod apollo;
pub mod hunter;
pub mod insights;
pub mod llm;
pub mod message;

mod http;

use async_trait::async_trait;

use prospector_shared::{
    CompanyCandidate, ContactRecord, InsightsOutcome, MessageOutcome, Result, SearchCriteria,
    WebsiteInsights,
};

pub use apollo::ApolloDiscovery;
pub use hunter::HunterContacts;
pub use insights::LlmInsights;
pub use llm::ChatClient;
pub use message::LlmMessageWriter;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Finds companies matching search criteria.
#[async_trait]
pub trait CompanyDiscovery: Send + Sync {
    /// Return candidates in provider order. `limit` is a hint: adapters page
    /// until at least that many raw records are collected or results run out.
    async fn discover(
        &self,
        criteria: &SearchCriteria,
        limit: usize,
    ) -> Result<Vec<CompanyCandidate>>;
}

/// Derives business insights from a company website.
#[async_trait]
pub trait InsightsProvider: Send + Sync {
    async fn analyze(&self, website: &str) -> Result<InsightsOutcome>;
}

/// Looks up decision-maker contacts for a domain.
#[async_trait]
pub trait ContactFinder: Send + Sync {
    async fn find_contacts(&self, domain: &str) -> Result<Vec<ContactRecord>>;
}

/// Drafts a personalized outreach message.
#[async_trait]
pub trait MessageWriter: Send + Sync {
    async fn write_message(&self, request: &MessageRequest<'_>) -> Result<MessageOutcome>;
}

// ---------------------------------------------------------------------------
// Message request
// ---------------------------------------------------------------------------

/// Who the outreach message is addressed to.
#[derive(Debug, Clone, Copy)]
pub enum Recipient<'a> {
    /// The best-confidence contact found for the company.
    Contact(&'a ContactRecord),
    /// No contact available; address the role suggested by the insights.
    RoleHint(&'a str),
}

/// Everything the message collaborator needs for one company.
#[derive(Debug, Clone, Copy)]
pub struct MessageRequest<'a> {
    pub company: &'a CompanyCandidate,
    pub insights: &'a WebsiteInsights,
    pub recipient: Recipient<'a>,
}
