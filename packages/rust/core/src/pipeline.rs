//! Enrichment pipeline: criteria → candidates → insights → contacts →
//! message → lead records.
//!
//! Candidates are processed one at a time in discovery order. Per-candidate
//! failures skip or degrade that candidate only; discovery failure and
//! credential rejection abort the run. The pipeline does no sink I/O.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use prospector_providers::{
    CompanyDiscovery, ContactFinder, InsightsProvider, MessageRequest, MessageWriter, Recipient,
};
use prospector_shared::{
    CompanyCandidate, ContactRecord, DegradedFlags, LeadRecord, ProspectorError, Result,
    SearchCriteria,
};

use crate::retry::RetryPolicy;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The four external collaborators a run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub discovery: &'a dyn CompanyDiscovery,
    pub insights: &'a dyn InsightsProvider,
    pub contacts: &'a dyn ContactFinder,
    pub messages: &'a dyn MessageWriter,
}

/// Run-level settings.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on unique candidates taken from discovery.
    pub max_leads: usize,
    /// Applied independently to every collaborator call.
    pub retry: RetryPolicy,
}

// ---------------------------------------------------------------------------
// Candidate lifecycle
// ---------------------------------------------------------------------------

/// Why a candidate produced no lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingWebsite,
    InsightsUnavailable,
    MessageUnavailable,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingWebsite => "missing_website",
            Self::InsightsUnavailable => "insights_unavailable",
            Self::MessageUnavailable => "message_unavailable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a candidate is in its enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    Discovered,
    InsightsFetched,
    ContactsFetched,
    MessageGenerated,
    Emitted,
    Skipped(SkipReason),
}

impl fmt::Display for CandidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovered => f.write_str("discovered"),
            Self::InsightsFetched => f.write_str("insights_fetched"),
            Self::ContactsFetched => f.write_str("contacts_fetched"),
            Self::MessageGenerated => f.write_str("message_generated"),
            Self::Emitted => f.write_str("emitted"),
            Self::Skipped(reason) => write!(f, "skipped({reason})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Raw candidates returned by discovery.
    pub discovered: usize,
    /// Unique candidates taken for enrichment.
    pub processed: usize,
    pub emitted: usize,
    /// Duplicates dropped before the `max_leads` cutoff.
    pub duplicates: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    /// Emitted leads carrying at least one degraded flag.
    pub degraded: usize,
}

impl RunSummary {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

/// Leads in discovery order plus the run summary.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub leads: Vec<LeadRecord>,
    pub summary: RunSummary,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait PipelineProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a candidate is enriched (`current` is 1-based).
    fn candidate_started(&self, current: usize, total: usize, company: &str);
    /// Called with the candidate's terminal state.
    fn candidate_finished(&self, company: &str, state: &CandidateState);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl PipelineProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn candidate_started(&self, _current: usize, _total: usize, _company: &str) {}
    fn candidate_finished(&self, _company: &str, _state: &CandidateState) {}
}

// ---------------------------------------------------------------------------
// Selection helpers
// ---------------------------------------------------------------------------

/// Highest-confidence contact; ties go to the earliest entry.
pub fn select_best_contact(contacts: &[ContactRecord]) -> Option<&ContactRecord> {
    contacts.iter().fold(None, |best, contact| match best {
        Some(current) if current.confidence >= contact.confidence => Some(current),
        _ => Some(contact),
    })
}

/// Take unique candidates in order until `max` are collected.
///
/// Returns the taken candidates and how many duplicates were dropped on the
/// way. Entries after the cutoff are never inspected.
pub fn take_unique(
    candidates: Vec<CompanyCandidate>,
    max: usize,
) -> (Vec<CompanyCandidate>, usize) {
    let mut seen = HashSet::new();
    let mut taken = Vec::new();
    let mut duplicates = 0;

    for candidate in candidates {
        if taken.len() >= max {
            break;
        }
        let key = candidate.identity_key();
        if seen.insert(key.clone()) {
            taken.push(candidate);
        } else {
            debug!(company = %candidate.name, %key, "dropping duplicate candidate");
            duplicates += 1;
        }
    }

    (taken, duplicates)
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run discovery and enrich every unique candidate.
#[instrument(skip_all, fields(size = %criteria.size, max_leads = options.max_leads))]
pub async fn run_pipeline(
    criteria: &SearchCriteria,
    options: &PipelineOptions,
    collaborators: Collaborators<'_>,
    progress: &dyn PipelineProgress,
) -> Result<PipelineOutcome> {
    if options.max_leads == 0 {
        return Err(ProspectorError::validation("max_leads must be at least 1"));
    }

    let run_id = Uuid::now_v7();
    let started_at = Utc::now();
    info!(
        %run_id,
        keywords = ?criteria.keywords,
        location = criteria.location.as_deref().unwrap_or("any"),
        "starting enrichment run"
    );

    // --- Phase 1: Discovery ---
    progress.phase("Discovering companies");
    let discovered = options
        .retry
        .invoke("discovery", move || {
            collaborators.discovery.discover(criteria, options.max_leads)
        })
        .await?;
    let discovered_count = discovered.len();

    let (candidates, duplicates) = take_unique(discovered, options.max_leads);
    info!(
        discovered = discovered_count,
        unique = candidates.len(),
        duplicates,
        "discovery complete"
    );

    // --- Phase 2: Enrichment ---
    progress.phase("Enriching candidates");
    let total = candidates.len();
    let mut leads = Vec::with_capacity(total);
    let mut skipped: BTreeMap<SkipReason, usize> = BTreeMap::new();
    let mut degraded = 0;

    for (i, candidate) in candidates.into_iter().enumerate() {
        progress.candidate_started(i + 1, total, &candidate.name);
        let company = candidate.name.clone();

        let state = match enrich_candidate(candidate, options, collaborators).await? {
            Enriched::Lead(lead) => {
                if lead.degraded.is_degraded() {
                    degraded += 1;
                }
                leads.push(lead);
                CandidateState::Emitted
            }
            Enriched::Skipped(reason) => {
                *skipped.entry(reason).or_default() += 1;
                CandidateState::Skipped(reason)
            }
        };

        progress.candidate_finished(&company, &state);
    }

    let summary = RunSummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        discovered: discovered_count,
        processed: total,
        emitted: leads.len(),
        duplicates,
        skipped,
        degraded,
    };

    info!(
        %run_id,
        processed = summary.processed,
        emitted = summary.emitted,
        skipped = summary.skipped_total(),
        duplicates = summary.duplicates,
        degraded = summary.degraded,
        "enrichment run complete"
    );

    Ok(PipelineOutcome { leads, summary })
}

enum Enriched {
    Lead(LeadRecord),
    Skipped(SkipReason),
}

/// Drive one candidate through its states. `Err` only for batch-fatal errors.
async fn enrich_candidate(
    candidate: CompanyCandidate,
    options: &PipelineOptions,
    collaborators: Collaborators<'_>,
) -> Result<Enriched> {
    let retry = &options.retry;
    let company = candidate.name.as_str();
    let mut state = CandidateState::Discovered;

    let (Some(website), Some(domain)) = (candidate.website.as_deref(), candidate.domain()) else {
        warn!(company, "no usable website, skipping");
        return Ok(Enriched::Skipped(SkipReason::MissingWebsite));
    };

    // Insights
    let insights = match retry
        .invoke("insights", move || collaborators.insights.analyze(website))
        .await
    {
        Ok(outcome) => outcome,
        Err(e) if e.is_batch_fatal() => return Err(e),
        Err(e) => {
            warn!(company, error = %e, "insights unavailable, skipping");
            return Ok(Enriched::Skipped(SkipReason::InsightsUnavailable));
        }
    };
    advance(&mut state, CandidateState::InsightsFetched, company);

    // Contacts
    let domain = domain.as_str();
    let (contacts, contacts_unavailable) = match retry
        .invoke("contacts", move || collaborators.contacts.find_contacts(domain))
        .await
    {
        Ok(contacts) => (contacts, false),
        Err(e) if e.is_batch_fatal() => return Err(e),
        Err(e) => {
            warn!(company, %domain, error = %e, "contact lookup failed, continuing without contacts");
            (Vec::new(), true)
        }
    };
    advance(&mut state, CandidateState::ContactsFetched, company);

    // Message
    let message = {
        let recipient = match select_best_contact(&contacts) {
            Some(contact) => Recipient::Contact(contact),
            None => Recipient::RoleHint(&insights.insights().decision_maker_hint),
        };
        let request = &MessageRequest {
            company: &candidate,
            insights: insights.insights(),
            recipient,
        };

        match retry
            .invoke("message", move || collaborators.messages.write_message(request))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_batch_fatal() => return Err(e),
            Err(e) => {
                warn!(company, error = %e, "message unavailable, skipping");
                return Ok(Enriched::Skipped(SkipReason::MessageUnavailable));
            }
        }
    };
    advance(&mut state, CandidateState::MessageGenerated, company);

    let degraded = DegradedFlags {
        contacts_unavailable,
        insights_fallback: insights.is_fallback(),
        message_fallback: message.is_fallback(),
    };
    if degraded.is_degraded() {
        info!(company, ?degraded, "emitting degraded lead");
    }
    advance(&mut state, CandidateState::Emitted, company);

    Ok(Enriched::Lead(LeadRecord {
        insights: insights.into_insights(),
        contacts,
        message: message.into_message(),
        generated_at: Utc::now(),
        degraded,
        company: candidate,
    }))
}

fn advance(state: &mut CandidateState, next: CandidateState, company: &str) {
    debug!(company, from = %state, to = %next, "candidate state");
    *state = next;
}
