//! Lead data model shared by the pipeline, the provider adapters, and the sinks.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ProspectorError, Result};

// ---------------------------------------------------------------------------
// SearchCriteria
// ---------------------------------------------------------------------------

/// Inclusive employee-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: u32,
    pub max: u32,
}

impl SizeRange {
    /// Build a range, rejecting inverted or empty bounds.
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(ProspectorError::validation(format!(
                "employee range {min}-{max} is inverted"
            )));
        }
        if max == 0 {
            return Err(ProspectorError::validation(
                "employee range upper bound must be positive",
            ));
        }
        Ok(Self { min, max })
    }
}

impl FromStr for SizeRange {
    type Err = ProspectorError;

    /// Parse `"min-max"`, e.g. `"250-500"`.
    fn from_str(s: &str) -> Result<Self> {
        let (lo, hi) = s.split_once('-').ok_or_else(|| {
            ProspectorError::validation(format!(
                "invalid size range '{s}': expected 'min-max'"
            ))
        })?;

        let parse = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| {
                ProspectorError::validation(format!(
                    "invalid size range '{s}': '{}' is not a number",
                    part.trim()
                ))
            })
        };

        Self::new(parse(lo)?, parse(hi)?)
    }
}

impl std::fmt::Display for SizeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Immutable input to company discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub size: SizeRange,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl SearchCriteria {
    /// Validate and build search criteria. Blank keywords are dropped; at least
    /// one must remain. A blank location is treated as absent.
    pub fn new(size: SizeRange, keywords: Vec<String>, location: Option<String>) -> Result<Self> {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keywords.is_empty() {
            return Err(ProspectorError::validation(
                "at least one industry keyword is required",
            ));
        }

        let location = location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        Ok(Self {
            size,
            keywords,
            location,
        })
    }
}

// ---------------------------------------------------------------------------
// CompanyCandidate
// ---------------------------------------------------------------------------

/// A company returned by discovery, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCandidate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Deduplication key for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    /// Normalized website domain.
    Domain(String),
    /// Lower-cased `name|location` when no domain is available.
    NameLocation(String),
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain(d) => f.write_str(d),
            Self::NameLocation(k) => f.write_str(k),
        }
    }
}

impl CompanyCandidate {
    /// Normalized website domain, if the website parses to a host.
    pub fn domain(&self) -> Option<String> {
        self.website.as_deref().and_then(normalize_domain)
    }

    /// Identity key used for deduplication.
    pub fn identity_key(&self) -> IdentityKey {
        match self.domain() {
            Some(domain) => IdentityKey::Domain(domain),
            None => {
                let location = self.location.as_deref().unwrap_or("");
                IdentityKey::NameLocation(format!(
                    "{}|{}",
                    collapse_lower(&self.name),
                    collapse_lower(location)
                ))
            }
        }
    }
}

/// Reduce a website string to its bare, lower-cased host without `www.`.
///
/// Accepts values with or without a scheme (`acme.com/about`,
/// `https://WWW.Acme.com:8443/`). Returns `None` for blank or unparsable input.
pub fn normalize_domain(website: &str) -> Option<String> {
    let trimmed = website.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?.trim_end_matches('.').to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    if host.is_empty() { None } else { Some(host) }
}

fn collapse_lower(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// WebsiteInsights
// ---------------------------------------------------------------------------

/// Company size as judged from website signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeIndicator {
    Small,
    Medium,
    Large,
    Unknown,
}

impl SizeIndicator {
    /// Lenient parse of free-form model output ("Medium", "large enterprise").
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("small") {
            Self::Small
        } else if label.contains("medium") || label.contains("mid") {
            Self::Medium
        } else if label.contains("large") {
            Self::Large
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Unknown => "unknown",
        }
    }
}

/// Named hardware categories a prospect plausibly needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareOpportunities {
    #[serde(default)]
    pub workstations: bool,
    #[serde(default)]
    pub servers: bool,
    #[serde(default)]
    pub networking: bool,
    #[serde(default)]
    pub storage: bool,
    #[serde(default)]
    pub peripherals: bool,
}

impl HardwareOpportunities {
    /// Display names of the flagged categories, in canonical order.
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.workstations, "Workstations"),
            (self.servers, "Servers"),
            (self.networking, "Networking"),
            (self.storage, "Storage"),
            (self.peripherals, "Peripherals"),
        ]
        .into_iter()
        .filter_map(|(flag, name)| flag.then_some(name))
        .collect()
    }

    pub fn any(&self) -> bool {
        !self.labels().is_empty()
    }
}

/// Business insights derived from a company's website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteInsights {
    pub business_summary: String,
    pub size_indicator: SizeIndicator,
    pub key_insights: Vec<String>,
    pub hardware_opportunity: HardwareOpportunities,
    pub decision_maker_hint: String,
    pub personalization_hook: String,
}

impl WebsiteInsights {
    /// Maximum number of key insights kept per company.
    pub const MAX_KEY_INSIGHTS: usize = 3;

    /// Generic insights used when analysis output is unusable.
    pub fn fallback() -> Self {
        Self {
            business_summary: "Company details could not be analyzed from website".into(),
            size_indicator: SizeIndicator::Unknown,
            key_insights: vec![
                "Website analysis was unsuccessful".into(),
                "Manual research recommended".into(),
            ],
            hardware_opportunity: HardwareOpportunities::default(),
            decision_maker_hint: "General Manager or IT contact".into(),
            personalization_hook: String::new(),
        }
    }
}

/// Insights plus how they were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightsOutcome {
    /// The analysis returned well-formed structured data.
    Parsed(WebsiteInsights),
    /// The analysis output was unusable; generic insights were substituted.
    Fallback {
        insights: WebsiteInsights,
        reason: String,
    },
}

impl InsightsOutcome {
    pub fn insights(&self) -> &WebsiteInsights {
        match self {
            Self::Parsed(insights) | Self::Fallback { insights, .. } => insights,
        }
    }

    pub fn into_insights(self) -> WebsiteInsights {
        match self {
            Self::Parsed(insights) | Self::Fallback { insights, .. } => insights,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

// ---------------------------------------------------------------------------
// ContactRecord
// ---------------------------------------------------------------------------

/// Where a contact came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
    #[default]
    ContactLookup,
}

/// A candidate decision-maker at a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Provider-supplied likelihood (0–100) that the email is valid.
    pub confidence: u8,
    /// Provider verification status (`valid`, `accept_all`, ...), when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
    #[serde(default)]
    pub source: ContactSource,
}

impl ContactRecord {
    /// `Name (Role)`, or whichever of the two is present.
    pub fn decision_maker_label(&self) -> Option<String> {
        let name = self.name.trim();
        let role = self.role.as_deref().map(str::trim).unwrap_or("");
        match (name.is_empty(), role.is_empty()) {
            (false, false) => Some(format!("{name} ({role})")),
            (false, true) => Some(name.to_string()),
            (true, false) => Some(role.to_string()),
            (true, true) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// OutreachMessage
// ---------------------------------------------------------------------------

/// A personalized outreach draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub subject: String,
    pub body: String,
    pub generated_at: DateTime<Utc>,
}

/// Outreach message plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Generated(OutreachMessage),
    /// Generation output was unusable; a template message was substituted.
    Fallback {
        message: OutreachMessage,
        reason: String,
    },
}

impl MessageOutcome {
    pub fn into_message(self) -> OutreachMessage {
        match self {
            Self::Generated(message) | Self::Fallback { message, .. } => message,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

// ---------------------------------------------------------------------------
// LeadRecord
// ---------------------------------------------------------------------------

/// Which optional parts of a lead were degraded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedFlags {
    /// The contact lookup failed; `contacts` is empty because of it.
    #[serde(default)]
    pub contacts_unavailable: bool,
    /// Insights are the generic placeholder.
    #[serde(default)]
    pub insights_fallback: bool,
    /// The message is the template placeholder.
    #[serde(default)]
    pub message_fallback: bool,
}

impl DegradedFlags {
    pub fn is_degraded(&self) -> bool {
        self.contacts_unavailable || self.insights_fallback || self.message_fallback
    }
}

/// A fully enriched lead, as emitted to sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub company: CompanyCandidate,
    pub insights: WebsiteInsights,
    #[serde(default)]
    pub contacts: Vec<ContactRecord>,
    pub message: OutreachMessage,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub degraded: DegradedFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, website: Option<&str>, location: Option<&str>) -> CompanyCandidate {
        CompanyCandidate {
            name: name.into(),
            website: website.map(String::from),
            employee_count: Some(300),
            industry: Some("hardware".into()),
            location: location.map(String::from),
        }
    }

    #[test]
    fn size_range_parses() {
        let range: SizeRange = "250-500".parse().unwrap();
        assert_eq!(range, SizeRange { min: 250, max: 500 });
        assert_eq!(range.to_string(), "250-500");

        let spaced: SizeRange = " 50 - 200 ".parse().unwrap();
        assert_eq!(spaced.min, 50);
    }

    #[test]
    fn size_range_rejects_bad_input() {
        assert!(matches!(
            "500-250".parse::<SizeRange>(),
            Err(ProspectorError::Validation { .. })
        ));
        assert!("lots".parse::<SizeRange>().is_err());
        assert!("10-x".parse::<SizeRange>().is_err());
        assert!("0-0".parse::<SizeRange>().is_err());
    }

    #[test]
    fn criteria_requires_keyword() {
        let size = SizeRange::new(250, 500).unwrap();
        let err = SearchCriteria::new(size, vec!["  ".into()], None).unwrap_err();
        assert!(err.to_string().contains("keyword"));

        let ok = SearchCriteria::new(size, vec![" hardware ".into()], Some(" ".into())).unwrap();
        assert_eq!(ok.keywords, vec!["hardware".to_string()]);
        assert_eq!(ok.location, None);
    }

    #[test]
    fn normalize_domain_variants() {
        assert_eq!(normalize_domain("https://www.Acme.com/about"), Some("acme.com".into()));
        assert_eq!(normalize_domain("acme.com"), Some("acme.com".into()));
        assert_eq!(normalize_domain("http://acme.com:8080"), Some("acme.com".into()));
        assert_eq!(normalize_domain("WWW.ACME.COM."), Some("acme.com".into()));
        assert_eq!(normalize_domain("   "), None);
    }

    #[test]
    fn identity_key_prefers_domain() {
        let a = candidate("Acme", Some("https://www.acme.com"), Some("Pune"));
        let b = candidate("Acme Corp", Some("http://acme.com/contact"), Some("Mumbai"));
        assert_eq!(a.identity_key(), b.identity_key());
        assert_eq!(a.identity_key(), IdentityKey::Domain("acme.com".into()));
    }

    #[test]
    fn identity_key_falls_back_to_name_and_location() {
        let a = candidate("Acme  Systems", None, Some("Pune, India"));
        let b = candidate("acme systems", Some(""), Some("pune,  india"));
        assert_eq!(a.identity_key(), b.identity_key());
        assert_eq!(
            a.identity_key(),
            IdentityKey::NameLocation("acme systems|pune, india".into())
        );
    }

    #[test]
    fn hardware_labels_in_order() {
        let hw = HardwareOpportunities {
            networking: true,
            workstations: true,
            ..Default::default()
        };
        assert_eq!(hw.labels(), vec!["Workstations", "Networking"]);
        assert!(hw.any());
        assert!(!HardwareOpportunities::default().any());
    }

    #[test]
    fn fallback_insights_have_no_hardware_flags() {
        let insights = WebsiteInsights::fallback();
        assert_eq!(insights.hardware_opportunity, HardwareOpportunities::default());
        assert_eq!(insights.size_indicator, SizeIndicator::Unknown);
    }

    #[test]
    fn size_indicator_from_label() {
        assert_eq!(SizeIndicator::from_label("Medium"), SizeIndicator::Medium);
        assert_eq!(SizeIndicator::from_label("large enterprise"), SizeIndicator::Large);
        assert_eq!(SizeIndicator::from_label("n/a"), SizeIndicator::Unknown);
    }

    #[test]
    fn decision_maker_label_variants() {
        let mut contact = ContactRecord {
            email: "a@acme.com".into(),
            name: "Asha Rao".into(),
            role: Some("CTO".into()),
            confidence: 95,
            verification: None,
            source: ContactSource::ContactLookup,
        };
        assert_eq!(contact.decision_maker_label().as_deref(), Some("Asha Rao (CTO)"));

        contact.role = None;
        assert_eq!(contact.decision_maker_label().as_deref(), Some("Asha Rao"));

        contact.name = String::new();
        assert_eq!(contact.decision_maker_label(), None);
    }

    #[test]
    fn lead_record_json_roundtrip() {
        let lead = LeadRecord {
            company: candidate("Acme", Some("https://acme.com"), Some("Pune, India")),
            insights: WebsiteInsights {
                business_summary: "Builds rugged edge servers".into(),
                size_indicator: SizeIndicator::Medium,
                key_insights: vec!["Opening a Bengaluru office".into()],
                hardware_opportunity: HardwareOpportunities {
                    servers: true,
                    ..Default::default()
                },
                decision_maker_hint: "IT Manager".into(),
                personalization_hook: "Recent Series B".into(),
            },
            contacts: vec![ContactRecord {
                email: "cto@acme.com".into(),
                name: "Asha Rao".into(),
                role: Some("CTO".into()),
                confidence: 97,
                verification: Some("valid".into()),
                source: ContactSource::ContactLookup,
            }],
            message: OutreachMessage {
                subject: "Hardware for Acme".into(),
                body: "Hello Asha,".into(),
                generated_at: Utc::now(),
            },
            generated_at: Utc::now(),
            degraded: DegradedFlags {
                contacts_unavailable: false,
                insights_fallback: false,
                message_fallback: true,
            },
        };

        let json = serde_json::to_string_pretty(&vec![lead.clone()]).expect("serialize");
        let parsed: Vec<LeadRecord> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, vec![lead]);
        assert!(json.contains(r#""source": "contact_lookup""#));
        assert!(json.contains(r#""size_indicator": "medium""#));
    }
}
