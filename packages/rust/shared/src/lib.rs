//! Shared types, error model, and configuration for Prospector.
//!
//! This crate is the foundation depended on by all other Prospector crates.
//! It provides:
//! - [`ProspectorError`]: the unified failure taxonomy
//! - Lead data model ([`SearchCriteria`], [`CompanyCandidate`], [`LeadRecord`], ...)
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApolloConfig, AppConfig, Credentials, DefaultsConfig, HttpConfig, HunterConfig, LlmConfig,
    OutreachConfig, RetryConfig, SheetsConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{ProspectorError, Result};

/// `User-Agent` sent by every Prospector HTTP client.
pub const USER_AGENT: &str = concat!("Prospector/", env!("CARGO_PKG_VERSION"));
pub use types::{
    CompanyCandidate, ContactRecord, ContactSource, DegradedFlags, HardwareOpportunities,
    IdentityKey, InsightsOutcome, LeadRecord, MessageOutcome, OutreachMessage, SearchCriteria,
    SizeIndicator, SizeRange, WebsiteInsights, normalize_domain,
};
