//! Application configuration for Prospector.
//!
//! User config lives at `~/.prospector/prospector.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: each provider section names the
//! environment variable that holds its key, and [`Credentials`] resolves
//! them once at start-up.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProspectorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "prospector.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".prospector";

// ---------------------------------------------------------------------------
// Config structs (matching prospector.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Company search provider.
    #[serde(default)]
    pub apollo: ApolloConfig,

    /// Contact lookup provider.
    #[serde(default)]
    pub hunter: HunterConfig,

    /// Chat-completion provider used for insights and messages.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Spreadsheet webhook sink.
    #[serde(default)]
    pub sheets: SheetsConfig,

    /// Sender signature appended to outreach messages.
    #[serde(default)]
    pub outreach: OutreachConfig,

    /// Retry/backoff policy for outbound calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory for the per-run JSON output file.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Default maximum number of candidates to enrich per run.
    #[serde(default = "default_max_leads")]
    pub max_leads: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_leads: default_max_leads(),
        }
    }
}

fn default_output_dir() -> String {
    "data/output".into()
}
fn default_max_leads() -> usize {
    10
}

/// `[apollo]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApolloConfig {
    #[serde(default = "default_apollo_url")]
    pub base_url: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_apollo_key_env")]
    pub api_key_env: String,

    /// Organizations requested per search page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for ApolloConfig {
    fn default() -> Self {
        Self {
            base_url: default_apollo_url(),
            api_key_env: default_apollo_key_env(),
            per_page: default_per_page(),
        }
    }
}

fn default_apollo_url() -> String {
    "https://api.apollo.io/api/v1".into()
}
fn default_apollo_key_env() -> String {
    "APOLLO_API_KEY".into()
}
fn default_per_page() -> u32 {
    25
}

/// `[hunter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HunterConfig {
    #[serde(default = "default_hunter_url")]
    pub base_url: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_hunter_key_env")]
    pub api_key_env: String,

    /// Maximum contacts requested per domain.
    #[serde(default = "default_contact_limit")]
    pub limit: u32,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            base_url: default_hunter_url(),
            api_key_env: default_hunter_key_env(),
            limit: default_contact_limit(),
        }
    }
}

fn default_hunter_url() -> String {
    "https://api.hunter.io/v2".into()
}
fn default_hunter_key_env() -> String {
    "HUNTER_API_KEY".into()
}
fn default_contact_limit() -> u32 {
    10
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root (the client appends `/chat/completions`).
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_insights_temperature")]
    pub insights_temperature: f32,

    #[serde(default = "default_message_temperature")]
    pub message_temperature: f32,

    /// Landing page text is truncated to this many characters before analysis.
    #[serde(default = "default_max_page_chars")]
    pub max_page_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            api_key_env: default_llm_key_env(),
            model: default_model(),
            insights_temperature: default_insights_temperature(),
            message_temperature: default_message_temperature(),
            max_page_chars: default_max_page_chars(),
        }
    }
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_insights_temperature() -> f32 {
    0.2
}
fn default_message_temperature() -> f32 {
    0.4
}
fn default_max_page_chars() -> usize {
    6000
}

/// `[sheets]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Name of the env var holding the webhook URL. Unset means disabled.
    #[serde(default = "default_sheets_env")]
    pub endpoint_env: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            endpoint_env: default_sheets_env(),
        }
    }
}

fn default_sheets_env() -> String {
    "GOOGLE_SHEETS_ENDPOINT".into()
}

/// `[outreach]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default = "default_sender_title")]
    pub sender_title: String,
    #[serde(default = "default_sender_company")]
    pub sender_company: String,
    /// Free-form contact line (phone, email) under the signature.
    #[serde(default)]
    pub sender_contact: String,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            sender_name: default_sender_name(),
            sender_title: default_sender_title(),
            sender_company: default_sender_company(),
            sender_contact: String::new(),
        }
    }
}

fn default_sender_name() -> String {
    "The Sales Team".into()
}
fn default_sender_title() -> String {
    "Hardware Solutions Specialist".into()
}
fn default_sender_company() -> String {
    "Your Company".into()
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Upper bound of the random fraction added to each delay.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1_000
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_jitter() -> f64 {
    0.25
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout for every provider request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Credentials (resolved once at start-up)
// ---------------------------------------------------------------------------

/// Provider secrets resolved from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub apollo_api_key: String,
    pub hunter_api_key: String,
    pub llm_api_key: String,
    /// Spreadsheet webhook; `None` disables the spreadsheet sink.
    pub sheets_endpoint: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("apollo_api_key", &"<redacted>")
            .field("hunter_api_key", &"<redacted>")
            .field("llm_api_key", &"<redacted>")
            .field("sheets_endpoint", &self.sheets_endpoint.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl Credentials {
    /// Read every configured key from the process environment.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve keys through `lookup` (env var name → value).
    ///
    /// A missing or blank required key is a [`ProspectorError::ProviderAuth`]
    /// for that provider.
    pub fn resolve(config: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |provider: &str, var_name: &str| {
            lookup(var_name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    ProspectorError::auth(
                        provider,
                        format!("API key not found. Set the {var_name} environment variable."),
                    )
                })
        };

        Ok(Self {
            apollo_api_key: required("apollo", &config.apollo.api_key_env)?,
            hunter_api_key: required("hunter", &config.hunter.api_key_env)?,
            llm_api_key: required("llm", &config.llm.api_key_env)?,
            sheets_endpoint: lookup(&config.sheets.endpoint_env).filter(|v| !v.trim().is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.prospector/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProspectorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.prospector/prospector.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ProspectorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ProspectorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ProspectorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ProspectorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ProspectorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
