//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use prospector_core::{
    CandidateState, Collaborators, PipelineOptions, PipelineOutcome, PipelineProgress,
    RetryPolicy, run_pipeline,
};
use prospector_providers::{
    ApolloDiscovery, ChatClient, HunterContacts, LlmInsights, LlmMessageWriter,
};
use prospector_shared::{
    AppConfig, Credentials, LeadRecord, SearchCriteria, SizeRange, init_config, load_config,
};
use prospector_sinks::{SheetsSink, default_output_path, write_leads};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Prospector: find and enrich B2B leads.
#[derive(Parser)]
#[command(
    name = "prospector",
    version,
    about = "Discover companies, enrich them with insights and contacts, and draft outreach.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the lead enrichment pipeline.
    Run {
        /// Employee count range, e.g. 250-500.
        #[arg(long)]
        size_range: SizeRange,

        /// Industry keyword(s); repeat the flag or separate with commas.
        #[arg(long, required = true, value_delimiter = ',')]
        industry: Vec<String>,

        /// Company location filter, e.g. "India".
        #[arg(long)]
        location: Option<String>,

        /// Maximum unique companies to enrich (defaults to config).
        #[arg(long)]
        max_leads: Option<usize>,

        /// Write leads here instead of the timestamped default.
        #[arg(long)]
        output_file: Option<PathBuf>,

        /// Skip the spreadsheet sink even if an endpoint is configured.
        #[arg(long)]
        no_sheets: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Arguments of `prospector run`.
struct RunArgs {
    size_range: SizeRange,
    industry: Vec<String>,
    location: Option<String>,
    max_leads: Option<usize>,
    output_file: Option<PathBuf>,
    no_sheets: bool,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "prospector=info",
        1 => "prospector=debug",
        _ => "prospector=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            size_range,
            industry,
            location,
            max_leads,
            output_file,
            no_sheets,
        } => {
            cmd_run(RunArgs {
                size_range,
                industry,
                location,
                max_leads,
                output_file,
                no_sheets,
            })
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = load_config()?;

    // Criteria are validated before any provider is contacted.
    let criteria = SearchCriteria::new(args.size_range, args.industry, args.location)?;
    let max_leads = args.max_leads.unwrap_or(config.defaults.max_leads);

    let credentials = Credentials::from_env(&config)?;
    let timeout = Duration::from_secs(config.http.timeout_secs);

    let discovery = ApolloDiscovery::new(&config.apollo, &credentials.apollo_api_key, timeout)?;
    let contacts = HunterContacts::new(&config.hunter, &credentials.hunter_api_key, timeout)?;
    let chat = ChatClient::new(&config.llm, &credentials.llm_api_key, timeout)?;
    let insights = LlmInsights::new(chat.clone(), &config.llm, timeout)?;
    let messages = LlmMessageWriter::new(chat, &config.llm, config.outreach.clone());

    let options = PipelineOptions {
        max_leads,
        retry: RetryPolicy::from(&config.retry),
    };

    info!(
        size = %criteria.size,
        industry = ?criteria.keywords,
        location = criteria.location.as_deref().unwrap_or("any"),
        max_leads,
        "starting lead generation"
    );

    let reporter = CliProgress::new();
    let result = run_pipeline(
        &criteria,
        &options,
        Collaborators {
            discovery: &discovery,
            insights: &insights,
            contacts: &contacts,
            messages: &messages,
        },
        &reporter,
    )
    .await;
    reporter.finish();
    let outcome = result.wrap_err("lead generation failed")?;

    // Local file first: spreadsheet problems must never lose a run.
    let path = args.output_file.unwrap_or_else(|| {
        default_output_path(Path::new(&config.defaults.output_dir), Utc::now())
    });
    let path = write_leads(&path, &outcome.leads)?;

    let sheet_rows = if args.no_sheets {
        None
    } else {
        push_to_sheets(&credentials, &outcome, timeout).await
    };

    print_summary(&outcome, &path, sheet_rows);
    Ok(())
}

/// Send leads to the spreadsheet sink. Failures are logged, not returned.
async fn push_to_sheets(
    credentials: &Credentials,
    outcome: &PipelineOutcome,
    timeout: Duration,
) -> Option<usize> {
    let endpoint = credentials.sheets_endpoint.as_deref()?;

    let result = match SheetsSink::new(endpoint, timeout) {
        Ok(sink) => sink.push(&outcome.leads).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(rows) => Some(rows),
        Err(e) => {
            warn!(error = %e, "spreadsheet upload failed; leads are in the local file");
            None
        }
    }
}

fn print_summary(outcome: &PipelineOutcome, path: &Path, sheet_rows: Option<usize>) {
    let summary = &outcome.summary;

    println!();
    println!("  Lead generation complete!");
    println!("  Run:        {}", summary.run_id);
    println!("  Processed:  {}", summary.processed);
    println!("  Emitted:    {}", summary.emitted);
    println!("  Duplicates: {}", summary.duplicates);
    println!("  Degraded:   {}", summary.degraded);
    println!("  Skipped:    {}", summary.skipped_total());
    for (reason, count) in &summary.skipped {
        println!("    {reason}: {count}");
    }
    println!("  Saved to:   {}", path.display());
    if let Some(rows) = sheet_rows {
        println!("  Sheet rows: {rows}");
    }
    println!(
        "  Time:       {:.1}s",
        (summary.finished_at - summary.started_at).num_milliseconds() as f64 / 1000.0
    );
    println!();

    for (i, lead) in outcome.leads.iter().enumerate() {
        println!("  {}. {}", i + 1, lead.company.name);
        for line in lead_details(lead) {
            println!("     {line}");
        }
    }
    if !outcome.leads.is_empty() {
        println!();
    }

    if let Some(lead) = outcome.leads.first() {
        println!("  Sample message for {}:", lead.company.name);
        println!("  Subject: {}", lead.message.subject);
        println!();
        for line in lead.message.body.lines() {
            println!("    {line}");
        }
        println!();
    }
}

/// Per-lead summary lines: industry, size, hardware, top contacts.
fn lead_details(lead: &LeadRecord) -> Vec<String> {
    let company = &lead.company;
    let mut lines = vec![
        format!(
            "Industry: {}",
            company.industry.as_deref().unwrap_or("unknown")
        ),
        format!(
            "Size:     {}",
            company
                .employee_count
                .map_or_else(|| "unknown".to_string(), |n| format!("{n} employees"))
        ),
    ];

    let hardware = lead.insights.hardware_opportunity.labels();
    if !hardware.is_empty() {
        lines.push(format!("Hardware: {}", hardware.join(", ")));
    }

    if lead.contacts.is_empty() {
        lines.push("Contacts: none found".to_string());
    } else {
        lines.push(format!("Contacts: {}", lead.contacts.len()));
        for contact in lead.contacts.iter().take(3) {
            match contact.decision_maker_label() {
                Some(label) => lines.push(format!("  - {label} <{}>", contact.email)),
                None => lines.push(format!("  - {}", contact.email)),
            }
        }
    }

    if lead.degraded.is_degraded() {
        lines.push("Degraded: yes".to_string());
    }
    lines
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl PipelineProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn candidate_started(&self, current: usize, total: usize, company: &str) {
        self.spinner
            .set_message(format!("Enriching [{current}/{total}] {company}"));
    }

    fn candidate_finished(&self, company: &str, state: &CandidateState) {
        if let CandidateState::Skipped(reason) = state {
            self.spinner.println(format!("  skipped {company}: {reason}"));
        }
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_parses_flags() {
        let cli = Cli::try_parse_from([
            "prospector",
            "run",
            "--size-range",
            "250-500",
            "--industry",
            "hardware,electronics",
            "--location",
            "India",
            "--max-leads",
            "2",
            "--no-sheets",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Run {
                size_range,
                industry,
                location,
                max_leads,
                output_file,
                no_sheets,
            } => {
                assert_eq!(size_range, SizeRange::new(250, 500).unwrap());
                assert_eq!(industry, vec!["hardware", "electronics"]);
                assert_eq!(location.as_deref(), Some("India"));
                assert_eq!(max_leads, Some(2));
                assert!(output_file.is_none());
                assert!(no_sheets);
            }
            Command::Config { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn inverted_size_range_is_rejected() {
        let result = Cli::try_parse_from([
            "prospector",
            "run",
            "--size-range",
            "500-250",
            "--industry",
            "hardware",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn industry_is_required() {
        let result = Cli::try_parse_from(["prospector", "run", "--size-range", "10-50"]);
        assert!(result.is_err());
    }

    #[test]
    fn lead_details_list_top_three_contacts() {
        use chrono::Utc;
        use prospector_shared::{
            CompanyCandidate, ContactRecord, ContactSource, DegradedFlags,
            HardwareOpportunities, OutreachMessage, WebsiteInsights,
        };

        let contact = |email: &str, name: &str, role: Option<&str>| ContactRecord {
            email: email.into(),
            name: name.into(),
            role: role.map(String::from),
            confidence: 80,
            verification: None,
            source: ContactSource::ContactLookup,
        };
        let lead = LeadRecord {
            company: CompanyCandidate {
                name: "Acme Systems".into(),
                website: Some("https://acme.in".into()),
                employee_count: Some(320),
                industry: Some("computer hardware".into()),
                location: None,
            },
            insights: WebsiteInsights {
                hardware_opportunity: HardwareOpportunities {
                    servers: true,
                    ..Default::default()
                },
                ..WebsiteInsights::fallback()
            },
            contacts: vec![
                contact("asha@acme.in", "Asha Rao", Some("CTO")),
                contact("info@acme.in", "", None),
                contact("ops@acme.in", "", Some("Operations")),
                contact("hr@acme.in", "", Some("HR")),
            ],
            message: OutreachMessage {
                subject: "Hi".into(),
                body: "Hello".into(),
                generated_at: Utc::now(),
            },
            generated_at: Utc::now(),
            degraded: DegradedFlags::default(),
        };

        assert_eq!(
            lead_details(&lead),
            vec![
                "Industry: computer hardware",
                "Size:     320 employees",
                "Hardware: Servers",
                "Contacts: 4",
                "  - Asha Rao (CTO) <asha@acme.in>",
                "  - info@acme.in",
                "  - Operations <ops@acme.in>",
            ]
        );
    }
}
