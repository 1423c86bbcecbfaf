//! Local JSON file sink: one pretty-printed array of lead records per run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use prospector_shared::{LeadRecord, ProspectorError, Result};

/// `{output_dir}/leads_{YYYYmmdd_HHMMSS}.json`
pub fn default_output_path(output_dir: &Path, at: DateTime<Utc>) -> PathBuf {
    output_dir.join(format!("leads_{}.json", at.format("%Y%m%d_%H%M%S")))
}

/// Write `leads` to `path`, creating parent directories as needed.
pub fn write_leads(path: &Path, leads: &[LeadRecord]) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ProspectorError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(leads)
        .map_err(|e| ProspectorError::Sink(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, json).map_err(|e| ProspectorError::io(path, e))?;

    info!(path = %path.display(), leads = leads.len(), "leads saved");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use prospector_shared::{
        CompanyCandidate, DegradedFlags, OutreachMessage, WebsiteInsights,
    };

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("prospector-sink-test-{}", uuid::Uuid::now_v7()))
    }

    fn lead(name: &str) -> LeadRecord {
        LeadRecord {
            company: CompanyCandidate {
                name: name.into(),
                website: Some(format!("https://{}.in", name.to_lowercase())),
                employee_count: Some(300),
                industry: None,
                location: None,
            },
            insights: WebsiteInsights::fallback(),
            contacts: vec![],
            message: OutreachMessage {
                subject: "Hello".into(),
                body: "Body".into(),
                generated_at: Utc::now(),
            },
            generated_at: Utc::now(),
            degraded: DegradedFlags {
                insights_fallback: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn default_path_has_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            default_output_path(Path::new("data/output"), at),
            PathBuf::from("data/output/leads_20260307_090501.json")
        );
    }

    #[test]
    fn write_creates_directories_and_roundtrips() {
        let dir = temp_dir();
        let path = dir.join("nested").join("leads.json");

        let leads = vec![lead("Acme"), lead("Beta")];
        let written = write_leads(&path, &leads).unwrap();
        assert_eq!(written, path);

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<LeadRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, leads);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_run_writes_empty_array() {
        let dir = temp_dir();
        let path = dir.join("leads.json");

        write_leads(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

        std::fs::remove_dir_all(&dir).ok();
    }
}
