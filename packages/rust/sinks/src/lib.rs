//! Output sinks for enriched leads.
//!
//! - [`json_file`]: the per-run local JSON file (always written)
//! - [`sheets`]: the optional spreadsheet webhook
//!
//! Sinks run after the pipeline finishes; a sink failure never changes which
//! leads were produced.

pub mod json_file;
pub mod sheets;

pub use json_file::{default_output_path, write_leads};
pub use sheets::{SheetRow, SheetsSink};
