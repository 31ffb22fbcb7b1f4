//! Output sinks: CSV and JSON files plus a console table mode.
//!
//! Sinks are pure emitters over an immutable record collection; files are
//! named `{browser}_{kind}.{ext}` under the caller's output directory.

use std::fs;
use std::path::{Path, PathBuf};
use tabled::Table;
use tracing::info;

use crate::error::{HarvestError, HarvestResult};
use crate::records::RecordSet;
use crate::OutputFormat;

/// Deliver one kind's records. Returns the written path for the file
/// formats, `None` for console output.
pub fn emit(
    records: &RecordSet,
    format: OutputFormat,
    output_dir: &Path,
    browser: &str,
    kind: &str,
) -> HarvestResult<Option<PathBuf>> {
    match format {
        OutputFormat::Csv => {
            let path = output_dir.join(format!("{browser}_{kind}.csv"));
            fs::write(&path, to_csv(records)?)?;
            info!("wrote {}", path.display());
            Ok(Some(path))
        }
        OutputFormat::Json => {
            let path = output_dir.join(format!("{browser}_{kind}.json"));
            fs::write(&path, serde_json::to_string_pretty(records)?)?;
            info!("wrote {}", path.display());
            Ok(Some(path))
        }
        OutputFormat::Console => {
            println!("== {browser} {kind} ({} records) ==", records.len());
            println!("{}", render_table(records));
            Ok(None)
        }
    }
}

fn to_csv(records: &RecordSet) -> HarvestResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    match records {
        RecordSet::Logins(v) => {
            for record in v {
                writer
                    .serialize(record)
                    .map_err(|e| HarvestError::Csv(e.to_string()))?;
            }
        }
        RecordSet::Cookies(v) => {
            for record in v {
                writer
                    .serialize(record)
                    .map_err(|e| HarvestError::Csv(e.to_string()))?;
            }
        }
        RecordSet::History(v) => {
            for record in v {
                writer
                    .serialize(record)
                    .map_err(|e| HarvestError::Csv(e.to_string()))?;
            }
        }
        RecordSet::Bookmarks(v) => {
            for record in v {
                writer
                    .serialize(record)
                    .map_err(|e| HarvestError::Csv(e.to_string()))?;
            }
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| HarvestError::Csv(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

fn render_table(records: &RecordSet) -> String {
    match records {
        RecordSet::Logins(v) => Table::new(v).to_string(),
        RecordSet::Cookies(v) => Table::new(v).to_string(),
        RecordSet::History(v) => Table::new(v).to_string(),
        RecordSet::Bookmarks(v) => Table::new(v).to_string(),
    }
}
