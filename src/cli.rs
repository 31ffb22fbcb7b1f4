use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::{BrowserKind, ExtractionConfig, OutputFormat};

/// Browser artifact extraction tool
#[derive(Parser, Debug)]
#[command(name = "browserharvest")]
#[command(about = "Extract and decrypt logins, cookies, history and bookmarks from web browsers")]
#[command(version)]
pub struct Cli {
    /// Browser to extract from
    #[arg(short, long, value_enum, default_value = "all")]
    pub browser: BrowserArg,

    /// Directory the export files are written into
    #[arg(short, long, default_value = "harvest_export")]
    pub output_dir: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    /// Explicit profile directory, bypassing discovery (requires --browser)
    #[arg(short, long)]
    pub profile_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging (overrides verbose)
    #[arg(short, long)]
    pub debug: bool,

    /// Trace logging (overrides debug and verbose)
    #[arg(short, long)]
    pub trace: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum BrowserArg {
    Chrome,
    Chromium,
    Edge,
    Brave,
    Firefox,
    All,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum FormatArg {
    Csv,
    Json,
    Console,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Console => OutputFormat::Console,
        }
    }
}

impl Cli {
    /// Bridge the parsed flags into the library config. Errors here are
    /// argument errors and exit with code 2.
    pub fn to_extraction_config(&self) -> Result<ExtractionConfig, String> {
        let (browsers, all_browsers) = match self.browser {
            BrowserArg::Chrome => (vec![BrowserKind::Chrome], false),
            BrowserArg::Chromium => (vec![BrowserKind::Chromium], false),
            BrowserArg::Edge => (vec![BrowserKind::Edge], false),
            BrowserArg::Brave => (vec![BrowserKind::Brave], false),
            BrowserArg::Firefox => (vec![BrowserKind::Firefox], false),
            BrowserArg::All => (BrowserKind::ALL.to_vec(), true),
        };

        if self.profile_dir.is_some() && all_browsers {
            return Err("--profile-dir requires an explicit --browser".to_string());
        }

        Ok(ExtractionConfig {
            browsers,
            all_browsers,
            profile_dir: self.profile_dir.clone(),
            output_dir: self.output_dir.clone(),
            format: self.format.into(),
        })
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.trace {
            tracing::Level::TRACE
        } else if self.debug {
            tracing::Level::DEBUG
        } else if self.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}
