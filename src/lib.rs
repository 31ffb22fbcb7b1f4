//! browserharvest - extract and decrypt browser artifacts.
//!
//! Supports the Chromium family (Chrome, Chromium, Edge, Brave) and Gecko
//! (Firefox): saved logins, cookies, history and bookmarks, decrypted where
//! the on-disk store is ciphertext and exported as CSV, JSON or a console
//! table.

pub mod artifact;
pub mod chromium;
pub mod cli;
pub mod crypto;
pub mod error;
pub mod gecko;
pub mod output;
pub mod records;
pub mod snapshot;
pub mod timestamp;
pub mod unprotect;

#[cfg(test)]
pub mod testutil;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use artifact::{ArtifactKind, BrowserTarget};
pub use error::{HarvestError, HarvestResult};

use chromium::ChromiumConfig;

/// Browsers this tool knows how to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Chromium,
    Edge,
    Brave,
    Firefox,
}

/// Family capability: everything the orchestrator needs that differs
/// between the two lineages.
#[derive(Debug, Clone)]
pub enum BrowserFamily {
    Chromium(ChromiumConfig),
    Gecko,
}

impl BrowserKind {
    pub const ALL: [BrowserKind; 5] = [
        BrowserKind::Chrome,
        BrowserKind::Chromium,
        BrowserKind::Edge,
        BrowserKind::Brave,
        BrowserKind::Firefox,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Chromium => "chromium",
            BrowserKind::Edge => "edge",
            BrowserKind::Brave => "brave",
            BrowserKind::Firefox => "firefox",
        }
    }

    pub fn family(&self) -> BrowserFamily {
        match self {
            BrowserKind::Chrome => BrowserFamily::Chromium(ChromiumConfig::chrome()),
            BrowserKind::Chromium => BrowserFamily::Chromium(ChromiumConfig::chromium()),
            BrowserKind::Edge => BrowserFamily::Chromium(ChromiumConfig::edge()),
            BrowserKind::Brave => BrowserFamily::Chromium(ChromiumConfig::brave()),
            BrowserKind::Firefox => BrowserFamily::Gecko,
        }
    }
}

/// Output formats supported by the sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Console,
}

/// Everything `run_extraction` needs, assembled by the CLI.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub browsers: Vec<BrowserKind>,
    /// Set when the browser list is the implicit "everything installed";
    /// missing browsers are then skipped instead of reported as failures.
    pub all_browsers: bool,
    pub profile_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

#[derive(Debug, Default)]
pub struct ExtractionSummary {
    pub kinds_succeeded: usize,
    pub kinds_failed: usize,
    pub files: Vec<PathBuf>,
    /// A requested browser failed outright: nothing could be extracted.
    pub fatal: bool,
}

/// Harvest every artifact kind from every requested browser profile.
/// Per-kind failures are logged and counted; the remaining kinds continue.
pub fn run_extraction(config: &ExtractionConfig) -> HarvestResult<ExtractionSummary> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

    fs::create_dir_all(&config.output_dir)?;

    // Distinct per run so concurrent extractions never share snapshot paths.
    let scratch_dir = std::env::temp_dir().join(format!(
        "browserharvest-{}-{}",
        std::process::id(),
        SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    fs::create_dir_all(&scratch_dir)?;

    let mut summary = ExtractionSummary::default();

    for browser in &config.browsers {
        let targets = match resolve_targets(*browser, config.profile_dir.as_deref()) {
            Ok(targets) => targets,
            Err(e) => {
                if config.all_browsers {
                    debug!("skipping {}: {e}", browser.label());
                } else {
                    warn!("{} unavailable: {e}", browser.label());
                    summary.fatal = true;
                }
                continue;
            }
        };

        let mut browser_successes = 0;
        for target in &targets {
            info!("processing {} profile {:?}", browser.label(), target.profile_dir);

            for kind in ArtifactKind::ALL {
                match artifact::harvest(target, kind, &scratch_dir) {
                    Ok(records) => {
                        if let Some(path) = output::emit(
                            &records,
                            config.format,
                            &config.output_dir,
                            browser.label(),
                            kind.name(),
                        )? {
                            summary.files.push(path);
                        }
                        summary.kinds_succeeded += 1;
                        browser_successes += 1;
                    }
                    Err(e) => {
                        warn!("{} {} failed: {e}", browser.label(), kind.name());
                        summary.kinds_failed += 1;
                    }
                }
            }
        }

        if browser_successes == 0 && !targets.is_empty() {
            summary.fatal = true;
        }
    }

    if let Err(e) = fs::remove_dir(&scratch_dir) {
        debug!("scratch dir not removed: {e}");
    }

    Ok(summary)
}

fn resolve_targets(
    browser: BrowserKind,
    profile_override: Option<&Path>,
) -> HarvestResult<Vec<BrowserTarget>> {
    if let Some(profile_dir) = profile_override {
        if !profile_dir.is_dir() {
            return Err(HarvestError::Io(format!(
                "profile directory not found: {}",
                profile_dir.display()
            )));
        }
        return Ok(vec![BrowserTarget {
            browser,
            profile_dir: profile_dir.to_path_buf(),
        }]);
    }

    match browser.family() {
        BrowserFamily::Gecko => {
            let install_dir = gecko::default_install_dir().ok_or(HarvestError::NoDataFound)?;
            let profiles = gecko::find_profiles(&install_dir)?;
            Ok(profiles
                .into_iter()
                .map(|profile_dir| BrowserTarget {
                    browser,
                    profile_dir,
                })
                .collect())
        }
        BrowserFamily::Chromium(config) => {
            let user_data_dir = config
                .default_user_data_dir()
                .ok_or(HarvestError::NoDataFound)?;
            let profiles = chromium::find_profiles(&user_data_dir)?;
            Ok(profiles
                .into_iter()
                .map(|profile_dir| BrowserTarget {
                    browser,
                    profile_dir,
                })
                .collect())
        }
    }
}
