//! Chromium-family browsers: configuration and profile discovery.

pub mod keyring;
pub mod reader;

use std::path::{Path, PathBuf};

use crate::error::{HarvestError, HarvestResult};

/// Per-variant knobs for the Chromium family.
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    pub name: &'static str,
    pub vendor: &'static str,
    /// Passphrase owner name used by the OS secret stores.
    pub safe_storage_service: &'static str,
    /// `application` attribute under the libsecret schemas.
    pub secret_tool_app: &'static str,
}

impl ChromiumConfig {
    pub fn chrome() -> Self {
        Self {
            name: "Chrome",
            vendor: "Google",
            safe_storage_service: "Chrome Safe Storage",
            secret_tool_app: "chrome",
        }
    }

    pub fn chromium() -> Self {
        Self {
            name: "Chromium",
            vendor: "The Chromium Authors",
            safe_storage_service: "Chromium Safe Storage",
            secret_tool_app: "chromium",
        }
    }

    pub fn edge() -> Self {
        Self {
            name: "Edge",
            vendor: "Microsoft",
            safe_storage_service: "Microsoft Edge Safe Storage",
            secret_tool_app: "edge",
        }
    }

    pub fn brave() -> Self {
        Self {
            name: "Brave",
            vendor: "Brave Software",
            safe_storage_service: "Brave Safe Storage",
            secret_tool_app: "brave",
        }
    }

    /// Default user-data directory for this variant on the current OS.
    pub fn default_user_data_dir(&self) -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let base = PathBuf::from(std::env::var("USERPROFILE").ok()?).join("AppData/Local");
            let dir = match self.name {
                "Chrome" => base.join("Google/Chrome/User Data"),
                "Chromium" => base.join("Chromium/User Data"),
                "Edge" => base.join("Microsoft/Edge/User Data"),
                "Brave" => base.join("BraveSoftware/Brave-Browser/User Data"),
                _ => return None,
            };
            dir.exists().then_some(dir)
        }

        #[cfg(target_os = "macos")]
        {
            let home = directories::UserDirs::new()?.home_dir().to_path_buf();
            let base = home.join("Library/Application Support");
            let dir = match self.name {
                "Chrome" => base.join("Google/Chrome"),
                "Chromium" => base.join("Chromium"),
                "Edge" => base.join("Microsoft Edge"),
                "Brave" => base.join("BraveSoftware/Brave-Browser"),
                _ => return None,
            };
            dir.exists().then_some(dir)
        }

        #[cfg(target_os = "linux")]
        {
            let home = directories::UserDirs::new()?.home_dir().to_path_buf();
            let dir = match self.name {
                "Chrome" => home.join(".config/google-chrome"),
                "Chromium" => home.join(".config/chromium"),
                "Edge" => home.join(".config/microsoft-edge"),
                "Brave" => home.join(".config/BraveSoftware/Brave-Browser"),
                _ => return None,
            };
            dir.exists().then_some(dir)
        }

        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

/// List profile directories under a user-data dir: `Default` plus the
/// numbered `Profile N` directories.
pub fn find_profiles(user_data_dir: &Path) -> HarvestResult<Vec<PathBuf>> {
    let mut profiles = Vec::new();

    let default = user_data_dir.join("Default");
    if default.is_dir() {
        profiles.push(default);
    }

    for entry in std::fs::read_dir(user_data_dir)
        .map_err(|e| HarvestError::Io(format!("cannot list {}: {e}", user_data_dir.display())))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with("Profile ") {
                profiles.push(path);
            }
        }
    }

    if profiles.is_empty() {
        return Err(HarvestError::NoDataFound);
    }

    Ok(profiles)
}
