//! Gecko-family (Firefox) support: profile discovery, key recovery,
//! store readers.

pub mod asn1pbe;
pub mod key;
pub mod reader;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HarvestError, HarvestResult};

/// Root of the Firefox installation for the current user, if present.
pub fn default_install_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let profile = std::env::var("USERPROFILE").ok()?;
        let dir = PathBuf::from(profile).join("AppData/Roaming/Mozilla/Firefox");
        dir.exists().then_some(dir)
    }

    #[cfg(target_os = "macos")]
    {
        let home = directories::UserDirs::new()?.home_dir().to_path_buf();
        let dir = home.join("Library/Application Support/Firefox");
        dir.exists().then_some(dir)
    }

    #[cfg(target_os = "linux")]
    {
        let home = directories::UserDirs::new()?.home_dir().to_path_buf();
        let dir = home.join(".mozilla/firefox");
        dir.exists().then_some(dir)
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Profile directories under a Firefox installation, default profile first.
/// `profiles.ini` is authoritative; a directory scan is the fallback for
/// installs without one.
pub fn find_profiles(install_dir: &Path) -> HarvestResult<Vec<PathBuf>> {
    let ini = install_dir.join("profiles.ini");
    if ini.exists() {
        let profiles = parse_profiles_ini(install_dir, &ini)?;
        if !profiles.is_empty() {
            debug!("found {} profiles via profiles.ini", profiles.len());
            return Ok(profiles);
        }
    }

    let profiles: Vec<_> = fs::read_dir(install_dir)
        .map_err(|e| HarvestError::Io(format!("cannot list {}: {e}", install_dir.display())))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.join(reader::PLACES_FILE).exists())
        .collect();

    if profiles.is_empty() {
        return Err(HarvestError::NoDataFound);
    }

    debug!("found {} profiles by directory scan", profiles.len());
    Ok(profiles)
}

fn parse_profiles_ini(install_dir: &Path, ini: &Path) -> HarvestResult<Vec<PathBuf>> {
    let content = fs::read_to_string(ini)
        .map_err(|e| HarvestError::Io(format!("cannot read profiles.ini: {e}")))?;

    let mut profiles = Vec::new();
    let mut in_profile_section = false;
    let mut path: Option<String> = None;
    let mut is_relative = true;
    let mut is_default = false;

    let commit =
        |path: &mut Option<String>, is_relative: bool, is_default: bool, out: &mut Vec<PathBuf>| {
            if let Some(p) = path.take() {
                let full = if is_relative {
                    install_dir.join(p)
                } else {
                    PathBuf::from(p)
                };
                if full.is_dir() {
                    if is_default {
                        out.insert(0, full);
                    } else {
                        out.push(full);
                    }
                }
            }
        };

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('[') && line.ends_with(']') {
            if in_profile_section {
                commit(&mut path, is_relative, is_default, &mut profiles);
            }
            in_profile_section = line[1..line.len() - 1].starts_with("Profile");
            path = None;
            is_relative = true;
            is_default = false;
            continue;
        }

        if !in_profile_section {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "Path" => path = Some(value.trim().to_string()),
                "IsRelative" => is_relative = value.trim() != "0",
                "Default" => is_default = value.trim() == "1",
                _ => {}
            }
        }
    }

    if in_profile_section {
        commit(&mut path, is_relative, is_default, &mut profiles);
    }

    Ok(profiles)
}
