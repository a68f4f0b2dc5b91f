//! Environment Configuration
//!
//! Detects default settings for the host and loads settings profiles.

use crate::error::{RecipeError, Result};
use crate::settings::Settings;
use crate::utils::log::{log, LogLevel};
use directories::ProjectDirs;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the profile picked up when none is given
pub const DEFAULT_PROFILE: &str = "default";

#[derive(Debug, Default, Deserialize)]
struct Profile {
    #[serde(default)]
    settings: BTreeMap<String, String>,
}

fn host_os() -> Option<&'static str> {
    match std::env::consts::OS {
        "linux" => Some("Linux"),
        "macos" => Some("Macos"),
        "windows" => Some("Windows"),
        "freebsd" => Some("FreeBSD"),
        _ => None,
    }
}

fn host_arch() -> Option<&'static str> {
    match std::env::consts::ARCH {
        "x86_64" => Some("x86_64"),
        "x86" => Some("x86"),
        "aarch64" => Some("armv8"),
        "arm" => Some("armv7"),
        _ => None,
    }
}

fn host_compiler(os: &str) -> &'static str {
    match os {
        "Windows" => "Visual Studio",
        "Macos" => "apple-clang",
        _ => "gcc",
    }
}

/// Settings describing the machine cppkg runs on, `build_type=Release`
pub fn detect_host_settings() -> Settings {
    let mut settings = Settings::new();
    let mut set = |key: &str, value: &str| {
        if let Err(e) = settings.set(key, value) {
            log(LogLevel::Warn, &format!("Ignoring detected setting: {}", e));
        }
    };
    if let Some(os) = host_os() {
        set("os", os);
        set("compiler", host_compiler(os));
    }
    if let Some(arch) = host_arch() {
        set("arch", arch);
    }
    set("build_type", "Release");
    settings
}

/// Directory holding named profiles
pub fn profiles_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cppkg").map(|dirs| dirs.config_dir().join("profiles"))
}

/// A profile argument is a file path when it names an existing file,
/// otherwise a name looked up in [`profiles_dir`].
pub fn resolve_profile(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.is_file() {
        return Some(direct.to_path_buf());
    }
    profiles_dir().map(|dir| dir.join(format!("{}.toml", name)))
}

/// Parses the `[settings]` table of a profile file
pub fn load_profile_file(path: &Path) -> Result<Settings> {
    let text = fs::read_to_string(path)
        .map_err(|e| RecipeError::Profile(path.display().to_string(), e.to_string()))?;
    let profile: Profile =
        toml::from_str(&text).map_err(|e| RecipeError::Profile(path.display().to_string(), e.to_string()))?;
    let mut settings = Settings::new();
    for (key, value) in &profile.settings {
        settings.set(key, value)?;
    }
    log(LogLevel::Debug, &format!("Loaded profile {}", path.display()));
    Ok(settings)
}

/// Loads a profile by name or path. An explicitly requested profile must
/// exist; the implicit default profile may be absent.
pub fn load_profile(name: Option<&str>) -> Result<Settings> {
    let requested = name.unwrap_or(DEFAULT_PROFILE);
    match resolve_profile(requested) {
        Some(path) if path.is_file() => load_profile_file(&path),
        _ if name.is_none() => Ok(Settings::new()),
        _ => Err(RecipeError::Profile(requested.to_string(), "profile not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_host_settings_have_build_type() {
        let settings = detect_host_settings();
        assert_eq!(settings.build_type(), Some("Release"));
        if cfg!(target_os = "linux") {
            assert_eq!(settings.os(), Some("Linux"));
            assert_eq!(settings.compiler(), Some("gcc"));
        }
    }

    #[test]
    fn test_load_profile_from_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("debug.toml");
        fs::write(&path, "[settings]\nbuild_type = \"Debug\"\n\"compiler.version\" = \"11\"\n").unwrap();
        let settings = load_profile(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.build_type(), Some("Debug"));
        assert_eq!(settings.get("compiler.version"), Some("11"));
    }

    #[test]
    fn test_invalid_profile_setting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[settings]\nbuild_type = \"Fastest\"\n").unwrap();
        assert!(load_profile_file(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_profile_errors() {
        assert!(matches!(
            load_profile(Some("no-such-profile-cppkg-test")),
            Err(RecipeError::Profile(..))
        ));
    }
}
