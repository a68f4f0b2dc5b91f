//! Options, settings and the per-configuration package id.
//!
//! A [`BuildConfig`] bundles everything a stage needs to know about the
//! requested configuration. It is built once by the command layer and
//! handed by reference to each stage; no stage reads ambient state.

use crate::error::{RecipeError, Result};
use crate::hasher::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Top-level setting names a recipe may declare
pub const KNOWN_SETTINGS: [&str; 4] = ["os", "compiler", "build_type", "arch"];

const BUILD_TYPES: [&str; 4] = ["Debug", "Release", "RelWithDebInfo", "MinSizeRel"];

/// File name of the build record kept in every build folder
pub const BUILD_RECORD: &str = "cppkginfo.toml";

/// Consumer-controlled options. `shared` is the only one recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    #[serde(default)]
    pub shared: bool,
}

impl Options {
    /// Sets a single option from its textual form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "shared" => {
                self.shared = parse_bool(value).ok_or_else(|| {
                    RecipeError::InvalidOption(
                        key.to_string(),
                        format!("'{}' is not a boolean", value),
                    )
                })?;
                Ok(())
            }
            _ => Err(RecipeError::InvalidOption(
                key.to_string(),
                "unknown option, only 'shared' is supported".to_string(),
            )),
        }
    }

    /// Applies `key=value` overrides given on the command line
    pub fn apply_overrides(&mut self, overrides: &[String]) -> Result<()> {
        for assignment in overrides {
            let (key, value) = split_assignment(assignment)
                .ok_or_else(|| RecipeError::InvalidOption(assignment.clone(), "expected key=value".to_string()))?;
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Parses the boolean spellings accepted for options
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "True" | "true" | "1" | "ON" | "on" | "yes" => Some(true),
        "False" | "false" | "0" | "OFF" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn display_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Splits `key=value`, trimming both sides
pub fn split_assignment(assignment: &str) -> Option<(&str, &str)> {
    let (key, value) = assignment.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Host-supplied settings. Keys may be dotted sub-settings such as
/// `compiler.version`; ordering is stable so hashing is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, String>);

impl Settings {
    pub fn new() -> Self {
        Settings(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Sets a setting after validating its name and value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let root = key.split('.').next().unwrap_or(key);
        if !KNOWN_SETTINGS.contains(&root) {
            return Err(RecipeError::InvalidSetting(
                key.to_string(),
                format!("unknown setting, expected one of {}", KNOWN_SETTINGS.join(", ")),
            ));
        }
        if value.is_empty() {
            return Err(RecipeError::InvalidSetting(key.to_string(), "empty value".to_string()));
        }
        if key == "build_type" && !BUILD_TYPES.contains(&value) {
            return Err(RecipeError::InvalidSetting(
                key.to_string(),
                format!("'{}' is not one of {}", value, BUILD_TYPES.join(", ")),
            ));
        }
        self.0.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Applies `key=value` overrides given on the command line
    pub fn apply_overrides(&mut self, overrides: &[String]) -> Result<()> {
        for assignment in overrides {
            let (key, value) = split_assignment(assignment)
                .ok_or_else(|| RecipeError::InvalidSetting(assignment.clone(), "expected key=value".to_string()))?;
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Overlays `other` on top of `self`
    pub fn merge(&mut self, other: &Settings) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Drops every setting whose root name the recipe does not declare
    pub fn retain_declared(&mut self, declared: &[String]) {
        self.0.retain(|key, _| {
            let root = key.split('.').next().unwrap_or(key);
            declared.iter().any(|d| d == root)
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn os(&self) -> Option<&str> {
        self.get("os")
    }

    pub fn compiler(&self) -> Option<&str> {
        self.get("compiler")
    }

    pub fn build_type(&self) -> Option<&str> {
        self.get("build_type")
    }

    pub fn arch(&self) -> Option<&str> {
        self.get("arch")
    }
}

/// The configuration passed into every pipeline stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub settings: Settings,
    pub options: Options,
}

impl BuildConfig {
    pub fn new(settings: Settings, options: Options) -> Self {
        BuildConfig { settings, options }
    }

    /// Canonical text form, the input of the package id
    pub fn canonical(&self) -> String {
        let mut text = String::from("[settings]\n");
        for (key, value) in self.settings.iter() {
            text.push_str(&format!("{}={}\n", key, value));
        }
        text.push_str("[options]\n");
        text.push_str(&format!("shared={}\n", display_bool(self.options.shared)));
        text
    }

    /// Identifies the binary produced by this configuration
    pub fn package_id(&self) -> String {
        Hasher::hash_string(&self.canonical())
    }

    /// Returns the first difference between `self` (as built) and `current`
    pub fn first_difference(&self, current: &BuildConfig) -> Option<(String, String, String)> {
        if self.options.shared != current.options.shared {
            return Some((
                "shared".to_string(),
                display_bool(self.options.shared).to_string(),
                display_bool(current.options.shared).to_string(),
            ));
        }
        let keys: Vec<&String> = self.settings.0.keys().chain(current.settings.0.keys()).collect();
        for key in keys {
            let built = self.settings.get(key).unwrap_or("<unset>");
            let now = current.settings.get(key).unwrap_or("<unset>");
            if built != now {
                return Some((key.clone(), built.to_string(), now.to_string()));
            }
        }
        None
    }
}

/// What the build stage recorded about the configuration it used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub package_id: String,
    pub config: BuildConfig,
}

impl BuildRecord {
    pub fn new(config: &BuildConfig) -> Self {
        BuildRecord {
            package_id: config.package_id(),
            config: config.clone(),
        }
    }

    pub fn write(&self, build_folder: &Path) -> Result<()> {
        let text = toml::to_string(self)?;
        fs::write(build_folder.join(BUILD_RECORD), text)?;
        Ok(())
    }

    pub fn read(build_folder: &Path) -> Result<BuildRecord> {
        let path = build_folder.join(BUILD_RECORD);
        if !path.exists() {
            return Err(RecipeError::MissingStage {
                stage: "build".to_string(),
                path,
            });
        }
        let text = fs::read_to_string(&path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Fails unless `current` matches the recorded configuration
    pub fn verify(&self, current: &BuildConfig) -> Result<()> {
        match self.config.first_difference(current) {
            Some((key, built, current)) => Err(RecipeError::ConfigMismatch { key, built, current }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn linux_settings() -> Settings {
        let mut settings = Settings::new();
        settings.set("os", "Linux").unwrap();
        settings.set("compiler", "gcc").unwrap();
        settings.set("build_type", "Release").unwrap();
        settings.set("arch", "x86_64").unwrap();
        settings
    }

    #[test]
    fn test_shared_defaults_to_false() {
        assert!(!Options::default().shared);
    }

    #[test]
    fn test_option_overrides() {
        let mut options = Options::default();
        options.apply_overrides(&["shared=True".to_string()]).unwrap();
        assert!(options.shared);
        options.apply_overrides(&["shared = OFF".to_string()]).unwrap();
        assert!(!options.shared);
    }

    #[test]
    fn test_option_rejects_unknown_key_and_value() {
        let mut options = Options::default();
        assert!(matches!(options.set("fPIC", "True"), Err(RecipeError::InvalidOption(..))));
        assert!(matches!(options.set("shared", "maybe"), Err(RecipeError::InvalidOption(..))));
        assert!(options.apply_overrides(&["shared".to_string()]).is_err());
    }

    #[test]
    fn test_setting_validation() {
        let mut settings = Settings::new();
        assert!(settings.set("compiler.version", "11").is_ok());
        assert!(settings.set("build_type", "Fast").is_err());
        assert!(settings.set("flavor", "x").is_err());
        assert!(settings.set("os", "").is_err());
    }

    #[test]
    fn test_retain_declared_keeps_sub_settings() {
        let mut settings = linux_settings();
        settings.set("compiler.version", "11").unwrap();
        settings.retain_declared(&["compiler".to_string(), "os".to_string()]);
        assert_eq!(settings.get("compiler.version"), Some("11"));
        assert_eq!(settings.os(), Some("Linux"));
        assert_eq!(settings.arch(), None);
    }

    #[test]
    fn test_package_id_depends_on_configuration() {
        let static_cfg = BuildConfig::new(linux_settings(), Options { shared: false });
        let shared_cfg = BuildConfig::new(linux_settings(), Options { shared: true });
        assert_ne!(static_cfg.package_id(), shared_cfg.package_id());
        assert_eq!(static_cfg.package_id(), static_cfg.clone().package_id());

        let mut debug = linux_settings();
        debug.set("build_type", "Debug").unwrap();
        let debug_cfg = BuildConfig::new(debug, Options { shared: false });
        assert_ne!(static_cfg.package_id(), debug_cfg.package_id());
    }

    #[test]
    fn test_canonical_text() {
        let cfg = BuildConfig::new(linux_settings(), Options { shared: true });
        assert_eq!(
            cfg.canonical(),
            "[settings]\narch=x86_64\nbuild_type=Release\ncompiler=gcc\nos=Linux\n[options]\nshared=True\n"
        );
    }

    #[test]
    fn test_build_record_round_trip_and_verify() {
        let dir = TempDir::new().unwrap();
        let built = BuildConfig::new(linux_settings(), Options { shared: true });
        BuildRecord::new(&built).write(dir.path()).unwrap();

        let record = BuildRecord::read(dir.path()).unwrap();
        assert_eq!(record.package_id, built.package_id());
        assert!(record.verify(&built).is_ok());

        let current = BuildConfig::new(linux_settings(), Options { shared: false });
        match record.verify(&current) {
            Err(RecipeError::ConfigMismatch { key, built, current }) => {
                assert_eq!(key, "shared");
                assert_eq!(built, "True");
                assert_eq!(current, "False");
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_build_record() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(BuildRecord::read(dir.path()), Err(RecipeError::MissingStage { .. })));
    }
}
