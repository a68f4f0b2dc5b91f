//! Lifecycle commands over the work folder.
//!
//! Layout under the work folder:
//! * `source/` - the fetched and patched checkout
//! * `build/<package_id>/` - one build tree per configuration
//! * `package/<package_id>/` - the staged package

use crate::builder;
use crate::error::Result;
use crate::info::describe;
use crate::packages::{self, PackageSummary};
use crate::parser::{parse_recipe, Recipe};
use crate::process::Runner;
use crate::settings::{BuildConfig, Settings};
use crate::source;
use crate::utils::env::{detect_host_settings, load_profile};
use crate::utils::log::{log, LogLevel};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default work folder, relative to the current directory
pub static WORK_DIR: &str = "cppkg_bld";

/// Folder layout of one work directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
}

impl Layout {
    pub fn new(root: &Path) -> Self {
        Layout { root: root.to_path_buf() }
    }

    pub fn source(&self) -> PathBuf {
        self.root.join("source")
    }

    pub fn build(&self, package_id: &str) -> PathBuf {
        self.root.join("build").join(package_id)
    }

    pub fn package(&self, package_id: &str) -> PathBuf {
        self.root.join("package").join(package_id)
    }
}

/// Effective configuration: host defaults, then the profile, then `-s`
/// overrides; options start from the recipe defaults, then `-o`.
pub fn resolve_config(
    recipe: &Recipe,
    profile: Settings,
    setting_overrides: &[String],
    option_overrides: &[String],
) -> Result<BuildConfig> {
    let mut settings = detect_host_settings();
    settings.merge(&profile);
    settings.apply_overrides(setting_overrides)?;
    settings.retain_declared(&recipe.settings);

    let mut options = recipe.options;
    options.apply_overrides(option_overrides)?;
    Ok(BuildConfig::new(settings, options))
}

/// A recipe bound to a configuration and a work folder
#[derive(Debug, Clone)]
pub struct Session {
    pub recipe: Recipe,
    /// Directory requirements are resolved against
    pub recipe_dir: PathBuf,
    pub config: BuildConfig,
    pub layout: Layout,
}

impl Session {
    /// Loads the recipe and resolves its configuration
    pub fn load(
        recipe_path: &Path,
        work_dir: &Path,
        profile: Option<&str>,
        setting_overrides: &[String],
        option_overrides: &[String],
    ) -> Result<Session> {
        let recipe = parse_recipe(recipe_path)?;
        let profile = load_profile(profile)?;
        let config = resolve_config(&recipe, profile, setting_overrides, option_overrides)?;
        let recipe_dir = recipe_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Session::new(recipe, recipe_dir, config, Layout::new(work_dir)))
    }

    pub fn new(recipe: Recipe, recipe_dir: PathBuf, config: BuildConfig, layout: Layout) -> Self {
        Session {
            recipe,
            recipe_dir,
            config,
            layout,
        }
    }

    pub fn package_id(&self) -> String {
        self.config.package_id()
    }

    pub fn build_folder(&self) -> PathBuf {
        self.layout.build(&self.package_id())
    }

    pub fn package_folder(&self) -> PathBuf {
        self.layout.package(&self.package_id())
    }

    /// Recreates the source folder and fetches into it
    pub fn source(&self, runner: &mut dyn Runner) -> Result<()> {
        let folder = self.layout.source();
        if runner.executes() && folder.exists() {
            fs::remove_dir_all(&folder)?;
        }
        source::fetch(&self.recipe, &folder, runner)
    }

    pub fn build(&self, runner: &mut dyn Runner) -> Result<()> {
        log(LogLevel::Info, &format!("Package id: {}", self.package_id()));
        builder::build(
            &self.recipe,
            &self.config,
            &self.layout.source(),
            &self.build_folder(),
            &self.recipe_dir,
            runner,
        )
    }

    pub fn package(&self) -> Result<PackageSummary> {
        let summary = packages::package(&self.recipe, &self.config, &self.build_folder(), &self.package_folder())?;
        log(
            LogLevel::Log,
            &format!(
                "Packaged {} file(s) into {}",
                summary.files,
                self.package_folder().display()
            ),
        );
        Ok(summary)
    }

    /// The package info as pretty JSON
    pub fn info(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&describe(&self.recipe))?)
    }

    /// Runs source, build, package and info in order. Packaging is skipped
    /// for dry runs since nothing was built.
    pub fn create(&self, runner: &mut dyn Runner) -> Result<Option<PackageSummary>> {
        self.source(runner)?;
        self.build(runner)?;
        if !runner.executes() {
            return Ok(None);
        }
        let summary = self.package()?;
        Ok(Some(summary))
    }

    /// Human-readable description of the recipe and its configuration
    pub fn inspect(&self) -> String {
        let meta = &self.recipe.package;
        let mut out = String::new();
        out.push_str(&format!("{} {}/{}\n", "Package:".bold(), meta.name, meta.version));
        for (label, value) in [
            ("Description:", &meta.description),
            ("License:", &meta.license),
            ("URL:", &meta.url),
        ] {
            if let Some(value) = value {
                out.push_str(&format!("{} {}\n", label.bold(), value));
            }
        }
        out.push_str(&format!("{} {}\n", "Source:".bold(), self.recipe.source.git));
        out.push_str(&format!("{}\n", "Options:".bold()));
        out.push_str(&format!("    shared={}\n", self.config.options.shared));
        out.push_str(&format!("{}\n", "Settings:".bold()));
        for (key, value) in self.config.settings.iter() {
            out.push_str(&format!("    {}={}\n", key, value));
        }
        out.push_str(&format!("{} {}\n", "Package id:".bold(), self.package_id()));
        out
    }
}

/// Removes the whole work folder
pub fn clean(work_dir: &Path) -> Result<()> {
    if work_dir.exists() {
        fs::remove_dir_all(work_dir)?;
        log(LogLevel::Log, &format!("Cleaning: {}", work_dir.display()));
    } else {
        log(LogLevel::Info, &format!("Nothing to clean at {}", work_dir.display()));
    }
    Ok(())
}
