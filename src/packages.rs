//! This module contains the package stage: copy rules that stage build
//! artifacts into the `include`/`lib`/`bin` layout.

use crate::error::{RecipeError, Result};
use crate::hasher::Hasher;
use crate::info::{check_declared_libs, describe, PackageInfo};
use crate::parser::Recipe;
use crate::settings::{BuildConfig, BuildRecord};
use crate::utils::log::{log, LogLevel};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Binary patterns of the default rule set, `{name}` is the package name
const DEFAULT_BINARY_RULES: [(&str, &str); 5] = [
    ("*{name}.lib", "lib"),
    ("*.dll", "bin"),
    ("*.so", "lib"),
    ("*.dylib", "lib"),
    ("*.a", "lib"),
];

/// Struct describing a single copy rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyRule {
    /// Glob matched against the path relative to `src`; `*` crosses directories
    pub pattern: String,
    /// Destination directory inside the package folder
    pub dst: String,
    /// Directory inside the build folder to search, empty for the whole folder
    #[serde(default)]
    pub src: String,
    /// Keep the relative path under `dst` instead of flattening
    #[serde(default = "default_keep_path")]
    pub keep_path: bool,
}

fn default_keep_path() -> bool {
    true
}

impl CopyRule {
    pub fn new(pattern: &str, dst: &str, src: &str, keep_path: bool) -> Self {
        CopyRule {
            pattern: pattern.to_string(),
            dst: dst.to_string(),
            src: src.to_string(),
            keep_path,
        }
    }

    pub fn compile(&self) -> Result<Pattern> {
        Pattern::new(&self.pattern).map_err(|source| RecipeError::Pattern {
            pattern: self.pattern.clone(),
            source,
        })
    }

    fn destination(&self, package_root: &Path, rel: &Path) -> Option<PathBuf> {
        let dst = package_root.join(&self.dst);
        if self.keep_path {
            Some(dst.join(rel))
        } else {
            rel.file_name().map(|name| dst.join(name))
        }
    }
}

/// Headers keep their layout; binaries are flattened
pub fn default_rules(name: &str, header_src: &str) -> Vec<CopyRule> {
    let mut rules = vec![CopyRule::new("*.h", "include", header_src, true)];
    for (pattern, dst) in DEFAULT_BINARY_RULES {
        rules.push(CopyRule::new(&pattern.replace("{name}", name), dst, "", false));
    }
    rules
}

/// How many files a rule copied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub pattern: String,
    pub dst: String,
    pub matched: usize,
}

/// Applies every rule independently and in order. A rule that matches
/// nothing, or whose `src` does not exist, reports zero.
pub fn apply_rules(rules: &[CopyRule], build_root: &Path, package_root: &Path) -> Result<Vec<RuleReport>> {
    let bar = ProgressBar::new(rules.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{prefix:>10} [{bar:30}] {pos}/{len} {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_prefix("Packaging");

    let mut reports = Vec::with_capacity(rules.len());
    for rule in rules {
        bar.set_message(rule.pattern.clone());
        let matched = apply_rule(rule, build_root, package_root)?;
        if matched == 0 {
            log(LogLevel::Debug, &format!("Pattern '{}' matched no files", rule.pattern));
        } else {
            log(
                LogLevel::Info,
                &format!("Copied {} file(s) for '{}' into {}", matched, rule.pattern, rule.dst),
            );
        }
        reports.push(RuleReport {
            pattern: rule.pattern.clone(),
            dst: rule.dst.clone(),
            matched,
        });
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(reports)
}

fn apply_rule(rule: &CopyRule, build_root: &Path, package_root: &Path) -> Result<usize> {
    let pattern = rule.compile()?;
    let src_root = build_root.join(&rule.src);
    if !src_root.is_dir() {
        return Ok(0);
    }
    let package_root = package_root.to_path_buf();

    let mut matched = 0;
    for entry in WalkDir::new(&src_root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        // never copy the package folder into itself
        if path.starts_with(&package_root) || !path.is_file() {
            continue;
        }
        let rel = match path.strip_prefix(&src_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        if !pattern.matches(&rel_str) {
            continue;
        }
        let dest = match rule.destination(&package_root, rel) {
            Some(dest) => dest,
            None => continue,
        };
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
        log(LogLevel::Debug, &format!("  {} -> {}", rel_str, dest.display()));
        matched += 1;
    }
    Ok(matched)
}

/// Result of the package stage
#[derive(Debug)]
pub struct PackageSummary {
    pub reports: Vec<RuleReport>,
    pub files: usize,
    pub info: PackageInfo,
    /// Declared libraries no staged file provides
    pub undeclared: Vec<String>,
}

/// Stages the build folder into a fresh package folder
pub fn package(recipe: &Recipe, config: &BuildConfig, build_folder: &Path, package_folder: &Path) -> Result<PackageSummary> {
    let record = BuildRecord::read(build_folder)?;
    record.verify(config)?;

    if package_folder.exists() {
        fs::remove_dir_all(package_folder)?;
    }
    fs::create_dir_all(package_folder)?;
    log(LogLevel::Log, &format!("Packaging {} into {}", recipe.package.name, package_folder.display()));

    let reports = apply_rules(&recipe.copy_rules(), build_folder, package_folder)?;

    let info = describe(recipe);
    info.write(package_folder)?;
    let undeclared = check_declared_libs(&info, package_folder);
    for lib in &undeclared {
        log(
            LogLevel::Warn,
            &format!("Declared library '{}' has no matching artifact in the package", lib),
        );
    }

    let manifest = Hasher::write_manifest(package_folder)?;
    Ok(PackageSummary {
        reports,
        files: manifest.len(),
        info,
        undeclared,
    })
}
