//! Parsing Module

use crate::error::{RecipeError, Result};
use crate::packages::{default_rules, CopyRule};
use crate::settings::{Options, KNOWN_SETTINGS};
use crate::utils::log::{log, LogLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

/// Struct describing a complete recipe file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    /// Setting names this recipe honours; the rest are dropped
    #[serde(default = "default_settings")]
    pub settings: Vec<String>,
    /// Paths to package folders this build consumes
    #[serde(default)]
    pub requires: Vec<String>,
    pub package: PackageMeta,
    /// Default option values, overridable with `-o`
    #[serde(default)]
    pub options: Options,
    pub source: SourceSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub copy: Vec<CopyRule>,
    #[serde(default)]
    pub info: InfoSection,
}

/// Struct describing the package metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageMeta {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Struct describing where the sources come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    pub git: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub rev: Option<String>,
    /// Checkout directory name, derived from the URL when absent
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub patch: Vec<Patch>,
}

/// A textual insertion after every occurrence of a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Patch {
    /// Path relative to the source folder
    pub file: String,
    pub marker: String,
    #[serde(default = "default_patch_lines")]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Extra `-D` definitions for the configure step
    #[serde(default)]
    pub definitions: BTreeMap<String, String>,
}

/// What the recipe declares to consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfoSection {
    /// Library names consumers link against; the package name when empty
    #[serde(default)]
    pub libs: Vec<String>,
    #[serde(default = "default_include_dirs")]
    pub include_dirs: Vec<String>,
    #[serde(default = "default_lib_dirs")]
    pub lib_dirs: Vec<String>,
    #[serde(default = "default_bin_dirs")]
    pub bin_dirs: Vec<String>,
}

impl Default for InfoSection {
    fn default() -> Self {
        InfoSection {
            libs: Vec::new(),
            include_dirs: default_include_dirs(),
            lib_dirs: default_lib_dirs(),
            bin_dirs: default_bin_dirs(),
        }
    }
}

fn default_settings() -> Vec<String> {
    KNOWN_SETTINGS.iter().map(|s| s.to_string()).collect()
}

/// The two lines that hook the generated build info into a CMake project
pub fn default_patch_lines() -> Vec<String> {
    vec![
        "include(${CMAKE_BINARY_DIR}/cppkgbuildinfo.cmake)".to_string(),
        "cppkg_basic_setup()".to_string(),
    ]
}

fn default_include_dirs() -> Vec<String> {
    vec!["include".to_string()]
}

fn default_lib_dirs() -> Vec<String> {
    vec!["lib".to_string()]
}

fn default_bin_dirs() -> Vec<String> {
    vec!["bin".to_string()]
}

impl Recipe {
    /// Name of the directory the clone lands in
    pub fn source_dir(&self) -> String {
        if let Some(dir) = &self.source.dir {
            return dir.clone();
        }
        let url = self.source.git.trim_end_matches('/');
        let last = url.rsplit(|c: char| c == '/' || c == ':').next().unwrap_or(url);
        last.strip_suffix(".git").unwrap_or(last).to_string()
    }

    /// Explicit copy rules, or the default set when the recipe has none
    pub fn copy_rules(&self) -> Vec<CopyRule> {
        if self.copy.is_empty() {
            default_rules(&self.package.name, &format!("{}/include", self.source_dir()))
        } else {
            self.copy.clone()
        }
    }

    /// Declared library names
    pub fn libs(&self) -> Vec<String> {
        if self.info.libs.is_empty() {
            vec![self.package.name.clone()]
        } else {
            self.info.libs.clone()
        }
    }

    fn validate(&self, origin: &str) -> Result<()> {
        let invalid = |reason: String| RecipeError::InvalidRecipe {
            path: origin.to_string(),
            reason,
        };
        if self.package.name.trim().is_empty() {
            return Err(invalid("package.name is empty".to_string()));
        }
        if self.package.version.trim().is_empty() {
            return Err(invalid("package.version is empty".to_string()));
        }
        if self.source.git.trim().is_empty() {
            return Err(invalid("source.git is empty".to_string()));
        }
        if !is_plain_relative(&self.source_dir()) {
            return Err(invalid(format!("source directory '{}' must be a plain relative path", self.source_dir())));
        }
        for setting in &self.settings {
            if !KNOWN_SETTINGS.contains(&setting.as_str()) {
                return Err(invalid(format!("unknown setting '{}'", setting)));
            }
        }
        for patch in &self.source.patch {
            if !is_plain_relative(&patch.file) {
                return Err(invalid(format!("patch file '{}' must be a relative path", patch.file)));
            }
            if patch.marker.is_empty() {
                return Err(invalid(format!("patch for '{}' has an empty marker", patch.file)));
            }
        }
        for rule in &self.copy {
            rule.compile()?;
            if !is_plain_relative(&rule.dst) || !(rule.src.is_empty() || is_plain_relative(&rule.src)) {
                return Err(invalid(format!("copy rule '{}' must use relative src and dst", rule.pattern)));
            }
        }
        Ok(())
    }
}

/// True for a non-empty relative path without `..` components
fn is_plain_relative(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Parses recipe text; `origin` names it in error messages
pub fn parse_recipe_str(text: &str, origin: &str) -> Result<Recipe> {
    let recipe: Recipe = toml::from_str(text)?;
    recipe.validate(origin)?;
    log(
        LogLevel::Debug,
        &format!("Parsed recipe {}/{} from {}", recipe.package.name, recipe.package.version, origin),
    );
    Ok(recipe)
}

/// This function is used to parse the recipe file
/// # Arguments
/// * `path` - The path to the recipe file
pub fn parse_recipe(path: &Path) -> Result<Recipe> {
    let text = fs::read_to_string(path).map_err(|e| RecipeError::InvalidRecipe {
        path: path.display().to_string(),
        reason: format!("could not read file: {}", e),
    })?;
    parse_recipe_str(&text, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POMAR: &str = r#"
[package]
name = "pomar"
version = "0.1"

[source]
git = "https://github.com/dennisjosesilva/pomar.git"

[[source.patch]]
file = "pomar/CMakeLists.txt"
marker = "PROJECT(pomar)"
"#;

    #[test]
    fn test_minimal_recipe_defaults() {
        let recipe = parse_recipe_str(POMAR, "pomar.toml").unwrap();
        assert_eq!(recipe.package.name, "pomar");
        assert!(!recipe.options.shared);
        assert_eq!(recipe.settings, vec!["os", "compiler", "build_type", "arch"]);
        assert_eq!(recipe.source_dir(), "pomar");
        assert_eq!(recipe.source.patch[0].lines, default_patch_lines());
        assert_eq!(recipe.libs(), vec!["pomar"]);
        assert_eq!(recipe.info.include_dirs, vec!["include"]);
    }

    #[test]
    fn test_default_copy_rules_when_none_given() {
        let recipe = parse_recipe_str(POMAR, "pomar.toml").unwrap();
        let rules = recipe.copy_rules();
        assert_eq!(rules.len(), 6);
        assert_eq!(rules[0].pattern, "*.h");
        assert_eq!(rules[0].src, "pomar/include");
        assert!(rules[0].keep_path);
        assert_eq!(rules[1].pattern, "*pomar.lib");
        assert!(rules[1..].iter().all(|r| !r.keep_path));
    }

    #[test]
    fn test_source_dir_derivation() {
        let mut recipe = parse_recipe_str(POMAR, "pomar.toml").unwrap();
        recipe.source.git = "git@github.com:org/tool".to_string();
        assert_eq!(recipe.source_dir(), "tool");
        recipe.source.git = "https://example.com/repo.git/".to_string();
        assert_eq!(recipe.source_dir(), "repo");
        recipe.source.dir = Some("checkout".to_string());
        assert_eq!(recipe.source_dir(), "checkout");
    }

    #[test]
    fn test_explicit_rules_and_options() {
        let text = format!(
            "{}\n[options]\nshared = true\n\n[[copy]]\npattern = \"*.hpp\"\ndst = \"include\"\nsrc = \"pomar/include\"\n\n[info]\nlibs = [\"hello\"]\n",
            POMAR
        );
        let recipe = parse_recipe_str(&text, "pomar.toml").unwrap();
        assert!(recipe.options.shared);
        let rules = recipe.copy_rules();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].keep_path);
        assert_eq!(recipe.libs(), vec!["hello"]);
    }

    #[test]
    fn test_rejects_invalid_recipes() {
        let empty_name = POMAR.replace("name = \"pomar\"", "name = \"\"");
        assert!(matches!(
            parse_recipe_str(&empty_name, "x"),
            Err(RecipeError::InvalidRecipe { .. })
        ));

        let escaping = format!("{}\n[[copy]]\npattern = \"*.a\"\ndst = \"../lib\"\n", POMAR);
        assert!(parse_recipe_str(&escaping, "x").is_err());

        let bad_glob = format!("{}\n[[copy]]\npattern = \"[\"\ndst = \"lib\"\n", POMAR);
        assert!(matches!(parse_recipe_str(&bad_glob, "x"), Err(RecipeError::Pattern { .. })));

        let bad_setting = format!("settings = [\"os\", \"flavor\"]\n{}", POMAR);
        assert!(parse_recipe_str(&bad_setting, "x").is_err());

        assert!(matches!(parse_recipe_str("[package", "x"), Err(RecipeError::Parse(_))));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let unknown_option = format!("{}\n[options]\nshared = false\nfPIC = true\n", POMAR);
        assert!(matches!(parse_recipe_str(&unknown_option, "x"), Err(RecipeError::Parse(_))));

        let misspelled_section = format!("{}\n[[copies]]\npattern = \"*.a\"\ndst = \"lib\"\n", POMAR);
        assert!(matches!(parse_recipe_str(&misspelled_section, "x"), Err(RecipeError::Parse(_))));

        let misspelled_rule = format!("{}\n[[copy]]\npattern = \"*.a\"\ndst = \"lib\"\nkeep_paths = false\n", POMAR);
        assert!(parse_recipe_str(&misspelled_rule, "x").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(parse_recipe(Path::new("/nonexistent/recipe.toml")).is_err());
    }
}
