//! Package info: what a package declares to its consumers.

use crate::error::Result;
use crate::parser::Recipe;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name of the package info written into every package folder
pub const PACKAGE_INFO: &str = "package_info.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub libs: Vec<String>,
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
}

impl PackageInfo {
    pub fn write(&self, package_folder: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(package_folder.join(PACKAGE_INFO), json)?;
        Ok(())
    }

    pub fn read(package_folder: &Path) -> Result<PackageInfo> {
        let text = fs::read_to_string(package_folder.join(PACKAGE_INFO))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Declares the libraries consumers link against. Only the recipe is
/// consulted; options and staged files have no influence.
pub fn describe(recipe: &Recipe) -> PackageInfo {
    PackageInfo {
        name: recipe.package.name.clone(),
        version: recipe.package.version.clone(),
        libs: recipe.libs(),
        include_dirs: recipe.info.include_dirs.clone(),
        lib_dirs: recipe.info.lib_dirs.clone(),
        bin_dirs: recipe.info.bin_dirs.clone(),
    }
}

/// File names a library called `lib` may be staged as
fn artifact_names(lib: &str) -> [String; 5] {
    [
        format!("lib{}.a", lib),
        format!("lib{}.so", lib),
        format!("lib{}.dylib", lib),
        format!("{}.lib", lib),
        format!("{}.dll", lib),
    ]
}

/// Returns the declared libraries that no staged artifact provides.
pub fn check_declared_libs(info: &PackageInfo, package_folder: &Path) -> Vec<String> {
    let mut staged: Vec<String> = Vec::new();
    for dir in info.lib_dirs.iter().chain(info.bin_dirs.iter()) {
        let Ok(entries) = fs::read_dir(package_folder.join(dir)) else {
            continue;
        };
        for entry in entries.flatten() {
            staged.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    info.libs
        .iter()
        .filter(|lib| {
            let names = artifact_names(lib);
            let versioned = format!("lib{}.so.", lib);
            !staged
                .iter()
                .any(|file| names.contains(file) || file.starts_with(&versioned))
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_recipe_str;
    use tempfile::TempDir;

    const RECIPE: &str = r#"
[package]
name = "pomar"
version = "0.1"

[source]
git = "https://github.com/dennisjosesilva/pomar.git"

[info]
libs = ["hello"]
"#;

    #[test]
    fn test_describe_is_independent_of_options() {
        let mut recipe = parse_recipe_str(RECIPE, "r").unwrap();
        let static_info = describe(&recipe);
        recipe.options.shared = true;
        let shared_info = describe(&recipe);
        assert_eq!(static_info, shared_info);
        assert_eq!(static_info.libs, vec!["hello"]);
        assert_eq!(static_info.lib_dirs, vec!["lib"]);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let info = describe(&parse_recipe_str(RECIPE, "r").unwrap());
        info.write(dir.path()).unwrap();
        assert_eq!(PackageInfo::read(dir.path()).unwrap(), info);
    }

    #[test]
    fn test_check_declared_libs() {
        let dir = TempDir::new().unwrap();
        let mut info = describe(&parse_recipe_str(RECIPE, "r").unwrap());
        info.libs = vec!["pomar".to_string(), "hello".to_string(), "zlib".to_string()];
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("lib/libpomar.so.1"), "").unwrap();
        fs::write(dir.path().join("bin/zlib.dll"), "").unwrap();

        assert_eq!(check_declared_libs(&info, dir.path()), vec!["hello"]);
    }

    #[test]
    fn test_check_declared_libs_on_empty_package() {
        let dir = TempDir::new().unwrap();
        let info = describe(&parse_recipe_str(RECIPE, "r").unwrap());
        assert_eq!(check_declared_libs(&info, dir.path()), vec!["hello"]);
    }
}
