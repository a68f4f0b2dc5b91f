//! Writes `cppkgbuildinfo.cmake`, the file a patched CMakeLists includes
//! to pick up settings and the packages it requires.

use crate::error::{RecipeError, Result};
use crate::info::PackageInfo;
use crate::parser::Recipe;
use crate::settings::BuildConfig;
use crate::utils::log::{log, LogLevel};
use itertools::Itertools;
use std::fs;
use std::path::{Path, PathBuf};

pub const BUILD_INFO: &str = "cppkgbuildinfo.cmake";

/// Aggregated directories and libraries of every required package
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DepsInfo {
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
    pub libs: Vec<String>,
}

impl DepsInfo {
    fn add(&mut self, root: &Path, info: &PackageInfo) {
        let abs = |dir: &String| cmake_path(&root.join(dir));
        self.include_dirs.extend(info.include_dirs.iter().map(abs));
        self.lib_dirs.extend(info.lib_dirs.iter().map(abs));
        self.bin_dirs.extend(info.bin_dirs.iter().map(abs));
        self.libs.extend(info.libs.iter().cloned());
    }

    fn dedup(self) -> Self {
        DepsInfo {
            include_dirs: self.include_dirs.into_iter().unique().collect(),
            lib_dirs: self.lib_dirs.into_iter().unique().collect(),
            bin_dirs: self.bin_dirs.into_iter().unique().collect(),
            libs: self.libs.into_iter().unique().collect(),
        }
    }
}

fn cmake_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Reads `package_info.json` from every required package folder.
/// Relative entries are resolved against `base`.
pub fn collect_deps(requires: &[String], base: &Path) -> Result<DepsInfo> {
    let mut deps = DepsInfo::default();
    for req in requires {
        let root: PathBuf = base.join(req);
        let info = PackageInfo::read(&root).map_err(|e| RecipeError::MissingStage {
            stage: format!("package of requirement '{}' ({})", req, e),
            path: root.clone(),
        })?;
        log(LogLevel::Info, &format!("Using requirement {}/{}", info.name, info.version));
        deps.add(&root, &info);
    }
    Ok(deps.dedup())
}

fn runtime_block(config: &BuildConfig) -> Option<String> {
    if config.settings.compiler() != Some("Visual Studio") {
        return None;
    }
    let runtime = config.settings.get("compiler.runtime")?;
    Some(format!(
        "    if(MSVC)\n\
         \x20       foreach(flag CMAKE_C_FLAGS CMAKE_C_FLAGS_DEBUG CMAKE_C_FLAGS_RELEASE CMAKE_CXX_FLAGS CMAKE_CXX_FLAGS_DEBUG CMAKE_CXX_FLAGS_RELEASE)\n\
         \x20           string(REGEX REPLACE \"/M[TD]d?\" \"/{}\" ${{flag}} \"${{${{flag}}}}\")\n\
         \x20       endforeach()\n\
         \x20   endif()\n",
        runtime
    ))
}

fn set_list(name: &str, values: &[String]) -> String {
    format!("set({} {})\n", name, values.iter().map(|v| format!("\"{}\"", v)).join(" "))
}

/// Renders the build info file
pub fn render(recipe: &Recipe, config: &BuildConfig, deps: &DepsInfo) -> String {
    let mut out = String::from("# Generated by cppkg, do not edit\n\n");
    out.push_str(&format!("set(CPPKG_PACKAGE_NAME \"{}\")\n", recipe.package.name));
    out.push_str(&format!("set(CPPKG_PACKAGE_VERSION \"{}\")\n", recipe.package.version));
    for (key, value) in config.settings.iter() {
        let var = key.replace('.', "_").to_uppercase();
        out.push_str(&format!("set(CPPKG_SETTINGS_{} \"{}\")\n", var, value));
    }
    out.push_str(&format!(
        "set(CPPKG_SHARED {})\n\n",
        if config.options.shared { "ON" } else { "OFF" }
    ));
    out.push_str(&set_list("CPPKG_INCLUDE_DIRS", &deps.include_dirs));
    out.push_str(&set_list("CPPKG_LIB_DIRS", &deps.lib_dirs));
    out.push_str(&set_list("CPPKG_BIN_DIRS", &deps.bin_dirs));
    out.push_str(&set_list("CPPKG_LIBS", &deps.libs));

    out.push_str("\nmacro(cppkg_basic_setup)\n");
    out.push_str("    message(STATUS \"cppkg: using build info for ${CPPKG_PACKAGE_NAME}\")\n");
    out.push_str("    include_directories(${CPPKG_INCLUDE_DIRS})\n");
    out.push_str("    link_directories(${CPPKG_LIB_DIRS})\n");
    out.push_str("    link_libraries(${CPPKG_LIBS})\n");
    if let Some(build_type) = config.settings.build_type() {
        out.push_str(&format!(
            "    if(NOT CMAKE_CONFIGURATION_TYPES AND NOT CMAKE_BUILD_TYPE)\n        set(CMAKE_BUILD_TYPE \"{}\")\n    endif()\n",
            build_type
        ));
    }
    if let Some(block) = runtime_block(config) {
        out.push_str(&block);
    }
    out.push_str("endmacro()\n");
    out
}

/// Writes the build info file into `build_folder`
pub fn write_build_info(recipe: &Recipe, config: &BuildConfig, build_folder: &Path, base: &Path) -> Result<PathBuf> {
    let deps = collect_deps(&recipe.requires, base)?;
    let path = build_folder.join(BUILD_INFO);
    fs::write(&path, render(recipe, config, &deps))?;
    log(LogLevel::Debug, &format!("Wrote {}", path.display()));
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::describe;
    use crate::parser::parse_recipe_str;
    use crate::settings::{Options, Settings};
    use tempfile::TempDir;

    const RECIPE: &str = r#"
[package]
name = "pomar"
version = "0.1"

[source]
git = "https://github.com/dennisjosesilva/pomar.git"
"#;

    fn config(compiler: &str) -> BuildConfig {
        let mut settings = Settings::new();
        settings.set("os", "Windows").unwrap();
        settings.set("compiler", compiler).unwrap();
        settings.set("compiler.runtime", "MT").unwrap();
        settings.set("build_type", "Release").unwrap();
        BuildConfig::new(settings, Options { shared: true })
    }

    #[test]
    fn test_render_settings_and_macro() {
        let recipe = parse_recipe_str(RECIPE, "r").unwrap();
        let text = render(&recipe, &config("gcc"), &DepsInfo::default());
        assert!(text.contains("set(CPPKG_PACKAGE_NAME \"pomar\")"));
        assert!(text.contains("set(CPPKG_SETTINGS_COMPILER_RUNTIME \"MT\")"));
        assert!(text.contains("set(CPPKG_SHARED ON)"));
        assert!(text.contains("macro(cppkg_basic_setup)"));
        assert!(text.contains("set(CMAKE_BUILD_TYPE \"Release\")"));
        assert!(!text.contains("REGEX REPLACE"));
        assert!(text.trim_end().ends_with("endmacro()"));
    }

    #[test]
    fn test_runtime_only_for_visual_studio() {
        let recipe = parse_recipe_str(RECIPE, "r").unwrap();
        let text = render(&recipe, &config("Visual Studio"), &DepsInfo::default());
        assert!(text.contains("\"/MT\""));
    }

    #[test]
    fn test_collect_deps_from_package_folders() {
        let dir = TempDir::new().unwrap();
        let dep_root = dir.path().join("zlib");
        fs::create_dir_all(&dep_root).unwrap();
        let mut info = describe(&parse_recipe_str(RECIPE, "r").unwrap());
        info.name = "zlib".to_string();
        info.libs = vec!["z".to_string()];
        info.write(&dep_root).unwrap();

        let deps = collect_deps(&["zlib".to_string(), "zlib".to_string()], dir.path()).unwrap();
        assert_eq!(deps.libs, vec!["z"]);
        assert_eq!(deps.include_dirs, vec![cmake_path(&dep_root.join("include"))]);

        assert!(collect_deps(&["missing".to_string()], dir.path()).is_err());
    }
}
