//! The build stage: configure and compile the fetched project with CMake.

use crate::error::{RecipeError, Result};
use crate::generator::write_build_info;
use crate::parser::Recipe;
use crate::process::{Pipeline, Runner, Step};
use crate::settings::{BuildConfig, BuildRecord, Options, Settings};
use crate::utils::log::{log, LogLevel};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const SHARED_FLAG: &str = "-DBUILD_SHARED_LIBS=ON";

/// The linkage flag for the configure step; empty for static builds
pub fn shared_flag(options: &Options) -> &'static str {
    if options.shared {
        SHARED_FLAG
    } else {
        ""
    }
}

fn is_visual_studio(settings: &Settings) -> bool {
    settings.compiler() == Some("Visual Studio")
}

/// Visual Studio generators pick the build type at build time
pub fn is_multi_config(settings: &Settings) -> bool {
    is_visual_studio(settings)
}

/// CMake generator name for the given settings
pub fn generator(settings: &Settings) -> String {
    if is_visual_studio(settings) {
        let year = match settings.get("compiler.version").unwrap_or("17") {
            "14" => "14 2015",
            "15" => "15 2017",
            "16" => "16 2019",
            _ => "17 2022",
        };
        return format!("Visual Studio {}", year);
    }
    if settings.os() == Some("Windows") && settings.compiler() == Some("gcc") {
        return "MinGW Makefiles".to_string();
    }
    "Unix Makefiles".to_string()
}

fn vs_platform(arch: &str) -> &str {
    match arch {
        "x86" => "Win32",
        "armv8" => "ARM64",
        "armv7" => "ARM",
        _ => "x64",
    }
}

/// Arguments forwarding the settings to the configure step
pub fn cmake_command_line(settings: &Settings) -> Vec<String> {
    let mut args = vec!["-G".to_string(), generator(settings)];
    if !is_multi_config(settings) {
        if let Some(build_type) = settings.build_type() {
            args.push(format!("-DCMAKE_BUILD_TYPE={}", build_type));
        }
    }
    if is_visual_studio(settings) {
        args.push("-A".to_string());
        args.push(vs_platform(settings.arch().unwrap_or("x86_64")).to_string());
    }
    args.push("-DCPPKG_EXPORTED=1".to_string());
    if let Some(compiler) = settings.compiler() {
        args.push(format!("-DCPPKG_COMPILER={}", compiler));
    }
    if let Some(version) = settings.get("compiler.version") {
        args.push(format!("-DCPPKG_COMPILER_VERSION={}", version));
    }
    let gnu_like = matches!(settings.compiler(), Some("gcc") | Some("clang") | Some("apple-clang"));
    if settings.arch() == Some("x86") && gnu_like {
        args.push("-DCMAKE_C_FLAGS=-m32".to_string());
        args.push("-DCMAKE_CXX_FLAGS=-m32".to_string());
    }
    args
}

/// Extra arguments for `cmake --build`
pub fn build_config(settings: &Settings) -> Vec<String> {
    match settings.build_type() {
        Some(build_type) if is_multi_config(settings) => vec!["--config".to_string(), build_type.to_string()],
        _ => Vec::new(),
    }
}

/// Configure then compile, both run from the build folder
pub fn build_pipeline(recipe: &Recipe, config: &BuildConfig, build_folder: &Path) -> Pipeline {
    let definitions = recipe.build.definitions.iter().map(|(k, v)| format!("-D{}={}", k, v));
    let configure = Step::new("cmake", build_folder)
        .arg(recipe.source_dir())
        .args(cmake_command_line(&config.settings))
        .args([shared_flag(&config.options)])
        .args(definitions)
        .expects("CMakeCache.txt");
    let compile = Step::new("cmake", build_folder)
        .args(["--build", "."])
        .args(build_config(&config.settings));

    let mut pipeline = Pipeline::new();
    pipeline.push(configure);
    pipeline.push(compile);
    pipeline
}

fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = match entry.path().strip_prefix(from) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else if entry.path().is_file() {
            fs::copy(entry.path(), &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Builds the fetched sources in a fresh `build_folder`. Requirements in
/// the recipe are resolved against `base`.
pub fn build(
    recipe: &Recipe,
    config: &BuildConfig,
    source_folder: &Path,
    build_folder: &Path,
    base: &Path,
    runner: &mut dyn Runner,
) -> Result<()> {
    log(
        LogLevel::Log,
        &format!(
            "Building {} (shared={}) in {}",
            recipe.package.name,
            config.options.shared,
            build_folder.display()
        ),
    );
    if runner.executes() {
        let checkout = source_folder.join(recipe.source_dir());
        if !checkout.is_dir() {
            return Err(RecipeError::MissingStage {
                stage: "source".to_string(),
                path: checkout,
            });
        }
        if build_folder.exists() {
            fs::remove_dir_all(build_folder)?;
        }
        fs::create_dir_all(build_folder)?;
        let copied = copy_tree(source_folder, build_folder)?;
        log(LogLevel::Debug, &format!("Copied {} source file(s) into the build folder", copied));
        write_build_info(recipe, config, build_folder, base)?;
        BuildRecord::new(config).write(build_folder)?;
    }
    build_pipeline(recipe, config, build_folder).run(runner)?;
    log(LogLevel::Log, "Build complete!");
    Ok(())
}
