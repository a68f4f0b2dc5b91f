//! The source stage: clone the project and patch its build files.

use crate::error::{RecipeError, Result};
use crate::parser::{Patch, Recipe};
use crate::process::{Pipeline, Runner, Step};
use crate::utils::log::{log, LogLevel};
use std::fs;
use std::path::Path;

/// Steps that bring the sources into `source_folder`
pub fn fetch_pipeline(recipe: &Recipe, source_folder: &Path) -> Pipeline {
    let dir = recipe.source_dir();
    let mut pipeline = Pipeline::new();

    let mut clone = Step::new("git", source_folder).arg("clone");
    if let Some(branch) = &recipe.source.branch {
        clone = clone.arg("--branch").arg(branch.as_str());
    }
    pipeline.push(clone.arg(recipe.source.git.as_str()).arg(dir.as_str()).expects(dir.as_str()));

    if let Some(rev) = &recipe.source.rev {
        pipeline.push(Step::new("git", &source_folder.join(&dir)).arg("checkout").arg(rev.as_str()));
    }
    pipeline
}

/// Fetches the sources and applies every patch. Nothing is rolled back
/// when a step fails.
pub fn fetch(recipe: &Recipe, source_folder: &Path, runner: &mut dyn Runner) -> Result<()> {
    if runner.executes() {
        fs::create_dir_all(source_folder)?;
    }
    log(LogLevel::Log, &format!("Fetching {} from {}", recipe.package.name, recipe.source.git));
    fetch_pipeline(recipe, source_folder).run(runner)?;

    for patch in &recipe.source.patch {
        if !runner.executes() {
            log(LogLevel::Log, &format!("[dry-run] patch {} after '{}'", patch.file, patch.marker));
            continue;
        }
        let count = apply_patch(source_folder, patch)?;
        log(LogLevel::Info, &format!("Patched {} ({} occurrence(s))", patch.file, count));
    }
    Ok(())
}

/// Inserts the patch lines after every occurrence of the marker and
/// returns how many occurrences there were. Applying twice inserts twice.
pub fn apply_patch(source_folder: &Path, patch: &Patch) -> Result<usize> {
    let path = source_folder.join(&patch.file);
    let content = fs::read_to_string(&path)?;
    let count = content.matches(&patch.marker).count();
    if count == 0 {
        return Err(RecipeError::MarkerNotFound {
            file: path,
            marker: patch.marker.clone(),
        });
    }
    let replacement = format!("{}\n{}", patch.marker, patch.lines.join("\n"));
    fs::write(&path, content.replace(&patch.marker, &replacement))?;
    Ok(count)
}
