//! Error types shared by every lifecycle stage

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing, fetching, building or packaging a recipe
#[derive(Error, Debug)]
pub enum RecipeError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Recipe or profile file is not valid TOML
    #[error("Could not parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Build record could not be serialized
    #[error("Could not serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// package_info.json could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Recipe parsed but failed validation
    #[error("Invalid recipe '{path}': {reason}")]
    InvalidRecipe { path: String, reason: String },

    #[error("Invalid option '{0}': {1}")]
    InvalidOption(String, String),

    #[error("Invalid setting '{0}': {1}")]
    InvalidSetting(String, String),

    /// Copy rule pattern is not a valid glob
    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Patch marker does not occur in the target file
    #[error("Marker '{marker}' not found in {}", .file.display())]
    MarkerNotFound { file: PathBuf, marker: String },

    /// External command exited with a non-zero status
    #[error("Command `{command}` failed with {}", .code.map_or("a signal".to_string(), |c| format!("exit code {}", c)))]
    CommandFailed { command: String, code: Option<i32> },

    /// External command could not be started
    #[error("Could not start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Command succeeded but did not produce what it promised
    #[error("Command `{command}` did not produce {}", .artifact.display())]
    MissingArtifact { command: String, artifact: PathBuf },

    /// A lifecycle stage was run before the stage it depends on
    #[error("{stage} has not been run: {} does not exist", .path.display())]
    MissingStage { stage: String, path: PathBuf },

    /// Package step configuration differs from the one recorded at build time
    #[error("Configuration mismatch for '{key}': built with '{built}', packaging with '{current}'")]
    ConfigMismatch {
        key: String,
        built: String,
        current: String,
    },

    #[error("Could not load profile '{0}': {1}")]
    Profile(String, String),
}

pub type Result<T> = std::result::Result<T, RecipeError>;
