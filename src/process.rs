//! External process orchestration.
//!
//! Every stage describes its work as a [`Pipeline`] of [`Step`]s and hands
//! it to a [`Runner`]. The system runner spawns real processes; the dry-run
//! runner only records what would have been executed.

use crate::error::{RecipeError, Result};
use crate::utils::log::{log, LogLevel};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// One external command: what to run, where, and what it must leave behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Paths (absolute, or relative to `cwd`) that must exist afterwards
    pub expected_artifacts: Vec<PathBuf>,
}

impl Step {
    pub fn new(program: &str, cwd: &Path) -> Self {
        Step {
            program: program.to_string(),
            args: Vec::new(),
            cwd: cwd.to_path_buf(),
            expected_artifacts: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds every non-empty argument; empty flags are dropped
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for arg in args {
            let arg = arg.into();
            if !arg.is_empty() {
                self.args.push(arg);
            }
        }
        self
    }

    pub fn expects(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.expected_artifacts.push(artifact.into());
        self
    }

    fn missing_artifact(&self) -> Option<PathBuf> {
        self.expected_artifacts
            .iter()
            .map(|a| self.cwd.join(a))
            .find(|a| !a.exists())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Executes single steps
pub trait Runner {
    fn run(&mut self, step: &Step) -> Result<()>;

    /// False for runners that do not actually touch the filesystem
    fn executes(&self) -> bool {
        true
    }
}

/// Owns a child process and reaps it on every exit path, killing it
/// first if it is still running.
struct ChildGuard {
    child: Child,
}

impl ChildGuard {
    fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait()
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// Spawns real processes, inheriting stdio so tool output reaches the user
#[derive(Debug, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&mut self, step: &Step) -> Result<()> {
        let child = Command::new(&step.program)
            .args(&step.args)
            .current_dir(&step.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RecipeError::Spawn {
                command: step.to_string(),
                source,
            })?;
        let mut guard = ChildGuard { child };
        let status = guard.wait()?;
        if !status.success() {
            return Err(RecipeError::CommandFailed {
                command: step.to_string(),
                code: status.code(),
            });
        }
        Ok(())
    }
}

/// Records steps instead of running them
#[derive(Debug, Default)]
pub struct DryRunRunner {
    pub executed: Vec<Step>,
}

impl Runner for DryRunRunner {
    fn run(&mut self, step: &Step) -> Result<()> {
        log(LogLevel::Log, &format!("[dry-run] ({}) {}", step.cwd.display(), step));
        self.executed.push(step.clone());
        Ok(())
    }

    fn executes(&self) -> bool {
        false
    }
}

/// An ordered list of steps run one after another; the first failure
/// aborts the rest.
#[derive(Debug, Default, Clone)]
pub struct Pipeline {
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline { steps: Vec::new() }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn run(&self, runner: &mut dyn Runner) -> Result<()> {
        for step in &self.steps {
            log(LogLevel::Info, &format!("Running: {}", step));
            runner.run(step)?;
            if !runner.executes() {
                continue;
            }
            if let Some(artifact) = step.missing_artifact() {
                return Err(RecipeError::MissingArtifact {
                    command: step.to_string(),
                    artifact,
                });
            }
        }
        Ok(())
    }
}
