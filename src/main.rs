use clap::{Parser, Subcommand};
use cppkg::commands::{self, Session, WORK_DIR};
use cppkg::error::Result;
use cppkg::process::{DryRunRunner, Runner, SystemRunner};
use cppkg::utils::log::{log, set_log_level, LogLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cppkg")]
#[command(version)]
#[command(about = "Fetch, build and package C/C++ libraries from a recipe", long_about = None)]
struct Cli {
    /// Path to the recipe file
    #[arg(short, long, default_value = "recipe.toml", global = true)]
    recipe: PathBuf,

    /// Work folder holding sources, builds and packages
    #[arg(short, long, default_value = WORK_DIR, global = true)]
    work_dir: PathBuf,

    /// Settings profile, a file path or a name under the config directory
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Option override, e.g. -o shared=True
    #[arg(short = 'o', long = "option", global = true)]
    options: Vec<String>,

    /// Setting override, e.g. -s build_type=Debug
    #[arg(short = 's', long = "setting", global = true)]
    settings: Vec<String>,

    /// Print external commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone and patch the sources
    Source,
    /// Configure and compile the fetched sources
    Build,
    /// Stage headers and libraries into the package folder
    Package,
    /// Print the declared package info as JSON
    Info,
    /// Run source, build and package in order
    Create,
    /// Show the recipe and its effective configuration
    Inspect,
    /// Remove the work folder
    Clean,
}

fn run(cli: &Cli) -> Result<()> {
    if let Commands::Clean = cli.command {
        return commands::clean(&cli.work_dir);
    }

    let session = Session::load(
        &cli.recipe,
        &cli.work_dir,
        cli.profile.as_deref(),
        &cli.settings,
        &cli.options,
    )?;
    let mut runner: Box<dyn Runner> = if cli.dry_run {
        Box::new(DryRunRunner::default())
    } else {
        Box::new(SystemRunner)
    };

    match cli.command {
        Commands::Source => session.source(runner.as_mut())?,
        Commands::Build => session.build(runner.as_mut())?,
        Commands::Package => {
            session.package()?;
        }
        Commands::Info => println!("{}", session.info()?),
        Commands::Create => {
            if let Some(summary) = session.create(runner.as_mut())? {
                println!("{}", serde_json::to_string_pretty(&summary.info)?);
            }
        }
        Commands::Inspect => print!("{}", session.inspect()),
        Commands::Clean => {}
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        set_log_level(LogLevel::Debug);
    }
    if let Err(e) = run(&cli) {
        log(LogLevel::Error, &e.to_string());
        std::process::exit(1);
    }
}
