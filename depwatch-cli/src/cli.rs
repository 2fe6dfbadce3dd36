//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Depwatch -- dependency vulnerability lookup.
///
/// Use `depwatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "depwatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to the depwatch.toml configuration file.
    #[arg(short, long, default_value = "depwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve package specs and check them against the advisory database.
    Check(CheckArgs),

    /// Resolve a package reference to its canonical name and version.
    Resolve(ResolveArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- check ----

/// Check one or more packages for known vulnerabilities.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Package specs to check (name or name@version).
    #[arg(required = true)]
    pub specs: Vec<String>,

    /// Source file whose project resolves unversioned specs via node_modules.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Override the advisory database directory from the config file.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Override the minimum severity to report (info, low, medium, high, critical).
    #[arg(long)]
    pub min_severity: Option<String>,
}

// ---- resolve ----

/// Resolve a package spec to its canonical identity without a vulnerability lookup.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Package name or name@version spec.
    pub spec: String,

    /// Explicit version (overrides any version in the spec).
    #[arg(long)]
    pub version: Option<String>,

    /// Source file whose project resolves the package via node_modules.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

// ---- config ----

/// Manage depwatch configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, lookup).
        #[arg(long)]
        section: Option<String>,
    },
}
